//! Structured events emitted by peer connections.

use meridian_types::{ClientType, DisconnectReason, PeerId, ReputationAdjustment};
use tracing::{debug, error, trace, warn};

/// Something noteworthy that happened on a peer connection.
///
/// Peers never log directly; they hand these to an [`EventSink`] so the
/// owning node decides how failures are recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    // ═══════════════════════════════════════════════════════════════════════
    // Identity
    // ═══════════════════════════════════════════════════════════════════════
    /// The peer's agent string was obtained and classified.
    IdentityResolved {
        peer: PeerId,
        agent: String,
        client_type: ClientType,
    },

    /// The identify exchange failed; classification stays unknown.
    IdentityLookupFailed { peer: PeerId, error: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Disconnects
    // ═══════════════════════════════════════════════════════════════════════
    /// A disconnect was requested on this side.
    DisconnectRequested {
        peer: PeerId,
        reason: Option<DisconnectReason>,
        locally_initiated: bool,
        clean: bool,
    },

    /// The graceful goodbye exchange failed; falling back to immediate.
    CleanDisconnectFailed {
        peer: PeerId,
        reason: DisconnectReason,
        error: String,
    },

    /// The transport failed to close the connection.
    ConnectionCloseFailed { peer: PeerId, error: String },

    /// The transport confirmed the connection is closed.
    ConnectionClosed {
        peer: PeerId,
        reason: Option<DisconnectReason>,
        locally_initiated: bool,
    },

    /// The reputation authority asked for this peer to be dropped.
    ReputationDisconnect {
        peer: PeerId,
        adjustment: ReputationAdjustment,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Bugs
    // ═══════════════════════════════════════════════════════════════════════
    /// Something that must never fail did.
    InvariantViolation {
        peer: PeerId,
        context: &'static str,
        detail: String,
    },
}

impl PeerEvent {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            PeerEvent::IdentityResolved { .. } => "IdentityResolved",
            PeerEvent::IdentityLookupFailed { .. } => "IdentityLookupFailed",
            PeerEvent::DisconnectRequested { .. } => "DisconnectRequested",
            PeerEvent::CleanDisconnectFailed { .. } => "CleanDisconnectFailed",
            PeerEvent::ConnectionCloseFailed { .. } => "ConnectionCloseFailed",
            PeerEvent::ConnectionClosed { .. } => "ConnectionClosed",
            PeerEvent::ReputationDisconnect { .. } => "ReputationDisconnect",
            PeerEvent::InvariantViolation { .. } => "InvariantViolation",
        }
    }

    /// The peer this event concerns.
    pub fn peer(&self) -> &PeerId {
        match self {
            PeerEvent::IdentityResolved { peer, .. }
            | PeerEvent::IdentityLookupFailed { peer, .. }
            | PeerEvent::DisconnectRequested { peer, .. }
            | PeerEvent::CleanDisconnectFailed { peer, .. }
            | PeerEvent::ConnectionCloseFailed { peer, .. }
            | PeerEvent::ConnectionClosed { peer, .. }
            | PeerEvent::ReputationDisconnect { peer, .. }
            | PeerEvent::InvariantViolation { peer, .. } => peer,
        }
    }

    /// Check if this event reports a failure of some kind.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PeerEvent::IdentityLookupFailed { .. }
                | PeerEvent::CleanDisconnectFailed { .. }
                | PeerEvent::ConnectionCloseFailed { .. }
                | PeerEvent::InvariantViolation { .. }
        )
    }
}

/// Destination for peer events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PeerEvent);
}

/// Default sink: forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: PeerEvent) {
        match event {
            PeerEvent::IdentityResolved {
                peer,
                agent,
                client_type,
            } => debug!(%peer, %agent, %client_type, "Resolved peer identity"),
            PeerEvent::IdentityLookupFailed { peer, error } => {
                debug!(%peer, %error, "Failed to retrieve client identity")
            }
            PeerEvent::DisconnectRequested {
                peer,
                reason,
                locally_initiated,
                clean,
            } => trace!(
                %peer,
                ?reason,
                locally_initiated,
                clean,
                "Disconnecting peer"
            ),
            PeerEvent::CleanDisconnectFailed {
                peer,
                reason,
                error,
            } => debug!(%peer, %reason, %error, "Failed to disconnect cleanly"),
            PeerEvent::ConnectionCloseFailed { peer, error } => {
                warn!(%peer, %error, "Failed to disconnect from peer")
            }
            PeerEvent::ConnectionClosed {
                peer,
                reason,
                locally_initiated,
            } => debug!(%peer, ?reason, locally_initiated, "Disconnected from peer"),
            PeerEvent::ReputationDisconnect { peer, adjustment } => {
                debug!(%peer, %adjustment, "Reputation threshold crossed, disconnecting")
            }
            PeerEvent::InvariantViolation {
                peer,
                context,
                detail,
            } => error!(%peer, context, %detail, "Invariant violated"),
        }
    }
}
