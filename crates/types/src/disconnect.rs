//! Disconnect reasons and the record kept when a connection is torn down.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;

/// Why a peer connection was (or is being) torn down.
///
/// Reasons that have a standard goodbye code map onto it for the goodbye
/// exchange; `ProtocolError` is sent on the wire as a generic fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The local node is shutting down.
    #[strum(serialize = "shutdown")]
    Shutdown,
    /// The peer is on a different network or fork.
    #[strum(serialize = "irrelevant network")]
    IrrelevantNetwork,
    /// The peer misbehaved (typically reputation-driven).
    #[strum(serialize = "remote fault")]
    RemoteFault,
    /// The peer violated the wire protocol.
    #[strum(serialize = "protocol error")]
    ProtocolError,
    /// The peer's network could not be verified.
    #[strum(serialize = "unable to verify network")]
    UnableToVerifyNetwork,
    /// Too many peers are connected.
    #[strum(serialize = "too many peers")]
    TooManyPeers,
    /// The peer exceeded its request rate.
    #[strum(serialize = "rate limiting")]
    RateLimiting,
}

impl DisconnectReason {
    /// Goodbye code sent to the remote peer.
    pub fn goodbye_code(&self) -> u64 {
        match self {
            DisconnectReason::Shutdown => 1,
            DisconnectReason::IrrelevantNetwork => 2,
            DisconnectReason::RemoteFault | DisconnectReason::ProtocolError => 3,
            DisconnectReason::UnableToVerifyNetwork => 128,
            DisconnectReason::TooManyPeers => 129,
            DisconnectReason::RateLimiting => 130,
        }
    }

    /// Map a received goodbye code back to a reason.
    ///
    /// Returns `None` for codes we don't recognise.
    pub fn from_goodbye_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(DisconnectReason::Shutdown),
            2 => Some(DisconnectReason::IrrelevantNetwork),
            3 => Some(DisconnectReason::RemoteFault),
            128 => Some(DisconnectReason::UnableToVerifyNetwork),
            129 => Some(DisconnectReason::TooManyPeers),
            130 => Some(DisconnectReason::RateLimiting),
            _ => None,
        }
    }
}

/// What was recorded about a disconnect.
///
/// `reason` is `None` when the connection closed without any local request
/// having recorded one (e.g. the remote hung up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisconnectRecord {
    /// The recorded cause, if any.
    pub reason: Option<DisconnectReason>,
    /// Whether this side asked for the disconnect.
    pub locally_initiated: bool,
}

impl DisconnectRecord {
    /// A record for a disconnect we did not ask for and got no reason for.
    pub const REMOTE_CLOSE: Self = DisconnectRecord {
        reason: None,
        locally_initiated: false,
    };

    /// Create a new record.
    pub fn new(reason: Option<DisconnectReason>, locally_initiated: bool) -> Self {
        Self {
            reason,
            locally_initiated,
        }
    }
}

impl fmt::Display for DisconnectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = if self.locally_initiated {
            "local"
        } else {
            "remote"
        };
        match self.reason {
            Some(reason) => write!(f, "{} ({})", reason, origin),
            None => write!(f, "unknown ({})", origin),
        }
    }
}
