//! The per-connection peer handle.
//!
//! A [`PeerHandle`] wraps one established connection and is what the rest of
//! the node talks to. It owns:
//!
//! - the RPC method table (one throttle per method)
//! - the disconnect state machine and its subscribers
//! - the peer's resolved client identity
//! - the pluggable graceful-goodbye handler
//!
//! # Disconnects
//!
//! There are two ways to drop a peer:
//!
//! - [`PeerHandle::disconnect_immediately`] records the reason and asks the
//!   transport to close. It never blocks and never fails; close errors are
//!   reported as events.
//! - [`PeerHandle::disconnect_cleanly`] records the reason, runs the goodbye
//!   handler (if installed), and then always falls back to an immediate
//!   disconnect.
//!
//! Subscribers are notified from the transport's close signal, not from
//! either call, so local and remote closes share one notification path.

use super::disconnect::{DisconnectState, DisconnectSubscribers};
use super::goodbye::GoodbyeRequestHandler;
use super::identity::{self, ClientIdentity, IdentitySlot};
use super::rpc::{PendingRequest, RpcMethodTable};
use crate::config::P2pConfig;
use arc_swap::ArcSwapOption;
use bytes::Bytes;
use futures::FutureExt;
use libp2p::identity::PublicKey;
use libp2p::PeerId;
use meridian_core::{
    Connection, DisconnectRequestHandler, EventSink, PeerDisconnectedSubscriber, PeerEvent,
    ReputationManager, RpcError, RpcHandler, RpcResponseHandler, TracingEventSink,
};
use meridian_types::{
    ClientType, DisconnectReason, DisconnectRecord, PeerAddress, ReputationAdjustment, RpcMethod,
    SubscriptionId,
};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Looks up a peer's gossip score.
pub type PeerScoreFn = Arc<dyn Fn(&PeerId) -> f64 + Send + Sync>;

/// Node-wide collaborators shared by every peer handle.
#[derive(Clone)]
pub struct PeerServices {
    reputation: Arc<dyn ReputationManager>,
    peer_score: PeerScoreFn,
    events: Arc<dyn EventSink>,
}

impl PeerServices {
    /// Services with the given reputation authority, a zero gossip score and
    /// tracing-backed events.
    pub fn new(reputation: Arc<dyn ReputationManager>) -> Self {
        Self {
            reputation,
            peer_score: Arc::new(|_| 0.0),
            events: Arc::new(TracingEventSink),
        }
    }

    /// Use `peer_score` to answer [`PeerHandle::gossip_score`].
    pub fn with_peer_score(mut self, peer_score: PeerScoreFn) -> Self {
        self.peer_score = peer_score;
        self
    }

    /// Send peer events to `events` instead of tracing.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }
}

/// Wrapper so the handler can live in an `ArcSwapOption`.
struct InstalledHandler(Arc<dyn DisconnectRequestHandler>);

struct PeerInner<C: Connection> {
    connection: Arc<C>,
    peer_id: PeerId,
    public_key: PublicKey,
    address: PeerAddress,
    rpc_methods: RpcMethodTable<C>,
    services: PeerServices,
    disconnect: DisconnectState,
    subscribers: DisconnectSubscribers,
    identity: IdentitySlot,
    goodbye_timeout: Duration,
    /// `None` means "disconnect immediately".
    disconnect_request_handler: ArcSwapOption<InstalledHandler>,
}

/// Handle to one connected peer. Cheap to clone.
pub struct PeerHandle<C: Connection> {
    inner: Arc<PeerInner<C>>,
}

impl<C: Connection> Clone for PeerHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Non-owning reference to a [`PeerHandle`].
pub struct WeakPeerHandle<C: Connection> {
    inner: Weak<PeerInner<C>>,
}

impl<C: Connection> WeakPeerHandle<C> {
    /// Get the handle back, if the peer is still alive.
    pub fn upgrade(&self) -> Option<PeerHandle<C>> {
        self.inner.upgrade().map(|inner| PeerHandle { inner })
    }
}

impl<C: Connection> Clone for WeakPeerHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<C: Connection> PeerHandle<C> {
    /// Wrap an established connection.
    ///
    /// `rpc_handlers` are the methods this connection supports; each gets
    /// `config.max_concurrent_requests` concurrent requests. Starts watching
    /// the connection's close signal, so this must be called from within a
    /// tokio runtime.
    pub fn new(
        connection: Arc<C>,
        rpc_handlers: Vec<Arc<dyn RpcHandler<C>>>,
        services: PeerServices,
        config: &P2pConfig,
    ) -> Self {
        let peer_id = connection.remote_peer_id();
        let inner = PeerInner {
            peer_id,
            public_key: connection.remote_public_key(),
            address: PeerAddress::new(peer_id, connection.remote_address()),
            rpc_methods: RpcMethodTable::new(rpc_handlers, config.max_concurrent_requests),
            services,
            disconnect: DisconnectState::default(),
            subscribers: DisconnectSubscribers::default(),
            identity: IdentitySlot::default(),
            goodbye_timeout: config.goodbye_timeout(),
            disconnect_request_handler: ArcSwapOption::empty(),
            connection,
        };
        let peer = Self {
            inner: Arc::new(inner),
        };

        let watcher = peer.clone();
        tokio::spawn(async move {
            watcher.inner.connection.closed().await;
            watcher.handle_connection_closed();
        });

        peer
    }

    /// Get a non-owning reference to this peer.
    pub fn downgrade(&self) -> WeakPeerHandle<C> {
        WeakPeerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Identity
    // ═══════════════════════════════════════════════════════════════════════

    /// Remote node identifier.
    pub fn id(&self) -> PeerId {
        self.inner.peer_id
    }

    /// Remote public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.inner.public_key
    }

    /// Remote network address.
    pub fn address(&self) -> &PeerAddress {
        &self.inner.address
    }

    /// The peer's current gossip score.
    pub fn gossip_score(&self) -> f64 {
        (self.inner.services.peer_score)(&self.inner.peer_id)
    }

    /// Whether this side dialed the connection.
    pub fn connection_initiated_locally(&self) -> bool {
        self.inner.connection.is_initiator()
    }

    /// Whether the remote side dialed the connection.
    pub fn connection_initiated_remotely(&self) -> bool {
        !self.connection_initiated_locally()
    }

    /// Client classification; `Unknown` until identify succeeds.
    pub fn client_type(&self) -> ClientType {
        self.inner.identity.client_type()
    }

    /// The agent string the peer reported, once known.
    pub fn agent_string(&self) -> Option<String> {
        self.inner.identity.agent_string()
    }

    /// Fetch and classify the peer's identity if we don't have it yet.
    ///
    /// Runs in the background. Failures are reported as events and leave
    /// the peer `Unknown`; the next call tries again.
    pub fn check_peer_identity(&self) {
        if self.inner.identity.is_resolved() {
            return;
        }
        let peer = self.clone();
        tokio::spawn(async move { peer.refresh_identity().await });
    }

    async fn refresh_identity(&self) {
        match identity::lookup_agent(self.inner.connection.as_ref()).await {
            Ok(Some(agent)) => {
                let identity = self.inner.identity.resolve(ClientIdentity::from_agent(agent));
                self.emit(PeerEvent::IdentityResolved {
                    peer: self.id(),
                    agent: identity.agent_string,
                    client_type: identity.client_type,
                });
            }
            // Peer answered without an agent string; nothing to classify.
            Ok(None) => {}
            Err(error) => self.emit(PeerEvent::IdentityLookupFailed {
                peer: self.id(),
                error: error.to_string(),
            }),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RPC
    // ═══════════════════════════════════════════════════════════════════════

    /// Send a request for `method`.
    ///
    /// Fails immediately with [`RpcError::UnknownMethod`] if the method is
    /// not registered for this peer; nothing touches the network in that
    /// case. Otherwise the request is queued behind the method's throttle
    /// and the returned future resolves with the delegate's result.
    pub fn send_request(
        &self,
        method: RpcMethod,
        request: Bytes,
        response_handler: Arc<dyn RpcResponseHandler>,
    ) -> Result<PendingRequest, RpcError> {
        let handler = self
            .inner
            .rpc_methods
            .get(method)
            .ok_or(RpcError::UnknownMethod(method))?;
        Ok(handler.send_request(
            Arc::clone(&self.inner.connection),
            request,
            response_handler,
        ))
    }

    /// The methods registered for this peer.
    pub fn rpc_methods(&self) -> &RpcMethodTable<C> {
        &self.inner.rpc_methods
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reputation
    // ═══════════════════════════════════════════════════════════════════════

    /// Report a reputation event for this peer.
    ///
    /// If the reputation authority decides the peer should go, a clean
    /// disconnect with [`DisconnectReason::RemoteFault`] is started in the
    /// background.
    pub fn adjust_reputation(&self, adjustment: ReputationAdjustment) {
        let should_disconnect = self
            .inner
            .services
            .reputation
            .adjust_reputation(&self.inner.address, adjustment);
        if !should_disconnect {
            return;
        }

        self.emit(PeerEvent::ReputationDisconnect {
            peer: self.id(),
            adjustment,
        });
        // Already recorded and running in the background; nothing to wait for.
        drop(self.disconnect_cleanly(DisconnectReason::RemoteFault));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Disconnects
    // ═══════════════════════════════════════════════════════════════════════

    /// Whether no disconnect has been requested or observed.
    pub fn is_connected(&self) -> bool {
        self.inner.disconnect.is_connected()
    }

    /// What was recorded about the disconnect, if one happened.
    pub fn disconnect_record(&self) -> Option<DisconnectRecord> {
        self.inner.disconnect.record()
    }

    /// Ask the transport to close the connection now.
    ///
    /// Fire-and-forget. Safe to call repeatedly; each call asks the
    /// transport to close, but only the first recorded reason sticks.
    pub fn disconnect_immediately(&self, reason: Option<DisconnectReason>, locally_initiated: bool) {
        self.inner
            .disconnect
            .record_disconnect(reason, locally_initiated);
        self.emit(PeerEvent::DisconnectRequested {
            peer: self.id(),
            reason,
            locally_initiated,
            clean: false,
        });

        let peer = self.clone();
        tokio::spawn(async move {
            if let Err(error) = peer.inner.connection.close().await {
                peer.emit(PeerEvent::ConnectionCloseFailed {
                    peer: peer.id(),
                    error: error.to_string(),
                });
            }
        });
    }

    /// Say goodbye to the peer, then disconnect.
    ///
    /// The disconnect is recorded before this returns, and the goodbye
    /// exchange runs in the background; the returned future only waits for
    /// it. Dropping the future does not cancel anything.
    ///
    /// Always completes; a failed goodbye is reported as an event and the
    /// connection is closed regardless. Only the call that records the
    /// disconnect runs the goodbye exchange.
    pub fn disconnect_cleanly(&self, reason: DisconnectReason) -> impl Future<Output = ()> + Send {
        let first = self.inner.disconnect.record_disconnect(Some(reason), true);
        self.emit(PeerEvent::DisconnectRequested {
            peer: self.id(),
            reason: Some(reason),
            locally_initiated: true,
            clean: true,
        });

        let peer = self.clone();
        let goodbye = tokio::spawn(async move {
            let panicked = if first { peer.say_goodbye(reason).await } else { None };
            peer.disconnect_immediately(Some(reason), true);
            if let Some(detail) = panicked {
                peer.invariant_violated("clean disconnect", detail);
            }
        });

        async move {
            // Only fails if the invariant check above panicked.
            let _ = goodbye.await;
        }
    }

    /// Run the installed goodbye handler, if any.
    ///
    /// Returns the panic message if the handler panicked.
    async fn say_goodbye(&self, reason: DisconnectReason) -> Option<String> {
        let handler = self.disconnect_request_handler()?;
        match AssertUnwindSafe(handler.request_disconnect(reason))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => None,
            Ok(Err(error)) => {
                self.emit(PeerEvent::CleanDisconnectFailed {
                    peer: self.id(),
                    reason,
                    error: error.to_string(),
                });
                None
            }
            Err(panic) => Some(panic_message(panic.as_ref())),
        }
    }

    /// Install the graceful-goodbye protocol used by
    /// [`PeerHandle::disconnect_cleanly`].
    pub fn set_disconnect_request_handler(&self, handler: Arc<dyn DisconnectRequestHandler>) {
        self.inner
            .disconnect_request_handler
            .store(Some(Arc::new(InstalledHandler(handler))));
    }

    /// Install a [`GoodbyeRequestHandler`] that sends the `Goodbye` RPC over
    /// this peer, waiting at most the configured goodbye timeout for it.
    pub fn install_goodbye_handler(&self) {
        self.set_disconnect_request_handler(Arc::new(GoodbyeRequestHandler::new(
            self.downgrade(),
            self.inner.goodbye_timeout,
        )));
    }

    fn disconnect_request_handler(&self) -> Option<Arc<dyn DisconnectRequestHandler>> {
        self.inner
            .disconnect_request_handler
            .load_full()
            .map(|installed| Arc::clone(&installed.0))
    }

    /// Register an observer for this peer's disconnect.
    ///
    /// The observer is called exactly once. If the peer has already
    /// disconnected it is called immediately.
    pub fn subscribe_disconnect(
        &self,
        subscriber: Arc<dyn PeerDisconnectedSubscriber>,
    ) -> SubscriptionId {
        self.inner.subscribers.subscribe(subscriber)
    }

    /// Remove a disconnect observer. Returns false if it was not registered.
    pub fn unsubscribe_disconnect(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    fn handle_connection_closed(&self) {
        let record = self.inner.disconnect.mark_closed();
        self.emit(PeerEvent::ConnectionClosed {
            peer: self.id(),
            reason: record.reason,
            locally_initiated: record.locally_initiated,
        });
        self.inner.subscribers.deliver(record);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════

    fn emit(&self, event: PeerEvent) {
        self.inner.services.events.emit(event);
    }

    /// Report a broken invariant. Fatal in debug builds.
    fn invariant_violated(&self, context: &'static str, detail: String) {
        self.emit(PeerEvent::InvariantViolation {
            peer: self.id(),
            context,
            detail: detail.clone(),
        });
        if cfg!(debug_assertions) {
            panic!("invariant violated in {context} for peer {}: {detail}", self.id());
        }
    }
}

impl<C: Connection> fmt::Debug for PeerHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandle")
            .field("address", &self.inner.address)
            .field("connected", &self.is_connected())
            .field("client_type", &self.client_type())
            .finish()
    }
}

impl<C: Connection> fmt::Display for PeerHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.peer_id)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
