//! Traits at the boundaries of the peer connection layer.

use crate::{DisconnectError, RpcError, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use meridian_types::{
    DisconnectReason, IdentifyInfo, Multiaddr, PeerAddress, PeerId, PublicKey,
    ReputationAdjustment, RpcMethod, StreamProtocol,
};
use std::sync::Arc;

/// Handle to one established connection, provided by the transport.
///
/// The peer layer borrows this handle: it may ask for the connection to be
/// closed, but the transport owns its lifecycle. Closing a connection must
/// eventually resolve [`Connection::closed`], and the transport is expected
/// to fail in-flight stream operations when it closes.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Logical stream type returned by [`Connection::open_stream`].
    type Stream: Send;

    /// Remote node identifier.
    fn remote_peer_id(&self) -> PeerId;

    /// Remote public key, as authenticated by the secure channel.
    fn remote_public_key(&self) -> PublicKey;

    /// Remote multiaddress.
    fn remote_address(&self) -> Multiaddr;

    /// Whether this side dialed the connection.
    fn is_initiator(&self) -> bool;

    /// Ask the transport to close the connection.
    async fn close(&self) -> Result<(), TransportError>;

    /// Resolves once the connection has closed, for whatever reason.
    ///
    /// May be awaited any number of times; resolves immediately once closed.
    async fn closed(&self);

    /// Open a new logical stream for the given sub-protocol.
    async fn open_stream(&self, protocol: StreamProtocol) -> Result<Self::Stream, TransportError>;

    /// Perform one identify round trip with the remote peer.
    async fn identify(&self) -> Result<IdentifyInfo, TransportError>;
}

/// Receives the response chunks of one outbound request.
pub trait RpcResponseHandler: Send + Sync {
    /// Called for each response chunk, in arrival order.
    fn on_response(&self, response: Bytes);

    /// Called once when the response stream finishes.
    fn on_completed(&self, result: Result<(), RpcError>);
}

/// Control over an open request stream.
pub trait RpcStreamController: Send + Sync {
    /// Method this stream belongs to.
    fn method(&self) -> RpcMethod;

    /// Abort the stream without waiting for the remaining responses.
    fn close_abruptly(&self);
}

/// Performs the network round trip for one RPC method.
///
/// Implementations handle encoding, stream setup and any per-request
/// timeouts. The peer layer only bounds how many run at once.
#[async_trait]
pub trait RpcHandler<C: Connection>: Send + Sync {
    /// The method this handler serves.
    fn method(&self) -> RpcMethod;

    /// Send `request` over `connection`, delivering responses to
    /// `response_handler`.
    async fn send_request(
        &self,
        connection: &C,
        request: Bytes,
        response_handler: Arc<dyn RpcResponseHandler>,
    ) -> Result<Box<dyn RpcStreamController>, RpcError>;
}

/// External authority that scores peers.
pub trait ReputationManager: Send + Sync {
    /// Apply `adjustment` to the peer at `address`.
    ///
    /// Returns `true` if the peer's accumulated reputation now warrants
    /// disconnecting it.
    fn adjust_reputation(&self, address: &PeerAddress, adjustment: ReputationAdjustment) -> bool;
}

/// Pluggable graceful-goodbye protocol.
///
/// Whatever this returns, the peer falls back to an immediate disconnect
/// afterwards.
#[async_trait]
pub trait DisconnectRequestHandler: Send + Sync {
    /// Tell the remote peer we are about to disconnect.
    async fn request_disconnect(&self, reason: DisconnectReason) -> Result<(), DisconnectError>;
}

/// Observer notified once when a peer disconnects.
pub trait PeerDisconnectedSubscriber: Send + Sync {
    fn on_disconnected(&self, reason: Option<DisconnectReason>, locally_initiated: bool);
}

impl<F> PeerDisconnectedSubscriber for F
where
    F: Fn(Option<DisconnectReason>, bool) + Send + Sync,
{
    fn on_disconnected(&self, reason: Option<DisconnectReason>, locally_initiated: bool) {
        self(reason, locally_initiated)
    }
}
