//! Graceful disconnect over the `Goodbye` RPC.

use super::peer::WeakPeerHandle;
use async_trait::async_trait;
use bytes::Bytes;
use meridian_core::{
    Connection, DisconnectError, DisconnectRequestHandler, RpcError, RpcResponseHandler,
};
use meridian_types::{DisconnectReason, RpcMethod};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Tells the remote peer why we are leaving before the connection is closed.
///
/// The request body is the reason's goodbye code as a little-endian `u64`.
/// The exchange goes through the peer's normal RPC path, so it shares the
/// `Goodbye` method's concurrency budget. Holds the peer weakly so the
/// installed handler does not keep its own peer alive.
pub struct GoodbyeRequestHandler<C: Connection> {
    peer: WeakPeerHandle<C>,
    timeout: Duration,
}

impl<C: Connection> GoodbyeRequestHandler<C> {
    pub fn new(peer: WeakPeerHandle<C>, timeout: Duration) -> Self {
        Self { peer, timeout }
    }

    /// Encode a goodbye request body.
    pub fn encode_reason(reason: DisconnectReason) -> Bytes {
        Bytes::copy_from_slice(&reason.goodbye_code().to_le_bytes())
    }
}

#[async_trait]
impl<C: Connection> DisconnectRequestHandler for GoodbyeRequestHandler<C> {
    async fn request_disconnect(&self, reason: DisconnectReason) -> Result<(), DisconnectError> {
        let peer = self.peer.upgrade().ok_or(DisconnectError::PeerDropped)?;
        let pending = peer.send_request(
            RpcMethod::Goodbye,
            Self::encode_reason(reason),
            Arc::new(DiscardResponses),
        )?;

        tokio::time::timeout(self.timeout, pending)
            .await
            .map_err(|_| DisconnectError::Timeout)??;
        debug!(peer = %peer, %reason, "Sent goodbye");
        Ok(())
    }
}

/// Goodbye has no meaningful response.
struct DiscardResponses;

impl RpcResponseHandler for DiscardResponses {
    fn on_response(&self, _response: Bytes) {}

    fn on_completed(&self, _result: Result<(), RpcError>) {}
}
