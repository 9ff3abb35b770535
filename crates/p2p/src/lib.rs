//! Peer connection layer for a Meridian beacon node.
//!
//! A [`PeerHandle`] wraps one established libp2p connection and provides:
//!
//! - Per-method RPC dispatch, each method behind its own concurrency budget
//! - Client identification from the peer's identify agent string
//! - Reputation reporting, with automatic disconnect of misbehaving peers
//! - Immediate and graceful (goodbye-first) disconnects
//! - Exactly-once disconnect notification to subscribers
//!
//! Observable behavior is reported through a [`meridian_core::EventSink`];
//! by default events go to `tracing`.

mod config;
mod network;

#[cfg(test)]
mod test_utils;

pub use config::{ConfigError, P2pConfig, MAX_CONCURRENT_REQUESTS};
pub use network::{
    lookup_agent, ClientIdentity, DisconnectState, DisconnectSubscribers, GoodbyeRequestHandler,
    IdentitySlot, PeerHandle, PeerScoreFn, PeerServices, PendingRequest, QueuedTask,
    ReputationConfig, RpcMethodTable, ScoreBasedReputationManager, TaskAborted,
    ThrottledRpcMethodHandler, ThrottlingTaskQueue, WeakPeerHandle,
};
