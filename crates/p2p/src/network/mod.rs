//! Per-peer connection management.
//!
//! Everything a node needs to drive one connected peer: throttled RPC
//! dispatch, identity resolution, reputation-driven and graceful
//! disconnects, and exactly-once disconnect notification.

mod disconnect;
mod goodbye;
mod identity;
mod peer;
mod reputation;
mod rpc;
mod throttle;

pub use disconnect::{DisconnectState, DisconnectSubscribers};
pub use goodbye::GoodbyeRequestHandler;
pub use identity::{lookup_agent, ClientIdentity, IdentitySlot};
pub use peer::{PeerHandle, PeerScoreFn, PeerServices, WeakPeerHandle};
pub use reputation::{ReputationConfig, ScoreBasedReputationManager};
pub use rpc::{PendingRequest, RpcMethodTable, ThrottledRpcMethodHandler};
pub use throttle::{QueuedTask, TaskAborted, ThrottlingTaskQueue};
