//! Core seams for Meridian peer connections.
//!
//! This crate defines the boundaries between the peer connection layer and
//! its collaborators:
//!
//! - [`Connection`]: the transport handle for one established connection
//! - [`RpcHandler`]: the per-method delegate that performs a request
//! - [`ReputationManager`]: the authority that scores peers
//! - [`DisconnectRequestHandler`]: the pluggable graceful-goodbye protocol
//! - [`EventSink`]: where structured peer events are reported

mod error;
mod event;
mod traits;

pub use error::{DisconnectError, RpcError, TransportError};
pub use event::{EventSink, PeerEvent, TracingEventSink};
pub use traits::{
    Connection, DisconnectRequestHandler, PeerDisconnectedSubscriber, ReputationManager,
    RpcHandler, RpcResponseHandler, RpcStreamController,
};
