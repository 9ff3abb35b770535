//! Error types for peer connections.

use meridian_types::{RpcMethod, StreamProtocol};
use thiserror::Error;

/// Errors reported by the transport layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is already closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A logical stream could not be opened.
    #[error("Failed to open stream for {protocol}: {reason}")]
    StreamOpen {
        protocol: StreamProtocol,
        reason: String,
    },

    /// The identify exchange failed.
    #[error("Identify failed: {0}")]
    Identify(String),

    /// Underlying I/O failure.
    #[error("Transport I/O error: {0}")]
    Io(String),
}

/// Errors from sending an RPC request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// The method was not registered for this peer.
    #[error("Unknown rpc method invoked: {0}")]
    UnknownMethod(RpcMethod),

    /// Transport failure while performing the request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The queued request vanished before producing a result.
    #[error("Request aborted before completion")]
    Aborted,

    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// The remote peer answered with an error.
    #[error("Remote error: {0}")]
    Remote(String),
}

/// Errors from a graceful disconnect exchange.
///
/// These are never surfaced to callers of `disconnect_cleanly`; they are
/// reported as events and followed by an immediate disconnect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisconnectError {
    /// Sending the goodbye request failed.
    #[error("Goodbye request failed: {0}")]
    Goodbye(#[from] RpcError),

    /// The goodbye exchange took too long.
    #[error("Goodbye request timed out")]
    Timeout,

    /// The peer handle was dropped before the exchange started.
    #[error("Peer dropped before goodbye")]
    PeerDropped,
}
