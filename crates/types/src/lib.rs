//! Core types for Meridian peer connections.
//!
//! This crate provides the foundational types used by the connection layer:
//!
//! - **Identifiers**: `PeerAddress`, `SubscriptionId`
//! - **Disconnects**: `DisconnectReason`, `DisconnectRecord`
//! - **Identity**: `ClientType`, `IdentifyInfo`
//! - **Reputation**: `ReputationAdjustment`
//! - **RPC**: `RpcMethod`

mod client;
mod disconnect;
mod identifiers;
mod identify;
mod reputation;
mod rpc;

pub use client::ClientType;
pub use disconnect::{DisconnectReason, DisconnectRecord};
pub use identifiers::{PeerAddress, SubscriptionId};
pub use identify::IdentifyInfo;
pub use reputation::ReputationAdjustment;
pub use rpc::RpcMethod;

// Re-export the libp2p primitives that appear in our public API.
pub use libp2p::identity::PublicKey;
pub use libp2p::{Multiaddr, PeerId, StreamProtocol};
