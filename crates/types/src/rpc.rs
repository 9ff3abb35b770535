//! Request/response RPC methods.

use libp2p::StreamProtocol;
use std::fmt;

/// The request/response methods a peer connection can carry.
///
/// Each method is its own sub-protocol with its own stream protocol id, and
/// gets its own concurrency budget per peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RpcMethod {
    Status,
    Goodbye,
    BeaconBlocksByRange,
    BeaconBlocksByRoot,
    BlobSidecarsByRange,
    BlobSidecarsByRoot,
    Ping,
    Metadata,
}

impl RpcMethod {
    /// All methods, in declaration order.
    pub const ALL: [RpcMethod; 8] = [
        RpcMethod::Status,
        RpcMethod::Goodbye,
        RpcMethod::BeaconBlocksByRange,
        RpcMethod::BeaconBlocksByRoot,
        RpcMethod::BlobSidecarsByRange,
        RpcMethod::BlobSidecarsByRoot,
        RpcMethod::Ping,
        RpcMethod::Metadata,
    ];

    /// Stream protocol id negotiated for this method.
    pub fn protocol(&self) -> StreamProtocol {
        let id = match self {
            RpcMethod::Status => "/eth2/beacon_chain/req/status/1/ssz_snappy",
            RpcMethod::Goodbye => "/eth2/beacon_chain/req/goodbye/1/ssz_snappy",
            RpcMethod::BeaconBlocksByRange => {
                "/eth2/beacon_chain/req/beacon_blocks_by_range/2/ssz_snappy"
            }
            RpcMethod::BeaconBlocksByRoot => {
                "/eth2/beacon_chain/req/beacon_blocks_by_root/2/ssz_snappy"
            }
            RpcMethod::BlobSidecarsByRange => {
                "/eth2/beacon_chain/req/blob_sidecars_by_range/1/ssz_snappy"
            }
            RpcMethod::BlobSidecarsByRoot => {
                "/eth2/beacon_chain/req/blob_sidecars_by_root/1/ssz_snappy"
            }
            RpcMethod::Ping => "/eth2/beacon_chain/req/ping/1/ssz_snappy",
            RpcMethod::Metadata => "/eth2/beacon_chain/req/metadata/2/ssz_snappy",
        };
        StreamProtocol::new(id)
    }

    /// Short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            RpcMethod::Status => "status",
            RpcMethod::Goodbye => "goodbye",
            RpcMethod::BeaconBlocksByRange => "beacon_blocks_by_range",
            RpcMethod::BeaconBlocksByRoot => "beacon_blocks_by_root",
            RpcMethod::BlobSidecarsByRange => "blob_sidecars_by_range",
            RpcMethod::BlobSidecarsByRoot => "blob_sidecars_by_root",
            RpcMethod::Ping => "ping",
            RpcMethod::Metadata => "metadata",
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
