//! Result of the identify exchange.

use libp2p::{Multiaddr, StreamProtocol};

/// What a peer told us about itself over the identify protocol.
///
/// Every field is optional on the wire; transports fill in what they got.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifyInfo {
    /// Free-text client identity, e.g. `"Lighthouse/v4.5.0/x86_64-linux"`.
    pub agent_version: Option<String>,
    /// Protocol family and version the peer speaks.
    pub protocol_version: Option<String>,
    /// Addresses the peer is listening on.
    pub listen_addrs: Vec<Multiaddr>,
    /// Stream protocols the peer supports.
    pub protocols: Vec<StreamProtocol>,
}

impl IdentifyInfo {
    /// Identify info carrying only an agent string.
    pub fn with_agent(agent_version: impl Into<String>) -> Self {
        Self {
            agent_version: Some(agent_version.into()),
            ..Default::default()
        }
    }
}
