//! Domain-specific identifier types.

use libp2p::{Multiaddr, PeerId};
use std::fmt;

/// Network address of a connected peer.
///
/// Pairs the remote node identifier with the multiaddress the connection was
/// established over. This is the key the reputation authority scores against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    peer_id: PeerId,
    address: Multiaddr,
}

impl PeerAddress {
    /// Create a new peer address.
    pub fn new(peer_id: PeerId, address: Multiaddr) -> Self {
        Self { peer_id, address }
    }

    /// The remote node identifier.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// The remote multiaddress.
    pub fn address(&self) -> &Multiaddr {
        &self.address
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/p2p/{}", self.address, self.peer_id)
    }
}

/// Opaque identifier for a disconnect subscription.
///
/// Handed out by `subscribe_disconnect` and used to unsubscribe again.
/// Identifiers are allocated in increasing order per peer, so iterating
/// subscribers by id preserves subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl SubscriptionId {
    /// Create a new subscription ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The identifier following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_address_display() {
        let peer_id = PeerId::random();
        let address: Multiaddr = "/ip4/10.0.0.1/tcp/9000".parse().unwrap();
        let peer = PeerAddress::new(peer_id, address);

        assert_eq!(
            peer.to_string(),
            format!("/ip4/10.0.0.1/tcp/9000/p2p/{}", peer_id)
        );
    }

    #[test]
    fn test_subscription_id_ordering() {
        let first = SubscriptionId::new(7);
        let second = first.next();

        assert!(first < second);
        assert_eq!(second.as_u64(), 8);
        assert_eq!(second.to_string(), "sub-8");
    }
}
