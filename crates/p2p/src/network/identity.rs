//! Peer client identification.
//!
//! The agent string a peer reports over identify is fetched at most once
//! successfully per connection. Until then the peer is `Unknown`, and each
//! check retries the lookup.

use meridian_core::{Connection, TransportError};
use meridian_types::ClientType;
use parking_lot::RwLock;

/// The identity a peer reported, and what we classified it as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub agent_string: String,
    pub client_type: ClientType,
}

impl ClientIdentity {
    /// Classify a raw agent string.
    pub fn from_agent(agent_string: String) -> Self {
        let client_type = ClientType::from_agent_string(&agent_string);
        Self {
            agent_string,
            client_type,
        }
    }
}

/// Write-once slot holding a peer's resolved identity.
#[derive(Debug, Default)]
pub struct IdentitySlot {
    identity: RwLock<Option<ClientIdentity>>,
}

impl IdentitySlot {
    /// Whether an identity has been stored.
    pub fn is_resolved(&self) -> bool {
        self.identity.read().is_some()
    }

    /// Classification so far; `Unknown` until resolved.
    pub fn client_type(&self) -> ClientType {
        self.identity
            .read()
            .as_ref()
            .map_or(ClientType::Unknown, |identity| identity.client_type)
    }

    /// Raw agent string, once resolved.
    pub fn agent_string(&self) -> Option<String> {
        self.identity
            .read()
            .as_ref()
            .map(|identity| identity.agent_string.clone())
    }

    /// Store an identity unless one is already present.
    ///
    /// Returns the identity that ends up stored.
    pub fn resolve(&self, identity: ClientIdentity) -> ClientIdentity {
        let mut slot = self.identity.write();
        slot.get_or_insert(identity).clone()
    }
}

/// Ask the remote peer for its agent string.
///
/// `Ok(None)` means the exchange worked but the peer did not send one.
pub async fn lookup_agent<C: Connection>(connection: &C) -> Result<Option<String>, TransportError> {
    let info = connection.identify().await?;
    Ok(info.agent_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockConnection;
    use meridian_types::IdentifyInfo;

    #[test]
    fn test_slot_is_unknown_until_resolved() {
        let slot = IdentitySlot::default();
        assert!(!slot.is_resolved());
        assert_eq!(slot.client_type(), ClientType::Unknown);
        assert_eq!(slot.agent_string(), None);
    }

    #[test]
    fn test_first_resolution_sticks() {
        let slot = IdentitySlot::default();
        let first = slot.resolve(ClientIdentity::from_agent("Prysm/v5.0.1".to_string()));
        let second = slot.resolve(ClientIdentity::from_agent("Teku/v24".to_string()));

        assert_eq!(first.client_type, ClientType::Prysm);
        assert_eq!(second, first);
        assert_eq!(slot.client_type(), ClientType::Prysm);
        assert_eq!(slot.agent_string().as_deref(), Some("Prysm/v5.0.1"));
    }

    #[test]
    fn test_unrecognised_agent_is_still_stored() {
        let identity = ClientIdentity::from_agent("totallyUnknownAgent".to_string());
        assert_eq!(identity.client_type, ClientType::Unknown);
    }

    #[tokio::test]
    async fn test_lookup_agent_reads_agent_version() {
        let connection = MockConnection::new();
        connection.push_identify(Ok(IdentifyInfo::with_agent("nimbus")));
        connection.push_identify(Ok(IdentifyInfo::default()));
        connection.push_identify(Err(TransportError::ConnectionClosed));

        assert_eq!(
            lookup_agent(connection.as_ref()).await,
            Ok(Some("nimbus".to_string()))
        );
        assert_eq!(lookup_agent(connection.as_ref()).await, Ok(None));
        assert_eq!(
            lookup_agent(connection.as_ref()).await,
            Err(TransportError::ConnectionClosed)
        );
    }
}
