//! Peer client classification.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Coarse classification of the software a peer runs.
///
/// Derived from the agent string the peer reports during identify. Matching
/// is case-insensitive against the variant names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Grandine,
    Lighthouse,
    Lodestar,
    Nimbus,
    Prysm,
    Teku,
    #[default]
    Unknown,
}

impl ClientType {
    /// Classify a self-reported agent string.
    ///
    /// Only the part before the first `/` is considered, so
    /// `"Lighthouse/v4.5.0/x86_64-linux"` classifies as `Lighthouse`.
    /// Anything unrecognised is `Unknown`.
    pub fn from_agent_string(agent: &str) -> Self {
        let name = agent.split_once('/').map_or(agent, |(name, _)| name);
        name.parse().unwrap_or(ClientType::Unknown)
    }

    /// Whether the classification resolved to a known client.
    pub fn is_known(&self) -> bool {
        !matches!(self, ClientType::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_before_slash_is_matched() {
        assert_eq!(
            ClientType::from_agent_string("Lighthouse/v4.5.0-441fc16/x86_64-linux"),
            ClientType::Lighthouse
        );
        assert_eq!(
            ClientType::from_agent_string("teku/teku/v24.1.0/linux-x86_64"),
            ClientType::Teku
        );
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert_eq!(ClientType::from_agent_string("PRYSM/v5"), ClientType::Prysm);
        assert_eq!(ClientType::from_agent_string("nImBuS"), ClientType::Nimbus);
    }

    #[test]
    fn test_unrecognised_agents_are_unknown() {
        assert_eq!(
            ClientType::from_agent_string("totallyUnknownAgent"),
            ClientType::Unknown
        );
        assert_eq!(ClientType::from_agent_string(""), ClientType::Unknown);
        assert_eq!(ClientType::from_agent_string("/lighthouse"), ClientType::Unknown);
        assert!(!ClientType::default().is_known());
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(ClientType::Lodestar.to_string(), "lodestar");
    }
}
