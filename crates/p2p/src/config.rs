//! Peer connection configuration.

use crate::network::ReputationConfig;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Maximum concurrent outstanding requests per RPC method per peer.
pub const MAX_CONCURRENT_REQUESTS: usize = 2;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for peer connections.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct P2pConfig {
    /// Concurrent request budget for each RPC method on each peer.
    pub max_concurrent_requests: usize,

    /// How long the goodbye exchange may take before we just close, in
    /// milliseconds.
    pub goodbye_timeout_ms: u64,

    /// Reputation tracking.
    pub reputation: ReputationConfig,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            goodbye_timeout_ms: 1000,
            reputation: ReputationConfig::default(),
        }
    }
}

impl P2pConfig {
    /// Parse and validate a TOML document. Missing fields take defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the connection layer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.reputation.disconnect_threshold >= 0 {
            return Err(ConfigError::Invalid(format!(
                "reputation.disconnect_threshold must be negative, got {}",
                self.reputation.disconnect_threshold
            )));
        }
        if self.reputation.max_score < 1 {
            return Err(ConfigError::Invalid(format!(
                "reputation.max_score must be positive, got {}",
                self.reputation.max_score
            )));
        }
        Ok(())
    }

    /// Goodbye timeout as a duration.
    pub fn goodbye_timeout(&self) -> Duration {
        Duration::from_millis(self.goodbye_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = P2pConfig::from_toml_str("").unwrap();
        assert_eq!(config, P2pConfig::default());
        assert_eq!(config.max_concurrent_requests, MAX_CONCURRENT_REQUESTS);
        assert_eq!(config.goodbye_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_document_overrides_fields() {
        let config = P2pConfig::from_toml_str(
            r#"
            max_concurrent_requests = 4

            [reputation]
            ban_period_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.max_concurrent_requests, 4);
        assert_eq!(config.reputation.ban_period(), Duration::from_secs(60));
        assert_eq!(config.reputation.disconnect_threshold, -20);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let err = P2pConfig::from_toml_str("max_concurrent_requests = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_non_negative_threshold_is_rejected() {
        let err = P2pConfig::from_toml_str("[reputation]\ndisconnect_threshold = 5").unwrap_err();
        assert!(err.to_string().contains("disconnect_threshold"));
    }

    #[test]
    fn test_malformed_document_is_a_parse_error() {
        let err = P2pConfig::from_toml_str("max_concurrent_requests = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
