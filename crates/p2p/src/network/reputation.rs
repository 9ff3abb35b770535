//! Score-based reputation tracking.
//!
//! Each peer starts at a neutral score. Adjustments move the score up or
//! down; rewards are capped at `max_score`. Once a peer's score falls to the
//! disconnect threshold, the peer is banned for `ban_period`, its score is
//! reset, and the caller is told to disconnect it.

use dashmap::DashMap;
use libp2p::PeerId;
use meridian_core::ReputationManager;
use meridian_types::{PeerAddress, ReputationAdjustment};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Configuration for reputation tracking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Score at or below which a peer is disconnected and banned.
    pub disconnect_threshold: i32,
    /// Upper bound on a peer's score.
    pub max_score: i32,
    /// How long a disconnected peer stays banned, in seconds.
    pub ban_period_secs: u64,
    /// Number of tracked peers above which neutral entries are pruned.
    pub max_tracked_peers: usize,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            // Two large penalties in a row are enough to drop a peer
            disconnect_threshold: -20,
            max_score: 20,
            // Keep misbehaving peers away for two hours
            ban_period_secs: 2 * 60 * 60,
            max_tracked_peers: 1024,
        }
    }
}

impl ReputationConfig {
    /// Ban period as a duration.
    pub fn ban_period(&self) -> Duration {
        Duration::from_secs(self.ban_period_secs)
    }
}

/// Reputation state for a single peer.
#[derive(Debug, Default)]
struct PeerReputation {
    /// Current score; 0 is neutral.
    score: i32,
    /// When the current ban ends, if banned.
    banned_until: Option<Instant>,
}

impl PeerReputation {
    /// Apply an adjustment. Returns true if the peer crossed the threshold.
    fn adjust(&mut self, change: i32, config: &ReputationConfig) -> bool {
        self.score = self.score.saturating_add(change).min(config.max_score);
        if self.score <= config.disconnect_threshold {
            self.score = 0;
            self.banned_until = Some(Instant::now() + config.ban_period());
            true
        } else {
            false
        }
    }

    fn is_banned(&self, now: Instant) -> bool {
        self.banned_until.is_some_and(|until| until > now)
    }

    /// Neutral and not banned: carries no information worth keeping.
    fn is_stale(&self, now: Instant) -> bool {
        self.score == 0 && !self.is_banned(now)
    }
}

/// Default reputation authority backed by per-peer scores.
pub struct ScoreBasedReputationManager {
    config: ReputationConfig,
    peers: DashMap<PeerId, PeerReputation>,
}

impl ScoreBasedReputationManager {
    /// Create a new manager with the given configuration.
    pub fn new(config: ReputationConfig) -> Self {
        Self {
            config,
            peers: DashMap::new(),
        }
    }

    /// Whether we may dial the peer at `address` (i.e. it is not banned).
    pub fn is_connection_initiation_allowed(&self, address: &PeerAddress) -> bool {
        let now = Instant::now();
        self.peers
            .get(address.peer_id())
            .map_or(true, |reputation| !reputation.is_banned(now))
    }

    /// Current score of a peer (0 if untracked).
    pub fn score(&self, peer_id: &PeerId) -> i32 {
        self.peers.get(peer_id).map_or(0, |reputation| reputation.score)
    }

    /// Get the number of tracked peers (for metrics/debugging).
    pub fn tracked_peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Remove neutral entries to prevent unbounded memory growth.
    fn cleanup(&self) {
        let now = Instant::now();
        self.peers.retain(|_, reputation| !reputation.is_stale(now));
    }
}

impl ReputationManager for ScoreBasedReputationManager {
    fn adjust_reputation(&self, address: &PeerAddress, adjustment: ReputationAdjustment) -> bool {
        if self.peers.len() > self.config.max_tracked_peers {
            self.cleanup();
        }

        let should_disconnect = self
            .peers
            .entry(*address.peer_id())
            .or_default()
            .adjust(adjustment.score_change(), &self.config);

        if should_disconnect {
            debug!(
                peer = %address,
                ban_secs = self.config.ban_period_secs,
                "Peer reputation below threshold"
            );
        }
        should_disconnect
    }
}
