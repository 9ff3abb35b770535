//! Reputation adjustments applied to peers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scored event applied to a peer.
///
/// Penalties accumulate; once a peer's score drops far enough the
/// reputation authority asks for the peer to be disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationAdjustment {
    LargePenalty,
    SmallPenalty,
    SmallReward,
    LargeReward,
}

impl ReputationAdjustment {
    /// Score delta applied by this adjustment.
    pub fn score_change(&self) -> i32 {
        match self {
            ReputationAdjustment::LargePenalty => -10,
            ReputationAdjustment::SmallPenalty => -3,
            ReputationAdjustment::SmallReward => 3,
            ReputationAdjustment::LargeReward => 10,
        }
    }

    /// Whether this adjustment lowers the score.
    pub fn is_penalty(&self) -> bool {
        self.score_change() < 0
    }
}

impl fmt::Display for ReputationAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.score_change())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalties_are_negative() {
        assert!(ReputationAdjustment::LargePenalty.is_penalty());
        assert!(ReputationAdjustment::SmallPenalty.is_penalty());
        assert!(!ReputationAdjustment::SmallReward.is_penalty());
        assert_eq!(ReputationAdjustment::LargeReward.to_string(), "+10");
    }
}
