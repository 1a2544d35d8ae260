//! Trust classification of public aggregates.

use serde::{Deserialize, Serialize};

/// Categorical trust label derived from an artifact's score and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrustLevel {
    /// No live attestations.
    Unscored,
    Emerging,
    Trusted,
    Established,
}

/// Minimum count and score for each level above `Emerging`.
const TRUSTED_MIN_COUNT: u64 = 3;
const TRUSTED_MIN_SCORE: u64 = 150;
const ESTABLISHED_MIN_COUNT: u64 = 10;
const ESTABLISHED_MIN_SCORE: u64 = 500;

/// Classify an aggregate.
///
/// ```
/// use attestvault_core::trust::{classify, TrustLevel};
///
/// assert_eq!(classify(0, 0), TrustLevel::Unscored);
/// assert_eq!(classify(267, 3), TrustLevel::Trusted);
/// ```
pub fn classify(score: u64, count: u64) -> TrustLevel {
    if count == 0 {
        TrustLevel::Unscored
    } else if count < TRUSTED_MIN_COUNT || score < TRUSTED_MIN_SCORE {
        TrustLevel::Emerging
    } else if count < ESTABLISHED_MIN_COUNT || score < ESTABLISHED_MIN_SCORE {
        TrustLevel::Trusted
    } else {
        TrustLevel::Established
    }
}

/// Coarse score-only tier for badges and listings.
///
/// This ignores the attester count and must not be used for trust decisions;
/// use [`classify`] for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DisplayTier {
    Low,
    Medium,
    High,
}

pub fn display_tier(score: u64) -> DisplayTier {
    match score {
        0..=299 => DisplayTier::Low,
        300..=699 => DisplayTier::Medium,
        _ => DisplayTier::High,
    }
}

/// Mean quality, rounded down. `None` when nothing has been attested.
pub fn average_quality(score: u64, count: u64) -> Option<u64> {
    score.checked_div(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0, 0), TrustLevel::Unscored);
        assert_eq!(classify(1000, 0), TrustLevel::Unscored);
        assert_eq!(classify(200, 2), TrustLevel::Emerging);
        assert_eq!(classify(149, 3), TrustLevel::Emerging);
        assert_eq!(classify(150, 3), TrustLevel::Trusted);
        assert_eq!(classify(499, 10), TrustLevel::Trusted);
        assert_eq!(classify(5000, 9), TrustLevel::Trusted);
        assert_eq!(classify(500, 10), TrustLevel::Established);
    }

    #[test]
    fn test_three_attesters() {
        assert_eq!(classify(90 + 85 + 92, 3), TrustLevel::Trusted);
    }

    #[test]
    fn test_display_tier() {
        assert_eq!(display_tier(0), DisplayTier::Low);
        assert_eq!(display_tier(299), DisplayTier::Low);
        assert_eq!(display_tier(300), DisplayTier::Medium);
        assert_eq!(display_tier(699), DisplayTier::Medium);
        assert_eq!(display_tier(700), DisplayTier::High);
    }

    #[test]
    fn test_average_quality() {
        assert_eq!(average_quality(0, 0), None);
        assert_eq!(average_quality(267, 3), Some(89));
    }

    proptest! {
        #[test]
        fn prop_classify_monotonic_in_score(score in 0u64..2000, count in 0u64..50, bump in 0u64..500) {
            prop_assert!(classify(score, count) <= classify(score + bump, count));
        }

        #[test]
        fn prop_classify_monotonic_in_count(score in 0u64..2000, count in 0u64..50, bump in 0u64..20) {
            prop_assert!(classify(score, count) <= classify(score, count + bump));
        }
    }
}
