//! Readiness policy: can the service currently serve meaningful data?
//!
//! Distinct from liveness. The decision is a pure combination of
//! independently gathered signals; evaluating readiness never triggers a
//! fetch, a recomputation, or a cache write.

use serde::Serialize;

use crate::sensors::AvailabilityTally;

/// Station-unavailability percentage at or above which the service reports
/// not-ready.
const UNAVAILABLE_THRESHOLD_PERCENT: f64 = 50.0;

/// Observed cache state for the aggregate key, gathered without mutating
/// the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Key present with this many seconds of lifetime left
    Fresh { ttl_seconds: i64 },
    /// Key present but its lifetime has elapsed
    Expired,
    /// Key absent
    Missing,
    /// The cache store itself could not be read
    Unavailable,
}

/// Outcome of one readiness evaluation
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResult {
    pub ready: bool,
    pub reasons: Vec<String>,
}

/// Ready iff strictly less than half the stations are unavailable AND the
/// cached aggregate exists with strictly positive remaining TTL. Every
/// failing condition contributes a human-readable reason.
#[must_use]
pub fn evaluate(tally: &AvailabilityTally, cache: CacheState) -> ReadinessResult {
    let mut reasons = Vec::new();

    if tally.unavailable_percent() >= UNAVAILABLE_THRESHOLD_PERCENT {
        reasons.push(format!(
            "Station availability below threshold: {}/{} available",
            tally.available, tally.total
        ));
    }

    match cache {
        CacheState::Fresh { .. } => {}
        CacheState::Expired => reasons.push("Cache expired (TTL <= 0)".to_string()),
        CacheState::Missing => reasons.push("No cached temperature data".to_string()),
        CacheState::Unavailable => reasons.push("Failed to check cache".to_string()),
    }

    ReadinessResult {
        ready: reasons.is_empty(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tally(available: usize, total: usize) -> AvailabilityTally {
        AvailabilityTally { available, total }
    }

    #[test]
    fn test_ready_when_all_signals_good() {
        let result = evaluate(&tally(3, 3), CacheState::Fresh { ttl_seconds: 120 });
        assert!(result.ready);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_not_ready_when_too_many_stations_down_despite_fresh_cache() {
        let result = evaluate(&tally(1, 3), CacheState::Fresh { ttl_seconds: 120 });
        assert!(!result.ready);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.reasons[0].contains("1/3 available"));
    }

    #[test]
    fn test_exactly_half_unavailable_is_not_ready() {
        // The threshold requires strictly below 50% unavailable.
        let result = evaluate(&tally(1, 2), CacheState::Fresh { ttl_seconds: 120 });
        assert!(!result.ready);
    }

    #[test]
    fn test_just_below_half_unavailable_is_ready() {
        let result = evaluate(&tally(2, 3), CacheState::Fresh { ttl_seconds: 120 });
        assert!(result.ready);
    }

    #[test]
    fn test_no_stations_configured_is_never_ready() {
        let result = evaluate(&tally(0, 0), CacheState::Fresh { ttl_seconds: 120 });
        assert!(!result.ready);
        assert!(result.reasons[0].contains("0/0 available"));
    }

    #[rstest]
    #[case(CacheState::Expired, "Cache expired (TTL <= 0)")]
    #[case(CacheState::Missing, "No cached temperature data")]
    #[case(CacheState::Unavailable, "Failed to check cache")]
    fn test_not_ready_on_cache_problems_despite_full_availability(
        #[case] cache: CacheState,
        #[case] expected_reason: &str,
    ) {
        let result = evaluate(&tally(3, 3), cache);
        assert!(!result.ready);
        assert_eq!(result.reasons, vec![expected_reason.to_string()]);
    }

    #[test]
    fn test_every_failing_condition_appends_a_reason() {
        let result = evaluate(&tally(0, 3), CacheState::Missing);
        assert!(!result.ready);
        assert_eq!(result.reasons.len(), 2);
    }
}
