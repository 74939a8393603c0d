// Summary statistics over the fetched prediction set.

use std::collections::HashSet;

use serde::Serialize;

use super::record::PredictionRecord;

/// Accuracy at or above which a prediction counts as "high accuracy".
pub const HIGH_ACCURACY_THRESHOLD: f64 = 80.0;

/// Accuracy at or above which a prediction counts as "medium accuracy".
pub const MEDIUM_ACCURACY_THRESHOLD: f64 = 60.0;

/// Aggregate figures shown above the prediction table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionStats {
    pub total_matches: usize,
    /// Mean accuracy rounded to the nearest integer; 0 for an empty set.
    pub average_accuracy: i64,
    pub high_accuracy_matches: usize,
    pub unique_leagues: usize,
}

/// Compute stats over the full (unfiltered) record set.
pub fn compute_stats(records: &[PredictionRecord]) -> PredictionStats {
    let total_matches = records.len();
    if total_matches == 0 {
        return PredictionStats::default();
    }

    let sum: f64 = records.iter().map(|r| r.prediction_accuracy).sum();
    let average_accuracy = (sum / total_matches as f64).round() as i64;

    let high_accuracy_matches = records
        .iter()
        .filter(|r| r.prediction_accuracy >= HIGH_ACCURACY_THRESHOLD)
        .count();

    let unique_leagues = records
        .iter()
        .map(|r| r.league.as_str())
        .collect::<HashSet<_>>()
        .len();

    PredictionStats {
        total_matches,
        average_accuracy,
        high_accuracy_matches,
        unique_leagues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictions::test_support::record;

    #[test]
    fn empty_set_is_all_zero() {
        assert_eq!(compute_stats(&[]), PredictionStats::default());
    }

    #[test]
    fn mean_is_rounded() {
        let records = vec![
            record("A", "B", "Premier League", 85.0),
            record("C", "D", "Premier League", 55.0),
        ];
        let stats = compute_stats(&records);
        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.average_accuracy, 70);
        assert_eq!(stats.high_accuracy_matches, 1);
        assert_eq!(stats.unique_leagues, 1);
    }

    #[test]
    fn half_rounds_up() {
        let records = vec![
            record("A", "B", "L1", 70.0),
            record("C", "D", "L2", 71.0),
        ];
        assert_eq!(compute_stats(&records).average_accuracy, 71);
    }

    #[test]
    fn threshold_is_inclusive() {
        let records = vec![
            record("A", "B", "L1", 80.0),
            record("C", "D", "L2", 79.9),
            record("E", "F", "L3", 100.0),
        ];
        let stats = compute_stats(&records);
        assert_eq!(stats.high_accuracy_matches, 2);
        assert_eq!(stats.unique_leagues, 3);
    }

    #[test]
    fn league_count_is_case_sensitive_exact() {
        let records = vec![
            record("A", "B", "La Liga", 50.0),
            record("C", "D", "La Liga", 50.0),
            record("E", "F", "la liga", 50.0),
        ];
        assert_eq!(compute_stats(&records).unique_leagues, 2);
    }
}
