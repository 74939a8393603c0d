// Prediction table presenter: fetched records, sort order, stats and the
// fetch tri-state the dashboard renders.

pub mod filter;
pub mod record;
pub mod stats;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use filter::PredictionFilter;
use record::PredictionRecord;
use stats::{compute_stats, PredictionStats};

/// Where the dashboard is in its fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    Loading,
    Loaded,
    /// Retryable failure; the message is shown with a refresh hint.
    Failed(String),
}

/// Snapshot of the prediction table pushed to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionBoard {
    pub status: FetchStatus,
    /// All records, kickoff descending.
    pub records: Vec<PredictionRecord>,
    pub stats: PredictionStats,
}

impl Default for PredictionBoard {
    fn default() -> Self {
        PredictionBoard {
            status: FetchStatus::Loading,
            records: Vec::new(),
            stats: PredictionStats::default(),
        }
    }
}

impl PredictionBoard {
    /// Replace the board wholesale with a freshly fetched set.
    pub fn loaded(mut records: Vec<PredictionRecord>) -> Self {
        sort_by_kickoff_desc(&mut records);
        let stats = compute_stats(&records);
        PredictionBoard {
            status: FetchStatus::Loaded,
            records,
            stats,
        }
    }

    /// Mark a fetch as in flight. Existing records are kept until the
    /// response arrives.
    pub fn begin_loading(&mut self) {
        self.status = FetchStatus::Loading;
    }

    /// Record a failed fetch. Previously loaded rows are dropped, matching
    /// the error screen.
    pub fn failed(&mut self, message: impl Into<String>) {
        self.status = FetchStatus::Failed(message.into());
        self.records.clear();
        self.stats = PredictionStats::default();
    }

    /// Rows visible under `filter`, in board order.
    pub fn visible<'a>(&'a self, filter: &PredictionFilter) -> Vec<&'a PredictionRecord> {
        filter.apply(&self.records)
    }

    /// Distinct leagues, sorted, for the league filter.
    pub fn league_options(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.league.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct kickoff dates, latest first, for the date filter.
    pub fn date_options(&self) -> Vec<chrono::NaiveDate> {
        let dates: BTreeSet<_> = self.records.iter().filter_map(|r| r.kickoff_date()).collect();
        dates.into_iter().rev().collect()
    }
}

/// Sort records by kickoff, latest first. Records without a parseable
/// kickoff go last; ties keep their fetched order.
pub fn sort_by_kickoff_desc(records: &mut [PredictionRecord]) {
    records.sort_by(|a, b| match (a.kickoff(), b.kickoff()) {
        (Some(ka), Some(kb)) => kb.cmp(&ka),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
