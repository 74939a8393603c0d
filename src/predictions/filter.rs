// Client-side prediction filters.
//
// Every predicate defaults to "no constraint"; active predicates are
// AND-combined. Filtering always runs over the full sorted set.

use chrono::NaiveDate;

use super::record::PredictionRecord;
use super::stats::{HIGH_ACCURACY_THRESHOLD, MEDIUM_ACCURACY_THRESHOLD};

/// Accuracy bucket used for colouring and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyBucket {
    High,
    Medium,
    Low,
}

impl AccuracyBucket {
    pub fn of(accuracy: f64) -> Self {
        if accuracy >= HIGH_ACCURACY_THRESHOLD {
            AccuracyBucket::High
        } else if accuracy >= MEDIUM_ACCURACY_THRESHOLD {
            AccuracyBucket::Medium
        } else {
            AccuracyBucket::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccuracyBucket::High => "high",
            AccuracyBucket::Medium => "medium",
            AccuracyBucket::Low => "low",
        }
    }
}

/// Categorical confidence levels offered by the confidence filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// Settled-result category derived from the free-text `result` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCategory {
    Win,
    Loss,
    Draw,
    Correct,
    Incorrect,
    Pending,
    Other,
}

impl ResultCategory {
    /// Classify result text by keyword. "incorrect"/"wrong" are checked
    /// before "correct" so they are not swallowed by the substring match.
    pub fn classify(result: &str) -> Self {
        let lower = result.trim().to_lowercase();
        if lower.is_empty() {
            return ResultCategory::Pending;
        }
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["win", "victory"]) {
            ResultCategory::Win
        } else if has(&["loss", "defeat"]) {
            ResultCategory::Loss
        } else if has(&["draw", "tie"]) {
            ResultCategory::Draw
        } else if has(&["incorrect", "wrong"]) {
            ResultCategory::Incorrect
        } else if has(&["correct", "right"]) {
            ResultCategory::Correct
        } else {
            ResultCategory::Other
        }
    }

    /// Whether `result` satisfies this category as a filter option. Options
    /// test their own keywords independently, so "Correct (Home Win)" passes
    /// both the Win and the Correct filter.
    pub fn matches(self, result: &str) -> bool {
        let lower = result.trim().to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        match self {
            ResultCategory::Pending => lower.is_empty(),
            ResultCategory::Win => has(&["win", "victory"]),
            ResultCategory::Loss => has(&["loss", "defeat"]),
            ResultCategory::Draw => has(&["draw", "tie"]),
            ResultCategory::Incorrect => has(&["incorrect", "wrong"]),
            ResultCategory::Correct => {
                has(&["correct", "right"]) && !has(&["incorrect", "wrong"])
            }
            ResultCategory::Other => ResultCategory::classify(result) == ResultCategory::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResultCategory::Win => "WIN",
            ResultCategory::Loss => "LOSS",
            ResultCategory::Draw => "DRAW",
            ResultCategory::Correct => "CORRECT",
            ResultCategory::Incorrect => "INCORRECT",
            ResultCategory::Pending => "PENDING",
            ResultCategory::Other => "OTHER",
        }
    }
}

/// The full set of dashboard filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionFilter {
    /// Exact kickoff date.
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring matched against home and away team.
    pub team: String,
    /// Exact league name.
    pub league: Option<String>,
    pub accuracy: Option<AccuracyBucket>,
    pub confidence: Option<ConfidenceLevel>,
    /// Exact partial-data flag ("Yes" / "No").
    pub partial_data: Option<String>,
    pub result: Option<ResultCategory>,
}

impl PredictionFilter {
    /// True when no predicate is active.
    pub fn is_empty(&self) -> bool {
        *self == PredictionFilter::default()
    }

    /// Whether `record` satisfies every active predicate.
    pub fn matches(&self, record: &PredictionRecord) -> bool {
        if let Some(date) = self.date {
            if record.kickoff_date() != Some(date) {
                return false;
            }
        }

        let team = self.team.trim().to_lowercase();
        if !team.is_empty()
            && !record.home_team.to_lowercase().contains(&team)
            && !record.away_team.to_lowercase().contains(&team)
        {
            return false;
        }

        if let Some(ref league) = self.league {
            if &record.league != league {
                return false;
            }
        }

        if let Some(bucket) = self.accuracy {
            if AccuracyBucket::of(record.prediction_accuracy) != bucket {
                return false;
            }
        }

        if let Some(level) = self.confidence {
            if record.confidence().as_deref() != Some(level.label()) {
                return false;
            }
        }

        if let Some(ref partial) = self.partial_data {
            if record.partial_data_text() != partial {
                return false;
            }
        }

        if let Some(category) = self.result {
            if !category.matches(record.result_text()) {
                return false;
            }
        }

        true
    }

    /// Apply the filter to an already-sorted slice, preserving order.
    pub fn apply<'a>(&self, records: &'a [PredictionRecord]) -> Vec<&'a PredictionRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    /// Human-readable summary of the active predicates, for the table title.
    pub fn describe(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(date) = self.date {
            parts.push(format!("date={date}"));
        }
        if !self.team.trim().is_empty() {
            parts.push(format!("team~\"{}\"", self.team.trim()));
        }
        if let Some(ref league) = self.league {
            parts.push(format!("league={league}"));
        }
        if let Some(bucket) = self.accuracy {
            parts.push(format!("accuracy={}", bucket.label()));
        }
        if let Some(level) = self.confidence {
            parts.push(format!("confidence={}", level.label()));
        }
        if let Some(ref partial) = self.partial_data {
            parts.push(format!("partial={partial}"));
        }
        if let Some(category) = self.result {
            parts.push(format!("result={}", category.label().to_lowercase()));
        }
        parts
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
