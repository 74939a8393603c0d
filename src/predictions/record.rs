// Prediction record schema and payload validation.
//
// The prediction webhook returns loosely-typed JSON. Records are decoded into
// an explicit schema here; any shape mismatch fails the whole payload with a
// typed error instead of leaking missing fields into rendering.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A payload that could not be turned into prediction records.
#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("API did not return an array")]
    NotAnArray,

    #[error("record {index} is malformed: {message}")]
    InvalidRecord { index: usize, message: String },
}

/// One forecast for a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(default, deserialize_with = "de_lenient_id")]
    pub row_number: Option<u64>,
    #[serde(default, deserialize_with = "de_lenient_id")]
    pub fixture_id: Option<u64>,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    #[serde(default)]
    pub country: Option<String>,
    /// Kickoff timestamp as sent by the webhook.
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub predicted_score: Option<String>,
    #[serde(default)]
    pub prediction_win_team: Option<String>,
    #[serde(default)]
    pub prediction_loss_team: Option<String>,
    #[serde(deserialize_with = "de_number")]
    pub prediction_accuracy: f64,
    /// Normalized to lowercase; numeric levels are kept as their decimal text.
    #[serde(default, deserialize_with = "de_lenient_text")]
    pub confidence_level: Option<String>,
    #[serde(default)]
    pub reason_for_win: Option<String>,
    #[serde(default)]
    pub reason_for_loss: Option<String>,
    #[serde(default)]
    pub overall_analytics: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_text")]
    pub partial_data: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_text")]
    pub result: Option<String>,
}

impl PredictionRecord {
    /// Parsed kickoff instant, if `datetime` is present and understood.
    pub fn kickoff(&self) -> Option<DateTime<FixedOffset>> {
        self.datetime.as_deref().and_then(parse_kickoff)
    }

    /// Calendar date of kickoff in the timestamp's own offset.
    pub fn kickoff_date(&self) -> Option<NaiveDate> {
        self.kickoff().map(|k| k.date_naive())
    }

    /// Confidence level as lowercase text, `None` when absent.
    pub fn confidence(&self) -> Option<String> {
        self.confidence_level.as_deref().map(str::to_lowercase)
    }

    /// The settled result text, empty while pending.
    pub fn result_text(&self) -> &str {
        self.result.as_deref().unwrap_or("")
    }

    pub fn partial_data_text(&self) -> &str {
        self.partial_data.as_deref().unwrap_or("")
    }

    /// "Home vs Away" label for table rows.
    pub fn fixture_label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// Parse a kickoff timestamp. Accepts RFC 3339 and naive
/// `YYYY-MM-DD[T ]HH:MM[:SS]` forms (naive values are taken as UTC).
pub fn parse_kickoff(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Decode a prediction payload: either a bare array or `{ "data": [...] }`.
///
/// Fails on the first record that does not match the schema.
pub fn parse_payload(payload: Value) -> Result<Vec<PredictionRecord>, PayloadError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(PayloadError::NotAnArray),
        },
        _ => return Err(PayloadError::NotAnArray),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<PredictionRecord>(item).map_err(|e| {
                PayloadError::InvalidRecord {
                    index,
                    message: e.to_string(),
                }
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

/// Accept a JSON number or a numeric string.
fn de_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

/// Accept an unsigned integer or its decimal string. Null and empty strings
/// become `None`.
fn de_lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected an id, got {s:?}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected an id, got {n}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected an id, got {other}"
        ))),
    }
}

/// Accept a string, number or bool as text. Null and empty strings become
/// `None`, as do falsy numbers (the webhook sends `0` for "unknown").
fn de_lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(if b { "Yes" } else { "No" }.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected text, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
