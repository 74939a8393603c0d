// Persisted login session.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::Database;

/// Local-storage key holding the active session.
pub const SESSION_KEY: &str = "auth.session";

/// An authenticated session. Past `expiry` it is treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub expiry: DateTime<Utc>,
    pub email: String,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.expiry - now).to_std().unwrap_or_default()
    }

    /// The token to attach to requests, if still valid at `now`.
    pub fn token_at(&self, now: DateTime<Utc>) -> Option<&str> {
        (!self.is_expired(now)).then_some(self.token.as_str())
    }
}

/// Parse an expiry sent by the auth webhook. Accepts RFC 3339, naive
/// timestamps (taken as UTC) and Unix epoch numbers in seconds or
/// milliseconds.
pub fn parse_expiry(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        serde_json::Value::Number(n) => {
            let n = n.as_i64()?;
            // Anything past year ~5138 in seconds is really milliseconds.
            if n > 100_000_000_000 {
                DateTime::from_timestamp_millis(n)
            } else {
                DateTime::from_timestamp(n, 0)
            }
        }
        _ => None,
    }
}

/// What [`SessionStore::hydrate`] found in storage.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredSession {
    Active(AuthSession),
    /// A session was stored but has lapsed; it has been deleted.
    Expired,
    /// Nothing usable was stored.
    Absent,
}

/// Reads and writes the session under [`SESSION_KEY`].
pub struct SessionStore {
    db: Arc<Database>,
}

impl SessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        SessionStore { db }
    }

    /// Load the stored session as of `now`. Unreadable and expired sessions
    /// are deleted.
    pub fn hydrate(&self, now: DateTime<Utc>) -> Result<StoredSession> {
        let Some(value) = self.db.load_state(SESSION_KEY)? else {
            return Ok(StoredSession::Absent);
        };

        let session: AuthSession = match serde_json::from_value(value) {
            Ok(s) => s,
            Err(e) => {
                warn!("discarding unreadable session: {}", e);
                self.clear()?;
                return Ok(StoredSession::Absent);
            }
        };

        if session.is_expired(now) {
            info!("stored session for {} expired at {}", session.email, session.expiry);
            self.clear()?;
            return Ok(StoredSession::Expired);
        }

        Ok(StoredSession::Active(session))
    }

    pub fn persist(&self, session: &AuthSession) -> Result<()> {
        let value = serde_json::to_value(session).context("failed to encode session")?;
        self.db.save_state(SESSION_KEY, &value)
    }

    pub fn clear(&self) -> Result<()> {
        self.db.delete_state(SESSION_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 17, 12, 0, 0).unwrap()
    }

    fn session(expiry: DateTime<Utc>) -> AuthSession {
        AuthSession {
            token: "tok-123".into(),
            expiry,
            email: "fan@club.com".into(),
        }
    }

    fn store() -> (Arc<Database>, SessionStore) {
        let db = Arc::new(Database::open(":memory:").unwrap());
        (Arc::clone(&db), SessionStore::new(db))
    }

    #[test]
    fn expiry_boundary() {
        let s = session(t0());
        assert!(s.is_expired(t0()));
        assert!(!s.is_expired(t0() - Duration::seconds(1)));
        assert_eq!(s.token_at(t0() - Duration::seconds(1)), Some("tok-123"));
        assert_eq!(s.token_at(t0()), None);
    }

    #[test]
    fn remaining_is_zero_after_expiry() {
        let s = session(t0());
        assert_eq!(s.remaining(t0() + Duration::hours(1)), std::time::Duration::ZERO);
        assert_eq!(
            s.remaining(t0() - Duration::seconds(90)),
            std::time::Duration::from_secs(90)
        );
    }

    #[test]
    fn persist_then_hydrate_before_expiry() {
        let (_db, store) = store();
        let s = session(t0() + Duration::hours(1));
        store.persist(&s).unwrap();
        assert_eq!(store.hydrate(t0()).unwrap(), StoredSession::Active(s));
    }

    #[test]
    fn hydrate_after_expiry_clears_storage() {
        let (db, store) = store();
        store.persist(&session(t0())).unwrap();
        assert_eq!(
            store.hydrate(t0() + Duration::seconds(1)).unwrap(),
            StoredSession::Expired
        );
        assert_eq!(db.load_state(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn hydrate_unreadable_session_clears_storage() {
        let (db, store) = store();
        db.save_state(SESSION_KEY, &json!({"token": 5})).unwrap();
        assert_eq!(store.hydrate(t0()).unwrap(), StoredSession::Absent);
        assert_eq!(db.load_state(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn hydrate_empty_storage_is_absent() {
        let (_db, store) = store();
        assert_eq!(store.hydrate(t0()).unwrap(), StoredSession::Absent);
    }

    #[test]
    fn clear_removes_session() {
        let (db, store) = store();
        store.persist(&session(t0() + Duration::hours(1))).unwrap();
        store.clear().unwrap();
        assert_eq!(db.load_state(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn parse_expiry_forms() {
        let expected = t0();
        assert_eq!(parse_expiry(&json!("2025-08-17T12:00:00Z")), Some(expected));
        assert_eq!(parse_expiry(&json!("2025-08-17T14:00:00+02:00")), Some(expected));
        assert_eq!(parse_expiry(&json!("2025-08-17 12:00:00")), Some(expected));
        assert_eq!(parse_expiry(&json!(expected.timestamp())), Some(expected));
        assert_eq!(
            parse_expiry(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(parse_expiry(&json!("tomorrow")), None);
        assert_eq!(parse_expiry(&json!(null)), None);
    }
}
