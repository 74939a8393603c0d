// Time-boxed conversation snapshots in local storage.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::conversation::{ConversationTurn, Role};
use super::ConversationKind;
use crate::db::Database;

/// One persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Serialized projection of a conversation plus its last write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConversationSnapshot {
    pub id: String,
    pub title: String,
    pub messages: Vec<StoredMessage>,
    pub last_updated: DateTime<Utc>,
}

/// Reads and writes one conversation's snapshot under a fixed key, applying
/// the expiry window on both paths.
pub struct SnapshotStore {
    db: Arc<Database>,
    kind: ConversationKind,
    window: Duration,
}

impl SnapshotStore {
    pub fn new(db: Arc<Database>, kind: ConversationKind, window: Duration) -> Self {
        SnapshotStore { db, kind, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Write `turns` as of `now`. Pending turns and turns older than the
    /// window are dropped before writing.
    pub fn save(&self, turns: &[ConversationTurn], now: DateTime<Utc>) -> Result<()> {
        let cutoff = now - self.window;
        let messages: Vec<StoredMessage> = turns
            .iter()
            .filter(|t| !t.pending && t.timestamp >= cutoff)
            .map(|t| StoredMessage {
                role: t.role,
                content: t.content.clone(),
                timestamp: t.timestamp,
            })
            .collect();

        let snapshot = StoredConversationSnapshot {
            id: self.kind.snapshot_id().to_string(),
            title: self.kind.title().to_string(),
            messages,
            last_updated: now,
        };
        let value = serde_json::to_value(&snapshot).context("failed to encode snapshot")?;
        self.db.save_state(self.kind.storage_key(), &value)?;
        debug!(
            key = self.kind.storage_key(),
            messages = snapshot.messages.len(),
            "saved conversation snapshot"
        );
        Ok(())
    }

    /// Load the snapshot as of `now`.
    ///
    /// Returns `None` when nothing is stored, when the stored value is
    /// unreadable, or when `last_updated` is older than the window. Expired
    /// and unreadable snapshots are deleted.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<StoredConversationSnapshot>> {
        let key = self.kind.storage_key();
        let Some(value) = self.db.load_state(key)? else {
            return Ok(None);
        };

        let snapshot: StoredConversationSnapshot = match serde_json::from_value(value) {
            Ok(s) => s,
            Err(e) => {
                warn!("discarding unreadable snapshot {}: {}", key, e);
                self.db.delete_state(key)?;
                return Ok(None);
            }
        };

        if snapshot.last_updated < now - self.window {
            info!(
                "snapshot {} expired (last updated {}), discarding",
                key, snapshot.last_updated
            );
            self.db.delete_state(key)?;
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    /// Remove the persisted snapshot.
    pub fn erase(&self) -> Result<()> {
        self.db.delete_state(self.kind.storage_key())?;
        Ok(())
    }
}
