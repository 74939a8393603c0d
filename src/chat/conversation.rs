// Conversation store: the ordered turn list for one chat variant.
//
// Every mutation writes a snapshot. Persistence failures are logged and
// otherwise ignored; the in-memory list stays authoritative.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::snapshot::SnapshotStore;
use super::ConversationKind;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Handle for one turn, returned at creation time. Ids are unique within a
/// store for the lifetime of the process; they are not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn#{}", self.0)
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Placeholder whose final content has not been fully revealed yet.
    pub pending: bool,
}

pub struct ConversationStore {
    kind: ConversationKind,
    turns: Vec<ConversationTurn>,
    next_id: u64,
    snapshots: SnapshotStore,
}

impl ConversationStore {
    pub fn new(kind: ConversationKind, snapshots: SnapshotStore) -> Self {
        ConversationStore {
            kind,
            turns: Vec::new(),
            next_id: 0,
            snapshots,
        }
    }

    pub fn kind(&self) -> ConversationKind {
        self.kind
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn get(&self, id: TurnId) -> Option<&ConversationTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// True while any assistant turn is still pending.
    pub fn is_waiting(&self) -> bool {
        self.turns.iter().any(|t| t.pending)
    }

    /// Hydrate from the persisted snapshot as of `now`. Returns whether any
    /// history was restored. Restored turns are never pending.
    pub fn restore(&mut self, now: DateTime<Utc>) -> bool {
        let snapshot = match self.snapshots.load(now) {
            Ok(Some(s)) => s,
            Ok(None) => return false,
            Err(e) => {
                warn!("failed to load {:?} conversation: {:#}", self.kind, e);
                return false;
            }
        };

        self.turns = snapshot
            .messages
            .into_iter()
            .map(|m| {
                let id = TurnId(self.next_id);
                self.next_id += 1;
                ConversationTurn {
                    id,
                    role: m.role,
                    content: m.content,
                    timestamp: m.timestamp,
                    pending: false,
                }
            })
            .collect();

        info!(
            "Restored {} turns for {:?} conversation",
            self.turns.len(),
            self.kind
        );
        !self.turns.is_empty()
    }

    /// Append a turn stamped with the current time.
    pub fn append(&mut self, role: Role, content: impl Into<String>, pending: bool) -> TurnId {
        self.append_at(role, content, pending, Utc::now())
    }

    /// Append a turn stamped with `at`.
    pub fn append_at(
        &mut self,
        role: Role,
        content: impl Into<String>,
        pending: bool,
        at: DateTime<Utc>,
    ) -> TurnId {
        let id = TurnId(self.next_id);
        self.next_id += 1;
        self.turns.push(ConversationTurn {
            id,
            role,
            content: content.into(),
            timestamp: at,
            pending,
        });
        debug!("{:?}: appended {} ({:?}, pending={})", self.kind, id, role, pending);
        self.persist();
        id
    }

    /// Overwrite the content of the turn identified by `id`. Returns `false`
    /// if the turn no longer exists (e.g. the conversation was cleared).
    pub fn amend(&mut self, id: TurnId, content: impl Into<String>, pending: bool) -> bool {
        let Some(turn) = self.turns.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        turn.content = content.into();
        turn.pending = pending;
        self.persist();
        true
    }

    /// Overwrite the most recent assistant turn and clear its pending flag.
    /// Returns the amended turn's id, or `None` if there is no assistant turn.
    pub fn amend_last_assistant(&mut self, content: impl Into<String>) -> Option<TurnId> {
        let id = self
            .turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .map(|t| t.id)?;
        self.amend(id, content, false);
        Some(id)
    }

    /// Empty the list and erase the persisted snapshot.
    pub fn clear(&mut self) {
        self.turns.clear();
        if let Err(e) = self.snapshots.erase() {
            warn!("failed to erase {:?} snapshot: {:#}", self.kind, e);
        }
        info!("Cleared {:?} conversation", self.kind);
    }

    fn persist(&self) {
        if self.turns.is_empty() {
            return;
        }
        if let Err(e) = self.snapshots.save(&self.turns, Utc::now()) {
            warn!("failed to persist {:?} conversation: {:#}", self.kind, e);
        }
    }
}
