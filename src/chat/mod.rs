// Chat conversations: turn storage, persisted snapshots and the reveal
// sequence that plays answers back character by character.

pub mod conversation;
pub mod reveal;
pub mod snapshot;

use serde::{Deserialize, Serialize};

/// Shown in place of an answer when the chat webhook fails.
pub const ERROR_ANSWER: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

/// The two chatbot variants. Each has its own endpoint, its own persisted
/// history and its own expiry window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationKind {
    /// Match-day chat; history kept for a few minutes.
    Daily,
    /// Pre-day chat; history kept for a week.
    PreDay,
}

impl ConversationKind {
    pub const ALL: [ConversationKind; 2] = [ConversationKind::Daily, ConversationKind::PreDay];

    /// Key of the persisted snapshot in local storage.
    pub fn storage_key(self) -> &'static str {
        match self {
            ConversationKind::Daily => "chat.daily",
            ConversationKind::PreDay => "chat.weekly",
        }
    }

    /// Stable conversation id written into the snapshot.
    pub fn snapshot_id(self) -> &'static str {
        match self {
            ConversationKind::Daily => "1",
            ConversationKind::PreDay => "weekly-1",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ConversationKind::Daily => "Chat",
            ConversationKind::PreDay => "Pre-Day Chat",
        }
    }
}
