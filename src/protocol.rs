// Message types exchanged between the app loop, the TUI and spawned tasks.

use chrono::{DateTime, Utc};

use crate::api::{ApiError, LoginGrant};
use crate::auth::LoginErrors;
use crate::chat::conversation::{ConversationTurn, TurnId};
use crate::chat::reveal::RevealFrame;
use crate::chat::ConversationKind;
use crate::predictions::record::PredictionRecord;
use crate::predictions::PredictionBoard;

// ---------------------------------------------------------------------------
// TUI -> app
// ---------------------------------------------------------------------------

/// Commands the TUI sends to the app loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Login { email: String, password: String },
    Logout,
    RefreshPredictions,
    Ask { kind: ConversationKind, question: String },
    ClearConversation(ConversationKind),
    Quit,
}

// ---------------------------------------------------------------------------
// app -> TUI
// ---------------------------------------------------------------------------

/// Who is signed in, as shown in the status bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub email: String,
    pub expiry: DateTime<Utc>,
}

/// Render-ready copy of one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    pub kind: ConversationKind,
    pub turns: Vec<ConversationTurn>,
    /// A question is awaiting its answer.
    pub waiting: bool,
    /// The turns came from persisted history.
    pub restored: bool,
}

/// Updates the app loop pushes to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// Signed in (`Some`) or signed out (`None`).
    Session(Option<SessionInfo>),
    LoginPending,
    /// Local validation blocked the submission.
    LoginInvalid(LoginErrors),
    LoginFailed(String),
    Predictions(Box<PredictionBoard>),
    Conversation(Box<ConversationView>),
}

// ---------------------------------------------------------------------------
// spawned tasks -> app
// ---------------------------------------------------------------------------

/// Results reported back by spawned network and reveal tasks. Each carries
/// the generation it was started under.
#[derive(Debug)]
pub enum AppEvent {
    PredictionsFetched {
        generation: u64,
        result: Result<Vec<PredictionRecord>, ApiError>,
    },
    ChatAnswered {
        kind: ConversationKind,
        generation: u64,
        turn: TurnId,
        result: Result<String, ApiError>,
    },
    LoginFinished {
        generation: u64,
        email: String,
        result: Result<LoginGrant, ApiError>,
    },
    Reveal(RevealFrame),
}

impl From<RevealFrame> for AppEvent {
    fn from(frame: RevealFrame) -> Self {
        AppEvent::Reveal(frame)
    }
}
