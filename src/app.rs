// Application state and orchestration logic.
//
// The central event loop that coordinates user commands from the TUI with
// results reported by spawned network and reveal tasks. Owns the session,
// the prediction board and both conversations, and pushes UI updates to the
// TUI render loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::RemoteService;
use crate::auth::{validate_login, AuthSession, SessionStore, StoredSession};
use crate::chat::conversation::{ConversationStore, Role, TurnId};
use crate::chat::reveal::{RevealFrame, RevealScheduler};
use crate::chat::snapshot::SnapshotStore;
use crate::chat::{ConversationKind, ERROR_ANSWER};
use crate::config::Config;
use crate::db::Database;
use crate::predictions::PredictionBoard;
use crate::protocol::{AppEvent, ConversationView, SessionInfo, UiUpdate, UserCommand};

/// How long the restored-history notice stays up after startup.
pub const RESTORED_NOTICE_DURATION: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// ChatChannel
// ---------------------------------------------------------------------------

/// One chatbot conversation with its reveal scheduler and request tracking.
pub struct ChatChannel {
    pub store: ConversationStore,
    pub reveal: RevealScheduler,
    /// Bumped for every question and on reset. Answers carrying an older
    /// generation are discarded.
    pub request_generation: u64,
    /// Placeholder turn whose answer is still on the network.
    pub awaiting: Option<TurnId>,
    /// Turn being revealed and its full answer.
    revealing: Option<(TurnId, String)>,
    request_task: Option<JoinHandle<()>>,
    /// History was hydrated from storage; drives the restored notice.
    pub restored: bool,
    /// When the restored notice is taken down.
    pub notice_deadline: Option<Instant>,
}

impl ChatChannel {
    fn new(kind: ConversationKind, db: Arc<Database>, config: &Config) -> Self {
        let window = match kind {
            ConversationKind::Daily => config.storage.daily_window(),
            ConversationKind::PreDay => config.storage.weekly_window(),
        };
        ChatChannel {
            store: ConversationStore::new(kind, SnapshotStore::new(db, kind, window)),
            reveal: RevealScheduler::new(kind, config.reveal.char_delay()),
            request_generation: 0,
            awaiting: None,
            revealing: None,
            request_task: None,
            restored: false,
            notice_deadline: None,
        }
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            kind: self.store.kind(),
            turns: self.store.turns().to_vec(),
            waiting: self.awaiting.is_some(),
            restored: self.restored,
        }
    }

    /// Cut a running reveal short, writing the full answer into its turn.
    fn settle_reveal(&mut self) {
        if let Some((turn, answer)) = self.revealing.take() {
            self.reveal.cancel();
            self.store.amend(turn, answer, false);
        }
    }

    fn dismiss_notice(&mut self) {
        self.restored = false;
        self.notice_deadline = None;
    }

    /// Drop everything: in-flight request, reveal, turns and snapshot.
    fn reset(&mut self) {
        if let Some(task) = self.request_task.take() {
            task.abort();
        }
        self.reveal.cancel();
        self.request_generation += 1;
        self.awaiting = None;
        self.revealing = None;
        self.dismiss_notice();
        self.store.clear();
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub remote: Arc<dyn RemoteService>,
    pub sessions: SessionStore,
    pub session: Option<AuthSession>,
    /// When the active session lapses. `None` while signed out.
    pub session_deadline: Option<Instant>,
    pub board: PredictionBoard,
    /// Incremented for each prediction fetch; stale results are discarded.
    pub fetch_generation: u64,
    fetch_task: Option<JoinHandle<()>>,
    /// Incremented for each login attempt and on logout.
    pub login_generation: u64,
    pub daily: ChatChannel,
    pub pre_day: ChatChannel,
    /// Sender handed to spawned tasks so they can report back to the loop.
    pub events_tx: mpsc::Sender<AppEvent>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<Database>,
        remote: Arc<dyn RemoteService>,
        events_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let daily = ChatChannel::new(ConversationKind::Daily, Arc::clone(&db), &config);
        let pre_day = ChatChannel::new(ConversationKind::PreDay, Arc::clone(&db), &config);
        AppState {
            config,
            remote,
            sessions: SessionStore::new(db),
            session: None,
            session_deadline: None,
            board: PredictionBoard::default(),
            fetch_generation: 0,
            fetch_task: None,
            login_generation: 0,
            daily,
            pre_day,
            events_tx,
        }
    }

    pub fn chat(&self, kind: ConversationKind) -> &ChatChannel {
        match kind {
            ConversationKind::Daily => &self.daily,
            ConversationKind::PreDay => &self.pre_day,
        }
    }

    pub fn chat_mut(&mut self, kind: ConversationKind) -> &mut ChatChannel {
        match kind {
            ConversationKind::Daily => &mut self.daily,
            ConversationKind::PreDay => &mut self.pre_day,
        }
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|s| SessionInfo {
            email: s.email.clone(),
            expiry: s.expiry,
        })
    }

    /// Restore the session and both conversations from storage as of `now`.
    ///
    /// A session that lapsed while the app was closed counts as a logout, so
    /// its conversations are erased rather than restored.
    pub fn hydrate(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        match self.sessions.hydrate(now)? {
            StoredSession::Active(session) => {
                info!("Restored session for {}", session.email);
                self.activate_session(session, now);
            }
            StoredSession::Expired => {
                info!("Stored session expired, clearing conversations");
                self.daily.reset();
                self.pre_day.reset();
                return Ok(());
            }
            StoredSession::Absent => {}
        }

        for kind in ConversationKind::ALL {
            let chat = self.chat_mut(kind);
            chat.restored = chat.store.restore(now);
            if chat.restored {
                chat.notice_deadline = Some(Instant::now() + RESTORED_NOTICE_DURATION);
            }
        }
        Ok(())
    }

    /// Earliest pending restored-notice deadline across both conversations.
    pub fn next_notice_deadline(&self) -> Option<Instant> {
        ConversationKind::ALL
            .iter()
            .filter_map(|&kind| self.chat(kind).notice_deadline)
            .min()
    }

    /// Take down restored notices whose deadline has passed at `now`.
    /// Returns the conversations that changed.
    pub fn expire_notices(&mut self, now: Instant) -> Vec<ConversationKind> {
        let mut changed = Vec::new();
        for kind in ConversationKind::ALL {
            let chat = self.chat_mut(kind);
            if chat.notice_deadline.is_some_and(|d| d <= now) {
                chat.dismiss_notice();
                changed.push(kind);
            }
        }
        changed
    }

    /// Stop all background work before exit. Running reveals are settled so
    /// the last snapshot holds their full answers.
    pub fn shutdown(&mut self) {
        self.cancel_fetch();
        for kind in ConversationKind::ALL {
            let chat = self.chat_mut(kind);
            if let Some(task) = chat.request_task.take() {
                task.abort();
            }
            chat.settle_reveal();
            chat.reveal.cancel();
        }
    }

    /// Make `session` current and arm its expiry timer.
    fn activate_session(&mut self, session: AuthSession, now: DateTime<Utc>) {
        self.session_deadline = Some(Instant::now() + session.remaining(now));
        self.session = Some(session);
    }

    /// Cancel the in-flight prediction fetch, if any.
    pub fn cancel_fetch(&mut self) {
        if let Some(handle) = self.fetch_task.take() {
            handle.abort();
            debug!("Cancelled prediction fetch");
        }
    }

    /// Start a prediction fetch, superseding any in flight. Requires a
    /// session; returns whether a fetch was started.
    pub fn start_fetch(&mut self) -> bool {
        if self.session.is_none() {
            debug!("Ignoring prediction refresh while signed out");
            return false;
        }
        self.cancel_fetch();
        self.fetch_generation += 1;
        self.board.begin_loading();

        let generation = self.fetch_generation;
        let remote = Arc::clone(&self.remote);
        let tx = self.events_tx.clone();
        info!("Fetching predictions (gen {})", generation);
        self.fetch_task = Some(tokio::spawn(async move {
            let result = remote.fetch_predictions().await;
            let _ = tx.send(AppEvent::PredictionsFetched { generation, result }).await;
        }));
        true
    }

    /// Send credentials to the auth webhook. Validation is the caller's job.
    pub fn start_login(&mut self, email: String, password: String) {
        self.login_generation += 1;
        let generation = self.login_generation;
        let remote = Arc::clone(&self.remote);
        let tx = self.events_tx.clone();
        info!("Logging in as {}", email);
        tokio::spawn(async move {
            let result = remote.login(&email, &password).await;
            let _ = tx
                .send(AppEvent::LoginFinished {
                    generation,
                    email,
                    result,
                })
                .await;
        });
    }

    /// Ask `question` on the `kind` conversation.
    ///
    /// Appends the user turn and a pending assistant placeholder, then sends
    /// the request. Rejected while signed out, for blank questions, and
    /// while a previous question on the same conversation is still awaiting
    /// its answer. A reveal still running is settled first.
    pub fn ask(&mut self, kind: ConversationKind, question: &str) -> bool {
        let question = question.trim();
        if question.is_empty() {
            return false;
        }
        let Some(session) = self.session.as_ref() else {
            warn!("Ignoring question while signed out");
            return false;
        };
        let token = session.token_at(Utc::now()).map(str::to_string);
        let remote = Arc::clone(&self.remote);
        let tx = self.events_tx.clone();

        let chat = self.chat_mut(kind);
        if chat.awaiting.is_some() {
            debug!("{:?}: question already in flight, ignoring", kind);
            return false;
        }
        chat.settle_reveal();
        chat.dismiss_notice();

        chat.store.append(Role::User, question, false);
        let turn = chat.store.append(Role::Assistant, "", true);
        chat.request_generation += 1;
        chat.awaiting = Some(turn);

        let generation = chat.request_generation;
        let question = question.to_string();
        chat.request_task = Some(tokio::spawn(async move {
            let result = remote.ask(kind, &question, token.as_deref()).await;
            let _ = tx
                .send(AppEvent::ChatAnswered {
                    kind,
                    generation,
                    turn,
                    result,
                })
                .await;
        }));
        true
    }

    /// Sign out: forget the session, disarm its timer, drop predictions and
    /// clear both conversations.
    pub fn logout(&mut self) {
        if let Err(e) = self.sessions.clear() {
            warn!("Failed to clear stored session: {:#}", e);
        }
        self.session = None;
        self.session_deadline = None;
        self.login_generation += 1;

        self.cancel_fetch();
        self.fetch_generation += 1;
        self.board = PredictionBoard::default();

        self.daily.reset();
        self.pre_day.reset();
        info!("Logged out");
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens using `tokio::select!` on:
/// 1. Results from spawned network and reveal tasks
/// 2. User commands from the TUI
/// 3. The session expiry deadline, while signed in
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut event_rx: mpsc::Receiver<AppEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    if state.session.is_some() {
        state.start_fetch();
    }
    push_session(&state, &ui_tx).await;
    push_board(&state, &ui_tx).await;
    for kind in ConversationKind::ALL {
        push_conversation(&state, kind, &ui_tx).await;
    }

    let mut events_open = true;

    loop {
        let deadline = state.session_deadline;
        let notice_deadline = state.next_notice_deadline();

        tokio::select! {
            // --- Task results ---
            event = event_rx.recv(), if events_open => {
                match event {
                    Some(event) => handle_app_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Event channel closed");
                        events_open = false;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Session expiry ---
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                info!("Session expired");
                state.logout();
                push_logged_out(&state, &ui_tx).await;
            }

            // --- Restored-history notice ---
            _ = tokio::time::sleep_until(notice_deadline.unwrap_or_else(Instant::now)), if notice_deadline.is_some() => {
                for kind in state.expire_notices(Instant::now()) {
                    push_conversation(&state, kind, &ui_tx).await;
                }
            }
        }
    }

    state.shutdown();
    info!("Application event loop exiting");
    Ok(())
}

/// Handle a result reported by a spawned task.
async fn handle_app_event(state: &mut AppState, event: AppEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    match event {
        AppEvent::PredictionsFetched { generation, result } => {
            if generation != state.fetch_generation {
                debug!(
                    "Discarding stale prediction fetch (gen {}, current {})",
                    generation, state.fetch_generation
                );
                return;
            }
            state.fetch_task = None;
            match result {
                Ok(records) => {
                    info!("Loaded {} predictions", records.len());
                    state.board = PredictionBoard::loaded(records);
                }
                Err(e) => {
                    warn!("Prediction fetch failed: {}", e);
                    state.board.failed(e.to_string());
                }
            }
            push_board(state, ui_tx).await;
        }

        AppEvent::ChatAnswered {
            kind,
            generation,
            turn,
            result,
        } => {
            let tx = state.events_tx.clone();
            let chat = state.chat_mut(kind);
            if generation != chat.request_generation {
                debug!(
                    "{:?}: discarding stale answer (gen {}, current {})",
                    kind, generation, chat.request_generation
                );
                return;
            }
            chat.awaiting = None;
            chat.request_task = None;
            match result {
                Ok(answer) => {
                    chat.revealing = Some((turn, answer.clone()));
                    chat.reveal.start(turn, answer, tx);
                }
                Err(e) => {
                    warn!("{:?}: chat request failed: {}", kind, e);
                    chat.store.amend(turn, ERROR_ANSWER, false);
                }
            }
            push_conversation(state, kind, ui_tx).await;
        }

        AppEvent::LoginFinished {
            generation,
            email,
            result,
        } => {
            if generation != state.login_generation {
                debug!("Discarding stale login result (gen {})", generation);
                return;
            }
            match result {
                Ok(grant) => {
                    let session = AuthSession {
                        token: grant.token,
                        expiry: grant.expiry,
                        email,
                    };
                    if let Err(e) = state.sessions.persist(&session) {
                        warn!("Failed to persist session: {:#}", e);
                    }
                    info!("Logged in as {} until {}", session.email, session.expiry);
                    state.activate_session(session, Utc::now());
                    push_session(state, ui_tx).await;
                    state.start_fetch();
                    push_board(state, ui_tx).await;
                }
                Err(e) => {
                    warn!("Login failed: {}", e);
                    let _ = ui_tx.send(UiUpdate::LoginFailed(e.login_message())).await;
                }
            }
        }

        AppEvent::Reveal(frame) => handle_reveal_frame(state, frame, ui_tx).await,
    }
}

async fn handle_reveal_frame(
    state: &mut AppState,
    frame: RevealFrame,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let kind = frame.kind;
    let chat = state.chat_mut(kind);
    if !chat.reveal.is_current(&frame) {
        debug!("{:?}: discarding stale reveal frame (gen {})", kind, frame.generation);
        return;
    }
    chat.store.amend(frame.turn, frame.content, !frame.done);
    if frame.done {
        chat.revealing = None;
    }
    push_conversation(state, kind, ui_tx).await;
}

/// Handle a user command from the TUI.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Login { email, password } => {
            let min_len = state.config.auth.min_password_len;
            if let Err(errors) = validate_login(&email, &password, min_len) {
                debug!("Login blocked by validation: {:?}", errors);
                let _ = ui_tx.send(UiUpdate::LoginInvalid(errors)).await;
                return;
            }
            state.start_login(email.trim().to_string(), password);
            let _ = ui_tx.send(UiUpdate::LoginPending).await;
        }
        UserCommand::Logout => {
            state.logout();
            push_logged_out(state, ui_tx).await;
        }
        UserCommand::RefreshPredictions => {
            if state.start_fetch() {
                push_board(state, ui_tx).await;
            }
        }
        UserCommand::Ask { kind, question } => {
            if state.ask(kind, &question) {
                push_conversation(state, kind, ui_tx).await;
            }
        }
        UserCommand::ClearConversation(kind) => {
            state.chat_mut(kind).reset();
            push_conversation(state, kind, ui_tx).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

// ---------------------------------------------------------------------------
// UI pushes
// ---------------------------------------------------------------------------

async fn push_session(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx.send(UiUpdate::Session(state.session_info())).await;
}

async fn push_board(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Predictions(Box::new(state.board.clone())))
        .await;
}

async fn push_conversation(state: &AppState, kind: ConversationKind, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Conversation(Box::new(state.chat(kind).view())))
        .await;
}

async fn push_logged_out(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    push_session(state, ui_tx).await;
    push_board(state, ui_tx).await;
    for kind in ConversationKind::ALL {
        push_conversation(state, kind, ui_tx).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
