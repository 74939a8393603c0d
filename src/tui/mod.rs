// Terminal UI: screens, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the app loop pushes over the
// `UiUpdate` channel, plus purely local state (form fields, filters, scroll
// offsets). It applies updates as they arrive and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::collections::HashMap;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::auth::LoginErrors;
use crate::chat::ConversationKind;
use crate::predictions::filter::PredictionFilter;
use crate::predictions::PredictionBoard;
use crate::protocol::{ConversationView, SessionInfo, UiUpdate, UserCommand};

use layout::{build_layout, AppLayout};

// ---------------------------------------------------------------------------
// Screens and form state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
    Chat,
    PreDayChat,
}

impl Screen {
    /// Signed-in screens in Tab order.
    pub const SIGNED_IN: [Screen; 3] = [Screen::Dashboard, Screen::Chat, Screen::PreDayChat];

    /// The conversation shown on this screen, if any.
    pub fn conversation(self) -> Option<ConversationKind> {
        match self {
            Screen::Chat => Some(ConversationKind::Daily),
            Screen::PreDayChat => Some(ConversationKind::PreDay),
            Screen::Login | Screen::Dashboard => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Dashboard => "Predictions",
            Screen::Chat => "Chat",
            Screen::PreDayChat => "Pre-Day Chat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

/// Login form contents and feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    /// Inline validation messages.
    pub errors: LoginErrors,
    /// Message from a rejected or failed request.
    pub failure: Option<String>,
    pub pending: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        LoginForm {
            email: String::new(),
            password: String::new(),
            focus: LoginField::Email,
            errors: LoginErrors::default(),
            failure: None,
            pending: false,
        }
    }
}

/// One chat screen: the pushed conversation plus the local input line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPane {
    pub view: ConversationView,
    pub input: String,
}

impl ChatPane {
    fn new(kind: ConversationKind) -> Self {
        ChatPane {
            view: ConversationView {
                kind,
                turns: Vec::new(),
                waiting: false,
                restored: false,
            },
            input: String::new(),
        }
    }

    /// The input accepts a new question.
    pub fn can_send(&self) -> bool {
        !self.view.waiting && !self.input.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the application state for rendering.
///
/// Updated incrementally via `UiUpdate` messages from the app loop. The
/// `render_frame` function reads this struct to draw the active screen.
pub struct ViewState {
    pub screen: Screen,
    pub session: Option<SessionInfo>,
    pub login: LoginForm,
    pub board: PredictionBoard,
    pub filter: PredictionFilter,
    /// Typing into the team search.
    pub filter_mode: bool,
    /// Selected row within the visible (filtered) predictions.
    pub selected_row: usize,
    pub daily: ChatPane,
    pub pre_day: ChatPane,
    /// Per-widget scroll offsets (keyed by widget name).
    pub scroll_offset: HashMap<String, usize>,
    pub confirm_quit: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            screen: Screen::Login,
            session: None,
            login: LoginForm::default(),
            board: PredictionBoard::default(),
            filter: PredictionFilter::default(),
            filter_mode: false,
            selected_row: 0,
            daily: ChatPane::new(ConversationKind::Daily),
            pre_day: ChatPane::new(ConversationKind::PreDay),
            scroll_offset: HashMap::new(),
            confirm_quit: false,
        }
    }
}

impl ViewState {
    pub fn pane(&self, kind: ConversationKind) -> &ChatPane {
        match kind {
            ConversationKind::Daily => &self.daily,
            ConversationKind::PreDay => &self.pre_day,
        }
    }

    pub fn pane_mut(&mut self, kind: ConversationKind) -> &mut ChatPane {
        match kind {
            ConversationKind::Daily => &mut self.daily,
            ConversationKind::PreDay => &mut self.pre_day,
        }
    }

    /// Number of rows visible under the current filter.
    pub fn visible_count(&self) -> usize {
        self.board.visible(&self.filter).len()
    }

    /// Keep the selected row inside the visible set.
    pub fn clamp_selection(&mut self) {
        let count = self.visible_count();
        self.selected_row = self.selected_row.min(count.saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Session(Some(info)) => {
            state.session = Some(info);
            state.login.pending = false;
            state.login.password.clear();
            state.login.failure = None;
            if state.screen == Screen::Login {
                state.screen = Screen::Dashboard;
            }
        }
        UiUpdate::Session(None) => {
            state.session = None;
            state.screen = Screen::Login;
            state.login.pending = false;
            state.filter_mode = false;
            state.daily.input.clear();
            state.pre_day.input.clear();
        }
        UiUpdate::LoginPending => {
            state.login.pending = true;
            state.login.errors = LoginErrors::default();
            state.login.failure = None;
        }
        UiUpdate::LoginInvalid(errors) => {
            state.login.pending = false;
            state.login.errors = errors;
        }
        UiUpdate::LoginFailed(message) => {
            state.login.pending = false;
            state.login.failure = Some(message);
        }
        UiUpdate::Predictions(board) => {
            state.board = *board;
            state.clamp_selection();
        }
        UiUpdate::Conversation(view) => {
            let pane = state.pane_mut(view.kind);
            pane.view = *view;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete frame for the active screen.
fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    match state.screen.conversation() {
        Some(kind) => widgets::chat::render(frame, layout.body, state, kind),
        None if state.screen == Screen::Login => {
            widgets::login::render(frame, layout.body, &state.login)
        }
        None => widgets::dashboard::render(frame, layout.body, state),
    }
    render_help_bar(frame, &layout, state);

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

/// Keyboard hints for the active screen.
pub fn help_text(state: &ViewState) -> &'static str {
    if state.filter_mode {
        return " type to search teams | Enter:Keep | Esc:Clear";
    }
    match state.screen {
        Screen::Login => " Tab:Next field | Enter:Login | Esc:Quit",
        Screen::Dashboard => {
            " Tab:Screen | j/k:Select | /:Team | d:Date l:League a:Accuracy c:Confidence p:Partial o:Result | x:Clear | r:Refresh | L:Logout | q:Quit"
        }
        Screen::Chat | Screen::PreDayChat => {
            " Tab:Screen | Enter:Send | PgUp/PgDn:Scroll | Ctrl+N:New chat | Esc:Back"
        }
    }
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(state),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (enters raw mode, enables alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            // UI updates from the app loop
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // App is shutting down
                    None => break Ok(()),
                }
            }

            // Keyboard input
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(anyhow::Error::from(e)),
                    None => break Ok(()),
                }
            }

            // Render tick
            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(anyhow::Error::from(e));
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
