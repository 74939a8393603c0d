// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app loop, or into local ViewState mutations (form typing, screen
// switching, filters, selection, transcript scroll).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::chat::ConversationKind;
use crate::predictions::filter::{AccuracyBucket, ConfidenceLevel, ResultCategory};
use crate::protocol::UserCommand;
use super::{LoginField, Screen, ViewState};

const ACCURACY_CYCLE: &[AccuracyBucket] =
    &[AccuracyBucket::High, AccuracyBucket::Medium, AccuracyBucket::Low];

const CONFIDENCE_CYCLE: &[ConfidenceLevel] =
    &[ConfidenceLevel::High, ConfidenceLevel::Medium, ConfidenceLevel::Low];

const RESULT_CYCLE: &[ResultCategory] = &[
    ResultCategory::Win,
    ResultCategory::Loss,
    ResultCategory::Draw,
    ResultCategory::Correct,
    ResultCategory::Incorrect,
    ResultCategory::Pending,
];

const PARTIAL_DATA_CYCLE: &[&str] = &["Yes", "No"];

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app loop (e.g. Login, Ask, Quit). Returns `None` when the key press was
/// handled locally by mutating `ViewState`.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    match view_state.screen {
        Screen::Login => handle_login(key_event, view_state),
        Screen::Dashboard if view_state.filter_mode => handle_filter_mode(key_event, view_state),
        Screen::Dashboard => handle_dashboard(key_event, view_state),
        Screen::Chat => handle_chat(key_event, view_state, ConversationKind::Daily),
        Screen::PreDayChat => handle_chat(key_event, view_state, ConversationKind::PreDay),
    }
}

/// Handle key events while in quit confirmation mode.
///
/// `y`/`q` confirm, `n`/`Esc` cancel, everything else is blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

fn handle_login(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let form = &mut view_state.login;
    match key_event.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            form.focus = match form.focus {
                LoginField::Email => LoginField::Password,
                LoginField::Password => LoginField::Email,
            };
            None
        }
        KeyCode::Enter => {
            if form.pending {
                return None;
            }
            Some(UserCommand::Login {
                email: form.email.clone(),
                password: form.password.clone(),
            })
        }
        KeyCode::Backspace => {
            focused_field(form).pop();
            None
        }
        KeyCode::Esc => {
            view_state.confirm_quit = true;
            None
        }
        KeyCode::Char(c) => {
            focused_field(form).push(c);
            None
        }
        _ => None,
    }
}

fn focused_field(form: &mut super::LoginForm) -> &mut String {
    match form.focus {
        LoginField::Email => &mut form.email,
        LoginField::Password => &mut form.password,
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

fn handle_dashboard(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Tab => {
            next_screen(view_state);
            None
        }

        // Row selection
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.selected_row = view_state.selected_row.saturating_sub(1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.selected_row = view_state.selected_row.saturating_add(1);
            view_state.clamp_selection();
            None
        }
        KeyCode::PageUp => {
            view_state.selected_row = view_state.selected_row.saturating_sub(page_size());
            None
        }
        KeyCode::PageDown => {
            view_state.selected_row = view_state.selected_row.saturating_add(page_size());
            view_state.clamp_selection();
            None
        }

        // Filters
        KeyCode::Char('/') => {
            view_state.filter_mode = true;
            None
        }
        KeyCode::Char('d') => {
            let options = view_state.board.date_options();
            view_state.filter.date = cycle(&view_state.filter.date, &options);
            filter_changed(view_state);
            None
        }
        KeyCode::Char('l') => {
            let options = view_state.board.league_options();
            view_state.filter.league = cycle(&view_state.filter.league, &options);
            filter_changed(view_state);
            None
        }
        KeyCode::Char('a') => {
            view_state.filter.accuracy = cycle(&view_state.filter.accuracy, ACCURACY_CYCLE);
            filter_changed(view_state);
            None
        }
        KeyCode::Char('c') => {
            view_state.filter.confidence = cycle(&view_state.filter.confidence, CONFIDENCE_CYCLE);
            filter_changed(view_state);
            None
        }
        KeyCode::Char('p') => {
            let current = view_state.filter.partial_data.as_deref();
            view_state.filter.partial_data =
                cycle(&current, PARTIAL_DATA_CYCLE).map(String::from);
            filter_changed(view_state);
            None
        }
        KeyCode::Char('o') => {
            view_state.filter.result = cycle(&view_state.filter.result, RESULT_CYCLE);
            filter_changed(view_state);
            None
        }
        KeyCode::Char('x') | KeyCode::Esc => {
            view_state.filter = Default::default();
            filter_changed(view_state);
            None
        }

        KeyCode::Char('r') => Some(UserCommand::RefreshPredictions),
        KeyCode::Char('L') => Some(UserCommand::Logout),

        // Quit: enter confirmation mode instead of quitting immediately
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

/// Handle key events while typing the team search.
///
/// Printable characters are appended, Backspace removes the last one,
/// Enter keeps the text and Esc clears it.
fn handle_filter_mode(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.filter_mode = false;
            view_state.filter.team.clear();
        }
        KeyCode::Enter => {
            view_state.filter_mode = false;
        }
        KeyCode::Backspace => {
            view_state.filter.team.pop();
        }
        KeyCode::Char(c) => {
            view_state.filter.team.push(c);
        }
        _ => return None,
    }
    filter_changed(view_state);
    None
}

/// Step an optional filter through `options`:
/// None -> first -> ... -> last -> None. A value no longer among the
/// options also wraps to None.
fn cycle<T: Clone + PartialEq>(current: &Option<T>, options: &[T]) -> Option<T> {
    match current {
        None => options.first().cloned(),
        Some(value) => match options.iter().position(|o| o == value) {
            Some(i) if i + 1 < options.len() => Some(options[i + 1].clone()),
            _ => None,
        },
    }
}

fn filter_changed(view_state: &mut ViewState) {
    view_state.selected_row = 0;
    view_state.clamp_selection();
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

fn handle_chat(
    key_event: KeyEvent,
    view_state: &mut ViewState,
    kind: ConversationKind,
) -> Option<UserCommand> {
    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return match key_event.code {
            KeyCode::Char('n') => {
                view_state.pane_mut(kind).input.clear();
                reset_scroll(view_state, kind);
                Some(UserCommand::ClearConversation(kind))
            }
            _ => None,
        };
    }

    match key_event.code {
        KeyCode::Tab => {
            next_screen(view_state);
            None
        }
        KeyCode::Esc => {
            view_state.screen = Screen::Dashboard;
            None
        }
        KeyCode::Enter => {
            let pane = view_state.pane_mut(kind);
            if !pane.can_send() {
                return None;
            }
            let question = std::mem::take(&mut pane.input);
            reset_scroll(view_state, kind);
            Some(UserCommand::Ask { kind, question })
        }
        KeyCode::Backspace => {
            view_state.pane_mut(kind).input.pop();
            None
        }
        KeyCode::Up => {
            scroll_back(view_state, kind, 1);
            None
        }
        KeyCode::Down => {
            scroll_forward(view_state, kind, 1);
            None
        }
        KeyCode::PageUp => {
            scroll_back(view_state, kind, page_size());
            None
        }
        KeyCode::PageDown => {
            scroll_forward(view_state, kind, page_size());
            None
        }
        KeyCode::Char(c) => {
            view_state.pane_mut(kind).input.push(c);
            None
        }
        _ => None,
    }
}

/// Scroll key for a transcript. The offset counts lines back from the
/// newest line; zero follows the tail.
pub fn transcript_key(kind: ConversationKind) -> &'static str {
    match kind {
        ConversationKind::Daily => "chat",
        ConversationKind::PreDay => "pre_day_chat",
    }
}

fn scroll_back(view_state: &mut ViewState, kind: ConversationKind, lines: usize) {
    let offset = view_state
        .scroll_offset
        .entry(transcript_key(kind).to_string())
        .or_insert(0);
    *offset = offset.saturating_add(lines);
}

fn scroll_forward(view_state: &mut ViewState, kind: ConversationKind, lines: usize) {
    let offset = view_state
        .scroll_offset
        .entry(transcript_key(kind).to_string())
        .or_insert(0);
    *offset = offset.saturating_sub(lines);
}

fn reset_scroll(view_state: &mut ViewState, kind: ConversationKind) {
    view_state.scroll_offset.remove(transcript_key(kind));
}

/// Tab order among the signed-in screens.
fn next_screen(view_state: &mut ViewState) {
    let order = Screen::SIGNED_IN;
    let idx = order.iter().position(|s| *s == view_state.screen).unwrap_or(0);
    view_state.screen = order[(idx + 1) % order.len()];
}

/// Page size for PageUp/PageDown.
fn page_size() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
