// Chat screen: the conversation transcript and the question input.
//
// The transcript follows the newest line unless the user has scrolled back
// (`scroll_offset` counts lines back from the tail). A pending assistant
// turn shows a typing indicator until its reveal begins.

use chrono::Local;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::chat::conversation::{ConversationTurn, Role};
use crate::chat::ConversationKind;
use crate::tui::input::transcript_key;
use crate::tui::layout::chat_layout;
use crate::tui::{ChatPane, ViewState};

/// Shown above turns that were restored from local storage.
pub const RESTORED_NOTICE: &str = "Messages loaded from recent chat history";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, kind: ConversationKind) {
    let layout = chat_layout(area);
    let pane = state.pane(kind);
    let back = state
        .scroll_offset
        .get(transcript_key(kind))
        .copied()
        .unwrap_or(0);

    render_transcript(frame, layout.transcript, pane, back);
    render_input(frame, layout.input, pane);
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Transcript lines for a pane, including the restored notice and the
/// empty-conversation greeting.
pub fn transcript_lines(pane: &ChatPane) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if pane.view.restored && !pane.view.turns.is_empty() {
        lines.push(Line::from(Span::styled(
            RESTORED_NOTICE,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(""));
    }

    if pane.view.turns.is_empty() {
        lines.push(Line::from(Span::styled(
            greeting(pane.view.kind),
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    for turn in &pane.view.turns {
        lines.extend(turn_lines(turn));
        lines.push(Line::from(""));
    }
    lines
}

fn greeting(kind: ConversationKind) -> &'static str {
    match kind {
        ConversationKind::Daily => "Ask anything about today's matches and predictions.",
        ConversationKind::PreDay => "Ask about upcoming fixtures before match day.",
    }
}

fn turn_lines(turn: &ConversationTurn) -> Vec<Line<'static>> {
    let (speaker, color) = match turn.role {
        Role::User => ("You", Color::Cyan),
        Role::Assistant => ("Assistant", Color::Green),
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(
            speaker,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", turn.timestamp.with_timezone(&Local).format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    if turn.pending && turn.content.is_empty() {
        lines.push(Line::from(Span::styled(
            "typing...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )));
        return lines;
    }

    let mut body: Vec<Line<'static>> = turn
        .content
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    if body.is_empty() {
        body.push(Line::from(""));
    }
    if turn.pending {
        if let Some(last) = body.last_mut() {
            last.spans.push(Span::styled("▌", Style::default().fg(Color::Yellow)));
        }
    }
    lines.extend(body);
    lines
}

/// Rows `lines` occupy when wrapped to `width` columns.
pub fn wrapped_line_count(lines: &[Line], width: u16) -> usize {
    let width = usize::from(width.max(1));
    lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum()
}

/// First row to show so the view ends `back` rows before the tail.
pub fn scroll_position(total: usize, height: usize, back: usize) -> usize {
    let max_scroll = total.saturating_sub(height);
    max_scroll.saturating_sub(back)
}

fn render_transcript(frame: &mut Frame, area: Rect, pane: &ChatPane, back: usize) {
    let lines = transcript_lines(pane);
    let inner_width = area.width.saturating_sub(2);
    let inner_height = usize::from(area.height.saturating_sub(2));
    let total = wrapped_line_count(&lines, inner_width);
    let scroll = scroll_position(total, inner_height, back);

    let title = if pane.view.waiting {
        format!("{} -- waiting for answer", pane.view.kind.title())
    } else {
        pane.view.kind.title().to_string()
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn render_input(frame: &mut Frame, area: Rect, pane: &ChatPane) {
    let (title, border) = if pane.view.waiting {
        ("Waiting for answer...", Style::default().fg(Color::DarkGray))
    } else {
        ("Ask a question", Style::default().fg(Color::Cyan))
    };

    let line = Line::from(vec![
        Span::raw(pane.input.clone()),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]);

    // Keep the end of a long question in view.
    let inner_width = usize::from(area.width.saturating_sub(2));
    let overflow = line.width().saturating_sub(inner_width);

    let paragraph = Paragraph::new(line)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border),
        )
        .scroll((0, u16::try_from(overflow).unwrap_or(u16::MAX)));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::conversation::TurnId;
    use crate::tui::Screen;
    use chrono::Utc;

    fn turn(id: u64, role: Role, content: &str, pending: bool) -> ConversationTurn {
        ConversationTurn {
            id: TurnId(id),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            pending,
        }
    }

    fn text(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn pane_with(turns: Vec<ConversationTurn>) -> ChatPane {
        let mut state = ViewState::default();
        state.daily.view.turns = turns;
        state.daily
    }

    #[test]
    fn empty_conversation_shows_greeting() {
        let pane = pane_with(Vec::new());
        let lines = text(&transcript_lines(&pane));
        assert_eq!(lines, vec![greeting(ConversationKind::Daily).to_string()]);
    }

    #[test]
    fn restored_notice_only_with_turns() {
        let mut pane = pane_with(vec![turn(0, Role::User, "hi", false)]);
        pane.view.restored = true;
        assert_eq!(text(&transcript_lines(&pane))[0], RESTORED_NOTICE);

        let mut empty = pane_with(Vec::new());
        empty.view.restored = true;
        assert!(!text(&transcript_lines(&empty)).contains(&RESTORED_NOTICE.to_string()));
    }

    #[test]
    fn pending_empty_assistant_shows_typing() {
        let pane = pane_with(vec![
            turn(0, Role::User, "What is the score?", false),
            turn(1, Role::Assistant, "", true),
        ]);
        let lines = text(&transcript_lines(&pane));
        assert!(lines.contains(&"What is the score?".to_string()));
        assert!(lines.contains(&"typing...".to_string()));
    }

    #[test]
    fn revealing_turn_has_cursor() {
        let pane = pane_with(vec![turn(1, Role::Assistant, "2-", true)]);
        let lines = text(&transcript_lines(&pane));
        assert!(lines.contains(&"2-▌".to_string()));

        let pane = pane_with(vec![turn(1, Role::Assistant, "2-1", false)]);
        let lines = text(&transcript_lines(&pane));
        assert!(lines.contains(&"2-1".to_string()));
    }

    #[test]
    fn multi_line_answers_keep_their_lines() {
        let pane = pane_with(vec![turn(1, Role::Assistant, "line one\nline two", false)]);
        let lines = text(&transcript_lines(&pane));
        assert!(lines.contains(&"line one".to_string()));
        assert!(lines.contains(&"line two".to_string()));
    }

    #[test]
    fn wrapped_line_count_accounts_for_width() {
        let lines = vec![Line::from("a".repeat(25)), Line::from(""), Line::from("short")];
        assert_eq!(wrapped_line_count(&lines, 10), 3 + 1 + 1);
        assert_eq!(wrapped_line_count(&lines, 0), 25 + 1 + 5);
    }

    #[test]
    fn scroll_position_follows_tail() {
        assert_eq!(scroll_position(50, 10, 0), 40);
        assert_eq!(scroll_position(50, 10, 15), 25);
        assert_eq!(scroll_position(50, 10, 100), 0);
        assert_eq!(scroll_position(5, 10, 0), 0);
    }

    #[test]
    fn render_chat_screens() {
        for kind in ConversationKind::ALL {
            let backend = ratatui::backend::TestBackend::new(80, 20);
            let mut terminal = ratatui::Terminal::new(backend).unwrap();
            let mut state = ViewState::default();
            state.screen = Screen::Chat;
            state.pane_mut(kind).view.turns = vec![
                turn(0, Role::User, "What is the score?", false),
                turn(1, Role::Assistant, "", true),
            ];
            state.pane_mut(kind).view.waiting = true;
            terminal
                .draw(|frame| render(frame, frame.area(), &state, kind))
                .unwrap();
            let content: String = terminal
                .backend()
                .buffer()
                .content()
                .iter()
                .map(|c| c.symbol())
                .collect();
            assert!(content.contains("Waiting for answer..."));
            assert!(content.contains("typing..."));
        }
    }
}
