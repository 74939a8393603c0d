// Status bar widget: screen tabs and the signed-in user.

use chrono::{DateTime, Local, Utc};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::protocol::SessionInfo;
use crate::tui::{Screen, ViewState};

/// Render the status bar into the given area.
///
/// Layout: [app name] [screen tabs] | [session]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::styled(
        " matchday ",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];

    if state.session.is_some() {
        spans.extend(tab_spans(state.screen));
    }

    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    spans.push(session_span(state.session.as_ref()));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Tab indicator spans with the active screen highlighted.
/// E.g. "[Predictions] [Chat] [Pre-Day Chat]"
pub fn tab_spans(active: Screen) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for screen in Screen::SIGNED_IN {
        let style = if screen == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{}]", screen.label()), style));
        spans.push(Span::raw(" "));
    }
    spans
}

fn session_span(session: Option<&SessionInfo>) -> Span<'static> {
    match session {
        Some(info) => Span::styled(
            format!("{} (until {})", info.email, format_expiry(info.expiry)),
            Style::default().fg(Color::Green),
        ),
        None => Span::styled("signed out", Style::default().fg(Color::DarkGray)),
    }
}

/// Expiry in local time, e.g. "Aug 17 14:00".
pub fn format_expiry(expiry: DateTime<Utc>) -> String {
    expiry.with_timezone(&Local).format("%b %d %H:%M").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
