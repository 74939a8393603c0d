// Login form: email and password fields with inline validation errors,
// the server's failure message and a pending indicator.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;
use crate::tui::{LoginField, LoginForm};

const FORM_WIDTH: u16 = 56;
const FORM_HEIGHT: u16 = 12;

pub fn render(frame: &mut Frame, area: Rect, form: &LoginForm) {
    let form_area = centered_rect(FORM_WIDTH, FORM_HEIGHT, area);
    frame.render_widget(Clear, form_area);

    let border = if form.pending {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let paragraph = Paragraph::new(form_lines(form)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(Span::styled(
                " Sign in ",
                Style::default().add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(paragraph, form_area);
}

/// The form body, one field per line followed by its error (if any).
pub fn form_lines(form: &LoginForm) -> Vec<Line<'static>> {
    let masked = "*".repeat(form.password.chars().count());
    let mut lines = vec![Line::from("")];

    lines.push(field_line(
        "Email",
        form.email.clone(),
        form.focus == LoginField::Email,
    ));
    lines.push(error_line(form.errors.email.as_deref()));
    lines.push(field_line(
        "Password",
        masked,
        form.focus == LoginField::Password,
    ));
    lines.push(error_line(form.errors.password.as_deref()));
    lines.push(Line::from(""));

    if form.pending {
        lines.push(Line::from(Span::styled(
            "  Signing in...",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(ref failure) = form.failure {
        lines.push(Line::from(Span::styled(
            format!("  {failure}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "  Press Enter to sign in",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn field_line(label: &str, value: String, focused: bool) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    let mut spans = vec![
        Span::styled(format!("{marker}{label:<9}"), label_style),
        Span::raw(value),
    ];
    if focused {
        spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }
    Line::from(spans)
}

fn error_line(error: Option<&str>) -> Line<'static> {
    match error {
        Some(message) => Line::from(Span::styled(
            format!("           {message}"),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(""),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LoginErrors;

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn password_is_masked() {
        let form = LoginForm {
            email: "fan@club.com".into(),
            password: "secret1".into(),
            ..Default::default()
        };
        let rendered = text(&form_lines(&form));
        assert!(rendered.contains("fan@club.com"));
        assert!(rendered.contains("*******"));
        assert!(!rendered.contains("secret1"));
    }

    #[test]
    fn errors_are_shown_under_fields() {
        let form = LoginForm {
            errors: LoginErrors {
                email: Some("Email is required".into()),
                password: Some("Password must be at least 6 characters".into()),
            },
            ..Default::default()
        };
        let rendered = text(&form_lines(&form));
        assert!(rendered.contains("Email is required"));
        assert!(rendered.contains("Password must be at least 6 characters"));
    }

    #[test]
    fn pending_replaces_failure_message() {
        let mut form = LoginForm {
            failure: Some("Invalid credentials".into()),
            ..Default::default()
        };
        assert!(text(&form_lines(&form)).contains("Invalid credentials"));
        form.pending = true;
        let rendered = text(&form_lines(&form));
        assert!(rendered.contains("Signing in..."));
        assert!(!rendered.contains("Invalid credentials"));
    }

    #[test]
    fn render_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(80, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let form = LoginForm::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &form))
            .unwrap();
    }
}
