// Predictions dashboard: stat cards, active filters, the predictions table
// and a detail pane for the selected row.
//
// Table columns: Kickoff, Fixture, League, Score, Acc%, Conf, Result.
// Accuracy is coloured by bucket (high green, medium yellow, low red).

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;

use crate::predictions::filter::{AccuracyBucket, ResultCategory};
use crate::predictions::record::PredictionRecord;
use crate::predictions::stats::PredictionStats;
use crate::predictions::FetchStatus;
use crate::tui::layout::dashboard_layout;
use crate::tui::ViewState;

/// Render the dashboard into the body area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let layout = dashboard_layout(area);

    render_stats(frame, layout.stats, &state.board.stats);
    render_filters(frame, layout.filters, state);

    match state.board.status {
        FetchStatus::Loading if state.board.records.is_empty() => {
            render_message(
                frame,
                layout.table,
                "Loading predictions...",
                Color::Yellow,
            );
        }
        FetchStatus::Failed(ref message) => {
            render_message(
                frame,
                layout.table,
                &format!("Error loading predictions: {message}\nPress r to try again."),
                Color::Red,
            );
        }
        _ => {
            let visible = state.board.visible(&state.filter);
            render_table(frame, layout.table, state, &visible);
            let selected = visible.get(state.selected_row).copied();
            render_detail(frame, layout.detail, selected);
            return;
        }
    }
    render_detail(frame, layout.detail, None);
}

// ---------------------------------------------------------------------------
// Stat cards
// ---------------------------------------------------------------------------

/// The four summary cards: (label, value).
pub fn stat_cards(stats: &PredictionStats) -> [(&'static str, String); 4] {
    [
        ("Total Matches", stats.total_matches.to_string()),
        ("Avg Accuracy", format!("{}%", stats.average_accuracy)),
        ("High Accuracy", stats.high_accuracy_matches.to_string()),
        ("Leagues", stats.unique_leagues.to_string()),
    ]
}

fn render_stats(frame: &mut Frame, area: Rect, stats: &PredictionStats) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for (card, (label, value)) in columns.iter().zip(stat_cards(stats)) {
        let paragraph = Paragraph::new(Line::from(vec![
            Span::styled(
                value,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL).title(label));
        frame.render_widget(paragraph, *card);
    }
}

fn render_filters(frame: &mut Frame, area: Rect, state: &ViewState) {
    let parts = state.filter.describe();
    let mut spans = vec![Span::styled(" Filters: ", Style::default().fg(Color::Gray))];
    if parts.is_empty() && !state.filter_mode {
        spans.push(Span::styled("none", Style::default().fg(Color::DarkGray)));
    } else {
        spans.push(Span::styled(parts.join("  "), Style::default().fg(Color::Yellow)));
    }
    if state.filter_mode {
        spans.push(Span::styled(
            format!("  team search: {}_", state.filter.team),
            Style::default().fg(Color::Cyan),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

fn render_table(frame: &mut Frame, area: Rect, state: &ViewState, visible: &[&PredictionRecord]) {
    let header = Row::new(vec![
        Cell::from("Kickoff"),
        Cell::from("Fixture"),
        Cell::from("League"),
        Cell::from("Score"),
        Cell::from("Acc%"),
        Cell::from("Conf"),
        Cell::from("Result"),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = visible
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(format_kickoff(r)),
                Cell::from(r.fixture_label()),
                Cell::from(r.league.clone()),
                Cell::from(r.predicted_score.clone().unwrap_or_else(|| "-".into())),
                Cell::from(format!("{:.0}", r.prediction_accuracy))
                    .style(Style::default().fg(accuracy_color(r.prediction_accuracy))),
                Cell::from(r.confidence().unwrap_or_else(|| "-".into())),
                Cell::from(result_label(r)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(16),
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Length(7),
        Constraint::Length(10),
    ];

    let title = if visible.is_empty() {
        empty_title(state)
    } else {
        format!("Predictions ({}/{})", visible.len(), state.board.records.len())
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">> ");

    let mut table_state = TableState::default();
    if !visible.is_empty() {
        table_state.select(Some(state.selected_row.min(visible.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn empty_title(state: &ViewState) -> String {
    if state.board.records.is_empty() {
        "No predictions available".to_string()
    } else {
        "No predictions match the current filters".to_string()
    }
}

/// Colour for an accuracy value by bucket.
pub fn accuracy_color(accuracy: f64) -> Color {
    match AccuracyBucket::of(accuracy) {
        AccuracyBucket::High => Color::Green,
        AccuracyBucket::Medium => Color::Yellow,
        AccuracyBucket::Low => Color::Red,
    }
}

/// Kickoff as "Aug 17 15:00" in the record's own offset, "-" when unknown.
pub fn format_kickoff(record: &PredictionRecord) -> String {
    match record.kickoff() {
        Some(kickoff) => kickoff.format("%b %d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

fn result_label(record: &PredictionRecord) -> String {
    match ResultCategory::classify(record.result_text()) {
        ResultCategory::Other => record.result_text().trim().to_uppercase(),
        category => category.label().to_string(),
    }
}

fn render_message(frame: &mut Frame, area: Rect, message: &str, color: Color) {
    let paragraph = Paragraph::new(message.to_string())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Predictions"));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Detail pane
// ---------------------------------------------------------------------------

/// Lines describing one prediction: outcome, reasons and analytics.
pub fn detail_lines(record: &PredictionRecord) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(record.fixture_label(), bold.fg(Color::Cyan))),
        Line::from(format!(
            "{}{}",
            record.league,
            record
                .country
                .as_deref()
                .map(|c| format!(" ({c})"))
                .unwrap_or_default()
        )),
        Line::from(vec![
            Span::raw("Accuracy: "),
            Span::styled(
                format!("{:.0}%", record.prediction_accuracy),
                Style::default().fg(accuracy_color(record.prediction_accuracy)),
            ),
            Span::raw(format!(
                "  Partial data: {}",
                non_empty(record.partial_data_text())
            )),
        ]),
    ];

    let sections = [
        ("Predicted winner", record.prediction_win_team.as_deref()),
        ("Predicted loser", record.prediction_loss_team.as_deref()),
        ("Why they win", record.reason_for_win.as_deref()),
        ("Why they lose", record.reason_for_loss.as_deref()),
        ("Analytics", record.overall_analytics.as_deref()),
    ];
    for (label, value) in sections {
        if let Some(text) = value.filter(|t| !t.trim().is_empty()) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(label.to_string(), bold)));
            lines.push(Line::from(text.to_string()));
        }
    }
    lines
}

fn non_empty(text: &str) -> &str {
    if text.trim().is_empty() {
        "-"
    } else {
        text
    }
}

fn render_detail(frame: &mut Frame, area: Rect, record: Option<&PredictionRecord>) {
    let lines = match record {
        Some(r) => detail_lines(r),
        None => vec![Line::from(Span::styled(
            "No match selected",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Details"));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
