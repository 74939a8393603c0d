// Screen layout: panel arrangement and sizing.
//
// Every screen shares the outer frame:
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Body (screen-specific)                            |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+
//
// The dashboard body splits into stat cards, a filter line, the table and
// a detail pane for the selected row. Chat bodies split into the
// transcript and a 3-row input box.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas shared by every screen.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: screen tabs and the signed-in user.
    pub status_bar: Rect,
    /// Everything between the status and help bars.
    pub body: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

/// Build the outer layout from the available terminal area.
pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(5),    // body
            Constraint::Length(1), // help bar
        ])
        .split(area);

    AppLayout {
        status_bar: vertical[0],
        body: vertical[1],
        help_bar: vertical[2],
    }
}

/// Areas inside the dashboard body.
#[derive(Debug, Clone)]
pub struct DashboardLayout {
    /// Summary stat cards.
    pub stats: Rect,
    /// Active filter summary.
    pub filters: Rect,
    /// Left: the predictions table.
    pub table: Rect,
    /// Right: reasons and analytics for the selected row.
    pub detail: Rect,
}

pub fn dashboard_layout(body: Rect) -> DashboardLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // stat cards
            Constraint::Length(1), // filters
            Constraint::Min(5),    // table + detail
        ])
        .split(body);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(vertical[2]);

    DashboardLayout {
        stats: vertical[0],
        filters: vertical[1],
        table: horizontal[0],
        detail: horizontal[1],
    }
}

/// Areas inside a chat body.
#[derive(Debug, Clone)]
pub struct ChatLayout {
    pub transcript: Rect,
    pub input: Rect,
}

pub fn chat_layout(body: Rect) -> ChatLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(body);

    ChatLayout {
        transcript: vertical[0],
        input: vertical[1],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// A reasonable terminal size for testing.
    fn test_area() -> Rect {
        Rect::new(0, 0, 120, 40)
    }

    #[test]
    fn layout_all_rects_nonzero() {
        let layout = build_layout(test_area());
        let rects = [
            ("status_bar", layout.status_bar),
            ("body", layout.body),
            ("help_bar", layout.help_bar),
        ];
        for (name, rect) in rects {
            assert!(rect.width > 0, "{name} has zero width");
            assert!(rect.height > 0, "{name} has zero height");
        }
    }

    #[test]
    fn layout_fixed_heights() {
        let layout = build_layout(test_area());
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.help_bar.height, 1);
        assert_eq!(layout.body.height, 38);
    }

    #[test]
    fn layout_status_bar_at_top_help_at_bottom() {
        let area = test_area();
        let layout = build_layout(area);
        assert_eq!(layout.status_bar.y, area.y);
        assert_eq!(layout.help_bar.y + layout.help_bar.height, area.y + area.height);
    }

    #[test]
    fn dashboard_table_wider_than_detail() {
        let layout = dashboard_layout(build_layout(test_area()).body);
        assert!(layout.table.width > layout.detail.width);
        assert_eq!(layout.table.height, layout.detail.height);
        assert_eq!(layout.stats.height, 3);
        assert_eq!(layout.filters.height, 1);
        assert_eq!(layout.table.width + layout.detail.width, 120);
    }

    #[test]
    fn chat_input_is_three_rows_below_transcript() {
        let body = build_layout(test_area()).body;
        let layout = chat_layout(body);
        assert_eq!(layout.input.height, 3);
        assert_eq!(layout.transcript.height + layout.input.height, body.height);
        assert!(layout.input.y > layout.transcript.y);
    }

    #[test]
    fn layout_small_terminal() {
        let area = Rect::new(0, 0, 40, 12);
        let layout = build_layout(area);
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.help_bar.height, 1);
        let dash = dashboard_layout(layout.body);
        assert!(dash.table.width > 0);
    }
}
