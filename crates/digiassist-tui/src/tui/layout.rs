// Screen layouts: panel arrangement and sizing.
//
// Conversation screen:
//
// +--------------------------------------------------+
// | Header: question counter + progress gauge (3)     |
// +--------------------------------------------------+
// | Transcript (fill)                                  |
// +--------------------------------------------------+
// | Error banner (1 row)                               |
// +--------------------------------------------------+
// | Answer input (3 rows)                              |
// +--------------------------------------------------+
// | Help Bar (1 row)                                   |
// +--------------------------------------------------+
//
// Intake and results screens use a title row, a body, and the help bar.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved areas of the conversation screen.
#[derive(Debug, Clone)]
pub struct ConversationLayout {
    pub header: Rect,
    pub transcript: Rect,
    pub banner: Rect,
    pub input: Rect,
    pub help_bar: Rect,
}

/// Resolved areas of the intake and results screens.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub title: Rect,
    pub body: Rect,
    pub help_bar: Rect,
}

pub fn conversation_layout(area: Rect) -> ConversationLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(3),    // transcript
            Constraint::Length(1), // error banner
            Constraint::Length(3), // input
            Constraint::Length(1), // help bar
        ])
        .split(area);

    ConversationLayout {
        header: vertical[0],
        transcript: vertical[1],
        banner: vertical[2],
        input: vertical[3],
        help_bar: vertical[4],
    }
}

pub fn page_layout(area: Rect) -> PageLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    PageLayout {
        title: vertical[0],
        body: vertical[1],
        help_bar: vertical[2],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
