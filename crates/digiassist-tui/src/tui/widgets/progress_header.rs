// Conversation header: question counter and progress gauge.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Gauge};
use ratatui::Frame;

use digiassist_app::protocol::ConversationSnapshot;
use digiassist_core::session::{FlowPhase, Turn};

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (title, ratio, label) = match &state.conversation {
        Some(snapshot) => (
            question_label(snapshot),
            snapshot.progress.ratio(),
            gauge_label(snapshot),
        ),
        None => ("Opening session...".to_string(), 0.0, String::new()),
    };

    let gauge = Gauge::default()
        .block(
            Block::default().borders(Borders::ALL).title(Span::styled(
                format!(" {title} "),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
        )
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, area);
}

/// "Question n / total" for the most recent question.
pub fn question_label(snapshot: &ConversationSnapshot) -> String {
    if snapshot.phase == FlowPhase::Completed {
        return "Diagnostic complete".to_string();
    }
    let last_question = snapshot.turns.iter().rev().find_map(|turn| match turn {
        Turn::Question { index, total, .. } => Some((*index, *total)),
        _ => None,
    });
    match last_question {
        Some((index, total)) => format!("Question {index} / {total}"),
        None => "Loading first question...".to_string(),
    }
}

pub fn gauge_label(snapshot: &ConversationSnapshot) -> String {
    let progress = snapshot.progress;
    format!(
        "{}%  ({} of {} answered)",
        progress.rounded_percentage(),
        progress.current,
        progress.total
    )
}
