// Answer input line with character count.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use digiassist_core::session::FlowPhase;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let enabled = state.accepts_answer();
    let border_color = if enabled { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Your answer ")
        .title_bottom(Line::from(char_count(&state.answer_input)).alignment(Alignment::Right));
    let inner_width = usize::from(block.inner(area).width);

    let line = if state.answer_input.is_empty() && !enabled {
        Line::styled(
            placeholder(state),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )
    } else {
        let cursor = if enabled { "_" } else { "" };
        let shown = visible_tail(&state.answer_input, inner_width.saturating_sub(cursor.len()));
        Line::from(vec![
            Span::styled(shown, Style::default().fg(Color::White)),
            Span::styled(cursor, Style::default().fg(Color::Cyan)),
        ])
    };

    frame.render_widget(Paragraph::new(line).block(block), area);
}

pub fn char_count(input: &str) -> String {
    match input.chars().count() {
        1 => " 1 char ".to_string(),
        n => format!(" {n} chars "),
    }
}

fn placeholder(state: &ViewState) -> &'static str {
    match state.conversation.as_ref().map(|c| c.phase) {
        Some(FlowPhase::Completed) => "Diagnostic complete, opening results...",
        Some(FlowPhase::Errored(_)) => "Press Ctrl+R to retry",
        _ => "Waiting for the assistant...",
    }
}

/// Last `width` characters of `text`, so the cursor end stays visible.
pub fn visible_tail(text: &str, width: usize) -> String {
    let len = text.chars().count();
    text.chars().skip(len.saturating_sub(width)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tests::snapshot;

    #[test]
    fn char_count_pluralises() {
        assert_eq!(char_count(""), " 0 chars ");
        assert_eq!(char_count("é"), " 1 char ");
        assert_eq!(char_count("hello"), " 5 chars ");
    }

    #[test]
    fn visible_tail_keeps_end() {
        assert_eq!(visible_tail("abcdef", 3), "def");
        assert_eq!(visible_tail("ab", 10), "ab");
        assert_eq!(visible_tail("abc", 0), "");
    }

    #[test]
    fn placeholder_depends_on_phase() {
        let mut state = ViewState::default();
        state.conversation = Some(snapshot(FlowPhase::Completed, false, vec![]));
        assert!(placeholder(&state).starts_with("Diagnostic complete"));
        state.conversation = Some(snapshot(FlowPhase::Submitting, true, vec![]));
        assert_eq!(placeholder(&state), "Waiting for the assistant...");
    }

    #[test]
    fn render_shows_typed_text() {
        let backend = ratatui::backend::TestBackend::new(40, 3);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState {
            conversation: Some(snapshot(FlowPhase::AwaitingInput, false, vec![])),
            answer_input: "We use a CRM".into(),
            ..ViewState::default()
        };
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("We use a CRM_"));
        assert!(text.contains("12 chars"));
    }
}
