// Inline error banner under the transcript.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(message) = banner_text(state) else {
        return;
    };
    let paragraph = Paragraph::new(Line::from(message)).style(
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(paragraph, area);
}

pub fn banner_text(state: &ViewState) -> Option<String> {
    let error = state.conversation.as_ref()?.error.as_deref()?;
    Some(format!(" ⚠ {error}  (Ctrl+R to retry)"))
}
