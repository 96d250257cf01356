// Key hints for the current screen.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use digiassist_app::protocol::Screen;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        hints(&state.screen),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

pub fn hints(screen: &Screen) -> &'static str {
    match screen {
        Screen::Intake => " Tab:Next field | ←/→:Choose | Enter:Start | Esc:Quit",
        Screen::Conversation { .. } => {
            " Enter:Send | Ctrl+R:Retry | ↑/↓ PgUp/PgDn:Scroll | End:Latest | Esc:Quit"
        }
        Screen::Results { .. } => " d:Download report | n:New diagnostic | r:Reload | ↑/↓:Scroll | q:Quit",
    }
}
