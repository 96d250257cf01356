// One-row title bar for the intake and results screens.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub const APP_NAME: &str = "DigiAssist";

pub fn render(frame: &mut Frame, area: Rect, subtitle: &str) {
    let paragraph = Paragraph::new(title_line(subtitle)).style(Style::default().bg(Color::Blue));
    frame.render_widget(paragraph, area);
}

pub fn title_line(subtitle: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {APP_NAME} "),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("| ", Style::default().fg(Color::Gray)),
        Span::styled(subtitle.to_string(), Style::default().fg(Color::White)),
    ])
}
