// Intake form: company name, sector, and size.

use std::fmt::Display;

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::{IntakeField, ViewState};

const LABEL_WIDTH: usize = 16;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let intake = &state.intake;
    let mut lines = vec![
        Line::styled(
            "Tell us about your company, then answer the assistant's questions.",
            Style::default().fg(Color::Gray),
        ),
        Line::styled(
            "Each answer is scored from 0 to 3 across the maturity dimensions.",
            Style::default().fg(Color::Gray),
        ),
        Line::raw(""),
        field_line(
            "Company name",
            name_value(&intake.name, intake.focus == IntakeField::Name),
            intake.focus == IntakeField::Name,
        ),
        field_line(
            "Sector",
            pick_value(intake.selected_sector()),
            intake.focus == IntakeField::Sector,
        ),
        field_line(
            "Company size",
            pick_value(intake.selected_size()),
            intake.focus == IntakeField::Size,
        ),
        Line::raw(""),
    ];

    if intake.status.submitting {
        lines.push(Line::styled(
            "Creating your session...",
            Style::default().fg(Color::Yellow),
        ));
    } else if let Some(error) = &intake.status.error {
        lines.push(Line::styled(
            error.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Company profile "));
    frame.render_widget(paragraph, area);
}

/// One labelled form row; the focused row gets a marker and highlight.
pub fn field_line(label: &str, value: String, focused: bool) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    let value_style = if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{:<width$}", format!("{label}:"), width = LABEL_WIDTH),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(value, value_style),
    ])
}

/// Name field text, with a cursor while it has focus.
pub fn name_value(name: &str, focused: bool) -> String {
    if focused {
        format!("{name}_")
    } else if name.is_empty() {
        "(required)".to_string()
    } else {
        name.to_string()
    }
}

/// Pick-list text with arrows hinting at Left/Right.
pub fn pick_value<T: Display>(selected: Option<T>) -> String {
    match selected {
        Some(value) => format!("◀ {value} ▶"),
        None => "◀ choose ▶".to_string(),
    }
}
