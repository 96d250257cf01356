// Conversation transcript: questions, answers, and feedback in order.
//
// Text is wrapped here rather than by `Paragraph` so the line count is known
// and the view can follow the newest turn or scroll back.

use chrono::Local;
use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};
use ratatui::Frame;

use digiassist_core::session::{AnswerStatus, Score, Turn};

use crate::tui::ViewState;

const INDENT: &str = "  ";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title(" Conversation ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Leave one column for the scrollbar and one for the indent.
    let text_width = usize::from(inner.width)
        .saturating_sub(INDENT.len() + 1)
        .max(1);

    let mut lines: Vec<Line<'static>> = Vec::new();
    if let Some(snapshot) = &state.conversation {
        for turn in &snapshot.turns {
            lines.extend(turn_lines(turn, text_width));
        }
    }
    if state.assistant_typing() {
        lines.push(Line::styled(
            typing_indicator(state.tick),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ));
    }

    let total = lines.len();
    let height = usize::from(inner.height);
    let (start, end) = visible_window(total, height, state.transcript_scroll);
    let visible: Vec<Line<'static>> = lines.into_iter().skip(start).take(end - start).collect();
    frame.render_widget(Paragraph::new(visible), inner);

    if total > height {
        let mut scrollbar_state = ScrollbarState::new(total.saturating_sub(height)).position(start);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

/// Display lines for one turn, followed by a spacer line.
pub fn turn_lines(turn: &Turn, width: usize) -> Vec<Line<'static>> {
    let time = turn.at().with_timezone(&Local).format("%H:%M").to_string();
    let time_style = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    let body_style = match turn {
        Turn::Question { index, total, .. } => {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("Assistant · Question {index}/{total}"),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {time}"), time_style),
            ]));
            Style::default().fg(Color::White)
        }
        Turn::Answer { status, .. } => {
            let mut header = vec![
                Span::styled(
                    "You",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {time}"), time_style),
            ];
            match status {
                AnswerStatus::Pending => header.push(Span::styled(
                    "  sending...",
                    Style::default().fg(Color::DarkGray),
                )),
                AnswerStatus::Failed => header.push(Span::styled(
                    "  not sent, Ctrl+R to retry",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                AnswerStatus::Delivered => {}
            }
            lines.push(Line::from(header));
            match status {
                AnswerStatus::Failed => Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::CROSSED_OUT),
                _ => Style::default().fg(Color::Green),
            }
        }
        Turn::Feedback { score, .. } => {
            let mut header = vec![Span::styled(
                "Assistant · Feedback",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )];
            if let Some(score) = score {
                header.push(Span::styled(
                    format!("  {}", score_label(*score)),
                    Style::default().fg(score_color(*score)),
                ));
            }
            header.push(Span::styled(format!("  {time}"), time_style));
            lines.push(Line::from(header));
            Style::default().fg(Color::Yellow)
        }
    };

    for row in wrap_text(turn.text(), width) {
        lines.push(Line::styled(format!("{INDENT}{row}"), body_style));
    }
    lines.push(Line::raw(""));
    lines
}

/// "★★☆ 2/3"
pub fn score_label(score: Score) -> String {
    let filled = usize::from(score.value());
    let empty = usize::from(Score::MAX).saturating_sub(filled);
    format!(
        "{}{} {}/{}",
        "★".repeat(filled),
        "☆".repeat(empty),
        score.value(),
        Score::MAX
    )
}

fn score_color(score: Score) -> Color {
    match score.value() {
        0 => Color::Red,
        1 => Color::LightRed,
        2 => Color::LightGreen,
        _ => Color::Green,
    }
}

/// Animated "typing" line; the dots advance every ten render ticks.
pub fn typing_indicator(tick: u64) -> String {
    let dots = ((tick / 10) % 4) as usize;
    format!("{INDENT}Assistant is typing{}", ".".repeat(dots))
}

/// Greedy word wrap on character counts. Words longer than `width` are
/// split; explicit newlines are kept.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for paragraph in text.split('\n') {
        let mut row = String::new();
        let mut row_len = 0;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            loop {
                let needed = if row_len == 0 { word.len() } else { row_len + 1 + word.len() };
                if needed <= width {
                    if row_len > 0 {
                        row.push(' ');
                        row_len += 1;
                    }
                    row.extend(word.iter());
                    row_len += word.len();
                    break;
                }
                if row_len > 0 {
                    rows.push(std::mem::take(&mut row));
                    row_len = 0;
                    continue;
                }
                // Word alone is too long for the row.
                let rest = word.split_off(width);
                rows.push(word.into_iter().collect());
                word = rest;
            }
        }
        rows.push(row);
    }
    rows
}

/// `[start, end)` of the lines to show given a scroll offset measured up
/// from the bottom. The offset is clamped so the window never runs past the
/// first line.
pub fn visible_window(total: usize, height: usize, scroll_from_bottom: usize) -> (usize, usize) {
    let max_scroll = total.saturating_sub(height);
    let scroll = scroll_from_bottom.min(max_scroll);
    let end = total - scroll;
    let start = end.saturating_sub(height);
    (start, end)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
