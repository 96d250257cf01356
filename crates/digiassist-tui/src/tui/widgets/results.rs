// Results screen: global score, maturity level, per-dimension breakdown,
// gaps, recommendations, and the report download status.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use digiassist_app::protocol::{ReportStatus, ResultsStatus};
use digiassist_core::api::{MaturityLevel, SessionResults};

use crate::tui::ViewState;

const BAR_WIDTH: usize = 20;
const NAME_WIDTH: usize = 30;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let lines = match &state.results {
        ResultsStatus::Loading => vec![Line::styled(
            "Loading results...",
            Style::default().fg(Color::Yellow),
        )],
        ResultsStatus::Failed(message) => vec![
            Line::styled(
                message.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Line::raw(""),
            Line::styled("Press r to reload.", Style::default().fg(Color::Gray)),
        ],
        ResultsStatus::Loaded(results) => results_lines(results),
    };

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((state.results_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(" Your digital maturity "));
    frame.render_widget(paragraph, chunks[0]);

    if let Some(report) = &state.report {
        frame.render_widget(Paragraph::new(report_line(report)), chunks[1]);
    }
}

/// All display lines for loaded results.
pub fn results_lines(results: &SessionResults) -> Vec<Line<'static>> {
    let heading = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let label = Style::default().fg(Color::Gray);
    let profile = &results.maturity_profile;
    let mut lines = Vec::new();

    if !results.company_name.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Company:        ", label),
            Span::styled(
                results.company_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Global score:   ", label),
        Span::styled(
            format!(
                "{:.2} / 3  ({:.0}%)",
                results.global_score,
                global_percentage(results)
            ),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Maturity level: ", label),
        Span::styled(
            profile.level.to_string(),
            Style::default()
                .fg(level_color(&profile.level))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  ({:.0}%)", profile.percentage), label),
    ]));
    if !profile.description.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::raw(profile.description.clone()));
    }

    if !results.dimension_scores.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::styled("Dimensions", heading));
        for dimension in &results.dimension_scores {
            let pct = dimension.display_percentage();
            let name = if dimension.dimension_name.is_empty() {
                &dimension.dimension_code
            } else {
                &dimension.dimension_name
            };
            lines.push(Line::from(vec![
                Span::raw(format!("  {name:<NAME_WIDTH$} ")),
                Span::styled(format!("{:.2}/3 ", dimension.score), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(score_bar(pct, BAR_WIDTH), Style::default().fg(bar_color(pct))),
                Span::raw(format!(" {pct:>3.0}%")),
            ]));
            for pillar in &dimension.pillar_scores {
                let pillar_name = if pillar.pillar_name.is_empty() {
                    &pillar.pillar_code
                } else {
                    &pillar.pillar_name
                };
                lines.push(Line::styled(
                    format!(
                        "      · {pillar_name}: {:.1}/{:.1} ({:.0}%)",
                        pillar.score, pillar.max_score, pillar.percentage
                    ),
                    label,
                ));
            }
        }
    }

    if !results.gaps.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::styled("Gaps", heading));
        for gap in &results.gaps {
            lines.push(Line::raw(format!("  • {gap}")));
        }
    }

    if !results.recommendations.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::styled("Recommendations", heading));
        for (i, rec) in results.recommendations.iter().enumerate() {
            lines.push(Line::raw(format!("  {}. {rec}", i + 1)));
        }
    }

    lines
}

/// Global percentage, derived from the 0-3 score when the server omits it.
pub fn global_percentage(results: &SessionResults) -> f64 {
    results
        .global_percentage
        .unwrap_or(results.global_score / 3.0 * 100.0)
        .clamp(0.0, 100.0)
}

pub fn level_color(level: &MaturityLevel) -> Color {
    match level {
        MaturityLevel::Beginner => Color::Red,
        MaturityLevel::Emergent => Color::Yellow,
        MaturityLevel::Challenger => Color::LightBlue,
        MaturityLevel::Leader => Color::Green,
        MaturityLevel::Other(_) => Color::White,
    }
}

fn bar_color(pct: f64) -> Color {
    if pct < 25.0 {
        Color::Red
    } else if pct < 50.0 {
        Color::Yellow
    } else if pct < 75.0 {
        Color::LightBlue
    } else {
        Color::Green
    }
}

/// Horizontal bar of `width` cells filled in proportion to `pct`.
pub fn score_bar(pct: f64, width: usize) -> String {
    let filled = ((pct.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn report_line(report: &ReportStatus) -> Line<'static> {
    match report {
        ReportStatus::Downloading => Line::styled(
            " Downloading report...",
            Style::default().fg(Color::Yellow),
        ),
        ReportStatus::Saved(path) => Line::styled(
            format!(" Report saved to {}", path.display()),
            Style::default().fg(Color::Green),
        ),
        ReportStatus::Failed(message) => Line::styled(
            format!(" Report download failed: {message}"),
            Style::default().fg(Color::Red),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
