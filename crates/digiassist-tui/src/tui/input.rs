// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into `UserCommand` messages for the app
// orchestrator, or into local ViewState mutations (form editing, focus,
// scrolling, the quit dialog).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use digiassist_app::protocol::{ResultsStatus, Screen, UserCommand};
use digiassist_core::api::{CompanySize, Sector};

use super::{IntakeField, ViewState};

/// Lines moved by PageUp / PageDown.
const PAGE_SIZE: usize = 10;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator. Returns `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports Press and Release for each keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    // Quit confirmation mode: only y/q confirm, n/Esc cancel, everything else blocked
    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    match view_state.screen {
        Screen::Intake => handle_intake(key_event, view_state),
        Screen::Conversation { .. } => handle_conversation(key_event, view_state),
        Screen::Results { .. } => handle_results(key_event, view_state),
    }
}

fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

fn handle_intake(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let intake = &mut view_state.intake;
    match key_event.code {
        KeyCode::Esc => {
            view_state.confirm_quit = true;
            None
        }
        KeyCode::Tab | KeyCode::Down => {
            intake.focus = intake.focus.next();
            None
        }
        KeyCode::BackTab | KeyCode::Up => {
            intake.focus = intake.focus.previous();
            None
        }
        KeyCode::Enter => {
            if intake.status.submitting {
                return None;
            }
            Some(UserCommand::SubmitIntake(intake.form()))
        }
        KeyCode::Left | KeyCode::Right => {
            let forward = key_event.code == KeyCode::Right;
            match intake.focus {
                IntakeField::Sector => {
                    intake.sector = Some(cycle(intake.sector, Sector::ALL.len(), forward));
                }
                IntakeField::Size => {
                    intake.size = Some(cycle(intake.size, CompanySize::ALL.len(), forward));
                }
                IntakeField::Name => {}
            }
            None
        }
        KeyCode::Backspace => {
            if intake.focus == IntakeField::Name {
                intake.name.pop();
            }
            None
        }
        KeyCode::Char(c) => {
            if intake.focus == IntakeField::Name
                && !key_event.modifiers.contains(KeyModifiers::CONTROL)
            {
                intake.name.push(c);
            }
            None
        }
        _ => None,
    }
}

/// Move a pick-list selection one step, wrapping at both ends. An empty
/// selection starts at the first (forward) or last (backward) option.
fn cycle(current: Option<usize>, len: usize, forward: bool) -> usize {
    match (current, forward) {
        (None, true) => 0,
        (None, false) => len.saturating_sub(1),
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

fn handle_conversation(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return match key_event.code {
            KeyCode::Char('r') => Some(UserCommand::Retry),
            _ => None,
        };
    }

    match key_event.code {
        KeyCode::Esc => {
            view_state.confirm_quit = true;
            None
        }
        KeyCode::Enter => {
            if view_state.answer_input.trim().is_empty() || !view_state.accepts_answer() {
                return None;
            }
            let text = std::mem::take(&mut view_state.answer_input);
            Some(UserCommand::SubmitAnswer(text))
        }
        KeyCode::Backspace => {
            view_state.answer_input.pop();
            None
        }
        KeyCode::Char(c) => {
            view_state.answer_input.push(c);
            None
        }
        KeyCode::Up => {
            view_state.transcript_scroll = view_state.transcript_scroll.saturating_add(1);
            None
        }
        KeyCode::Down => {
            view_state.transcript_scroll = view_state.transcript_scroll.saturating_sub(1);
            None
        }
        KeyCode::PageUp => {
            view_state.transcript_scroll = view_state.transcript_scroll.saturating_add(PAGE_SIZE);
            None
        }
        KeyCode::PageDown => {
            view_state.transcript_scroll = view_state.transcript_scroll.saturating_sub(PAGE_SIZE);
            None
        }
        KeyCode::End => {
            view_state.transcript_scroll = 0;
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

fn handle_results(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        KeyCode::Char('d') => match view_state.results {
            ResultsStatus::Loaded(_) => Some(UserCommand::DownloadReport),
            _ => None,
        },
        KeyCode::Char('n') => Some(UserCommand::NewDiagnostic),
        KeyCode::Char('r') => Some(UserCommand::ReloadResults),
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.results_scroll = view_state.results_scroll.saturating_sub(1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.results_scroll = view_state.results_scroll.saturating_add(1);
            None
        }
        KeyCode::PageUp => {
            view_state.results_scroll = view_state.results_scroll.saturating_sub(PAGE_SIZE as u16);
            None
        }
        KeyCode::PageDown => {
            view_state.results_scroll = view_state.results_scroll.saturating_add(PAGE_SIZE as u16);
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
