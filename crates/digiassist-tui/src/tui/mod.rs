// Terminal front end: screen rendering, input handling, and the render loop.
//
// The TUI owns a `ViewState` mirroring what the app orchestrator reports.
// The app pushes `UiUpdate` messages over an mpsc channel; the TUI applies
// them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use digiassist_app::protocol::{
    ConversationSnapshot, IntakeForm, IntakeStatus, ReportStatus, ResultsStatus, Screen,
    UiUpdate, UserCommand,
};
use digiassist_core::api::{CompanySize, Sector};
use digiassist_core::session::{FailedAction, FlowPhase};

use layout::{conversation_layout, page_layout};

// ---------------------------------------------------------------------------
// Intake form state
// ---------------------------------------------------------------------------

/// Field of the intake form that receives keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeField {
    #[default]
    Name,
    Sector,
    Size,
}

impl IntakeField {
    pub fn next(self) -> Self {
        match self {
            IntakeField::Name => IntakeField::Sector,
            IntakeField::Sector => IntakeField::Size,
            IntakeField::Size => IntakeField::Name,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            IntakeField::Name => IntakeField::Size,
            IntakeField::Sector => IntakeField::Name,
            IntakeField::Size => IntakeField::Sector,
        }
    }
}

/// Local edits of the intake form plus the last status reported by the app.
#[derive(Debug, Clone, Default)]
pub struct IntakeView {
    pub name: String,
    /// Index into `Sector::ALL`.
    pub sector: Option<usize>,
    /// Index into `CompanySize::ALL`.
    pub size: Option<usize>,
    pub focus: IntakeField,
    pub status: IntakeStatus,
}

impl IntakeView {
    pub fn selected_sector(&self) -> Option<Sector> {
        self.sector.and_then(|i| Sector::ALL.get(i).copied())
    }

    pub fn selected_size(&self) -> Option<CompanySize> {
        self.size.and_then(|i| CompanySize::ALL.get(i).copied())
    }

    /// The form as sent to the app.
    pub fn form(&self) -> IntakeForm {
        IntakeForm {
            name: self.name.clone(),
            sector: self.selected_sector(),
            size: self.selected_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the application state for rendering.
///
/// Updated incrementally via `UiUpdate` messages from the app orchestrator.
/// `render_frame` reads this struct to draw the current screen.
pub struct ViewState {
    pub screen: Screen,
    pub intake: IntakeView,
    /// Latest conversation snapshot, if a session is open.
    pub conversation: Option<ConversationSnapshot>,
    /// Answer being typed on the conversation screen.
    pub answer_input: String,
    /// Transcript lines scrolled up from the bottom. Zero follows new turns.
    pub transcript_scroll: usize,
    pub results: ResultsStatus,
    pub results_scroll: u16,
    pub report: Option<ReportStatus>,
    /// Whether the quit confirmation dialog is displayed.
    pub confirm_quit: bool,
    /// Render ticks since startup; drives the typing indicator animation.
    pub tick: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            screen: Screen::Intake,
            intake: IntakeView::default(),
            conversation: None,
            answer_input: String::new(),
            transcript_scroll: 0,
            results: ResultsStatus::Loading,
            results_scroll: 0,
            report: None,
            confirm_quit: false,
            tick: 0,
        }
    }
}

impl ViewState {
    /// Whether the assistant is working on something the user waits for.
    pub fn assistant_typing(&self) -> bool {
        self.conversation.as_ref().is_some_and(|c| {
            c.busy
                || matches!(
                    c.phase,
                    FlowPhase::LoadingFirstQuestion
                        | FlowPhase::Submitting
                        | FlowPhase::FeedbackShown
                        | FlowPhase::LoadingQuestion
                )
        })
    }

    /// Whether an answer typed now would be accepted.
    pub fn accepts_answer(&self) -> bool {
        self.conversation.as_ref().is_some_and(|c| {
            !c.busy
                && matches!(
                    c.phase,
                    FlowPhase::AwaitingInput | FlowPhase::Errored(FailedAction::Submit)
                )
        })
    }
}

/// Apply a single `UiUpdate` to the view state.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Navigate(screen) => {
            if state.screen != screen {
                enter_screen(state, &screen);
                state.screen = screen;
            }
        }
        UiUpdate::Intake(status) => {
            state.intake.status = status;
        }
        UiUpdate::Conversation(snapshot) => {
            let grew = state
                .conversation
                .as_ref()
                .is_none_or(|old| snapshot.turns.len() > old.turns.len());
            if grew {
                state.transcript_scroll = 0;
            }
            state.conversation = Some(*snapshot);
        }
        UiUpdate::Results(status) => {
            state.results = status;
        }
        UiUpdate::Report(status) => {
            state.report = Some(status);
        }
    }
}

/// Reset the per-screen state when the app switches screens.
fn enter_screen(state: &mut ViewState, screen: &Screen) {
    debug!(?screen, "screen change");
    match screen {
        Screen::Intake => {
            state.intake = IntakeView::default();
            state.conversation = None;
            state.answer_input.clear();
        }
        Screen::Conversation { .. } => {
            state.conversation = None;
            state.answer_input.clear();
            state.transcript_scroll = 0;
        }
        Screen::Results { .. } => {
            state.results = ResultsStatus::Loading;
            state.results_scroll = 0;
            state.report = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the current screen, with the quit dialog on top when active.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let area = frame.area();
    match state.screen {
        Screen::Intake => {
            let layout = page_layout(area);
            widgets::title_bar::render(frame, layout.title, "New diagnostic");
            widgets::intake_form::render(frame, layout.body, state);
            widgets::help_bar::render(frame, layout.help_bar, state);
        }
        Screen::Conversation { .. } => {
            let layout = conversation_layout(area);
            widgets::progress_header::render(frame, layout.header, state);
            widgets::transcript::render(frame, layout.transcript, state);
            widgets::error_banner::render(frame, layout.banner, state);
            widgets::input_box::render(frame, layout.input, state);
            widgets::help_bar::render(frame, layout.help_bar, state);
        }
        Screen::Results { .. } => {
            let layout = page_layout(area);
            widgets::title_bar::render(frame, layout.title, "Diagnostic results");
            widgets::results::render(frame, layout.body, state);
            widgets::help_bar::render(frame, layout.help_bar, state);
        }
    }

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, area);
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// Initializes the terminal, then multiplexes app updates, keyboard input,
/// and a ~30 fps render tick until the user quits or the app closes the
/// update channel. The terminal is restored on exit and on panic.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // App is shutting down
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            if cmd_tx.send(cmd).await.is_err() || quit {
                                break Ok(());
                            }
                        }
                    }
                    // Resize and mouse events are picked up by the next render.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("terminal input error: {}", e);
                        break Err(anyhow::Error::new(e).context("failed to read terminal input"));
                    }
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                view_state.tick = view_state.tick.wrapping_add(1);
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(anyhow::Error::new(e).context("failed to draw frame"));
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use digiassist_core::api::{MaturityLevel, SessionId, SessionResults};
    use digiassist_core::api::types::MaturityProfile;
    use digiassist_core::session::{Progress, Turn};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    pub(crate) fn snapshot(phase: FlowPhase, busy: bool, turns: Vec<Turn>) -> ConversationSnapshot {
        ConversationSnapshot {
            session_id: SessionId::new("s1"),
            turns,
            progress: Progress::new(3, 72),
            phase,
            busy,
            error: None,
        }
    }

    pub(crate) fn sample_results() -> SessionResults {
        SessionResults {
            session_id: SessionId::new("s1"),
            company_name: "Acme".into(),
            global_score: 1.8,
            global_percentage: Some(60.0),
            maturity_profile: MaturityProfile {
                level: MaturityLevel::Challenger,
                percentage: 60.0,
                description: "Solid foundations.".into(),
            },
            dimension_scores: vec![],
            gaps: vec!["No data strategy".into()],
            recommendations: vec!["Appoint a data owner".into()],
        }
    }

    fn conversation_screen() -> Screen {
        Screen::Conversation {
            session_id: SessionId::new("s1"),
        }
    }

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert_eq!(state.screen, Screen::Intake);
        assert!(state.conversation.is_none());
        assert!(state.answer_input.is_empty());
        assert_eq!(state.results, ResultsStatus::Loading);
        assert!(state.report.is_none());
        assert!(!state.confirm_quit);
        assert_eq!(state.intake.focus, IntakeField::Name);
    }

    #[test]
    fn intake_field_cycles_both_ways() {
        let mut field = IntakeField::Name;
        for _ in 0..3 {
            field = field.next();
        }
        assert_eq!(field, IntakeField::Name);
        assert_eq!(IntakeField::Name.previous(), IntakeField::Size);
        assert_eq!(IntakeField::Size.previous(), IntakeField::Sector);
    }

    #[test]
    fn intake_view_builds_form_from_indices() {
        let view = IntakeView {
            name: "Acme".into(),
            sector: Some(2),
            size: Some(0),
            ..IntakeView::default()
        };
        let form = view.form();
        assert_eq!(form.name, "Acme");
        assert_eq!(form.sector, Some(Sector::ALL[2]));
        assert_eq!(form.size, Some(CompanySize::Micro));
    }

    #[test]
    fn navigate_to_intake_resets_form() {
        let mut state = ViewState {
            screen: conversation_screen(),
            ..ViewState::default()
        };
        state.intake.name = "Old".into();
        state.answer_input = "draft".into();
        apply_ui_update(&mut state, UiUpdate::Navigate(Screen::Intake));
        assert_eq!(state.screen, Screen::Intake);
        assert!(state.intake.name.is_empty());
        assert!(state.answer_input.is_empty());
    }

    #[test]
    fn navigate_to_same_screen_keeps_local_edits() {
        let mut state = ViewState::default();
        state.intake.name = "Acme".into();
        apply_ui_update(&mut state, UiUpdate::Navigate(Screen::Intake));
        assert_eq!(state.intake.name, "Acme");
    }

    #[test]
    fn navigate_to_results_clears_previous_report() {
        let mut state = ViewState {
            report: Some(ReportStatus::Failed("x".into())),
            ..ViewState::default()
        };
        apply_ui_update(
            &mut state,
            UiUpdate::Navigate(Screen::Results {
                session_id: SessionId::new("s1"),
            }),
        );
        assert!(state.report.is_none());
        assert_eq!(state.results, ResultsStatus::Loading);
    }

    #[test]
    fn new_turns_reset_transcript_scroll() {
        let mut state = ViewState {
            screen: conversation_screen(),
            ..ViewState::default()
        };
        apply_ui_update(
            &mut state,
            UiUpdate::Conversation(Box::new(snapshot(
                FlowPhase::AwaitingInput,
                false,
                vec![Turn::question("Q1", 1, 72)],
            ))),
        );
        state.transcript_scroll = 5;

        // Same turns, different phase: scroll position is kept.
        apply_ui_update(
            &mut state,
            UiUpdate::Conversation(Box::new(snapshot(
                FlowPhase::Submitting,
                true,
                vec![Turn::question("Q1", 1, 72)],
            ))),
        );
        assert_eq!(state.transcript_scroll, 5);

        apply_ui_update(
            &mut state,
            UiUpdate::Conversation(Box::new(snapshot(
                FlowPhase::Submitting,
                true,
                vec![Turn::question("Q1", 1, 72), Turn::answer("A1")],
            ))),
        );
        assert_eq!(state.transcript_scroll, 0);
    }

    #[test]
    fn intake_and_report_updates_are_stored() {
        let mut state = ViewState::default();
        apply_ui_update(
            &mut state,
            UiUpdate::Intake(IntakeStatus {
                submitting: false,
                error: Some("Company name is required".into()),
            }),
        );
        assert_eq!(
            state.intake.status.error.as_deref(),
            Some("Company name is required")
        );

        apply_ui_update(&mut state, UiUpdate::Report(ReportStatus::Downloading));
        assert_eq!(state.report, Some(ReportStatus::Downloading));
    }

    #[test]
    fn typing_indicator_follows_phase() {
        let mut state = ViewState::default();
        assert!(!state.assistant_typing());

        state.conversation = Some(snapshot(FlowPhase::FeedbackShown, false, vec![]));
        assert!(state.assistant_typing());
        assert!(!state.accepts_answer());

        state.conversation = Some(snapshot(FlowPhase::AwaitingInput, false, vec![]));
        assert!(!state.assistant_typing());
        assert!(state.accepts_answer());

        state.conversation = Some(snapshot(FlowPhase::Completed, false, vec![]));
        assert!(!state.accepts_answer());

        // A failed first fetch has no question to answer.
        state.conversation = Some(snapshot(
            FlowPhase::Errored(FailedAction::Start),
            false,
            vec![],
        ));
        assert!(!state.accepts_answer());
    }

    #[test]
    fn render_frame_every_screen_does_not_panic() {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();

        let mut state = ViewState::default();
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();

        state.screen = conversation_screen();
        state.conversation = Some(snapshot(
            FlowPhase::AwaitingInput,
            false,
            vec![Turn::question("How do you store customer data?", 1, 72)],
        ));
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();

        state.screen = Screen::Results {
            session_id: SessionId::new("s1"),
        };
        state.results = ResultsStatus::Loaded(Box::new(sample_results()));
        state.confirm_quit = true;
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
    }
}
