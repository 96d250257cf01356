// Application orchestrator.
//
// Owns the current screen and the active flow controller. User commands,
// flow events, and results of spawned API tasks all arrive on mpsc channels
// and are handled in one `tokio::select!` loop that pushes `UiUpdate`s to
// the presentation layer.

use std::path::PathBuf;
use std::sync::Arc;

use digiassist_core::api::{
    ApiError, CompanyProfile, SessionApi, SessionCreated, SessionId, SessionResults,
};
use digiassist_core::config::Config;
use digiassist_core::session::{
    FlowController, FlowEvent, FlowOptions, FlowSignal, RetryOutcome, SubmitOutcome,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::{
    ConversationSnapshot, IntakeForm, IntakeStatus, ReportStatus, ResultsStatus, Screen,
    UiUpdate, UserCommand,
};
use crate::report::save_report;

// ---------------------------------------------------------------------------
// Task events
// ---------------------------------------------------------------------------

/// Completion of a background API call started by the app.
#[derive(Debug)]
pub enum TaskEvent {
    SessionCreated {
        result: Result<SessionCreated, ApiError>,
    },
    ResultsLoaded {
        session_id: SessionId,
        result: Result<SessionResults, ApiError>,
    },
    ReportSaved {
        session_id: SessionId,
        result: Result<PathBuf, String>,
    },
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    config: Config,
    api: Arc<dyn SessionApi>,
    screen: Screen,

    flow: Option<FlowController>,
    flow_tx: mpsc::Sender<FlowEvent>,
    /// Bumped for every session opened so events from an earlier flow are
    /// recognised as stale.
    flow_generation: u64,

    task_tx: mpsc::Sender<TaskEvent>,
    intake: IntakeStatus,
    results: ResultsStatus,
    report: Option<ReportStatus>,
}

impl AppState {
    pub fn new(
        config: Config,
        api: Arc<dyn SessionApi>,
        flow_tx: mpsc::Sender<FlowEvent>,
        task_tx: mpsc::Sender<TaskEvent>,
    ) -> Self {
        AppState {
            config,
            api,
            screen: Screen::Intake,
            flow: None,
            flow_tx,
            flow_generation: 0,
            task_tx,
            intake: IntakeStatus::default(),
            results: ResultsStatus::Loading,
            report: None,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn flow(&self) -> Option<&FlowController> {
        self.flow.as_ref()
    }

    /// Updates that fully describe the current screen.
    pub fn current_view(&self) -> Vec<UiUpdate> {
        let mut updates = vec![UiUpdate::Navigate(self.screen.clone())];
        match &self.screen {
            Screen::Intake => updates.push(UiUpdate::Intake(self.intake.clone())),
            Screen::Conversation { .. } => {
                if let Some(snapshot) = self.conversation_snapshot() {
                    updates.push(UiUpdate::Conversation(Box::new(snapshot)));
                }
            }
            Screen::Results { .. } => {
                updates.push(UiUpdate::Results(self.results.clone()));
                if let Some(report) = &self.report {
                    updates.push(UiUpdate::Report(report.clone()));
                }
            }
        }
        updates
    }

    pub fn conversation_snapshot(&self) -> Option<ConversationSnapshot> {
        let flow = self.flow.as_ref()?;
        Some(ConversationSnapshot {
            session_id: flow.session_id().clone(),
            turns: flow.transcript().turns().to_vec(),
            progress: flow.progress(),
            phase: flow.phase(),
            busy: flow.is_busy(),
            error: flow.error().map(str::to_string),
        })
    }

    // -- navigation --

    /// Switch to the conversation screen for `session_id` and start its flow.
    pub fn open_session(&mut self, session_id: SessionId) -> Vec<UiUpdate> {
        self.close_flow();
        self.flow_generation += 1;
        info!(session = %session_id, generation = self.flow_generation, "opening session");

        let mut flow = FlowController::new(
            Arc::clone(&self.api),
            session_id.clone(),
            self.flow_tx.clone(),
            FlowOptions::from_config(&self.config, self.flow_generation),
        );
        flow.start();
        self.flow = Some(flow);
        self.intake = IntakeStatus::default();
        self.screen = Screen::Conversation { session_id };
        self.current_view()
    }

    /// Create a session for an already-registered company.
    pub fn open_company(&mut self, company_id: &str) -> Vec<UiUpdate> {
        self.intake = IntakeStatus {
            submitting: true,
            error: None,
        };
        let api = Arc::clone(&self.api);
        let tx = self.task_tx.clone();
        let company_id = company_id.to_string();
        tokio::spawn(async move {
            let result = api.create_session(&company_id).await;
            let _ = tx.send(TaskEvent::SessionCreated { result }).await;
        });
        vec![UiUpdate::Intake(self.intake.clone())]
    }

    fn show_results(&mut self, session_id: SessionId) -> Vec<UiUpdate> {
        self.close_flow();
        info!(session = %session_id, "showing results");
        self.screen = Screen::Results {
            session_id: session_id.clone(),
        };
        self.report = None;
        self.load_results(session_id);
        self.current_view()
    }

    fn close_flow(&mut self) {
        if let Some(mut flow) = self.flow.take() {
            flow.shutdown();
        }
    }

    // -- background tasks --

    fn submit_intake(&mut self, form: IntakeForm) -> Vec<UiUpdate> {
        if self.intake.submitting {
            return Vec::new();
        }
        let profile = match CompanyProfile::from_form(&form.name, form.sector, form.size) {
            Ok(profile) => profile,
            Err(e) => {
                debug!(error = %e, "intake form rejected");
                self.intake.error = Some(e.to_string());
                return vec![UiUpdate::Intake(self.intake.clone())];
            }
        };

        self.intake = IntakeStatus {
            submitting: true,
            error: None,
        };
        let api = Arc::clone(&self.api);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.create_session_with_company(&profile).await;
            let _ = tx.send(TaskEvent::SessionCreated { result }).await;
        });
        vec![UiUpdate::Intake(self.intake.clone())]
    }

    fn load_results(&mut self, session_id: SessionId) {
        self.results = ResultsStatus::Loading;
        let api = Arc::clone(&self.api);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.results(&session_id).await;
            let _ = tx
                .send(TaskEvent::ResultsLoaded { session_id, result })
                .await;
        });
    }

    fn download_report(&mut self, session_id: SessionId) -> Vec<UiUpdate> {
        if matches!(self.report, Some(ReportStatus::Downloading)) {
            return Vec::new();
        }
        if !matches!(self.results, ResultsStatus::Loaded(_)) {
            debug!("report requested before results loaded");
            return Vec::new();
        }

        self.report = Some(ReportStatus::Downloading);
        let api = Arc::clone(&self.api);
        let tx = self.task_tx.clone();
        let dir = self.config.reports.resolve_dir();
        tokio::spawn(async move {
            let result = match api.download_report(&session_id).await {
                Ok(bytes) => save_report(&dir, &session_id, &bytes).map_err(|e| {
                    warn!(error = %e, "failed to save report");
                    format!("{e:#}")
                }),
                Err(e) => {
                    warn!(error = %e, "failed to download report");
                    Err(e.user_message())
                }
            };
            let _ = tx
                .send(TaskEvent::ReportSaved { session_id, result })
                .await;
        });
        vec![UiUpdate::Report(ReportStatus::Downloading)]
    }

    fn on_results_screen(&self, session_id: &SessionId) -> bool {
        matches!(&self.screen, Screen::Results { session_id: current } if current == session_id)
    }

    // -- event handlers --

    pub fn handle_command(&mut self, cmd: UserCommand) -> Vec<UiUpdate> {
        match cmd {
            UserCommand::SubmitIntake(form) => {
                if self.screen != Screen::Intake {
                    return Vec::new();
                }
                self.submit_intake(form)
            }
            UserCommand::SubmitAnswer(text) => {
                let Some(flow) = self.flow.as_mut() else {
                    return Vec::new();
                };
                match flow.submit_answer(&text) {
                    SubmitOutcome::Sent => self.conversation_update(),
                    outcome => {
                        debug!(?outcome, "answer not sent");
                        Vec::new()
                    }
                }
            }
            UserCommand::Retry => {
                if matches!(self.screen, Screen::Results { .. })
                    && matches!(self.results, ResultsStatus::Failed(_))
                {
                    return self.handle_command(UserCommand::ReloadResults);
                }
                let Some(flow) = self.flow.as_mut() else {
                    return Vec::new();
                };
                match flow.retry() {
                    RetryOutcome::Sent => self.conversation_update(),
                    outcome => {
                        debug!(?outcome, "nothing retried");
                        Vec::new()
                    }
                }
            }
            UserCommand::ReloadResults => {
                let Screen::Results { session_id } = &self.screen else {
                    return Vec::new();
                };
                let session_id = session_id.clone();
                self.load_results(session_id);
                vec![UiUpdate::Results(self.results.clone())]
            }
            UserCommand::DownloadReport => {
                let Screen::Results { session_id } = &self.screen else {
                    return Vec::new();
                };
                let session_id = session_id.clone();
                self.download_report(session_id)
            }
            UserCommand::NewDiagnostic => {
                info!("starting a new diagnostic");
                self.close_flow();
                self.screen = Screen::Intake;
                self.intake = IntakeStatus::default();
                self.results = ResultsStatus::Loading;
                self.report = None;
                self.current_view()
            }
            UserCommand::Quit => Vec::new(),
        }
    }

    pub fn handle_flow_event(&mut self, event: FlowEvent) -> Vec<UiUpdate> {
        let (signals, session_id) = match self.flow.as_mut() {
            Some(flow) => {
                let signals = flow.handle_event(event);
                (signals, flow.session_id().clone())
            }
            None => {
                debug!("flow event with no active session, discarding");
                return Vec::new();
            }
        };
        if signals.is_empty() {
            return Vec::new();
        }

        let mut updates = self.conversation_update();
        if signals.contains(&FlowSignal::NavigateToResults) {
            updates.extend(self.show_results(session_id));
        }
        updates
    }

    pub fn handle_task_event(&mut self, event: TaskEvent) -> Vec<UiUpdate> {
        match event {
            TaskEvent::SessionCreated { result } => {
                self.intake.submitting = false;
                if self.screen != Screen::Intake {
                    debug!("session created after leaving intake, ignoring");
                    return Vec::new();
                }
                match result {
                    Ok(created) => self.open_session(created.session_id),
                    Err(e) => {
                        warn!(error = %e, "failed to create session");
                        self.intake.error = Some(e.user_message());
                        vec![UiUpdate::Intake(self.intake.clone())]
                    }
                }
            }
            TaskEvent::ResultsLoaded { session_id, result } => {
                if !self.on_results_screen(&session_id) {
                    debug!(session = %session_id, "stale results, ignoring");
                    return Vec::new();
                }
                self.results = match result {
                    Ok(results) => ResultsStatus::Loaded(Box::new(results)),
                    Err(e) => {
                        warn!(error = %e, "failed to load results");
                        ResultsStatus::Failed(e.user_message())
                    }
                };
                vec![UiUpdate::Results(self.results.clone())]
            }
            TaskEvent::ReportSaved { session_id, result } => {
                if !self.on_results_screen(&session_id) {
                    return Vec::new();
                }
                let status = match result {
                    Ok(path) => ReportStatus::Saved(path),
                    Err(message) => ReportStatus::Failed(message),
                };
                self.report = Some(status.clone());
                vec![UiUpdate::Report(status)]
            }
        }
    }

    fn conversation_update(&self) -> Vec<UiUpdate> {
        self.conversation_snapshot()
            .map(|s| vec![UiUpdate::Conversation(Box::new(s))])
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on three channels using `tokio::select!`:
/// 1. User commands from the TUI
/// 2. Flow controller events (API results and paced transitions)
/// 3. Background task results (session creation, results, report)
///
/// Pushes UI updates through `ui_tx`, starting with the current view.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut flow_rx: mpsc::Receiver<FlowEvent>,
    mut task_rx: mpsc::Receiver<TaskEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");
    push(&ui_tx, state.current_view()).await;

    loop {
        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        let updates = state.handle_command(cmd);
                        push(&ui_tx, updates).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Flow events ---
            Some(event) = flow_rx.recv() => {
                let updates = state.handle_flow_event(event);
                push(&ui_tx, updates).await;
            }

            // --- Background task results ---
            Some(event) = task_rx.recv() => {
                let updates = state.handle_task_event(event);
                push(&ui_tx, updates).await;
            }
        }
    }

    state.close_flow();
    info!("Application event loop exiting");
    Ok(())
}

async fn push(ui_tx: &mpsc::Sender<UiUpdate>, updates: Vec<UiUpdate>) {
    for update in updates {
        let _ = ui_tx.send(update).await;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
