// Integration tests: the app event loop driven end to end with a scripted
// session API.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use digiassist_app::app::{run, AppState};
use digiassist_app::protocol::{
    IntakeForm, ReportStatus, ResultsStatus, Screen, UiUpdate, UserCommand,
};
use digiassist_core::api::types::MaturityProfile;
use digiassist_core::api::{
    AnswerReceipt, ApiError, CompanyProfile, CompanySize, MaturityLevel, NextQuestion, Sector,
    ServedQuestion, SessionApi, SessionCreated, SessionId, SessionResults,
};
use digiassist_core::config::{parse_config, Config};
use digiassist_core::session::{FlowPhase, TurnKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Scripted API
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedApi {
    created: Mutex<VecDeque<Result<SessionCreated, ApiError>>>,
    next: Mutex<VecDeque<Result<NextQuestion, ApiError>>>,
    answers: Mutex<VecDeque<Result<AnswerReceipt, ApiError>>>,
    results: Mutex<VecDeque<Result<SessionResults, ApiError>>>,
    report: Mutex<Option<Vec<u8>>>,
    companies: Mutex<Vec<CompanyProfile>>,
}

fn unscripted() -> ApiError {
    ApiError::Transport {
        message: "unscripted call".into(),
    }
}

#[async_trait]
impl SessionApi for ScriptedApi {
    async fn create_session(&self, _company_id: &str) -> Result<SessionCreated, ApiError> {
        pop(&self.created)
    }

    async fn create_session_with_company(
        &self,
        company: &CompanyProfile,
    ) -> Result<SessionCreated, ApiError> {
        self.companies.lock().unwrap().push(company.clone());
        pop(&self.created)
    }

    async fn next_question(&self, _: &SessionId) -> Result<NextQuestion, ApiError> {
        pop(&self.next)
    }

    async fn submit_answer(&self, _: &SessionId, _: &str) -> Result<AnswerReceipt, ApiError> {
        pop(&self.answers)
    }

    async fn results(&self, _: &SessionId) -> Result<SessionResults, ApiError> {
        pop(&self.results)
    }

    async fn download_report(&self, _: &SessionId) -> Result<Vec<u8>, ApiError> {
        self.report.lock().unwrap().clone().ok_or_else(unscripted)
    }
}

fn pop<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>) -> Result<T, ApiError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(unscripted()))
}

fn created(id: &str) -> SessionCreated {
    SessionCreated {
        session_id: SessionId::new(id),
        message: None,
    }
}

fn question(text: &str, progress: u32, total: u32) -> NextQuestion {
    NextQuestion {
        question_text: Some(text.into()),
        progress: Some(progress),
        total: Some(total),
        ..Default::default()
    }
}

fn sample_results(id: &str) -> SessionResults {
    SessionResults {
        session_id: SessionId::new(id),
        company_name: "Acme".into(),
        global_score: 2.1,
        global_percentage: Some(70.0),
        maturity_profile: MaturityProfile {
            level: MaturityLevel::Challenger,
            percentage: 70.0,
            description: "Solid".into(),
        },
        dimension_scores: vec![],
        gaps: vec![],
        recommendations: vec!["Keep going".into()],
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    cmd_tx: mpsc::Sender<UserCommand>,
    ui_rx: mpsc::Receiver<UiUpdate>,
    handle: JoinHandle<anyhow::Result<()>>,
}

fn config(reports_dir: &Path) -> Config {
    let text = format!(
        "[api]\nbase_url = \"http://127.0.0.1:9\"\n\n[pacing]\nnext_question_delay_ms = 10\ncompletion_delay_ms = 20\n\n[reports]\ndir = \"{}\"\n",
        reports_dir.display().to_string().replace('\\', "/")
    );
    parse_config(&text, Path::new("client.toml")).unwrap()
}

fn start(api: Arc<ScriptedApi>, reports_dir: &Path, resume: Option<&str>) -> Harness {
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (flow_tx, flow_rx) = mpsc::channel(16);
    let (task_tx, task_rx) = mpsc::channel(16);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let mut state = AppState::new(config(reports_dir), api, flow_tx, task_tx);
    if let Some(id) = resume {
        state.open_session(SessionId::new(id));
    }
    let handle = tokio::spawn(run(cmd_rx, flow_rx, task_rx, ui_tx, state));
    Harness {
        cmd_tx,
        ui_rx,
        handle,
    }
}

impl Harness {
    /// Wait for the first update matching `pred`, skipping others.
    async fn wait_for<F>(&mut self, what: &str, pred: F) -> UiUpdate
    where
        F: Fn(&UiUpdate) -> bool,
    {
        let deadline = Duration::from_secs(5);
        loop {
            let update = tokio::time::timeout(deadline, self.ui_rx.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
                .expect("ui channel open");
            if pred(&update) {
                return update;
            }
        }
    }

    async fn send(&self, cmd: UserCommand) {
        self.cmd_tx.send(cmd).await.unwrap();
    }

    async fn quit(self) {
        self.cmd_tx.send(UserCommand::Quit).await.unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn awaiting_input_with(turns: usize) -> impl Fn(&UiUpdate) -> bool {
    move |u| {
        matches!(u, UiUpdate::Conversation(s)
            if s.phase == FlowPhase::AwaitingInput && s.turns.len() == turns)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn intake_to_results_to_report() {
    let api = Arc::new(ScriptedApi::default());
    api.created.lock().unwrap().push_back(Ok(created("s-1")));
    api.next.lock().unwrap().push_back(Ok(question("Q1", 0, 2)));
    api.answers.lock().unwrap().push_back(Ok(AnswerReceipt {
        ai_reaction: Some("Thanks".into()),
        score: Some(2),
        next_question: Some(ServedQuestion {
            question_id: None,
            question_text: "Q2".into(),
            criterion_id: None,
            dimension: None,
            pillar: None,
        }),
        progress: Some(1),
        total: Some(2),
        ..Default::default()
    }));
    api.answers.lock().unwrap().push_back(Ok(AnswerReceipt {
        ai_reaction: Some("All done".into()),
        score: Some(3),
        completed: true,
        ..Default::default()
    }));
    api.results
        .lock()
        .unwrap()
        .push_back(Ok(sample_results("s-1")));
    *api.report.lock().unwrap() = Some(b"%PDF-1.4 test".to_vec());

    let reports = scratch("digiassist_app_flow_reports");
    let mut h = start(api.clone(), &reports, None);
    h.wait_for("intake screen", |u| *u == UiUpdate::Navigate(Screen::Intake))
        .await;

    h.send(UserCommand::SubmitIntake(IntakeForm {
        name: "Acme".into(),
        sector: Some(Sector::Industry),
        size: Some(CompanySize::Medium),
    }))
    .await;
    h.wait_for("conversation screen", |u| {
        matches!(u, UiUpdate::Navigate(Screen::Conversation { .. }))
    })
    .await;
    h.wait_for("first question", awaiting_input_with(1)).await;
    assert_eq!(api.companies.lock().unwrap()[0].sector, Sector::Industry);

    h.send(UserCommand::SubmitAnswer("answer1".into())).await;
    h.wait_for("second question", awaiting_input_with(4)).await;

    h.send(UserCommand::SubmitAnswer("answer2".into())).await;
    let last = h
        .wait_for("final feedback", |u| {
            matches!(u, UiUpdate::Conversation(s) if s.turns.len() == 6)
        })
        .await;
    if let UiUpdate::Conversation(s) = last {
        let kinds: Vec<TurnKind> = s.turns.iter().map(|t| t.kind()).collect();
        assert_eq!(kinds.last(), Some(&TurnKind::Feedback));
    }

    h.wait_for("results screen", |u| {
        matches!(u, UiUpdate::Navigate(Screen::Results { session_id }) if session_id.as_str() == "s-1")
    })
    .await;
    h.wait_for("results loaded", |u| {
        matches!(u, UiUpdate::Results(ResultsStatus::Loaded(r)) if r.company_name == "Acme")
    })
    .await;

    h.send(UserCommand::DownloadReport).await;
    let saved = h
        .wait_for("report saved", |u| {
            matches!(u, UiUpdate::Report(ReportStatus::Saved(_)))
        })
        .await;
    if let UiUpdate::Report(ReportStatus::Saved(path)) = saved {
        assert_eq!(path, reports.join("diagnostic_report_s-1.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 test");
    }

    h.quit().await;
    let _ = std::fs::remove_dir_all(&reports);
}

#[tokio::test]
async fn session_creation_failure_is_shown_on_intake() {
    let api = Arc::new(ScriptedApi::default());
    api.created.lock().unwrap().push_back(Err(ApiError::Server {
        status: 422,
        detail: "Invalid company size".into(),
    }));

    let mut h = start(api, &scratch("digiassist_app_flow_unused1"), None);
    h.send(UserCommand::SubmitIntake(IntakeForm {
        name: "Acme".into(),
        sector: Some(Sector::Other),
        size: Some(CompanySize::Micro),
    }))
    .await;

    h.wait_for("intake error", |u| {
        matches!(u, UiUpdate::Intake(s)
            if !s.submitting && s.error.as_deref() == Some("Invalid company size"))
    })
    .await;
    h.quit().await;
}

#[tokio::test]
async fn resumed_exhausted_session_goes_straight_to_results() {
    let api = Arc::new(ScriptedApi::default());
    api.next.lock().unwrap().push_back(Ok(NextQuestion {
        completed: true,
        ..Default::default()
    }));
    api.results
        .lock()
        .unwrap()
        .push_back(Ok(sample_results("done-1")));

    let mut h = start(api, &scratch("digiassist_app_flow_unused2"), Some("done-1"));
    h.wait_for("results screen", |u| {
        matches!(u, UiUpdate::Navigate(Screen::Results { .. }))
    })
    .await;
    h.wait_for("results loaded", |u| {
        matches!(u, UiUpdate::Results(ResultsStatus::Loaded(_)))
    })
    .await;
    h.quit().await;
}

#[tokio::test]
async fn failed_answer_can_be_retried() {
    let api = Arc::new(ScriptedApi::default());
    api.next.lock().unwrap().push_back(Ok(question("Q1", 0, 1)));
    api.answers.lock().unwrap().push_back(Err(ApiError::Transport {
        message: "reset".into(),
    }));
    api.answers.lock().unwrap().push_back(Ok(AnswerReceipt {
        ai_reaction: Some("Got it".into()),
        completed: true,
        ..Default::default()
    }));
    api.results
        .lock()
        .unwrap()
        .push_back(Err(ApiError::Server {
            status: 404,
            detail: "Results not ready".into(),
        }));
    api.results
        .lock()
        .unwrap()
        .push_back(Ok(sample_results("r-1")));

    let mut h = start(api, &scratch("digiassist_app_flow_unused3"), Some("r-1"));
    h.wait_for("first question", awaiting_input_with(1)).await;

    h.send(UserCommand::SubmitAnswer("answer".into())).await;
    h.wait_for("submit error", |u| {
        matches!(u, UiUpdate::Conversation(s) if s.error.is_some() && !s.busy)
    })
    .await;

    h.send(UserCommand::Retry).await;
    h.wait_for("feedback after retry", |u| {
        matches!(u, UiUpdate::Conversation(s) if s.turns.len() == 3 && s.error.is_none())
    })
    .await;

    h.wait_for("results failure", |u| {
        matches!(u, UiUpdate::Results(ResultsStatus::Failed(m)) if m == "Results not ready")
    })
    .await;
    h.send(UserCommand::Retry).await;
    h.wait_for("results reloaded", |u| {
        matches!(u, UiUpdate::Results(ResultsStatus::Loaded(_)))
    })
    .await;
    h.quit().await;
}
