// Messages exchanged between the app orchestrator and the presentation layer.
//
// The TUI sends `UserCommand`s; the app answers with `UiUpdate`s carrying
// everything the current screen needs to render.

use std::path::PathBuf;

use digiassist_core::api::{CompanySize, Sector, SessionId, SessionResults};
use digiassist_core::session::{FlowPhase, Progress, Turn};

// ---------------------------------------------------------------------------
// Screens
// ---------------------------------------------------------------------------

/// The view the user is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Intake,
    Conversation { session_id: SessionId },
    Results { session_id: SessionId },
}

// ---------------------------------------------------------------------------
// UI -> app
// ---------------------------------------------------------------------------

/// Raw intake form contents; validated by the app.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeForm {
    pub name: String,
    pub sector: Option<Sector>,
    pub size: Option<CompanySize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    SubmitIntake(IntakeForm),
    SubmitAnswer(String),
    /// Re-run the conversation action that failed.
    Retry,
    ReloadResults,
    DownloadReport,
    NewDiagnostic,
    Quit,
}

// ---------------------------------------------------------------------------
// App -> UI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeStatus {
    pub submitting: bool,
    pub error: Option<String>,
}

/// Everything the conversation screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub session_id: SessionId,
    pub turns: Vec<Turn>,
    pub progress: Progress,
    pub phase: FlowPhase,
    pub busy: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsStatus {
    Loading,
    Loaded(Box<SessionResults>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    Downloading,
    Saved(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Navigate(Screen),
    Intake(IntakeStatus),
    Conversation(Box<ConversationSnapshot>),
    Results(ResultsStatus),
    Report(ReportStatus),
}
