// Conversational flow controller.
//
// Drives one assessment session: fetches questions, accepts answers, appends
// feedback, paces the next question, and detects completion. Remote calls run
// as spawned tasks whose results come back as `FlowEvent`s on an mpsc channel;
// the owner feeds them to `handle_event`, which returns `FlowSignal`s for the
// presentation layer. No method blocks on I/O.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::progress::Progress;
use super::schedule::ScheduledTask;
use super::turn::{AnswerStatus, Score, Transcript, Turn};
use crate::api::{AnswerReceipt, ApiError, NextQuestion, ServedQuestion, SessionApi, SessionId};
use crate::config::{Config, PacingConfig};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const LOAD_QUESTION_ERROR: &str =
    "Unable to load the question right now. Please try again later.";
pub const SUBMIT_ANSWER_ERROR: &str =
    "Unable to send your answer right now. Please try again later.";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Results of remote calls and timers, delivered back to the controller.
///
/// Every event carries the generation of the controller that produced it so
/// that events from an abandoned session are discarded.
#[derive(Debug)]
pub enum FlowEvent {
    QuestionFetched {
        generation: u64,
        result: Result<NextQuestion, ApiError>,
    },
    AnswerSubmitted {
        generation: u64,
        result: Result<AnswerReceipt, ApiError>,
    },
    /// Paced append of a question that arrived with an answer receipt.
    RevealQuestion {
        generation: u64,
        question: ServedQuestion,
    },
    /// Paced transition to the results view.
    CompletionDue { generation: u64 },
}

impl FlowEvent {
    pub fn generation(&self) -> u64 {
        match self {
            FlowEvent::QuestionFetched { generation, .. }
            | FlowEvent::AnswerSubmitted { generation, .. }
            | FlowEvent::RevealQuestion { generation, .. }
            | FlowEvent::CompletionDue { generation } => *generation,
        }
    }
}

/// Action that put the controller into `Errored`; `retry` re-runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedAction {
    Start,
    Submit,
    FetchQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    LoadingFirstQuestion,
    AwaitingInput,
    Submitting,
    FeedbackShown,
    /// Fetching a question after a receipt that carried none.
    LoadingQuestion,
    Completed,
    Errored(FailedAction),
}

/// State changes reported to the owner after handling an event.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowSignal {
    TranscriptChanged,
    ProgressChanged,
    PhaseChanged(FlowPhase),
    Error(String),
    NavigateToResults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Busy,
    AlreadyStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// Blank input; nothing happened.
    Ignored,
    Busy,
    NotAwaitingInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Sent,
    NothingToRetry,
    Busy,
}

/// Tunables for a controller.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub pacing: PacingConfig,
    pub default_total: u32,
    pub generation: u64,
}

impl FlowOptions {
    pub fn from_config(config: &Config, generation: u64) -> Self {
        FlowOptions {
            pacing: config.pacing.clone(),
            default_total: config.session.default_total_questions,
            generation,
        }
    }
}

// ---------------------------------------------------------------------------
// FlowController
// ---------------------------------------------------------------------------

pub struct FlowController {
    api: Arc<dyn SessionApi>,
    session_id: SessionId,
    generation: u64,
    events: mpsc::Sender<FlowEvent>,
    pacing: PacingConfig,
    default_total: u32,

    transcript: Transcript,
    progress: Progress,
    phase: FlowPhase,
    busy: bool,
    error: Option<String>,
    /// Transcript index of the answer currently being submitted.
    pending_answer: Option<usize>,
    scheduled: Option<ScheduledTask>,
}

impl FlowController {
    pub fn new(
        api: Arc<dyn SessionApi>,
        session_id: SessionId,
        events: mpsc::Sender<FlowEvent>,
        options: FlowOptions,
    ) -> Self {
        FlowController {
            api,
            session_id,
            generation: options.generation,
            events,
            pacing: options.pacing,
            default_total: options.default_total,
            transcript: Transcript::new(),
            progress: Progress::initial(options.default_total),
            phase: FlowPhase::Idle,
            busy: false,
            error: None,
            pending_answer: None,
            scheduled: None,
        }
    }

    // -- accessors --

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    // -- operations --

    /// Fetch the first question.
    pub fn start(&mut self) -> StartOutcome {
        if self.busy {
            return StartOutcome::Busy;
        }
        if self.phase == FlowPhase::Completed || self.transcript.question_count() > 0 {
            return StartOutcome::AlreadyStarted;
        }
        info!(session = %self.session_id, "starting session flow");
        self.error = None;
        self.phase = FlowPhase::LoadingFirstQuestion;
        self.spawn_fetch();
        StartOutcome::Started
    }

    /// Append `text` as an answer and submit it. Blank input is ignored.
    pub fn submit_answer(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self.busy {
            return SubmitOutcome::Busy;
        }
        if !matches!(
            self.phase,
            FlowPhase::AwaitingInput | FlowPhase::Errored(FailedAction::Submit)
        ) {
            debug!(phase = ?self.phase, "answer refused, not awaiting input");
            return SubmitOutcome::NotAwaitingInput;
        }

        let index = self.transcript.push(Turn::answer(text));
        self.send_answer(index, text.to_string());
        SubmitOutcome::Sent
    }

    /// Resubmit the most recent failed answer without appending a turn.
    pub fn retry_answer(&mut self) -> RetryOutcome {
        if self.busy {
            return RetryOutcome::Busy;
        }
        if self.phase != FlowPhase::Errored(FailedAction::Submit) {
            return RetryOutcome::NothingToRetry;
        }
        let Some(index) = self.transcript.last_failed_answer() else {
            return RetryOutcome::NothingToRetry;
        };
        let text = match self.transcript.get(index) {
            Some(turn) => turn.text().to_string(),
            None => return RetryOutcome::NothingToRetry,
        };
        self.transcript.set_answer_status(index, AnswerStatus::Pending);
        info!(session = %self.session_id, index, "retrying failed answer");
        self.send_answer(index, text);
        RetryOutcome::Sent
    }

    /// Re-run whichever action put the controller into `Errored`.
    pub fn retry(&mut self) -> RetryOutcome {
        if self.busy {
            return RetryOutcome::Busy;
        }
        match self.phase {
            FlowPhase::Errored(FailedAction::Start) => match self.start() {
                StartOutcome::Started => RetryOutcome::Sent,
                StartOutcome::Busy => RetryOutcome::Busy,
                StartOutcome::AlreadyStarted => RetryOutcome::NothingToRetry,
            },
            FlowPhase::Errored(FailedAction::Submit) => self.retry_answer(),
            FlowPhase::Errored(FailedAction::FetchQuestion) => {
                self.error = None;
                self.phase = FlowPhase::LoadingQuestion;
                self.spawn_fetch();
                RetryOutcome::Sent
            }
            _ => RetryOutcome::NothingToRetry,
        }
    }

    /// Cancel any pending paced transition.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.scheduled.take() {
            debug!(session = %self.session_id, "cancelling scheduled transition");
            task.cancel();
        }
    }

    // -- event handling --

    /// Apply a `FlowEvent`. Events from another generation are dropped.
    pub fn handle_event(&mut self, event: FlowEvent) -> Vec<FlowSignal> {
        if event.generation() != self.generation {
            debug!(
                event_generation = event.generation(),
                current = self.generation,
                "discarding stale flow event"
            );
            return Vec::new();
        }

        let mut signals = Vec::new();
        match event {
            FlowEvent::QuestionFetched { result, .. } => {
                self.on_question_fetched(result, &mut signals)
            }
            FlowEvent::AnswerSubmitted { result, .. } => {
                self.on_answer_submitted(result, &mut signals)
            }
            FlowEvent::RevealQuestion { question, .. } => {
                self.scheduled = None;
                self.append_question(&question.question_text, &mut signals);
                self.set_phase(FlowPhase::AwaitingInput, &mut signals);
            }
            FlowEvent::CompletionDue { .. } => {
                self.scheduled = None;
                self.complete(&mut signals);
            }
        }
        signals
    }

    fn on_question_fetched(
        &mut self,
        result: Result<NextQuestion, ApiError>,
        signals: &mut Vec<FlowSignal>,
    ) {
        self.busy = false;
        let failed_action = if self.phase == FlowPhase::LoadingFirstQuestion {
            FailedAction::Start
        } else {
            FailedAction::FetchQuestion
        };

        let next = match result {
            Ok(next) => next,
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "failed to fetch question");
                self.fail(failed_action, LOAD_QUESTION_ERROR, signals);
                return;
            }
        };

        if next.completed {
            info!(session = %self.session_id, "no questions left, session complete");
            self.update_progress(next.progress, next.total, signals);
            self.complete(signals);
            return;
        }

        let Some(question) = next.served() else {
            warn!(session = %self.session_id, "question response had no text");
            self.fail(failed_action, LOAD_QUESTION_ERROR, signals);
            return;
        };

        self.update_progress(next.progress, next.total, signals);
        self.append_question(&question.question_text, signals);
        self.set_phase(FlowPhase::AwaitingInput, signals);
    }

    fn on_answer_submitted(
        &mut self,
        result: Result<AnswerReceipt, ApiError>,
        signals: &mut Vec<FlowSignal>,
    ) {
        self.busy = false;
        let pending = self.pending_answer.take();

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "failed to submit answer");
                if let Some(index) = pending {
                    self.transcript.set_answer_status(index, AnswerStatus::Failed);
                    signals.push(FlowSignal::TranscriptChanged);
                }
                self.fail(FailedAction::Submit, SUBMIT_ANSWER_ERROR, signals);
                return;
            }
        };

        if let Some(index) = pending {
            self.transcript
                .set_answer_status(index, AnswerStatus::Delivered);
        }

        if let Some(reaction) = receipt
            .ai_reaction
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
        {
            let score = receipt.score.map(Score::clamped);
            self.transcript.push(Turn::feedback(reaction, score));
        }
        signals.push(FlowSignal::TranscriptChanged);
        self.update_progress(receipt.progress, receipt.total, signals);
        self.set_phase(FlowPhase::FeedbackShown, signals);

        if receipt.completed {
            debug!(session = %self.session_id, "completion flagged, scheduling results");
            self.schedule(
                self.pacing.completion_delay(),
                FlowEvent::CompletionDue {
                    generation: self.generation,
                },
            );
        } else if let Some(question) = receipt
            .next_question
            .filter(|q| !q.question_text.trim().is_empty())
        {
            self.schedule(
                self.pacing.next_question_delay(),
                FlowEvent::RevealQuestion {
                    generation: self.generation,
                    question,
                },
            );
        } else {
            debug!(session = %self.session_id, "receipt carried no question, fetching next");
            self.set_phase(FlowPhase::LoadingQuestion, signals);
            self.spawn_fetch();
        }
    }

    // -- helpers --

    fn send_answer(&mut self, index: usize, text: String) {
        self.pending_answer = Some(index);
        self.error = None;
        self.phase = FlowPhase::Submitting;
        self.busy = true;

        let api = Arc::clone(&self.api);
        let session = self.session_id.clone();
        let tx = self.events.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = api.submit_answer(&session, &text).await;
            if tx
                .send(FlowEvent::AnswerSubmitted { generation, result })
                .await
                .is_err()
            {
                debug!("flow receiver dropped before answer receipt");
            }
        });
    }

    fn spawn_fetch(&mut self) {
        self.busy = true;

        let api = Arc::clone(&self.api);
        let session = self.session_id.clone();
        let tx = self.events.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = api.next_question(&session).await;
            if tx
                .send(FlowEvent::QuestionFetched { generation, result })
                .await
                .is_err()
            {
                debug!("flow receiver dropped before question arrived");
            }
        });
    }

    fn schedule(&mut self, delay: std::time::Duration, event: FlowEvent) {
        if let Some(previous) = self.scheduled.take() {
            previous.cancel();
        }
        self.scheduled = Some(ScheduledTask::spawn(delay, self.events.clone(), event));
    }

    fn append_question(&mut self, text: &str, signals: &mut Vec<FlowSignal>) {
        let last_index = self
            .transcript
            .turns()
            .iter()
            .rev()
            .find_map(|t| match t {
                Turn::Question { index, .. } => Some(*index),
                _ => None,
            })
            .unwrap_or(0);
        let index = self
            .progress
            .next_question_number()
            .max(last_index.saturating_add(1));
        self.transcript
            .push(Turn::question(text, index, self.progress.total));
        signals.push(FlowSignal::TranscriptChanged);
    }

    fn update_progress(
        &mut self,
        current: Option<u32>,
        total: Option<u32>,
        signals: &mut Vec<FlowSignal>,
    ) {
        if self.progress.apply(current, total, self.default_total) {
            signals.push(FlowSignal::ProgressChanged);
        }
    }

    fn complete(&mut self, signals: &mut Vec<FlowSignal>) {
        self.set_phase(FlowPhase::Completed, signals);
        signals.push(FlowSignal::NavigateToResults);
    }

    fn fail(&mut self, action: FailedAction, message: &str, signals: &mut Vec<FlowSignal>) {
        self.error = Some(message.to_string());
        self.set_phase(FlowPhase::Errored(action), signals);
        signals.push(FlowSignal::Error(message.to_string()));
    }

    fn set_phase(&mut self, phase: FlowPhase, signals: &mut Vec<FlowSignal>) {
        if self.phase != phase {
            self.phase = phase;
            signals.push(FlowSignal::PhaseChanged(phase));
        }
    }
}

impl Drop for FlowController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
