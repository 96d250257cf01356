// Conversation state and the flow controller that drives it.

pub mod flow;
pub mod progress;
pub mod schedule;
pub mod turn;

pub use flow::{
    FailedAction, FlowController, FlowEvent, FlowOptions, FlowPhase, FlowSignal, RetryOutcome,
    StartOutcome, SubmitOutcome,
};
pub use progress::{Progress, DEFAULT_TOTAL_QUESTIONS};
pub use schedule::ScheduledTask;
pub use turn::{AnswerStatus, Score, Transcript, Turn, TurnKind};
