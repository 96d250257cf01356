// Transcript turns: the tagged Question / Answer / Feedback entries of a
// conversation, plus the append-only transcript that holds them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// Answer score on the fixed 0-3 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 3;

    /// Exact constructor. Returns `None` outside 0..=3.
    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Score(value))
    }

    /// Convert a raw server value, clamping into range.
    pub fn clamped(raw: i64) -> Self {
        let clamped = raw.clamp(Self::MIN as i64, Self::MAX as i64);
        if clamped != raw {
            warn!(raw, clamped, "score out of range, clamping");
        }
        Score(clamped as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// Delivery state of an optimistically-appended answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnswerStatus {
    Pending,
    Delivered,
    Failed,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Turn {
    Question {
        text: String,
        /// 1-based question number.
        index: u32,
        total: u32,
        at: DateTime<Utc>,
    },
    Answer {
        text: String,
        status: AnswerStatus,
        at: DateTime<Utc>,
    },
    Feedback {
        message: String,
        score: Option<Score>,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Question,
    Answer,
    Feedback,
}

impl Turn {
    pub fn question(text: impl Into<String>, index: u32, total: u32) -> Self {
        Turn::Question {
            text: text.into(),
            index,
            total,
            at: Utc::now(),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Turn::Answer {
            text: text.into(),
            status: AnswerStatus::Pending,
            at: Utc::now(),
        }
    }

    pub fn feedback(message: impl Into<String>, score: Option<Score>) -> Self {
        Turn::Feedback {
            message: message.into(),
            score,
            at: Utc::now(),
        }
    }

    pub fn kind(&self) -> TurnKind {
        match self {
            Turn::Question { .. } => TurnKind::Question,
            Turn::Answer { .. } => TurnKind::Answer,
            Turn::Feedback { .. } => TurnKind::Feedback,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Turn::Question { text, .. } | Turn::Answer { text, .. } => text,
            Turn::Feedback { message, .. } => message,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Turn::Question { at, .. } | Turn::Answer { at, .. } | Turn::Feedback { at, .. } => *at,
        }
    }

    fn is_failed_answer(&self) -> bool {
        matches!(
            self,
            Turn::Answer {
                status: AnswerStatus::Failed,
                ..
            }
        )
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Chronological, append-only list of turns.
///
/// Turns are never removed or reordered. The only in-place change allowed is
/// the delivery status of an answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return its index.
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    /// Update the status of the answer at `index`. Returns false when the
    /// index does not refer to an answer.
    pub fn set_answer_status(&mut self, index: usize, new_status: AnswerStatus) -> bool {
        match self.turns.get_mut(index) {
            Some(Turn::Answer { status, .. }) => {
                *status = new_status;
                true
            }
            _ => false,
        }
    }

    /// Index of the most recent failed answer to the current question, if the
    /// user has not answered it successfully since.
    pub fn last_failed_answer(&self) -> Option<usize> {
        for (i, turn) in self.turns.iter().enumerate().rev() {
            match turn {
                Turn::Answer {
                    status: AnswerStatus::Failed,
                    ..
                } => return Some(i),
                Turn::Answer { .. } | Turn::Feedback { .. } | Turn::Question { .. } => return None,
            }
        }
        None
    }

    /// Number of questions asked so far.
    pub fn question_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.kind() == TurnKind::Question)
            .count()
    }

    /// Check the alternation invariant.
    ///
    /// The first turn is a question; a question is followed by an answer; an
    /// answer by feedback or (when the server sent no reaction) a question;
    /// feedback by a question. Failed answers are skipped.
    pub fn is_well_formed(&self) -> bool {
        let mut prev: Option<TurnKind> = None;
        for turn in self.turns.iter().filter(|t| !t.is_failed_answer()) {
            let kind = turn.kind();
            let ok = matches!(
                (prev, kind),
                (None, TurnKind::Question)
                    | (Some(TurnKind::Question), TurnKind::Answer)
                    | (Some(TurnKind::Answer), TurnKind::Feedback)
                    | (Some(TurnKind::Answer), TurnKind::Question)
                    | (Some(TurnKind::Feedback), TurnKind::Question)
            );
            if !ok {
                return false;
            }
            prev = Some(kind);
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_new_rejects_out_of_range() {
        assert_eq!(Score::new(0).map(Score::value), Some(0));
        assert_eq!(Score::new(3).map(Score::value), Some(3));
        assert_eq!(Score::new(4), None);
    }

    #[test]
    fn score_clamped_bounds() {
        assert_eq!(Score::clamped(-2).value(), 0);
        assert_eq!(Score::clamped(2).value(), 2);
        assert_eq!(Score::clamped(7).value(), 3);
    }

    #[test]
    fn turn_accessors() {
        let q = Turn::question("Q1", 1, 2);
        assert_eq!(q.kind(), TurnKind::Question);
        assert_eq!(q.text(), "Q1");

        let f = Turn::feedback("Nice", Score::new(2));
        assert_eq!(f.kind(), TurnKind::Feedback);
        assert_eq!(f.text(), "Nice");
    }

    #[test]
    fn new_answers_are_pending() {
        assert!(matches!(
            Turn::answer("hello"),
            Turn::Answer {
                status: AnswerStatus::Pending,
                ..
            }
        ));
    }

    #[test]
    fn full_cycle_is_well_formed() {
        let mut t = Transcript::new();
        t.push(Turn::question("Q1", 1, 2));
        t.push(Turn::answer("A1"));
        t.push(Turn::feedback("F1", Score::new(1)));
        t.push(Turn::question("Q2", 2, 2));
        t.push(Turn::answer("A2"));
        t.push(Turn::feedback("F2", Score::new(3)));
        assert!(t.is_well_formed());
        assert_eq!(t.question_count(), 2);
    }

    #[test]
    fn transcript_must_start_with_question() {
        let mut t = Transcript::new();
        t.push(Turn::answer("A1"));
        assert!(!t.is_well_formed());
    }

    #[test]
    fn double_question_is_malformed() {
        let mut t = Transcript::new();
        t.push(Turn::question("Q1", 1, 2));
        t.push(Turn::question("Q2", 2, 2));
        assert!(!t.is_well_formed());
    }

    #[test]
    fn failed_answers_are_skipped_by_invariant() {
        let mut t = Transcript::new();
        t.push(Turn::question("Q1", 1, 2));
        let failed = t.push(Turn::answer("A1"));
        assert!(t.set_answer_status(failed, AnswerStatus::Failed));
        t.push(Turn::answer("A1 again"));
        t.push(Turn::feedback("F1", None));
        assert!(t.is_well_formed());
    }

    #[test]
    fn last_failed_answer_only_for_current_question() {
        let mut t = Transcript::new();
        t.push(Turn::question("Q1", 1, 2));
        let a = t.push(Turn::answer("A1"));
        assert_eq!(t.last_failed_answer(), None);

        t.set_answer_status(a, AnswerStatus::Failed);
        assert_eq!(t.last_failed_answer(), Some(a));

        t.set_answer_status(a, AnswerStatus::Delivered);
        t.push(Turn::feedback("F1", None));
        assert_eq!(t.last_failed_answer(), None);
    }

    #[test]
    fn set_answer_status_ignores_non_answers() {
        let mut t = Transcript::new();
        let q = t.push(Turn::question("Q1", 1, 1));
        assert!(!t.set_answer_status(q, AnswerStatus::Failed));
        assert!(!t.set_answer_status(9, AnswerStatus::Failed));
    }
}
