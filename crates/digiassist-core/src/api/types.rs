// Wire types for the diagnostic session API.
//
// Request and response bodies mirror the JSON the backend exchanges. Optional
// fields default so partially-populated responses still decode.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

// ---------------------------------------------------------------------------
// Session identifier
// ---------------------------------------------------------------------------

/// Opaque server-issued session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Company intake
// ---------------------------------------------------------------------------

/// Business sector offered on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "Technologie")]
    Technology,
    #[serde(rename = "Finance")]
    Finance,
    #[serde(rename = "Santé")]
    Health,
    #[serde(rename = "Éducation")]
    Education,
    #[serde(rename = "Commerce")]
    Retail,
    #[serde(rename = "Industrie")]
    Industry,
    #[serde(rename = "Services")]
    Services,
    #[serde(rename = "Autre")]
    Other,
}

impl Sector {
    pub const ALL: [Sector; 8] = [
        Sector::Technology,
        Sector::Finance,
        Sector::Health,
        Sector::Education,
        Sector::Retail,
        Sector::Industry,
        Sector::Services,
        Sector::Other,
    ];

    /// The string the backend stores for this sector.
    pub fn wire_name(self) -> &'static str {
        match self {
            Sector::Technology => "Technologie",
            Sector::Finance => "Finance",
            Sector::Health => "Santé",
            Sector::Education => "Éducation",
            Sector::Retail => "Commerce",
            Sector::Industry => "Industrie",
            Sector::Services => "Services",
            Sector::Other => "Autre",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Headcount bracket offered on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Micro,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-500")]
    Large,
    #[serde(rename = "500+")]
    Enterprise,
}

impl CompanySize {
    pub const ALL: [CompanySize; 5] = [
        CompanySize::Micro,
        CompanySize::Small,
        CompanySize::Medium,
        CompanySize::Large,
        CompanySize::Enterprise,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            CompanySize::Micro => "1-10",
            CompanySize::Small => "11-50",
            CompanySize::Medium => "51-200",
            CompanySize::Large => "201-500",
            CompanySize::Enterprise => "500+",
        }
    }
}

impl fmt::Display for CompanySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} employees", self.wire_name())
    }
}

/// Reasons an intake form cannot become a `CompanyProfile`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("Company name is required")]
    BlankName,
    #[error("Please choose a sector")]
    MissingSector,
    #[error("Please choose a company size")]
    MissingSize,
}

/// A temporary company record, passed by value into session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub sector: Sector,
    pub size: CompanySize,
}

impl CompanyProfile {
    /// Validate raw form input. The name is trimmed.
    pub fn from_form(
        name: &str,
        sector: Option<Sector>,
        size: Option<CompanySize>,
    ) -> Result<Self, IntakeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IntakeError::BlankName);
        }
        let sector = sector.ok_or(IntakeError::MissingSector)?;
        let size = size.ok_or(IntakeError::MissingSize)?;
        Ok(CompanyProfile {
            name: name.to_string(),
            sector,
            size,
        })
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of the fetch-next-question call.
///
/// Either carries a question with its progress counters, or `completed: true`
/// when the session has no questions left.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NextQuestion {
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub criterion_id: Option<String>,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub pillar: Option<String>,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl NextQuestion {
    /// The question served by this response, if any.
    pub fn served(&self) -> Option<ServedQuestion> {
        if self.completed {
            return None;
        }
        let text = self.question_text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }
        Some(ServedQuestion {
            question_id: self.question_id.clone(),
            question_text: text.to_string(),
            criterion_id: self.criterion_id.clone(),
            dimension: self.dimension.clone(),
            pillar: self.pillar.clone(),
        })
    }
}

/// A question as embedded in an answer receipt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServedQuestion {
    #[serde(default)]
    pub question_id: Option<String>,
    pub question_text: String,
    #[serde(default)]
    pub criterion_id: Option<String>,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub pillar: Option<String>,
}

/// Response of the submit-answer call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnswerReceipt {
    #[serde(default)]
    pub ai_reaction: Option<String>,
    /// Raw server score, rounded to an integer. Converted to a bounded
    /// `Score` by the flow.
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: Option<i64>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub next_question: Option<ServedQuestion>,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// The score is relayed from a language model, so it may arrive as an
/// integer, a float, or a numeric string. Anything else decodes as `None`
/// rather than failing the whole receipt.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|value| {
        let score = score_from_value(value);
        if score.is_none() && !value.is_null() {
            warn!(%value, "unusable score in answer receipt, ignoring");
        }
        score
    }))
}

fn score_from_value(value: &Value) -> Option<i64> {
    let as_float = match value {
        Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                return Some(int);
            }
            n.as_f64()
        }
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    as_float.is_finite().then(|| as_float.round() as i64)
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Server-computed maturity classification. Unknown levels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MaturityLevel {
    Beginner,
    Emergent,
    Challenger,
    Leader,
    Other(String),
}

impl From<String> for MaturityLevel {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "beginner" => MaturityLevel::Beginner,
            "emergent" => MaturityLevel::Emergent,
            "challenger" => MaturityLevel::Challenger,
            "leader" => MaturityLevel::Leader,
            _ => MaturityLevel::Other(raw),
        }
    }
}

impl From<MaturityLevel> for String {
    fn from(level: MaturityLevel) -> Self {
        match level {
            MaturityLevel::Beginner => "beginner".into(),
            MaturityLevel::Emergent => "emergent".into(),
            MaturityLevel::Challenger => "challenger".into(),
            MaturityLevel::Leader => "leader".into(),
            MaturityLevel::Other(raw) => raw,
        }
    }
}

impl fmt::Display for MaturityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaturityLevel::Beginner => f.write_str("Beginner"),
            MaturityLevel::Emergent => f.write_str("Emergent"),
            MaturityLevel::Challenger => f.write_str("Challenger"),
            MaturityLevel::Leader => f.write_str("Leader"),
            MaturityLevel::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaturityProfile {
    pub level: MaturityLevel,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarScore {
    pub pillar_code: String,
    #[serde(default)]
    pub pillar_name: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub max_score: f64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub answered_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension_code: String,
    #[serde(default)]
    pub dimension_name: String,
    /// Score on the 0-3 scale.
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub pillar_scores: Vec<PillarScore>,
    #[serde(default)]
    pub answered_count: u32,
}

impl DimensionScore {
    /// Percentage for display, derived from the 0-3 score when the server
    /// omits it.
    pub fn display_percentage(&self) -> f64 {
        self.percentage
            .unwrap_or(self.score / 3.0 * 100.0)
            .clamp(0.0, 100.0)
    }
}

/// Aggregate results of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResults {
    pub session_id: SessionId,
    #[serde(default)]
    pub company_name: String,
    /// Global score on the 0-3 scale.
    pub global_score: f64,
    #[serde(default)]
    pub global_percentage: Option<f64>,
    pub maturity_profile: MaturityProfile,
    #[serde(default)]
    pub dimension_scores: Vec<DimensionScore>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
