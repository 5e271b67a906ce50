#![warn(missing_docs)]
//! # guardian-neuro-analysis-contract
//!
//! ## Purpose
//! Defines the structured analysis report and extracts it from the remote
//! service's response envelope.
//!
//! ## Responsibilities
//! - Parse the `generateContent` envelope and the JSON report it carries.
//! - Distinguish safety stops from malformed or empty answers.
//! - Map confidence labels to display tiers, keeping unknown labels verbatim.
//! - Extract server error messages from non-2xx bodies.
//! - Render the report as pretty JSON for export.
//!
//! ## Data flow
//! Raw response text -> [`parse_report`] -> [`AnalysisReport`] ->
//! [`ConfidenceTier::classify`] during rendering.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs so they outlive the transient response
//! buffer.
//!
//! ## Error model
//! [`AnalysisError`] separates malformed JSON, safety stops, and empty
//! responses. Missing report fields are not errors: they default to empty.
//!
//! ## Security and privacy notes
//! This crate processes only model output and never sees the API key.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Finish/block reason that marks a safety stop.
pub const SAFETY_REASON: &str = "SAFETY";

/// Structured report returned by the remote model.
///
/// Every field defaults when absent or `null` so renderers can assume total
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Free-text findings.
    #[serde(default, deserialize_with = "null_as_default")]
    pub observations: Vec<String>,
    /// Candidate diagnoses with self-reported confidence.
    #[serde(default, deserialize_with = "null_as_default")]
    pub potential_diagnoses: Vec<PotentialDiagnosis>,
    /// Suggested next steps.
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
    /// Model-supplied disclaimer text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub disclaimer: String,
}

/// One candidate diagnosis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialDiagnosis {
    /// Diagnosis name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub diagnosis: String,
    /// Confidence label as returned; usually `High`, `Medium` or `Low`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: String,
}

impl PotentialDiagnosis {
    /// Returns the display tier for this diagnosis.
    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::classify(&self.confidence)
    }
}

/// Reads an explicit `null` as the type's empty default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Display tier for a confidence label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfidenceTier {
    /// High confidence.
    High,
    /// Medium confidence.
    Medium,
    /// Low confidence.
    Low,
    /// Label outside the schema enum, kept verbatim.
    Other(String),
}

impl ConfidenceTier {
    /// Classifies a label case-insensitively. Unknown labels are preserved.
    pub fn classify(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => ConfidenceTier::High,
            "medium" => ConfidenceTier::Medium,
            "low" => ConfidenceTier::Low,
            _ => ConfidenceTier::Other(label.to_string()),
        }
    }

    /// Returns the label shown to the user.
    pub fn label(&self) -> &str {
        match self {
            ConfidenceTier::High => "High",
            ConfidenceTier::Medium => "Medium",
            ConfidenceTier::Low => "Low",
            ConfidenceTier::Other(label) => label.as_str(),
        }
    }
}

/// Outer `generateContent` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Candidate answers; only the first is used.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Prompt-level feedback, present when the prompt itself was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One candidate answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Answer content; absent when generation stopped early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CandidateContent>,
    /// Why generation stopped (`STOP`, `SAFETY`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Candidate content parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateContent {
    /// Answer parts; the first carries the JSON text.
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

/// One answer part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePart {
    /// Text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Prompt-level block information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Block reason, for example `SAFETY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl ResponseEnvelope {
    /// Wraps report JSON text the way the remote service does.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![CandidatePart {
                        text: Some(text.into()),
                    }],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        }
    }

    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|text| !text.is_empty())
    }

    fn safety_stopped(&self) -> bool {
        let candidate_stopped = self
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
            == Some(SAFETY_REASON);
        let prompt_blocked = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
            == Some(SAFETY_REASON);
        candidate_stopped || prompt_blocked
    }
}

/// Parses the raw response body into a report.
///
/// # Errors
/// - [`AnalysisError::MalformedJson`] when the envelope or the embedded
///   report text is not valid JSON of the expected shape.
/// - [`AnalysisError::SafetyBlocked`] when no text is present and the remote
///   service stopped for safety reasons.
/// - [`AnalysisError::EmptyResponse`] when no candidate text is present.
pub fn parse_report(raw: &str) -> Result<AnalysisReport, AnalysisError> {
    let envelope: ResponseEnvelope = serde_json::from_str(raw).map_err(malformed)?;

    if let Some(text) = envelope.first_text() {
        let value: serde_json::Value = serde_json::from_str(text).map_err(malformed)?;
        if !value.is_object() {
            return Err(AnalysisError::MalformedJson(
                "report is not a JSON object".to_string(),
            ));
        }
        return serde_json::from_value(value).map_err(malformed);
    }

    if envelope.safety_stopped() {
        return Err(AnalysisError::SafetyBlocked);
    }

    Err(AnalysisError::EmptyResponse)
}

/// Renders the report as 2-space-indented JSON for export.
///
/// # Errors
/// Returns [`AnalysisError::MalformedJson`] if serialization fails.
pub fn report_to_pretty_json(report: &AnalysisReport) -> Result<String, AnalysisError> {
    serde_json::to_string_pretty(report).map_err(malformed)
}

fn malformed(error: serde_json::Error) -> AnalysisError {
    AnalysisError::MalformedJson(error.to_string())
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extracts `error.message` from a non-2xx response body.
///
/// Returns `None` when the body does not follow the error envelope.
pub fn extract_api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .and_then(|wrapper| wrapper.error.message)
        .filter(|message| !message.trim().is_empty())
}

/// Analysis response errors.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Envelope or report text is not valid JSON of the expected shape.
    #[error("malformed analysis json: {0}")]
    MalformedJson(String),
    /// Remote service stopped generation for safety reasons.
    #[error("analysis stopped due to safety settings")]
    SafetyBlocked,
    /// No candidate answer was present.
    #[error("analysis response contained no candidate answer")]
    EmptyResponse,
}
