#![warn(missing_docs)]
//! # guardian-neuro-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `guardian-neuro` workspace
//! and builds the outbound analysis request.
//!
//! ## Responsibilities
//! - Represent accepted scan images and optional patient context.
//! - Synthesize the radiologist prompt with `N/A` defaults for blank fields.
//! - Declare the strict response schema and deterministic generation config.
//! - Encode the request into the `generateContent` wire payload.
//!
//! ## Data flow
//! Intake emits [`ScanImage`] values and the shell owns a [`PatientContext`].
//! On analyze, [`build_request`] produces an [`AnalysisRequest`], which is
//! converted into a [`GenerateContentRequest`] for transport.
//!
//! ## Ownership and lifetimes
//! Requests own copies of the base64 payloads so the image list can keep
//! changing while a request is in flight.
//!
//! ## Error model
//! An empty image set returns [`CoreError::NoImages`]. Callers are expected to
//! check this before building and surface it as a validation message.
//!
//! ## Security and privacy notes
//! Patient fields and image payloads are never logged by this crate.
//!
//! ## Example
//! ```rust
//! use guardian_neuro_core::{build_request, ImageMime, PatientContext, ScanImage};
//!
//! let image = ScanImage::from_bytes("slice-01.png", ImageMime::Png, &[0x89, 0x50]);
//! let request = build_request(&[image], &PatientContext::default()).unwrap();
//! assert!(request.prompt.contains("Name: N/A"));
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Literal substituted for blank patient fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// MIME type requested for the structured response.
pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// Closed set of confidence labels declared in the response schema.
pub const CONFIDENCE_LABELS: [&str; 3] = ["High", "Medium", "Low"];

/// Image formats accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMime {
    /// `image/jpeg`
    #[serde(rename = "image/jpeg")]
    Jpeg,
    /// `image/png`
    #[serde(rename = "image/png")]
    Png,
}

impl ImageMime {
    /// Returns the canonical MIME string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
        }
    }

    /// Parses a MIME string; only JPEG and PNG are accepted.
    pub fn from_mime_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            _ => None,
        }
    }
}

/// One accepted scan image held in the in-memory case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanImage {
    /// Original file name, used for listing previews.
    pub file_name: String,
    /// Detected image format.
    pub mime_type: ImageMime,
    /// Displayable data URI (`data:<mime>;base64,<payload>`).
    pub preview_uri: String,
    /// Raw bytes in standard base64, without any data URI header.
    pub base64_payload: String,
}

impl ScanImage {
    /// Encodes raw file bytes into a scan image.
    pub fn from_bytes(file_name: impl Into<String>, mime_type: ImageMime, bytes: &[u8]) -> Self {
        let base64_payload = BASE64_STANDARD.encode(bytes);
        let preview_uri = format!("data:{};base64,{base64_payload}", mime_type.as_str());
        Self {
            file_name: file_name.into(),
            mime_type,
            preview_uri,
            base64_payload,
        }
    }
}

/// Optional free-text patient fields attached to a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    /// Patient name.
    pub name: String,
    /// Patient age, kept as typed.
    pub age: String,
    /// Patient gender.
    pub gender: String,
    /// Brief clinical history or indication.
    pub history: String,
}

impl PatientContext {
    /// Returns `true` when every field is blank.
    pub fn is_blank(&self) -> bool {
        [&self.name, &self.age, &self.gender, &self.history]
            .iter()
            .all(|field| field.trim().is_empty())
    }

    /// Renders the single-line context block embedded in the prompt.
    pub fn summary_line(&self) -> String {
        format!(
            "Patient Context: Name: {}, Age: {}, Gender: {}, Clinical History: {}.",
            or_not_available(&self.name),
            or_not_available(&self.age),
            or_not_available(&self.gender),
            or_not_available(&self.history),
        )
    }
}

fn or_not_available(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        NOT_AVAILABLE
    } else {
        trimmed
    }
}

/// Sampling parameters requested from the remote model.
///
/// These ask for maximally deterministic output; the remote side does not
/// guarantee exact reproducibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability mass.
    pub top_p: f32,
    /// Number of top tokens considered.
    pub top_k: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.1,
            top_k: 1,
        }
    }
}

/// Fully assembled analysis request; built fresh for every submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Instruction block including the patient context line.
    pub prompt: String,
    /// Images in the order they appear in the case.
    pub images: Vec<InlineData>,
    /// Requested sampling parameters.
    pub settings: GenerationSettings,
}

impl AnalysisRequest {
    /// Converts the request into the `generateContent` wire payload.
    pub fn to_wire(&self) -> GenerateContentRequest {
        let mut parts = Vec::with_capacity(self.images.len() + 1);
        parts.push(Part::Text {
            text: self.prompt.clone(),
        });
        parts.extend(self.images.iter().cloned().map(|inline_data| Part::InlineData {
            inline_data,
        }));

        GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                top_p: self.settings.top_p,
                top_k: self.settings.top_k,
                response_mime_type: RESPONSE_MIME_TYPE.to_string(),
                response_schema: report_response_schema(),
            },
        }
    }

    /// Serializes the wire payload to compact JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(&self.to_wire()).map_err(CoreError::Codec)
    }
}

/// Request body for `models/<model>:generateContent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; always exactly one user turn here.
    pub contents: Vec<Content>,
    /// Sampling and output-shape configuration.
    pub generation_config: GenerationConfig,
}

/// One content turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Ordered text and image parts.
    pub parts: Vec<Part>,
}

/// Text or inline binary part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// Prompt text.
    Text {
        /// Text content.
        text: String,
    },
    /// Inline base64 image.
    InlineData {
        /// Image payload.
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 image payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type string.
    pub mime_type: String,
    /// Base64 bytes, no header.
    pub data: String,
}

/// Generation parameters sent with each request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability mass.
    pub top_p: f32,
    /// Top-k token selection.
    pub top_k: u32,
    /// Output MIME type (`application/json`).
    pub response_mime_type: String,
    /// Schema the remote model is instructed to follow.
    pub response_schema: Value,
}

/// Builds the radiologist prompt for the given patient context.
pub fn build_prompt(context: &PatientContext) -> String {
    format!(
        "{}\n\
         Role: Act as a board-certified radiologist.\n\
         Task: Analyze the provided series of CT head scan images with utmost precision, \
         considering the patient context. Synthesize findings from all images into a single \
         JSON report.\n\
         Instructions: Examine the entire series for abnormalities (hemorrhage, stroke, tumors, \
         fractures, edema, etc.). Based on your findings, populate the JSON object according to \
         the provided schema. Ensure the observations, diagnoses, and recommendations are clear \
         and concise. Rate each potential diagnosis with a confidence of High, Medium, or Low.",
        context.summary_line()
    )
}

/// Returns the response schema declared to the remote service.
///
/// The schema uses the remote API's OpenAPI subset (upper-case type names).
/// All four top-level fields are required and confidence is a closed enum.
pub fn report_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "observations": { "type": "ARRAY", "items": { "type": "STRING" } },
            "potentialDiagnoses": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "diagnosis": { "type": "STRING" },
                        "confidence": { "type": "STRING", "enum": CONFIDENCE_LABELS }
                    },
                    "required": ["diagnosis", "confidence"]
                }
            },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
            "disclaimer": { "type": "STRING" }
        },
        "required": ["observations", "potentialDiagnoses", "recommendations", "disclaimer"]
    })
}

/// Assembles an analysis request from the current case.
///
/// # Errors
/// Returns [`CoreError::NoImages`] when `images` is empty.
pub fn build_request(
    images: &[ScanImage],
    context: &PatientContext,
) -> Result<AnalysisRequest, CoreError> {
    if images.is_empty() {
        return Err(CoreError::NoImages);
    }

    Ok(AnalysisRequest {
        prompt: build_prompt(context),
        images: images
            .iter()
            .map(|image| InlineData {
                mime_type: image.mime_type.as_str().to_string(),
                data: image.base64_payload.clone(),
            })
            .collect(),
        settings: GenerationSettings::default(),
    })
}

/// Error type for request construction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// At least one image is required.
    #[error("at least one scan image is required")]
    NoImages,
    /// JSON encoding failure.
    #[error("payload codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
