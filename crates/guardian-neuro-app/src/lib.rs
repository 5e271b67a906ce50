#![warn(missing_docs)]
//! # guardian-neuro-app
//!
//! ## Purpose
//! Orchestrates session, auth, intake, request building, remote analysis and
//! view state for `guardian-neuro`.
//!
//! ## Responsibilities
//! - Resolve configuration from the environment.
//! - Enforce auth, validation, quota and configuration gates before any
//!   network call.
//! - Consume quota only after a report parses successfully.
//! - Map subsystem failures to the user-visible messages of the shell.
//! - Provide log redaction and tracing initialization helpers.
//!
//! ## Data flow
//! Login -> image intake + patient fields -> [`GuardianApp::analyze`] ->
//! request builder -> remote client -> report parser -> quota increment ->
//! case state -> text rendering.
//!
//! ## Ownership and lifetimes
//! [`GuardianApp`] owns the transient [`CaseState`]; the session store is
//! shared with the auth gate through cloned handles over one backend.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]; every error is also
//! recorded in the case state as a display string and never ends the
//! session.
//!
//! ## Security and privacy notes
//! - The API key is read from the environment and never logged.
//! - Credentials are traced by length only.
//! - [`redact_sensitive`] strips secret markers from log-bound strings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use guardian_neuro_analysis_contract::{
    AnalysisError, AnalysisReport, parse_report, report_to_pretty_json,
};
use guardian_neuro_auth::{
    AuthError, AuthGate, LOW_QUOTA_THRESHOLD, MAX_REQUESTS, StaticCredentialTable,
};
use guardian_neuro_client::{
    AnalysisClient, AnalysisTransport, ClientError, DEFAULT_API_BASE, DEFAULT_MODEL,
    DEFAULT_TIMEOUT_SECS, GenerateContentEndpoint, HttpTransport,
};
use guardian_neuro_core::{CoreError, PatientContext, ScanImage, build_request};
use guardian_neuro_intake::{FsImageSource, ImageSource, RejectedFile, decode_batch};
use guardian_neuro_session::{FileKeyValueStore, SessionStore, StoreError};
use guardian_neuro_ui::{CaseState, LoginPanel, render_print_region};
use thiserror::Error;

/// Build-time application version loaded from root `VERSION`.
pub const APP_VERSION: &str = env!("GUARDIAN_NEURO_VERSION");

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "GUARDIAN_NEURO_API_KEY";
/// Environment variable overriding the model name.
pub const ENV_MODEL: &str = "GUARDIAN_NEURO_MODEL";
/// Environment variable overriding the API base URL.
pub const ENV_API_BASE: &str = "GUARDIAN_NEURO_API_BASE";
/// Environment variable overriding the session data directory.
pub const ENV_DATA_DIR: &str = "GUARDIAN_NEURO_DATA_DIR";
/// Environment variable overriding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "GUARDIAN_NEURO_TIMEOUT_SECS";
/// Environment variable overriding the default log filter.
pub const ENV_LOG: &str = "GUARDIAN_NEURO_LOG";

const DEFAULT_LOG_FILTER: &str = "info";
const NO_SUPPORTED_IMAGES: &str =
    "No supported images selected. Only JPEG and PNG files are accepted.";
const DATA_DIR_NAME: &str = "guardian-neuro";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Runtime configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// API key; `None` disables analysis with a configuration error.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// API base URL.
    pub api_base: String,
    /// Directory holding `session.json`.
    pub data_dir: PathBuf,
    /// Remote call timeout.
    pub timeout: Duration,
    /// Default tracing filter (overridden by `RUST_LOG`).
    pub log_filter: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("data_dir", &self.data_dir)
            .field("timeout", &self.timeout)
            .field("log_filter", &self.log_filter)
            .finish()
    }
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let timeout_secs = read(ENV_TIMEOUT_SECS)
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key: read(ENV_API_KEY),
            model: read(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: read(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            data_dir: read(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            timeout: Duration::from_secs(timeout_secs),
            log_filter: read(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Returns the API key.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingApiKey`] when unset.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Human-readable startup warnings; empty when fully configured.
    pub fn startup_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Err(error) = self.require_api_key() {
            warnings.push(format!("{error} ({ENV_API_KEY})"));
        }
        warnings
    }
}

/// Default session directory: platform data dir, or `./.guardian-neuro`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{DATA_DIR_NAME}")))
}

/// Builds the analysis client for `config` over the given transport.
///
/// # Errors
/// Returns [`ConfigError::MissingApiKey`] or [`ConfigError::InvalidEndpoint`].
pub fn build_analysis_client(
    config: &AppConfig,
    transport: Arc<dyn AnalysisTransport>,
) -> Result<AnalysisClient, ConfigError> {
    let api_key = config.require_api_key()?;
    let endpoint = GenerateContentEndpoint::new(&config.api_base, &config.model, api_key)
        .map_err(|error| ConfigError::InvalidEndpoint(error.to_string()))?;
    Ok(AnalysisClient::new(endpoint, transport))
}

/// Flat status snapshot for the shell's status view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStatus {
    /// Whether the demo session is active.
    pub authenticated: bool,
    /// Remaining successful analyses.
    pub remaining_requests: u32,
    /// Quota ceiling.
    pub max_requests: u32,
    /// Whether analysis is configured (API key present and valid).
    pub analysis_configured: bool,
    /// Number of images in the case.
    pub images: usize,
    /// Whether the analyze action is enabled.
    pub can_analyze: bool,
    /// Report pane status text.
    pub analysis: String,
}

/// Interactive case controller.
pub struct GuardianApp {
    gate: AuthGate,
    client: Result<AnalysisClient, ConfigError>,
    source: Arc<dyn ImageSource>,
    case: CaseState,
}

impl GuardianApp {
    /// Assembles a controller from explicit collaborators.
    pub fn new(
        gate: AuthGate,
        client: Result<AnalysisClient, ConfigError>,
        source: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            gate,
            client,
            source,
            case: CaseState::new(),
        }
    }

    /// Builds the production controller: file-backed session store, demo
    /// credential table, HTTP transport and filesystem image source.
    ///
    /// A missing API key does not fail construction; it is reported when an
    /// analysis is attempted.
    pub fn from_config(config: &AppConfig) -> Self {
        let store = SessionStore::new(Arc::new(FileKeyValueStore::in_dir(&config.data_dir)));
        let gate = AuthGate::new(store, Arc::new(StaticCredentialTable::demo()));
        let client = HttpTransport::new(config.timeout)
            .map_err(|error| ConfigError::Transport(error.to_string()))
            .and_then(|transport| build_analysis_client(config, Arc::new(transport)));

        if let Err(error) = &client {
            tracing::warn!(%error, "analysis disabled until configuration is fixed");
        }
        Self::new(gate, client, Arc::new(FsImageSource))
    }

    /// Returns the auth gate.
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Returns the current case.
    pub fn case(&self) -> &CaseState {
        &self.case
    }

    /// Returns the login panel projection.
    pub fn login_panel(&self) -> LoginPanel {
        LoginPanel::new(
            self.gate.remaining_requests(),
            MAX_REQUESTS,
            LOW_QUOTA_THRESHOLD,
        )
    }

    /// Attempts a demo login through the login panel.
    ///
    /// The panel's submit action is disabled once the quota is exhausted, so
    /// no credential check happens in that state.
    ///
    /// # Errors
    /// Returns [`AppError::QuotaExhausted`] when the panel is disabled, or
    /// [`AppError::Auth`] for rejected credentials or storage failures.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), AppError> {
        if !self.login_panel().submit_enabled() {
            return Err(AppError::QuotaExhausted);
        }
        self.gate.attempt_login(username, password).map_err(AppError::Auth)
    }

    /// Logs out and discards all in-memory case state.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] when the flag cannot be cleared; the case is
    /// kept in that situation.
    pub fn logout(&mut self) -> Result<(), AppError> {
        let _reset = self.gate.logout().map_err(AppError::Auth)?;
        self.case.clear_case();
        Ok(())
    }

    /// Decodes a multi-file selection and commits accepted images at once.
    ///
    /// A selection with no accepted file leaves images and report untouched
    /// and shows an error instead. Returns the rejected files so the caller
    /// can report them.
    pub fn add_images<P: AsRef<Path>>(&mut self, paths: &[P]) -> Vec<RejectedFile> {
        let batch = decode_batch(self.source.as_ref(), paths);
        if batch.is_empty() {
            if !batch.rejected.is_empty() {
                self.case.show_error(NO_SUPPORTED_IMAGES);
            }
            return batch.rejected;
        }
        self.case.commit_images(batch.accepted);
        batch.rejected
    }

    /// Removes one image by zero-based index.
    pub fn remove_image(&mut self, index: usize) -> Option<ScanImage> {
        self.case.remove_image(index)
    }

    /// Replaces the patient fields.
    pub fn set_patient(&mut self, patient: PatientContext) {
        self.case.patient = patient;
    }

    /// Returns a mutable handle to the patient fields.
    pub fn patient_mut(&mut self) -> &mut PatientContext {
        &mut self.case.patient
    }

    /// Clears images, patient fields, report and error.
    pub fn clear_case(&mut self) {
        self.case.clear_case();
    }

    /// Runs one analysis for the current case.
    ///
    /// Gates are checked in order (session, images, quota, configuration)
    /// and none of them reaches the network. Quota is consumed only after the
    /// report parses.
    ///
    /// # Errors
    /// Returns the gating or remote/parse failure; the same failure is also
    /// recorded in the case state as its user message.
    pub fn analyze(&mut self) -> Result<AnalysisReport, AppError> {
        if !self.gate.is_authenticated() {
            return self.fail(AppError::NotAuthenticated);
        }
        if self.case.images.is_empty() {
            return self.fail(AppError::Validation);
        }
        if !self.gate.can_make_request() {
            tracing::warn!("analysis refused: request quota exhausted");
            return self.fail(AppError::QuotaExhausted);
        }
        let client = match &self.client {
            Ok(client) => client.clone(),
            Err(error) => {
                let error = error.clone();
                return self.fail(AppError::Config(error));
            }
        };
        let request = match build_request(&self.case.images, &self.case.patient) {
            Ok(request) => request,
            Err(CoreError::NoImages) => return self.fail(AppError::Validation),
            Err(error) => return self.fail(AppError::Core(error)),
        };

        self.case.begin_analysis();
        let outcome = client
            .submit(&request)
            .map_err(AppError::Remote)
            .and_then(|raw| parse_report(&raw).map_err(AppError::Analysis));

        match outcome {
            Ok(report) => {
                match self.gate.session().increment_request_count() {
                    Ok(count) => tracing::info!(
                        request_count = count,
                        remaining = self.gate.remaining_requests(),
                        "analysis complete"
                    ),
                    Err(error) => tracing::error!(%error, "failed to persist request count"),
                }
                self.case.finish_with_report(report.clone());
                Ok(report)
            }
            Err(error) => self.fail(error),
        }
    }

    /// Clears the persisted request count.
    ///
    /// # Errors
    /// Returns [`AppError::Store`] when the session file cannot be written.
    pub fn reset_quota(&mut self) -> Result<(), AppError> {
        self.gate.session().reset_request_count()?;
        tracing::info!(remaining = self.gate.remaining_requests(), "request count reset");
        Ok(())
    }

    /// Pretty JSON export of the current report (2-space indent).
    ///
    /// # Errors
    /// Returns [`AppError::NoReport`] when there is nothing to export.
    pub fn export_report_json(&mut self) -> Result<String, AppError> {
        let exported = match &self.case.report {
            Some(report) => report_to_pretty_json(report).map_err(AppError::Analysis),
            None => Err(AppError::NoReport),
        };
        self.case.copy_status = Some(
            if exported.is_ok() { "Copied!" } else { "Failed" }.to_string(),
        );
        exported
    }

    /// Print region for the current report, if any.
    pub fn print_region(&self) -> Option<String> {
        self.case.report.as_ref().map(render_print_region)
    }

    /// Projects the current state into a flat snapshot.
    pub fn status(&self) -> RuntimeStatus {
        RuntimeStatus {
            authenticated: self.gate.is_authenticated(),
            remaining_requests: self.gate.remaining_requests(),
            max_requests: self.gate.max_requests(),
            analysis_configured: self.client.is_ok(),
            images: self.case.images.len(),
            can_analyze: self.case.can_submit() && self.gate.can_make_request(),
            analysis: self.case.status_line(),
        }
    }

    fn fail<T>(&mut self, error: AppError) -> Result<T, AppError> {
        tracing::warn!(error = %redact_sensitive(&error.to_string()), "analysis failed");
        self.case.finish_with_error(error.user_message());
        Err(error)
    }
}

/// Redacts common secret markers in log-safe output.
///
/// Everything after the first marker is replaced, which also covers URLs
/// carrying `key=` query credentials.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for marker in [
        "password",
        "token=",
        "token:",
        "authorization",
        "bearer",
        "key=",
    ] {
        redacted = redact_key_value(&redacted, marker);
    }
    redacted
}

fn redact_key_value(input: &str, marker: &str) -> String {
    let lower = input.to_ascii_lowercase();
    if let Some(position) = lower.find(marker) {
        let prefix = &input[..position];
        let key = marker.trim_end_matches(['=', ':']);
        return format!("{prefix}{key}=<redacted>");
    }

    input.to_string()
}

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this twice is
/// harmless.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No API key was configured.
    #[error("API key not configured. Please check your environment variables.")]
    MissingApiKey,
    /// API base or model produced an invalid endpoint.
    #[error("invalid analysis endpoint: {0}")]
    InvalidEndpoint(String),
    /// HTTP transport could not be created.
    #[error("http transport unavailable: {0}")]
    Transport(String),
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// No active demo session.
    #[error("not signed in")]
    NotAuthenticated,
    /// No images selected.
    #[error("no scan images selected")]
    Validation,
    /// Request quota is exhausted.
    #[error("request quota exhausted")]
    QuotaExhausted,
    /// Export requested without a report.
    #[error("no report available")]
    NoReport,
    /// Configuration prevents analysis.
    #[error("configuration error: {0}")]
    Config(ConfigError),
    /// Auth subsystem error.
    #[error("auth error: {0}")]
    Auth(AuthError),
    /// Session storage error.
    #[error("session error: {0}")]
    Store(#[from] StoreError),
    /// Request construction error.
    #[error("request error: {0}")]
    Core(CoreError),
    /// Remote call error.
    #[error("remote error: {0}")]
    Remote(ClientError),
    /// Response parse error.
    #[error("analysis error: {0}")]
    Analysis(AnalysisError),
}

impl AppError {
    /// Message shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotAuthenticated => "Please sign in with the demo account first.".to_string(),
            AppError::Validation => "Please upload at least one CT scan image.".to_string(),
            AppError::QuotaExhausted => {
                "Request limit reached. No analysis requests remaining.".to_string()
            }
            AppError::NoReport => "No report to export yet.".to_string(),
            AppError::Config(error) => error.to_string(),
            AppError::Auth(error) => error.to_string(),
            AppError::Store(error) => format!("Session storage error: {error}"),
            AppError::Core(error) => format!("Failed to build the analysis request: {error}"),
            AppError::Remote(error) => error.to_string(),
            AppError::Analysis(AnalysisError::SafetyBlocked) => {
                "Analysis stopped due to safety settings. \
                 One or more images may contain sensitive content."
                    .to_string()
            }
            AppError::Analysis(_) => "Failed to get a valid analysis from the API.".to_string(),
        }
    }
}
