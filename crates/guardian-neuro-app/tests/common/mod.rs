//! Shared fixtures for app integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use guardian_neuro_analysis_contract::{AnalysisReport, PotentialDiagnosis, ResponseEnvelope};
use guardian_neuro_app::{AppConfig, ConfigError, GuardianApp, build_analysis_client};
use guardian_neuro_auth::{AuthGate, StaticCredentialTable};
use guardian_neuro_client::{AnalysisTransport, ClientError, TransportResponse};
use guardian_neuro_intake::MemoryImageSource;
use guardian_neuro_session::SessionStore;
use url::Url;

/// Transport replaying one canned response and counting calls.
#[derive(Debug)]
pub struct MockTransport {
    response: Mutex<TransportResponse>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockTransport {
    /// Answers every call with `status` and `body`.
    pub fn answering(status: u16, body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(TransportResponse {
                status,
                body: body.into(),
            }),
            calls: AtomicUsize::new(0),
        })
    }

    /// Answers every call with a valid report envelope.
    pub fn with_valid_report() -> Arc<Self> {
        Self::answering(200, valid_envelope())
    }

    /// Replaces the canned response for subsequent calls.
    pub fn set_response(&self, status: u16, body: impl Into<String>) {
        if let Ok(mut response) = self.response.lock() {
            *response = TransportResponse {
                status,
                body: body.into(),
            };
        }
    }

    /// Number of requests that reached the transport.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnalysisTransport for MockTransport {
    fn post_json(&self, _url: &Url, _body: Vec<u8>) -> Result<TransportResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.lock().expect("response lock").clone())
    }
}

/// Config resolved with a test API key.
pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|name| (name == "GUARDIAN_NEURO_API_KEY").then(|| "test-key".to_string()))
}

/// Report returned by [`valid_envelope`].
#[allow(dead_code)]
pub fn fixture_report() -> AnalysisReport {
    AnalysisReport {
        observations: vec!["No acute intracranial hemorrhage.".to_string()],
        potential_diagnoses: vec![PotentialDiagnosis {
            diagnosis: "Normal study".to_string(),
            confidence: "High".to_string(),
        }],
        recommendations: vec!["Clinical correlation.".to_string()],
        disclaimer: "Not a substitute for a radiologist.".to_string(),
    }
}

/// Serialized envelope carrying [`fixture_report`].
pub fn valid_envelope() -> String {
    let report = serde_json::to_string(&fixture_report()).expect("report serializes");
    serde_json::to_string(&ResponseEnvelope::with_text(report)).expect("envelope serializes")
}

/// Image source holding one PNG and one JPEG.
pub fn fixture_source() -> Arc<MemoryImageSource> {
    Arc::new(
        MemoryImageSource::new()
            .with_file("axial-01.png", vec![0x89, b'P', b'N', b'G'])
            .with_file("axial-02.jpg", vec![0xFF, 0xD8, 0xFF]),
    )
}

/// Builds an app over an in-memory session and the given transport.
pub fn app_with(store: SessionStore, transport: Arc<MockTransport>) -> GuardianApp {
    let gate = AuthGate::new(store, Arc::new(StaticCredentialTable::demo()));
    let client = build_analysis_client(&test_config(), transport);
    GuardianApp::new(gate, client, fixture_source())
}

/// Builds an app whose analysis client failed to configure.
#[allow(dead_code)]
pub fn unconfigured_app(store: SessionStore) -> GuardianApp {
    let gate = AuthGate::new(store, Arc::new(StaticCredentialTable::demo()));
    GuardianApp::new(gate, Err(ConfigError::MissingApiKey), fixture_source())
}

/// Signed-in app with one image ready to analyze.
#[allow(dead_code)]
pub fn ready_app(store: SessionStore, transport: Arc<MockTransport>) -> GuardianApp {
    let mut app = app_with(store, transport);
    app.login("demo", "demo123").expect("demo login");
    let rejected = app.add_images(&["axial-01.png"]);
    assert!(rejected.is_empty());
    app
}
