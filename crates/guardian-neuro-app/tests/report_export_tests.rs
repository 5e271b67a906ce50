//! Integration tests for JSON export and the print region.

mod common;

use guardian_neuro_app::AppError;
use guardian_neuro_session::SessionStore;

use common::{MockTransport, fixture_report, ready_app};

#[test]
fn report_export_tests_export_without_report_fails() {
    let mut app = ready_app(SessionStore::in_memory(), MockTransport::with_valid_report());

    assert!(matches!(app.export_report_json(), Err(AppError::NoReport)));
    assert_eq!(app.case().copy_status.as_deref(), Some("Failed"));
    assert!(app.print_region().is_none());
}

#[test]
fn report_export_tests_export_is_pretty_json_of_current_report() {
    let mut app = ready_app(SessionStore::in_memory(), MockTransport::with_valid_report());
    app.analyze().expect("analysis");

    let exported = app.export_report_json().expect("export");
    assert!(exported.contains("\n  \"observations\""));
    let parsed: serde_json::Value = serde_json::from_str(&exported).expect("valid json");
    assert_eq!(parsed["potentialDiagnoses"][0]["confidence"], "High");
    assert_eq!(app.case().copy_status.as_deref(), Some("Copied!"));

    let region = app.print_region().expect("print region");
    assert!(region.starts_with("GuardianNeuro Diagnostic Report\n"));
    assert!(region.contains(&fixture_report().disclaimer));
    assert!(!region.contains("axial-01.png"));
}
