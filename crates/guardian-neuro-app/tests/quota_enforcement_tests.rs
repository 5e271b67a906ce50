//! Integration tests for quota gating around analysis.

mod common;

use guardian_neuro_app::AppError;
use guardian_neuro_session::SessionStore;

use common::{MockTransport, fixture_report, ready_app};

#[test]
fn quota_enforcement_tests_success_consumes_exactly_one_request() {
    let store = SessionStore::in_memory();
    let transport = MockTransport::with_valid_report();
    let mut app = ready_app(store.clone(), transport.clone());

    let report = app.analyze().expect("analysis succeeds");
    assert_eq!(report, fixture_report());
    assert_eq!(store.request_count(), 1);
    assert_eq!(app.gate().remaining_requests(), 49);
    assert_eq!(transport.calls(), 1);
    assert_eq!(app.case().report.as_ref(), Some(&report));
    assert!(app.case().error.is_none());
    assert!(!app.case().loading);
}

#[test]
fn quota_enforcement_tests_fifty_first_request_never_reaches_network() {
    let store = SessionStore::in_memory();
    let transport = MockTransport::with_valid_report();
    let mut app = ready_app(store.clone(), transport.clone());

    for _ in 0..50 {
        app.analyze().expect("within quota");
    }
    assert_eq!(transport.calls(), 50);
    assert_eq!(app.gate().remaining_requests(), 0);

    let error = app.analyze().expect_err("quota exhausted");
    assert!(matches!(error, AppError::QuotaExhausted));
    assert_eq!(
        app.case().error.as_deref(),
        Some("Request limit reached. No analysis requests remaining.")
    );
    assert_eq!(transport.calls(), 50);
    assert_eq!(store.request_count(), 50);
    assert!(!app.status().can_analyze);
}

#[test]
fn quota_enforcement_tests_api_error_leaves_count_unchanged() {
    let store = SessionStore::in_memory();
    let transport =
        MockTransport::answering(500, r#"{"error":{"code":500,"message":"quota exceeded"}}"#);
    let mut app = ready_app(store.clone(), transport.clone());

    let error = app.analyze().expect_err("server error");
    assert_eq!(error.user_message(), "API Error: quota exceeded");
    assert_eq!(app.case().error.as_deref(), Some("API Error: quota exceeded"));
    assert_eq!(store.request_count(), 0);
    assert_eq!(transport.calls(), 1);
}

#[test]
fn quota_enforcement_tests_failed_parse_does_not_consume_quota() {
    let store = SessionStore::in_memory();
    let transport = MockTransport::answering(200, "not json at all");
    let mut app = ready_app(store.clone(), transport.clone());

    let error = app.analyze().expect_err("malformed");
    assert_eq!(
        error.user_message(),
        "Failed to get a valid analysis from the API."
    );
    assert_eq!(store.request_count(), 0);

    transport.set_response(200, r#"{"candidates":[]}"#);
    let error = app.analyze().expect_err("empty");
    assert_eq!(
        error.user_message(),
        "Failed to get a valid analysis from the API."
    );
    assert_eq!(store.request_count(), 0);
}

#[test]
fn quota_enforcement_tests_safety_stop_shows_specific_message() {
    let store = SessionStore::in_memory();
    let transport = MockTransport::answering(
        200,
        r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
    );
    let mut app = ready_app(store.clone(), transport);

    let error = app.analyze().expect_err("safety stop");
    assert_eq!(
        app.case().error.as_deref(),
        Some(
            "Analysis stopped due to safety settings. \
             One or more images may contain sensitive content."
        )
    );
    assert_eq!(error.user_message(), app.case().error.clone().unwrap_or_default());
    assert_eq!(store.request_count(), 0);
}

#[test]
fn quota_enforcement_tests_error_clears_on_next_success() {
    let store = SessionStore::in_memory();
    let transport = MockTransport::answering(503, "");
    let mut app = ready_app(store.clone(), transport.clone());

    assert!(app.analyze().is_err());
    assert!(app.case().error.is_some());

    transport.set_response(200, common::valid_envelope());
    app.analyze().expect("recovered");
    assert!(app.case().error.is_none());
    assert_eq!(store.request_count(), 1);
}
