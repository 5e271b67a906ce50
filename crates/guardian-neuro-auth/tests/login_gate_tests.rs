//! Integration tests for demo login behavior.

use std::sync::Arc;

use guardian_neuro_auth::{AuthError, AuthGate, AuthState, StaticCredentialTable};
use guardian_neuro_session::SessionStore;

fn demo_gate(store: SessionStore) -> AuthGate {
    AuthGate::new(store, Arc::new(StaticCredentialTable::demo()))
}

#[test]
fn login_gate_tests_accept_only_the_fixed_pair() {
    let gate = demo_gate(SessionStore::in_memory());

    for (username, password) in [
        ("demo", "wrong"),
        ("DEMO", "demo123"),
        ("demo", "demo1234"),
        ("admin", "demo123"),
        ("", ""),
        ("demo ", "demo123"),
    ] {
        assert!(matches!(
            gate.attempt_login(username, password),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(!gate.is_authenticated());
    }

    gate.attempt_login("demo", "demo123").expect("demo pair logs in");
    assert_eq!(gate.state(), AuthState::Authenticated);
}

#[test]
fn login_gate_tests_repeated_login_is_idempotent() {
    let gate = demo_gate(SessionStore::in_memory());
    for _ in 0..3 {
        gate.attempt_login("demo", "demo123").expect("login");
        assert!(gate.is_authenticated());
    }
}

#[test]
fn login_gate_tests_failed_login_keeps_existing_session() {
    let gate = demo_gate(SessionStore::in_memory());
    gate.attempt_login("demo", "demo123").expect("login");
    assert!(gate.attempt_login("demo", "wrong").is_err());
    assert!(gate.is_authenticated());
}

#[test]
fn login_gate_tests_exhausted_quota_does_not_block_login() {
    let store = SessionStore::in_memory();
    for _ in 0..50 {
        store.increment_request_count().expect("increment");
    }
    let gate = demo_gate(store);

    assert!(!gate.login_available());
    gate.attempt_login("demo", "demo123").expect("gate itself allows login");
    assert!(gate.is_authenticated());
    assert!(!gate.can_make_request());
}

#[test]
fn login_gate_tests_logout_keeps_request_count() {
    let store = SessionStore::in_memory();
    let gate = demo_gate(store.clone());
    gate.attempt_login("demo", "demo123").expect("login");
    store.increment_request_count().expect("increment");

    let _reset = gate.logout().expect("logout");
    assert!(!gate.is_authenticated());
    assert_eq!(store.request_count(), 1);
    assert_eq!(gate.remaining_requests(), 49);
}
