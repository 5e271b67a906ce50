#![warn(missing_docs)]
//! # guardian-neuro-auth
//!
//! ## Purpose
//! Implements the demo access gate and request quota accounting for
//! `guardian-neuro`.
//!
//! ## Responsibilities
//! - Validate credentials through an injectable [`CredentialBackend`].
//! - Toggle the persisted authenticated flag on login/logout.
//! - Expose remaining-quota projections used by the login panel and shell.
//!
//! ## Data flow
//! Shell collects credentials -> [`AuthGate::attempt_login`] consults the
//! backend -> [`SessionStore`] flag is set. Analysis success later increments
//! the shared store counter, which [`AuthGate::remaining_requests`] reads.
//!
//! ## Ownership and lifetimes
//! The gate shares the session store with the shell through `Arc`-backed
//! handles; neither side caches session values.
//!
//! ## Error model
//! Wrong credentials return [`AuthError::InvalidCredentials`]. Storage write
//! failures are wrapped as [`AuthError::Store`].
//!
//! ## Security and privacy notes
//! Credential values are never logged; only their lengths are traced.
//! The demo table is not real authentication and must not guard real data.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use guardian_neuro_auth::{AuthGate, StaticCredentialTable};
//! use guardian_neuro_session::SessionStore;
//!
//! let gate = AuthGate::new(SessionStore::in_memory(), Arc::new(StaticCredentialTable::demo()));
//! assert!(gate.attempt_login("demo", "wrong").is_err());
//! assert!(gate.attempt_login("demo", "demo123").is_ok());
//! assert!(gate.is_authenticated());
//! ```

use std::sync::Arc;

use guardian_neuro_session::{SessionStore, StoreError};
use thiserror::Error;

/// Maximum successful analyses allowed per durable session.
pub const MAX_REQUESTS: u32 = 50;

/// Remaining-request threshold at which the login panel warns.
pub const LOW_QUOTA_THRESHOLD: u32 = 10;

/// Demo account username.
pub const DEMO_USERNAME: &str = "demo";

/// Demo account password.
pub const DEMO_PASSWORD: &str = "demo123";

/// Source of truth for accepted credential pairs.
pub trait CredentialBackend: Send + Sync {
    /// Returns `true` when the pair is accepted.
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Credential table with exact, case-sensitive matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCredentialTable {
    entries: Vec<(String, String)>,
}

impl StaticCredentialTable {
    /// Creates a table from explicit username/password pairs.
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Single-entry table holding the demo account.
    pub fn demo() -> Self {
        Self::new(vec![(DEMO_USERNAME.to_string(), DEMO_PASSWORD.to_string())])
    }
}

impl CredentialBackend for StaticCredentialTable {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.entries
            .iter()
            .any(|(user, pass)| user == username && pass == password)
    }
}

/// Authentication state projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No active demo session.
    Unauthenticated,
    /// Demo session established.
    Authenticated,
}

/// Marker returned by [`AuthGate::logout`].
///
/// Receiving it means the caller must discard all in-memory case state:
/// images, patient fields, report, error and transient flags.
#[must_use = "logout requires the caller to discard in-memory case state"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseReset;

/// Demo access gate with quota projections.
#[derive(Clone)]
pub struct AuthGate {
    store: SessionStore,
    credentials: Arc<dyn CredentialBackend>,
}

impl AuthGate {
    /// Creates a gate over a shared session store and credential backend.
    pub fn new(store: SessionStore, credentials: Arc<dyn CredentialBackend>) -> Self {
        Self { store, credentials }
    }

    /// Attempts a login and persists the authenticated flag on success.
    ///
    /// Exhausted quota does not fail login; quota is enforced at analysis
    /// time. A failed attempt never changes the stored flag.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] for any pair the backend
    /// rejects, and [`AuthError::Store`] when the flag cannot be persisted.
    pub fn attempt_login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        tracing::info!(
            username_len = username.len(),
            password_len = password.len(),
            "login attempt"
        );

        if !self.credentials.verify(username, password) {
            tracing::warn!("login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.store.set_authenticated(true)?;
        tracing::info!(remaining = self.remaining_requests(), "login success");
        Ok(())
    }

    /// Clears the authenticated flag. The request counter is untouched.
    ///
    /// # Errors
    /// Returns [`AuthError::Store`] when the flag cannot be cleared.
    pub fn logout(&self) -> Result<CaseReset, AuthError> {
        self.store.set_authenticated(false)?;
        tracing::info!("logout");
        Ok(CaseReset)
    }

    /// Returns `true` when the persisted flag is set.
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Returns the current auth state projection.
    pub fn state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    /// Returns `max(0, MAX_REQUESTS - request_count)`.
    pub fn remaining_requests(&self) -> u32 {
        remaining_for(self.store.request_count())
    }

    /// Returns `true` while at least one request remains.
    pub fn can_make_request(&self) -> bool {
        self.remaining_requests() > 0
    }

    /// Returns the quota ceiling.
    pub fn max_requests(&self) -> u32 {
        MAX_REQUESTS
    }

    /// Advisory login availability: the login panel disables submission at
    /// zero remaining requests.
    pub fn login_available(&self) -> bool {
        self.can_make_request()
    }

    /// Returns the shared session store.
    pub fn session(&self) -> &SessionStore {
        &self.store
    }
}

/// Computes remaining requests for a stored count.
pub fn remaining_for(request_count: u32) -> u32 {
    MAX_REQUESTS.saturating_sub(request_count)
}

/// Errors produced by the access gate.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credentials did not match any accepted pair.
    #[error("Invalid credentials. Please use the demo account.")]
    InvalidCredentials,
    /// Authenticated flag could not be persisted.
    #[error("session storage failure: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    //! Unit tests for credential matching and quota arithmetic.

    use super::*;

    #[test]
    fn credential_table_is_case_sensitive() {
        let table = StaticCredentialTable::demo();
        assert!(table.verify("demo", "demo123"));
        assert!(!table.verify("Demo", "demo123"));
        assert!(!table.verify("demo", "DEMO123"));
        assert!(!table.verify(" demo", "demo123"));
        assert!(!table.verify("", ""));
    }

    #[test]
    fn remaining_is_clamped_to_quota_window() {
        assert_eq!(remaining_for(0), 50);
        assert_eq!(remaining_for(49), 1);
        assert_eq!(remaining_for(50), 0);
        assert_eq!(remaining_for(u32::MAX), 0);
    }
}
