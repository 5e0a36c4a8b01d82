//! Access gate: session → authoritative user record → render or redirect.
//!
//! The gate never trusts a role carried by the session. Every evaluation
//! re-reads the caller's `UserRecord` from the `UserStore`, and only that
//! record's `role` decides access.

use std::time::Duration;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use crate::{
    config::GateSettings,
    error::{GateError, StoreError},
    models::{AccessDecision, Role, Session, UserRecord},
    repository::UserStoreState,
};

/// GatePolicy
///
/// What a gate requires and where it sends callers who do not meet it.
#[derive(Debug, Clone, PartialEq)]
pub struct GatePolicy {
    pub required_role: Role,
    /// Target for callers without a session.
    pub login_path: String,
    /// Target for callers with a session but no qualifying record.
    pub forbidden_path: String,
    pub lookup_timeout: Duration,
    pub lookup_retries: u32,
    pub retry_backoff: Duration,
}

impl GatePolicy {
    /// Admin-only pages. Unprivileged callers fall back to the dashboard.
    pub fn admin(settings: &GateSettings) -> Self {
        Self::with_role(Role::Admin, settings.dashboard_path.clone(), settings)
    }

    /// The dashboard itself. Any known user passes; a session whose record is
    /// gone goes back to login, since falling back to the dashboard would loop.
    pub fn member(settings: &GateSettings) -> Self {
        Self::with_role(Role::Member, settings.login_path.clone(), settings)
    }

    /// Delay before the attempt after `attempt`: linear, saturating at `Duration::MAX`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }

    pub fn with_role(required_role: Role, forbidden_path: String, settings: &GateSettings) -> Self {
        Self {
            required_role,
            login_path: settings.login_path.clone(),
            forbidden_path,
            lookup_timeout: settings.lookup_timeout,
            lookup_retries: settings.lookup_retries,
            retry_backoff: settings.retry_backoff,
        }
    }
}

/// Why a decision came out the way it did. Logged with every evaluation so
/// "not logged in" and "logged in but not allowed" stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted,
    Unauthenticated,
    Unauthorized,
}

impl AccessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Unauthenticated => "unauthenticated",
            Self::Unauthorized => "unauthorized",
        }
    }
}

/// AccessGate
///
/// Cheap to clone; holds a shared store handle and its policy.
#[derive(Clone)]
pub struct AccessGate {
    store: UserStoreState,
    policy: GatePolicy,
}

impl AccessGate {
    pub fn new(store: UserStoreState, policy: GatePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// evaluate
    ///
    /// Decides whether the caller holding `session` may see the protected view.
    ///
    /// - no session, or a session without a user id: `RedirectTo(login_path)`
    /// - record missing, or role below `required_role`: `RedirectTo(forbidden_path)`
    /// - otherwise: `Render(record)`
    ///
    /// # Errors
    /// `GateError::LookupFailure` when the store cannot answer within the
    /// retry budget. This is never folded into either redirect.
    pub async fn evaluate(&self, session: Option<&Session>) -> Result<AccessDecision, GateError> {
        let Some(user_id) = session.and_then(|s| s.user_id) else {
            tracing::info!(
                outcome = AccessOutcome::Unauthenticated.as_str(),
                target = %self.policy.login_path,
                "access denied: no session"
            );
            return Ok(AccessDecision::RedirectTo(self.policy.login_path.clone()));
        };

        match self.lookup(user_id).await? {
            Some(record) if record.role.satisfies(self.policy.required_role) => {
                tracing::debug!(
                    outcome = AccessOutcome::Granted.as_str(),
                    %user_id,
                    role = %record.role,
                    "access granted"
                );
                Ok(AccessDecision::Render(record))
            }
            Some(record) => {
                tracing::info!(
                    outcome = AccessOutcome::Unauthorized.as_str(),
                    %user_id,
                    role = %record.role,
                    required = %self.policy.required_role,
                    target = %self.policy.forbidden_path,
                    "access denied: insufficient role"
                );
                Ok(AccessDecision::RedirectTo(self.policy.forbidden_path.clone()))
            }
            None => {
                tracing::info!(
                    outcome = AccessOutcome::Unauthorized.as_str(),
                    %user_id,
                    target = %self.policy.forbidden_path,
                    "access denied: no user record"
                );
                Ok(AccessDecision::RedirectTo(self.policy.forbidden_path.clone()))
            }
        }
    }

    /// Reads the record with a per-attempt timeout and linear backoff between
    /// transient failures. Permanent errors end the loop immediately.
    async fn lookup(&self, user_id: Uuid) -> Result<Option<UserRecord>, GateError> {
        let max_attempts = self.policy.lookup_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match timeout(self.policy.lookup_timeout, self.store.find_by_id(user_id)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.policy.lookup_timeout)),
            };

            match result {
                Ok(record) => return Ok(record),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(
                        %user_id,
                        attempt,
                        max_attempts,
                        error = %e,
                        "user lookup failed, retrying"
                    );
                    sleep(self.policy.backoff_for(attempt)).await;
                }
                Err(e) => {
                    tracing::error!(%user_id, attempts = attempt, error = %e, "user lookup failed");
                    return Err(GateError::LookupFailure {
                        user_id,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}
