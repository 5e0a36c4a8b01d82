//! Error types for the user store and the access gates.
//!
//! Unauthenticated and unauthorized callers are not errors; gates resolve
//! them into redirects. Only a failed store read surfaces as `GateError`.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// A role string in the store that matches no known `Role`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

/// Failure of a single `UserStore` read.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),

    #[error("user store read timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
        }
    }
}

/// Failure of a gate evaluation. Distinct from both redirect outcomes so an
/// outage never masquerades as "not logged in" or "not allowed".
#[derive(Error, Debug)]
pub enum GateError {
    #[error("user lookup for {user_id} failed after {attempts} attempt(s): {source}")]
    LookupFailure {
        user_id: Uuid,
        attempts: u32,
        #[source]
        source: StoreError,
    },
}
