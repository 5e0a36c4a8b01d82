use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    config::{AppConfig, GateSettings},
    error::GateError,
    gate::{AccessGate, GatePolicy},
    models::{AccessDecision, ErrorBody, UserRecord},
    repository::UserStoreState,
    session::SessionProviderState,
};

/// AccessRejection
///
/// How a gated handler ends when the gate does not return `Render`.
#[derive(Debug)]
pub enum AccessRejection {
    /// 307 to the gate's chosen target.
    Redirect(String),
    /// 503; the store could not confirm the caller's role.
    LookupFailure(GateError),
}

impl IntoResponse for AccessRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(path) => Redirect::temporary(&path).into_response(),
            Self::LookupFailure(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, "1")],
                Json(ErrorBody {
                    error: "lookup_failure".to_string(),
                    message: "Unable to verify access right now. Please retry shortly.".to_string(),
                }),
            )
                .into_response(),
        }
    }
}

impl From<GateError> for AccessRejection {
    fn from(e: GateError) -> Self {
        Self::LookupFailure(e)
    }
}

/// Runs one gate evaluation for the request described by `parts`.
///
/// The session is resolved first and handed to the gate explicitly; the gate
/// itself has no access to the request.
async fn resolve<S>(
    parts: &Parts,
    state: &S,
    policy: fn(&GateSettings) -> GatePolicy,
) -> Result<UserRecord, AccessRejection>
where
    S: Send + Sync,
    UserStoreState: FromRef<S>,
    SessionProviderState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let store = UserStoreState::from_ref(state);
    let sessions = SessionProviderState::from_ref(state);
    let config = AppConfig::from_ref(state);

    let session = sessions.current_session(&parts.headers).await;
    let gate = AccessGate::new(store, policy(&config.gate));

    match gate.evaluate(session.as_ref()).await? {
        AccessDecision::Render(record) => Ok(record),
        AccessDecision::RedirectTo(path) => Err(AccessRejection::Redirect(path)),
    }
}

/// AdminViewer
///
/// Extractor for admin-only pages. Resolves to the caller's record when the
/// store says the caller is `ADMIN`; otherwise rejects with a redirect to
/// login (no session) or the dashboard (not an admin).
#[derive(Debug, Clone)]
pub struct AdminViewer(pub UserRecord);

impl<S> FromRequestParts<S> for AdminViewer
where
    S: Send + Sync,
    UserStoreState: FromRef<S>,
    SessionProviderState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts, state, GatePolicy::admin).await.map(Self)
    }
}

/// MemberViewer
///
/// Extractor for pages open to any known user.
#[derive(Debug, Clone)]
pub struct MemberViewer(pub UserRecord);

impl<S> FromRequestParts<S> for MemberViewer
where
    S: Send + Sync,
    UserStoreState: FromRef<S>,
    SessionProviderState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts, state, GatePolicy::member).await.map(Self)
    }
}
