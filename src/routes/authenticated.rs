use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Pages for any caller with a session and an existing profile. Handlers take
/// `MemberViewer`, which redirects everyone else to the login page.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /lms
        // The ordinary dashboard, and the fallback target of the admin gate.
        .route("/lms", get(handlers::get_dashboard))
}
