use crate::{
    OPENAPI_PATH, SWAGGER_UI_PATH,
    auth::{AdminViewer, MemberViewer},
    models::{ApiDocsView, DashboardView, ErrorBody, Role},
};
use axum::Json;

// --- Handlers ---

/// get_dashboard
///
/// [Member Route] Context for the ordinary LMS dashboard. Any caller with a
/// live session and an existing profile gets here; everyone else is
/// redirected to login by the `MemberViewer` extractor.
#[utoipa::path(
    get,
    path = "/lms",
    responses(
        (status = 200, description = "Dashboard context", body = DashboardView),
        (status = 307, description = "No session or no profile: redirect to login"),
        (status = 503, description = "Profile lookup failed", body = ErrorBody)
    )
)]
pub async fn get_dashboard(MemberViewer(record): MemberViewer) -> Json<DashboardView> {
    let can_administer = record.role.satisfies(Role::Admin);
    Json(DashboardView {
        viewer: record.into(),
        can_administer,
    })
}

/// get_api_docs
///
/// [Admin Route] Context for the admin API-docs page.
///
/// *Authorization*: `AdminViewer` re-reads the caller's profile and requires
/// `ADMIN`. Non-admins are sent to the dashboard, anonymous callers to login.
#[utoipa::path(
    get,
    path = "/admin/api-docs",
    responses(
        (status = 200, description = "API docs page context", body = ApiDocsView),
        (status = 307, description = "Redirect to login or dashboard"),
        (status = 503, description = "Profile lookup failed", body = ErrorBody)
    )
)]
pub async fn get_api_docs(AdminViewer(record): AdminViewer) -> Json<ApiDocsView> {
    Json(ApiDocsView {
        viewer: record.into(),
        title: "API Documentation".to_string(),
        openapi_url: OPENAPI_PATH.to_string(),
        swagger_ui_url: SWAGGER_UI_PATH.to_string(),
    })
}
