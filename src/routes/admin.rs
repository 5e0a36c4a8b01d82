use crate::{ApiDoc, AppState, OPENAPI_PATH, SWAGGER_UI_PATH, handlers, require_admin};
use axum::{Router, middleware, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Admin Router Module
///
/// Pages restricted to `ADMIN` profiles. The page handler gates itself via
/// `AdminViewer`; the Swagger UI and the OpenAPI document are not our
/// handlers, so they sit behind the `require_admin` route layer instead.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    let docs = Router::<AppState>::new()
        .merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_PATH, ApiDoc::openapi()))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        // GET /admin/api-docs
        // Context for the API-docs page: viewer identity plus documentation links.
        .route("/admin/api-docs", get(handlers::get_api_docs))
        .merge(docs)
}
