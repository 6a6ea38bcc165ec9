pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::RequestContext;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

/// Assemble the full service router: banner API, health probe and the shared
/// request middleware.
pub fn build_router(state: ApiState) -> Router {
    let deadline = state.request_timeout;

    let health = Router::new()
        .route("/api/health", get(health))
        .with_state(state.clone());

    build_api_router(state)
        .merge(health)
        .layer(axum_middleware::from_fn_with_state(
            deadline,
            middleware::enforce_deadline,
        ))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health(State(state): State<ApiState>) -> Response {
    db_health_response(state.banners.health_check().await)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
