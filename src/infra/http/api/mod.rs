pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch},
};

pub fn build_api_router(state: ApiState) -> Router {
    let admin = Router::new()
        .route(
            "/api/banner",
            get(handlers::list_banners).post(handlers::create_banner),
        )
        .route(
            "/api/banner/{id}",
            patch(handlers::update_banner).delete(handlers::delete_banner),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_admin));

    Router::new()
        .route("/api/user_banner", get(handlers::get_user_banner))
        .merge(admin)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_token,
        ))
        .with_state(state)
}
