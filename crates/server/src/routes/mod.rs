pub mod account;
pub mod auth;
pub mod projects;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{middleware, AppState};

pub fn app(state: AppState) -> Router {
    // Build protected routes (require authentication)
    let protected_routes = Router::new()
        .nest("/account", account::router())
        .nest("/projects", projects::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let api_router = Router::new()
        .nest("/auth", auth::router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
