pub mod admin;
pub mod public;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::AppState;

/// Assemble the full application router.
///
/// The generation UIs call this service cross-origin, hence the permissive
/// CORS policy; nothing here is cookie-authenticated.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .nest("/api/admin", admin::router(&state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
