mod activate;
mod verify;

pub use activate::*;
pub use verify::*;

use axum::{Json, Router, routing::get, routing::post};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/verify", post(verify_machine))
        .route("/api/activate", post(activate_license))
}
