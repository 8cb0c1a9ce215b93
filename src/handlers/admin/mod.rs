mod edit;
mod generate;
mod list;
mod revoke;

pub use edit::*;
pub use generate::*;
pub use list::*;
pub use revoke::*;

use axum::{Router, middleware, routing::get, routing::post};

use crate::db::AppState;
use crate::middleware::admin_auth;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_licenses))
        .route("/licenses", get(list_licenses))
        .route("/edit", post(edit_license))
        .route("/revoke", post(revoke_license))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth))
}
