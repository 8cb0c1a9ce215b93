use axum::extract::State;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::util::normalize_license_key;

/// `unbind` and `reset` do the same thing; both names are kept so the
/// operator's intent shows up in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum RevokeAction {
    Revoke,
    Unbind,
    Reset,
}

impl RevokeAction {
    pub fn valid_values() -> Vec<&'static str> {
        Self::iter().map(<&'static str>::from).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    #[serde(default)]
    pub license_key: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
}

pub async fn revoke_license(
    State(state): State<AppState>,
    Json(request): Json<RevokeRequest>,
) -> Result<Json<RevokeResponse>> {
    let action: RevokeAction = request.action.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Unknown action '{}'; valid actions: {}",
            request.action,
            RevokeAction::valid_values().join(", ")
        ))
    })?;

    let license_key = normalize_license_key(&request.license_key);
    if license_key.is_empty() {
        return Err(AppError::BadRequest("license_key is required".into()));
    }

    let conn = state.db.get()?;

    let license = match queries::get_license_by_key(&conn, &license_key)? {
        Some(l) => l,
        None => {
            return Ok(Json(RevokeResponse {
                success: false,
                message: "License key not found".to_string(),
                license_key: None,
            }));
        }
    };

    let message = match action {
        RevokeAction::Revoke => {
            queries::revoke_license(&conn, &license.id)?;
            "License revoked".to_string()
        }
        RevokeAction::Unbind | RevokeAction::Reset => {
            queries::release_license(&conn, &license.id)?;
            "License released back to pending".to_string()
        }
    };

    tracing::info!(license_key = %license_key, action = %request.action, "admin lifecycle action");

    Ok(Json(RevokeResponse {
        success: true,
        message,
        license_key: Some(license.license_key),
    }))
}
