use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::LicenseType;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub machine_code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub message: String,
}

/// Read path for client devices: is this machine currently licensed?
///
/// Absence of authorization is a normal outcome, not an error. The only
/// write is the lazy expiry flip.
pub async fn verify_machine(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let machine_code = request.machine_code.trim();
    if machine_code.is_empty() {
        return Err(AppError::BadRequest("machine_code is required".into()));
    }

    let not_authorized = |message: &str| {
        Json(VerifyResponse {
            success: false,
            authorized: false,
            license_type: None,
            expires_at: None,
            message: message.to_string(),
        })
    };

    let conn = state.db.get()?;

    let license = match queries::get_active_license_by_machine(&conn, machine_code)? {
        Some(l) => l,
        None => return Ok(not_authorized("No active license for this machine")),
    };

    // Lazy expiry: the first read past the deadline retires the license.
    if let Some(expires_at) = license.expires_at
        && Utc::now().timestamp() > expires_at
    {
        queries::mark_license_expired(&conn, &license.id)?;
        return Ok(not_authorized("License expired"));
    }

    Ok(Json(VerifyResponse {
        success: true,
        authorized: true,
        license_type: Some(license.license_type),
        expires_at: license.expires_at,
        message: "Authorized".to_string(),
    }))
}
