use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{License, LicenseStatus, LicenseType};
use crate::util::{license_expiry, normalize_license_key};

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    #[serde(default)]
    pub license_key: String,
    #[serde(default)]
    pub machine_code: String,
}

#[derive(Debug, Serialize)]
pub struct ActivateResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

fn reject(message: &str) -> ActivateResponse {
    ActivateResponse {
        success: false,
        message: message.to_string(),
        license_type: None,
        expires_at: None,
    }
}

/// Response for a license that is already active: idempotent success for the
/// bound machine, rejection for anyone else. Never mutates the binding.
fn already_active(license: &License, machine_code: &str) -> ActivateResponse {
    if license.machine_code.as_deref() == Some(machine_code) {
        ActivateResponse {
            success: true,
            message: "License already activated on this device".to_string(),
            license_type: Some(license.license_type),
            expires_at: license.expires_at,
        }
    } else {
        reject("License key is already in use by another device")
    }
}

/// Write path: bind a pending license to the requesting machine.
pub async fn activate_license(
    State(state): State<AppState>,
    Json(request): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>> {
    let license_key = normalize_license_key(&request.license_key);
    let machine_code = request.machine_code.trim().to_string();
    if license_key.is_empty() {
        return Err(AppError::BadRequest("license_key is required".into()));
    }
    if machine_code.is_empty() {
        return Err(AppError::BadRequest("machine_code is required".into()));
    }

    let conn = state.db.get()?;

    let license = match queries::get_license_by_key(&conn, &license_key)? {
        Some(l) => l,
        None => return Ok(Json(reject("Invalid license key"))),
    };

    match license.status {
        LicenseStatus::Revoked => return Ok(Json(reject("License key has been revoked"))),
        LicenseStatus::Expired => return Ok(Json(reject("License key has expired"))),
        LicenseStatus::Active => return Ok(Json(already_active(&license, &machine_code))),
        LicenseStatus::Pending => {}
    }

    // Two machines can both read `pending` here. The conditional update
    // arbitrates: exactly one caller binds the license.
    let now = Utc::now().timestamp();
    let expires_at = license_expiry(license.license_type, now);

    if queries::claim_pending_license(&conn, &license.id, &machine_code, now, expires_at)? {
        tracing::info!(license_key = %license.license_key, "license activated");
        return Ok(Json(ActivateResponse {
            success: true,
            message: "License activated".to_string(),
            license_type: Some(license.license_type),
            expires_at,
        }));
    }

    // Lost the race. Re-read to report what the winner did.
    let current = queries::get_license_by_id(&conn, &license.id)?
        .ok_or_else(|| AppError::Internal("license vanished during activation".into()))?;

    match current.status {
        LicenseStatus::Active => Ok(Json(already_active(&current, &machine_code))),
        LicenseStatus::Revoked => Ok(Json(reject("License key has been revoked"))),
        _ => Ok(Json(reject("License key is not activatable"))),
    }
}
