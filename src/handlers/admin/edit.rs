use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{License, LicenseType};
use crate::util::{SECONDS_PER_DAY, normalize_license_key};

/// Operator recovery actions. These bypass the ordinary state machine on
/// purpose; each one is a single atomic update by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EditAction {
    SetExpiry,
    AddDays,
    SetType,
    SetNotes,
    SetPermanent,
    ActivateNow,
    ClearMachine,
}

impl EditAction {
    pub fn valid_values() -> Vec<&'static str> {
        Self::iter().map(<&'static str>::from).collect()
    }
}

const DEFAULT_ACTIVATE_NOW_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    #[serde(default)]
    pub license_key: String,
    pub action: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

fn require_i64(value: Option<&serde_json::Value>, action: &str) -> Result<i64> {
    value
        .and_then(|v| v.as_i64())
        .ok_or_else(|| AppError::BadRequest(format!("Action '{action}' requires an integer value")))
}

fn require_str<'a>(value: Option<&'a serde_json::Value>, action: &str) -> Result<&'a str> {
    value
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::BadRequest(format!("Action '{action}' requires a string value")))
}

pub async fn edit_license(
    State(state): State<AppState>,
    Json(request): Json<EditRequest>,
) -> Result<Json<EditResponse>> {
    let action: EditAction = request.action.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Unknown action '{}'; valid actions: {}",
            request.action,
            EditAction::valid_values().join(", ")
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
            return Ok(Json(EditResponse {
                success: false,
                message: "License key not found".to_string(),
                license: None,
            }));
        }
    };

    let value = request.value.as_ref();
    let now = Utc::now().timestamp();

    let message = match action {
        EditAction::SetExpiry => {
            let expires_at = require_i64(value, "set_expiry")?;
            queries::set_expiry(&conn, &license.id, Some(expires_at))?;
            format!("Expiry set to {expires_at}")
        }
        EditAction::AddDays => {
            let days = require_i64(value, "add_days")?;
            queries::add_expiry_days(&conn, &license.id, days, now)?;
            format!("Expiry shifted by {days} day(s), license forced active")
        }
        EditAction::SetType => {
            let raw = require_str(value, "set_type")?;
            let license_type: LicenseType = raw.parse().map_err(|_| {
                AppError::BadRequest(format!(
                    "Unknown license_type '{}'; valid types: {}",
                    raw,
                    LicenseType::valid_values().join(", ")
                ))
            })?;
            queries::set_license_type(&conn, &license.id, license_type)?;
            format!("License type set to {}", license_type.as_ref())
        }
        EditAction::SetNotes => {
            let notes = require_str(value, "set_notes")?;
            queries::set_notes(&conn, &license.id, notes)?;
            "Notes updated".to_string()
        }
        EditAction::SetPermanent => {
            queries::make_permanent(&conn, &license.id)?;
            "License made permanent".to_string()
        }
        EditAction::ActivateNow => {
            let days = match value {
                Some(v) => require_i64(Some(v), "activate_now")?,
                None => DEFAULT_ACTIVATE_NOW_DAYS,
            };
            // Permanent licenses stay open-ended even when force-activated.
            let expires_at = if license.license_type == LicenseType::Permanent {
                None
            } else {
                Some(now + days * SECONDS_PER_DAY)
            };
            queries::force_activate(&conn, &license.id, now, expires_at)?;
            format!("License force-activated for {days} day(s)")
        }
        EditAction::ClearMachine => {
            queries::clear_machine(&conn, &license.id)?;
            "Machine binding cleared".to_string()
        }
    };

    tracing::info!(license_key = %license_key, action = %request.action, "admin edit applied");

    let updated = queries::get_license_by_id(&conn, &license.id)?
        .ok_or_else(|| AppError::Internal("license vanished during edit".into()))?;

    Ok(Json(EditResponse {
        success: true,
        message,
        license: Some(updated),
    }))
}
