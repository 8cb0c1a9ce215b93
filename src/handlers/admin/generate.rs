use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{LicenseStatus, LicenseType};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub license_type: String,
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_count() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct GeneratedLicense {
    pub license_key: String,
    pub license_type: LicenseType,
    pub status: LicenseStatus,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub licenses: Vec<GeneratedLicense>,
}

/// Create `count` pending licenses. A per-item insert failure is skipped so
/// one bad row never aborts the batch; the response reports what was
/// actually created.
pub async fn generate_licenses(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    let license_type: LicenseType = request.license_type.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Unknown license_type '{}'; valid types: {}",
            request.license_type,
            LicenseType::valid_values().join(", ")
        ))
    })?;

    let count = request.count.clamp(1, state.generate_cap);
    let notes = request.notes.as_deref().unwrap_or("");

    let conn = state.db.get()?;

    let mut licenses = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match queries::create_license(&conn, license_type, notes) {
            Ok(license) => licenses.push(GeneratedLicense {
                license_key: license.license_key,
                license_type: license.license_type,
                status: license.status,
            }),
            Err(err) => {
                tracing::warn!("license insert failed during bulk generate: {}", err);
            }
        }
    }

    tracing::info!(
        created = licenses.len(),
        requested = count,
        license_type = license_type.as_ref(),
        "generated licenses"
    );

    Ok(Json(GenerateResponse {
        success: true,
        message: format!("Created {} license(s)", licenses.len()),
        licenses,
    }))
}
