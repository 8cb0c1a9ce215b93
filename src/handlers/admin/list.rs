use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::{License, LicenseStatus, LicenseType, StatusCounts};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub license_type: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub licenses: Vec<License>,
    pub pagination: Pagination,
    /// Whole-table totals, independent of the current filter
    pub stats: StatusCounts,
}

pub async fn list_licenses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<LicenseStatus>().map_err(|_| {
                AppError::BadRequest(format!(
                    "Unknown status '{}'; valid statuses: {}",
                    s,
                    LicenseStatus::valid_values().join(", ")
                ))
            })
        })
        .transpose()?;

    let license_type = query
        .license_type
        .as_deref()
        .map(|s| {
            s.parse::<LicenseType>().map_err(|_| {
                AppError::BadRequest(format!(
                    "Unknown license_type '{}'; valid types: {}",
                    s,
                    LicenseType::valid_values().join(", ")
                ))
            })
        })
        .transpose()?;

    if query.page < 1 {
        return Err(AppError::BadRequest("page must be >= 1".into()));
    }
    if !(1..=100).contains(&query.limit) {
        return Err(AppError::BadRequest("limit must be between 1 and 100".into()));
    }
    let offset = (query.page - 1) * query.limit;

    let conn = state.db.get()?;
    let (licenses, total) =
        queries::list_licenses_paginated(&conn, status, license_type, query.limit, offset)?;
    let stats = queries::count_licenses_by_status(&conn)?;

    Ok(Json(ListResponse {
        success: true,
        licenses,
        pagination: Pagination {
            page: query.page,
            limit: query.limit,
            total,
        },
        stats,
    }))
}
