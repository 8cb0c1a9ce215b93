//! Shared utility functions for the xobikey service.

use axum::http::HeaderMap;

use crate::models::LicenseType;

pub const SECONDS_PER_DAY: i64 = 86400;

/// Normalize a user-supplied license key for storage and lookup.
///
/// Keys are case-insensitive on input but stored uppercase.
pub fn normalize_license_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

/// Compute the expiry timestamp for a license activated at `base_time`.
///
/// Permanent licenses never expire and get no timestamp at all.
pub fn license_expiry(license_type: LicenseType, base_time: i64) -> Option<i64> {
    license_type
        .validity_days()
        .map(|days| base_time + days * SECONDS_PER_DAY)
}

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}
