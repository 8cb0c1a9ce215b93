use chrono::Utc;
use rusqlite::{Connection, ErrorCode, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;
use crate::util::SECONDS_PER_DAY;

use super::from_row::{LICENSE_COLS, query_all, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Key generation ============

pub const KEY_PREFIX: &str = "XOBI";

const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a license key: XOBI- followed by three 4-character groups
/// over [A-Z0-9].
pub fn generate_license_key() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    let mut part = || -> String {
        (0..4)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect()
    };

    format!("{}-{}-{}-{}", KEY_PREFIX, part(), part(), part())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// ============ Licenses ============

/// Create a pending license with a freshly generated key.
///
/// The UNIQUE constraint on license_key is authoritative for collisions;
/// a conflicting key is regenerated and the insert retried.
pub fn create_license(conn: &Connection, license_type: LicenseType, notes: &str) -> Result<License> {
    const MAX_KEY_ATTEMPTS: u32 = 5;

    let id = gen_id();
    let created_at = now();

    for _ in 0..MAX_KEY_ATTEMPTS {
        let license_key = generate_license_key();
        let inserted = conn.execute(
            "INSERT INTO licenses (id, license_key, machine_code, license_type, status, activated_at, expires_at, created_at, notes)
             VALUES (?1, ?2, NULL, ?3, 'pending', NULL, NULL, ?4, ?5)",
            params![&id, &license_key, license_type.as_ref(), created_at, notes],
        );

        match inserted {
            Ok(_) => {
                return Ok(License {
                    id,
                    license_key,
                    machine_code: None,
                    license_type,
                    status: LicenseStatus::Pending,
                    activated_at: None,
                    expires_at: None,
                    created_at,
                    notes: notes.to_string(),
                });
            }
            Err(err) if is_unique_violation(&err) => {
                tracing::warn!("license key collision, regenerating");
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Internal(
        "could not generate a unique license key".into(),
    ))
}

pub fn get_license_by_id(conn: &Connection, id: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        &[&id],
    )
}

/// Point lookup by key. Callers normalize case first (keys are stored
/// uppercase).
pub fn get_license_by_key(conn: &Connection, license_key: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE license_key = ?1",
            LICENSE_COLS
        ),
        &[&license_key],
    )
}

/// The verify-path lookup: the active license bound to a machine, if any.
pub fn get_active_license_by_machine(
    conn: &Connection,
    machine_code: &str,
) -> Result<Option<License>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE machine_code = ?1 AND status = 'active'",
            LICENSE_COLS
        ),
        &[&machine_code],
    )
}

/// Filtered, paginated listing ordered by creation time, newest first.
/// Returns the page plus the total matching the filter.
pub fn list_licenses_paginated(
    conn: &Connection,
    status: Option<LicenseStatus>,
    license_type: Option<LicenseType>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<License>, i64)> {
    let mut where_clause = String::from("WHERE 1=1");
    let mut filter_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(status) = status {
        where_clause.push_str(" AND status = ?");
        filter_params.push(Box::new(status.as_ref().to_string()));
    }
    if let Some(license_type) = license_type {
        where_clause.push_str(" AND license_type = ?");
        filter_params.push(Box::new(license_type.as_ref().to_string()));
    }

    let count_sql = format!("SELECT COUNT(*) FROM licenses {}", where_clause);
    let filter_refs: Vec<&dyn rusqlite::ToSql> = filter_params.iter().map(|b| b.as_ref()).collect();
    let total: i64 = conn.query_row(&count_sql, filter_refs.as_slice(), |row| row.get(0))?;

    let select_sql = format!(
        "SELECT {} FROM licenses {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        LICENSE_COLS, where_clause
    );
    filter_params.push(Box::new(limit));
    filter_params.push(Box::new(offset));
    let select_refs: Vec<&dyn rusqlite::ToSql> = filter_params.iter().map(|b| b.as_ref()).collect();

    let licenses = query_all(conn, &select_sql, select_refs.as_slice())?;
    Ok((licenses, total))
}

/// Whole-table per-status totals, independent of any listing filter.
pub fn count_licenses_by_status(conn: &Connection) -> Result<StatusCounts> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM licenses GROUP BY status")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = StatusCounts::default();
    for row in rows {
        let (status, count) = row?;
        counts.total += count;
        match status.parse::<LicenseStatus>() {
            Ok(LicenseStatus::Pending) => counts.pending = count,
            Ok(LicenseStatus::Active) => counts.active = count,
            Ok(LicenseStatus::Expired) => counts.expired = count,
            Ok(LicenseStatus::Revoked) => counts.revoked = count,
            Err(_) => {}
        }
    }
    Ok(counts)
}

// ============ State transitions ============

/// Atomically bind a pending license to a machine.
///
/// The status condition arbitrates racing activations: exactly one caller
/// sees an affected row, every other racer gets false and must re-read to
/// find out what the winner did.
pub fn claim_pending_license(
    conn: &Connection,
    id: &str,
    machine_code: &str,
    activated_at: i64,
    expires_at: Option<i64>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET machine_code = ?1, status = 'active', activated_at = ?2, expires_at = ?3
         WHERE id = ?4 AND status = 'pending'",
        params![machine_code, activated_at, expires_at, id],
    )?;
    Ok(affected > 0)
}

/// Lazily retire an active license whose expiry has passed.
///
/// One-way flip; idempotent and safe to race (last writer wins harmlessly).
pub fn mark_license_expired(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET status = 'expired' WHERE id = ?1 AND status = 'active'",
        params![id],
    )?;
    Ok(affected > 0)
}

/// Terminal revocation. No ordinary operation leaves this state.
pub fn revoke_license(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET status = 'revoked' WHERE id = ?1",
        params![id],
    )?;
    Ok(affected > 0)
}

/// Unbind/reset: return the license to a clean pending state.
pub fn release_license(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET machine_code = NULL, activated_at = NULL, expires_at = NULL, status = 'pending'
         WHERE id = ?1",
        params![id],
    )?;
    Ok(affected > 0)
}

// ============ Admin edits ============
// Each action is one UPDATE by id; handlers re-read the row afterwards.

pub fn set_expiry(conn: &Connection, id: &str, expires_at: Option<i64>) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET expires_at = ?1 WHERE id = ?2",
        params![expires_at, id],
    )?;
    Ok(affected > 0)
}

/// Shift expiry by a signed number of days, from the current expiry when one
/// is set, otherwise from `now`. Forces the license active. A negative delta
/// may land in the past; the lazy-expiry check then retires the license on
/// its next verify.
pub fn add_expiry_days(conn: &Connection, id: &str, days: i64, now: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET expires_at = COALESCE(expires_at, ?1) + ?2,
                status = 'active', activated_at = COALESCE(activated_at, ?1)
         WHERE id = ?3",
        params![now, days * SECONDS_PER_DAY, id],
    )?;
    Ok(affected > 0)
}

/// Relabel the license type without recomputing expiry. Switching to
/// permanent clears expiry: permanent licenses never carry one.
pub fn set_license_type(conn: &Connection, id: &str, license_type: LicenseType) -> Result<bool> {
    let affected = if license_type == LicenseType::Permanent {
        conn.execute(
            "UPDATE licenses SET license_type = ?1, expires_at = NULL WHERE id = ?2",
            params![license_type.as_ref(), id],
        )?
    } else {
        conn.execute(
            "UPDATE licenses SET license_type = ?1 WHERE id = ?2",
            params![license_type.as_ref(), id],
        )?
    };
    Ok(affected > 0)
}

pub fn set_notes(conn: &Connection, id: &str, notes: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET notes = ?1 WHERE id = ?2",
        params![notes, id],
    )?;
    Ok(affected > 0)
}

/// Make the license permanent: type flips, expiry clears, status is kept.
pub fn make_permanent(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET license_type = 'permanent', expires_at = NULL WHERE id = ?1",
        params![id],
    )?;
    Ok(affected > 0)
}

/// Force-activate without a machine binding (operator recovery path).
pub fn force_activate(
    conn: &Connection,
    id: &str,
    now: i64,
    expires_at: Option<i64>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET status = 'active', activated_at = COALESCE(activated_at, ?1), expires_at = ?2
         WHERE id = ?3",
        params![now, expires_at, id],
    )?;
    Ok(affected > 0)
}

/// Drop the machine binding but keep the status.
pub fn clear_machine(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET machine_code = NULL WHERE id = ?1",
        params![id],
    )?;
    Ok(affected > 0)
}
