//! Row-mapping helpers shared by the query layer.

use rusqlite::{Connection, Params, Row};

use crate::error::Result;
use crate::models::License;

pub const LICENSE_COLS: &str =
    "id, license_key, machine_code, license_type, status, activated_at, expires_at, created_at, notes";

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl FromRow for License {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(License {
            id: row.get(0)?,
            license_key: row.get(1)?,
            machine_code: row.get(2)?,
            // Unknown stored type falls back to the 1-day default
            license_type: row.get::<_, String>(3)?.parse().unwrap_or_default(),
            status: row.get::<_, String>(4)?.parse().unwrap(),
            activated_at: row.get(5)?,
            expires_at: row.get(6)?,
            created_at: row.get(7)?,
            notes: row.get(8)?,
        })
    }
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, T::from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
