use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// How long a license is valid for once activated.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    EnumIter,
    strum::AsRefStr,
)]
pub enum LicenseType {
    /// Also the fallback when a stored type string no longer parses: an
    /// unrecognized type degrades to the shortest validity.
    #[default]
    #[serde(rename = "trial_1d")]
    #[strum(serialize = "trial_1d")]
    Trial1d,
    #[serde(rename = "trial_7d")]
    #[strum(serialize = "trial_7d")]
    Trial7d,
    #[serde(rename = "monthly_30d")]
    #[strum(serialize = "monthly_30d")]
    Monthly30d,
    #[serde(rename = "permanent")]
    #[strum(serialize = "permanent")]
    Permanent,
}

impl LicenseType {
    /// Validity window in days, None for licenses that never expire.
    pub fn validity_days(self) -> Option<i64> {
        match self {
            LicenseType::Trial1d => Some(1),
            LicenseType::Trial7d => Some(7),
            LicenseType::Monthly30d => Some(30),
            LicenseType::Permanent => None,
        }
    }

    pub fn valid_values() -> Vec<&'static str> {
        Self::iter().map(<&'static str>::from).collect()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LicenseStatus {
    Pending,
    Active,
    Expired,
    Revoked,
}

impl LicenseStatus {
    pub fn valid_values() -> Vec<&'static str> {
        Self::iter().map(<&'static str>::from).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    pub license_key: String,
    /// Device the license is bound to; set on activation, cleared on unbind/reset.
    pub machine_code: Option<String>,
    pub license_type: LicenseType,
    pub status: LicenseStatus,
    pub activated_at: Option<i64>,
    /// None = never expires
    pub expires_at: Option<i64>,
    pub created_at: i64,
    /// Admin annotation, no semantic effect
    pub notes: String,
}

/// Global per-status totals for the admin listing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub active: i64,
    pub expired: i64,
    pub revoked: i64,
}
