//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::db::{StoreError, StoreResult};
use crate::models::{ACCEPTED_DOCUMENT_TYPES, MAX_DOCUMENT_BYTES};

/// Tunables for a [`RecordStore`](crate::db::RecordStore).
///
/// Every field has a default, so a TOML file only needs the keys it overrides:
///
/// ```toml
/// bcrypt_cost = 12
/// session_ttl_secs = 3600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// bcrypt work factor for stored passwords
    pub bcrypt_cost: u32,
    /// Lifetime of a session after it is written or touched
    pub session_ttl_secs: u64,
    /// Minimum interval between expired-session sweeps
    pub session_check_period_secs: u64,
    /// Email suffixes accepted on profile updates, compared case-insensitively
    pub allowed_email_domains: Vec<String>,
    pub max_document_bytes: u64,
    pub accepted_document_types: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: 10,
            session_ttl_secs: 24 * 60 * 60,
            session_check_period_secs: 24 * 60 * 60,
            allowed_email_domains: vec!["@gmail.com".into(), "@hotmail.com".into()],
            max_document_bytes: MAX_DOCUMENT_BYTES,
            accepted_document_types: ACCEPTED_DOCUMENT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document, filling unspecified keys with defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Whether `email` ends with one of the allow-listed domain suffixes.
    pub fn is_allowed_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.allowed_email_domains
            .iter()
            .any(|suffix| email.ends_with(&suffix.to_lowercase()))
    }

    pub fn session_ttl(&self) -> StoreResult<chrono::Duration> {
        secs_to_duration("session_ttl_secs", self.session_ttl_secs)
    }

    pub fn session_check_period(&self) -> StoreResult<chrono::Duration> {
        secs_to_duration("session_check_period_secs", self.session_check_period_secs)
    }
}

fn secs_to_duration(key: &str, secs: u64) -> StoreResult<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| StoreError::InvalidInput(format!("{} out of range: {}", key, secs)))
}
