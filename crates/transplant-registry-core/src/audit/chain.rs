//! Per-patient SHA-256 digest chain over audit entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{AuditAction, AuditEntry};

/// Hash algorithm name recorded in exports.
pub const HASH_ALGORITHM: &str = "SHA-256";

/// Outcome of walking a patient's audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    pub is_valid: bool,
    pub entry_count: usize,
    /// Index of the first entry whose digest does not match
    pub broken_at: Option<usize>,
    /// Digest of the last entry, empty for an empty log
    pub head_digest: String,
}

/// Compute SHA-256 hash of data.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Digest linking an entry to its predecessor.
pub fn link_digest(
    previous: &str,
    timestamp: &DateTime<Utc>,
    user_id: i64,
    action: AuditAction,
) -> String {
    let material = format!(
        "{}|{}|{}|{}",
        previous,
        timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        user_id,
        action.as_str()
    );
    hash_data(material.as_bytes())
}

/// Append a sealed entry to `log`. Existing entries are never touched.
pub fn append_entry(
    log: &mut Vec<AuditEntry>,
    timestamp: DateTime<Utc>,
    user_id: i64,
    action: AuditAction,
) {
    let previous = log.last().map(|e| e.digest.as_str()).unwrap_or("");
    let digest = link_digest(previous, &timestamp, user_id, action);
    log.push(AuditEntry {
        timestamp,
        user_id,
        action,
        digest,
    });
}

/// Recompute every link and report the first mismatch.
pub fn verify_chain(entries: &[AuditEntry]) -> ChainVerification {
    let mut previous = String::new();

    for (index, entry) in entries.iter().enumerate() {
        let expected = link_digest(&previous, &entry.timestamp, entry.user_id, entry.action);
        if expected != entry.digest {
            return ChainVerification {
                is_valid: false,
                entry_count: entries.len(),
                broken_at: Some(index),
                head_digest: entries.last().map(|e| e.digest.clone()).unwrap_or_default(),
            };
        }
        previous = expected;
    }

    ChainVerification {
        is_valid: true,
        entry_count: entries.len(),
        broken_at: None,
        head_digest: previous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn build_log(updates: usize) -> Vec<AuditEntry> {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
        let mut log = Vec::new();
        append_entry(&mut log, t0, 1, AuditAction::Created);
        for i in 0..updates {
            append_entry(
                &mut log,
                t0 + Duration::minutes(i as i64 + 1),
                2,
                AuditAction::Updated,
            );
        }
        log
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"patient record";
        assert_eq!(hash_data(data), hash_data(data));
        assert_eq!(hash_data(data).len(), 64);
    }

    #[test]
    fn test_valid_chain() {
        let log = build_log(3);
        let result = verify_chain(&log);
        assert!(result.is_valid);
        assert_eq!(result.entry_count, 4);
        assert_eq!(result.head_digest, log[3].digest);
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let result = verify_chain(&[]);
        assert!(result.is_valid);
        assert!(result.head_digest.is_empty());
    }

    #[test]
    fn test_rewritten_entry_detected() {
        let mut log = build_log(3);
        log[2].user_id = 99;
        let result = verify_chain(&log);
        assert!(!result.is_valid);
        assert_eq!(result.broken_at, Some(2));
    }

    #[test]
    fn test_reordered_entries_detected() {
        let mut log = build_log(2);
        log.swap(1, 2);
        assert_eq!(verify_chain(&log).broken_at, Some(1));
    }

    #[test]
    fn test_truncated_head_detected() {
        let log = build_log(2);
        assert_eq!(verify_chain(&log[1..]).broken_at, Some(0));
    }
}
