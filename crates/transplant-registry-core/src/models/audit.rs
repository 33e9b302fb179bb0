//! Audit log entry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a patient mutation did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AuditAction {
    #[serde(rename = "Created patient record")]
    Created,
    #[serde(rename = "Updated patient record")]
    Updated,
}

impl AuditAction {
    /// Human-readable label, as recorded in the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "Created patient record",
            AuditAction::Updated => "Updated patient record",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable line of a patient's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Acting user
    pub user_id: i64,
    pub action: AuditAction,
    /// SHA-256 link over the previous entry's digest and this entry's fields
    pub digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_labels_serialize_verbatim() {
        let json = serde_json::to_string(&AuditAction::Created).unwrap();
        assert_eq!(json, "\"Created patient record\"");

        let parsed: AuditAction = serde_json::from_str("\"Updated patient record\"").unwrap();
        assert_eq!(parsed, AuditAction::Updated);
        assert_eq!(parsed.to_string(), "Updated patient record");
    }
}
