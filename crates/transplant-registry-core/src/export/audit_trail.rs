//! Audit trail export with chain verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReportExporter;
use crate::audit::{verify_chain, ChainVerification, HASH_ALGORITHM};
use crate::db::StoreResult;
use crate::models::AuditEntry;

/// Export format version.
pub const AUDIT_EXPORT_VERSION: &str = "1.0";

/// Audit trail export metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrailMetadata {
    /// Export format version
    pub format_version: String,
    /// Export timestamp
    pub exported_at: DateTime<Utc>,
    /// Hash algorithm used for the digest chain
    pub hash_algorithm: String,
    /// Exporting system identifier
    pub system_id: Option<String>,
}

/// Full audit history of one patient, as verified at export time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrailExport {
    pub metadata: AuditTrailMetadata,
    pub patient_id: i64,
    pub entries: Vec<AuditEntry>,
    pub verification: ChainVerification,
}

impl AuditTrailExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Re-run verification on the exported entries, e.g. after the file was
    /// read back from disk.
    pub fn reverify(&self) -> ChainVerification {
        verify_chain(&self.entries)
    }
}

impl<'a> ReportExporter<'a> {
    /// Export one patient's audit trail.
    pub fn audit_trail(
        &self,
        patient_id: i64,
        system_id: Option<String>,
    ) -> StoreResult<AuditTrailExport> {
        let store = self.store();
        let entries = store.patient_audit_log(patient_id)?;
        let verification = verify_chain(&entries);

        if !verification.is_valid {
            tracing::warn!(
                patient_id,
                broken_at = ?verification.broken_at,
                "audit chain verification failed"
            );
        }

        Ok(AuditTrailExport {
            metadata: AuditTrailMetadata {
                format_version: AUDIT_EXPORT_VERSION.to_string(),
                exported_at: store.now(),
                hash_algorithm: HASH_ALGORITHM.to_string(),
                system_id,
            },
            patient_id,
            entries,
            verification,
        })
    }

    /// Export the audit trail of every current patient, ordered by id.
    pub fn all_audit_trails(&self, system_id: Option<String>) -> StoreResult<Vec<AuditTrailExport>> {
        let mut exports = Vec::new();
        for patient in self.store().list_patients()? {
            exports.push(self.audit_trail(patient.id, system_id.clone())?);
        }
        Ok(exports)
    }

    /// Ids of patients whose digest chain does not verify.
    pub fn tampered_patients(&self) -> StoreResult<Vec<i64>> {
        Ok(self
            .store()
            .list_patients()?
            .iter()
            .filter(|p| !p.verify_audit_trail().is_valid)
            .map(|p| p.id)
            .collect())
    }
}
