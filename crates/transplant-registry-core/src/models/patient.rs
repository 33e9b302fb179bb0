//! Patient models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, AuditEntry};

/// Maximum size of a single attached document, in bytes.
pub const MAX_DOCUMENT_BYTES: u64 = 5_000_000;

/// MIME types accepted for attached documents.
pub const ACCEPTED_DOCUMENT_TYPES: &[&str] =
    &["application/pdf", "image/x-ray", "image/jpeg", "image/png"];

/// Attachment metadata. The store keeps it verbatim; file contents live elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
}

impl Document {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            url: None,
            uploaded_at: None,
        }
    }
}

/// A patient record tracked for donation / transplant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub id_number: String,
    pub address: String,
    pub contact_number: String,
    pub emergency_contact: String,
    pub blood_type: String,
    pub treating_doctor: String,
    pub medical_history: String,
    pub documents: Vec<Document>,
    pub admission_date: DateTime<Utc>,
    /// Null until the transplant happens
    pub transplant_date: Option<DateTime<Utc>>,
    /// User id of the last writer
    pub last_updated_by: i64,
    pub last_updated_at: DateTime<Utc>,
    /// Append-only history, oldest first
    pub audit_log: Vec<AuditEntry>,
}

impl Patient {
    /// "First Last", as shown on reports.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether a transplant date has been recorded.
    pub fn is_transplanted(&self) -> bool {
        self.transplant_date.is_some()
    }

    /// Check the digest chain of this patient's audit log.
    pub fn verify_audit_trail(&self) -> crate::audit::ChainVerification {
        let mut check = crate::audit::verify_chain(&self.audit_log);
        // A stored patient always has its creation entry
        if self.audit_log.is_empty() {
            check.is_valid = false;
            check.broken_at = Some(0);
        }
        check
    }
}

/// Input for creating a patient. Content validation is the caller's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub id_number: String,
    pub address: String,
    pub contact_number: String,
    pub emergency_contact: String,
    pub blood_type: String,
    pub treating_doctor: String,
    pub medical_history: String,
    pub admission_date: DateTime<Utc>,
    #[serde(default)]
    pub documents: Option<Vec<Document>>,
}

/// Changes to an existing patient. `None` keeps the stored value.
///
/// `documents` replaces the stored list whenever it is `Some`, including an
/// empty list. `transplant_date` can be set with `Some(Some(_))` or cleared
/// with `Some(None)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientChanges {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub treating_doctor: Option<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub admission_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub transplant_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub documents: Option<Vec<Document>>,
}

impl PatientChanges {
    /// Merge these changes over `patient`. Stamps and audit entries are the store's job.
    pub fn apply_to(self, patient: &mut Patient) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }

        set(&mut patient.first_name, self.first_name);
        set(&mut patient.last_name, self.last_name);
        set(&mut patient.id_number, self.id_number);
        set(&mut patient.address, self.address);
        set(&mut patient.contact_number, self.contact_number);
        set(&mut patient.emergency_contact, self.emergency_contact);
        set(&mut patient.blood_type, self.blood_type);
        set(&mut patient.treating_doctor, self.treating_doctor);
        set(&mut patient.medical_history, self.medical_history);
        set(&mut patient.admission_date, self.admission_date);
        set(&mut patient.transplant_date, self.transplant_date);
        set(&mut patient.documents, self.documents);
    }
}
