//! Data-shape checks for inbound user and patient data.
//!
//! The request-handling layer runs these before calling the store; the store
//! itself only enforces identity and uniqueness rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::StoreConfig;
use crate::models::{Document, NewPatient, NewUser, PatientChanges};

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All problems found in one input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{} invalid field(s): {}", .errors.len(), summary(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// True if `field` was rejected.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collects field errors, then converts into a `Result`.
#[derive(Default)]
struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{} is required", field));
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

/// Validate registration input.
pub fn validate_new_user(user: &NewUser, config: &StoreConfig) -> Result<(), ValidationErrors> {
    let mut c = Collector::default();
    c.required("username", &user.username);
    c.required("password", &user.password);
    check_email(&mut c, &user.email, config);
    c.finish()
}

/// Validate a new patient record, including its documents.
pub fn validate_new_patient(
    patient: &NewPatient,
    config: &StoreConfig,
) -> Result<(), ValidationErrors> {
    let mut c = Collector::default();
    for (field, value) in [
        ("firstName", &patient.first_name),
        ("lastName", &patient.last_name),
        ("idNumber", &patient.id_number),
        ("address", &patient.address),
        ("contactNumber", &patient.contact_number),
        ("emergencyContact", &patient.emergency_contact),
        ("bloodType", &patient.blood_type),
        ("treatingDoctor", &patient.treating_doctor),
        ("medicalHistory", &patient.medical_history),
    ] {
        c.required(field, value);
    }
    if let Some(documents) = &patient.documents {
        check_documents(&mut c, documents, config);
    }
    c.finish()
}

/// Validate a partial patient update: supplied strings must be non-empty.
pub fn validate_patient_changes(
    changes: &PatientChanges,
    config: &StoreConfig,
) -> Result<(), ValidationErrors> {
    let mut c = Collector::default();
    for (field, value) in [
        ("firstName", &changes.first_name),
        ("lastName", &changes.last_name),
        ("idNumber", &changes.id_number),
        ("address", &changes.address),
        ("contactNumber", &changes.contact_number),
        ("emergencyContact", &changes.emergency_contact),
        ("bloodType", &changes.blood_type),
        ("treatingDoctor", &changes.treating_doctor),
        ("medicalHistory", &changes.medical_history),
    ] {
        if let Some(value) = value {
            c.required(field, value);
        }
    }
    if let Some(documents) = &changes.documents {
        check_documents(&mut c, documents, config);
    }
    c.finish()
}

/// Validate one attachment's MIME type and size.
pub fn validate_document(document: &Document, config: &StoreConfig) -> Result<(), ValidationErrors> {
    let mut c = Collector::default();
    check_document(&mut c, "document", document, config);
    c.finish()
}

fn check_email(c: &mut Collector, email: &str, config: &StoreConfig) {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    };
    if !well_formed {
        c.push("email", "invalid email address");
    } else if !config.is_allowed_email(email) {
        c.push(
            "email",
            format!(
                "only {} addresses are accepted",
                config.allowed_email_domains.join(" or ")
            ),
        );
    }
}

fn check_documents(c: &mut Collector, documents: &[Document], config: &StoreConfig) {
    for (i, document) in documents.iter().enumerate() {
        check_document(c, &format!("documents[{}]", i), document, config);
    }
}

fn check_document(c: &mut Collector, field: &str, document: &Document, config: &StoreConfig) {
    if !config
        .accepted_document_types
        .iter()
        .any(|t| t == &document.mime_type)
    {
        c.push(
            format!("{}.type", field),
            format!("file type {} is not allowed", document.mime_type),
        );
    }
    if document.size > config.max_document_bytes {
        c.push(
            format!("{}.size", field),
            format!(
                "file is {} bytes, maximum is {}",
                document.size, config.max_document_bytes
            ),
        );
    }
}
