//! Patient reports and the roster export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Entity, RecordStore, StoreError, StoreResult};
use crate::models::{AuditAction, Document, Patient};

/// One audit line with its author resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportAuditLine {
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    /// `None` when the author id does not match any user
    pub username: Option<String>,
    pub action: AuditAction,
}

/// Everything the PDF renderer needs for a single patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientReport {
    pub generated_at: DateTime<Utc>,
    pub patient_id: i64,
    pub full_name: String,
    pub id_number: String,
    pub address: String,
    pub contact_number: String,
    pub emergency_contact: String,
    pub blood_type: String,
    pub treating_doctor: String,
    pub admission_date: DateTime<Utc>,
    pub transplant_date: Option<DateTime<Utc>>,
    pub medical_history: String,
    pub documents: Vec<Document>,
    pub last_updated_by: Option<String>,
    pub last_updated_at: DateTime<Utc>,
    pub audit_trail: Vec<ReportAuditLine>,
}

impl PatientReport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// File name the renderer should save the PDF under.
    ///
    /// Anything in the id number other than ASCII letters, digits, `-` and `_`
    /// becomes `_`, so the name never contains a path separator.
    pub fn file_name(&self) -> String {
        let id: String = self
            .id_number
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("patient_report_{}.pdf", id)
    }
}

/// One row per patient, for spreadsheets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub id_number: String,
    pub blood_type: String,
    pub treating_doctor: String,
    pub admission_date: DateTime<Utc>,
    pub transplant_date: Option<DateTime<Utc>>,
    pub document_count: usize,
    pub last_updated_at: DateTime<Utc>,
}

impl From<&Patient> for RosterRow {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id,
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            id_number: p.id_number.clone(),
            blood_type: p.blood_type.clone(),
            treating_doctor: p.treating_doctor.clone(),
            admission_date: p.admission_date,
            transplant_date: p.transplant_date,
            document_count: p.documents.len(),
            last_updated_at: p.last_updated_at,
        }
    }
}

/// All current patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientRoster {
    pub exported_at: DateTime<Utc>,
    pub patients: Vec<RosterRow>,
}

impl PatientRoster {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("id,first_name,last_name,id_number,blood_type,treating_doctor,admission_date,transplant_date,documents,last_updated_at\n");

        for row in &self.patients {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                row.id,
                escape_csv(&row.first_name),
                escape_csv(&row.last_name),
                escape_csv(&row.id_number),
                escape_csv(&row.blood_type),
                escape_csv(&row.treating_doctor),
                row.admission_date.to_rfc3339(),
                row.transplant_date
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                row.document_count,
                row.last_updated_at.to_rfc3339(),
            ));
        }

        csv
    }
}

/// Builds reports from a borrowed store.
pub struct ReportExporter<'a> {
    store: &'a RecordStore,
}

impl<'a> ReportExporter<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Report for one patient, with audit authors resolved to usernames.
    pub fn patient_report(&self, patient_id: i64) -> StoreResult<PatientReport> {
        let patient = self
            .store
            .get_patient(patient_id)?
            .ok_or(StoreError::NotFound {
                entity: Entity::Patient,
                id: patient_id,
            })?;

        let mut audit_trail = Vec::with_capacity(patient.audit_log.len());
        for entry in &patient.audit_log {
            audit_trail.push(ReportAuditLine {
                timestamp: entry.timestamp,
                user_id: entry.user_id,
                username: self.username(entry.user_id)?,
                action: entry.action,
            });
        }

        Ok(PatientReport {
            generated_at: self.store.now(),
            patient_id: patient.id,
            full_name: patient.full_name(),
            last_updated_by: self.username(patient.last_updated_by)?,
            id_number: patient.id_number,
            address: patient.address,
            contact_number: patient.contact_number,
            emergency_contact: patient.emergency_contact,
            blood_type: patient.blood_type,
            treating_doctor: patient.treating_doctor,
            admission_date: patient.admission_date,
            transplant_date: patient.transplant_date,
            medical_history: patient.medical_history,
            documents: patient.documents,
            last_updated_at: patient.last_updated_at,
            audit_trail,
        })
    }

    /// Roster of every current patient, ordered by id.
    pub fn roster(&self) -> StoreResult<PatientRoster> {
        let patients = self.store.list_patients()?;
        Ok(PatientRoster {
            exported_at: self.store.now(),
            patients: patients.iter().map(RosterRow::from).collect(),
        })
    }

    fn username(&self, user_id: i64) -> StoreResult<Option<String>> {
        Ok(self.store.get_user(user_id)?.map(|u| u.username))
    }

    pub(super) fn store(&self) -> &RecordStore {
        self.store
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::config::StoreConfig;
    use crate::models::{NewPatient, NewUser, PatientChanges};

    fn setup_store() -> RecordStore {
        let mut store = RecordStore::with_config(StoreConfig {
            bcrypt_cost: 4,
            ..Default::default()
        })
        .unwrap();
        store
            .create_user(NewUser::new("drA", "a@gmail.com", "x"))
            .unwrap();
        store
            .create_patient(
                NewPatient {
                    first_name: "Ana".into(),
                    last_name: "Ruiz, Jr.".into(),
                    id_number: "ID-1".into(),
                    blood_type: "A+".into(),
                    treating_doctor: "Dr. Vega".into(),
                    admission_date: Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap(),
                    ..Default::default()
                },
                1,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_patient_report_resolves_authors() {
        let mut store = setup_store();
        store
            .update_patient(1, PatientChanges::default(), 99)
            .unwrap();

        let report = ReportExporter::new(&store).patient_report(1).unwrap();
        assert_eq!(report.full_name, "Ana Ruiz, Jr.");
        assert_eq!(report.audit_trail.len(), 2);
        assert_eq!(report.audit_trail[0].username.as_deref(), Some("drA"));
        assert_eq!(report.audit_trail[1].username, None);
        assert_eq!(report.last_updated_by, None);
        assert_eq!(report.file_name(), "patient_report_ID-1.pdf");

        let json = report.to_json().unwrap();
        assert!(json.contains("\"auditTrail\""));
        assert!(json.contains("Created patient record"));
    }

    #[test]
    fn test_file_name_has_no_path_separators() {
        let mut store = setup_store();
        store
            .update_patient(
                1,
                PatientChanges {
                    id_number: Some("../etc/pass wd".into()),
                    ..Default::default()
                },
                1,
            )
            .unwrap();

        let report = ReportExporter::new(&store).patient_report(1).unwrap();
        assert_eq!(report.id_number, "../etc/pass wd");
        assert_eq!(report.file_name(), "patient_report____etc_pass_wd.pdf");
    }

    #[test]
    fn test_patient_report_missing() {
        let store = setup_store();
        let err = ReportExporter::new(&store).patient_report(5).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_roster_csv() {
        let store = setup_store();
        let roster = ReportExporter::new(&store).roster().unwrap();

        let csv = roster.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,first_name"));
        assert!(lines[1].contains("\"Ruiz, Jr.\""));
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("line\r\nbreak"), "\"line\r\nbreak\"");
        assert_eq!(escape_csv("carriage\rreturn"), "\"carriage\rreturn\"");
    }
}
