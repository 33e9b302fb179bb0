//! Patient table operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{decode_time, encode_time, Entity, RecordStore, StoreError, StoreResult};
use crate::audit::append_entry;
use crate::clock::Clock;
use crate::models::{AuditAction, AuditEntry, Document, NewPatient, Patient, PatientChanges};

impl RecordStore {
    /// Insert a new patient, seeding its audit log with a creation entry.
    pub fn create_patient(&mut self, new_patient: NewPatient, acting_user_id: i64) -> StoreResult<Patient> {
        let now = self.clock.now();
        let mut audit_log = Vec::with_capacity(1);
        append_entry(&mut audit_log, now, acting_user_id, AuditAction::Created);

        let patient = Patient {
            id: self.next_patient_id(),
            first_name: new_patient.first_name,
            last_name: new_patient.last_name,
            id_number: new_patient.id_number,
            address: new_patient.address,
            contact_number: new_patient.contact_number,
            emergency_contact: new_patient.emergency_contact,
            blood_type: new_patient.blood_type,
            treating_doctor: new_patient.treating_doctor,
            medical_history: new_patient.medical_history,
            documents: new_patient.documents.unwrap_or_default(),
            admission_date: new_patient.admission_date,
            transplant_date: None,
            last_updated_by: acting_user_id,
            last_updated_at: now,
            audit_log,
        };

        insert_patient(&self.conn, &patient)?;

        tracing::info!(patient_id = patient.id, acting_user_id, "patient record created");
        Ok(patient)
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> StoreResult<Option<Patient>> {
        select_patient(&self.conn, id)
    }

    /// Snapshot of every current patient, ordered by id.
    pub fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY id",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], map_row)?;

        let mut patients: Vec<Patient> = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Search patients by first name, last name or id number (case-insensitive prefix).
    pub fn search_patients(&self, query: &str, limit: usize) -> StoreResult<Vec<Patient>> {
        let pattern = format!("{}%", escape_like(query));
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM patients
            WHERE first_name LIKE ?1 ESCAPE '\'
               OR last_name LIKE ?1 ESCAPE '\'
               OR id_number LIKE ?1 ESCAPE '\'
            ORDER BY last_name, first_name, id
            LIMIT ?2
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], map_row)?;

        let mut patients: Vec<Patient> = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Merge `changes` over a patient, stamp the acting user and append an
    /// "Updated patient record" entry. Either everything applies or nothing does.
    pub fn update_patient(
        &mut self,
        id: i64,
        changes: PatientChanges,
        acting_user_id: i64,
    ) -> StoreResult<Patient> {
        let tx = self.conn.transaction()?;
        let Some(mut patient) = select_patient(&tx, id)? else {
            tracing::warn!(patient_id = id, acting_user_id, "update rejected: no such patient");
            return Err(StoreError::NotFound {
                entity: Entity::Patient,
                id,
            });
        };

        // Never step backwards, even if the clock does
        let now = self.clock.now().max(patient.last_updated_at);

        changes.apply_to(&mut patient);
        patient.last_updated_by = acting_user_id;
        patient.last_updated_at = now;
        append_entry(&mut patient.audit_log, now, acting_user_id, AuditAction::Updated);

        update_patient_row(&tx, &patient)?;
        tx.commit()?;

        tracing::debug!(
            patient_id = id,
            acting_user_id,
            audit_entries = patient.audit_log.len(),
            "patient record updated"
        );
        Ok(patient)
    }

    /// Remove a patient permanently. Its id is never issued again.
    pub fn delete_patient(&mut self, id: i64) -> StoreResult<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;

        if rows_affected == 0 {
            tracing::warn!(patient_id = id, "delete rejected: no such patient");
            return Err(StoreError::NotFound {
                entity: Entity::Patient,
                id,
            });
        }

        tracing::info!(patient_id = id, "patient record deleted");
        Ok(())
    }

    /// The audit history of one patient, oldest first.
    pub fn patient_audit_log(&self, id: i64) -> StoreResult<Vec<AuditEntry>> {
        self.get_patient(id)?
            .map(|p| p.audit_log)
            .ok_or(StoreError::NotFound {
                entity: Entity::Patient,
                id,
            })
    }
}

const PATIENT_COLUMNS: &str = "id, first_name, last_name, id_number, address, contact_number, \
     emergency_contact, blood_type, treating_doctor, medical_history, documents, \
     admission_date, transplant_date, last_updated_by, last_updated_at, audit_log";

fn select_patient(conn: &Connection, id: i64) -> StoreResult<Option<Patient>> {
    conn.query_row(
        &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
        [id],
        map_row,
    )
    .optional()?
    .map(|row| row.try_into())
    .transpose()
}

fn insert_patient(conn: &Connection, patient: &Patient) -> StoreResult<()> {
    let documents_json = serde_json::to_string(&patient.documents)?;
    let audit_log_json = serde_json::to_string(&patient.audit_log)?;

    conn.execute(
        &format!(
            "INSERT INTO patients ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            PATIENT_COLUMNS
        ),
        params![
            patient.id,
            patient.first_name,
            patient.last_name,
            patient.id_number,
            patient.address,
            patient.contact_number,
            patient.emergency_contact,
            patient.blood_type,
            patient.treating_doctor,
            patient.medical_history,
            documents_json,
            encode_time(&patient.admission_date),
            patient.transplant_date.as_ref().map(encode_time),
            patient.last_updated_by,
            encode_time(&patient.last_updated_at),
            audit_log_json,
        ],
    )?;
    Ok(())
}

fn update_patient_row(conn: &Connection, patient: &Patient) -> StoreResult<()> {
    let documents_json = serde_json::to_string(&patient.documents)?;
    let audit_log_json = serde_json::to_string(&patient.audit_log)?;

    conn.execute(
        r#"
        UPDATE patients SET
            first_name = ?2,
            last_name = ?3,
            id_number = ?4,
            address = ?5,
            contact_number = ?6,
            emergency_contact = ?7,
            blood_type = ?8,
            treating_doctor = ?9,
            medical_history = ?10,
            documents = ?11,
            admission_date = ?12,
            transplant_date = ?13,
            last_updated_by = ?14,
            last_updated_at = ?15,
            audit_log = ?16
        WHERE id = ?1
        "#,
        params![
            patient.id,
            patient.first_name,
            patient.last_name,
            patient.id_number,
            patient.address,
            patient.contact_number,
            patient.emergency_contact,
            patient.blood_type,
            patient.treating_doctor,
            patient.medical_history,
            documents_json,
            encode_time(&patient.admission_date),
            patient.transplant_date.as_ref().map(encode_time),
            patient.last_updated_by,
            encode_time(&patient.last_updated_at),
            audit_log_json,
        ],
    )?;
    Ok(())
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        id_number: row.get(3)?,
        address: row.get(4)?,
        contact_number: row.get(5)?,
        emergency_contact: row.get(6)?,
        blood_type: row.get(7)?,
        treating_doctor: row.get(8)?,
        medical_history: row.get(9)?,
        documents: row.get(10)?,
        admission_date: row.get(11)?,
        transplant_date: row.get(12)?,
        last_updated_by: row.get(13)?,
        last_updated_at: row.get(14)?,
        audit_log: row.get(15)?,
    })
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: i64,
    first_name: String,
    last_name: String,
    id_number: String,
    address: String,
    contact_number: String,
    emergency_contact: String,
    blood_type: String,
    treating_doctor: String,
    medical_history: String,
    documents: String,
    admission_date: String,
    transplant_date: Option<String>,
    last_updated_by: i64,
    last_updated_at: String,
    audit_log: String,
}

impl TryFrom<PatientRow> for Patient {
    type Error = StoreError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let documents: Vec<Document> = serde_json::from_str(&row.documents)?;
        let audit_log: Vec<AuditEntry> = serde_json::from_str(&row.audit_log)?;
        let transplant_date = row
            .transplant_date
            .as_deref()
            .map(|raw| decode_time("transplant_date", raw))
            .transpose()?;

        Ok(Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            id_number: row.id_number,
            address: row.address,
            contact_number: row.contact_number,
            emergency_contact: row.emergency_contact,
            blood_type: row.blood_type,
            treating_doctor: row.treating_doctor,
            medical_history: row.medical_history,
            documents,
            admission_date: decode_time("admission_date", &row.admission_date)?,
            transplant_date,
            last_updated_by: row.last_updated_by,
            last_updated_at: decode_time("last_updated_at", &row.last_updated_at)?,
            audit_log,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::StoreConfig;

    fn setup_store() -> (RecordStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        ));
        let store = RecordStore::with_clock(StoreConfig::default(), clock.clone()).unwrap();
        (store, clock)
    }

    fn make_patient(first: &str, last: &str) -> NewPatient {
        NewPatient {
            first_name: first.into(),
            last_name: last.into(),
            id_number: format!("ID-{}", last),
            address: "Calle 1".into(),
            contact_number: "555-0100".into(),
            emergency_contact: "Family".into(),
            blood_type: "A+".into(),
            treating_doctor: "Dr. Vega".into(),
            medical_history: "Renal failure".into(),
            admission_date: Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap(),
            documents: None,
        }
    }

    #[test]
    fn test_create_and_get() {
        let (mut store, clock) = setup_store();
        let created = store.create_patient(make_patient("Ana", "Ruiz"), 1).unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.last_updated_by, 1);
        assert_eq!(created.last_updated_at, clock.now());
        assert!(created.transplant_date.is_none());
        assert!(created.documents.is_empty());
        assert_eq!(created.audit_log.len(), 1);
        assert_eq!(created.audit_log[0].action, AuditAction::Created);

        let retrieved = store.get_patient(1).unwrap().unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_documents_stored_verbatim() {
        let (mut store, _) = setup_store();
        let mut new_patient = make_patient("Ana", "Ruiz");
        let mut doc = Document::new("labs.pdf", "application/pdf", 1200);
        doc.url = Some("/files/labs.pdf".into());
        new_patient.documents = Some(vec![doc.clone()]);

        let created = store.create_patient(new_patient, 1).unwrap();
        assert_eq!(store.get_patient(created.id).unwrap().unwrap().documents, vec![doc]);
    }

    #[test]
    fn test_update_appends_audit_entry() {
        let (mut store, clock) = setup_store();
        store.create_patient(make_patient("Ana", "Ruiz"), 1).unwrap();

        clock.advance(Duration::minutes(5));
        let updated = store
            .update_patient(
                1,
                PatientChanges {
                    blood_type: Some("O+".into()),
                    ..Default::default()
                },
                2,
            )
            .unwrap();

        assert_eq!(updated.blood_type, "O+");
        assert_eq!(updated.first_name, "Ana");
        assert_eq!(updated.last_updated_by, 2);
        assert_eq!(updated.last_updated_at, clock.now());
        assert_eq!(updated.audit_log.len(), 2);
        assert_eq!(updated.audit_log[1].action, AuditAction::Updated);
        assert_eq!(updated.audit_log[1].user_id, 2);
        assert!(updated.verify_audit_trail().is_valid);
    }

    #[test]
    fn test_update_never_moves_stamp_backwards() {
        let (mut store, clock) = setup_store();
        let created = store.create_patient(make_patient("Ana", "Ruiz"), 1).unwrap();

        clock.advance(Duration::hours(-3));
        let updated = store
            .update_patient(1, PatientChanges::default(), 1)
            .unwrap();
        assert_eq!(updated.last_updated_at, created.last_updated_at);
        assert!(updated.verify_audit_trail().is_valid);
    }

    #[test]
    fn test_update_missing_patient() {
        let (mut store, _) = setup_store();
        store.create_patient(make_patient("Ana", "Ruiz"), 1).unwrap();
        let before = store.list_patients().unwrap();

        let err = store
            .update_patient(999, PatientChanges::default(), 1)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.list_patients().unwrap(), before);
    }

    #[test]
    fn test_delete_and_no_id_reuse() {
        let (mut store, _) = setup_store();
        store.create_patient(make_patient("Ana", "Ruiz"), 1).unwrap();
        store.create_patient(make_patient("Ben", "Soto"), 1).unwrap();

        store.delete_patient(2).unwrap();
        assert!(store.get_patient(2).unwrap().is_none());
        assert!(store.delete_patient(2).unwrap_err().is_not_found());

        let next = store.create_patient(make_patient("Cai", "Lim"), 1).unwrap();
        assert_eq!(next.id, 3);
    }

    #[test]
    fn test_list_ordered_by_id() {
        let (mut store, _) = setup_store();
        for (first, last) in [("Ana", "Ruiz"), ("Ben", "Soto"), ("Cai", "Lim")] {
            store.create_patient(make_patient(first, last), 1).unwrap();
        }
        let ids: Vec<i64> = store.list_patients().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_search_patients() {
        let (mut store, _) = setup_store();
        store.create_patient(make_patient("Ana", "Ruiz"), 1).unwrap();
        store.create_patient(make_patient("Anabel", "Soto"), 1).unwrap();
        store.create_patient(make_patient("Ben", "Anders"), 1).unwrap();
        store.create_patient(make_patient("Cai", "Lim"), 1).unwrap();

        let results = store.search_patients("ana", 10).unwrap();
        assert_eq!(results.len(), 3);

        let results = store.search_patients("ana", 1).unwrap();
        assert_eq!(results.len(), 1);

        assert!(store.search_patients("%", 10).unwrap().is_empty());
    }

    #[test]
    fn test_patient_audit_log() {
        let (mut store, _) = setup_store();
        store.create_patient(make_patient("Ana", "Ruiz"), 1).unwrap();
        store.update_patient(1, PatientChanges::default(), 1).unwrap();

        assert_eq!(store.patient_audit_log(1).unwrap().len(), 2);
        assert!(store.patient_audit_log(7).unwrap_err().is_not_found());
    }
}
