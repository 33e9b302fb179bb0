//! Audit trail integration tests.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use transplant_registry_core::clock::ManualClock;
use transplant_registry_core::export::ReportExporter;
use transplant_registry_core::models::{NewPatient, PatientChanges};
use transplant_registry_core::{verify_chain, RecordStore, StoreConfig};

fn setup_store_with_history(updates: usize) -> RecordStore {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
    ));
    let mut store = RecordStore::with_clock(StoreConfig::default(), clock.clone()).unwrap();

    let patient = store
        .create_patient(
            NewPatient {
                first_name: "Ana".into(),
                last_name: "Ruiz".into(),
                ..Default::default()
            },
            1,
        )
        .unwrap();

    for i in 0..updates {
        clock.advance(Duration::minutes(10));
        store
            .update_patient(
                patient.id,
                PatientChanges {
                    medical_history: Some(format!("Follow-up {}", i)),
                    ..Default::default()
                },
                2,
            )
            .unwrap();
    }
    store
}

#[test]
fn test_chain_valid_after_updates() {
    let store = setup_store_with_history(5);
    let log = store.patient_audit_log(1).unwrap();

    assert_eq!(log.len(), 6);
    let check = verify_chain(&log);
    assert!(check.is_valid);
    assert_eq!(check.head_digest, log[5].digest);

    // Timestamps are in call order
    assert!(log.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn test_export_round_trips_through_json() {
    let store = setup_store_with_history(2);
    let export = ReportExporter::new(&store).audit_trail(1, None).unwrap();

    let json = export.to_json().unwrap();
    let parsed: transplant_registry_core::AuditTrailExport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, export);
    assert!(parsed.reverify().is_valid);
    assert!(json.contains("Updated patient record"));
}
