//! Transplant Registry Core Library
//!
//! Patient record store with an append-only, hash-chained audit trail.
//!
//! # Architecture
//!
//! ```text
//!   HTTP routes / session middleware / PDF renderer   (external)
//!                          │
//!                  ┌───────▼────────┐
//!                  │    Registry    │  Arc<Mutex<RecordStore>>, cloneable
//!                  └───────┬────────┘
//!                          │
//!                  ┌───────▼────────┐
//!                  │  RecordStore   │  in-memory SQLite
//!                  ├────────────────┤
//!                  │ users          │  unique case-insensitive usernames
//!                  │ patients       │  audit_log: append-only digest chain
//!                  │ sessions       │  opaque backing for the auth layer
//!                  └───────┬────────┘
//!                          │
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!        Patient report          Audit trail export
//!        / roster CSV            (chain verified)
//! ```
//!
//! # Core Principle
//!
//! **Every patient mutation is attributed.** Creating or updating a patient
//! stamps the acting user and appends an audit entry; entries are never
//! rewritten or removed while the patient exists.
//!
//! # Modules
//!
//! - [`db`]: the record store and its tables
//! - [`models`]: domain types (User, Patient, Document, AuditEntry)
//! - [`audit`]: SHA-256 digest chain over audit entries
//! - [`validation`]: data-shape checks for inbound records
//! - [`credentials`]: bcrypt password hashing
//! - [`export`]: patient reports, roster and audit trail exports
//! - [`config`] / [`clock`]: tunables and the time source

pub mod audit;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod db;
pub mod export;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use audit::{verify_chain, ChainVerification};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use db::{Entity, RecordStore, SessionData, StoreError, StoreResult};
pub use export::{AuditTrailExport, PatientReport, PatientRoster, ReportExporter};
pub use models::{
    AuditAction, AuditEntry, Document, NewPatient, NewUser, Patient, PatientChanges, User,
    UserChanges,
};
pub use validation::{FieldError, ValidationErrors};

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;

// =========================================================================
// Facade Error Type
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Username already in use: {0}")]
    DuplicateUsername(String),

    #[error("Email domain not allowed: {0}")]
    InvalidEmailDomain(String),

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<StoreError> for RegistryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => RegistryError::NotFound(e.to_string()),
            StoreError::DuplicateUsername(name) => RegistryError::DuplicateUsername(name),
            StoreError::InvalidEmailDomain(email) => RegistryError::InvalidEmailDomain(email),
            StoreError::IncorrectPassword => RegistryError::IncorrectPassword,
            StoreError::InvalidInput(msg) => RegistryError::InvalidInput(msg),
            StoreError::Json(e) => RegistryError::SerializationError(e.to_string()),
            other => RegistryError::StorageError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::SerializationError(e.to_string())
    }
}

impl From<ValidationErrors> for RegistryError {
    fn from(e: ValidationErrors) -> Self {
        RegistryError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for RegistryError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        RegistryError::StorageError(format!("Lock poisoned: {}", e))
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe handle over one [`RecordStore`].
///
/// Construct it once and hand clones to the collaborators that need it.
/// Operations are serialized through the inner mutex.
#[derive(Clone)]
pub struct Registry {
    store: Arc<Mutex<RecordStore>>,
}

impl Registry {
    /// Create a registry over an empty store.
    pub fn new(config: StoreConfig) -> RegistryResult<Self> {
        Ok(Self::from_store(RecordStore::with_config(config)?))
    }

    /// Create a registry whose store reads time from `clock`.
    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> RegistryResult<Self> {
        Ok(Self::from_store(RecordStore::with_clock(config, clock)?))
    }

    pub fn from_store(store: RecordStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> RegistryResult<MutexGuard<'_, RecordStore>> {
        Ok(self.store.lock()?)
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    pub fn get_user(&self, id: i64) -> RegistryResult<Option<User>> {
        Ok(self.lock()?.get_user(id)?)
    }

    pub fn get_user_by_username(&self, username: &str) -> RegistryResult<Option<User>> {
        Ok(self.lock()?.get_user_by_username(username)?)
    }

    pub fn create_user(&self, new_user: NewUser) -> RegistryResult<User> {
        Ok(self.lock()?.create_user(new_user)?)
    }

    /// Validate registration input, then create the user.
    pub fn register(&self, new_user: NewUser) -> RegistryResult<User> {
        let mut store = self.lock()?;
        validation::validate_new_user(&new_user, store.config())?;
        Ok(store.create_user(new_user)?)
    }

    pub fn update_user(&self, id: i64, changes: UserChanges) -> RegistryResult<User> {
        Ok(self.lock()?.update_user(id, changes)?)
    }

    pub fn verify_credentials(&self, username: &str, password: &str) -> RegistryResult<Option<User>> {
        Ok(self.lock()?.verify_credentials(username, password)?)
    }

    pub fn change_password(
        &self,
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> RegistryResult<User> {
        Ok(self
            .lock()?
            .change_password(id, current_password, new_password)?)
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    pub fn create_patient(&self, new_patient: NewPatient, acting_user_id: i64) -> RegistryResult<Patient> {
        Ok(self.lock()?.create_patient(new_patient, acting_user_id)?)
    }

    pub fn get_patient(&self, id: i64) -> RegistryResult<Option<Patient>> {
        Ok(self.lock()?.get_patient(id)?)
    }

    pub fn list_patients(&self) -> RegistryResult<Vec<Patient>> {
        Ok(self.lock()?.list_patients()?)
    }

    pub fn search_patients(&self, query: &str, limit: usize) -> RegistryResult<Vec<Patient>> {
        Ok(self.lock()?.search_patients(query, limit)?)
    }

    pub fn update_patient(
        &self,
        id: i64,
        changes: PatientChanges,
        acting_user_id: i64,
    ) -> RegistryResult<Patient> {
        Ok(self.lock()?.update_patient(id, changes, acting_user_id)?)
    }

    pub fn delete_patient(&self, id: i64) -> RegistryResult<()> {
        Ok(self.lock()?.delete_patient(id)?)
    }

    pub fn patient_audit_log(&self, id: i64) -> RegistryResult<Vec<AuditEntry>> {
        Ok(self.lock()?.patient_audit_log(id)?)
    }

    // =========================================================================
    // Session Operations
    // =========================================================================

    pub fn create_session(&self, data: &SessionData) -> RegistryResult<String> {
        Ok(self.lock()?.create_session(data)?)
    }

    pub fn session_set(&self, sid: &str, data: &SessionData, ttl: Duration) -> RegistryResult<()> {
        Ok(self.lock()?.session_set(sid, data, ttl)?)
    }

    pub fn session_get(&self, sid: &str) -> RegistryResult<Option<SessionData>> {
        Ok(self.lock()?.session_get(sid)?)
    }

    pub fn session_touch(&self, sid: &str, ttl: Duration) -> RegistryResult<bool> {
        Ok(self.lock()?.session_touch(sid, ttl)?)
    }

    pub fn session_destroy(&self, sid: &str) -> RegistryResult<()> {
        Ok(self.lock()?.session_destroy(sid)?)
    }

    pub fn session_count(&self) -> RegistryResult<usize> {
        Ok(self.lock()?.session_count()?)
    }

    pub fn sweep_expired_sessions(&self) -> RegistryResult<usize> {
        Ok(self.lock()?.sweep_expired_sessions()?)
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Patient report as JSON, for the PDF renderer.
    pub fn export_patient_report_json(&self, patient_id: i64) -> RegistryResult<String> {
        let store = self.lock()?;
        let report = ReportExporter::new(&store).patient_report(patient_id)?;
        Ok(report.to_json()?)
    }

    /// Roster of all patients as CSV.
    pub fn export_roster_csv(&self) -> RegistryResult<String> {
        let store = self.lock()?;
        let roster = ReportExporter::new(&store).roster()?;
        Ok(roster.to_csv())
    }

    /// Roster of all patients as JSON.
    pub fn export_roster_json(&self) -> RegistryResult<String> {
        let store = self.lock()?;
        let roster = ReportExporter::new(&store).roster()?;
        Ok(roster.to_json()?)
    }

    /// One patient's audit trail with chain verification, as JSON.
    pub fn export_audit_trail_json(&self, patient_id: i64) -> RegistryResult<String> {
        let store = self.lock()?;
        let export = ReportExporter::new(&store).audit_trail(patient_id, None)?;
        Ok(export.to_json()?)
    }
}
