//! In-memory record store backed by SQLite.

mod ids;
mod patients;
mod schema;
mod sessions;
mod users;

pub use ids::*;
pub use schema::*;
pub use sessions::*;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;

/// Which table an operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Patient,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => f.write_str("user"),
            Entity::Patient => f.write_str("patient"),
        }
    }
}

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("Username already in use: {0}")]
    DuplicateUsername(String),

    #[error("Email domain not allowed: {0}")]
    InvalidEmailDomain(String),

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Owns the user table, the patient table, their id allocators and the
/// session backing table. All mutations go through here.
///
/// Nothing is persisted: the SQLite connection lives in memory and is
/// dropped with the store.
pub struct RecordStore {
    conn: Connection,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    user_ids: IdAllocator,
    patient_ids: IdAllocator,
    last_session_sweep: DateTime<Utc>,
}

impl RecordStore {
    /// Create an empty store with default configuration.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with the given configuration and the system clock.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an empty store with an explicit time source.
    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        let last_session_sweep = clock.now();
        Ok(Self {
            conn,
            config,
            clock,
            user_ids: IdAllocator::new(),
            patient_ids: IdAllocator::new(),
            last_session_sweep,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue the next user id. Ids are never handed out twice.
    pub fn next_user_id(&mut self) -> i64 {
        self.user_ids.next_id()
    }

    /// Issue the next patient id, independent of user ids.
    pub fn next_patient_id(&mut self) -> i64 {
        self.patient_ids.next_id()
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Serialize a timestamp the way every timestamp column stores it.
pub(crate) fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_time(column: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("{}: {} ({})", column, raw, e)))
}
