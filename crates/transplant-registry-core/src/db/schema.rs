//! SQLite schema definition.

/// Complete in-memory schema for the record store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Users
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,                      -- assigned by the store's allocator
    username TEXT NOT NULL,
    username_key TEXT NOT NULL UNIQUE,           -- lowercased username
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,                 -- bcrypt
    profile_image TEXT                           -- data URI
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY,                      -- assigned by the store's allocator
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    id_number TEXT NOT NULL,
    address TEXT NOT NULL,
    contact_number TEXT NOT NULL,
    emergency_contact TEXT NOT NULL,
    blood_type TEXT NOT NULL,
    treating_doctor TEXT NOT NULL,
    medical_history TEXT NOT NULL,
    documents TEXT NOT NULL DEFAULT '[]',        -- JSON array of Document
    admission_date TEXT NOT NULL,                -- RFC 3339
    transplant_date TEXT,                        -- RFC 3339, NULL until set
    last_updated_by INTEGER NOT NULL,
    last_updated_at TEXT NOT NULL,               -- RFC 3339
    audit_log TEXT NOT NULL DEFAULT '[]'         -- JSON array of AuditEntry, append-only
);

CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name);
CREATE INDEX IF NOT EXISTS idx_patients_id_number ON patients(id_number);

-- ============================================================================
-- Sessions (backing store for the authentication layer)
-- ============================================================================

CREATE TABLE IF NOT EXISTS sessions (
    sid TEXT PRIMARY KEY,
    data TEXT NOT NULL,                          -- JSON SessionData
    expires_at INTEGER NOT NULL                  -- unix epoch milliseconds
);

CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
"#;
