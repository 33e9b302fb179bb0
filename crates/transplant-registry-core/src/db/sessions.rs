//! Session backing table for the authentication layer.
//!
//! Expiry is stored as unix milliseconds. Expired rows are never returned and
//! are swept lazily once the configured check period has passed.

use std::collections::BTreeMap;

use chrono::Duration;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::clock::Clock;

/// What the authentication layer keeps per session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// The logged-in user, if any
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl SessionData {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            attributes: BTreeMap::new(),
        }
    }
}

impl RecordStore {
    /// Start a new session with a random id, expiring after the configured TTL.
    pub fn create_session(&mut self, data: &SessionData) -> StoreResult<String> {
        let sid = Uuid::new_v4().to_string();
        let ttl = self.config.session_ttl()?;
        self.session_set(&sid, data, ttl)?;
        Ok(sid)
    }

    /// Insert or replace a session.
    pub fn session_set(&mut self, sid: &str, data: &SessionData, ttl: Duration) -> StoreResult<()> {
        self.maybe_sweep()?;

        let expires_at = self.expiry_after(ttl)?;
        let json = serde_json::to_string(data)?;
        self.conn.execute(
            r#"
            INSERT INTO sessions (sid, data, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(sid) DO UPDATE SET data = excluded.data, expires_at = excluded.expires_at
            "#,
            params![sid, json, expires_at],
        )?;
        Ok(())
    }

    /// Look up a live session.
    pub fn session_get(&mut self, sid: &str) -> StoreResult<Option<SessionData>> {
        self.maybe_sweep()?;

        let now = self.clock.now().timestamp_millis();
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM sessions WHERE sid = ? AND expires_at > ?",
                params![sid, now],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|j| serde_json::from_str(&j))
            .transpose()
            .map_err(Into::into)
    }

    /// Extend a live session's expiry. Returns false if there is no such live session.
    pub fn session_touch(&mut self, sid: &str, ttl: Duration) -> StoreResult<bool> {
        self.maybe_sweep()?;

        let now = self.clock.now().timestamp_millis();
        let expires_at = self.expiry_after(ttl)?;
        let rows_affected = self.conn.execute(
            "UPDATE sessions SET expires_at = ?2 WHERE sid = ?1 AND expires_at > ?3",
            params![sid, expires_at, now],
        )?;
        Ok(rows_affected > 0)
    }

    /// Remove a session. Unknown ids are not an error.
    pub fn session_destroy(&mut self, sid: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE sid = ?", [sid])?;
        Ok(())
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> StoreResult<usize> {
        let now = self.clock.now().timestamp_millis();
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE expires_at > ?",
            [now],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete every expired session now. Returns how many were removed.
    pub fn sweep_expired_sessions(&mut self) -> StoreResult<usize> {
        let now = self.clock.now();
        let removed = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?",
            [now.timestamp_millis()],
        )?;
        self.last_session_sweep = now;

        tracing::debug!(removed, "expired sessions swept");
        Ok(removed)
    }

    /// Expiry in unix milliseconds for a session written now.
    fn expiry_after(&self, ttl: Duration) -> StoreResult<i64> {
        self.clock
            .now()
            .checked_add_signed(ttl)
            .map(|t| t.timestamp_millis())
            .ok_or_else(|| StoreError::InvalidInput(format!("session ttl out of range: {}", ttl)))
    }

    fn maybe_sweep(&mut self) -> StoreResult<()> {
        if self.clock.now() - self.last_session_sweep >= self.config.session_check_period()? {
            self.sweep_expired_sessions()?;
        }
        Ok(())
    }
}
