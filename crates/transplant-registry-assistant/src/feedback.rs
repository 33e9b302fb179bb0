//! Thumbs-up/down feedback on assistant replies, kept as a JSON array file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AssistantResult;

/// One rating of one reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub message_id: String,
    pub is_positive: bool,
    pub user_message: String,
    pub bot_response: String,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackEntry {
    /// Stamp a rating with the current time.
    pub fn new(
        message_id: impl Into<String>,
        is_positive: bool,
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            is_positive,
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only feedback file.
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded entries. A missing file is an empty log.
    pub fn entries(&self) -> AssistantResult<Vec<FeedbackEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Append one entry, creating the file and its directories as needed.
    ///
    /// An unreadable existing file is logged and replaced rather than blocking
    /// new feedback.
    pub fn record(&self, entry: FeedbackEntry) -> AssistantResult<()> {
        let mut entries = match self.entries() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "discarding unreadable feedback file");
                Vec::new()
            }
        };
        entries.push(entry);

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;

        tracing::debug!(count = entries.len(), "feedback recorded");
        Ok(())
    }

    /// (positive, negative) counts.
    pub fn tally(&self) -> AssistantResult<(usize, usize)> {
        let entries = self.entries()?;
        let positive = entries.iter().filter(|e| e.is_positive).count();
        Ok((positive, entries.len() - positive))
    }
}
