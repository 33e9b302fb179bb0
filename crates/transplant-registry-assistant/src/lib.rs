//! Chat assistant collaborator for the transplant registry.
//!
//! The registry treats the assistant as an opaque request/response service:
//! a message goes in, a [`ChatReply`] comes out. [`SubprocessResponder`] runs
//! the trained model as an external script; [`KeywordResponder`] answers
//! blood-type compatibility questions without it.

pub mod blood;
pub mod config;
pub mod feedback;
pub mod responder;

pub use blood::{extract_blood_type, AboGroup, BloodType};
pub use config::AssistantConfig;
pub use feedback::{FeedbackEntry, FeedbackLog};
pub use responder::{ChatReply, KeywordResponder, Responder, SubprocessResponder};

use std::path::PathBuf;

use thiserror::Error;

/// Assistant errors.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("{what} not found at {}", .path.display())]
    MissingFile { what: &'static str, path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type AssistantResult<T> = Result<T, AssistantError>;
