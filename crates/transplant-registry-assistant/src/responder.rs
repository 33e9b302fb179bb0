//! Chat responders: message in, text out.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::blood::{extract_blood_type, join_types};
use crate::config::AssistantConfig;
use crate::{AssistantError, AssistantResult};

pub const APOLOGY: &str =
    "Sorry, something went wrong on our side. Please try again in a few moments.";
pub const SPAWN_FAILURE: &str = "Internal system error. Please try again later.";
pub const NEED_MORE_INFO: &str =
    "I understand your message, but I need more information to help you better.";

/// What the chat endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    pub success: bool,
}

impl ChatReply {
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            success: true,
        }
    }

    pub fn failed(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            success: false,
        }
    }
}

/// Anything that can answer a chat message. Failures are folded into the reply.
pub trait Responder: Send + Sync {
    fn respond(&self, message: &str) -> ChatReply;
}

/// Runs an external script once per message:
/// `<program> <script> --message <m> --intentions <path>`.
#[derive(Debug, Clone)]
pub struct SubprocessResponder {
    program: PathBuf,
    script_path: PathBuf,
    intentions_path: PathBuf,
}

impl SubprocessResponder {
    /// Build a responder, failing if the script or intent library is missing.
    pub fn new(config: &AssistantConfig) -> AssistantResult<Self> {
        check_file("intent library", &config.intentions_path)?;
        check_file("responder script", &config.script_path)?;

        Ok(Self {
            program: config.program.clone(),
            script_path: config.script_path.clone(),
            intentions_path: config.intentions_path.clone(),
        })
    }
}

fn check_file(what: &'static str, path: &Path) -> AssistantResult<()> {
    if !path.exists() {
        return Err(AssistantError::MissingFile {
            what,
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(what, path = %path.display(), "found assistant file");
    Ok(())
}

impl Responder for SubprocessResponder {
    fn respond(&self, message: &str) -> ChatReply {
        let output = Command::new(&self.program)
            .arg(&self.script_path)
            .arg("--message")
            .arg(message)
            .arg("--intentions")
            .arg(&self.intentions_path)
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, program = %self.program.display(), "failed to start responder");
                return ChatReply::failed(SPAWN_FAILURE);
            }
        };

        if !output.status.success() || !output.stderr.is_empty() {
            tracing::warn!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "responder failed"
            );
            return ChatReply::failed(APOLOGY);
        }

        let response = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if response.is_empty() {
            ChatReply::ok(NEED_MORE_INFO)
        } else {
            ChatReply::ok(response)
        }
    }
}

/// Offline responder for blood-type donation questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordResponder;

const DONATE_WORDS: &[&str] = &["donate", "donor", "give", "donar", "dona", "donante"];
const RECEIVE_WORDS: &[&str] = &["receive", "recipient", "transfusion", "recibir", "recibe", "receptor"];
const TOPIC_WORDS: &[&str] = &["blood", "type", "plasma", "sangre", "tipo"];

fn mentions_any(words: &[String], keywords: &[&str]) -> bool {
    words.iter().any(|w| keywords.contains(&w.as_str()))
}

impl Responder for KeywordResponder {
    fn respond(&self, message: &str) -> ChatReply {
        let words: Vec<String> = message
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        let donate = mentions_any(&words, DONATE_WORDS);
        let receive = mentions_any(&words, RECEIVE_WORDS);

        let Some(blood_type) = extract_blood_type(message) else {
            if donate || receive || mentions_any(&words, TOPIC_WORDS) {
                return ChatReply::ok(
                    "Which blood type are you asking about? For example: \"Who can O- donate to?\"",
                );
            }
            return ChatReply::ok(
                "I can only help with blood types, donation and transfusion. Try asking which types a given blood type can donate to or receive from.",
            );
        };

        let donate_line = format!(
            "{} can donate to: {}.",
            blood_type,
            join_types(&blood_type.recipients())
        );
        let receive_line = format!(
            "{} can receive from: {}.",
            blood_type,
            join_types(&blood_type.donors())
        );

        let response = match (donate, receive) {
            (true, false) => donate_line,
            (false, true) => receive_line,
            _ => format!("{} {}", donate_line, receive_line),
        };
        ChatReply::ok(response)
    }
}
