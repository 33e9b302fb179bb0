//! Assistant configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the chat model lives and where feedback goes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    /// Interpreter used to run the responder script
    pub program: PathBuf,
    pub script_path: PathBuf,
    /// Intent library handed to the script
    pub intentions_path: PathBuf,
    pub feedback_path: PathBuf,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            script_path: PathBuf::from("assistant/neural_chatbot.py"),
            intentions_path: PathBuf::from("assistant/intentions.json"),
            feedback_path: PathBuf::from("assistant/feedback_data.json"),
        }
    }
}

impl AssistantConfig {
    /// Parse a TOML document, filling unspecified keys with defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
