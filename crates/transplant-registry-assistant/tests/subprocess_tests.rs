//! Subprocess responder integration tests, driven through `sh`.
#![cfg(unix)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use transplant_registry_assistant::responder::{APOLOGY, NEED_MORE_INFO, SPAWN_FAILURE};
use transplant_registry_assistant::{AssistantConfig, Responder, SubprocessResponder};

fn setup(script: &str) -> (TempDir, AssistantConfig) {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("chat.sh");
    let intentions_path = dir.path().join("intents.json");
    fs::write(&script_path, script).unwrap();
    fs::write(&intentions_path, r#"{"intents":[]}"#).unwrap();

    let config = AssistantConfig {
        program: "sh".into(),
        script_path,
        intentions_path,
        feedback_path: dir.path().join("feedback.json"),
    };
    (dir, config)
}

#[test]
fn test_passes_message_and_intentions() {
    let (_dir, config) = setup(
        r#"
        # $1=--message $2=<m> $3=--intentions $4=<path>
        [ "$1" = "--message" ] && [ "$3" = "--intentions" ] && [ -f "$4" ] || exit 9
        echo "  you said: $2  "
        "#,
    );
    let responder = SubprocessResponder::new(&config).unwrap();

    let reply = responder.respond("Who can O- donate to?");
    assert!(reply.success);
    assert_eq!(reply.response, "you said: Who can O- donate to?");
}

#[test]
fn test_nonzero_exit_is_failure() {
    let (_dir, config) = setup("echo partial; exit 3\n");
    let reply = SubprocessResponder::new(&config).unwrap().respond("hi");

    assert!(!reply.success);
    assert_eq!(reply.response, APOLOGY);
}

#[test]
fn test_any_stderr_is_failure() {
    let (_dir, config) = setup("echo answer; echo warning >&2\n");
    let reply = SubprocessResponder::new(&config).unwrap().respond("hi");

    assert!(!reply.success);
    assert_eq!(reply.response, APOLOGY);
}

#[test]
fn test_empty_output_asks_for_more() {
    let (_dir, config) = setup("printf '   \\n'\n");
    let reply = SubprocessResponder::new(&config).unwrap().respond("hmm");

    assert!(reply.success);
    assert_eq!(reply.response, NEED_MORE_INFO);
}

#[test]
fn test_missing_program() {
    let (_dir, mut config) = setup("echo never\n");
    config.program = Path::new("/nonexistent/interpreter").to_path_buf();
    let reply = SubprocessResponder::new(&config).unwrap().respond("hi");

    assert!(!reply.success);
    assert_eq!(reply.response, SPAWN_FAILURE);
}

#[test]
fn test_missing_script_rejected_at_construction() {
    let (dir, mut config) = setup("echo never\n");
    config.script_path = dir.path().join("gone.sh");
    assert!(SubprocessResponder::new(&config).is_err());
}
