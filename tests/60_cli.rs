mod common;

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::Result;
use serde_json::Value;
use uuid::Uuid;

// Each test gets its own config directory so runs cannot see each other's
// servers.yaml / env.yaml / auth.yaml.
fn scratch_config_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("compass-cli-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch config dir");
    dir
}

fn compass(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_compass"))
        .env("COMPASS_CLI_CONFIG_DIR", config_dir)
        .args(args)
        .output()
        .expect("run compass binary")
}

fn stdout_json(output: &Output) -> Result<Value> {
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(serde_json::from_str(text.trim())?)
}

#[test]
fn init_scaffolds_the_config_directory() -> Result<()> {
    let dir = scratch_config_dir();

    let output = compass(&dir, &["init", "--json"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let body = stdout_json(&output)?;
    assert_eq!(body.get("success").and_then(|v| v.as_bool()), Some(true));

    for file in ["servers.yaml", "env.yaml", "auth.yaml"] {
        assert!(dir.join(file).exists(), "missing {}", file);
    }
    Ok(())
}

#[test]
fn first_registered_server_becomes_current() -> Result<()> {
    let dir = scratch_config_dir();

    let output = compass(
        &dir,
        &["server", "add", "http://127.0.0.1:4000", "local", "--json"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let body = stdout_json(&output)?;
    assert_eq!(body.get("server").and_then(|v| v.as_str()), Some("local"));

    let output = compass(&dir, &["server", "use", "--json"]);
    assert!(output.status.success());
    let body = stdout_json(&output)?;
    assert_eq!(
        body.pointer("/current_server/name").and_then(|v| v.as_str()),
        Some("local"),
        "body: {}",
        body
    );
    Ok(())
}

#[test]
fn duplicate_server_names_are_rejected() -> Result<()> {
    let dir = scratch_config_dir();

    let output = compass(&dir, &["server", "add", "http://127.0.0.1:4000", "local"]);
    assert!(output.status.success());

    let output = compass(&dir, &["server", "add", "http://127.0.0.1:4001", "local"]);
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("already exists"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}

#[test]
fn set_token_then_status_roundtrip() -> Result<()> {
    let dir = scratch_config_dir();

    let output = compass(&dir, &["auth", "set-token", "abc.def.ghi", "--json"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output = compass(&dir, &["auth", "status", "--json"]);
    assert!(output.status.success());
    let body = stdout_json(&output)?;
    assert_eq!(
        body.get("token_saved").and_then(|v| v.as_bool()),
        Some(true),
        "body: {}",
        body
    );
    Ok(())
}

#[test]
fn empty_token_is_rejected() {
    let dir = scratch_config_dir();

    let output = compass(&dir, &["auth", "set-token", "   "]);
    assert!(!output.status.success());
}

#[tokio::test]
async fn whoami_talks_to_the_configured_server() -> Result<()> {
    let server = common::ensure_server().await?;
    let dir = scratch_config_dir();

    let output = compass(&dir, &["server", "add", &server.base_url, "test", "--json"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let token = common::mint_token(Uuid::new_v4(), "cli@example.com");
    let output = compass(&dir, &["auth", "set-token", &token]);
    assert!(output.status.success());

    // The token clears the gate; the profile lookup then fails against the
    // unreachable test database and the CLI surfaces the server's error.
    let output = compass(&dir, &["auth", "whoami", "--json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("HTTP 503"),
        "expected the server's 503 in stderr, got: {}",
        stderr
    );
    Ok(())
}

#[tokio::test]
async fn whoami_without_a_token_fails_with_guidance() -> Result<()> {
    let server = common::ensure_server().await?;
    let dir = scratch_config_dir();

    let output = compass(&dir, &["server", "add", &server.base_url, "test"]);
    assert!(output.status.success());

    let output = compass(&dir, &["auth", "whoami"]);
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("set-token"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}
