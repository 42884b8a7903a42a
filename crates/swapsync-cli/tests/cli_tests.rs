//! Tests that run the built `swapsync` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const ENV_VARS: [&str; 8] = [
    "RUST_LOG",
    "LLAMA_SWAP_CONFIG",
    "LLAMA_SWAP_MODELS_DIR",
    "LLAMA_SWAP_CONTAINER",
    "LLAMA_SWAP_PRUNE",
    "LLAMA_SWAP_DRY_RUN",
    "LLAMA_SWAP_NO_RESTART",
    "LLAMA_SWAP_MAX_BACKUPS",
];

fn swapsync(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_swapsync"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.arg("--config")
        .arg(dir.join("config.yaml"))
        .arg("--models-dir")
        .arg(dir.join("models"))
        .arg("--no-restart");
    cmd
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("models/alpha")).unwrap();
    fs::write(dir.path().join("models/alpha/model-7b.gguf"), b"GGUF").unwrap();
    dir
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_sync_adds_model_and_prints_report() {
    let dir = setup();
    let output = swapsync(dir.path()).arg("--json").output().unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = json(&output);
    assert_eq!(report["added"], serde_json::json!(["alpha--model-7b"]));
    assert_eq!(report["saved"], serde_json::json!(true));
    assert_eq!(report["restart"]["status"], serde_json::json!("skipped"));

    let text = fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(text.contains("alpha--model-7b"));
}

#[test]
fn test_nothing_to_do_exits_zero() {
    let dir = setup();
    assert!(swapsync(dir.path()).output().unwrap().status.success());

    let output = swapsync(dir.path()).arg("--json").output().unwrap();
    assert!(output.status.success());
    assert_eq!(json(&output)["saved"], serde_json::json!(false));
}

#[test]
fn test_dry_run_from_env() {
    let dir = setup();
    let output = swapsync(dir.path())
        .env("LLAMA_SWAP_DRY_RUN", "1")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!dir.path().join("config.yaml").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("DRY RUN"));
}

#[test]
fn test_corrupt_config_exit_code() {
    let dir = setup();
    fs::write(dir.path().join("config.yaml"), "models: [unclosed\n").unwrap();

    let output = swapsync(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_held_lock_exit_code() {
    let dir = setup();
    fs::write(dir.path().join("config.yaml.lock"), "4242").unwrap();

    let output = swapsync(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(!dir.path().join("config.yaml").exists());
}

#[test]
fn test_collision_exit_code() {
    let dir = setup();
    fs::write(dir.path().join("models/alpha--model-7b.gguf"), b"GGUF").unwrap();

    let output = swapsync(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join("config.yaml").exists());
}

#[test]
fn test_list_touches_nothing() {
    let dir = setup();
    let output = swapsync(dir.path()).args(["--list", "--json"]).output().unwrap();

    assert!(output.status.success());
    let inventory = json(&output);
    assert_eq!(
        inventory["models"]["alpha--model-7b"],
        serde_json::json!("alpha/model-7b.gguf")
    );
    assert!(!dir.path().join("config.yaml").exists());
    assert!(!dir.path().join("config.yaml.lock").exists());
}

#[test]
fn test_verbose_and_quiet_conflict() {
    let dir = setup();
    let output = swapsync(dir.path()).args(["-v", "-q"]).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_rust_log_overrides_default_level() {
    let dir = setup();
    let output = swapsync(dir.path()).output().unwrap();
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Derived key"));

    let output = swapsync(dir.path())
        .env("RUST_LOG", "debug")
        .arg("--dry-run")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Derived key"));
}
