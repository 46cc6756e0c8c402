//! Env-file-backed persistence integration tests
//!
//! These tests verify that values captured by handler scripts through
//! `client.global.set` survive a simulated restart: written through an
//! [`EnvFileWriter`], reloaded from disk, and visible to a fresh store.

use rest_hooks::models::ResponseSnapshot;
use rest_hooks::script::{execute_script, ScriptContext, ScriptErrorKind, DEFAULT_TIMEOUT};
use rest_hooks::store::env_file::{self, EnvFileWriter};
use rest_hooks::store::VariableStore;

use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to build a store backed by a variable file under a temp dir
fn file_backed_store(dir: &TempDir) -> (VariableStore, PathBuf) {
    let path = dir.path().join("http-client.env");
    let persistent = env_file::load(&path).expect("Failed to load variable file");
    let writer = Arc::new(EnvFileWriter::new(&path));
    (VariableStore::with_persistent(writer, persistent), path)
}

fn json_response(body: serde_json::Value) -> ResponseSnapshot {
    let mut response = ResponseSnapshot::new(200);
    response.add_header("Content-Type", "application/json");
    response.set_body(&serde_json::to_string(&body).unwrap());
    response
}

#[test]
fn test_captured_value_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    // First "session": a handler captures the token persistently
    {
        let (store, _path) = file_backed_store(&temp_dir);
        let context = ScriptContext::new(json_response(json!({"token": "tok-123"})), store);

        let outcome = execute_script(
            "client.global.set(\"authToken\", response.json().token);",
            &context,
            DEFAULT_TIMEOUT,
        );
        assert!(outcome.succeeded(), "{:?}", outcome.error);
    }

    // Second "session": a fresh store loads the file and sees the value
    let (store, path) = file_backed_store(&temp_dir);
    assert_eq!(store.get("authToken").unwrap(), "tok-123");
    assert_eq!(store.get_persistent("authToken").unwrap(), "tok-123");

    // And the file itself is the plain line format
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("authToken=tok-123"));
}

#[test]
fn test_session_values_do_not_survive_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let (store, _path) = file_backed_store(&temp_dir);
        let context = ScriptContext::new(json_response(json!({})), store.clone());

        let outcome = execute_script(
            "client.session.set(\"ephemeral\", \"gone-after-restart\");",
            &context,
            DEFAULT_TIMEOUT,
        );
        assert!(outcome.succeeded());
        assert_eq!(store.get("ephemeral").unwrap(), "gone-after-restart");
    }

    let (store, _path) = file_backed_store(&temp_dir);
    assert_eq!(store.get("ephemeral"), None);
}

#[test]
fn test_concurrent_persistent_writes_serialize() {
    let temp_dir = TempDir::new().unwrap();
    let (store, path) = file_backed_store(&temp_dir);

    let mut handles = Vec::new();
    for i in 0..4 {
        let store = store.clone();
        handles.push(std::thread::spawn(move || {
            let context = ScriptContext::new(json_response(json!({"id": i})), store);
            let script = format!(
                "client.global.set(\"entity-{}\", String(response.json().id));",
                i
            );
            execute_script(&script, &context, DEFAULT_TIMEOUT)
        }));
    }
    for handle in handles {
        assert!(handle.join().unwrap().succeeded());
    }

    // Every write survived the interleaving; the file holds all four
    let vars = env_file::load(&path).unwrap();
    for i in 0..4 {
        assert_eq!(vars.get(&format!("entity-{}", i)).unwrap(), &i.to_string());
    }
}

#[test]
fn test_unwritable_backing_file_fails_execution_as_persistence() {
    let temp_dir = TempDir::new().unwrap();
    // Point the writer at a path whose parent does not exist
    let path = temp_dir.path().join("no-such-dir").join("vars.env");
    let writer = Arc::new(EnvFileWriter::new(&path));
    let store = VariableStore::new(writer);

    let context = ScriptContext::new(json_response(json!({})), store.clone());
    let outcome = execute_script(
        "client.global.set(\"k\", \"v\"); client.session.set(\"still-ran\", \"yes\");",
        &context,
        DEFAULT_TIMEOUT,
    );

    assert_eq!(outcome.error_kind(), Some(ScriptErrorKind::Persistence));
    // The failed write never entered the in-memory persistent tier
    assert_eq!(store.get("k"), None);
    // The rest of the script still executed
    assert_eq!(store.get("still-ran").unwrap(), "yes");
}

#[test]
fn test_existing_file_entries_are_preserved_on_write() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("http-client.env");
    fs::write(&path, "BASE_URL=https://api.example.com\n").unwrap();

    let (store, path) = {
        let persistent = env_file::load(&path).unwrap();
        let writer = Arc::new(EnvFileWriter::new(&path));
        (VariableStore::with_persistent(writer, persistent), path)
    };

    let context = ScriptContext::new(json_response(json!({"token": "t"})), store.clone());
    let outcome = execute_script(
        "client.global.set(\"authToken\", response.json().token);",
        &context,
        DEFAULT_TIMEOUT,
    );
    assert!(outcome.succeeded());

    let vars = env_file::load(&path).unwrap();
    assert_eq!(vars.get("BASE_URL").unwrap(), "https://api.example.com");
    assert_eq!(vars.get("authToken").unwrap(), "t");
    // And the preloaded entry is readable through the store as well
    assert_eq!(store.get("BASE_URL").unwrap(), "https://api.example.com");
}
