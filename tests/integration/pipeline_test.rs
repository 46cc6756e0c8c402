//! Post-response pipeline integration tests
//!
//! These tests run the whole flow a request executor would drive: parse
//! handler blocks out of request-file text, execute them against a
//! response snapshot with a shared variable store, and redact the result
//! for display.

use rest_hooks::handler::{parse_file_handlers, parse_handler_blocks, HandlerParseError};
use rest_hooks::models::ResponseSnapshot;
use rest_hooks::redact::{redact_body, redact_headers, redact_url, RedactionPatterns};
use rest_hooks::script::{execute_script, run_handler, ScriptContext, ScriptErrorKind, DEFAULT_TIMEOUT};
use rest_hooks::store::VariableStore;

use proptest::prelude::*;
use serde_json::json;
use std::time::Duration;

/// Helper to create a mock response with a JSON body
fn create_json_response(status: u16, body: serde_json::Value) -> ResponseSnapshot {
    let mut response = ResponseSnapshot::new(status);
    response.add_header("Content-Type", "application/json");
    response.set_body(&serde_json::to_string(&body).unwrap());
    response
}

#[test]
fn test_login_token_capture_workflow() {
    // A login definition whose handler captures the token, followed by a
    // profile definition with no handler.
    let file_content = r#"POST https://api.example.com/auth/login
Content-Type: application/json

{"username": "test", "password": "pass"}

> {%
    const body = response.json();
    client.session.set("authToken", body.token);
    client.assert("login succeeded", () => response.status === 200);
%}

###

GET https://api.example.com/api/profile
Authorization: Bearer {{authToken}}
"#;

    let definitions = parse_file_handlers(file_content);
    assert_eq!(definitions.len(), 2);

    let login_blocks = definitions[0].outcome.as_ref().unwrap();
    assert_eq!(login_blocks.len(), 1);
    assert!(definitions[1].outcome.as_ref().unwrap().is_empty());

    // Simulate the login response arriving
    let response = create_json_response(200, json!({"token": "secret-auth-token-xyz"}));
    let store = VariableStore::in_memory();

    let outcome = run_handler(&login_blocks[0], &response, &store, DEFAULT_TIMEOUT);
    assert!(outcome.succeeded(), "{:?}", outcome.error);
    assert_eq!(outcome.asserts.len(), 1);
    assert!(outcome.asserts[0].passed);

    // The captured token is available for the next request's substitution
    assert_eq!(store.get("authToken").unwrap(), "secret-auth-token-xyz");
}

#[test]
fn test_handler_failure_is_isolated_from_siblings() {
    let file_content = r#"GET https://api.example.com/broken

> {%
    this is not valid javascript (((
%}

###

GET https://api.example.com/fine

> {%
    client.session.set("fine", "yes");
%}
"#;

    let definitions = parse_file_handlers(file_content);
    assert_eq!(definitions.len(), 2);

    let store = VariableStore::in_memory();
    let response = ResponseSnapshot::new(200);

    let broken = definitions[0].outcome.as_ref().unwrap();
    let outcome = run_handler(&broken[0], &response, &store, DEFAULT_TIMEOUT);
    assert_eq!(outcome.error_kind(), Some(ScriptErrorKind::Syntax));

    // The sibling definition's handler still runs against the same store
    let fine = definitions[1].outcome.as_ref().unwrap();
    let outcome = run_handler(&fine[0], &response, &store, DEFAULT_TIMEOUT);
    assert!(outcome.succeeded());
    assert_eq!(store.get("fine").unwrap(), "yes");
}

#[test]
fn test_marker_diagnostic_does_not_block_other_definitions() {
    let file_content = "GET https://a.dev\n\n> {%\n  client.session.set(\"x\", \"1\");\n\n###\n\nGET https://b.dev\n\n> {% client.session.set(\"y\", \"2\"); %}\n";

    let definitions = parse_file_handlers(file_content);
    assert_eq!(definitions.len(), 2);
    assert!(matches!(
        definitions[0].outcome,
        Err(HandlerParseError::MissingClosingMarker { .. })
    ));
    assert_eq!(definitions[1].outcome.as_ref().unwrap().len(), 1);
}

#[test]
fn test_concurrent_handler_executions_share_store() {
    let store = VariableStore::in_memory();

    let mut handles = Vec::new();
    for i in 0..4 {
        let store = store.clone();
        handles.push(std::thread::spawn(move || {
            let response = create_json_response(200, json!({"id": i}));
            let context = ScriptContext::new(response, store);
            let script = format!(
                "client.session.set(\"worker-{}\", String(response.json().id));",
                i
            );
            execute_script(&script, &context, DEFAULT_TIMEOUT)
        }));
    }

    for handle in handles {
        let outcome = handle.join().unwrap();
        assert!(outcome.succeeded(), "{:?}", outcome.error);
    }

    // Every execution's write landed; none corrupted another's
    for i in 0..4 {
        assert_eq!(store.get(&format!("worker-{}", i)).unwrap(), i.to_string());
    }
}

#[test]
fn test_timeout_does_not_poison_subsequent_executions() {
    let store = VariableStore::in_memory();
    let response = ResponseSnapshot::new(200);
    let context = ScriptContext::new(response, store.clone());

    let outcome = execute_script("while (true) {}", &context, Duration::from_millis(100));
    assert_eq!(outcome.error_kind(), Some(ScriptErrorKind::Timeout));

    let outcome = execute_script(
        "client.session.set(\"alive\", \"yes\");",
        &context,
        DEFAULT_TIMEOUT,
    );
    assert!(outcome.succeeded());
    assert_eq!(store.get("alive").unwrap(), "yes");
}

#[test]
fn test_captured_output_redaction_workflow() {
    // Run a handler, then redact everything the UI would display.
    let response = create_json_response(
        200,
        json!({"token": "secret-token-0123456789", "profile": {"name": "jane"}}),
    );
    let store = VariableStore::in_memory();
    let context = ScriptContext::new(response.clone(), store.clone());

    let outcome = execute_script(
        "client.session.set(\"token\", response.json().token);",
        &context,
        DEFAULT_TIMEOUT,
    );
    assert!(outcome.succeeded());

    let patterns = RedactionPatterns::new(["token", "authorization"]);

    // Response body shown to the user masks the token but keeps the rest
    let shown_body = redact_body(&response.body, &patterns);
    assert!(shown_body.contains("****"));
    assert!(!shown_body.contains("secret-token-0123456789"));
    assert!(shown_body.contains("jane"));

    // A request header echoing the captured value is masked too
    let headers = vec![(
        "Authorization".to_string(),
        format!("Bearer {}", store.get("token").unwrap()),
    )];
    let shown_headers = redact_headers(&headers, &patterns);
    assert_eq!(shown_headers[0].1, "Bearer secr****");

    // And so is the value appearing in a logged URL
    let url = format!("https://api.example.com/ws?token={}", store.get("token").unwrap());
    let shown_url = redact_url(&url, &patterns);
    assert_eq!(shown_url, "https://api.example.com/ws?token=****");

    // Redaction is presentational: the store still holds the real value
    assert_eq!(store.get("token").unwrap(), "secret-token-0123456789");
}

#[test]
fn test_session_and_persistent_tiers_from_script() {
    let store = VariableStore::in_memory();
    let response = create_json_response(200, json!({"token": "tk"}));
    let context = ScriptContext::new(response, store.clone());

    let script = r#"
        client.global.set("savedToken", response.json().token);
        client.session.set("savedToken", "session-shadow");
    "#;
    let outcome = execute_script(script, &context, DEFAULT_TIMEOUT);
    assert!(outcome.succeeded(), "{:?}", outcome.error);

    // Session shadows persistent until cleared
    assert_eq!(store.get("savedToken").unwrap(), "session-shadow");
    store.clear_session();
    assert_eq!(store.get("savedToken").unwrap(), "tk");
}

proptest! {
    // Any script text that contains neither delimiter survives extraction
    // byte-for-byte (modulo the outer trim).
    #[test]
    fn prop_extraction_preserves_script_text(
        script in "[a-zA-Z0-9 .;()\\[\\]'\"=+<>!&|\n]{0,200}"
    ) {
        prop_assume!(!script.contains("{%") && !script.contains("%}"));
        prop_assume!(!script.lines().any(|l| l.trim() == "###"));

        let text = format!("GET https://x.dev\n\n> {{%\n{}\n%}}\n", script);
        let blocks = parse_handler_blocks(&text).unwrap();
        prop_assert_eq!(blocks.len(), 1);
        prop_assert_eq!(blocks[0].script.as_str(), script.trim());
    }
}
