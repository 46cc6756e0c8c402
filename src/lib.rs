//! Post-response handler scripts for HTTP request files
//!
//! This crate runs the `> {% ... %}` handler blocks embedded in `.http` /
//! `.rest` request files after a response arrives, letting users capture
//! values (auth tokens, entity ids), assert on responses, and feed captured
//! variables into later requests.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - **models**: The response snapshot handler scripts run against
//! - **handler**: Parses handler blocks out of request-file text
//! - **script**: Sandboxed script execution with a hard timeout, plus the
//!   `response`/`client` capability surface
//! - **store**: Layered session + persistent variable storage, with an
//!   env-file durable backend
//! - **redact**: Masks sensitive material in headers, JSON bodies, and URLs
//!   before output is displayed or logged
//!
//! # Pipeline
//!
//! A typical post-response flow:
//! 1. Extract the handler block(s) for the executed request definition
//!    with [`handler::parse_handler_blocks`] or
//!    [`handler::parse_file_handlers`]
//! 2. Snapshot the response into a [`models::ResponseSnapshot`]
//! 3. Execute each block with [`script::execute_script`] (or the
//!    [`script::run_handler`] convenience) against a shared
//!    [`store::VariableStore`]
//! 4. Redact the response with [`redact`] before displaying or logging it
//!
//! Handler failures are isolated: a script that throws, times out, or has a
//! persistent write rejected reports a categorized
//! [`script::ScriptError`] without affecting the store's committed writes
//! or any later execution.
//!
//! # Usage
//!
//! ```
//! use rest_hooks::handler::parse_handler_blocks;
//! use rest_hooks::models::ResponseSnapshot;
//! use rest_hooks::script::{run_handler, DEFAULT_TIMEOUT};
//! use rest_hooks::store::VariableStore;
//!
//! let definition = r#"POST https://api.example.com/auth/login
//!
//! > {%
//!     client.session.set("token", response.json().token);
//! %}
//! "#;
//!
//! let blocks = parse_handler_blocks(definition).unwrap();
//!
//! let mut response = ResponseSnapshot::new(200);
//! response.set_body(r#"{"token": "abc123"}"#);
//!
//! let store = VariableStore::in_memory();
//! let outcome = run_handler(&blocks[0], &response, &store, DEFAULT_TIMEOUT);
//!
//! assert!(outcome.succeeded());
//! assert_eq!(store.get("token").unwrap(), "abc123");
//! ```

pub mod handler;
pub mod models;
pub mod redact;
pub mod script;
pub mod store;

pub use handler::{parse_file_handlers, parse_handler_blocks, HandlerBlock, HandlerParseError};
pub use models::ResponseSnapshot;
pub use redact::RedactionPatterns;
pub use script::{
    execute_script, run_handler, ExecutionOutcome, ScriptContext, ScriptError, ScriptErrorKind,
    DEFAULT_TIMEOUT,
};
pub use store::{StoreError, VariableStore};
