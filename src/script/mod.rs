//! Sandboxed execution of handler scripts.
//!
//! Each execution builds a fresh QuickJS runtime and context, installs the
//! two capability globals (`response` and `client`), evaluates the script,
//! and tears everything down again. Scripts are untrusted: isolation comes
//! from the interpreter having no module loader and no host bindings beyond
//! the capability surface, and from a wall-clock deadline enforced at the
//! interpreter boundary through an interrupt handler — not from anything
//! the script cooperates with.
//!
//! The only shared mutable state across concurrent executions is the
//! [`VariableStore`] handle inside each [`ScriptContext`]; interpreter
//! state is never shared, so a failing script cannot corrupt the store or
//! block later executions.

pub mod client;
pub mod error;

pub use error::{AssertRecord, ExecutionOutcome, ScriptError, ScriptErrorKind};

use crate::handler::HandlerBlock;
use crate::models::ResponseSnapshot;
use crate::store::VariableStore;
use rquickjs::{CatchResultExt, CaughtError, Context, Runtime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default hard wall-clock bound for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Per-execution binding of a response snapshot and a store handle.
///
/// Ephemeral: constructed for one `execute_script` call and dropped with
/// it.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    /// Read-only snapshot of the just-received response.
    pub response: ResponseSnapshot,

    /// Store the script's variable writes are committed to.
    pub store: VariableStore,
}

impl ScriptContext {
    /// Creates a context for one execution.
    pub fn new(response: ResponseSnapshot, store: VariableStore) -> Self {
        Self { response, store }
    }
}

/// Executes one handler script against a response snapshot.
///
/// Empty or whitespace-only script text is a trivial success with no side
/// effects. Otherwise the script runs with access to exactly the
/// `response` and `client` globals; variable writes are committed to the
/// store during execution and remain observable afterward regardless of
/// how the execution ends.
///
/// # Arguments
///
/// * `script` - Script text extracted from a handler block
/// * `context` - Response snapshot and store handle for this execution
/// * `timeout` - Hard wall-clock bound; [`DEFAULT_TIMEOUT`] is the
///   conventional value
///
/// # Returns
///
/// An [`ExecutionOutcome`] carrying the failure kind and message if the
/// script could not be parsed (syntax), threw (runtime), exceeded the
/// deadline (timeout), or had a persistent write rejected (persistence).
///
/// # Examples
///
/// ```
/// use rest_hooks::models::ResponseSnapshot;
/// use rest_hooks::script::{execute_script, ScriptContext, DEFAULT_TIMEOUT};
/// use rest_hooks::store::VariableStore;
///
/// let mut response = ResponseSnapshot::new(200);
/// response.set_body(r#"{"token": "abc123"}"#);
///
/// let store = VariableStore::in_memory();
/// let context = ScriptContext::new(response, store.clone());
///
/// let outcome = execute_script(
///     "client.session.set(\"token\", response.json().token);",
///     &context,
///     DEFAULT_TIMEOUT,
/// );
/// assert!(outcome.succeeded());
/// assert_eq!(store.get("token").unwrap(), "abc123");
/// ```
pub fn execute_script(
    script: &str,
    context: &ScriptContext,
    timeout: Duration,
) -> ExecutionOutcome {
    if script.trim().is_empty() {
        return ExecutionOutcome::success();
    }

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            return ExecutionOutcome::failure(ScriptError::new(
                ScriptErrorKind::Runtime,
                err.to_string(),
            ))
        }
    };

    // Hard deadline: the handler is polled by the interpreter throughout
    // evaluation and forcibly interrupts it once the deadline passes, so a
    // script cannot outlast the bound by any waiting trick.
    let timed_out = Arc::new(AtomicBool::new(false));
    let deadline = Instant::now() + timeout;
    {
        let timed_out = timed_out.clone();
        runtime.set_interrupt_handler(Some(Box::new(move || {
            if Instant::now() >= deadline {
                timed_out.store(true, Ordering::SeqCst);
                true
            } else {
                false
            }
        })));
    }

    let ctx = match Context::full(&runtime) {
        Ok(ctx) => ctx,
        Err(err) => {
            return ExecutionOutcome::failure(ScriptError::new(
                ScriptErrorKind::Runtime,
                err.to_string(),
            ))
        }
    };

    let state = client::CapabilityState::new();

    let eval_error: Option<ScriptError> = ctx.with(|ctx| {
        if let Err(err) = client::install_capabilities(&ctx, &context.response, &context.store, &state)
        {
            return Some(ScriptError::new(ScriptErrorKind::Runtime, err.to_string()));
        }

        match ctx.eval::<(), _>(script).catch(&ctx) {
            Ok(()) => None,
            Err(caught) => Some(classify_caught(caught)),
        }
    });

    let asserts = state.asserts.borrow().clone();
    let persist_error = state.persist_error.borrow_mut().take();

    // Dropping the runtime below tears the interpreter down; nothing keeps
    // executing past this point.
    runtime.set_interrupt_handler(None);
    drop(ctx);
    drop(runtime);

    let error = if timed_out.load(Ordering::SeqCst) {
        Some(ScriptError::timeout())
    } else if eval_error.is_some() {
        eval_error
    } else {
        persist_error.map(|err| ScriptError::new(ScriptErrorKind::Persistence, err.to_string()))
    };

    ExecutionOutcome { error, asserts }
}

/// Runs a parsed handler block against a response.
///
/// Pipeline convenience over [`execute_script`] for callers holding a
/// [`HandlerBlock`] straight from the parser.
pub fn run_handler(
    block: &HandlerBlock,
    response: &ResponseSnapshot,
    store: &VariableStore,
    timeout: Duration,
) -> ExecutionOutcome {
    let context = ScriptContext::new(response.clone(), store.clone());
    execute_script(&block.script, &context, timeout)
}

/// Checks a script for syntax errors without executing it.
///
/// Intended for definition-load-time diagnostics, so a broken script can
/// be flagged before any request is sent; the result is distinct from the
/// parser's marker-format errors. The script is parsed as a function body
/// that is never invoked.
///
/// # Arguments
///
/// * `script` - Script text to check
///
/// # Returns
///
/// `Ok(())` if the script parses, or a Syntax-kind [`ScriptError`] with
/// the normalized engine message.
pub fn check_syntax(script: &str) -> Result<(), ScriptError> {
    if script.trim().is_empty() {
        return Ok(());
    }

    let map_engine_err =
        |err: rquickjs::Error| ScriptError::new(ScriptErrorKind::Runtime, err.to_string());
    let runtime = Runtime::new().map_err(map_engine_err)?;
    let ctx = Context::full(&runtime).map_err(map_engine_err)?;

    ctx.with(|ctx| {
        let literal = serde_json::to_string(script)
            .expect("a string always serializes to a JSON literal");
        let probe = format!("new Function({});", literal);

        match ctx.eval::<(), _>(probe.as_bytes().to_vec()).catch(&ctx) {
            Ok(()) => Ok(()),
            Err(caught) => Err(ScriptError::new(
                ScriptErrorKind::Syntax,
                caught_error_message(caught),
            )),
        }
    })
}

/// Maps a caught evaluation error to the failure taxonomy.
///
/// A `SyntaxError` thrown by the engine means the script never began
/// executing (the whole source is parsed before the first statement runs),
/// so it is reported as Syntax; everything else the script threw itself.
fn classify_caught(caught: CaughtError<'_>) -> ScriptError {
    let kind = match &caught {
        CaughtError::Exception(exception) => {
            let name: Option<String> = exception.get("name").ok();
            if name.as_deref() == Some("SyntaxError") {
                ScriptErrorKind::Syntax
            } else {
                ScriptErrorKind::Runtime
            }
        }
        _ => ScriptErrorKind::Runtime,
    };
    ScriptError::new(kind, caught_error_message(caught))
}

/// Extracts a human-readable message from a caught evaluation error.
fn caught_error_message(caught: CaughtError<'_>) -> String {
    match caught {
        CaughtError::Exception(exception) => exception
            .message()
            .unwrap_or_else(|| "uncaught exception".to_string()),
        CaughtError::Value(value) => value
            .as_string()
            .and_then(|s| s.to_string().ok())
            .unwrap_or_else(|| "uncaught value".to_string()),
        CaughtError::Error(err) => err.to_string(),
    }
}
