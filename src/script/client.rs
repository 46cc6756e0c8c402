//! Capability surface exposed to handler scripts.
//!
//! A running script can reach exactly two global names:
//!
//! - `response` — read-only accessors over the response snapshot;
//! - `client` — variable-store operations and assert recording.
//!
//! Everything else a script might reach for (module loading, process
//! control, host state) simply does not exist in the interpreter context,
//! so referencing it fails as an ordinary undefined reference. The absence
//! of a capability is the defense; nothing here special-cases "forbidden"
//! names.

use crate::models::ResponseSnapshot;
use crate::store::{StoreError, VariableStore};
use rquickjs::convert::Coerced;
use rquickjs::function::Func;
use rquickjs::{Ctx, Function, Object, Value};
use std::cell::RefCell;
use std::rc::Rc;

use super::error::AssertRecord;

/// Side channels written by capability calls during one execution.
///
/// Shared between the installed JS functions and the engine, which reads
/// them back once evaluation finishes.
pub(crate) struct CapabilityState {
    /// Assert results in call order.
    pub asserts: Rc<RefCell<Vec<AssertRecord>>>,

    /// First rejected persistent write, if any. Later rejections keep the
    /// first error; the whole execution fails either way.
    pub persist_error: Rc<RefCell<Option<StoreError>>>,
}

impl CapabilityState {
    pub fn new() -> Self {
        Self {
            asserts: Rc::new(RefCell::new(Vec::new())),
            persist_error: Rc::new(RefCell::new(None)),
        }
    }
}

/// Installs the `response` and `client` globals into a fresh context.
///
/// Bound to one response snapshot and one store handle; constructed per
/// execution and torn down with the interpreter.
pub(crate) fn install_capabilities<'js>(
    ctx: &Ctx<'js>,
    response: &ResponseSnapshot,
    store: &VariableStore,
    state: &CapabilityState,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    // response accessor
    let response_obj = Object::new(ctx.clone())?;
    response_obj.set("status", i32::from(response.status))?;

    let headers = response.headers.clone();
    response_obj.set(
        "header",
        Func::from(move |name: Coerced<String>| -> Option<String> {
            // Exact, case-sensitive lookup; absent headers are null, never
            // an error.
            headers
                .iter()
                .find(|(k, _)| *k == name.0)
                .map(|(_, v)| v.clone())
        }),
    )?;

    let body = response.body.clone();
    response_obj.set("text", Func::from(move || body.clone()))?;

    let body = response.body.clone();
    response_obj.set(
        "json",
        Func::from(move |ctx: Ctx<'js>| {
            // An unparseable body throws inside the script, surfacing as a
            // runtime-kind failure.
            ctx.json_parse(body.clone())
        }),
    )?;

    globals.set("response", response_obj)?;

    // client capability object
    let client_obj = Object::new(ctx.clone())?;

    let session_obj = Object::new(ctx.clone())?;
    {
        let store = store.clone();
        session_obj.set(
            "set",
            Func::from(move |name: Coerced<String>, value: Coerced<String>| {
                store.set_session(&name.0, &value.0);
            }),
        )?;
    }
    {
        let store = store.clone();
        session_obj.set(
            "get",
            Func::from(move |name: Coerced<String>| -> Option<String> {
                store.get_session(&name.0)
            }),
        )?;
    }
    {
        let store = store.clone();
        session_obj.set("clear", Func::from(move || store.clear_session()))?;
    }
    client_obj.set("session", session_obj)?;

    let global_obj = Object::new(ctx.clone())?;
    {
        let store = store.clone();
        let persist_error = state.persist_error.clone();
        global_obj.set(
            "set",
            Func::from(move |name: Coerced<String>, value: Coerced<String>| {
                if let Err(err) = store.set_persistent(&name.0, &value.0) {
                    let mut slot = persist_error.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                }
            }),
        )?;
    }
    {
        let store = store.clone();
        global_obj.set(
            "get",
            Func::from(move |name: Coerced<String>| -> Option<String> {
                store.get_persistent(&name.0)
            }),
        )?;
    }
    client_obj.set("global", global_obj)?;

    {
        let asserts = state.asserts.clone();
        client_obj.set(
            "assert",
            Func::from(
                move |ctx: Ctx<'_>, name: Coerced<String>, predicate: Function<'_>| {
                    // A throwing predicate records a failure; the script
                    // itself keeps running.
                    let record = match predicate.call::<_, Value>(()) {
                        Ok(value) => AssertRecord {
                            name: name.0,
                            passed: is_truthy(&value),
                            message: None,
                        },
                        Err(_) => AssertRecord {
                            name: name.0,
                            passed: false,
                            message: Some(caught_message(&ctx)),
                        },
                    };
                    asserts.borrow_mut().push(record);
                },
            ),
        )?;
    }
    globals.set("client", client_obj)?;

    Ok(())
}

/// JavaScript truthiness for an assert predicate's return value.
fn is_truthy(value: &Value<'_>) -> bool {
    if value.is_undefined() || value.is_null() {
        return false;
    }
    if let Some(b) = value.as_bool() {
        return b;
    }
    if let Some(i) = value.as_int() {
        return i != 0;
    }
    if let Some(f) = value.as_float() {
        return f != 0.0 && !f.is_nan();
    }
    if let Some(s) = value.as_string() {
        return !s.to_string().unwrap_or_default().is_empty();
    }
    // Objects, arrays, and functions are truthy
    true
}

/// Extracts a message from the context's pending exception.
fn caught_message(ctx: &Ctx<'_>) -> String {
    let caught = ctx.catch();
    if let Some(obj) = caught.as_object() {
        if let Ok(message) = obj.get::<_, String>("message") {
            return message;
        }
    }
    if let Some(s) = caught.as_string().and_then(|s| s.to_string().ok()) {
        return s;
    }
    "assertion predicate threw".to_string()
}
