//! Panic and error guards for functions the host calls.
//!
//! Unwinding into the host is undefined behaviour, so every trampoline runs
//! its body through one of these helpers. Errors and panics are logged and
//! turned into the value the ABI uses for failure.

use std::panic::{catch_unwind, AssertUnwindSafe};

use aviutl_sys::{Bool, FALSE, TRUE};
use tracing::{error, warn};

use crate::error::PluginResult;

/// Extract a human-readable message from a panic payload.
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Run `f`, mapping `Ok(true)` to `TRUE` and errors or panics to `FALSE`.
pub fn guard_bool(op: &'static str, f: impl FnOnce() -> PluginResult<bool>) -> Bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(true)) => TRUE,
        Ok(Ok(false)) => FALSE,
        Ok(Err(e)) => {
            warn!(op, error = %e, "plugin callback failed");
            FALSE
        }
        Err(payload) => {
            error!(op, panic = %panic_message(payload), "panic in plugin callback");
            FALSE
        }
    }
}

/// Run `f`, returning `default` on error or panic.
pub fn guard_with_default<T>(op: &'static str, default: T, f: impl FnOnce() -> PluginResult<T>) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!(op, error = %e, "plugin callback failed");
            default
        }
        Err(payload) => {
            error!(op, panic = %panic_message(payload), "panic in plugin callback");
            default
        }
    }
}

/// Run `f` where the ABI has no way to report failure. Returns `false` when
/// `f` panicked.
pub fn guard_void(op: &'static str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!(op, panic = %panic_message(payload), "panic in plugin callback");
            false
        }
    }
}
