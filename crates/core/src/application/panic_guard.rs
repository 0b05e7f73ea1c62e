// Panic isolation for caller-supplied monitor callbacks
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Result of a panic-guarded call
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Call completed normally
    Success(T),
    /// Call panicked
    Panicked(String),
}

/// Run a closure with panic isolation
///
/// A panic in a status predicate or terminal callback must not leave a
/// monitor half-removed, so the registry runs them through this guard.
///
/// # Example
/// ```text
/// match execute_guarded(|| probe.is_terminal(&status)) {
///     PanicGuardResult::Success(done) => done,
///     PanicGuardResult::Panicked(msg) => { /* drop the monitor */ }
/// }
/// ```
pub fn execute_guarded<F, T>(f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info.as_ref());
            error!(panic_msg = %panic_msg, "Monitor callback panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

/// Extract the message carried by a panic payload
pub fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
