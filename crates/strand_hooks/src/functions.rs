//! Convenience registration helpers.
//!
//! [`on`] and [`off`] compose the [`Hook`] mediator for the common
//! register/unregister flows. They carry no state of their own; the
//! dispatcher is always an explicit argument.

use std::sync::Arc;

use serde_json::Value;

use crate::callback::Callback;
use crate::dispatch::{DEFAULT_PRIORITY, EventDispatcher};
use crate::error::Result;
use crate::hook::Hook;

/// The outcome of an [`off`] call.
#[derive(Debug)]
pub enum Removal {
    /// The target registration existed and was removed immediately.
    Removed,
    /// The target was not registered yet; a temporary sweeper hook is in
    /// place to remove it just before the handle fires.
    Deferred(Hook),
}

impl Removal {
    /// Whether the target was removed immediately.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        matches!(self, Removal::Removed)
    }
}

/// Creates a listening hook for a callback on a handle at the default
/// priority.
///
/// # Errors
///
/// Returns [`crate::Error::UnresolvableCallback`] if the callback's
/// parameter count cannot be determined.
pub fn on(
    dispatcher: &Arc<dyn EventDispatcher>,
    handle: &str,
    callback: Callback,
) -> Result<Hook> {
    on_with_priority(dispatcher, handle, callback, DEFAULT_PRIORITY)
}

/// Creates a listening hook for a callback on a handle at an explicit
/// priority.
///
/// # Errors
///
/// Same as [`on`].
pub fn on_with_priority(
    dispatcher: &Arc<dyn EventDispatcher>,
    handle: &str,
    callback: Callback,
    priority: i64,
) -> Result<Hook> {
    Ok(
        Hook::on_with_priority(Arc::clone(dispatcher), handle, priority)
            .set_callback(callback)?
            .listen(),
    )
}

/// Removes a callback's registration on a handle at the default priority,
/// now or in the future. See [`off_with_priority`].
///
/// # Errors
///
/// Same as [`off_with_priority`].
pub fn off(
    dispatcher: &Arc<dyn EventDispatcher>,
    handle: &str,
    callback: &Callback,
) -> Result<Removal> {
    off_with_priority(dispatcher, handle, callback, DEFAULT_PRIORITY)
}

/// Removes a callback's registration on a handle, now or in the future.
///
/// If the dispatcher reports nothing was removed — the target has not been
/// registered yet, e.g. it is registered by some later-executing code — a
/// temporary sweeper hook is installed at `priority - 1` on the same handle.
/// Its sole job is to retry the deregistration just before the target would
/// fire, passing its own input through unchanged.
///
/// # Known limitation
///
/// The sweeper assumes the eventual real registration uses the same priority
/// passed here; a target registered at a different priority will not be
/// found and removed. This is accepted, documented behavior — "fixing" it
/// would change observable semantics existing callers rely upon.
///
/// # Errors
///
/// Returns [`crate::Error::UnresolvableCallback`] only in the deferred path,
/// if the sweeper hook cannot be attached.
pub fn off_with_priority(
    dispatcher: &Arc<dyn EventDispatcher>,
    handle: &str,
    callback: &Callback,
    priority: i64,
) -> Result<Removal> {
    if dispatcher.deregister(handle, callback.token(), priority) {
        return Ok(Removal::Removed);
    }

    // Not set yet. Listen right before the target is expected to fire, so
    // that if it is there by then, it is unhooked just in time.
    let sweeper_dispatcher = Arc::clone(dispatcher);
    let sweeper_handle = handle.to_owned();
    let target = callback.token().clone();
    let sweeper = Callback::closure(1, move |_args| {
        sweeper_dispatcher.deregister(&sweeper_handle, &target, priority);
        Value::Null
    });

    tracing::debug!(handle, priority, "deferring removal to a sweeper hook");
    Ok(Removal::Deferred(
        on(dispatcher, handle, sweeper)?.with_priority(priority - 1),
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dispatch::{Listener, MemoryDispatcher};

    fn dispatcher() -> Arc<dyn EventDispatcher> {
        Arc::new(MemoryDispatcher::new())
    }

    #[test]
    fn on_returns_a_listening_hook() {
        let dispatcher = dispatcher();
        let hook = on(&dispatcher, "quick", Callback::closure(1, |args| args[0].clone())).unwrap();

        assert!(dispatcher.is_registered("quick"));
        assert_eq!(hook.priority(), DEFAULT_PRIORITY);
        assert_eq!(dispatcher.dispatch("quick", &[json!("yo")]).unwrap(), json!("yo"));
        assert_eq!(hook.iterations(), 1);
    }

    #[test]
    fn off_removes_an_existing_registration_immediately() {
        let dispatcher = dispatcher();
        let callback = Callback::closure(1, |args| args[0].clone());
        dispatcher.register("hook_one", Listener::from_callback(&callback), DEFAULT_PRIORITY, 1);

        let removal = off(&dispatcher, "hook_one", &callback).unwrap();

        assert!(removal.is_removed());
        assert!(!dispatcher.is_registered("hook_one"));
    }

    #[test]
    fn off_defers_removal_of_a_not_yet_present_registration() {
        let dispatcher = dispatcher();
        let boom = Callback::fallible(0, |_| {
            Err(crate::Error::Host {
                code: "boom".into(),
                message: "this should be removed or the test will fail".into(),
            })
        });

        let removal = off(&dispatcher, "hook_two", &boom).unwrap();
        let Removal::Deferred(sweeper) = removal else {
            panic!("expected a deferred removal");
        };
        assert_eq!(sweeper.priority(), DEFAULT_PRIORITY - 1);

        // Added waaaay later, sometime, we don't even know.
        dispatcher.register("hook_two", Listener::from_callback(&boom), DEFAULT_PRIORITY, 1);

        dispatcher.dispatch("hook_two", &[Value::Null]).unwrap();
    }

    #[test]
    fn deferred_removal_misses_a_target_at_a_different_priority() {
        // The documented limitation: the sweeper only looks at the priority
        // that was passed to `off`.
        let dispatcher = dispatcher();
        let callback = Callback::closure(1, |args| json!(format!("{}!", args[0].as_str().unwrap_or_default())));

        off(&dispatcher, "mismatched", &callback).unwrap();
        dispatcher.register("mismatched", Listener::from_callback(&callback), 42, 1);

        assert_eq!(
            dispatcher.dispatch("mismatched", &[json!("fired")]).unwrap(),
            json!("fired!"),
            "target at an unexpected priority still fires"
        );
    }
}
