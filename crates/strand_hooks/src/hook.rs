//! The hook mediator.
//!
//! A [`Hook`] binds an event handle and priority to a [`Callback`] and sits
//! between the dispatcher and that callback, adding what plain registration
//! does not have:
//!
//! - **argument truncation** to the callback's declared parameter count
//!   (a count of 0 forwards the full untruncated list, for variadic
//!   callbacks with no fixed parameters);
//! - **iteration limits** ([`only_x_times`](Hook::only_x_times),
//!   [`once`](Hook::once), [`bypass`](Hook::bypass));
//! - **conditional gating** ([`only_if`](Hook::only_if),
//!   [`except_if`](Hook::except_if)).
//!
//! # Lifecycle
//!
//! `Unregistered → Listening → (Bypassed | Removed)`. A hook becomes
//! observable by the dispatcher only after [`listen`](Hook::listen);
//! [`remove`](Hook::remove) detaches it (idempotent-safe, and a removed
//! hook may listen again); [`bypass`](Hook::bypass) leaves it attached but
//! permanently inert. Removal and bypass take effect for future dispatch
//! cycles only.
//!
//! # Passthrough
//!
//! Two deliberate non-error fallbacks exist, both returning the first
//! dispatch argument (`given`) unchanged: when the iteration limit is
//! reached, and when the user callback returns null — so filter-registered
//! callbacks with no meaningful return do not nullify the filtered value.
//! Everything else fails loudly: errors from conditions or the callback
//! propagate to the dispatcher unmodified, with no retries.
//!
//! # Example
//!
//! ```ignore
//! use strand_hooks::prelude::*;
//!
//! let hook = Hook::on(dispatcher, "save_record")
//!     .set_callback(Callback::closure(1, |args| validate(&args[0])))?
//!     .only_if(Callback::closure(1, |args| json!(args[0].is_object())))
//!     .once()
//!     .listen();
//! ```

use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::callback::Callback;
use crate::dispatch::{DEFAULT_PRIORITY, EventDispatcher, Listener, ListenerToken, MAX_ACCEPTED_ARGS};
use crate::error::{Error, Result};

struct State {
    callback: Option<Callback>,
    /// Cached declared parameter count of the callback, captured when the
    /// callback is attached.
    param_count: usize,
    priority: i64,
    conditions: Vec<Callback>,
    iterations: u64,
    max_iterations: Option<u64>,
}

impl State {
    fn limit_reached(&self) -> bool {
        self.max_iterations
            .is_some_and(|limit| self.iterations >= limit)
    }
}

struct HookInner {
    handle: String,
    dispatcher: Arc<dyn EventDispatcher>,
    /// Identity the dispatch entrypoint is registered under; stable for the
    /// hook's lifetime so removal matches registration.
    token: ListenerToken,
    state: Mutex<State>,
}

impl HookInner {
    /// The dispatch entrypoint. Invoked by the dispatcher with whatever
    /// positional arguments the event carries; the first is `given`, the
    /// value being filtered.
    fn mediate(&self, arguments: &[Value]) -> Result<Value> {
        let given = arguments.first().cloned().unwrap_or(Value::Null);

        let (callback, param_count, conditions) = {
            let state = self.state.lock();
            if state.limit_reached() {
                tracing::trace!(handle = %self.handle, "iteration limit reached, passing through");
                return Ok(given);
            }
            let Some(callback) = state.callback.clone() else {
                return Err(Error::MissingCallback {
                    handle: self.handle.clone(),
                });
            };
            (callback, state.param_count, state.conditions.clone())
        };

        // Conditions see the full argument list, in registration order.
        // Only a result of exactly `false` gates; other falsy values do not.
        for condition in &conditions {
            if condition.call_array(arguments)? == Value::Bool(false) {
                tracing::trace!(handle = %self.handle, "condition gated invocation, passing through");
                return Ok(given);
            }
        }

        let forwarded = if param_count == 0 {
            arguments
        } else {
            &arguments[..arguments.len().min(param_count)]
        };
        let result = callback.call_array(forwarded)?;
        self.state.lock().iterations += 1;

        // A null return means the callback is really an action; hand the
        // filtered value back untouched.
        if result.is_null() { Ok(given) } else { Ok(result) }
    }
}

/// A mediated event registration.
///
/// `Hook` is a cheap cloneable handle over shared state; every fluent method
/// returns such a handle, so a hook can be configured in a chain and still
/// be adjusted later (`hook.bypass()`) through any retained clone.
#[derive(Clone)]
pub struct Hook {
    inner: Arc<HookInner>,
}

impl Hook {
    /// Creates an unregistered hook on a handle at the default priority.
    #[must_use]
    pub fn on(dispatcher: Arc<dyn EventDispatcher>, handle: impl Into<String>) -> Self {
        Self::on_with_priority(dispatcher, handle, DEFAULT_PRIORITY)
    }

    /// Creates an unregistered hook on a handle at an explicit priority.
    #[must_use]
    pub fn on_with_priority(
        dispatcher: Arc<dyn EventDispatcher>,
        handle: impl Into<String>,
        priority: i64,
    ) -> Self {
        Self {
            inner: Arc::new(HookInner {
                handle: handle.into(),
                dispatcher,
                token: ListenerToken::unique(),
                state: Mutex::new(State {
                    callback: None,
                    param_count: 0,
                    priority,
                    conditions: Vec::new(),
                    iterations: 0,
                    max_iterations: None,
                }),
            }),
        }
    }

    /// Returns the event handle this hook is bound to.
    #[must_use]
    pub fn handle(&self) -> &str {
        &self.inner.handle
    }

    /// Returns the current priority.
    #[must_use]
    pub fn priority(&self) -> i64 {
        self.inner.state.lock().priority
    }

    /// Returns how many times the user callback has been invoked.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.inner.state.lock().iterations
    }

    /// Attaches the callback to be invoked, eagerly caching its declared
    /// parameter count for argument truncation at dispatch time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvableCallback`] if the callback's parameter
    /// count cannot be determined (a named callable absent from its
    /// registry).
    pub fn set_callback(&self, callback: Callback) -> Result<Hook> {
        let param_count = callback.parameter_count()?;
        let mut state = self.inner.state.lock();
        state.param_count = param_count;
        state.callback = Some(callback);
        drop(state);
        Ok(self.clone())
    }

    /// Registers the dispatch entrypoint with the dispatcher at the current
    /// priority, requesting [`MAX_ACCEPTED_ARGS`] so the mediator sees every
    /// event argument.
    ///
    /// Listening twice at the same priority replaces the registration in
    /// place rather than duplicating it.
    pub fn listen(&self) -> Hook {
        let priority = self.priority();
        let inner = Arc::clone(&self.inner);
        let listener = Listener::new(self.inner.token.clone(), move |arguments| {
            inner.mediate(arguments)
        });
        self.inner
            .dispatcher
            .register(&self.inner.handle, listener, priority, MAX_ACCEPTED_ARGS);
        tracing::debug!(handle = %self.inner.handle, priority, "hook listening");
        self.clone()
    }

    /// Deregisters the dispatch entrypoint, using the *current* priority so
    /// removal matches registration even after a priority change.
    /// Idempotent-safe: removing an unregistered hook is not an error.
    pub fn remove(&self) -> Hook {
        let priority = self.priority();
        self.inner
            .dispatcher
            .deregister(&self.inner.handle, &self.inner.token, priority);
        tracing::debug!(handle = %self.inner.handle, priority, "hook removed");
        self.clone()
    }

    /// Moves the hook to a new priority by removing and re-registering;
    /// atomic from the caller's perspective. Callback, conditions, and
    /// iteration state are untouched.
    pub fn with_priority(&self, priority: i64) -> Hook {
        self.remove();
        self.inner.state.lock().priority = priority;
        self.listen()
    }

    /// Caps the number of times the user callback may be invoked.
    ///
    /// Once the iteration count reaches the cap, every later dispatch cycle
    /// passes its first argument through unchanged and the count stays
    /// frozen; the registration itself stays attached.
    pub fn only_x_times(&self, times: u64) -> Hook {
        self.inner.state.lock().max_iterations = Some(times);
        self.clone()
    }

    /// Allows the callback to be invoked a single time.
    pub fn once(&self) -> Hook {
        self.only_x_times(1)
    }

    /// Makes the hook immediately and permanently inert without
    /// deregistering it.
    pub fn bypass(&self) -> Hook {
        tracing::debug!(handle = %self.inner.handle, "hook bypassed");
        self.only_x_times(0)
    }

    /// Adds a condition gating invocation of the callback.
    ///
    /// Conditions are evaluated against the full dispatch argument list, in
    /// the order they were added; the first one returning exactly `false`
    /// skips the callback for that cycle (no invocation, no count
    /// increment) and passes the first argument through.
    pub fn only_if(&self, condition: Callback) -> Hook {
        self.inner.state.lock().conditions.push(condition);
        self.clone()
    }

    /// Adds a negated condition: the callback is skipped when the condition
    /// returns a truthy value.
    pub fn except_if(&self, condition: Callback) -> Hook {
        self.only_if(condition.negated())
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Hook")
            .field("handle", &self.inner.handle)
            .field("priority", &state.priority)
            .field("iterations", &state.iterations)
            .field("max_iterations", &state.max_iterations)
            .finish()
    }
}
