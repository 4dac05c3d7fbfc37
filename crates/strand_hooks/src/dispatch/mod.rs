//! The host dispatcher boundary.
//!
//! Everything in this crate sits on top of an external event dispatch
//! collaborator, injected as an [`EventDispatcher`] trait object. The
//! mediator only ever *registers with* and *deregisters from* a dispatcher;
//! it never initiates dispatch itself — [`EventDispatcher::dispatch`] is
//! driven by the host during its own request-handling cycle.
//!
//! # Identity
//!
//! Dispatchers match registrations by [`ListenerToken`], the analogue of the
//! host's callable-identity matching: callbacks built from the same
//! normalized name share a token, closures match only by instance.
//!
//! # Ordering
//!
//! Ordering between registrations on the same handle is entirely the
//! dispatcher's: ascending priority, registration order within a priority.
//! This crate declares priorities but never alters the ordering beyond that.
//!
//! [`memory::MemoryDispatcher`] is the in-process reference implementation
//! used by the test suites and by embedders without a host process.

use core::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::callback::Callback;
use crate::error::Result;

pub mod memory;

pub use memory::MemoryDispatcher;

/// The maximum argument count a hook requests at registration time.
///
/// Hooks always register for this many arguments so the mediator sees every
/// event argument, even though only a subset is forwarded to the user
/// callback.
pub const MAX_ACCEPTED_ARGS: usize = 100;

/// The default priority for new registrations.
pub const DEFAULT_PRIORITY: i64 = 10;

/// Identity a dispatcher matches registrations by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenerToken {
    /// A normalized callable name; equal for every callback built from the
    /// same name.
    Name(String),
    /// A per-instance identity for closures and hook entrypoints.
    Unique(String),
}

impl ListenerToken {
    /// Mints a fresh per-instance token.
    #[must_use]
    pub fn unique() -> Self {
        Self::Unique(nanoid::nanoid!())
    }
}

impl fmt::Display for ListenerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerToken::Name(name) => write!(f, "{name}"),
            ListenerToken::Unique(id) => write!(f, "closure:{id}"),
        }
    }
}

pub(crate) type ListenerFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A type-erased entrypoint a dispatcher invokes during dispatch.
#[derive(Clone)]
pub struct Listener {
    token: ListenerToken,
    invoke: ListenerFn,
}

impl Listener {
    /// Wraps an entrypoint function under an identity token.
    pub fn new<F>(token: ListenerToken, invoke: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            token,
            invoke: Arc::new(invoke),
        }
    }

    /// Builds a listener that invokes a callback directly, without any
    /// mediation (no truncation, no iteration limits, no conditions).
    ///
    /// This is how plain host-level registrations are expressed; wrap the
    /// callback in a [`crate::hook::Hook`] instead when mediation is wanted.
    #[must_use]
    pub fn from_callback(callback: &Callback) -> Self {
        let token = callback.token().clone();
        let callback = callback.clone();
        Self::new(token, move |args| callback.call_array(args))
    }

    /// Returns the identity token.
    #[must_use]
    pub fn token(&self) -> &ListenerToken {
        &self.token
    }

    /// Invokes the entrypoint with the given positional arguments.
    ///
    /// # Errors
    ///
    /// Propagates whatever error the entrypoint raises.
    pub fn invoke(&self, arguments: &[Value]) -> Result<Value> {
        (self.invoke)(arguments)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("token", &self.token)
            .finish()
    }
}

/// The minimal host event-dispatch surface this crate consumes.
///
/// Implementations are expected to provide host-compatible semantics:
/// listeners fire in ascending priority order, registration order within a
/// priority; each listener receives the current value being filtered as its
/// first argument and its return value becomes the value for the next
/// listener; re-registering an existing (token, priority) on a handle
/// replaces the registration in place rather than duplicating it.
pub trait EventDispatcher: Send + Sync {
    /// Registers a listener on a handle at a priority, accepting at most
    /// `accepted_args` positional arguments per dispatch.
    fn register(&self, handle: &str, listener: Listener, priority: i64, accepted_args: usize);

    /// Deregisters the listener matching (token, priority) on a handle.
    ///
    /// Returns `true` if something was actually removed. Removing a
    /// registration that does not exist is not an error at this layer.
    fn deregister(&self, handle: &str, token: &ListenerToken, priority: i64) -> bool;

    /// Checks whether any listener is registered on a handle.
    fn is_registered(&self, handle: &str) -> bool;

    /// Drives all listeners on a handle with the given positional arguments,
    /// threading the first argument through listener return values, and
    /// returns the final value.
    ///
    /// # Errors
    ///
    /// Propagates the first error any listener raises, unmodified.
    fn dispatch(&self, handle: &str, arguments: &[Value]) -> Result<Value>;
}
