//! Event hook mediation primitives for Strand.
//!
//! `strand_hooks` is a fluent layer between a host event dispatcher and
//! user-supplied callbacks. The host drives everything: the mediator only
//! runs synchronously when the dispatcher invokes its registered
//! entrypoint, and every real dispatch decision — ordering, value
//! threading — stays with the dispatcher behind the [`EventDispatcher`]
//! trait. What the mediator adds on top is argument truncation to the
//! callback's declared arity, iteration limits, and conditional gating.
//!
//! # Core Concepts
//!
//! - [`Callback`] - one normalized calling convention over closures and
//!   registry-resolved names
//! - [`CallableRegistry`] - the explicit, injectable table named callables
//!   resolve through
//! - [`Hook`] - the mediator binding a handle and priority to a callback
//! - [`EventDispatcher`] - the injected host dispatch boundary, with
//!   [`MemoryDispatcher`] as the in-process reference implementation
//! - [`on`]/[`off`] - one-line register/unregister compositions
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use strand_hooks::prelude::*;
//!
//! let dispatcher: Arc<dyn EventDispatcher> = Arc::new(MemoryDispatcher::new());
//!
//! on(&dispatcher, "record_title", Callback::closure(1, |args| {
//!     json!(args[0].as_str().unwrap_or_default().to_uppercase())
//! }))?;
//!
//! let title = dispatcher.dispatch("record_title", &[json!("howdy")])?;
//! assert_eq!(title, json!("HOWDY"));
//! ```
//!
//! # Concurrency
//!
//! The model is single-threaded and cooperative: invocations complete
//! synchronously before control returns to the dispatcher, and removal or
//! bypass take effect for future cycles only. Shared state is still
//! `Send + Sync` so handles and dispatchers can be passed freely.

/// Callable normalization.
pub mod callback;

/// The host dispatcher boundary.
pub mod dispatch;

/// Error taxonomy.
pub mod error;

/// Convenience registration helpers.
pub mod functions;

/// The hook mediator.
pub mod hook;

/// Error translation at the host boundary.
pub mod host;

/// Named-callable registry.
pub mod registry;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::callback::{Callback, Target, is_truthy};
    pub use crate::dispatch::{
        DEFAULT_PRIORITY, EventDispatcher, Listener, ListenerToken, MAX_ACCEPTED_ARGS,
        MemoryDispatcher,
    };
    pub use crate::error::{Error, Result};
    pub use crate::functions::{Removal, off, off_with_priority, on, on_with_priority};
    pub use crate::hook::Hook;
    pub use crate::host::{ErrorPayload, translate};
    pub use crate::registry::CallableRegistry;
}

// Re-export key types at crate root for convenience
pub use callback::{Callback, Target};
pub use dispatch::{EventDispatcher, MemoryDispatcher};
pub use error::{Error, Result};
pub use functions::{Removal, off, on};
pub use hook::Hook;
pub use registry::CallableRegistry;
