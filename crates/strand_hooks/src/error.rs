//! Error taxonomy for the hook mediation layer.
//!
//! Every failure is a distinct, typed variant so callers can discriminate.
//! Nothing in this crate recovers from an error locally; all of them
//! propagate to the caller with `?`. The only non-error fallbacks anywhere
//! are the two deliberate mediator passthrough behaviors (iteration limit
//! reached and null return), which are documented on [`crate::hook::Hook`].

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced by callbacks, hooks, and the host boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The value handed to a callback constructor is not a recognized
    /// callable shape. Raised at construction, never deferred.
    #[error("invalid callable: {reason}")]
    InvalidCallable {
        /// Why the shape was rejected.
        reason: String,
    },

    /// A named callback could not be resolved through its registry.
    /// Raised at call time, not at construction.
    #[error("unresolvable callback `{target}`")]
    UnresolvableCallback {
        /// The normalized name that failed to resolve.
        target: String,
    },

    /// A callable with this name is already present in the registry.
    #[error("callable `{name}` is already registered")]
    DuplicateCallable {
        /// The colliding name.
        name: String,
    },

    /// A listening hook was dispatched before a callback was attached.
    #[error("hook on `{handle}` dispatched without a callback")]
    MissingCallback {
        /// The event handle the hook is listening on.
        handle: String,
    },

    /// A host operation signaled failure through an error-carrying return
    /// value; translated once at the boundary, never swallowed.
    #[error("host error [{code}]: {message}")]
    Host {
        /// The host's machine-readable error code.
        code: String,
        /// The host's human-readable error message.
        message: String,
    },
}
