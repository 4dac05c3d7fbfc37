//! Error translation at the host boundary.
//!
//! Some host operations signal failure through an error-carrying return
//! value rather than by failing outright. [`translate`] turns such an
//! outcome into a typed [`Error::Host`] carrying the host's code and
//! message — a pure translation with no retry or recovery; the call site
//! decides what to do.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// An error-carrying value returned by a host operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// The host's machine-readable error code.
    pub code: String,
    /// The host's human-readable error message.
    pub message: String,
    /// Arbitrary extra data the host attached, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The raw outcome of a host operation: a value, or an error payload.
pub type Outcome = core::result::Result<Value, ErrorPayload>;

impl From<ErrorPayload> for Error {
    fn from(payload: ErrorPayload) -> Self {
        Error::Host {
            code: payload.code,
            message: payload.message,
        }
    }
}

/// Translates a host outcome, turning an error-carrying value into a typed
/// [`Error::Host`].
///
/// # Errors
///
/// Returns [`Error::Host`] with the payload's code and message copied
/// verbatim.
pub fn translate(outcome: Outcome) -> Result<Value> {
    outcome.map_err(Error::from)
}
