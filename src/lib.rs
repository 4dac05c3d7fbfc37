//! A fluent event hook mediation layer for Rust.
//!

pub use strand_hooks::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use strand_hooks::prelude::*;
}
