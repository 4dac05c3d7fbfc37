//! Named-callable registry.
//!
//! The registry is the explicit, injectable stand-in for a host language's
//! global function table: callbacks built from a name (`"init_widgets"`,
//! `"Widget::render"`) resolve through it lazily at call time, so a name
//! can be registered after the callbacks referring to it were constructed.
//!
//! Each entry records the callable together with its declared arity, which
//! is what [`crate::callback::Callback::parameter_count`] reports for named
//! callbacks.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::callback::CallableFn;
use crate::error::{Error, Result};

#[derive(Clone)]
struct Entry {
    arity: usize,
    func: CallableFn,
}

/// A name-keyed table of callables with declared arities.
///
/// Uses interior mutability so the same `Arc<CallableRegistry>` can be
/// shared between callback construction sites and registration sites.
#[derive(Default)]
pub struct CallableRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl CallableRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a callable under a name.
    ///
    /// Method-style callables use their normalized `"Type::method"` key.
    /// An `arity` of 0 marks a variadic callable with no fixed parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCallable`] for an empty name and
    /// [`Error::DuplicateCallable`] if the name is already taken.
    pub fn insert<F>(&self, name: &str, arity: usize, func: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.insert_fallible(name, arity, move |args| Ok(func(args)))
    }

    /// Registers a callable that can fail.
    ///
    /// # Errors
    ///
    /// Same as [`CallableRegistry::insert`].
    pub fn insert_fallible<F>(&self, name: &str, arity: usize, func: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(Error::InvalidCallable {
                reason: "empty callable name".into(),
            });
        }

        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            return Err(Error::DuplicateCallable { name: name.to_owned() });
        }
        entries.insert(name.to_owned(), Entry {
            arity,
            func: Arc::new(func),
        });
        Ok(())
    }

    /// Checks whether a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Returns the declared arity of a registered callable.
    pub(crate) fn arity_of(&self, name: &str) -> Option<usize> {
        self.entries.read().get(name).map(|entry| entry.arity)
    }

    /// Returns the callable registered under a name.
    pub(crate) fn resolve(&self, name: &str) -> Option<CallableFn> {
        self.entries.read().get(name).map(|entry| Arc::clone(&entry.func))
    }
}
