//! Callable normalization.
//!
//! A [`Callback`] presents one uniform calling convention regardless of the
//! syntax the caller supplied:
//!
//! - a closure plus its declared arity,
//! - a plain function name resolved through a [`CallableRegistry`],
//! - a `"Type::method"` string, split into a (type, method) pair at the
//!   first `::` occurrence,
//! - an explicit (type, method) pair.
//!
//! Rust cannot reflect the arity of an opaque closure, so closures declare
//! their arity explicitly at construction; named callables carry their arity
//! in the registry entry. Either way the mediator reads one number through
//! [`Callback::parameter_count`].
//!
//! Shape validation is eager: a malformed spec fails construction with
//! [`Error::InvalidCallable`]. Resolution is lazy: a well-formed name that
//! the registry cannot resolve fails at call time with
//! [`Error::UnresolvableCallback`], which lets a callable be registered
//! after the callbacks referring to it are built.

use core::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::ListenerToken;
use crate::error::{Error, Result};
use crate::registry::CallableRegistry;

/// Type-erased callable shared between callbacks and registry entries.
pub(crate) type CallableFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// The normalized shape of a wrapped callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A free function, resolved by name.
    Function(String),
    /// A type-associated method, resolved by `"Type::method"` key.
    Method {
        /// The type half of the pair.
        type_name: String,
        /// The method half of the pair.
        method: String,
    },
    /// A bound closure; opaque, matched only by instance identity.
    Closure,
}

enum Kind {
    Closure { arity: usize, func: CallableFn },
    Named { key: String, registry: Arc<CallableRegistry> },
}

struct Inner {
    target: Target,
    kind: Kind,
    token: ListenerToken,
    negated: bool,
}

/// A normalized, invocable callback.
///
/// Cheap to clone; clones share the underlying callable and identity token,
/// so a clone registered with a dispatcher can later be deregistered through
/// any other clone of the same `Callback`.
#[derive(Clone)]
pub struct Callback {
    inner: Arc<Inner>,
}

impl Callback {
    /// Wraps a closure with its declared parameter count.
    ///
    /// An `arity` of 0 marks a variadic callback with no fixed parameters;
    /// the mediator forwards the full argument list to such callbacks
    /// instead of truncating to nothing.
    pub fn closure<F>(arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::fallible(arity, move |args| Ok(func(args)))
    }

    /// Wraps a closure that can fail. Errors propagate to the dispatcher
    /// unmodified; the mediator never catches them.
    pub fn fallible<F>(arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::from_parts(Target::Closure, Kind::Closure {
            arity,
            func: Arc::new(func),
        })
    }

    /// Normalizes a callable spec string against a registry.
    ///
    /// A spec containing `::` is split into a (type, method) pair at the
    /// first occurrence; any other non-empty spec is a plain function name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCallable`] for an empty spec, an empty half
    /// of a `Type::method` pair, or embedded whitespace. Whether the name
    /// actually resolves is not checked here; see [`Callback::call_array`].
    pub fn parse(spec: &str, registry: &Arc<CallableRegistry>) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(Error::InvalidCallable {
                reason: "empty callable spec".into(),
            });
        }
        if spec.contains(char::is_whitespace) {
            return Err(Error::InvalidCallable {
                reason: format!("callable spec `{spec}` contains whitespace"),
            });
        }
        match spec.split_once("::") {
            Some((type_name, method)) => Self::method(type_name, method, registry),
            None => Ok(Self::from_parts(
                Target::Function(spec.to_owned()),
                Kind::Named {
                    key: spec.to_owned(),
                    registry: Arc::clone(registry),
                },
            )),
        }
    }

    /// Builds a callback from an explicit (type, method) pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCallable`] if either half is empty.
    pub fn method(type_name: &str, method: &str, registry: &Arc<CallableRegistry>) -> Result<Self> {
        if type_name.is_empty() || method.is_empty() {
            return Err(Error::InvalidCallable {
                reason: format!("incomplete method pair `{type_name}::{method}`"),
            });
        }
        Ok(Self::from_parts(
            Target::Method {
                type_name: type_name.to_owned(),
                method: method.to_owned(),
            },
            Kind::Named {
                key: format!("{type_name}::{method}"),
                registry: Arc::clone(registry),
            },
        ))
    }

    fn from_parts(target: Target, kind: Kind) -> Self {
        let token = match &kind {
            Kind::Closure { .. } => ListenerToken::unique(),
            Kind::Named { key, .. } => ListenerToken::Name(key.clone()),
        };
        Self {
            inner: Arc::new(Inner {
                target,
                kind,
                token,
                negated: false,
            }),
        }
    }

    /// Returns the normalized callable shape.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// Returns the identity token dispatchers match registrations by.
    ///
    /// Named callables share a token with every callback built from the same
    /// normalized name; closures match only their own clones.
    #[must_use]
    pub fn token(&self) -> &ListenerToken {
        &self.inner.token
    }

    /// Returns a callback that truthiness-negates this one's result.
    ///
    /// The negation invokes the wrapped callable and returns the boolean
    /// opposite of its result's truthiness (see [`is_truthy`]). Negating
    /// twice restores the original behavior.
    #[must_use]
    pub fn negated(&self) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(Inner {
                target: inner.target.clone(),
                kind: match &inner.kind {
                    Kind::Closure { arity, func } => Kind::Closure {
                        arity: *arity,
                        func: Arc::clone(func),
                    },
                    Kind::Named { key, registry } => Kind::Named {
                        key: key.clone(),
                        registry: Arc::clone(registry),
                    },
                },
                token: inner.token.clone(),
                negated: !inner.negated,
            }),
        }
    }

    /// Returns the number of formal parameters the callable declares.
    ///
    /// Closures report the arity declared at construction; named callables
    /// report the arity recorded in their registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvableCallback`] for a named callable absent
    /// from its registry.
    pub fn parameter_count(&self) -> Result<usize> {
        match &self.inner.kind {
            Kind::Closure { arity, .. } => Ok(*arity),
            Kind::Named { key, registry } => {
                registry
                    .arity_of(key)
                    .ok_or_else(|| Error::UnresolvableCallback { target: key.clone() })
            }
        }
    }

    /// Invokes the callable with no arguments.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Callback::call_array`].
    pub fn call(&self) -> Result<Value> {
        self.call_array(&[])
    }

    /// Invokes the callable with an ordered argument list, returning its
    /// result unmodified (no guarantee about the value's type). An empty
    /// list is valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvableCallback`] for a named callable absent
    /// from its registry, or whatever error the callable itself raises.
    pub fn call_array(&self, arguments: &[Value]) -> Result<Value> {
        let func = match &self.inner.kind {
            Kind::Closure { func, .. } => Arc::clone(func),
            Kind::Named { key, registry } => {
                registry
                    .resolve(key)
                    .ok_or_else(|| Error::UnresolvableCallback { target: key.clone() })?
            }
        };
        let value = func(arguments)?;
        if self.inner.negated {
            Ok(Value::Bool(!is_truthy(&value)))
        } else {
            Ok(value)
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("target", &self.inner.target)
            .field("negated", &self.inner.negated)
            .finish()
    }
}

/// Truthiness of a dynamic value, used by negated callbacks.
///
/// `Null`, `false`, numeric zero, the empty string, and the empty array are
/// falsy; everything else is truthy. Note that condition *gating* on hooks
/// is stricter than this: only a result of exactly `false` short-circuits.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}
