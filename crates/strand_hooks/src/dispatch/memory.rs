//! In-process reference dispatcher.
//!
//! [`MemoryDispatcher`] implements [`EventDispatcher`] with host-compatible
//! semantics so the mediation layer can be exercised without a host process:
//!
//! - listeners fire in ascending priority order, registration order within a
//!   priority;
//! - the first dispatch argument is threaded through listener return values;
//! - each registration's argument list is truncated to its accepted-args
//!   count before invocation;
//! - re-registering an existing (token, priority) replaces in place, keeping
//!   its firing position;
//! - registrations added or removed *during* a dispatch cycle are honored
//!   for listeners that have not fired yet in that cycle, at the current or
//!   a later priority.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use serde_json::Value;

use super::{EventDispatcher, Listener, ListenerToken};
use crate::error::Result;

struct Registration {
    seq: u64,
    accepted_args: usize,
    listener: Listener,
}

#[derive(Default)]
struct Channel {
    by_priority: BTreeMap<i64, Vec<Registration>>,
}

impl Channel {
    fn is_empty(&self) -> bool {
        self.by_priority.is_empty()
    }
}

/// An in-memory [`EventDispatcher`] with host-compatible ordering semantics.
#[derive(Default)]
pub struct MemoryDispatcher {
    channels: RwLock<HashMap<String, Channel>>,
    next_seq: AtomicU64,
}

impl MemoryDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registrations on a handle.
    #[must_use]
    pub fn listener_count(&self, handle: &str) -> usize {
        self.channels
            .read()
            .get(handle)
            .map_or(0, |channel| channel.by_priority.values().map(Vec::len).sum())
    }

    /// Finds the next unfired registration at or above a priority floor.
    fn next_registration(
        &self,
        handle: &str,
        floor: i64,
        fired: &HashSet<u64>,
    ) -> Option<(i64, u64, usize, Listener)> {
        let channels = self.channels.read();
        let channel = channels.get(handle)?;
        channel
            .by_priority
            .range(floor..)
            .flat_map(|(priority, registrations)| {
                registrations.iter().map(move |registration| (*priority, registration))
            })
            .find(|(_, registration)| !fired.contains(&registration.seq))
            .map(|(priority, registration)| {
                (
                    priority,
                    registration.seq,
                    registration.accepted_args,
                    registration.listener.clone(),
                )
            })
    }
}

impl EventDispatcher for MemoryDispatcher {
    fn register(&self, handle: &str, listener: Listener, priority: i64, accepted_args: usize) {
        let mut channels = self.channels.write();
        let channel = channels.entry_ref(handle).or_default();
        let registrations = channel.by_priority.entry(priority).or_default();

        if let Some(existing) = registrations
            .iter_mut()
            .find(|registration| registration.listener.token() == listener.token())
        {
            // Same identity at the same priority replaces in place.
            existing.accepted_args = accepted_args;
            existing.listener = listener;
            return;
        }

        tracing::debug!(handle, priority, token = %listener.token(), "listener registered");
        registrations.push(Registration {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            accepted_args,
            listener,
        });
    }

    fn deregister(&self, handle: &str, token: &ListenerToken, priority: i64) -> bool {
        let mut channels = self.channels.write();
        let Some(channel) = channels.get_mut(handle) else {
            return false;
        };
        let Some(registrations) = channel.by_priority.get_mut(&priority) else {
            return false;
        };

        let before = registrations.len();
        registrations.retain(|registration| registration.listener.token() != token);
        let removed = registrations.len() < before;

        if registrations.is_empty() {
            channel.by_priority.remove(&priority);
        }
        if channel.is_empty() {
            channels.remove(handle);
        }

        if removed {
            tracing::debug!(handle, priority, %token, "listener deregistered");
        }
        removed
    }

    fn is_registered(&self, handle: &str) -> bool {
        self.channels.read().contains_key(handle)
    }

    fn dispatch(&self, handle: &str, arguments: &[Value]) -> Result<Value> {
        let mut value = arguments.first().cloned().unwrap_or(Value::Null);
        let rest = arguments.get(1..).unwrap_or_default();

        let mut fired = HashSet::new();
        let mut floor = i64::MIN;

        // The lock is never held across a listener invocation, so listeners
        // are free to register and deregister on this same dispatcher.
        while let Some((priority, seq, accepted_args, listener)) =
            self.next_registration(handle, floor, &fired)
        {
            fired.insert(seq);
            floor = priority;

            let mut call_args = Vec::with_capacity(1 + rest.len());
            call_args.push(value.clone());
            call_args.extend(rest.iter().cloned());
            call_args.truncate(accepted_args);

            value = listener.invoke(&call_args)?;
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;
    use crate::error::Error;

    fn counting_listener(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Listener::new(ListenerToken::unique(), move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(args.first().cloned().unwrap_or(Value::Null))
        })
    }

    #[test]
    fn dispatch_threads_the_value_through_listeners() {
        let dispatcher = MemoryDispatcher::new();
        for _ in 0..3 {
            dispatcher.register(
                "filterme",
                Listener::new(ListenerToken::unique(), |args| {
                    Ok(json!(args[0].as_i64().unwrap_or_default() + 1))
                }),
                10,
                1,
            );
        }

        assert_eq!(dispatcher.dispatch("filterme", &[json!(1)]).unwrap(), json!(4));
    }

    #[test]
    fn listeners_fire_in_priority_then_registration_order() {
        let dispatcher = MemoryDispatcher::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for (name, priority) in [("late", 20), ("early", 1), ("mid_a", 10), ("mid_b", 10)] {
            let order = Arc::clone(&order);
            dispatcher.register(
                "ordered",
                Listener::new(ListenerToken::Name(name.into()), move |args| {
                    order.lock().push(name);
                    Ok(args.first().cloned().unwrap_or(Value::Null))
                }),
                priority,
                1,
            );
        }

        dispatcher.dispatch("ordered", &[Value::Null]).unwrap();

        assert_eq!(*order.lock(), vec!["early", "mid_a", "mid_b", "late"]);
    }

    #[test]
    fn arguments_truncate_to_accepted_args() {
        let dispatcher = MemoryDispatcher::new();
        let seen = Arc::new(parking_lot::Mutex::new(0));
        let seen_clone = Arc::clone(&seen);

        dispatcher.register(
            "truncated",
            Listener::new(ListenerToken::unique(), move |args| {
                *seen_clone.lock() = args.len();
                Ok(args.first().cloned().unwrap_or(Value::Null))
            }),
            10,
            2,
        );

        dispatcher
            .dispatch("truncated", &[json!(1), json!(2), json!(3), json!(4)])
            .unwrap();

        assert_eq!(*seen.lock(), 2);
    }

    #[test]
    fn reregistering_the_same_token_and_priority_replaces_in_place() {
        let dispatcher = MemoryDispatcher::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let token = ListenerToken::Name("stable".into());

        for _ in 0..2 {
            let counter = Arc::clone(&counter);
            dispatcher.register(
                "idempotent",
                Listener::new(token.clone(), move |args| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(args.first().cloned().unwrap_or(Value::Null))
                }),
                10,
                1,
            );
        }

        assert_eq!(dispatcher.listener_count("idempotent"), 1);
        dispatcher.dispatch("idempotent", &[Value::Null]).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deregister_reports_whether_something_was_removed() {
        let dispatcher = MemoryDispatcher::new();
        let token = ListenerToken::Name("target".into());
        dispatcher.register(
            "removable",
            Listener::new(token.clone(), |args| {
                Ok(args.first().cloned().unwrap_or(Value::Null))
            }),
            10,
            1,
        );

        assert!(dispatcher.is_registered("removable"));
        // Wrong priority does not match.
        assert!(!dispatcher.deregister("removable", &token, 11));
        assert!(dispatcher.deregister("removable", &token, 10));
        // Idempotent-safe: nothing left to remove.
        assert!(!dispatcher.deregister("removable", &token, 10));
        assert!(!dispatcher.is_registered("removable"));
    }

    #[test]
    fn mid_dispatch_deregistration_prevents_unfired_listeners() {
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let victim_token = ListenerToken::Name("victim".into());

        let sweeper_dispatcher = Arc::clone(&dispatcher);
        let sweeper_target = victim_token.clone();
        dispatcher.register(
            "sweep",
            Listener::new(ListenerToken::unique(), move |args| {
                sweeper_dispatcher.deregister("sweep", &sweeper_target, 10);
                Ok(args.first().cloned().unwrap_or(Value::Null))
            }),
            9,
            1,
        );

        let victim_counter = Arc::clone(&counter);
        dispatcher.register(
            "sweep",
            Listener::new(victim_token, move |args| {
                victim_counter.fetch_add(1, Ordering::SeqCst);
                Ok(args.first().cloned().unwrap_or(Value::Null))
            }),
            10,
            1,
        );

        dispatcher.dispatch("sweep", &[Value::Null]).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 0, "victim should never fire");
    }

    #[test]
    fn listener_errors_propagate_unmodified() {
        let dispatcher = MemoryDispatcher::new();
        dispatcher.register(
            "explosive",
            Listener::new(ListenerToken::unique(), |_| {
                Err(Error::Host {
                    code: "boom".into(),
                    message: "listener failed".into(),
                })
            }),
            10,
            1,
        );
        let counter = Arc::new(AtomicUsize::new(0));
        dispatcher.register("explosive", counting_listener(&counter), 20, 1);

        let result = dispatcher.dispatch("explosive", &[Value::Null]);

        assert!(matches!(result, Err(Error::Host { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 0, "dispatch stops at the error");
    }

    #[test]
    fn dispatch_with_no_listeners_returns_the_given_value() {
        let dispatcher = MemoryDispatcher::new();

        assert_eq!(dispatcher.dispatch("silent", &[json!("as-is")]).unwrap(), json!("as-is"));
        assert_eq!(dispatcher.dispatch("silent", &[]).unwrap(), Value::Null);
    }
}
