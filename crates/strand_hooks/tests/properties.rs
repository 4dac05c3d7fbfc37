//! Property tests for the mediator's truncation and iteration-limit rules.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use serde_json::{Value, json};
use strand_hooks::prelude::*;

fn as_values(numbers: &[i64]) -> Vec<Value> {
    numbers.iter().map(|n| json!(n)).collect()
}

proptest! {
    /// A callback with declared arity N receives exactly the first N
    /// arguments, in order (all of them when fewer than N are given).
    #[test]
    fn arity_n_receives_the_first_n_arguments(
        numbers in prop::collection::vec(-100i64..100, 1..8),
        arity in 1usize..6,
    ) {
        let dispatcher: Arc<dyn EventDispatcher> = Arc::new(MemoryDispatcher::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = Arc::clone(&received);
        Hook::on(Arc::clone(&dispatcher), "truncation")
            .set_callback(Callback::closure(arity, move |args| {
                *received_clone.lock().unwrap() = args.to_vec();
                Value::Null
            }))
            .unwrap()
            .listen();

        let arguments = as_values(&numbers);
        dispatcher.dispatch("truncation", &arguments).unwrap();

        let expected = &arguments[..arguments.len().min(arity)];
        prop_assert_eq!(&*received.lock().unwrap(), expected);
    }

    /// A zero-arity callback receives the full, untruncated argument list.
    #[test]
    fn arity_zero_receives_everything(
        numbers in prop::collection::vec(-100i64..100, 0..8),
    ) {
        let dispatcher: Arc<dyn EventDispatcher> = Arc::new(MemoryDispatcher::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = Arc::clone(&received);
        Hook::on(Arc::clone(&dispatcher), "variadic")
            .set_callback(Callback::closure(0, move |args| {
                *received_clone.lock().unwrap() = args.to_vec();
                Value::Null
            }))
            .unwrap()
            .listen();

        let arguments = as_values(&numbers);
        dispatcher.dispatch("variadic", &arguments).unwrap();

        prop_assert_eq!(&*received.lock().unwrap(), &arguments);
    }

    /// Over any number of dispatch cycles, a limited hook invokes its
    /// callback min(limit, cycles) times and then freezes.
    #[test]
    fn iteration_limit_caps_invocations(limit in 0u64..5, cycles in 0u64..10) {
        let dispatcher: Arc<dyn EventDispatcher> = Arc::new(MemoryDispatcher::new());

        let hook = Hook::on(Arc::clone(&dispatcher), "limited")
            .set_callback(Callback::closure(1, |_| json!("invoked")))
            .unwrap()
            .only_x_times(limit)
            .listen();

        for _ in 0..cycles {
            dispatcher.dispatch("limited", &[json!("given")]).unwrap();
        }

        prop_assert_eq!(hook.iterations(), limit.min(cycles));
    }
}
