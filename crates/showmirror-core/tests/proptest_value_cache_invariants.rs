//! Property-based invariant tests for the value cache.
//!
//! 1. A second commit with nothing staged in between is empty.
//! 2. Every reported change differs from the value cached before the commit.
//! 3. After a commit the cache holds the last staged value of every key.

use proptest::prelude::*;
use showmirror_core::{Value, ValueCache};
use std::collections::HashMap;

fn value_strategy() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        (0i64..4).prop_map(|v| Some(Value::Int(v))),
        any::<bool>().prop_map(|b| Some(Value::Bool(b))),
    ]
}

fn writes_strategy() -> impl Strategy<Value = Vec<(u8, Option<Value>)>> {
    prop::collection::vec((0u8..10, value_strategy()), 0..40)
}

proptest! {
    #[test]
    fn commit_is_idempotent(windows in prop::collection::vec(writes_strategy(), 1..6)) {
        let mut cache = ValueCache::new();
        for writes in &windows {
            for (k, v) in writes {
                cache.stage(format!("k{k}"), v.clone());
            }
            cache.commit();
            prop_assert!(cache.commit().is_empty());
        }
    }

    #[test]
    fn changes_are_real_and_last_write_wins(windows in prop::collection::vec(writes_strategy(), 1..6)) {
        let mut cache = ValueCache::new();
        let mut model: HashMap<String, Value> = HashMap::new();
        for writes in &windows {
            let mut last: HashMap<String, Option<Value>> = HashMap::new();
            for (k, v) in writes {
                cache.stage(format!("k{k}"), v.clone());
                last.insert(format!("k{k}"), v.clone());
            }
            let changes = cache.commit();
            for (k, v) in &changes {
                prop_assert_ne!(model.get(k), v.as_ref());
                prop_assert_eq!(last.get(k), Some(v));
            }
            for (k, v) in last {
                match v {
                    Some(v) => { model.insert(k, v); }
                    None => { model.remove(&k); }
                }
            }
            prop_assert_eq!(cache.len(), model.len());
            for (k, v) in &model {
                prop_assert_eq!(cache.get(k), Some(v));
            }
        }
    }
}
