#![forbid(unsafe_code)]

//! Last-published values plus a pending-write buffer.
//!
//! Writes are staged between flushes with "latest wins" semantics. A commit
//! diffs the staged writes against the cache and returns only the keys whose
//! value actually changed, including transitions to and from unset.
//!
//! # Usage
//!
//! ```
//! use showmirror_core::{Value, ValueCache};
//!
//! let mut cache = ValueCache::new();
//! cache.stage("layer_0_name", Some(Value::from("Intro")));
//! cache.stage("layer_0_name", Some(Value::from("Outro")));
//!
//! let changes = cache.commit();
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes["layer_0_name"], Some(Value::from("Outro")));
//!
//! // Nothing staged: nothing to emit.
//! assert!(cache.commit().is_empty());
//! ```

use crate::value::Value;
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Sparse key → value map of one flush. `None` means "clear".
pub type ValueChanges = BTreeMap<String, Option<Value>>;

/// Authoritative published values and the writes staged since the last
/// commit.
#[derive(Debug, Clone, Default)]
pub struct ValueCache {
    current: AHashMap<String, Value>,
    pending: AHashMap<String, Option<Value>>,
}

impl ValueCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending write. Overwrites any earlier pending write for the
    /// same key.
    pub fn stage(&mut self, key: impl Into<String>, value: Option<Value>) {
        self.pending.insert(key.into(), value);
    }

    /// Diff the pending writes against the cache.
    ///
    /// Returns only the keys whose value differs from the cached one. The
    /// whole pending set is then applied to the cache and the buffer is
    /// cleared. Committing an empty buffer returns an empty change set.
    pub fn commit(&mut self) -> ValueChanges {
        let mut changes = ValueChanges::new();
        for (key, value) in self.pending.drain() {
            if self.current.get(&key) != value.as_ref() {
                changes.insert(key.clone(), value.clone());
            }
            match value {
                Some(v) => {
                    self.current.insert(key, v);
                }
                None => {
                    self.current.remove(&key);
                }
            }
        }
        changes
    }

    /// Last committed value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.current.get(key)
    }

    /// Pending (uncommitted) write for `key`, if one is staged.
    #[must_use]
    pub fn pending(&self, key: &str) -> Option<&Option<Value>> {
        self.pending.get(key)
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of keys with a committed value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_reports_only_changes() {
        let mut cache = ValueCache::new();
        cache.stage("a", Some(Value::Int(1)));
        cache.stage("b", Some(Value::Int(2)));
        assert_eq!(cache.commit().len(), 2);

        cache.stage("a", Some(Value::Int(1)));
        cache.stage("b", Some(Value::Int(3)));
        let changes = cache.commit();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["b"], Some(Value::Int(3)));
    }

    #[test]
    fn second_commit_is_empty() {
        let mut cache = ValueCache::new();
        cache.stage("a", Some(Value::Bool(true)));
        assert!(!cache.commit().is_empty());
        assert!(cache.commit().is_empty());
        assert!(!cache.has_pending());
    }

    #[test]
    fn clearing_a_set_key_is_a_change() {
        let mut cache = ValueCache::new();
        cache.stage("a", Some(Value::Int(1)));
        cache.commit();
        cache.stage("a", None);
        let changes = cache.commit();
        assert_eq!(changes["a"], None);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn clearing_an_unset_key_is_not_a_change() {
        let mut cache = ValueCache::new();
        cache.stage("a", None);
        assert!(cache.commit().is_empty());
    }

    #[test]
    fn latest_staged_write_wins() {
        let mut cache = ValueCache::new();
        cache.stage("k", Some(Value::Int(1)));
        cache.stage("k", Some(Value::Int(2)));
        assert_eq!(cache.pending_len(), 1);
        assert_eq!(cache.pending("k"), Some(&Some(Value::Int(2))));
        let changes = cache.commit();
        assert_eq!(changes["k"], Some(Value::Int(2)));
        assert_eq!(cache.get("k"), Some(&Value::Int(2)));
    }
}
