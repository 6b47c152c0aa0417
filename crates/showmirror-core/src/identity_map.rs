#![forbid(unsafe_code)]

//! Many-to-one association between upstream identities and output keys.
//!
//! An identity ("master") backs zero or more output keys ("slaves"); each key
//! is backed by exactly one master at a time. The map owns the reference
//! sets, so it is the only place that can tell when an identity stops being
//! referenced and must be unsubscribed.
//!
//! # Invariants
//!
//! 1. A key appears in exactly one master's reference set, the one recorded
//!    in its slot.
//! 2. A master is present only while its reference set is non-empty.
//! 3. A master returned as orphaned by [`bind`](IdentityMap::bind) or
//!    [`unbind`](IdentityMap::unbind) has no references when the call
//!    returns.
//! 4. Listing operations return keys in first-bind order. Re-binding a key
//!    keeps its position.
//!
//! # Performance
//!
//! | Operation             | Complexity          |
//! |-----------------------|---------------------|
//! | `bind` / `unbind`     | O(1) amortized      |
//! | `lookup_by_key`       | O(1)                |
//! | `lookup_by_identity`  | O(R log R), R = refs |
//! | `all_descriptors`     | O(N log N)          |

use ahash::{AHashMap, AHashSet};
use std::hash::Hash;

struct Slot<M, D> {
    master: M,
    descriptor: D,
    /// First-bind sequence number, used for stable listing order.
    seq: u64,
}

/// Bidirectional master/slave map with orphan detection.
pub struct IdentityMap<M, D> {
    masters: AHashMap<M, AHashSet<String>>,
    slaves: AHashMap<String, Slot<M, D>>,
    next_seq: u64,
}

impl<M, D> Default for IdentityMap<M, D> {
    fn default() -> Self {
        Self {
            masters: AHashMap::new(),
            slaves: AHashMap::new(),
            next_seq: 0,
        }
    }
}

impl<M, D> std::fmt::Debug for IdentityMap<M, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMap")
            .field("masters", &self.masters.len())
            .field("slaves", &self.slaves.len())
            .finish()
    }
}

impl<M, D> IdentityMap<M, D>
where
    M: Clone + Eq + Hash,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `master`, storing `descriptor` for it.
    ///
    /// If the key was bound to a different master it is moved atomically:
    /// removed from the old reference set, then inserted into the new one.
    /// Returns the old master when that removal left it unreferenced.
    ///
    /// Binding a key to the master it already has only replaces the stored
    /// descriptor and returns `None`.
    pub fn bind(&mut self, key: impl Into<String>, master: M, descriptor: D) -> Option<M> {
        let key = key.into();
        let mut orphaned = None;

        if let Some(slot) = self.slaves.get_mut(&key) {
            if slot.master == master {
                slot.descriptor = descriptor;
                return None;
            }
            let old = std::mem::replace(&mut slot.master, master.clone());
            slot.descriptor = descriptor;
            if Self::release(&mut self.masters, &old, &key) {
                orphaned = Some(old);
            }
        } else {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.slaves.insert(
                key.clone(),
                Slot {
                    master: master.clone(),
                    descriptor,
                    seq,
                },
            );
        }

        self.masters.entry(master).or_default().insert(key);
        orphaned
    }

    /// Remove `key`'s binding. Returns its master if that was the last
    /// reference to it.
    pub fn unbind(&mut self, key: &str) -> Option<M> {
        let slot = self.slaves.remove(key)?;
        if Self::release(&mut self.masters, &slot.master, key) {
            Some(slot.master)
        } else {
            None
        }
    }

    /// Drop `key` from `master`'s reference set. Returns true when the set
    /// became empty and the master was removed.
    fn release(masters: &mut AHashMap<M, AHashSet<String>>, master: &M, key: &str) -> bool {
        let Some(refs) = masters.get_mut(master) else {
            return false;
        };
        refs.remove(key);
        if refs.is_empty() {
            masters.remove(master);
            true
        } else {
            false
        }
    }

    /// All descriptors bound to `master`, in first-bind order.
    #[must_use]
    pub fn lookup_by_identity(&self, master: &M) -> Vec<&D> {
        let Some(refs) = self.masters.get(master) else {
            return Vec::new();
        };
        let mut slots: Vec<&Slot<M, D>> = refs.iter().filter_map(|k| self.slaves.get(k)).collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| &slot.descriptor).collect()
    }

    #[must_use]
    pub fn lookup_by_key(&self, key: &str) -> Option<&D> {
        self.slaves.get(key).map(|slot| &slot.descriptor)
    }

    /// The master `key` is currently bound to.
    #[must_use]
    pub fn master_of(&self, key: &str) -> Option<&M> {
        self.slaves.get(key).map(|slot| &slot.master)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.slaves.contains_key(key)
    }

    /// Number of keys currently referencing `master`.
    #[must_use]
    pub fn references(&self, master: &M) -> usize {
        self.masters.get(master).map_or(0, |refs| refs.len())
    }

    /// Every bound entry as `(key, master, descriptor)`, in first-bind order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, &M, &D)> {
        let mut slots: Vec<(&String, &Slot<M, D>)> = self.slaves.iter().collect();
        slots.sort_by_key(|(_, slot)| slot.seq);
        slots
            .into_iter()
            .map(|(key, slot)| (key.as_str(), &slot.master, &slot.descriptor))
            .collect()
    }

    #[must_use]
    pub fn all_descriptors(&self) -> Vec<&D> {
        self.entries().into_iter().map(|(_, _, d)| d).collect()
    }

    #[must_use]
    pub fn all_keys(&self) -> Vec<&str> {
        self.entries().into_iter().map(|(k, _, _)| k).collect()
    }

    /// Every referenced master, in no particular order.
    #[must_use]
    pub fn all_identities(&self) -> Vec<&M> {
        self.masters.keys().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slaves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slaves.is_empty()
    }

    /// Verify that the forward and reverse maps agree.
    ///
    /// Returns a description of the first inconsistency found.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut seen = 0usize;
        for (master, refs) in &self.masters {
            if refs.is_empty() {
                return Err("master present with empty reference set".into());
            }
            for key in refs {
                match self.slaves.get(key) {
                    Some(slot) if slot.master == *master => seen += 1,
                    Some(_) => return Err(format!("key {key} listed under a foreign master")),
                    None => return Err(format!("key {key} referenced but not bound")),
                }
            }
        }
        if seen != self.slaves.len() {
            return Err(format!(
                "{} bound keys but {seen} references",
                self.slaves.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> IdentityMap<u32, &'static str> {
        IdentityMap::new()
    }

    #[test]
    fn bind_new_key_orphans_nothing() {
        let mut m = map();
        assert_eq!(m.bind("a", 1, "A"), None);
        assert_eq!(m.references(&1), 1);
        assert_eq!(m.lookup_by_key("a"), Some(&"A"));
    }

    #[test]
    fn rebind_same_master_is_noop_for_refs() {
        let mut m = map();
        m.bind("a", 1, "A");
        assert_eq!(m.bind("a", 1, "A2"), None);
        assert_eq!(m.references(&1), 1);
        assert_eq!(m.lookup_by_key("a"), Some(&"A2"));
    }

    #[test]
    fn repoint_returns_orphaned_master() {
        let mut m = map();
        m.bind("a", 1, "A");
        assert_eq!(m.bind("a", 2, "A"), Some(1));
        assert_eq!(m.references(&1), 0);
        assert_eq!(m.references(&2), 1);
        assert_eq!(m.master_of("a"), Some(&2));
        m.check_consistency().unwrap();
    }

    #[test]
    fn repoint_keeps_shared_master() {
        let mut m = map();
        m.bind("a", 1, "A");
        m.bind("b", 1, "B");
        assert_eq!(m.bind("a", 2, "A"), None);
        assert_eq!(m.lookup_by_identity(&1), vec![&"B"]);
    }

    #[test]
    fn unbind_last_reference_orphans() {
        let mut m = map();
        m.bind("a", 1, "A");
        m.bind("b", 1, "B");
        assert_eq!(m.unbind("a"), None);
        assert_eq!(m.unbind("b"), Some(1));
        assert_eq!(m.unbind("b"), None);
        assert!(m.is_empty());
        assert!(m.all_identities().is_empty());
    }

    #[test]
    fn listing_follows_first_bind_order() {
        let mut m = map();
        m.bind("c", 1, "C");
        m.bind("a", 2, "A");
        m.bind("b", 1, "B");
        m.bind("c", 3, "C");
        assert_eq!(m.all_keys(), vec!["c", "a", "b"]);
        assert_eq!(m.lookup_by_identity(&1), vec![&"B"]);
    }

    #[test]
    fn lookup_unknown_master_is_empty() {
        let m = map();
        assert!(m.lookup_by_identity(&9).is_empty());
        assert!(m.lookup_by_key("x").is_none());
    }
}
