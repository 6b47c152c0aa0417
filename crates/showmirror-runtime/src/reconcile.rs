#![forbid(unsafe_code)]

//! Incremental reconciliation of desired output keys against live bindings.
//!
//! [`Reconciler::reconcile`] takes a freshly built list of [`Descriptor`]s
//! and brings the identity map, the transport subscriptions and the value
//! cache in line with it, issuing the minimum number of subscribe and
//! unsubscribe calls.
//!
//! # Algorithm
//!
//! 1. Expand composites into their sibling families.
//! 2. Short-circuit when nothing differs.
//! 3. In full mode, evict keys absent from the desired set and stage them
//!    (plus their composite siblings) as unset.
//! 4. Bind added descriptors, subscribe new identities, and seed values from
//!    the last live update or the snapshot.
//! 5. Unsubscribe identities left without references once both passes are
//!    done.
//!
//! All evictions run before any addition, so an identity moving from one key
//! to another within a batch is never unsubscribed and re-subscribed.
//!
//! # Invariants
//!
//! 1. Every `Master::Param` in the map is subscribed exactly once.
//! 2. An identity is unsubscribed only when no key references it.
//! 3. Partial mode never unbinds or unsets a key.
//! 4. Selection hooks are returned, never applied here.

use crate::cursor::CursorEvent;
use crate::descriptor::{Binding, Definition, Descriptor, Facet, Master, expand};
use crate::transport::Transport;
use ahash::{AHashMap, AHashSet};
use showmirror_core::{IdentityMap, ParamId, ParamValue, ValueCache};
use web_time::Instant;

/// Whether a reconciliation may evict keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Replace the whole key set.
    Full,
    /// Overlay only; never evict.
    Partial,
}

impl ReconcileMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ReconcileMode::Full => "full",
            ReconcileMode::Partial => "partial",
        }
    }
}

/// What one reconciliation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Expanded desired keys.
    pub desired: usize,
    pub added: usize,
    pub removed: usize,
    pub subscribed: usize,
    pub unsubscribed: usize,
    /// Nothing differed; no state was touched.
    pub short_circuited: bool,
    /// The definition list changed and must be republished.
    pub definitions_changed: bool,
    /// Selection hooks fired while seeding, in seeding order.
    pub events: Vec<CursorEvent>,
}

/// Owner of the identity map and the subscription set.
#[derive(Debug, Default)]
pub struct Reconciler {
    map: IdentityMap<Master, Descriptor>,
    subscribed: AHashSet<ParamId>,
    last_seen: AHashMap<ParamId, ParamValue>,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Align bindings with `desired`.
    pub fn reconcile(
        &mut self,
        desired: Vec<Descriptor>,
        mode: ReconcileMode,
        cache: &mut ValueCache,
        transport: &mut dyn Transport,
    ) -> ReconcileReport {
        let start = Instant::now();
        let span = tracing::debug_span!(
            "showmirror.reconcile",
            mode = mode.as_str(),
            desired = tracing::field::Empty,
            added = tracing::field::Empty,
            removed = tracing::field::Empty,
            subscribed = tracing::field::Empty,
            unsubscribed = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        )
        .entered();

        let expanded = dedup_keys(expand(desired));
        let mut report = ReconcileReport {
            desired: expanded.len(),
            ..ReconcileReport::default()
        };
        span.record("desired", report.desired as u64);

        let added: Vec<Descriptor> = expanded
            .iter()
            .filter(|d| self.map.lookup_by_key(&d.key) != Some(*d))
            .cloned()
            .collect();
        let desired_keys: AHashSet<&str> = expanded.iter().map(|d| d.key.as_str()).collect();
        let removed: Vec<String> = match mode {
            ReconcileMode::Full => self
                .map
                .all_keys()
                .into_iter()
                .filter(|k| !desired_keys.contains(k))
                .map(str::to_owned)
                .collect(),
            ReconcileMode::Partial => Vec::new(),
        };

        if added.is_empty() && removed.is_empty() {
            report.short_circuited = true;
            span.record("duration_us", start.elapsed().as_micros() as u64);
            tracing::trace!(
                target: "showmirror.reconcile",
                mode = mode.as_str(),
                "desired keys unchanged"
            );
            return report;
        }

        let mut orphans: Vec<ParamId> = Vec::new();

        for key in &removed {
            let Some(descriptor) = self.map.lookup_by_key(key) else {
                // Already evicted as a sibling of an earlier key.
                continue;
            };
            let siblings = descriptor.sibling_keys();
            for sibling in siblings {
                if desired_keys.contains(sibling.as_str()) || !self.map.contains_key(&sibling) {
                    continue;
                }
                cache.stage(sibling.clone(), None);
                if let Some(Master::Param(id)) = self.map.unbind(&sibling) {
                    orphans.push(id);
                }
                report.removed += 1;
            }
            cache.stage(key.clone(), None);
            if let Some(Master::Param(id)) = self.map.unbind(key) {
                orphans.push(id);
            }
            report.removed += 1;
        }

        for descriptor in added {
            let master = descriptor.binding.master();
            if let Some(Master::Param(id)) =
                self.map
                    .bind(descriptor.key.clone(), master, descriptor.clone())
            {
                orphans.push(id);
            }
            report.added += 1;

            if let Master::Param(id) = master
                && self.subscribed.insert(id)
            {
                transport.subscribe(id);
                report.subscribed += 1;
            }

            self.seed(&descriptor, cache, &mut report.events);
        }

        orphans.sort_unstable();
        orphans.dedup();
        for id in orphans {
            if self.map.references(&Master::Param(id)) == 0 && self.subscribed.remove(&id) {
                transport.unsubscribe(id);
                self.last_seen.remove(&id);
                report.unsubscribed += 1;
            }
        }

        report.definitions_changed = true;

        let duration_us = start.elapsed().as_micros() as u64;
        span.record("added", report.added as u64);
        span.record("removed", report.removed as u64);
        span.record("subscribed", report.subscribed as u64);
        span.record("unsubscribed", report.unsubscribed as u64);
        span.record("duration_us", duration_us);
        tracing::debug!(
            target: "showmirror.reconcile",
            mode = mode.as_str(),
            added = report.added,
            removed = report.removed,
            subscribed = report.subscribed,
            unsubscribed = report.unsubscribed,
            duration_us,
            "reconciled"
        );
        report
    }

    /// Stage the starting value of a freshly bound key.
    ///
    /// A live value seen on the wire beats the snapshot, since snapshots are
    /// only as fresh as the last graph refresh.
    fn seed(&self, descriptor: &Descriptor, cache: &mut ValueCache, events: &mut Vec<CursorEvent>) {
        let live = descriptor
            .binding
            .identity()
            .and_then(|id| self.last_seen.get(&id));
        match (live, &descriptor.binding) {
            (Some(value), _) => stage_facet(descriptor, value, cache, events),
            (None, Binding::Source(param)) => stage_facet(descriptor, &param.value, cache, events),
            (None, Binding::Reference(_) | Binding::Detached) => {
                let initial = if descriptor.ignore {
                    None
                } else {
                    descriptor.initial.clone()
                };
                cache.stage(descriptor.key.clone(), initial);
            }
        }
    }

    /// Fan one upstream update out to every key bound to `id`.
    ///
    /// Returns the selection hooks the update fired.
    pub fn apply_update(
        &mut self,
        id: ParamId,
        value: &ParamValue,
        cache: &mut ValueCache,
    ) -> Vec<CursorEvent> {
        let mut events = Vec::new();
        let descriptors = self.map.lookup_by_identity(&Master::Param(id));
        if descriptors.is_empty() {
            tracing::trace!(
                target: "showmirror.reconcile",
                id = id.0,
                "update for unbound identity"
            );
            return events;
        }
        for descriptor in descriptors {
            stage_facet(descriptor, value, cache, &mut events);
        }
        self.last_seen.insert(id, value.clone());
        events
    }

    /// Visible definitions in first-bind order.
    #[must_use]
    pub fn definitions(&self) -> Vec<Definition> {
        self.map
            .all_descriptors()
            .into_iter()
            .filter(|d| !d.ignore)
            .map(|d| Definition {
                key: d.key.clone(),
                label: d.label.clone(),
            })
            .collect()
    }

    /// Subscribed identities in ascending order.
    #[must_use]
    pub fn subscribed(&self) -> Vec<ParamId> {
        let mut ids: Vec<ParamId> = self.subscribed.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn is_subscribed(&self, id: ParamId) -> bool {
        self.subscribed.contains(&id)
    }

    #[must_use]
    pub fn descriptor(&self, key: &str) -> Option<&Descriptor> {
        self.map.lookup_by_key(key)
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<&Descriptor> {
        self.map.all_descriptors()
    }

    /// Identity currently backing `key`.
    #[must_use]
    pub fn identity_of(&self, key: &str) -> Option<ParamId> {
        match self.map.master_of(key) {
            Some(Master::Param(id)) => Some(*id),
            Some(Master::Detached) | None => None,
        }
    }

    /// Last value delivered for `id`, if it is still subscribed.
    #[must_use]
    pub fn last_seen(&self, id: ParamId) -> Option<&ParamValue> {
        self.last_seen.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Verify map consistency and that subscriptions match bound identities.
    pub fn check_consistency(&self) -> Result<(), String> {
        self.map.check_consistency()?;
        let bound: AHashSet<ParamId> = self
            .map
            .all_identities()
            .into_iter()
            .filter_map(|m| match m {
                Master::Param(id) => Some(*id),
                Master::Detached => None,
            })
            .collect();
        if bound != self.subscribed {
            return Err(format!(
                "{} bound identities but {} subscriptions",
                bound.len(),
                self.subscribed.len()
            ));
        }
        Ok(())
    }
}

/// Stage the part of `value` that `descriptor` mirrors, and collect its hook.
fn stage_facet(
    descriptor: &Descriptor,
    value: &ParamValue,
    cache: &mut ValueCache,
    events: &mut Vec<CursorEvent>,
) {
    let Some(extracted) = descriptor.facet.extract(value) else {
        return;
    };
    // An ignored key only clears a value it held while it was visible.
    let staged = if descriptor.ignore {
        None
    } else {
        descriptor.format.apply(extracted)
    };
    cache.stage(descriptor.key.clone(), staged);
    if descriptor.facet == Facet::Value
        && let Some(entity) = descriptor.hook
    {
        events.push(CursorEvent {
            entity,
            selected: entity.reads_selected(value),
        });
    }
}

/// Keep the first descriptor for each key.
fn dedup_keys(descriptors: Vec<Descriptor>) -> Vec<Descriptor> {
    let mut seen: AHashSet<String> = AHashSet::with_capacity(descriptors.len());
    descriptors
        .into_iter()
        .filter(|d| {
            let fresh = seen.insert(d.key.clone());
            if !fresh {
                tracing::debug!(
                    target: "showmirror.reconcile",
                    key = %d.key,
                    "duplicate desired key dropped"
                );
            }
            fresh
        })
        .collect()
}
