#![forbid(unsafe_code)]

//! The single-writer mirror state object.
//!
//! [`Mirror`] owns every piece of mutable state (bindings, cache, cursors,
//! flush window) and is driven by the host loop through four entry points:
//! a new snapshot ([`set_composition`](Mirror::set_composition)), a
//! connection change ([`set_connected`](Mirror::set_connected)), an upstream
//! update ([`on_message`](Mirror::on_message)) and the clock
//! ([`poll`](Mirror::poll)).
//!
//! Selection hooks fired while handling one entry point are queued and
//! applied after it returns from reconciliation, one at a time. A hook can
//! therefore trigger a partial reconciliation, but reconciliation is never
//! entered from inside itself.
//!
//! # Usage
//!
//! ```
//! use showmirror_runtime::{Composition, Mirror, MirrorConfig, ParameterMessage, Parameter};
//! use showmirror_runtime::transport::{RecordingConsumer, RecordingTransport};
//! use showmirror_core::{ParamId, ParamValue, Value};
//! use web_time::{Duration, Instant};
//!
//! let mut mirror = Mirror::new(
//!     MirrorConfig::default(),
//!     RecordingTransport::new(),
//!     RecordingConsumer::new(),
//! );
//! let t0 = Instant::now();
//! let composition = Composition {
//!     name: Some(Parameter::scalar(ParamId(1), "Show")),
//!     ..Composition::default()
//! };
//! mirror.set_composition(composition, t0);
//! mirror.set_connected(true, t0);
//!
//! mirror.on_message(
//!     &ParameterMessage::new(ParamId(1), ParamValue::Scalar(Some(Value::from("Encore")))),
//!     t0,
//! );
//! assert!(mirror.poll(t0 + Duration::from_millis(100)));
//! let flushed = mirror.consumer().values.last().cloned().unwrap_or_default();
//! assert_eq!(flushed.get("composition_name"), Some(&Some(Value::from("Encore"))));
//! ```

use std::collections::VecDeque;

use showmirror_core::ValueCache;
use web_time::Instant;

use crate::composition::Composition;
use crate::config::MirrorConfig;
use crate::cursor::{Action, CursorEvent, CursorKind, CursorState, EventKind};
use crate::definitions::{cursor_values, family, full_desired};
use crate::descriptor::Descriptor;
use crate::flush::FlushScheduler;
use crate::reconcile::{ReconcileMode, ReconcileReport, Reconciler};
use crate::transport::{Consumer, ParameterMessage, Transport};

/// Mirror of a remote parameter graph into a flat key/value store.
#[derive(Debug)]
pub struct Mirror<T: Transport, C: Consumer> {
    config: MirrorConfig,
    transport: T,
    consumer: C,
    composition: Composition,
    connected: bool,
    reconciler: Reconciler,
    cache: ValueCache,
    flush: FlushScheduler,
    cursor: CursorState,
    hooks: VecDeque<CursorEvent>,
}

impl<T: Transport, C: Consumer> Mirror<T, C> {
    #[must_use]
    pub fn new(config: MirrorConfig, transport: T, consumer: C) -> Self {
        let flush = FlushScheduler::new(config.flush_interval());
        Self {
            config,
            transport,
            consumer,
            composition: Composition::default(),
            connected: false,
            reconciler: Reconciler::new(),
            cache: ValueCache::new(),
            flush,
            cursor: CursorState::new(),
            hooks: VecDeque::new(),
        }
    }

    /// Record the link state. Becoming connected triggers a full rebuild.
    pub fn set_connected(&mut self, connected: bool, now: Instant) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        tracing::info!(target: "showmirror.mirror", connected, "connection state changed");
        if connected {
            self.update_definitions(now);
        }
    }

    /// Replace the graph snapshot and rebuild.
    pub fn set_composition(&mut self, composition: Composition, now: Instant) {
        tracing::info!(
            target: "showmirror.mirror",
            layers = composition.layers.len(),
            clips = composition.clip_count(),
            columns = composition.columns.len(),
            "composition replaced"
        );
        self.composition = composition;
        self.update_definitions(now);
    }

    /// Rebuild every desired key from the current snapshot and run a full
    /// reconciliation. Does nothing while disconnected.
    pub fn update_definitions(&mut self, now: Instant) -> Option<ReconcileReport> {
        if !self.connected {
            tracing::debug!(target: "showmirror.mirror", "not connected, rebuild skipped");
            return None;
        }

        for kind in CursorKind::ALL {
            match self.cursor.anchor(kind) {
                Some(anchor) if !self.composition.contains(anchor) => {
                    self.cursor.forget(kind);
                    tracing::debug!(
                        target: "showmirror.cursor",
                        cursor = kind.as_str(),
                        entity = %anchor,
                        "anchored entity vanished"
                    );
                    self.stage_cursor(kind);
                }
                Some(_) if self.cursor.current(kind).is_some() => self.stage_cursor(kind),
                _ => {}
            }
        }

        let desired = full_desired(&self.composition, &self.cursor);
        let report = self.run_reconcile(desired, ReconcileMode::Full, now);
        self.drain_hooks(now);
        Some(report)
    }

    /// Handle one upstream value update.
    pub fn on_message(&mut self, message: &ParameterMessage, now: Instant) {
        let events = self
            .reconciler
            .apply_update(message.id, &message.value, &mut self.cache);
        self.hooks.extend(events);
        self.drain_hooks(now);
        self.request_flush(now);
    }

    /// Advance the clock. Returns true when a flush fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.flush.poll(now) {
            self.flush_now();
            true
        } else {
            false
        }
    }

    /// Commit staged values and publish the changes, bypassing the throttle.
    /// Any armed window is consumed. Returns the number of keys published.
    pub fn flush_now(&mut self) -> usize {
        self.flush.cancel();
        let changes = self.cache.commit();
        if changes.is_empty() {
            return 0;
        }
        tracing::debug!(
            target: "showmirror.flush",
            changed = changes.len(),
            "variables updated"
        );
        self.consumer.publish_values(&changes);
        changes.len()
    }

    /// Log a failure reported by the transport. State is left untouched.
    pub fn transport_error(&mut self, error: &dyn std::error::Error) {
        tracing::error!(target: "showmirror.transport", error = %error, "transport error");
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.flush.next_deadline()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    #[must_use]
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    #[must_use]
    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }

    #[must_use]
    pub fn cache(&self) -> &ValueCache {
        &self.cache
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[must_use]
    pub fn flush_scheduler(&self) -> &FlushScheduler {
        &self.flush
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[must_use]
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    fn run_reconcile(
        &mut self,
        desired: Vec<Descriptor>,
        mode: ReconcileMode,
        now: Instant,
    ) -> ReconcileReport {
        let mut report =
            self.reconciler
                .reconcile(desired, mode, &mut self.cache, &mut self.transport);
        if report.definitions_changed {
            self.consumer
                .publish_definitions(&self.reconciler.definitions());
        }
        self.hooks.extend(report.events.drain(..));
        self.request_flush(now);
        report
    }

    fn request_flush(&mut self, now: Instant) {
        if self.cache.has_pending() {
            self.flush.request(now);
        }
    }

    fn stage_cursor(&mut self, kind: CursorKind) {
        for (key, value) in cursor_values(&self.composition, kind, self.cursor.current(kind)) {
            self.cache.stage(key, value);
        }
    }

    fn drain_hooks(&mut self, now: Instant) {
        while let Some(event) = self.hooks.pop_front() {
            self.apply_hook(event, now);
        }
    }

    fn apply_hook(&mut self, event: CursorEvent, now: Instant) {
        let exists = self.composition.contains(event.entity);
        let transition = self.cursor.apply(event, exists);
        let kind = event.entity.kind();
        match transition.action {
            Action::Point => {
                tracing::debug!(
                    target: "showmirror.cursor",
                    cursor = kind.as_str(),
                    entity = %event.entity,
                    moved = transition.moved(),
                    "cursor pointed"
                );
                self.stage_cursor(kind);
                let desired = family(&self.composition, event.entity);
                self.run_reconcile(desired, ReconcileMode::Partial, now);
            }
            Action::Clear => {
                tracing::debug!(
                    target: "showmirror.cursor",
                    cursor = kind.as_str(),
                    entity = %event.entity,
                    "cursor cleared"
                );
                self.stage_cursor(kind);
                self.request_flush(now);
            }
            Action::Ignore => match event.kind() {
                EventKind::Deselected => tracing::trace!(
                    target: "showmirror.cursor",
                    entity = %event.entity,
                    "stale deselection ignored"
                ),
                EventKind::Selected => tracing::debug!(
                    target: "showmirror.cursor",
                    entity = %event.entity,
                    "selection of unknown entity ignored"
                ),
            },
        }
    }
}
