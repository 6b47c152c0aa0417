#![forbid(unsafe_code)]

//! Trace decoding and the simulated-clock driver.
//!
//! A trace is JSON lines, each carrying `at_ms` (milliseconds since the
//! replay started, non-decreasing) and exactly one of:
//!
//! - `update`: a parameter message as the remote sends it
//! - `composition`: a full replacement snapshot
//! - `connected`: link state change
//!
//! Between lines the driver fires every flush deadline that falls due, so the
//! output is what a live consumer would have received at those instants.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use showmirror_core::{ParamId, ValueChanges};
use showmirror_runtime::transport::{RecordingConsumer, RecordingTransport, TransportCall};
use showmirror_runtime::{Composition, Definition, Mirror, MirrorConfig, ParameterMessage};
use web_time::Instant;

use crate::error::{ReplayError, Result};

/// What one trace line does.
#[derive(Debug, Clone)]
pub enum TraceAction {
    Update(ParameterMessage),
    Composition(Box<Composition>),
    Connected(bool),
}

/// A decoded trace line.
#[derive(Debug, Clone)]
pub struct TraceStep {
    pub at_ms: u64,
    pub action: TraceAction,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTraceLine {
    at_ms: u64,
    #[serde(default)]
    update: Option<ParameterMessage>,
    #[serde(default)]
    composition: Option<Box<Composition>>,
    #[serde(default)]
    connected: Option<bool>,
}

impl RawTraceLine {
    fn into_step(self) -> std::result::Result<TraceStep, String> {
        let action = match (self.update, self.composition, self.connected) {
            (Some(update), None, None) => TraceAction::Update(update),
            (None, Some(composition), None) => TraceAction::Composition(composition),
            (None, None, Some(connected)) => TraceAction::Connected(connected),
            _ => {
                return Err(
                    "expected exactly one of `update`, `composition`, `connected`".to_string()
                );
            }
        };
        Ok(TraceStep {
            at_ms: self.at_ms,
            action,
        })
    }
}

/// Decode a JSON-lines trace. Blank lines are skipped.
///
/// `path` only labels errors.
pub fn parse_trace(path: &Path, text: &str) -> Result<Vec<TraceStep>> {
    let mut steps: Vec<TraceStep> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawTraceLine = serde_json::from_str(line)
            .map_err(|error| ReplayError::trace(path, line_no, error.to_string()))?;
        let step = raw
            .into_step()
            .map_err(|message| ReplayError::trace(path, line_no, message))?;
        if let Some(prev) = steps.last()
            && step.at_ms < prev.at_ms
        {
            return Err(ReplayError::trace(
                path,
                line_no,
                format!("at_ms {} is earlier than {}", step.at_ms, prev.at_ms),
            ));
        }
        steps.push(step);
    }
    Ok(steps)
}

/// One JSON line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutputEvent {
    Subscribe {
        at_ms: u64,
        id: ParamId,
    },
    Unsubscribe {
        at_ms: u64,
        id: ParamId,
    },
    Definitions {
        at_ms: u64,
        definitions: Vec<Definition>,
    },
    Values {
        at_ms: u64,
        changes: ValueChanges,
    },
}

/// Totals for a finished replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub events: usize,
    pub flushes: usize,
    pub definition_lists: usize,
}

/// Drives a [`Mirror`] against a clock that only moves when told to.
#[derive(Debug)]
pub struct Replayer {
    mirror: Mirror<RecordingTransport, RecordingConsumer>,
    origin: Instant,
    clock_ms: u64,
}

impl Replayer {
    /// `origin` is the instant that `at_ms == 0` maps to.
    #[must_use]
    pub fn new(config: MirrorConfig, origin: Instant) -> Self {
        Self {
            mirror: Mirror::new(config, RecordingTransport::new(), RecordingConsumer::new()),
            origin,
            clock_ms: 0,
        }
    }

    #[must_use]
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    #[must_use]
    pub fn mirror(&self) -> &Mirror<RecordingTransport, RecordingConsumer> {
        &self.mirror
    }

    fn instant(&self, at_ms: u64) -> Instant {
        self.origin + Duration::from_millis(at_ms)
    }

    fn millis(&self, at: Instant) -> u64 {
        let elapsed = at.saturating_duration_since(self.origin).as_millis();
        u64::try_from(elapsed).unwrap_or(u64::MAX)
    }

    /// Load the initial snapshot and connect at `at_ms == 0`.
    pub fn start(&mut self, composition: Composition) -> Vec<OutputEvent> {
        let now = self.instant(0);
        self.mirror.set_composition(composition, now);
        self.mirror.set_connected(true, now);
        self.drain()
    }

    /// Move the clock forward, firing every flush deadline on the way.
    ///
    /// The clock never moves backwards; earlier targets only fire due flushes.
    pub fn advance_to(&mut self, at_ms: u64) -> Vec<OutputEvent> {
        let target = at_ms.max(self.clock_ms);
        let mut events = Vec::new();
        while let Some(deadline) = self.mirror.next_deadline() {
            if deadline > self.instant(target) {
                break;
            }
            self.clock_ms = self.millis(deadline).max(self.clock_ms);
            if !self.mirror.poll(deadline) && self.mirror.next_deadline() == Some(deadline) {
                break;
            }
            events.extend(self.drain());
        }
        self.clock_ms = target;
        events
    }

    /// Advance to the step's time and apply it.
    pub fn apply(&mut self, step: TraceStep) -> Vec<OutputEvent> {
        let mut events = self.advance_to(step.at_ms);
        let now = self.instant(self.clock_ms);
        match step.action {
            TraceAction::Update(message) => self.mirror.on_message(&message, now),
            TraceAction::Composition(composition) => self.mirror.set_composition(*composition, now),
            TraceAction::Connected(connected) => self.mirror.set_connected(connected, now),
        }
        events.extend(self.drain());
        events
    }

    /// Fire the last pending flush, if any.
    pub fn finish(&mut self) -> Vec<OutputEvent> {
        match self.mirror.next_deadline() {
            Some(deadline) => {
                let at_ms = self.millis(deadline);
                self.advance_to(at_ms)
            }
            None => Vec::new(),
        }
    }

    fn drain(&mut self) -> Vec<OutputEvent> {
        let at_ms = self.clock_ms;
        let mut events: Vec<OutputEvent> = self
            .mirror
            .transport_mut()
            .take()
            .into_iter()
            .map(|call| match call {
                TransportCall::Subscribe(id) => OutputEvent::Subscribe { at_ms, id },
                TransportCall::Unsubscribe(id) => OutputEvent::Unsubscribe { at_ms, id },
            })
            .collect();
        let consumer = self.mirror.consumer_mut();
        events.extend(
            std::mem::take(&mut consumer.definitions)
                .into_iter()
                .map(|definitions| OutputEvent::Definitions { at_ms, definitions }),
        );
        events.extend(
            std::mem::take(&mut consumer.values)
                .into_iter()
                .map(|changes| OutputEvent::Values { at_ms, changes }),
        );
        events
    }
}

fn write_events(
    out: &mut impl Write,
    events: &[OutputEvent],
    summary: &mut ReplaySummary,
) -> Result<()> {
    for event in events {
        serde_json::to_writer(&mut *out, event).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
        summary.events += 1;
        match event {
            OutputEvent::Values { .. } => summary.flushes += 1,
            OutputEvent::Definitions { .. } => summary.definition_lists += 1,
            OutputEvent::Subscribe { .. } | OutputEvent::Unsubscribe { .. } => {}
        }
    }
    Ok(())
}

/// Run a whole replay, writing one JSON object per line to `out`.
pub fn replay(
    config: MirrorConfig,
    composition: Composition,
    steps: Vec<TraceStep>,
    out: &mut impl Write,
) -> Result<ReplaySummary> {
    let started = Instant::now();
    let mut summary = ReplaySummary::default();
    let mut replayer = Replayer::new(config, started);

    write_events(out, &replayer.start(composition), &mut summary)?;
    for step in steps {
        summary.steps += 1;
        let events = replayer.apply(step);
        write_events(out, &events, &mut summary)?;
    }
    write_events(out, &replayer.finish(), &mut summary)?;
    out.flush()?;

    tracing::info!(
        target: "showmirror.replay",
        steps = summary.steps,
        events = summary.events,
        flushes = summary.flushes,
        end_ms = replayer.clock_ms(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "replay finished"
    );
    Ok(summary)
}
