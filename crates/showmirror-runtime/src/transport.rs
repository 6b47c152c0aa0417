#![forbid(unsafe_code)]

//! Seams to the outside world.
//!
//! [`Transport`] is the upstream link to the remote graph; it is told which
//! identities to subscribe to. [`Consumer`] receives published definitions
//! and value flushes. Both are fire-and-forget: the mirror never waits on
//! them and never learns whether a call succeeded, except through
//! [`Mirror::transport_error`](crate::Mirror::transport_error).
//!
//! [`RecordingTransport`] and [`RecordingConsumer`] capture every call and
//! are used by tests and the replay tool.

use crate::descriptor::Definition;
use showmirror_core::{ParamId, ParamValue, ValueChanges};

/// Upstream subscription control.
pub trait Transport {
    fn subscribe(&mut self, id: ParamId);
    fn unsubscribe(&mut self, id: ParamId);
}

/// Downstream sink for definitions and values.
pub trait Consumer {
    /// Full current list of visible keys.
    fn publish_definitions(&mut self, definitions: &[Definition]);
    /// Sparse set of keys whose value changed; `None` clears a key.
    fn publish_values(&mut self, changes: &ValueChanges);
}

/// One incoming value update for a subscribed identity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "crate::composition::RawParameter"))]
pub struct ParameterMessage {
    pub id: ParamId,
    pub value: ParamValue,
}

impl ParameterMessage {
    #[must_use]
    pub fn new(id: ParamId, value: ParamValue) -> Self {
        Self { id, value }
    }
}

impl From<crate::composition::Parameter> for ParameterMessage {
    fn from(param: crate::composition::Parameter) -> Self {
        Self {
            id: param.id,
            value: param.value,
        }
    }
}

#[cfg(feature = "serde")]
impl From<crate::composition::RawParameter> for ParameterMessage {
    fn from(raw: crate::composition::RawParameter) -> Self {
        let (id, value) = raw.into_parts();
        Self { id, value }
    }
}

/// A call observed by [`RecordingTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCall {
    Subscribe(ParamId),
    Unsubscribe(ParamId),
}

/// Transport double that records calls in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    pub calls: Vec<TransportCall>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identities subscribed, in call order.
    #[must_use]
    pub fn subscribed(&self) -> Vec<ParamId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                TransportCall::Subscribe(id) => Some(*id),
                TransportCall::Unsubscribe(_) => None,
            })
            .collect()
    }

    /// Identities unsubscribed, in call order.
    #[must_use]
    pub fn unsubscribed(&self) -> Vec<ParamId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                TransportCall::Unsubscribe(id) => Some(*id),
                TransportCall::Subscribe(_) => None,
            })
            .collect()
    }

    /// Take and clear the recorded calls.
    pub fn take(&mut self) -> Vec<TransportCall> {
        std::mem::take(&mut self.calls)
    }
}

impl Transport for RecordingTransport {
    fn subscribe(&mut self, id: ParamId) {
        self.calls.push(TransportCall::Subscribe(id));
    }

    fn unsubscribe(&mut self, id: ParamId) {
        self.calls.push(TransportCall::Unsubscribe(id));
    }
}

/// Consumer double that records every publication.
#[derive(Debug, Clone, Default)]
pub struct RecordingConsumer {
    pub definitions: Vec<Vec<Definition>>,
    pub values: Vec<ValueChanges>,
}

impl RecordingConsumer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_definitions(&self) -> Option<&[Definition]> {
        self.definitions.last().map(Vec::as_slice)
    }

    /// Keys of the most recent definition list.
    #[must_use]
    pub fn defined_keys(&self) -> Vec<&str> {
        self.last_definitions()
            .map(|defs| defs.iter().map(|d| d.key.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.definitions.clear();
        self.values.clear();
    }
}

impl Consumer for RecordingConsumer {
    fn publish_definitions(&mut self, definitions: &[Definition]) {
        self.definitions.push(definitions.to_vec());
    }

    fn publish_values(&mut self, changes: &ValueChanges) {
        self.values.push(changes.clone());
    }
}
