#![forbid(unsafe_code)]

//! Snapshot of the remote parameter graph.
//!
//! Every field is optional: a snapshot with holes still produces descriptors,
//! just inert ones. With the `serde` feature the snapshot decodes from the
//! remote's JSON, where each parameter is an object tagged by `valuetype`:
//!
//! | `valuetype` | Decoded as |
//! |-------------|------------|
//! | `ParamChoice`, `ParamState` | [`ParamValue::Choice`] (`index`, `value` as text) |
//! | `ParamRange` | [`ParamValue::Range`] (`value`, `min`, `max`) |
//! | anything else | [`ParamValue::Scalar`] |

use crate::cursor::{ClipCoord, Entity};
use showmirror_core::{ParamId, ParamValue, Value};

/// One remote parameter as last delivered.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawParameter"))]
pub struct Parameter {
    pub id: ParamId,
    pub value: ParamValue,
}

impl Parameter {
    #[must_use]
    pub fn new(id: ParamId, value: ParamValue) -> Self {
        Self { id, value }
    }

    #[must_use]
    pub fn scalar(id: ParamId, value: impl Into<Value>) -> Self {
        Self::new(id, ParamValue::Scalar(Some(value.into())))
    }

    #[must_use]
    pub fn choice(id: ParamId, index: i64, text: impl Into<String>) -> Self {
        Self::new(
            id,
            ParamValue::Choice {
                index,
                text: text.into(),
            },
        )
    }

    #[must_use]
    pub fn range(id: ParamId, value: f64, min: f64, max: f64) -> Self {
        Self::new(id, ParamValue::Range { value, min, max })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AudioParams {
    pub volume: Option<Parameter>,
    pub pan: Option<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompositionVideo {
    pub opacity: Option<Parameter>,
}

/// The whole remote graph.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Composition {
    pub name: Option<Parameter>,
    pub master: Option<Parameter>,
    pub speed: Option<Parameter>,
    pub audio: AudioParams,
    pub video: CompositionVideo,
    pub layers: Vec<Layer>,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Mixer {
    #[cfg_attr(feature = "serde", serde(rename = "Blend Mode"))]
    pub blend_mode: Option<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayerVideo {
    pub opacity: Option<Parameter>,
    pub autosize: Option<Parameter>,
    pub mixer: Mixer,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayerTransition {
    pub duration: Option<Parameter>,
    pub blend_mode: Option<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Layer {
    pub id: Option<ParamId>,
    pub name: Option<Parameter>,
    pub selected: Option<Parameter>,
    pub bypassed: Option<Parameter>,
    pub solo: Option<Parameter>,
    pub master: Option<Parameter>,
    pub ignorecolumntrigger: Option<Parameter>,
    pub audio: AudioParams,
    pub video: LayerVideo,
    pub transition: LayerTransition,
    pub clips: Vec<Clip>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportControls {
    pub playdirection: Option<Parameter>,
    pub playmode: Option<Parameter>,
    pub playmodeaway: Option<Parameter>,
    /// Clip length in seconds.
    pub duration: Option<Parameter>,
}

/// Play head state of a clip.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClipTransport {
    /// Play head in milliseconds.
    pub position: Option<Parameter>,
    pub controls: Option<TransportControls>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClipVideo {
    pub resize: Option<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Clip {
    pub id: Option<ParamId>,
    pub name: Option<Parameter>,
    pub selected: Option<Parameter>,
    /// Slot state; index 0 means the slot holds no media.
    pub connected: Option<Parameter>,
    pub ignorecolumntrigger: Option<Parameter>,
    pub transport: Option<ClipTransport>,
    pub video: Option<ClipVideo>,
}

impl Clip {
    /// True when the slot holds no media.
    #[must_use]
    pub fn is_empty_slot(&self) -> bool {
        matches!(
            self.connected.as_ref().map(|p| &p.value),
            Some(ParamValue::Choice { index: 0, .. })
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Column {
    pub id: Option<ParamId>,
    pub name: Option<Parameter>,
    pub connected: Option<Parameter>,
}

impl Composition {
    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    #[must_use]
    pub fn clip(&self, at: ClipCoord) -> Option<&Clip> {
        self.layers.get(at.layer)?.clips.get(at.column)
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        match entity {
            Entity::Layer(l) => self.layer(l).is_some(),
            Entity::Clip(at) => self.clip(at).is_some(),
            Entity::Column(c) => self.column(c).is_some(),
        }
    }

    /// Clip slots across all layers.
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.layers.iter().map(|l| l.clips.len()).sum()
    }
}

/// Wire form of a parameter object.
#[cfg(feature = "serde")]
#[doc(hidden)]
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawParameter {
    id: ParamId,
    #[serde(default)]
    valuetype: Option<String>,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

#[cfg(feature = "serde")]
fn json_to_value(value: serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Bool(b) => Some(Value::Bool(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Int(i)),
            None => n.as_f64().map(Value::Float),
        },
        serde_json::Value::String(s) => Some(Value::Text(s)),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}

#[cfg(feature = "serde")]
impl RawParameter {
    pub(crate) fn into_parts(self) -> (ParamId, ParamValue) {
        let value = match self.valuetype.as_deref() {
            Some("ParamChoice" | "ParamState") => ParamValue::Choice {
                index: self.index.unwrap_or(0),
                text: json_to_value(self.value)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            },
            Some("ParamRange") => ParamValue::Range {
                value: json_to_value(self.value)
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0),
                min: self.min.unwrap_or(0.0),
                max: self.max.unwrap_or(0.0),
            },
            _ => ParamValue::Scalar(json_to_value(self.value)),
        };
        (self.id, value)
    }
}

#[cfg(feature = "serde")]
impl From<RawParameter> for Parameter {
    fn from(raw: RawParameter) -> Self {
        let (id, value) = raw.into_parts();
        Self { id, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Composition {
        Composition {
            layers: vec![
                Layer {
                    clips: vec![Clip::default(), Clip::default()],
                    ..Layer::default()
                },
                Layer::default(),
            ],
            columns: vec![Column::default()],
            ..Composition::default()
        }
    }

    #[test]
    fn contains_checks_each_kind() {
        let comp = sample();
        assert!(comp.contains(Entity::Layer(1)));
        assert!(!comp.contains(Entity::Layer(2)));
        assert!(comp.contains(Entity::Clip(ClipCoord::new(0, 1))));
        assert!(!comp.contains(Entity::Clip(ClipCoord::new(1, 0))));
        assert!(comp.contains(Entity::Column(0)));
        assert!(!comp.contains(Entity::Column(1)));
        assert_eq!(comp.clip_count(), 2);
    }

    #[test]
    fn empty_slot_detection() {
        let mut clip = Clip::default();
        assert!(!clip.is_empty_slot());
        clip.connected = Some(Parameter::choice(ParamId(1), 0, "Empty"));
        assert!(clip.is_empty_slot());
        clip.connected = Some(Parameter::choice(ParamId(1), 2, "Connected"));
        assert!(!clip.is_empty_slot());
    }
}
