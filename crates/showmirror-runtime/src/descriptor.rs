#![forbid(unsafe_code)]

//! Output key descriptors and composite expansion.
//!
//! A [`Descriptor`] says which output key exists, what it is called, and
//! which upstream identity (if any) feeds it. Descriptors are rebuilt from
//! scratch on every refresh, so equality is structural: key, label, the
//! identity and shape of the binding, facet, format, hook, initial value and
//! the ignore flag. Snapshot *values* never take part in equality, otherwise
//! a refresh would always look like a change.

use crate::composition::Parameter;
use crate::cursor::Entity;
use showmirror_core::{ParamId, ParamShape, ParamValue, Value, format_timecode};

/// Upstream source of an output key.
#[derive(Debug, Clone)]
pub enum Binding {
    /// No identity. The key is a constant (or is written by the cursor
    /// machinery); it is still tracked so duplicate additions are detected.
    Detached,
    /// A static numeric reference: subscribed, but there is no snapshot to
    /// seed from.
    Reference(ParamId),
    /// A live identity with the snapshot used to seed the key immediately.
    Source(Parameter),
}

impl Binding {
    #[must_use]
    pub fn identity(&self) -> Option<ParamId> {
        match self {
            Binding::Detached => None,
            Binding::Reference(id) => Some(*id),
            Binding::Source(param) => Some(param.id),
        }
    }

    /// Declared shape of the bound identity, when a snapshot exists.
    #[must_use]
    pub fn shape(&self) -> Option<ParamShape> {
        match self {
            Binding::Source(param) => Some(param.value.shape()),
            Binding::Detached | Binding::Reference(_) => None,
        }
    }

    #[must_use]
    pub fn master(&self) -> Master {
        match self.identity() {
            Some(id) => Master::Param(id),
            None => Master::Detached,
        }
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Binding::Detached, Binding::Detached) => true,
            (Binding::Reference(a), Binding::Reference(b)) => a == b,
            (Binding::Source(a), Binding::Source(b)) => {
                a.id == b.id && a.value.shape() == b.value.shape()
            }
            _ => false,
        }
    }
}

/// Identity-map master: a subscribed parameter, or the shared sentinel for
/// keys without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Master {
    Param(ParamId),
    Detached,
}

/// Which part of a composite parameter a key mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    /// The primary value: scalar value, choice index, or range value.
    Value,
    /// Display text of a choice.
    Text,
    /// Lower bound of a range.
    Min,
    /// Upper bound of a range.
    Max,
}

impl Facet {
    /// Sibling facets a primary key of `shape` expands into.
    #[must_use]
    pub fn siblings(shape: ParamShape) -> &'static [Facet] {
        match shape {
            ParamShape::Scalar => &[],
            ParamShape::Choice => &[Facet::Text],
            ParamShape::Range => &[Facet::Min, Facet::Max],
        }
    }

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Facet::Value => "",
            Facet::Text => "_text",
            Facet::Min => "_min",
            Facet::Max => "_max",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Facet::Value => "",
            Facet::Text => "text",
            Facet::Min => "min",
            Facet::Max => "max",
        }
    }

    /// Pick this facet out of an upstream value.
    ///
    /// Returns `None` when the facet does not exist for the value's shape,
    /// meaning "skip this key", and `Some(None)` when the facet exists but is
    /// unset.
    #[must_use]
    pub fn extract(self, value: &ParamValue) -> Option<Option<Value>> {
        match (self, value) {
            (Facet::Value, v) => Some(v.primary()),
            (Facet::Text, ParamValue::Choice { text, .. }) => Some(Some(Value::Text(text.clone()))),
            (Facet::Min, ParamValue::Range { min, .. }) => Some(Some(Value::Float(*min))),
            (Facet::Max, ParamValue::Range { max, .. }) => Some(Some(Value::Float(*max))),
            _ => None,
        }
    }
}

/// Presentation applied to a numeric value before it is staged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ValueFormat {
    #[default]
    Raw,
    /// Render as `HH:MM:SS.cc`; the value is multiplied by `scale_ms` to get
    /// milliseconds.
    Timecode { scale_ms: f64 },
}

impl ValueFormat {
    /// Timecode for values already in milliseconds.
    pub const MILLIS: ValueFormat = ValueFormat::Timecode { scale_ms: 1.0 };
    /// Timecode for values in seconds.
    pub const SECONDS: ValueFormat = ValueFormat::Timecode { scale_ms: 1000.0 };

    /// Non-numeric values pass through untouched.
    #[must_use]
    pub fn apply(self, value: Option<Value>) -> Option<Value> {
        match self {
            ValueFormat::Raw => value,
            ValueFormat::Timecode { scale_ms } => match value.as_ref().and_then(Value::as_f64) {
                Some(n) => Some(Value::Text(format_timecode(n * scale_ms))),
                None => value,
            },
        }
    }
}

/// One desired output key.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub key: String,
    pub label: String,
    pub binding: Binding,
    pub facet: Facet,
    pub format: ValueFormat,
    /// Selection entity notified with every incoming value of this key.
    pub hook: Option<Entity>,
    /// Static value seeded when the key has no live source.
    pub initial: Option<Value>,
    /// Tracked for its hook only: never defined, and its value is held unset.
    pub ignore: bool,
}

impl Descriptor {
    /// A detached key with a label and nothing else.
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            binding: Binding::Detached,
            facet: Facet::Value,
            format: ValueFormat::Raw,
            hook: None,
            initial: None,
            ignore: false,
        }
    }

    /// Bind to a parameter snapshot. A missing parameter leaves the key
    /// detached, so absent upstream data degrades to an inert key.
    #[must_use]
    pub fn source(mut self, param: Option<&Parameter>) -> Self {
        self.binding = match param {
            Some(p) => Binding::Source(p.clone()),
            None => Binding::Detached,
        };
        self
    }

    /// Bind to a static reference. The key is subscribed but has no
    /// snapshot, so it stays unset until an update (or `initial`) arrives.
    #[must_use]
    pub fn reference(mut self, id: Option<ParamId>) -> Self {
        self.binding = match id {
            Some(id) => Binding::Reference(id),
            None => Binding::Detached,
        };
        self
    }

    #[must_use]
    pub fn format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn hook(mut self, entity: Entity) -> Self {
        self.hook = Some(entity);
        self
    }

    #[must_use]
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Derived sibling of this descriptor for `facet`.
    fn sibling(&self, facet: Facet) -> Descriptor {
        Descriptor {
            key: format!("{}{}", self.key, facet.suffix()),
            label: format!("{} ({})", self.label, facet.label()),
            binding: self.binding.clone(),
            facet,
            format: if facet == Facet::Text {
                ValueFormat::Raw
            } else {
                self.format
            },
            hook: None,
            initial: None,
            ignore: self.ignore,
        }
    }

    /// Sibling keys this descriptor expands into, by the bound identity's
    /// declared shape.
    #[must_use]
    pub fn sibling_keys(&self) -> Vec<String> {
        if self.facet != Facet::Value {
            return Vec::new();
        }
        let Some(shape) = self.binding.shape() else {
            return Vec::new();
        };
        Facet::siblings(shape)
            .iter()
            .map(|facet| format!("{}{}", self.key, facet.suffix()))
            .collect()
    }
}

/// A published definition: what the consumer sees for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Definition {
    pub key: String,
    pub label: String,
}

/// Expand composite descriptors in place into their families.
///
/// A primary key bound to a choice is followed by `key_text`; one bound to a
/// range by `key_min` and `key_max`. Scalars pass through alone.
#[must_use]
pub fn expand(desired: Vec<Descriptor>) -> Vec<Descriptor> {
    let mut out = Vec::with_capacity(desired.len());
    for descriptor in desired {
        let facets = match (descriptor.facet, descriptor.binding.shape()) {
            (Facet::Value, Some(shape)) => Facet::siblings(shape),
            _ => &[],
        };
        let siblings: Vec<Descriptor> = facets.iter().map(|f| descriptor.sibling(*f)).collect();
        out.push(descriptor);
        out.extend(siblings);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(id: u64) -> Parameter {
        Parameter::new(
            ParamId(id),
            ParamValue::Choice {
                index: 1,
                text: "Forward".into(),
            },
        )
    }

    fn range(id: u64) -> Parameter {
        Parameter::new(
            ParamId(id),
            ParamValue::Range {
                value: 0.5,
                min: 0.0,
                max: 1.0,
            },
        )
    }

    #[test]
    fn scalar_expands_to_one_key() {
        let p = Parameter::new(ParamId(1), ParamValue::Scalar(Some(Value::from("A"))));
        let out = expand(vec![Descriptor::new("k", "K").source(Some(&p))]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn choice_expands_to_text_sibling() {
        let p = choice(7);
        let out = expand(vec![Descriptor::new("k", "K").source(Some(&p))]);
        let keys: Vec<_> = out.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["k", "k_text"]);
        assert_eq!(out[1].label, "K (text)");
        assert_eq!(out[1].binding.identity(), Some(ParamId(7)));
        assert_eq!(out[1].facet, Facet::Text);
    }

    #[test]
    fn range_expands_in_place() {
        let p = range(3);
        let out = expand(vec![
            Descriptor::new("a", "A").source(Some(&p)).format(ValueFormat::MILLIS),
            Descriptor::new("b", "B"),
        ]);
        let keys: Vec<_> = out.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "a_min", "a_max", "b"]);
        assert_eq!(out[1].format, ValueFormat::MILLIS);
    }

    #[test]
    fn missing_source_is_detached() {
        let d = Descriptor::new("k", "K").source(None);
        assert_eq!(d.binding, Binding::Detached);
        assert_eq!(expand(vec![d]).len(), 1);
    }

    #[test]
    fn equality_ignores_snapshot_values() {
        let a = Parameter::new(ParamId(1), ParamValue::Scalar(Some(Value::Int(1))));
        let b = Parameter::new(ParamId(1), ParamValue::Scalar(Some(Value::Int(2))));
        assert_eq!(
            Descriptor::new("k", "K").source(Some(&a)),
            Descriptor::new("k", "K").source(Some(&b))
        );
    }

    #[test]
    fn equality_sees_identity_and_shape() {
        let a = Parameter::new(ParamId(1), ParamValue::Scalar(Some(Value::Int(1))));
        let b = choice(1);
        let c = Parameter::new(ParamId(2), ParamValue::Scalar(Some(Value::Int(1))));
        let base = Descriptor::new("k", "K").source(Some(&a));
        assert_ne!(base, Descriptor::new("k", "K").source(Some(&b)));
        assert_ne!(base, Descriptor::new("k", "K").source(Some(&c)));
        assert_ne!(base, Descriptor::new("k", "K (renamed)").source(Some(&a)));
    }

    #[test]
    fn reference_binding() {
        let d = Descriptor::new("layer_0_id", "Layer 0 ID").reference(Some(ParamId(99)));
        assert_eq!(d.binding, Binding::Reference(ParamId(99)));
        assert_eq!(d.binding.master(), Master::Param(ParamId(99)));
        assert_eq!(d.initial, None);
        let d = Descriptor::new("layer_0_id", "Layer 0 ID").reference(None);
        assert_eq!(d.binding.master(), Master::Detached);
    }

    #[test]
    fn facet_extraction() {
        let c = choice(1).value;
        assert_eq!(Facet::Value.extract(&c), Some(Some(Value::Int(1))));
        assert_eq!(Facet::Text.extract(&c), Some(Some(Value::from("Forward"))));
        assert_eq!(Facet::Min.extract(&c), None);
    }

    #[test]
    fn timecode_format_scales() {
        assert_eq!(
            ValueFormat::SECONDS.apply(Some(Value::Float(61.5))),
            Some(Value::from("00:01:01.50"))
        );
        assert_eq!(
            ValueFormat::MILLIS.apply(Some(Value::from("n/a"))),
            Some(Value::from("n/a"))
        );
        assert_eq!(ValueFormat::MILLIS.apply(None), None);
    }
}
