#![forbid(unsafe_code)]

//! Selection cursors as an explicit state machine.
//!
//! Each selectable entity kind (layer, clip, column) owns one cursor. A
//! cursor moves when the entity's boolean "selected"/"connected" identity
//! reports a new value. The moves are driven by [`TRANSITIONS`], a table of
//! `(event, guard) -> action` rows evaluated top to bottom; the first row
//! whose guard holds wins.
//!
//! # Invariants
//!
//! 1. A deselection only clears a cursor that currently points at the same
//!    coordinates. A late `false` from a previously selected entity never
//!    clears a newer selection.
//! 2. Pointing records the entity as both the cursor and the anchor.
//!    Clearing keeps the anchor, so the anchored family stays mirrored until
//!    another entity is pointed.
//! 3. Cursors of different kinds never affect each other.

use std::fmt;

use showmirror_core::ParamValue;

/// Lowest `connected` choice index that counts as a connected column.
///
/// The remote numbers the states Empty, Disconnected, Previewing, Connected,
/// Connected & previewing.
pub const COLUMN_CONNECTED_INDEX: i64 = 3;

/// Coordinates of one clip slot: layer index and column index, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipCoord {
    pub layer: usize,
    pub column: usize,
}

impl ClipCoord {
    #[must_use]
    pub const fn new(layer: usize, column: usize) -> Self {
        Self { layer, column }
    }
}

/// A selectable entity, addressed by its position in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Layer(usize),
    Clip(ClipCoord),
    Column(usize),
}

impl Entity {
    #[must_use]
    pub const fn kind(self) -> CursorKind {
        match self {
            Entity::Layer(_) => CursorKind::Layer,
            Entity::Clip(_) => CursorKind::Clip,
            Entity::Column(_) => CursorKind::Column,
        }
    }

    /// Read the entity's hooked parameter as selected or not.
    ///
    /// Layers and clips report a boolean. A column reports its `connected`
    /// state, which only counts from [`COLUMN_CONNECTED_INDEX`] up.
    #[must_use]
    pub fn reads_selected(self, value: &ParamValue) -> bool {
        match (self, value) {
            (Entity::Column(_), ParamValue::Choice { index, .. }) => {
                *index >= COLUMN_CONNECTED_INDEX
            }
            (Entity::Column(_), _) => false,
            _ => value.as_flag(),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Layer(l) => write!(f, "layer {l}"),
            Entity::Clip(c) => write!(f, "layer {} clip {}", c.layer, c.column),
            Entity::Column(c) => write!(f, "column {c}"),
        }
    }
}

/// Which cursor an entity drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorKind {
    Layer,
    Clip,
    Column,
}

impl CursorKind {
    pub const ALL: [CursorKind; 3] = [CursorKind::Layer, CursorKind::Clip, CursorKind::Column];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CursorKind::Layer => "layer",
            CursorKind::Clip => "clip",
            CursorKind::Column => "column",
        }
    }

    const fn slot(self) -> usize {
        match self {
            CursorKind::Layer => 0,
            CursorKind::Clip => 1,
            CursorKind::Column => 2,
        }
    }
}

/// A boolean selection report for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorEvent {
    pub entity: Entity,
    pub selected: bool,
}

impl CursorEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        if self.selected {
            EventKind::Selected
        } else {
            EventKind::Deselected
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Selected,
    Deselected,
}

/// Condition a table row requires before its action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The entity is present in the current snapshot.
    EntityExists,
    /// The cursor of the entity's kind points at exactly this entity.
    IsCurrent,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Set cursor and anchor to the entity.
    Point,
    /// Unset the cursor; the anchor stays.
    Clear,
    Ignore,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Point => "point",
            Action::Clear => "clear",
            Action::Ignore => "ignore",
        }
    }
}

/// The cursor transition table.
pub const TRANSITIONS: &[(EventKind, Guard, Action)] = &[
    (EventKind::Selected, Guard::EntityExists, Action::Point),
    (EventKind::Selected, Guard::Always, Action::Ignore),
    (EventKind::Deselected, Guard::IsCurrent, Action::Clear),
    (EventKind::Deselected, Guard::Always, Action::Ignore),
];

/// Outcome of one [`CursorState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub event: CursorEvent,
    pub action: Action,
    /// Cursor of the event's kind before the transition.
    pub previous: Option<Entity>,
}

impl Transition {
    /// True when the cursor value changed.
    #[must_use]
    pub fn moved(&self) -> bool {
        match self.action {
            Action::Point => self.previous != Some(self.event.entity),
            Action::Clear => true,
            Action::Ignore => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Slot {
    current: Option<Entity>,
    anchor: Option<Entity>,
}

/// The three selection cursors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorState {
    slots: [Slot; 3],
}

impl CursorState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self, kind: CursorKind) -> Option<Entity> {
        self.slots[kind.slot()].current
    }

    /// Last entity pointed at by the cursor of `kind`, even if since cleared.
    #[must_use]
    pub fn anchor(&self, kind: CursorKind) -> Option<Entity> {
        self.slots[kind.slot()].anchor
    }

    /// Anchors of every kind, in `CursorKind::ALL` order.
    pub fn anchors(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().filter_map(|s| s.anchor)
    }

    fn holds(&self, guard: Guard, event: &CursorEvent, exists: bool) -> bool {
        match guard {
            Guard::EntityExists => exists,
            Guard::IsCurrent => self.current(event.entity.kind()) == Some(event.entity),
            Guard::Always => true,
        }
    }

    /// Run `event` through the transition table and apply the chosen action.
    ///
    /// `exists` tells whether the entity is present in the current snapshot.
    pub fn apply(&mut self, event: CursorEvent, exists: bool) -> Transition {
        let kind = event.kind();
        let action = TRANSITIONS
            .iter()
            .find(|(k, guard, _)| *k == kind && self.holds(*guard, &event, exists))
            .map_or(Action::Ignore, |(_, _, action)| *action);

        let slot = &mut self.slots[event.entity.kind().slot()];
        let previous = slot.current;
        match action {
            Action::Point => {
                slot.current = Some(event.entity);
                slot.anchor = Some(event.entity);
            }
            Action::Clear => slot.current = None,
            Action::Ignore => {}
        }
        Transition {
            event,
            action,
            previous,
        }
    }

    /// Drop both cursor and anchor of `kind`. Returns the previous anchor.
    pub fn forget(&mut self, kind: CursorKind) -> Option<Entity> {
        let slot = &mut self.slots[kind.slot()];
        slot.current = None;
        slot.anchor.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(layer: usize, column: usize) -> Entity {
        Entity::Clip(ClipCoord::new(layer, column))
    }

    fn select(entity: Entity) -> CursorEvent {
        CursorEvent {
            entity,
            selected: true,
        }
    }

    fn deselect(entity: Entity) -> CursorEvent {
        CursorEvent {
            entity,
            selected: false,
        }
    }

    fn state(index: i64, text: &str) -> ParamValue {
        ParamValue::Choice {
            index,
            text: text.into(),
        }
    }

    #[test]
    fn column_reads_connected_from_index_three() {
        let col = Entity::Column(0);
        assert!(!col.reads_selected(&state(0, "Empty")));
        assert!(!col.reads_selected(&state(1, "Disconnected")));
        assert!(!col.reads_selected(&state(2, "Previewing")));
        assert!(col.reads_selected(&state(3, "Connected")));
        assert!(col.reads_selected(&state(4, "Connected & previewing")));
        assert!(!col.reads_selected(&ParamValue::Scalar(None)));
    }

    #[test]
    fn layer_and_clip_read_a_flag() {
        let on = ParamValue::Scalar(Some(showmirror_core::Value::Bool(true)));
        assert!(Entity::Layer(1).reads_selected(&on));
        assert!(clip(0, 0).reads_selected(&on));
        assert!(!clip(0, 0).reads_selected(&ParamValue::Scalar(None)));
    }

    #[test]
    fn select_points_cursor_and_anchor() {
        let mut state = CursorState::new();
        let t = state.apply(select(clip(0, 1)), true);
        assert_eq!(t.action, Action::Point);
        assert!(t.moved());
        assert_eq!(state.current(CursorKind::Clip), Some(clip(0, 1)));
        assert_eq!(state.anchor(CursorKind::Clip), Some(clip(0, 1)));
    }

    #[test]
    fn select_missing_entity_is_ignored() {
        let mut state = CursorState::new();
        let t = state.apply(select(Entity::Layer(4)), false);
        assert_eq!(t.action, Action::Ignore);
        assert_eq!(state.current(CursorKind::Layer), None);
    }

    #[test]
    fn deselect_current_clears_but_keeps_anchor() {
        let mut state = CursorState::new();
        state.apply(select(Entity::Column(2)), true);
        let t = state.apply(deselect(Entity::Column(2)), true);
        assert_eq!(t.action, Action::Clear);
        assert_eq!(state.current(CursorKind::Column), None);
        assert_eq!(state.anchor(CursorKind::Column), Some(Entity::Column(2)));
    }

    #[test]
    fn stale_deselect_is_ignored() {
        let mut state = CursorState::new();
        state.apply(select(clip(0, 0)), true);
        state.apply(select(clip(1, 0)), true);
        let t = state.apply(deselect(clip(0, 0)), true);
        assert_eq!(t.action, Action::Ignore);
        assert_eq!(state.current(CursorKind::Clip), Some(clip(1, 0)));
    }

    #[test]
    fn reselecting_same_entity_does_not_move() {
        let mut state = CursorState::new();
        state.apply(select(Entity::Layer(1)), true);
        let t = state.apply(select(Entity::Layer(1)), true);
        assert_eq!(t.action, Action::Point);
        assert!(!t.moved());
    }

    #[test]
    fn kinds_are_independent() {
        let mut state = CursorState::new();
        state.apply(select(Entity::Layer(0)), true);
        state.apply(select(clip(0, 0)), true);
        state.apply(deselect(Entity::Layer(0)), true);
        assert_eq!(state.current(CursorKind::Layer), None);
        assert_eq!(state.current(CursorKind::Clip), Some(clip(0, 0)));
        assert_eq!(state.anchors().count(), 2);
    }

    #[test]
    fn forget_drops_anchor() {
        let mut state = CursorState::new();
        state.apply(select(Entity::Layer(3)), true);
        assert_eq!(state.forget(CursorKind::Layer), Some(Entity::Layer(3)));
        assert_eq!(state.anchor(CursorKind::Layer), None);
        assert_eq!(state.current(CursorKind::Layer), None);
    }

    #[test]
    fn every_event_kind_has_a_fallback_row() {
        for kind in [EventKind::Selected, EventKind::Deselected] {
            assert!(
                TRANSITIONS
                    .iter()
                    .any(|(k, g, _)| *k == kind && *g == Guard::Always)
            );
        }
    }
}
