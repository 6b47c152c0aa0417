#![forbid(unsafe_code)]

//! Desired key lists built from a composition snapshot.
//!
//! [`full_desired`] walks the whole snapshot and is fed to a full
//! reconciliation. [`family`] builds the `selected_*`/`connected_column_*`
//! keys of one entity and is fed to a partial reconciliation when a cursor
//! moves. Indices in key names are 0-based.

use crate::composition::{Clip, Composition, Layer, Parameter};
use crate::cursor::{ClipCoord, CursorKind, CursorState, Entity};
use crate::descriptor::{Descriptor, ValueFormat};
use showmirror_core::{ParamId, Value};

fn sourced(
    key: impl Into<String>,
    label: impl Into<String>,
    param: Option<&Parameter>,
) -> Descriptor {
    Descriptor::new(key, label).source(param)
}

/// A key mirroring a static numeric id: subscribed to it, seeded with it.
fn id_key(key: impl Into<String>, label: impl Into<String>, id: Option<ParamId>) -> Descriptor {
    let descriptor = Descriptor::new(key, label).reference(id);
    match id {
        Some(id) => descriptor.initial(id),
        None => descriptor,
    }
}

/// Output keys written by the cursor of `kind`, with labels.
#[must_use]
pub fn cursor_keys(kind: CursorKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        CursorKind::Layer => &[
            ("selected_layer", "Selected Layer"),
            ("selected_layer_id", "Selected Layer ID"),
        ],
        CursorKind::Clip => &[
            ("selected_clip_layer", "Selected Clip Layer"),
            ("selected_clip_column", "Selected Clip Column"),
            ("selected_clip_id", "Selected Clip ID"),
        ],
        CursorKind::Column => &[
            ("connected_column", "Connected Column"),
            ("connected_column_id", "Connected Column ID"),
        ],
    }
}

/// Values of the cursor keys of `kind` when pointing at `entity`.
///
/// `None` (or an entity of another kind) yields unset values for every key.
#[must_use]
pub fn cursor_values(
    composition: &Composition,
    kind: CursorKind,
    entity: Option<Entity>,
) -> Vec<(&'static str, Option<Value>)> {
    let values: Vec<Option<Value>> = match (kind, entity) {
        (CursorKind::Layer, Some(Entity::Layer(l))) => vec![
            Some(Value::from(l)),
            composition.layer(l).and_then(|layer| layer.id).map(Value::from),
        ],
        (CursorKind::Clip, Some(Entity::Clip(at))) => vec![
            Some(Value::from(at.layer)),
            Some(Value::from(at.column)),
            composition.clip(at).and_then(|clip| clip.id).map(Value::from),
        ],
        (CursorKind::Column, Some(Entity::Column(c))) => vec![
            Some(Value::from(c)),
            composition.column(c).and_then(|col| col.id).map(Value::from),
        ],
        _ => vec![None; cursor_keys(kind).len()],
    };
    cursor_keys(kind)
        .iter()
        .map(|(key, _)| *key)
        .zip(values)
        .collect()
}

/// The `selected_*` (or `connected_column_*`) family of one entity.
///
/// Keys are always produced; parameters missing from the snapshot leave
/// their keys detached so a previous entity's values get cleared.
#[must_use]
pub fn family(composition: &Composition, entity: Entity) -> Vec<Descriptor> {
    match entity {
        Entity::Clip(at) => clip_family(composition.clip(at)),
        Entity::Layer(l) => {
            let layer = composition.layer(l);
            let param = |pick: fn(&Layer) -> Option<&Parameter>| layer.and_then(pick);
            vec![
                sourced("selected_layer_name", "Selected Layer Name", param(|x| x.name.as_ref())),
                sourced(
                    "selected_layer_bypassed",
                    "Selected Layer Bypassed",
                    param(|x| x.bypassed.as_ref()),
                ),
                sourced("selected_layer_solo", "Selected Layer Solo", param(|x| x.solo.as_ref())),
                sourced(
                    "selected_layer_master",
                    "Selected Layer Master",
                    param(|x| x.master.as_ref()),
                ),
                sourced(
                    "selected_layer_video_opacity",
                    "Selected Layer Opacity",
                    param(|x| x.video.opacity.as_ref()),
                ),
                sourced(
                    "selected_layer_audio_volume",
                    "Selected Layer Audio Volume",
                    param(|x| x.audio.volume.as_ref()),
                ),
                sourced(
                    "selected_layer_video_blend_mode",
                    "Selected Layer Blend Mode",
                    param(|x| x.video.mixer.blend_mode.as_ref()),
                ),
            ]
        }
        Entity::Column(c) => {
            let column = composition.column(c);
            vec![sourced(
                "connected_column_name",
                "Connected Column Name",
                column.and_then(|x| x.name.as_ref()),
            )]
        }
    }
}

fn clip_family(clip: Option<&Clip>) -> Vec<Descriptor> {
    let transport = clip.and_then(|c| c.transport.as_ref());
    let position = transport.and_then(|t| t.position.as_ref());
    let controls = transport.and_then(|t| t.controls.as_ref());
    let duration = controls.and_then(|c| c.duration.as_ref());
    vec![
        sourced("selected_clip_name", "Selected Clip Name", clip.and_then(|c| c.name.as_ref())),
        sourced(
            "selected_clip_connected",
            "Selected Clip Connected",
            clip.and_then(|c| c.connected.as_ref()),
        ),
        sourced(
            "selected_clip_ignorecolumntrigger",
            "Selected Clip Ignore Column Trigger",
            clip.and_then(|c| c.ignorecolumntrigger.as_ref()),
        ),
        sourced("selected_clip_transport_position", "Selected Clip Play Head", position),
        sourced("selected_clip_transport_position_time", "Selected Clip Play Head (time)", position)
            .format(ValueFormat::MILLIS),
        sourced(
            "selected_clip_transport_playdirection",
            "Selected Clip Play Direction",
            controls.and_then(|c| c.playdirection.as_ref()),
        ),
        sourced(
            "selected_clip_transport_playmode",
            "Selected Clip Play Mode",
            controls.and_then(|c| c.playmode.as_ref()),
        ),
        sourced(
            "selected_clip_transport_playmodeaway",
            "Selected Clip Play Mode Away",
            controls.and_then(|c| c.playmodeaway.as_ref()),
        ),
        sourced("selected_clip_transport_duration", "Selected Clip Duration", duration),
        sourced("selected_clip_transport_duration_time", "Selected Clip Duration (time)", duration)
            .format(ValueFormat::SECONDS),
        sourced(
            "selected_clip_video_resize",
            "Selected Clip Resize",
            clip.and_then(|c| c.video.as_ref()).and_then(|v| v.resize.as_ref()),
        ),
    ]
}

fn clip_keys(out: &mut Vec<Descriptor>, layer: usize, column: usize, clip: &Clip) {
    let key = |suffix: &str| format!("layer_{layer}_clip_{column}_{suffix}");
    let label = |what: &str| format!("Layer {layer} Clip {column} {what}");
    let entity = Entity::Clip(ClipCoord::new(layer, column));

    if clip.is_empty_slot() {
        // Tracked only for selection; an empty slot has nothing to show.
        out.push(
            Descriptor::new(key("selected"), label("Selected"))
                .reference(clip.selected.as_ref().map(|p| p.id))
                .hook(entity)
                .ignored(),
        );
        return;
    }

    out.push(id_key(key("id"), label("ID"), clip.id));
    out.push(sourced(key("name"), label("Name"), clip.name.as_ref()));
    out.push(sourced(key("selected"), label("Selected"), clip.selected.as_ref()).hook(entity));
    out.push(sourced(key("connected"), label("Connected"), clip.connected.as_ref()));
    out.push(sourced(
        key("ignorecolumntrigger"),
        label("Ignore Column Trigger"),
        clip.ignorecolumntrigger.as_ref(),
    ));
    if let Some(transport) = &clip.transport {
        if let Some(position) = &transport.position {
            out.push(sourced(key("transport_position"), label("Play Head"), Some(position)));
            out.push(
                sourced(key("transport_position_time"), label("Play Head (time)"), Some(position))
                    .format(ValueFormat::MILLIS),
            );
        }
        if let Some(controls) = &transport.controls {
            out.push(sourced(
                key("transport_playdirection"),
                label("Play Direction"),
                controls.playdirection.as_ref(),
            ));
            out.push(sourced(
                key("transport_playmode"),
                label("Play Mode"),
                controls.playmode.as_ref(),
            ));
            out.push(sourced(
                key("transport_playmodeaway"),
                label("Play Mode Away"),
                controls.playmodeaway.as_ref(),
            ));
            if let Some(duration) = &controls.duration {
                out.push(sourced(key("transport_duration"), label("Duration"), Some(duration)));
                out.push(
                    sourced(
                        key("transport_duration_time"),
                        label("Duration (time)"),
                        Some(duration),
                    )
                    .format(ValueFormat::SECONDS),
                );
            }
        }
    }
    if let Some(resize) = clip.video.as_ref().and_then(|v| v.resize.as_ref()) {
        out.push(sourced(key("video_resize"), label("Resize"), Some(resize)));
    }
}

/// Every desired key for `composition`, plus the families of the anchored
/// entities in `cursor`.
#[must_use]
pub fn full_desired(composition: &Composition, cursor: &CursorState) -> Vec<Descriptor> {
    let mut out: Vec<Descriptor> = CursorKind::ALL
        .iter()
        .flat_map(|kind| cursor_keys(*kind))
        .map(|(key, label)| Descriptor::new(*key, *label))
        .collect();

    out.push(sourced("composition_name", "Composition Name", composition.name.as_ref()));
    out.push(sourced("composition_master", "Composition Master", composition.master.as_ref()));
    out.push(sourced("composition_speed", "Composition Speed", composition.speed.as_ref()));
    out.push(sourced(
        "composition_audio_volume",
        "Composition Audio Volume",
        composition.audio.volume.as_ref(),
    ));
    out.push(sourced(
        "composition_audio_pan",
        "Composition Audio Pan",
        composition.audio.pan.as_ref(),
    ));
    out.push(sourced(
        "composition_video_opacity",
        "Composition Opacity",
        composition.video.opacity.as_ref(),
    ));

    for (i, layer) in composition.layers.iter().enumerate() {
        let key = |suffix: &str| format!("layer_{i}_{suffix}");
        let label = |what: &str| format!("Layer {i} {what}");
        out.push(id_key(key("id"), label("ID"), layer.id));
        out.push(sourced(key("name"), label("Name"), layer.name.as_ref()));
        out.push(
            sourced(key("selected"), label("Selected"), layer.selected.as_ref())
                .hook(Entity::Layer(i)),
        );
        out.push(sourced(key("bypassed"), label("Bypassed"), layer.bypassed.as_ref()));
        out.push(sourced(key("solo"), label("Solo"), layer.solo.as_ref()));
        out.push(sourced(key("master"), label("Master"), layer.master.as_ref()));
        out.push(sourced(
            key("ignorecolumntrigger"),
            label("Ignore Column Trigger"),
            layer.ignorecolumntrigger.as_ref(),
        ));
        out.push(sourced(key("audio_volume"), label("Audio Volume"), layer.audio.volume.as_ref()));
        out.push(sourced(key("audio_pan"), label("Audio Pan"), layer.audio.pan.as_ref()));
        out.push(sourced(
            key("video_blend_mode"),
            label("Blend Mode"),
            layer.video.mixer.blend_mode.as_ref(),
        ));
        out.push(sourced(key("video_opacity"), label("Opacity"), layer.video.opacity.as_ref()));
        out.push(sourced(key("video_autosize"), label("Autosize"), layer.video.autosize.as_ref()));
        out.push(sourced(
            key("transition_duration"),
            label("Transition Duration"),
            layer.transition.duration.as_ref(),
        ));
        out.push(sourced(
            key("transition_blend_mode"),
            label("Transition Blend Mode"),
            layer.transition.blend_mode.as_ref(),
        ));

        for (j, clip) in layer.clips.iter().enumerate() {
            clip_keys(&mut out, i, j, clip);
        }
    }

    for (i, column) in composition.columns.iter().enumerate() {
        out.push(id_key(format!("column_{i}_id"), format!("Column {i} ID"), column.id));
        out.push(sourced(
            format!("column_{i}_name"),
            format!("Column {i} Name"),
            column.name.as_ref(),
        ));
        out.push(
            sourced(
                format!("column_{i}_connected"),
                format!("Column {i} Connected"),
                column.connected.as_ref(),
            )
            .hook(Entity::Column(i)),
        );
    }

    for anchor in cursor.anchors() {
        if composition.contains(anchor) {
            out.extend(family(composition, anchor));
        }
    }

    out
}
