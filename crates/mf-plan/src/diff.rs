// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural diffing between two [`ProjectData`] snapshots, used by the
//! plan layer's preview (spec §4.5 `plan.preview`).
//!
//! The diff only reports *what changed*, never full before/after values: a
//! preview is meant to be skimmed, not replayed.

use mf_core::{PrimitiveObject, Property, ProjectData, Track};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Per-object transform changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDiff {
    /// The object id.
    pub id: String,
    /// Which of `name`/`position`/`rotation`/`scale` differ, sorted.
    pub changed: Vec<&'static str>,
}

/// Per-object animation changes, aggregated across its tracks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationObjectDiff {
    /// The animated object id.
    pub object_id: String,
    /// Count of `(time, value, interpolation)` keyframes present only after.
    pub keyframes_added: usize,
    /// Count of keyframes present only before.
    pub keyframes_deleted: usize,
    /// `min(added, deleted)`: keyframes that look like they moved rather
    /// than were independently added and removed.
    pub keyframes_moved: usize,
    /// Property paths (e.g. `position.y`) whose track changed at all.
    pub tracks: Vec<&'static str>,
}

/// Per-object material changes (`PrimitiveObject` color/metallic/roughness
/// only — `ModelInstance` overrides are a separate, coarser concern).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDiff {
    /// The object id.
    pub id: String,
    /// Which of `baseColor`/`metallic`/`roughness` differ, sorted.
    pub changed: Vec<&'static str>,
}

/// The full structural diff between two project snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StructuralDiff {
    /// Objects present in both snapshots whose transform differs.
    pub objects: Vec<ObjectDiff>,
    /// Objects whose animation tracks differ.
    pub animation: Vec<AnimationObjectDiff>,
    /// Objects whose material differs.
    pub material: Vec<MaterialDiff>,
}

/// Compute the structural diff of `after` relative to `before`.
#[must_use]
pub fn compute_diff(before: &ProjectData, after: &ProjectData) -> StructuralDiff {
    StructuralDiff {
        objects: diff_objects(before, after),
        animation: diff_animation(before, after),
        material: diff_material(before, after),
    }
}

fn by_id(objects: &[PrimitiveObject]) -> BTreeMap<&str, &PrimitiveObject> {
    objects.iter().map(|o| (o.id.as_str(), o)).collect()
}

fn diff_objects(before: &ProjectData, after: &ProjectData) -> Vec<ObjectDiff> {
    let before_map = by_id(&before.objects);
    let after_map = by_id(&after.objects);
    let mut diffs = Vec::new();
    for (id, b) in &before_map {
        let Some(a) = after_map.get(id) else { continue };
        let mut changed = Vec::new();
        if b.name != a.name {
            changed.push("name");
        }
        if b.position != a.position {
            changed.push("position");
        }
        if b.rotation != a.rotation {
            changed.push("rotation");
        }
        if b.scale != a.scale {
            changed.push("scale");
        }
        if !changed.is_empty() {
            diffs.push(ObjectDiff { id: (*id).to_string(), changed });
        }
    }
    diffs.sort_by(|a, b| a.id.cmp(&b.id));
    diffs
}

fn diff_material(before: &ProjectData, after: &ProjectData) -> Vec<MaterialDiff> {
    let before_map = by_id(&before.objects);
    let after_map = by_id(&after.objects);
    let mut diffs = Vec::new();
    for (id, b) in &before_map {
        let Some(a) = after_map.get(id) else { continue };
        let mut changed = Vec::new();
        if b.color != a.color {
            changed.push("baseColor");
        }
        if b.metallic != a.metallic {
            changed.push("metallic");
        }
        if b.roughness != a.roughness {
            changed.push("roughness");
        }
        if !changed.is_empty() {
            diffs.push(MaterialDiff { id: (*id).to_string(), changed });
        }
    }
    diffs.sort_by(|a, b| a.id.cmp(&b.id));
    diffs
}

/// `(time-bits, value-bits, interpolation)`, used as an exact-match key so a
/// keyframe that merely changed value (not time) still counts as one
/// deletion plus one addition rather than a silent no-op.
fn keyframe_key(kf: &mf_core::Keyframe) -> (u64, u64, mf_core::Interpolation) {
    (kf.time.to_bits(), kf.value.to_bits(), kf.interpolation)
}

fn tracks_by_object_property(tracks: &[Track]) -> BTreeMap<(&str, Property), &Track> {
    tracks.iter().map(|t| ((t.object_id.as_str(), t.property), t)).collect()
}

fn diff_animation(before: &ProjectData, after: &ProjectData) -> Vec<AnimationObjectDiff> {
    let empty = Vec::new();
    let before_tracks = before.animation.as_ref().map_or(&empty, |c| &c.tracks);
    let after_tracks = after.animation.as_ref().map_or(&empty, |c| &c.tracks);
    let before_map = tracks_by_object_property(before_tracks);
    let after_map = tracks_by_object_property(after_tracks);

    let mut per_object: BTreeMap<&str, (usize, usize, BTreeSet<&'static str>)> = BTreeMap::new();
    let all_keys: BTreeSet<(&str, Property)> = before_map.keys().chain(after_map.keys()).copied().collect();

    for (object_id, property) in all_keys {
        let before_keys: BTreeSet<_> = before_map.get(&(object_id, property)).map_or_else(BTreeSet::new, |t| t.keyframes.iter().map(keyframe_key).collect());
        let after_keys: BTreeSet<_> = after_map.get(&(object_id, property)).map_or_else(BTreeSet::new, |t| t.keyframes.iter().map(keyframe_key).collect());
        if before_keys == after_keys {
            continue;
        }
        let added = after_keys.difference(&before_keys).count();
        let deleted = before_keys.difference(&after_keys).count();
        let entry = per_object.entry(object_id).or_insert((0, 0, BTreeSet::new()));
        entry.0 += added;
        entry.1 += deleted;
        entry.2.insert(property.as_str());
    }

    per_object
        .into_iter()
        .map(|(object_id, (added, deleted, tracks))| AnimationObjectDiff {
            object_id: object_id.to_string(),
            keyframes_added: added,
            keyframes_deleted: deleted,
            keyframes_moved: added.min(deleted),
            tracks: tracks.into_iter().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_core::{Clip, GeometryType, Interpolation, Keyframe};

    fn object(id: &str, position: [f64; 3]) -> PrimitiveObject {
        PrimitiveObject {
            id: id.to_string(),
            name: "Cube".to_string(),
            bind_path: Some("Cube".to_string()),
            geometry_type: GeometryType::Box,
            color: 0xff_00_00,
            metallic: Some(0.0),
            roughness: Some(0.5),
            position,
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }

    fn project(objects: Vec<PrimitiveObject>, clip: Option<Clip>) -> ProjectData {
        ProjectData { version: 4, objects, model_instances: None, assets: None, camera: None, animation: clip }
    }

    #[test]
    fn no_changes_yields_empty_diff() {
        let p = project(vec![object("obj_1", [0.0, 0.0, 0.0])], None);
        let diff = compute_diff(&p, &p);
        assert_eq!(diff, StructuralDiff::default());
    }

    #[test]
    fn position_change_is_reported() {
        let before = project(vec![object("obj_1", [0.0, 0.0, 0.0])], None);
        let after = project(vec![object("obj_1", [1.0, 0.0, 0.0])], None);
        let diff = compute_diff(&before, &after);
        assert_eq!(diff.objects, vec![ObjectDiff { id: "obj_1".to_string(), changed: vec!["position"] }]);
    }

    #[test]
    fn color_change_is_a_material_diff() {
        let mut after_obj = object("obj_1", [0.0, 0.0, 0.0]);
        after_obj.color = 0x00_ff_00;
        let before = project(vec![object("obj_1", [0.0, 0.0, 0.0])], None);
        let after = project(vec![after_obj], None);
        let diff = compute_diff(&before, &after);
        assert_eq!(diff.material, vec![MaterialDiff { id: "obj_1".to_string(), changed: vec!["baseColor"] }]);
    }

    #[test]
    fn inserted_keyframes_count_as_additions() {
        let before = project(vec![object("obj_1", [0.0, 0.0, 0.0])], None);
        let clip = Clip {
            duration_seconds: 1.0,
            tracks: vec![Track {
                object_id: "obj_1".to_string(),
                property: Property::PositionY,
                bind_path: None,
                keyframes: vec![
                    Keyframe { time: 0.0, value: 0.0, interpolation: Interpolation::Linear },
                    Keyframe { time: 1.0, value: 1.0, interpolation: Interpolation::Linear },
                ],
            }],
            takes: None,
        };
        let after = project(vec![object("obj_1", [0.0, 0.0, 0.0])], Some(clip));
        let diff = compute_diff(&before, &after);
        assert_eq!(diff.animation.len(), 1);
        assert_eq!(diff.animation[0].keyframes_added, 2);
        assert_eq!(diff.animation[0].keyframes_deleted, 0);
        assert_eq!(diff.animation[0].tracks, vec!["position.y"]);
    }

    #[test]
    fn value_only_change_counts_as_one_add_and_one_delete() {
        let track_with = |value: f64| Track {
            object_id: "obj_1".to_string(),
            property: Property::PositionY,
            bind_path: None,
            keyframes: vec![Keyframe { time: 0.0, value, interpolation: Interpolation::Linear }],
        };
        let before = project(
            vec![object("obj_1", [0.0, 0.0, 0.0])],
            Some(Clip { duration_seconds: 1.0, tracks: vec![track_with(1.0)], takes: None }),
        );
        let after = project(
            vec![object("obj_1", [0.0, 0.0, 0.0])],
            Some(Clip { duration_seconds: 1.0, tracks: vec![track_with(2.0)], takes: None }),
        );
        let diff = compute_diff(&before, &after);
        assert_eq!(diff.animation[0].keyframes_added, 1);
        assert_eq!(diff.animation[0].keyframes_deleted, 1);
        assert_eq!(diff.animation[0].keyframes_moved, 1);
    }
}
