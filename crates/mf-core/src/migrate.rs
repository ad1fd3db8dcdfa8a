// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure, forward-only schema migration v1 → v4 (spec §4.1).
//!
//! No migration step ever mutates its input in place from the caller's
//! perspective — [`migrate_to_latest`] takes `data` by value and returns a
//! new [`MigrationResult`].

use crate::bindpath::unique_sanitized;
use crate::types::{Clip, ProjectData, Take};
use std::collections::HashSet;

/// The outcome of running every applicable migration step.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationResult {
    /// The migrated project, always at schema v4.
    pub data: ProjectData,
    /// The final version (always `4`).
    pub version: u32,
    /// Human-readable labels for each step that actually ran, in order.
    pub applied: Vec<String>,
}

/// Apply every migration step needed to bring `data` to the latest schema.
#[must_use]
pub fn migrate_to_latest(mut data: ProjectData) -> MigrationResult {
    let mut applied = Vec::new();

    if data.version <= 1 {
        migrate_v1_to_v2(&mut data);
        data.version = 2;
        applied.push("v1_to_v2_attach_empty_animation".to_string());
    }
    if data.version <= 2 {
        migrate_v2_to_v3(&mut data);
        data.version = 3;
        applied.push("v2_to_v3_assets_and_main_take".to_string());
    }
    if data.version <= 3 {
        migrate_v3_to_v4(&mut data);
        data.version = 4;
        applied.push("v3_to_v4_derive_bind_paths".to_string());
    }

    MigrationResult {
        data,
        version: 4,
        applied,
    }
}

/// v1 → v2: attach an empty animation clip if none is present.
fn migrate_v1_to_v2(data: &mut ProjectData) {
    if data.animation.is_none() {
        data.animation = Some(Clip {
            duration_seconds: 1.0,
            tracks: Vec::new(),
            takes: None,
        });
    }
}

/// v2 → v3: default `assets`/`modelInstances` to empty, and synthesize a
/// single `take_main` spanning the clip when none is declared and the clip
/// has positive duration.
fn migrate_v2_to_v3(data: &mut ProjectData) {
    if data.assets.is_none() {
        data.assets = Some(Vec::new());
    }
    if data.model_instances.is_none() {
        data.model_instances = Some(Vec::new());
    }
    if let Some(clip) = &mut data.animation
        && clip.takes.is_none()
        && clip.duration_seconds > 0.0
    {
        clip.takes = Some(vec![Take {
            id: "take_main".to_string(),
            name: "Main".to_string(),
            start_time: 0.0,
            end_time: clip.duration_seconds,
        }]);
    }
}

/// v3 → v4: derive a unique, sanitized `bindPath` for every object and
/// instance that lacks one, then mirror it onto animation tracks that
/// reference that object.
fn migrate_v3_to_v4(data: &mut ProjectData) {
    let mut used: HashSet<String> = HashSet::new();
    for obj in &data.objects {
        if let Some(p) = &obj.bind_path {
            used.insert(p.clone());
        }
    }
    if let Some(instances) = &data.model_instances {
        for inst in instances {
            if let Some(p) = &inst.bind_path {
                used.insert(p.clone());
            }
        }
    }

    let mut derived: std::collections::HashMap<String, String> = std::collections::HashMap::new();

    for obj in &mut data.objects {
        if obj.bind_path.is_none() {
            let path = unique_sanitized(&obj.name, &mut used);
            derived.insert(obj.id.clone(), path.clone());
            obj.bind_path = Some(path);
        }
    }
    if let Some(instances) = &mut data.model_instances {
        for inst in instances {
            if inst.bind_path.is_none() {
                let path = unique_sanitized(&inst.name, &mut used);
                derived.insert(inst.id.clone(), path.clone());
                inst.bind_path = Some(path);
            }
        }
    }

    if let Some(clip) = &mut data.animation {
        for track in &mut clip.tracks {
            if track.bind_path.is_none()
                && let Some(path) = derived.get(&track.object_id)
            {
                track.bind_path = Some(path.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeometryType, PrimitiveObject};

    fn object(id: &str, name: &str) -> PrimitiveObject {
        PrimitiveObject {
            id: id.to_string(),
            name: name.to_string(),
            bind_path: None,
            geometry_type: GeometryType::Box,
            color: 0,
            metallic: None,
            roughness: None,
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn v1_migrates_through_all_steps_to_v4() {
        let data = ProjectData {
            version: 1,
            objects: vec![object("obj_1", "Cube One")],
            model_instances: None,
            assets: None,
            camera: None,
            animation: None,
        };
        let result = migrate_to_latest(data);
        assert_eq!(result.version, 4);
        assert_eq!(result.applied.len(), 3);
        assert_eq!(result.data.objects[0].bind_path.as_deref(), Some("Cube_One"));
        assert!(result.data.animation.is_some());
        assert!(result.data.assets.is_some());
        assert!(result.data.model_instances.is_some());
    }

    #[test]
    fn migration_never_mutates_caller_copy() {
        let original = ProjectData {
            version: 1,
            objects: vec![object("obj_1", "Cube")],
            model_instances: None,
            assets: None,
            camera: None,
            animation: None,
        };
        let snapshot = original.clone();
        let _ = migrate_to_latest(original.clone());
        assert_eq!(original, snapshot);
    }

    #[test]
    fn already_v4_project_applies_nothing() {
        let mut data = ProjectData {
            version: 4,
            objects: vec![object("obj_1", "Cube")],
            model_instances: Some(vec![]),
            assets: Some(vec![]),
            camera: None,
            animation: None,
        };
        data.objects[0].bind_path = Some("Cube".to_string());
        let result = migrate_to_latest(data);
        assert!(result.applied.is_empty());
    }

    #[test]
    fn duplicate_names_get_disambiguated() {
        let data = ProjectData {
            version: 1,
            objects: vec![object("obj_1", "Cube!"), object("obj_2", "Cube!")],
            model_instances: None,
            assets: None,
            camera: None,
            animation: None,
        };
        let result = migrate_to_latest(data);
        let p0 = result.data.objects[0].bind_path.clone().unwrap();
        let p1 = result.data.objects[1].bind_path.clone().unwrap();
        assert_ne!(p0, p1);
        assert_eq!(p0, "Cube_");
        assert_eq!(p1, "Cube__2");
    }

    #[test]
    fn synthesizes_main_take_when_duration_positive() {
        let mut data = ProjectData {
            version: 2,
            objects: vec![object("obj_1", "Cube")],
            model_instances: None,
            assets: None,
            camera: None,
            animation: Some(Clip {
                duration_seconds: 2.0,
                tracks: vec![],
                takes: None,
            }),
        };
        data.objects[0].bind_path = Some("Cube".to_string());
        let result = migrate_to_latest(data);
        let takes = result.data.animation.unwrap().takes.unwrap();
        assert_eq!(takes.len(), 1);
        assert_eq!(takes[0].id, "take_main");
        assert_eq!(takes[0].end_time, 2.0);
    }
}
