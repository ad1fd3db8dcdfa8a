// SPDX-License-Identifier: MIT OR Apache-2.0
//! Strict, version-gated validation of [`ProjectData`] (spec §4.1).
//!
//! Every failure carries a human-readable message naming the offending
//! field; the caller wraps it as [`MfErrorCode::InvalidProject`].

use crate::types::{Asset, Clip, ModelInstance, PrimitiveObject, ProjectData, Take, Track};
use mf_error::{MfError, MfErrorCode, MfResult};
use std::collections::HashSet;

const MIN_VERSION: u32 = 1;
const MAX_VERSION: u32 = 4;
const BIND_PATH_CHARS: fn(char) -> bool =
    |c: char| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-';

/// Validate a `bindPath` against `^[A-Za-z0-9._-]+(/[A-Za-z0-9._-]+)*$`.
#[must_use]
pub fn is_valid_bind_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    path.split('/').all(|seg| !seg.is_empty() && seg.chars().all(BIND_PATH_CHARS))
}

fn err(message: impl Into<String>) -> MfError {
    MfError::new(MfErrorCode::InvalidProject, message)
}

/// Strict schema check for the project's declared `version` only.
pub fn validate(data: &ProjectData) -> MfResult<()> {
    if !(MIN_VERSION..=MAX_VERSION).contains(&data.version) {
        return Err(err(format!(
            "version: must be between {MIN_VERSION} and {MAX_VERSION}, got {}",
            data.version
        )));
    }

    if data.version < 2 && data.animation.is_some() {
        return Err(err("animation: not allowed before schema v2"));
    }
    if data.version < 3 {
        if data.assets.is_some() {
            return Err(err("assets: not allowed before schema v3"));
        }
        if data.model_instances.is_some() {
            return Err(err("modelInstances: not allowed before schema v3"));
        }
    }

    validate_objects(&data.objects, data.version)?;

    let mut known_ids: HashSet<&str> = data.objects.iter().map(|o| o.id.as_str()).collect();

    let mut asset_ids: HashSet<&str> = HashSet::new();
    if let Some(assets) = &data.assets {
        validate_assets(assets, &mut asset_ids)?;
    }

    if let Some(instances) = &data.model_instances {
        validate_model_instances(instances, &asset_ids, data.version)?;
        for inst in instances {
            if !known_ids.insert(inst.id.as_str()) {
                return Err(err(format!("modelInstances[{}]: duplicate id '{}'", inst.id, inst.id)));
            }
        }
    }

    if data.version >= 4 {
        validate_unique_bind_paths(data)?;
    }

    if let Some(clip) = &data.animation {
        validate_clip(clip, &known_ids)?;
    }

    Ok(())
}

fn validate_objects(objects: &[PrimitiveObject], version: u32) -> MfResult<()> {
    let mut seen = HashSet::new();
    for (i, obj) in objects.iter().enumerate() {
        if obj.id.is_empty() {
            return Err(err(format!("objects[{i}].id: must not be empty")));
        }
        if !seen.insert(obj.id.as_str()) {
            return Err(err(format!("objects[{i}].id: duplicate id '{}'", obj.id)));
        }
        if obj.color > 0xFF_FFFF {
            return Err(err(format!("objects[{i}].color: must be in [0, 16777215]")));
        }
        validate_unit_interval(obj.metallic, &format!("objects[{i}].metallic"))?;
        validate_unit_interval(obj.roughness, &format!("objects[{i}].roughness"))?;
        validate_finite_triple(&obj.position, &format!("objects[{i}].position"))?;
        validate_finite_triple(&obj.rotation, &format!("objects[{i}].rotation"))?;
        validate_finite_triple(&obj.scale, &format!("objects[{i}].scale"))?;

        if version >= 4 {
            match &obj.bind_path {
                Some(p) if is_valid_bind_path(p) => {}
                Some(p) => return Err(err(format!("objects[{i}].bindPath: invalid format '{p}'"))),
                None => return Err(err(format!("objects[{i}].bindPath: required at schema v4"))),
            }
        } else if let Some(p) = &obj.bind_path
            && !is_valid_bind_path(p)
        {
            return Err(err(format!("objects[{i}].bindPath: invalid format '{p}'")));
        }
    }
    Ok(())
}

fn validate_model_instances(
    instances: &[ModelInstance],
    asset_ids: &HashSet<&str>,
    version: u32,
) -> MfResult<()> {
    let mut seen = HashSet::new();
    for (i, inst) in instances.iter().enumerate() {
        if inst.id.is_empty() {
            return Err(err(format!("modelInstances[{i}].id: must not be empty")));
        }
        if !seen.insert(inst.id.as_str()) {
            return Err(err(format!("modelInstances[{i}].id: duplicate id '{}'", inst.id)));
        }
        if !asset_ids.contains(inst.asset_id.as_str()) {
            return Err(err(format!(
                "modelInstances[{i}].assetId: references unknown asset '{}'",
                inst.asset_id
            )));
        }
        validate_finite_triple(&inst.position, &format!("modelInstances[{i}].position"))?;
        validate_finite_triple(&inst.rotation, &format!("modelInstances[{i}].rotation"))?;
        validate_finite_triple(&inst.scale, &format!("modelInstances[{i}].scale"))?;

        if let Some(overrides) = &inst.material_overrides {
            for (j, mo) in overrides.iter().enumerate() {
                if mo.color > 0xFF_FFFF {
                    return Err(err(format!(
                        "modelInstances[{i}].materialOverrides[{j}].color: must be in [0, 16777215]"
                    )));
                }
                validate_unit_interval(Some(mo.metallic), &format!("modelInstances[{i}].materialOverrides[{j}].metallic"))?;
                validate_unit_interval(Some(mo.roughness), &format!("modelInstances[{i}].materialOverrides[{j}].roughness"))?;
            }
        }

        if version >= 4 {
            match &inst.bind_path {
                Some(p) if is_valid_bind_path(p) => {}
                Some(p) => return Err(err(format!("modelInstances[{i}].bindPath: invalid format '{p}'"))),
                None => return Err(err(format!("modelInstances[{i}].bindPath: required at schema v4"))),
            }
        }
    }
    Ok(())
}

fn validate_assets<'a>(assets: &'a [Asset], asset_ids: &mut HashSet<&'a str>) -> MfResult<()> {
    for (i, asset) in assets.iter().enumerate() {
        if asset.id.is_empty() {
            return Err(err(format!("assets[{i}].id: must not be empty")));
        }
        if !asset_ids.insert(asset.id.as_str()) {
            return Err(err(format!("assets[{i}].id: duplicate id '{}'", asset.id)));
        }
        // size is u64, so the ">= 0" constraint is upheld by the type itself.
        let _ = asset.size;
    }
    Ok(())
}

fn validate_unique_bind_paths(data: &ProjectData) -> MfResult<()> {
    let mut seen = HashSet::new();
    for obj in &data.objects {
        if let Some(p) = &obj.bind_path
            && !seen.insert(p.as_str())
        {
            return Err(err(format!("bindPath: duplicate path '{p}'")));
        }
    }
    if let Some(instances) = &data.model_instances {
        for inst in instances {
            if let Some(p) = &inst.bind_path
                && !seen.insert(p.as_str())
            {
                return Err(err(format!("bindPath: duplicate path '{p}'")));
            }
        }
    }
    Ok(())
}

fn validate_clip(clip: &Clip, known_ids: &HashSet<&str>) -> MfResult<()> {
    if !clip.duration_seconds.is_finite() || clip.duration_seconds <= 0.0 {
        return Err(err("animation.durationSeconds: must be finite and > 0"));
    }

    let mut track_keys = HashSet::new();
    for (i, track) in clip.tracks.iter().enumerate() {
        if !known_ids.contains(track.object_id.as_str()) {
            return Err(err(format!(
                "animation.tracks[{i}].objectId: references unknown object '{}'",
                track.object_id
            )));
        }
        if !track_keys.insert((track.object_id.as_str(), track.property)) {
            return Err(err(format!(
                "animation.tracks[{i}]: duplicate track for ({}, {})",
                track.object_id,
                track.property.as_str()
            )));
        }
        if let Some(p) = &track.bind_path
            && !is_valid_bind_path(p)
        {
            return Err(err(format!("animation.tracks[{i}].bindPath: invalid format '{p}'")));
        }
        validate_track_keyframes(track, clip.duration_seconds, i)?;
    }

    if let Some(takes) = &clip.takes {
        validate_takes(takes, clip.duration_seconds)?;
    }
    Ok(())
}

fn validate_track_keyframes(track: &Track, duration: f64, track_idx: usize) -> MfResult<()> {
    let mut prev_time: Option<f64> = None;
    for (j, kf) in track.keyframes.iter().enumerate() {
        if !kf.time.is_finite() || kf.time < 0.0 || kf.time > duration {
            return Err(err(format!(
                "animation.tracks[{track_idx}].keyframes[{j}].time: must be within [0, {duration}]"
            )));
        }
        if !kf.value.is_finite() {
            return Err(err(format!(
                "animation.tracks[{track_idx}].keyframes[{j}].value: must be finite"
            )));
        }
        if let Some(prev) = prev_time
            && kf.time <= prev
        {
            return Err(err(format!(
                "animation.tracks[{track_idx}].keyframes[{j}].time: must strictly increase over the previous keyframe"
            )));
        }
        prev_time = Some(kf.time);
    }
    Ok(())
}

fn validate_takes(takes: &[Take], duration: f64) -> MfResult<()> {
    let mut ids = HashSet::new();
    for (i, take) in takes.iter().enumerate() {
        if !ids.insert(take.id.as_str()) {
            return Err(err(format!("animation.takes[{i}].id: duplicate id '{}'", take.id)));
        }
        if !(take.start_time.is_finite()
            && take.end_time.is_finite()
            && take.start_time >= 0.0
            && take.start_time < take.end_time
            && take.end_time <= duration)
        {
            return Err(err(format!(
                "animation.takes[{i}]: requires 0 <= startTime < endTime <= durationSeconds"
            )));
        }
    }
    Ok(())
}

fn validate_unit_interval(v: Option<f64>, field: &str) -> MfResult<()> {
    if let Some(v) = v
        && !(v.is_finite() && (0.0..=1.0).contains(&v))
    {
        return Err(err(format!("{field}: must be in [0, 1]")));
    }
    Ok(())
}

fn validate_finite_triple(triple: &[f64; 3], field: &str) -> MfResult<()> {
    if triple.iter().any(|v| !v.is_finite()) {
        return Err(err(format!("{field}: all three components must be finite")));
    }
    Ok(())
}
