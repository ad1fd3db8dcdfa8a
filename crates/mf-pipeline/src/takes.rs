// SPDX-License-Identifier: MIT OR Apache-2.0
//! Target and take resolution for `make_bundle` (spec §4.8 steps 3-4).

use std::collections::HashSet;

use mf_core::ProjectData;
use mf_error::{MfError, MfErrorCode, MfResult};

/// Caller-supplied target hint: an object/instance id or, failing that, a
/// case-insensitive name (spec §4.8 step 3).
#[derive(Debug, Clone, PartialEq, serde::Deserialize, schemars::JsonSchema)]
pub struct TargetSelector {
    /// The id or name to resolve.
    pub select: String,
}

/// One requested or derived take on the pipeline's final absolute timeline.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TakeSpec {
    /// Take name.
    pub name: String,
    /// Inclusive start time, in seconds.
    pub start_time: f64,
    /// Exclusive end time, in seconds.
    pub end_time: f64,
}

/// Resolve the pipeline's target object: `target.select` as an id, then as
/// a unique case-insensitive name, else the first (sorted) primitive, else
/// the first model instance, else `MF_ERR_NO_OBJECTS` (spec §4.8 step 3).
///
/// # Errors
///
/// [`MfErrorCode::NotFound`]/[`MfErrorCode::AmbiguousName`] if `target` was
/// supplied but does not resolve; [`MfErrorCode::NoObjects`] if the project
/// has nothing to target and no `target` was supplied.
pub fn resolve_target(data: &ProjectData, target: Option<&TargetSelector>) -> MfResult<String> {
    if let Some(selector) = target {
        let needle = &selector.select;
        if data.objects.iter().any(|o| &o.id == needle) || data.model_instances.iter().flatten().any(|m| &m.id == needle) {
            return Ok(needle.clone());
        }
        let matches: Vec<&str> = data
            .objects
            .iter()
            .filter(|o| o.name.eq_ignore_ascii_case(needle))
            .map(|o| o.id.as_str())
            .chain(data.model_instances.iter().flatten().filter(|m| m.name.eq_ignore_ascii_case(needle)).map(|m| m.id.as_str()))
            .collect();
        return match matches.as_slice() {
            [] => Err(MfError::new(MfErrorCode::NotFound, format!("no object or instance named or id'd '{needle}'")).with_context("select", needle.clone())),
            [single] => Ok((*single).to_string()),
            _ => Err(MfError::new(MfErrorCode::AmbiguousName, format!("'{needle}' matches more than one object by name")).with_context("select", needle.clone())),
        };
    }

    if let Some(first) = data.objects.first() {
        return Ok(first.id.clone());
    }
    if let Some(first) = data.model_instances.iter().flatten().next() {
        return Ok(first.id.clone());
    }
    Err(MfError::new(MfErrorCode::NoObjects, "project has no objects or model instances to target"))
}

/// `(keyword, take name, duration)` triples scanned against the goal text,
/// in the fixed order the spec's scenario enumerates them.
const GOAL_KEYWORDS: &[(&str, &str, f64)] = &[("idle", "Idle", 2.0), ("recoil", "Recoil", 0.4), ("turn", "Turn", 1.0)];

/// Derive the take list: `explicit` if the caller supplied one, else one
/// take per keyword `goal` mentions (placed back-to-back in keyword order),
/// else a single `Main` take spanning `[0, base_duration]` (spec §4.8 step 4).
#[must_use]
pub fn derive_takes(goal: &str, explicit: Option<&[TakeSpec]>, base_duration: f64) -> Vec<TakeSpec> {
    if let Some(takes) = explicit {
        return takes.to_vec();
    }

    let lower = goal.to_lowercase();
    let mut cursor = 0.0;
    let mut takes = Vec::new();
    for (keyword, name, duration) in GOAL_KEYWORDS {
        if lower.contains(keyword) {
            takes.push(TakeSpec { name: (*name).to_string(), start_time: cursor, end_time: cursor + duration });
            cursor += duration;
        }
    }

    if takes.is_empty() {
        takes.push(TakeSpec { name: "Main".to_string(), start_time: 0.0, end_time: base_duration.max(0.1) });
    }
    takes
}

/// A sub-goal for `generate_script` to drive this take's keyframes: the
/// take's own name if it names a recognized recipe, else the pipeline's
/// overall goal text.
#[must_use]
pub fn sub_goal_for_take(take_name: &str, fallback_goal: &str) -> String {
    let lower = take_name.to_lowercase();
    const RECIPE_WORDS: &[&str] = &["idle", "recoil", "turn", "bounce", "camera", "anticipation"];
    if RECIPE_WORDS.iter().any(|w| lower.contains(w)) {
        lower
    } else {
        fallback_goal.to_string()
    }
}

/// Fill in any missing `bindPath` on objects and model instances,
/// deterministically, from each one's `name` (spec §4.8 step 8: "Unity
/// variant... bindPath normalization pass"). Existing paths are left
/// untouched and counted toward uniqueness.
pub fn normalize_bind_paths(data: &mut ProjectData) {
    let mut used: HashSet<String> = data.objects.iter().filter_map(|o| o.bind_path.clone()).collect();
    used.extend(data.model_instances.iter().flatten().filter_map(|m| m.bind_path.clone()));

    for object in &mut data.objects {
        if object.bind_path.is_none() {
            object.bind_path = Some(mf_core::unique_sanitized(&object.name, &mut used));
        }
    }
    if let Some(instances) = &mut data.model_instances {
        for instance in instances {
            if instance.bind_path.is_none() {
                instance.bind_path = Some(mf_core::unique_sanitized(&instance.name, &mut used));
            }
        }
    }
}
