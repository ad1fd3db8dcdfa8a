// SPDX-License-Identifier: MIT OR Apache-2.0
//! Target resolution and plan step generation (spec §4.5 `plan.generate`).

use crate::recipes::{style_multiplier, Recipe};
use crate::{Constraints, Plan, PlanSafety, PlanStep, PlanSummary, StepCommand, StepType};
use mf_core::{Property, ProjectData};
use mf_error::{MfError, MfErrorCode, MfResult};
use mf_runtime::{Runtime, Scope};
use serde_json::json;

const MIN_DURATION_SECONDS: f64 = 0.1;
const MAX_DURATION_SECONDS: f64 = 30.0;
const CONFIRM_KEYFRAME_THRESHOLD: usize = 24;

/// Generate a [`Plan`] for `goal` against the project at `scope`, honoring
/// `constraints` (target selection, style, loop, duration override).
///
/// # Errors
///
/// - [`MfErrorCode::UnsupportedGoal`] if no recipe's trigger phrase matches `goal`.
/// - [`MfErrorCode::InvalidConstraints`] if `constraints` is self-contradictory
///   (e.g. a non-finite or non-positive `durationSeconds`).
/// - [`MfErrorCode::NoTargetObject`] if target resolution yields no objects.
pub fn generate(runtime: &Runtime, scope: Scope, goal: &str, constraints: &Constraints) -> MfResult<Plan> {
    let recipe = Recipe::resolve(goal)
        .ok_or_else(|| MfError::new(MfErrorCode::UnsupportedGoal, format!("no recipe recognizes goal '{goal}'")).with_context("goal", goal))?;
    validate_constraints(constraints)?;

    let base_project_json = runtime.project_json_at_scope(scope)?;
    let base_data: ProjectData = serde_json::from_str(&base_project_json)
        .map_err(|e| MfError::new(MfErrorCode::InvalidProject, format!("frozen base project failed to parse: {e}")))?;

    let selected_id = match scope {
        Scope::Current => runtime.current().selected_object_id.clone(),
        Scope::Staged => runtime.staged().and_then(|s| s.selected_object_id.clone()),
    };
    let targets = resolve_targets(&base_data, recipe, constraints, selected_id.as_deref())?;
    let duration_sec = compute_duration(recipe, constraints);
    let style_mult = style_multiplier(constraints.style.as_deref());

    let mut records = Vec::new();
    for object_id in &targets {
        for channel in recipe.channels() {
            let base_value = property_base_value(&base_data, object_id, channel.property)?;
            for point in channel.points {
                records.push(json!({
                    "objectId": object_id,
                    "propertyPath": channel.property.as_str(),
                    "time": round3(point.frac * duration_sec),
                    "value": base_value + channel.base_amplitude * style_mult * point.factor,
                    "interpolation": point.interpolation,
                }));
            }
        }
    }
    let keyframes_to_add = records.len();

    let mut reasons = Vec::new();
    if keyframes_to_add >= CONFIRM_KEYFRAME_THRESHOLD {
        reasons.push(format!("plan adds {keyframes_to_add} keyframes (>= {CONFIRM_KEYFRAME_THRESHOLD})"));
    }
    if targets.len() > 1 {
        reasons.push(format!("plan touches {} objects (> 1)", targets.len()));
    }
    if constraints.loop_flag == Some(true) && !recipe.loop_friendly() {
        reasons.push(format!("loop requested on non-loop-friendly recipe '{}'", recipe.name()));
    }
    let requires_confirm = !reasons.is_empty();

    let steps = vec![
        PlanStep {
            id: "step-1".to_string(),
            label: "Snapshot current state".to_string(),
            step_type: StepType::Inspect,
            command: StepCommand { action: "state.snapshot".to_string(), input: json!({}) },
            rationale: "Establish a baseline before mutating.".to_string(),
        },
        PlanStep {
            id: "step-2".to_string(),
            label: format!("Set clip duration to {duration_sec}s"),
            step_type: StepType::Mutate,
            command: StepCommand { action: "animation.setDuration".to_string(), input: json!({"durationSeconds": duration_sec}) },
            rationale: format!("'{}' runs over {duration_sec}s.", recipe.name()),
        },
        PlanStep {
            id: "step-3".to_string(),
            label: format!("Insert {keyframes_to_add} keyframes for '{}'", recipe.name()),
            step_type: StepType::Mutate,
            command: StepCommand { action: "animation.insertRecords".to_string(), input: json!({"records": records}) },
            rationale: format!("Apply the '{}' recipe template to {} object(s).", recipe.name(), targets.len()),
        },
    ];

    let base_project_hash = mf_core::sha256_hex(base_project_json.as_bytes());
    let seed = serde_json::to_string(&json!({"scope": scope, "steps": &steps, "baseProjectHash": &base_project_hash}))
        .map_err(|e| MfError::new(MfErrorCode::InvalidProject, format!("failed to seed plan id: {e}")))?;
    let plan_id = mf_core::fnv1a_hex(seed.as_bytes());

    Ok(Plan {
        plan_id,
        scope,
        steps,
        summary: PlanSummary { duration_sec, objects_touched: targets, keyframes_to_add, commands: 2 },
        safety: PlanSafety { requires_confirm, reasons },
        base_project_json,
        base_project_hash,
    })
}

fn validate_constraints(constraints: &Constraints) -> MfResult<()> {
    if let Some(d) = constraints.duration_seconds
        && !(d.is_finite() && d > 0.0)
    {
        return Err(MfError::new(MfErrorCode::InvalidConstraints, "durationSeconds must be a finite number > 0"));
    }
    if let Some(targets) = &constraints.target_objects
        && targets.is_empty()
    {
        return Err(MfError::new(MfErrorCode::InvalidConstraints, "targetObjects, if present, must not be empty"));
    }
    Ok(())
}

fn compute_duration(recipe: Recipe, constraints: &Constraints) -> f64 {
    let requested = constraints.duration_seconds.unwrap_or_else(|| recipe.default_duration());
    round3(requested.clamp(MIN_DURATION_SECONDS, MAX_DURATION_SECONDS))
}

/// Resolve which object ids a recipe applies to (spec §4.5 target
/// precedence): explicit `targetObjects` (filtered to ids that actually
/// exist) → for `camera-dolly`, an object/instance whose name contains
/// "camera" (case-insensitive) → the selected object, if any → the first
/// object id in the snapshot (ids sorted, mirroring `runtime.snapshot()`'s
/// ordering) → `MF_ERR_EMPTY_SCENE` if the project has no objects at all.
fn resolve_targets(data: &ProjectData, recipe: Recipe, constraints: &Constraints, selected_id: Option<&str>) -> MfResult<Vec<String>> {
    if let Some(requested) = &constraints.target_objects {
        let existing: std::collections::HashSet<&str> = all_ids(data).collect();
        let resolved: Vec<String> = requested.iter().filter(|id| existing.contains(id.as_str())).cloned().collect();
        if resolved.is_empty() {
            return Err(MfError::new(MfErrorCode::NoTargetObject, "none of the requested targetObjects exist in the project"));
        }
        return Ok(resolved);
    }

    if recipe == Recipe::CameraDolly
        && let Some(id) = find_by_name_substring(data, "camera")
    {
        return Ok(vec![id]);
    }

    if let Some(id) = selected_id
        && all_ids(data).any(|existing| existing == id)
    {
        return Ok(vec![id.to_string()]);
    }

    let mut ids: Vec<String> = all_ids(data).map(ToOwned::to_owned).collect();
    ids.sort();
    if let Some(first) = ids.into_iter().next() {
        return Ok(vec![first]);
    }
    Err(MfError::new(MfErrorCode::EmptyScene, "the project has no objects or model instances to target"))
}

fn all_ids(data: &ProjectData) -> impl Iterator<Item = &str> {
    data.objects
        .iter()
        .map(|o| o.id.as_str())
        .chain(data.model_instances.iter().flatten().map(|m| m.id.as_str()))
}

fn find_by_name_substring(data: &ProjectData, needle: &str) -> Option<String> {
    data.objects
        .iter()
        .map(|o| (o.id.as_str(), o.name.as_str()))
        .chain(data.model_instances.iter().flatten().map(|m| (m.id.as_str(), m.name.as_str())))
        .find(|(_, name)| name.to_lowercase().contains(needle))
        .map(|(id, _)| id.to_string())
}

/// The resting value of `property` on `object_id`: the matching axis of its
/// position/rotation/scale. Recipes add their amplitude on top of this.
fn property_base_value(data: &ProjectData, object_id: &str, property: Property) -> MfResult<f64> {
    let axis_index = match property.axis() {
        "x" => 0,
        "y" => 1,
        _ => 2,
    };
    let transform = data
        .objects
        .iter()
        .find(|o| o.id == object_id)
        .map(|o| match property.group() {
            "position" => o.position,
            "rotation" => o.rotation,
            _ => o.scale,
        })
        .or_else(|| {
            data.model_instances.iter().flatten().find(|m| m.id == object_id).map(|m| match property.group() {
                "position" => m.position,
                "rotation" => m.rotation,
                _ => m.scale,
            })
        })
        .ok_or_else(|| MfError::new(MfErrorCode::NoTargetObject, format!("target object '{object_id}' not found")))?;
    Ok(transform[axis_index])
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
