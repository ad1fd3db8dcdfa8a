// SPDX-License-Identifier: MIT OR Apache-2.0
//! Statement-list -> [`Plan`] compilation (spec §4.6).

use crate::ast::{parse_script, ScriptIssue, Stmt};
use mf_core::{Interpolation, Property, ProjectData};
use mf_plan::{Plan, PlanSafety, PlanStep, PlanSummary, Recipe, Scope, StepCommand, StepType};
use mf_runtime::Runtime;
use serde_json::json;
use std::collections::HashSet;
use tracing::debug;

/// A successfully compiled script.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    /// The compiled plan, ready for `previewDiff`/`apply` exactly like a
    /// recipe-generated one.
    pub plan: Plan,
    /// Non-fatal observations (currently unused but reserved so a future
    /// statement, e.g. a redundant `loop on` with no loop-friendly content,
    /// can warn without failing the compile).
    pub warnings: Vec<ScriptIssue>,
}

/// Tokenize, parse, resolve, and compile `script` into a [`Plan`] against
/// the project at `scope`.
///
/// # Errors
///
/// Returns every [`ScriptIssue`] found, in line order, rather than
/// stopping at the first: parse errors, then (if parsing succeeded)
/// resolution errors such as an unresolvable `select` target or an
/// out-of-range `take`.
pub fn compile(runtime: &Runtime, scope: Scope, script: &str) -> Result<CompileOutput, Vec<ScriptIssue>> {
    let (stmts, parse_errors) = parse_script(script);
    debug!(statement_count = stmts.len(), error_count = parse_errors.len(), "parsed script");
    if !parse_errors.is_empty() {
        return Err(parse_errors);
    }

    let base_project_json = runtime
        .project_json_at_scope(scope)
        .map_err(|e| vec![ScriptIssue::whole_script(e.to_string())])?;
    let base_data: ProjectData =
        serde_json::from_str(&base_project_json).map_err(|e| vec![ScriptIssue::whole_script(format!("frozen base project failed to parse: {e}"))])?;

    let mut errors = Vec::new();

    let target = resolve_target(&stmts, &base_data, &mut errors);
    let duration_sec = resolve_duration(&stmts, &base_data);
    let label = stmts.iter().rev().find_map(|(_, s)| match s {
        Stmt::Label(text) => Some(text.clone()),
        _ => None,
    });

    let mut records = Vec::new();
    let mut delete_keys = Vec::new();
    let mut any_delete = false;

    if let Some(target_id) = &target {
        for (line_no, stmt) in &stmts {
            match stmt {
                Stmt::Key { group, axis, time, value, degrees, ease } => {
                    let Some(property) = Property::from_group_axis(group, axis) else {
                        errors.push(ScriptIssue::on_line(*line_no, format!("unrecognized property '{group}.{axis}'")));
                        continue;
                    };
                    if *time < 0.0 || *time > duration_sec {
                        errors.push(ScriptIssue::on_line(*line_no, format!("key time {time} is outside [0, {duration_sec}]")));
                        continue;
                    }
                    let value = if *degrees { value.to_radians() } else { *value };
                    records.push(json!({
                        "objectId": target_id,
                        "propertyPath": property.as_str(),
                        "time": time,
                        "value": value,
                        "interpolation": ease.unwrap_or(Interpolation::Linear),
                    }));
                }
                Stmt::DeleteKey { group, axis, time } => {
                    let Some(property) = Property::from_group_axis(group, axis) else {
                        errors.push(ScriptIssue::on_line(*line_no, format!("unrecognized property '{group}.{axis}'")));
                        continue;
                    };
                    delete_keys.push(json!({"objectId": target_id, "propertyPath": property.as_str(), "time": time}));
                    any_delete = true;
                }
                Stmt::Bounce { amplitude, t0, t1 } => {
                    if *t1 > duration_sec {
                        errors.push(ScriptIssue::on_line(*line_no, format!("bounce range end {t1} exceeds duration {duration_sec}")));
                        continue;
                    }
                    records.extend(expand_macro(Recipe::Bounce, *amplitude, *t0, *t1, target_id, &base_data));
                }
                Stmt::Recoil { distance, t0, t1 } => {
                    if *t1 > duration_sec {
                        errors.push(ScriptIssue::on_line(*line_no, format!("recoil range end {t1} exceeds duration {duration_sec}")));
                        continue;
                    }
                    records.extend(expand_macro(Recipe::Recoil, *distance, *t0, *t1, target_id, &base_data));
                }
                _ => {}
            }
        }
    }

    let mut seen_take_ids = HashSet::new();
    let mut takes = Vec::new();
    for (line_no, stmt) in &stmts {
        if let Stmt::Take { name, start, end } = stmt {
            if *start < 0.0 || *end > duration_sec || *start >= *end {
                errors.push(ScriptIssue::on_line(*line_no, format!("take \"{name}\" range [{start}, {end}] is outside [0, {duration_sec}]")));
                continue;
            }
            let id = mf_core::unique_sanitized(&format!("take_{name}"), &mut seen_take_ids);
            takes.push(json!({"id": id, "name": name, "startTime": start, "endTime": end}));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut steps = vec![PlanStep {
        id: "step-1".to_string(),
        label: "Snapshot current state".to_string(),
        step_type: StepType::Inspect,
        command: StepCommand { action: "state.snapshot".to_string(), input: json!({}) },
        rationale: "Establish a baseline before mutating.".to_string(),
    }];
    steps.push(PlanStep {
        id: format!("step-{}", steps.len() + 1),
        label: format!("Set clip duration to {duration_sec}s"),
        step_type: StepType::Mutate,
        command: StepCommand { action: "animation.setDuration".to_string(), input: json!({"durationSeconds": duration_sec}) },
        rationale: "The script's `duration` statement (or the project's existing duration).".to_string(),
    });
    if !records.is_empty() {
        steps.push(PlanStep {
            id: format!("step-{}", steps.len() + 1),
            label: label.clone().unwrap_or_else(|| format!("Insert {} keyframes from script", records.len())),
            step_type: StepType::Mutate,
            command: StepCommand { action: "animation.insertRecords".to_string(), input: json!({"records": records}) },
            rationale: "The script's `key`/`bounce`/`recoil` statements.".to_string(),
        });
    }
    if !delete_keys.is_empty() {
        steps.push(PlanStep {
            id: format!("step-{}", steps.len() + 1),
            label: format!("Delete {} keyframes from script", delete_keys.len()),
            step_type: StepType::Mutate,
            command: StepCommand { action: "animation.removeKeys".to_string(), input: json!({"keys": delete_keys}) },
            rationale: "The script's `delete key` statements.".to_string(),
        });
    }
    if !takes.is_empty() {
        steps.push(PlanStep {
            id: format!("step-{}", steps.len() + 1),
            label: "Set takes from script".to_string(),
            step_type: StepType::Mutate,
            command: StepCommand { action: "animation.setTakes".to_string(), input: json!({"takes": takes}) },
            rationale: "The script's `take` statements.".to_string(),
        });
    }

    let commands = steps.iter().filter(|s| s.step_type == StepType::Mutate).count();
    let objects_touched = target.clone().into_iter().collect();
    let reasons = if any_delete { vec!["script deletes one or more keyframes".to_string()] } else { Vec::new() };

    let base_project_hash = mf_core::sha256_hex(base_project_json.as_bytes());
    let seed = serde_json::to_string(&json!({"scope": scope, "steps": &steps, "baseProjectHash": &base_project_hash}))
        .expect("steps and hash are always serializable");
    let plan_id = mf_core::fnv1a_hex(seed.as_bytes());

    let plan = Plan {
        plan_id,
        scope,
        steps,
        summary: PlanSummary { duration_sec, objects_touched, keyframes_to_add: records.len(), commands },
        safety: PlanSafety { requires_confirm: any_delete, reasons },
        base_project_json,
        base_project_hash,
    };

    debug!(plan_id = %plan.plan_id, keyframes_to_add = plan.summary.keyframes_to_add, "compiled script to plan");
    Ok(CompileOutput { plan, warnings: Vec::new() })
}

fn resolve_duration(stmts: &[(usize, Stmt)], base_data: &ProjectData) -> f64 {
    stmts
        .iter()
        .rev()
        .find_map(|(_, s)| match s {
            Stmt::Duration(d) => Some(*d),
            _ => None,
        })
        .or_else(|| base_data.animation.as_ref().map(|c| c.duration_seconds))
        .unwrap_or(1.0)
}

fn needs_target(stmts: &[(usize, Stmt)]) -> bool {
    stmts.iter().any(|(_, s)| matches!(s, Stmt::Key { .. } | Stmt::DeleteKey { .. } | Stmt::Bounce { .. } | Stmt::Recoil { .. }))
}

fn resolve_target(stmts: &[(usize, Stmt)], base_data: &ProjectData, errors: &mut Vec<ScriptIssue>) -> Option<String> {
    let selector = stmts.iter().rev().find_map(|(line_no, s)| match s {
        Stmt::Select(target) => Some((*line_no, target.clone())),
        _ => None,
    });

    let Some((line_no, needle)) = selector else {
        if needs_target(stmts) {
            errors.push(ScriptIssue::whole_script("no `select` statement found, but the script animates a target"));
        }
        return None;
    };

    if all_ids(base_data).any(|id| id == needle) {
        return Some(needle);
    }

    let matches: Vec<&str> = all_named(base_data).filter(|(_, name)| name.eq_ignore_ascii_case(&needle)).map(|(id, _)| id).collect();
    match matches.as_slice() {
        [] => {
            errors.push(ScriptIssue::on_line(line_no, format!("no object or instance named or id'd '{needle}'")));
            None
        }
        [single] => Some((*single).to_string()),
        _ => {
            errors.push(ScriptIssue::on_line(line_no, format!("'{needle}' matches more than one object by name")));
            None
        }
    }
}

fn all_ids(data: &ProjectData) -> impl Iterator<Item = &str> {
    data.objects.iter().map(|o| o.id.as_str()).chain(data.model_instances.iter().flatten().map(|m| m.id.as_str()))
}

fn all_named(data: &ProjectData) -> impl Iterator<Item = (&str, &str)> {
    data.objects
        .iter()
        .map(|o| (o.id.as_str(), o.name.as_str()))
        .chain(data.model_instances.iter().flatten().map(|m| (m.id.as_str(), m.name.as_str())))
}

/// Resolve `property`'s resting value on `object_id`, the same way
/// `mf-plan::generate` does for recipe channels.
fn property_base_value(data: &ProjectData, object_id: &str, property: Property) -> f64 {
    let axis_index = match property.axis() {
        "x" => 0,
        "y" => 1,
        _ => 2,
    };
    data.objects
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
        .map_or(0.0, |t| t[axis_index])
}

/// Expand a `bounce`/`recoil` macro into `animation.insertRecords` records,
/// reusing the recipe's channel templates (spec §4.6: "the same record
/// templates as §4.5 but scoped to `[t0,t1]`") scaled so the recipe's
/// primary channel lands on exactly `user_amplitude`.
fn expand_macro(recipe: Recipe, user_amplitude: f64, t0: f64, t1: f64, object_id: &str, base_data: &ProjectData) -> Vec<serde_json::Value> {
    let channels = recipe.channels();
    let Some(primary) = channels.first() else { return Vec::new() };
    let ratio = if primary.base_amplitude.abs() > f64::EPSILON { user_amplitude / primary.base_amplitude } else { 0.0 };

    let mut records = Vec::new();
    for channel in channels {
        let base_value = property_base_value(base_data, object_id, channel.property);
        for point in channel.points {
            records.push(json!({
                "objectId": object_id,
                "propertyPath": channel.property.as_str(),
                "time": t0 + point.frac * (t1 - t0),
                "value": base_value + channel.base_amplitude * ratio * point.factor,
                "interpolation": point.interpolation,
            }));
        }
    }
    records
}

/// Validate `script` without compiling: parse errors only (resolution
/// errors require the extra project context `compile` has).
#[must_use]
pub fn validate_syntax(script: &str) -> Vec<ScriptIssue> {
    parse_script(script).1
}
