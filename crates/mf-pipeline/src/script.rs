// SPDX-License-Identifier: MIT OR Apache-2.0
//! `mf.skill.generateScript`'s implementation, shared by `mf-server`'s tool
//! of the same name and by this crate's per-take pipeline step (spec §4.7,
//! §4.8 step 5): turn a goal into DSL script text, then rebase a compiled
//! take's script onto the pipeline's absolute clip timeline.

use mf_core::Interpolation;
use mf_error::{MfError, MfErrorCode, MfResult};
use mf_plan::{Constraints, Scope};
use mf_runtime::Runtime;
use mf_script::{parse_script, ScriptIssue, Stmt};

/// Generate DSL script text for `goal` against `runtime` at `scope`, by
/// generating a recipe plan the usual way (`mf-plan::generate`) and printing
/// its resolved target, duration, and keyframe records back out as script
/// statements. The round trip exists so a single script-shaped artifact
/// backs both the recipe path and the script path — `mf.script.run` on this
/// text reproduces the same keyframes `mf.plan.apply` on the original plan
/// would have.
///
/// # Errors
///
/// Propagates `mf-plan::generate`'s errors (`MF_ERR_UNSUPPORTED_GOAL`,
/// `MF_ERR_EMPTY_SCENE`, etc.), plus `MF_ERR_NO_TARGET_OBJECT` if the
/// generated plan somehow resolved no target.
pub fn generate_script(runtime: &Runtime, scope: Scope, goal: &str, constraints: &Constraints) -> MfResult<String> {
    let plan = mf_plan::generate_plan(runtime, scope, goal, constraints)?;
    let target = plan
        .summary
        .objects_touched
        .first()
        .cloned()
        .ok_or_else(|| MfError::new(MfErrorCode::NoTargetObject, "generated plan resolved no target object"))?;

    let mut lines = vec![format!("select \"{target}\""), format!("duration {}", plan.summary.duration_sec), format!("label \"{goal}\"")];

    if let Some(step) = plan.steps.iter().find(|s| s.command.action == "animation.insertRecords") {
        if let Some(records) = step.command.input.get("records").and_then(|v| v.as_array()) {
            for record in records {
                let path = record.get("propertyPath").and_then(|v| v.as_str()).unwrap_or("position.x");
                let (group, axis) = path.split_once('.').unwrap_or(("position", "x"));
                let time = record.get("time").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let value = record.get("value").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let ease = record.get("interpolation").and_then(|v| v.as_str()).unwrap_or("linear");
                lines.push(format!("key {group} {axis} at {time} = {value} ease {ease}"));
            }
        }
    }

    Ok(lines.join("\n"))
}

/// Reparse `script` and re-emit it with every `key`/`delete key`/`bounce`/
/// `recoil` time shifted by `offset` seconds, and `select`/`duration`
/// overridden to `target_id`/`absolute_duration` (spec §4.8 step 5). `take`
/// statements are dropped: the pipeline persists takes in a single later
/// script (step 6), not per sub-script.
///
/// # Errors
///
/// Returns `script`'s own parse issues unchanged if it fails to parse; this
/// should not happen for script text `generate_script` itself produced.
pub fn rebase_script(script: &str, target_id: &str, offset: f64, absolute_duration: f64) -> Result<String, Vec<ScriptIssue>> {
    let (stmts, errors) = parse_script(script);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut lines = vec![format!("select \"{target_id}\""), format!("duration {absolute_duration}")];
    for (_, stmt) in &stmts {
        match stmt {
            Stmt::Select(_) | Stmt::Duration(_) | Stmt::Take { .. } | Stmt::Fps(_) | Stmt::Loop(_) => {}
            Stmt::Label(text) => lines.push(format!("label \"{text}\"")),
            Stmt::Key { group, axis, time, value, degrees, ease } => {
                let mut line = format!("key {group} {axis} at {} = {value}", time + offset);
                if *degrees {
                    line.push_str(" deg");
                }
                if let Some(tag) = ease {
                    line.push_str(" ease ");
                    line.push_str(ease_tag(*tag));
                }
                lines.push(line);
            }
            Stmt::DeleteKey { group, axis, time } => lines.push(format!("delete key {group} {axis} at {}", time + offset)),
            Stmt::Bounce { amplitude, t0, t1 } => lines.push(format!("bounce amplitude {amplitude} at {}..{}", t0 + offset, t1 + offset)),
            Stmt::Recoil { distance, t0, t1 } => lines.push(format!("recoil distance {distance} at {}..{}", t0 + offset, t1 + offset)),
        }
    }
    Ok(lines.join("\n"))
}

fn ease_tag(i: Interpolation) -> &'static str {
    match i {
        Interpolation::Linear => "linear",
        Interpolation::Step => "step",
        Interpolation::EaseIn => "easeIn",
        Interpolation::EaseOut => "easeOut",
        Interpolation::EaseInOut => "easeInOut",
    }
}
