// SPDX-License-Identifier: MIT OR Apache-2.0
//! Preview and atomic apply of a generated [`Plan`] (spec §4.5 `plan.preview`
//! / `plan.apply`).

use crate::diff::{compute_diff, StructuralDiff};
use crate::{Plan, PlanRegistry, StepType};
use mf_bus::Event;
use mf_core::ProjectData;
use mf_error::{MfError, MfErrorCode, MfResult};
use mf_runtime::{Runtime, Scope};

/// Simulate `plan`'s mutate steps on a clone of `template` (loaded fresh
/// from the plan's frozen base project, never the template's own live
/// state) and diff the result against that frozen base.
///
/// # Errors
///
/// Propagates any error a mutate step raises while simulating.
pub fn preview_diff(plan: &Plan, template: &Runtime) -> MfResult<StructuralDiff> {
    let before: ProjectData = serde_json::from_str(&plan.base_project_json)
        .map_err(|e| MfError::new(MfErrorCode::InvalidProject, format!("frozen base project failed to parse: {e}")))?;
    let mut sim = template.clone();
    sim.load_project_json(&plan.base_project_json, false)?;
    for step in plan.steps.iter().filter(|s| s.step_type == StepType::Mutate) {
        sim.execute(&step.command.action, step.command.input.clone(), Some(step.label.clone()))?;
    }
    Ok(compute_diff(&before, &sim.current().data))
}

/// What running a plan's mutate steps against the real runtime produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    /// Events emitted by every successfully executed step, in order.
    pub events: Vec<Event>,
    /// Count of mutate steps that ran to completion.
    pub commands_executed: usize,
}

/// Apply `plan_id` from `registry` against `runtime`, removing it from the
/// registry on success (a plan applies at most once).
///
/// Confirm gate: a plan whose `safety.requiresConfirm` is true is refused
/// unless `confirm` is true. Freshness gate: the plan is refused if
/// `runtime`'s project at `plan.scope` no longer hashes to
/// `plan.baseProjectHash` (something else mutated it since `plan.generate`).
/// Atomicity: for `scope=current`, a restore point is captured before the
/// first mutate step and restored verbatim on any step's failure; for
/// `scope=staged`, steps run against a disposable clone and `runtime.staged`
/// is only overwritten once every step has succeeded.
///
/// # Errors
///
/// - [`MfErrorCode::PlanNotFound`] if `plan_id` is not registered.
/// - [`MfErrorCode::ConfirmRequired`] if the confirm gate is unmet.
/// - [`MfErrorCode::PlanStale`] if the freshness gate fails.
/// - [`MfErrorCode::PlanApplyFailed`] if a mutate step fails mid-apply.
pub fn apply(registry: &mut PlanRegistry, plan_id: &str, runtime: &mut Runtime, confirm: bool) -> MfResult<ApplyOutcome> {
    let plan = registry
        .get(plan_id)
        .ok_or_else(|| MfError::new(MfErrorCode::PlanNotFound, format!("no plan registered with id '{plan_id}'")).with_context("planId", plan_id))?
        .clone();

    if plan.safety.requires_confirm && !confirm {
        return Err(MfError::new(MfErrorCode::ConfirmRequired, "this plan requires confirm=true to apply")
            .with_context("reasons", plan.safety.reasons.clone()));
    }

    let live_hash = mf_core::sha256_hex(runtime.project_json_at_scope(plan.scope)?.as_bytes());
    if live_hash != plan.base_project_hash {
        return Err(MfError::new(MfErrorCode::PlanStale, "the project has changed since this plan was generated")
            .with_context("planId", plan_id)
            .with_context("expectedHash", &plan.base_project_hash)
            .with_context("actualHash", &live_hash));
    }

    let outcome = match plan.scope {
        Scope::Current => apply_to_current(&plan, runtime),
        Scope::Staged => apply_to_staged(&plan, runtime),
    }?;
    registry.remove(plan_id);
    Ok(outcome)
}

fn apply_to_current(plan: &Plan, runtime: &mut Runtime) -> MfResult<ApplyOutcome> {
    let restore_point = runtime.capture_restore_point();
    let mut events = Vec::new();
    let mut executed = 0usize;
    for step in plan.steps.iter().filter(|s| s.step_type == StepType::Mutate) {
        match runtime.execute(&step.command.action, step.command.input.clone(), Some(step.label.clone())) {
            Ok(result) => {
                events.extend(result.events);
                executed += 1;
            }
            Err(inner) => {
                runtime.restore_restore_point(restore_point);
                return Err(apply_failed(&step.id, &inner));
            }
        }
    }
    Ok(ApplyOutcome { events, commands_executed: executed })
}

fn apply_to_staged(plan: &Plan, runtime: &mut Runtime) -> MfResult<ApplyOutcome> {
    let mut sim = runtime.clone();
    sim.load_project_json(&plan.base_project_json, false)?;
    let mut events = Vec::new();
    let mut executed = 0usize;
    for step in plan.steps.iter().filter(|s| s.step_type == StepType::Mutate) {
        match sim.execute(&step.command.action, step.command.input.clone(), Some(step.label.clone())) {
            Ok(result) => {
                events.extend(result.events);
                executed += 1;
            }
            Err(inner) => return Err(apply_failed(&step.id, &inner)),
        }
    }
    runtime.set_staged_data(sim.current().data.clone());
    Ok(ApplyOutcome { events, commands_executed: executed })
}

fn apply_failed(step_id: &str, inner: &MfError) -> MfError {
    MfError::new(MfErrorCode::PlanApplyFailed, format!("step '{step_id}' failed: {}", inner.message))
        .with_context("failedStepId", step_id)
        .with_context("innerCode", inner.code.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{generate, Constraints, PlanRegistry};

    const FIXTURE: &str = r#"{"version":4,"objects":[{"id":"obj_1","name":"Cube One","bindPath":"Cube_One","geometryType":"box","color":4491007,"position":[0,0.5,0],"rotation":[0,0,0],"scale":[1,1,1]}]}"#;

    fn runtime_with_fixture() -> Runtime {
        let mut rt = Runtime::default();
        rt.load_project_json(FIXTURE, false).unwrap();
        rt
    }

    #[test]
    fn preview_reports_sixteen_added_keyframes_for_bounce() {
        let rt = runtime_with_fixture();
        let plan = generate(&rt, Scope::Current, "bounce", &Constraints::default()).unwrap();
        let diff = preview_diff(&plan, &rt).unwrap();
        let total_added: usize = diff.animation.iter().map(|a| a.keyframes_added).sum();
        assert_eq!(total_added, 16);
    }

    #[test]
    fn apply_to_current_mutates_runtime_and_removes_plan() {
        let mut rt = runtime_with_fixture();
        let plan = generate(&rt, Scope::Current, "bounce", &Constraints::default()).unwrap();
        let mut registry = PlanRegistry::new();
        let plan_id = registry.insert(plan);

        let outcome = apply(&mut registry, &plan_id, &mut rt, false).unwrap();
        assert_eq!(outcome.commands_executed, 2);
        assert_eq!(rt.current().data.animation.as_ref().unwrap().keyframe_count(), 16);
        assert!(registry.get(&plan_id).is_none());
    }

    #[test]
    fn apply_to_staged_leaves_current_untouched() {
        let mut rt = runtime_with_fixture();
        let plan = generate(&rt, Scope::Staged, "bounce", &Constraints::default()).unwrap();
        let mut registry = PlanRegistry::new();
        let plan_id = registry.insert(plan);

        apply(&mut registry, &plan_id, &mut rt, false).unwrap();
        assert!(rt.current().data.animation.is_none());
        assert_eq!(rt.staged().unwrap().data.animation.as_ref().unwrap().keyframe_count(), 16);
    }

    #[test]
    fn apply_missing_plan_is_plan_not_found() {
        let mut rt = runtime_with_fixture();
        let mut registry = PlanRegistry::new();
        let err = apply(&mut registry, "h_missing", &mut rt, false).unwrap_err();
        assert_eq!(err.code, MfErrorCode::PlanNotFound);
    }

    #[test]
    fn stale_plan_is_refused() {
        let mut rt = runtime_with_fixture();
        let plan = generate(&rt, Scope::Current, "bounce", &Constraints::default()).unwrap();
        let mut registry = PlanRegistry::new();
        let plan_id = registry.insert(plan);

        rt.execute("scene.addPrimitive", serde_json::json!({"type": "sphere"}), None).unwrap();

        let err = apply(&mut registry, &plan_id, &mut rt, false).unwrap_err();
        assert_eq!(err.code, MfErrorCode::PlanStale);
    }

    #[test]
    fn requires_confirm_plan_is_refused_without_confirm() {
        let mut rt = runtime_with_fixture();
        let constraints = Constraints { loop_flag: Some(true), ..Default::default() };
        let plan = generate(&rt, Scope::Current, "bounce", &constraints).unwrap();
        assert!(plan.safety.requires_confirm);
        let mut registry = PlanRegistry::new();
        let plan_id = registry.insert(plan);

        let err = apply(&mut registry, &plan_id, &mut rt, false).unwrap_err();
        assert_eq!(err.code, MfErrorCode::ConfirmRequired);
    }

    #[test]
    fn requires_confirm_plan_applies_with_confirm_true() {
        let mut rt = runtime_with_fixture();
        let constraints = Constraints { loop_flag: Some(true), ..Default::default() };
        let plan = generate(&rt, Scope::Current, "bounce", &constraints).unwrap();
        let mut registry = PlanRegistry::new();
        let plan_id = registry.insert(plan);

        apply(&mut registry, &plan_id, &mut rt, true).unwrap();
        assert!(rt.current().data.animation.is_some());
    }

    #[test]
    fn failed_step_restores_current_to_its_pre_apply_state() {
        let mut rt = runtime_with_fixture();
        let mut plan = generate(&rt, Scope::Current, "bounce", &Constraints::default()).unwrap();
        plan.plan_id = "h_broken".to_string();
        plan.steps[1].command.input = serde_json::json!({"durationSeconds": -1.0});
        let before = rt.current().clone();
        let mut registry = PlanRegistry::new();
        registry.insert(plan);

        let err = apply(&mut registry, "h_broken", &mut rt, false).unwrap_err();
        assert_eq!(err.code, MfErrorCode::PlanApplyFailed);
        assert_eq!(rt.current(), &before);
    }
}
