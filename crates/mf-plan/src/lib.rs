// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-plan
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Atomic apply and simulate-and-diff preview.
pub mod apply;
/// Structural before/after diffing.
pub mod diff;
/// Recipe generation and target resolution.
pub mod generate;
/// The closed recipe set and style table.
pub mod recipes;

pub use apply::{apply, preview_diff, ApplyOutcome};
pub use diff::{compute_diff, AnimationObjectDiff, MaterialDiff, ObjectDiff, StructuralDiff};
pub use generate::generate as generate_plan;
pub use mf_runtime::Scope;
pub use recipes::{Recipe, Style};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Caller-supplied constraints on plan generation (spec §4.5 `plan.generate`
/// input).
#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Explicit object ids to target; ids that do not exist are dropped, not
    /// rejected, unless none remain.
    #[serde(default)]
    pub target_objects: Option<Vec<String>>,
    /// Animation style name (`snappy`/`realistic`/`cartoony`/`cinematic`);
    /// unrecognized names fall back to a `1.0` amplitude multiplier.
    #[serde(default)]
    pub style: Option<String>,
    /// Whether the caller wants the result to loop seamlessly.
    #[serde(default, rename = "loop")]
    pub loop_flag: Option<bool>,
    /// Explicit clip duration override, clamped to `[0.1, 30]` seconds.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Whether a [`PlanStep`] only reads state or actually mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepType {
    /// Reads state without changing it (e.g. a baseline snapshot).
    Inspect,
    /// Dispatches an [`mf_bus::Action`] that changes state.
    Mutate,
}

/// The command a [`PlanStep`] runs, shaped identically to `runtime.execute`'s
/// `(action, input)` pair so `mf-server` can dispatch it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCommand {
    /// The action id (e.g. `animation.insertRecords`).
    pub action: String,
    /// The action's input payload.
    pub input: Value,
}

/// One step of a [`Plan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Stable within-plan identifier (`"step-1"`, `"step-2"`, ...).
    pub id: String,
    /// Human-readable summary shown in a preview without running anything.
    pub label: String,
    /// Whether this step mutates state.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// The underlying command.
    pub command: StepCommand,
    /// Why this step exists, for a reviewer reading the plan cold.
    pub rationale: String,
}

/// Coarse statistics describing a [`Plan`]'s effect, shown without running
/// anything (spec §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    /// The clip duration this plan sets.
    pub duration_sec: f64,
    /// Object ids the plan's steps touch, in resolution order.
    pub objects_touched: Vec<String>,
    /// Total keyframes the plan's `animation.insertRecords` step(s) add.
    pub keyframes_to_add: usize,
    /// Count of mutate steps (excludes `Inspect` steps).
    pub commands: usize,
}

/// Why a plan is (or is not) gated behind an explicit `confirm=true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSafety {
    /// True iff `apply` refuses this plan without `confirm=true`.
    pub requires_confirm: bool,
    /// Human-readable reasons, empty iff `requiresConfirm` is false.
    pub reasons: Vec<String>,
}

/// A generated, previewable, applicable unit of work (spec §3, §4.5).
///
/// Carries its own frozen `baseProjectJson`/`baseProjectHash` so `preview`
/// never touches the live runtime and `apply` can detect staleness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Content-addressed id (`h` + 8 hex), stable for identical
    /// `(scope, steps, baseProjectHash)`.
    pub plan_id: String,
    /// Which half of the runtime this plan targets.
    pub scope: Scope,
    /// The ordered steps `apply` runs.
    pub steps: Vec<PlanStep>,
    /// Coarse effect summary.
    pub summary: PlanSummary,
    /// Confirm-gating metadata.
    pub safety: PlanSafety,
    /// Canonical JSON of the project this plan was generated against.
    pub base_project_json: String,
    /// `sha256_hex(base_project_json)`, used to detect staleness at apply time.
    pub base_project_hash: String,
}

/// Process-local registry of plans awaiting preview or apply.
///
/// A plan lives here from `plan.generate` until it is applied (removed on
/// success) or explicitly discarded; nothing prunes it on a timer, so a
/// long-running server should discard plans it no longer intends to apply.
#[derive(Debug, Default)]
pub struct PlanRegistry {
    plans: HashMap<String, Plan>,
}

impl PlanRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plan`, returning its id. Replaces any existing entry with
    /// the same id (generating the same plan twice against an unchanged
    /// project yields the same id and is a no-op in effect).
    pub fn insert(&mut self, plan: Plan) -> String {
        let id = plan.plan_id.clone();
        self.plans.insert(id.clone(), plan);
        id
    }

    /// Look up a plan by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Plan> {
        self.plans.get(id)
    }

    /// Remove and return a plan by id.
    pub fn remove(&mut self, id: &str) -> Option<Plan> {
        self.plans.remove(id)
    }

    /// Discard a plan without applying it. Returns false if it was not registered.
    pub fn discard(&mut self, id: &str) -> bool {
        self.plans.remove(id).is_some()
    }

    /// Count of plans currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// True iff no plans are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_runtime::Runtime;

    const FIXTURE: &str = r#"{"version":4,"objects":[{"id":"obj_1","name":"Cube One","bindPath":"Cube_One","geometryType":"box","color":4491007,"position":[0,0.5,0],"rotation":[0,0,0],"scale":[1,1,1]}]}"#;

    #[test]
    fn registry_round_trips_a_generated_plan() {
        let mut rt = Runtime::default();
        rt.load_project_json(FIXTURE, false).unwrap();
        let plan = generate_plan(&rt, Scope::Current, "bounce", &Constraints::default()).unwrap();
        let mut registry = PlanRegistry::new();
        let id = registry.insert(plan.clone());
        assert_eq!(registry.get(&id), Some(&plan));
        assert_eq!(registry.len(), 1);
        assert!(registry.discard(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn constraints_deserialize_with_loop_keyword() {
        let constraints: Constraints = serde_json::from_str(r#"{"loop": true, "style": "cartoony"}"#).unwrap();
        assert_eq!(constraints.loop_flag, Some(true));
        assert_eq!(constraints.style.as_deref(), Some("cartoony"));
    }
}
