// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-runtime
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// The fixed set of concrete command-bus actions (spec §4.3).
pub mod actions;

use mf_bus::{ActionRegistry, ActionResult, EventKind, EventSequencer};
use mf_core::{GeometryType, MigrationResult, ProjectData, RuntimeState};
use mf_error::{MfError, MfErrorCode, MfResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Default byte ceiling for `loadProjectJson` input, overridable via
/// `mf-config`'s `max_json_bytes` setting.
pub const DEFAULT_MAX_JSON_BYTES: usize = 5_000_000;

/// One undone/redoable step: whole-state snapshots before and after a
/// command that structurally changed `current` (spec §3 `UndoEntry`).
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    /// Human label (the action id, or an explicit `label` if the caller supplied one).
    pub label: String,
    /// State immediately before the command ran.
    pub before: RuntimeState,
    /// State immediately after the command ran.
    pub after: RuntimeState,
}

/// The outcome of [`Runtime::load_project_json`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    /// Content-addressed project id (`mf_` + 8 hex).
    pub project_id: String,
    /// Schema version after migration (always `4`).
    pub version: u32,
    /// Migration steps that actually ran, in order.
    pub applied: Vec<String>,
    /// Number of scene objects after migration.
    pub object_count: usize,
    /// Number of keyframes across all tracks after migration.
    pub keyframe_count: usize,
}

/// One entry of [`Snapshot::objects`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotObject {
    /// Object id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Sanitized bind path, if present.
    pub bind_path: Option<String>,
    /// Primitive geometry kind.
    pub geometry_type: GeometryType,
    /// Parent id from the hierarchy map, if any.
    pub parent_id: Option<String>,
}

/// One entry of [`Snapshot::model_instances`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotModelInstance {
    /// Instance id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Sanitized bind path, if present.
    pub bind_path: Option<String>,
    /// The asset this instance renders.
    pub asset_id: String,
    /// Parent id from the hierarchy map, if any.
    pub parent_id: Option<String>,
}

/// Aggregate animation counts reported by [`Runtime::snapshot`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAnimation {
    /// Clip duration, if an animation clip is present.
    pub duration_seconds: Option<f64>,
    /// Number of tracks across the clip.
    pub track_count: usize,
    /// Total number of keyframes across all tracks.
    pub keyframe_count: usize,
    /// Number of declared takes.
    pub take_count: usize,
}

/// Deterministic view of `current` (spec §4.4 `snapshot()`): objects and
/// instances sorted by id, selection, asset index, animation counts,
/// `dirty`, and `version`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Project schema version (always 4 for a loaded project).
    pub version: u32,
    /// Scene objects, sorted by id.
    pub objects: Vec<SnapshotObject>,
    /// Model instances, sorted by id.
    pub model_instances: Vec<SnapshotModelInstance>,
    /// Currently selected object/instance id.
    pub selected_object_id: Option<String>,
    /// Known asset ids, sorted.
    pub asset_ids: Vec<String>,
    /// Animation counts.
    pub animation: SnapshotAnimation,
    /// Whether `current` differs structurally from the last loaded/committed baseline.
    pub dirty: bool,
}

/// A deep-copy dump of `{current, staged, undo, redo}` used to implement
/// atomic plan apply (spec §4.4 `captureRestorePoint`/`restoreRestorePoint`).
/// Opaque to callers outside this crate.
#[derive(Debug, Clone)]
pub struct RestorePoint {
    current: RuntimeState,
    staged: Option<RuntimeState>,
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
    baseline: ProjectData,
}

/// The runtime state machine (spec §4.4): one `current` project plus an
/// optional `staged` one, a command bus, undo/redo history, and a
/// monotone event counter shared across the runtime's whole lifetime.
pub struct Runtime {
    current: RuntimeState,
    staged: Option<RuntimeState>,
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
    sequencer: EventSequencer,
    registry: Arc<ActionRegistry>,
    /// The project data at the last successful load or commit; `current.dirty`
    /// tracks whether `current.data` still structurally equals this.
    baseline: ProjectData,
    max_json_bytes: usize,
}

impl Runtime {
    /// A fresh runtime: empty project, no staged load, no history.
    #[must_use]
    pub fn new(max_json_bytes: usize) -> Self {
        let current = RuntimeState::empty();
        Self {
            baseline: current.data.clone(),
            current,
            staged: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            sequencer: EventSequencer::new(),
            registry: Arc::new(actions::build_registry()),
            max_json_bytes,
        }
    }

    /// Parse, migrate, and validate `json`, then either stage it
    /// (`staged=true`, the default) or replace `current` outright
    /// (`staged=false`, which also clears undo/redo/staged).
    ///
    /// # Errors
    ///
    /// Propagates [`mf_core::load_project_json`]'s parse/validate errors.
    pub fn load_project_json(&mut self, json: &str, staged: bool) -> MfResult<LoadSummary> {
        let MigrationResult { data, version, applied } = mf_core::load_project_json(json, self.max_json_bytes)?;
        let canonical = mf_core::serialize_stable(&data)?;
        let project_id = mf_core::project_id(&canonical);
        let object_count = data.objects.len();
        let keyframe_count = data.animation.as_ref().map_or(0, mf_core::Clip::keyframe_count);

        let hierarchy = initial_hierarchy(&data);
        let new_state = RuntimeState { data, selected_object_id: None, dirty: false, hierarchy };

        if staged {
            info!(project_id, staged = true, "loaded project JSON");
            self.staged = Some(new_state);
        } else {
            info!(project_id, staged = false, "loaded project JSON");
            self.baseline = new_state.data.clone();
            self.current = new_state;
            self.staged = None;
            self.undo_stack.clear();
            self.redo_stack.clear();
        }

        Ok(LoadSummary { project_id, version, applied, object_count, keyframe_count })
    }

    /// Swap `staged` into `current`, clearing `staged` and all history.
    ///
    /// # Errors
    ///
    /// [`MfErrorCode::NoStagedProject`] if nothing is staged.
    pub fn commit_staged_load(&mut self) -> MfResult<()> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| MfError::new(MfErrorCode::NoStagedProject, "no staged project to commit"))?;
        self.baseline = staged.data.clone();
        self.current = staged;
        self.undo_stack.clear();
        self.redo_stack.clear();
        debug!("committed staged load");
        Ok(())
    }

    /// Discard any staged load. Always succeeds, including when nothing is staged.
    pub fn discard_staged_load(&mut self) {
        self.staged = None;
    }

    /// Whether a staged load is currently pending.
    #[must_use]
    pub fn has_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// A deterministic view of `current`: sorted objects/instances, the
    /// asset index, animation counts, selection, `dirty`, and `version`.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let data = &self.current.data;
        let mut objects: Vec<SnapshotObject> = data
            .objects
            .iter()
            .map(|o| SnapshotObject {
                id: o.id.clone(),
                name: o.name.clone(),
                bind_path: o.bind_path.clone(),
                geometry_type: o.geometry_type,
                parent_id: self.current.hierarchy.get(&o.id).cloned().flatten(),
            })
            .collect();
        objects.sort_by(|a, b| a.id.cmp(&b.id));

        let mut model_instances: Vec<SnapshotModelInstance> = data
            .model_instances
            .iter()
            .flatten()
            .map(|m| SnapshotModelInstance {
                id: m.id.clone(),
                name: m.name.clone(),
                bind_path: m.bind_path.clone(),
                asset_id: m.asset_id.clone(),
                parent_id: self.current.hierarchy.get(&m.id).cloned().flatten(),
            })
            .collect();
        model_instances.sort_by(|a, b| a.id.cmp(&b.id));

        let mut asset_ids: Vec<String> = data.assets.iter().flatten().map(|a| a.id.clone()).collect();
        asset_ids.sort();

        let animation = data.animation.as_ref().map_or(
            SnapshotAnimation { duration_seconds: None, track_count: 0, keyframe_count: 0, take_count: 0 },
            |clip| SnapshotAnimation {
                duration_seconds: Some(clip.duration_seconds),
                track_count: clip.tracks.len(),
                keyframe_count: clip.keyframe_count(),
                take_count: clip.takes.as_ref().map_or(0, Vec::len),
            },
        );

        Snapshot {
            version: data.version,
            objects,
            model_instances,
            selected_object_id: self.current.selected_object_id.clone(),
            asset_ids,
            animation,
            dirty: self.current.dirty,
        }
    }

    /// Run `action` against `current` (or a pseudo-action: `history.undo` /
    /// `history.redo`), pushing an undo entry when the command structurally
    /// changed state and recomputing the `dirty` flag afterward.
    ///
    /// # Errors
    ///
    /// Propagates [`mf_bus::ActionRegistry::dispatch`]'s errors, plus
    /// [`MfErrorCode::NothingToUndo`]/[`MfErrorCode::NothingToRedo`] for the
    /// pseudo-actions.
    pub fn execute(&mut self, action: &str, input: Value, label: Option<String>) -> MfResult<ActionResult> {
        match action {
            "history.undo" => self.undo(),
            "history.redo" => self.redo(),
            _ => self.execute_bus_action(action, input, label),
        }
    }

    fn execute_bus_action(&mut self, action: &str, input: Value, label: Option<String>) -> MfResult<ActionResult> {
        let before = self.current.clone();
        let mut result = self.registry.dispatch(action, &mut self.current, &mut self.sequencer, input)?;

        if self.current != before {
            self.undo_stack.push(UndoEntry { label: label.unwrap_or_else(|| action.to_string()), before, after: self.current.clone() });
            self.redo_stack.clear();
        }
        self.recompute_dirty(&mut result.events);
        Ok(result)
    }

    fn undo(&mut self) -> MfResult<ActionResult> {
        let entry = self.undo_stack.pop().ok_or_else(|| MfError::new(MfErrorCode::NothingToUndo, "undo stack is empty"))?;
        self.current = entry.before.clone();
        let mut events = Vec::new();
        let seq = self.sequencer.next_seq();
        events.push(mf_bus::Event { seq, kind: EventKind::HistoryUndo, payload: json!({"label": entry.label}) });
        let result = json!({"label": entry.label});
        self.redo_stack.push(entry);
        self.recompute_dirty(&mut events);
        Ok(ActionResult { result, events })
    }

    fn redo(&mut self) -> MfResult<ActionResult> {
        let entry = self.redo_stack.pop().ok_or_else(|| MfError::new(MfErrorCode::NothingToRedo, "redo stack is empty"))?;
        self.current = entry.after.clone();
        let mut events = Vec::new();
        let seq = self.sequencer.next_seq();
        events.push(mf_bus::Event { seq, kind: EventKind::HistoryRedo, payload: json!({"label": entry.label}) });
        let result = json!({"label": entry.label});
        self.undo_stack.push(entry);
        self.recompute_dirty(&mut events);
        Ok(ActionResult { result, events })
    }

    /// Recompute `current.dirty` against `baseline`, emitting
    /// `project.dirtyChanged` only on a false->true transition (spec §4.4).
    fn recompute_dirty(&mut self, events: &mut Vec<mf_bus::Event>) {
        let differs = self.current.data != self.baseline;
        if differs && !self.current.dirty {
            self.current.dirty = true;
            let seq = self.sequencer.next_seq();
            events.push(mf_bus::Event { seq, kind: EventKind::ProjectDirtyChanged, payload: json!({"dirty": true}) });
        } else if !differs {
            self.current.dirty = false;
        }
    }

    /// An independent runtime whose `current` is a deep copy of this
    /// runtime's `current`. No staged project, no history; the action
    /// registry (immutable, reference-counted) is shared.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            staged: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            sequencer: EventSequencer::new(),
            registry: Arc::clone(&self.registry),
            baseline: self.current.data.clone(),
            max_json_bytes: self.max_json_bytes,
        }
    }

    /// Deep-copy dump of `{current, staged, undo, redo}`, used by the plan
    /// layer to make apply atomic.
    #[must_use]
    pub fn capture_restore_point(&self) -> RestorePoint {
        RestorePoint {
            current: self.current.clone(),
            staged: self.staged.clone(),
            undo_stack: self.undo_stack.clone(),
            redo_stack: self.redo_stack.clone(),
            baseline: self.baseline.clone(),
        }
    }

    /// Restore a previously captured [`RestorePoint`] verbatim.
    pub fn restore_restore_point(&mut self, rp: RestorePoint) {
        self.current = rp.current;
        self.staged = rp.staged;
        self.undo_stack = rp.undo_stack;
        self.redo_stack = rp.redo_stack;
        self.baseline = rp.baseline;
    }

    /// Canonical stable serialization of `current.data`.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures (should not occur for well-formed data).
    pub fn export_project_json(&self) -> MfResult<String> {
        mf_core::serialize_stable(&self.current.data)
    }

    /// The project data backing `current`, as a canonical JSON value, used
    /// by the plan layer to freeze a `baseProjectJson`/`baseProjectHash`.
    ///
    /// `scope=staged` reads `staged` if present, else falls back to `current`
    /// (mirrors how a staged script run operates before anything is staged).
    ///
    /// # Errors
    ///
    /// [`MfErrorCode::NoStagedProject`] if `scope` requests staged and
    /// nothing is staged, `serialize_stable` failures otherwise.
    pub fn project_json_at_scope(&self, scope: Scope) -> MfResult<String> {
        match scope {
            Scope::Current => mf_core::serialize_stable(&self.current.data),
            Scope::Staged => {
                let state = self
                    .staged
                    .as_ref()
                    .ok_or_else(|| MfError::new(MfErrorCode::NoStagedProject, "no staged project"))?;
                mf_core::serialize_stable(&state.data)
            }
        }
    }

    /// Read-only access to `current`.
    #[must_use]
    pub fn current(&self) -> &RuntimeState {
        &self.current
    }

    /// Read-only access to `staged`, if any.
    #[must_use]
    pub fn staged(&self) -> Option<&RuntimeState> {
        self.staged.as_ref()
    }

    /// Number of entries the undo stack currently holds.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of entries the redo stack currently holds.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Replace `staged`'s data wholesale (used by the plan layer when
    /// applying a `scope=staged` plan onto a simulated clone and writing
    /// the result back without touching `current`).
    pub fn set_staged_data(&mut self, data: ProjectData) {
        let hierarchy = initial_hierarchy(&data);
        self.staged = Some(RuntimeState { data, selected_object_id: None, dirty: false, hierarchy });
    }

    /// Every action id this runtime can dispatch via `execute`, for
    /// `mf.capabilities` and for validating `mf.command.execute`'s `action`
    /// field before spending a round trip on the bus.
    #[must_use]
    pub fn action_ids(&self) -> Vec<&'static str> {
        self.registry.action_ids()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_JSON_BYTES)
    }
}

/// Which half of the runtime an operation targets (spec §3 `Plan.scope`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The live `current` project.
    Current,
    /// The `staged` project.
    Staged,
}

/// All ids a project declares (objects + instances) start out unparented:
/// `ProjectData` carries no parent pointers of its own (spec §3 — the
/// hierarchy is a separate map the runtime builds up via `scene.parent`).
fn initial_hierarchy(data: &ProjectData) -> mf_core::Hierarchy {
    let mut hierarchy = mf_core::Hierarchy::new();
    for obj in &data.objects {
        hierarchy.insert(obj.id.clone(), None);
    }
    for inst in data.model_instances.iter().flatten() {
        hierarchy.insert(inst.id.clone(), None);
    }
    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1_FIXTURE: &str = r#"{"version":1, "objects":[{"id":"obj_1","name":"Cube One","geometryType":"box","color":4491007,"position":[0,0.5,0],"rotation":[0,0,0],"scale":[1,1,1]}]}"#;

    #[test]
    fn load_non_staged_replaces_current_and_clears_history() {
        let mut rt = Runtime::default();
        let summary = rt.load_project_json(V1_FIXTURE, false).unwrap();
        assert_eq!(summary.version, 4);
        assert_eq!(rt.snapshot().objects.len(), 1);
        assert!(!rt.has_staged());
    }

    #[test]
    fn staged_load_does_not_touch_current_until_commit() {
        let mut rt = Runtime::default();
        rt.load_project_json(V1_FIXTURE, true).unwrap();
        assert_eq!(rt.snapshot().objects.len(), 0);
        rt.commit_staged_load().unwrap();
        assert_eq!(rt.snapshot().objects.len(), 1);
        assert!(!rt.has_staged());
    }

    #[test]
    fn commit_without_staged_fails() {
        let mut rt = Runtime::default();
        let err = rt.commit_staged_load().unwrap_err();
        assert_eq!(err.code, MfErrorCode::NoStagedProject);
    }

    #[test]
    fn discard_staged_is_always_ok() {
        let mut rt = Runtime::default();
        rt.discard_staged_load();
        rt.load_project_json(V1_FIXTURE, true).unwrap();
        rt.discard_staged_load();
        assert!(!rt.has_staged());
    }

    #[test]
    fn execute_pushes_undo_entry_on_structural_change() {
        let mut rt = Runtime::default();
        rt.load_project_json(V1_FIXTURE, false).unwrap();
        rt.execute("selection.set", json!({"objectId": "obj_1"}), None).unwrap();
        assert_eq!(rt.undo_depth(), 1);
    }

    #[test]
    fn undo_then_redo_restores_exact_state() {
        let mut rt = Runtime::default();
        rt.load_project_json(V1_FIXTURE, false).unwrap();
        rt.execute("selection.set", json!({"objectId": "obj_1"}), None).unwrap();
        rt.execute(
            "hierarchy.renameMany",
            json!({"changes": [{"objectId": "obj_1", "name": "Renamed"}]}),
            None,
        )
        .unwrap();
        let renamed_json = rt.export_project_json().unwrap();

        rt.execute("history.undo", json!({}), None).unwrap();
        rt.execute("history.undo", json!({}), None).unwrap();
        assert_eq!(rt.snapshot().selected_object_id, None);
        assert_eq!(rt.snapshot().objects[0].name, "Cube One");

        rt.execute("history.redo", json!({}), None).unwrap();
        rt.execute("history.redo", json!({}), None).unwrap();
        assert_eq!(rt.snapshot().selected_object_id.as_deref(), Some("obj_1"));
        assert_eq!(rt.export_project_json().unwrap(), renamed_json);
    }

    #[test]
    fn undo_on_empty_stack_fails() {
        let mut rt = Runtime::default();
        let err = rt.execute("history.undo", json!({}), None).unwrap_err();
        assert_eq!(err.code, MfErrorCode::NothingToUndo);
    }

    #[test]
    fn dirty_flips_on_structural_change_and_back_on_undo() {
        let mut rt = Runtime::default();
        rt.load_project_json(V1_FIXTURE, false).unwrap();
        assert!(!rt.snapshot().dirty);
        rt.execute("selection.set", json!({"objectId": "obj_1"}), None).unwrap();
        assert!(!rt.snapshot().dirty, "selection alone isn't part of ProjectData");
        rt.execute(
            "hierarchy.renameMany",
            json!({"changes": [{"objectId": "obj_1", "name": "Renamed"}]}),
            None,
        )
        .unwrap();
        assert!(rt.snapshot().dirty);
        rt.execute("history.undo", json!({}), None).unwrap();
        assert!(!rt.snapshot().dirty);
    }

    #[test]
    fn clone_has_no_staged_or_history() {
        let mut rt = Runtime::default();
        rt.load_project_json(V1_FIXTURE, false).unwrap();
        rt.execute("selection.set", json!({"objectId": "obj_1"}), None).unwrap();
        let cloned = rt.clone();
        assert_eq!(cloned.undo_depth(), 0);
        assert!(!cloned.has_staged());
        assert_eq!(cloned.snapshot().selected_object_id.as_deref(), Some("obj_1"));
    }

    #[test]
    fn restore_point_round_trips() {
        let mut rt = Runtime::default();
        rt.load_project_json(V1_FIXTURE, false).unwrap();
        let rp = rt.capture_restore_point();
        rt.execute(
            "hierarchy.renameMany",
            json!({"changes": [{"objectId": "obj_1", "name": "Renamed"}]}),
            None,
        )
        .unwrap();
        assert!(rt.snapshot().dirty);
        rt.restore_restore_point(rp);
        assert!(!rt.snapshot().dirty);
        assert_eq!(rt.snapshot().objects[0].name, "Cube One");
    }
}
