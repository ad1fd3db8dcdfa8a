// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concrete `Action` implementations for the fixed, closed registry (spec
//! §4.3). Each action mutates `ctx.state` in place and emits its event(s)
//! through `ctx.emit`; the bus aborts and pushes no undo entry if `run`
//! returns an error (spec: "a single call is all-or-nothing").

use mf_anim::{insert_keyframe, move_keyframes, remove_keyframes, KeyframeRef};
use mf_bus::{Action, ActionContext, ActionRegistry, EventKind};
use mf_core::{
    hierarchy, unique_sanitized, GeometryType, Interpolation, Keyframe, Property, RuntimeState, Take, Track,
};
use mf_error::{MfError, MfErrorCode, MfResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

/// Build the fixed command registry (spec §4.3's closed set).
#[must_use]
pub fn build_registry() -> ActionRegistry {
    let mut r = ActionRegistry::new();
    r.register("selection.set", SelectionSet);
    r.register("scene.selectById", SceneSelectById);
    r.register("scene.selectByName", SceneSelectByName);
    r.register("scene.addPrimitive", SceneAddPrimitive);
    r.register("scene.duplicateSelected", SceneDuplicateSelected);
    r.register("scene.deleteSelected", SceneDeleteSelected);
    r.register("scene.clearUserObjects", SceneClearUserObjects);
    r.register("scene.parent", SceneParent);
    r.register("scene.unparent", SceneUnparent);
    r.register("hierarchy.renameMany", HierarchyRenameMany);
    r.register("material.set", MaterialSet);
    r.register("animation.insertRecords", AnimationInsertRecords);
    r.register("animation.removeKeys", AnimationRemoveKeys);
    r.register("animation.moveKeys", AnimationMoveKeys);
    r.register("animation.setDuration", AnimationSetDuration);
    r.register("animation.setTakes", AnimationSetTakes);
    r
}

fn input_error(err: serde_json::Error) -> MfError {
    MfError::new(MfErrorCode::InvalidInput, format!("malformed input: {err}"))
}

fn not_found(id: &str) -> MfError {
    MfError::new(MfErrorCode::NotFound, format!("no object or instance '{id}'")).with_context("objectId", id)
}

/// True if `id` names an existing scene object or model instance.
fn id_exists(state: &RuntimeState, id: &str) -> bool {
    state.data.objects.iter().any(|o| o.id == id) || state.data.model_instances.iter().flatten().any(|m| m.id == id)
}

/// Every object/instance id currently present in `state`.
fn all_ids(state: &RuntimeState) -> HashSet<String> {
    let mut ids: HashSet<String> = state.data.objects.iter().map(|o| o.id.clone()).collect();
    ids.extend(state.data.model_instances.iter().flatten().map(|m| m.id.clone()));
    ids
}

/// Mint the next `obj_N` id: one past the highest existing numeric suffix.
fn next_object_id(state: &RuntimeState) -> String {
    let max = all_ids(state)
        .iter()
        .filter_map(|id| id.strip_prefix("obj_"))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("obj_{}", max + 1)
}

fn unique_name(state: &RuntimeState, base: &str) -> String {
    let taken: HashSet<&str> = state
        .data
        .objects
        .iter()
        .map(|o| o.name.as_str())
        .chain(state.data.model_instances.iter().flatten().map(|m| m.name.as_str()))
        .collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base} {n}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

fn clamp_color(v: i64) -> u32 {
    v.clamp(0, 0x00FF_FFFF) as u32
}

fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// selection.set
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionSetInput {
    object_id: Option<String>,
}

struct SelectionSet;
impl Action for SelectionSet {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: SelectionSetInput = serde_json::from_value(input).map_err(input_error)?;
        if let Some(id) = &input.object_id
            && !id_exists(ctx.state, id)
        {
            return Err(not_found(id));
        }
        if ctx.state.selected_object_id != input.object_id {
            ctx.state.selected_object_id = input.object_id.clone();
            ctx.emit(EventKind::SelectionChanged, json!({"objectId": input.object_id}));
        }
        Ok(json!({"selectedObjectId": ctx.state.selected_object_id}))
    }
}

// ---------------------------------------------------------------------------
// scene.selectById / scene.selectByName
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SelectByIdInput {
    id: String,
}

struct SceneSelectById;
impl Action for SceneSelectById {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: SelectByIdInput = serde_json::from_value(input).map_err(input_error)?;
        if !id_exists(ctx.state, &input.id) {
            return Err(not_found(&input.id));
        }
        if ctx.state.selected_object_id.as_deref() != Some(input.id.as_str()) {
            ctx.state.selected_object_id = Some(input.id.clone());
            ctx.emit(EventKind::SelectionChanged, json!({"objectId": input.id}));
        }
        Ok(json!({"selectedObjectId": input.id}))
    }
}

#[derive(Deserialize)]
struct SelectByNameInput {
    name: String,
}

struct SceneSelectByName;
impl Action for SceneSelectByName {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: SelectByNameInput = serde_json::from_value(input).map_err(input_error)?;
        let matches: Vec<&str> = ctx
            .state
            .data
            .objects
            .iter()
            .filter(|o| o.name == input.name)
            .map(|o| o.id.as_str())
            .chain(
                ctx.state
                    .data
                    .model_instances
                    .iter()
                    .flatten()
                    .filter(|m| m.name == input.name)
                    .map(|m| m.id.as_str()),
            )
            .collect();
        match matches.as_slice() {
            [] => Err(MfError::new(MfErrorCode::NotFound, format!("no object named '{}'", input.name))),
            [id] => {
                let id = id.to_string();
                if ctx.state.selected_object_id.as_deref() != Some(id.as_str()) {
                    ctx.state.selected_object_id = Some(id.clone());
                    ctx.emit(EventKind::SelectionChanged, json!({"objectId": id}));
                }
                Ok(json!({"selectedObjectId": id}))
            }
            _ => Err(MfError::new(
                MfErrorCode::AmbiguousName,
                format!("'{}' matches {} objects", input.name, matches.len()),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// scene.addPrimitive
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AddPrimitiveMaterial {
    #[serde(default)]
    color: Option<i64>,
    #[serde(default)]
    metallic: Option<f64>,
    #[serde(default)]
    roughness: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPrimitiveInput {
    #[serde(rename = "type")]
    geometry_type: GeometryType,
    name: Option<String>,
    at: Option<[f64; 3]>,
    #[serde(default)]
    material: AddPrimitiveMaterial,
}

struct SceneAddPrimitive;
impl Action for SceneAddPrimitive {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: AddPrimitiveInput = serde_json::from_value(input).map_err(input_error)?;

        let n = ctx.state.data.objects.len() as f64;
        let col = n % 6.0;
        let row = (n / 6.0).floor();
        let spawn = input.at.unwrap_or([(col - 2.5) * 0.6, 0.5, row * 0.6]);

        let id = next_object_id(ctx.state);
        let base_name = input.name.unwrap_or_else(|| format!("{:?}", input.geometry_type));
        let name = unique_name(ctx.state, &base_name);

        let mut used: HashSet<String> = ctx
            .state
            .data
            .objects
            .iter()
            .filter_map(|o| o.bind_path.clone())
            .chain(ctx.state.data.model_instances.iter().flatten().filter_map(|m| m.bind_path.clone()))
            .collect();
        let bind_path = unique_sanitized(&name, &mut used);

        let object = mf_core::PrimitiveObject {
            id: id.clone(),
            name: name.clone(),
            bind_path: Some(bind_path),
            geometry_type: input.geometry_type,
            color: clamp_color(input.material.color.unwrap_or(0x00CC_CCCC)),
            metallic: input.material.metallic.map(clamp_unit),
            roughness: input.material.roughness.map(clamp_unit),
            position: spawn,
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        };
        ctx.state.data.objects.push(object);
        ctx.state.hierarchy.insert(id.clone(), None);

        ctx.emit(EventKind::SceneObjectAdded, json!({"objectId": id, "name": name}));
        Ok(json!({"objectId": id, "name": name}))
    }
}

// ---------------------------------------------------------------------------
// scene.duplicateSelected
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
struct DuplicateSelectedInput {
    offset: Option<[f64; 3]>,
}

struct SceneDuplicateSelected;
impl Action for SceneDuplicateSelected {
    fn is_enabled(&self, state: &RuntimeState, _input: &Value) -> MfResult<()> {
        if state.selected_object_id.is_none() {
            return Err(MfError::new(MfErrorCode::NoSelection, "no object selected"));
        }
        Ok(())
    }

    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: DuplicateSelectedInput = serde_json::from_value(input).map_err(input_error)?;
        let offset = input.offset.unwrap_or([0.6, 0.0, 0.6]);
        let source_id = ctx.state.selected_object_id.clone().expect("checked by is_enabled");

        let Some(source) = ctx.state.data.objects.iter().find(|o| o.id == source_id).cloned() else {
            return Err(not_found(&source_id));
        };

        let new_id = next_object_id(ctx.state);
        let new_name = unique_name(ctx.state, &source.name);
        let mut used: HashSet<String> = ctx.state.data.objects.iter().filter_map(|o| o.bind_path.clone()).collect();
        let bind_path = unique_sanitized(&new_name, &mut used);

        let mut clone = source.clone();
        clone.id = new_id.clone();
        clone.name = new_name.clone();
        clone.bind_path = Some(bind_path.clone());
        clone.position = [source.position[0] + offset[0], source.position[1] + offset[1], source.position[2] + offset[2]];
        ctx.state.data.objects.push(clone);
        ctx.state.hierarchy.insert(new_id.clone(), None);

        if let Some(clip) = &mut ctx.state.data.animation {
            let source_tracks: Vec<Track> = clip
                .tracks
                .iter()
                .filter(|t| t.object_id == source_id)
                .map(|t| Track {
                    object_id: new_id.clone(),
                    property: t.property,
                    bind_path: Some(bind_path.clone()),
                    keyframes: t.keyframes.clone(),
                })
                .collect();
            clip.tracks.extend(source_tracks);
        }

        ctx.emit(EventKind::SceneObjectAdded, json!({"objectId": new_id, "name": new_name}));
        Ok(json!({"objectId": new_id, "name": new_name}))
    }
}

// ---------------------------------------------------------------------------
// scene.deleteSelected / scene.clearUserObjects
// ---------------------------------------------------------------------------

fn remove_ids(state: &mut RuntimeState, ids: &HashSet<String>) {
    state.data.objects.retain(|o| !ids.contains(&o.id));
    if let Some(instances) = &mut state.data.model_instances {
        instances.retain(|m| !ids.contains(&m.id));
    }
    if let Some(clip) = &mut state.data.animation {
        clip.tracks.retain(|t| !ids.contains(&t.object_id));
    }
    for (child, parent) in state.hierarchy.iter_mut() {
        if !ids.contains(child) && parent.as_ref().is_some_and(|p| ids.contains(p)) {
            *parent = None;
        }
    }
    state.hierarchy.retain(|id, _| !ids.contains(id));
    if state.selected_object_id.as_ref().is_some_and(|id| ids.contains(id)) {
        state.selected_object_id = None;
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteSelectedInput {
    object_id: Option<String>,
    #[serde(default)]
    confirm: bool,
}

struct SceneDeleteSelected;
impl Action for SceneDeleteSelected {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: DeleteSelectedInput = serde_json::from_value(input).map_err(input_error)?;
        if !input.confirm {
            return Err(MfError::new(MfErrorCode::ConfirmRequired, "scene.deleteSelected requires confirm=true"));
        }
        let target = input
            .object_id
            .or_else(|| ctx.state.selected_object_id.clone())
            .ok_or_else(|| MfError::new(MfErrorCode::NoSelection, "no object selected or specified"))?;
        if !id_exists(ctx.state, &target) {
            return Err(not_found(&target));
        }

        let ids: HashSet<String> = hierarchy::descendants_inclusive(&ctx.state.hierarchy, &target).into_iter().collect();
        remove_ids(ctx.state, &ids);
        ctx.emit(EventKind::SceneObjectDeleted, json!({"objectId": target, "removed": ids.len()}));
        Ok(json!({"removed": ids.len()}))
    }
}

#[derive(Deserialize)]
struct ClearUserObjectsInput {
    #[serde(default)]
    confirm: bool,
}

struct SceneClearUserObjects;
impl Action for SceneClearUserObjects {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: ClearUserObjectsInput = serde_json::from_value(input).map_err(input_error)?;
        if !input.confirm {
            return Err(MfError::new(MfErrorCode::ConfirmRequired, "scene.clearUserObjects requires confirm=true"));
        }
        let ids = all_ids(ctx.state);
        let count = ids.len();
        remove_ids(ctx.state, &ids);
        ctx.emit(EventKind::SceneObjectsCleared, json!({"removed": count}));
        Ok(json!({"removed": count}))
    }
}

// ---------------------------------------------------------------------------
// scene.parent / scene.unparent
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParentInput {
    child_id: String,
    parent_id: String,
}

struct SceneParent;
impl Action for SceneParent {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: ParentInput = serde_json::from_value(input).map_err(input_error)?;
        if !id_exists(ctx.state, &input.child_id) {
            return Err(not_found(&input.child_id));
        }
        if !id_exists(ctx.state, &input.parent_id) {
            return Err(not_found(&input.parent_id));
        }
        if hierarchy::would_create_cycle(&ctx.state.hierarchy, &input.child_id, &input.parent_id) {
            return Err(MfError::new(
                MfErrorCode::InvalidInput,
                format!("parenting '{}' under '{}' would create a cycle", input.child_id, input.parent_id),
            ));
        }
        ctx.state.hierarchy.insert(input.child_id.clone(), Some(input.parent_id.clone()));
        ctx.emit(EventKind::SceneParentChanged, json!({"childId": input.child_id, "parentId": input.parent_id}));
        Ok(json!({"childId": input.child_id, "parentId": input.parent_id}))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnparentInput {
    child_id: String,
}

struct SceneUnparent;
impl Action for SceneUnparent {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: UnparentInput = serde_json::from_value(input).map_err(input_error)?;
        if !id_exists(ctx.state, &input.child_id) {
            return Err(not_found(&input.child_id));
        }
        ctx.state.hierarchy.insert(input.child_id.clone(), None);
        ctx.emit(EventKind::SceneParentChanged, json!({"childId": input.child_id, "parentId": Value::Null}));
        Ok(json!({"childId": input.child_id, "parentId": Value::Null}))
    }
}

// ---------------------------------------------------------------------------
// hierarchy.renameMany
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameChange {
    object_id: String,
    name: String,
}

#[derive(Deserialize)]
struct RenameManyInput {
    changes: Vec<RenameChange>,
}

struct HierarchyRenameMany;
impl Action for HierarchyRenameMany {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: RenameManyInput = serde_json::from_value(input).map_err(input_error)?;
        let mut renamed = Vec::new();
        for change in input.changes {
            let applied = if let Some(obj) = ctx.state.data.objects.iter_mut().find(|o| o.id == change.object_id) {
                if obj.name != change.name {
                    obj.name = change.name.clone();
                    true
                } else {
                    false
                }
            } else if let Some(inst) = ctx
                .state
                .data
                .model_instances
                .as_mut()
                .and_then(|v| v.iter_mut().find(|m| m.id == change.object_id))
            {
                if inst.name != change.name {
                    inst.name = change.name.clone();
                    true
                } else {
                    false
                }
            } else {
                false
            };
            if applied {
                renamed.push(change.object_id.clone());
                ctx.emit(EventKind::ObjectRenamed, json!({"objectId": change.object_id, "name": change.name}));
            }
        }
        Ok(json!({"renamed": renamed}))
    }
}

// ---------------------------------------------------------------------------
// material.set
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaterialSetInput {
    object_id: String,
    #[serde(default)]
    base_color: Option<i64>,
    #[serde(default)]
    metallic: Option<f64>,
    #[serde(default)]
    roughness: Option<f64>,
}

struct MaterialSet;
impl Action for MaterialSet {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: MaterialSetInput = serde_json::from_value(input).map_err(input_error)?;
        if input.base_color.is_none() && input.metallic.is_none() && input.roughness.is_none() {
            return Ok(json!({"changed": Vec::<String>::new()}));
        }
        let Some(obj) = ctx.state.data.objects.iter_mut().find(|o| o.id == input.object_id) else {
            return Err(not_found(&input.object_id));
        };
        let mut changed = Vec::new();
        if let Some(c) = input.base_color {
            obj.color = clamp_color(c);
            changed.push("baseColor");
        }
        if let Some(m) = input.metallic {
            obj.metallic = Some(clamp_unit(m));
            changed.push("metallic");
        }
        if let Some(r) = input.roughness {
            obj.roughness = Some(clamp_unit(r));
            changed.push("roughness");
        }
        ctx.emit(EventKind::ObjectMaterialChanged, json!({"objectId": input.object_id, "changed": changed}));
        Ok(json!({"objectId": input.object_id, "changed": changed}))
    }
}

// ---------------------------------------------------------------------------
// animation.insertRecords / removeKeys / moveKeys / setDuration / setTakes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertRecord {
    object_id: String,
    property_path: String,
    time: f64,
    value: f64,
    #[serde(default)]
    interpolation: Option<Interpolation>,
}

#[derive(Deserialize)]
struct InsertRecordsInput {
    records: Vec<InsertRecord>,
}

fn parse_property(path: &str) -> MfResult<Property> {
    Property::from_str(path)
        .ok_or_else(|| MfError::new(MfErrorCode::InvalidInput, format!("unrecognized property '{path}'")).with_context("propertyPath", path))
}

struct AnimationInsertRecords;
impl Action for AnimationInsertRecords {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: InsertRecordsInput = serde_json::from_value(input).map_err(input_error)?;
        let clip = ctx
            .state
            .data
            .animation
            .get_or_insert_with(|| mf_core::Clip { duration_seconds: 1.0, tracks: Vec::new(), takes: None });

        let bind_paths: std::collections::HashMap<String, Option<String>> = ctx
            .state
            .data
            .objects
            .iter()
            .map(|o| (o.id.clone(), o.bind_path.clone()))
            .chain(ctx.state.data.model_instances.iter().flatten().map(|m| (m.id.clone(), m.bind_path.clone())))
            .collect();

        let mut inserted = 0usize;
        for record in input.records {
            let property = parse_property(&record.property_path)?;
            let keyframe = Keyframe {
                time: record.time,
                value: record.value,
                interpolation: record.interpolation.unwrap_or(Interpolation::Linear),
            };
            let idx = mf_anim::get_or_create_track(clip, &record.object_id, property);
            if clip.tracks[idx].bind_path.is_none()
                && let Some(Some(path)) = bind_paths.get(&record.object_id)
            {
                clip.tracks[idx].bind_path = Some(path.clone());
            }
            insert_keyframe(clip, &record.object_id, property, keyframe);
            inserted += 1;
            ctx.emit(
                EventKind::KeyframeAdded,
                json!({"objectId": record.object_id, "property": property.as_str(), "time": record.time}),
            );
        }
        Ok(json!({"inserted": inserted}))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyRef {
    object_id: String,
    property_path: String,
    time: f64,
}

#[derive(Deserialize)]
struct RemoveKeysInput {
    keys: Vec<KeyRef>,
}

struct AnimationRemoveKeys;
impl Action for AnimationRemoveKeys {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: RemoveKeysInput = serde_json::from_value(input).map_err(input_error)?;
        let Some(clip) = &mut ctx.state.data.animation else {
            return Ok(json!({"removed": 0}));
        };
        let mut refs = Vec::with_capacity(input.keys.len());
        for key in &input.keys {
            refs.push(KeyframeRef { object_id: &key.object_id, property: parse_property(&key.property_path)?, time: key.time });
        }
        let removed = refs.len();
        remove_keyframes(clip, &refs);
        for key in &input.keys {
            ctx.emit(EventKind::KeyframeDeleted, json!({"objectId": key.object_id, "property": key.property_path, "time": key.time}));
        }
        Ok(json!({"removed": removed}))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveKeysInput {
    keys: Vec<KeyRef>,
    delta_time: f64,
}

struct AnimationMoveKeys;
impl Action for AnimationMoveKeys {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: MoveKeysInput = serde_json::from_value(input).map_err(input_error)?;
        let Some(clip) = &mut ctx.state.data.animation else {
            return Ok(json!({"moved": 0}));
        };
        let mut refs = Vec::with_capacity(input.keys.len());
        for key in &input.keys {
            refs.push(KeyframeRef { object_id: &key.object_id, property: parse_property(&key.property_path)?, time: key.time });
        }
        let moved = refs.len();
        move_keyframes(clip, &refs, input.delta_time);
        for key in &input.keys {
            ctx.emit(
                EventKind::KeyframeMoved,
                json!({"objectId": key.object_id, "property": key.property_path, "time": key.time, "deltaTime": input.delta_time}),
            );
        }
        Ok(json!({"moved": moved}))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetDurationInput {
    duration_seconds: f64,
}

struct AnimationSetDuration;
impl Action for AnimationSetDuration {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: SetDurationInput = serde_json::from_value(input).map_err(input_error)?;
        if !(input.duration_seconds.is_finite() && input.duration_seconds > 0.0) {
            return Err(MfError::new(MfErrorCode::InvalidInput, "durationSeconds must be a finite number > 0"));
        }
        let clip = ctx
            .state
            .data
            .animation
            .get_or_insert_with(|| mf_core::Clip { duration_seconds: 1.0, tracks: Vec::new(), takes: None });
        clip.duration_seconds = input.duration_seconds;
        clip.normalize();
        ctx.emit(EventKind::AnimationDurationChanged, json!({"durationSeconds": input.duration_seconds}));
        Ok(json!({"durationSeconds": input.duration_seconds}))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TakeInput {
    id: String,
    name: String,
    start_time: f64,
    end_time: f64,
}

#[derive(Deserialize)]
struct SetTakesInput {
    takes: Vec<TakeInput>,
}

struct AnimationSetTakes;
impl Action for AnimationSetTakes {
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
        let input: SetTakesInput = serde_json::from_value(input).map_err(input_error)?;
        let duration = ctx.state.data.animation.as_ref().map_or(0.0, |c| c.duration_seconds);

        let mut seen = HashSet::new();
        let mut takes = Vec::new();
        for t in input.takes {
            if !(0.0..=duration).contains(&t.start_time) || !(t.start_time..=duration).contains(&t.end_time) || t.start_time >= t.end_time {
                continue;
            }
            if !seen.insert(t.id.clone()) {
                continue;
            }
            takes.push(Take { id: t.id, name: t.name, start_time: t.start_time, end_time: t.end_time });
        }

        let clip = ctx
            .state
            .data
            .animation
            .get_or_insert_with(|| mf_core::Clip { duration_seconds: duration.max(1.0), tracks: Vec::new(), takes: None });
        clip.takes = Some(takes.clone());
        clip.normalize();
        ctx.emit(EventKind::AnimationTakesChanged, json!({"takeCount": takes.len()}));
        Ok(json!({"takeCount": takes.len()}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_bus::EventSequencer;
    use mf_core::{load_project_json, RuntimeState};

    fn state_with_one_object() -> RuntimeState {
        let json = r#"{"version":4,"objects":[{"id":"obj_1","name":"Cube One","bindPath":"Cube_One","geometryType":"box","color":4491007,"position":[0,0.5,0],"rotation":[0,0,0],"scale":[1,1,1]}]}"#;
        let result = load_project_json(json, 1_000_000).unwrap();
        RuntimeState { data: result.data, selected_object_id: None, dirty: false, hierarchy: mf_core::Hierarchy::new() }
    }

    fn dispatch(state: &mut RuntimeState, id: &str, input: Value) -> MfResult<mf_bus::ActionResult> {
        let registry = build_registry();
        let mut seq = EventSequencer::new();
        registry.dispatch(id, state, &mut seq, input)
    }

    #[test]
    fn selection_set_rejects_unknown_id() {
        let mut state = state_with_one_object();
        let err = dispatch(&mut state, "selection.set", json!({"objectId": "obj_99"})).unwrap_err();
        assert_eq!(err.code, MfErrorCode::NotFound);
    }

    #[test]
    fn selection_set_emits_once_then_is_idempotent() {
        let mut state = state_with_one_object();
        let r1 = dispatch(&mut state, "selection.set", json!({"objectId": "obj_1"})).unwrap();
        assert_eq!(r1.events.len(), 1);
        let r2 = dispatch(&mut state, "selection.set", json!({"objectId": "obj_1"})).unwrap();
        assert!(r2.events.is_empty());
    }

    #[test]
    fn add_primitive_mints_next_id_and_unique_bind_path() {
        let mut state = state_with_one_object();
        let result = dispatch(&mut state, "scene.addPrimitive", json!({"type": "sphere", "name": "Cube One"})).unwrap();
        assert_eq!(result.result["objectId"], "obj_2");
        let added = &state.data.objects[1];
        assert_ne!(added.bind_path, state.data.objects[0].bind_path);
    }

    #[test]
    fn duplicate_selected_requires_selection() {
        let mut state = state_with_one_object();
        let err = dispatch(&mut state, "scene.duplicateSelected", json!({})).unwrap_err();
        assert_eq!(err.code, MfErrorCode::NoSelection);
    }

    #[test]
    fn duplicate_selected_offsets_position_and_copies_tracks() {
        let mut state = state_with_one_object();
        state.selected_object_id = Some("obj_1".to_string());
        dispatch(
            &mut state,
            "animation.insertRecords",
            json!({"records": [{"objectId": "obj_1", "propertyPath": "position.x", "time": 0.0, "value": 1.0}]}),
        )
        .unwrap();
        let result = dispatch(&mut state, "scene.duplicateSelected", json!({})).unwrap();
        let new_id = result.result["objectId"].as_str().unwrap().to_string();
        let dup = state.data.objects.iter().find(|o| o.id == new_id).unwrap();
        assert_eq!(dup.position, [0.6, 0.5, 0.6]);
        let clip = state.data.animation.unwrap();
        assert!(clip.tracks.iter().any(|t| t.object_id == new_id));
    }

    #[test]
    fn delete_selected_requires_confirm() {
        let mut state = state_with_one_object();
        let err = dispatch(&mut state, "scene.deleteSelected", json!({"objectId": "obj_1"})).unwrap_err();
        assert_eq!(err.code, MfErrorCode::ConfirmRequired);
    }

    #[test]
    fn delete_selected_removes_descendants() {
        let mut state = state_with_one_object();
        dispatch(&mut state, "scene.addPrimitive", json!({"type": "box", "name": "Child"})).unwrap();
        dispatch(&mut state, "scene.parent", json!({"childId": "obj_2", "parentId": "obj_1"})).unwrap();
        dispatch(&mut state, "scene.deleteSelected", json!({"objectId": "obj_1", "confirm": true})).unwrap();
        assert!(state.data.objects.is_empty());
        assert!(state.hierarchy.is_empty());
    }

    #[test]
    fn parent_rejects_cycles() {
        let mut state = state_with_one_object();
        dispatch(&mut state, "scene.addPrimitive", json!({"type": "box", "name": "Child"})).unwrap();
        dispatch(&mut state, "scene.parent", json!({"childId": "obj_2", "parentId": "obj_1"})).unwrap();
        let err = dispatch(&mut state, "scene.parent", json!({"childId": "obj_1", "parentId": "obj_2"})).unwrap_err();
        assert_eq!(err.code, MfErrorCode::InvalidInput);
    }

    #[test]
    fn rename_many_only_touches_rows_that_exist_and_change() {
        let mut state = state_with_one_object();
        let result = dispatch(
            &mut state,
            "hierarchy.renameMany",
            json!({"changes": [{"objectId": "obj_1", "name": "Cube One"}, {"objectId": "obj_1", "name": "Renamed"}, {"objectId": "nope", "name": "x"}]}),
        )
        .unwrap();
        assert_eq!(result.result["renamed"], json!(["obj_1"]));
        assert_eq!(state.data.objects[0].name, "Renamed");
    }

    #[test]
    fn material_set_is_noop_with_all_fields_undefined() {
        let mut state = state_with_one_object();
        let result = dispatch(&mut state, "material.set", json!({"objectId": "obj_1"})).unwrap();
        assert_eq!(result.result["changed"], json!(Vec::<String>::new()));
    }

    #[test]
    fn material_set_clamps_out_of_range_values() {
        let mut state = state_with_one_object();
        dispatch(&mut state, "material.set", json!({"objectId": "obj_1", "metallic": 5.0})).unwrap();
        assert_eq!(state.data.objects[0].metallic, Some(1.0));
    }

    #[test]
    fn insert_records_fills_bind_path_on_new_track() {
        let mut state = state_with_one_object();
        dispatch(
            &mut state,
            "animation.insertRecords",
            json!({"records": [{"objectId": "obj_1", "propertyPath": "position.y", "time": 0.0, "value": 1.0}]}),
        )
        .unwrap();
        let clip = state.data.animation.unwrap();
        assert_eq!(clip.tracks[0].bind_path.as_deref(), Some("Cube_One"));
    }

    #[test]
    fn set_duration_rejects_non_positive() {
        let mut state = state_with_one_object();
        let err = dispatch(&mut state, "animation.setDuration", json!({"durationSeconds": 0.0})).unwrap_err();
        assert_eq!(err.code, MfErrorCode::InvalidInput);
    }

    #[test]
    fn set_takes_drops_out_of_range_rows() {
        let mut state = state_with_one_object();
        dispatch(&mut state, "animation.setDuration", json!({"durationSeconds": 2.0})).unwrap();
        let result = dispatch(
            &mut state,
            "animation.setTakes",
            json!({"takes": [
                {"id": "t1", "name": "Good", "startTime": 0.0, "endTime": 1.0},
                {"id": "t2", "name": "OutOfRange", "startTime": 0.0, "endTime": 5.0}
            ]}),
        )
        .unwrap();
        assert_eq!(result.result["takeCount"], 1);
    }
}
