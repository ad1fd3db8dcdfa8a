// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-tool input shapes and handlers for the fixed catalog in
//! [`crate::catalog`] (spec §4.7).
//!
//! Every handler returns a fully-formed envelope `Value`
//! (`{ok:true, ...}` or `{ok:false, error:{code,message}}`) rather than a
//! `Result`: tool handlers never propagate errors across the boundary
//! (spec §7 "exceptions never cross the tool boundary").

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use mf_bundle::{BundleExport, BundleOptions};
use mf_error::{MfError, MfErrorCode, MfResult};
use mf_plan::{Constraints, Scope};
use mf_runtime::ActionResult;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::ServerState;

/// An input shape with no fields, for tools that take no arguments.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct EmptyInput {}

/// `mf.project.loadJson`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadJsonInput {
    /// Raw project JSON to parse, migrate, and validate.
    pub json: String,
    /// Write to `staged` (default) rather than replacing `current` outright.
    #[serde(default = "default_true")]
    pub staged: bool,
}

fn default_true() -> bool {
    true
}

/// `mf.command.execute`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteInput {
    /// The action id (or `history.undo`/`history.redo`).
    pub action: String,
    /// The action's input payload.
    #[serde(default)]
    pub input: Value,
    /// Optional audit label recorded on the resulting undo entry (spec §9
    /// open question: an explicit opt-in label rather than an inferred one).
    #[serde(default)]
    pub label: Option<String>,
}

/// `mf.plan.generate`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanGenerateInput {
    /// Which half of the runtime to generate against. Defaults to `current`.
    #[serde(default)]
    pub scope: Option<Scope>,
    /// Free-text goal, matched against the closed recipe trigger phrases.
    pub goal: String,
    /// Target/style/loop/duration constraints.
    #[serde(default)]
    pub constraints: Constraints,
}

/// `mf.plan.previewDiff` / `mf.plan.discard`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanIdInput {
    /// The plan id returned by `plan.generate` or `script.compile`.
    pub plan_id: String,
}

/// `mf.plan.apply`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanApplyInput {
    /// The plan id to apply.
    pub plan_id: String,
    /// Required `true` when `plan.safety.requiresConfirm` is set.
    #[serde(default)]
    pub confirm: bool,
}

/// `mf.script.validate` / `mf.script.compile`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptInput {
    /// The DSL script source text.
    pub script: String,
    /// Which half of the runtime to resolve object names against. Defaults to `current`.
    #[serde(default)]
    pub scope: Option<Scope>,
}

/// `applyMode` for `mf.script.run` (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ApplyMode {
    /// Compile and preview only; never touches the runtime.
    PreviewOnly,
    /// Compile, preview, and apply if the confirm gate is satisfied.
    Apply,
}

/// `mf.script.run`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRunInput {
    /// The DSL script source text.
    pub script: String,
    /// Which half of the runtime to resolve object names against. Defaults to `current`.
    #[serde(default)]
    pub scope: Option<Scope>,
    /// Whether to only preview, or to also apply.
    pub apply_mode: ApplyMode,
    /// Required `true` to apply a plan whose safety gate demands it.
    #[serde(default)]
    pub confirm: bool,
}

/// `mf.skill.generateScript`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkillGenerateInput {
    /// Free-text goal, matched against the closed recipe trigger phrases.
    pub goal: String,
    /// Which half of the runtime to generate against. Defaults to `current`.
    #[serde(default)]
    pub scope: Option<Scope>,
    /// Target/style/loop/duration constraints.
    #[serde(default)]
    pub constraints: Constraints,
}

/// `mf.export.bundle` / `mf.export.unityPackage`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundleInput {
    /// ISO-8601 timestamp to stamp into the manifest; the caller owns
    /// reproducibility (spec §9: `mf-bundle` never reads the wall clock).
    pub exported_at: String,
}

/// `mf.io.readFileBase64`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileInput {
    /// Path to read.
    pub path: String,
}

/// `mf.io.writeFile`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileInput {
    /// Path to write.
    pub path: String,
    /// Base64-encoded file contents.
    pub content_base64: String,
}

/// `mf.pipeline.makeBundle`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MakeBundleInput {
    /// Inline project JSON to resolve the input project from.
    #[serde(default)]
    pub in_json: Option<String>,
    /// Base64-encoded bundle zip to resolve the input project from.
    #[serde(default)]
    pub in_bundle_base64: Option<String>,
    /// Free-text description of the motion to produce.
    pub goal: String,
    /// Explicit take list; overrides goal-text parsing when present.
    #[serde(default)]
    pub takes: Option<Vec<mf_pipeline::TakeSpec>>,
    /// Recipe constraints passed through to each per-take script generation.
    #[serde(default)]
    pub constraints: Constraints,
    /// Explicit target object/instance hint.
    #[serde(default)]
    pub target: Option<mf_pipeline::TargetSelector>,
    /// Emit the Unity bundle variant.
    #[serde(default)]
    pub unity: bool,
    /// Where to write `project.json`, the bundle, the manifest, and the proof.
    pub out_dir: String,
    /// Whether to actually commit and export, or only preview.
    #[serde(default)]
    pub confirm: bool,
    /// ISO-8601 timestamp stamped into the bundle manifest.
    pub exported_at: String,
}

fn ok(result: Value) -> Value {
    let mut map = match result {
        Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    map.insert("ok".to_string(), json!(true));
    Value::Object(map)
}

fn err(error: &MfError) -> Value {
    json!({ "ok": false, "error": error.to_envelope() })
}

fn parse_input<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, MfError> {
    serde_json::from_value(arguments).map_err(|e| MfError::new(MfErrorCode::InvalidInput, format!("invalid input: {e}")))
}

fn action_result_to_value(result: ActionResult) -> Value {
    json!({ "result": result.result, "events": result.events })
}

/// Dispatch one `tools/call` by name, returning the envelope.
///
/// Unknown tool names produce `{ok:false, error:{code:"MF_ERR_INVALID_INPUT", ...}}`
/// rather than panicking, so a malformed or version-skewed client gets a
/// tool-level error instead of a transport failure.
#[must_use]
pub fn dispatch(state: &mut ServerState, name: &str, arguments: Value) -> Value {
    let result = dispatch_inner(state, name, arguments);
    match result {
        Ok(value) => value,
        Err(e) => err(&e),
    }
}

fn dispatch_inner(state: &mut ServerState, name: &str, arguments: Value) -> MfResult<Value> {
    match name {
        "mf.ping" => Ok(ok(json!({ "pong": true }))),
        "mf.capabilities" => Ok(ok(crate::catalog::capabilities(state.tooling_commit.as_deref()))),
        "mf.project.loadJson" => project_load_json(state, arguments),
        "mf.project.commit" => project_commit(state),
        "mf.project.discard" => project_discard(state),
        "mf.state.snapshot" => Ok(ok(serde_json::to_value(state.runtime.snapshot()).unwrap_or(Value::Null))),
        "mf.command.execute" => command_execute(state, arguments),
        "mf.plan.generate" => plan_generate(state, arguments),
        "mf.plan.previewDiff" => plan_preview_diff(state, arguments),
        "mf.plan.apply" => plan_apply(state, arguments),
        "mf.plan.discard" => plan_discard(state, arguments),
        "mf.script.validate" => script_validate(arguments),
        "mf.script.compile" => script_compile(state, arguments),
        "mf.script.run" => script_run(state, arguments),
        "mf.script.examples" => Ok(ok(script_examples())),
        "mf.skill.generateScript" => skill_generate_script(state, arguments),
        "mf.export.bundle" => export_bundle(state, arguments, false),
        "mf.export.unityPackage" => export_bundle(state, arguments, true),
        "mf.export.video" => Err(MfError::new(MfErrorCode::HeadlessVideoUnsupported, "headless video encoding is out of scope for this runtime")),
        "mf.export.projectJson" => Ok(ok(json!({ "projectJson": state.runtime.export_project_json()? }))),
        "mf.io.readFileBase64" => io_read_file(state, arguments),
        "mf.io.writeFile" => io_write_file(state, arguments),
        "mf.pipeline.makeBundle" => pipeline_make_bundle(state, arguments),
        other => Err(MfError::new(MfErrorCode::InvalidInput, format!("unknown tool '{other}'")).with_context("tool", other)),
    }
}

fn project_load_json(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: LoadJsonInput = parse_input(arguments)?;
    let summary = state.runtime.load_project_json(&input.json, input.staged)?;
    Ok(ok(serde_json::to_value(summary).unwrap_or(Value::Null)))
}

fn project_commit(state: &mut ServerState) -> MfResult<Value> {
    state.runtime.commit_staged_load()?;
    info!("committed staged project load");
    Ok(ok(json!({})))
}

fn project_discard(state: &mut ServerState) -> MfResult<Value> {
    state.runtime.discard_staged_load();
    Ok(ok(json!({})))
}

fn command_execute(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: ExecuteInput = parse_input(arguments)?;
    if !state.runtime.action_ids().contains(&input.action.as_str()) && !matches!(input.action.as_str(), "history.undo" | "history.redo") {
        return Err(MfError::new(MfErrorCode::UnknownAction, format!("unknown action '{}'", input.action)).with_context("action", input.action));
    }
    let result = state.runtime.execute(&input.action, input.input, input.label)?;
    Ok(ok(action_result_to_value(result)))
}

fn plan_generate(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: PlanGenerateInput = parse_input(arguments)?;
    let scope = input.scope.unwrap_or(Scope::Current);
    let plan = mf_plan::generate_plan(&state.runtime, scope, &input.goal, &input.constraints)?;
    let value = serde_json::to_value(&plan).unwrap_or(Value::Null);
    state.plans.insert(plan);
    Ok(ok(value))
}

fn plan_preview_diff(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: PlanIdInput = parse_input(arguments)?;
    let plan = state
        .plans
        .get(&input.plan_id)
        .ok_or_else(|| MfError::new(MfErrorCode::PlanNotFound, format!("no plan registered with id '{}'", input.plan_id)))?
        .clone();
    let diff = mf_plan::preview_diff(&plan, &state.runtime)?;
    Ok(ok(serde_json::to_value(diff).unwrap_or(Value::Null)))
}

fn plan_apply(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: PlanApplyInput = parse_input(arguments)?;
    let outcome = mf_plan::apply(&mut state.plans, &input.plan_id, &mut state.runtime, input.confirm)?;
    Ok(ok(json!({ "events": outcome.events, "result": { "commandsExecuted": outcome.commands_executed } })))
}

fn plan_discard(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: PlanIdInput = parse_input(arguments)?;
    let discarded = state.plans.discard(&input.plan_id);
    Ok(ok(json!({ "discarded": discarded })))
}

fn script_validate(arguments: Value) -> MfResult<Value> {
    let input: ScriptInput = parse_input(arguments)?;
    let issues = mf_script::validate_syntax(&input.script);
    Ok(ok(json!({ "valid": issues.is_empty(), "errors": issues })))
}

fn script_compile(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: ScriptInput = parse_input(arguments)?;
    let scope = input.scope.unwrap_or(Scope::Current);
    match mf_script::compile(&state.runtime, scope, &input.script) {
        Ok(output) => {
            let value = serde_json::to_value(&output.plan).unwrap_or(Value::Null);
            state.plans.insert(output.plan);
            Ok(ok(json!({ "plan": value, "warnings": output.warnings })))
        }
        Err(errors) => Err(compile_errors_to_mf_error(&errors)),
    }
}

fn script_run(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: ScriptRunInput = parse_input(arguments)?;
    let scope = input.scope.unwrap_or(Scope::Current);
    let compiled = mf_script::compile(&state.runtime, scope, &input.script).map_err(|e| compile_errors_to_mf_error(&e))?;
    let diff = mf_plan::preview_diff(&compiled.plan, &state.runtime)?;

    if matches!(input.apply_mode, ApplyMode::PreviewOnly) {
        return Ok(ok(json!({ "plan": compiled.plan, "diff": diff, "applied": false })));
    }

    let plan_id = compiled.plan.plan_id.clone();
    state.plans.insert(compiled.plan.clone());
    let outcome = mf_plan::apply(&mut state.plans, &plan_id, &mut state.runtime, input.confirm)?;
    Ok(ok(json!({
        "plan": compiled.plan,
        "diff": diff,
        "applied": true,
        "events": outcome.events,
        "result": { "commandsExecuted": outcome.commands_executed },
    })))
}

fn compile_errors_to_mf_error(errors: &[mf_script::ScriptIssue]) -> MfError {
    let message = errors.iter().map(|e| format!("{}: {}", e.path, e.message)).collect::<Vec<_>>().join("; ");
    MfError::new(MfErrorCode::InvalidInput, message).with_context("errors", errors)
}

fn script_examples() -> Value {
    json!({
        "examples": [
            {
                "name": "bounce-in-place",
                "script": "select \"obj_cube\"\nduration 1\nlabel \"bounce\"\nkey position y at 0 = 0\nkey position y at 0.5 = 0.4 ease easeOut\nkey position y at 1 = 0 ease easeIn",
            },
            {
                "name": "turn-with-takes",
                "script": "select \"obj_cube\"\nduration 2\ntake \"Main\" from 0 to 2\nkey rotation y at 0 = 0 deg\nkey rotation y at 2 = 360 deg",
            },
            {
                "name": "remove-a-key",
                "script": "select \"obj_cube\"\nduration 1\ndelete key position x at 1",
            },
        ]
    })
}

fn skill_generate_script(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: SkillGenerateInput = parse_input(arguments)?;
    let scope = input.scope.unwrap_or(Scope::Current);
    let script = mf_pipeline::script::generate_script(&state.runtime, scope, &input.goal, &input.constraints)?;
    Ok(ok(json!({ "script": script })))
}

fn export_bundle(state: &mut ServerState, arguments: Value, force_unity: bool) -> MfResult<Value> {
    let input: ExportBundleInput = parse_input(arguments)?;
    let BundleExport { bytes, manifest, warnings } =
        mf_bundle::export(&state.runtime.current().data, &BundleOptions { exported_at: input.exported_at, unity: force_unity })?;
    Ok(ok(json!({
        "bundleBase64": BASE64.encode(&bytes),
        "manifest": manifest,
        "warnings": warnings,
    })))
}

fn io_read_file(state: &ServerState, arguments: Value) -> MfResult<Value> {
    let input: ReadFileInput = parse_input(arguments)?;
    let bytes = std::fs::read(&input.path).map_err(|e| MfError::new(MfErrorCode::IoError, format!("failed to read '{}': {e}", input.path)))?;
    if bytes.len() > state.config.io_max_bytes {
        return Err(MfError::new(MfErrorCode::IoMaxBytes, format!("'{}' is {} bytes, exceeding the {} byte limit", input.path, bytes.len(), state.config.io_max_bytes)));
    }
    Ok(ok(json!({ "contentBase64": BASE64.encode(&bytes), "bytes": bytes.len() })))
}

fn io_write_file(state: &ServerState, arguments: Value) -> MfResult<Value> {
    let input: WriteFileInput = parse_input(arguments)?;
    let bytes = BASE64.decode(&input.content_base64).map_err(|e| MfError::new(MfErrorCode::InvalidInput, format!("contentBase64 is not valid base64: {e}")))?;
    if bytes.len() > state.config.io_max_bytes {
        return Err(MfError::new(MfErrorCode::IoMaxBytes, format!("write of {} bytes exceeds the {} byte limit", bytes.len(), state.config.io_max_bytes)));
    }
    if let Some(parent) = std::path::Path::new(&input.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| MfError::new(MfErrorCode::IoError, format!("failed to create parent dir for '{}': {e}", input.path)))?;
        }
    }
    std::fs::write(&input.path, &bytes).map_err(|e| MfError::new(MfErrorCode::IoError, format!("failed to write '{}': {e}", input.path)))?;
    Ok(ok(json!({ "bytes": bytes.len() })))
}

fn pipeline_make_bundle(state: &mut ServerState, arguments: Value) -> MfResult<Value> {
    let input: MakeBundleInput = parse_input(arguments)?;
    let pipeline_input = mf_pipeline::MakeBundleInput {
        in_json: input.in_json,
        in_bundle_base64: input.in_bundle_base64,
        goal: input.goal,
        takes: input.takes,
        constraints: input.constraints,
        target: input.target,
        unity: input.unity,
        out_dir: std::path::PathBuf::from(input.out_dir),
        confirm: input.confirm,
    };
    let outcome = mf_pipeline::make_bundle(&mut state.runtime, pipeline_input, &input.exported_at, state.tooling_commit.clone())?;
    if !outcome.ok {
        warn!(goal = %outcome.proof.goal, "pipeline.makeBundle ran in preview-only mode");
    }
    // Unlike every other tool, `ok` here mirrors whether the pipeline
    // actually committed (spec §4.8 step 7/8), not merely "no exception
    // was raised" — a preview-only or failed run is a normal `Ok` return
    // with `ok:false` in the envelope.
    Ok(json!({ "ok": outcome.ok, "previewOnly": outcome.proof.preview_only, "proof": outcome.proof }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_config::MotionForgeConfig;
    use mf_core::ProjectData;

    const FIXTURE: &str = r#"{"version":4,"objects":[{"id":"obj_1","name":"Cube One","bindPath":"Cube_One","geometryType":"box","color":4491007,"position":[0,0.5,0],"rotation":[0,0,0],"scale":[1,1,1]}],"animation":{"durationSeconds":2.0,"tracks":[]}}"#;

    fn new_state() -> ServerState {
        ServerState::new(MotionForgeConfig::default(), None)
    }

    #[test]
    fn ping_reports_ok() {
        let mut state = new_state();
        let response = dispatch(&mut state, "mf.ping", json!({}));
        assert_eq!(response["ok"], json!(true));
        assert_eq!(response["pong"], json!(true));
    }

    #[test]
    fn unknown_tool_is_invalid_input() {
        let mut state = new_state();
        let response = dispatch(&mut state, "mf.nope", json!({}));
        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["error"]["code"], json!("MF_ERR_INVALID_INPUT"));
    }

    #[test]
    fn load_then_commit_then_snapshot_round_trips() {
        let mut state = new_state();
        let load = dispatch(&mut state, "mf.project.loadJson", json!({ "json": FIXTURE, "staged": true }));
        assert_eq!(load["ok"], json!(true));

        let snap_before = dispatch(&mut state, "mf.state.snapshot", json!({}));
        assert_eq!(snap_before["objects"].as_array().unwrap().len(), 0);

        let commit = dispatch(&mut state, "mf.project.commit", json!({}));
        assert_eq!(commit["ok"], json!(true));

        let snap_after = dispatch(&mut state, "mf.state.snapshot", json!({}));
        assert_eq!(snap_after["objects"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn plan_generate_then_apply_without_confirm_is_rejected() {
        let mut state = new_state();
        dispatch(&mut state, "mf.project.loadJson", json!({ "json": FIXTURE, "staged": false }));
        let plan = dispatch(&mut state, "mf.plan.generate", json!({ "goal": "bounce" }));
        assert_eq!(plan["ok"], json!(true));
        let plan_id = plan["planId"].as_str().unwrap().to_string();

        let apply = dispatch(&mut state, "mf.plan.apply", json!({ "planId": plan_id, "confirm": false }));
        assert_eq!(apply["ok"], json!(false));
        assert_eq!(apply["error"]["code"], json!("MF_ERR_CONFIRM_REQUIRED"));
    }

    #[test]
    fn script_run_preview_only_never_touches_the_runtime() {
        let mut state = new_state();
        dispatch(&mut state, "mf.project.loadJson", json!({ "json": FIXTURE, "staged": false }));
        let before = dispatch(&mut state, "mf.state.snapshot", json!({}));

        let run = dispatch(
            &mut state,
            "mf.script.run",
            json!({ "script": "select \"obj_1\"\nduration 2\nkey position x at 1 = 5", "applyMode": "previewOnly" }),
        );
        assert_eq!(run["ok"], json!(true));
        assert_eq!(run["applied"], json!(false));

        let after = dispatch(&mut state, "mf.state.snapshot", json!({}));
        assert_eq!(before, after);
    }

    #[test]
    fn export_project_json_round_trips_through_parse() {
        let mut state = new_state();
        dispatch(&mut state, "mf.project.loadJson", json!({ "json": FIXTURE, "staged": false }));
        let response = dispatch(&mut state, "mf.export.projectJson", json!({}));
        let json_text = response["projectJson"].as_str().unwrap();
        let _: ProjectData = serde_json::from_str(json_text).unwrap();
    }

    #[test]
    fn export_video_is_always_unsupported() {
        let mut state = new_state();
        let response = dispatch(&mut state, "mf.export.video", json!({}));
        assert_eq!(response["error"]["code"], json!("MF_ERR_HEADLESS_VIDEO_UNSUPPORTED"));
    }

    #[test]
    fn io_roundtrip_writes_and_reads_back() {
        let mut state = new_state();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let write = dispatch(
            &mut state,
            "mf.io.writeFile",
            json!({ "path": path.to_str().unwrap(), "contentBase64": BASE64.encode(b"hello") }),
        );
        assert_eq!(write["ok"], json!(true));

        let read = dispatch(&mut state, "mf.io.readFileBase64", json!({ "path": path.to_str().unwrap() }));
        assert_eq!(read["contentBase64"], json!(BASE64.encode(b"hello")));
    }

    #[test]
    fn make_bundle_without_confirm_reports_preview_only() {
        let mut state = new_state();
        let dir = tempfile::tempdir().unwrap();
        let response = dispatch(
            &mut state,
            "mf.pipeline.makeBundle",
            json!({
                "inJson": FIXTURE,
                "goal": "bounce",
                "outDir": dir.path().to_str().unwrap(),
                "confirm": false,
                "exportedAt": "1970-01-01T00:00:00Z",
            }),
        );
        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["previewOnly"], json!(true));
    }
}
