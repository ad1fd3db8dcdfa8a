// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-pipeline
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use mf_bundle::BundleOptions;
use mf_core::{sha256_hex, serialize_stable, ProjectData};
use mf_error::{MfError, MfErrorCode, MfResult};
use mf_plan::{Constraints, PlanRegistry, Scope};
use mf_runtime::Runtime;
use tracing::{debug, info, warn};

/// The `proof.json` document and its constituent types.
pub mod proof;
/// `mf.skill.generateScript` and per-take script rebasing.
pub mod script;
/// Target and take resolution.
pub mod takes;

pub use proof::{DiffSummary, DiffTotals, Outputs, ProofDocument, ScriptDiffEntry, TakeProof, ToolingInfo};
pub use takes::{derive_takes, normalize_bind_paths, resolve_target, TakeSpec, TargetSelector};

/// `mf.pipeline.makeBundle`'s input (spec §4.8).
#[derive(Debug, Clone, Default)]
pub struct MakeBundleInput {
    /// Inline project JSON to resolve the input project from.
    pub in_json: Option<String>,
    /// Base64-encoded `motionforge-bundle.zip` bytes to resolve the input project from.
    pub in_bundle_base64: Option<String>,
    /// Free-text description of the motion to produce.
    pub goal: String,
    /// Explicit take list; overrides goal-text parsing when present.
    pub takes: Option<Vec<TakeSpec>>,
    /// Recipe constraints passed through to each per-take script generation.
    pub constraints: Constraints,
    /// Explicit target object/instance hint.
    pub target: Option<TargetSelector>,
    /// Emit the Unity bundle variant.
    pub unity: bool,
    /// Where to write `project.json`, the bundle, the manifest, and the proof.
    pub out_dir: PathBuf,
    /// Whether to actually commit and export, or only preview.
    pub confirm: bool,
}

/// `make_bundle`'s result: whether it committed, and the proof describing what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct MakeBundleOutcome {
    /// True iff the run committed and exported a bundle.
    pub ok: bool,
    /// The proof document (also written to `outDir/proof.json`).
    pub proof: ProofDocument,
}

const MANIFEST_FILE: &str = "motionforge-manifest.json";
const BUNDLE_FILE: &str = "motionforge-bundle.zip";
const PROJECT_FILE: &str = "project.json";
const PROOF_FILE: &str = "proof.json";

fn pipeline_error(stage: &str, err: impl std::fmt::Display) -> MfError {
    MfError::new(MfErrorCode::PipelineMakeBundle, format!("{stage}: {err}")).with_context("stage", stage)
}

/// Run the full make-bundle pipeline against `runtime` (spec §4.8's 8 steps).
///
/// `exported_at` and `commit` are ambient values the caller supplies so this
/// crate never reads the wall clock or the environment itself (mirrors
/// `mf-bundle`'s `BundleOptions::exported_at` contract).
///
/// # Errors
///
/// Returns `Err` only for failures that leave nothing to report: malformed
/// input resolution (bad base64, a bundle with no `project.json`), an
/// unresolvable target before anything was staged, or an I/O failure
/// writing outputs/the proof itself (`MF_ERR_PIPELINE_MAKE_BUNDLE`). A
/// failure partway through the per-take script loop is reported as
/// `Ok(MakeBundleOutcome { ok: false, .. })` with `proof.errors` populated,
/// per spec §4.8 step 7.
pub fn make_bundle(runtime: &mut Runtime, input: MakeBundleInput, exported_at: &str, commit: Option<String>) -> MfResult<MakeBundleOutcome> {
    let tooling = ToolingInfo { mcp_version: mf_core::CONTRACT_VERSION.to_string(), commit };

    // Step 1: resolve the input project JSON and its hash.
    let input_json = resolve_input_json(runtime, &input)?;
    let input_hash = sha256_hex(input_json.as_bytes());

    // Step 2: stage it.
    runtime.load_project_json(&input_json, true)?;

    // Step 3: resolve the target object against the staged project.
    let staged_json = runtime.project_json_at_scope(Scope::Staged)?;
    let staged_data: ProjectData = serde_json::from_str(&staged_json)
        .map_err(|e| MfError::new(MfErrorCode::InvalidProject, format!("staged project failed to parse: {e}")))?;
    let target_id = match resolve_target(&staged_data, input.target.as_ref()) {
        Ok(id) => id,
        Err(err) => {
            runtime.discard_staged_load();
            return Err(err);
        }
    };

    // Step 4: derive takes.
    let base_duration = staged_data.animation.as_ref().map_or(1.0, |c| c.duration_seconds);
    let derived_takes = derive_takes(&input.goal, input.takes.as_deref(), base_duration);
    let total_duration = derived_takes.iter().map(|t| t.end_time).fold(0.0_f64, f64::max).max(0.1);

    let take_proofs: Vec<TakeProof> = derived_takes.iter().map(|t| TakeProof { name: t.name.clone(), start_time: t.start_time, end_time: t.end_time }).collect();

    // Step 5: drive each take's script against the staged project.
    let mut diff_summary = DiffSummary::default();
    let mut warnings = Vec::new();

    for take in &derived_takes {
        let sub_goal = takes::sub_goal_for_take(&take.name, &input.goal);
        let mut take_constraints = input.constraints.clone();
        take_constraints.target_objects = Some(vec![target_id.clone()]);
        take_constraints.duration_seconds = Some((take.end_time - take.start_time).max(0.1));

        let run = run_take_script(runtime, &sub_goal, &take_constraints, &target_id, take.start_time, total_duration, input.confirm);
        match run {
            Ok(diff) => diff_summary.push(ScriptDiffEntry { take: take.name.clone(), keyframes_added: diff.0, keyframes_deleted: diff.1 }),
            Err(err) => {
                runtime.discard_staged_load();
                return Ok(failed_outcome(&input.out_dir, input.goal, take_proofs, input_hash, tooling, diff_summary, vec![err.to_string()]));
            }
        }
    }

    // Step 6: persist the take list itself.
    let persist_script = derived_takes.iter().map(|t| format!("take \"{}\" from {} to {}", t.name, t.start_time, t.end_time)).collect::<Vec<_>>().join("\n");
    if let Err(err) = run_plain_script(runtime, &persist_script, input.confirm) {
        runtime.discard_staged_load();
        return Ok(failed_outcome(&input.out_dir, input.goal, take_proofs, input_hash, tooling, diff_summary, vec![err.to_string()]));
    }

    // Step 7: preview-only runs never commit.
    if !input.confirm {
        runtime.discard_staged_load();
        info!(goal = %input.goal, takes = derived_takes.len(), "pipeline previewed without committing");
        return Ok(failed_outcome(&input.out_dir, input.goal, take_proofs, input_hash, tooling, diff_summary, Vec::new()));
    }

    // Step 8: commit, export, and write outputs.
    runtime.commit_staged_load()?;
    let mut final_data = runtime.current().data.clone();

    if input.unity {
        normalize_bind_paths(&mut final_data);
    }

    let final_project_json = serialize_stable(&final_data)?;
    let output_project_hash = sha256_hex(final_project_json.as_bytes());

    let bundle = mf_bundle::export(&final_data, &BundleOptions { exported_at: exported_at.to_string(), unity: input.unity })?;
    warnings.extend(bundle.warnings.clone());
    let bundle_hash = sha256_hex(&bundle.bytes);
    let manifest_json = serde_json::to_string_pretty(&bundle.manifest).map_err(|e| pipeline_error("serialize manifest", e))?;

    std::fs::create_dir_all(&input.out_dir).map_err(|e| pipeline_error("create outDir", e))?;
    write_file(&input.out_dir.join(PROJECT_FILE), final_project_json.as_bytes())?;
    write_file(&input.out_dir.join(BUNDLE_FILE), &bundle.bytes)?;
    write_file(&input.out_dir.join(MANIFEST_FILE), manifest_json.as_bytes())?;

    let bytes_written = (final_project_json.len() + bundle.bytes.len() + manifest_json.len()) as u64;

    let mut proof = ProofDocument {
        schema_version: 1,
        preview_only: false,
        goal: input.goal,
        takes: take_proofs,
        input_hash,
        output_project_hash: Some(output_project_hash),
        bundle_hash: Some(bundle_hash),
        tooling,
        diff_summary,
        outputs: Outputs {
            project_json: Some(PROJECT_FILE.to_string()),
            bundle: Some(BUNDLE_FILE.to_string()),
            manifest: Some(MANIFEST_FILE.to_string()),
            proof: Some(PROOF_FILE.to_string()),
        },
        bytes: Some(bytes_written),
        warnings,
        errors: Vec::new(),
    };
    write_proof(&input.out_dir, &mut proof)?;

    info!(goal = %proof.goal, bundle_hash = ?proof.bundle_hash, "pipeline committed and exported a bundle");
    Ok(MakeBundleOutcome { ok: true, proof })
}

fn failed_outcome(
    out_dir: &Path,
    goal: String,
    takes: Vec<TakeProof>,
    input_hash: String,
    tooling: ToolingInfo,
    diff_summary: DiffSummary,
    errors: Vec<String>,
) -> MakeBundleOutcome {
    let mut proof = ProofDocument {
        schema_version: 1,
        preview_only: true,
        goal,
        takes,
        input_hash,
        output_project_hash: None,
        bundle_hash: None,
        tooling,
        diff_summary,
        outputs: Outputs::default(),
        bytes: None,
        warnings: Vec::new(),
        errors,
    };
    if let Err(err) = write_proof(out_dir, &mut proof) {
        warn!(error = %err, "failed to write preview-only proof to outDir");
    }
    MakeBundleOutcome { ok: false, proof }
}

fn write_proof(out_dir: &Path, proof: &mut ProofDocument) -> MfResult<()> {
    proof.outputs.proof = Some(PROOF_FILE.to_string());
    let json = serde_json::to_string_pretty(proof).map_err(|e| pipeline_error("serialize proof", e))?;
    std::fs::create_dir_all(out_dir).map_err(|e| pipeline_error("create outDir", e))?;
    write_file(&out_dir.join(PROOF_FILE), json.as_bytes())
}

fn write_file(path: &Path, bytes: &[u8]) -> MfResult<()> {
    std::fs::write(path, bytes).map_err(|e| pipeline_error(&format!("write {}", path.display()), e))
}

/// Resolve the input project JSON per spec §4.8 step 1: inline JSON, else a
/// bundle's `project.json`, else the live runtime's current project.
fn resolve_input_json(runtime: &Runtime, input: &MakeBundleInput) -> MfResult<String> {
    if let Some(json) = &input.in_json {
        return Ok(json.clone());
    }
    if let Some(b64) = &input.in_bundle_base64 {
        let bytes = BASE64.decode(b64).map_err(|e| MfError::new(MfErrorCode::InvalidInput, format!("inBundleBase64 is not valid base64: {e}")))?;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| MfError::new(MfErrorCode::InvalidInput, format!("inBundleBase64 is not a valid zip: {e}")))?;
        let mut file = archive
            .by_name(PROJECT_FILE)
            .map_err(|e| MfError::new(MfErrorCode::InvalidInput, format!("inBundleBase64 has no {PROJECT_FILE}: {e}")))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| MfError::new(MfErrorCode::InvalidInput, format!("{PROJECT_FILE} is not valid UTF-8: {e}")))?;
        return Ok(contents);
    }
    runtime.export_project_json()
}

/// Generate, rebase, compile, and (if `confirm`) apply one take's script
/// against `runtime`'s staged project. Always previews first so the diff
/// counts are available regardless of whether the step actually applies.
fn run_take_script(
    runtime: &mut Runtime,
    sub_goal: &str,
    constraints: &Constraints,
    target_id: &str,
    offset: f64,
    absolute_duration: f64,
    confirm: bool,
) -> MfResult<(usize, usize)> {
    let script_text = script::generate_script(runtime, Scope::Staged, sub_goal, constraints)?;
    let rebased = script::rebase_script(&script_text, target_id, offset, absolute_duration)
        .map_err(|issues| MfError::new(MfErrorCode::InvalidInput, format!("failed to rebase generated script: {issues:?}")))?;
    debug!(sub_goal, offset, "rebased per-take script");
    run_plain_script(runtime, &rebased, confirm)
}

/// Compile `script` against the staged project, preview its diff, and (if
/// `confirm`) apply it in place, returning `(keyframesAdded, keyframesDeleted)`.
fn run_plain_script(runtime: &mut Runtime, script: &str, confirm: bool) -> MfResult<(usize, usize)> {
    let compiled = mf_script::compile(runtime, Scope::Staged, script).map_err(|issues| {
        MfError::new(MfErrorCode::InvalidInput, format!("script failed to compile: {issues:?}"))
    })?;

    let diff = mf_plan::preview_diff(&compiled.plan, runtime)?;
    let added: usize = diff.animation.iter().map(|a| a.keyframes_added).sum();
    let deleted: usize = diff.animation.iter().map(|a| a.keyframes_deleted).sum();

    if confirm {
        let mut registry = PlanRegistry::new();
        let plan_id = compiled.plan.plan_id.clone();
        registry.insert(compiled.plan);
        mf_plan::apply(&mut registry, &plan_id, runtime, true)?;
    }

    Ok((added, deleted))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{"version":4,"objects":[{"id":"obj_1","name":"Cube One","bindPath":"Cube_One","geometryType":"box","color":4491007,"position":[0,0.5,0],"rotation":[0,0,0],"scale":[1,1,1]}]}"#;

    fn runtime_with_fixture() -> Runtime {
        let mut rt = Runtime::default();
        rt.load_project_json(FIXTURE, false).unwrap();
        rt
    }

    #[test]
    fn preview_only_run_does_not_commit_and_reports_takes() {
        let mut rt = runtime_with_fixture();
        let dir = tempfile::tempdir().unwrap();
        let input = MakeBundleInput {
            in_json: Some(FIXTURE.to_string()),
            goal: "idle loop then recoil".to_string(),
            out_dir: dir.path().to_path_buf(),
            confirm: false,
            ..Default::default()
        };
        let outcome = make_bundle(&mut rt, input, "1970-01-01T00:00:00Z", None).unwrap();
        assert!(!outcome.ok);
        assert!(outcome.proof.preview_only);
        assert_eq!(outcome.proof.takes.len(), 2);
        assert_eq!(outcome.proof.takes[0].name, "Idle");
        assert_eq!(outcome.proof.takes[1].name, "Recoil");
        assert!(!rt.has_staged());
    }

    #[test]
    fn confirmed_run_commits_and_writes_a_bundle() {
        let mut rt = runtime_with_fixture();
        let dir = tempfile::tempdir().unwrap();
        let input = MakeBundleInput {
            in_json: Some(FIXTURE.to_string()),
            goal: "idle loop then recoil".to_string(),
            out_dir: dir.path().to_path_buf(),
            confirm: true,
            ..Default::default()
        };
        let outcome = make_bundle(&mut rt, input, "1970-01-01T00:00:00Z", None).unwrap();
        assert!(outcome.ok);
        assert!(!outcome.proof.preview_only);
        assert!(outcome.proof.output_project_hash.is_some());
        assert!(outcome.proof.bundle_hash.is_some());
        assert!(dir.path().join(PROJECT_FILE).exists());
        assert!(dir.path().join(BUNDLE_FILE).exists());
        assert!(dir.path().join(MANIFEST_FILE).exists());
        assert!(dir.path().join(PROOF_FILE).exists());
    }

    #[test]
    fn identical_inputs_produce_identical_hashes() {
        let mut rt_a = runtime_with_fixture();
        let mut rt_b = runtime_with_fixture();
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let make = |dir: &Path| MakeBundleInput {
            in_json: Some(FIXTURE.to_string()),
            goal: "bounce".to_string(),
            out_dir: dir.to_path_buf(),
            confirm: true,
            ..Default::default()
        };
        let outcome_a = make_bundle(&mut rt_a, make(dir_a.path()), "2024-01-01T00:00:00Z", None).unwrap();
        let outcome_b = make_bundle(&mut rt_b, make(dir_b.path()), "2024-01-01T00:00:00Z", None).unwrap();
        assert_eq!(outcome_a.proof.output_project_hash, outcome_b.proof.output_project_hash);
        assert_eq!(outcome_a.proof.bundle_hash, outcome_b.proof.bundle_hash);
    }

    #[test]
    fn unresolvable_target_is_an_error_and_discards_staged() {
        let mut rt = runtime_with_fixture();
        let dir = tempfile::tempdir().unwrap();
        let input = MakeBundleInput {
            in_json: Some(FIXTURE.to_string()),
            goal: "bounce".to_string(),
            target: Some(TargetSelector { select: "nope".to_string() }),
            out_dir: dir.path().to_path_buf(),
            confirm: true,
            ..Default::default()
        };
        let err = make_bundle(&mut rt, input, "1970-01-01T00:00:00Z", None).unwrap_err();
        assert_eq!(err.code, MfErrorCode::NotFound);
        assert!(!rt.has_staged());
    }
}
