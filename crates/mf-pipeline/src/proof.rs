// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `proof.json` audit artifact `make_bundle` writes alongside its
//! outputs (spec §4.8 step 8, §9).

use serde::Serialize;

/// One derived take, echoed into the proof for traceability.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeProof {
    /// Take name.
    pub name: String,
    /// Inclusive start time, in seconds, on the final absolute clip.
    pub start_time: f64,
    /// Exclusive end time, in seconds, on the final absolute clip.
    pub end_time: f64,
}

/// Build identity, carried so a proof can be traced back to the server that
/// produced it (spec §6: `GITHUB_SHA`, first 7 chars, optional).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolingInfo {
    /// The contract version every envelope-producing tool reports.
    pub mcp_version: String,
    /// Short commit hash, if `GITHUB_SHA` was set at build/run time.
    pub commit: Option<String>,
}

/// Per-take keyframe counts, from `previewDiff`ing that take's compiled script.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDiffEntry {
    /// Which take this diff belongs to.
    pub take: String,
    /// Keyframes that take's script would add (or added, if applied).
    pub keyframes_added: usize,
    /// Keyframes that take's script would delete (or deleted, if applied).
    pub keyframes_deleted: usize,
}

/// Sum across every [`ScriptDiffEntry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffTotals {
    /// Total keyframes added across every take's script.
    pub keyframes_added: usize,
    /// Total keyframes deleted across every take's script.
    pub keyframes_deleted: usize,
}

/// Per-take diffs plus their sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    /// One entry per take, in derivation order.
    pub scripts: Vec<ScriptDiffEntry>,
    /// The sum of every entry in `scripts`.
    pub totals: DiffTotals,
}

impl DiffSummary {
    /// Fold `entry` into `scripts` and `totals`.
    pub fn push(&mut self, entry: ScriptDiffEntry) {
        self.totals.keyframes_added += entry.keyframes_added;
        self.totals.keyframes_deleted += entry.keyframes_deleted;
        self.scripts.push(entry);
    }
}

/// Paths the pipeline wrote, relative to `outDir`. Empty on a preview-only
/// or failed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outputs {
    /// `project.json`, if written.
    pub project_json: Option<String>,
    /// `motionforge-bundle.zip`, if written.
    pub bundle: Option<String>,
    /// `motionforge-manifest.json`, if written.
    pub manifest: Option<String>,
    /// `proof.json` itself, always written once the pipeline has a result to report.
    pub proof: Option<String>,
}

/// The deterministic audit document `make_bundle` writes to `outDir/proof.json`
/// (spec §4.8, §9: identical inputs produce an identical proof, modulo the
/// caller-supplied `exportedAt`/commit fields this document does not itself hash).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofDocument {
    /// Always `1`.
    pub schema_version: u32,
    /// True iff nothing was committed (either `confirm=false`, or a step failed).
    pub preview_only: bool,
    /// The goal text the caller supplied.
    pub goal: String,
    /// The takes this run derived (explicit or goal-parsed).
    pub takes: Vec<TakeProof>,
    /// `sha256_hex` of the resolved input project JSON.
    pub input_hash: String,
    /// `sha256_hex` of the final exported project JSON, once committed.
    pub output_project_hash: Option<String>,
    /// `sha256_hex` of the exported bundle's bytes, once committed.
    pub bundle_hash: Option<String>,
    /// Build/commit identity.
    pub tooling: ToolingInfo,
    /// Per-take and total keyframe diffs.
    pub diff_summary: DiffSummary,
    /// Where outputs were written, if they were.
    pub outputs: Outputs,
    /// Total bytes written across `outputs`, once committed.
    pub bytes: Option<u64>,
    /// Non-fatal notices (e.g. the Unity glTF-animation limitation).
    pub warnings: Vec<String>,
    /// Failure messages, non-empty iff this run did not commit due to an error.
    pub errors: Vec<String>,
}
