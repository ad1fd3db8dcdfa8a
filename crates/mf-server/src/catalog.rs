// SPDX-License-Identifier: MIT OR Apache-2.0
//! The fixed 23-tool catalog (spec §4.7) and the `mf.capabilities` payload.
//!
//! Every entry's `inputSchema` is generated from the same request struct
//! `tools::dispatch` deserializes arguments into, so the schema a client
//! sees in `tools/list` can never drift from what the handler actually
//! accepts.

use schemars::{schema_for, JsonSchema};
use serde_json::{json, Value};

use crate::tools;

/// The stable, ordered tool names this server exposes. Order matches
/// spec §4.7's listing.
pub const TOOL_NAMES: &[&str] = &[
    "mf.ping",
    "mf.capabilities",
    "mf.project.loadJson",
    "mf.project.commit",
    "mf.project.discard",
    "mf.state.snapshot",
    "mf.command.execute",
    "mf.plan.generate",
    "mf.plan.previewDiff",
    "mf.plan.apply",
    "mf.plan.discard",
    "mf.script.validate",
    "mf.script.compile",
    "mf.script.run",
    "mf.script.examples",
    "mf.skill.generateScript",
    "mf.export.bundle",
    "mf.export.unityPackage",
    "mf.export.video",
    "mf.export.projectJson",
    "mf.io.readFileBase64",
    "mf.io.writeFile",
    "mf.pipeline.makeBundle",
];

fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| json!({}))
}

fn entry(name: &str, description: &str, schema: Value) -> Value {
    json!({ "name": name, "description": description, "inputSchema": schema })
}

/// Build the `tools/list` response body: `{"tools": [...]}`, one entry per
/// [`TOOL_NAMES`] in the same order.
#[must_use]
pub fn tools_list() -> Value {
    let tools = vec![
        entry("mf.ping", "Liveness check; always returns ok.", schema_of::<tools::EmptyInput>()),
        entry("mf.capabilities", "Report the tool catalog, contract version, and supported schema versions.", schema_of::<tools::EmptyInput>()),
        entry("mf.project.loadJson", "Parse, migrate, and validate project JSON into current or staged.", schema_of::<tools::LoadJsonInput>()),
        entry("mf.project.commit", "Swap the staged project into current, clearing history.", schema_of::<tools::EmptyInput>()),
        entry("mf.project.discard", "Discard any staged project load. Idempotent.", schema_of::<tools::EmptyInput>()),
        entry("mf.state.snapshot", "A deterministic view of the current project.", schema_of::<tools::EmptyInput>()),
        entry("mf.command.execute", "Run a command-bus action (or history.undo/redo) against current.", schema_of::<tools::ExecuteInput>()),
        entry("mf.plan.generate", "Generate a Plan from a goal and constraints via the recipe table.", schema_of::<tools::PlanGenerateInput>()),
        entry("mf.plan.previewDiff", "Simulate a registered plan's mutate steps and return the structural diff.", schema_of::<tools::PlanIdInput>()),
        entry("mf.plan.apply", "Atomically apply a registered plan, rolling back on any step failure.", schema_of::<tools::PlanApplyInput>()),
        entry("mf.plan.discard", "Remove a plan from the registry without applying it.", schema_of::<tools::PlanIdInput>()),
        entry("mf.script.validate", "Parse DSL script text and report issues without compiling a plan.", schema_of::<tools::ScriptInput>()),
        entry("mf.script.compile", "Compile DSL script text into a registered Plan.", schema_of::<tools::ScriptInput>()),
        entry("mf.script.run", "Compile, preview, and optionally apply a DSL script in one call.", schema_of::<tools::ScriptRunInput>()),
        entry("mf.script.examples", "A handful of annotated example scripts.", schema_of::<tools::EmptyInput>()),
        entry("mf.skill.generateScript", "Turn a goal into DSL script text via the recipe table.", schema_of::<tools::SkillGenerateInput>()),
        entry("mf.export.bundle", "Export the current project as a deterministic ZIP bundle.", schema_of::<tools::ExportBundleInput>()),
        entry("mf.export.unityPackage", "Export the Unity-interchange bundle variant.", schema_of::<tools::ExportBundleInput>()),
        entry("mf.export.video", "Always reports MF_ERR_HEADLESS_VIDEO_UNSUPPORTED; out of scope.", schema_of::<tools::EmptyInput>()),
        entry("mf.export.projectJson", "Canonical stable serialization of the current project.", schema_of::<tools::EmptyInput>()),
        entry("mf.io.readFileBase64", "Read a file from disk, base64-encoded, bounded by io.max_bytes.", schema_of::<tools::ReadFileInput>()),
        entry("mf.io.writeFile", "Write base64-encoded bytes to disk, bounded by io.max_bytes.", schema_of::<tools::WriteFileInput>()),
        entry("mf.pipeline.makeBundle", "Sequence snapshot -> script generation -> validate -> run -> commit -> export into one bundle.", schema_of::<tools::MakeBundleInput>()),
    ];
    json!({ "tools": tools })
}

/// `mf.capabilities`'s payload (spec §10 supplement): the fixed tool
/// catalog names, the contract version, and the supported schema version
/// range, mirroring the teacher's `CapabilityManifest` pattern.
#[must_use]
pub fn capabilities(tooling_commit: Option<&str>) -> Value {
    json!({
        "contractVersion": mf_core::CONTRACT_VERSION,
        "tools": TOOL_NAMES,
        "schemaVersions": {
            "min": *mf_core::SUPPORTED_SCHEMA_VERSIONS.start(),
            "max": *mf_core::SUPPORTED_SCHEMA_VERSIONS.end(),
        },
        "tooling": { "commit": tooling_commit },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_list_names_match_the_fixed_catalog_in_order() {
        let list = tools_list();
        let names: Vec<&str> = list["tools"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, TOOL_NAMES);
    }

    #[test]
    fn every_entry_has_a_non_empty_schema() {
        let list = tools_list();
        for tool in list["tools"].as_array().unwrap() {
            assert!(tool["inputSchema"].is_object(), "{} has no schema object", tool["name"]);
        }
    }

    #[test]
    fn capabilities_reports_the_full_schema_version_range() {
        let caps = capabilities(Some("abc1234"));
        assert_eq!(caps["schemaVersions"]["min"], json!(1));
        assert_eq!(caps["schemaVersions"]["max"], json!(4));
        assert_eq!(caps["tooling"]["commit"], json!("abc1234"));
    }
}
