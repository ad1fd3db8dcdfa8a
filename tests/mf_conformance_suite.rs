// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural conformance checks for the MCP tool catalog: the fixed tool
//! count and order, schema presence, and the capabilities payload shape a
//! real client negotiates against before calling any tool.

use mf_server::catalog;
use mf_server::tools;
use mf_server::{catalog::TOOL_NAMES, ServerState};
use mf_config::MotionForgeConfig;
use serde_json::Value;

#[test]
fn tool_count_is_exactly_23() {
    assert_eq!(TOOL_NAMES.len(), 23);
}

#[test]
fn tools_list_and_catalog_agree_on_name_and_order() {
    let list = catalog::tools_list();
    let tools = list["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, TOOL_NAMES);
}

#[test]
fn every_catalog_entry_has_a_description_and_input_schema() {
    let list = catalog::tools_list();
    for entry in list["tools"].as_array().unwrap() {
        assert!(entry["description"].as_str().is_some_and(|s| !s.is_empty()), "{entry:?} missing description");
        assert!(entry["inputSchema"].is_object(), "{entry:?} missing inputSchema");
    }
}

#[test]
fn capabilities_reports_schema_versions_one_through_four() {
    let caps = catalog::capabilities(None);
    assert_eq!(caps["schemaVersions"]["min"], Value::from(1));
    assert_eq!(caps["schemaVersions"]["max"], Value::from(4));
    assert_eq!(caps["contractVersion"], Value::from("motionforge/v1"));
}

#[test]
fn capabilities_reports_a_null_commit_when_none_is_known() {
    let caps = catalog::capabilities(None);
    assert!(caps["tooling"]["commit"].is_null());
}

#[test]
fn capabilities_reports_tooling_commit_when_present() {
    let caps = catalog::capabilities(Some("abc1234"));
    assert_eq!(caps["tooling"]["commit"], Value::from("abc1234"));
}

#[test]
fn every_registered_action_is_reachable_through_command_execute() {
    let mut state = ServerState::new(MotionForgeConfig::default(), None);
    let fixture = r#"{"version":4,"objects":[{"id":"obj_1","name":"Cube","geometryType":"box","color":255,"position":[0,0,0],"rotation":[0,0,0],"scale":[1,1,1]}]}"#;
    tools::dispatch(&mut state, "mf.project.loadJson", serde_json::json!({"json": fixture, "staged": false}));
    for action in state.runtime.action_ids() {
        // Not every action succeeds with an empty payload, but none should
        // be rejected as merely *unknown* — that's the one failure mode this
        // loop checks for.
        let response = tools::dispatch(&mut state, "mf.command.execute", serde_json::json!({"action": action, "input": {}}));
        if response["ok"] == Value::from(false) {
            assert_ne!(response["error"]["code"], Value::from("MF_ERR_UNKNOWN_ACTION"), "action '{action}' from the live registry was reported unknown");
        }
    }
}
