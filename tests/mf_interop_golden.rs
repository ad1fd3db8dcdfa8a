// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interop-facing checks: bundle structure, DSL round trips through the
//! compiler, and the skill-generated script feeding back into `script.run`.

use mf_bundle::{BundleOptions, ClipNaming};
use mf_core::ProjectData;
use mf_plan::{Constraints, Scope};
use mf_runtime::Runtime;
use std::io::Read;

const FIXTURE: &str = r#"{"version":4,"objects":[{"id":"obj_1","name":"Cube One","bindPath":"Cube_One","geometryType":"box","color":4491007,"position":[0,0.5,0],"rotation":[0,0,0],"scale":[1,1,1]}]}"#;

fn loaded_runtime() -> Runtime {
    let mut rt = Runtime::default();
    rt.load_project_json(FIXTURE, false).unwrap();
    rt
}

#[test]
fn bundle_contains_project_json_and_manifest_entries() {
    let rt = loaded_runtime();
    let data: ProjectData = serde_json::from_str(&rt.export_project_json().unwrap()).unwrap();
    let options = BundleOptions { exported_at: "1970-01-01T00:00:00Z".to_string(), unity: false };
    let export = mf_bundle::export(&data, &options).unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(export.bytes)).unwrap();
    let names: Vec<String> = (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect();
    assert!(names.contains(&"project.json".to_string()));
    assert!(names.contains(&"motionforge-manifest.json".to_string()));
    assert!(!names.contains(&"README_UNITY.txt".to_string()));
}

#[test]
fn unity_bundle_variant_adds_the_readme() {
    let rt = loaded_runtime();
    let data: ProjectData = serde_json::from_str(&rt.export_project_json().unwrap()).unwrap();
    let options = BundleOptions { exported_at: "1970-01-01T00:00:00Z".to_string(), unity: true };
    let export = mf_bundle::export(&data, &options).unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(export.bytes)).unwrap();
    let mut readme = archive.by_name("README_UNITY.txt").unwrap();
    let mut contents = String::new();
    readme.read_to_string(&mut contents).unwrap();
    assert!(!contents.is_empty());
}

#[test]
fn sanitize_keeps_safe_characters_and_replaces_the_rest() {
    assert_eq!(mf_bundle::sanitize("Cube One!"), "Cube_One_");
    assert_eq!(mf_bundle::sanitize("already-safe.v2"), "already-safe.v2");
}

#[test]
fn clip_naming_default_is_stable() {
    let a = ClipNaming::default();
    let b = ClipNaming::default();
    assert_eq!(a.pattern, b.pattern);
    assert_eq!(a.fallback_take_name, b.fallback_take_name);
}

#[test]
fn skill_generated_script_compiles_back_into_an_equivalent_plan() {
    let rt = loaded_runtime();
    let script = mf_pipeline::script::generate_script(&rt, Scope::Current, "bounce", &Constraints::default()).unwrap();
    let compiled = mf_script::compile(&rt, Scope::Current, &script).unwrap();
    assert!(!compiled.plan.steps.is_empty());
    assert_eq!(compiled.plan.scope, Scope::Current);
}

#[test]
fn recipe_generated_plan_and_its_script_form_touch_the_same_object() {
    let rt = loaded_runtime();
    let plan = mf_plan::generate_plan(&rt, Scope::Current, "bounce", &Constraints::default()).unwrap();
    let script = mf_pipeline::script::generate_script(&rt, Scope::Current, "bounce", &Constraints::default()).unwrap();
    let compiled = mf_script::compile(&rt, Scope::Current, &script).unwrap();
    assert_eq!(plan.summary.objects_touched, compiled.plan.summary.objects_touched);
}
