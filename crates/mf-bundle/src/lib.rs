// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-bundle
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::io::{Cursor, Write};

use mf_core::{AssetSource, ProjectData, Take};
use mf_error::{MfError, MfErrorCode, MfResult};
use serde::Serialize;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const README_UNITY: &str = "MotionForge Unity export\n\
\n\
This bundle targets Unity's glTF import pipeline. Assets under assets/\n\
import as standard glTF models; apply material and rig bindings inside\n\
Unity after import.\n\
\n\
Known limitations:\n\
- animation.glTF conversion is not performed; keyframe data lives only in\n\
  project.json and motionforge-manifest.json, not as a baked glTF clip.\n\
- Material overrides are carried as data only; they are not reapplied\n\
  automatically on import.\n";

/// `motionforge-manifest.json`'s clip naming convention (spec §4.9): literal
/// template strings, not interpolated, since [`ProjectData`] carries no
/// project-name field for the bundler to substitute.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipNaming {
    /// Naming pattern downstream tooling applies: `<ProjectName>_<TakeName>`.
    pub pattern: String,
    /// Take name to use when a take has none.
    pub fallback_take_name: String,
}

impl Default for ClipNaming {
    fn default() -> Self {
        Self {
            pattern: "<ProjectName>_<TakeName>".to_string(),
            fallback_take_name: "Main".to_string(),
        }
    }
}

/// `motionforge-manifest.json`'s contents (spec §4.9).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    /// Manifest schema version. Always `1`.
    pub version: u32,
    /// ISO-8601 export timestamp. The only non-deterministic field in the
    /// bundle; callers own how it is produced (see [`BundleOptions`]).
    pub exported_at: String,
    /// The exported project's schema version.
    pub project_version: u32,
    /// The smallest-id model instance's asset id, or `None` if there are no
    /// model instances.
    pub primary_model_asset_id: Option<String>,
    /// Named sub-ranges of the clip, from the project or synthesized.
    pub takes: Vec<Take>,
    /// Clip naming convention for downstream tooling.
    pub clip_naming: ClipNaming,
}

/// Export-time options (spec §4.9).
#[derive(Debug, Clone)]
pub struct BundleOptions {
    /// ISO-8601 timestamp stamped into the manifest's `exportedAt` field.
    ///
    /// `mf-bundle` never reads the wall clock itself (spec §9 notes
    /// `exportedAt` is the one field that defeats byte-identical bundles);
    /// callers that want a reproducible `bundleHash` pass a fixed sentinel,
    /// callers that want a real export time pass `Utc::now().to_rfc3339()`.
    pub exported_at: String,
    /// Emit the Unity variant: adds `README_UNITY.txt`, omits glTF animation
    /// conversion (a warning is returned instead of failing).
    pub unity: bool,
}

/// The result of a successful export.
#[derive(Debug, Clone)]
pub struct BundleExport {
    /// Raw ZIP bytes, deflate level 6.
    pub bytes: Vec<u8>,
    /// The manifest written into the bundle, for the caller to persist
    /// alongside it (spec §4.8 step 8: `motionforge-manifest.json`).
    pub manifest: BundleManifest,
    /// Non-fatal notices (currently: the Unity glTF-animation limitation).
    pub warnings: Vec<String>,
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_` (spec §4.9).
#[must_use]
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

fn build_manifest(project: &ProjectData, options: &BundleOptions) -> BundleManifest {
    let primary_model_asset_id = project
        .model_instances
        .as_ref()
        .and_then(|instances| instances.iter().min_by(|a, b| a.id.cmp(&b.id)))
        .map(|instance| instance.asset_id.clone());

    let takes = match &project.animation {
        Some(clip) => match &clip.takes {
            Some(takes) if !takes.is_empty() => takes.clone(),
            _ if clip.duration_seconds > 0.0 => vec![Take {
                id: "take_main".to_string(),
                name: "Main".to_string(),
                start_time: 0.0,
                end_time: clip.duration_seconds,
            }],
            _ => Vec::new(),
        },
        None => Vec::new(),
    };

    BundleManifest {
        version: 1,
        exported_at: options.exported_at.clone(),
        project_version: project.version,
        primary_model_asset_id,
        takes,
        clip_naming: ClipNaming::default(),
    }
}

fn io_error(context: &str, err: impl std::fmt::Display) -> MfError {
    MfError::new(MfErrorCode::IoError, format!("{context}: {err}")).with_context("stage", context)
}

/// Export `project` as a deterministic ZIP bundle (spec §4.9).
///
/// Entries, in lexicographic id order: `project.json`,
/// `motionforge-manifest.json`, one `assets/...` entry per asset (embedded
/// assets are base64-decoded, external assets get a `.external.txt`
/// pointer), and — when `options.unity` is set — `README_UNITY.txt`.
///
/// # Errors
///
/// [`MfErrorCode::InvalidProject`] if `project` fails to serialize;
/// [`MfErrorCode::IoError`] if an embedded asset's `data` is not valid
/// base64, or if writing the ZIP stream itself fails.
pub fn export(project: &ProjectData, options: &BundleOptions) -> MfResult<BundleExport> {
    let project_json = mf_core::serialize_stable(project)?;
    let manifest = build_manifest(project, options);
    let manifest_json = serde_json::to_string(&manifest)
        .map_err(|e| MfError::new(MfErrorCode::InvalidProject, format!("failed to serialize manifest: {e}")))?;

    let mut warnings = Vec::new();
    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(6));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file("project.json", file_options)
        .map_err(|e| io_error("start project.json entry", e))?;
    zip.write_all(project_json.as_bytes())
        .map_err(|e| io_error("write project.json entry", e))?;

    zip.start_file("motionforge-manifest.json", file_options)
        .map_err(|e| io_error("start manifest entry", e))?;
    zip.write_all(manifest_json.as_bytes())
        .map_err(|e| io_error("write manifest entry", e))?;

    let mut assets: Vec<_> = project.assets.iter().flatten().collect();
    assets.sort_by(|a, b| a.id.cmp(&b.id));
    for asset in assets {
        match &asset.source {
            AssetSource::Embedded { data, .. } => {
                let name = format!("assets/{}-{}", sanitize(&asset.id), sanitize(&asset.name));
                let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, data)
                    .map_err(|e| io_error(&format!("decode embedded asset {}", asset.id), e))?;
                zip.start_file(name.clone(), file_options)
                    .map_err(|e| io_error(&format!("start asset entry {name}"), e))?;
                zip.write_all(&bytes)
                    .map_err(|e| io_error(&format!("write asset entry {name}"), e))?;
            }
            AssetSource::External { path } => {
                let name = format!("assets/{}-{}.external.txt", sanitize(&asset.id), sanitize(&asset.name));
                let contents = format!("External asset reference: {path}");
                zip.start_file(name.clone(), file_options)
                    .map_err(|e| io_error(&format!("start asset entry {name}"), e))?;
                zip.write_all(contents.as_bytes())
                    .map_err(|e| io_error(&format!("write asset entry {name}"), e))?;
            }
        }
    }

    if options.unity {
        zip.start_file("README_UNITY.txt", file_options)
            .map_err(|e| io_error("start README_UNITY.txt entry", e))?;
        zip.write_all(README_UNITY.as_bytes())
            .map_err(|e| io_error("write README_UNITY.txt entry", e))?;
        warnings.push(
            "unity export omits animation.glTF conversion; keyframe data is carried only in \
             project.json and motionforge-manifest.json"
                .to_string(),
        );
    }

    let cursor = zip.finish().map_err(|e| io_error("finalize zip", e))?;

    let bytes = cursor.into_inner();
    debug!(bytes = bytes.len(), unity = options.unity, "exported bundle");
    Ok(BundleExport { bytes, manifest, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_core::{Asset, AssetType, Clip, GeometryType, ModelInstance, PrimitiveObject};
    use std::io::Read;

    fn sample_project() -> ProjectData {
        ProjectData {
            version: 4,
            objects: vec![PrimitiveObject {
                id: "obj_1".to_string(),
                name: "Cube".to_string(),
                bind_path: Some("Cube".to_string()),
                geometry_type: GeometryType::Box,
                color: 0xFF_0000,
                metallic: None,
                roughness: None,
                position: [0.0, 0.0, 0.0],
                rotation: [0.0, 0.0, 0.0],
                scale: [1.0, 1.0, 1.0],
            }],
            model_instances: Some(vec![
                ModelInstance {
                    id: "inst_2".to_string(),
                    name: "Second".to_string(),
                    bind_path: Some("Second".to_string()),
                    asset_id: "asset_b".to_string(),
                    position: [0.0, 0.0, 0.0],
                    rotation: [0.0, 0.0, 0.0],
                    scale: [1.0, 1.0, 1.0],
                    material_overrides: None,
                },
                ModelInstance {
                    id: "inst_1".to_string(),
                    name: "First".to_string(),
                    bind_path: Some("First".to_string()),
                    asset_id: "asset_a".to_string(),
                    position: [0.0, 0.0, 0.0],
                    rotation: [0.0, 0.0, 0.0],
                    scale: [1.0, 1.0, 1.0],
                    material_overrides: None,
                },
            ]),
            assets: Some(vec![
                Asset {
                    id: "asset_a".to_string(),
                    name: "Hero Model.glb".to_string(),
                    asset_type: AssetType::Gltf,
                    source: AssetSource::Embedded {
                        data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"glb-bytes"),
                        file_name: "hero.glb".to_string(),
                    },
                    size: 9,
                },
                Asset {
                    id: "asset_b".to_string(),
                    name: "Prop".to_string(),
                    asset_type: AssetType::Gltf,
                    source: AssetSource::External { path: "/srv/assets/prop.glb".to_string() },
                    size: 0,
                },
            ]),
            camera: None,
            animation: Some(Clip { duration_seconds: 3.0, tracks: Vec::new(), takes: None }),
        }
    }

    fn opts() -> BundleOptions {
        BundleOptions { exported_at: "2026-01-01T00:00:00Z".to_string(), unity: false }
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn sanitize_keeps_allowed_characters_and_replaces_the_rest() {
        assert_eq!(sanitize("Hero Model.glb"), "Hero_Model.glb");
        assert_eq!(sanitize("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize("already-ok_1.2"), "already-ok_1.2");
    }

    #[test]
    fn exports_project_json_and_manifest() {
        let project = sample_project();
        let bundle = export(&project, &opts()).unwrap();
        let names = entry_names(&bundle.bytes);
        assert!(names.contains(&"project.json".to_string()));
        assert!(names.contains(&"motionforge-manifest.json".to_string()));
        assert!(!names.iter().any(|n| n == "README_UNITY.txt"));
    }

    #[test]
    fn embedded_and_external_assets_get_the_right_entries() {
        let project = sample_project();
        let bundle = export(&project, &opts()).unwrap();
        let names = entry_names(&bundle.bytes);
        assert!(names.iter().any(|n| n == "assets/asset_a-Hero_Model.glb"));
        assert!(names.iter().any(|n| n == "assets/asset_b-Prop.external.txt"));
    }

    #[test]
    fn embedded_asset_bytes_round_trip() {
        let project = sample_project();
        let bundle = export(&project, &opts()).unwrap();
        let cursor = Cursor::new(bundle.bytes);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        let mut file = archive.by_name("assets/asset_a-Hero_Model.glb").unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"glb-bytes");
    }

    #[test]
    fn external_asset_entry_holds_the_reference_text() {
        let project = sample_project();
        let bundle = export(&project, &opts()).unwrap();
        let cursor = Cursor::new(bundle.bytes);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        let mut file = archive.by_name("assets/asset_b-Prop.external.txt").unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "External asset reference: /srv/assets/prop.glb");
    }

    #[test]
    fn manifest_primary_model_asset_id_picks_the_smallest_instance_id() {
        let project = sample_project();
        let bundle = export(&project, &opts()).unwrap();
        assert_eq!(bundle.manifest.primary_model_asset_id.as_deref(), Some("asset_a"));
    }

    #[test]
    fn manifest_synthesizes_take_main_when_clip_has_no_explicit_takes() {
        let project = sample_project();
        let bundle = export(&project, &opts()).unwrap();
        assert_eq!(bundle.manifest.takes.len(), 1);
        assert_eq!(bundle.manifest.takes[0].id, "take_main");
        assert_eq!(bundle.manifest.takes[0].end_time, 3.0);
    }

    #[test]
    fn manifest_has_no_takes_without_a_clip() {
        let mut project = sample_project();
        project.animation = None;
        let bundle = export(&project, &opts()).unwrap();
        assert!(bundle.manifest.takes.is_empty());
    }

    #[test]
    fn unity_variant_adds_readme_and_a_warning() {
        let project = sample_project();
        let options = BundleOptions { unity: true, ..opts() };
        let bundle = export(&project, &options).unwrap();
        let names = entry_names(&bundle.bytes);
        assert!(names.contains(&"README_UNITY.txt".to_string()));
        assert_eq!(bundle.warnings.len(), 1);
    }

    #[test]
    fn export_is_byte_identical_given_the_same_exported_at() {
        let project = sample_project();
        let a = export(&project, &opts()).unwrap();
        let b = export(&project, &opts()).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn invalid_embedded_base64_is_an_io_error() {
        let mut project = sample_project();
        if let Some(assets) = &mut project.assets {
            assets[0].source = AssetSource::Embedded {
                data: "not-valid-base64!!".to_string(),
                file_name: "x.glb".to_string(),
            };
        }
        let err = export(&project, &opts()).unwrap_err();
        assert_eq!(err.code, MfErrorCode::IoError);
    }
}
