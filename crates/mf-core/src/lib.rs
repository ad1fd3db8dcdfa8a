// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The stable contract for the MotionForge runtime.
//!
//! If you only take one dependency, take this one.

/// Shared bind-path sanitization used by migration and by runtime commands.
pub mod bindpath;
/// Forest operations over the object hierarchy.
pub mod hierarchy;
/// Forward-only schema migration v1..v4.
pub mod migrate;
/// Canonical JSON serialization and content hashing.
pub mod serialize;
/// The v4 project data model.
pub mod types;
/// Strict, version-gated project validation.
pub mod validate;

pub use bindpath::unique_sanitized;
pub use migrate::{migrate_to_latest, MigrationResult};
pub use serialize::{fnv1a_hex, parse, project_id, serialize_stable, sha256_hex};
pub use types::{
    Asset, AssetSource, AssetType, Camera, Clip, GeometryType, Hierarchy, Interpolation, Keyframe,
    MaterialOverride, ModelInstance, PrimitiveObject, ProjectData, Property, RuntimeState, Take,
    Track,
};
pub use validate::{is_valid_bind_path, validate};

/// Current contract version string embedded in every MCP tool response that
/// names it (e.g. `mf.capabilities`).
pub const CONTRACT_VERSION: &str = "motionforge/v1";

/// Schema versions this build accepts on input.
pub const SUPPORTED_SCHEMA_VERSIONS: std::ops::RangeInclusive<u32> = 1..=4;

/// Schema version every project is written out at.
pub const LATEST_SCHEMA_VERSION: u32 = 4;

use mf_error::MfResult;

/// Parse, migrate, and validate raw project JSON in one call.
///
/// This is the shared entry point for `loadProjectJson` (§4.4) and the
/// pipeline's input resolution (§4.8) — both need "bytes in, validated v4
/// `ProjectData` out".
pub fn load_project_json(json: &str, max_bytes: usize) -> MfResult<MigrationResult> {
    let value = serialize::parse(json, max_bytes)?;
    let data: ProjectData = serde_json::from_value(value).map_err(|e| {
        mf_error::MfError::new(mf_error::MfErrorCode::InvalidProject, format!("malformed project: {e}"))
    })?;
    validate::validate(&data)?;
    let mut migrated = migrate::migrate_to_latest(data);
    migrated.data.normalize_order();
    validate::validate(&migrated.data)?;
    Ok(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_the_spec_scenario_1_fixture() {
        let json = r#"{"version":1, "objects":[{"id":"obj_1","name":"Cube One","geometryType":"box","color":4491007,"position":[0,0.5,0],"rotation":[0,0,0],"scale":[1,1,1]}]}"#;
        let result = load_project_json(json, 1_000_000).unwrap();
        assert_eq!(result.version, 4);
        assert_eq!(result.data.objects[0].bind_path.as_deref(), Some("Cube_One"));
    }

    #[test]
    fn rejects_invalid_project_shape() {
        let json = r#"{"version": 4, "objects": [{"id": "", "name": "x", "geometryType": "box", "color": 0, "position": [0,0,0], "rotation": [0,0,0], "scale": [1,1,1]}]}"#;
        let err = load_project_json(json, 1_000_000).unwrap_err();
        assert_eq!(err.code, mf_error::MfErrorCode::InvalidProject);
    }
}
