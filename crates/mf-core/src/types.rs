// SPDX-License-Identifier: MIT OR Apache-2.0
//! The v4 project data model (see spec §3). Every value reachable through
//! [`ProjectData`] deserializes only once migration and validation
//! (see [`crate::migrate`] and [`crate::validate`]) have already run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The unit of persistence: a whole animation project at schema v4.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    /// Schema version. Always `4` once migration has run.
    pub version: u32,
    /// Scene objects, sorted by `id` on serialization.
    pub objects: Vec<PrimitiveObject>,
    /// Imported model instances, sorted by `id` on serialization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_instances: Option<Vec<ModelInstance>>,
    /// Embedded or externally referenced assets, sorted by `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<Asset>>,
    /// Viewport camera.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<Camera>,
    /// The single animation clip, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Clip>,
}

impl ProjectData {
    /// Sort all ordered containers per spec invariant 1 (`id`/`(objectId,
    /// property)`/`time`/`startTime, id`), recursively.
    pub fn normalize_order(&mut self) {
        self.objects.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(instances) = &mut self.model_instances {
            instances.sort_by(|a, b| a.id.cmp(&b.id));
        }
        if let Some(assets) = &mut self.assets {
            assets.sort_by(|a, b| a.id.cmp(&b.id));
        }
        if let Some(clip) = &mut self.animation {
            clip.normalize();
        }
    }
}

/// A box/sphere/cone primitive placed in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveObject {
    /// Opaque, stable identifier (e.g. `obj_3`).
    pub id: String,
    /// Free-text display name.
    pub name: String,
    /// Sanitized, forward-slash path used by external importers. Required at v4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_path: Option<String>,
    /// Primitive geometry kind.
    pub geometry_type: GeometryType,
    /// 24-bit packed RGB color.
    pub color: u32,
    /// Metalness in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic: Option<f64>,
    /// Roughness in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f64>,
    /// World-space position.
    pub position: [f64; 3],
    /// Euler rotation in radians.
    pub rotation: [f64; 3],
    /// Per-axis scale.
    pub scale: [f64; 3],
}

/// The closed set of primitive geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeometryType {
    /// Axis-aligned box.
    Box,
    /// UV sphere.
    Sphere,
    /// Cone.
    Cone,
}

impl GeometryType {
    /// All geometry kinds, in declaration order.
    pub const ALL: [GeometryType; 3] = [GeometryType::Box, GeometryType::Sphere, GeometryType::Cone];
}

/// A placed instance of an imported glTF [`Asset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelInstance {
    /// Opaque, stable identifier.
    pub id: String,
    /// Free-text display name.
    pub name: String,
    /// Sanitized, forward-slash path used by external importers. Required at v4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_path: Option<String>,
    /// The [`Asset::id`] this instance renders.
    pub asset_id: String,
    /// World-space position.
    pub position: [f64; 3],
    /// Euler rotation in radians.
    pub rotation: [f64; 3],
    /// Per-axis scale.
    pub scale: [f64; 3],
    /// Per-node material overrides baked onto the glTF hierarchy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_overrides: Option<Vec<MaterialOverride>>,
}

/// A single per-node material override on a [`ModelInstance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialOverride {
    /// glTF node path the override applies to.
    pub node_path: String,
    /// 24-bit packed RGB color.
    pub color: u32,
    /// Metalness in `[0, 1]`.
    pub metallic: f64,
    /// Roughness in `[0, 1]`.
    pub roughness: f64,
}

/// An imported glTF asset, embedded or referenced externally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Opaque, stable identifier.
    pub id: String,
    /// Free-text display name.
    pub name: String,
    /// Asset kind. Always `"gltf"` at present.
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    /// Where the asset's bytes live.
    pub source: AssetSource,
    /// Size in bytes of the underlying asset data.
    pub size: u64,
}

/// The closed set of asset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// glTF 2.0 binary or JSON asset.
    Gltf,
}

/// Whether an [`Asset`]'s bytes are embedded in the project or referenced
/// externally on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AssetSource {
    /// Bytes are base64-encoded inline in the project JSON.
    Embedded {
        /// Base64-encoded asset bytes.
        data: String,
        /// Original file name, used for bundle export naming.
        #[serde(rename = "fileName")]
        file_name: String,
    },
    /// Bytes live outside the project at the given path.
    External {
        /// Path to the asset on disk (or relative to the project).
        path: String,
    },
}

/// The viewport camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Camera {
    /// World-space position.
    pub position: [f64; 3],
    /// World-space look-at target.
    pub target: [f64; 3],
    /// Vertical field of view, in degrees.
    pub fov: f64,
}

/// The single animation clip a project carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Clip length in seconds. Always finite and `> 0`.
    pub duration_seconds: f64,
    /// Per-object-property channels, sorted by `(objectId, property)`.
    pub tracks: Vec<Track>,
    /// Named sub-ranges used by downstream clip-naming tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub takes: Option<Vec<Take>>,
}

impl Clip {
    /// Clamp times, sort each track's keyframes, drop empty tracks, sort
    /// tracks and takes (§4.2 `normalizeClip`).
    pub fn normalize(&mut self) {
        let duration = self.duration_seconds;
        self.tracks.retain_mut(|t| {
            for kf in &mut t.keyframes {
                kf.time = kf.time.clamp(0.0, duration);
            }
            t.keyframes
                .sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
            !t.keyframes.is_empty()
        });
        self.tracks
            .sort_by(|a, b| (a.object_id.as_str(), a.property).cmp(&(b.object_id.as_str(), b.property)));
        if let Some(takes) = &mut self.takes {
            takes.sort_by(|a, b| {
                a.start_time
                    .partial_cmp(&b.start_time)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
    }

    /// Total number of keyframes across all tracks.
    #[must_use]
    pub fn keyframe_count(&self) -> usize {
        self.tracks.iter().map(|t| t.keyframes.len()).sum()
    }
}

/// A named sub-range of a [`Clip`], used for clip-naming by downstream tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Take {
    /// Unique (within the clip) identifier.
    pub id: String,
    /// Free-text display name.
    pub name: String,
    /// Inclusive start time, in seconds.
    pub start_time: f64,
    /// Exclusive end time, in seconds.
    pub end_time: f64,
}

/// A channel for one property of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// The owning [`PrimitiveObject`] or [`ModelInstance`] id.
    pub object_id: String,
    /// Which transform property this channel drives.
    pub property: Property,
    /// Mirrors the owning object's `bindPath`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_path: Option<String>,
    /// Keyframes, sorted ascending by `time`.
    pub keyframes: Vec<Keyframe>,
}

/// The fixed set of animatable transform properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    /// `position.x`
    #[serde(rename = "position.x")]
    PositionX,
    /// `position.y`
    #[serde(rename = "position.y")]
    PositionY,
    /// `position.z`
    #[serde(rename = "position.z")]
    PositionZ,
    /// `rotation.x`
    #[serde(rename = "rotation.x")]
    RotationX,
    /// `rotation.y`
    #[serde(rename = "rotation.y")]
    RotationY,
    /// `rotation.z`
    #[serde(rename = "rotation.z")]
    RotationZ,
    /// `scale.x`
    #[serde(rename = "scale.x")]
    ScaleX,
    /// `scale.y`
    #[serde(rename = "scale.y")]
    ScaleY,
    /// `scale.z`
    #[serde(rename = "scale.z")]
    ScaleZ,
}

impl Property {
    /// All nine properties, in declaration order.
    pub const ALL: [Property; 9] = [
        Property::PositionX,
        Property::PositionY,
        Property::PositionZ,
        Property::RotationX,
        Property::RotationY,
        Property::RotationZ,
        Property::ScaleX,
        Property::ScaleY,
        Property::ScaleZ,
    ];

    /// Wire string for this property (e.g. `"position.x"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PositionX => "position.x",
            Self::PositionY => "position.y",
            Self::PositionZ => "position.z",
            Self::RotationX => "rotation.x",
            Self::RotationY => "rotation.y",
            Self::RotationZ => "rotation.z",
            Self::ScaleX => "scale.x",
            Self::ScaleY => "scale.y",
            Self::ScaleZ => "scale.z",
        }
    }

    /// Parse from the wire string, if recognized.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// The group this property belongs to (`position`, `rotation`, `scale`).
    #[must_use]
    pub fn group(&self) -> &'static str {
        match self {
            Self::PositionX | Self::PositionY | Self::PositionZ => "position",
            Self::RotationX | Self::RotationY | Self::RotationZ => "rotation",
            Self::ScaleX | Self::ScaleY | Self::ScaleZ => "scale",
        }
    }

    /// The axis this property drives (`x`, `y`, `z`).
    #[must_use]
    pub fn axis(&self) -> &'static str {
        match self {
            Self::PositionX | Self::RotationX | Self::ScaleX => "x",
            Self::PositionY | Self::RotationY | Self::ScaleY => "y",
            Self::PositionZ | Self::RotationZ | Self::ScaleZ => "z",
        }
    }

    /// Build a property from a group and axis (`"position", "x"` → `PositionX`).
    #[must_use]
    pub fn from_group_axis(group: &str, axis: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.group() == group && p.axis() == axis)
    }
}

/// A `(time, value, interpolation)` tuple on a [`Track`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Keyframe {
    /// Time in seconds, clamped to `[0, clip.durationSeconds]`.
    pub time: f64,
    /// The animated value at this time.
    pub value: f64,
    /// Interpolation tag applied on the segment *starting* at this keyframe.
    pub interpolation: Interpolation,
}

/// The closed set of interpolation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    /// Linear blend between the surrounding keyframes.
    Linear,
    /// Hold the left keyframe's value until the next keyframe.
    Step,
    /// `u^2` ease-in.
    EaseIn,
    /// `1-(1-u)^2` ease-out.
    EaseOut,
    /// `0.5*(1-cos(pi*u))` ease-in-out.
    EaseInOut,
}

/// `objectId -> parentId | null`. The graph this describes is always a
/// forest; cycles are forbidden (enforced by [`crate::hierarchy`]).
pub type Hierarchy = BTreeMap<String, Option<String>>;

/// `{data, selectedObjectId, dirty, hierarchy}` — the live or staged half of
/// a [`crate::Runtime`] (owned by the `mf-runtime` crate; this is the plain
/// data shape both halves share).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    /// The project data this state wraps.
    pub data: ProjectData,
    /// Currently selected object/instance id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_object_id: Option<String>,
    /// True iff the state structurally differs from the last loaded/committed baseline.
    pub dirty: bool,
    /// `objectId -> parentId`.
    pub hierarchy: Hierarchy,
}

impl RuntimeState {
    /// An empty state: no objects, no selection, clean, empty hierarchy.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: ProjectData {
                version: 4,
                objects: Vec::new(),
                model_instances: None,
                assets: None,
                camera: None,
                animation: None,
            },
            selected_object_id: None,
            dirty: false,
            hierarchy: Hierarchy::new(),
        }
    }
}
