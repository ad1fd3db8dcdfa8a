// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-error
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Every MotionForge error carries an [`MfErrorCode`] (a machine-readable,
//! stable string tag matching the `MF_ERR_*` wire codes), a human-readable
//! message, an optional cause chain, and arbitrary key-value context. Use
//! [`MfError::new`] to construct errors fluently.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`MfErrorCode`] belongs to (see spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Schema violation, oversize JSON, unknown enum value.
    Input,
    /// No selection, not found, ambiguous, confirm required, nothing to undo/redo.
    Precondition,
    /// A plan's frozen base hash no longer matches the live project.
    Staleness,
    /// A plan step failed mid-apply; the runtime was rolled back.
    Apply,
    /// File system / zip read or write failure.
    Io,
    /// Action or feature requires a future schema version or is out of scope.
    Unsupported,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Input => "input",
            Self::Precondition => "precondition",
            Self::Staleness => "staleness",
            Self::Apply => "apply",
            Self::Io => "io",
            Self::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// MfErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serializes to the exact `MF_ERR_*` string named in the
/// external interface contract (spec §6); these strings are guaranteed not
/// to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MfErrorCode {
    /// Input failed schema validation (concatenated issue messages).
    InvalidInput,
    /// Raw bytes did not parse as JSON.
    InvalidJson,
    /// Parsed JSON failed project-schema validation.
    InvalidProject,
    /// Input JSON exceeded the configured byte limit.
    MaxJsonBytes,
    /// `mf.command.execute` referenced an action id not in the registry.
    UnknownAction,
    /// `isEnabled` rejected the action for the current state.
    ActionDisabled,
    /// An operation required a current selection and none was set.
    NoSelection,
    /// A referenced id or name does not exist.
    NotFound,
    /// A name resolved to more than one object.
    AmbiguousName,
    /// A destructive operation was attempted without `confirm: true`.
    ConfirmRequired,
    /// `commitStagedLoad`/`discardStagedLoad` ran with no staged project.
    NoStagedProject,
    /// `history.undo` ran with an empty undo stack.
    NothingToUndo,
    /// `history.redo` ran with an empty redo stack.
    NothingToRedo,
    /// Plan id not present in the process-local registry.
    PlanNotFound,
    /// The plan's frozen `baseProjectHash` no longer matches the live project.
    PlanStale,
    /// A plan step failed during apply; the runtime was rolled back.
    PlanApplyFailed,
    /// `mf.skill.generateScript` / plan generation was given an unrecognized goal.
    UnsupportedGoal,
    /// Plan generation constraints were malformed or self-contradictory.
    InvalidConstraints,
    /// Target resolution found no objects at all in the scene.
    EmptyScene,
    /// Target resolution precedence exhausted without finding a valid object.
    NoTargetObject,
    /// A file read/write exceeded the configured byte limit.
    IoMaxBytes,
    /// A file system or zip read/write failed for a reason other than a size limit.
    IoError,
    /// An operation required at least one object/instance and found none.
    NoObjects,
    /// `mf.pipeline.makeBundle` failed; see context for the failing stage.
    PipelineMakeBundle,
    /// `mf.export.video` was invoked; headless ffmpeg encoding is out of scope.
    HeadlessVideoUnsupported,
    /// The action name is recognized but requires a future schema version.
    NotImplemented,
}

impl MfErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput | Self::InvalidJson | Self::InvalidProject | Self::MaxJsonBytes => {
                ErrorCategory::Input
            }

            Self::UnknownAction
            | Self::ActionDisabled
            | Self::NoSelection
            | Self::NotFound
            | Self::AmbiguousName
            | Self::ConfirmRequired
            | Self::NoStagedProject
            | Self::NothingToUndo
            | Self::NothingToRedo
            | Self::PlanNotFound
            | Self::UnsupportedGoal
            | Self::InvalidConstraints
            | Self::EmptyScene
            | Self::NoTargetObject
            | Self::NoObjects => ErrorCategory::Precondition,

            Self::PlanStale => ErrorCategory::Staleness,

            Self::PlanApplyFailed => ErrorCategory::Apply,

            Self::IoMaxBytes | Self::IoError | Self::PipelineMakeBundle => ErrorCategory::Io,

            Self::HeadlessVideoUnsupported | Self::NotImplemented => ErrorCategory::Unsupported,
        }
    }

    /// Stable `&'static str` wire representation (e.g. `"MF_ERR_NOT_FOUND"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "MF_ERR_INVALID_INPUT",
            Self::InvalidJson => "MF_ERR_INVALID_JSON",
            Self::InvalidProject => "MF_ERR_INVALID_PROJECT",
            Self::MaxJsonBytes => "MF_ERR_MAX_JSON_BYTES",
            Self::UnknownAction => "MF_ERR_UNKNOWN_ACTION",
            Self::ActionDisabled => "MF_ERR_ACTION_DISABLED",
            Self::NoSelection => "MF_ERR_NO_SELECTION",
            Self::NotFound => "MF_ERR_NOT_FOUND",
            Self::AmbiguousName => "MF_ERR_AMBIGUOUS_NAME",
            Self::ConfirmRequired => "MF_ERR_CONFIRM_REQUIRED",
            Self::NoStagedProject => "MF_ERR_NO_STAGED_PROJECT",
            Self::NothingToUndo => "MF_ERR_NOTHING_TO_UNDO",
            Self::NothingToRedo => "MF_ERR_NOTHING_TO_REDO",
            Self::PlanNotFound => "MF_ERR_PLAN_NOT_FOUND",
            Self::PlanStale => "MF_ERR_PLAN_STALE",
            Self::PlanApplyFailed => "MF_ERR_PLAN_APPLY_FAILED",
            Self::UnsupportedGoal => "MF_ERR_UNSUPPORTED_GOAL",
            Self::InvalidConstraints => "MF_ERR_INVALID_CONSTRAINTS",
            Self::EmptyScene => "MF_ERR_EMPTY_SCENE",
            Self::NoTargetObject => "MF_ERR_NO_TARGET_OBJECT",
            Self::IoMaxBytes => "MF_ERR_IO_MAX_BYTES",
            Self::IoError => "MF_ERR_IO_ERROR",
            Self::NoObjects => "MF_ERR_NO_OBJECTS",
            Self::PipelineMakeBundle => "MF_ERR_PIPELINE_MAKE_BUNDLE",
            Self::HeadlessVideoUnsupported => "MF_ERR_HEADLESS_VIDEO_UNSUPPORTED",
            Self::NotImplemented => "MF_ERR_NOT_IMPLEMENTED",
        }
    }
}

impl fmt::Display for MfErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MfErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MfErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown error code: {s}")))
    }
}

impl MfErrorCode {
    /// Parse a code from its wire string, if recognized.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "MF_ERR_INVALID_INPUT" => Self::InvalidInput,
            "MF_ERR_INVALID_JSON" => Self::InvalidJson,
            "MF_ERR_INVALID_PROJECT" => Self::InvalidProject,
            "MF_ERR_MAX_JSON_BYTES" => Self::MaxJsonBytes,
            "MF_ERR_UNKNOWN_ACTION" => Self::UnknownAction,
            "MF_ERR_ACTION_DISABLED" => Self::ActionDisabled,
            "MF_ERR_NO_SELECTION" => Self::NoSelection,
            "MF_ERR_NOT_FOUND" => Self::NotFound,
            "MF_ERR_AMBIGUOUS_NAME" => Self::AmbiguousName,
            "MF_ERR_CONFIRM_REQUIRED" => Self::ConfirmRequired,
            "MF_ERR_NO_STAGED_PROJECT" => Self::NoStagedProject,
            "MF_ERR_NOTHING_TO_UNDO" => Self::NothingToUndo,
            "MF_ERR_NOTHING_TO_REDO" => Self::NothingToRedo,
            "MF_ERR_PLAN_NOT_FOUND" => Self::PlanNotFound,
            "MF_ERR_PLAN_STALE" => Self::PlanStale,
            "MF_ERR_PLAN_APPLY_FAILED" => Self::PlanApplyFailed,
            "MF_ERR_UNSUPPORTED_GOAL" => Self::UnsupportedGoal,
            "MF_ERR_INVALID_CONSTRAINTS" => Self::InvalidConstraints,
            "MF_ERR_EMPTY_SCENE" => Self::EmptyScene,
            "MF_ERR_NO_TARGET_OBJECT" => Self::NoTargetObject,
            "MF_ERR_IO_MAX_BYTES" => Self::IoMaxBytes,
            "MF_ERR_IO_ERROR" => Self::IoError,
            "MF_ERR_NO_OBJECTS" => Self::NoObjects,
            "MF_ERR_PIPELINE_MAKE_BUNDLE" => Self::PipelineMakeBundle,
            "MF_ERR_HEADLESS_VIDEO_UNSUPPORTED" => Self::HeadlessVideoUnsupported,
            "MF_ERR_NOT_IMPLEMENTED" => Self::NotImplemented,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// MfError
// ---------------------------------------------------------------------------

/// Unified MotionForge error.
///
/// Carries a stable [`MfErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Examples
///
/// ```
/// use mf_error::{MfError, MfErrorCode};
///
/// let err = MfError::new(MfErrorCode::NotFound, "no object with id obj_7")
///     .with_context("objectId", "obj_7");
/// assert_eq!(err.to_string(), "[MF_ERR_NOT_FOUND] no object with id obj_7 {\"objectId\":\"obj_7\"}");
/// ```
pub struct MfError {
    /// Machine-readable error code.
    pub code: MfErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl MfError {
    /// Create a new error with the given code and message.
    pub fn new(code: MfErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialization
    /// fails, the entry is silently skipped.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Convert to the `{code, message}` pair embedded in a tool envelope.
    #[must_use]
    pub fn to_envelope(&self) -> EnvelopeError {
        EnvelopeError {
            code: self.code,
            message: self.message.clone(),
        }
    }
}

impl fmt::Debug for MfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("MfError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for MfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for MfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience alias used throughout the MotionForge crates.
pub type MfResult<T> = std::result::Result<T, MfError>;

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

/// The `{code, message}` pair embedded in `{ok:false, error: ...}` envelopes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeError {
    /// Stable error code.
    pub code: MfErrorCode,
    /// Human-readable message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CODES: &[MfErrorCode] = &[
        MfErrorCode::InvalidInput,
        MfErrorCode::InvalidJson,
        MfErrorCode::InvalidProject,
        MfErrorCode::MaxJsonBytes,
        MfErrorCode::UnknownAction,
        MfErrorCode::ActionDisabled,
        MfErrorCode::NoSelection,
        MfErrorCode::NotFound,
        MfErrorCode::AmbiguousName,
        MfErrorCode::ConfirmRequired,
        MfErrorCode::NoStagedProject,
        MfErrorCode::NothingToUndo,
        MfErrorCode::NothingToRedo,
        MfErrorCode::PlanNotFound,
        MfErrorCode::PlanStale,
        MfErrorCode::PlanApplyFailed,
        MfErrorCode::UnsupportedGoal,
        MfErrorCode::InvalidConstraints,
        MfErrorCode::EmptyScene,
        MfErrorCode::NoTargetObject,
        MfErrorCode::IoMaxBytes,
        MfErrorCode::IoError,
        MfErrorCode::NoObjects,
        MfErrorCode::PipelineMakeBundle,
        MfErrorCode::HeadlessVideoUnsupported,
        MfErrorCode::NotImplemented,
    ];

    #[test]
    fn every_code_round_trips_through_its_wire_string() {
        for code in ALL_CODES {
            let s = code.as_str();
            assert_eq!(MfErrorCode::from_str(s), Some(*code));
        }
    }

    #[test]
    fn unknown_wire_string_is_none() {
        assert_eq!(MfErrorCode::from_str("MF_ERR_TOTALLY_MADE_UP"), None);
    }

    #[test]
    fn basic_construction() {
        let err = MfError::new(MfErrorCode::NotFound, "boom");
        assert_eq!(err.code, MfErrorCode::NotFound);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = MfError::new(MfErrorCode::NotFound, "no such object");
        assert_eq!(err.to_string(), "[MF_ERR_NOT_FOUND] no such object");
    }

    #[test]
    fn display_with_context_is_deterministic() {
        let err = MfError::new(MfErrorCode::ConfirmRequired, "destructive op")
            .with_context("action", "scene.deleteSelected")
            .with_context("objectId", "obj_3");
        let s = err.to_string();
        assert!(s.starts_with("[MF_ERR_CONFIRM_REQUIRED] destructive op"));
        // BTreeMap orders keys lexicographically: action before objectId.
        assert!(s.find("action").unwrap() < s.find("objectId").unwrap());
    }

    #[test]
    fn categories_match_spec_taxonomy() {
        assert_eq!(MfErrorCode::InvalidJson.category(), ErrorCategory::Input);
        assert_eq!(MfErrorCode::ConfirmRequired.category(), ErrorCategory::Precondition);
        assert_eq!(MfErrorCode::PlanStale.category(), ErrorCategory::Staleness);
        assert_eq!(MfErrorCode::PlanApplyFailed.category(), ErrorCategory::Apply);
        assert_eq!(MfErrorCode::IoMaxBytes.category(), ErrorCategory::Io);
        assert_eq!(MfErrorCode::NotImplemented.category(), ErrorCategory::Unsupported);
    }

    #[test]
    fn to_envelope_drops_context_and_source() {
        let err = MfError::new(MfErrorCode::NotFound, "missing").with_context("k", "v");
        let env = err.to_envelope();
        assert_eq!(env.code, MfErrorCode::NotFound);
        assert_eq!(env.message, "missing");
    }

    #[test]
    fn error_trait_source_chains() {
        let io_err = std::io::Error::other("disk full");
        let err = MfError::new(MfErrorCode::IoMaxBytes, "write failed").with_source(io_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
