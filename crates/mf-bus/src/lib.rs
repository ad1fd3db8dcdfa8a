// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-bus
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! A registry mapping action id (string) to `{isEnabled, run}` (spec §4.3).
//! The bus itself holds no state beyond the registry: the live
//! [`mf_core::RuntimeState`] and the monotone [`EventSequencer`] are owned
//! by the caller (`mf-runtime`) and passed in on every [`ActionRegistry::dispatch`].

use mf_core::RuntimeState;
use mf_error::{MfError, MfErrorCode, MfResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// The closed set of event types a command handler may emit (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    /// `selection.set` changed the selected id.
    SelectionChanged,
    /// `hierarchy.renameMany` renamed an object.
    ObjectRenamed,
    /// `material.set` changed a material field.
    ObjectMaterialChanged,
    /// `scene.addPrimitive` / `scene.duplicateSelected` added an object.
    SceneObjectAdded,
    /// `scene.deleteSelected` removed an object (and its descendants).
    SceneObjectDeleted,
    /// `scene.clearUserObjects` removed every user object.
    SceneObjectsCleared,
    /// `scene.parent` / `scene.unparent` changed the hierarchy.
    SceneParentChanged,
    /// `animation.insertRecords` inserted a keyframe.
    KeyframeAdded,
    /// `animation.removeKeys` removed a keyframe.
    KeyframeDeleted,
    /// `animation.moveKeys` moved a keyframe.
    KeyframeMoved,
    /// `animation.setDuration` changed the clip duration.
    AnimationDurationChanged,
    /// `animation.setTakes` changed the take list.
    AnimationTakesChanged,
    /// The runtime's `dirty` flag flipped false -> true.
    ProjectDirtyChanged,
    /// `history.undo` ran.
    HistoryUndo,
    /// `history.redo` ran.
    HistoryRedo,
}

impl EventKind {
    /// The dotted wire string for this event kind (e.g. `"selection.changed"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectionChanged => "selection.changed",
            Self::ObjectRenamed => "object.renamed",
            Self::ObjectMaterialChanged => "object.materialChanged",
            Self::SceneObjectAdded => "scene.objectAdded",
            Self::SceneObjectDeleted => "scene.objectDeleted",
            Self::SceneObjectsCleared => "scene.objectsCleared",
            Self::SceneParentChanged => "scene.parentChanged",
            Self::KeyframeAdded => "keyframe.added",
            Self::KeyframeDeleted => "keyframe.deleted",
            Self::KeyframeMoved => "keyframe.moved",
            Self::AnimationDurationChanged => "animation.durationChanged",
            Self::AnimationTakesChanged => "animation.takesChanged",
            Self::ProjectDirtyChanged => "project.dirtyChanged",
            Self::HistoryUndo => "history.undo",
            Self::HistoryRedo => "history.redo",
        }
    }
}

impl serde::Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// One entry in the monotone event log (spec §3 `Event`).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Event {
    /// Monotone sequence number, allocated by a single counter owned by the runtime.
    pub seq: u64,
    /// The event's type.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Event-specific payload.
    pub payload: Value,
}

/// Allocates monotone sequence numbers starting at 1, shared across the
/// whole runtime lifetime (spec §5: "share a monotone seq across the whole
/// runtime lifetime").
#[derive(Debug, Clone, Default)]
pub struct EventSequencer {
    next: u64,
}

impl EventSequencer {
    /// A fresh sequencer whose next allocation is `1`.
    #[must_use]
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate and return the next sequence number.
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next.max(1);
        self.next = seq + 1;
        seq
    }
}

/// Mutable context a running action handler sees: the live state to mutate
/// plus an `emit` sink for events, which allocates real sequence numbers
/// from the caller-owned [`EventSequencer`].
pub struct ActionContext<'a> {
    /// The state being mutated by this action.
    pub state: &'a mut RuntimeState,
    sequencer: &'a mut EventSequencer,
    events: Vec<Event>,
}

impl<'a> ActionContext<'a> {
    /// Build a context over `state`, allocating sequence numbers from `sequencer`.
    pub fn new(state: &'a mut RuntimeState, sequencer: &'a mut EventSequencer) -> Self {
        Self { state, sequencer, events: Vec::new() }
    }

    /// Allocate the next sequence number and append an event to this
    /// action's event list, in emission order.
    pub fn emit(&mut self, kind: EventKind, payload: Value) {
        let seq = self.sequencer.next_seq();
        self.events.push(Event { seq, kind, payload });
    }

    /// Consume the context, returning the events emitted so far.
    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// A single registered action: an enablement gate plus a handler.
pub trait Action: Send + Sync {
    /// Whether this action may run against `ctx.state` with `input`. The
    /// default allows everything. An implementor that rejects should
    /// return an [`MfError`] with whatever code is appropriate (spec: "the
    /// reason code supplied by `isEnabled` (default `MF_ERR_ACTION_DISABLED`)").
    fn is_enabled(&self, _state: &RuntimeState, _input: &Value) -> MfResult<()> {
        Ok(())
    }

    /// Execute the action, mutating `ctx.state` and emitting events via
    /// `ctx.emit`. Returns the JSON `result` payload for the caller.
    fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value>;
}

/// The outcome of a single [`ActionRegistry::dispatch`] call (spec §3
/// `{result, events}`).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ActionResult {
    /// The action's JSON result payload.
    pub result: Value,
    /// Events emitted while running, in emission order.
    pub events: Vec<Event>,
}

/// Registry mapping action id -> handler (spec §4.3). Constructed once at
/// startup and shared for the runtime's lifetime; dispatch never mutates
/// the registry itself.
#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<&'static str, Box<dyn Action>>,
}

impl ActionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under `id`, replacing any previous entry.
    pub fn register(&mut self, id: &'static str, action: impl Action + 'static) {
        self.actions.insert(id, Box::new(action));
    }

    /// Whether `id` is a registered action.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    /// All registered action ids, in a stable (declaration) order.
    #[must_use]
    pub fn action_ids(&self) -> Vec<&'static str> {
        self.actions.keys().copied().collect()
    }

    /// Dispatch `id` against `state`, allocating event sequence numbers
    /// from `sequencer`.
    ///
    /// # Errors
    ///
    /// - [`MfErrorCode::UnknownAction`] if `id` is not registered.
    /// - Whatever [`MfError`] `is_enabled` returns (default
    ///   [`MfErrorCode::ActionDisabled`]) if the action is gated off.
    /// - Whatever [`MfError`] the handler itself returns; on error, `state`
    ///   is left exactly as the handler left it — callers that require
    ///   atomicity must snapshot before dispatching and restore on error
    ///   (the reference behaviour described in spec §4.3).
    pub fn dispatch(
        &self,
        id: &str,
        state: &mut RuntimeState,
        sequencer: &mut EventSequencer,
        input: Value,
    ) -> MfResult<ActionResult> {
        let action = self.actions.get(id).ok_or_else(|| {
            MfError::new(MfErrorCode::UnknownAction, format!("unknown action '{id}'")).with_context("action", id)
        })?;

        action.is_enabled(state, &input)?;

        let mut ctx = ActionContext::new(state, sequencer);
        let result = action.run(&mut ctx, input)?;
        let events = ctx.into_events();
        Ok(ActionResult { result, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;
    impl Action for Echo {
        fn run(&self, ctx: &mut ActionContext<'_>, input: Value) -> MfResult<Value> {
            ctx.emit(EventKind::SelectionChanged, json!({"echo": true}));
            Ok(input)
        }
    }

    struct AlwaysDisabled;
    impl Action for AlwaysDisabled {
        fn is_enabled(&self, _state: &RuntimeState, _input: &Value) -> MfResult<()> {
            Err(MfError::new(MfErrorCode::NoSelection, "nothing selected"))
        }
        fn run(&self, _ctx: &mut ActionContext<'_>, _input: Value) -> MfResult<Value> {
            unreachable!("gated off")
        }
    }

    #[test]
    fn unknown_action_is_reported() {
        let registry = ActionRegistry::new();
        let mut state = RuntimeState::empty();
        let mut seq = EventSequencer::new();
        let err = registry.dispatch("nope", &mut state, &mut seq, json!({})).unwrap_err();
        assert_eq!(err.code, MfErrorCode::UnknownAction);
    }

    #[test]
    fn disabled_action_surfaces_its_own_code() {
        let mut registry = ActionRegistry::new();
        registry.register("test.disabled", AlwaysDisabled);
        let mut state = RuntimeState::empty();
        let mut seq = EventSequencer::new();
        let err = registry.dispatch("test.disabled", &mut state, &mut seq, json!({})).unwrap_err();
        assert_eq!(err.code, MfErrorCode::NoSelection);
    }

    #[test]
    fn sequence_numbers_are_monotone_across_dispatches() {
        let mut registry = ActionRegistry::new();
        registry.register("test.echo", Echo);
        let mut state = RuntimeState::empty();
        let mut seq = EventSequencer::new();
        let r1 = registry.dispatch("test.echo", &mut state, &mut seq, json!({})).unwrap();
        let r2 = registry.dispatch("test.echo", &mut state, &mut seq, json!({})).unwrap();
        assert_eq!(r1.events[0].seq, 1);
        assert_eq!(r2.events[0].seq, 2);
    }

    #[test]
    fn event_kind_wire_strings_are_dotted() {
        assert_eq!(EventKind::KeyframeAdded.as_str(), "keyframe.added");
        assert_eq!(EventKind::HistoryUndo.as_str(), "history.undo");
    }
}
