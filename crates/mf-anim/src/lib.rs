// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-anim
#![deny(unsafe_code)]
#![warn(missing_docs)]

use mf_core::{Clip, Interpolation, Keyframe, Property, Track};
use std::collections::BTreeMap;

/// Coalescing tolerance for keyframe times (spec §4.2): a new keyframe whose
/// time is within this distance of an existing one on the same track
/// replaces it rather than creating a second keyframe.
pub const TIME_EPSILON: f64 = 1e-6;

/// Reference to one keyframe: the `(objectId, property)` track plus its time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeRef<'a> {
    /// Owning object id.
    pub object_id: &'a str,
    /// Channel property.
    pub property: Property,
    /// Keyframe time, used to locate it within the track (matched within
    /// [`TIME_EPSILON`]).
    pub time: f64,
}

/// Find the track for `(object_id, property)`, appending an empty one if it
/// doesn't exist yet. Returns the track's index in `clip.tracks`.
pub fn get_or_create_track(clip: &mut Clip, object_id: &str, property: Property) -> usize {
    if let Some(idx) = clip
        .tracks
        .iter()
        .position(|t| t.object_id == object_id && t.property == property)
    {
        return idx;
    }
    clip.tracks.push(Track {
        object_id: object_id.to_string(),
        property,
        bind_path: None,
        keyframes: Vec::new(),
    });
    clip.tracks.len() - 1
}

/// Insert `keyframe` into the track at `(object_id, property)`, creating the
/// track if needed. A keyframe already within [`TIME_EPSILON`] of
/// `keyframe.time` is replaced rather than duplicated. The track stays
/// sorted by time.
pub fn insert_keyframe(clip: &mut Clip, object_id: &str, property: Property, keyframe: Keyframe) {
    let idx = get_or_create_track(clip, object_id, property);
    let track = &mut clip.tracks[idx];
    if let Some(existing) = track
        .keyframes
        .iter_mut()
        .find(|k| (k.time - keyframe.time).abs() <= TIME_EPSILON)
    {
        *existing = keyframe;
    } else {
        track.keyframes.push(keyframe);
    }
    track
        .keyframes
        .sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
}

/// Remove every keyframe named by `refs` (matched within [`TIME_EPSILON`]).
/// Tracks left with no keyframes are dropped.
pub fn remove_keyframes(clip: &mut Clip, refs: &[KeyframeRef<'_>]) {
    for r in refs {
        if let Some(track) = clip
            .tracks
            .iter_mut()
            .find(|t| t.object_id == r.object_id && t.property == r.property)
        {
            track.keyframes.retain(|k| (k.time - r.time).abs() > TIME_EPSILON);
        }
    }
    clip.tracks.retain(|t| !t.keyframes.is_empty());
}

/// Shift every keyframe named by `refs` by `delta_time` seconds, clamped to
/// `[0, clip.durationSeconds]`. If the shifted time collides (within
/// [`TIME_EPSILON`]) with another keyframe already on that track, the
/// colliding keyframe is replaced (spec §4.2: "collision-replaces-on-clamp").
pub fn move_keyframes(clip: &mut Clip, refs: &[KeyframeRef<'_>], delta_time: f64) {
    let duration = clip.duration_seconds;
    for r in refs {
        let Some(track) = clip
            .tracks
            .iter_mut()
            .find(|t| t.object_id == r.object_id && t.property == r.property)
        else {
            continue;
        };
        let Some(pos) = track
            .keyframes
            .iter()
            .position(|k| (k.time - r.time).abs() <= TIME_EPSILON)
        else {
            continue;
        };
        let moved = track.keyframes.remove(pos);
        let new_time = (moved.time + delta_time).clamp(0.0, duration);
        track
            .keyframes
            .retain(|k| (k.time - new_time).abs() > TIME_EPSILON);
        track.keyframes.push(Keyframe { time: new_time, ..moved });
        track
            .keyframes
            .sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
    }
}

/// Set the value of one keyframe named by `r`. A no-op if no keyframe
/// exists at that time.
pub fn set_keyframe_value(clip: &mut Clip, r: KeyframeRef<'_>, value: f64) {
    if let Some(track) = clip
        .tracks
        .iter_mut()
        .find(|t| t.object_id == r.object_id && t.property == r.property)
        && let Some(kf) = track
            .keyframes
            .iter_mut()
            .find(|k| (k.time - r.time).abs() <= TIME_EPSILON)
    {
        kf.value = value;
    }
}

/// Set the interpolation tag of one keyframe named by `r`. A no-op if no
/// keyframe exists at that time.
pub fn set_keyframe_interpolation(clip: &mut Clip, r: KeyframeRef<'_>, interpolation: Interpolation) {
    if let Some(track) = clip
        .tracks
        .iter_mut()
        .find(|t| t.object_id == r.object_id && t.property == r.property)
        && let Some(kf) = track
            .keyframes
            .iter_mut()
            .find(|k| (k.time - r.time).abs() <= TIME_EPSILON)
    {
        kf.interpolation = interpolation;
    }
}

/// The animated value of every `(objectId, property)` channel at time `t`.
///
/// `t` is clamped to `[0, clip.durationSeconds]`. Before the first or after
/// the last keyframe on a track, the boundary value is held constant.
/// Between two keyframes, the *left* keyframe's interpolation tag selects
/// the blend curve (spec §4.2).
#[must_use]
pub fn evaluate_clip(clip: &Clip, t: f64) -> BTreeMap<String, BTreeMap<&'static str, f64>> {
    let t = t.clamp(0.0, clip.duration_seconds);
    let mut out: BTreeMap<String, BTreeMap<&'static str, f64>> = BTreeMap::new();
    for track in &clip.tracks {
        if let Some(value) = evaluate_track(track, t) {
            out.entry(track.object_id.clone())
                .or_default()
                .insert(track.property.as_str(), value);
        }
    }
    out
}

/// Evaluate a single track at time `t` (already clamped). `None` if the
/// track has no keyframes.
fn evaluate_track(track: &Track, t: f64) -> Option<f64> {
    let keyframes = &track.keyframes;
    if keyframes.is_empty() {
        return None;
    }
    if t <= keyframes[0].time {
        return Some(keyframes[0].value);
    }
    if t >= keyframes[keyframes.len() - 1].time {
        return Some(keyframes[keyframes.len() - 1].value);
    }

    // Binary search for the first keyframe with time > t; the surrounding
    // pair is (idx-1, idx).
    let idx = keyframes.partition_point(|k| k.time <= t);
    let left = &keyframes[idx - 1];
    let right = &keyframes[idx];
    if (left.time - t).abs() <= TIME_EPSILON {
        return Some(left.value);
    }

    let span = right.time - left.time;
    let u = if span > 0.0 { (t - left.time) / span } else { 0.0 };
    Some(interpolate(left.interpolation, left.value, right.value, u))
}

/// Blend `(left, right)` at parameter `u in [0,1]` using `interpolation`
/// (the tag carried by the *left* keyframe, per spec §4.2).
fn interpolate(interpolation: Interpolation, left: f64, right: f64, u: f64) -> f64 {
    let eased = match interpolation {
        Interpolation::Linear => u,
        Interpolation::Step => 0.0,
        Interpolation::EaseIn => u * u,
        Interpolation::EaseOut => 1.0 - (1.0 - u) * (1.0 - u),
        Interpolation::EaseInOut => 0.5 * (1.0 - (std::f64::consts::PI * u).cos()),
    };
    left + (right - left) * eased
}
