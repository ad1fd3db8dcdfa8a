// SPDX-License-Identifier: MIT OR Apache-2.0
//! The closed set of parametric recipes (spec §4.5) and the style →
//! amplitude-multiplier table.
//!
//! Each recipe is expressed as one or more keyframe *channel templates*:
//! a property to drive, a base amplitude in that property's natural units,
//! and a list of `(timeFraction, valueFactor, interpolation)` points. The
//! recorded value at each point is `baseValue(property) + amplitude *
//! styleMultiplier * valueFactor`, so every template is expressed relative
//! to the target's resting transform rather than an absolute world value.

use mf_core::Interpolation;
use mf_core::Property;

/// One point in a [`ChannelTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct ChannelPoint {
    /// Fraction of the clip duration, in `[0, 1]`.
    pub frac: f64,
    /// Multiplier applied to the channel's base amplitude at this point.
    pub factor: f64,
    /// Interpolation tag recorded on this keyframe.
    pub interpolation: Interpolation,
}

/// A single animated channel a recipe drives.
#[derive(Debug, Clone, Copy)]
pub struct ChannelTemplate {
    /// The transform property this channel animates.
    pub property: Property,
    /// Natural-unit amplitude (meters for position, radians for rotation,
    /// a unitless multiplier around `1.0` for scale) before the style
    /// multiplier is applied.
    pub base_amplitude: f64,
    /// Keyframe points, in emission order (need not be time-sorted; the
    /// command bus sorts on insertion).
    pub points: &'static [ChannelPoint],
}

/// The closed set of recognized recipes (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recipe {
    /// A rise-fall-settle bob with squash-and-stretch.
    Bounce,
    /// A pull-back anticipation followed by a forward hit.
    AnticipationAndHit,
    /// A gentle, loop-friendly breathing/sway cycle.
    IdleLoop,
    /// A camera push-in (targets an object whose name contains "camera").
    CameraDolly,
    /// A loop-friendly full rotation in place.
    TurnInPlace,
    /// A quick recoil kick with a return to rest.
    Recoil,
}

impl Recipe {
    /// All recipes, in the fixed declaration order used for trigger-phrase
    /// resolution (first match wins).
    pub const ALL: [Recipe; 6] = [
        Recipe::Bounce,
        Recipe::AnticipationAndHit,
        Recipe::IdleLoop,
        Recipe::CameraDolly,
        Recipe::TurnInPlace,
        Recipe::Recoil,
    ];

    /// The recipe's stable kebab-case name (also its goal trigger phrase).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bounce => "bounce",
            Self::AnticipationAndHit => "anticipation-and-hit",
            Self::IdleLoop => "idle-loop",
            Self::CameraDolly => "camera-dolly",
            Self::TurnInPlace => "turn-in-place",
            Self::Recoil => "recoil",
        }
    }

    /// Phrases whose case-insensitive presence in a goal string selects
    /// this recipe.
    #[must_use]
    pub fn trigger_phrases(&self) -> &'static [&'static str] {
        match self {
            Self::Bounce => &["bounce"],
            Self::AnticipationAndHit => &["anticipation and hit", "anticipation", "hit"],
            Self::IdleLoop => &["idle loop", "idle"],
            Self::CameraDolly => &["camera dolly", "dolly", "camera"],
            Self::TurnInPlace => &["turn in place", "turn"],
            Self::Recoil => &["recoil"],
        }
    }

    /// Default clip duration in seconds, before the `[0.1, 30]` clamp.
    #[must_use]
    pub fn default_duration(&self) -> f64 {
        match self {
            Self::Bounce => 1.2,
            Self::AnticipationAndHit => 0.6,
            Self::IdleLoop => 2.0,
            Self::CameraDolly => 3.0,
            Self::TurnInPlace => 1.5,
            Self::Recoil => 0.4,
        }
    }

    /// Whether this recipe is designed to loop seamlessly.
    #[must_use]
    pub fn loop_friendly(&self) -> bool {
        matches!(self, Self::IdleLoop | Self::TurnInPlace)
    }

    /// The channel templates this recipe expands into.
    #[must_use]
    pub fn channels(&self) -> &'static [ChannelTemplate] {
        static BOUNCE_POSITION_Y: [ChannelPoint; 5] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.22, factor: 1.0, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 0.46, factor: 0.0, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.7, factor: 0.15, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static BOUNCE_SCALE_Y: [ChannelPoint; 4] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.22, factor: 0.3, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 0.46, factor: -0.25, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static BOUNCE_SCALE_X: [ChannelPoint; 4] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.22, factor: -0.15, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 0.46, factor: 0.2, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static BOUNCE_SCALE_Z: [ChannelPoint; 3] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.46, factor: 0.2, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static BOUNCE: [ChannelTemplate; 4] = [
            ChannelTemplate { property: Property::PositionY, base_amplitude: 0.6, points: &BOUNCE_POSITION_Y },
            ChannelTemplate { property: Property::ScaleY, base_amplitude: 1.0, points: &BOUNCE_SCALE_Y },
            ChannelTemplate { property: Property::ScaleX, base_amplitude: 1.0, points: &BOUNCE_SCALE_X },
            ChannelTemplate { property: Property::ScaleZ, base_amplitude: 1.0, points: &BOUNCE_SCALE_Z },
        ];

        static HIT_POSITION_X: [ChannelPoint; 4] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 0.15, factor: -0.3, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.4, factor: 1.0, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static HIT_ROTATION_Z: [ChannelPoint; 4] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 0.4, factor: 1.0, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.7, factor: -0.3, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static ANTICIPATION_AND_HIT: [ChannelTemplate; 2] = [
            ChannelTemplate { property: Property::PositionX, base_amplitude: 0.35, points: &HIT_POSITION_X },
            ChannelTemplate { property: Property::RotationZ, base_amplitude: 0.3, points: &HIT_ROTATION_Z },
        ];

        static IDLE_POSITION_Y: [ChannelPoint; 3] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseInOut },
            ChannelPoint { frac: 0.5, factor: 1.0, interpolation: Interpolation::EaseInOut },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static IDLE_ROTATION_Y: [ChannelPoint; 3] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseInOut },
            ChannelPoint { frac: 0.5, factor: 1.0, interpolation: Interpolation::EaseInOut },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static IDLE_LOOP: [ChannelTemplate; 2] = [
            ChannelTemplate { property: Property::PositionY, base_amplitude: 0.15, points: &IDLE_POSITION_Y },
            ChannelTemplate { property: Property::RotationY, base_amplitude: 0.05, points: &IDLE_ROTATION_Y },
        ];

        static DOLLY_POSITION_Z: [ChannelPoint; 2] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseInOut },
            ChannelPoint { frac: 1.0, factor: -1.0, interpolation: Interpolation::Linear },
        ];
        static DOLLY_POSITION_Y: [ChannelPoint; 2] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseInOut },
            ChannelPoint { frac: 1.0, factor: 0.2, interpolation: Interpolation::Linear },
        ];
        static CAMERA_DOLLY: [ChannelTemplate; 2] = [
            ChannelTemplate { property: Property::PositionZ, base_amplitude: 2.0, points: &DOLLY_POSITION_Z },
            ChannelTemplate { property: Property::PositionY, base_amplitude: 0.4, points: &DOLLY_POSITION_Y },
        ];

        static TURN_ROTATION_Y: [ChannelPoint; 3] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseInOut },
            ChannelPoint { frac: 0.5, factor: 0.5, interpolation: Interpolation::EaseInOut },
            ChannelPoint { frac: 1.0, factor: 1.0, interpolation: Interpolation::Linear },
        ];
        static TURN_IN_PLACE: [ChannelTemplate; 1] =
            [ChannelTemplate { property: Property::RotationY, base_amplitude: std::f64::consts::TAU, points: &TURN_ROTATION_Y }];

        static RECOIL_POSITION_Z: [ChannelPoint; 4] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.12, factor: -1.0, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 0.4, factor: 0.2, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static RECOIL_ROTATION_X: [ChannelPoint; 3] = [
            ChannelPoint { frac: 0.0, factor: 0.0, interpolation: Interpolation::EaseOut },
            ChannelPoint { frac: 0.12, factor: -0.5, interpolation: Interpolation::EaseIn },
            ChannelPoint { frac: 1.0, factor: 0.0, interpolation: Interpolation::Linear },
        ];
        static RECOIL: [ChannelTemplate; 2] = [
            ChannelTemplate { property: Property::PositionZ, base_amplitude: 0.25, points: &RECOIL_POSITION_Z },
            ChannelTemplate { property: Property::RotationX, base_amplitude: 0.2, points: &RECOIL_ROTATION_X },
        ];

        match self {
            Self::Bounce => &BOUNCE,
            Self::AnticipationAndHit => &ANTICIPATION_AND_HIT,
            Self::IdleLoop => &IDLE_LOOP,
            Self::CameraDolly => &CAMERA_DOLLY,
            Self::TurnInPlace => &TURN_IN_PLACE,
            Self::Recoil => &RECOIL,
        }
    }

    /// Find the first recipe (in [`Recipe::ALL`] order) whose trigger
    /// phrase appears (case-insensitively) in `goal`.
    #[must_use]
    pub fn resolve(goal: &str) -> Option<Recipe> {
        let lower = goal.to_lowercase();
        Self::ALL.into_iter().find(|r| r.trigger_phrases().iter().any(|p| lower.contains(p)))
    }
}

/// Animation style, selecting an amplitude multiplier (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Style {
    /// Quick, high-energy motion.
    Snappy,
    /// Subdued, physically grounded motion.
    Realistic,
    /// Exaggerated, bouncy motion.
    Cartoony,
    /// Slow, deliberate motion.
    Cinematic,
}

impl Style {
    /// Parse a style name; unrecognized or absent names fall back to a
    /// `1.0` multiplier at the call site rather than erroring (spec:
    /// "unknown → 1.0").
    #[must_use]
    pub fn parse(name: &str) -> Option<Style> {
        match name.to_lowercase().as_str() {
            "snappy" => Some(Style::Snappy),
            "realistic" => Some(Style::Realistic),
            "cartoony" => Some(Style::Cartoony),
            "cinematic" => Some(Style::Cinematic),
            _ => None,
        }
    }

    /// The amplitude multiplier this style applies.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        match self {
            Style::Snappy => 1.2,
            Style::Realistic => 0.8,
            Style::Cartoony => 1.5,
            Style::Cinematic => 0.65,
        }
    }
}

/// Resolve a style name (or `None`) to its amplitude multiplier, defaulting
/// to `1.0` for anything unrecognized.
#[must_use]
pub fn style_multiplier(name: Option<&str>) -> f64 {
    name.and_then(Style::parse).map_or(1.0, |s| s.multiplier())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounce_template_has_sixteen_points_total() {
        let total: usize = Recipe::Bounce.channels().iter().map(|c| c.points.len()).sum();
        assert_eq!(total, 16);
    }

    #[test]
    fn resolve_finds_bounce() {
        assert_eq!(Recipe::resolve("make it bounce please"), Some(Recipe::Bounce));
    }

    #[test]
    fn resolve_is_case_insensitive() {
        assert_eq!(Recipe::resolve("IDLE LOOP the cube"), Some(Recipe::IdleLoop));
    }

    #[test]
    fn resolve_none_for_unrecognized_goal() {
        assert_eq!(Recipe::resolve("do a barrel roll"), None);
    }

    #[test]
    fn unknown_style_multiplier_is_one() {
        assert_eq!(style_multiplier(Some("unknown-style")), 1.0);
        assert_eq!(style_multiplier(None), 1.0);
    }

    #[test]
    fn known_styles_match_spec_table() {
        assert_eq!(style_multiplier(Some("snappy")), 1.2);
        assert_eq!(style_multiplier(Some("realistic")), 0.8);
        assert_eq!(style_multiplier(Some("cartoony")), 1.5);
        assert_eq!(style_multiplier(Some("cinematic")), 0.65);
    }

    #[test]
    fn idle_loop_and_turn_in_place_are_loop_friendly() {
        assert!(Recipe::IdleLoop.loop_friendly());
        assert!(Recipe::TurnInPlace.loop_friendly());
        assert!(!Recipe::Bounce.loop_friendly());
    }
}
