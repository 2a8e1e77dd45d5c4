//! Marble Race - a 2D ball-drop race randomizer
//!
//! Core modules:
//! - `sim`: Simulation engine (course generation, ball physics, race state machine)
//! - `feedback`: Audio/visual cue sink the race reports to
//! - `settings`: Runtime race preferences
//! - `error`: Library error types

pub mod error;
pub mod feedback;
pub mod settings;
pub mod sim;

pub use error::{RaceError, SettingsError};
pub use feedback::{Cue, FeedbackSink, LogFeedback, NullFeedback};
pub use settings::{Placement, QualityPreset, RaceSettings};

use glam::Vec2;

/// Race configuration constants
///
/// Distances are in course pixels, velocities in pixels per frame.
pub mod consts {
    /// Nominal frame length the integrator is tuned for (60 Hz)
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Maximum frames simulated per host callback to prevent spiral of death
    pub const MAX_FRAMES_PER_UPDATE: u32 = 4;
    /// Longest host delta one tick accepts; longer pauses are clamped
    pub const MAX_TICK_MS: f32 = 100.0;

    /// Course dimensions
    pub const COURSE_WIDTH: f32 = 400.0;
    pub const BASE_COURSE_HEIGHT: f32 = 4000.0;
    pub const MAX_COURSE_HEIGHT: f32 = 6000.0;
    /// Participants that fit the base course before it starts to grow
    pub const HEADROOM_PARTICIPANTS: usize = 20;
    pub const HEIGHT_PER_EXTRA_PARTICIPANT: f32 = 25.0;
    pub const WALL_THICKNESS: f32 = 4.0;
    pub const FINISH_LINE_HEIGHT: f32 = 40.0;
    /// Gap between the last obstacle row and the finish line
    pub const FINISH_RUNOUT: f32 = 100.0;

    /// Ball sizing
    pub const BALL_MIN_RADIUS: f32 = 5.0;
    pub const BALL_MAX_RADIUS: f32 = 14.0;
    pub const BALL_RADIUS_SHRINK: f32 = 0.18;

    /// Ball dynamics
    pub const GRAVITY: f32 = 0.25;
    pub const DAMPING: f32 = 0.94;
    pub const MAX_VELOCITY: f32 = 9.0;
    pub const SUB_STEPS: u32 = 5;
    /// Wall and plain obstacle restitution
    pub const RESTITUTION: f32 = 0.45;
    pub const BOUNCY_PEG_RESTITUTION: f32 = 0.9;
    pub const BOUNCY_PEG_CHANCE: f64 = 0.15;
    pub const BALL_RESTITUTION: f32 = 0.5;
    /// Fraction of the overlap each ball is pushed back (per ball)
    pub const OVERLAP_PUSH: f32 = 0.4;
    /// Distances below this are treated as degenerate and skipped
    pub const MIN_CONTACT_DISTANCE: f32 = 0.01;

    /// Pack-balancing forces
    pub const DRAFTING_BOOST: f32 = 0.04;
    /// Drafting window behind another ball, in radii
    pub const DRAFT_RANGE_RADII: f32 = 3.0;
    pub const TURBULENCE: f32 = 0.25;
    pub const LEADER_DRAG: f32 = 0.015;
    pub const CATCHUP_GRAVITY: f32 = 1.15;
    /// Leader-to-last spread before rubber-banding kicks in
    pub const CATCHUP_SPREAD: f32 = 300.0;

    /// Contact response tweaks
    pub const CONTACT_NUDGE: f32 = 0.3;
    pub const PEG_DEFLECTION: f32 = 0.5;
    pub const SEGMENT_LATERAL_PUSH: f32 = 0.6;
    pub const SEGMENT_DOWN_NUDGE: f32 = 0.2;
    /// Fraction of a segment's length treated as its tip
    pub const SEGMENT_TIP_MARGIN: f32 = 0.08;
    pub const BUMPER_TOP_NORMAL: f32 = 0.7;
    pub const BUMPER_REST_SPEED: f32 = 2.0;
    pub const BUMPER_SLIDE_MIN: f32 = 2.5;
    /// Horizontal velocity multiplier when a moving block carries a ball
    pub const RIDE_AMPLIFY: f32 = 1.5;

    /// Anti-stall rescue
    pub const STALL_CHECK_TICKS: u32 = 45;
    pub const STALL_MIN_DESCENT: f32 = 3.0;
    pub const RESCUE_KICK_MIN: f32 = 6.0;
    pub const RESCUE_KICK_SPREAD: f32 = 3.0;
    pub const RESCUE_LATERAL: f32 = 8.0;
    pub const RESCUE_NUDGE: f32 = 5.0;

    /// Staggered start grid
    pub const STAGGER_MARGIN: f32 = 20.0;
    pub const STAGGER_TOP: f32 = 30.0;

    /// Camera
    pub const CAMERA_LERP_SPEED: f32 = 0.06;
    pub const CAMERA_LEAD_OFFSET: f32 = 150.0;
    pub const VIEWPORT_HEIGHT: f32 = 500.0;

    /// Obstacle geometry
    pub const FIRST_ROW_Y: f32 = 200.0;
    pub const PEG_RADIUS: f32 = 6.0;
    pub const PEGS_PER_ROW_MIN: usize = 6;
    pub const PEGS_PER_ROW_MAX: usize = 11;
    pub const PEG_ROW_JITTER: f32 = 8.0;
    pub const BUMPER_THICKNESS: f32 = 6.0;
    pub const BUMPER_MIN_WIDTH: f32 = 40.0;
    pub const BUMPER_MAX_TILT: f32 = 0.2;
    pub const SEGMENT_THICKNESS: f32 = 4.0;
    pub const FUNNEL_WIDTH: f32 = 120.0;
    pub const FUNNEL_HEIGHT: f32 = 50.0;
    /// Preferred funnel mouth width in ball radii (never below the clearance)
    pub const FUNNEL_MOUTH_RADII: f32 = 4.0;
    /// Sideways shift of single funnels toward the open side (fraction of span)
    pub const FUNNEL_OFFSET: f32 = 0.15;
    pub const DOUBLE_FUNNEL_HEIGHT: f32 = 55.0;
    pub const ZIGZAG_SHELF_SPAN: f32 = 0.55;
    pub const ZIGZAG_SHELF_GAP: f32 = 40.0;
    pub const ZIGZAG_SHELF_ANGLE: f32 = 0.28;
    pub const CROSSOVER_SHELF_SPAN: f32 = 0.62;
    pub const CROSSOVER_RAMP_ANGLE: f32 = 0.35;
    pub const SPINNER_RING_RADIUS: f32 = 45.0;
    pub const SPINNER_PEG_COUNT: usize = 6;
    pub const SPINNER_PEG_RADIUS: f32 = 5.0;
    /// Spinner angular speed range (radians per second)
    pub const SPINNER_MIN_SPEED: f32 = 0.8;
    pub const SPINNER_MAX_SPEED: f32 = 1.8;
    pub const SLIDER_MIN_WIDTH: f32 = 60.0;
    pub const SLIDER_MAX_WIDTH: f32 = 90.0;
    pub const SLIDER_HEIGHT: f32 = 8.0;
    /// Slider oscillation period range (ms)
    pub const SLIDER_MIN_PERIOD_MS: f32 = 2500.0;
    pub const SLIDER_MAX_PERIOD_MS: f32 = 4500.0;
    pub const TRAPDOOR_HEIGHT: f32 = 8.0;
    pub const TRAPDOOR_CYCLE_MS: f32 = 5000.0;
    pub const TRAPDOOR_OPEN_MS: f32 = 800.0;
    /// Fraction of the open window spent easing the door in/out
    pub const TRAPDOOR_SMOOTHING: f32 = 0.15;
    pub const PINBALL_BUMPER_RADIUS: f32 = 14.0;
    pub const PINBALL_BUMPER_RESTITUTION: f32 = 1.8;
    pub const PINBALL_LANE_BUMPER_COUNT: usize = 5;
    pub const BLACK_HOLE_RADIUS: f32 = 25.0;
    /// Vertical room a gravity well pair takes, in pull radii
    pub const GRAVITY_WELL_HEIGHT: f32 = 1.5;
    pub const BLACK_HOLE_PULL_RADIUS: f32 = 100.0;
    pub const BLACK_HOLE_PULL_FORCE: f32 = 0.15;
    /// Pull strength cap as a multiple of the base pull force
    pub const BLACK_HOLE_MAX_PULL: f32 = 4.0;
    pub const EVENT_HORIZON_RADIUS: f32 = 10.0;
    pub const WHITE_HOLE_RADIUS: f32 = 25.0;
    pub const WHITE_HOLE_EJECT_FORCE: f32 = 8.0;

    /// Minimum clearance: `2r * CLEARANCE_SAFETY_FACTOR + COLLISION_THICKNESS`
    pub const CLEARANCE_SAFETY_FACTOR: f32 = 1.5;
    pub const COLLISION_THICKNESS: f32 = 8.0;
    /// Openings at or below this width are sealed joints, not gaps
    pub const SEAL_TOLERANCE: f32 = 0.5;
    /// Clearance the zone spacing table was tuned against
    pub const REFERENCE_CLEARANCE: f32 = 50.0;

    /// Zone boundaries as fractions of the playable height
    pub const ZONE_TOP_END: f32 = 0.30;
    pub const ZONE_MID_END: f32 = 0.72;

    /// Broad-phase cell size (>= largest ball diameter and drafting window)
    pub const GRID_CELL_SIZE: f32 = 50.0;

    /// Mixer drum
    pub const MIXER_RADIUS: f32 = 70.0;
    pub const MIXER_CENTER_Y: f32 = 90.0;
    pub const MIXER_DURATION_MS: f32 = 3000.0;
    pub const MIXER_SPIN_FORCE: f32 = 0.45;
    pub const MIXER_GRAVITY: f32 = 0.1;
    pub const MIXER_RESTITUTION: f32 = 0.6;
    pub const RELEASE_MIN_VY: f32 = 2.0;
    pub const RELEASE_VY_SPREAD: f32 = 2.0;
    pub const RELEASE_VX_SPREAD: f32 = 3.0;

    /// Sparks
    pub const SPARKS_PER_HIT: usize = 4;
    pub const SPARK_SPEED: f32 = 2.5;
    pub const SPARK_GRAVITY: f32 = 0.2;
    pub const SPARK_MIN_LIFE_FRAMES: f32 = 18.0;
    pub const SPARK_MAX_LIFE_FRAMES: f32 = 36.0;

    /// Minimum simulated time between collision cues
    pub const COLLISION_CUE_INTERVAL_MS: f32 = 50.0;
}

/// Ball palette, assigned by participant index
pub const BALL_COLORS: [u32; 8] = [
    0x4C6EF5, 0xFA5252, 0xFAB005, 0x40C057, 0xBE4BDB, 0xF76707, 0x12B886, 0xE64980,
];

/// Wrap an angle into [-π, π)
///
/// Closed form, so any finite input costs the same. Non-finite input maps to 0.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can round up to TAU for inputs just below a multiple
    if wrapped >= PI { -PI } else { wrapped }
}

/// Point at distance `r` along direction `theta`
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Ball radius for a race with `count` participants
///
/// Pure function of the count; shrinks linearly down to the minimum radius.
#[inline]
pub fn ball_radius(count: usize) -> f32 {
    use consts::*;
    (BALL_MAX_RADIUS - count as f32 * BALL_RADIUS_SHRINK).max(BALL_MIN_RADIUS)
}

/// Narrowest opening the course generator may leave for balls of `radius`
#[inline]
pub fn min_clearance(radius: f32) -> f32 {
    use consts::*;
    radius * 2.0 * CLEARANCE_SAFETY_FACTOR + COLLISION_THICKNESS
}

/// Course height for a race with `count` participants
pub fn course_height(count: usize) -> f32 {
    use consts::*;
    let extra = count.saturating_sub(HEADROOM_PARTICIPANTS) as f32;
    (BASE_COURSE_HEIGHT + extra * HEIGHT_PER_EXTRA_PARTICIPANT).min(MAX_COURSE_HEIGHT)
}
