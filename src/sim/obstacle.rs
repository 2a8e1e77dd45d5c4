//! Course obstacles
//!
//! One variant per obstacle kind, each carrying only the fields it needs.
//! Shapes never change after generation; moving obstacles store their
//! kinematic parameters and derive their pose from the race clock.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::Footprint;
use crate::consts::*;
use crate::{normalize_angle, polar_to_cartesian};

/// Which structure a line segment belongs to (drawing hint only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    FunnelLeft,
    FunnelRight,
    ZigzagShelf,
    CrossoverRamp,
}

/// Rectangle block flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Slider,
    Trapdoor,
}

/// Horizontal motion of a block as a pure function of time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlideMotion {
    /// `offset = amplitude * sin(TAU * t / period + phase)`
    Oscillate {
        amplitude: f32,
        period_ms: f32,
        phase: f32,
    },
    /// Closed (offset 0) except for an eased open window once per cycle
    Trapdoor {
        /// Signed distance the door slides when fully open
        travel: f32,
        cycle_ms: f32,
        open_ms: f32,
        phase_ms: f32,
    },
}

impl SlideMotion {
    /// Horizontal offset from the block's rest position at `clock_ms`
    pub fn offset_at(&self, clock_ms: f32) -> f32 {
        match *self {
            SlideMotion::Oscillate {
                amplitude,
                period_ms,
                phase,
            } => {
                if period_ms <= 0.0 || !clock_ms.is_finite() {
                    return 0.0;
                }
                amplitude * (TAU * clock_ms.rem_euclid(period_ms) / period_ms + phase).sin()
            }
            SlideMotion::Trapdoor {
                travel,
                cycle_ms,
                open_ms,
                phase_ms,
            } => travel * trapdoor_open_fraction(clock_ms + phase_ms, cycle_ms, open_ms),
        }
    }

    /// Largest distance the block ever travels left / right of rest
    pub fn reach(&self) -> (f32, f32) {
        match *self {
            SlideMotion::Oscillate { amplitude, .. } => (amplitude.abs(), amplitude.abs()),
            SlideMotion::Trapdoor { travel, .. } => ((-travel).max(0.0), travel.max(0.0)),
        }
    }
}

/// How far open a trapdoor is (0 closed, 1 open) at `t` within its cycle
pub fn trapdoor_open_fraction(t: f32, cycle_ms: f32, open_ms: f32) -> f32 {
    if cycle_ms <= 0.0 || open_ms <= 0.0 {
        return 0.0;
    }
    let local = t.rem_euclid(cycle_ms);
    if local >= open_ms {
        return 0.0;
    }
    let ramp = (open_ms * TRAPDOOR_SMOOTHING).max(f32::EPSILON);
    let edge = local.min(open_ms - local);
    if edge >= ramp {
        1.0
    } else {
        smoothstep(edge / ramp)
    }
}

#[inline]
fn smoothstep(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

/// A course obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Obstacle {
    /// Static circle; bouncy pegs use a much higher restitution
    Peg { pos: Vec2, radius: f32, bouncy: bool },
    /// High-restitution circle that adds energy on every hit
    PinballBumper { pos: Vec2, radius: f32 },
    /// Capsule-shaped baffle (horizontal or slightly inclined)
    Bumper { a: Vec2, b: Vec2, radius: f32 },
    /// Thick line segment (funnel arm, zigzag shelf, crossover ramp)
    Segment {
        kind: SegmentKind,
        a: Vec2,
        b: Vec2,
        thickness: f32,
    },
    /// Rotating ring of pegs; the ring itself does not collide
    Spinner {
        center: Vec2,
        ring_radius: f32,
        peg_radius: f32,
        peg_count: usize,
        phase: f32,
        /// Radians per millisecond (signed)
        angular_speed: f32,
        /// Current ring angle (derived from the clock)
        angle: f32,
    },
    /// Axis-aligned rectangle sliding horizontally (slider or trapdoor)
    Block {
        kind: BlockKind,
        /// Top-left corner at rest
        rest_min: Vec2,
        size: Vec2,
        motion: SlideMotion,
        /// Current horizontal offset from rest (derived from the clock)
        offset: f32,
        /// Current horizontal velocity in px/frame (derived from the clock)
        velocity: f32,
    },
    /// Black hole that pulls nearby balls and teleports them to its white hole
    GravityWell {
        black_hole: Vec2,
        white_hole: Vec2,
        pull_radius: f32,
        event_horizon: f32,
    },
}

impl Obstacle {
    pub fn peg(pos: Vec2, radius: f32, bouncy: bool) -> Self {
        Obstacle::Peg {
            pos,
            radius,
            bouncy,
        }
    }

    pub fn segment(kind: SegmentKind, a: Vec2, b: Vec2, thickness: f32) -> Self {
        Obstacle::Segment {
            kind,
            a,
            b,
            thickness,
        }
    }

    pub fn block(kind: BlockKind, rest_min: Vec2, size: Vec2, motion: SlideMotion) -> Self {
        Obstacle::Block {
            kind,
            rest_min,
            size,
            motion,
            offset: 0.0,
            velocity: 0.0,
        }
    }

    /// Short name used in logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Obstacle::Peg { .. } => "peg",
            Obstacle::PinballBumper { .. } => "pinball_bumper",
            Obstacle::Bumper { .. } => "bumper",
            Obstacle::Segment { .. } => "segment",
            Obstacle::Spinner { .. } => "spinner",
            Obstacle::Block {
                kind: BlockKind::Slider,
                ..
            } => "slider",
            Obstacle::Block {
                kind: BlockKind::Trapdoor,
                ..
            } => "trapdoor",
            Obstacle::GravityWell { .. } => "gravity_well",
        }
    }

    /// Whether the pose depends on the clock
    pub fn is_moving(&self) -> bool {
        matches!(self, Obstacle::Spinner { .. } | Obstacle::Block { .. })
    }

    /// Recompute the pose of a moving obstacle for `clock_ms`
    pub fn advance(&mut self, clock_ms: f32) {
        if !clock_ms.is_finite() {
            return;
        }
        match self {
            Obstacle::Spinner {
                phase,
                angular_speed,
                angle,
                ..
            } => {
                let turned = (*angular_speed * clock_ms).rem_euclid(TAU);
                *angle = normalize_angle(*phase + turned);
            }
            Obstacle::Block {
                motion,
                offset,
                velocity,
                ..
            } => {
                let now = motion.offset_at(clock_ms);
                *velocity = now - motion.offset_at(clock_ms - FRAME_MS);
                *offset = now;
            }
            _ => {}
        }
    }

    /// Representative position (center)
    pub fn position(&self) -> Vec2 {
        match *self {
            Obstacle::Peg { pos, .. } | Obstacle::PinballBumper { pos, .. } => pos,
            Obstacle::Bumper { a, b, .. } | Obstacle::Segment { a, b, .. } => (a + b) * 0.5,
            Obstacle::Spinner { center, .. } => center,
            Obstacle::Block {
                rest_min,
                size,
                offset,
                ..
            } => rest_min + Vec2::new(offset, 0.0) + size * 0.5,
            Obstacle::GravityWell { black_hole, .. } => black_hole,
        }
    }

    /// Half of the vertical extent around `position().y` a ball can touch
    pub fn vertical_reach(&self) -> f32 {
        match *self {
            Obstacle::Peg { radius, .. } | Obstacle::PinballBumper { radius, .. } => radius,
            Obstacle::Bumper { a, b, radius } => (a.y - b.y).abs() * 0.5 + radius,
            Obstacle::Segment { a, b, thickness, .. } => (a.y - b.y).abs() * 0.5 + thickness,
            Obstacle::Spinner {
                ring_radius,
                peg_radius,
                ..
            } => ring_radius + peg_radius,
            Obstacle::Block { size, .. } => size.y * 0.5,
            Obstacle::GravityWell { pull_radius, .. } => pull_radius,
        }
    }

    /// Whether a ball at `y` with `radius` is close enough vertically to test
    #[inline]
    pub fn within_vertical_reach(&self, y: f32, radius: f32) -> bool {
        (y - self.position().y).abs() <= self.vertical_reach() + radius
    }

    /// Current rectangle of a block
    pub fn block_rect(&self) -> Option<(Vec2, Vec2)> {
        match *self {
            Obstacle::Block {
                rest_min,
                size,
                offset,
                ..
            } => {
                let min = rest_min + Vec2::new(offset, 0.0);
                Some((min, min + size))
            }
            _ => None,
        }
    }

    /// Current peg positions and velocities (px/frame) of a spinner
    pub fn spinner_pegs(&self) -> Vec<(Vec2, Vec2)> {
        match *self {
            Obstacle::Spinner {
                center,
                ring_radius,
                peg_count,
                angular_speed,
                angle,
                ..
            } => (0..peg_count)
                .map(|i| {
                    let theta = angle + i as f32 / peg_count as f32 * TAU;
                    let offset = polar_to_cartesian(ring_radius, theta);
                    // v = omega x r, scaled to one frame
                    let vel = Vec2::new(-offset.y, offset.x) * angular_speed * FRAME_MS;
                    (center + offset, vel)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Region the obstacle can ever occupy (`None` for non-solid wells)
    ///
    /// Moving obstacles report their swept region, so openings measured
    /// against it hold at every pose.
    pub fn footprint(&self) -> Option<Footprint> {
        match *self {
            Obstacle::Peg { pos, radius, .. } | Obstacle::PinballBumper { pos, radius } => {
                Some(Footprint::Disc {
                    center: pos,
                    radius,
                })
            }
            Obstacle::Bumper { a, b, radius } => Some(Footprint::Capsule { a, b, radius }),
            Obstacle::Segment { a, b, thickness, .. } => Some(Footprint::Capsule {
                a,
                b,
                radius: thickness,
            }),
            Obstacle::Spinner {
                center,
                ring_radius,
                peg_radius,
                ..
            } => Some(Footprint::Disc {
                center,
                radius: ring_radius + peg_radius,
            }),
            Obstacle::Block {
                rest_min,
                size,
                motion,
                ..
            } => {
                let (left, right) = motion.reach();
                Some(Footprint::Rect {
                    min: rest_min - Vec2::new(left, 0.0),
                    max: rest_min + size + Vec2::new(right, 0.0),
                })
            }
            Obstacle::GravityWell { .. } => None,
        }
    }

    /// Lowest y any part of the obstacle reaches
    pub fn bottom(&self) -> f32 {
        match *self {
            Obstacle::GravityWell {
                black_hole,
                white_hole,
                ..
            } => black_hole.y.max(white_hole.y) + WHITE_HOLE_RADIUS,
            _ => self
                .footprint()
                .map(|f| f.y_range().1)
                .unwrap_or_else(|| self.position().y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trapdoor_fraction_cycle() {
        let cycle = TRAPDOOR_CYCLE_MS;
        let open = TRAPDOOR_OPEN_MS;
        // Closed outside the window
        assert_eq!(trapdoor_open_fraction(open + 10.0, cycle, open), 0.0);
        assert_eq!(trapdoor_open_fraction(cycle - 1.0, cycle, open), 0.0);
        // Fully open in the middle of the window
        assert_eq!(trapdoor_open_fraction(open * 0.5, cycle, open), 1.0);
        // Easing at the edges
        let easing = trapdoor_open_fraction(open * TRAPDOOR_SMOOTHING * 0.5, cycle, open);
        assert!(easing > 0.0 && easing < 1.0);
        // Periodic
        let a = trapdoor_open_fraction(100.0, cycle, open);
        let b = trapdoor_open_fraction(100.0 + cycle * 3.0, cycle, open);
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn test_block_pose_is_function_of_clock() {
        let mut block = Obstacle::block(
            BlockKind::Slider,
            Vec2::new(100.0, 500.0),
            Vec2::new(60.0, 8.0),
            SlideMotion::Oscillate {
                amplitude: 50.0,
                period_ms: 4000.0,
                phase: 0.0,
            },
        );
        block.advance(1000.0);
        let (min_a, _) = block.block_rect().unwrap();
        // Jump around in time and come back: no drift
        block.advance(7777.0);
        block.advance(1000.0);
        let (min_b, _) = block.block_rect().unwrap();
        assert_eq!(min_a, min_b);
        // Quarter period: at full amplitude
        assert!((min_a.x - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_block_velocity_matches_motion() {
        let mut block = Obstacle::block(
            BlockKind::Slider,
            Vec2::new(100.0, 500.0),
            Vec2::new(60.0, 8.0),
            SlideMotion::Oscillate {
                amplitude: 50.0,
                period_ms: 4000.0,
                phase: 0.0,
            },
        );
        block.advance(FRAME_MS);
        let Obstacle::Block { velocity, .. } = block else {
            panic!("not a block");
        };
        // Moving right near t = 0
        assert!(velocity > 0.0);
    }

    #[test]
    fn test_spinner_pegs_orbit_ring() {
        let mut spinner = Obstacle::Spinner {
            center: Vec2::new(200.0, 800.0),
            ring_radius: 45.0,
            peg_radius: 5.0,
            peg_count: 4,
            phase: 0.0,
            angular_speed: 0.001,
            angle: 0.0,
        };
        spinner.advance(500.0);
        let pegs = spinner.spinner_pegs();
        assert_eq!(pegs.len(), 4);
        for (pos, vel) in &pegs {
            let r = *pos - Vec2::new(200.0, 800.0);
            assert!((r.length() - 45.0).abs() < 1e-3);
            // Velocity is tangential
            assert!(r.dot(*vel).abs() < 1e-2);
            assert!(vel.length() > 0.0);
        }
    }

    #[test]
    fn test_poses_stay_bounded_for_huge_clocks() {
        let mut spinner = Obstacle::Spinner {
            center: Vec2::new(200.0, 800.0),
            ring_radius: 45.0,
            peg_radius: 5.0,
            peg_count: 6,
            phase: 1.0,
            angular_speed: SPINNER_MAX_SPEED / 1000.0,
            angle: 0.0,
        };
        let mut slider = Obstacle::block(
            BlockKind::Slider,
            Vec2::new(100.0, 500.0),
            Vec2::new(60.0, 8.0),
            SlideMotion::Oscillate {
                amplitude: 50.0,
                period_ms: 3000.0,
                phase: 0.3,
            },
        );
        for clock in [1.0e9, 1.0e12, 3.0e38, f32::MAX] {
            spinner.advance(clock);
            slider.advance(clock);
            let Obstacle::Spinner { angle, .. } = spinner else {
                panic!("not a spinner");
            };
            assert!((-std::f32::consts::PI..std::f32::consts::PI).contains(&angle));
            let (min, _) = slider.block_rect().unwrap();
            assert!(min.x.is_finite());
            assert!((min.x - 100.0).abs() <= 50.0 + 1e-3);
        }

        // Non-finite clocks leave the pose alone
        let before = slider.clone();
        slider.advance(f32::INFINITY);
        slider.advance(f32::NAN);
        assert_eq!(slider, before);
    }

    #[test]
    fn test_swept_footprint_covers_motion() {
        let block = Obstacle::block(
            BlockKind::Trapdoor,
            Vec2::new(150.0, 900.0),
            Vec2::new(70.0, 8.0),
            SlideMotion::Trapdoor {
                travel: 70.0,
                cycle_ms: TRAPDOOR_CYCLE_MS,
                open_ms: TRAPDOOR_OPEN_MS,
                phase_ms: 0.0,
            },
        );
        let Some(Footprint::Rect { min, max }) = block.footprint() else {
            panic!("block footprint must be a rect");
        };
        assert_eq!(min.x, 150.0);
        assert_eq!(max.x, 290.0);
    }

    #[test]
    fn test_vertical_reach_early_out() {
        let peg = Obstacle::peg(Vec2::new(100.0, 500.0), 6.0, false);
        assert!(peg.within_vertical_reach(510.0, 5.0));
        assert!(!peg.within_vertical_reach(520.0, 5.0));
    }
}
