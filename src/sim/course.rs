//! Procedural course generation
//!
//! The course is built top to bottom out of horizontal "segments" (a peg
//! row, a funnel, a spinner, ...). Each placement function writes its
//! obstacles below the cursor and returns the height it used; the cursor
//! then advances by that height plus zone padding.
//!
//! Every opening a placement leaves is derived from the minimum clearance
//! for the race's ball radius. Pieces anchored to a wall overlap it, so
//! they form sealed joints rather than narrow slots.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometry::Footprint;
use super::obstacle::{BlockKind, Obstacle, SegmentKind, SlideMotion};
use crate::consts::*;
use crate::{ball_radius, course_height, min_clearance};

/// Vertical band of the course with its own obstacle pool and spacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Sparse intro
    Top,
    /// Dense chaos
    Mid,
    /// Bottleneck finish
    Bottom,
}

/// Kind of segment the generator can place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    PegRow,
    Bumper,
    Funnel,
    DoubleFunnel,
    Zigzag,
    Crossover,
    Spinner,
    Slider,
    Trapdoor,
    GravityWell,
    PinballLane,
}

impl Zone {
    /// Zone for a progress fraction along the playable span
    pub fn at_progress(progress: f32) -> Self {
        if progress < ZONE_TOP_END {
            Zone::Top
        } else if progress < ZONE_MID_END {
            Zone::Mid
        } else {
            Zone::Bottom
        }
    }

    /// Weighted segment pool
    pub fn pool(self) -> &'static [(SegmentType, u32)] {
        use SegmentType::*;
        match self {
            Zone::Top => &[(PegRow, 3), (Bumper, 1), (Zigzag, 1), (PinballLane, 1)],
            Zone::Mid => &[
                (PegRow, 2),
                (Zigzag, 2),
                (Spinner, 1),
                (Funnel, 1),
                (Bumper, 1),
                (Slider, 1),
                (GravityWell, 1),
                (Crossover, 1),
            ],
            Zone::Bottom => &[
                (Funnel, 2),
                (DoubleFunnel, 1),
                (PegRow, 2),
                (Zigzag, 1),
                (Trapdoor, 1),
                (PinballLane, 1),
            ],
        }
    }

    /// Padding (base, variance) tuned for `REFERENCE_CLEARANCE`
    fn spacing(self) -> (f32, f32) {
        match self {
            Zone::Top => (90.0, 40.0),
            Zone::Mid => (65.0, 25.0),
            Zone::Bottom => (80.0, 30.0),
        }
    }

    /// Gap left below a segment, scaled by the clearance and never below it
    pub fn padding<R: Rng>(self, rng: &mut R, clearance: f32) -> f32 {
        let (base, variance) = self.spacing();
        let raw = base + rng.random::<f32>() * variance;
        (raw * clearance / REFERENCE_CLEARANCE).max(clearance)
    }
}

/// Wall a segment leans against or leaves open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// +1 pointing from the left wall inward, -1 from the right wall
    fn inward(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

/// Record of one placed segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedSegment {
    pub kind: SegmentType,
    pub zone: Zone,
    pub top: f32,
    pub height: f32,
}

/// An opening narrower than the minimum clearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClearanceViolation {
    /// Between obstacles `a` and `b` (indices into `Course::obstacles`)
    Pair { a: usize, b: usize, gap: f32 },
    /// Between an obstacle and the left or right wall
    Wall { obstacle: usize, gap: f32 },
}

impl ClearanceViolation {
    /// Index of the obstacle to drop to resolve the violation
    fn offender(&self) -> usize {
        match *self {
            ClearanceViolation::Pair { b, .. } => b,
            ClearanceViolation::Wall { obstacle, .. } => obstacle,
        }
    }
}

/// A generated course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub width: f32,
    pub height: f32,
    /// Y of the finish line
    pub finish_y: f32,
    /// Y where the first segment starts
    pub playable_start: f32,
    /// Obstacles never reach below this
    pub playable_end: f32,
    pub ball_radius: f32,
    pub min_clearance: f32,
    pub obstacles: Vec<Obstacle>,
    pub segments: Vec<PlacedSegment>,
    /// Obstacles the final audit had to remove
    pub dropped_for_clearance: usize,
}

impl Course {
    /// Generate a course sized for `participants` balls
    pub fn generate<R: Rng>(participants: usize, rng: &mut R) -> Self {
        let radius = ball_radius(participants);
        let height = course_height(participants);
        let finish_y = height - FINISH_LINE_HEIGHT;
        let mut course = Self {
            height,
            finish_y,
            playable_end: finish_y - FINISH_RUNOUT,
            ball_radius: radius,
            min_clearance: min_clearance(radius),
            ..Self::empty()
        };
        course.lay_out(rng);
        course.enforce_clearance();
        log::debug!(
            "Generated course: {} segments, {} obstacles, clearance {:.1}px, height {:.0}",
            course.segments.len(),
            course.obstacles.len(),
            course.min_clearance,
            course.height
        );
        course
    }

    /// Course with no obstacles (before the first race)
    pub fn empty() -> Self {
        let radius = ball_radius(0);
        let finish_y = BASE_COURSE_HEIGHT - FINISH_LINE_HEIGHT;
        Self {
            width: COURSE_WIDTH,
            height: BASE_COURSE_HEIGHT,
            finish_y,
            playable_start: FIRST_ROW_Y,
            playable_end: finish_y - FINISH_RUNOUT,
            ball_radius: radius,
            min_clearance: min_clearance(radius),
            obstacles: Vec::new(),
            segments: Vec::new(),
            dropped_for_clearance: 0,
        }
    }

    /// Inner face of the left wall
    #[inline]
    pub fn left_wall(&self) -> f32 {
        WALL_THICKNESS
    }

    /// Inner face of the right wall
    #[inline]
    pub fn right_wall(&self) -> f32 {
        self.width - WALL_THICKNESS
    }

    /// Zone containing `y`
    pub fn zone_at(&self, y: f32) -> Zone {
        let span = (self.playable_end - self.playable_start).max(1.0);
        Zone::at_progress((y - self.playable_start) / span)
    }

    fn lay_out<R: Rng>(&mut self, rng: &mut R) {
        let layout = Layout {
            left: self.left_wall(),
            right: self.right_wall(),
            radius: self.ball_radius,
            clearance: self.min_clearance,
        };
        let mut cursor = self.playable_start;
        let mut previous = None;
        let mut side = if rng.random_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        };

        while cursor < self.playable_end {
            let zone = self.zone_at(cursor);
            let kind = pick_segment(zone, previous, rng);
            let start = self.obstacles.len();
            let used = layout.place(kind, cursor, side, rng, &mut self.obstacles);

            // Discard (never clip) anything crossing the playable end
            let placed = self.obstacles.split_off(start);
            let end = self.playable_end;
            self.obstacles
                .extend(placed.into_iter().filter(|o| o.bottom() <= end));

            self.segments.push(PlacedSegment {
                kind,
                zone,
                top: cursor,
                height: used,
            });
            previous = Some(kind);
            side = side.flip();
            cursor += used + zone.padding(rng, self.min_clearance);
        }
    }

    /// Every opening narrower than `min_clearance`
    ///
    /// Openings at or below `SEAL_TOLERANCE` are joints, not gaps.
    pub fn clearance_violations(&self, min_clearance: f32) -> Vec<ClearanceViolation> {
        let limit = min_clearance - 1e-3;
        let narrow = |gap: f32| gap > SEAL_TOLERANCE && gap < limit;
        let footprints: Vec<(usize, Footprint)> = self
            .obstacles
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.footprint().map(|f| (i, f)))
            .collect();

        let mut violations = Vec::new();
        for (n, &(i, fi)) in footprints.iter().enumerate() {
            let (left_gap, right_gap) = fi.wall_gaps(self.left_wall(), self.right_wall());
            for gap in [left_gap, right_gap] {
                if narrow(gap) {
                    violations.push(ClearanceViolation::Wall { obstacle: i, gap });
                }
            }

            let (top_i, bottom_i) = fi.y_range();
            for &(j, fj) in &footprints[n + 1..] {
                let (top_j, bottom_j) = fj.y_range();
                // Vertically separated by at least the clearance
                if top_j - bottom_i >= min_clearance || top_i - bottom_j >= min_clearance {
                    continue;
                }
                let gap = fi.gap_to(&fj);
                if narrow(gap) {
                    violations.push(ClearanceViolation::Pair { a: i, b: j, gap });
                }
            }
        }
        violations
    }

    /// Drop obstacles until no opening is narrower than the clearance
    fn enforce_clearance(&mut self) {
        loop {
            let violations = self.clearance_violations(self.min_clearance);
            let Some(first) = violations.first() else {
                return;
            };
            let index = first.offender();
            log::warn!(
                "Dropping {} at y={:.0}: {:?}",
                self.obstacles[index].kind_name(),
                self.obstacles[index].position().y,
                first
            );
            self.obstacles.remove(index);
            self.dropped_for_clearance += 1;
        }
    }
}

/// Weighted pick from the zone pool, never repeating `previous`
fn pick_segment<R: Rng>(zone: Zone, previous: Option<SegmentType>, rng: &mut R) -> SegmentType {
    let candidates: Vec<(SegmentType, u32)> = zone
        .pool()
        .iter()
        .copied()
        .filter(|&(kind, _)| Some(kind) != previous)
        .collect();
    let total: u32 = candidates.iter().map(|&(_, w)| w).sum();
    if total == 0 {
        return SegmentType::PegRow;
    }
    let mut roll = rng.random_range(0..total);
    for &(kind, weight) in &candidates {
        if roll < weight {
            return kind;
        }
        roll -= weight;
    }
    candidates[candidates.len() - 1].0
}

/// Uniform sample in `[lo, hi]` that tolerates an empty range
#[inline]
fn uniform<R: Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        lo
    } else {
        lo + (hi - lo) * rng.random::<f32>()
    }
}

/// Wall positions and clearance shared by the placement functions
struct Layout {
    left: f32,
    right: f32,
    radius: f32,
    clearance: f32,
}

impl Layout {
    #[inline]
    fn span(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    fn mid(&self) -> f32 {
        (self.left + self.right) * 0.5
    }

    fn wall(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Funnel mouth width: preferred size, never below the clearance
    fn mouth(&self) -> f32 {
        (self.radius * FUNNEL_MOUTH_RADII).max(self.clearance)
    }

    /// Place one segment at `y`, returning the height it used
    fn place<R: Rng>(
        &self,
        kind: SegmentType,
        y: f32,
        side: Side,
        rng: &mut R,
        out: &mut Vec<Obstacle>,
    ) -> f32 {
        match kind {
            SegmentType::PegRow => self.peg_row(y, rng, out),
            SegmentType::Bumper => self.bumper(y, side, rng, out),
            SegmentType::Funnel => self.funnel(y, side, rng, out),
            SegmentType::DoubleFunnel => self.double_funnel(y, out),
            SegmentType::Zigzag => self.shelves(
                y,
                side,
                ZIGZAG_SHELF_SPAN,
                ZIGZAG_SHELF_ANGLE,
                SegmentKind::ZigzagShelf,
                out,
            ),
            SegmentType::Crossover => self.shelves(
                y,
                side,
                CROSSOVER_SHELF_SPAN,
                CROSSOVER_RAMP_ANGLE,
                SegmentKind::CrossoverRamp,
                out,
            ),
            SegmentType::Spinner => self.spinner(y, rng, out),
            SegmentType::Slider => self.slider(y, rng, out),
            SegmentType::Trapdoor => self.trapdoor(y, side, rng, out),
            SegmentType::GravityWell => self.gravity_well(y, side, out),
            SegmentType::PinballLane => self.pinball_lane(y, out),
        }
    }

    /// Row of pegs with equal gaps (walls included)
    fn peg_row<R: Rng>(&self, y: f32, rng: &mut R, out: &mut Vec<Obstacle>) -> f32 {
        let r = PEG_RADIUS;
        let fit = ((self.span() - self.clearance) / (2.0 * r + self.clearance)).floor();
        let max_pegs = fit.max(0.0) as usize;
        if max_pegs == 0 {
            log::warn!("No room for a peg row at clearance {:.1}", self.clearance);
            return 0.0;
        }
        let wanted = rng.random_range(PEGS_PER_ROW_MIN..=PEGS_PER_ROW_MIN + 2);
        let count = wanted.min(max_pegs).min(PEGS_PER_ROW_MAX);
        if count < wanted {
            log::debug!("Peg row clamped from {wanted} to {count} pegs");
        }

        let gap = (self.span() - count as f32 * 2.0 * r) / (count as f32 + 1.0);
        let slack = (gap - self.clearance).max(0.0);
        let shift = uniform(rng, -slack * 0.5, slack * 0.5);
        let row_y = y + r + uniform(rng, 0.0, PEG_ROW_JITTER);

        for i in 0..count {
            let x = self.left + gap * (i as f32 + 1.0) + r * (2.0 * i as f32 + 1.0) + shift;
            out.push(Obstacle::peg(
                Vec2::new(x, row_y),
                r,
                rng.random_bool(BOUNCY_PEG_CHANCE),
            ));
        }
        2.0 * r + PEG_ROW_JITTER
    }

    /// Free-floating baffle, shifted toward `side`, slightly tilted
    fn bumper<R: Rng>(&self, y: f32, side: Side, rng: &mut R, out: &mut Vec<Obstacle>) -> f32 {
        let rb = BUMPER_THICKNESS * 0.5;
        let max_len = (self.span() - 2.0 * self.clearance - 2.0 * rb).min(self.span() * 0.45);
        if max_len <= 0.0 {
            return 0.0;
        }
        let len = uniform(rng, BUMPER_MIN_WIDTH.min(max_len), max_len);
        let tilt = uniform(rng, -BUMPER_MAX_TILT, BUMPER_MAX_TILT);
        let run = len * tilt.cos();
        let rise = len * tilt.sin();

        // Left end cap may sit anywhere leaving the clearance to both walls
        let lo = self.left + self.clearance + rb;
        let hi = self.right - self.clearance - rb - run;
        let third = (hi - lo) / 3.0;
        let start_x = match side {
            Side::Left => uniform(rng, lo, lo + third),
            Side::Right => uniform(rng, hi - third, hi),
        };

        let top = y + rb + (-rise).max(0.0);
        let a = Vec2::new(start_x, top);
        let b = Vec2::new(start_x + run, top + rise);
        out.push(Obstacle::Bumper { a, b, radius: rb });
        rise.abs() + 2.0 * rb
    }

    /// Two arms converging on a mouth shifted toward `side`
    fn funnel<R: Rng>(&self, y: f32, side: Side, rng: &mut R, out: &mut Vec<Obstacle>) -> f32 {
        let t = SEGMENT_THICKNESS;
        let mouth = self.mouth();
        let inner = mouth * 0.5 + t;

        let mut cx = self.mid() - side.inward() * self.span() * FUNNEL_OFFSET * rng.random::<f32>();
        let reach = |cx: f32| (cx - self.left).min(self.right - cx) - t - self.clearance;
        let mut half_width = (FUNNEL_WIDTH * 0.5 + 20.0).min(reach(cx));
        if half_width <= inner + 1.0 {
            cx = self.mid();
            half_width = (FUNNEL_WIDTH * 0.5 + 20.0).min(reach(cx));
        }
        if half_width <= inner + 1.0 {
            log::warn!("No room for a funnel at clearance {:.1}", self.clearance);
            return 0.0;
        }

        let tip_y = y + FUNNEL_HEIGHT - t;
        out.push(Obstacle::segment(
            SegmentKind::FunnelLeft,
            Vec2::new(cx - half_width, y + t),
            Vec2::new(cx - inner, tip_y),
            t,
        ));
        out.push(Obstacle::segment(
            SegmentKind::FunnelRight,
            Vec2::new(cx + half_width, y + t),
            Vec2::new(cx + inner, tip_y),
            t,
        ));
        FUNNEL_HEIGHT
    }

    /// "W" sealed to both walls with two mouths
    fn double_funnel(&self, y: f32, out: &mut Vec<Obstacle>) -> f32 {
        let t = SEGMENT_THICKNESS;
        let inner = self.mouth() * 0.5 + t;
        let quarter = self.span() * 0.25;
        let tip_y = y + DOUBLE_FUNNEL_HEIGHT - t;
        let top_y = y + t;
        let peak = Vec2::new(self.mid(), top_y);

        let c1 = self.left + quarter;
        let c2 = self.right - quarter;
        // Symmetric, so checking the left mouth covers both
        if c1 - inner <= self.left + t || c1 + inner >= peak.x {
            log::warn!("No room for a double funnel at clearance {:.1}", self.clearance);
            return 0.0;
        }

        out.push(Obstacle::segment(
            SegmentKind::FunnelLeft,
            Vec2::new(self.left + t, top_y),
            Vec2::new(c1 - inner, tip_y),
            t,
        ));
        out.push(Obstacle::segment(
            SegmentKind::FunnelRight,
            peak,
            Vec2::new(c1 + inner, tip_y),
            t,
        ));
        out.push(Obstacle::segment(
            SegmentKind::FunnelLeft,
            peak,
            Vec2::new(c2 - inner, tip_y),
            t,
        ));
        out.push(Obstacle::segment(
            SegmentKind::FunnelRight,
            Vec2::new(self.right - t, top_y),
            Vec2::new(c2 + inner, tip_y),
            t,
        ));
        DOUBLE_FUNNEL_HEIGHT
    }

    /// Two shelves sealed to opposite walls, each sloping away from its wall
    ///
    /// The second shelf starts below the first and is pushed down until the
    /// channel between them is at least the clearance.
    fn shelves(
        &self,
        y: f32,
        side: Side,
        span_fraction: f32,
        angle: f32,
        kind: SegmentKind,
        out: &mut Vec<Obstacle>,
    ) -> f32 {
        let t = SEGMENT_THICKNESS;
        let run = self.span() * span_fraction;
        let drop = run * angle.tan();

        let shelf = |anchor: Side, top: f32| {
            let x = self.wall(anchor) + anchor.inward() * t;
            let a = Vec2::new(x, top + t);
            let b = Vec2::new(x + anchor.inward() * run, top + t + drop);
            (a, b)
        };

        let (a1, b1) = shelf(side, y);
        let upper = Footprint::Capsule {
            a: a1,
            b: b1,
            radius: t,
        };

        let other = side.flip();
        let mut top2 = y + ZIGZAG_SHELF_GAP.min(self.clearance);
        let (a2, b2) = loop {
            let (a2, b2) = shelf(other, top2);
            let lower = Footprint::Capsule {
                a: a2,
                b: b2,
                radius: t,
            };
            // Lower shelf height under the upper shelf's free end
            let along = ((b1.x - a2.x) / (b2.x - a2.x)).clamp(0.0, 1.0);
            let below = a2.y + (b2.y - a2.y) * along > b1.y;
            if below && upper.gap_to(&lower) >= self.clearance {
                break (a2, b2);
            }
            top2 += 2.0;
        };

        out.push(Obstacle::segment(kind, a1, b1, t));
        out.push(Obstacle::segment(kind, a2, b2, t));
        b2.y.max(b1.y) + t - y
    }

    /// Rotating ring of pegs, kept clear of both walls
    fn spinner<R: Rng>(&self, y: f32, rng: &mut R, out: &mut Vec<Obstacle>) -> f32 {
        let pr = SPINNER_PEG_RADIUS;
        let chord_gap = |ring: f32, n: usize| 2.0 * ring * (PI / n as f32).sin() - 2.0 * pr;

        let mut ring = SPINNER_RING_RADIUS;
        let mut count = SPINNER_PEG_COUNT;
        while count > 3 && chord_gap(ring, count) < self.clearance {
            count -= 1;
        }
        if chord_gap(ring, count) < self.clearance {
            ring = (self.clearance + 2.0 * pr) / (2.0 * (PI / count as f32).sin());
        }

        let outer = ring + pr;
        let lo = self.left + self.clearance + outer;
        let hi = self.right - self.clearance - outer;
        if hi < lo {
            log::warn!("No room for a spinner at clearance {:.1}", self.clearance);
            return 0.0;
        }
        let wobble = self.span() * 0.075;
        let cx = (self.mid() + uniform(rng, -wobble, wobble)).clamp(lo, hi);
        let speed = uniform(rng, SPINNER_MIN_SPEED, SPINNER_MAX_SPEED) / 1000.0;
        let direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };

        out.push(Obstacle::Spinner {
            center: Vec2::new(cx, y + outer),
            ring_radius: ring,
            peg_radius: pr,
            peg_count: count,
            phase: uniform(rng, 0.0, TAU),
            angular_speed: speed * direction,
            angle: 0.0,
        });
        2.0 * outer
    }

    /// Centered bar oscillating sideways, never closer than the clearance to a wall
    fn slider<R: Rng>(&self, y: f32, rng: &mut R, out: &mut Vec<Obstacle>) -> f32 {
        let max_width = (self.span() - 2.0 * self.clearance).min(SLIDER_MAX_WIDTH);
        if max_width <= 0.0 {
            return 0.0;
        }
        let width = uniform(rng, SLIDER_MIN_WIDTH.min(max_width), max_width);
        let max_amplitude = (self.span() * 0.5 - width * 0.5 - self.clearance).max(0.0);
        let amplitude = uniform(rng, 0.5, 1.0) * self.span() * 0.25;

        out.push(Obstacle::block(
            BlockKind::Slider,
            Vec2::new(self.mid() - width * 0.5, y),
            Vec2::new(width, SLIDER_HEIGHT),
            SlideMotion::Oscillate {
                amplitude: amplitude.min(max_amplitude),
                period_ms: uniform(rng, SLIDER_MIN_PERIOD_MS, SLIDER_MAX_PERIOD_MS),
                phase: uniform(rng, 0.0, TAU),
            },
        ));
        SLIDER_HEIGHT
    }

    /// Funnel sealed to both walls whose mouth is shut by a sliding door
    fn trapdoor<R: Rng>(&self, y: f32, side: Side, rng: &mut R, out: &mut Vec<Obstacle>) -> f32 {
        let t = SEGMENT_THICKNESS;
        let mouth = self.mouth();
        let inner = mouth * 0.5 + t;
        let door_width = mouth + 4.0 * t;

        // Door slides toward `side`; the mouth sits off-center the other way
        let travel = side.inward() * -door_width;
        let cx = self.mid() + side.inward() * uniform(rng, 0.0, self.span() * 0.1);
        let swept_lo = cx - door_width * 0.5 + travel.min(0.0);
        let swept_hi = cx + door_width * 0.5 + travel.max(0.0);
        if swept_lo - self.left < self.clearance || self.right - swept_hi < self.clearance {
            log::warn!("No room for a trapdoor at clearance {:.1}", self.clearance);
            return 0.0;
        }

        let tip_y = y + FUNNEL_HEIGHT - t;
        out.push(Obstacle::segment(
            SegmentKind::FunnelLeft,
            Vec2::new(self.left + t, y + t),
            Vec2::new(cx - inner, tip_y),
            t,
        ));
        out.push(Obstacle::segment(
            SegmentKind::FunnelRight,
            Vec2::new(self.right - t, y + t),
            Vec2::new(cx + inner, tip_y),
            t,
        ));
        // Door top overlaps the arm tips by a pixel so the joint is sealed
        out.push(Obstacle::block(
            BlockKind::Trapdoor,
            Vec2::new(cx - door_width * 0.5, y + FUNNEL_HEIGHT - 1.0),
            Vec2::new(door_width, TRAPDOOR_HEIGHT),
            SlideMotion::Trapdoor {
                travel,
                cycle_ms: TRAPDOOR_CYCLE_MS,
                open_ms: TRAPDOOR_OPEN_MS,
                phase_ms: uniform(rng, 0.0, TRAPDOOR_CYCLE_MS),
            },
        ));
        FUNNEL_HEIGHT + TRAPDOOR_HEIGHT - 1.0
    }

    /// Black hole high on `side`, its white hole low on the opposite side
    fn gravity_well(&self, y: f32, side: Side, out: &mut Vec<Obstacle>) -> f32 {
        let height = BLACK_HOLE_PULL_RADIUS * GRAVITY_WELL_HEIGHT;
        let inset = self.span() * 0.3;
        let other = side.flip();
        out.push(Obstacle::GravityWell {
            black_hole: Vec2::new(
                self.wall(side) + side.inward() * inset,
                y + BLACK_HOLE_RADIUS,
            ),
            white_hole: Vec2::new(
                self.wall(other) + other.inward() * inset,
                y + height - WHITE_HOLE_RADIUS,
            ),
            pull_radius: BLACK_HOLE_PULL_RADIUS,
            event_horizon: EVENT_HORIZON_RADIUS,
        });
        height
    }

    /// Two staggered rows of pinball bumpers
    fn pinball_lane(&self, y: f32, out: &mut Vec<Obstacle>) -> f32 {
        let r = PINBALL_BUMPER_RADIUS;
        let mut upper = PINBALL_LANE_BUMPER_COUNT.div_ceil(2);
        let gap = |n: usize| (self.span() - n as f32 * 2.0 * r) / (n as f32 + 1.0);
        while upper > 0 && gap(upper) < self.clearance {
            upper -= 1;
        }
        if upper == 0 {
            log::warn!("No room for a pinball lane at clearance {:.1}", self.clearance);
            return 0.0;
        }
        let row_gap = gap(upper);
        let pitch = row_gap + 2.0 * r;
        let dx = pitch * 0.5;
        let needed = self.clearance + 2.0 * r;
        let dy = (needed * needed - dx * dx).max(0.0).sqrt().max(2.0 * r);

        let upper_y = y + r;
        let centers: Vec<f32> = (0..upper)
            .map(|i| self.left + row_gap + r + pitch * i as f32)
            .collect();
        for &x in &centers {
            out.push(Obstacle::PinballBumper {
                pos: Vec2::new(x, upper_y),
                radius: r,
            });
        }
        for pair in centers.windows(2) {
            out.push(Obstacle::PinballBumper {
                pos: Vec2::new((pair[0] + pair[1]) * 0.5, upper_y + dy),
                radius: r,
            });
        }
        if upper > 1 { 2.0 * r + dy } else { 2.0 * r }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn course(participants: usize, seed: u64) -> Course {
        let mut rng = Pcg32::seed_from_u64(seed);
        Course::generate(participants, &mut rng)
    }

    #[test]
    fn test_course_dimensions() {
        let c = course(10, 1);
        assert_eq!(c.width, COURSE_WIDTH);
        assert_eq!(c.height, course_height(10));
        assert_eq!(c.finish_y, c.height - FINISH_LINE_HEIGHT);
        assert!(c.playable_end < c.finish_y);
        assert!(!c.obstacles.is_empty());
    }

    #[test]
    fn test_obstacles_stay_within_playable_span() {
        for seed in 0..20 {
            let c = course(12, seed);
            for obstacle in &c.obstacles {
                assert!(obstacle.bottom() <= c.playable_end);
                if let Some(footprint) = obstacle.footprint() {
                    let (min_x, max_x) = footprint.x_range();
                    assert!(min_x >= c.left_wall() - 1e-3, "{obstacle:?}");
                    assert!(max_x <= c.right_wall() + 1e-3, "{obstacle:?}");
                }
            }
        }
    }

    #[test]
    fn test_generated_openings_respect_clearance() {
        for participants in [2, 5, 10, 30, 60, 100] {
            for seed in 0..15 {
                let c = course(participants, seed);
                assert_eq!(
                    c.dropped_for_clearance, 0,
                    "{participants} participants, seed {seed}"
                );
                assert!(c.clearance_violations(c.min_clearance).is_empty());
            }
        }
    }

    #[test]
    fn test_segment_types_never_repeat() {
        for seed in 0..20 {
            let c = course(8, seed);
            for pair in c.segments.windows(2) {
                assert_ne!(pair[0].kind, pair[1].kind);
            }
        }
    }

    #[test]
    fn test_segments_come_from_their_zone_pool() {
        let c = course(20, 7);
        for segment in &c.segments {
            assert!(
                segment
                    .zone
                    .pool()
                    .iter()
                    .any(|&(kind, _)| kind == segment.kind)
            );
        }
        assert_eq!(c.segments[0].zone, Zone::Top);
    }

    #[test]
    fn test_padding_scales_with_clearance() {
        let mut rng = Pcg32::seed_from_u64(3);
        let small = min_clearance(BALL_MIN_RADIUS);
        for _ in 0..50 {
            let p = Zone::Mid.padding(&mut rng, small);
            assert!(p >= small);
            assert!(p <= 90.0 * small / REFERENCE_CLEARANCE + 1e-3);

            let reference = Zone::Mid.padding(&mut rng, REFERENCE_CLEARANCE);
            assert!((65.0..=90.0 + 1e-3).contains(&reference));
        }
        // Never pads less than the clearance itself
        assert!(Zone::Top.padding(&mut rng, 200.0) >= 200.0);
    }

    #[test]
    fn test_audit_flags_narrow_gap() {
        let mut c = course(2, 4);
        c.obstacles = vec![
            Obstacle::peg(Vec2::new(100.0, 500.0), 6.0, false),
            Obstacle::peg(Vec2::new(130.0, 500.0), 6.0, false),
        ];
        let violations = c.clearance_violations(50.0);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            ClearanceViolation::Pair { a: 0, b: 1, .. }
        ));
    }

    #[test]
    fn test_audit_treats_touching_pieces_as_sealed() {
        let mut c = course(2, 4);
        // Shelf anchored to the left wall and a peg resting on its free end
        c.obstacles = vec![
            Obstacle::segment(
                SegmentKind::ZigzagShelf,
                Vec2::new(8.0, 500.0),
                Vec2::new(200.0, 550.0),
                4.0,
            ),
            Obstacle::peg(Vec2::new(200.0, 560.0), 6.0, false),
        ];
        assert!(c.clearance_violations(50.0).is_empty());
    }

    #[test]
    fn test_audit_flags_narrow_wall_gap() {
        let mut c = course(2, 4);
        c.obstacles = vec![Obstacle::peg(Vec2::new(30.0, 500.0), 6.0, false)];
        let violations = c.clearance_violations(50.0);
        assert!(matches!(
            violations[..],
            [ClearanceViolation::Wall { obstacle: 0, .. }]
        ));
    }

    #[test]
    fn test_small_balls_compress_course() {
        let big = course(2, 9);
        let small = course(100, 9);
        assert!(small.min_clearance < big.min_clearance);
        let big_density = big.segments.len() as f32 / big.height;
        let small_density = small.segments.len() as f32 / small.height;
        assert!(small_density > big_density);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_every_opening_is_traversable(seed in any::<u64>(), participants in 2usize..=100) {
            let c = course(participants, seed);
            prop_assert_eq!(c.dropped_for_clearance, 0);
            prop_assert!(c.clearance_violations(c.min_clearance).is_empty());
        }

        #[test]
        fn prop_no_obstacle_crosses_playable_end(seed in any::<u64>(), participants in 2usize..=100) {
            let c = course(participants, seed);
            for obstacle in &c.obstacles {
                prop_assert!(obstacle.bottom() <= c.playable_end);
            }
        }
    }
}
