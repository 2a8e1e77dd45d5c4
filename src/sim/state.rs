//! Race state and core simulation types
//!
//! `Race` is the single simulation context: it owns the course, the bodies
//! (indexed by their stable id), particles, the broad-phase grid and the
//! RNG. All mutation goes through its commands (`start_race`, `tick`,
//! `abort`); everything else is a read-only view.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::course::Course;
use super::grid::SpatialGrid;
use super::obstacle::Obstacle;
use super::particles::ParticleSystem;
use crate::consts::*;
use crate::error::RaceError;
use crate::feedback::{CueThrottle, FeedbackSink, NullFeedback};
use crate::settings::{Placement, RaceSettings};
use crate::BALL_COLORS;

/// When the race stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceMode {
    /// Stop at the first finisher
    #[default]
    First,
    /// Run until every body has finished
    Ranked,
}

impl RaceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceMode::First => "first",
            RaceMode::Ranked => "ranked",
        }
    }
}

/// Current phase of the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePhase {
    /// No bodies active
    #[default]
    Idle,
    /// Bodies spinning in the mixer drum
    Mixing,
    /// Gravity-driven descent through the course
    Racing,
    /// Stopping condition met
    Finished,
}

/// A simulated ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Stable index into the race's body list
    pub id: usize,
    pub label: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: u32,
    pub finished: bool,
    /// 1-based rank, -1 until finished
    pub finish_order: i32,
    /// Y at the last anti-stall checkpoint
    #[serde(skip)]
    pub checkpoint_y: f32,
    /// Ticks since the last anti-stall checkpoint
    #[serde(skip)]
    pub stall_ticks: u32,
}

impl Body {
    pub fn new(id: usize, label: impl Into<String>, radius: f32, color: u32) -> Self {
        Self {
            id,
            label: label.into(),
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius,
            color,
            finished: false,
            finish_order: -1,
            checkpoint_y: 0.0,
            stall_ticks: 0,
        }
    }

    /// Rank if finished
    pub fn rank(&self) -> Option<u32> {
        u32::try_from(self.finish_order).ok().filter(|&r| r > 0)
    }

    /// Start a fresh anti-stall window at the current position
    pub fn reset_checkpoint(&mut self) {
        self.checkpoint_y = self.pos.y;
        self.stall_ticks = 0;
    }
}

/// Something notable that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceEvent {
    /// Mixer opened, bodies released into the course
    Released,
    /// Anti-stall kicked a body loose
    Rescued { id: usize },
    /// A body fell into a black hole and came out of its white hole
    Teleported { id: usize, from: Vec2, to: Vec2 },
    /// A body crossed the finish line
    Finished { id: usize, rank: u32 },
    /// Stopping condition met
    RaceComplete,
    /// Race aborted and cleared
    Aborted,
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    /// Bodies that touched a wall or obstacle plus colliding body pairs
    pub collisions: u32,
    /// Bodies that finished this tick, in rank order
    pub newly_finished: Vec<Body>,
    pub events: Vec<RaceEvent>,
}

/// Serializable view of the race for renderers and the CLI
#[derive(Debug, Clone, Serialize)]
pub struct RaceSnapshot<'a> {
    pub phase: RacePhase,
    pub mode: RaceMode,
    pub clock_ms: f32,
    pub finish_y: f32,
    pub camera_y: f32,
    pub camera_target_y: f32,
    pub progress: f32,
    pub bodies: &'a [Body],
    pub obstacles: &'a [Obstacle],
}

/// The simulation context
pub struct Race {
    pub(crate) settings: RaceSettings,
    pub(crate) phase: RacePhase,
    pub(crate) course: Course,
    pub(crate) bodies: Vec<Body>,
    /// Body ids in finish order
    pub(crate) finishers: Vec<usize>,
    pub(crate) next_finish_order: i32,
    /// Race clock driving moving obstacles (ms)
    pub(crate) clock_ms: f32,
    pub(crate) mixer_ms: f32,
    pub(crate) mixer_duration_ms: f32,
    pub(crate) tick_count: u64,
    pub(crate) camera: Camera,
    pub(crate) particles: ParticleSystem,
    pub(crate) grid: SpatialGrid,
    pub(crate) rng: Pcg32,
    pub(crate) feedback: Box<dyn FeedbackSink>,
    pub(crate) collision_cues: CueThrottle,
    pub(crate) abort_requested: bool,
}

impl std::fmt::Debug for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Race")
            .field("phase", &self.phase)
            .field("mode", &self.settings.mode)
            .field("bodies", &self.bodies.len())
            .field("finishers", &self.finishers)
            .field("clock_ms", &self.clock_ms)
            .finish_non_exhaustive()
    }
}

impl Race {
    /// Race seeded from the thread RNG
    pub fn new(settings: RaceSettings) -> Self {
        Self::with_rng(settings, Pcg32::from_rng(&mut rand::rng()))
    }

    /// Reproducible race
    pub fn with_seed(settings: RaceSettings, seed: u64) -> Self {
        Self::with_rng(settings, Pcg32::seed_from_u64(seed))
    }

    fn with_rng(settings: RaceSettings, rng: Pcg32) -> Self {
        Self {
            particles: ParticleSystem::new(settings.max_particles()),
            mixer_duration_ms: settings.mixer_duration_ms,
            settings,
            phase: RacePhase::Idle,
            course: Course::empty(),
            bodies: Vec::new(),
            finishers: Vec::new(),
            next_finish_order: 1,
            clock_ms: 0.0,
            mixer_ms: 0.0,
            tick_count: 0,
            camera: Camera::default(),
            grid: SpatialGrid::new(GRID_CELL_SIZE),
            rng,
            feedback: Box::new(NullFeedback),
            collision_cues: CueThrottle::new(COLLISION_CUE_INTERVAL_MS),
            abort_requested: false,
        }
    }

    /// Route cues to `sink` instead of dropping them
    pub fn set_feedback(&mut self, sink: Box<dyn FeedbackSink>) {
        self.feedback = sink;
    }

    /// Change the stopping rule for the next race
    pub fn set_mode(&mut self, mode: RaceMode) {
        self.settings.mode = mode;
    }

    /// Regenerate the course, create the bodies and enter `Mixing`
    ///
    /// Refuses (leaving all state untouched) with fewer than two names.
    pub fn start_race<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), RaceError> {
        if names.len() < 2 {
            log::warn!("Refusing to start a race with {} participant(s)", names.len());
            return Err(RaceError::NotEnoughParticipants { count: names.len() });
        }

        let count = names.len();
        self.course = Course::generate(count, &mut self.rng);
        let radius = self.course.ball_radius;
        self.bodies = names
            .iter()
            .enumerate()
            .map(|(i, name)| Body::new(i, name.as_ref(), radius, BALL_COLORS[i % BALL_COLORS.len()]))
            .collect();

        self.mixer_duration_ms = match self.settings.placement {
            Placement::Mixer => {
                self.place_in_mixer();
                self.settings.mixer_duration_ms
            }
            Placement::Staggered => {
                self.place_staggered();
                0.0
            }
        };

        self.phase = RacePhase::Mixing;
        self.finishers.clear();
        self.next_finish_order = 1;
        self.clock_ms = 0.0;
        self.mixer_ms = 0.0;
        self.tick_count = 0;
        self.camera = Camera::default();
        self.particles = ParticleSystem::new(self.settings.max_particles());
        self.collision_cues.reset();
        self.abort_requested = false;

        log::info!(
            "Race started: {} participants, mode {}, radius {:.1}, course {} obstacles over {:.0}px",
            count,
            self.settings.mode.as_str(),
            radius,
            self.course.obstacles.len(),
            self.course.height
        );
        Ok(())
    }

    /// Request an abort; honored at the start of the next tick
    pub fn abort(&mut self) {
        if self.phase != RacePhase::Idle {
            self.abort_requested = true;
        }
    }

    /// Random positions inside the drum, clear of its rim
    fn place_in_mixer(&mut self) {
        let center = Vec2::new(self.course.width * 0.5, MIXER_CENTER_Y);
        for body in &mut self.bodies {
            let reach = (MIXER_RADIUS - body.radius).max(0.0);
            let angle = self.rng.random::<f32>() * TAU;
            let dist = self.rng.random::<f32>().sqrt() * reach;
            body.pos = center + Vec2::new(angle.cos(), angle.sin()) * dist;
            body.vel = Vec2::ZERO;
        }
    }

    /// Shuffled, jittered grid across the top of the course
    fn place_staggered(&mut self) {
        let count = self.bodies.len();
        let radius = self.course.ball_radius;
        let usable = self.course.width - 2.0 * STAGGER_MARGIN;
        let columns = ((usable / (radius * 3.0)).floor() as usize).clamp(1, count.max(1));
        let spacing = if columns > 1 {
            (usable - 2.0 * radius) / (columns - 1) as f32
        } else {
            0.0
        };

        let mut slots: Vec<usize> = (0..count).collect();
        slots.shuffle(&mut self.rng);

        for (body, slot) in self.bodies.iter_mut().zip(slots) {
            let col = slot % columns;
            let row = slot / columns;
            let jitter = Vec2::new(
                (self.rng.random::<f32>() - 0.5) * radius * 0.5,
                (self.rng.random::<f32>() - 0.5) * radius * 0.5,
            );
            body.pos = Vec2::new(
                STAGGER_MARGIN + radius + col as f32 * spacing,
                STAGGER_TOP + row as f32 * radius * 3.0,
            ) + jitter;
            body.vel = Vec2::ZERO;
        }
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn mode(&self) -> RaceMode {
        self.settings.mode
    }

    pub fn settings(&self) -> &RaceSettings {
        &self.settings
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.course.obstacles
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Camera-follow target: leader Y minus the lead offset, clamped to the course
    pub fn camera_target_y(&self) -> f32 {
        self.camera.target_y
    }

    /// Leader's progress along the playable span (0-1)
    pub fn progress(&self) -> f32 {
        self.camera.progress
    }

    pub fn clock_ms(&self) -> f32 {
        self.clock_ms
    }

    pub fn mixer_elapsed_ms(&self) -> f32 {
        self.mixer_ms
    }

    /// Finished bodies in rank order
    pub fn finishers(&self) -> Vec<&Body> {
        self.finishers.iter().map(|&id| &self.bodies[id]).collect()
    }

    /// Leaderboard: finished bodies by rank, then the rest by distance covered
    pub fn standings(&self) -> Vec<&Body> {
        let mut racing: Vec<&Body> = self.bodies.iter().filter(|b| !b.finished).collect();
        racing.sort_by(|a, b| b.pos.y.total_cmp(&a.pos.y).then(a.id.cmp(&b.id)));
        let mut standings = self.finishers();
        standings.extend(racing);
        standings
    }

    pub fn snapshot(&self) -> RaceSnapshot<'_> {
        RaceSnapshot {
            phase: self.phase,
            mode: self.settings.mode,
            clock_ms: self.clock_ms,
            finish_y: self.course.finish_y,
            camera_y: self.camera.y,
            camera_target_y: self.camera.target_y,
            progress: self.camera.progress,
            bodies: &self.bodies,
            obstacles: &self.course.obstacles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(placement: Placement) -> RaceSettings {
        RaceSettings {
            placement,
            ..RaceSettings::default()
        }
    }

    #[test]
    fn test_start_race_refuses_single_participant() {
        let mut race = Race::with_seed(RaceSettings::default(), 1);
        let err = race.start_race(&["solo"]).unwrap_err();
        assert!(matches!(err, RaceError::NotEnoughParticipants { count: 1 }));
        assert_eq!(race.phase(), RacePhase::Idle);
        assert!(race.bodies().is_empty());
        assert!(race.obstacles().is_empty());

        let empty: [&str; 0] = [];
        assert!(race.start_race(&empty).is_err());
    }

    #[test]
    fn test_start_race_creates_bodies() {
        let mut race = Race::with_seed(RaceSettings::default(), 2);
        race.start_race(&["A", "B", "C"]).unwrap();
        assert_eq!(race.phase(), RacePhase::Mixing);
        assert_eq!(race.bodies().len(), 3);
        let radius = crate::ball_radius(3);
        for (i, body) in race.bodies().iter().enumerate() {
            assert_eq!(body.id, i);
            assert_eq!(body.radius, radius);
            assert_eq!(body.finish_order, -1);
            assert!(!body.finished);
            assert_eq!(body.color, BALL_COLORS[i]);
        }
        assert_eq!(race.bodies()[1].label, "B");
    }

    #[test]
    fn test_mixer_placement_inside_drum() {
        let mut race = Race::with_seed(settings(Placement::Mixer), 3);
        let names: Vec<String> = (0..40).map(|i| format!("P{i}")).collect();
        race.start_race(&names).unwrap();
        let center = Vec2::new(COURSE_WIDTH * 0.5, MIXER_CENTER_Y);
        for body in race.bodies() {
            assert!(body.pos.distance(center) + body.radius <= MIXER_RADIUS + 1e-3);
        }
    }

    #[test]
    fn test_staggered_placement_above_course() {
        let mut race = Race::with_seed(settings(Placement::Staggered), 4);
        let names: Vec<String> = (0..100).map(|i| format!("P{i}")).collect();
        race.start_race(&names).unwrap();
        for body in race.bodies() {
            assert!(body.pos.y < FIRST_ROW_Y);
            assert!(body.pos.x - body.radius >= WALL_THICKNESS);
            assert!(body.pos.x + body.radius <= COURSE_WIDTH - WALL_THICKNESS);
        }
    }

    #[test]
    fn test_body_rank() {
        let mut body = Body::new(0, "A", 10.0, 0);
        assert_eq!(body.rank(), None);
        body.finish_order = 3;
        assert_eq!(body.rank(), Some(3));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut race = Race::with_seed(RaceSettings::default(), 5);
        race.start_race(&["A", "B"]).unwrap();
        let json = serde_json::to_string(&race.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"mixing\""));
        assert!(json.contains("\"label\":\"A\""));
    }
}
