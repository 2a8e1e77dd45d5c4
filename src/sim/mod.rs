//! Simulation module
//!
//! All race logic lives here. Given the same seed and the same sequence of
//! tick durations, a race replays identically:
//! - Seeded RNG only (`Pcg32`)
//! - Stable iteration order (by body id)
//! - No rendering or platform dependencies

pub mod camera;
pub mod collision;
pub mod course;
pub mod geometry;
pub mod grid;
pub mod obstacle;
pub mod particles;
pub mod state;
pub mod tick;

pub use camera::Camera;
pub use collision::{CollisionResult, Contact};
pub use course::{ClearanceViolation, Course, PlacedSegment, SegmentType, Zone};
pub use geometry::Footprint;
pub use grid::SpatialGrid;
pub use obstacle::{BlockKind, Obstacle, SegmentKind, SlideMotion};
pub use particles::{Particle, ParticleSystem};
pub use state::{Body, Race, RaceEvent, RaceMode, RacePhase, RaceSnapshot, TickResult};
pub use tick::clamp_velocity;
