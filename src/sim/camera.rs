//! Leader tracking for renderers
//!
//! The engine does not draw, but it owns the numbers a renderer needs to
//! follow the race: the leader, a clamped camera target, a smoothed camera
//! position and the leader's progress fraction.

use serde::{Deserialize, Serialize};

use super::state::Body;
use crate::consts::*;

/// Camera state, updated once per racing tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Smoothed camera Y
    pub y: f32,
    /// Raw follow target
    pub target_y: f32,
    pub leader_y: f32,
    /// Leader's progress along the playable span (0-1)
    pub progress: f32,
}

impl Camera {
    /// Retarget on the current leader and ease toward it
    pub fn follow(&mut self, bodies: &[Body], finish_y: f32) {
        let Some(leader) = leader(bodies) else {
            return;
        };
        self.leader_y = leader.pos.y;
        self.target_y = camera_target(self.leader_y, finish_y);
        self.y += (self.target_y - self.y) * CAMERA_LERP_SPEED;
        self.progress = progress_fraction(self.leader_y, finish_y);
    }
}

/// Lowest (largest y) body still racing, or overall if all have finished
pub fn leader(bodies: &[Body]) -> Option<&Body> {
    let lowest = |a: &&Body, b: &&Body| a.pos.y.total_cmp(&b.pos.y);
    bodies
        .iter()
        .filter(|b| !b.finished)
        .max_by(lowest)
        .or_else(|| bodies.iter().max_by(lowest))
}

/// Leader Y minus the lead offset, clamped to the course
pub fn camera_target(leader_y: f32, finish_y: f32) -> f32 {
    let max_y = (finish_y - VIEWPORT_HEIGHT + 100.0).max(0.0);
    (leader_y - CAMERA_LEAD_OFFSET).clamp(0.0, max_y)
}

/// How far along the playable span `leader_y` is (0-1)
pub fn progress_fraction(leader_y: f32, finish_y: f32) -> f32 {
    let span = finish_y - FIRST_ROW_Y;
    if span <= 0.0 {
        return 0.0;
    }
    ((leader_y - FIRST_ROW_Y) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn body(id: usize, y: f32, finished: bool) -> Body {
        let mut b = Body::new(id, format!("B{id}"), 8.0, 0);
        b.pos = Vec2::new(200.0, y);
        b.finished = finished;
        b
    }

    #[test]
    fn test_leader_prefers_racing_bodies() {
        let bodies = vec![body(0, 900.0, true), body(1, 500.0, false), body(2, 700.0, false)];
        assert_eq!(leader(&bodies).map(|b| b.id), Some(2));

        let done = vec![body(0, 900.0, true), body(1, 950.0, true)];
        assert_eq!(leader(&done).map(|b| b.id), Some(1));
        assert!(leader(&[]).is_none());
    }

    #[test]
    fn test_camera_target_clamped() {
        assert_eq!(camera_target(50.0, 3960.0), 0.0);
        assert_eq!(camera_target(1000.0, 3960.0), 850.0);
        assert_eq!(camera_target(3960.0, 3960.0), 3960.0 - VIEWPORT_HEIGHT + 100.0);
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(progress_fraction(0.0, 3960.0), 0.0);
        assert_eq!(progress_fraction(5000.0, 3960.0), 1.0);
        let mid = progress_fraction(FIRST_ROW_Y + (3960.0 - FIRST_ROW_Y) * 0.5, 3960.0);
        assert!((mid - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_follow_eases_toward_target() {
        let mut camera = Camera::default();
        let bodies = vec![body(0, 1000.0, false)];
        camera.follow(&bodies, 3960.0);
        assert_eq!(camera.target_y, 850.0);
        assert!((camera.y - 850.0 * CAMERA_LERP_SPEED).abs() < 1e-3);
        for _ in 0..500 {
            camera.follow(&bodies, 3960.0);
        }
        assert!((camera.y - 850.0).abs() < 1.0);
    }
}
