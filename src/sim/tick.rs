//! Per-frame race tick
//!
//! Core loop that advances the race by one frame:
//! 1. Honor a pending abort
//! 2. Mixing: spin bodies in the drum, release when the timer runs out
//! 3. Racing: pose moving obstacles, integrate and collide every active
//!    body in sub-steps, rescue stalled bodies, detect finishers, then
//!    resolve body pairs through the grid
//! 4. Update camera, particles and cues

use glam::Vec2;
use rand::Rng;

use super::collision::{
    Contact, confine_to_circle, gravity_well_pull, resolve_ball_pair, resolve_obstacle_collision,
    resolve_wall_collision,
};
use super::obstacle::Obstacle;
use super::particles::ParticleSystem;
use super::state::{Body, Race, RaceEvent, RaceMode, RacePhase, TickResult};
use crate::consts::*;
use crate::feedback::Cue;

/// Clamp each velocity component to `MAX_VELOCITY`
#[inline]
pub fn clamp_velocity(vel: Vec2) -> Vec2 {
    vel.clamp(Vec2::splat(-MAX_VELOCITY), Vec2::splat(MAX_VELOCITY))
}

/// Leader and straggler positions the pack-balancing forces depend on
#[derive(Debug, Clone, Copy, Default)]
struct PackSpread {
    leader: Option<usize>,
    leader_y: f32,
    last_y: f32,
}

impl PackSpread {
    fn measure(bodies: &[Body]) -> Self {
        let mut spread: Option<Self> = None;
        for body in bodies.iter().filter(|b| !b.finished) {
            let y = body.pos.y;
            spread = Some(match spread {
                None => Self {
                    leader: Some(body.id),
                    leader_y: y,
                    last_y: y,
                },
                Some(mut s) => {
                    if y > s.leader_y {
                        s.leader = Some(body.id);
                        s.leader_y = y;
                    }
                    s.last_y = s.last_y.min(y);
                    s
                }
            });
        }
        spread.unwrap_or_default()
    }

    /// Gravity multiplier: up to `CATCHUP_GRAVITY` for the last body once
    /// the pack is spread wider than `CATCHUP_SPREAD`
    fn trail_factor(&self, y: f32) -> f32 {
        let spread = self.leader_y - self.last_y;
        if spread <= CATCHUP_SPREAD {
            return 1.0;
        }
        let behind = ((self.leader_y - y) / spread).clamp(0.0, 1.0);
        1.0 + (CATCHUP_GRAVITY - 1.0) * behind
    }
}

/// What happened to one body while it moved this tick
#[derive(Debug, Default)]
struct Movement {
    touched: bool,
    teleports: Vec<(Vec2, Vec2)>,
}

impl Race {
    /// Advance the race by one frame
    ///
    /// `elapsed_ms` is the host time since the previous tick; it drives the
    /// race clock (moving obstacles, mixer timer, cue throttling) and is
    /// clamped to `MAX_TICK_MS`, so a host resuming from a long pause does
    /// not jump the clock. Ticks in `Idle` or `Finished` only age particles.
    pub fn tick(&mut self, elapsed_ms: f32) -> TickResult {
        let mut result = TickResult::default();

        if self.abort_requested {
            self.reset_to_idle();
            result.events.push(RaceEvent::Aborted);
            return result;
        }

        let dt = if elapsed_ms.is_finite() {
            elapsed_ms.clamp(0.0, MAX_TICK_MS)
        } else {
            0.0
        };

        match self.phase {
            RacePhase::Mixing => self.tick_mixing(dt, &mut result),
            RacePhase::Racing => self.tick_racing(dt, &mut result),
            RacePhase::Idle | RacePhase::Finished => {}
        }

        self.particles.update();
        result
    }

    fn reset_to_idle(&mut self) {
        log::info!(
            "Race aborted at {:.1}s with {} finisher(s)",
            self.clock_ms / 1000.0,
            self.finishers.len()
        );
        self.abort_requested = false;
        self.phase = RacePhase::Idle;
        self.bodies.clear();
        self.finishers.clear();
        self.next_finish_order = 1;
        self.clock_ms = 0.0;
        self.mixer_ms = 0.0;
        self.tick_count = 0;
        self.camera = Default::default();
        self.particles.clear();
        self.grid.clear();
        self.collision_cues.reset();
    }

    fn tick_mixing(&mut self, dt: f32, result: &mut TickResult) {
        self.clock_ms += dt;
        self.mixer_ms += dt;
        self.tick_count += 1;

        if self.mixer_ms >= self.mixer_duration_ms {
            self.release(result);
            return;
        }

        let center = Vec2::new(self.course.width * 0.5, MIXER_CENTER_Y);
        for body in &mut self.bodies {
            let offset = body.pos - center;
            let tangent = Vec2::new(-offset.y, offset.x).normalize_or_zero();
            body.vel += tangent * MIXER_SPIN_FORCE;
            body.vel.y += MIXER_GRAVITY;
            body.vel = clamp_velocity(body.vel * DAMPING);
            body.pos += body.vel;
            confine_to_circle(body, center, MIXER_RADIUS);
        }
        self.resolve_body_pairs();
    }

    /// Open the mixer: every body gets a random down-and-sideways kick
    fn release(&mut self, result: &mut TickResult) {
        for body in &mut self.bodies {
            body.vel = Vec2::new(
                (self.rng.random::<f32>() - 0.5) * RELEASE_VX_SPREAD,
                RELEASE_MIN_VY + self.rng.random::<f32>() * RELEASE_VY_SPREAD,
            );
            body.reset_checkpoint();
        }
        self.phase = RacePhase::Racing;
        result.events.push(RaceEvent::Released);
        self.feedback.cue(Cue::Release);
        log::info!(
            "Released {} bodies after {:.0}ms",
            self.bodies.len(),
            self.mixer_ms
        );
    }

    fn tick_racing(&mut self, dt: f32, result: &mut TickResult) {
        self.clock_ms += dt;
        self.tick_count += 1;

        let clock = self.clock_ms;
        for obstacle in self.course.obstacles.iter_mut().filter(|o| o.is_moving()) {
            obstacle.advance(clock);
        }

        let pack = PackSpread::measure(&self.bodies);
        let left = self.course.left_wall();
        let right = self.course.right_wall();
        let finish_y = self.course.finish_y;
        let ranked = self.settings.mode == RaceMode::Ranked;

        for index in 0..self.bodies.len() {
            let body = &mut self.bodies[index];
            if body.finished {
                continue;
            }

            apply_forces(body, &pack, &self.course.obstacles);
            let spark_seed = self.tick_count.wrapping_mul(31).wrapping_add(index as u64);
            let movement = move_body(
                body,
                &self.course.obstacles,
                left,
                right,
                &mut self.rng,
                &mut self.particles,
                spark_seed,
            );
            if movement.touched {
                result.collisions += 1;
            }
            for (from, to) in movement.teleports {
                log::debug!("{} teleported {from} -> {to}", body.label);
                result.events.push(RaceEvent::Teleported {
                    id: body.id,
                    from,
                    to,
                });
            }

            if rescue_if_stalled(body, &mut self.rng) {
                log::debug!("Rescued stalled body {} at y={:.0}", body.label, body.pos.y);
                result.events.push(RaceEvent::Rescued { id: body.id });
            }

            // First mode records a single winner even if several cross together
            if body.pos.y >= finish_y && (ranked || self.finishers.is_empty()) {
                body.finished = true;
                body.pos.y = finish_y;
                body.vel = Vec2::ZERO;
                body.finish_order = self.next_finish_order;
                self.next_finish_order += 1;
                self.finishers.push(body.id);

                let rank = body.finish_order.unsigned_abs();
                log::info!("#{rank} {} at {:.1}s", body.label, self.clock_ms / 1000.0);
                result.events.push(RaceEvent::Finished { id: body.id, rank });
                result.newly_finished.push(body.clone());
                if rank == 1 {
                    self.feedback.cue(Cue::Winner {
                        label: body.label.clone(),
                    });
                }
                self.feedback.cue(Cue::Finish {
                    rank,
                    label: body.label.clone(),
                });
            }
        }

        result.collisions += self.resolve_body_pairs();
        self.camera.follow(&self.bodies, finish_y);

        if result.collisions > 0 && self.collision_cues.ready(self.clock_ms) {
            self.feedback.cue(Cue::Collision {
                count: result.collisions,
            });
        }

        let complete = if ranked {
            self.bodies.iter().all(|b| b.finished)
        } else {
            !self.finishers.is_empty()
        };
        if complete {
            self.phase = RacePhase::Finished;
            result.events.push(RaceEvent::RaceComplete);
            self.feedback.cue(Cue::RaceComplete);
            log::info!(
                "Race complete after {:.1}s ({} ticks), {} finisher(s)",
                self.clock_ms / 1000.0,
                self.tick_count,
                self.finishers.len()
            );
        }
    }

    /// Push apart and exchange impulse between active bodies; returns contacts
    fn resolve_body_pairs(&mut self) -> u32 {
        self.grid.rebuild(
            self.bodies
                .iter()
                .filter(|b| !b.finished)
                .map(|b| (b.id, b.pos)),
        );
        let mut contacts = 0;
        for (a, b) in self.grid.candidate_pairs() {
            let (first, second) = pair_mut(&mut self.bodies, a, b);
            if resolve_ball_pair(first, second, &mut self.rng) {
                contacts += 1;
            }
        }
        contacts
    }
}

/// Two distinct mutable bodies, `a < b`
fn pair_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    let (head, tail) = bodies.split_at_mut(b);
    (&mut head[a], &mut tail[0])
}

/// Gravity (rubber-banded), leader drag, black hole pull, damping, clamp
fn apply_forces(body: &mut Body, pack: &PackSpread, obstacles: &[Obstacle]) {
    body.vel.y += GRAVITY * pack.trail_factor(body.pos.y);

    if pack.leader == Some(body.id) && body.vel.y > 0.0 {
        body.vel.y -= body.vel.y * LEADER_DRAG;
    }

    for obstacle in obstacles {
        if !obstacle.within_vertical_reach(body.pos.y, body.radius) {
            continue;
        }
        if let Obstacle::GravityWell {
            black_hole,
            pull_radius,
            event_horizon,
            ..
        } = *obstacle
        {
            body.vel += gravity_well_pull(body.pos, black_hole, pull_radius, event_horizon);
        }
    }

    body.vel = clamp_velocity(body.vel * DAMPING);
}

/// Move in sub-steps, each followed by a full wall and obstacle pass
fn move_body<R: Rng>(
    body: &mut Body,
    obstacles: &[Obstacle],
    left: f32,
    right: f32,
    rng: &mut R,
    sparks: &mut ParticleSystem,
    spark_seed: u64,
) -> Movement {
    let mut movement = Movement::default();
    let mut sparked = false;

    for _ in 0..SUB_STEPS {
        body.pos += body.vel / SUB_STEPS as f32;

        if resolve_wall_collision(body, left, right) {
            movement.touched = true;
        }

        for obstacle in obstacles {
            if !obstacle.within_vertical_reach(body.pos.y, body.radius) {
                continue;
            }
            match resolve_obstacle_collision(body, obstacle, rng) {
                Some(Contact::Bounce { point }) => {
                    movement.touched = true;
                    if !sparked {
                        sparks.emit_burst(point, body.color, spark_seed);
                        sparked = true;
                    }
                }
                Some(Contact::Teleport { from, to }) => movement.teleports.push((from, to)),
                None => {}
            }
        }

        body.vel = clamp_velocity(body.vel);
    }
    movement
}

/// Anti-stall: every `STALL_CHECK_TICKS`, kick a body that barely descended
fn rescue_if_stalled<R: Rng>(body: &mut Body, rng: &mut R) -> bool {
    body.stall_ticks += 1;
    if body.stall_ticks < STALL_CHECK_TICKS {
        return false;
    }
    let stalled = body.pos.y - body.checkpoint_y < STALL_MIN_DESCENT;
    if stalled {
        body.vel.y = RESCUE_KICK_MIN + rng.random::<f32>() * RESCUE_KICK_SPREAD;
        body.vel.x = (rng.random::<f32>() - 0.5) * RESCUE_LATERAL;
        body.pos.y += RESCUE_NUDGE;
    }
    body.reset_checkpoint();
    stalled
}
