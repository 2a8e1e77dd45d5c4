//! Collision detection and response
//!
//! Narrow phase for a circular body against every obstacle variant, the
//! side walls, the mixer drum and other bodies. Responses mutate the body
//! in place and report whether contact happened so the caller can count
//! collisions and emit sparks.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use rand::Rng;

use super::geometry::{closest_point_on_rect, closest_point_on_segment};
use super::obstacle::Obstacle;
use super::state::Body;
use crate::consts::*;
use crate::polar_to_cartesian;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the obstacle surface (if hit)
    pub point: Vec2,
    /// Surface normal at contact, pointing toward the body center
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
    /// Parameter along a segment of the contact point (0 for other shapes)
    pub along: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
            along: 0.0,
        }
    }
}

/// What a body-obstacle contact did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    /// Body bounced off the obstacle at `point`
    Bounce { point: Vec2 },
    /// Body crossed an event horizon and was moved to the white hole
    Teleport { from: Vec2, to: Vec2 },
}

/// Reflect only the approaching normal component, keeping `restitution` of it
#[inline]
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn < 0.0 {
        velocity - (1.0 + restitution) * vn * normal
    } else {
        velocity
    }
}

/// Body against a circle of radius `radius` at `center`
pub fn ball_circle_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    center: Vec2,
    radius: f32,
) -> CollisionResult {
    let delta = ball_pos - center;
    let dist = delta.length();
    let min_dist = ball_radius + radius;
    if dist >= min_dist || dist < MIN_CONTACT_DISTANCE {
        return CollisionResult::miss();
    }
    let normal = delta / dist;
    CollisionResult {
        hit: true,
        point: center + normal * radius,
        normal,
        penetration: min_dist - dist,
        along: 0.0,
    }
}

/// Body against segment `a`-`b` thickened by `thickness` (capsule)
pub fn ball_segment_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    a: Vec2,
    b: Vec2,
    thickness: f32,
) -> CollisionResult {
    let (closest, along) = closest_point_on_segment(ball_pos, a, b);
    let delta = ball_pos - closest;
    let dist = delta.length();
    let min_dist = ball_radius + thickness;
    if dist >= min_dist || dist < MIN_CONTACT_DISTANCE {
        return CollisionResult::miss();
    }
    let normal = delta / dist;
    CollisionResult {
        hit: true,
        point: closest + normal * thickness,
        normal,
        penetration: min_dist - dist,
        along,
    }
}

/// Body against the axis-aligned rectangle `[min, max]`
///
/// A center inside the rectangle is pushed out through the nearest face.
pub fn ball_rect_collision(ball_pos: Vec2, ball_radius: f32, min: Vec2, max: Vec2) -> CollisionResult {
    let closest = closest_point_on_rect(ball_pos, min, max);
    let delta = ball_pos - closest;
    let dist = delta.length();

    if dist < MIN_CONTACT_DISTANCE {
        // Center inside: leave through the face with the least penetration
        let faces = [
            (ball_pos.x - min.x, Vec2::NEG_X),
            (max.x - ball_pos.x, Vec2::X),
            (ball_pos.y - min.y, Vec2::NEG_Y),
            (max.y - ball_pos.y, Vec2::Y),
        ];
        let (depth, normal) = faces
            .into_iter()
            .fold((f32::MAX, Vec2::NEG_Y), |best, face| {
                if face.0 < best.0 { face } else { best }
            });
        return CollisionResult {
            hit: true,
            point: ball_pos + normal * depth,
            normal,
            penetration: depth + ball_radius,
            along: 0.0,
        };
    }
    if dist >= ball_radius {
        return CollisionResult::miss();
    }
    CollisionResult {
        hit: true,
        point: closest,
        normal: delta / dist,
        penetration: ball_radius - dist,
        along: 0.0,
    }
}

/// Keep a body between the side walls (inner faces at `left` / `right`)
///
/// Strict: a body exactly touching a wall is not colliding.
pub fn resolve_wall_collision(body: &mut Body, left: f32, right: f32) -> bool {
    if body.pos.x - body.radius < left {
        body.pos.x = left + body.radius;
        body.vel.x = body.vel.x.abs() * RESTITUTION;
        true
    } else if body.pos.x + body.radius > right {
        body.pos.x = right - body.radius;
        body.vel.x = -body.vel.x.abs() * RESTITUTION;
        true
    } else {
        false
    }
}

/// Keep a body inside the mixer drum
pub fn confine_to_circle(body: &mut Body, center: Vec2, radius: f32) -> bool {
    let delta = body.pos - center;
    let dist = delta.length();
    let limit = radius - body.radius;
    if dist <= limit || dist < MIN_CONTACT_DISTANCE {
        return false;
    }
    let outward = delta / dist;
    body.pos = center + outward * limit;
    body.vel = bounce_velocity(body.vel, -outward, MIXER_RESTITUTION);
    true
}

/// Circle obstacle response, `obstacle_vel` in px/frame
fn bounce_off_circle<R: Rng>(
    body: &mut Body,
    center: Vec2,
    radius: f32,
    obstacle_vel: Vec2,
    restitution: f32,
    rng: &mut R,
) -> Option<Contact> {
    let hit = ball_circle_collision(body.pos, body.radius, center, radius);
    if !hit.hit {
        return None;
    }
    body.pos += hit.normal * hit.penetration;
    // Reflect in the obstacle's frame so moving pegs impart their velocity
    let relative = bounce_velocity(body.vel - obstacle_vel, hit.normal, restitution);
    body.vel = relative + obstacle_vel + hit.normal * CONTACT_NUDGE;
    body.vel.x += (rng.random::<f32>() - 0.5) * PEG_DEFLECTION;
    Some(Contact::Bounce { point: hit.point })
}

fn bounce_off_segment(body: &mut Body, a: Vec2, b: Vec2, thickness: f32) -> Option<Contact> {
    let hit = ball_segment_collision(body.pos, body.radius, a, b, thickness);
    if !hit.hit {
        return None;
    }
    body.pos += hit.normal * hit.penetration;
    body.vel = bounce_velocity(body.vel, hit.normal, RESTITUTION);

    // Away from the tips, shove the body sideways and down so two bodies
    // cannot wedge each other dead at a funnel mouth
    if hit.along > SEGMENT_TIP_MARGIN && hit.along < 1.0 - SEGMENT_TIP_MARGIN {
        body.vel.x += hit.normal.x.signum() * SEGMENT_LATERAL_PUSH;
        body.vel.y += SEGMENT_DOWN_NUDGE;
    }
    Some(Contact::Bounce { point: hit.point })
}

fn bounce_off_bumper<R: Rng>(
    body: &mut Body,
    a: Vec2,
    b: Vec2,
    radius: f32,
    rng: &mut R,
) -> Option<Contact> {
    let hit = ball_segment_collision(body.pos, body.radius, a, b, radius);
    if !hit.hit {
        return None;
    }
    body.pos += hit.normal * hit.penetration;
    body.vel = bounce_velocity(body.vel, hit.normal, RESTITUTION);

    // Landed on top: never let it balance there
    if hit.normal.y < -BUMPER_TOP_NORMAL && body.vel.y.abs() < BUMPER_REST_SPEED {
        body.vel.y = 0.0;
        let toward_end = if hit.along < 0.5 { a.x - b.x } else { b.x - a.x };
        let direction = if toward_end < 0.0 { -1.0 } else { 1.0 };
        let push = BUMPER_SLIDE_MIN + rng.random::<f32>() * 2.0;
        body.vel.x = direction * body.vel.x.abs().max(push);
    }
    Some(Contact::Bounce { point: hit.point })
}

fn bounce_off_rect(body: &mut Body, min: Vec2, max: Vec2, block_vel: f32) -> Option<Contact> {
    let hit = ball_rect_collision(body.pos, body.radius, min, max);
    if !hit.hit {
        return None;
    }
    body.pos += hit.normal * hit.penetration;

    // Reflect along whichever axis dominates the contact normal
    if hit.normal.x.abs() > hit.normal.y.abs() {
        if body.vel.x * hit.normal.x < 0.0 {
            body.vel.x = -body.vel.x * RESTITUTION;
        }
    } else if body.vel.y * hit.normal.y < 0.0 {
        body.vel.y = -body.vel.y * RESTITUTION;
    }
    // Applied once per sub-step while in contact
    body.vel.x += block_vel * RIDE_AMPLIFY / SUB_STEPS as f32;
    Some(Contact::Bounce { point: hit.point })
}

/// Acceleration a black hole applies to a body at `pos`
///
/// Grows as the body closes in, capped at `BLACK_HOLE_MAX_PULL` times the
/// base force. Zero outside the pull radius.
pub fn gravity_well_pull(pos: Vec2, black_hole: Vec2, pull_radius: f32, event_horizon: f32) -> Vec2 {
    let delta = black_hole - pos;
    let dist = delta.length();
    if dist >= pull_radius || dist < MIN_CONTACT_DISTANCE {
        return Vec2::ZERO;
    }
    let boost = (pull_radius / dist.max(event_horizon)).min(BLACK_HOLE_MAX_PULL);
    delta / dist * BLACK_HOLE_PULL_FORCE * boost
}

/// Resolve one body against one obstacle
pub fn resolve_obstacle_collision<R: Rng>(
    body: &mut Body,
    obstacle: &Obstacle,
    rng: &mut R,
) -> Option<Contact> {
    match *obstacle {
        Obstacle::Peg {
            pos,
            radius,
            bouncy,
        } => {
            let restitution = if bouncy {
                BOUNCY_PEG_RESTITUTION
            } else {
                RESTITUTION
            };
            bounce_off_circle(body, pos, radius, Vec2::ZERO, restitution, rng)
        }
        Obstacle::PinballBumper { pos, radius } => {
            bounce_off_circle(body, pos, radius, Vec2::ZERO, PINBALL_BUMPER_RESTITUTION, rng)
        }
        Obstacle::Bumper { a, b, radius } => bounce_off_bumper(body, a, b, radius, rng),
        Obstacle::Segment { a, b, thickness, .. } => bounce_off_segment(body, a, b, thickness),
        Obstacle::Spinner { peg_radius, .. } => {
            let mut contact = None;
            for (pos, vel) in obstacle.spinner_pegs() {
                if let Some(hit) = bounce_off_circle(body, pos, peg_radius, vel, RESTITUTION, rng) {
                    contact = Some(hit);
                }
            }
            contact
        }
        Obstacle::Block { velocity, .. } => {
            let (min, max) = obstacle.block_rect()?;
            bounce_off_rect(body, min, max, velocity)
        }
        Obstacle::GravityWell {
            black_hole,
            white_hole,
            event_horizon,
            ..
        } => {
            if body.pos.distance(black_hole) >= event_horizon {
                return None;
            }
            let from = body.pos;
            body.pos = white_hole;
            // Eject downward within +-60 degrees of vertical
            let angle = FRAC_PI_2 + (rng.random::<f32>() - 0.5) * (PI * 2.0 / 3.0);
            let speed = WHITE_HOLE_EJECT_FORCE * (0.75 + rng.random::<f32>() * 0.25);
            body.vel = polar_to_cartesian(speed, angle);
            Some(Contact::Teleport {
                from,
                to: white_hole,
            })
        }
    }
}

/// Resolve a body pair: push apart and exchange impulse when overlapping,
/// otherwise apply drafting to whichever trails the other
///
/// Returns whether the bodies were in contact.
pub fn resolve_ball_pair<R: Rng>(a: &mut Body, b: &mut Body, rng: &mut R) -> bool {
    let delta = b.pos - a.pos;
    let dist = delta.length();
    let min_dist = a.radius + b.radius;

    if dist < min_dist {
        if dist < MIN_CONTACT_DISTANCE {
            return false;
        }
        let normal = delta / dist;
        let push = (min_dist - dist) * OVERLAP_PUSH;
        a.pos -= normal * push;
        b.pos += normal * push;

        // Equal masses; only exchange impulse while approaching
        let approach = (a.vel - b.vel).dot(normal);
        if approach > 0.0 {
            let impulse = approach * (1.0 + BALL_RESTITUTION) * 0.5;
            a.vel -= normal * impulse;
            b.vel += normal * impulse;
        }
        return true;
    }

    apply_draft(a, b, rng);
    apply_draft(b, a, rng);
    false
}

/// Boost `trailer` if it falls closely behind `leader`
fn apply_draft<R: Rng>(trailer: &mut Body, leader: &Body, rng: &mut R) {
    let dy = leader.pos.y - trailer.pos.y;
    let dx = (leader.pos.x - trailer.pos.x).abs();
    if dy > 0.0 && dy < trailer.radius * DRAFT_RANGE_RADII && dx < trailer.radius * 1.5 {
        trailer.vel.y += DRAFTING_BOOST;
        trailer.vel.x += (rng.random::<f32>() - 0.5) * TURBULENCE;
    }
}
