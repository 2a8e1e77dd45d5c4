//! Cosmetic spark particles
//!
//! Sparks never feed back into the race. Their spread comes from a hash of
//! the tick and spark index instead of the race RNG, so toggling particles
//! leaves the race itself unchanged.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// A spark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: u32,
    /// Frames left to live
    pub life: f32,
    pub max_life: f32,
}

impl Particle {
    /// Remaining life as 0-1 (for fading)
    pub fn alpha(&self) -> f32 {
        if self.max_life <= 0.0 {
            0.0
        } else {
            (self.life / self.max_life).clamp(0.0, 1.0)
        }
    }
}

/// Bounded pool of sparks
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    max_particles: usize,
}

impl ParticleSystem {
    /// `max_particles == 0` disables emission
    pub fn new(max_particles: usize) -> Self {
        Self {
            particles: Vec::with_capacity(max_particles.min(256)),
            max_particles,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Emit a burst of sparks at a contact point
    pub fn emit_burst(&mut self, at: Vec2, color: u32, seed: u64) {
        if self.max_particles == 0 {
            return;
        }
        let seed = seed as u32;
        for i in 0..SPARKS_PER_HIT {
            if self.particles.len() >= self.max_particles {
                // Remove oldest particles to make room
                self.particles.remove(0);
            }
            let hash = seed
                .wrapping_mul(2654435761)
                .wrapping_add(i as u32 * 7919);
            let angle = (hash % 1000) as f32 / 1000.0 * std::f32::consts::TAU;
            let speed = SPARK_SPEED * (0.5 + (hash / 1000 % 1000) as f32 / 1000.0);
            let life = SPARK_MIN_LIFE_FRAMES
                + (hash / 1_000_000 % 100) as f32 / 100.0
                    * (SPARK_MAX_LIFE_FRAMES - SPARK_MIN_LIFE_FRAMES);

            self.particles.push(Particle {
                pos: at,
                vel: Vec2::new(angle.cos(), angle.sin()) * speed,
                color,
                life,
                max_life: life,
            });
        }
    }

    /// Advance every spark by one frame and drop the dead ones
    pub fn update(&mut self) {
        for particle in self.particles.iter_mut() {
            particle.pos += particle.vel;
            particle.vel.y += SPARK_GRAVITY;
            particle.vel *= 0.96;
            particle.life -= 1.0;
        }
        self.particles.retain(|p| p.life > 0.0);
    }
}
