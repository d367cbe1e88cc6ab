//! Population arena and layout generators.
//!
//! A population is built once from a [`PopulationConfig`] with a seeded RNG,
//! so the same config always yields the same chaos/formed layouts.  It is
//! replaced wholesale when any count changes; individual entities are never
//! added or removed.
//!
//! Layouts:
//!
//! * **chaos** — uniform inside a sphere of `chaos_radius`.
//! * **formed** — a cone standing on the origin plane.  Particles fill its
//!   volume, ornaments sit on its surface, photos climb a spiral around it.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::entity::{Entity, EntityId, EntityKind};

// ════════════════════════════════════════════════════════════════════════════
// Config / errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub seed:         u64,
    pub particles:    usize,
    pub ornaments:    usize,
    pub photos:       usize,
    pub chaos_radius: f32,
    pub cone_height:  f32,
    pub cone_radius:  f32,
    /// Spiral turns the photo frames make from base to tip.
    pub photo_turns:  f32,
    pub speed_min:    f32,
    pub speed_max:    f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        PopulationConfig {
            seed:         7,
            particles:    1500,
            ornaments:    120,
            photos:       12,
            chaos_radius: 14.0,
            cone_height:  12.0,
            cone_radius:  5.0,
            photo_turns:  2.5,
            speed_min:    0.6,
            speed_max:    2.2,
        }
    }
}

impl PopulationConfig {
    pub fn total(&self) -> usize {
        self.particles + self.ornaments + self.photos
    }

    fn same_counts(&self, other: &PopulationConfig) -> bool {
        self.particles == other.particles
            && self.ornaments == other.ornaments
            && self.photos == other.photos
    }

    pub fn validate(&self) -> Result<(), PopulationError> {
        for (name, value) in [
            ("chaos_radius", self.chaos_radius),
            ("cone_height",  self.cone_height),
            ("cone_radius",  self.cone_radius),
            ("photo_turns",  self.photo_turns),
            ("speed_min",    self.speed_min),
            ("speed_max",    self.speed_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PopulationError::BadDimension { name, value });
            }
        }
        if self.speed_min > self.speed_max {
            return Err(PopulationError::SpeedRange { min: self.speed_min, max: self.speed_max });
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PopulationError {
    #[error("{name} must be finite and non-negative, got {value}")]
    BadDimension { name: &'static str, value: f32 },

    #[error("speed range is inverted: min {min} > max {max}")]
    SpeedRange { min: f32, max: f32 },
}

// ════════════════════════════════════════════════════════════════════════════
// Layout generators
// ════════════════════════════════════════════════════════════════════════════

/// Uniform random point inside a ball.
pub fn sphere_point<R: Rng>(rng: &mut R, radius: f32) -> Vec3 {
    let z:     f32 = rng.gen_range(-1.0..=1.0);
    let theta: f32 = rng.gen_range(0.0..TAU);
    let ring = (1.0 - z * z).max(0.0).sqrt();
    let dir  = Vec3::new(ring * theta.cos(), z, ring * theta.sin());
    dir * radius * rng.gen::<f32>().cbrt()
}

/// Random point in or on a cone with its base on y = 0 and tip at
/// y = `height`.  `fill` in [0, 1] is how far in from the surface the point
/// may sit (0 = surface only).
pub fn cone_point<R: Rng>(rng: &mut R, height: f32, radius: f32, fill: f32) -> Vec3 {
    // sqrt bias puts more points toward the wide base.
    let t     = 1.0 - rng.gen::<f32>().sqrt();
    let y     = t * height;
    let r     = radius * (1.0 - t) * (1.0 - fill * rng.gen::<f32>());
    let theta = rng.gen_range(0.0..TAU);
    Vec3::new(r * theta.cos(), y, r * theta.sin())
}

/// The `i`-th of `n` evenly spaced points along a spiral wrapped on the cone.
pub fn spiral_point(i: usize, n: usize, height: f32, radius: f32, turns: f32) -> Vec3 {
    let t     = if n <= 1 { 0.5 } else { i as f32 / (n - 1) as f32 };
    // Keep clear of the tip, where frames would collide.
    let t     = 0.1 + 0.75 * t;
    let theta = t * turns * TAU;
    let r     = radius * (1.0 - t) + 0.4;
    Vec3::new(r * theta.cos(), t * height, r * theta.sin())
}

// ════════════════════════════════════════════════════════════════════════════
// Population
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct Population {
    entities: Vec<Entity>,
    config:   PopulationConfig,
}

impl Population {
    /// Build every entity for `config`.
    pub fn build(config: &PopulationConfig) -> Result<Self, PopulationError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut entities = Vec::with_capacity(config.total());

        let spawn = |rng: &mut StdRng, kind: EntityKind, formed: Vec3| {
            let chaos = sphere_point(rng, config.chaos_radius);
            let speed = rng.gen_range(config.speed_min..=config.speed_max);
            let phase = rng.gen_range(0.0..TAU);
            Entity::new(kind, chaos, formed, speed).with_phase(phase)
        };

        for _ in 0..config.particles {
            let formed = cone_point(&mut rng, config.cone_height, config.cone_radius, 1.0);
            entities.push(spawn(&mut rng, EntityKind::Particle, formed));
        }
        for _ in 0..config.ornaments {
            let formed = cone_point(&mut rng, config.cone_height, config.cone_radius, 0.05);
            entities.push(spawn(&mut rng, EntityKind::Ornament, formed));
        }
        for i in 0..config.photos {
            let formed = spiral_point(
                i, config.photos, config.cone_height, config.cone_radius, config.photo_turns,
            );
            entities.push(spawn(&mut rng, EntityKind::Photo, formed));
        }

        info!(
            particles = config.particles, ornaments = config.ornaments, photos = config.photos,
            seed = config.seed, "population built"
        );
        Ok(Population { entities, config: config.clone() })
    }

    /// Wrap hand-made entities, e.g. from an external population builder.
    pub fn from_entities(entities: Vec<Entity>) -> Self {
        let count = |kind| entities.iter().filter(|e| e.kind == kind).count();
        let config = PopulationConfig {
            particles: count(EntityKind::Particle),
            ornaments: count(EntityKind::Ornament),
            photos:    count(EntityKind::Photo),
            ..PopulationConfig::default()
        };
        Population { entities, config }
    }

    /// Replace the whole population if any count differs from the current
    /// config.  Returns whether a rebuild happened.
    pub fn resize(&mut self, config: &PopulationConfig) -> Result<bool, PopulationError> {
        if self.config.same_counts(config) && !self.entities.is_empty() {
            return Ok(false);
        }
        *self = Population::build(config)?;
        Ok(true)
    }

    pub fn config(&self) -> &PopulationConfig { &self.config }
    pub fn len(&self) -> usize { self.entities.len() }
    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.entities.len() as u32).map(EntityId)
    }

    pub fn ids_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.kind == kind)
            .map(|(i, _)| EntityId(i as u32))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
