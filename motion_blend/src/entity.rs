//! Entity records.
//!
//! Every animated thing (particle, ornament, photo frame) is one [`Entity`]
//! stored by value in a [`Population`](crate::Population) arena and addressed
//! by [`EntityId`].  Targets and speed are fixed at creation; the current
//! pose is written only by the [`MotionEngine`](crate::MotionEngine).

use glam::{Quat, Vec3};
use gesture_mode::Mode;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Particle,
    Ornament,
    Photo,
}

impl EntityKind {
    /// Resting scale for entities of this kind.
    pub fn base_scale(self) -> f32 {
        match self {
            EntityKind::Particle => 0.05,
            EntityKind::Ornament => 0.25,
            EntityKind::Photo    => 0.9,
        }
    }
}

/// Index into a population arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize { self.0 as usize }
}

/// What the renderer reads for one entity each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position:    Vec3,
    pub orientation: Quat,
    pub scale:       f32,
}

impl Default for Pose {
    fn default() -> Self {
        Pose { position: Vec3::ZERO, orientation: Quat::IDENTITY, scale: 1.0 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub kind:          EntityKind,
    pub chaos_target:  Vec3,
    pub formed_target: Vec3,
    /// Convergence rate per second; 0 freezes the entity in place.
    pub speed:         f32,
    /// Sway phase in radians.
    pub phase:         f32,
    pub base_scale:    f32,

    pub(crate) override_target: Option<Vec3>,
    pub(crate) position:        Vec3,
    pub(crate) orientation:     Quat,
    pub(crate) scale:           f32,
}

impl Entity {
    /// New entity resting on its chaos target.
    pub fn new(kind: EntityKind, chaos_target: Vec3, formed_target: Vec3, speed: f32) -> Self {
        Entity {
            kind,
            chaos_target,
            formed_target,
            speed,
            phase:           0.0,
            base_scale:      kind.base_scale(),
            override_target: None,
            position:        chaos_target,
            orientation:     Quat::IDENTITY,
            scale:           kind.base_scale(),
        }
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    /// Start somewhere other than the chaos target.
    pub fn placed_at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn position(&self) -> Vec3 { self.position }
    pub fn orientation(&self) -> Quat { self.orientation }
    pub fn scale(&self) -> f32 { self.scale }
    pub fn override_target(&self) -> Option<Vec3> { self.override_target }

    pub fn mode_target(&self, mode: Mode) -> Vec3 {
        match mode {
            Mode::Chaos  => self.chaos_target,
            Mode::Formed => self.formed_target,
        }
    }

    /// The one target this entity heads for: the override if present,
    /// otherwise whatever the mode selects.
    pub fn active_target(&self, mode: Mode) -> Vec3 {
        self.override_target.unwrap_or_else(|| self.mode_target(mode))
    }

    /// False when any target or the current pose has gone non-finite, or the
    /// speed is negative.  Such entities are skipped rather than updated.
    pub fn is_sound(&self) -> bool {
        self.chaos_target.is_finite()
            && self.formed_target.is_finite()
            && self.override_target.map_or(true, |t| t.is_finite())
            && self.position.is_finite()
            && self.orientation.is_finite()
            && self.speed.is_finite()
            && self.speed >= 0.0
    }

    pub fn pose(&self) -> Pose {
        Pose { position: self.position, orientation: self.orientation, scale: self.scale }
    }
}
