//! Motion blending engine.
//!
//! Once per animation tick every entity:
//!
//! 1. picks its active target (override, else the mode's layout target),
//! 2. closes `min(1, dt * speed)` of the remaining distance to it,
//! 3. turns toward its facing direction at a fixed angular rate,
//! 4. blends its scale toward the resting or zoomed scale.
//!
//! The sway layered on top of the published [`Pose`] is cosmetic; it never
//! feeds back into the stored position or orientation.
//!
//! Overrides come from the point edge: [`GestureEvent::PointStarted`]
//! installs one, [`GestureEvent::PointReleased`] and any mode change remove
//! it.

use std::f32::consts::TAU;

use glam::{Mat3, Quat, Vec3};
use gesture_mode::{GestureEvent, Mode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::entity::{EntityId, EntityKind, Pose};
use crate::population::Population;

// ════════════════════════════════════════════════════════════════════════════
// Config
// ════════════════════════════════════════════════════════════════════════════

/// Who receives the override when the point edge fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverridePolicy {
    /// The next photo frame in order (any entity if there are no photos).
    #[default]
    Single,
    /// Every entity at once.
    Population,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Fraction of the remaining rotation covered per second.
    pub turn_rate: f32,
    /// Fraction of the remaining scale change covered per second.
    pub scale_rate: f32,
    /// Formed entities face away from this point.
    pub face_point: Vec3,
    pub sway_amplitude: f32,
    /// Sway cycles per second.
    pub sway_frequency: f32,
    pub override_policy: OverridePolicy,
    /// How far in front of the camera a single override parks its entity.
    pub zoom_distance: f32,
    /// Scale multiplier for a single overridden entity.
    pub zoom_scale: f32,
    /// Spread factor applied to the formed layout under a population override.
    pub population_zoom: f32,
}

impl Default for BlendConfig {
    fn default() -> Self {
        BlendConfig {
            turn_rate:       3.0,
            scale_rate:      4.0,
            face_point:      Vec3::new(0.0, 6.0, 0.0),
            sway_amplitude:  0.08,
            sway_frequency:  0.4,
            override_policy: OverridePolicy::Single,
            zoom_distance:   6.0,
            zoom_scale:      3.0,
            population_zoom: 1.6,
        }
    }
}

/// Per-tick input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickContext {
    /// Seconds since the previous tick.
    pub dt: f32,
    pub mode: Mode,
    /// World-space camera position; chaos and overridden entities face it.
    pub camera: Vec3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActiveOverride {
    #[default]
    None,
    Single(EntityId),
    Population,
}

// ════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════

/// Rotation taking local +Z to `forward`, keeping local +Y as close to world
/// up as possible.  `forward` must be normalized.
pub fn look_rotation(forward: Vec3) -> Quat {
    let right = Vec3::Y.cross(forward);
    if right.length_squared() < 1e-8 {
        // Looking straight up or down: roll is arbitrary.
        return Quat::from_rotation_arc(Vec3::Z, forward);
    }
    let right = right.normalize();
    let up    = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}

/// `pose` if every part of it is finite, otherwise an invisible pose.
fn held_pose(pose: Pose) -> Pose {
    if pose.position.is_finite() && pose.orientation.is_finite() && pose.scale.is_finite() {
        pose
    } else {
        Pose { scale: 0.0, ..Pose::default() }
    }
}

/// Fraction of the remaining distance to cover this tick.
pub fn convergence_step(dt: f32, rate: f32) -> f32 {
    (dt * rate).clamp(0.0, 1.0)
}

// ════════════════════════════════════════════════════════════════════════════
// MotionEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct MotionEngine {
    pub config: BlendConfig,
    active:     ActiveOverride,
    /// Position in the photo (or entity) cycle for the next single override.
    cursor:     usize,
    last_mode:  Option<Mode>,
    clock:      f32,
    poses:      Vec<Pose>,
}

impl MotionEngine {
    pub fn new(config: BlendConfig) -> Self {
        MotionEngine {
            config,
            active:    ActiveOverride::None,
            cursor:    0,
            last_mode: None,
            clock:     0.0,
            poses:     Vec::new(),
        }
    }

    pub fn active_override(&self) -> ActiveOverride { self.active }

    /// Poses published by the last [`tick`](Self::tick), indexed by entity id.
    pub fn poses(&self) -> &[Pose] { &self.poses }

    /// Forget per-population state after the population was replaced.
    pub fn reset(&mut self) {
        self.active = ActiveOverride::None;
        self.cursor = 0;
        self.poses.clear();
    }

    /// React to a gesture event.  `camera` is the current camera position,
    /// used to place a single override in front of the viewer.
    pub fn handle_event(&mut self, event: &GestureEvent, pop: &mut Population, camera: Vec3) {
        match event {
            GestureEvent::PointStarted => self.install_override(pop, camera),
            GestureEvent::PointReleased | GestureEvent::ModeChanged { .. } => {
                self.clear_override(pop)
            }
        }
    }

    /// Install an override according to the configured policy.  Any
    /// previous override is cleared first.
    pub fn install_override(&mut self, pop: &mut Population, camera: Vec3) {
        self.clear_override(pop);
        if pop.is_empty() {
            return;
        }

        match self.config.override_policy {
            OverridePolicy::Single => {
                let Some(id) = self.next_candidate(pop) else { return };
                let toward = (self.config.face_point - camera).normalize_or_zero();
                let target = camera + toward * self.config.zoom_distance;
                if let Some(e) = pop.get_mut(id) {
                    e.override_target = Some(target);
                    self.active = ActiveOverride::Single(id);
                    info!(entity = id.0, ?target, "override installed");
                }
            }
            OverridePolicy::Population => {
                let center = self.config.face_point;
                let k = self.config.population_zoom;
                for e in pop.iter_mut() {
                    e.override_target = Some(center + (e.formed_target - center) * k);
                }
                self.active = ActiveOverride::Population;
                info!(count = pop.len(), "population override installed");
            }
        }
    }

    pub fn clear_override(&mut self, pop: &mut Population) {
        match self.active {
            ActiveOverride::None => return,
            ActiveOverride::Single(id) => {
                if let Some(e) = pop.get_mut(id) {
                    e.override_target = None;
                }
            }
            ActiveOverride::Population => {
                for e in pop.iter_mut() {
                    e.override_target = None;
                }
            }
        }
        debug!(previous = ?self.active, "override cleared");
        self.active = ActiveOverride::None;
    }

    fn next_candidate(&mut self, pop: &Population) -> Option<EntityId> {
        let photos: Vec<EntityId> = pop.ids_of_kind(EntityKind::Photo).collect();
        let pick = if photos.is_empty() {
            let n = pop.len();
            (n > 0).then(|| EntityId((self.cursor % n) as u32))
        } else {
            Some(photos[self.cursor % photos.len()])
        };
        self.cursor = self.cursor.wrapping_add(1);
        pick
    }

    /// Advance every entity by one tick and publish their poses.
    pub fn tick(&mut self, pop: &mut Population, ctx: &TickContext) -> &[Pose] {
        if self.last_mode.is_some_and(|m| m != ctx.mode) {
            self.clear_override(pop);
        }
        self.last_mode = Some(ctx.mode);

        let dt = ctx.dt.max(0.0);
        self.clock += dt;

        if pop.is_empty() {
            self.poses.clear();
            return &self.poses;
        }
        let fresh_from = self.poses.len().min(pop.len());
        self.poses.resize(pop.len(), Pose::default());

        let cfg       = self.config;
        let turn      = convergence_step(dt, cfg.turn_rate);
        let scale_mix = convergence_step(dt, cfg.scale_rate);
        let mut skipped = 0usize;

        for (i, (pose, e)) in self.poses.iter_mut().zip(pop.iter_mut()).enumerate() {
            if !e.is_sound() {
                // A slot that was never published holds the entity's stored
                // pose, or nothing visible when that is corrupt too.
                if i >= fresh_from {
                    *pose = held_pose(e.pose());
                }
                skipped += 1;
                continue;
            }

            let overridden = e.override_target.is_some();
            let target     = e.active_target(ctx.mode);

            let step = convergence_step(dt, e.speed);
            e.position = if step >= 1.0 { target } else { e.position + (target - e.position) * step };

            let facing = if overridden || ctx.mode == Mode::Chaos {
                ctx.camera - e.position
            } else {
                e.position - cfg.face_point
            };
            let facing = facing.normalize_or_zero();
            if facing != Vec3::ZERO {
                e.orientation = e.orientation.slerp(look_rotation(facing), turn).normalize();
            }

            let target_scale = if overridden && self.active != ActiveOverride::Population {
                e.base_scale * cfg.zoom_scale
            } else {
                e.base_scale
            };
            e.scale += (target_scale - e.scale) * scale_mix;

            *pose = e.pose();
            if !overridden && cfg.sway_amplitude != 0.0 {
                let s = (self.clock * cfg.sway_frequency * TAU + e.phase).sin();
                pose.position    += Vec3::Y * (cfg.sway_amplitude * s);
                pose.orientation  = pose.orientation * Quat::from_rotation_z(cfg.sway_amplitude * s);
            }
        }

        if skipped > 0 {
            warn!(skipped, "entities with corrupt state skipped this tick");
        }
        &self.poses
    }
}

impl Default for MotionEngine {
    fn default() -> Self {
        MotionEngine::new(BlendConfig::default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::population::PopulationConfig;
    use proptest::prelude::*;

    fn quiet() -> BlendConfig {
        BlendConfig { sway_amplitude: 0.0, ..BlendConfig::default() }
    }

    fn ctx(dt: f32, mode: Mode) -> TickContext {
        TickContext { dt, mode, camera: Vec3::new(0.0, 6.0, 20.0) }
    }

    fn one(speed: f32) -> Population {
        Population::from_entities(vec![Entity::new(
            EntityKind::Particle,
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            speed,
        )])
    }

    fn photos(n: usize) -> Population {
        let cfg = PopulationConfig { particles: 5, ornaments: 0, photos: n, ..Default::default() };
        Population::build(&cfg).unwrap()
    }

    #[test]
    fn formed_entity_approaches_monotonically_without_overshoot() {
        let mut pop = one(1.0);
        let mut engine = MotionEngine::new(quiet());
        let mut last_dist = 10.0;
        for _ in 0..10 {
            engine.tick(&mut pop, &ctx(1.0, Mode::Formed));
            let x = pop.iter().next().unwrap().position().x;
            assert!(x <= 10.0);
            let dist = 10.0 - x;
            assert!(dist <= last_dist);
            last_dist = dist;
        }
        assert!(last_dist < 1e-4);
    }

    #[test]
    fn half_step_halves_the_gap() {
        let mut pop = one(0.5);
        let mut engine = MotionEngine::new(quiet());
        engine.tick(&mut pop, &ctx(1.0, Mode::Formed));
        assert!((pop.iter().next().unwrap().position().x - 5.0).abs() < 1e-5);
        engine.tick(&mut pop, &ctx(1.0, Mode::Formed));
        assert!((pop.iter().next().unwrap().position().x - 7.5).abs() < 1e-5);
    }

    #[test]
    fn zero_speed_entity_is_frozen() {
        let mut pop = one(0.0);
        let mut engine = MotionEngine::new(quiet());
        for _ in 0..20 {
            engine.tick(&mut pop, &ctx(0.5, Mode::Formed));
        }
        assert_eq!(pop.iter().next().unwrap().position(), Vec3::ZERO);
    }

    #[test]
    fn empty_population_publishes_nothing() {
        let mut pop = Population::default();
        let mut engine = MotionEngine::default();
        assert!(engine.tick(&mut pop, &ctx(0.016, Mode::Chaos)).is_empty());
    }

    #[test]
    fn corrupt_entity_is_skipped_others_move() {
        let chaos = Vec3::new(3.0, 4.0, 5.0);
        let mut bad = Entity::new(EntityKind::Particle, chaos, Vec3::ZERO, 1.0);
        bad.formed_target = Vec3::new(f32::NAN, 0.0, 0.0);
        let good = Entity::new(EntityKind::Ornament, Vec3::ZERO, Vec3::X, 1.0);
        let mut pop = Population::from_entities(vec![bad, good]);
        let mut engine = MotionEngine::new(quiet());
        let poses = engine.tick(&mut pop, &ctx(1.0, Mode::Formed));
        assert_eq!(poses.len(), 2);
        assert_eq!(poses[1].position, Vec3::X);
        // First publication of a corrupt entity is its stored pose.
        assert_eq!(poses[0].position, chaos);
        assert_eq!(poses[0].scale, EntityKind::Particle.base_scale());
        assert_eq!(pop.get(EntityId(0)).unwrap().position(), chaos);
    }

    #[test]
    fn corrupt_entity_keeps_last_published_pose() {
        let good = Entity::new(EntityKind::Photo, Vec3::ZERO, Vec3::X, 1.0);
        let mut pop = Population::from_entities(vec![good]);
        let mut engine = MotionEngine::new(quiet());
        let before = engine.tick(&mut pop, &ctx(0.5, Mode::Formed))[0];

        pop.get_mut(EntityId(0)).unwrap().speed = -1.0;
        let after = engine.tick(&mut pop, &ctx(0.5, Mode::Formed))[0];
        assert_eq!(after, before);
    }

    #[test]
    fn corrupt_stored_pose_is_published_invisible() {
        let bad = Entity::new(EntityKind::Ornament, Vec3::ZERO, Vec3::X, 1.0)
            .placed_at(Vec3::splat(f32::NAN));
        let mut pop = Population::from_entities(vec![bad]);
        let mut engine = MotionEngine::new(quiet());
        let poses = engine.tick(&mut pop, &ctx(1.0, Mode::Formed));
        assert_eq!(poses[0].scale, 0.0);
        assert!(poses[0].position.is_finite());
    }

    #[test]
    fn formed_entities_face_outward() {
        let e = Entity::new(EntityKind::Photo, Vec3::ZERO, Vec3::new(5.0, 6.0, 0.0), 100.0);
        let mut pop = Population::from_entities(vec![e]);
        let mut engine = MotionEngine::new(BlendConfig { turn_rate: 1000.0, ..quiet() });
        engine.tick(&mut pop, &ctx(1.0, Mode::Formed));
        let fwd = pop.iter().next().unwrap().orientation() * Vec3::Z;
        assert!(fwd.dot(Vec3::X) > 0.999, "forward = {fwd:?}");
    }

    #[test]
    fn chaos_entities_face_camera() {
        let e = Entity::new(EntityKind::Photo, Vec3::new(0.0, 6.0, 0.0), Vec3::ZERO, 100.0);
        let mut pop = Population::from_entities(vec![e]);
        let mut engine = MotionEngine::new(BlendConfig { turn_rate: 1000.0, ..quiet() });
        engine.tick(&mut pop, &ctx(1.0, Mode::Chaos));
        let fwd = pop.iter().next().unwrap().orientation() * Vec3::Z;
        assert!(fwd.dot(Vec3::Z) > 0.999, "forward = {fwd:?}");
    }

    #[test]
    fn turning_is_gradual() {
        let e = Entity::new(EntityKind::Photo, Vec3::new(0.0, 6.0, 0.0), Vec3::ZERO, 1.0);
        let mut pop = Population::from_entities(vec![e]);
        let mut engine = MotionEngine::new(BlendConfig { turn_rate: 1.0, ..quiet() });
        let start = pop.iter().next().unwrap().orientation();
        // Camera behind the entity: a half turn is needed.
        let behind = TickContext { dt: 0.25, mode: Mode::Chaos, camera: Vec3::new(0.0, 6.0, -20.0) };
        engine.tick(&mut pop, &behind);
        let after = pop.iter().next().unwrap().orientation();
        let turned = start.angle_between(after);
        assert!(turned > 0.1 && turned < 3.0, "turned {turned}");
    }

    #[test]
    fn single_override_cycles_through_photos() {
        let mut pop = photos(3);
        let photo_ids: Vec<EntityId> = pop.ids_of_kind(EntityKind::Photo).collect();
        let mut engine = MotionEngine::new(quiet());
        let cam = Vec3::new(0.0, 6.0, 20.0);

        let mut picked = Vec::new();
        for _ in 0..4 {
            engine.handle_event(&GestureEvent::PointStarted, &mut pop, cam);
            let ActiveOverride::Single(id) = engine.active_override() else {
                panic!("expected single override");
            };
            picked.push(id);
            let held = pop.iter().filter(|e| e.override_target().is_some()).count();
            assert_eq!(held, 1);
            engine.handle_event(&GestureEvent::PointReleased, &mut pop, cam);
        }
        assert_eq!(picked, vec![photo_ids[0], photo_ids[1], photo_ids[2], photo_ids[0]]);
    }

    #[test]
    fn single_override_parks_in_front_of_camera() {
        let mut pop = photos(1);
        let mut engine = MotionEngine::new(quiet());
        let cam = Vec3::new(0.0, 6.0, 20.0);
        engine.install_override(&mut pop, cam);
        let ActiveOverride::Single(id) = engine.active_override() else { panic!() };
        let target = pop.get(id).unwrap().override_target().unwrap();
        assert!((target - Vec3::new(0.0, 6.0, 14.0)).length() < 1e-4);

        for _ in 0..2000 {
            engine.tick(&mut pop, &TickContext { dt: 0.05, mode: Mode::Formed, camera: cam });
        }
        let e = pop.get(id).unwrap();
        assert!((e.position() - target).length() < 1e-3);
        assert!((e.scale() - e.base_scale * 3.0).abs() < 1e-3);
    }

    #[test]
    fn population_override_covers_everyone() {
        let mut pop = photos(2);
        let mut engine = MotionEngine::new(BlendConfig {
            override_policy: OverridePolicy::Population,
            ..quiet()
        });
        engine.handle_event(&GestureEvent::PointStarted, &mut pop, Vec3::Z);
        assert_eq!(engine.active_override(), ActiveOverride::Population);
        assert!(pop.iter().all(|e| e.override_target().is_some()));
        engine.handle_event(&GestureEvent::PointReleased, &mut pop, Vec3::Z);
        assert!(pop.iter().all(|e| e.override_target().is_none()));
    }

    #[test]
    fn mode_change_clears_override_within_the_tick() {
        let mut pop = photos(2);
        let mut engine = MotionEngine::new(quiet());
        engine.tick(&mut pop, &ctx(0.016, Mode::Formed));
        engine.install_override(&mut pop, Vec3::new(0.0, 6.0, 20.0));
        assert_ne!(engine.active_override(), ActiveOverride::None);

        engine.tick(&mut pop, &ctx(0.016, Mode::Chaos));
        assert_eq!(engine.active_override(), ActiveOverride::None);
        assert!(pop.iter().all(|e| e.override_target().is_none()));
    }

    #[test]
    fn mode_changed_event_also_clears() {
        let mut pop = photos(2);
        let mut engine = MotionEngine::new(quiet());
        engine.install_override(&mut pop, Vec3::new(0.0, 6.0, 20.0));
        let ev = GestureEvent::ModeChanged { from: Mode::Formed, to: Mode::Chaos };
        engine.handle_event(&ev, &mut pop, Vec3::ZERO);
        assert_eq!(engine.active_override(), ActiveOverride::None);
    }

    #[test]
    fn sway_does_not_touch_stored_position() {
        let mut pop = one(1.0);
        let mut engine = MotionEngine::new(BlendConfig { sway_amplitude: 0.5, ..BlendConfig::default() });
        for _ in 0..30 {
            engine.tick(&mut pop, &ctx(1.0, Mode::Formed));
        }
        let stored = pop.iter().next().unwrap().position();
        assert!((stored - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
        let published = engine.poses()[0].position;
        assert!((published - stored).length() <= 0.5 + 1e-4);
    }

    proptest! {
        #[test]
        fn never_overshoots(
            speed in 0.01f32..20.0,
            dt in 0.001f32..0.5,
            tx in -50.0f32..50.0, ty in -50.0f32..50.0, tz in -50.0f32..50.0,
        ) {
            let target = Vec3::new(tx, ty, tz);
            let e = Entity::new(EntityKind::Particle, Vec3::ZERO, target, speed);
            let mut pop = Population::from_entities(vec![e]);
            let mut engine = MotionEngine::new(quiet());
            let initial = target.length();
            let mut last = initial;
            for _ in 0..400 {
                engine.tick(&mut pop, &ctx(dt, Mode::Formed));
                let d = (target - pop.iter().next().unwrap().position()).length();
                prop_assert!(d <= last + 1e-4);
                prop_assert!(d <= initial + 1e-4);
                last = d;
            }
        }
    }
}
