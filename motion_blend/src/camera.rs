//! Orbit camera driven by the hand signal or an idle clock.
//!
//! Each tick exactly one driver moves the camera:
//!
//! | Condition | Driver |
//! |---|---|
//! | manual interaction active | nothing here; [`OrbitCamera::drag`] moves it |
//! | hand detected | hand x → azimuth, hand y → polar, smoothed |
//! | no hand, cooldown running | camera holds still |
//! | no hand, cooldown over | idle auto-rotate at a fixed polar angle |

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::engine::convergence_step;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Point the camera orbits and looks at.
    pub target: Vec3,
    pub radius: f32,
    /// Azimuth range covered by hand x ∈ [0, 1], in multiples of π.
    pub azimuth_span: f32,
    /// Added to hand y before clamping to [0, 1].
    pub hand_y_offset: f32,
    pub polar_min: f32,
    pub polar_max: f32,
    /// Fraction of the remaining angle covered per second when following the hand.
    pub follow_rate: f32,
    /// Idle auto-rotation speed, radians per second.
    pub idle_rate: f32,
    pub idle_polar: f32,
    /// Seconds after manual interaction ends before auto-rotation resumes.
    pub cooldown: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            target:        Vec3::new(0.0, 5.0, 0.0),
            radius:        24.0,
            azimuth_span:  2.0,
            hand_y_offset: 0.0,
            polar_min:     0.9,
            polar_max:     1.9,
            follow_rate:   3.0,
            idle_rate:     0.15,
            idle_polar:    1.35,
            cooldown:      2.5,
        }
    }
}

/// Orbit angles published to the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitState {
    pub azimuth: f32,
    pub polar:   f32,
    pub radius:  f32,
}

/// Which driver moved the camera on the last update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraDrive {
    Manual,
    Hand,
    Holding,
    Idle,
}

/// Wrap an angle into (-π, π].
pub fn wrap_angle(a: f32) -> f32 {
    let w = (a + PI).rem_euclid(TAU) - PI;
    if w <= -PI { w + TAU } else { w }
}

/// Signed shortest rotation from `from` to `to`.
pub fn shortest_arc(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

pub struct OrbitCamera {
    pub config:  CameraConfig,
    azimuth:     f32,
    polar:       f32,
    interacting: bool,
    cooldown:    f32,
}

impl OrbitCamera {
    pub fn new(config: CameraConfig) -> Self {
        OrbitCamera {
            config,
            azimuth:     0.0,
            polar:       config.idle_polar,
            interacting: false,
            cooldown:    0.0,
        }
    }

    pub fn state(&self) -> OrbitState {
        OrbitState { azimuth: self.azimuth, polar: self.polar, radius: self.config.radius }
    }

    /// World-space eye position.
    pub fn position(&self) -> Vec3 {
        let (sp, cp) = self.polar.sin_cos();
        let (sa, ca) = self.azimuth.sin_cos();
        self.config.target + Vec3::new(sp * sa, cp, sp * ca) * self.config.radius
    }

    /// Set by direct user input.  Ending an interaction starts the cooldown.
    pub fn set_interacting(&mut self, active: bool) {
        if self.interacting && !active {
            self.cooldown = self.config.cooldown;
        }
        self.interacting = active;
    }

    pub fn is_interacting(&self) -> bool { self.interacting }

    /// Apply a manual orbit delta in radians.  Ignored unless interacting.
    pub fn drag(&mut self, d_azimuth: f32, d_polar: f32) {
        if !self.interacting {
            return;
        }
        self.azimuth = wrap_angle(self.azimuth + d_azimuth);
        self.polar   = (self.polar + d_polar).clamp(self.config.polar_min, self.config.polar_max);
    }

    /// Angles the hand position asks for.
    pub fn hand_targets(&self, hand: Vec2) -> (f32, f32) {
        let c = &self.config;
        let azimuth = wrap_angle((hand.x.clamp(0.0, 1.0) - 0.5) * c.azimuth_span * PI);
        let t       = (hand.y + c.hand_y_offset).clamp(0.0, 1.0);
        let polar   = c.polar_min + t * (c.polar_max - c.polar_min);
        (azimuth, polar)
    }

    /// Advance by `dt` seconds.  `hand` is the normalized hand position when
    /// a hand is in view.
    pub fn update(&mut self, dt: f32, hand: Option<Vec2>) -> CameraDrive {
        let dt = dt.max(0.0);
        if self.interacting {
            return CameraDrive::Manual;
        }
        self.cooldown = (self.cooldown - dt).max(0.0);

        if let Some(hand) = hand {
            let (az, polar) = self.hand_targets(hand);
            let k = convergence_step(dt, self.config.follow_rate);
            self.azimuth = wrap_angle(self.azimuth + shortest_arc(self.azimuth, az) * k);
            self.polar  += (polar - self.polar) * k;
            return CameraDrive::Hand;
        }

        if self.cooldown > 0.0 {
            return CameraDrive::Holding;
        }

        let k = convergence_step(dt, self.config.follow_rate);
        self.azimuth = wrap_angle(self.azimuth + self.config.idle_rate * dt);
        self.polar  += (self.config.idle_polar - self.polar) * k;
        CameraDrive::Idle
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        OrbitCamera::new(CameraConfig::default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn deg(d: f32) -> f32 { d.to_radians() }

    #[test]
    fn shortest_arc_crosses_the_seam() {
        let d = shortest_arc(deg(-179.0), deg(179.0));
        assert!((d - deg(-2.0)).abs() < 1e-4, "{}", d.to_degrees());
        let d = shortest_arc(deg(179.0), deg(-179.0));
        assert!((d - deg(2.0)).abs() < 1e-4);
    }

    #[test]
    fn hand_follow_takes_the_short_way() {
        let mut cam = OrbitCamera::new(CameraConfig { follow_rate: 1.0, ..Default::default() });
        cam.azimuth = deg(-179.0);
        // x that maps to +179° with a 2π span.
        let x = 0.5 + 179.0 / 360.0;
        cam.update(0.5, Some(Vec2::new(x, 0.5)));
        // Half of a 2° move, across the seam.
        let az = cam.state().azimuth;
        assert!((az.abs() - PI).abs() < 1e-3, "{}", az.to_degrees());

        cam.update(1.0, Some(Vec2::new(x, 0.5)));
        assert!((cam.state().azimuth - deg(179.0)).abs() < 1e-3);
    }

    #[test]
    fn hand_y_maps_into_polar_band() {
        let cam = OrbitCamera::default();
        let (_, top)    = cam.hand_targets(Vec2::new(0.5, -3.0));
        let (_, bottom) = cam.hand_targets(Vec2::new(0.5, 4.0));
        assert_eq!(top, cam.config.polar_min);
        assert_eq!(bottom, cam.config.polar_max);
        let (az, _) = cam.hand_targets(Vec2::new(0.5, 0.5));
        assert_eq!(az, 0.0);
    }

    #[test]
    fn idle_rotates_at_constant_rate() {
        let mut cam = OrbitCamera::default();
        let before = cam.state().azimuth;
        assert_eq!(cam.update(1.0, None), CameraDrive::Idle);
        let moved = shortest_arc(before, cam.state().azimuth);
        assert!((moved - cam.config.idle_rate).abs() < 1e-5);
        assert!((cam.state().polar - cam.config.idle_polar).abs() < 1e-5);
    }

    #[test]
    fn manual_interaction_suppresses_idle_until_cooldown_ends() {
        let mut cam = OrbitCamera::default();
        cam.set_interacting(true);
        assert_eq!(cam.update(1.0, None), CameraDrive::Manual);
        cam.drag(0.3, 0.0);
        assert!((cam.state().azimuth - 0.3).abs() < 1e-6);

        cam.set_interacting(false);
        assert_eq!(cam.update(1.0, None), CameraDrive::Holding);
        assert!((cam.state().azimuth - 0.3).abs() < 1e-6);
        assert_eq!(cam.update(2.0, None), CameraDrive::Idle);
    }

    #[test]
    fn drag_without_interaction_is_ignored() {
        let mut cam = OrbitCamera::default();
        cam.drag(1.0, 1.0);
        assert_eq!(cam.state().azimuth, 0.0);
    }

    #[test]
    fn position_sits_on_the_sphere() {
        let cam = OrbitCamera::default();
        let d = cam.position().distance(cam.config.target);
        assert!((d - cam.config.radius).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn follow_never_takes_the_long_way(from in -PI..PI, to in -PI..PI) {
            let arc = shortest_arc(from, to);
            prop_assert!(arc.abs() <= PI + 1e-5);
            prop_assert!((wrap_angle(from + arc) - wrap_angle(to)).abs() < 1e-3
                || (wrap_angle(from + arc).abs() - PI).abs() < 1e-3);
        }
    }
}
