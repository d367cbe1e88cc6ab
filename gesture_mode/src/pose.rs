//! Synthetic hand poses.
//!
//! Builds a plausible 21-point [`HandFrame`] from per-finger extension
//! ratios.  The simulated landmark source drives the whole pipeline with
//! these, and tests use them to hit exact classifier ratios.

use glam::{Vec2, Vec3};

use crate::landmarks::{Finger, HandFrame, LandmarkError, LANDMARK_COUNT, THUMB_CMC, WRIST};

/// Per-finger tip/base distance ratios, thumb first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandPose {
    pub ratios: [f32; 5],
}

impl HandPose {
    pub fn new(thumb: f32, index: f32, middle: f32, ring: f32, pinky: f32) -> Self {
        HandPose { ratios: [thumb, index, middle, ring, pinky] }
    }

    /// Every finger spread.
    pub fn open() -> Self { HandPose::new(1.6, 2.0, 2.0, 2.0, 2.0) }

    /// Every finger curled toward the palm.
    pub fn fist() -> Self { HandPose::new(1.0, 1.0, 1.0, 1.0, 1.0) }

    /// Index extended, the rest curled.
    pub fn pointing() -> Self { HandPose::new(1.0, 2.0, 1.0, 1.0, 1.0) }

    /// Index and middle extended: neither open, fist nor pointing.
    pub fn peace() -> Self { HandPose::new(1.0, 2.0, 2.0, 1.0, 1.0) }

    fn ratio(&self, finger: Finger) -> f32 {
        self.ratios[finger as usize]
    }

    /// Lay the pose out in normalized image space.
    ///
    /// `center` is where [`HandFrame::center`] of the result will land and
    /// `size` is the wrist→knuckle distance.  Fingers fan upward (negative
    /// image y) with the thumb to the left.  Non-finite ratios surface as
    /// [`LandmarkError::NonFinite`].
    pub fn to_frame(&self, center: Vec2, size: f32) -> Result<HandFrame, LandmarkError> {
        let mut pts = [Vec3::ZERO; LANDMARK_COUNT];

        for (i, finger) in Finger::ALL.iter().enumerate() {
            // Thumb at -60°, pinky at +30° from straight up.
            let angle = -60.0_f32.to_radians() + i as f32 * 22.5_f32.to_radians();
            let dir   = Vec3::new(angle.sin(), -angle.cos(), 0.0);
            let base  = dir * size;
            let tip   = dir * size * self.ratio(*finger);
            let chain = finger.chain();

            if *finger == Finger::Thumb {
                pts[THUMB_CMC] = base * 0.5;
                pts[chain[1]]  = base;
                pts[chain[2]]  = base.lerp(tip, 0.5);
                pts[chain[3]]  = tip;
            } else {
                pts[chain[0]] = base;
                pts[chain[1]] = base.lerp(tip, 1.0 / 3.0);
                pts[chain[2]] = base.lerp(tip, 2.0 / 3.0);
                pts[chain[3]] = tip;
            }
        }
        pts[WRIST] = Vec3::ZERO;

        // Shift so the wrist+knuckle mean sits on `center`.
        let knuckles = Finger::LONG
            .iter()
            .fold(pts[WRIST], |acc, f| acc + pts[f.base()])
            / 5.0;
        let offset = center.extend(0.0) - knuckles;
        for p in pts.iter_mut() {
            *p += offset;
        }

        HandFrame::from_points(&pts)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_survive_layout() {
        let pose  = HandPose::new(1.3, 2.0, 1.5, 1.0, 0.8);
        let frame = pose.to_frame(Vec2::new(0.5, 0.5), 0.1).unwrap();
        for finger in Finger::ALL {
            let got = frame.extension_ratio(finger);
            assert!(
                (got - pose.ratio(finger)).abs() < 1e-4,
                "{finger:?}: {got} vs {}", pose.ratio(finger)
            );
        }
    }

    #[test]
    fn center_lands_where_asked() {
        let frame = HandPose::open().to_frame(Vec2::new(0.25, 0.7), 0.08).unwrap();
        let c = frame.center();
        assert!((c.x - 0.25).abs() < 1e-5);
        assert!((c.y - 0.7).abs() < 1e-5);
    }

    #[test]
    fn nan_ratio_is_rejected() {
        let pose = HandPose::new(f32::NAN, 2.0, 2.0, 2.0, 2.0);
        assert!(pose.to_frame(Vec2::splat(0.5), 0.1).is_err());
    }
}
