//! Hand landmark frames as delivered by an external hand-landmark detector.
//!
//! A frame is 21 points in normalized image space (x, y in [0, 1], z is the
//! detector's relative depth).  Frames are transient: one per detection tick.

use glam::{Vec2, Vec3};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices
// ════════════════════════════════════════════════════════════════════════════

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:      usize = 0;
pub const THUMB_CMC:  usize = 1;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_IP:   usize = 3;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_PIP:  usize = 6;
pub const INDEX_DIP:  usize = 7;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_PIP:   usize = 14;
pub const RING_DIP:   usize = 15;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_DIP:  usize = 19;
pub const PINKY_TIP:  usize = 20;

/// One digit of the hand, in thumb-to-pinky order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// The four long fingers (everything but the thumb).
    pub const LONG: [Finger; 4] = [
        Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// Landmark chain from base joint to tip.
    pub fn chain(self) -> [usize; 4] {
        match self {
            Finger::Thumb  => [THUMB_CMC, THUMB_MCP, THUMB_IP, THUMB_TIP],
            Finger::Index  => [INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP],
            Finger::Middle => [MIDDLE_MCP, MIDDLE_PIP, MIDDLE_DIP, MIDDLE_TIP],
            Finger::Ring   => [RING_MCP, RING_PIP, RING_DIP, RING_TIP],
            Finger::Pinky  => [PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP],
        }
    }

    /// Joint the extension ratio is measured against.
    ///
    /// Long fingers use the knuckle (MCP).  The thumb's CMC sits almost on
    /// the wrist, so its MCP is used instead.
    pub fn base(self) -> usize {
        match self {
            Finger::Thumb => THUMB_MCP,
            other         => other.chain()[0],
        }
    }

    pub fn tip(self) -> usize {
        self.chain()[3]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("expected 21 landmarks, got {0}")]
    WrongCount(usize),

    #[error("flat landmark buffer length {0} is not a multiple of 3")]
    Ragged(usize),

    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// One detected hand: 21 validated landmark points.
#[derive(Clone, Debug, PartialEq)]
pub struct HandFrame {
    points: [Vec3; LANDMARK_COUNT],
}

impl HandFrame {
    /// Build a frame from exactly 21 points.  Every coordinate must be finite.
    pub fn from_points(points: &[Vec3]) -> Result<Self, LandmarkError> {
        if points.len() != LANDMARK_COUNT {
            return Err(LandmarkError::WrongCount(points.len()));
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(LandmarkError::NonFinite { index });
        }
        let mut out = [Vec3::ZERO; LANDMARK_COUNT];
        out.copy_from_slice(points);
        Ok(HandFrame { points: out })
    }

    /// Build a frame from an interleaved `x, y, z, x, y, z, …` buffer.
    pub fn from_flat(flat: &[f32]) -> Result<Self, LandmarkError> {
        if flat.len() % 3 != 0 {
            return Err(LandmarkError::Ragged(flat.len()));
        }
        let points: Vec<Vec3> = flat
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        Self::from_points(&points)
    }

    pub fn point(&self, index: usize) -> Vec3 {
        self.points[index]
    }

    pub fn points(&self) -> &[Vec3; LANDMARK_COUNT] {
        &self.points
    }

    /// Normalized hand center: mean of the wrist and the four long-finger
    /// knuckles, projected onto the image plane.
    pub fn center(&self) -> Vec2 {
        let sum = Finger::LONG
            .iter()
            .map(|f| self.points[f.base()])
            .fold(self.points[WRIST], |acc, p| acc + p);
        (sum / 5.0).truncate()
    }

    /// Ratio of tip→wrist to base→wrist distance for one finger.
    ///
    /// Returns 0.0 when the base coincides with the wrist, which makes the
    /// finger read as curled rather than dividing by zero.
    pub fn extension_ratio(&self, finger: Finger) -> f32 {
        let wrist = self.points[WRIST];
        let base  = self.points[finger.base()].distance(wrist);
        if base <= f32::EPSILON {
            return 0.0;
        }
        self.points[finger.tip()].distance(wrist) / base
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
