//! Per-frame gesture classification.
//!
//! Pure function of one [`HandFrame`]: no history, no side effects.
//! A finger counts as extended when its tip is sufficiently farther from the
//! wrist than its base joint is.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::landmarks::{Finger, HandFrame};

/// Discrete gesture read from a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureCategory {
    Open,
    Fist,
    Pointing,
    Ambiguous,
    /// No hand in view (or the frame was unusable).
    None,
}

/// Extension thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Tip/base ratio above which a long finger is extended.
    pub finger_ratio: f32,
    /// Looser ratio for the thumb, whose base sits closer to the wrist.
    pub thumb_ratio: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            finger_ratio: 1.5,
            thumb_ratio:  1.2,
        }
    }
}

/// Result of classifying one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub category: GestureCategory,
    /// Number of extended digits, 0–5.
    pub extended: u8,
    /// Normalized hand center, `None` when no hand was seen.
    pub center: Option<Vec2>,
}

impl Classification {
    pub const NONE: Classification = Classification {
        category: GestureCategory::None,
        extended: 0,
        center:   None,
    };
}

#[derive(Clone, Debug, Default)]
pub struct GestureClassifier {
    pub config: ClassifierConfig,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        GestureClassifier { config }
    }

    fn is_extended(&self, frame: &HandFrame, finger: Finger) -> bool {
        let threshold = match finger {
            Finger::Thumb => self.config.thumb_ratio,
            _             => self.config.finger_ratio,
        };
        frame.extension_ratio(finger) > threshold
    }

    /// Classify one frame.  `None` input yields [`GestureCategory::None`].
    pub fn classify(&self, frame: Option<&HandFrame>) -> Classification {
        let Some(frame) = frame else {
            return Classification::NONE;
        };

        let mut ext = [false; 5];
        for finger in Finger::ALL {
            ext[finger as usize] = self.is_extended(frame, finger);
        }
        let extended = ext.iter().filter(|e| **e).count() as u8;

        // Pointing only looks at the long fingers; the thumb may do anything.
        let [_, index, middle, ring, pinky] = ext;
        let pointing = index && !middle && !ring && !pinky;

        let category = if pointing {
            GestureCategory::Pointing
        } else if extended >= 4 {
            GestureCategory::Open
        } else if extended <= 1 {
            GestureCategory::Fist
        } else {
            GestureCategory::Ambiguous
        };

        Classification {
            category,
            extended,
            center: Some(frame.center()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
