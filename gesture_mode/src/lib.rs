//! # gesture_mode
//!
//! Turns per-frame hand landmarks into a stable two-state mode and
//! one-shot point events.
//!
//! ```text
//!  HandFrame ──► GestureClassifier ──► Classification ──► ModeMachine
//!                                                           │
//!                         ModeSnapshot { mode, version, hand } ◄┘
//!                         GestureEvent::{ModeChanged, PointStarted, PointReleased}
//! ```
//!
//! | Gesture | Effect |
//! |---|---|
//! | Open hand, held | Mode → `Chaos` |
//! | Fist, held | Mode → `Formed` |
//! | Open → index point | `PointStarted` (once), `PointReleased` when the point ends |
//! | No hand | Streaks decay, hand signal cleared, mode kept |

pub mod landmarks;
pub mod pose;
pub mod classifier;
pub mod counter;
pub mod machine;

pub use landmarks::{Finger, HandFrame, LandmarkError, LANDMARK_COUNT};
pub use pose::HandPose;
pub use classifier::{Classification, ClassifierConfig, GestureCategory, GestureClassifier};
pub use counter::StreakCounter;
pub use machine::{
    GestureEvent, HandSignal, MachineConfig, Mode, ModeMachine, ModeSnapshot,
};
