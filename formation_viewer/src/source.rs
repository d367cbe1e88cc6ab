//! Landmark sources — anything that produces hand detections on its own
//! thread.
//!
//! The public interface is a [`Detection`] delivered over a `mpsc` channel
//! once per detector frame.  Consumers don't need to know whether frames
//! come from a camera pipeline or the keyboard simulator.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use glam::Vec2;
use gesture_mode::{HandFrame, HandPose, LandmarkError};
use thiserror::Error;
use tracing::debug;

// ════════════════════════════════════════════════════════════════════════════
// Detection
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("malformed landmarks: {0}")]
    Landmarks(#[from] LandmarkError),

    #[error("detector dropped a frame")]
    Dropout,
}

/// One detector frame: a hand, no hand, or a failure.
pub type Detection = Result<Option<HandFrame>, DetectorError>;

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`Detection`]s over a channel.  `run` returns
/// when the receiver hangs up or the source runs dry.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<Detection>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S) -> Receiver<Detection> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// Simulation — keyboard/mouse driven synthetic hand
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the preview window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Show this pose from now on.
    Pose(SimPose),
    /// Hand center in normalized image coordinates.
    Cursor(Vec2),
    /// Report one detector failure on the next frame.
    Glitch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPose {
    Hidden,   // N
    Open,     // O
    Fist,     // F
    Pointing, // P
    Peace,    // V
}

impl SimPose {
    fn hand_pose(self) -> Option<HandPose> {
        match self {
            SimPose::Hidden   => None,
            SimPose::Open     => Some(HandPose::open()),
            SimPose::Fist     => Some(HandPose::fist()),
            SimPose::Pointing => Some(HandPose::pointing()),
            SimPose::Peace    => Some(HandPose::peace()),
        }
    }
}

/// The simulated hand between frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimHand {
    pub pose:   SimPose,
    pub cursor: Vec2,
    pub size:   f32,
    glitch:     bool,
}

impl SimHand {
    pub fn new(size: f32) -> Self {
        SimHand { pose: SimPose::Hidden, cursor: Vec2::splat(0.5), size, glitch: false }
    }

    pub fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Pose(p)   => self.pose = p,
            SimInput::Cursor(c) => self.cursor = c,
            SimInput::Glitch    => self.glitch = true,
        }
    }

    /// Produce the frame a detector would report right now.
    pub fn detect(&mut self) -> Detection {
        if std::mem::take(&mut self.glitch) {
            return Err(DetectorError::Dropout);
        }
        match self.pose.hand_pose() {
            None       => Ok(None),
            Some(pose) => Ok(Some(pose.to_frame(self.cursor, self.size)?)),
        }
    }
}

/// Landmark source driven by [`SimInput`] events from the preview window.
///
/// Emits one detection every `period`.  Stops as soon as either the input
/// channel or the detection channel is closed.
pub struct SimLandmarkSource {
    pub rx:     Receiver<SimInput>,
    pub period: Duration,
    pub hand:   SimHand,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>, period: Duration, hand_size: f32) -> Self {
        SimLandmarkSource { rx, period, hand: SimHand::new(hand_size) }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn run(self: Box<Self>, tx: Sender<Detection>) {
        let SimLandmarkSource { rx, period, mut hand } = *self;
        loop {
            loop {
                match rx.try_recv() {
                    Ok(input) => hand.apply(input),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        debug!("simulator input closed");
                        return;
                    }
                }
            }
            if tx.send(hand.detect()).is_err() {
                return;
            }
            thread::sleep(period);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_mode::{GestureCategory, GestureClassifier};

    #[test]
    fn hidden_hand_reports_no_frame() {
        let mut hand = SimHand::new(0.1);
        assert!(matches!(hand.detect(), Ok(None)));
    }

    #[test]
    fn poses_classify_as_expected() {
        let classifier = GestureClassifier::default();
        let mut hand = SimHand::new(0.1);
        for (pose, want) in [
            (SimPose::Open,     GestureCategory::Open),
            (SimPose::Fist,     GestureCategory::Fist),
            (SimPose::Pointing, GestureCategory::Pointing),
            (SimPose::Peace,    GestureCategory::Ambiguous),
        ] {
            hand.apply(SimInput::Pose(pose));
            let frame = hand.detect().unwrap().unwrap();
            assert_eq!(classifier.classify(Some(&frame)).category, want, "{pose:?}");
        }
    }

    #[test]
    fn cursor_moves_hand_center() {
        let mut hand = SimHand::new(0.1);
        hand.apply(SimInput::Pose(SimPose::Fist));
        hand.apply(SimInput::Cursor(Vec2::new(0.2, 0.7)));
        let frame = hand.detect().unwrap().unwrap();
        assert!((frame.center() - Vec2::new(0.2, 0.7)).length() < 1e-4);
    }

    #[test]
    fn glitch_fails_exactly_one_frame() {
        let mut hand = SimHand::new(0.1);
        hand.apply(SimInput::Pose(SimPose::Open));
        hand.apply(SimInput::Glitch);
        assert!(matches!(hand.detect(), Err(DetectorError::Dropout)));
        assert!(matches!(hand.detect(), Ok(Some(_))));
    }

    #[test]
    fn source_stops_when_input_closes() {
        let (sim_tx, sim_rx) = mpsc::channel();
        let rx = spawn_landmark_source(
            SimLandmarkSource::new(sim_rx, Duration::from_millis(1), 0.1),
        );
        sim_tx.send(SimInput::Pose(SimPose::Open)).unwrap();
        let seen_hand = rx.iter().take(50).any(|d| matches!(d, Ok(Some(_))));
        assert!(seen_hand);

        drop(sim_tx);
        // The iterator ends once the source thread has returned.
        let remaining = rx.iter().count();
        assert!(remaining < 1000);
    }
}
