//! Debounced mode state machine.
//!
//! Turns a noisy stream of per-frame [`Classification`]s into
//!
//! * a persistent [`Mode`] that only flips after `confirm_frames` of
//!   consistent evidence, and
//! * edge-triggered point events: [`GestureEvent::PointStarted`] fires once
//!   per OPEN → POINTING transition and [`GestureEvent::PointReleased`] when
//!   the pointing hand lets go.
//!
//! The two paths use separate thresholds: mode changes favour stability,
//! the point edge favours latency.

use std::fmt::Display;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{Classification, GestureCategory, GestureClassifier};
use crate::counter::StreakCounter;
use crate::landmarks::HandFrame;

// ════════════════════════════════════════════════════════════════════════════
// Mode / events / snapshot
// ════════════════════════════════════════════════════════════════════════════

/// Which layout every entity is heading for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Dispersed arrangement.
    Chaos,
    /// Assembled arrangement.
    #[default]
    Formed,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Chaos  => "CHAOS",
            Mode::Formed => "FORMED",
        }
    }
}

/// Discrete notifications produced by [`ModeMachine::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureEvent {
    ModeChanged { from: Mode, to: Mode },
    PointStarted,
    PointReleased,
}

/// Normalized hand position as last seen by the detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandSignal {
    pub x: f32,
    pub y: f32,
    pub detected: bool,
}

impl Default for HandSignal {
    fn default() -> Self {
        HandSignal { x: 0.5, y: 0.5, detected: false }
    }
}

impl HandSignal {
    pub fn position(&self) -> Option<Vec2> {
        self.detected.then(|| Vec2::new(self.x, self.y))
    }
}

/// Everything the animation side reads from the gesture side, once per tick.
///
/// `version` increases on every mode change, so readers can tell two
/// snapshots with the same mode apart when a round trip happened in between.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModeSnapshot {
    pub mode:    Mode,
    pub version: u64,
    pub hand:    HandSignal,
}

// ════════════════════════════════════════════════════════════════════════════
// Config
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Consecutive OPEN / FIST frames needed to change mode.
    pub confirm_frames: u32,
    /// Consecutive POINTING frames needed to fire the point edge.
    pub point_frames: u32,
    /// Upper bound for every streak counter.
    pub streak_cap: u32,
    /// How much each NONE / AMBIGUOUS frame takes off every streak.
    pub decay_step: u32,
    pub initial_mode: Mode,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            confirm_frames: 5,
            point_frames:   2,
            streak_cap:     30,
            decay_step:     1,
            initial_mode:   Mode::Formed,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PointLatch
// ════════════════════════════════════════════════════════════════════════════

/// Edge detector for the point gesture.
///
/// Primed by an OPEN hand, consumed by firing.  Once fired it stays quiet
/// until released and primed again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PointLatch {
    primed: bool,
    fired:  bool,
}

impl PointLatch {
    fn prime(&mut self)  { self.primed = true; }
    fn disarm(&mut self) { self.primed = false; }

    fn try_fire(&mut self) -> bool {
        if self.primed && !self.fired {
            self.primed = false;
            self.fired  = true;
            true
        } else {
            false
        }
    }

    /// Returns true if there was an active point to release.
    fn release(&mut self) -> bool {
        std::mem::replace(&mut self.fired, false)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ModeMachine
// ════════════════════════════════════════════════════════════════════════════

pub struct ModeMachine {
    pub config: MachineConfig,
    classifier: GestureClassifier,

    mode:    Mode,
    version: u64,
    hand:    HandSignal,

    open:  StreakCounter,
    fist:  StreakCounter,
    point: StreakCounter,
    latch: PointLatch,

    last_category: GestureCategory,
}

impl ModeMachine {
    pub fn new(config: MachineConfig, classifier: GestureClassifier) -> Self {
        let cap = config.streak_cap;
        ModeMachine {
            config,
            classifier,
            mode:    config.initial_mode,
            version: 0,
            hand:    HandSignal::default(),
            open:    StreakCounter::new(cap),
            fist:    StreakCounter::new(cap),
            point:   StreakCounter::new(cap),
            latch:   PointLatch::default(),
            last_category: GestureCategory::None,
        }
    }

    pub fn mode(&self) -> Mode { self.mode }
    pub fn hand(&self) -> HandSignal { self.hand }
    pub fn last_category(&self) -> GestureCategory { self.last_category }

    pub fn snapshot(&self) -> ModeSnapshot {
        ModeSnapshot { mode: self.mode, version: self.version, hand: self.hand }
    }

    /// Whether a point edge has fired and not yet been released.
    pub fn is_pointing(&self) -> bool { self.latch.fired }

    /// Classify one detector frame and feed it through the machine.
    pub fn observe(&mut self, frame: Option<&HandFrame>) -> Vec<GestureEvent> {
        let c = self.classifier.classify(frame);
        self.update(&c)
    }

    /// Like [`observe`](Self::observe), but for a detector call that may
    /// have failed.  A failure counts as "no hand" for this frame.
    pub fn observe_detection<E: Display>(
        &mut self,
        detection: Result<Option<HandFrame>, E>,
    ) -> Vec<GestureEvent> {
        match detection {
            Ok(frame) => self.observe(frame.as_ref()),
            Err(e) => {
                warn!(error = %e, "hand detector failed; treating frame as no hand");
                self.update(&Classification::NONE)
            }
        }
    }

    /// Advance the machine by one classified frame.
    pub fn update(&mut self, c: &Classification) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        let step = self.config.decay_step;

        if c.category != GestureCategory::Pointing {
            self.release_point(&mut events);
        }

        match c.category {
            GestureCategory::Open => {
                self.open.bump();
                self.fist.reset();
                self.point.reset();
                self.latch.prime();
                if self.open.reached(self.config.confirm_frames) {
                    self.confirm(Mode::Chaos, &mut events);
                }
            }
            GestureCategory::Fist => {
                self.fist.bump();
                self.open.reset();
                self.point.reset();
                self.latch.disarm();
                if self.fist.reached(self.config.confirm_frames) {
                    self.confirm(Mode::Formed, &mut events);
                }
            }
            GestureCategory::Pointing => {
                self.point.bump();
                self.open.reset();
                self.fist.reset();
                if self.point.reached(self.config.point_frames) && self.latch.try_fire() {
                    info!("point edge fired");
                    events.push(GestureEvent::PointStarted);
                }
            }
            GestureCategory::Ambiguous => {
                self.decay_all(step);
            }
            GestureCategory::None => {
                self.decay_all(step);
                self.latch.disarm();
            }
        }

        match c.center {
            Some(p) => self.hand = HandSignal { x: p.x, y: p.y, detected: true },
            None    => self.hand = HandSignal::default(),
        }

        if c.category != self.last_category {
            debug!(
                from = ?self.last_category, to = ?c.category,
                open = self.open.value(), fist = self.fist.value(), point = self.point.value(),
                "gesture category changed"
            );
        }
        self.last_category = c.category;
        events
    }

    /// Force a mode, e.g. from a UI toggle.  Streaks restart from zero so
    /// an old streak cannot immediately undo the choice.
    pub fn set_mode(&mut self, mode: Mode) -> Option<GestureEvent> {
        self.open.reset();
        self.fist.reset();
        let mut events = Vec::with_capacity(1);
        self.confirm(mode, &mut events);
        events.pop()
    }

    fn confirm(&mut self, to: Mode, events: &mut Vec<GestureEvent>) {
        if self.mode == to {
            return;
        }
        let from = self.mode;
        self.mode = to;
        self.version += 1;
        info!(from = from.name(), to = to.name(), version = self.version, "mode changed");
        events.push(GestureEvent::ModeChanged { from, to });
    }

    fn release_point(&mut self, events: &mut Vec<GestureEvent>) {
        if self.latch.release() {
            info!("point released");
            events.push(GestureEvent::PointReleased);
        }
    }

    fn decay_all(&mut self, step: u32) {
        self.open.decay(step);
        self.fist.decay(step);
        self.point.decay(step);
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        ModeMachine::new(MachineConfig::default(), GestureClassifier::default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
