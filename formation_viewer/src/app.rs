//! Top-level application state.
//!
//! `AppState` owns the `ModeMachine`, the `Population`, the `MotionEngine`
//! and the `OrbitCamera`.  It feeds detections through the machine, routes
//! the resulting events to the engine, and advances both animation
//! pipelines once per rendered frame.

use std::path::Path;
use std::sync::mpsc::{self, TryRecvError};
use std::time::Instant;

use gesture_mode::{GestureClassifier, GestureEvent, Mode, ModeMachine, ModeSnapshot};
use motion_blend::{
    ActiveOverride, CameraDrive, MotionEngine, OrbitCamera, Population, PopulationConfig,
    PopulationError, Pose, TickContext,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, ViewerConfig};
use crate::source::{spawn_landmark_source, Detection, SimInput, SimLandmarkSource};
use crate::visualizer::{FrameInput, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot build population: {0}")]
    Population(#[from] PopulationError),

    #[error("cannot open preview window: {0}")]
    Window(String),
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── gesture pipeline ─────────────────────────────────────────────────
    machine:    ModeMachine,

    // ── animation pipeline ───────────────────────────────────────────────
    population: Population,
    engine:     MotionEngine,
    camera:     OrbitCamera,
    drive:      CameraDrive,

    // ── status message ───────────────────────────────────────────────────
    pub status: String,
    last_event: Option<GestureEvent>,
}

impl AppState {
    pub fn new(cfg: &ViewerConfig) -> Result<Self, AppError> {
        let machine = ModeMachine::new(cfg.machine, GestureClassifier::new(cfg.classifier));
        let population = Population::build(&cfg.population)?;
        let mode = machine.mode();

        Ok(AppState {
            machine,
            population,
            engine:     MotionEngine::new(cfg.blend),
            camera:     OrbitCamera::new(cfg.camera),
            drive:      CameraDrive::Idle,
            status:     format!("Ready — mode {}", mode.name()),
            last_event: None,
        })
    }

    // ── process one detector frame ───────────────────────────────────────

    pub fn handle_detection(&mut self, detection: Detection) {
        for event in self.machine.observe_detection(detection) {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: GestureEvent) {
        let eye = self.camera.position();
        self.engine.handle_event(&event, &mut self.population, eye);

        self.status = match event {
            GestureEvent::ModeChanged { from, to } => {
                format!("MODE {} → {}", from.name(), to.name())
            }
            GestureEvent::PointStarted => match self.engine.active_override() {
                ActiveOverride::Single(id) => format!("POINT — entity {} to the front", id.0),
                ActiveOverride::Population => "POINT — whole formation zoomed".to_string(),
                ActiveOverride::None       => "POINT — nothing to show".to_string(),
            },
            GestureEvent::PointReleased => "POINT released".to_string(),
        };
        self.last_event = Some(event);
    }

    /// Flip the mode from the UI, bypassing the gesture streaks.
    pub fn toggle_mode(&mut self) {
        let next = match self.machine.mode() {
            Mode::Chaos  => Mode::Formed,
            Mode::Formed => Mode::Chaos,
        };
        if let Some(event) = self.machine.set_mode(next) {
            self.apply_event(event);
        }
    }

    /// Replace the population if the counts changed.
    pub fn resize_population(&mut self, cfg: &PopulationConfig) -> Result<bool, AppError> {
        let rebuilt = self.population.resize(cfg)?;
        if rebuilt {
            self.engine.reset();
            self.status = format!("REBUILT — {} entities", self.population.len());
        }
        Ok(rebuilt)
    }

    // ── manual camera control ────────────────────────────────────────────

    pub fn drag_camera(&mut self, d_azimuth: f32, d_polar: f32) {
        self.camera.set_interacting(true);
        self.camera.drag(d_azimuth, d_polar);
    }

    pub fn release_camera(&mut self) {
        self.camera.set_interacting(false);
    }

    // ── Per-frame tick ───────────────────────────────────────────────────

    pub fn tick(&mut self, dt: f32) {
        let snapshot = self.machine.snapshot();
        self.drive = self.camera.update(dt, snapshot.hand.position());
        let ctx = TickContext { dt, mode: snapshot.mode, camera: self.camera.position() };
        self.engine.tick(&mut self.population, &ctx);
    }

    // ── Accessors for the render loop ────────────────────────────────────

    pub fn snapshot(&self)   -> ModeSnapshot          { self.machine.snapshot() }
    pub fn poses(&self)      -> &[Pose]               { self.engine.poses() }
    pub fn population(&self) -> &Population           { &self.population }
    pub fn camera(&self)     -> &OrbitCamera          { &self.camera }
    pub fn drive(&self)      -> CameraDrive           { self.drive }
    pub fn override_state(&self) -> ActiveOverride    { self.engine.active_override() }
    pub fn last_event(&self) -> Option<GestureEvent>  { self.last_event }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Load `path` if given, otherwise fall back to the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ViewerConfig, AppError> {
    match path {
        Some(path) => Ok(ViewerConfig::load(path)?),
        None       => Ok(ViewerConfig::default()),
    }
}

/// Run the full application.
///
/// Creates the preview window and the simulated landmark source, then drives
/// the detection/tick/render loop at ~60 fps until the window closes.
pub fn run(cfg: ViewerConfig) -> Result<(), AppError> {
    // ── Sim landmark channel ─────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let source = SimLandmarkSource::new(
        sim_rx,
        cfg.simulator.frame_period(),
        cfg.simulator.hand_size,
    );
    let detections = spawn_landmark_source(source);

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(sim_tx)?;

    // ── App state ────────────────────────────────────────────────────────
    let mut app = AppState::new(&cfg)?;
    info!(entities = app.population().len(), mode = app.snapshot().mode.name(), "viewer started");

    let mut last = Instant::now();
    while vis.is_open() {
        // 1. Poll window input
        let FrameInput { quit, toggle_mode, drag } = vis.poll_input();
        if quit { break; }
        if toggle_mode { app.toggle_mode(); }
        match drag {
            Some((da, dp)) => app.drag_camera(da, dp),
            None           => app.release_camera(),
        }

        // 2. Drain detections
        loop {
            match detections.try_recv() {
                Ok(detection) => app.handle_detection(detection),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("landmark source stopped");
                    return Ok(());
                }
            }
        }

        // 3. Per-frame logic
        let now = Instant::now();
        app.tick((now - last).as_secs_f32());
        last = now;

        // 4. Render
        vis.render(&app);
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use gesture_mode::{HandFrame, HandPose};
    use motion_blend::EntityKind;
    use crate::source::DetectorError;

    fn small_config() -> ViewerConfig {
        let mut cfg = ViewerConfig::default();
        cfg.population = PopulationConfig {
            particles: 20, ornaments: 5, photos: 3, ..Default::default()
        };
        cfg
    }

    fn make_app() -> AppState {
        AppState::new(&small_config()).unwrap()
    }

    fn frame(pose: HandPose) -> Detection {
        Ok(Some(pose.to_frame(Vec2::new(0.5, 0.5), 0.1).unwrap()))
    }

    fn feed(app: &mut AppState, pose: HandPose, n: usize) {
        for _ in 0..n {
            app.handle_detection(frame(pose));
        }
    }

    #[test]
    fn config_errors_surface_as_app_errors() {
        let err = load_config(Some(Path::new("/nonexistent/formation.toml"))).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Io { .. })));
        assert_eq!(load_config(None).unwrap(), ViewerConfig::default());
    }

    #[test]
    fn starts_formed() {
        let app = make_app();
        assert_eq!(app.snapshot().mode, Mode::Formed);
        assert_eq!(app.snapshot().version, 0);
    }

    #[test]
    fn held_open_hand_scatters() {
        let mut app = make_app();
        feed(&mut app, HandPose::open(), 5);
        assert_eq!(app.snapshot().mode, Mode::Chaos);
        assert!(matches!(app.last_event(), Some(GestureEvent::ModeChanged { .. })));
    }

    #[test]
    fn open_then_point_brings_a_photo_forward() {
        let mut app = make_app();
        feed(&mut app, HandPose::open(), 1);
        feed(&mut app, HandPose::pointing(), 2);
        match app.override_state() {
            ActiveOverride::Single(id) => {
                assert_eq!(app.population().get(id).map(|e| e.kind), Some(EntityKind::Photo));
            }
            other => panic!("expected single override, got {other:?}"),
        }

        app.handle_detection(Ok(None::<HandFrame>));
        assert_eq!(app.override_state(), ActiveOverride::None);
        assert_eq!(app.last_event(), Some(GestureEvent::PointReleased));
    }

    #[test]
    fn detector_failure_counts_as_no_hand() {
        let mut app = make_app();
        feed(&mut app, HandPose::open(), 4);
        app.handle_detection(Err(DetectorError::Dropout));
        feed(&mut app, HandPose::open(), 1);
        // Decayed from 4 to 3, so one more open frame is not enough.
        assert_eq!(app.snapshot().mode, Mode::Formed);
        assert!(app.snapshot().hand.detected);
    }

    #[test]
    fn toggle_mode_clears_override() {
        let mut app = make_app();
        feed(&mut app, HandPose::open(), 1);
        feed(&mut app, HandPose::pointing(), 2);
        assert_ne!(app.override_state(), ActiveOverride::None);

        app.toggle_mode();
        assert_eq!(app.snapshot().mode, Mode::Chaos);
        assert_eq!(app.snapshot().version, 1);
        assert_eq!(app.override_state(), ActiveOverride::None);
    }

    #[test]
    fn tick_publishes_every_pose() {
        let mut app = make_app();
        app.tick(1.0 / 60.0);
        assert_eq!(app.poses().len(), app.population().len());
        assert_eq!(app.drive(), CameraDrive::Idle);
    }

    #[test]
    fn visible_hand_steers_camera() {
        let mut app = make_app();
        feed(&mut app, HandPose::fist(), 1);
        app.tick(0.1);
        assert_eq!(app.drive(), CameraDrive::Hand);
    }

    #[test]
    fn dragging_holds_off_idle_rotation() {
        let mut app = make_app();
        app.drag_camera(0.5, 0.0);
        app.tick(0.1);
        assert_eq!(app.drive(), CameraDrive::Manual);
        app.release_camera();
        app.tick(0.1);
        assert_eq!(app.drive(), CameraDrive::Holding);
    }

    #[test]
    fn resize_rebuilds_only_on_count_change() {
        let mut app = make_app();
        let same = small_config().population;
        assert!(!app.resize_population(&same).unwrap());
        let more = PopulationConfig { photos: 6, ..same };
        assert!(app.resize_population(&more).unwrap());
        app.tick(0.01);
        assert_eq!(app.poses().len(), 31);
    }
}
