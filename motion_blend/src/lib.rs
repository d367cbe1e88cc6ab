//! # motion_blend
//!
//! Drives a population of entities between two layouts and an orbit camera
//! around them, from the mode and events published by `gesture_mode`.
//!
//! ```text
//!  PopulationConfig ──► Population (arena of Entity)
//!                          │
//!  GestureEvent ──► MotionEngine::handle_event  (install / clear override)
//!  TickContext  ──► MotionEngine::tick ──► &[Pose] ──► renderer
//!
//!  HandSignal ──► OrbitCamera::update ──► eye position ──► TickContext.camera
//! ```
//!
//! | Mode / state | Entity target |
//! |---|---|
//! | `Chaos` | random point in the chaos sphere |
//! | `Formed` | its slot in the cone layout |
//! | override active | override target, whatever the mode |

pub mod entity;
pub mod population;
pub mod engine;
pub mod camera;

pub use entity::{Entity, EntityId, EntityKind, Pose};
pub use population::{Population, PopulationConfig, PopulationError};
pub use engine::{
    convergence_step, look_rotation, ActiveOverride, BlendConfig, MotionEngine, OverridePolicy,
    TickContext,
};
pub use camera::{shortest_arc, wrap_angle, CameraConfig, CameraDrive, OrbitCamera, OrbitState};
