//! # formation_viewer
//!
//! Hand-gesture controlled particle formation, previewed in a software
//! window.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Action |
//! |---|---|
//! | Open hand, held | Scatter into the chaos sphere |
//! | Fist, held | Gather into the cone formation |
//! | Open hand, then index point | Bring the next photo frame to the camera (or zoom the whole formation) |
//! | Point ends | Send it back |
//! | Hand moves | Orbit the camera |
//! | No hand | Camera idles round the formation |
//!
//! ## Simulation keyboard shortcuts
//!
//! Frames come from a synthetic hand that follows the mouse cursor.
//!
//! | Key | Effect |
//! |---|---|
//! | `O` / `F` / `P` / `V` | Show open hand / fist / point / peace sign |
//! | `N` | Hide the hand |
//! | `G` | Inject one detector failure |
//! | `M` | Toggle the mode directly |
//! | Arrows | Orbit manually |
//! | `Q` / `Escape` | Quit |

pub mod config;
pub mod source;
pub mod visualizer;
pub mod app;
