//! Software-rendered preview using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                                                              │
//! │      entity dots projected through the orbit camera          │
//! │      (+ hand cursor when a hand is detected)                 │
//! │                                                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  MODE  version  hand  camera  last event                     │
//! │  key legend                                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;

use glam::{Mat4, Vec2, Vec3};
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};
use motion_blend::{ActiveOverride, CameraDrive, EntityKind};

use crate::app::{AppError, AppState};
use crate::source::{SimInput, SimPose};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:    usize = 960;
pub const WIN_H:    usize = 640;
const STATUS_H:     usize = 40;
pub const VIEW_H:   usize = WIN_H - STATUS_H;
const STATUS_Y:     usize = VIEW_H;
const FOV_Y:        f32   = 0.8;
const BG_COLOR:     u32   = 0xFF0B0F1A;
const TEXT_BG:      u32   = 0xFF0F3460;
const HAND_COLOR:   u32   = 0xFF44FFAA;
const ZOOM_COLOR:   u32   = 0xFFFFFF00;
/// Radians per frame while an arrow key is held.
const DRAG_STEP:    f32   = 0.03;

fn kind_color(kind: EntityKind) -> u32 {
    match kind {
        EntityKind::Particle => 0xFFFFD700,
        EntityKind::Ornament => 0xFFE0405A,
        EntityKind::Photo    => 0xFFF4F4F4,
    }
}

/// What the window asked the app to do this frame.  Pose and cursor input
/// goes straight to the landmark simulator instead.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub quit:        bool,
    pub toggle_mode: bool,
    /// Manual orbit delta (azimuth, polar) while an arrow key is held.
    pub drag:        Option<(f32, f32)>,
}

// ════════════════════════════════════════════════════════════════════════════
// Projection
// ════════════════════════════════════════════════════════════════════════════

pub fn view_projection(eye: Vec3, target: Vec3) -> Mat4 {
    let aspect = WIN_W as f32 / VIEW_H as f32;
    Mat4::perspective_rh(FOV_Y, aspect, 0.1, 500.0) * Mat4::look_at_rh(eye, target, Vec3::Y)
}

/// Screen position and view depth of `p`, or `None` when it is behind the
/// camera or off screen.
pub fn project(view_proj: &Mat4, p: Vec3) -> Option<(f32, f32, f32)> {
    let clip = *view_proj * p.extend(1.0);
    if !clip.is_finite() || clip.w <= 1e-4 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
        return None;
    }
    let sx = (ndc.x + 1.0) * 0.5 * WIN_W as f32;
    let sy = (1.0 - ndc.y) * 0.5 * VIEW_H as f32;
    Some((sx, sy, clip.w))
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:      Window,
    buf:         Vec<u32>,
    sim_tx:      Sender<SimInput>,
    last_cursor: Option<Vec2>,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> Result<Self, AppError> {
        let mut window = Window::new(
            "Formation Viewer",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| AppError::Window(e.to_string()))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
            last_cursor: None,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard and mouse.  Pose keys and the cursor are forwarded to
    /// the simulator; everything else is returned.
    pub fn poll_input(&mut self) -> FrameInput {
        let mut input = FrameInput::default();
        if !self.window.is_open() {
            input.quit = true;
            return input;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| self.window.is_key_down(k);

        input.quit        = one_shot(Key::Q) || one_shot(Key::Escape);
        input.toggle_mode = one_shot(Key::M);

        for (key, pose) in [
            (Key::O, SimPose::Open),
            (Key::F, SimPose::Fist),
            (Key::P, SimPose::Pointing),
            (Key::V, SimPose::Peace),
            (Key::N, SimPose::Hidden),
        ] {
            if one_shot(key) {
                let _ = self.sim_tx.send(SimInput::Pose(pose));
            }
        }
        if one_shot(Key::G) {
            let _ = self.sim_tx.send(SimInput::Glitch);
        }

        let mut da = 0.0;
        let mut dp = 0.0;
        if held(Key::Left)  { da -= DRAG_STEP; }
        if held(Key::Right) { da += DRAG_STEP; }
        if held(Key::Up)    { dp -= DRAG_STEP; }
        if held(Key::Down)  { dp += DRAG_STEP; }
        if held(Key::Left) || held(Key::Right) || held(Key::Up) || held(Key::Down) {
            input.drag = Some((da, dp));
        }

        if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Clamp) {
            let cursor = Vec2::new(mx / WIN_W as f32, my / VIEW_H as f32).clamp(Vec2::ZERO, Vec2::ONE);
            if self.last_cursor != Some(cursor) {
                self.last_cursor = Some(cursor);
                let _ = self.sim_tx.send(SimInput::Cursor(cursor));
            }
        }

        input
    }

    /// Render one frame.
    pub fn render(&mut self, app: &AppState) {
        self.buf.fill(BG_COLOR);

        // ── Entities ──────────────────────────────────────────────────────
        let camera    = app.camera();
        let view_proj = view_projection(camera.position(), camera.config.target);
        let focal     = VIEW_H as f32 * 0.5 / (FOV_Y * 0.5).tan();
        let zoomed    = match app.override_state() {
            ActiveOverride::Single(id) => Some(id.index()),
            _ => None,
        };

        for (i, (entity, pose)) in app.population().iter().zip(app.poses()).enumerate() {
            let Some((sx, sy, depth)) = project(&view_proj, pose.position) else { continue };
            let size  = (pose.scale * focal / depth).clamp(1.0, 48.0) as usize;
            let fade  = (depth / (camera.config.radius * 2.5)).clamp(0.0, 0.8);
            let color = blend(kind_color(entity.kind), BG_COLOR, fade);
            let x0    = sx as isize - size as isize / 2;
            let y0    = sy as isize - size as isize / 2;
            self.fill_rect_clipped(x0, y0, size, size, color);
            if zoomed == Some(i) {
                self.draw_border_clipped(x0 - 2, y0 - 2, size + 4, size + 4, ZOOM_COLOR);
            }
        }

        // ── Hand cursor ───────────────────────────────────────────────────
        let snapshot = app.snapshot();
        if let Some(hand) = snapshot.hand.position() {
            let hx = (hand.x * WIN_W as f32) as isize;
            let hy = (hand.y * VIEW_H as f32) as isize;
            self.fill_rect_clipped(hx - 8, hy, 17, 1, HAND_COLOR);
            self.fill_rect_clipped(hx, hy - 8, 1, 17, HAND_COLOR);
        }

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, STATUS_H, TEXT_BG);
        let hand = match snapshot.hand.position() {
            Some(p) => format!("{:.2},{:.2}", p.x, p.y),
            None    => "none".to_string(),
        };
        let drive = match app.drive() {
            CameraDrive::Manual  => "manual",
            CameraDrive::Hand    => "hand",
            CameraDrive::Holding => "hold",
            CameraDrive::Idle    => "idle",
        };
        let line = format!(
            "MODE {}  v{}  hand {}  cam {}   {}",
            snapshot.mode.name(), snapshot.version, hand, drive, app.status,
        );
        self.draw_label(&line, 10, STATUS_Y + 8, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "O=open  F=fist  P=point  V=peace  N=no hand  G=glitch  M=mode  arrows=orbit  Q=quit",
            10, WIN_H - 12, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    /// `fill_rect` for rectangles that may hang off the top/left of the
    /// view; never draws into the status bar.
    fn fill_rect_clipped(&mut self, x: isize, y: isize, w: usize, h: usize, color: u32) {
        let x0 = x.max(0) as usize;
        let y0 = y.max(0) as usize;
        let x1 = (x + w as isize).clamp(0, WIN_W as isize) as usize;
        let y1 = (y + h as isize).clamp(0, VIEW_H as isize) as usize;
        for row in y0..y1 {
            for col in x0..x1 {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border_clipped(&mut self, x: isize, y: isize, w: usize, h: usize, color: u32) {
        self.fill_rect_clipped(x, y, w, 1, color);
        self.fill_rect_clipped(x, y + h as isize - 1, w, 1, color);
        self.fill_rect_clipped(x, y, 1, h, color);
        self.fill_rect_clipped(x + w as isize - 1, y, 1, h, color);
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// Minimal bitmap font — 3×5 characters, 5 rows × 3 bits each.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

/// Glyphs packed as five 3-bit rows, top row in the high bits.
const GLYPHS: &[(char, u16)] = &[
    ('0', 0o75557), ('1', 0o26227), ('2', 0o71747), ('3', 0o71717), ('4', 0o55711),
    ('5', 0o74717), ('6', 0o74757), ('7', 0o71111), ('8', 0o75757), ('9', 0o75717),
    ('A', 0o75755), ('B', 0o65656), ('C', 0o74447), ('D', 0o65556), ('E', 0o74747),
    ('F', 0o74744), ('G', 0o74557), ('H', 0o55755), ('I', 0o72227), ('J', 0o11157),
    ('K', 0o55655), ('L', 0o44447), ('M', 0o57555), ('N', 0o75555), ('O', 0o75557),
    ('P', 0o75744), ('Q', 0o75571), ('R', 0o65655), ('S', 0o74717), ('T', 0o72222),
    ('U', 0o55557), ('V', 0o55522), ('W', 0o55575), ('X', 0o55255), ('Y', 0o55722),
    ('Z', 0o71247),
    ('/', 0o11244), ('-', 0o00700), ('.', 0o00002), (',', 0o00024), (':', 0o02020),
    ('=', 0o07070), ('+', 0o02720), ('>', 0o42124), ('→', 0o42124), ('<', 0o12421),
    ('(', 0o12221), (')', 0o42224), ('|', 0o22222), ('#', 0o57575), ('_', 0o00007),
    (' ', 0o00000),
];

/// Five row bitmasks for `c`; unknown characters render as a centered dot.
fn char_glyph(c: char) -> [u8; 5] {
    let c = c.to_ascii_uppercase();
    let packed = GLYPHS
        .iter()
        .find(|(g, _)| *g == c)
        .map_or(0o00200, |&(_, bits)| bits);
    std::array::from_fn(|row| ((packed >> (3 * (4 - row))) & 0b111) as u8)
}

/// Linear mix of two opaque ARGB colors; `t` = 0 gives `a`, 1 gives `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    [16u32, 8, 0].iter().fold(0xFF00_0000, |out, &shift| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        out | (((ca + (cb - ca) * t).round() as u32).min(0xFF) << shift)
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
