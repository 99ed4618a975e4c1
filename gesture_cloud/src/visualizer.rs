//! Software point renderer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ SHAPE NAME                               ● CAPTURE STATUS │
//! │                                                          │
//! │                  . · :: particle cloud :: · .            │
//! │                          ( o ) hand marker               │
//! │                                                          │
//! │ key legend                                               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The camera is a 75° perspective camera at z = 30 looking down −z.  Points
//! are splatted additively with exponential-squared fog toward black.

use std::sync::mpsc::Sender;

use glam::{Mat3, Vec2, Vec3};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, ScaleMode, Window, WindowOptions};
use morph_shapes::{ParticleSet, Shape};

use crate::animation::Rotation;
use crate::capture::{CaptureStatus, SimInput};
use crate::config::{Config, NARROW_VIEWPORT_PX};
use crate::error::AppError;
use crate::gesture::{GestureMode, HandPose};

// ════════════════════════════════════════════════════════════════════════════
// Constants
// ════════════════════════════════════════════════════════════════════════════

pub const DEFAULT_WIN_W: usize = 1024;
pub const DEFAULT_WIN_H: usize = 720;

const CAMERA_Z:       f32 = 30.0;
const FOV_Y_DEG:      f32 = 75.0;
const NEAR:           f32 = 0.1;
const FAR:            f32 = 1000.0;
const FOG_DENSITY:    f32 = 0.02;
/// Upward shift of the whole cloud on narrow viewports (world units).
const NARROW_SHIFT_Y: f32 = 5.0;

const BG_COLOR:       u32 = 0xFF000000;
const HUD_TEXT:       u32 = 0xFFEEEEEE;
const LEGEND_TEXT:    u32 = 0xFF777777;
const STATUS_OK:      u32 = 0xFF33DD66;
const STATUS_BAD:     u32 = 0xFFDD3344;
const STATUS_IDLE:    u32 = 0xFF888888;

// ════════════════════════════════════════════════════════════════════════════
// Viewport
// ════════════════════════════════════════════════════════════════════════════

/// Window dimensions in pixels, and what depends on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width:  usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Viewport { width: width.max(1), height: height.max(1) }
    }

    pub fn aspect(&self) -> f32 { self.width as f32 / self.height as f32 }

    pub fn is_narrow(&self) -> bool { self.width < NARROW_VIEWPORT_PX }

    /// Vertical offset applied to the whole particle group.
    pub fn group_offset_y(&self) -> f32 {
        if self.is_narrow() { NARROW_SHIFT_Y } else { 0.0 }
    }

    /// Apply a window size change; returns whether anything changed.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        let next = Viewport::new(width, height);
        let changed = next != *self;
        *self = next;
        changed
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Camera
// ════════════════════════════════════════════════════════════════════════════

/// A point on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub x:     f32,
    pub y:     f32,
    /// Distance in front of the camera.
    pub depth: f32,
}

/// Group transform: roll about Z, then yaw about Y, then the vertical offset.
pub fn group_transform(local: Vec3, rotation: Rotation, offset_y: f32) -> Vec3 {
    let m = Mat3::from_rotation_y(rotation.yaw) * Mat3::from_rotation_z(rotation.roll);
    m * local + Vec3::new(0.0, offset_y, 0.0)
}

/// Project a world-space point to pixel coordinates; `None` outside the
/// near/far range.
pub fn project(world: Vec3, viewport: &Viewport) -> Option<Projected> {
    let depth = CAMERA_Z - world.z;
    if !(NEAR..=FAR).contains(&depth) {
        return None;
    }
    let focal = 1.0 / (FOV_Y_DEG.to_radians() * 0.5).tan();
    let ndc_x = world.x * focal / (viewport.aspect() * depth);
    let ndc_y = world.y * focal / depth;
    Some(Projected {
        x: (ndc_x + 1.0) * 0.5 * viewport.width as f32,
        y: (1.0 - ndc_y) * 0.5 * viewport.height as f32,
        depth,
    })
}

/// Fraction of a point's colour surviving the fog at `depth`.
fn fog_factor(depth: f32) -> f32 {
    let d = FOG_DENSITY * depth;
    (-(d * d)).exp()
}

// ════════════════════════════════════════════════════════════════════════════
// PointStyle
// ════════════════════════════════════════════════════════════════════════════

/// How particles are drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointStyle {
    /// World-space size; on screen it shrinks with depth.
    pub size:    f32,
    pub opacity: f32,
}

impl PointStyle {
    pub fn from_config(cfg: &Config) -> Self {
        PointStyle { size: cfg.particle_size, opacity: 0.8 }
    }

    /// On-screen size in pixels at `depth` for a viewport `height` pixels tall.
    pub fn pixel_size(&self, depth: f32, height: usize) -> f32 {
        self.size * (height as f32 * 0.5) / depth
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas — the framebuffer and primitive drawing
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    width:  usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { width, height, pixels: vec![BG_COLOR; width * height] }
    }

    pub fn width(&self)  -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn pixels(&self) -> &[u32] { &self.pixels }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width  = width;
        self.height = height;
        self.pixels = vec![BG_COLOR; width * height];
    }

    pub fn clear(&mut self, color: u32) { self.pixels.fill(color); }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Add `rgb` (0–255 per channel, pre-scaled) to a square of `side` pixels
    /// centred on (`cx`, `cy`), saturating at white.
    pub fn add_point(&mut self, cx: f32, cy: f32, side: usize, rgb: [f32; 3]) {
        let half = side as f32 * 0.5;
        let x0 = (cx - half).round();
        let y0 = (cy - half).round();
        if x0 + side as f32 <= 0.0 || y0 + side as f32 <= 0.0 {
            return;
        }
        let add = [rgb[0] as u32, rgb[1] as u32, rgb[2] as u32];
        for dy in 0..side {
            let y = y0 + dy as f32;
            if y < 0.0 || y >= self.height as f32 { continue; }
            for dx in 0..side {
                let x = x0 + dx as f32;
                if x < 0.0 || x >= self.width as f32 { continue; }
                let idx = y as usize * self.width + x as usize;
                self.pixels[idx] = add_saturating(self.pixels[idx], add);
            }
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.pixels[row * self.width + col] = color;
            }
        }
    }

    /// Outline of a circle of radius `r` around (`cx`, `cy`).
    pub fn draw_ring(&mut self, cx: f32, cy: f32, r: f32, color: u32) {
        let steps = ((r * 8.0) as usize).max(16);
        for k in 0..steps {
            let a = k as f32 / steps as f32 * std::f32::consts::TAU;
            let x = cx + r * a.cos();
            let y = cy + r * a.sin();
            if x >= 0.0 && y >= 0.0 {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
    }

    /// Draw `text` with the built-in 3×5 font, each font pixel `scale`
    /// screen pixels wide.  Returns the x just past the last glyph.
    pub fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) -> usize {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            if cx + 3 * scale > self.width { break; }
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..3 {
                    if bits & (0b100 >> col) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale;
        }
        cx
    }
}

fn add_saturating(pixel: u32, add: [u32; 3]) -> u32 {
    let r = (((pixel >> 16) & 0xFF) + add[0]).min(0xFF);
    let g = (((pixel >>  8) & 0xFF) + add[1]).min(0xFF);
    let b = ( (pixel        & 0xFF) + add[2]).min(0xFF);
    0xFF000000 | (r << 16) | (g << 8) | b
}

/// 3×5 bitmap font; each row is three bits, MSB on the left.
fn glyph(c: char) -> [u8; 5] {
    const TABLE: &[(char, [u8; 5])] = &[
        ('A', [7, 5, 7, 5, 5]), ('B', [6, 5, 6, 5, 6]), ('C', [7, 4, 4, 4, 7]),
        ('D', [6, 5, 5, 5, 6]), ('E', [7, 4, 7, 4, 7]), ('F', [7, 4, 7, 4, 4]),
        ('G', [7, 4, 5, 5, 7]), ('H', [5, 5, 7, 5, 5]), ('I', [7, 2, 2, 2, 7]),
        ('J', [1, 1, 1, 5, 7]), ('K', [5, 5, 6, 5, 5]), ('L', [4, 4, 4, 4, 7]),
        ('M', [5, 7, 5, 5, 5]), ('N', [7, 5, 5, 5, 5]), ('O', [7, 5, 5, 5, 7]),
        ('P', [7, 5, 7, 4, 4]), ('Q', [7, 5, 5, 7, 1]), ('R', [6, 5, 6, 5, 5]),
        ('S', [7, 4, 7, 1, 7]), ('T', [7, 2, 2, 2, 2]), ('U', [5, 5, 5, 5, 7]),
        ('V', [5, 5, 5, 2, 2]), ('W', [5, 5, 5, 7, 5]), ('X', [5, 5, 2, 5, 5]),
        ('Y', [5, 5, 7, 2, 2]), ('Z', [7, 1, 2, 4, 7]),
        ('0', [7, 5, 5, 5, 7]), ('1', [2, 6, 2, 2, 7]), ('2', [7, 1, 7, 4, 7]),
        ('3', [7, 1, 7, 1, 7]), ('4', [5, 5, 7, 1, 1]), ('5', [7, 4, 7, 1, 7]),
        ('6', [7, 4, 7, 5, 7]), ('7', [7, 1, 1, 1, 1]), ('8', [7, 5, 7, 5, 7]),
        ('9', [7, 5, 7, 1, 7]),
        ('=', [0, 7, 0, 7, 0]), ('-', [0, 0, 7, 0, 0]), ('/', [1, 1, 2, 4, 4]),
        ('.', [0, 0, 0, 0, 2]), (':', [0, 2, 0, 2, 0]), (' ', [0, 0, 0, 0, 0]),
    ];
    let upper = c.to_ascii_uppercase();
    TABLE
        .iter()
        .find(|(k, _)| *k == upper)
        .map_or([0, 0, 2, 0, 0], |(_, g)| *g)
}

// ════════════════════════════════════════════════════════════════════════════
// Hud — what the app shows besides particles
// ════════════════════════════════════════════════════════════════════════════

pub struct Hud {
    pub shape:  Shape,
    pub status: CaptureStatus,
    /// Group-local hand interaction point and mode, when a hand is detected.
    pub hand:   Option<(Vec3, GestureMode)>,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:   Window,
    canvas:   Canvas,
    viewport: Viewport,
    style:    PointStyle,
    sim_tx:   Sender<SimInput>,
    /// Particle colours scaled to 0–255 × opacity, repacked when dirty.
    palette:  Vec<[f32; 3]>,
    last_pointer: Option<Vec2>,
    last_pose:    HandPose,
    hand_hidden:  bool,
}

impl Visualizer {
    pub fn new(viewport: Viewport, style: PointStyle, sim_tx: Sender<SimInput>) -> Result<Self, AppError> {
        let mut window = Window::new(
            "Gesture Cloud",
            viewport.width, viewport.height,
            WindowOptions {
                resize: true,
                scale_mode: ScaleMode::UpperLeft,
                ..WindowOptions::default()
            },
        ).map_err(|e| AppError::Window(e.to_string()))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas: Canvas::new(viewport.width, viewport.height),
            viewport,
            style,
            sim_tx,
            palette: Vec::new(),
            last_pointer: None,
            last_pose: HandPose::Open,
            hand_hidden: false,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    pub fn viewport(&self) -> Viewport { self.viewport }

    /// Poll pointer and keys and forward them to the simulated hand.
    /// Returns false when the user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        if self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            let _ = self.sim_tx.send(SimInput::Quit);
            return false;
        }
        if self.window.is_key_pressed(Key::H, KeyRepeat::No) {
            self.hand_hidden = !self.hand_hidden;
        }

        let (w, h) = (self.viewport.width as f32, self.viewport.height as f32);
        let pointer = if self.hand_hidden {
            None
        } else {
            self.window
                .get_mouse_pos(MouseMode::Discard)
                .map(|(x, y)| Vec2::new(x / w, y / h))
        };
        if pointer != self.last_pointer {
            self.last_pointer = pointer;
            let _ = self.sim_tx.send(SimInput::Pointer(pointer));
        }

        let pose = if self.window.get_mouse_down(MouseButton::Left) {
            HandPose::Fist
        } else if self.window.is_key_down(Key::V) {
            HandPose::Victory
        } else {
            HandPose::Open
        };
        if pose != self.last_pose {
            self.last_pose = pose;
            let _ = self.sim_tx.send(SimInput::Pose(pose));
        }

        true
    }

    /// Follow window size changes; returns whether the viewport changed.
    fn sync_size(&mut self) -> bool {
        let (w, h) = self.window.get_size();
        if w == 0 || h == 0 || !self.viewport.resize(w, h) {
            return false;
        }
        self.canvas.resize(self.viewport.width, self.viewport.height);
        log::debug!(
            "viewport {}x{} (group offset {})",
            self.viewport.width, self.viewport.height, self.viewport.group_offset_y()
        );
        true
    }

    /// Render and present one frame.
    ///
    /// The canvas is redrawn in full every frame since the rotation changes
    /// every frame; the dirty flags only gate the palette repack.
    pub fn render(&mut self, particles: &mut ParticleSet, rotation: Rotation, hud: &Hud) {
        self.sync_size();
        sync_palette(&mut self.palette, particles, self.style.opacity);

        draw_frame(&mut self.canvas, &self.viewport, &self.style, particles, &self.palette, rotation, hud);

        self.window
            .update_with_buffer(self.canvas.pixels(), self.canvas.width(), self.canvas.height())
            .ok();
    }
}

/// Repack particle colours into `palette` when they changed, and clear both
/// dirty flags.
pub fn sync_palette(palette: &mut Vec<[f32; 3]>, particles: &mut ParticleSet, opacity: f32) {
    particles.take_positions_dirty();
    if particles.take_colors_dirty() || palette.len() != particles.count() {
        let scale = opacity * 255.0;
        *palette = particles
            .colors()
            .chunks_exact(3)
            .map(|c| [c[0] * scale, c[1] * scale, c[2] * scale])
            .collect();
    }
}

/// Draw particles and HUD into `canvas`.
pub fn draw_frame(
    canvas:    &mut Canvas,
    viewport:  &Viewport,
    style:     &PointStyle,
    particles: &ParticleSet,
    palette:   &[[f32; 3]],
    rotation:  Rotation,
    hud:       &Hud,
) {
    canvas.clear(BG_COLOR);
    let offset_y = viewport.group_offset_y();

    for (i, color) in palette.iter().enumerate().take(particles.count()) {
        let world = group_transform(particles.position(i), rotation, offset_y);
        let Some(p) = project(world, viewport) else { continue };

        let px = style.pixel_size(p.depth, viewport.height);
        let side = px.round().max(1.0) as usize;
        // Sub-pixel points contribute by area.
        let k = fog_factor(p.depth) * (px * px).min(1.0);
        canvas.add_point(p.x, p.y, side, [color[0] * k, color[1] * k, color[2] * k]);
    }

    if let Some((local, mode)) = hud.hand {
        let world = group_transform(local, rotation, offset_y);
        if let Some(p) = project(world, viewport) {
            let color = match mode {
                GestureMode::Repel   => 0xFFFF5544,
                GestureMode::Attract => 0xFF44CCFF,
                GestureMode::Neutral => 0xFFCCCCCC,
            };
            let r = viewport.height as f32 * 0.02;
            canvas.draw_ring(p.x, p.y, r, color);
            canvas.draw_ring(p.x, p.y, r * 0.4, color);
        }
    }

    canvas.draw_text(hud.shape.label(), 16, 16, 3, HUD_TEXT);

    let status = hud.status.label();
    let text_w = status.chars().count() * 8;
    let sx = viewport.width.saturating_sub(text_w + 32);
    let dot = match hud.status {
        CaptureStatus::Active => STATUS_OK,
        CaptureStatus::Starting => STATUS_IDLE,
        CaptureStatus::Unsupported | CaptureStatus::Error => STATUS_BAD,
    };
    canvas.fill_rect(sx, 18, 8, 8, dot);
    canvas.draw_text(status, sx + 14, 16, 2, HUD_TEXT);

    canvas.draw_text(
        "MOUSE=HAND  HOLD LEFT BUTTON=FIST  HOLD V=VICTORY  H=HIDE HAND  Q=QUIT",
        16, viewport.height.saturating_sub(20), 2, LEGEND_TEXT,
    );
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn narrow_viewport_shifts_group() {
        let mut vp = Viewport::new(1024, 720);
        assert_eq!(vp.group_offset_y(), 0.0);
        assert!(vp.resize(600, 900));
        assert_eq!(vp.group_offset_y(), 5.0);
        assert!(!vp.resize(600, 900));
        assert!((vp.aspect() - 600.0 / 900.0).abs() < 1e-6);
    }

    #[test]
    fn origin_projects_to_centre() {
        let vp = Viewport::new(800, 600);
        let p = project(Vec3::ZERO, &vp).unwrap();
        assert!((p.x - 400.0).abs() < 1e-3);
        assert!((p.y - 300.0).abs() < 1e-3);
        assert_eq!(p.depth, 30.0);
    }

    #[test]
    fn up_is_up_on_screen() {
        let vp = Viewport::new(800, 600);
        let p = project(Vec3::new(2.0, 5.0, 0.0), &vp).unwrap();
        assert!(p.x > 400.0);
        assert!(p.y < 300.0);
    }

    #[test]
    fn behind_camera_is_culled() {
        let vp = Viewport::new(800, 600);
        assert!(project(Vec3::new(0.0, 0.0, 31.0), &vp).is_none());
    }

    #[test]
    fn group_transform_rotates_then_offsets() {
        let r = Rotation { yaw: std::f32::consts::FRAC_PI_2, roll: 0.0 };
        let p = group_transform(Vec3::X, r, 5.0);
        assert!((p - Vec3::new(0.0, 5.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn fog_darkens_with_depth() {
        assert!(fog_factor(10.0) > fog_factor(30.0));
        assert!((fog_factor(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn additive_points_saturate() {
        let mut c = Canvas::new(4, 4);
        c.add_point(2.0, 2.0, 1, [200.0, 10.0, 0.0]);
        c.add_point(2.0, 2.0, 1, [200.0, 10.0, 0.0]);
        assert_eq!(c.get(2, 2), Some(0xFFFF1400));
    }

    #[test]
    fn points_off_canvas_are_ignored() {
        let mut c = Canvas::new(4, 4);
        c.add_point(-10.0, 2.0, 2, [255.0, 255.0, 255.0]);
        c.add_point(2.0, 100.0, 2, [255.0, 255.0, 255.0]);
        assert!(c.pixels().iter().all(|&p| p == BG_COLOR));
    }

    #[test]
    fn text_draws_pixels() {
        let mut c = Canvas::new(64, 16);
        let end = c.draw_text("HI", 0, 0, 1, 0xFFFFFFFF);
        assert_eq!(end, 8);
        assert!(c.pixels().iter().any(|&p| p == 0xFFFFFFFF));
    }

    #[test]
    fn palette_repacks_only_on_colour_change() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut ps = ParticleSet::new(20, &mut rng);
        let mut palette = Vec::new();

        sync_palette(&mut palette, &mut ps, 0.8);
        assert_eq!(palette.len(), 20);
        assert!(!ps.take_colors_dirty());
        assert!(!ps.take_positions_dirty());

        palette[0] = [0.0; 3];
        sync_palette(&mut palette, &mut ps, 0.8);
        assert_eq!(palette[0], [0.0; 3]);

        morph_shapes::generate_shape(&mut ps, Shape::Torus, &mut rng);
        sync_palette(&mut palette, &mut ps, 0.8);
        let c = ps.color(0) * 0.8 * 255.0;
        assert!((palette[0][0] - c.x).abs() < 1e-3);
        assert!((palette[0][2] - c.z).abs() < 1e-3);
    }

    #[test]
    fn frame_lights_up_cloud() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut ps = ParticleSet::new(500, &mut rng);
        morph_shapes::generate_shape(&mut ps, Shape::Sphere, &mut rng);
        for i in 0..ps.count() {
            let t = ps.target(i);
            ps.set_position(i, t);
        }
        let vp = Viewport::new(320, 240);
        let mut canvas = Canvas::new(vp.width, vp.height);
        let style = PointStyle { size: 0.2, opacity: 0.8 };
        let palette: Vec<[f32; 3]> = vec![[200.0, 200.0, 200.0]; ps.count()];
        let hud = Hud { shape: Shape::Sphere, status: CaptureStatus::Active, hand: None };

        draw_frame(&mut canvas, &vp, &style, &ps, &palette, Rotation::default(), &hud);

        // Centre of the sphere is lit by particles in front of it.
        let lit = (100..220)
            .flat_map(|x| (80..160).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.get(x, y) != Some(BG_COLOR))
            .count();
        assert!(lit > 50, "only {} lit pixels", lit);
    }
}
