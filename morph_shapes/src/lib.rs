//! # morph_shapes
//!
//! Target point clouds for a morphing particle cloud.
//!
//! A [`ParticleSet`] owns three flat `f32` buffers of length `3 × count`:
//! current positions, target positions and RGB colours.  The count is fixed
//! when the set is built and never changes.  [`generate_shape`] rewrites the
//! whole target and colour buffers for one [`Shape`]; current positions are
//! left alone so the animation can ease toward the new target.
//!
//! ## Shapes
//!
//! | Shape | Construction | Hue |
//! |---|---|---|
//! | `sphere` | uniform on radius 10 | blue band 0.6–0.7 |
//! | `heart`  | 2-D heart curve ×0.5, z jitter ±2.5 | red band 0.95–1.0 |
//! | `saturn` | 70 % planet (r = 6), 30 % ring r ∈ [8, 14) tilted 30° | warm / pale gold |
//! | `flower` | phyllotaxis, r = 0.5·√i, θ = i·137.5° | cycles every 100 indices |
//! | `torus`  | R = 10, r = 3 | cyan |
//!
//! ## Quick start
//!
//! ```rust
//! use morph_shapes::{ParticleSet, Shape, ShapeRegistry, generate_shape};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut particles = ParticleSet::new(1_000, &mut rng);
//! let mut registry = ShapeRegistry::new();
//!
//! generate_shape(&mut particles, registry.current(), &mut rng);
//! let next = registry.advance();
//! assert_eq!(next, Shape::Heart);
//! generate_shape(&mut particles, next, &mut rng);
//! ```

use std::f32::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use rand::Rng;

// ════════════════════════════════════════════════════════════════════════════
// Shape
// ════════════════════════════════════════════════════════════════════════════

/// One of the five target shapes the cloud can morph into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Sphere,
    Heart,
    Saturn,
    Flower,
    Torus,
}

impl Shape {
    /// Every shape, in cycling order.
    pub const ALL: [Shape; 5] = [
        Shape::Sphere,
        Shape::Heart,
        Shape::Saturn,
        Shape::Flower,
        Shape::Torus,
    ];

    /// Lower-case identifier (`"sphere"`, `"heart"`, …).
    pub fn name(self) -> &'static str {
        match self {
            Shape::Sphere => "sphere",
            Shape::Heart  => "heart",
            Shape::Saturn => "saturn",
            Shape::Flower => "flower",
            Shape::Torus  => "torus",
        }
    }

    /// Upper-case label for on-screen display.
    pub fn label(self) -> &'static str {
        match self {
            Shape::Sphere => "SPHERE",
            Shape::Heart  => "HEART",
            Shape::Saturn => "SATURN",
            Shape::Flower => "FLOWER",
            Shape::Torus  => "TORUS",
        }
    }

    /// Sample the target position and RGB colour for particle `index`.
    ///
    /// Every shape except [`Shape::Flower`] draws from `rng`; the flower is a
    /// pure function of `index`.
    pub fn sample<R: Rng + ?Sized>(self, index: usize, rng: &mut R) -> (Vec3, Vec3) {
        match self {
            Shape::Sphere => sample_sphere(rng),
            Shape::Heart  => sample_heart(rng),
            Shape::Saturn => sample_saturn(rng),
            Shape::Flower => sample_flower(index),
            Shape::Torus  => sample_torus(rng),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned by [`Shape::from_str`] for an unrecognised name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shape `{0}` (expected sphere, heart, saturn, flower or torus)")]
pub struct ParseShapeError(pub String);

impl FromStr for Shape {
    type Err = ParseShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Shape::ALL
            .iter()
            .copied()
            .find(|shape| shape.name() == wanted)
            .ok_or_else(|| ParseShapeError(s.to_string()))
    }
}

// ── per-shape samplers ────────────────────────────────────────────────────

const SPHERE_RADIUS: f32 = 10.0;
const PLANET_RADIUS: f32 = 6.0;
const PLANET_SHARE:  f32 = 0.7;
const RING_INNER:    f32 = 8.0;
const RING_WIDTH:    f32 = 6.0;
const RING_TILT:     f32 = PI / 6.0;
const TORUS_MAJOR:   f32 = 10.0;
const TORUS_MINOR:   f32 = 3.0;
const GOLDEN_ANGLE:  f32 = 137.5 * (PI / 180.0);

/// Uniform point on a sphere via inverse-CDF polar sampling.
fn point_on_sphere<R: Rng + ?Sized>(radius: f32, rng: &mut R) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let phi   = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
    )
}

fn sample_sphere<R: Rng + ?Sized>(rng: &mut R) -> (Vec3, Vec3) {
    let pos = point_on_sphere(SPHERE_RADIUS, rng);
    let hue = rng.gen_range(0.6..0.7);
    (pos, hsl_to_rgb(hue, 1.0, 0.5))
}

fn sample_heart<R: Rng + ?Sized>(rng: &mut R) -> (Vec3, Vec3) {
    let t = rng.gen_range(0.0..TAU);
    let x = 16.0 * t.sin().powi(3);
    let y = 13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos();
    let z = (rng.gen::<f32>() - 0.5) * 5.0;
    let hue = rng.gen_range(0.95..1.0);
    (Vec3::new(x * 0.5, y * 0.5, z), hsl_to_rgb(hue, 1.0, 0.4))
}

fn sample_saturn<R: Rng + ?Sized>(rng: &mut R) -> (Vec3, Vec3) {
    if rng.gen::<f32>() < PLANET_SHARE {
        let pos = point_on_sphere(PLANET_RADIUS, rng);
        return (pos, hsl_to_rgb(0.1, 0.8, 0.5));
    }

    let r     = RING_INNER + rng.gen::<f32>() * RING_WIDTH;
    let theta = rng.gen_range(0.0..TAU);
    let x = r * theta.cos();
    let z = r * theta.sin();
    let y = (rng.gen::<f32>() - 0.5) * 0.5;

    // Tilt the ring plane about the X axis.
    let (sin_t, cos_t) = RING_TILT.sin_cos();
    let tilted = Vec3::new(x, y * cos_t - z * sin_t, y * sin_t + z * cos_t);
    (tilted, hsl_to_rgb(0.15, 0.6, 0.7))
}

fn sample_flower(index: usize) -> (Vec3, Vec3) {
    let i     = index as f32;
    let r     = 0.5 * i.sqrt();
    let theta = i * GOLDEN_ANGLE;
    let pos = Vec3::new(r * theta.cos(), r * theta.sin(), (r * 0.5).sin() * 2.0);
    let hue = (index % 100) as f32 / 100.0;
    (pos, hsl_to_rgb(hue, 1.0, 0.5))
}

fn sample_torus<R: Rng + ?Sized>(rng: &mut R) -> (Vec3, Vec3) {
    let u = rng.gen_range(0.0..TAU);
    let v = rng.gen_range(0.0..TAU);
    let ring = TORUS_MAJOR + TORUS_MINOR * v.cos();
    let pos = Vec3::new(ring * u.cos(), ring * u.sin(), TORUS_MINOR * v.sin());
    (pos, hsl_to_rgb(0.5, 0.8, 0.5))
}

// ════════════════════════════════════════════════════════════════════════════
// Colour
// ════════════════════════════════════════════════════════════════════════════

/// Convert HSL (all components nominally in [0, 1]) to linear RGB in [0, 1].
///
/// Hue wraps, so `1.02` is the same as `0.02`.  Saturation and lightness are
/// clamped.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return Vec3::splat(l);
    }

    let hi = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let lo = 2.0 * l - hi;
    Vec3::new(
        hue_channel(lo, hi, h + 1.0 / 3.0),
        hue_channel(lo, hi, h),
        hue_channel(lo, hi, h - 1.0 / 3.0),
    )
    .clamp(Vec3::ZERO, Vec3::ONE)
}

fn hue_channel(lo: f32, hi: f32, mut t: f32) -> f32 {
    if t < 0.0 { t += 1.0; }
    if t > 1.0 { t -= 1.0; }
    if t < 1.0 / 6.0 { return lo + (hi - lo) * 6.0 * t; }
    if t < 0.5       { return hi; }
    if t < 2.0 / 3.0 { return lo + (hi - lo) * 6.0 * (2.0 / 3.0 - t); }
    lo
}

// ════════════════════════════════════════════════════════════════════════════
// ParticleSet — the three fixed-length buffers
// ════════════════════════════════════════════════════════════════════════════

/// Half-width of the cube the cloud is scattered over before the first shape.
const SCATTER_HALF_EXTENT: f32 = 25.0;

/// Current positions, target positions and colours for a fixed number of
/// particles, stored flat (`[x0, y0, z0, x1, …]`) so a renderer can consume
/// them as vertex attributes directly.
#[derive(Clone, Debug)]
pub struct ParticleSet {
    count:     usize,
    positions: Vec<f32>,
    targets:   Vec<f32>,
    colors:    Vec<f32>,
    positions_dirty: bool,
    colors_dirty:    bool,
}

impl ParticleSet {
    /// Allocate `count` particles scattered uniformly over a 50-unit cube with
    /// random colours.  Targets start at the origin until a shape is generated.
    pub fn new<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut positions = vec![0.0; count * 3];
        let mut colors    = vec![0.0; count * 3];

        for i in 0..count {
            for axis in 0..3 {
                positions[i * 3 + axis] =
                    (rng.gen::<f32>() - 0.5) * 2.0 * SCATTER_HALF_EXTENT;
            }
            let c = hsl_to_rgb(rng.gen(), 0.8, 0.5);
            colors[i * 3..i * 3 + 3].copy_from_slice(&c.to_array());
        }

        ParticleSet {
            count,
            positions,
            targets: vec![0.0; count * 3],
            colors,
            positions_dirty: true,
            colors_dirty:    true,
        }
    }

    pub fn count(&self) -> usize { self.count }
    pub fn is_empty(&self) -> bool { self.count == 0 }

    pub fn positions(&self) -> &[f32] { &self.positions }
    pub fn targets(&self)   -> &[f32] { &self.targets }
    pub fn colors(&self)    -> &[f32] { &self.colors }

    /// Mutable current positions alongside read-only targets, for the
    /// per-frame easing pass.
    pub fn positions_and_targets_mut(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.positions[..], &self.targets[..])
    }

    pub fn position(&self, i: usize) -> Vec3 { Vec3::from_slice(&self.positions[i * 3..]) }
    pub fn target(&self, i: usize)   -> Vec3 { Vec3::from_slice(&self.targets[i * 3..]) }
    pub fn color(&self, i: usize)    -> Vec3 { Vec3::from_slice(&self.colors[i * 3..]) }

    /// Overwrite one particle's current position.
    pub fn set_position(&mut self, i: usize, p: Vec3) {
        self.positions[i * 3..i * 3 + 3].copy_from_slice(&p.to_array());
        self.positions_dirty = true;
    }

    pub fn mark_positions_dirty(&mut self) { self.positions_dirty = true; }

    /// Returns whether positions changed since the last call, and clears the flag.
    pub fn take_positions_dirty(&mut self) -> bool {
        std::mem::take(&mut self.positions_dirty)
    }

    /// Returns whether colours changed since the last call, and clears the flag.
    pub fn take_colors_dirty(&mut self) -> bool {
        std::mem::take(&mut self.colors_dirty)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Shape generation
// ════════════════════════════════════════════════════════════════════════════

/// Rewrite every target position and colour in `particles` for `shape`.
///
/// The whole buffer is written before this returns, so a reader never sees a
/// mix of two shapes.  Current positions are not touched.
pub fn generate_shape<R: Rng + ?Sized>(particles: &mut ParticleSet, shape: Shape, rng: &mut R) {
    for i in 0..particles.count {
        let (pos, color) = shape.sample(i, rng);
        particles.targets[i * 3..i * 3 + 3].copy_from_slice(&pos.to_array());
        particles.colors[i * 3..i * 3 + 3].copy_from_slice(&color.to_array());
    }
    particles.colors_dirty = true;
    log::debug!("generated {} targets for {}", particles.count, shape);
}

// ════════════════════════════════════════════════════════════════════════════
// ShapeRegistry — cyclic cursor over Shape::ALL
// ════════════════════════════════════════════════════════════════════════════

/// Ordered, cyclic sequence of shapes with a cursor.
#[derive(Clone, Debug, Default)]
pub struct ShapeRegistry {
    cursor: usize,
}

impl ShapeRegistry {
    /// A registry positioned on [`Shape::Sphere`].
    pub fn new() -> Self { Self::default() }

    pub fn current(&self) -> Shape { Shape::ALL[self.cursor] }
    pub fn index(&self) -> usize { self.cursor }

    /// Move to the next shape, wrapping after the last one.
    pub fn advance(&mut self) -> Shape {
        self.cursor = (self.cursor + 1) % Shape::ALL.len();
        self.current()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const N: usize = 2_000;

    fn generated(shape: Shape, seed: u64) -> ParticleSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ps = ParticleSet::new(N, &mut rng);
        generate_shape(&mut ps, shape, &mut rng);
        ps
    }

    // ── every shape ──────────────────────────────────────────────────────
    #[test]
    fn all_shapes_finite_with_unit_colors() {
        for shape in Shape::ALL {
            let ps = generated(shape, 1);
            assert!(ps.targets().iter().all(|v| v.is_finite()), "{} has non-finite target", shape);
            assert!(
                ps.colors().iter().all(|c| (0.0..=1.0).contains(c)),
                "{} has colour outside [0,1]", shape
            );
        }
    }

    #[test]
    fn buffers_have_fixed_length() {
        let ps = generated(Shape::Torus, 2);
        assert_eq!(ps.count(), N);
        assert_eq!(ps.positions().len(), N * 3);
        assert_eq!(ps.targets().len(),   N * 3);
        assert_eq!(ps.colors().len(),    N * 3);
    }

    // ── per-shape bounds ─────────────────────────────────────────────────
    #[test]
    fn sphere_radius_is_ten() {
        let ps = generated(Shape::Sphere, 3);
        for i in 0..N {
            let r = ps.target(i).length();
            assert!((r - 10.0).abs() < 1e-3, "particle {} at radius {}", i, r);
        }
    }

    #[test]
    fn torus_points_on_tube() {
        let ps = generated(Shape::Torus, 4);
        for i in 0..N {
            let p = ps.target(i);
            let ring = (p.x * p.x + p.y * p.y).sqrt() - 10.0;
            let tube = (ring * ring + p.z * p.z).sqrt();
            assert!((tube - 3.0).abs() < 1e-3, "particle {} tube distance {}", i, tube);
        }
    }

    #[test]
    fn saturn_points_on_planet_or_ring() {
        let ps = generated(Shape::Saturn, 5);
        let (mut planet, mut ring) = (0, 0);
        for i in 0..N {
            let r = ps.target(i).length();
            if (r - 6.0).abs() < 1e-3 {
                planet += 1;
            } else {
                assert!((8.0 - 1e-3..14.01).contains(&r), "particle {} at radius {}", i, r);
                ring += 1;
            }
        }
        // ~70/30 split
        assert!(planet > ring * 2, "planet={} ring={}", planet, ring);
        assert!(ring > 0);
    }

    #[test]
    fn heart_depth_jitter_bounded() {
        let ps = generated(Shape::Heart, 6);
        for i in 0..N {
            let p = ps.target(i);
            assert!(p.z.abs() <= 2.5);
            assert!(p.x.abs() <= 8.0 + 1e-4);
        }
    }

    #[test]
    fn heart_is_reddish() {
        let ps = generated(Shape::Heart, 7);
        for i in 0..N {
            let c = ps.color(i);
            assert!(c.x > c.y && c.x > c.z, "particle {} colour {:?}", i, c);
        }
    }

    // ── flower determinism ───────────────────────────────────────────────
    #[test]
    fn flower_is_deterministic() {
        let a = generated(Shape::Flower, 10);
        let b = generated(Shape::Flower, 99);
        assert_eq!(a.targets(), b.targets());
        assert_eq!(a.colors(),  b.colors());
    }

    #[test]
    fn flower_regeneration_identical() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut ps = ParticleSet::new(500, &mut rng);
        generate_shape(&mut ps, Shape::Flower, &mut rng);
        let first = ps.targets().to_vec();
        generate_shape(&mut ps, Shape::Flower, &mut rng);
        assert_eq!(first, ps.targets());
    }

    // ── buffer ownership ─────────────────────────────────────────────────
    #[test]
    fn generation_leaves_positions_alone() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut ps = ParticleSet::new(300, &mut rng);
        let before = ps.positions().to_vec();
        generate_shape(&mut ps, Shape::Saturn, &mut rng);
        assert_eq!(before, ps.positions());
    }

    #[test]
    fn generation_marks_colors_dirty() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut ps = ParticleSet::new(10, &mut rng);
        assert!(ps.take_colors_dirty());
        assert!(!ps.take_colors_dirty());
        generate_shape(&mut ps, Shape::Sphere, &mut rng);
        assert!(ps.take_colors_dirty());
    }

    #[test]
    fn initial_scatter_within_cube() {
        let mut rng = StdRng::seed_from_u64(14);
        let ps = ParticleSet::new(1_000, &mut rng);
        assert!(ps.positions().iter().all(|v| (-25.0..25.0).contains(v)));
    }

    // ── registry ─────────────────────────────────────────────────────────
    #[test]
    fn registry_cycles() {
        let mut reg = ShapeRegistry::new();
        assert_eq!(reg.current(), Shape::Sphere);
        let seen: Vec<Shape> = (0..5).map(|_| reg.advance()).collect();
        assert_eq!(seen, [Shape::Heart, Shape::Saturn, Shape::Flower, Shape::Torus, Shape::Sphere]);
        assert_eq!(reg.index(), 0);
    }

    #[test]
    fn shape_parse_round_trip() {
        for shape in Shape::ALL {
            assert_eq!(shape.label().parse::<Shape>().unwrap(), shape);
        }
        assert!("cube".parse::<Shape>().is_err());
    }

    // ── colour conversion ────────────────────────────────────────────────
    #[test]
    fn hsl_primaries() {
        let red = hsl_to_rgb(0.0, 1.0, 0.5);
        assert!((red - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        let green = hsl_to_rgb(1.0 / 3.0, 1.0, 0.5);
        assert!((green - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        let grey = hsl_to_rgb(0.42, 0.0, 0.3);
        assert_eq!(grey, Vec3::splat(0.3));
    }

    #[test]
    fn hsl_hue_wraps() {
        let a = hsl_to_rgb(0.02, 1.0, 0.4);
        let b = hsl_to_rgb(1.02, 1.0, 0.4);
        assert!((a - b).length() < 1e-5);
    }
}
