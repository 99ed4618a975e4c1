//! Per-frame particle update.
//!
//! Each frame every particle eases toward its target with a slightly
//! different, time-varying speed, then feels a radial force if a hand is
//! detected within [`INTERACTION_RADIUS`] of it.  The easing is a first-order
//! filter with no velocity state, so for `speed ∈ (0, 1)` a particle never
//! overshoots its target.

use glam::{Vec2, Vec3};
use morph_shapes::ParticleSet;

use crate::config::Config;
use crate::gesture::{GestureMode, HandState};

pub const INTERACTION_RADIUS: f32 = 15.0;
pub const REPEL_STRENGTH:     f32 = 0.5;
pub const ATTRACT_STRENGTH:   f32 = 0.05;
/// Mean easing speed; `time_factor` must stay below it.
pub const BASE_EASING:        f32 = 0.03;
const YAW_PER_FRAME:          f32 = 0.002;
const ROLL_PER_FRAME:         f32 = 0.001;

/// Easing factor for particle `index` at `elapsed_ms` since start.
pub fn easing_speed(index: usize, elapsed_ms: f64, time_factor: f32) -> f32 {
    let phase = index as f64 + elapsed_ms * 0.001;
    BASE_EASING + phase.sin() as f32 * time_factor
}

/// Displacement applied to a particle at `pos` by a hand at `hand`.
///
/// Zero outside the interaction radius (the boundary itself is outside), in
/// neutral mode, and when the particle sits exactly on the hand point.
pub fn hand_force(pos: Vec3, hand: Vec3, mode: GestureMode) -> Vec3 {
    let d    = pos - hand;
    let dist = d.length();
    if !(dist > 0.0 && dist < INTERACTION_RADIUS) {
        return Vec3::ZERO;
    }
    let dir = d / dist;
    match mode {
        GestureMode::Repel   =>  dir * (INTERACTION_RADIUS - dist) * REPEL_STRENGTH,
        GestureMode::Attract => -dir * (INTERACTION_RADIUS - dist) * ATTRACT_STRENGTH,
        GestureMode::Neutral => Vec3::ZERO,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandMapping — camera space → world space
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandMapping {
    pub sensitivity: Vec2,
    pub offset_y:    f32,
}

impl HandMapping {
    pub fn from_config(cfg: &Config) -> Self {
        HandMapping {
            sensitivity: Vec2::from_array(cfg.sensitivity),
            offset_y:    cfg.hand_offset_y,
        }
    }

    /// World-space interaction point for a normalised camera position; depth is 0.
    pub fn world_point(&self, camera: Vec2) -> Vec3 {
        let p = (camera - Vec2::splat(0.5)) * self.sensitivity;
        Vec3::new(p.x, p.y + self.offset_y, 0.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Rotation — ambient spin of the whole cloud
// ════════════════════════════════════════════════════════════════════════════

/// Accumulated group rotation in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    /// About the Y axis.
    pub yaw:  f32,
    /// About the Z axis.
    pub roll: f32,
}

impl Rotation {
    fn advance(&mut self) {
        self.yaw  += YAW_PER_FRAME;
        self.roll += ROLL_PER_FRAME;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Animator
// ════════════════════════════════════════════════════════════════════════════

pub struct Animator {
    mapping:     HandMapping,
    time_factor: f32,
    rotation:    Rotation,
    frames:      u64,
}

impl Animator {
    pub fn new(mapping: HandMapping, time_factor: f32) -> Self {
        Animator { mapping, time_factor, rotation: Rotation::default(), frames: 0 }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Animator::new(HandMapping::from_config(cfg), cfg.time_factor)
    }

    pub fn rotation(&self) -> Rotation { self.rotation }
    pub fn frames(&self)   -> u64      { self.frames }
    pub fn mapping(&self)  -> &HandMapping { &self.mapping }

    /// Advance every particle by one frame.
    pub fn step(&mut self, particles: &mut ParticleSet, hand: &HandState, elapsed_ms: f64) {
        let hand_point = hand.detected.then(|| self.mapping.world_point(hand.position));

        let (positions, targets) = particles.positions_and_targets_mut();
        for (i, (pos, target)) in positions
            .chunks_exact_mut(3)
            .zip(targets.chunks_exact(3))
            .enumerate()
        {
            let speed = easing_speed(i, elapsed_ms, self.time_factor);
            let mut p = Vec3::from_slice(pos);
            p += (Vec3::from_slice(target) - p) * speed;

            if let Some(h) = hand_point {
                p += hand_force(p, h, hand.mode);
            }
            pos.copy_from_slice(&p.to_array());
        }

        particles.mark_positions_dirty();
        self.rotation.advance();
        self.frames += 1;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
