//! Device-tier defaults and optional TOML overrides.
//!
//! All tunables are picked once at startup.  The tier comes from a viewport
//! width heuristic (narrow windows get the lighter "mobile" profile); a TOML
//! file can then override individual knobs:
//!
//! ```toml
//! tier            = "desktop"
//! particle_count  = 20000
//! sensitivity     = [-45.0, -30.0]
//! backend         = "sim"
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::animation::BASE_EASING;
use crate::error::ConfigError;

/// Viewports narrower than this use [`DeviceTier::Mobile`].
pub const NARROW_VIEWPORT_PX: usize = 768;

// ════════════════════════════════════════════════════════════════════════════
// DeviceTier
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    Desktop,
    Mobile,
}

impl DeviceTier {
    pub fn from_viewport_width(width: usize) -> Self {
        if width < NARROW_VIEWPORT_PX { DeviceTier::Mobile } else { DeviceTier::Desktop }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CaptureBackend
// ════════════════════════════════════════════════════════════════════════════

/// Where hand landmarks come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// Mouse-driven simulated hand.
    Sim,
    /// LeapMotion controller (requires the `leap` feature).
    Leap,
    /// No hand input at all.
    Off,
}

impl FromStr for CaptureBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sim"  => Ok(CaptureBackend::Sim),
            "leap" => Ok(CaptureBackend::Leap),
            "off" | "none" => Ok(CaptureBackend::Off),
            other  => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Config
// ════════════════════════════════════════════════════════════════════════════

/// Every tunable of the application.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub tier:              DeviceTier,
    pub particle_count:    usize,
    /// World-space point size handed to the renderer.
    pub particle_size:     f32,
    /// Camera-space → world-space scale for the hand point, `[x, y]`.
    pub sensitivity:       [f32; 2],
    /// Vertical shift of the hand interaction point (world units).
    pub hand_offset_y:     f32,
    /// Amplitude of the per-particle easing speed wobble.
    pub time_factor:       f32,
    /// Wrist-to-index-tip distance (normalised) under which a hand is a fist.
    pub fist_threshold:    f32,
    /// 0 = lite landmark model, 1 = full.
    pub model_complexity:  u8,
    pub capture_resolution: [u32; 2],
    pub min_detection_confidence: f32,
    pub min_tracking_confidence:  f32,
    /// Landmark frames per second delivered by the capture backend.
    pub capture_fps:       u32,
    pub backend:           CaptureBackend,
    /// Fixed RNG seed for shape sampling; random when `None`.
    pub seed:              Option<u64>,
}

impl Config {
    /// Defaults for a device tier.
    pub fn for_tier(tier: DeviceTier) -> Self {
        let mobile = tier == DeviceTier::Mobile;
        Config {
            tier,
            particle_count:    if mobile { 6_000 } else { 15_000 },
            particle_size:     if mobile { 0.12 } else { 0.08 },
            sensitivity:       if mobile { [-25.0, -35.0] } else { [-40.0, -30.0] },
            hand_offset_y:     if mobile { 5.0 } else { 0.0 },
            time_factor:       if mobile { 0.005 } else { 0.01 },
            fist_threshold:    if mobile { 0.15 } else { 0.2 },
            model_complexity:  if mobile { 0 } else { 1 },
            capture_resolution: if mobile { [480, 360] } else { [640, 480] },
            min_detection_confidence: 0.5,
            min_tracking_confidence:  0.5,
            capture_fps:       30,
            backend:           CaptureBackend::Sim,
            seed:              None,
        }
    }

    /// Tier defaults (tier taken from `overrides` if set) with `overrides`
    /// applied, then validated.
    pub fn resolve(default_tier: DeviceTier, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut cfg = Config::for_tier(overrides.tier.unwrap_or(default_tier));
        overrides.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read overrides from a TOML file and resolve them against `default_tier`.
    pub fn load(path: &Path, default_tier: DeviceTier) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::resolve(default_tier, ConfigOverrides::from_toml_str(&text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> ConfigError {
            ConfigError::Invalid { field, reason: reason.to_string() }
        }

        if self.particle_count == 0 {
            return Err(invalid("particle_count", "must be at least 1"));
        }
        if !(self.particle_size > 0.0 && self.particle_size.is_finite()) {
            return Err(invalid("particle_size", "must be positive and finite"));
        }
        if !(0.0..BASE_EASING).contains(&self.time_factor) {
            return Err(invalid("time_factor", "must be within [0, 0.03)"));
        }
        if !self.hand_offset_y.is_finite() {
            return Err(invalid("hand_offset_y", "must be finite"));
        }
        if !(self.fist_threshold > 0.0) {
            return Err(invalid("fist_threshold", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(invalid("min_detection_confidence", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.min_tracking_confidence) {
            return Err(invalid("min_tracking_confidence", "must be within [0, 1]"));
        }
        if self.capture_fps == 0 {
            return Err(invalid("capture_fps", "must be at least 1"));
        }
        if self.capture_resolution.contains(&0) {
            return Err(invalid("capture_resolution", "dimensions must be non-zero"));
        }
        if self.sensitivity.iter().any(|s| !s.is_finite()) {
            return Err(invalid("sensitivity", "must be finite"));
        }
        Ok(())
    }

    /// Time between two landmark frames.
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.capture_fps.max(1)))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ConfigOverrides — the TOML file
// ════════════════════════════════════════════════════════════════════════════

/// Optional per-field overrides; anything left out keeps the tier default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub tier:              Option<DeviceTier>,
    pub particle_count:    Option<usize>,
    pub particle_size:     Option<f32>,
    pub sensitivity:       Option<[f32; 2]>,
    pub hand_offset_y:     Option<f32>,
    pub time_factor:       Option<f32>,
    pub fist_threshold:    Option<f32>,
    pub model_complexity:  Option<u8>,
    pub capture_resolution: Option<[u32; 2]>,
    pub min_detection_confidence: Option<f32>,
    pub min_tracking_confidence:  Option<f32>,
    pub capture_fps:       Option<u32>,
    pub backend:           Option<CaptureBackend>,
    pub seed:              Option<u64>,
}

impl ConfigOverrides {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply(self, cfg: &mut Config) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $( if let Some(v) = self.$field { cfg.$field = v; } )*
            };
        }
        set!(
            particle_count, particle_size, sensitivity, hand_offset_y,
            time_factor, fist_threshold, model_complexity, capture_resolution,
            min_detection_confidence, min_tracking_confidence, capture_fps,
            backend,
        );
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
