//! Hand-landmark interpretation.
//!
//! A landmark frame is 21 normalised points following the usual hand-pose
//! numbering (0 = wrist, 1–4 thumb, 5–8 index, 9–12 middle, 13–16 ring,
//! 17–20 pinky; within a finger MCP → PIP → DIP → TIP).  Camera-space `y`
//! grows downward.
//!
//! [`GestureInterpreter::ingest`] turns each frame into a [`HandState`]:
//!
//! | Pose | Test | Effect |
//! |---|---|---|
//! | none | no hand in frame | `detected = false`, rest untouched |
//! | victory | index + middle tips above their MCPs, ring + pinky tips below | [`GestureEvent::CycleShape`] (once per 2 s), mode Neutral |
//! | fist | index tip within `fist_threshold` of the wrist | mode Repel |
//! | anything else | | mode Attract |

use std::time::{Duration, Instant};

use glam::Vec2;

// ════════════════════════════════════════════════════════════════════════════
// Landmarks
// ════════════════════════════════════════════════════════════════════════════

pub const LANDMARK_COUNT: usize = 21;

/// Indices into [`HandLandmarks`].
pub mod landmark {
    pub const WRIST:      usize = 0;
    pub const THUMB_CMC:  usize = 1;
    pub const THUMB_MCP:  usize = 2;
    pub const THUMB_IP:   usize = 3;
    pub const THUMB_TIP:  usize = 4;
    pub const INDEX_MCP:  usize = 5;
    pub const INDEX_PIP:  usize = 6;
    pub const INDEX_DIP:  usize = 7;
    pub const INDEX_TIP:  usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP:   usize = 13;
    pub const RING_PIP:   usize = 14;
    pub const RING_DIP:   usize = 15;
    pub const RING_TIP:   usize = 16;
    pub const PINKY_MCP:  usize = 17;
    pub const PINKY_PIP:  usize = 18;
    pub const PINKY_DIP:  usize = 19;
    pub const PINKY_TIP:  usize = 20;

    /// MCP index of each finger (index, middle, ring, pinky).
    pub const FINGER_BASES: [usize; 4] = [INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
}

/// One tracked keypoint in normalised camera space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self { Landmark { x, y, z } }

    pub fn xy(&self) -> Vec2 { Vec2::new(self.x, self.y) }
}

/// All 21 landmarks of one detected hand.
pub type HandLandmarks = [Landmark; LANDMARK_COUNT];

// ════════════════════════════════════════════════════════════════════════════
// Hand state
// ════════════════════════════════════════════════════════════════════════════

/// What the animation does with a detected hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GestureMode {
    #[default]
    Neutral,
    Attract,
    Repel,
}

/// Latest interpreted hand, read by the animation every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandState {
    /// Palm centre (landmark 9) in normalised camera space.
    pub position: Vec2,
    pub detected: bool,
    pub mode:     GestureMode,
}

/// Discrete events raised while interpreting a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureEvent {
    /// Victory sign outside the debounce window: move to the next shape.
    CycleShape,
}

/// Minimum time between two shape switches.
pub const SHAPE_SWITCH_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Index and middle fingers raised, ring and pinky folded.
pub fn is_victory(hand: &HandLandmarks) -> bool {
    use landmark::*;
    hand[INDEX_TIP].y  < hand[INDEX_MCP].y
        && hand[MIDDLE_TIP].y < hand[MIDDLE_MCP].y
        && hand[RING_TIP].y   > hand[RING_MCP].y
        && hand[PINKY_TIP].y  > hand[PINKY_MCP].y
}

/// Index fingertip pulled in close to the wrist.
pub fn is_fist(hand: &HandLandmarks, threshold: f32) -> bool {
    use landmark::*;
    hand[INDEX_TIP].xy().distance(hand[WRIST].xy()) < threshold
}

// ════════════════════════════════════════════════════════════════════════════
// GestureInterpreter
// ════════════════════════════════════════════════════════════════════════════

pub struct GestureInterpreter {
    state:          HandState,
    fist_threshold: f32,
    debounce:       Duration,
    last_switch:    Option<Instant>,
}

impl GestureInterpreter {
    pub fn new(fist_threshold: f32) -> Self {
        GestureInterpreter {
            state: HandState::default(),
            fist_threshold,
            debounce: SHAPE_SWITCH_DEBOUNCE,
            last_switch: None,
        }
    }

    /// Snapshot of the current hand state.
    pub fn state(&self) -> HandState { self.state }

    /// Interpret one landmark frame received at `now`.
    ///
    /// Returns [`GestureEvent::CycleShape`] when a victory sign clears the
    /// debounce window.  A victory sign held continuously fires once per
    /// window; nothing is queued.
    pub fn ingest(&mut self, frame: Option<&HandLandmarks>, now: Instant) -> Option<GestureEvent> {
        let Some(hand) = frame else {
            if self.state.detected {
                log::debug!("hand lost");
            }
            self.state.detected = false;
            return None;
        };

        self.state.detected = true;
        self.state.position = hand[landmark::MIDDLE_MCP].xy();

        if is_victory(hand) {
            let ready = self
                .last_switch
                .map_or(true, |t| now.saturating_duration_since(t) >= self.debounce);
            if !ready {
                return None;
            }
            self.last_switch = Some(now);
            self.set_mode(GestureMode::Neutral);
            return Some(GestureEvent::CycleShape);
        }

        let mode = if is_fist(hand, self.fist_threshold) {
            GestureMode::Repel
        } else {
            GestureMode::Attract
        };
        self.set_mode(mode);
        None
    }

    fn set_mode(&mut self, mode: GestureMode) {
        if self.state.mode != mode {
            log::debug!("gesture mode {:?} -> {:?}", self.state.mode, mode);
            self.state.mode = mode;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hands
// ════════════════════════════════════════════════════════════════════════════

/// Pose for [`synthetic_hand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandPose {
    Open,
    Fist,
    Victory,
}

// Offsets from the palm centre (landmark 9), in normalised camera units.
const WRIST_OFFSET: Vec2 = Vec2::new(0.0, 0.15);
const FINGER_MCP_OFFSETS: [Vec2; 4] = [
    Vec2::new(-0.030, 0.000),
    Vec2::new( 0.000, 0.000),
    Vec2::new( 0.030, 0.005),
    Vec2::new( 0.055, 0.015),
];
const THUMB_OFFSETS: [Vec2; 4] = [
    Vec2::new(-0.050, 0.090),
    Vec2::new(-0.070, 0.060),
    Vec2::new(-0.085, 0.035),
    Vec2::new(-0.095, 0.010),
];
// PIP, DIP, TIP relative to the finger's MCP.
const EXTENDED: [Vec2; 3] = [Vec2::new(0.0, -0.040), Vec2::new(0.0, -0.070), Vec2::new(0.0, -0.095)];
const CURLED:   [Vec2; 3] = [Vec2::new(0.0, -0.025), Vec2::new(0.0, -0.010), Vec2::new(0.0,  0.020)];

/// Build an upright right hand centred on `palm` in the given pose.
///
/// Used by the pointer-driven simulator and as a fixture in tests.
pub fn synthetic_hand(palm: Vec2, pose: HandPose) -> HandLandmarks {
    let mut hand = [Landmark::default(); LANDMARK_COUNT];
    let mut put = |i: usize, offset: Vec2| {
        let p = palm + offset;
        hand[i] = Landmark::new(p.x, p.y, 0.0);
    };

    put(landmark::WRIST, WRIST_OFFSET);
    for (k, offset) in THUMB_OFFSETS.iter().enumerate() {
        put(landmark::THUMB_CMC + k, *offset);
    }

    for (finger, &base) in landmark::FINGER_BASES.iter().enumerate() {
        let raised = match pose {
            HandPose::Open    => true,
            HandPose::Fist    => false,
            HandPose::Victory => finger < 2,
        };
        let joints = if raised { &EXTENDED } else { &CURLED };
        let mcp = FINGER_MCP_OFFSETS[finger];
        put(base, mcp);
        for (j, rel) in joints.iter().enumerate() {
            put(base + 1 + j, mcp + *rel);
        }
    }
    hand
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP_FIST: f32 = 0.2;
    const MOBILE_FIST:  f32 = 0.15;

    fn centre() -> Vec2 { Vec2::new(0.5, 0.5) }

    #[test]
    fn synthetic_poses_classify() {
        let open    = synthetic_hand(centre(), HandPose::Open);
        let fist    = synthetic_hand(centre(), HandPose::Fist);
        let victory = synthetic_hand(centre(), HandPose::Victory);

        assert!(!is_victory(&open));
        assert!(!is_victory(&fist));
        assert!(is_victory(&victory));

        for threshold in [DESKTOP_FIST, MOBILE_FIST] {
            assert!(is_fist(&fist, threshold));
            assert!(!is_fist(&open, threshold));
        }
    }

    #[test]
    fn open_hand_attracts_at_palm() {
        let mut g = GestureInterpreter::new(DESKTOP_FIST);
        let palm = Vec2::new(0.3, 0.7);
        let ev = g.ingest(Some(&synthetic_hand(palm, HandPose::Open)), Instant::now());
        assert_eq!(ev, None);
        let s = g.state();
        assert!(s.detected);
        assert_eq!(s.mode, GestureMode::Attract);
        assert!((s.position - palm).length() < 1e-6);
    }

    #[test]
    fn fist_repels() {
        let mut g = GestureInterpreter::new(MOBILE_FIST);
        g.ingest(Some(&synthetic_hand(centre(), HandPose::Fist)), Instant::now());
        assert_eq!(g.state().mode, GestureMode::Repel);
    }

    #[test]
    fn missing_hand_keeps_last_position_and_mode() {
        let mut g = GestureInterpreter::new(DESKTOP_FIST);
        let palm = Vec2::new(0.2, 0.4);
        g.ingest(Some(&synthetic_hand(palm, HandPose::Fist)), Instant::now());
        g.ingest(None, Instant::now());
        let s = g.state();
        assert!(!s.detected);
        assert_eq!(s.mode, GestureMode::Repel);
        assert!((s.position - palm).length() < 1e-6);
    }

    #[test]
    fn victory_cycles_and_neutralises() {
        let mut g = GestureInterpreter::new(DESKTOP_FIST);
        let t0 = Instant::now();
        g.ingest(Some(&synthetic_hand(centre(), HandPose::Fist)), t0);
        let ev = g.ingest(Some(&synthetic_hand(centre(), HandPose::Victory)), t0);
        assert_eq!(ev, Some(GestureEvent::CycleShape));
        assert_eq!(g.state().mode, GestureMode::Neutral);
    }

    #[test]
    fn debounce_500ms_fires_once() {
        let mut g = GestureInterpreter::new(DESKTOP_FIST);
        let v = synthetic_hand(centre(), HandPose::Victory);
        let t0 = Instant::now();
        let fired = [t0, t0 + Duration::from_millis(500)]
            .into_iter()
            .filter(|&t| g.ingest(Some(&v), t).is_some())
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn debounce_2100ms_fires_twice() {
        let mut g = GestureInterpreter::new(DESKTOP_FIST);
        let v = synthetic_hand(centre(), HandPose::Victory);
        let t0 = Instant::now();
        let fired = [t0, t0 + Duration::from_millis(2100)]
            .into_iter()
            .filter(|&t| g.ingest(Some(&v), t).is_some())
            .count();
        assert_eq!(fired, 2);
    }

    #[test]
    fn held_victory_fires_once_per_window() {
        let mut g = GestureInterpreter::new(DESKTOP_FIST);
        let v = synthetic_hand(centre(), HandPose::Victory);
        let t0 = Instant::now();
        let fired = (0..45)
            .map(|k| t0 + Duration::from_millis(k * 100))
            .filter(|&t| g.ingest(Some(&v), t).is_some())
            .count();
        // t = 0, 2000, 4000
        assert_eq!(fired, 3);
    }

    #[test]
    fn debounced_victory_leaves_mode_alone() {
        let mut g = GestureInterpreter::new(DESKTOP_FIST);
        let t0 = Instant::now();
        g.ingest(Some(&synthetic_hand(centre(), HandPose::Victory)), t0);
        g.ingest(Some(&synthetic_hand(centre(), HandPose::Open)), t0 + Duration::from_millis(100));
        let ev = g.ingest(
            Some(&synthetic_hand(centre(), HandPose::Victory)),
            t0 + Duration::from_millis(200),
        );
        assert_eq!(ev, None);
        assert_eq!(g.state().mode, GestureMode::Attract);
    }
}
