//! Hand-landmark sources — a pointer-driven simulator and LeapMotion hardware.
//!
//! Every source runs on its own thread and delivers [`CaptureEvent`]s over an
//! `mpsc` channel.  The render loop drains the channel between frames, so it
//! never blocks on capture and always works from the latest hand it has seen.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use glam::Vec2;
use rand::Rng;

use crate::config::{CaptureBackend, Config};
use crate::error::CaptureError;
use crate::gesture::{synthetic_hand, HandLandmarks, HandPose};

// ════════════════════════════════════════════════════════════════════════════
// Events, status and profile
// ════════════════════════════════════════════════════════════════════════════

/// Message from a landmark source.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureEvent {
    /// One processed frame: the first detected hand, or `None`.
    Frame(Option<HandLandmarks>),
    /// The source could not start or died; no further frames will arrive.
    Failed(CaptureError),
}

/// Capture state shown on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureStatus {
    Starting,
    Active,
    Unsupported,
    Error,
}

impl CaptureStatus {
    pub fn label(self) -> &'static str {
        match self {
            CaptureStatus::Starting    => "STARTING",
            CaptureStatus::Active      => "ACTIVE",
            CaptureStatus::Unsupported => "CAPTURE UNSUPPORTED",
            CaptureStatus::Error       => "ERROR",
        }
    }
}

/// Settings handed to a landmark source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureProfile {
    pub resolution:       [u32; 2],
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence:  f32,
    pub interval:         Duration,
}

impl CaptureProfile {
    pub fn from_config(cfg: &Config) -> Self {
        CaptureProfile {
            resolution:       cfg.capture_resolution,
            model_complexity: cfg.model_complexity,
            min_detection_confidence: cfg.min_detection_confidence,
            min_tracking_confidence:  cfg.min_tracking_confidence,
            interval:         cfg.capture_interval(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`CaptureEvent`]s over a channel.
pub trait LandmarkSource: Send + 'static {
    fn name(&self) -> &'static str;
    fn run(self: Box<Self>, tx: Sender<CaptureEvent>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S) -> Receiver<CaptureEvent> {
    let (tx, rx) = mpsc::channel();
    log::info!("starting {} hand capture", source.name());
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

/// Start the configured backend.
///
/// `sim_rx` feeds the simulator and is ignored by the other backends.
pub fn open_backend(
    backend: CaptureBackend,
    profile: CaptureProfile,
    sim_rx:  Receiver<SimInput>,
) -> Result<Receiver<CaptureEvent>, CaptureError> {
    match backend {
        CaptureBackend::Sim => Ok(spawn_landmark_source(SimLandmarkSource::new(sim_rx, profile))),
        #[cfg(feature = "leap")]
        CaptureBackend::Leap => Ok(spawn_landmark_source(LeapLandmarkSource::new(profile))),
        #[cfg(not(feature = "leap"))]
        CaptureBackend::Leap => Err(CaptureError::Unsupported(
            "built without the `leap` feature".to_string(),
        )),
        CaptureBackend::Off => Err(CaptureError::Unsupported("hand capture disabled".to_string())),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — pointer-driven simulated hand (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the visualizer window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer in normalised window coordinates, `None` when outside.
    Pointer(Option<Vec2>),
    Pose(HandPose),
    Quit,
}

/// Width of the border band (normalised) over which detection confidence
/// falls from 1 to 0.
const EDGE_BAND: f32 = 0.1;

/// Detection model for the simulated hand.
///
/// Confidence drops toward the window edges.  A new hand needs
/// `min_detection_confidence`; an already tracked one is kept down to
/// `min_tracking_confidence`.  Landmarks get camera-like jitter (stronger for
/// the lite model) and are snapped to the capture resolution.
#[derive(Clone, Debug)]
pub struct SimHand {
    profile:  CaptureProfile,
    tracking: bool,
}

impl SimHand {
    pub fn new(profile: CaptureProfile) -> Self {
        SimHand { profile, tracking: false }
    }

    /// Confidence that a hand at `pointer` is visible.
    pub fn confidence(pointer: Vec2) -> f32 {
        let edge = pointer.x.min(pointer.y).min(1.0 - pointer.x).min(1.0 - pointer.y);
        (edge / EDGE_BAND).clamp(0.0, 1.0)
    }

    /// Landmarks for one capture tick.
    pub fn observe<R: Rng + ?Sized>(
        &mut self,
        pointer: Option<Vec2>,
        pose:    HandPose,
        rng:     &mut R,
    ) -> Option<HandLandmarks> {
        let Some(pointer) = pointer else {
            self.tracking = false;
            return None;
        };

        let needed = if self.tracking {
            self.profile.min_tracking_confidence
        } else {
            self.profile.min_detection_confidence
        };
        self.tracking = Self::confidence(pointer) >= needed;
        if !self.tracking {
            return None;
        }

        // Selfie camera: the image is mirrored horizontally.
        let palm = Vec2::new(1.0 - pointer.x, pointer.y);
        let mut hand = synthetic_hand(palm, pose);

        let jitter = if self.profile.model_complexity == 0 { 0.004 } else { 0.0015 };
        let [w, h] = self.profile.resolution;
        for lm in hand.iter_mut() {
            lm.x = snap(lm.x + rng.gen_range(-jitter..=jitter), w);
            lm.y = snap(lm.y + rng.gen_range(-jitter..=jitter), h);
        }
        Some(hand)
    }
}

fn snap(v: f32, pixels: u32) -> f32 {
    let n = pixels.max(1) as f32;
    (v * n).round() / n
}

/// Landmark source driven by [`SimInput`] events from the visualizer.
///
/// Frames are produced on a fixed cadence independent of the render loop,
/// like a camera pipeline would.
pub struct SimLandmarkSource {
    rx:      Receiver<SimInput>,
    profile: CaptureProfile,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>, profile: CaptureProfile) -> Self {
        SimLandmarkSource { rx, profile }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn name(&self) -> &'static str { "simulated" }

    fn run(self: Box<Self>, tx: Sender<CaptureEvent>) {
        let mut hand    = SimHand::new(self.profile);
        let mut rng     = rand::thread_rng();
        let mut pointer = None;
        let mut pose    = HandPose::Open;

        loop {
            loop {
                match self.rx.try_recv() {
                    Ok(SimInput::Pointer(p)) => pointer = p,
                    Ok(SimInput::Pose(p))    => pose = p,
                    Ok(SimInput::Quit) | Err(TryRecvError::Disconnected) => return,
                    Err(TryRecvError::Empty) => break,
                }
            }

            thread::sleep(self.profile.interval);

            let frame = hand.observe(pointer, pose, &mut rng);
            if tx.send(CaptureEvent::Frame(frame)).is_err() {
                return;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Landmark source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Leap joints (millimetres, y up) are mapped onto the 21-point convention and
/// normalised over a fixed interaction box so they read like a mirrored
/// camera image.
#[cfg(feature = "leap")]
pub struct LeapLandmarkSource {
    profile: CaptureProfile,
}

#[cfg(feature = "leap")]
impl LeapLandmarkSource {
    pub fn new(profile: CaptureProfile) -> Self {
        LeapLandmarkSource { profile }
    }
}

#[cfg(feature = "leap")]
impl LandmarkSource for LeapLandmarkSource {
    fn name(&self) -> &'static str { "LeapMotion" }

    fn run(self: Box<Self>, tx: Sender<CaptureEvent>) {
        use leaprs::*;

        let fail = |what: &str, tx: &Sender<CaptureEvent>| {
            let _ = tx.send(CaptureEvent::Failed(CaptureError::StartFailed(what.to_string())));
        };

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => return fail(&format!("cannot create LeapC connection: {:?}", e), &tx),
        };
        if let Err(e) = connection.open() {
            return fail(&format!("cannot open LeapMotion device: {:?}", e), &tx);
        }

        let timeout = self.profile.interval.as_millis().max(1) as u32;
        loop {
            let msg = match connection.poll(timeout) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let landmarks = frame.hands().next().and_then(|h| leap_landmarks(&h));
                if tx.send(CaptureEvent::Frame(landmarks)).is_err() {
                    return;
                }
            }
        }
    }
}

/// Map a Leap hand onto the 21-landmark layout.
///
/// Per digit: MCP = proximal base, PIP = intermediate base, DIP = distal base,
/// TIP = distal end.  The wrist is the base of the middle metacarpal.
#[cfg(feature = "leap")]
fn leap_landmarks(hand: &leaprs::Hand) -> Option<HandLandmarks> {
    use crate::gesture::{landmark, Landmark, LANDMARK_COUNT};

    // Interaction box above the device, millimetres.
    const HALF_WIDTH: f32 = 200.0;
    const FLOOR:      f32 = 80.0;
    const HEIGHT:     f32 = 320.0;

    let to_camera = |x: f32, y: f32, z: f32| Landmark::new(
        0.5 - x / (2.0 * HALF_WIDTH),
        1.0 - (y - FLOOR) / HEIGHT,
        z / (2.0 * HALF_WIDTH),
    );

    let digits: Vec<_> = hand.digits().collect();
    if digits.len() < 5 {
        return None;
    }

    let mut out = [Landmark::default(); LANDMARK_COUNT];
    let wrist = digits[2].metacarpal().prev_joint();
    out[landmark::WRIST] = to_camera(wrist.x, wrist.y, wrist.z);

    for (d, digit) in digits.iter().take(5).enumerate() {
        let first = 1 + d * 4;
        let joints = [
            digit.proximal().prev_joint(),
            digit.intermediate().prev_joint(),
            digit.distal().prev_joint(),
            digit.distal().next_joint(),
        ];
        for (k, j) in joints.iter().enumerate() {
            out[first + k] = to_camera(j.x, j.y, j.z);
        }
    }
    Some(out)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceTier;
    use crate::gesture::{is_fist, is_victory, landmark};
    use rand::{rngs::StdRng, SeedableRng};

    fn profile() -> CaptureProfile {
        CaptureProfile::from_config(&Config::for_tier(DeviceTier::Desktop))
    }

    #[test]
    fn status_labels() {
        assert_eq!(CaptureStatus::Active.label(), "ACTIVE");
        assert_eq!(CaptureStatus::Unsupported.label(), "CAPTURE UNSUPPORTED");
    }

    #[test]
    fn confidence_falls_off_at_edges() {
        assert_eq!(SimHand::confidence(Vec2::splat(0.5)), 1.0);
        assert_eq!(SimHand::confidence(Vec2::new(0.0, 0.5)), 0.0);
        let c = SimHand::confidence(Vec2::new(0.03, 0.5));
        assert!(c > 0.0 && c < 0.5);
    }

    #[test]
    fn sim_hand_is_mirrored_and_classifiable() {
        let mut sim = SimHand::new(profile());
        let mut rng = StdRng::seed_from_u64(1);
        let hand = sim.observe(Some(Vec2::new(0.3, 0.4)), HandPose::Fist, &mut rng).unwrap();
        let palm = hand[landmark::MIDDLE_MCP];
        assert!((palm.x - 0.7).abs() < 0.01);
        assert!((palm.y - 0.4).abs() < 0.01);
        assert!(is_fist(&hand, 0.2));

        let v = sim.observe(Some(Vec2::new(0.5, 0.5)), HandPose::Victory, &mut rng).unwrap();
        assert!(is_victory(&v));
    }

    #[test]
    fn sim_hand_absent_without_pointer() {
        let mut sim = SimHand::new(profile());
        let mut rng = StdRng::seed_from_u64(2);
        assert!(sim.observe(None, HandPose::Open, &mut rng).is_none());
    }

    #[test]
    fn tracking_hysteresis() {
        let mut p = profile();
        p.min_detection_confidence = 0.8;
        p.min_tracking_confidence  = 0.3;
        let mut sim = SimHand::new(p);
        let mut rng = StdRng::seed_from_u64(3);
        let near_edge = Vec2::new(0.05, 0.5); // confidence 0.5

        // Not detected from cold near the edge…
        assert!(sim.observe(Some(near_edge), HandPose::Open, &mut rng).is_none());
        // …but kept once tracked in the middle.
        assert!(sim.observe(Some(Vec2::splat(0.5)), HandPose::Open, &mut rng).is_some());
        assert!(sim.observe(Some(near_edge), HandPose::Open, &mut rng).is_some());
    }

    #[test]
    fn off_backend_is_unsupported() {
        let (_tx, rx) = mpsc::channel();
        let err = open_backend(CaptureBackend::Off, profile(), rx).unwrap_err();
        assert!(matches!(err, CaptureError::Unsupported(_)));
    }

    #[cfg(not(feature = "leap"))]
    #[test]
    fn leap_without_feature_is_unsupported() {
        let (_tx, rx) = mpsc::channel();
        let err = open_backend(CaptureBackend::Leap, profile(), rx).unwrap_err();
        assert!(matches!(err, CaptureError::Unsupported(_)));
    }

    #[test]
    fn sim_source_emits_frames_and_stops_on_quit() {
        let (sim_tx, sim_rx) = mpsc::channel();
        let mut p = profile();
        p.interval = Duration::from_millis(1);
        sim_tx.send(SimInput::Pointer(Some(Vec2::splat(0.5)))).unwrap();
        sim_tx.send(SimInput::Pose(HandPose::Fist)).unwrap();

        let rx = spawn_landmark_source(SimLandmarkSource::new(sim_rx, p));
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        match first {
            CaptureEvent::Frame(Some(hand)) => assert!(is_fist(&hand, 0.2)),
            other => panic!("unexpected event {:?}", other),
        }

        sim_tx.send(SimInput::Quit).unwrap();
        // Drain until the source hangs up.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(_) => assert!(std::time::Instant::now() < deadline),
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => panic!("source did not stop"),
            }
        }
    }
}
