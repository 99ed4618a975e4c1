//! Top-level application state and the render loop.
//!
//! `AppState` owns the particle buffers, the shape cycle, the gesture
//! interpreter and the animator.  It consumes `CaptureEvent`s and advances
//! the simulation once per rendered frame.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;

use morph_shapes::{generate_shape, ParticleSet, Shape, ShapeRegistry};
use rand::{rngs::StdRng, SeedableRng};

use crate::animation::Animator;
use crate::capture::{open_backend, CaptureEvent, CaptureProfile, CaptureStatus, SimInput};
use crate::config::Config;
use crate::error::{AppError, CaptureError};
use crate::gesture::{GestureEvent, GestureInterpreter, HandState};
use crate::visualizer::{Hud, PointStyle, Viewport, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── particles ────────────────────────────────────────────────────────
    particles: ParticleSet,
    registry:  ShapeRegistry,
    rng:       StdRng,

    // ── interaction ──────────────────────────────────────────────────────
    gestures:  GestureInterpreter,
    animator:  Animator,
    status:    CaptureStatus,

    started:   Instant,
}

impl AppState {
    /// Scatter `cfg.particle_count` particles and aim them at the first shape.
    pub fn new(cfg: &Config) -> Self {
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        let registry = ShapeRegistry::new();
        let mut particles = ParticleSet::new(cfg.particle_count, &mut rng);
        generate_shape(&mut particles, registry.current(), &mut rng);

        log::info!(
            "{} particles, {:?} tier, starting shape {}",
            cfg.particle_count, cfg.tier, registry.current()
        );

        AppState {
            particles,
            registry,
            rng,
            gestures: GestureInterpreter::new(cfg.fist_threshold),
            animator: Animator::from_config(cfg),
            status:   CaptureStatus::Starting,
            started:  Instant::now(),
        }
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn shape(&self)     -> Shape           { self.registry.current() }
    pub fn status(&self)    -> CaptureStatus   { self.status }
    pub fn hand(&self)      -> HandState       { self.gestures.state() }
    pub fn particles(&self) -> &ParticleSet    { &self.particles }
    pub fn animator(&self)  -> &Animator       { &self.animator }

    // ── capture events ───────────────────────────────────────────────────

    pub fn handle_capture(&mut self, event: CaptureEvent, now: Instant) {
        match event {
            CaptureEvent::Frame(frame) => {
                if self.status != CaptureStatus::Active {
                    log::info!("hand capture active");
                    self.status = CaptureStatus::Active;
                }
                if let Some(GestureEvent::CycleShape) = self.gestures.ingest(frame.as_ref(), now) {
                    self.cycle_shape();
                }
            }
            CaptureEvent::Failed(err) => {
                log::warn!("hand capture failed: {}", err);
                self.status = CaptureStatus::Error;
            }
        }
    }

    /// The backend could not be started at all.
    pub fn capture_unavailable(&mut self, err: &CaptureError) {
        log::warn!("hand capture unavailable: {}", err);
        self.status = CaptureStatus::Unsupported;
    }

    /// The source hung up.  A source that already reported its failure, or
    /// one that never existed, is not reported again.
    pub fn capture_disconnected(&mut self, now: Instant) {
        log::debug!("hand capture channel closed");
        if matches!(self.status, CaptureStatus::Error | CaptureStatus::Unsupported) {
            return;
        }
        self.handle_capture(
            CaptureEvent::Failed(CaptureError::StartFailed("source disconnected".into())),
            now,
        );
    }

    /// Move on to the next shape and retarget every particle.
    pub fn cycle_shape(&mut self) -> Shape {
        let shape = self.registry.advance();
        generate_shape(&mut self.particles, shape, &mut self.rng);
        log::info!("shape -> {}", shape);
        shape
    }

    // ── per-frame logic ──────────────────────────────────────────────────

    pub fn tick(&mut self, now: Instant) {
        let elapsed_ms = now.saturating_duration_since(self.started).as_secs_f64() * 1000.0;
        let hand = self.gestures.state();
        self.animator.step(&mut self.particles, &hand, elapsed_ms);
    }

    pub fn hud(&self) -> Hud {
        let hand = self.gestures.state();
        Hud {
            shape:  self.shape(),
            status: self.status,
            hand:   hand
                .detected
                .then(|| (self.animator.mapping().world_point(hand.position), hand.mode)),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Main loop
// ════════════════════════════════════════════════════════════════════════════

pub fn run(cfg: Config, viewport: Viewport) -> Result<(), AppError> {
    // ── Capture backend ───────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let mut app = AppState::new(&cfg);
    let mut capture: Option<Receiver<CaptureEvent>> =
        match open_backend(cfg.backend, CaptureProfile::from_config(&cfg), sim_rx) {
            Ok(rx) => Some(rx),
            Err(e) => {
                app.capture_unavailable(&e);
                None
            }
        };

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(viewport, PointStyle::from_config(&cfg), sim_tx)?;

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        if !vis.poll_input() { break; }

        let now = Instant::now();
        let mut disconnected = false;
        if let Some(rx) = &capture {
            loop {
                match rx.try_recv() {
                    Ok(evt) => app.handle_capture(evt, now),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        app.capture_disconnected(now);
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        if disconnected {
            capture = None;
        }

        app.tick(now);

        let hud = app.hud();
        vis.render(&mut app.particles, app.animator.rotation(), &hud);
    }

    log::info!("window closed after {} frames", app.animator.frames());
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
