//! # gesture_cloud
//!
//! A particle cloud that morphs between five shapes and reacts to a tracked
//! hand, rendered in software into a `minifb` window.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Action |
//! |---|---|
//! | Open hand | Attract particles toward the hand point |
//! | Fist (index tip near wrist) | Repel particles away from the hand point |
//! | Victory (index + middle up, ring + pinky down) | Next shape, at most once per 2 s |
//! | No hand | Particles ease back to the current shape |
//!
//! Shapes cycle sphere → heart → saturn → flower → torus → sphere.
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: the mouse pointer drives a synthetic hand.
//! * `leap` — **Hardware mode**: hand landmarks from a LeapMotion controller via LeapC.
//!
//! ### Simulation controls
//!
//! | Input | Gesture |
//! |---|---|
//! | Mouse position | Hand position |
//! | Hold left button | Fist |
//! | Hold `V` | Victory |
//! | `H` | Hide / show the hand |
//! | `Q` / `Escape` | Quit |

pub mod config;
pub mod error;
pub mod gesture;
pub mod capture;
pub mod animation;
pub mod visualizer;
pub mod app;
