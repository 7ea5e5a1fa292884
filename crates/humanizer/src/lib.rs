//! Human-like timing and pointer-motion synthesis.
//!
//! Paces move submission so it does not look machine-instant: randomized
//! delays drawn from a normal distribution, occasional "thinking"
//! pauses, and curved two-phase pointer gestures instead of direct
//! jumps. Everything here is a pure function of its inputs plus an
//! entropy source; no call remembers past decisions.

pub mod motion;
pub mod timing;

pub use motion::{gesture, jitter, motion_path, Gesture, Point};
pub use timing::{move_delay, pause_duration, should_pause, MIN_DELAY_MS};
