//! Autonomous game session runner.
//!
//! Composes the board tracker, opening repertoire, timing model,
//! evaluator oracle, and page-automation surface into the per-turn
//! decision loop that plays games end to end.
//!
//! # Modules
//!
//! - [`config`] - TOML session configuration
//! - [`session`] - Session state, colors, and outcome resolution
//! - [`oracle`] - Evaluator oracle protocol (UCI subprocess)
//! - [`surface`] - Page automation surface and coordinate mapping
//! - [`remote`] - Remote control commands and listener
//! - [`turn_loop`] - The orchestrating state machine

pub mod config;
pub mod oracle;
pub mod remote;
pub mod session;
pub mod surface;
pub mod turn_loop;
