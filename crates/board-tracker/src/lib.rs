//! Board state reconstruction from polled move lists.
//!
//! The external game surface exposes the move history as a list of
//! algebraic notation tokens scraped from a page. This crate rebuilds an
//! authoritative position from that list on every poll, tolerating
//! annotation glyphs, move-number artifacts, and tokens that are
//! momentarily out of sync with the source.

pub mod tracker;

pub use tracker::{is_legal_uci, PositionTracker, TrackedPosition, STARTING_CANONICAL};
