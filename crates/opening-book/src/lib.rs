//! Opening repertoire lookup for early plies.
//!
//! Maps canonical position strings (the four-field reduction of a full
//! position: placement, side to move, castling, en passant) to weighted
//! candidate moves. Answers "book move or none" per ply; past the
//! configured ply ceiling everything falls through to the evaluator.
//!
//! The repertoire is loaded once at startup from an optional JSON file
//! and is immutable afterwards. A missing or malformed file degrades to
//! the compiled-in table in [`builtin`] rather than failing startup.

pub mod builtin;
pub mod repertoire;

pub use repertoire::{BookError, BookMove, Repertoire, DEFAULT_MAX_MOVES};
