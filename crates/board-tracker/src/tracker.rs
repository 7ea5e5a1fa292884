//! Position reconstruction by full replay of an observed move list.

use shakmaty::fen::{Epd, Fen};
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, EnPassantMode, Position};

/// Canonical four-field form of the standard starting position
/// (placement, side to move, castling, en passant).
pub const STARTING_CANONICAL: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -";

/// A position derived from an observed move list.
///
/// Carries the replayed board state together with the number of tokens
/// that were successfully applied. When the source list contained a
/// token that failed to apply, `applied` is smaller than the list and
/// the position is stale by the unapplied suffix; the caller is expected
/// to retry on the next poll.
#[derive(Debug, Clone)]
pub struct TrackedPosition {
    position: Chess,
    applied: usize,
}

impl TrackedPosition {
    /// The replayed board state.
    #[must_use]
    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// Number of move tokens that were applied to reach this position.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// The side to move in this position.
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.position.turn()
    }

    /// Returns true if this is the standard starting position.
    #[must_use]
    pub fn is_startpos(&self) -> bool {
        self.applied == 0
    }

    /// Canonical four-field serialization used for book lookups.
    ///
    /// Two positions are book-equivalent iff these strings are
    /// byte-identical. Clock fields are excluded.
    #[must_use]
    pub fn canonical(&self) -> String {
        Epd::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Full FEN serialization, suitable for the evaluator protocol.
    #[must_use]
    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }
}

/// Rebuilds positions from scratch on every call.
///
/// Replay is deliberately non-incremental: the observed move list can be
/// momentarily inconsistent, so each snapshot is an independent fold
/// over the full list rather than a patch against previous state. The
/// cost is O(ply count) per poll, which is negligible at page-polling
/// granularity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionTracker;

impl PositionTracker {
    /// Creates a new tracker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Reconstructs a position by replaying `tokens` from the standard
    /// starting position.
    ///
    /// Tokens are filtered the way they arrive from the page: entries
    /// shorter than two characters and move-number artifacts like `"1."`
    /// are dropped, and trailing annotation glyphs (`!?+#`) are stripped
    /// before parsing. Replay stops at the first token that fails to
    /// parse or apply and the partial position is returned; an empty
    /// list yields the starting position.
    #[must_use]
    pub fn reconstruct(&self, tokens: &[String]) -> TrackedPosition {
        let mut position = Chess::default();
        let mut applied = 0;

        for raw in tokens {
            let raw = raw.trim();
            if raw.len() < 2 || is_move_number(raw) {
                continue;
            }

            let token = strip_annotations(raw);
            let Ok(san) = token.parse::<San>() else {
                break;
            };
            let Ok(mv) = san.to_move(&position) else {
                break;
            };
            position.play_unchecked(&mv);
            applied += 1;
        }

        TrackedPosition { position, applied }
    }
}

/// Returns true if `token` is a legal move in `position`, where `token`
/// is a 4-5 character UCI-style move string.
#[must_use]
pub fn is_legal_uci(position: &Chess, token: &str) -> bool {
    token
        .parse::<UciMove>()
        .ok()
        .and_then(|uci| uci.to_move(position).ok())
        .is_some()
}

/// Strips trailing check, mate, and move-quality markers.
fn strip_annotations(token: &str) -> &str {
    token.trim_end_matches(|c| matches!(c, '!' | '?' | '+' | '#'))
}

/// Matches move-number artifacts like `"1."` or `"23."` that leak into
/// the scraped list alongside the actual move tokens.
fn is_move_number(token: &str) -> bool {
    token.len() > 1
        && token.ends_with('.')
        && token[..token.len() - 1].bytes().all(|b| b.is_ascii_digit())
}
