//! Repertoire storage, loading, and weighted move selection.

use std::collections::HashMap;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default ply ceiling past which no book move is returned.
pub const DEFAULT_MAX_MOVES: u32 = 10;

/// Errors that can occur when loading a repertoire file.
///
/// Callers are expected to treat these as a degrade signal and fall
/// back to [`crate::builtin::builtin_repertoire`], not as fatal.
#[derive(Debug, Error)]
pub enum BookError {
    /// Failed to read the repertoire file.
    #[error("failed to read opening book: {0}")]
    Io(#[from] std::io::Error),

    /// The repertoire file was not valid JSON of the expected shape.
    #[error("failed to parse opening book: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single candidate move with its selection weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMove {
    /// The move as a 4-5 character UCI-style string (e.g. "e2e4").
    #[serde(rename = "move")]
    pub uci: String,
    /// Positive selection weight; higher is chosen more often.
    pub weight: u32,
}

impl BookMove {
    /// Creates a new candidate move.
    #[must_use]
    pub fn new(uci: impl Into<String>, weight: u32) -> Self {
        Self {
            uci: uci.into(),
            weight,
        }
    }
}

/// An immutable opening repertoire with a ply ceiling.
#[derive(Debug, Clone, Default)]
pub struct Repertoire {
    positions: HashMap<String, Vec<BookMove>>,
    max_moves: u32,
}

impl Repertoire {
    /// Creates an empty repertoire with the given ply ceiling.
    #[must_use]
    pub fn new(max_moves: u32) -> Self {
        Self {
            positions: HashMap::new(),
            max_moves,
        }
    }

    /// Creates a repertoire from a prebuilt position table.
    #[must_use]
    pub fn with_positions(positions: HashMap<String, Vec<BookMove>>, max_moves: u32) -> Self {
        Self {
            positions,
            max_moves,
        }
    }

    /// Loads a repertoire from a JSON file mapping canonical position
    /// strings to arrays of `{move, weight}` objects.
    ///
    /// # Errors
    ///
    /// Returns [`BookError`] if the file cannot be read or parsed; the
    /// caller decides whether to degrade to the built-in table.
    pub fn load(path: impl AsRef<Path>, max_moves: u32) -> Result<Self, BookError> {
        let content = std::fs::read_to_string(path)?;
        let positions: HashMap<String, Vec<BookMove>> = serde_json::from_str(&content)?;
        Ok(Self {
            positions,
            max_moves,
        })
    }

    /// Returns the number of positions in the repertoire.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the repertoire has no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The ply ceiling for lookups.
    #[must_use]
    pub fn max_moves(&self) -> u32 {
        self.max_moves
    }

    /// Candidate moves recorded for a canonical position, if any.
    #[must_use]
    pub fn candidates(&self, canonical: &str) -> Option<&[BookMove]> {
        self.positions.get(canonical).map(Vec::as_slice)
    }

    /// Picks a book move for the position, or `None`.
    ///
    /// Returns `None` unconditionally once `ply` exceeds the ceiling,
    /// and for positions without an entry. Otherwise selects among the
    /// candidates by weighted random draw: a uniform value in
    /// `[0, total_weight)` walks the table in order. Repeated calls for
    /// the same position may legitimately return different moves.
    pub fn lookup<R: Rng>(&self, canonical: &str, ply: u32, rng: &mut R) -> Option<&str> {
        if ply > self.max_moves {
            return None;
        }
        let candidates = self.candidates(canonical)?;
        let first = candidates.first()?;

        let total: u32 = candidates.iter().map(|m| m.weight).sum();
        if total == 0 {
            return Some(&first.uci);
        }

        let mut draw = rng.gen_range(0..total);
        for candidate in candidates {
            if draw < candidate.weight {
                return Some(&candidate.uci);
            }
            draw -= candidate.weight;
        }

        // Accumulation guard; the walk above covers the whole range.
        Some(&first.uci)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    fn two_candidate_table() -> Repertoire {
        let mut positions = HashMap::new();
        positions.insert(
            "start".to_string(),
            vec![BookMove::new("e2e4", 100), BookMove::new("d2d4", 1)],
        );
        Repertoire::with_positions(positions, DEFAULT_MAX_MOVES)
    }

    #[test]
    fn lookup_none_past_ceiling() {
        let book = two_candidate_table();
        let mut rng = StdRng::seed_from_u64(7);
        for max_moves in [0, 1, 5, 10, 20] {
            let book = Repertoire::with_positions(
                book.positions.clone(),
                max_moves,
            );
            assert!(book.lookup("start", max_moves + 1, &mut rng).is_none());
            assert!(book.lookup("start", max_moves + 100, &mut rng).is_none());
        }
    }

    #[test]
    fn lookup_none_for_unknown_position() {
        let book = two_candidate_table();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(book.lookup("no such key", 1, &mut rng).is_none());
    }

    #[test]
    fn lookup_only_returns_known_candidates() {
        let book = two_candidate_table();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let mv = book.lookup("start", 3, &mut rng).unwrap();
            assert!(mv == "e2e4" || mv == "d2d4");
        }
    }

    #[test]
    fn weighted_selection_ratio_converges() {
        let book = two_candidate_table();
        let mut rng = StdRng::seed_from_u64(1234);
        let draws = 20_000;
        let mut heavy = 0u32;
        for _ in 0..draws {
            if book.lookup("start", 2, &mut rng).unwrap() == "e2e4" {
                heavy += 1;
            }
        }
        // Expected fraction 100/101; allow 5% tolerance on the ratio.
        let fraction = f64::from(heavy) / f64::from(draws);
        let expected = 100.0 / 101.0;
        assert!(
            (fraction - expected).abs() < 0.05 * expected,
            "fraction was {fraction}"
        );
    }

    #[test]
    fn zero_total_weight_falls_back_to_first() {
        let mut positions = HashMap::new();
        positions.insert(
            "k".to_string(),
            vec![BookMove::new("a2a3", 0), BookMove::new("h2h4", 0)],
        );
        let book = Repertoire::with_positions(positions, 10);
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(book.lookup("k", 1, &mut rng), Some("a2a3"));
    }

    #[test]
    fn empty_candidate_list_is_a_miss() {
        let mut positions = HashMap::new();
        positions.insert("k".to_string(), Vec::new());
        let book = Repertoire::with_positions(positions, 10);
        let mut rng = StdRng::seed_from_u64(9);
        assert!(book.lookup("k", 1, &mut rng).is_none());
    }

    #[test]
    fn load_parses_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -":
                [{{"move": "e2e4", "weight": 100}}, {{"move": "d2d4", "weight": 80}}]}}"#
        )
        .unwrap();

        let book = Repertoire::load(file.path(), 10).unwrap();
        assert_eq!(book.len(), 1);
        let moves = book
            .candidates("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -")
            .unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].uci, "e2e4");
        assert_eq!(moves[1].weight, 80);
    }

    #[test]
    fn load_missing_file_errors() {
        let result = Repertoire::load("/nonexistent/openings.json", 10);
        assert!(matches!(result, Err(BookError::Io(_))));
    }

    #[test]
    fn load_malformed_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();
        let result = Repertoire::load(file.path(), 10);
        assert!(matches!(result, Err(BookError::Parse(_))));
    }
}
