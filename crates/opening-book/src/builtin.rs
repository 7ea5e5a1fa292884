//! Compiled-in fallback repertoire.
//!
//! Covers the most common opening lines so the session still varies its
//! early play when no repertoire file is available. Weights reflect
//! rough practical popularity; higher is chosen more often.

use std::collections::HashMap;

use crate::repertoire::{BookMove, Repertoire};

/// Creates the built-in repertoire with the given ply ceiling.
#[must_use]
pub fn builtin_repertoire(max_moves: u32) -> Repertoire {
    let mut positions: HashMap<String, Vec<BookMove>> = HashMap::new();

    let mut add = |key: &str, moves: Vec<BookMove>| {
        positions.insert(key.to_string(), moves);
    };

    // Starting position
    add(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
        vec![
            BookMove::new("e2e4", 100), // King's Pawn
            BookMove::new("d2d4", 80),  // Queen's Pawn
            BookMove::new("c2c4", 40),  // English
            BookMove::new("g1f3", 30),  // Reti
        ],
    );

    // After 1.e4
    add(
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -",
        vec![
            BookMove::new("e7e5", 100), // Open Game
            BookMove::new("c7c5", 90),  // Sicilian
            BookMove::new("e7e6", 60),  // French
            BookMove::new("c7c6", 50),  // Caro-Kann
        ],
    );

    // After 1.e4 e5
    add(
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        vec![
            BookMove::new("g1f3", 100), // King's Knight
            BookMove::new("f1c4", 40),  // Bishop's Opening
            BookMove::new("b1c3", 30),  // Vienna
        ],
    );

    // After 1.e4 e5 2.Nf3
    add(
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq -",
        vec![
            BookMove::new("b8c6", 100), // Knight's Defense
            BookMove::new("g8f6", 60),  // Petroff
            BookMove::new("d7d6", 30),  // Philidor
        ],
    );

    // After 1.e4 e5 2.Nf3 Nc6
    add(
        "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq -",
        vec![
            BookMove::new("f1b5", 100), // Ruy Lopez
            BookMove::new("f1c4", 70),  // Italian
            BookMove::new("d2d4", 40),  // Scotch
        ],
    );

    // Ruy Lopez: 1.e4 e5 2.Nf3 Nc6 3.Bb5
    add(
        "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq -",
        vec![
            BookMove::new("a7a6", 100), // Morphy Defense
            BookMove::new("g8f6", 60),  // Berlin
            BookMove::new("f8c5", 30),  // Classical
        ],
    );

    // Italian: 1.e4 e5 2.Nf3 Nc6 3.Bc4
    add(
        "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq -",
        vec![
            BookMove::new("f8c5", 100), // Giuoco Piano
            BookMove::new("g8f6", 80),  // Two Knights
            BookMove::new("f8e7", 20),  // Hungarian
        ],
    );

    // After 1.d4
    add(
        "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq -",
        vec![
            BookMove::new("d7d5", 100), // Closed Game
            BookMove::new("g8f6", 80),  // Indian Defense
            BookMove::new("f7f5", 20),  // Dutch
        ],
    );

    // After 1.d4 d5
    add(
        "rnbqkbnr/ppp1pppp/8/3p4/3P4/8/PPP1PPPP/RNBQKBNR w KQkq -",
        vec![
            BookMove::new("c2c4", 100), // Queen's Gambit
            BookMove::new("g1f3", 40),
            BookMove::new("c1f4", 30), // London
        ],
    );

    // Queen's Gambit: 1.d4 d5 2.c4
    add(
        "rnbqkbnr/ppp1pppp/8/3p4/2PP4/8/PP2PPPP/RNBQKBNR b KQkq -",
        vec![
            BookMove::new("e7e6", 100), // QGD
            BookMove::new("d5c4", 70),  // QGA
            BookMove::new("c7c6", 60),  // Slav
        ],
    );

    // After 1.d4 Nf6
    add(
        "rnbqkb1r/pppppppp/5n2/8/3P4/8/PPP1PPPP/RNBQKBNR w KQkq -",
        vec![
            BookMove::new("c2c4", 100),
            BookMove::new("g1f3", 60),
            BookMove::new("c1f4", 40),
        ],
    );

    // Sicilian: 1.e4 c5
    add(
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        vec![
            BookMove::new("g1f3", 100), // Open Sicilian
            BookMove::new("b1c3", 50),  // Closed Sicilian
            BookMove::new("c2c3", 30),  // Alapin
        ],
    );

    // Sicilian Open: 1.e4 c5 2.Nf3
    add(
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq -",
        vec![
            BookMove::new("d7d6", 100), // Najdorf/Dragon setups
            BookMove::new("b8c6", 80),
            BookMove::new("e7e6", 70), // Scheveningen
        ],
    );

    // French: 1.e4 e6
    add(
        "rnbqkbnr/pppp1ppp/4p3/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        vec![
            BookMove::new("d2d4", 100),
            BookMove::new("d2d3", 20), // King's Indian Attack
        ],
    );

    // French: 1.e4 e6 2.d4
    add(
        "rnbqkbnr/pppp1ppp/4p3/8/3PP3/8/PPP2PPP/RNBQKBNR b KQkq -",
        vec![BookMove::new("d7d5", 100)],
    );

    // Caro-Kann: 1.e4 c6
    add(
        "rnbqkbnr/pp1ppppp/2p5/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        vec![
            BookMove::new("d2d4", 100),
            BookMove::new("b1c3", 40),
        ],
    );

    Repertoire::with_positions(positions, max_moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn builtin_covers_common_lines() {
        let book = builtin_repertoire(10);
        assert_eq!(book.len(), 16);
    }

    #[test]
    fn builtin_weights_are_positive() {
        let book = builtin_repertoire(10);
        let start = book
            .candidates("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -")
            .unwrap();
        assert!(start.iter().all(|m| m.weight > 0));
    }

    #[test]
    fn builtin_moves_are_uci_shaped() {
        let book = builtin_repertoire(10);
        for key in [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
            "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        ] {
            for m in book.candidates(key).unwrap() {
                assert!(m.uci.len() == 4 || m.uci.len() == 5, "{}", m.uci);
            }
        }
    }

    #[test]
    fn start_position_lookup_selects_known_candidate() {
        let book = builtin_repertoire(10);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let mv = book
                .lookup(
                    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
                    0,
                    &mut rng,
                )
                .unwrap();
            assert!(["e2e4", "d2d4", "c2c4", "g1f3"].contains(&mv));
        }
    }
}
