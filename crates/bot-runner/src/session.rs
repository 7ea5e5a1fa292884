//! Session state, colors, and end-of-game outcome resolution.

use std::fmt;

/// The color this session plays in the current game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// The opposing color.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// The resolved outcome of a finished game.
///
/// `Unknown` means the end-of-game text did not match any recognized
/// phrase; such games are counted as completed but never attributed to
/// the win/loss/draw tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
    Aborted,
    Unknown,
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameOutcome::WhiteWins => "white wins",
            GameOutcome::BlackWins => "black wins",
            GameOutcome::Draw => "draw",
            GameOutcome::Aborted => "aborted",
            GameOutcome::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Resolves an outcome from the surface's end-of-game text.
///
/// Prefers explicit result notation ("1-0", "0-1", "1/2-1/2") over
/// status phrases ("white wins", "draw", "aborted"). Anything
/// unrecognized resolves to [`GameOutcome::Unknown`].
#[must_use]
pub fn resolve_outcome(text: Option<&str>) -> GameOutcome {
    let Some(text) = text else {
        return GameOutcome::Unknown;
    };
    let t = text.to_lowercase();

    if t.contains("1-0") || t.contains("white wins") {
        GameOutcome::WhiteWins
    } else if t.contains("0-1") || t.contains("black wins") {
        GameOutcome::BlackWins
    } else if t.contains("1/2-1/2") || t.contains('½') || t.contains("draw") || t.contains("stalemate")
    {
        GameOutcome::Draw
    } else if t.contains("abort") {
        GameOutcome::Aborted
    } else {
        GameOutcome::Unknown
    }
}

/// Win/loss/draw tallies from this session's perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Games whose end text could not be resolved.
    pub unknown: u32,
}

/// Mutable state of one playing session.
///
/// Owned exclusively by the turn loop; the remote control layer only
/// reaches it through command intents applied at loop boundaries.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// True while the session loop is active.
    pub running: bool,
    /// True when the session should stop seeking new games.
    pub paused: bool,
    /// Completed games, including aborted and unresolved ones.
    pub games_played: u32,
    pub stats: GameStats,
    /// Color assigned for the game currently in progress.
    pub current_color: Option<Color>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished game.
    ///
    /// Aborted and unknown outcomes bump the game counter but leave the
    /// win/loss/draw tallies untouched.
    pub fn record_outcome(&mut self, outcome: GameOutcome) {
        self.games_played += 1;
        let Some(color) = self.current_color else {
            return;
        };
        match outcome {
            GameOutcome::WhiteWins if color == Color::White => self.stats.wins += 1,
            GameOutcome::WhiteWins => self.stats.losses += 1,
            GameOutcome::BlackWins if color == Color::Black => self.stats.wins += 1,
            GameOutcome::BlackWins => self.stats.losses += 1,
            GameOutcome::Draw => self.stats.draws += 1,
            GameOutcome::Unknown => self.stats.unknown += 1,
            GameOutcome::Aborted => {}
        }
    }

    /// Win rate in percent over all completed games.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        f64::from(self.stats.wins) * 100.0 / f64::from(self.games_played)
    }
}
