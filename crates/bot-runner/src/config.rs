//! Session configuration loading.
//!
//! Configuration comes from a TOML file; every field has a default so a
//! missing file yields a usable configuration. Some fields are mutable
//! at runtime through the remote control channel (engine depth, time
//! control, max games).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level session configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Time control to seek games at (e.g. "5+0", "3+2").
    #[serde(default = "default_time_control")]
    pub time_control: String,
    /// Number of games to play before stopping; 0 means unlimited.
    #[serde(default)]
    pub max_games: u32,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub opening_book: OpeningBookConfig,
    #[serde(default)]
    pub anti_detection: AntiDetectionConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

/// Evaluator oracle settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    /// Path to the UCI engine executable.
    #[serde(default = "default_engine_path")]
    pub path: String,
    /// Search depth passed with each evaluation request.
    #[serde(default = "default_depth")]
    pub depth: u32,
}

/// Opening repertoire settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpeningBookConfig {
    /// Whether to consult the repertoire before the evaluator.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ply ceiling past which the book is never consulted.
    #[serde(default = "default_book_max_moves")]
    pub max_moves: u32,
    /// Optional path to a JSON repertoire file. A missing or malformed
    /// file degrades to the built-in table.
    #[serde(default = "default_book_path")]
    pub path: PathBuf,
}

/// Human-behavior pacing settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AntiDetectionConfig {
    /// Master switch; when off, a fixed `base_delay_ms` sleep is used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Center of the randomized submission delay, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Relative standard deviation of the delay (0..1).
    #[serde(default = "default_variance_factor")]
    pub variance_factor: f64,
    /// Whether to inject occasional multi-second thinking pauses.
    #[serde(default = "default_true")]
    pub thinking_pauses: bool,
    /// Whether to route submissions through curved pointer gestures.
    #[serde(default = "default_true")]
    pub human_motion: bool,
}

/// Polling and game-lifecycle timing.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GameConfig {
    /// How long to wait for a sought game to begin.
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,
    /// Interval between polling iterations during a game.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Rest between the end of one game and seeking the next.
    #[serde(default = "default_rest_between_games_ms")]
    pub rest_between_games_ms: u64,
}

/// Page-automation driver process.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SurfaceConfig {
    /// Command to launch the driver that owns the browser page.
    #[serde(default = "default_surface_command")]
    pub command: String,
    /// Extra arguments passed to the driver.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Remote control listener.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ControlConfig {
    /// Address to listen on for control commands (e.g.
    /// "127.0.0.1:9090"); absent disables the listener.
    #[serde(default)]
    pub listen: Option<String>,
}

fn default_time_control() -> String {
    "5+0".to_string()
}

fn default_engine_path() -> String {
    "stockfish".to_string()
}

fn default_depth() -> u32 {
    15
}

fn default_true() -> bool {
    true
}

fn default_book_max_moves() -> u32 {
    10
}

fn default_book_path() -> PathBuf {
    PathBuf::from("data/openings.json")
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_variance_factor() -> f64 {
    0.4
}

fn default_start_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_rest_between_games_ms() -> u64 {
    3000
}

fn default_surface_command() -> String {
    "surface-driver".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            depth: default_depth(),
        }
    }
}

impl Default for OpeningBookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_moves: default_book_max_moves(),
            path: default_book_path(),
        }
    }
}

impl Default for AntiDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: default_base_delay_ms(),
            variance_factor: default_variance_factor(),
            thinking_pauses: true,
            human_motion: true,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_timeout_secs: default_start_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            rest_between_games_ms: default_rest_between_games_ms(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            command: default_surface_command(),
            args: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Loads the session configuration from disk.
    ///
    /// A nonexistent file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(config.time_control, "5+0");
        assert_eq!(config.max_games, 0);
        assert_eq!(config.engine.path, "stockfish");
        assert_eq!(config.engine.depth, 15);
        assert!(config.opening_book.enabled);
        assert_eq!(config.opening_book.max_moves, 10);
        assert!(config.anti_detection.enabled);
        assert_eq!(config.anti_detection.base_delay_ms, 500);
        assert_eq!(config.game.start_timeout_secs, 60);
        assert!(config.control.listen.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml_content = r#"
time_control = "3+2"
max_games = 25

[engine]
path = "/usr/bin/stockfish"
depth = 20

[opening_book]
enabled = false
max_moves = 8
path = "my/openings.json"

[anti_detection]
enabled = true
base_delay_ms = 800
variance_factor = 0.3
thinking_pauses = false
human_motion = true

[game]
start_timeout_secs = 30
poll_interval_ms = 250
rest_between_games_ms = 5000

[surface]
command = "node"
args = ["driver.js", "--headless"]

[control]
listen = "127.0.0.1:9091"
"#;
        let config: SessionConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.time_control, "3+2");
        assert_eq!(config.max_games, 25);
        assert_eq!(config.engine.depth, 20);
        assert!(!config.opening_book.enabled);
        assert_eq!(config.opening_book.max_moves, 8);
        assert_eq!(config.anti_detection.base_delay_ms, 800);
        assert!(!config.anti_detection.thinking_pauses);
        assert_eq!(config.game.poll_interval_ms, 250);
        assert_eq!(config.surface.command, "node");
        assert_eq!(config.surface.args.len(), 2);
        assert_eq!(config.control.listen.as_deref(), Some("127.0.0.1:9091"));
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: SessionConfig = toml::from_str("[engine]\ndepth = 12\n").unwrap();
        assert_eq!(config.engine.depth, 12);
        assert_eq!(config.engine.path, "stockfish");
        assert!(config.anti_detection.human_motion);
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = SessionConfig::load("/nonexistent/bot.toml").unwrap();
        assert_eq!(config.engine.depth, 15);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "max_games = 3").unwrap();
        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.max_games, 3);
    }

    #[test]
    fn load_malformed_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "max_games = [not valid").unwrap();
        assert!(matches!(
            SessionConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
