//! Page-automation surface.
//!
//! The surface is the bot's only view of the web platform: it reports
//! the recorded move list, game lifecycle state, and board geometry,
//! and it accepts pointer actions. The production implementation
//! bridges to a driver subprocess that owns the browser page, speaking
//! a JSON-lines request/response protocol over stdio.

use async_trait::async_trait;
use humanizer::Point;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::session::Color;

/// Errors raised by the surface layer.
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("surface i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The driver process closed its output stream.
    #[error("surface driver closed")]
    Closed,
    /// The driver answered with something other than the protocol shape.
    #[error("surface protocol error: {0}")]
    Protocol(String),
    /// The driver reported a failure executing the request.
    #[error("surface driver error: {0}")]
    Driver(String),
    #[error("bad square name: {0}")]
    BadSquare(String),
    #[error("bad move token: {0}")]
    BadMoveToken(String),
}

/// Pixel rectangle of the board on the page.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct BoardGeometry {
    /// Left edge of the board, in page pixels.
    pub x: f64,
    /// Top edge of the board, in page pixels.
    pub y: f64,
    /// Side length of the (square) board.
    pub size: f64,
}

/// A move token split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMove {
    pub from: String,
    pub to: String,
    pub promotion: Option<char>,
}

/// Splits a 4-5 character move token like "e2e4" or "e7e8q".
///
/// # Errors
///
/// Returns [`SurfaceError::BadMoveToken`] when the token is not two
/// valid square names optionally followed by a promotion piece letter.
pub fn parse_move_token(token: &str) -> Result<ParsedMove, SurfaceError> {
    let token = token.trim();
    if token.len() != 4 && token.len() != 5 {
        return Err(SurfaceError::BadMoveToken(token.to_string()));
    }
    let from = &token[0..2];
    let to = &token[2..4];
    if !is_square(from) || !is_square(to) {
        return Err(SurfaceError::BadMoveToken(token.to_string()));
    }
    let promotion = match token.as_bytes().get(4) {
        None => None,
        Some(&p @ (b'q' | b'r' | b'b' | b'n')) => Some(p as char),
        Some(_) => return Err(SurfaceError::BadMoveToken(token.to_string())),
    };
    Ok(ParsedMove {
        from: from.to_string(),
        to: to.to_string(),
        promotion,
    })
}

fn is_square(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 2 && (b'a'..=b'h').contains(&bytes[0]) && (b'1'..=b'8').contains(&bytes[1])
}

/// Maps a square name to the pixel center of its cell.
///
/// With `flipped` false, white's side is at the bottom: a1 maps to the
/// lower-left cell. With `flipped` true the board is rotated 180
/// degrees, as the platform renders it for the black player.
///
/// # Errors
///
/// Returns [`SurfaceError::BadSquare`] for names outside a1..h8.
pub fn square_point(square: &str, geo: BoardGeometry, flipped: bool) -> Result<Point, SurfaceError> {
    if !is_square(square) {
        return Err(SurfaceError::BadSquare(square.to_string()));
    }
    let bytes = square.as_bytes();
    let mut file = f64::from(bytes[0] - b'a');
    let mut rank = f64::from(bytes[1] - b'1');
    if flipped {
        file = 7.0 - file;
        rank = 7.0 - rank;
    }
    let cell = geo.size / 8.0;
    Ok(Point {
        x: geo.x + (file + 0.5) * cell,
        y: geo.y + (7.0 - rank + 0.5) * cell,
    })
}

/// Everything the turn loop needs from the platform page.
#[async_trait]
pub trait GameSurface: Send {
    /// Seeks a new game at the given time control.
    async fn start_game(&mut self, time_control: &str) -> Result<(), SurfaceError>;

    /// Whether a game is currently in progress.
    async fn is_in_game(&mut self) -> Result<bool, SurfaceError>;

    /// The color this session plays, from the board orientation.
    async fn orientation(&mut self) -> Result<Color, SurfaceError>;

    /// The recorded move list as raw notation tokens, oldest first.
    async fn move_list(&mut self) -> Result<Vec<String>, SurfaceError>;

    /// Whether the current game has ended.
    async fn is_game_over(&mut self) -> Result<bool, SurfaceError>;

    /// The end-of-game text, if the platform shows one.
    async fn result_text(&mut self) -> Result<Option<String>, SurfaceError>;

    /// The pixel rectangle of the board.
    async fn board_geometry(&mut self) -> Result<BoardGeometry, SurfaceError>;

    /// Moves the pointer to a page position without clicking.
    async fn pointer_move(&mut self, point: Point) -> Result<(), SurfaceError>;

    /// Clicks at a page position.
    async fn pointer_click(&mut self, point: Point) -> Result<(), SurfaceError>;

    /// Picks a piece from the promotion dialog.
    async fn pick_promotion(&mut self, piece: char) -> Result<(), SurfaceError>;
}

/// [`GameSurface`] backed by a driver subprocess.
///
/// Each request is one JSON object on a line; the driver answers with
/// `{"ok": true, "value": ...}` or `{"ok": false, "error": "..."}`.
pub struct BridgeSurface {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    _child: Child,
}

impl BridgeSurface {
    /// Spawns the driver process.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Io`] if the process cannot be started.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, SurfaceError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(SurfaceError::Closed)?;
        let stdout = child.stdout.take().ok_or(SurfaceError::Closed)?;
        let lines = BufReader::new(stdout).lines();

        Ok(Self {
            stdin,
            lines,
            _child: child,
        })
    }

    async fn request(&mut self, payload: Value) -> Result<Value, SurfaceError> {
        let mut line = serde_json::to_string(&payload)
            .map_err(|err| SurfaceError::Protocol(err.to_string()))?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let response = self.lines.next_line().await?.ok_or(SurfaceError::Closed)?;
        let response: Value = serde_json::from_str(&response)
            .map_err(|err| SurfaceError::Protocol(err.to_string()))?;

        match response.get("ok").and_then(Value::as_bool) {
            Some(true) => Ok(response.get("value").cloned().unwrap_or(Value::Null)),
            Some(false) => {
                let message = response
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unspecified")
                    .to_string();
                Err(SurfaceError::Driver(message))
            }
            None => Err(SurfaceError::Protocol(response.to_string())),
        }
    }

    async fn request_bool(&mut self, payload: Value) -> Result<bool, SurfaceError> {
        let value = self.request(payload).await?;
        value
            .as_bool()
            .ok_or_else(|| SurfaceError::Protocol(format!("expected bool, got {value}")))
    }
}

#[async_trait]
impl GameSurface for BridgeSurface {
    async fn start_game(&mut self, time_control: &str) -> Result<(), SurfaceError> {
        self.request(json!({"op": "start_game", "time_control": time_control}))
            .await?;
        Ok(())
    }

    async fn is_in_game(&mut self) -> Result<bool, SurfaceError> {
        self.request_bool(json!({"op": "is_in_game"})).await
    }

    async fn orientation(&mut self) -> Result<Color, SurfaceError> {
        let value = self.request(json!({"op": "orientation"})).await?;
        match value.as_str() {
            Some("white") => Ok(Color::White),
            Some("black") => Ok(Color::Black),
            _ => Err(SurfaceError::Protocol(format!(
                "expected orientation, got {value}"
            ))),
        }
    }

    async fn move_list(&mut self) -> Result<Vec<String>, SurfaceError> {
        let value = self.request(json!({"op": "move_list"})).await?;
        serde_json::from_value(value).map_err(|err| SurfaceError::Protocol(err.to_string()))
    }

    async fn is_game_over(&mut self) -> Result<bool, SurfaceError> {
        self.request_bool(json!({"op": "is_game_over"})).await
    }

    async fn result_text(&mut self) -> Result<Option<String>, SurfaceError> {
        let value = self.request(json!({"op": "result_text"})).await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    async fn board_geometry(&mut self) -> Result<BoardGeometry, SurfaceError> {
        let value = self.request(json!({"op": "board_geometry"})).await?;
        serde_json::from_value(value).map_err(|err| SurfaceError::Protocol(err.to_string()))
    }

    async fn pointer_move(&mut self, point: Point) -> Result<(), SurfaceError> {
        self.request(json!({"op": "pointer_move", "point": point}))
            .await?;
        Ok(())
    }

    async fn pointer_click(&mut self, point: Point) -> Result<(), SurfaceError> {
        self.request(json!({"op": "pointer_click", "point": point}))
            .await?;
        Ok(())
    }

    async fn pick_promotion(&mut self, piece: char) -> Result<(), SurfaceError> {
        self.request(json!({"op": "pick_promotion", "piece": piece.to_string()}))
            .await?;
        Ok(())
    }
}
