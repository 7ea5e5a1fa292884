//! Evaluator oracle: request/response move search.
//!
//! The oracle receives a position (full FEN) plus a search depth and
//! answers with a single 4-5 character move token. The production
//! implementation talks the UCI line protocol to an engine subprocess;
//! tests substitute a fake. Note that no timeout is applied to an
//! evaluation request: an in-flight request is always awaited to
//! completion, even if the session pauses meanwhile.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Maximum handshake lines to scan before giving up. Applies only to
/// the `uci`/`isready` exchanges; search responses are unbounded.
pub const MAX_PROTOCOL_LINES: usize = 1000;

/// Errors that can occur when communicating with the evaluator.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Failed to spawn the evaluator process or perform I/O.
    #[error("failed to spawn evaluator: {0}")]
    Spawn(#[from] std::io::Error),
    /// The UCI handshake did not complete.
    #[error("evaluator initialization failed")]
    InitFailed,
    /// The evaluator process closed its output stream.
    #[error("evaluator closed unexpectedly")]
    Closed,
    /// The evaluator returned an unexpected response.
    #[error("invalid evaluator response: {0}")]
    InvalidResponse(String),
}

/// A move oracle consulted when the opening repertoire misses.
#[async_trait]
pub trait MoveOracle: Send {
    /// Returns the best move for `fen` as a 4-5 character move token.
    async fn best_move(&mut self, fen: &str, depth: u32) -> Result<String, OracleError>;

    /// Signals that a new game is starting.
    async fn new_game(&mut self) -> Result<(), OracleError> {
        Ok(())
    }
}

/// UCI subprocess implementation of [`MoveOracle`].
pub struct UciOracle {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    name: String,
    _child: Child,
}

impl UciOracle {
    /// Spawns the engine and performs the UCI handshake.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Spawn`] if the process cannot be started
    /// and [`OracleError::InitFailed`] if the handshake does not
    /// complete within [`MAX_PROTOCOL_LINES`] lines.
    pub async fn spawn(path: &str) -> Result<Self, OracleError> {
        let mut child = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(OracleError::InitFailed)?;
        let stdout = child.stdout.take().ok_or(OracleError::InitFailed)?;
        let lines = BufReader::new(stdout).lines();

        let mut oracle = Self {
            stdin,
            lines,
            name: String::new(),
            _child: child,
        };
        oracle.init().await?;
        Ok(oracle)
    }

    /// The engine's self-reported name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn init(&mut self) -> Result<(), OracleError> {
        self.send("uci").await?;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_PROTOCOL_LINES {
                return Err(OracleError::InitFailed);
            }
            lines_read += 1;
            let line = self.read_line().await?;
            if let Some(name) = line.strip_prefix("id name ") {
                self.name = name.to_string();
            } else if line == "uciok" {
                break;
            }
        }
        self.wait_ready().await
    }

    async fn wait_ready(&mut self) -> Result<(), OracleError> {
        self.send("isready").await?;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_PROTOCOL_LINES {
                return Err(OracleError::InitFailed);
            }
            lines_read += 1;
            if self.read_line().await? == "readyok" {
                return Ok(());
            }
        }
    }

    async fn send(&mut self, command: &str) -> Result<(), OracleError> {
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, OracleError> {
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(OracleError::Closed),
        }
    }
}

#[async_trait]
impl MoveOracle for UciOracle {
    async fn best_move(&mut self, fen: &str, depth: u32) -> Result<String, OracleError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        // A deep search emits an unbounded stream of `info` lines, so
        // this wait carries no line budget: the engine is trusted to
        // always answer with a `bestmove`, and giving up early would
        // leave that answer in the stream to poison the next request.
        loop {
            let line = self.read_line().await?;
            if let Some(rest) = line.strip_prefix("bestmove ") {
                let token = rest.split_whitespace().next().unwrap_or("").to_string();
                if token.len() == 4 || token.len() == 5 {
                    return Ok(token);
                }
                return Err(OracleError::InvalidResponse(line));
            }
        }
    }

    async fn new_game(&mut self) -> Result<(), OracleError> {
        self.send("ucinewgame").await?;
        self.wait_ready().await
    }
}
