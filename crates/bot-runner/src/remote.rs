//! Remote control channel.
//!
//! A small line-oriented command listener. Connections send one command
//! per line; the listener parses each into a [`ControlRequest`] and
//! forwards it to the turn loop over an mpsc channel. Commands never
//! touch session state directly: queries carry a oneshot reply slot
//! that the loop fills when it drains its control queue.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Bounds on the runtime-settable search depth.
pub const MIN_DEPTH: u32 = 5;
pub const MAX_DEPTH: u32 = 30;

/// A parsed control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Report whether the session is running, paused, or in a game.
    Status,
    /// Report win/loss/draw tallies.
    Stats,
    /// Report the effective configuration.
    Config,
    /// Change the evaluator search depth.
    SetDepth(u32),
    /// Change the time control sought for new games.
    SetTimeControl(String),
    /// Change the game limit (0 means unlimited).
    SetMaxGames(u32),
    /// Pause after the current game finishes.
    Stop,
    /// Resume seeking games.
    Start,
}

impl ControlRequest {
    /// Whether this request expects a textual reply.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            ControlRequest::Status | ControlRequest::Stats | ControlRequest::Config
        )
    }
}

/// Errors produced when parsing a command line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("missing argument for {0}")]
    MissingArgument(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// A control request paired with an optional reply slot.
#[derive(Debug)]
pub struct ControlMessage {
    pub request: ControlRequest,
    pub reply: Option<oneshot::Sender<String>>,
}

/// Parses a single command line.
///
/// A leading slash is accepted and ignored, so "/status" and "status"
/// are equivalent.
///
/// # Errors
///
/// Returns [`CommandError`] for unknown commands, missing arguments,
/// and arguments outside their accepted range.
pub fn parse_command(line: &str) -> Result<ControlRequest, CommandError> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut parts = line.split_whitespace();

    match parts.next() {
        Some("status") => Ok(ControlRequest::Status),
        Some("stats") => Ok(ControlRequest::Stats),
        Some("config") => Ok(ControlRequest::Config),
        Some("stop") | Some("pause") => Ok(ControlRequest::Stop),
        Some("start") | Some("resume") => Ok(ControlRequest::Start),
        Some("set") => parse_set(&mut parts),
        Some(other) => Err(CommandError::Unknown(other.to_string())),
        None => Err(CommandError::Unknown(String::new())),
    }
}

fn parse_set<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<ControlRequest, CommandError> {
    match parts.next() {
        Some("depth") => {
            let arg = parts.next().ok_or(CommandError::MissingArgument("depth"))?;
            let depth: u32 = arg
                .parse()
                .map_err(|_| CommandError::InvalidArgument(arg.to_string()))?;
            if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
                return Err(CommandError::InvalidArgument(format!(
                    "depth must be between {MIN_DEPTH} and {MAX_DEPTH}"
                )));
            }
            Ok(ControlRequest::SetDepth(depth))
        }
        Some("time") => {
            let arg = parts.next().ok_or(CommandError::MissingArgument("time"))?;
            if !is_valid_time_control(arg) {
                return Err(CommandError::InvalidArgument(format!(
                    "time control must look like 5+0, got {arg}"
                )));
            }
            Ok(ControlRequest::SetTimeControl(arg.to_string()))
        }
        Some("maxgames") => {
            let arg = parts
                .next()
                .ok_or(CommandError::MissingArgument("maxgames"))?;
            let n: u32 = arg
                .parse()
                .map_err(|_| CommandError::InvalidArgument(arg.to_string()))?;
            Ok(ControlRequest::SetMaxGames(n))
        }
        Some(other) => Err(CommandError::Unknown(format!("set {other}"))),
        None => Err(CommandError::MissingArgument("set")),
    }
}

/// Accepts time controls of the form "minutes+increment", e.g. "5+0".
fn is_valid_time_control(s: &str) -> bool {
    let Some((minutes, increment)) = s.split_once('+') else {
        return false;
    };
    !minutes.is_empty()
        && !increment.is_empty()
        && minutes.chars().all(|c| c.is_ascii_digit())
        && increment.chars().all(|c| c.is_ascii_digit())
}

const HELP_TEXT: &str = "commands: status | stats | config | stop | start | \
set depth <5-30> | set time <N+M> | set maxgames <n>";

/// Accepts control connections and forwards parsed commands.
///
/// Runs until the listener fails or the receiving side of `commands`
/// is dropped. Each connection is served on its own task.
pub async fn serve(listener: TcpListener, commands: mpsc::UnboundedSender<ControlMessage>) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "control listener accept failed");
                continue;
            }
        };
        info!(%addr, "control connection opened");
        let commands = commands.clone();
        tokio::spawn(async move {
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                if line.trim().trim_start_matches('/') == "help" {
                    let _ = write_half.write_all(HELP_TEXT.as_bytes()).await;
                    let _ = write_half.write_all(b"\n").await;
                    continue;
                }
                let response = dispatch(&line, &commands).await;
                let _ = write_half.write_all(response.as_bytes()).await;
                let _ = write_half.write_all(b"\n").await;
            }
            info!(%addr, "control connection closed");
        });
    }
}

async fn dispatch(line: &str, commands: &mpsc::UnboundedSender<ControlMessage>) -> String {
    let request = match parse_command(line) {
        Ok(request) => request,
        Err(err) => return format!("error: {err}"),
    };

    if request.is_query() {
        let (tx, rx) = oneshot::channel();
        let message = ControlMessage {
            request,
            reply: Some(tx),
        };
        if commands.send(message).is_err() {
            return "error: session is shutting down".to_string();
        }
        match rx.await {
            Ok(text) => text,
            Err(_) => "error: session is shutting down".to_string(),
        }
    } else {
        let message = ControlMessage {
            request,
            reply: None,
        };
        if commands.send(message).is_err() {
            "error: session is shutting down".to_string()
        } else {
            "ok".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("status"), Ok(ControlRequest::Status));
        assert_eq!(parse_command("/stats"), Ok(ControlRequest::Stats));
        assert_eq!(parse_command("  config  "), Ok(ControlRequest::Config));
        assert_eq!(parse_command("stop"), Ok(ControlRequest::Stop));
        assert_eq!(parse_command("pause"), Ok(ControlRequest::Stop));
        assert_eq!(parse_command("start"), Ok(ControlRequest::Start));
        assert_eq!(parse_command("resume"), Ok(ControlRequest::Start));
    }

    #[test]
    fn parse_set_depth() {
        assert_eq!(
            parse_command("set depth 20"),
            Ok(ControlRequest::SetDepth(20))
        );
        assert!(matches!(
            parse_command("set depth 3"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("set depth 31"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("set depth abc"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert_eq!(
            parse_command("set depth"),
            Err(CommandError::MissingArgument("depth"))
        );
    }

    #[test]
    fn parse_set_time_control() {
        assert_eq!(
            parse_command("set time 3+2"),
            Ok(ControlRequest::SetTimeControl("3+2".to_string()))
        );
        assert_eq!(
            parse_command("set time 10+0"),
            Ok(ControlRequest::SetTimeControl("10+0".to_string()))
        );
        assert!(matches!(
            parse_command("set time blitz"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("set time 5+"),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn parse_set_maxgames() {
        assert_eq!(
            parse_command("set maxgames 0"),
            Ok(ControlRequest::SetMaxGames(0))
        );
        assert_eq!(
            parse_command("set maxgames 50"),
            Ok(ControlRequest::SetMaxGames(50))
        );
    }

    #[test]
    fn unknown_commands_error() {
        assert!(matches!(
            parse_command("restart"),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(
            parse_command("set speed 5"),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(parse_command(""), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn queries_expect_replies() {
        assert!(ControlRequest::Status.is_query());
        assert!(ControlRequest::Stats.is_query());
        assert!(ControlRequest::Config.is_query());
        assert!(!ControlRequest::Stop.is_query());
        assert!(!ControlRequest::SetDepth(10).is_query());
    }

    #[tokio::test]
    async fn serve_forwards_commands_and_replies() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(listener, tx));

        // Fake session side: answer every query with a canned line.
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Some(reply) = message.reply {
                    let _ = reply.send(format!("answer to {:?}", message.request));
                }
            }
        });

        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"status\n").await.unwrap();
        let reply = lines.next_line().await.unwrap().unwrap();
        assert!(reply.contains("Status"));

        write_half.write_all(b"stop\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "ok");

        write_half.write_all(b"bogus\n").await.unwrap();
        let reply = lines.next_line().await.unwrap().unwrap();
        assert!(reply.starts_with("error:"));
    }
}
