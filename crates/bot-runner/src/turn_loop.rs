//! The per-turn decision loop.
//!
//! One state machine drives the whole session: seek a game, poll the
//! surface until it is our turn, reconstruct the position, decide a
//! move (repertoire first, evaluator second), pace the submission, and
//! deliver it through pointer actions. Control commands are drained at
//! loop boundaries so session state stays single-owner.

use std::time::Duration;

use board_tracker::{is_legal_uci, PositionTracker, TrackedPosition};
use humanizer::{gesture, jitter, move_delay, pause_duration, should_pause};
use opening_book::Repertoire;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::oracle::{MoveOracle, OracleError};
use crate::remote::{ControlMessage, ControlRequest};
use crate::session::{resolve_outcome, Color, GameOutcome, SessionState};
use crate::surface::{parse_move_token, square_point, GameSurface, SurfaceError};

/// Unchanged polls after a submission before the click is presumed
/// dropped by the page and the move is submitted again.
const RESUBMIT_POLL_LIMIT: u32 = 50;

/// Where the loop stands within the current game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the opponent's move to appear in the record.
    AwaitingOpponent,
    /// The record shows it is our side to move.
    MyTurn,
    /// Our move was delivered; waiting for the record to reflect it.
    MoveSubmitted,
    /// The game ended with a resolved outcome.
    GameOver(GameOutcome),
    /// The game was cut short by an unrecoverable surface failure.
    Aborted,
}

/// Unrecoverable session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("game did not start within {0:?}")]
    GameStartTimeout(Duration),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// The orchestrating state machine.
pub struct TurnLoop {
    config: SessionConfig,
    tracker: PositionTracker,
    book: Repertoire,
    oracle: Box<dyn MoveOracle>,
    surface: Box<dyn GameSurface>,
    state: SessionState,
    turn_state: TurnState,
    /// Record length at the last submission, used to avoid submitting
    /// twice while the record has not yet caught up.
    submitted_at: Option<usize>,
    /// Polls since that submission with the record still unchanged.
    stale_polls: u32,
    control: mpsc::UnboundedReceiver<ControlMessage>,
    rng: StdRng,
}

impl TurnLoop {
    #[must_use]
    pub fn new(
        config: SessionConfig,
        book: Repertoire,
        oracle: Box<dyn MoveOracle>,
        surface: Box<dyn GameSurface>,
        control: mpsc::UnboundedReceiver<ControlMessage>,
    ) -> Self {
        Self {
            config,
            tracker: PositionTracker::new(),
            book,
            oracle,
            surface,
            state: SessionState::new(),
            turn_state: TurnState::AwaitingOpponent,
            submitted_at: None,
            stale_polls: 0,
            control,
            rng: StdRng::from_entropy(),
        }
    }

    /// Session tallies accumulated so far.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs the session until the game limit is reached or a fatal
    /// error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the surface bridge fails in a way
    /// no retry can recover from.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        self.state.running = true;
        info!(time_control = %self.config.time_control, "session started");

        loop {
            self.drain_control();

            if self.config.max_games > 0 && self.state.games_played >= self.config.max_games {
                info!(games = self.state.games_played, "game limit reached");
                break;
            }
            if self.state.paused {
                sleep(Duration::from_millis(500)).await;
                continue;
            }

            self.surface.start_game(&self.config.time_control).await?;
            if let Err(err) = self.await_game_start().await {
                warn!(error = %err, "game did not start");
                continue;
            }

            let outcome = self.play_game().await?;
            info!(%outcome, games = self.state.games_played + 1, "game finished");
            self.state.record_outcome(outcome);
            self.state.current_color = None;

            sleep(Duration::from_millis(self.config.game.rest_between_games_ms)).await;
        }

        self.state.running = false;
        Ok(())
    }

    async fn await_game_start(&mut self) -> Result<(), SessionError> {
        let timeout = Duration::from_secs(self.config.game.start_timeout_secs);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.surface.is_in_game().await? {
                // Let the page settle before reading orientation.
                sleep(Duration::from_secs(1)).await;
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SessionError::GameStartTimeout(timeout));
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    /// Plays one game to completion.
    ///
    /// Transient surface and evaluator errors are logged and retried
    /// after a short backoff; a closed surface bridge is fatal.
    async fn play_game(&mut self) -> Result<GameOutcome, SessionError> {
        let color = self.read_orientation().await?;
        self.state.current_color = Some(color);
        self.turn_state = TurnState::AwaitingOpponent;
        self.submitted_at = None;
        self.stale_polls = 0;
        info!(%color, "playing");

        self.oracle.new_game().await?;

        loop {
            self.drain_control();

            match self.poll_once(color).await {
                Ok(()) => {}
                Err(SessionError::Surface(SurfaceError::Closed)) => {
                    self.turn_state = TurnState::Aborted;
                    return Err(SessionError::Surface(SurfaceError::Closed));
                }
                Err(err) => {
                    warn!(error = %err, "turn iteration failed, retrying");
                    sleep(Duration::from_secs(1)).await;
                    continue;
                }
            }

            if let TurnState::GameOver(outcome) = self.turn_state {
                return Ok(outcome);
            }

            sleep(Duration::from_millis(self.config.game.poll_interval_ms)).await;
        }
    }

    async fn read_orientation(&mut self) -> Result<Color, SessionError> {
        // The board can render before the orientation class settles.
        for _ in 0..5 {
            match self.surface.orientation().await {
                Ok(color) => return Ok(color),
                Err(SurfaceError::Closed) => return Err(SurfaceError::Closed.into()),
                Err(err) => {
                    debug!(error = %err, "orientation not readable yet");
                    sleep(Duration::from_millis(500)).await;
                }
            }
        }
        Ok(self.surface.orientation().await?)
    }

    /// One polling iteration: check for game end, then for our turn.
    async fn poll_once(&mut self, color: Color) -> Result<(), SessionError> {
        if self.surface.is_game_over().await? {
            let text = self.surface.result_text().await?;
            let outcome = resolve_outcome(text.as_deref());
            self.turn_state = TurnState::GameOver(outcome);
            return Ok(());
        }

        let tokens = self.surface.move_list().await?;
        let white_to_move = tokens.len() % 2 == 0;
        let my_turn = white_to_move == (color == Color::White);

        if my_turn {
            if self.submitted_at == Some(tokens.len()) {
                // Already delivered a move for this record length.
                // Usually the record just has not caught up yet; after
                // enough unchanged polls the page is presumed to have
                // dropped the click and the move is decided again.
                self.stale_polls += 1;
                if self.stale_polls < RESUBMIT_POLL_LIMIT {
                    return Ok(());
                }
                warn!("submission never reached the record, retrying");
                self.submitted_at = None;
            }
            self.turn_state = TurnState::MyTurn;
            self.take_turn(&tokens, color).await?;
            self.submitted_at = Some(tokens.len());
            self.stale_polls = 0;
            self.turn_state = TurnState::MoveSubmitted;
        } else {
            self.turn_state = TurnState::AwaitingOpponent;
            self.stale_polls = 0;
        }
        Ok(())
    }

    async fn take_turn(&mut self, tokens: &[String], color: Color) -> Result<(), SessionError> {
        let tracked = self.tracker.reconstruct(tokens);
        let token = self.decide(&tracked).await?;
        self.pace(tracked.applied() as u32).await;
        self.submit(&token, color).await?;
        Ok(())
    }

    /// Picks a move: repertoire first, evaluator on any miss.
    ///
    /// A repertoire hit that is not legal in the reconstructed position
    /// falls through to the evaluator rather than being submitted.
    async fn decide(&mut self, tracked: &TrackedPosition) -> Result<String, SessionError> {
        let ply = tracked.applied() as u32;

        if self.config.opening_book.enabled {
            let canonical = tracked.canonical();
            if let Some(token) = self.book.lookup(&canonical, ply, &mut self.rng) {
                if is_legal_uci(tracked.position(), token) {
                    debug!(%token, ply, "repertoire move");
                    return Ok(token.to_string());
                }
                warn!(%token, ply, "repertoire move not legal here, consulting evaluator");
            }
        }

        let fen = tracked.fen();
        let token = self
            .oracle
            .best_move(&fen, self.config.engine.depth)
            .await?;
        debug!(%token, ply, "evaluator move");
        Ok(token)
    }

    /// Waits a human-looking amount of time before submitting.
    async fn pace(&mut self, ply: u32) {
        let anti = &self.config.anti_detection;
        if !anti.enabled {
            sleep(Duration::from_millis(anti.base_delay_ms)).await;
            return;
        }
        if anti.thinking_pauses && should_pause(&mut self.rng, ply) {
            let pause = pause_duration(&mut self.rng);
            debug!(?pause, "thinking pause");
            sleep(pause).await;
        }
        let delay = move_delay(&mut self.rng, anti.base_delay_ms as f64, anti.variance_factor);
        sleep(delay).await;
    }

    /// Delivers a move token through pointer actions.
    async fn submit(&mut self, token: &str, color: Color) -> Result<(), SessionError> {
        let parsed = parse_move_token(token)?;
        let geo = self.surface.board_geometry().await?;
        let flipped = color == Color::Black;
        let from = square_point(&parsed.from, geo, flipped)?;
        let to = square_point(&parsed.to, geo, flipped)?;

        if self.config.anti_detection.enabled && self.config.anti_detection.human_motion {
            let gesture = gesture(&mut self.rng, from, to);
            for point in &gesture.approach {
                let point = jitter(&mut self.rng, *point, 1.5);
                self.surface.pointer_move(point).await?;
                let step = self.rng.gen_range(5..=20);
                sleep(Duration::from_millis(step)).await;
            }
            self.surface.pointer_click(from).await?;
            let grip = self.rng.gen_range(30..=80);
            sleep(Duration::from_millis(grip)).await;
            for point in &gesture.drag {
                let point = jitter(&mut self.rng, *point, 1.5);
                self.surface.pointer_move(point).await?;
                let step = self.rng.gen_range(5..=20);
                sleep(Duration::from_millis(step)).await;
            }
            self.surface.pointer_click(to).await?;
        } else {
            self.surface.pointer_click(from).await?;
            sleep(Duration::from_millis(50)).await;
            self.surface.pointer_click(to).await?;
        }

        if let Some(piece) = parsed.promotion {
            sleep(Duration::from_millis(200)).await;
            self.surface.pick_promotion(piece).await?;
        }
        Ok(())
    }

    fn drain_control(&mut self) {
        while let Ok(message) = self.control.try_recv() {
            self.apply_control(message);
        }
    }

    fn apply_control(&mut self, message: ControlMessage) {
        let reply_text = match message.request {
            ControlRequest::Status => {
                let phase = if self.state.current_color.is_some() {
                    "in game"
                } else if self.state.paused {
                    "paused"
                } else {
                    "seeking"
                };
                Some(format!(
                    "status: {phase}, games played: {}",
                    self.state.games_played
                ))
            }
            ControlRequest::Stats => Some(format!(
                "wins: {}, losses: {}, draws: {}, unresolved: {}, win rate: {:.1}%",
                self.state.stats.wins,
                self.state.stats.losses,
                self.state.stats.draws,
                self.state.stats.unknown,
                self.state.win_rate()
            )),
            ControlRequest::Config => Some(
                toml::to_string(&self.config)
                    .unwrap_or_else(|err| format!("error rendering config: {err}")),
            ),
            ControlRequest::SetDepth(depth) => {
                info!(depth, "depth changed");
                self.config.engine.depth = depth;
                None
            }
            ControlRequest::SetTimeControl(tc) => {
                info!(time_control = %tc, "time control changed");
                self.config.time_control = tc;
                None
            }
            ControlRequest::SetMaxGames(n) => {
                info!(max_games = n, "game limit changed");
                self.config.max_games = n;
                None
            }
            ControlRequest::Stop => {
                info!("pausing after current game");
                self.state.paused = true;
                None
            }
            ControlRequest::Start => {
                info!("resuming");
                self.state.paused = false;
                None
            }
        };

        if let (Some(reply), Some(text)) = (message.reply, reply_text) {
            let _ = reply.send(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::GameStats;
    use tokio::sync::oneshot;

    struct NoopOracle;

    #[async_trait::async_trait]
    impl MoveOracle for NoopOracle {
        async fn best_move(&mut self, _fen: &str, _depth: u32) -> Result<String, OracleError> {
            Ok("e2e4".to_string())
        }
    }

    struct NoopSurface;

    #[async_trait::async_trait]
    impl GameSurface for NoopSurface {
        async fn start_game(&mut self, _tc: &str) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn is_in_game(&mut self) -> Result<bool, SurfaceError> {
            Ok(false)
        }
        async fn orientation(&mut self) -> Result<Color, SurfaceError> {
            Ok(Color::White)
        }
        async fn move_list(&mut self) -> Result<Vec<String>, SurfaceError> {
            Ok(Vec::new())
        }
        async fn is_game_over(&mut self) -> Result<bool, SurfaceError> {
            Ok(false)
        }
        async fn result_text(&mut self) -> Result<Option<String>, SurfaceError> {
            Ok(None)
        }
        async fn board_geometry(&mut self) -> Result<crate::surface::BoardGeometry, SurfaceError> {
            Ok(crate::surface::BoardGeometry {
                x: 0.0,
                y: 0.0,
                size: 800.0,
            })
        }
        async fn pointer_move(&mut self, _p: humanizer::Point) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn pointer_click(&mut self, _p: humanizer::Point) -> Result<(), SurfaceError> {
            Ok(())
        }
        async fn pick_promotion(&mut self, _piece: char) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    fn test_loop() -> (TurnLoop, mpsc::UnboundedSender<ControlMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let turn_loop = TurnLoop::new(
            SessionConfig::default(),
            Repertoire::new(10),
            Box::new(NoopOracle),
            Box::new(NoopSurface),
            rx,
        );
        (turn_loop, tx)
    }

    #[test]
    fn control_mutations_apply_at_drain() {
        let (mut turn_loop, tx) = test_loop();
        tx.send(ControlMessage {
            request: ControlRequest::SetDepth(22),
            reply: None,
        })
        .unwrap();
        tx.send(ControlMessage {
            request: ControlRequest::SetTimeControl("3+2".to_string()),
            reply: None,
        })
        .unwrap();
        tx.send(ControlMessage {
            request: ControlRequest::Stop,
            reply: None,
        })
        .unwrap();

        assert_eq!(turn_loop.config.engine.depth, 15);
        turn_loop.drain_control();
        assert_eq!(turn_loop.config.engine.depth, 22);
        assert_eq!(turn_loop.config.time_control, "3+2");
        assert!(turn_loop.state.paused);
    }

    #[test]
    fn stats_query_replies_with_tallies() {
        let (mut turn_loop, _tx) = test_loop();
        turn_loop.state.stats = GameStats {
            wins: 3,
            losses: 1,
            draws: 1,
            unknown: 0,
        };
        turn_loop.state.games_played = 5;

        let (reply_tx, mut reply_rx) = oneshot::channel();
        turn_loop.apply_control(ControlMessage {
            request: ControlRequest::Stats,
            reply: Some(reply_tx),
        });
        let text = reply_rx.try_recv().unwrap();
        assert!(text.contains("wins: 3"));
        assert!(text.contains("60.0%"));
    }

    #[test]
    fn status_reports_paused() {
        let (mut turn_loop, _tx) = test_loop();
        turn_loop.state.paused = true;

        let (reply_tx, mut reply_rx) = oneshot::channel();
        turn_loop.apply_control(ControlMessage {
            request: ControlRequest::Status,
            reply: Some(reply_tx),
        });
        assert!(reply_rx.try_recv().unwrap().contains("paused"));
    }
}
