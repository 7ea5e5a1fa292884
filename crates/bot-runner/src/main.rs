//! Session entry point.

use anyhow::Context;
use clap::Parser;
use opening_book::builtin::builtin_repertoire;
use opening_book::Repertoire;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use bot_runner::config::SessionConfig;
use bot_runner::oracle::UciOracle;
use bot_runner::remote;
use bot_runner::surface::BridgeSurface;
use bot_runner::turn_loop::TurnLoop;

#[derive(Parser)]
#[command(name = "bot-runner", about = "Autonomous game session runner")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "bot.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bot_runner=info")),
        )
        .init();

    let args = Args::parse();
    let config = SessionConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config))?;

    let book = load_repertoire(&config);
    info!(positions = book.len(), "opening repertoire ready");

    let oracle = UciOracle::spawn(&config.engine.path)
        .await
        .with_context(|| format!("starting evaluator {}", config.engine.path))?;
    info!(engine = oracle.name(), "evaluator ready");

    let surface = BridgeSurface::spawn(&config.surface.command, &config.surface.args)
        .with_context(|| format!("starting surface driver {}", config.surface.command))?;

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    if let Some(listen) = config.control.listen.clone() {
        let listener = TcpListener::bind(&listen)
            .await
            .with_context(|| format!("binding control listener on {listen}"))?;
        info!(%listen, "control listener ready");
        tokio::spawn(remote::serve(listener, control_tx));
    }

    let mut session = TurnLoop::new(
        config,
        book,
        Box::new(oracle),
        Box::new(surface),
        control_rx,
    );
    let result = session.run().await;

    let state = session.state();
    info!(
        games = state.games_played,
        wins = state.stats.wins,
        losses = state.stats.losses,
        draws = state.stats.draws,
        win_rate = format!("{:.1}%", state.win_rate()),
        "session ended"
    );

    result.map_err(Into::into)
}

fn load_repertoire(config: &SessionConfig) -> Repertoire {
    if !config.opening_book.enabled {
        return Repertoire::new(0);
    }
    match Repertoire::load(&config.opening_book.path, config.opening_book.max_moves) {
        Ok(book) => book,
        Err(err) => {
            warn!(
                path = %config.opening_book.path.display(),
                error = %err,
                "repertoire file unusable, using built-in table"
            );
            builtin_repertoire(config.opening_book.max_moves)
        }
    }
}
