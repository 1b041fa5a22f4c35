//! Authoritative-process driver for EC4X.
//!
//! Three subcommands:
//!
//! - `new --name <str> --scenario <path>` creates a game and prints its id
//!   and one invite code per house slot.
//! - `start --poll <seconds>` runs the autonomous turn loop: drain the
//!   order queue, advance when packets are in (missing houses auto-hold),
//!   persist, publish encrypted per-house updates.
//! - `status <game_id>` prints the turn and per-house standing.
//!
//! Exit codes: 0 success, 1 invariant violation, 2 bad configuration,
//! 3 transport failure.

mod error;
mod inbox;
mod runner;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ec4x_core::GameState;
use ec4x_rules::{GameSetup, RuleSnapshot};

use crate::error::ServerError;

/// Command-line interface of the authoritative process.
#[derive(Debug, Parser)]
#[command(name = "ec4x-server", about = "EC4X authoritative turn engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Create a game from a scenario file.
    New {
        /// Display name of the game.
        #[arg(long)]
        name: String,
        /// Path to the scenario YAML.
        #[arg(long)]
        scenario: PathBuf,
        /// Path to a rules YAML; defaults apply when omitted.
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Run the autonomous turn loop over every unfinished game.
    Start {
        /// Poll interval in seconds.
        #[arg(long, default_value_t = 30)]
        poll: u64,
    },
    /// Print a game's turn and per-house standing.
    Status {
        /// The game to inspect.
        game_id: Uuid,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(%err, "fatal");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    match cli.command {
        Command::New {
            name,
            scenario,
            rules,
        } => new_game(&name, &scenario, rules.as_deref()).await,
        Command::Start { poll } => start(Duration::from_secs(poll.max(1))).await,
        Command::Status { game_id } => status(game_id).await,
    }
}

fn database_url() -> Result<String, ServerError> {
    std::env::var("DATABASE_URL")
        .map_err(|_| ServerError::Environment("DATABASE_URL is not set".to_owned()))
}

fn relay_url() -> String {
    std::env::var("RELAY_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".to_owned())
}

/// The engine's long-term secret key: `EC4X_SECRET_KEY` (64 hex chars),
/// or a fresh random key whose public half is logged for clients.
fn server_secret() -> Result<[u8; 32], ServerError> {
    match std::env::var("EC4X_SECRET_KEY") {
        Ok(hex_key) => ec4x_transport::parse_key(&hex_key)
            .map_err(|e| ServerError::Environment(format!("EC4X_SECRET_KEY: {e}"))),
        Err(_) => {
            let mut secret = [0u8; 32];
            rand::rng().fill(&mut secret);
            info!(
                public_key = hex::encode(ec4x_transport::public_key(&secret)),
                "EC4X_SECRET_KEY not set; generated an ephemeral engine key"
            );
            Ok(secret)
        }
    }
}

async fn new_game(
    name: &str,
    scenario_path: &std::path::Path,
    rules_path: Option<&std::path::Path>,
) -> Result<(), ServerError> {
    let mut setup = GameSetup::from_file(scenario_path)?;
    setup.name = name.to_owned();
    let snapshot = match rules_path {
        Some(path) => RuleSnapshot::from_file(path)?,
        None => RuleSnapshot::default(),
    };
    snapshot.validate()?;

    let state = GameState::new_game(&setup, &snapshot)?;
    let game_id = Uuid::new_v4();

    let db = ec4x_db::PostgresPool::connect_url(&database_url()?).await?;
    db.run_migrations().await?;
    let game_store = ec4x_db::GameStore::new(db.pool());
    let state_store = ec4x_db::StateStore::new(db.pool());

    let setup_json =
        serde_json::to_value(&setup).map_err(ec4x_db::DbError::Serialization)?;
    let config_json =
        serde_json::to_value(&snapshot).map_err(ec4x_db::DbError::Serialization)?;
    game_store
        .create_game(game_id, name, setup.seed, &setup_json, &config_json)
        .await?;
    state_store.save_turn(game_id, &state, &[]).await?;

    let codes: Vec<(String, u32)> = state
        .houses
        .keys()
        .map(|house| {
            (
                Uuid::new_v4().simple().to_string(),
                house.into_inner(),
            )
        })
        .collect();
    game_store.create_invites(game_id, &codes).await?;

    println!("game {game_id}");
    for (code, house) in &codes {
        println!("invite house {house}: {code}");
    }
    db.close().await;
    Ok(())
}

async fn start(poll: Duration) -> Result<(), ServerError> {
    let db = ec4x_db::PostgresPool::connect_url(&database_url()?).await?;
    db.run_migrations().await?;
    let relay = ec4x_transport::RelayClient::connect(&relay_url()).await?;
    let secret = server_secret()?;
    runner::run_loop(&db, &relay, secret, poll).await?;
    db.close().await;
    Ok(())
}

async fn status(game_id: Uuid) -> Result<(), ServerError> {
    let db = ec4x_db::PostgresPool::connect_url(&database_url()?).await?;
    let game_store = ec4x_db::GameStore::new(db.pool());
    let state_store = ec4x_db::StateStore::new(db.pool());

    let row = game_store.get_game(game_id).await?;
    let state = state_store.load_latest(game_id).await?;

    println!("game {game_id} \"{}\"", row.name);
    println!("turn {}", state.turn);
    if state.finished {
        match state.winner {
            Some(winner) => println!("finished: house {winner} won"),
            None => println!("finished: draw"),
        }
    }
    for (id, house) in &state.houses {
        let standing = if house.eliminated { "eliminated" } else { "active" };
        let joined = if house.transport_pubkey.is_empty() {
            "awaiting join"
        } else {
            "joined"
        };
        println!(
            "house {id} \"{}\": {standing}, {joined}, prestige {}, colonies {}",
            house.name,
            house.prestige,
            state.colonies_of(*id).len()
        );
    }
    db.close().await;
    Ok(())
}
