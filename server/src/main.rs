use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chesshall::config::{self, CoordinatorConfig};
use chesshall::persistence::sqlite::{Database, SqliteResultsRepository};
use chesshall::ranking::RankEntry;
use chesshall::{spawn_coordinator, CoordinatorHandle, Results};

#[derive(Parser)]
#[command(name = "chesshall", about = "Chess hall results and rankings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the standings of a ranking view
    Standings {
        /// `ladder` or `league`
        view: String,
        #[arg(long)]
        json: bool,
    },
    /// Print one participant's wins, draws, losses and score
    Stats { participant: String },
    /// Rebuild every ranking view from the results log
    Rebuild,
    /// Append synthetic results played by test players
    SeedTestData {
        #[arg(long, default_value_t = 8)]
        players: usize,
        #[arg(long, default_value_t = 40)]
        games: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Delete every result involving a test player
    PurgeTestData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing();

    let db_path = config::get_results_db_path();
    tracing::info!("Using results database: {}", db_path.display());

    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;
    let results = Results::open(SqliteResultsRepository::new(db.pool().clone())).await?;
    let config = CoordinatorConfig::from_env()?;

    let (handle, task) = spawn_coordinator(results, config);
    let outcome = run(&handle, cli.command).await;
    handle.shutdown().await;
    task.await?;
    outcome
}

/// Stderr by default, a daily rolling file when `CHESSHALL_LOG_DIR` is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match config::get_log_dir() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir).ok();
            let file_appender = tracing_appender::rolling::daily(log_dir, "chesshall");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

async fn run(handle: &CoordinatorHandle, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Standings { view, json } => {
            let standings = handle.standings(&view).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&standings)?);
            } else {
                print_standings(&view, &standings);
            }
        }
        Command::Stats { participant } => {
            let tally = handle.stats(&participant).await?;
            println!(
                "{participant}: {} won, {} drawn, {} lost, {} points",
                tally.wins,
                tally.draws,
                tally.losses,
                tally.score()
            );
        }
        Command::Rebuild => {
            let applied = handle.rebuild().await?;
            println!("Rebuilt rankings from {applied} results");
        }
        Command::SeedTestData {
            players,
            games,
            seed,
        } => {
            let added = handle.seed_test_data(players, games, seed).await?;
            println!("Added {added} test results");
        }
        Command::PurgeTestData => {
            let removed = handle.purge_test_data().await?;
            println!("Removed {removed} test results");
        }
    }
    Ok(())
}

fn print_standings(view: &str, standings: &[RankEntry]) {
    if standings.is_empty() {
        println!("No ranked participants in the {view}");
        return;
    }
    for entry in standings {
        match entry.tally {
            Some(tally) => println!(
                "{:>3}. {:<24} {:>4} pts  (W{} D{} L{})",
                entry.rank,
                entry.participant,
                tally.score(),
                tally.wins,
                tally.draws,
                tally.losses
            ),
            None => println!("{:>3}. {}", entry.rank, entry.participant),
        }
    }
}
