use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Parser;
use lockgate::{LockoutConfig, LockoutGuard, MAX_LOCKOUT_PERIOD, SqliteStorage};
use tracing_subscriber::EnvFilter;

/// Command line interface for Lockgate
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "LOCKGATE_DB_URL")]
    db_url: String,

    /// Failed attempts that lock a principal out
    #[arg(long, default_value_t = lockgate::DEFAULT_LOCKOUT_THRESHOLD)]
    max_failed_attempts: u32,

    /// Lockout duration in seconds, counted from the latest failed attempt
    #[arg(long, default_value_t = lockgate::DEFAULT_LOCKOUT_WINDOW.num_seconds())]
    lockout_period_secs: i64,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Show the lockout status of a principal
    Status { principal: String },
    /// Clear the failed attempts of a principal
    Unlock { principal: String },
    /// Delete records of principals whose last failure is older than the given age
    Purge {
        /// Minimum age in seconds; never less than the lockout period
        #[arg(long, default_value_t = 86_400)]
        older_than_secs: i64,
    },
    /// Print version information
    Version,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Lockgate(#[from] lockgate::Error),

    #[error(
        "Invalid lockout period: {0} seconds (must be between 1 and {max})",
        max = MAX_LOCKOUT_PERIOD.num_seconds()
    )]
    InvalidPeriod(i64),

    #[error("Invalid age: {0} seconds")]
    InvalidAge(i64),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Version => {
            println!("Lockgate v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Migrate => {
            println!("Running migrations...");
            let storage = SqliteStorage::connect(&cli.db_url).await?;
            storage.migrate().await?;
        }
        Commands::Status { ref principal } => {
            let guard = open_guard(&cli).await?;
            let status = guard.lockout_status(principal, Utc::now()).await?;

            println!("principal:       {}", status.principal);
            println!("failed attempts: {}", status.failed_attempts);
            match status.locked_until {
                Some(until) => println!("locked until:    {}", until.to_rfc3339()),
                None => println!("locked:          no"),
            }
        }
        Commands::Purge { older_than_secs } => {
            let older_than = Duration::try_seconds(older_than_secs)
                .filter(|age| *age >= Duration::zero())
                .ok_or(CliError::InvalidAge(older_than_secs))?;
            let guard = open_guard(&cli).await?;
            let purged = guard.purge_stale(Utc::now(), older_than).await?;
            println!("Purged {purged} lockout records");
        }
        Commands::Unlock { ref principal } => {
            let guard = open_guard(&cli).await?;
            if guard.unlock(principal, Utc::now()).await? {
                println!("Unlocked {principal}");
            } else {
                println!("{principal} was not locked");
            }
        }
    }

    Ok(())
}

async fn open_guard(cli: &Cli) -> Result<LockoutGuard<lockgate::SqliteLockoutRepository>, CliError> {
    let lockout_period = Duration::try_seconds(cli.lockout_period_secs)
        .filter(|period| *period > Duration::zero() && *period <= MAX_LOCKOUT_PERIOD)
        .ok_or(CliError::InvalidPeriod(cli.lockout_period_secs))?;

    let config = LockoutConfig::default()
        .with_max_failed_attempts(cli.max_failed_attempts)
        .with_lockout_period(lockout_period);

    let storage = SqliteStorage::connect(&cli.db_url).await?;
    storage.migrate().await?;

    Ok(LockoutGuard::new(
        Arc::new(storage.into_lockout_repository()),
        config,
    ))
}
