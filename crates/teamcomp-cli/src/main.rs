//! teamcomp - Command-line interface for the team statistics collector
//!
//! Runs the periodic sync job and reads competition results.

mod cli;
mod commands;
mod error;


use clap::Parser;
use teamcomp_core::AppConfig;

use crate::cli::{AttemptCommands, Cli, Commands};
use crate::commands::attempts::{run_attempts_discard, run_attempts_list};
use crate::commands::common::resolve_db_path;
use crate::commands::competitions::run_competitions;
use crate::commands::leaderboard::{run_leaderboard, run_totals};
use crate::commands::seed::run_seed;
use crate::commands::service::run_service;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["teamcomp=info", "teamcomp_core=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?.with_team(cli.team_tag, cli.team_id)?;
    let db_path = resolve_db_path(cli.db_path, &config)?;

    match cli.command {
        Commands::Service => run_service(&config, &db_path).await?,
        Commands::Sync { json } => run_sync(&config, &db_path, json).await?,
        Commands::Seed { from, to } => run_seed(&from, &to, &db_path).await?,
        Commands::Attempts { command } => match command {
            AttemptCommands::List { limit, json } => {
                run_attempts_list(limit, json, &db_path).await?;
            }
            AttemptCommands::Discard { id } => run_attempts_discard(&id, &db_path).await?,
        },
        Commands::Competitions { json } => run_competitions(json, &db_path).await?,
        Commands::Leaderboard { id, json } => run_leaderboard(&id, json, &db_path).await?,
        Commands::Totals { json } => run_totals(json, &db_path).await?,
    }

    Ok(())
}
