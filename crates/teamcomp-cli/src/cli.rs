use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "teamcomp")]
#[command(about = "Collect team racing statistics and score competitions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Team tag to scrape (overrides TEAMCOMP_TEAM_TAG)
    #[arg(long, global = true, value_name = "TAG")]
    pub team_tag: Option<String>,

    /// Expected remote team id (overrides TEAMCOMP_TEAM_ID)
    #[arg(long, global = true, value_name = "ID")]
    pub team_id: Option<i64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sync job on its schedule until interrupted
    Service,
    /// Run the sync job once right now
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create draft competitions covering a time range
    Seed {
        /// Range start (RFC 3339)
        #[arg(long, value_name = "TIME")]
        from: String,
        /// Range end (RFC 3339)
        #[arg(long, value_name = "TIME")]
        to: String,
    },
    /// Inspect or maintain the request log
    Attempts {
        #[command(subcommand)]
        command: AttemptCommands,
    },
    /// List competitions and their status
    Competitions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the ranked standings of one competition
    Leaderboard {
        /// Competition ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show rewards per member over finished competitions
    Totals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AttemptCommands {
    /// List recent sync attempts
    List {
        /// Number of attempts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard an attempt so the next run resumes from the one before it
    Discard {
        /// Attempt ID
        id: String,
    },
}
