use std::path::Path;

use teamcomp_core::models::CompetitionId;

use crate::commands::common::{format_leaderboard_lines, format_total_lines, open_database};
use crate::error::CliError;

pub async fn run_leaderboard(id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let competition_id: CompetitionId = id
        .trim()
        .parse()
        .map_err(|_| CliError::InvalidId(id.to_string()))?;
    let db = open_database(db_path).await?;
    let leaderboard = db.leaderboard(&competition_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&leaderboard)?);
    } else {
        for line in format_leaderboard_lines(&leaderboard) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_totals(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let totals = db.totals().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
    } else if totals.is_empty() {
        println!("No finished competitions yet.");
    } else {
        for line in format_total_lines(&totals) {
            println!("{line}");
        }
    }

    Ok(())
}
