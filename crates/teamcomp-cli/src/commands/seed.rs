use std::path::Path;

use teamcomp_core::seed::plan_competitions;

use crate::commands::common::{format_competition_lines, open_database, parse_timestamp};
use crate::error::CliError;

pub async fn run_seed(from: &str, to: &str, db_path: &Path) -> Result<(), CliError> {
    let from = parse_timestamp(from)?;
    let to = parse_timestamp(to)?;
    let competitions = plan_competitions(from, to, &mut rand::thread_rng())?;

    let db = open_database(db_path).await?;
    let created = db.seed_competitions(&competitions).await?;

    for line in format_competition_lines(&competitions) {
        println!("{line}");
    }
    println!("Seeded {created} competitions");

    Ok(())
}
