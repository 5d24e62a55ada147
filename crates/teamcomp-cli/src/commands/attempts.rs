use std::path::Path;

use teamcomp_core::models::AttemptId;

use crate::commands::common::{
    attempt_to_list_item, format_attempt_lines, open_database, AttemptListItem,
};
use crate::error::CliError;

pub async fn run_attempts_list(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let attempts = db.list_attempts(limit).await?;

    if as_json {
        let json_items = attempts
            .iter()
            .map(attempt_to_list_item)
            .collect::<Vec<AttemptListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if attempts.is_empty() {
        println!("No attempts recorded.");
    } else {
        for line in format_attempt_lines(&attempts) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_attempts_discard(id: &str, db_path: &Path) -> Result<(), CliError> {
    let attempt_id = parse_attempt_id(id)?;
    let db = open_database(db_path).await?;
    db.discard_attempt(&attempt_id).await?;
    println!("Discarded attempt {attempt_id}");
    Ok(())
}

pub fn parse_attempt_id(id: &str) -> Result<AttemptId, CliError> {
    id.trim()
        .parse()
        .map_err(|_| CliError::InvalidId(id.to_string()))
}
