use std::path::Path;

use crate::commands::common::{
    competition_to_list_item, format_competition_lines, open_database, CompetitionListItem,
};
use crate::error::CliError;

pub async fn run_competitions(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let competitions = db.list_competitions().await?;

    if as_json {
        let json_items = competitions
            .iter()
            .map(competition_to_list_item)
            .collect::<Vec<CompetitionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if competitions.is_empty() {
        println!("No competitions. Use `teamcomp seed` to create some.");
    } else {
        for line in format_competition_lines(&competitions) {
            println!("{line}");
        }
    }

    Ok(())
}
