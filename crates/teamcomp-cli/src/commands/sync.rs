use std::path::Path;

use teamcomp_core::AppConfig;

use crate::commands::common::{build_job, format_run_report};
use crate::error::CliError;

pub async fn run_sync(config: &AppConfig, db_path: &Path, as_json: bool) -> Result<(), CliError> {
    let job = build_job(config, db_path).await?;
    let report = job.run().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_run_report(&report));
    }

    Ok(())
}
