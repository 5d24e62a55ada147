use std::path::Path;

use teamcomp_core::sync::next_fire_after;
use teamcomp_core::{AppConfig, Scheduler};

use crate::commands::common::build_job;
use crate::error::CliError;

pub async fn run_service(config: &AppConfig, db_path: &Path) -> Result<(), CliError> {
    let job = build_job(config, db_path).await?;
    let team = job.team_tag().to_string();

    let mut scheduler = Scheduler::new(job);
    scheduler.start();
    tracing::info!(
        team = %team,
        next_run = %next_fire_after(chrono::Utc::now()),
        "Service started, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, waiting for the running job");
    scheduler.stop().await;

    Ok(())
}
