//! Wall-clock scheduler for the sync job.
//!
//! Fires at minutes 1, 11, 21, 31, 41 and 51 of every hour. A tick that
//! arrives while the previous run is still going is dropped. A panic inside
//! a run is logged and the expiring competition is still failed forward.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{SyncJob, JOB_NAME};
use crate::util::window_boundary;

/// Minutes past the hour at which the job fires
pub const FIRE_MINUTES: [u32; 6] = [1, 11, 21, 31, 41, 51];

/// First fire time strictly after `now`
pub fn next_fire_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let boundary = window_boundary(now);
    if boundary > now {
        boundary
    } else {
        boundary + Duration::minutes(10)
    }
}

/// Owns the periodic trigger and the single-run guard
pub struct Scheduler {
    job: SyncJob,
    running: Arc<Mutex<()>>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(job: SyncJob) -> Self {
        Self {
            job,
            running: Arc::new(Mutex::new(())),
            shutdown: CancellationToken::new(),
            handle: None,
        }
    }

    /// Spawn the trigger loop; calling it twice is a no-op
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let job = self.job.clone();
        let running = Arc::clone(&self.running);
        let shutdown = self.shutdown.clone();

        self.handle = Some(tokio::spawn(async move {
            tracing::info!(job = JOB_NAME, team = job.team_tag(), "Scheduler started");
            loop {
                let now = Utc::now();
                let next = next_fire_after(now);
                let wait = (next - now).to_std().unwrap_or_default();
                tracing::debug!(job = JOB_NAME, next = %next, "Waiting for next tick");

                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(wait) => {
                        trigger(&job, &running);
                    }
                }
            }
            tracing::info!(job = JOB_NAME, "Scheduler stopped");
        }));
    }

    /// Run the job now unless a run is already in flight
    ///
    /// Returns the handle of the spawned run, or `None` when skipped.
    pub fn trigger(&self) -> Option<JoinHandle<()>> {
        trigger(&self.job, &self.running)
    }

    /// Stop ticking and wait for an in-flight run to finish
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(error) = handle.await {
                tracing::error!(job = JOB_NAME, %error, "Scheduler loop ended abnormally");
            }
        }
        let _idle = self.running.lock().await;
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

fn trigger(job: &SyncJob, running: &Arc<Mutex<()>>) -> Option<JoinHandle<()>> {
    let Ok(guard) = Arc::clone(running).try_lock_owned() else {
        tracing::warn!(
            job = JOB_NAME,
            team = job.team_tag(),
            "Previous run still in progress, skipping tick"
        );
        return None;
    };

    let job = job.clone();
    let now = Utc::now();
    Some(tokio::spawn(async move {
        let _guard = guard;
        let team = job.team_tag().to_string();
        let run = job.clone();
        match tokio::spawn(async move { run.run_at(now).await }).await {
            Ok(report) => {
                tracing::debug!(job = JOB_NAME, %team, advancement = ?report.advancement, "Run finished");
            }
            Err(error) if error.is_panic() => {
                tracing::error!(job = JOB_NAME, %team, "Sync run panicked: {error}");
                let advancement = job.fail_forward(now).await;
                tracing::warn!(job = JOB_NAME, %team, ?advancement, "Failed forward after panic");
            }
            Err(error) => {
                tracing::warn!(job = JOB_NAME, %team, "Sync run cancelled: {error}");
            }
        }
    }))
}
