//! teamcomp-core - Core library for teamcomp
//!
//! Collects periodic snapshots of a racing team, derives per-member activity
//! deltas between them and scores time-boxed competitions from those deltas.
//! The command line front end lives in `teamcomp-cli`.

pub mod config;
pub mod db;
pub mod error;
pub mod leaderboard;
pub mod models;
pub mod nitrotype;
pub mod seed;
pub mod services;
pub mod sync;
pub mod util;

pub use config::{AppConfig, ConfigError};
pub use error::{Error, Result};
pub use services::DatabaseService;
pub use sync::{RunOutcome, RunReport, Scheduler, SyncJob};
