//! Shared services used by the job and the command line.

mod database;

pub use database::{Advancement, DatabaseService};
