use std::io;

use teamcomp_core::nitrotype::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] teamcomp_core::Error),
    #[error(transparent)]
    Config(#[from] teamcomp_core::ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid timestamp '{0}': expected RFC 3339, e.g. 2021-12-24T12:00:00Z")]
    InvalidTimestamp(String),
    #[error("Invalid ID '{0}'")]
    InvalidId(String),
    #[error("Could not resolve a data directory; pass --db-path or set TEAMCOMP_DB_PATH")]
    NoDataDir,
}
