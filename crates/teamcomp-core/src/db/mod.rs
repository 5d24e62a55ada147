//! Database layer for teamcomp

mod attempt_repository;
mod competition_repository;
mod connection;
mod member_repository;
mod migrations;
mod snapshot_repository;

use std::str::FromStr;

use crate::error::{Error, Result};

pub use attempt_repository::{AttemptRepository, LibSqlAttemptRepository};
pub use competition_repository::{CompetitionRepository, LibSqlCompetitionRepository};
pub use connection::Database;
pub use member_repository::{LibSqlMemberRepository, MemberRepository};
pub use snapshot_repository::{LibSqlSnapshotRepository, SnapshotRepository};

/// Parse a stored identifier or enum column
fn parse_column<T: FromStr>(value: &str, column: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Database(format!("invalid {column} value '{value}'")))
}

/// Parse a nullable stored identifier column
fn parse_optional_column<T: FromStr>(value: Option<String>, column: &str) -> Result<Option<T>> {
    value
        .map(|value| parse_column(&value, column))
        .transpose()
}

fn nullable_text(value: Option<String>) -> libsql::Value {
    value.map_or(libsql::Value::Null, libsql::Value::Text)
}
