//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Apply a list of statements atomically
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn
        .execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: snapshots and the request log
async fn migrate_v1(conn: &Connection) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY,
            hash TEXT NOT NULL UNIQUE,
            payload TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS sync_attempts (
            id TEXT PRIMARY KEY,
            prev_id TEXT REFERENCES sync_attempts(id),
            snapshot_id TEXT REFERENCES snapshots(id),
            classification TEXT NOT NULL CHECK (classification IN ('NEW', 'CACHE', 'ERROR')),
            description TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            deleted_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_attempts_created ON sync_attempts(created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_sync_attempts_prev ON sync_attempts(prev_id)",
    ];

    apply(conn, 1, &statements).await
}

/// Migration to version 2: members, member records and competitions
async fn migrate_v2(conn: &Connection) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            reference_id INTEGER NOT NULL UNIQUE,
            username TEXT NOT NULL,
            display_name TEXT NOT NULL,
            membership TEXT NOT NULL CHECK (membership IN ('BASIC', 'GOLD')),
            status TEXT NOT NULL CHECK (status IN ('NEW', 'ACTIVE', 'DISQUALIFIED')),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS member_records (
            attempt_id TEXT NOT NULL REFERENCES sync_attempts(id),
            member_id TEXT NOT NULL REFERENCES members(id),
            played INTEGER NOT NULL CHECK (played > 0),
            typed INTEGER NOT NULL,
            errs INTEGER NOT NULL,
            secs INTEGER NOT NULL,
            from_at INTEGER NOT NULL,
            to_at INTEGER NOT NULL,
            PRIMARY KEY (attempt_id, member_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_member_records_from ON member_records(from_at)",
        "CREATE TABLE IF NOT EXISTS competitions (
            id TEXT PRIMARY KEY,
            multiplier INTEGER NOT NULL,
            grind_rewards TEXT NOT NULL,
            point_rewards TEXT NOT NULL,
            speed_rewards TEXT NOT NULL,
            accuracy_rewards TEXT NOT NULL,
            from_at INTEGER NOT NULL,
            to_at INTEGER NOT NULL CHECK (to_at > from_at),
            status TEXT NOT NULL CHECK (status IN ('DRAFT', 'STARTED', 'FINISHED', 'FAILED')),
            result_attempt_id TEXT REFERENCES sync_attempts(id),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_competitions_window ON competitions(from_at, to_at)",
        // At most one competition may be running
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_competitions_single_started
            ON competitions(status) WHERE status = 'STARTED'",
    ];

    apply(conn, CURRENT_VERSION, &statements).await
}
