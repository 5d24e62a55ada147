//! Member registry and member record repository

use crate::error::{Error, Result};
use crate::models::{AttemptId, Member, MemberId, MemberRecord, MemberStatus};
use crate::nitrotype::TeamMember;
use libsql::Connection;

use super::parse_column;

const MEMBER_COLUMNS: &str =
    "id, reference_id, username, display_name, membership, status, created_at, updated_at";

const RECORD_COLUMNS: &str = "attempt_id, member_id, played, typed, errs, secs, from_at, to_at";

/// Trait for member storage operations (async)
#[allow(async_fn_in_trait)]
pub trait MemberRepository {
    /// Insert or refresh a member from a remote observation
    ///
    /// New members start as `NEW`; the status of known members is untouched.
    async fn upsert(&self, remote: &TeamMember, now: i64) -> Result<Member>;

    /// Get a member by remote user id
    async fn get_by_reference(&self, reference_id: i64) -> Result<Option<Member>>;

    /// List all members ordered by username
    async fn list(&self) -> Result<Vec<Member>>;

    /// Persist one member record
    async fn insert_record(&self, record: &MemberRecord) -> Result<()>;

    /// Records written by one attempt
    async fn records_for_attempt(&self, attempt_id: &AttemptId) -> Result<Vec<MemberRecord>>;

    /// Records whose window starts inside `[from_at, to_at)`
    async fn records_starting_between(&self, from_at: i64, to_at: i64)
        -> Result<Vec<MemberRecord>>;

    /// Promote `NEW` members that have a record for the attempt to `ACTIVE`
    async fn promote_recorded(&self, attempt_id: &AttemptId, now: i64) -> Result<u64>;

    /// Mark the given remote user ids `DISQUALIFIED`, skipping ones already disqualified
    async fn disqualify(&self, reference_ids: &[i64], now: i64) -> Result<u64>;
}

/// libSQL implementation of `MemberRepository`
pub struct LibSqlMemberRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlMemberRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_member(row: &libsql::Row) -> Result<Member> {
        let id: String = row.get(0)?;
        let membership: String = row.get(4)?;
        let status: String = row.get(5)?;
        Ok(Member {
            id: parse_column(&id, "members.id")?,
            reference_id: row.get(1)?,
            username: row.get(2)?,
            display_name: row.get(3)?,
            membership: parse_column(&membership, "members.membership")?,
            status: parse_column(&status, "members.status")?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn parse_record(row: &libsql::Row) -> Result<MemberRecord> {
        let attempt_id: String = row.get(0)?;
        let member_id: String = row.get(1)?;
        Ok(MemberRecord {
            attempt_id: parse_column(&attempt_id, "member_records.attempt_id")?,
            member_id: parse_column(&member_id, "member_records.member_id")?,
            played: row.get(2)?,
            typed: row.get(3)?,
            errs: row.get(4)?,
            secs: row.get(5)?,
            from_at: row.get(6)?,
            to_at: row.get(7)?,
        })
    }

    async fn collect_records(mut rows: libsql::Rows) -> Result<Vec<MemberRecord>> {
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }
}

impl MemberRepository for LibSqlMemberRepository<'_> {
    async fn upsert(&self, remote: &TeamMember, now: i64) -> Result<Member> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "INSERT INTO members
                        (id, reference_id, username, display_name, membership, status, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(reference_id) DO UPDATE SET
                        username = excluded.username,
                        display_name = excluded.display_name,
                        membership = excluded.membership,
                        updated_at = excluded.updated_at
                     RETURNING {MEMBER_COLUMNS}"
                ),
                libsql::params![
                    MemberId::new().as_str(),
                    remote.user_id,
                    remote.username.as_str(),
                    remote.display_name_or_username(),
                    remote.membership_type().as_str(),
                    MemberStatus::New.as_str(),
                    now,
                    now
                ],
            )
            .await?;

        let row = rows.next().await?.ok_or_else(|| {
            Error::Database(format!("upsert of member {} returned no row", remote.user_id))
        })?;
        Self::parse_member(&row)
    }

    async fn get_by_reference(&self, reference_id: i64) -> Result<Option<Member>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE reference_id = ?"),
                [reference_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_member(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Member>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {MEMBER_COLUMNS} FROM members ORDER BY username, reference_id"),
                (),
            )
            .await?;
        let mut members = Vec::new();
        while let Some(row) = rows.next().await? {
            members.push(Self::parse_member(&row)?);
        }
        Ok(members)
    }

    async fn insert_record(&self, record: &MemberRecord) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO member_records ({RECORD_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"),
                libsql::params![
                    record.attempt_id.as_str(),
                    record.member_id.as_str(),
                    record.played,
                    record.typed,
                    record.errs,
                    record.secs,
                    record.from_at,
                    record.to_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn records_for_attempt(&self, attempt_id: &AttemptId) -> Result<Vec<MemberRecord>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM member_records WHERE attempt_id = ?"),
                [attempt_id.as_str()],
            )
            .await?;
        Self::collect_records(rows).await
    }

    async fn records_starting_between(
        &self,
        from_at: i64,
        to_at: i64,
    ) -> Result<Vec<MemberRecord>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM member_records
                     WHERE from_at >= ? AND from_at < ?
                     ORDER BY from_at"
                ),
                [from_at, to_at],
            )
            .await?;
        Self::collect_records(rows).await
    }

    async fn promote_recorded(&self, attempt_id: &AttemptId, now: i64) -> Result<u64> {
        let updated = self
            .conn
            .execute(
                "UPDATE members SET status = 'ACTIVE', updated_at = ?
                 WHERE status = 'NEW'
                   AND id IN (SELECT member_id FROM member_records WHERE attempt_id = ?)",
                libsql::params![now, attempt_id.as_str()],
            )
            .await?;
        Ok(updated)
    }

    async fn disqualify(&self, reference_ids: &[i64], now: i64) -> Result<u64> {
        let mut updated = 0;
        for reference_id in reference_ids {
            updated += self
                .conn
                .execute(
                    "UPDATE members SET status = 'DISQUALIFIED', updated_at = ?
                     WHERE reference_id = ? AND status != 'DISQUALIFIED'",
                    [now, *reference_id],
                )
                .await?;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AttemptRepository, Database, LibSqlAttemptRepository};
    use crate::models::{Classification, MembershipType, SyncAttempt};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn remote(user_id: i64, username: &str) -> TeamMember {
        TeamMember {
            user_id,
            username: username.to_string(),
            membership: "basic".to_string(),
            ..TeamMember::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_inserts_then_refreshes_profile() {
        let db = setup().await;
        let repo = LibSqlMemberRepository::new(db.connection());

        let created = repo.upsert(&remote(1, "alpha"), 10).await.unwrap();
        assert_eq!(created.status, MemberStatus::New);
        assert_eq!(created.display_name, "alpha");
        assert_eq!(created.membership, MembershipType::Basic);

        let mut renamed = remote(1, "alpha2");
        renamed.display_name = "Alpha".to_string();
        renamed.membership = "gold".to_string();
        let updated = repo.upsert(&renamed, 20).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.username, "alpha2");
        assert_eq!(updated.display_name, "Alpha");
        assert_eq!(updated.membership, MembershipType::Gold);
        assert_eq!(updated.created_at, 10);
        assert_eq!(updated.updated_at, 20);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_promote_and_disqualify() {
        let db = setup().await;
        let repo = LibSqlMemberRepository::new(db.connection());
        let attempts = LibSqlAttemptRepository::new(db.connection());

        let attempt = SyncAttempt::next(None, None, Classification::New, "New log download", 5);
        attempts.insert(&attempt).await.unwrap();

        let alpha = repo.upsert(&remote(1, "alpha"), 10).await.unwrap();
        let bravo = repo.upsert(&remote(2, "bravo"), 10).await.unwrap();

        repo.insert_record(&MemberRecord {
            attempt_id: attempt.id,
            member_id: alpha.id,
            played: 3,
            typed: 300,
            errs: 3,
            secs: 60,
            from_at: 0,
            to_at: 5,
        })
        .await
        .unwrap();

        assert_eq!(repo.promote_recorded(&attempt.id, 20).await.unwrap(), 1);
        assert_eq!(repo.promote_recorded(&attempt.id, 21).await.unwrap(), 0);

        let alpha = repo.get_by_reference(1).await.unwrap().unwrap();
        assert_eq!(alpha.status, MemberStatus::Active);
        let bravo_now = repo.get_by_reference(bravo.reference_id).await.unwrap().unwrap();
        assert_eq!(bravo_now.status, MemberStatus::New);

        assert_eq!(repo.disqualify(&[1, 2], 30).await.unwrap(), 2);
        assert_eq!(repo.disqualify(&[1, 2], 31).await.unwrap(), 0);

        // Upserting a disqualified member keeps it disqualified
        let again = repo.upsert(&remote(1, "alpha"), 40).await.unwrap();
        assert_eq!(again.status, MemberStatus::Disqualified);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_records_by_window() {
        let db = setup().await;
        let repo = LibSqlMemberRepository::new(db.connection());
        let attempts = LibSqlAttemptRepository::new(db.connection());

        let first = SyncAttempt::next(None, None, Classification::New, "New log download", 100);
        let second =
            SyncAttempt::next(Some(&first), None, Classification::New, "New log download", 200);
        attempts.insert(&first).await.unwrap();
        attempts.insert(&second).await.unwrap();
        let alpha = repo.upsert(&remote(1, "alpha"), 10).await.unwrap();

        for (attempt, from_at, to_at) in [(&first, 50, 100), (&second, 100, 200)] {
            repo.insert_record(&MemberRecord {
                attempt_id: attempt.id,
                member_id: alpha.id,
                played: 1,
                typed: 100,
                errs: 1,
                secs: 20,
                from_at,
                to_at,
            })
            .await
            .unwrap();
        }

        let window = repo.records_starting_between(100, 200).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].attempt_id, second.id);
        assert_eq!(repo.records_for_attempt(&first.id).await.unwrap().len(), 1);
    }
}
