//! Tally recorder: the append-only session log and the score fold.

use sqlx::Row;

use super::groups::{group_from_row, write_members};
use super::repository::timestamp;
use super::Repository;
use crate::errors::AppError;
use crate::models::{MemberStats, SaveTallyRequest, TallyMode, TallyRecord, ZikrLabel};

/// Default number of records returned by the history query.
pub const HISTORY_LIMIT: i64 = 50;

const MAX_TALLY_ATTEMPTS: u32 = 4;

impl Repository {
    /// Append a tally record and credit both the member's group score and
    /// the user's cumulative score, all in one transaction.
    ///
    /// Fails with `NotFound` and writes nothing when the group, the active
    /// member entry or the user is missing, and with `Validation` when either
    /// score would overflow.
    pub async fn record_tally(&self, request: &SaveTallyRequest) -> Result<TallyRecord, AppError> {
        for attempt in 1..=MAX_TALLY_ATTEMPTS {
            let mut tx = self.pool.begin().await?;

            // Writing first takes the database write lock before the group is read.
            // The score bound keeps SQLite from turning an overflowing sum into REAL.
            let credited =
                sqlx::query("UPDATE users SET score = score + ? WHERE id = ? AND score <= ?")
                    .bind(request.count)
                    .bind(&request.user_id)
                    .bind(i64::MAX - request.count)
                    .execute(&mut *tx)
                    .await?;
            if credited.rows_affected() == 0 {
                let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?")
                    .bind(&request.user_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .is_some();
                return Err(if exists {
                    AppError::Validation("Score limit reached".to_string())
                } else {
                    AppError::NotFound("User not found".to_string())
                });
            }

            let row = sqlx::query(
                "SELECT id, name, invitation_key, admin_id, members, created_at, updated_at, version FROM tally_groups WHERE id = ?",
            )
            .bind(&request.group_id)
            .fetch_optional(&mut *tx)
            .await?;
            let mut group = row
                .as_ref()
                .map(group_from_row)
                .transpose()?
                .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

            group.credit(&request.user_id, request.count)?;

            if !write_members(&mut *tx, &mut group).await? {
                tx.rollback().await?;
                tracing::debug!(group_id = %request.group_id, attempt, "Tally lost a write race, retrying");
                continue;
            }

            let record = TallyRecord {
                id: uuid::Uuid::new_v4().to_string(),
                group_id: request.group_id.clone(),
                user_id: request.user_id.clone(),
                user_name: request.user_name.clone(),
                zikr_label: request.zikr_label,
                count: request.count,
                mode: request.mode,
                target: request.target,
                duration: request.duration,
                created_at: timestamp(),
            };

            sqlx::query(
                "INSERT INTO tallies (id, group_id, user_id, user_name, zikr_label, count, mode, target, duration, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.id)
            .bind(&record.group_id)
            .bind(&record.user_id)
            .bind(&record.user_name)
            .bind(record.zikr_label.as_str())
            .bind(record.count)
            .bind(record.mode.as_str())
            .bind(record.target)
            .bind(record.duration)
            .bind(&record.created_at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            return Ok(record);
        }

        Err(AppError::Conflict(
            "The group was modified concurrently, please retry".to_string(),
        ))
    }

    /// Most recent records for a group, newest first.
    pub async fn group_history(
        &self,
        group_id: &str,
        limit: i64,
    ) -> Result<Vec<TallyRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, group_id, user_id, user_name, zikr_label, count, mode, target, duration, created_at FROM tallies WHERE group_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tally_from_row).collect())
    }

    /// Per-user totals over the whole log for a group, highest total first.
    pub async fn group_stats(&self, group_id: &str) -> Result<Vec<MemberStats>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.user_id,
                      (SELECT f.user_name FROM tallies f
                        WHERE f.group_id = t.group_id AND f.user_id = t.user_id
                        ORDER BY f.rowid LIMIT 1) AS user_name,
                      SUM(t.count) AS total_count,
                      COUNT(*) AS sessions
               FROM tallies t
               WHERE t.group_id = ?
               GROUP BY t.user_id
               ORDER BY total_count DESC, t.user_id"#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| MemberStats {
                user_id: row.get("user_id"),
                user_name: row.get("user_name"),
                total_count: row.get("total_count"),
                sessions: row.get("sessions"),
            })
            .collect())
    }

    /// A single record by id, whether or not its group still exists.
    pub async fn get_tally(&self, id: &str) -> Result<Option<TallyRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, group_id, user_id, user_name, zikr_label, count, mode, target, duration, created_at FROM tallies WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(tally_from_row))
    }
}

fn tally_from_row(row: &sqlx::sqlite::SqliteRow) -> TallyRecord {
    let label: String = row.get("zikr_label");
    let mode: String = row.get("mode");
    TallyRecord {
        id: row.get("id"),
        group_id: row.get("group_id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        zikr_label: ZikrLabel::from_str(&label).unwrap_or_default(),
        count: row.get("count"),
        mode: TallyMode::from_str(&mode).unwrap_or(TallyMode::Unlimited),
        target: row.get("target"),
        duration: row.get("duration"),
        created_at: row.get("created_at"),
    }
}
