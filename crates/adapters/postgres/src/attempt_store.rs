//! PostgreSQL 登录尝试存储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cuba_errors::{AppError, AppResult};
use cuba_ports::{AttemptKind, AttemptRecord, AttemptStore};
use sqlx::PgPool;

use crate::schema::table_name;

/// 两张表（按 IP / 按邮箱）上的尝试记录存储
#[derive(Clone)]
pub struct PostgresAttemptStore {
    pool: PgPool,
}

impl PostgresAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    key: String,
    attempt_count: i32,
    first_attempt: DateTime<Utc>,
    last_attempt: DateTime<Utc>,
    is_locked: bool,
    lockout_until: Option<DateTime<Utc>>,
    lockout_attempt_count: Option<i32>,
    updated_at: DateTime<Utc>,
}

impl From<AttemptRow> for AttemptRecord {
    fn from(row: AttemptRow) -> Self {
        Self {
            key: row.key,
            attempt_count: row.attempt_count.max(1) as u32,
            first_attempt: row.first_attempt,
            last_attempt: row.last_attempt,
            is_locked: row.is_locked,
            lockout_until: row.lockout_until,
            lockout_attempt_count: row.lockout_attempt_count.map(|count| count.max(0) as u32),
            updated_at: row.updated_at,
        }
    }
}

fn to_db_count(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

#[async_trait]
impl AttemptStore for PostgresAttemptStore {
    async fn get(&self, kind: AttemptKind, key: &str) -> AppResult<Option<AttemptRecord>> {
        let sql = format!(
            "SELECT key, attempt_count, first_attempt, last_attempt, is_locked, lockout_until, \
             lockout_attempt_count, updated_at \
             FROM {} WHERE key = $1",
            table_name(kind)
        );

        sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Into::into))
            .map_err(|e| AppError::database(format!("Failed to load {} attempts: {}", kind, e)))
    }

    async fn upsert(&self, kind: AttemptKind, record: &AttemptRecord) -> AppResult<()> {
        let attempt_count = to_db_count(record.attempt_count);
        let lockout_attempt_count = record.lockout_attempt_count.map(to_db_count);
        let sql = format!(
            r#"
            INSERT INTO {} (key, attempt_count, first_attempt, last_attempt, is_locked, lockout_until,
                            lockout_attempt_count, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (key) DO UPDATE SET
                attempt_count = EXCLUDED.attempt_count,
                first_attempt = EXCLUDED.first_attempt,
                last_attempt = EXCLUDED.last_attempt,
                is_locked = EXCLUDED.is_locked,
                lockout_until = EXCLUDED.lockout_until,
                lockout_attempt_count = EXCLUDED.lockout_attempt_count,
                updated_at = EXCLUDED.updated_at
            "#,
            table_name(kind)
        );

        sqlx::query(&sql)
            .bind(&record.key)
            .bind(attempt_count)
            .bind(record.first_attempt)
            .bind(record.last_attempt)
            .bind(record.is_locked)
            .bind(record.lockout_until)
            .bind(lockout_attempt_count)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to save {} attempts: {}", kind, e)))?;

        Ok(())
    }

    async fn delete(&self, kind: AttemptKind, key: &str) -> AppResult<()> {
        let sql = format!("DELETE FROM {} WHERE key = $1", table_name(kind));

        sqlx::query(&sql)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::database(format!("Failed to delete {} attempts: {}", kind, e))
            })?;

        Ok(())
    }

    async fn replace_if_unchanged(
        &self,
        kind: AttemptKind,
        expected: &AttemptRecord,
        replacement: Option<&AttemptRecord>,
    ) -> AppResult<bool> {
        let expected_count = to_db_count(expected.attempt_count);

        let result = match replacement {
            None => {
                let sql = format!(
                    "DELETE FROM {} WHERE key = $1 AND attempt_count = $2 \
                     AND last_attempt = $3 AND updated_at = $4",
                    table_name(kind)
                );
                sqlx::query(&sql)
                    .bind(&expected.key)
                    .bind(expected_count)
                    .bind(expected.last_attempt)
                    .bind(expected.updated_at)
                    .execute(&self.pool)
                    .await
            }
            Some(record) => {
                let sql = format!(
                    r#"
                    UPDATE {} SET
                        attempt_count = $5,
                        first_attempt = $6,
                        last_attempt = $7,
                        is_locked = $8,
                        lockout_until = $9,
                        lockout_attempt_count = $10,
                        updated_at = $11
                    WHERE key = $1 AND attempt_count = $2 AND last_attempt = $3 AND updated_at = $4
                    "#,
                    table_name(kind)
                );
                sqlx::query(&sql)
                    .bind(&expected.key)
                    .bind(expected_count)
                    .bind(expected.last_attempt)
                    .bind(expected.updated_at)
                    .bind(to_db_count(record.attempt_count))
                    .bind(record.first_attempt)
                    .bind(record.last_attempt)
                    .bind(record.is_locked)
                    .bind(record.lockout_until)
                    .bind(record.lockout_attempt_count.map(to_db_count))
                    .bind(record.updated_at)
                    .execute(&self.pool)
                    .await
            }
        };

        let result = result.map_err(|e| {
            AppError::database(format!("Failed to update {} attempts: {}", kind, e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_stale(
        &self,
        kind: AttemptKind,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE last_attempt < $1 AND (lockout_until IS NULL OR lockout_until <= $2)",
            table_name(kind)
        );

        let result = sqlx::query(&sql)
            .bind(cutoff)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::database(format!("Failed to purge stale {} attempts: {}", kind, e))
            })?;

        Ok(result.rows_affected())
    }
}
