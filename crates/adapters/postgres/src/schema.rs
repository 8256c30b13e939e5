//! 登录尝试表结构

use cuba_errors::{AppError, AppResult};
use cuba_ports::AttemptKind;
use sqlx::PgPool;
use tracing::info;

/// 每种尝试记录对应的表名
pub fn table_name(kind: AttemptKind) -> &'static str {
    match kind {
        AttemptKind::Ip => "login_attempts_ip",
        AttemptKind::Email => "login_attempts_email",
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            key TEXT PRIMARY KEY,
            attempt_count INTEGER NOT NULL CHECK (attempt_count >= 1),
            first_attempt TIMESTAMPTZ NOT NULL,
            last_attempt TIMESTAMPTZ NOT NULL,
            is_locked BOOLEAN NOT NULL DEFAULT FALSE,
            lockout_until TIMESTAMPTZ NULL,
            lockout_attempt_count INTEGER NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    )
}

fn create_index_sql(table: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS idx_{table}_last_attempt ON {table} (last_attempt)")
}

/// 幂等地创建两张尝试表及索引
pub async fn ensure_schema(pool: &PgPool) -> AppResult<()> {
    for kind in AttemptKind::ALL {
        let table = table_name(kind);

        sqlx::query(&create_table_sql(table))
            .execute(pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create {}: {}", table, e)))?;

        sqlx::query(&create_index_sql(table))
            .execute(pool)
            .await
            .map_err(|e| {
                AppError::database(format!("Failed to create index on {}: {}", table, e))
            })?;
    }

    info!("Login attempt schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert_eq!(table_name(AttemptKind::Ip), "login_attempts_ip");
        assert_eq!(table_name(AttemptKind::Email), "login_attempts_email");
    }

    #[test]
    fn test_schema_sql() {
        let sql = create_table_sql("login_attempts_ip");
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS login_attempts_ip"));
        assert!(sql.contains("lockout_until TIMESTAMPTZ NULL"));

        let index = create_index_sql("login_attempts_email");
        assert!(index.contains("idx_login_attempts_email_last_attempt"));
    }
}
