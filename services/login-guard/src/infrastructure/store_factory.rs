//! 按配置构造存储后端

use cuba_adapter_postgres::{PostgresAttemptStore, PostgresConfig, create_pool, ensure_schema};
use cuba_adapter_redis::{RedisAttemptStore, create_connection_manager};
use cuba_config::{StorageBackend, StorageConfig};
use cuba_errors::{AppError, AppResult};
use cuba_ports::AttemptStore;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::MemoryAttemptStore;

/// 构造配置的存储后端，Postgres 会先确保表结构存在
pub async fn build_store(config: &StorageConfig) -> AppResult<Arc<dyn AttemptStore>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory attempt store");
            Ok(Arc::new(MemoryAttemptStore::new()))
        }
        StorageBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .ok_or_else(|| AppError::validation("storage.database is not configured"))?;

            let pool = create_pool(
                &PostgresConfig::new(database.url.expose_secret().as_str())
                    .with_max_connections(database.max_connections),
            )
            .await?;
            ensure_schema(&pool).await?;

            info!("Using PostgreSQL attempt store");
            Ok(Arc::new(PostgresAttemptStore::new(pool)))
        }
        StorageBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .ok_or_else(|| AppError::validation("storage.redis is not configured"))?;

            let conn = create_connection_manager(redis.url.expose_secret()).await?;

            info!(key_prefix = %redis.key_prefix, "Using Redis attempt store");
            Ok(Arc::new(
                RedisAttemptStore::new(conn, redis.key_prefix.clone())
                    .with_ttl(Duration::from_secs(redis.ttl_secs)),
            ))
        }
    }
}
