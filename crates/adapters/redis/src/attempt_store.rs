//! Redis 登录尝试存储实现
//!
//! 每条记录序列化为 JSON，通过 `SET EX` 写入，过期交给 Redis 处理

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cuba_errors::{AppError, AppResult};
use cuba_ports::{AttemptKind, AttemptRecord, AttemptStore};
use redis::{AsyncCommands, Script};
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::debug;

/// 默认过期时间：15 分钟窗口 + 30 分钟硬锁定
pub const DEFAULT_RECORD_TTL: Duration = Duration::from_secs(45 * 60);

/// 版本一致时写入或删除，版本字段与 `AttemptRecord::same_version` 相同
///
/// KEYS[1] 记录键；ARGV: attempt_count, last_attempt, updated_at, 新记录 JSON（空串表示删除）, TTL 秒
const REPLACE_IF_UNCHANGED_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
    return 0
end

local current = cjson.decode(raw)
if tostring(current.attempt_count) ~= ARGV[1]
    or current.last_attempt ~= ARGV[2]
    or current.updated_at ~= ARGV[3] then
    return 0
end

if ARGV[4] == '' then
    redis.call('DEL', KEYS[1])
else
    redis.call('SET', KEYS[1], ARGV[4], 'EX', tonumber(ARGV[5]))
end
return 1
"#;

/// Redis 尝试记录存储
#[derive(Clone)]
pub struct RedisAttemptStore {
    conn: ConnectionManager,
    key_prefix: String,
    ttl: Duration,
}

impl RedisAttemptStore {
    pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            ttl: DEFAULT_RECORD_TTL,
        }
    }

    /// 设置记录过期时间，必须覆盖滑动窗口与最长锁定
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn redis_key(&self, kind: AttemptKind, key: &str) -> String {
        record_key(&self.key_prefix, kind, key)
    }
}

/// `{prefix}:login_attempts:{kind}:{key}`
pub fn record_key(prefix: &str, kind: AttemptKind, key: &str) -> String {
    if prefix.is_empty() {
        format!("login_attempts:{}:{}", kind, key)
    } else {
        format!("{}:login_attempts:{}:{}", prefix, kind, key)
    }
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn get(&self, kind: AttemptKind, key: &str) -> AppResult<Option<AttemptRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(self.redis_key(kind, key))
            .await
            .map_err(|e| AppError::external_service(format!("Redis get failed: {}", e)))?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, kind: AttemptKind, record: &AttemptRecord) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(record)?;

        conn.set_ex::<_, _, ()>(self.redis_key(kind, &record.key), json, self.ttl.as_secs())
            .await
            .map_err(|e| AppError::external_service(format!("Redis set failed: {}", e)))
    }

    async fn delete(&self, kind: AttemptKind, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.redis_key(kind, key))
            .await
            .map_err(|e| AppError::external_service(format!("Redis delete failed: {}", e)))
    }

    async fn replace_if_unchanged(
        &self,
        kind: AttemptKind,
        expected: &AttemptRecord,
        replacement: Option<&AttemptRecord>,
    ) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let replacement = match replacement {
            Some(record) => serde_json::to_string(record)?,
            None => String::new(),
        };
        let (last_attempt, updated_at) = version_stamps(expected)?;

        let script = Script::new(REPLACE_IF_UNCHANGED_SCRIPT);
        let applied: i64 = script
            .key(self.redis_key(kind, &expected.key))
            .arg(expected.attempt_count)
            .arg(last_attempt)
            .arg(updated_at)
            .arg(replacement)
            .arg(self.ttl.as_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::external_service(format!("Redis conditional update failed: {}", e)))?;

        Ok(applied == 1)
    }

    async fn purge_stale(
        &self,
        kind: AttemptKind,
        _cutoff: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) -> AppResult<u64> {
        debug!(%kind, "Redis expires attempt records natively, nothing to purge");
        Ok(0)
    }
}

/// 版本时间戳按存储时的 JSON 形式编码，脚本内做字符串比较
fn version_stamps(record: &AttemptRecord) -> AppResult<(String, String)> {
    let encode = |at: &DateTime<Utc>| -> AppResult<String> {
        Ok(match serde_json::to_value(at)? {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
    };
    Ok((encode(&record.last_attempt)?, encode(&record.updated_at)?))
}
