//! 登录尝试存储 trait 定义

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cuba_errors::AppResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 尝试记录所属的集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptKind {
    /// 按客户端 IP 统计
    Ip,
    /// 按目标邮箱统计
    Email,
}

impl AttemptKind {
    pub const ALL: [AttemptKind; 2] = [AttemptKind::Ip, AttemptKind::Email];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个键的失败尝试记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// IP 字面量或邮箱，集合内唯一
    pub key: String,
    /// 自上次重置以来的失败次数，至少为 1
    pub attempt_count: u32,
    pub first_attempt: DateTime<Utc>,
    /// 最近一次失败，滑动窗口以此为锚点
    pub last_attempt: DateTime<Utc>,
    /// 仅在硬锁定时为 true
    pub is_locked: bool,
    pub lockout_until: Option<DateTime<Utc>>,
    /// 最近一次施加锁定时的失败次数，同一计数只锁定一次
    #[serde(default)]
    pub lockout_attempt_count: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// 首次失败时创建记录
    pub fn first_failure(key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            attempt_count: 1,
            first_attempt: now,
            last_attempt: now,
            is_locked: false,
            lockout_until: None,
            lockout_attempt_count: None,
            updated_at: now,
        }
    }

    /// 最近一次失败是否仍在滑动窗口内
    pub fn is_within_window(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.last_attempt <= window
    }

    /// 是否存在尚未到期的锁定
    pub fn has_active_lockout(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }

    /// 是否残留已过期的锁定
    pub fn has_stale_lockout(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until <= now)
    }

    /// 两条记录是否为同一版本
    ///
    /// 每次写入都会刷新 `updated_at`，计数变化必然伴随 `attempt_count` 或 `last_attempt` 变化。
    pub fn same_version(&self, other: &AttemptRecord) -> bool {
        self.key == other.key
            && self.attempt_count == other.attempt_count
            && self.last_attempt == other.last_attempt
            && self.updated_at == other.updated_at
    }
}

/// 登录尝试存储 trait
///
/// 两个相互独立的集合（按 IP、按邮箱），键为分区键。
/// 记录不存在不是错误，`get` 返回 `Ok(None)`。
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// 读取记录
    async fn get(&self, kind: AttemptKind, key: &str) -> AppResult<Option<AttemptRecord>>;

    /// 按键插入或覆盖记录
    async fn upsert(&self, kind: AttemptKind, record: &AttemptRecord) -> AppResult<()>;

    /// 删除记录，记录不存在时为空操作
    async fn delete(&self, kind: AttemptKind, key: &str) -> AppResult<()>;

    /// 条件写入：当前记录仍与 `expected` 为同一版本时，写入 `replacement`
    /// （`None` 表示删除），返回是否生效
    ///
    /// 记录已被删除或已被其他写入修改时不做任何事，不会重新创建记录。
    /// 比较与写入必须是原子的。
    async fn replace_if_unchanged(
        &self,
        kind: AttemptKind,
        expected: &AttemptRecord,
        replacement: Option<&AttemptRecord>,
    ) -> AppResult<bool>;

    /// 清理 `last_attempt` 早于 `cutoff` 且在 `now` 时没有生效锁定的记录，返回删除数量
    async fn purge_stale(
        &self,
        kind: AttemptKind,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;
}
