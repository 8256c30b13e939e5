//! 进程内尝试记录存储
//!
//! 开发环境的默认后端，也是测试用的确定性替身。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cuba_errors::{AppError, AppResult};
use cuba_ports::{AttemptKind, AttemptRecord, AttemptStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

type Collection = Arc<RwLock<HashMap<String, AttemptRecord>>>;

/// 内存存储，两个集合各一把读写锁
#[derive(Clone, Default)]
pub struct MemoryAttemptStore {
    by_ip: Collection,
    by_email: Collection,
    ip_unavailable: Arc<AtomicBool>,
    email_unavailable: Arc<AtomicBool>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟存储故障，之后所有操作返回 `AppError::Database`
    pub fn set_unavailable(&self, unavailable: bool) {
        for kind in AttemptKind::ALL {
            self.set_kind_unavailable(kind, unavailable);
        }
    }

    /// 只让一个集合故障
    pub fn set_kind_unavailable(&self, kind: AttemptKind, unavailable: bool) {
        self.unavailable_flag(kind).store(unavailable, Ordering::SeqCst);
    }

    /// 集合中的记录数
    pub async fn len(&self, kind: AttemptKind) -> usize {
        self.collection(kind).read().await.len()
    }

    pub async fn is_empty(&self, kind: AttemptKind) -> bool {
        self.len(kind).await == 0
    }

    fn collection(&self, kind: AttemptKind) -> &Collection {
        match kind {
            AttemptKind::Ip => &self.by_ip,
            AttemptKind::Email => &self.by_email,
        }
    }

    fn unavailable_flag(&self, kind: AttemptKind) -> &AtomicBool {
        match kind {
            AttemptKind::Ip => &self.ip_unavailable,
            AttemptKind::Email => &self.email_unavailable,
        }
    }

    fn ensure_available(&self, kind: AttemptKind) -> AppResult<()> {
        if self.unavailable_flag(kind).load(Ordering::SeqCst) {
            return Err(AppError::database(format!("memory {} store marked unavailable", kind)));
        }
        Ok(())
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn get(&self, kind: AttemptKind, key: &str) -> AppResult<Option<AttemptRecord>> {
        self.ensure_available(kind)?;
        Ok(self.collection(kind).read().await.get(key).cloned())
    }

    async fn upsert(&self, kind: AttemptKind, record: &AttemptRecord) -> AppResult<()> {
        self.ensure_available(kind)?;
        self.collection(kind)
            .write()
            .await
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, kind: AttemptKind, key: &str) -> AppResult<()> {
        self.ensure_available(kind)?;
        self.collection(kind).write().await.remove(key);
        Ok(())
    }

    async fn replace_if_unchanged(
        &self,
        kind: AttemptKind,
        expected: &AttemptRecord,
        replacement: Option<&AttemptRecord>,
    ) -> AppResult<bool> {
        self.ensure_available(kind)?;
        let mut records = self.collection(kind).write().await;

        match records.get(&expected.key) {
            Some(current) if current.same_version(expected) => {}
            _ => return Ok(false),
        }

        match replacement {
            Some(record) => {
                records.insert(expected.key.clone(), record.clone());
            }
            None => {
                records.remove(&expected.key);
            }
        }
        Ok(true)
    }

    async fn purge_stale(
        &self,
        kind: AttemptKind,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.ensure_available(kind)?;
        let mut records = self.collection(kind).write().await;
        let before = records.len();
        records.retain(|_, record| record.last_attempt >= cutoff || record.has_active_lockout(now));
        Ok((before - records.len()) as u64)
    }
}
