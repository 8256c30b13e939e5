//! 失败尝试记录
//!
//! 读取、加一、写回，两个键并行且互不影响。读写之间没有原子性保证，
//! 并发失败可能少计一次。

use chrono::{DateTime, Utc};
use cuba_ports::{AttemptKind, AttemptStore};
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::{next_failure, normalize_email};
use crate::infrastructure::metrics;

#[derive(Clone)]
pub struct AttemptRecorder {
    store: Arc<dyn AttemptStore>,
}

impl AttemptRecorder {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self { store }
    }

    /// 记录一次失败登录
    pub async fn record(&self, ip: &str, email: &str) {
        self.record_at(ip, email, Utc::now()).await;
    }

    pub async fn record_at(&self, ip: &str, email: &str, now: DateTime<Utc>) {
        let email = normalize_email(email);
        tokio::join!(
            self.record_key(AttemptKind::Ip, ip, now),
            self.record_key(AttemptKind::Email, &email, now),
        );
    }

    async fn record_key(&self, kind: AttemptKind, key: &str, now: DateTime<Utc>) {
        let existing = match self.store.get(kind, key).await {
            Ok(existing) => existing,
            Err(e) => {
                // 读失败时不写，避免把真实计数覆盖回 1
                error!(error = %e, %kind, key, "Failed to read login attempts");
                metrics::record_store_error("record", &e);
                return;
            }
        };

        let record = next_failure(existing, key, now);
        if let Err(e) = self.store.upsert(kind, &record).await {
            error!(error = %e, %kind, key, "Failed to record login attempt");
            metrics::record_store_error("record", &e);
            return;
        }

        metrics::record_failed_attempt(kind);
        debug!(%kind, key, attempt_count = record.attempt_count, "Login attempt recorded");
    }
}
