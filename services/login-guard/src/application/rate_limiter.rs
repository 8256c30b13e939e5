//! 限流检查
//!
//! 分别评估 IP 与邮箱两个键，合并为一个判定。
//! 评估中发现的状态修正（施加新锁定、清除过期锁定、删除过期记录）在后台写入，
//! 不阻塞调用方；写入失败只记日志。
//!
//! 修正是条件写入：记录在评估之后被重置或计数，修正直接放弃，
//! 不会复活已删除的记录，也不会覆盖新的失败计数。

use chrono::{DateTime, Utc};
use cuba_ports::{AttemptKind, AttemptRecord, AttemptStore};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::domain::{Evaluation, RateLimitCheck, RecordAction, evaluate, normalize_email};
use crate::infrastructure::metrics;

/// 双键限流器
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn AttemptStore>,
    tasks: TaskTracker,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self {
            store,
            tasks: TaskTracker::new(),
        }
    }

    /// 检查当前时间下的限流状态
    pub async fn check(&self, ip: &str, email: &str) -> RateLimitCheck {
        self.check_at(ip, email, Utc::now()).await
    }

    /// 检查指定时间下的限流状态
    ///
    /// 存储故障时放行（`is_blocked = false`），错误只记日志。
    pub async fn check_at(&self, ip: &str, email: &str, now: DateTime<Utc>) -> RateLimitCheck {
        let email = normalize_email(email);

        let (ip_record, email_record) = tokio::join!(
            self.store.get(AttemptKind::Ip, ip),
            self.store.get(AttemptKind::Email, &email),
        );

        let (ip_record, email_record) = match (ip_record, email_record) {
            (Ok(ip_record), Ok(email_record)) => (ip_record, email_record),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, ip, "Rate limit check failed, allowing request");
                metrics::record_fail_open();
                return RateLimitCheck::fail_open(now);
            }
        };

        let ip_eval = evaluate(AttemptKind::Ip, ip_record.as_ref(), now);
        let email_eval = evaluate(AttemptKind::Email, email_record.as_ref(), now);

        self.apply(AttemptKind::Ip, ip_record, &ip_eval);
        self.apply(AttemptKind::Email, email_record, &email_eval);

        let check = RateLimitCheck::new(ip_eval.verdict, email_eval.verdict, now);
        metrics::record_check(check.is_blocked);

        debug!(
            ip,
            ip_tier = check.ip.tier.as_str(),
            email_tier = check.email.tier.as_str(),
            is_blocked = check.is_blocked,
            max_delay_ms = check.max_delay_ms,
            "Rate limit evaluated"
        );

        check
    }

    /// 等待所有后台修正写入完成
    pub async fn flush(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// 后台写入评估产生的修正，仅当记录仍是评估时的版本
    fn apply(&self, kind: AttemptKind, evaluated: Option<AttemptRecord>, evaluation: &Evaluation) {
        let replacement = match &evaluation.action {
            RecordAction::Keep => return,
            RecordAction::Delete => None,
            RecordAction::Save(record) => Some(record.clone()),
        };
        let Some(expected) = evaluated else {
            return;
        };

        // 只有新施加锁定时才会在受限判定下写回
        if let Some(record) = &replacement {
            if evaluation.verdict.is_limited {
                warn!(
                    %kind,
                    key = %record.key,
                    attempt_count = record.attempt_count,
                    tier = evaluation.verdict.tier.as_str(),
                    lockout_until = ?record.lockout_until,
                    "Lockout applied"
                );
                metrics::record_lockout(kind, evaluation.verdict.tier);
            }
        }

        let store = Arc::clone(&self.store);
        self.tasks.spawn(async move {
            match store
                .replace_if_unchanged(kind, &expected, replacement.as_ref())
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(%kind, key = %expected.key, "Record changed since evaluation, correction skipped");
                }
                Err(e) => {
                    error!(error = %e, %kind, key = %expected.key, "Failed to persist lockout state");
                    metrics::record_store_error("normalize", &e);
                }
            }
        });
    }
}
