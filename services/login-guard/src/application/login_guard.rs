//! 登录防护门面
//!
//! 登录处理器的调用顺序：
//!
//! 1. `check_rate_limit`，被拦截时直接返回 `format_rate_limit_message`
//! 2. `throttle` 注入延迟后校验凭据
//! 3. 失败调用 `record_failed_attempt`，成功调用 `reset_login_attempts`

use chrono::{DateTime, Utc};
use cuba_ports::AttemptStore;
use http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;

use super::{AttemptRecorder, AttemptResetter, RateLimiter, messages};
use crate::domain::{RateLimitCheck, client_ip};

#[derive(Clone)]
pub struct LoginGuard {
    limiter: RateLimiter,
    recorder: AttemptRecorder,
    resetter: AttemptResetter,
}

impl LoginGuard {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self {
            limiter: RateLimiter::new(Arc::clone(&store)),
            recorder: AttemptRecorder::new(Arc::clone(&store)),
            resetter: AttemptResetter::new(store),
        }
    }

    pub fn extract_client_ip(headers: &HeaderMap) -> String {
        client_ip::extract_client_ip(headers)
    }

    pub async fn check_rate_limit(&self, ip: &str, email: &str) -> RateLimitCheck {
        self.limiter.check(ip, email).await
    }

    pub async fn check_rate_limit_at(
        &self,
        ip: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> RateLimitCheck {
        self.limiter.check_at(ip, email, now).await
    }

    pub async fn record_failed_attempt(&self, ip: &str, email: &str) {
        self.recorder.record(ip, email).await;
    }

    pub async fn record_failed_attempt_at(&self, ip: &str, email: &str, now: DateTime<Utc>) {
        self.recorder.record_at(ip, email, now).await;
    }

    pub async fn reset_login_attempts(&self, ip: &str, email: &str) {
        self.resetter.reset(ip, email).await;
    }

    pub fn format_rate_limit_message(check: &RateLimitCheck) -> String {
        messages::format_rate_limit_message(check)
    }

    pub fn remaining_attempts_message(check: &RateLimitCheck) -> String {
        messages::remaining_attempts_message(check)
    }

    /// 按 `max_delay_ms` 注入延迟
    pub async fn throttle(&self, check: &RateLimitCheck) {
        if check.max_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(check.max_delay_ms)).await;
        }
    }

    /// 等待检查产生的后台写入完成
    pub async fn flush(&self) {
        self.limiter.flush().await;
    }
}
