//! 限流判定结果

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::lockout_policy::MAX_ATTEMPTS;

/// 锁定等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutTier {
    /// 无记录或窗口已过期
    None,
    /// 不拦截，但注入延迟
    Throttle,
    /// 临时禁用（1 或 5 分钟）
    SoftDisable,
    /// 硬锁定（30 分钟）
    HardLock,
}

impl LockoutTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Throttle => "throttle",
            Self::SoftDisable => "soft_disable",
            Self::HardLock => "hard_lock",
        }
    }

    /// 是否拦截本次登录
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::SoftDisable | Self::HardLock)
    }
}

/// 单个键（IP 或邮箱）的判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyVerdict {
    pub tier: LockoutTier,
    pub is_limited: bool,
    pub is_locked: bool,
    pub lockout_until: Option<DateTime<Utc>>,
    pub delay_ms: u64,
    pub remaining_attempts: u32,
    pub attempt_count: u32,
}

impl KeyVerdict {
    /// 没有任何失败记录
    pub fn clear() -> Self {
        Self {
            tier: LockoutTier::None,
            is_limited: false,
            is_locked: false,
            lockout_until: None,
            delay_ms: 0,
            remaining_attempts: MAX_ATTEMPTS,
            attempt_count: 0,
        }
    }
}

impl Default for KeyVerdict {
    fn default() -> Self {
        Self::clear()
    }
}

/// `RateLimiter::check` 的聚合结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitCheck {
    pub ip: KeyVerdict,
    pub email: KeyVerdict,
    /// 任一键受限即拦截
    pub is_blocked: bool,
    /// 两个键延迟的最大值，与是否拦截无关
    pub max_delay_ms: u64,
    pub checked_at: DateTime<Utc>,
    /// 存储故障时放行的结果
    pub degraded: bool,
}

impl RateLimitCheck {
    pub fn new(ip: KeyVerdict, email: KeyVerdict, checked_at: DateTime<Utc>) -> Self {
        Self {
            is_blocked: ip.is_limited || email.is_limited,
            max_delay_ms: ip.delay_ms.max(email.delay_ms),
            ip,
            email,
            checked_at,
            degraded: false,
        }
    }

    /// 存储不可用时的放行结果
    pub fn fail_open(checked_at: DateTime<Utc>) -> Self {
        Self {
            degraded: true,
            ..Self::new(KeyVerdict::clear(), KeyVerdict::clear(), checked_at)
        }
    }

    /// 两个锁定截止时间中较晚的一个
    pub fn latest_lockout_until(&self) -> Option<DateTime<Utc>> {
        let limited = |v: &KeyVerdict| v.is_limited.then_some(v.lockout_until).flatten();
        match (limited(&self.ip), limited(&self.email)) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// 两个剩余次数中较小的一个
    pub fn remaining_attempts(&self) -> u32 {
        self.ip.remaining_attempts.min(self.email.remaining_attempts)
    }
}
