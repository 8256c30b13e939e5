//! 面向用户的提示文案
//!
//! 只依赖检查结果本身。未拦截时不提示剩余次数，避免给攻击者反馈。

use crate::domain::RateLimitCheck;

/// 剩余分钟数达到该值时使用"已锁定"措辞
const LOCKED_PHRASE_MINUTES: i64 = 30;

/// 距较晚的锁定截止时间还剩多少分钟（向上取整，至少 1）
pub fn minutes_left(check: &RateLimitCheck) -> Option<i64> {
    let until = check.latest_lockout_until()?;
    let seconds = (until - check.checked_at).num_seconds().max(0);
    Some(((seconds + 59) / 60).max(1))
}

/// 拦截提示；未拦截时返回空串
pub fn format_rate_limit_message(check: &RateLimitCheck) -> String {
    if !check.is_blocked {
        return String::new();
    }

    let minutes = minutes_left(check).unwrap_or(1);
    if minutes >= LOCKED_PHRASE_MINUTES {
        format!(
            "Too many failed login attempts. This account has been locked for {} minutes. \
             Please try again later or reset your password.",
            minutes
        )
    } else {
        format!(
            "Too many failed login attempts. Login has been temporarily disabled. \
             Please try again in {} {}.",
            minutes,
            if minutes == 1 { "minute" } else { "minutes" }
        )
    }
}

/// 剩余尝试次数提示，取两个键中较小者
pub fn remaining_attempts_message(check: &RateLimitCheck) -> String {
    match check.remaining_attempts() {
        0 => "No login attempts remaining. Please try again later.".to_string(),
        1 => "1 login attempt remaining.".to_string(),
        n => format!("{} login attempts remaining.", n),
    }
}
