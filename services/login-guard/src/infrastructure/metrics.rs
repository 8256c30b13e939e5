//! 登录防护指标
//!
//! 业务指标记录

use cuba_errors::AppError;
use cuba_ports::AttemptKind;
use metrics::counter;

use crate::domain::LockoutTier;

/// 记录一次限流检查
pub fn record_check(blocked: bool) {
    let labels = [("blocked", blocked.to_string())];
    counter!("login_guard_checks_total", &labels).increment(1);
}

/// 记录存储故障导致的放行
pub fn record_fail_open() {
    counter!("login_guard_fail_open_total").increment(1);
}

/// 记录新施加的锁定
pub fn record_lockout(kind: AttemptKind, tier: LockoutTier) {
    let labels = [
        ("kind", kind.as_str().to_string()),
        ("tier", tier.as_str().to_string()),
    ];
    counter!("login_guard_lockouts_total", &labels).increment(1);
}

/// 记录一次失败登录
pub fn record_failed_attempt(kind: AttemptKind) {
    let labels = [("kind", kind.as_str().to_string())];
    counter!("login_guard_failed_attempts_total", &labels).increment(1);
}

/// 记录一次成功登录后的重置
pub fn record_reset() {
    counter!("login_guard_resets_total").increment(1);
}

/// 记录被吞掉的存储错误，按操作与错误类别打标签
pub fn record_store_error(op: &'static str, error: &AppError) {
    let labels = [("op", op.to_string()), ("error", error.kind().to_string())];
    counter!("login_guard_store_errors_total", &labels).increment(1);
}
