//! login-guard - 登录暴力破解防护
//!
//! 按客户端 IP 与目标邮箱分别统计失败登录，随次数升级延迟与锁定：
//! 第 3 次失败禁用 1 分钟，第 5 次禁用 5 分钟，第 6 次起锁定 30 分钟。
//! 存储故障时放行，不影响登录可用性。

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    AttemptRecorder, AttemptResetter, LoginGuard, RateLimiter, format_rate_limit_message,
    remaining_attempts_message,
};
pub use domain::{KeyVerdict, LockoutTier, RateLimitCheck, extract_client_ip};
pub use infrastructure::{CleanupTask, MemoryAttemptStore, build_store};
