//! 应用层：编排存储与锁定策略

mod attempt_recorder;
mod attempt_resetter;
mod login_guard;
pub mod messages;
mod rate_limiter;

pub use attempt_recorder::AttemptRecorder;
pub use attempt_resetter::AttemptResetter;
pub use login_guard::LoginGuard;
pub use messages::{format_rate_limit_message, remaining_attempts_message};
pub use rate_limiter::RateLimiter;
