//! 领域层：纯函数与值类型，不涉及 I/O

pub mod client_ip;
pub mod keys;
pub mod lockout_policy;
pub mod verdict;

pub use client_ip::extract_client_ip;
pub use keys::normalize_email;
pub use lockout_policy::{
    ATTEMPT_WINDOW_MINUTES, Evaluation, MAX_ATTEMPTS, RecordAction, attempt_window, evaluate,
    lockout_for_count, next_failure, throttle_delay_ms,
};
pub use verdict::{KeyVerdict, LockoutTier, RateLimitCheck};
