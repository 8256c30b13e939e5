//! 存储故障降级测试

use chrono::Utc;
use cuba_ports::AttemptKind;
use login_guard::{LoginGuard, MemoryAttemptStore};
use std::sync::Arc;

#[tokio::test]
async fn test_check_fails_open_when_store_is_down() {
    let store = MemoryAttemptStore::new();
    let guard = LoginGuard::new(Arc::new(store.clone()));

    for _ in 0..6 {
        guard.record_failed_attempt("1.2.3.4", "a@example.com").await;
    }
    assert!(guard.check_rate_limit("1.2.3.4", "a@example.com").await.is_blocked);

    store.set_unavailable(true);
    let result = guard.check_rate_limit("1.2.3.4", "a@example.com").await;

    assert!(!result.is_blocked);
    assert!(result.degraded);
    assert_eq!(LoginGuard::format_rate_limit_message(&result), "");
    assert_eq!(
        LoginGuard::remaining_attempts_message(&result),
        "6 login attempts remaining."
    );
}

#[tokio::test]
async fn test_record_and_reset_never_fail_the_caller() {
    let store = MemoryAttemptStore::new();
    let guard = LoginGuard::new(Arc::new(store.clone()));
    store.set_unavailable(true);

    guard.record_failed_attempt("1.2.3.4", "a@example.com").await;
    guard.reset_login_attempts("1.2.3.4", "a@example.com").await;
    guard.flush().await;

    store.set_unavailable(false);
    assert!(store.is_empty(AttemptKind::Ip).await);
    assert!(store.is_empty(AttemptKind::Email).await);
}

#[tokio::test]
async fn test_store_recovery_restores_enforcement() {
    let store = MemoryAttemptStore::new();
    let guard = LoginGuard::new(Arc::new(store.clone()));
    let now = Utc::now();

    for _ in 0..3 {
        guard.record_failed_attempt_at("1.2.3.4", "a@example.com", now).await;
    }

    store.set_unavailable(true);
    assert!(!guard.check_rate_limit_at("1.2.3.4", "a@example.com", now).await.is_blocked);

    store.set_unavailable(false);
    assert!(guard.check_rate_limit_at("1.2.3.4", "a@example.com", now).await.is_blocked);
}
