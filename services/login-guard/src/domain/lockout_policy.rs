//! 锁定策略
//!
//! 纯函数：给定记录与当前时间，得出锁定等级、锁定截止时间与节流延迟。
//!
//! | 失败次数 | 结果 |
//! |---|---|
//! | 1, 2, 4 | 不拦截，按键类型计算延迟 |
//! | 3 | 临时禁用 1 分钟 |
//! | 5 | 临时禁用 5 分钟 |
//! | ≥ 6 | 硬锁定 30 分钟 |
//!
//! 每个计数只锁定一次：锁定到期后，同一计数再次评估时不拦截，
//! 直到下一次失败把计数推到新的触发值。

use chrono::{DateTime, Duration, Utc};
use cuba_ports::{AttemptKind, AttemptRecord};

use super::verdict::{KeyVerdict, LockoutTier};

/// 滑动窗口（分钟），以 `last_attempt` 为锚点
pub const ATTEMPT_WINDOW_MINUTES: i64 = 15;
/// 达到该次数即硬锁定
pub const MAX_ATTEMPTS: u32 = 6;

const FIRST_DISABLE_COUNT: u32 = 3;
const SECOND_DISABLE_COUNT: u32 = 5;

const FIRST_DISABLE_MINUTES: i64 = 1;
const SECOND_DISABLE_MINUTES: i64 = 5;
const HARD_LOCK_MINUTES: i64 = 30;

const IP_DELAY_STEP_MS: u64 = 1000;
const IP_DELAY_CAP_MS: u64 = 3000;
const EMAIL_DELAY_STEP_MS: u64 = 2000;
const EMAIL_DELAY_CAP_MS: u64 = 5000;

pub fn attempt_window() -> Duration {
    Duration::minutes(ATTEMPT_WINDOW_MINUTES)
}

/// 评估后需要对存储做的修正
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    /// 无需写入
    Keep,
    /// 窗口过期，删除记录
    Delete,
    /// 写回新的锁定状态（施加新锁定或清除过期锁定）
    Save(AttemptRecord),
}

/// 单个键的评估结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub verdict: KeyVerdict,
    pub action: RecordAction,
}

impl Evaluation {
    fn clear(action: RecordAction) -> Self {
        Self {
            verdict: KeyVerdict::clear(),
            action,
        }
    }
}

/// 某个失败次数触发的锁定等级与时长
pub fn lockout_for_count(count: u32) -> Option<(LockoutTier, Duration)> {
    match count {
        c if c >= MAX_ATTEMPTS => Some((LockoutTier::HardLock, Duration::minutes(HARD_LOCK_MINUTES))),
        SECOND_DISABLE_COUNT => Some((
            LockoutTier::SoftDisable,
            Duration::minutes(SECOND_DISABLE_MINUTES),
        )),
        FIRST_DISABLE_COUNT => Some((
            LockoutTier::SoftDisable,
            Duration::minutes(FIRST_DISABLE_MINUTES),
        )),
        _ => None,
    }
}

/// 不拦截时注入的延迟
///
/// - IP: `min((count - 1) * 1000, 3000)`
/// - 邮箱: `min((count - 1) * 2000, 5000)`
pub fn throttle_delay_ms(kind: AttemptKind, count: u32) -> u64 {
    if count < 2 {
        return 0;
    }
    let (step, cap) = match kind {
        AttemptKind::Ip => (IP_DELAY_STEP_MS, IP_DELAY_CAP_MS),
        AttemptKind::Email => (EMAIL_DELAY_STEP_MS, EMAIL_DELAY_CAP_MS),
    };
    u64::from(count - 1).saturating_mul(step).min(cap)
}

fn remaining_attempts(count: u32) -> u32 {
    MAX_ATTEMPTS.saturating_sub(count)
}

/// 评估单个键
pub fn evaluate(kind: AttemptKind, record: Option<&AttemptRecord>, now: DateTime<Utc>) -> Evaluation {
    let Some(record) = record else {
        return Evaluation::clear(RecordAction::Keep);
    };
    let count = record.attempt_count;

    // 生效中的锁定优先于窗口过期，硬锁定必须持续满 30 分钟
    if record.has_active_lockout(now) {
        let tier = if record.is_locked {
            LockoutTier::HardLock
        } else {
            LockoutTier::SoftDisable
        };
        return Evaluation {
            verdict: KeyVerdict {
                tier,
                is_limited: true,
                is_locked: record.is_locked,
                lockout_until: record.lockout_until,
                delay_ms: 0,
                remaining_attempts: remaining_attempts(count),
                attempt_count: count,
            },
            action: RecordAction::Keep,
        };
    }

    if !record.is_within_window(now, attempt_window()) {
        return Evaluation::clear(RecordAction::Delete);
    }

    if let Some((tier, duration)) = lockout_for_count(count) {
        if record.lockout_attempt_count != Some(count) {
            let lockout_until = now + duration;
            let is_locked = tier == LockoutTier::HardLock;
            let updated = AttemptRecord {
                is_locked,
                lockout_until: Some(lockout_until),
                lockout_attempt_count: Some(count),
                updated_at: now,
                ..record.clone()
            };
            return Evaluation {
                verdict: KeyVerdict {
                    tier,
                    is_limited: true,
                    is_locked,
                    lockout_until: Some(lockout_until),
                    delay_ms: 0,
                    remaining_attempts: remaining_attempts(count),
                    attempt_count: count,
                },
                action: RecordAction::Save(updated),
            };
        }
    }

    let delay_ms = throttle_delay_ms(kind, count);
    let action = if record.lockout_until.is_some() || record.is_locked {
        RecordAction::Save(AttemptRecord {
            is_locked: false,
            lockout_until: None,
            updated_at: now,
            ..record.clone()
        })
    } else {
        RecordAction::Keep
    };

    Evaluation {
        verdict: KeyVerdict {
            tier: if delay_ms > 0 {
                LockoutTier::Throttle
            } else {
                LockoutTier::None
            },
            is_limited: false,
            is_locked: false,
            lockout_until: None,
            delay_ms,
            remaining_attempts: remaining_attempts(count),
            attempt_count: count,
        },
        action,
    }
}

/// 记录一次失败后的新记录
///
/// 窗口过期（且没有生效锁定）时从 1 重新计数；过期锁定不沿用。
pub fn next_failure(existing: Option<AttemptRecord>, key: &str, now: DateTime<Utc>) -> AttemptRecord {
    match existing {
        Some(record)
            if record.has_active_lockout(now) || record.is_within_window(now, attempt_window()) =>
        {
            let stale = record.has_stale_lockout(now);
            AttemptRecord {
                attempt_count: record.attempt_count.saturating_add(1),
                last_attempt: now,
                updated_at: now,
                is_locked: if stale { false } else { record.is_locked },
                lockout_until: if stale { None } else { record.lockout_until },
                ..record
            }
        }
        _ => AttemptRecord::first_failure(key, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn record_with_count(count: u32, last_attempt: DateTime<Utc>) -> AttemptRecord {
        AttemptRecord {
            attempt_count: count,
            last_attempt,
            updated_at: last_attempt,
            ..AttemptRecord::first_failure("a@example.com", last_attempt)
        }
    }

    fn saved(evaluation: &Evaluation) -> &AttemptRecord {
        match &evaluation.action {
            RecordAction::Save(record) => record,
            other => panic!("expected save, got {:?}", other),
        }
    }

    #[test]
    fn test_no_record_is_clear() {
        let evaluation = evaluate(AttemptKind::Ip, None, t0());
        assert_eq!(evaluation.verdict, KeyVerdict::clear());
        assert_eq!(evaluation.action, RecordAction::Keep);
    }

    #[test]
    fn test_non_blocking_counts_and_delays() {
        let cases = [
            (AttemptKind::Ip, 1, 0),
            (AttemptKind::Ip, 2, 1000),
            (AttemptKind::Ip, 4, 3000),
            (AttemptKind::Email, 1, 0),
            (AttemptKind::Email, 2, 2000),
            (AttemptKind::Email, 4, 5000),
        ];

        for (kind, count, expected_delay) in cases {
            let record = record_with_count(count, t0());
            let evaluation = evaluate(kind, Some(&record), t0());
            assert!(!evaluation.verdict.is_limited, "{kind} count {count}");
            assert_eq!(evaluation.verdict.delay_ms, expected_delay, "{kind} count {count}");
            assert_eq!(evaluation.action, RecordAction::Keep);
        }
    }

    #[test]
    fn test_delay_caps() {
        assert_eq!(throttle_delay_ms(AttemptKind::Ip, 3), 2000);
        assert_eq!(throttle_delay_ms(AttemptKind::Ip, 100), 3000);
        assert_eq!(throttle_delay_ms(AttemptKind::Email, 3), 4000);
        assert_eq!(throttle_delay_ms(AttemptKind::Email, u32::MAX), 5000);
        assert_eq!(throttle_delay_ms(AttemptKind::Email, 0), 0);
    }

    #[test]
    fn test_third_failure_disables_for_one_minute() {
        let record = record_with_count(3, t0());
        let evaluation = evaluate(AttemptKind::Email, Some(&record), t0());

        assert!(evaluation.verdict.is_limited);
        assert!(!evaluation.verdict.is_locked);
        assert_eq!(evaluation.verdict.tier, LockoutTier::SoftDisable);
        assert_eq!(evaluation.verdict.lockout_until, Some(t0() + Duration::seconds(60)));

        let updated = saved(&evaluation);
        assert_eq!(updated.lockout_until, Some(t0() + Duration::seconds(60)));
        assert_eq!(updated.lockout_attempt_count, Some(3));
        assert!(!updated.is_locked);
    }

    #[test]
    fn test_fifth_failure_disables_for_five_minutes() {
        let record = record_with_count(5, t0());
        let evaluation = evaluate(AttemptKind::Ip, Some(&record), t0());

        assert!(evaluation.verdict.is_limited);
        assert!(!evaluation.verdict.is_locked);
        assert_eq!(evaluation.verdict.lockout_until, Some(t0() + Duration::seconds(300)));
        assert_eq!(evaluation.verdict.remaining_attempts, 1);
    }

    #[test]
    fn test_sixth_failure_hard_locks() {
        for count in [6, 7, 12] {
            let record = record_with_count(count, t0());
            let evaluation = evaluate(AttemptKind::Ip, Some(&record), t0());

            assert!(evaluation.verdict.is_limited);
            assert!(evaluation.verdict.is_locked);
            assert_eq!(evaluation.verdict.tier, LockoutTier::HardLock);
            assert_eq!(evaluation.verdict.lockout_until, Some(t0() + Duration::seconds(1800)));
            assert_eq!(evaluation.verdict.remaining_attempts, 0);
            assert!(saved(&evaluation).is_locked);
        }
    }

    #[test]
    fn test_active_lockout_is_reported_unchanged() {
        let mut record = record_with_count(3, t0());
        record.lockout_until = Some(t0() + Duration::seconds(60));
        record.lockout_attempt_count = Some(3);

        let evaluation = evaluate(AttemptKind::Email, Some(&record), t0() + Duration::seconds(30));
        assert!(evaluation.verdict.is_limited);
        assert_eq!(evaluation.verdict.lockout_until, record.lockout_until);
        assert_eq!(evaluation.action, RecordAction::Keep);
    }

    #[test]
    fn test_expired_lockout_is_cleared_and_not_reapplied() {
        let mut record = record_with_count(3, t0());
        record.lockout_until = Some(t0() + Duration::seconds(60));
        record.lockout_attempt_count = Some(3);

        let later = t0() + Duration::seconds(90);
        let evaluation = evaluate(AttemptKind::Email, Some(&record), later);
        assert!(!evaluation.verdict.is_limited);
        assert_eq!(evaluation.verdict.lockout_until, None);

        let cleared = saved(&evaluation).clone();
        assert_eq!(cleared.lockout_until, None);
        assert!(!cleared.is_locked);
        assert_eq!(cleared.attempt_count, 3);

        // 清除后再次评估，同一计数不会再次锁定
        let again = evaluate(AttemptKind::Email, Some(&cleared), later + Duration::seconds(5));
        assert!(!again.verdict.is_limited);
        assert_eq!(again.action, RecordAction::Keep);
    }

    #[test]
    fn test_expired_hard_lock_outside_window_is_deleted() {
        let mut record = record_with_count(6, t0());
        record.is_locked = true;
        record.lockout_until = Some(t0() + Duration::minutes(30));
        record.lockout_attempt_count = Some(6);

        let evaluation = evaluate(AttemptKind::Ip, Some(&record), t0() + Duration::minutes(31));
        // 记录已在窗口外，直接删除
        assert_eq!(evaluation.action, RecordAction::Delete);
        assert!(!evaluation.verdict.is_limited);
        assert!(!evaluation.verdict.is_locked);
    }

    #[test]
    fn test_hard_lock_outlives_window() {
        let mut record = record_with_count(6, t0());
        record.is_locked = true;
        record.lockout_until = Some(t0() + Duration::minutes(30));
        record.lockout_attempt_count = Some(6);

        let evaluation = evaluate(AttemptKind::Ip, Some(&record), t0() + Duration::minutes(20));
        assert!(evaluation.verdict.is_limited);
        assert!(evaluation.verdict.is_locked);
    }

    #[test]
    fn test_record_outside_window_is_treated_as_absent() {
        let record = record_with_count(4, t0());
        let later = t0() + Duration::minutes(15) + Duration::seconds(1);
        let evaluation = evaluate(AttemptKind::Email, Some(&record), later);

        assert_eq!(evaluation.verdict, KeyVerdict::clear());
        assert_eq!(evaluation.action, RecordAction::Delete);
    }

    #[test]
    fn test_next_failure_creates_and_increments() {
        let first = next_failure(None, "1.2.3.4", t0());
        assert_eq!(first.attempt_count, 1);
        assert_eq!(first.key, "1.2.3.4");

        let later = t0() + Duration::seconds(10);
        let second = next_failure(Some(first), "1.2.3.4", later);
        assert_eq!(second.attempt_count, 2);
        assert_eq!(second.first_attempt, t0());
        assert_eq!(second.last_attempt, later);
        assert_eq!(second.updated_at, later);
    }

    #[test]
    fn test_next_failure_restarts_after_window() {
        let record = record_with_count(4, t0());
        let later = t0() + Duration::minutes(16);
        let next = next_failure(Some(record), "a@example.com", later);

        assert_eq!(next.attempt_count, 1);
        assert_eq!(next.first_attempt, later);
    }

    #[test]
    fn test_next_failure_drops_stale_lockout() {
        let mut record = record_with_count(3, t0());
        record.lockout_until = Some(t0() + Duration::seconds(60));
        record.lockout_attempt_count = Some(3);

        let next = next_failure(Some(record), "a@example.com", t0() + Duration::seconds(90));
        assert_eq!(next.attempt_count, 4);
        assert_eq!(next.lockout_until, None);
        assert!(!next.is_locked);
    }
}
