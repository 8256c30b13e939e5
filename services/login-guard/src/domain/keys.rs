//! 尝试记录键的规范化

/// 邮箱键去除首尾空白并转小写，大小写变体共享同一条记录
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
