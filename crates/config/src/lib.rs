//! cuba-config - 配置加载库
//!
//! 锁定阈值与时长属于安全契约，不在配置范围内

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 存储后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存储（开发 / 测试）
    #[default]
    Memory,
    Postgres,
    Redis,
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// 记录过期时间，需覆盖滑动窗口与最长锁定
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_key_prefix() -> String {
    "cuba".to_string()
}

fn default_ttl_secs() -> u64 {
    45 * 60
}

/// 存储配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub database: Option<DatabaseConfig>,
    pub redis: Option<RedisConfig>,
}

/// 遥测配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
    /// Prometheus 抓取端点地址，未配置时不导出指标
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            metrics_addr: None,
        }
    }
}

/// 过期记录清理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cleanup_interval_secs")]
    pub interval_secs: u64,
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// 未提供配置文件时使用的默认值
#[derive(Serialize)]
struct Defaults {
    app_name: &'static str,
    app_env: &'static str,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 顺序：`default.toml` → `{APP_ENV}.toml` → `APP_` 前缀环境变量（`__` 分隔层级）
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::from(Serialized::defaults(Defaults {
            app_name: "login-guard",
            app_env: "development",
        }))
        .merge(Toml::file(format!("{}/default.toml", config_dir)))
        .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
        .merge(Env::prefixed("APP_").split("__"))
        .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// 检查所选后端的连接配置是否齐全
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.storage.backend {
            StorageBackend::Postgres if self.storage.database.is_none() => Err(
                ConfigError::Invalid("storage.database is required for the postgres backend".into()),
            ),
            StorageBackend::Redis if self.storage.redis.is_none() => Err(ConfigError::Invalid(
                "storage.redis is required for the redis backend".into(),
            )),
            _ if self.cleanup.enabled && self.cleanup.interval_secs == 0 => Err(
                ConfigError::Invalid("cleanup.interval_secs must be greater than zero".into()),
            ),
            _ => Ok(()),
        }
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
