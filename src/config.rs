use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileResult;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/bank_recon";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// 单次写操作 (含事务) 的超时
    pub write_timeout_secs: u64,
}

/// 自动对账的默认容差
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub tolerance_days: i64,
    pub amount_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: 20,
                acquire_timeout_secs: 10,
                write_timeout_secs: 30,
            },
            matching: MatchingConfig {
                tolerance_days: 7,
                amount_tolerance: 0.01,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> config/default.toml (可选) -> 环境变量 RECON__*
    pub fn from_env() -> ReconcileResult<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections as i64)?
            .set_default("database.acquire_timeout_secs", defaults.database.acquire_timeout_secs as i64)?
            .set_default("database.write_timeout_secs", defaults.database.write_timeout_secs as i64)?
            .set_default("matching.tolerance_days", defaults.matching.tolerance_days)?
            .set_default("matching.amount_tolerance", defaults.matching.amount_tolerance)?
            .set_default("logging.level", defaults.logging.level)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("RECON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        // 兼容常用的 DATABASE_URL
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }
}
