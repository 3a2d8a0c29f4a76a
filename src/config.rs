//! 配置管理模块
//! 从环境变量加载配置（.env 可选）

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub custodial: CustodialConfig,
    pub logging: LoggingConfig,
    /// 按网络覆盖 RPC 端点（CHAINVAULT_RPC_<ID>，逗号分隔，按优先级排序）
    #[serde(default)]
    pub rpc_overrides: HashMap<String, Vec<String>>,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// 托管签名后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodialConfig {
    pub base_url: String,
    pub api_key: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            enable_file_logging: false,
            log_file_path: None,
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        // .env 文件缺失不是错误
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10)?,
            acquire_timeout_secs: env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?,
        };

        let custodial = CustodialConfig {
            base_url: std::env::var("CUSTODIAL_BACKEND_URL")
                .context("CUSTODIAL_BACKEND_URL is required")?,
            api_key: std::env::var("CUSTODIAL_BACKEND_API_KEY")
                .context("CUSTODIAL_BACKEND_API_KEY is required")?,
        };

        let logging = LoggingConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            enable_file_logging: std::env::var("LOG_TO_FILE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        };

        Ok(Self {
            database,
            custodial,
            logging,
            rpc_overrides: collect_rpc_overrides(),
        })
    }

    /// 解析某网络的生效 RPC 端点序（覆盖优先，否则注册表默认）
    pub fn rpc_endpoints_for(&self, network: &crate::domain::NetworkConfig) -> Vec<String> {
        if let Some(endpoints) = self.rpc_overrides.get(network.id) {
            if !endpoints.is_empty() {
                return endpoints.clone();
            }
        }
        network.rpc_endpoints.iter().map(|s| s.to_string()).collect()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn collect_rpc_overrides() -> HashMap<String, Vec<String>> {
    let mut overrides = HashMap::new();
    for (key, value) in std::env::vars() {
        if let Some(network_id) = key.strip_prefix("CHAINVAULT_RPC_") {
            let endpoints: Vec<String> = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !endpoints.is_empty() {
                overrides.insert(network_id.to_lowercase(), endpoints);
            }
        }
    }
    overrides
}
