//! ChainVault 主入口
//! 装配托管钱包编排层并常驻，等待上层宿主接入

use std::sync::Arc;

use anyhow::Result;
use chainvault::{app_state::AppState, config::Config, infrastructure::logging};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置（.env 可选）
    let config = Arc::new(Config::from_env()?);

    // 2. 初始化日志（guard 须存活至进程结束，否则文件日志丢尾）
    let _log_guard = logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("logging init failed: {}", e))?;

    tracing::info!("starting ChainVault orchestration layer");

    // 3. 连库 + 迁移 + 服务装配
    let state = AppState::new(config).await?;
    tracing::info!(
        networks = chainvault::domain::REGISTRY.list_all().len(),
        rpc_overrides = state.config.rpc_overrides.len(),
        "ChainVault ready"
    );

    // 常驻直到收到终止信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    Ok(())
}
