//! 数据库结构引导
//!
//! 代码内执行 DDL。`user_wallets` 上的 (user_id, chain_family)
//! 唯一约束是账户解析幂等性的根基：并发创建竞争由它仲裁。

use anyhow::{Context, Result};
use sqlx::PgPool;

/// 建表（幂等）
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            phone TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await
    .context("failed to create users table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_wallets (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL,
            chain_family TEXT NOT NULL,
            address TEXT NOT NULL,
            external_account_ref TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT user_wallets_user_family_unique UNIQUE (user_id, chain_family)
        )",
    )
    .execute(pool)
    .await
    .context("failed to create user_wallets table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_wallets_address ON user_wallets (address)")
        .execute(pool)
        .await
        .context("failed to create user_wallets address index")?;

    tracing::info!("database schema bootstrap complete");
    Ok(())
}
