// 钱包目录数据访问 Repository

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

// ============ 领域模型 ============

/// 钱包记录：每个 (user_id, chain_family) 至多一条，地址创建后不可变
#[derive(Debug, Clone)]
pub struct WalletRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// 链家族键："evm" / "solana"
    pub chain_family: String,
    pub address: String,
    /// 托管后端账户引用
    pub external_account_ref: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// 创建钱包参数
#[derive(Debug, Clone)]
pub struct NewWalletRecord {
    pub user_id: Uuid,
    pub chain_family: String,
    pub address: String,
    pub external_account_ref: String,
}

/// 插入结果：唯一约束命中时不报错，交由调用方回读竞争获胜者
#[derive(Debug)]
pub enum InsertOutcome {
    Created(WalletRecord),
    /// (user_id, chain_family) 唯一约束冲突：并发创建竞争落败
    DuplicateKey,
}

// ============ Repository Trait ============

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// 查询某用户某链家族的全部记录，created_at 升序
    ///
    /// 正常情况最多一条；历史脏数据可能多条，调用方取最早并告警。
    async fn find_by_user_and_family(
        &self,
        user_id: Uuid,
        chain_family: &str,
    ) -> Result<Vec<WalletRecord>>;

    /// 按地址查询记录（转账路径反查发送方归属）
    async fn find_by_address(&self, address: &str) -> Result<Option<WalletRecord>>;

    /// 在唯一约束下尝试插入新记录
    async fn insert(&self, record: NewWalletRecord) -> Result<InsertOutcome>;
}

// ============ PostgreSQL 实现 ============

pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SQLSTATE 23505 = unique_violation
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn find_by_user_and_family(
        &self,
        user_id: Uuid,
        chain_family: &str,
    ) -> Result<Vec<WalletRecord>> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                String,
                String,
                String,
                chrono::DateTime<chrono::Utc>,
            ),
        >(
            "SELECT id, user_id, chain_family, address, external_account_ref, created_at
             FROM user_wallets
             WHERE user_id = $1 AND chain_family = $2
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(chain_family)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, user_id, chain_family, address, external_account_ref, created_at)| {
                    WalletRecord {
                        id,
                        user_id,
                        chain_family,
                        address,
                        external_account_ref,
                        created_at,
                    }
                },
            )
            .collect())
    }

    async fn find_by_address(&self, address: &str) -> Result<Option<WalletRecord>> {
        let row = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                String,
                String,
                String,
                chrono::DateTime<chrono::Utc>,
            ),
        >(
            "SELECT id, user_id, chain_family, address, external_account_ref, created_at
             FROM user_wallets
             WHERE address = $1
             ORDER BY created_at ASC
             LIMIT 1",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(id, user_id, chain_family, address, external_account_ref, created_at)| WalletRecord {
                id,
                user_id,
                chain_family,
                address,
                external_account_ref,
                created_at,
            },
        ))
    }

    async fn insert(&self, record: NewWalletRecord) -> Result<InsertOutcome> {
        let wallet_id = Uuid::new_v4();

        let result = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                String,
                String,
                String,
                chrono::DateTime<chrono::Utc>,
            ),
        >(
            "INSERT INTO user_wallets (id, user_id, chain_family, address, external_account_ref)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, user_id, chain_family, address, external_account_ref, created_at",
        )
        .bind(wallet_id)
        .bind(record.user_id)
        .bind(&record.chain_family)
        .bind(&record.address)
        .bind(&record.external_account_ref)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((id, user_id, chain_family, address, external_account_ref, created_at)) => {
                Ok(InsertOutcome::Created(WalletRecord {
                    id,
                    user_id,
                    chain_family,
                    address,
                    external_account_ref,
                    created_at,
                }))
            }
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::DuplicateKey),
            Err(e) => Err(e.into()),
        }
    }
}
