// 用户稳定元数据查询（账户标签派生的输入）

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// 用户稳定元数据：标签派生只依赖这里的字段
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    /// 手机号标识（标签派生输入，见 utils::account_label）
    pub phone: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 查询用户稳定元数据；不存在返回 None
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>>;
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, phone FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, phone)| UserProfile { id, phone }))
    }
}
