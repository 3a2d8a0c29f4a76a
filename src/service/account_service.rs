//! 账户解析服务
//!
//! get_or_create 的幂等性由 (user_id, chain_family) 唯一约束仲裁：
//! 插入撞约束说明并发竞争落败，回读一次返回获胜者的记录，不报错、
//! 不循环重试。这是 compare-and-swap-via-unique-index，不是分布式锁。

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::chain::{ChainFamily, NetworkRegistry},
    error::{WalletError, WalletResult},
    infrastructure::client_cache::{AccountHandle, ClientHandleCache},
    repository::{InsertOutcome, NewWalletRecord, UserDirectory, WalletRecord, WalletRepository},
    service::custodial_backend::{AccountNamespace, BackendAccount, CustodialBackend},
    utils::account_label,
};

pub struct AccountService {
    registry: &'static NetworkRegistry,
    wallets: Arc<dyn WalletRepository>,
    users: Arc<dyn UserDirectory>,
    backend: Arc<dyn CustodialBackend>,
    handle_cache: Arc<ClientHandleCache>,
}

fn namespace_for(family: &ChainFamily) -> AccountNamespace {
    match family {
        ChainFamily::Evm { .. } => AccountNamespace::Evm,
        ChainFamily::Solana { .. } => AccountNamespace::Solana,
    }
}

impl AccountService {
    pub fn new(
        registry: &'static NetworkRegistry,
        wallets: Arc<dyn WalletRepository>,
        users: Arc<dyn UserDirectory>,
        backend: Arc<dyn CustodialBackend>,
        handle_cache: Arc<ClientHandleCache>,
    ) -> Self {
        Self {
            registry,
            wallets,
            users,
            backend,
            handle_cache,
        }
    }

    /// 解析（必要时创建）用户在目标链家族的托管账户
    ///
    /// 地址一经分配不可变；并发调用对同一 (user, family) 安全。
    pub async fn get_or_create(
        &self,
        user_id: Uuid,
        network_id: &str,
    ) -> WalletResult<WalletRecord> {
        let network = self
            .registry
            .resolve(network_id)
            .ok_or_else(|| WalletError::UnsupportedNetwork(network_id.to_string()))?;
        let family_key = network.family.key();

        // 1. 已有记录直接返回（历史脏数据取最早一条并告警）
        if let Some(existing) = self.read_earliest(user_id, family_key).await? {
            return Ok(existing);
        }

        // 2. 从稳定用户元数据确定性派生后端标签
        let profile = self
            .users
            .find_profile(user_id)
            .await
            .map_err(|e| WalletError::StorageError(e.to_string()))?
            .ok_or_else(|| WalletError::UserNotFound(user_id.to_string()))?;
        let label = account_label::derive(&profile.phone);

        // 3. 托管后端创建/取回账户（后端侧按标签幂等）
        // 缓存命中可省去后端往返；缓存只是建议性的，未命中不是错误
        let namespace = namespace_for(&network.family);
        let cache_key = format!("{}:{}", family_key, label);
        let account = match self.handle_cache.get(&cache_key).await {
            Some(handle) => BackendAccount {
                address: handle.address,
                account_ref: handle.account_ref,
            },
            None => {
                let account = self
                    .backend
                    .create_or_fetch_account(namespace, &label)
                    .await
                    .map_err(|e| WalletError::AccountCreationFailed(format!("{:#}", e)))?;
                self.handle_cache
                    .put(
                        &cache_key,
                        AccountHandle {
                            address: account.address.clone(),
                            account_ref: account.account_ref.clone(),
                        },
                    )
                    .await;
                account
            }
        };

        // 4. 在唯一约束下落库
        let outcome = self
            .wallets
            .insert(NewWalletRecord {
                user_id,
                chain_family: family_key.to_string(),
                address: account.address,
                external_account_ref: account.account_ref,
            })
            .await
            .map_err(|e| WalletError::StorageError(e.to_string()))?;

        match outcome {
            InsertOutcome::Created(record) => {
                tracing::info!(
                    user_id = %user_id,
                    chain_family = family_key,
                    address = %record.address,
                    "custodial wallet created"
                );
                Ok(record)
            }
            // 5. 竞争落败：单次回读返回获胜者
            InsertOutcome::DuplicateKey => {
                tracing::debug!(
                    user_id = %user_id,
                    chain_family = family_key,
                    "wallet insert lost creation race, re-reading winner"
                );
                self.read_earliest(user_id, family_key)
                    .await?
                    .ok_or_else(|| {
                        WalletError::StorageError(
                            "unique violation on insert but no row on re-read".to_string(),
                        )
                    })
            }
        }
    }

    async fn read_earliest(
        &self,
        user_id: Uuid,
        family_key: &str,
    ) -> WalletResult<Option<WalletRecord>> {
        let mut records = self
            .wallets
            .find_by_user_and_family(user_id, family_key)
            .await
            .map_err(|e| WalletError::StorageError(e.to_string()))?;

        if records.len() > 1 {
            tracing::warn!(
                user_id = %user_id,
                chain_family = family_key,
                surplus = records.len() - 1,
                "multiple wallet records for one user/family, using earliest"
            );
        }

        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records.remove(0)))
        }
    }
}
