//! 测试辅助：内存版仓储与可计数的托管后端桩

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::Result;
use async_trait::async_trait;
use chainvault::{
    repository::{
        InsertOutcome, NewWalletRecord, UserDirectory, UserProfile, WalletRecord, WalletRepository,
    },
    service::custodial_backend::{
        AccountNamespace, BackendAccount, CustodialBackend, EvmSendRequest, EvmSignRequest,
    },
};
use uuid::Uuid;

/// 内存钱包仓储：用进程内互斥锁模拟 (user_id, chain_family) 唯一约束
#[derive(Default)]
pub struct MemoryWalletRepository {
    records: Mutex<Vec<WalletRecord>>,
}

impl MemoryWalletRepository {
    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// 直接塞入一条记录，绕过唯一约束（模拟历史脏数据）
    pub fn seed(&self, record: WalletRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[async_trait]
impl WalletRepository for MemoryWalletRepository {
    async fn find_by_user_and_family(
        &self,
        user_id: Uuid,
        chain_family: &str,
    ) -> Result<Vec<WalletRecord>> {
        let mut matches: Vec<WalletRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.chain_family == chain_family)
            .cloned()
            .collect();
        matches.sort_by_key(|r| r.created_at);
        Ok(matches)
    }

    async fn find_by_address(&self, address: &str) -> Result<Option<WalletRecord>> {
        let mut matches: Vec<WalletRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.address == address)
            .cloned()
            .collect();
        matches.sort_by_key(|r| r.created_at);
        Ok(matches.into_iter().next())
    }

    async fn insert(&self, record: NewWalletRecord) -> Result<InsertOutcome> {
        let mut records = self.records.lock().unwrap();
        let duplicate = records
            .iter()
            .any(|r| r.user_id == record.user_id && r.chain_family == record.chain_family);
        if duplicate {
            return Ok(InsertOutcome::DuplicateKey);
        }
        let created = WalletRecord {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            chain_family: record.chain_family,
            address: record.address,
            external_account_ref: record.external_account_ref,
            created_at: chrono::Utc::now(),
        };
        records.push(created.clone());
        Ok(InsertOutcome::Created(created))
    }
}

/// 内存用户目录
#[derive(Default)]
pub struct MemoryUserDirectory {
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
}

impl MemoryUserDirectory {
    pub fn with_user(user_id: Uuid, phone: &str) -> Self {
        let directory = Self::default();
        directory.profiles.lock().unwrap().insert(
            user_id,
            UserProfile {
                id: user_id,
                phone: phone.to_string(),
            },
        );
        directory
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }
}

/// 托管后端桩：同标签返回固定地址，计数所有调用
#[derive(Default)]
pub struct MockCustodialBackend {
    pub create_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub sign_calls: AtomicUsize,
}

impl MockCustodialBackend {
    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn total_network_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.send_calls.load(Ordering::SeqCst)
            + self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CustodialBackend for MockCustodialBackend {
    async fn create_or_fetch_account(
        &self,
        namespace: AccountNamespace,
        label: &str,
    ) -> Result<BackendAccount> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        // 同 (namespace, label) 恒定地址，模拟后端侧幂等
        let address = match namespace {
            AccountNamespace::Evm => {
                format!("0x{:040x}", stable_hash(label))
            }
            AccountNamespace::Solana => {
                bs58_like_address(label)
            }
        };
        Ok(BackendAccount {
            address,
            account_ref: format!("acct-{}", label),
        })
    }

    async fn send_evm_transaction(
        &self,
        _label: &str,
        _chain_id: u64,
        _request: EvmSendRequest,
    ) -> Result<String> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("0x{:064x}", 0xdeadbeefu64))
    }

    async fn sign_evm_transaction(
        &self,
        _label: &str,
        _chain_id: u64,
        _request: EvmSignRequest,
    ) -> Result<String> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok("0xf86b808504a817c800825208".to_string())
    }

    async fn sign_solana_transaction(
        &self,
        _label: &str,
        transaction_base64: &str,
    ) -> Result<String> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(transaction_base64.to_string())
    }
}

fn stable_hash(input: &str) -> u128 {
    input
        .bytes()
        .fold(0xcbf29ce484222325u128, |acc, b| {
            (acc ^ b as u128).wrapping_mul(0x100000001b3)
        })
}

fn bs58_like_address(label: &str) -> String {
    let mut seed = [0u8; 32];
    for (i, b) in label.bytes().enumerate() {
        seed[i % 32] ^= b;
    }
    bs58::encode(seed).into_string()
}
