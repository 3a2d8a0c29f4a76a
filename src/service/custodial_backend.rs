//! 托管签名后端客户端
//!
//! 后端持有用户密钥并暴露账户创建与签名/发送操作。本层只依赖
//! "稳定标签 -> 规范地址"的映射，认证细节对本层不透明（API Key 头）。
//! EVM 与 Solana 账户使用不同的后端命名空间。

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::CustodialConfig;

/// 后端账户命名空间（链家族各自独立）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountNamespace {
    Evm,
    Solana,
}

impl AccountNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountNamespace::Evm => "evm",
            AccountNamespace::Solana => "solana",
        }
    }
}

/// 后端账户：规范地址 + 后端内部引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendAccount {
    pub address: String,
    pub account_ref: String,
}

/// EVM 直发请求：后端自行签名并提交
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmSendRequest {
    pub to: String,
    /// 十进制 wei 字符串
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// EVM 签名请求（自管路径）：后端只签名，广播由本层完成
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmSignRequest {
    pub to: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub nonce: u64,
    /// 十进制 wei 字符串
    pub gas_price: String,
    pub gas_limit: u64,
}

#[async_trait]
pub trait CustodialBackend: Send + Sync {
    /// 按命名空间创建或取回账户（后端侧幂等）
    async fn create_or_fetch_account(
        &self,
        namespace: AccountNamespace,
        label: &str,
    ) -> Result<BackendAccount>;

    /// EVM：后端签名并发送，返回交易哈希
    async fn send_evm_transaction(
        &self,
        label: &str,
        chain_id: u64,
        request: EvmSendRequest,
    ) -> Result<String>;

    /// EVM 自管路径：后端签名，返回已签名的原始交易（0x 十六进制）
    async fn sign_evm_transaction(
        &self,
        label: &str,
        chain_id: u64,
        request: EvmSignRequest,
    ) -> Result<String>;

    /// Solana：对 base64 线格式交易补签名，返回已签名交易（base64）
    async fn sign_solana_transaction(&self, label: &str, transaction_base64: &str)
        -> Result<String>;
}

// ============ HTTP 实现 ============

pub struct HttpCustodialBackend {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateAccountBody<'a> {
    namespace: &'a str,
    label: &'a str,
}

#[derive(Deserialize)]
struct CreateAccountResponse {
    address: String,
    account_ref: String,
}

#[derive(Serialize)]
struct EvmSendBody<'a> {
    label: &'a str,
    chain_id: u64,
    #[serde(flatten)]
    request: &'a EvmSendRequest,
}

#[derive(Deserialize)]
struct EvmSendResponse {
    transaction_hash: String,
}

#[derive(Serialize)]
struct EvmSignBody<'a> {
    label: &'a str,
    chain_id: u64,
    #[serde(flatten)]
    request: &'a EvmSignRequest,
}

#[derive(Deserialize)]
struct EvmSignResponse {
    raw_transaction: String,
}

#[derive(Serialize)]
struct SolanaSignBody<'a> {
    label: &'a str,
    transaction: &'a str,
}

#[derive(Deserialize)]
struct SolanaSignResponse {
    signed_transaction: String,
}

impl HttpCustodialBackend {
    pub fn new(config: &CustodialConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client: client,
        }
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("custodial backend request failed: {}", path))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("failed to read custodial backend response")?;

        if !status.is_success() {
            anyhow::bail!(
                "custodial backend returned {} for {}: {}",
                status,
                path,
                text
            );
        }

        serde_json::from_str(&text)
            .with_context(|| format!("invalid custodial backend response for {}", path))
    }
}

#[async_trait]
impl CustodialBackend for HttpCustodialBackend {
    async fn create_or_fetch_account(
        &self,
        namespace: AccountNamespace,
        label: &str,
    ) -> Result<BackendAccount> {
        let body = CreateAccountBody {
            namespace: namespace.as_str(),
            label,
        };
        let resp: CreateAccountResponse = self.post_json("/v1/accounts", &body).await?;
        Ok(BackendAccount {
            address: resp.address,
            account_ref: resp.account_ref,
        })
    }

    async fn send_evm_transaction(
        &self,
        label: &str,
        chain_id: u64,
        request: EvmSendRequest,
    ) -> Result<String> {
        let body = EvmSendBody {
            label,
            chain_id,
            request: &request,
        };
        let resp: EvmSendResponse = self.post_json("/v1/evm/send", &body).await?;
        Ok(resp.transaction_hash)
    }

    async fn sign_evm_transaction(
        &self,
        label: &str,
        chain_id: u64,
        request: EvmSignRequest,
    ) -> Result<String> {
        let body = EvmSignBody {
            label,
            chain_id,
            request: &request,
        };
        let resp: EvmSignResponse = self.post_json("/v1/evm/sign", &body).await?;
        Ok(resp.raw_transaction)
    }

    async fn sign_solana_transaction(
        &self,
        label: &str,
        transaction_base64: &str,
    ) -> Result<String> {
        let body = SolanaSignBody {
            label,
            transaction: transaction_base64,
        };
        let resp: SolanaSignResponse = self.post_json("/v1/solana/sign", &body).await?;
        Ok(resp.signed_transaction)
    }
}
