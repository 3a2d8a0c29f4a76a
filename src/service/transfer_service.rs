//! 转账编排服务
//!
//! 提交前本地校验（地址格式、正整数金额、资产可解析），失败即返回，
//! 不触碰任何网络。提交阶段区分两条 EVM 路径（后端直发 / 后端签名 +
//! 本层广播）与 Solana 路径（本层构造线格式、后端补签、本层广播）。
//! 广播只执行一次：提交超时意味着链上结果未知，重试可能双花。

use std::sync::Arc;

use serde_json::json;

use crate::{
    domain::{
        asset::{TransferKind, TransferRequest, TransferResult},
        chain::{
            ChainFamily, EvmSigningPath, NetworkConfig, NetworkRegistry, TokenRef,
        },
        solana_tx::{self, Instruction, Message, Pubkey, UnsignedTransaction},
    },
    error::{WalletError, WalletResult},
    infrastructure::rpc::{validate_tx_hash, RpcClient, READ_TIMEOUT, SUBMIT_TIMEOUT},
    repository::{UserDirectory, WalletRepository},
    service::custodial_backend::{CustodialBackend, EvmSendRequest, EvmSignRequest},
    utils::{account_label, address_validator::AddressValidator, amount},
};

/// EVM 原生转账 gas 上限
const EVM_NATIVE_GAS_LIMIT: u64 = 21_000;
/// ERC20 转账 gas 上限（自管路径，留出非标准实现余量）
const EVM_TOKEN_GAS_LIMIT: u64 = 90_000;

pub struct TransferService {
    registry: &'static NetworkRegistry,
    rpc: Arc<RpcClient>,
    backend: Arc<dyn CustodialBackend>,
    wallets: Arc<dyn WalletRepository>,
    users: Arc<dyn UserDirectory>,
    endpoints: Box<dyn Fn(&NetworkConfig) -> Vec<String> + Send + Sync>,
}

impl TransferService {
    pub fn new(
        registry: &'static NetworkRegistry,
        rpc: Arc<RpcClient>,
        backend: Arc<dyn CustodialBackend>,
        wallets: Arc<dyn WalletRepository>,
        users: Arc<dyn UserDirectory>,
        endpoints: Box<dyn Fn(&NetworkConfig) -> Vec<String> + Send + Sync>,
    ) -> Self {
        Self {
            registry,
            rpc,
            backend,
            wallets,
            users,
            endpoints,
        }
    }

    /// 原生资产转账入口：资产必须是原生引用
    pub async fn transfer_native(
        &self,
        request: TransferRequest,
    ) -> WalletResult<TransferResult> {
        if request.asset.token_ref != TokenRef::Native {
            return Err(WalletError::UnknownAsset(format!(
                "{} is not a native asset",
                request.asset.symbol
            )));
        }
        self.transfer(request).await
    }

    /// 代币转账入口：资产必须携带合约/铸币引用
    pub async fn transfer_token(&self, request: TransferRequest) -> WalletResult<TransferResult> {
        if request.asset.token_ref == TokenRef::Native {
            return Err(WalletError::UnknownAsset(format!(
                "{} is a native asset, not a token",
                request.asset.symbol
            )));
        }
        self.transfer(request).await
    }

    /// 提交一笔转账，返回交易哈希与浏览器链接
    pub async fn transfer(&self, request: TransferRequest) -> WalletResult<TransferResult> {
        let network = self
            .registry
            .resolve(&request.network_id)
            .ok_or_else(|| WalletError::UnsupportedNetwork(request.network_id.clone()))?;

        // ---- 本地前置校验，任何失败不产生网络调用 ----
        if !AddressValidator::validate(&network.family, &request.to_address) {
            return Err(WalletError::InvalidRecipientAddress(
                request.to_address.clone(),
            ));
        }
        let raw_amount = amount::parse_raw_amount(&request.raw_amount)
            .map_err(|e| WalletError::InvalidAmount(e.to_string()))?;
        if raw_amount == 0 {
            return Err(WalletError::InvalidAmount(
                "amount must be positive".to_string(),
            ));
        }
        if !network.family.is_evm() && u64::try_from(raw_amount).is_err() {
            return Err(WalletError::InvalidAmount(
                "amount exceeds u64 range".to_string(),
            ));
        }
        let kind = self.classify_asset(network, &request)?;

        // ---- 发送方归属反查，重建后端账户标签 ----
        let label = self.resolve_sender_label(&request.from_address).await?;

        let submit = match &network.family {
            ChainFamily::Evm { chain_id } => {
                self.submit_evm(network, *chain_id, &label, &request, raw_amount, kind)
                    .await
            }
            ChainFamily::Solana { .. } => {
                self.submit_solana(network, &label, &request, raw_amount, kind)
                    .await
            }
        };

        match submit {
            Ok(hash) => {
                crate::metrics::inc_transfer_ok();
                tracing::info!(
                    network = network.id,
                    from = %request.from_address,
                    to = %request.to_address,
                    asset = %request.asset.symbol,
                    tx_hash = %hash,
                    "transfer submitted"
                );
                let explorer_url = self.registry.explorer_url(network.id, &hash);
                Ok(TransferResult {
                    transaction_hash: hash,
                    explorer_url,
                })
            }
            Err(e) => {
                crate::metrics::inc_transfer_fail();
                // 日志与归类都要完整错误链，Display 只有最外层 context
                let chain = format!("{:#}", e);
                tracing::error!(
                    network = network.id,
                    from = %request.from_address,
                    error = %chain,
                    "transfer failed"
                );
                Err(WalletError::classify_error_chain(&e))
            }
        }
    }

    /// 资产必须与目标网络的链家族一致且（代币时）可在注册表解析
    fn classify_asset(
        &self,
        network: &NetworkConfig,
        request: &TransferRequest,
    ) -> WalletResult<TransferKind> {
        match &request.asset.token_ref {
            TokenRef::Native => Ok(TransferKind::Native),
            TokenRef::ContractAddress(_) if network.family.is_evm() => Ok(TransferKind::Token),
            TokenRef::MintAddress(_) if !network.family.is_evm() => Ok(TransferKind::Token),
            _ => Err(WalletError::UnknownAsset(format!(
                "{} not transferable on {}",
                request.asset.symbol, network.id
            ))),
        }
    }

    async fn resolve_sender_label(&self, from_address: &str) -> WalletResult<String> {
        let record = self
            .wallets
            .find_by_address(from_address)
            .await
            .map_err(|e| WalletError::StorageError(e.to_string()))?
            .ok_or_else(|| {
                WalletError::UserNotFound(format!("no wallet for address {}", from_address))
            })?;
        let profile = self
            .users
            .find_profile(record.user_id)
            .await
            .map_err(|e| WalletError::StorageError(e.to_string()))?
            .ok_or_else(|| WalletError::UserNotFound(record.user_id.to_string()))?;
        Ok(account_label::derive(&profile.phone))
    }

    // ============ EVM ============

    async fn submit_evm(
        &self,
        network: &NetworkConfig,
        chain_id: u64,
        label: &str,
        request: &TransferRequest,
        raw_amount: u128,
        kind: TransferKind,
    ) -> anyhow::Result<String> {
        let (to, value, data) = match (kind, &request.asset.token_ref) {
            (TransferKind::Native, _) => {
                (request.to_address.clone(), raw_amount.to_string(), None)
            }
            (TransferKind::Token, TokenRef::ContractAddress(contract)) => (
                contract.clone(),
                "0".to_string(),
                Some(super::evm_abi::transfer_calldata(
                    &request.to_address,
                    raw_amount,
                )),
            ),
            _ => anyhow::bail!("asset/kind mismatch on {}", network.id),
        };

        match network.evm_signing {
            EvmSigningPath::BackendSend => {
                let hash = self
                    .backend
                    .send_evm_transaction(label, chain_id, EvmSendRequest { to, value, data })
                    .await?;
                validate_tx_hash(&hash)
            }
            EvmSigningPath::SelfManagedRaw => {
                self.sign_and_broadcast_evm(network, chain_id, label, to, value, data, kind)
                    .await
            }
        }
    }

    /// 自管路径：本层取 nonce/gasPrice，后端只签名，本层广播一次
    #[allow(clippy::too_many_arguments)]
    async fn sign_and_broadcast_evm(
        &self,
        network: &NetworkConfig,
        chain_id: u64,
        label: &str,
        to: String,
        value: String,
        data: Option<String>,
        kind: TransferKind,
    ) -> anyhow::Result<String> {
        // 读取阶段允许端点切换；锁定成功的端点用于广播
        let (endpoint, nonce_hex) = self
            .call_with_fallback(
                network,
                "eth_getTransactionCount",
                json!([self.sender_address_hint(label).await?, "pending"]),
            )
            .await?;
        let nonce_raw = nonce_hex
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("non-string nonce"))
            .and_then(|s| amount::parse_hex_quantity(s))?;
        let nonce = u64::try_from(nonce_raw)
            .map_err(|_| anyhow::anyhow!("nonce exceeds u64 range: {}", nonce_raw))?;

        let gas_price_result = self
            .rpc
            .call(&endpoint, "eth_gasPrice", json!([]), READ_TIMEOUT)
            .await?;
        let gas_price = gas_price_result
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("non-string gas price"))
            .and_then(amount::parse_hex_quantity)?;

        let gas_limit = match kind {
            TransferKind::Native => EVM_NATIVE_GAS_LIMIT,
            TransferKind::Token => EVM_TOKEN_GAS_LIMIT,
        };

        let raw_tx = self
            .backend
            .sign_evm_transaction(
                label,
                chain_id,
                EvmSignRequest {
                    to,
                    value,
                    data,
                    nonce,
                    gas_price: gas_price.to_string(),
                    gas_limit,
                },
            )
            .await?;

        // 广播恰好一次，失败不重试
        let result = self
            .rpc
            .call(
                &endpoint,
                "eth_sendRawTransaction",
                json!([raw_tx]),
                SUBMIT_TIMEOUT,
            )
            .await?;
        let hash = result
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("non-string transaction hash"))?;
        validate_tx_hash(hash)
    }

    /// 自管路径需要发送方地址取 nonce；标签反查托管账户的规范地址
    async fn sender_address_hint(&self, label: &str) -> anyhow::Result<String> {
        let account = self
            .backend
            .create_or_fetch_account(
                crate::service::custodial_backend::AccountNamespace::Evm,
                label,
            )
            .await?;
        Ok(account.address)
    }

    // ============ Solana ============

    async fn submit_solana(
        &self,
        network: &NetworkConfig,
        label: &str,
        request: &TransferRequest,
        raw_amount: u128,
        kind: TransferKind,
    ) -> anyhow::Result<String> {
        // 上层已做 u64 范围校验
        let lamports_or_units = u64::try_from(raw_amount)
            .map_err(|_| anyhow::anyhow!("amount exceeds u64 range"))?;

        let sender = Pubkey::from_base58(&request.from_address)?;
        let recipient = Pubkey::from_base58(&request.to_address)?;

        let (endpoint, instructions) = match (kind, &request.asset.token_ref) {
            (TransferKind::Native, _) => {
                let (endpoint, _) = self.pick_live_endpoint(network).await?;
                (
                    endpoint,
                    vec![solana_tx::system_transfer(
                        &sender,
                        &recipient,
                        lamports_or_units,
                    )],
                )
            }
            (TransferKind::Token, TokenRef::MintAddress(mint_str)) => {
                let mint = Pubkey::from_base58(mint_str)?;
                let recipient_ata = solana_tx::derive_associated_token_address(&recipient, &mint)?;
                let (endpoint, needs_create) = self
                    .recipient_ata_missing(network, &recipient_ata)
                    .await?;
                (
                    endpoint,
                    build_token_transfer_instructions(
                        &sender,
                        &recipient,
                        &mint,
                        lamports_or_units,
                        needs_create,
                    )?,
                )
            }
            _ => anyhow::bail!("asset/kind mismatch on {}", network.id),
        };

        let blockhash = self.latest_blockhash(&endpoint).await?;
        let message = Message::compile(&sender, &instructions, blockhash)?;
        let unsigned = UnsignedTransaction::new(message);

        let signed_base64 = self
            .backend
            .sign_solana_transaction(label, &unsigned.to_base64())
            .await?;

        // 广播恰好一次
        let result = self
            .rpc
            .call(
                &endpoint,
                "sendTransaction",
                json!([signed_base64, {"encoding": "base64", "skipPreflight": false}]),
                SUBMIT_TIMEOUT,
            )
            .await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("non-string transaction signature"))
    }

    /// 收款方 ATA 是否缺失（getAccountInfo value 为 null）
    async fn recipient_ata_missing(
        &self,
        network: &NetworkConfig,
        recipient_ata: &Pubkey,
    ) -> anyhow::Result<(String, bool)> {
        let (endpoint, result) = self
            .call_with_fallback(
                network,
                "getAccountInfo",
                json!([recipient_ata.to_base58(), {"encoding": "base64"}]),
            )
            .await?;
        let missing = result.get("value").map(|v| v.is_null()).unwrap_or(true);
        Ok((endpoint, missing))
    }

    async fn latest_blockhash(&self, endpoint: &str) -> anyhow::Result<[u8; 32]> {
        let result = self
            .rpc
            .call(endpoint, "getLatestBlockhash", json!([]), READ_TIMEOUT)
            .await?;
        let blockhash_str = result
            .pointer("/value/blockhash")
            .and_then(|b| b.as_str())
            .ok_or_else(|| anyhow::anyhow!("getLatestBlockhash missing value.blockhash"))?;
        Ok(Pubkey::from_base58(blockhash_str)?.0)
    }

    /// 用健康检查式调用选定一个可用端点
    async fn pick_live_endpoint(
        &self,
        network: &NetworkConfig,
    ) -> anyhow::Result<(String, serde_json::Value)> {
        self.call_with_fallback(network, "getLatestBlockhash", json!([]))
            .await
    }

    /// 有序端点逐个尝试；返回成功端点以便后续调用保持会话一致
    async fn call_with_fallback(
        &self,
        network: &NetworkConfig,
        method: &str,
        params: serde_json::Value,
    ) -> anyhow::Result<(String, serde_json::Value)> {
        let endpoints = (self.endpoints)(network);
        let mut last_err = anyhow::anyhow!("no RPC endpoints configured for {}", network.id);
        for endpoint in endpoints {
            match self
                .rpc
                .call(&endpoint, method, params.clone(), READ_TIMEOUT)
                .await
            {
                Ok(value) => return Ok((endpoint, value)),
                Err(e) => {
                    tracing::warn!(
                        network = network.id,
                        endpoint = %endpoint,
                        method,
                        error = %e,
                        "RPC endpoint failed, trying next"
                    );
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

/// 构造 SPL 代币转账指令序列
///
/// `create_recipient_ata` 为真时幂等建户指令必须先于转账指令，保证
/// 首次向新地址转代币原子完成。独立成自由函数便于离线校验指令顺序。
pub fn build_token_transfer_instructions(
    sender: &Pubkey,
    recipient: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    create_recipient_ata: bool,
) -> anyhow::Result<Vec<Instruction>> {
    let sender_ata = solana_tx::derive_associated_token_address(sender, mint)?;
    let recipient_ata = solana_tx::derive_associated_token_address(recipient, mint)?;

    let mut instructions = Vec::with_capacity(2);
    if create_recipient_ata {
        instructions.push(solana_tx::create_associated_token_account_idempotent(
            sender,
            &recipient_ata,
            recipient,
            mint,
        ));
    }
    instructions.push(solana_tx::spl_token_transfer(
        &sender_ata,
        &recipient_ata,
        sender,
        amount,
    ));
    Ok(instructions)
}
