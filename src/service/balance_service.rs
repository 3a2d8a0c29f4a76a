//! 余额聚合服务
//!
//! 每条网络配置若干有序 RPC 提供方，逐个尝试直至成功；全部失败时
//! 返回零余额默认集而不是错误，余额读取永不向上传播提供方故障。
//! 单个代币查询失败只降级该代币为零，不拖垮整个结果集。

use std::sync::Arc;

use serde_json::json;

use crate::{
    domain::{
        asset::{Asset, Balance},
        chain::{ChainFamily, NetworkConfig, NetworkRegistry, TokenRef},
        solana_tx,
    },
    error::{WalletError, WalletResult},
    infrastructure::rpc::{RpcClient, READ_TIMEOUT},
    utils::amount,
};

pub struct BalanceService {
    registry: &'static NetworkRegistry,
    rpc: Arc<RpcClient>,
    endpoints: Box<dyn Fn(&NetworkConfig) -> Vec<String> + Send + Sync>,
}

impl BalanceService {
    pub fn new(
        registry: &'static NetworkRegistry,
        rpc: Arc<RpcClient>,
        endpoints: Box<dyn Fn(&NetworkConfig) -> Vec<String> + Send + Sync>,
    ) -> Self {
        Self {
            registry,
            rpc,
            endpoints,
        }
    }

    /// 查询地址在目标网络上的原生余额与已知代币余额
    ///
    /// 网络不受支持是调用方错误，返回类型化错误；提供方全部不可用
    /// 则返回全零默认集（原生 + 全部已知代币）。
    pub async fn get_balances(
        &self,
        address: &str,
        network_id: &str,
    ) -> WalletResult<Vec<Balance>> {
        let network = self
            .registry
            .resolve(network_id)
            .ok_or_else(|| WalletError::UnsupportedNetwork(network_id.to_string()))?;

        crate::metrics::inc_balance_query();

        let endpoints = (self.endpoints)(network);
        for (idx, endpoint) in endpoints.iter().enumerate() {
            let attempt = match &network.family {
                ChainFamily::Evm { .. } => self.query_evm(network, endpoint, address).await,
                ChainFamily::Solana { .. } => self.query_solana(network, endpoint, address).await,
            };
            match attempt {
                Ok(balances) => {
                    if idx > 0 {
                        crate::metrics::inc_balance_fallback();
                    }
                    return Ok(balances);
                }
                Err(e) => {
                    tracing::warn!(
                        network = network.id,
                        endpoint = %endpoint,
                        error = %e,
                        "balance provider failed, trying next"
                    );
                }
            }
        }

        tracing::warn!(
            network = network.id,
            address = %address,
            "all balance providers exhausted, returning zero defaults"
        );
        crate::metrics::inc_balance_zero_default();
        Ok(Self::zero_defaults(network))
    }

    /// 全零默认集：原生资产在前，已知代币按注册顺序
    fn zero_defaults(network: &NetworkConfig) -> Vec<Balance> {
        let mut balances = vec![Balance::zero(Asset::native(
            network.native_symbol,
            network.native_decimals,
        ))];
        for token in &network.known_tokens {
            balances.push(Balance::zero(Asset {
                symbol: token.symbol.to_string(),
                decimals: token.decimals,
                token_ref: token.token_ref.clone(),
            }));
        }
        balances
    }

    async fn query_evm(
        &self,
        network: &NetworkConfig,
        endpoint: &str,
        address: &str,
    ) -> anyhow::Result<Vec<Balance>> {
        // 原生余额失败视为提供方故障，切换下一个端点
        let result = self
            .rpc
            .call(
                endpoint,
                "eth_getBalance",
                json!([address, "latest"]),
                READ_TIMEOUT,
            )
            .await?;
        let native_raw = result
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("eth_getBalance returned non-string result"))
            .and_then(amount::parse_hex_quantity)?;

        let mut balances = vec![Balance {
            asset: Asset::native(network.native_symbol, network.native_decimals),
            raw_amount: native_raw.to_string(),
        }];

        // 代币余额并发读取，单代币失败降级为零
        let token_reads = network.known_tokens.iter().filter_map(|token| {
            let contract = match &token.token_ref {
                TokenRef::ContractAddress(addr) => addr.as_str(),
                _ => return None,
            };
            Some(async move { (token, self.query_erc20(endpoint, contract, address).await) })
        });
        for (token, result) in futures::future::join_all(token_reads).await {
            let raw = match result {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        network = network.id,
                        token = token.symbol,
                        error = %e,
                        "token balance query failed, degrading to zero"
                    );
                    0
                }
            };
            balances.push(Balance {
                asset: Asset {
                    symbol: token.symbol.to_string(),
                    decimals: token.decimals,
                    token_ref: token.token_ref.clone(),
                },
                raw_amount: raw.to_string(),
            });
        }

        Ok(balances)
    }

    async fn query_erc20(
        &self,
        endpoint: &str,
        contract: &str,
        holder: &str,
    ) -> anyhow::Result<u128> {
        let data = super::evm_abi::balance_of_calldata(holder);
        let result = self
            .rpc
            .call(
                endpoint,
                "eth_call",
                json!([{"to": contract, "data": data}, "latest"]),
                READ_TIMEOUT,
            )
            .await?;
        let hex_value = result
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("eth_call returned non-string result"))?;
        // 空合约返回 "0x"
        if hex_value == "0x" {
            return Ok(0);
        }
        amount::parse_hex_quantity(hex_value)
    }

    async fn query_solana(
        &self,
        network: &NetworkConfig,
        endpoint: &str,
        address: &str,
    ) -> anyhow::Result<Vec<Balance>> {
        let result = self
            .rpc
            .call(endpoint, "getBalance", json!([address]), READ_TIMEOUT)
            .await?;
        let lamports = result
            .get("value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow::anyhow!("getBalance missing value field"))?;

        let mut balances = vec![Balance {
            asset: Asset::native(network.native_symbol, network.native_decimals),
            raw_amount: lamports.to_string(),
        }];

        // 代币账户扫描失败只降级代币部分
        match self.query_spl_accounts(network, endpoint, address).await {
            Ok(mut token_balances) => balances.append(&mut token_balances),
            Err(e) => {
                tracing::warn!(
                    network = network.id,
                    error = %e,
                    "token account scan failed, degrading to canonical zero"
                );
                if let Some(stable) = network.canonical_stable() {
                    balances.push(Balance::zero(Asset {
                        symbol: stable.symbol.to_string(),
                        decimals: stable.decimals,
                        token_ref: stable.token_ref.clone(),
                    }));
                }
            }
        }

        Ok(balances)
    }

    async fn query_spl_accounts(
        &self,
        network: &NetworkConfig,
        endpoint: &str,
        address: &str,
    ) -> anyhow::Result<Vec<Balance>> {
        let token_program = solana_tx::token_program_id().to_base58();
        let result = self
            .rpc
            .call(
                endpoint,
                "getTokenAccountsByOwner",
                json!([
                    address,
                    {"programId": token_program},
                    {"encoding": "jsonParsed"}
                ]),
                READ_TIMEOUT,
            )
            .await?;

        let accounts = result
            .get("value")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("getTokenAccountsByOwner missing value array"))?;

        let mut balances = Vec::new();
        for account in accounts {
            let info = account
                .pointer("/account/data/parsed/info")
                .ok_or_else(|| anyhow::anyhow!("token account missing parsed info"))?;
            let mint = info.get("mint").and_then(|m| m.as_str()).unwrap_or("");
            let token_amount = info
                .pointer("/tokenAmount/amount")
                .and_then(|a| a.as_str())
                .unwrap_or("0");

            let known = network.known_tokens.iter().find(|t| {
                matches!(&t.token_ref, TokenRef::MintAddress(m) if m == mint)
            });
            let asset = match known {
                Some(token) => Asset {
                    symbol: token.symbol.to_string(),
                    decimals: token.decimals,
                    token_ref: token.token_ref.clone(),
                },
                // 未知铸币占位符号，不丢弃余额
                None => Asset {
                    symbol: amount::short_identifier(mint),
                    decimals: info
                        .pointer("/tokenAmount/decimals")
                        .and_then(|d| d.as_u64())
                        .unwrap_or(0) as u8,
                    token_ref: TokenRef::MintAddress(mint.to_string()),
                },
            };
            balances.push(Balance {
                asset,
                raw_amount: token_amount.to_string(),
            });
        }

        // 规范稳定币始终出现在结果集中，即便账户不存在
        if let Some(stable) = network.canonical_stable() {
            let present = balances
                .iter()
                .any(|b| b.asset.token_ref == stable.token_ref);
            if !present {
                balances.push(Balance::zero(Asset {
                    symbol: stable.symbol.to_string(),
                    decimals: stable.decimals,
                    token_ref: stable.token_ref.clone(),
                }));
            }
        }

        Ok(balances)
    }
}
