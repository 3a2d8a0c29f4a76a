//! 展示用手续费估算
//!
//! 估算永不失败：EVM 网络实时 gasPrice 不可用时退回每网络硬编码
//! 兜底值；Solana 直接用固定费率不走 RPC。输出是展示字符串，不参与
//! 任何链上计算，格式固定为 "~<数值> <符号>"。

use std::sync::Arc;

use serde_json::json;

use crate::{
    domain::{
        asset::TransferKind,
        chain::{ChainFamily, NetworkConfig, NetworkRegistry},
    },
    infrastructure::rpc::{RpcClient, READ_TIMEOUT},
    utils::amount,
};

/// EVM 原生转账 gas 用量
const EVM_NATIVE_GAS: u128 = 21_000;
/// ERC20 转账典型 gas 用量（展示口径）
const EVM_TOKEN_GAS: u128 = 65_000;

/// Solana 单签名基础费（lamports）
const SOLANA_BASE_FEE_LAMPORTS: u128 = 5_000;
/// ATA 租金豁免押金（lamports），代币转账按需建户的最坏情况
const SOLANA_ATA_RENT_LAMPORTS: u128 = 2_039_280;

/// 每网络 gasPrice 兜底值（wei）
fn fallback_gas_price(network_id: &str) -> u128 {
    match network_id {
        "ethereum" => 30_000_000_000, // 30 gwei
        "base" => 100_000_000,        // 0.1 gwei
        "bsc" => 3_000_000_000,       // 3 gwei
        "polygon" => 40_000_000_000,  // 40 gwei
        _ => 20_000_000_000,
    }
}

pub struct FeeService {
    registry: &'static NetworkRegistry,
    rpc: Arc<RpcClient>,
    endpoints: Box<dyn Fn(&NetworkConfig) -> Vec<String> + Send + Sync>,
}

impl FeeService {
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

    /// 估算一笔转账的展示手续费，形如 "~0.00063 ETH"
    pub async fn estimate(&self, network_id: &str, kind: TransferKind) -> String {
        let network = match self.registry.resolve(network_id) {
            Some(n) => n,
            None => return "~0.001 UNITS".to_string(),
        };

        let raw_fee = match &network.family {
            ChainFamily::Evm { .. } => {
                let gas = match kind {
                    TransferKind::Native => EVM_NATIVE_GAS,
                    TransferKind::Token => EVM_TOKEN_GAS,
                };
                // provider 返回的 gasPrice 不可信，乘法溢出同样走兜底
                match self.evm_gas_price(network).await.checked_mul(gas) {
                    Some(fee) => fee,
                    None => {
                        crate::metrics::inc_fee_fallback();
                        tracing::warn!(
                            network = network.id,
                            "gas price out of plausible range, using fallback constant"
                        );
                        fallback_gas_price(network.id) * gas
                    }
                }
            }
            ChainFamily::Solana { .. } => match kind {
                TransferKind::Native => SOLANA_BASE_FEE_LAMPORTS,
                // 最坏情况包含收款方建户租金
                TransferKind::Token => SOLANA_BASE_FEE_LAMPORTS + SOLANA_ATA_RENT_LAMPORTS,
            },
        };

        format!(
            "~{} {}",
            amount::format_units(raw_fee, network.native_decimals),
            network.native_symbol
        )
    }

    /// 实时 gasPrice，全部端点失败时退回硬编码值
    async fn evm_gas_price(&self, network: &NetworkConfig) -> u128 {
        for endpoint in (self.endpoints)(network) {
            match self
                .rpc
                .call(&endpoint, "eth_gasPrice", json!([]), READ_TIMEOUT)
                .await
            {
                Ok(result) => {
                    if let Some(price) = result.as_str().and_then(|s| {
                        amount::parse_hex_quantity(s).ok().filter(|p| *p > 0)
                    }) {
                        return price;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        network = network.id,
                        endpoint = %endpoint,
                        error = %e,
                        "gas price endpoint failed"
                    );
                }
            }
        }
        crate::metrics::inc_fee_fallback();
        tracing::warn!(
            network = network.id,
            "live gas price unavailable, using fallback constant"
        );
        fallback_gas_price(network.id)
    }
}
