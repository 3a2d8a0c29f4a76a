//! 多链网络注册表
//!
//! 定义所有支持的链家族配置：链ID、原生币符号、知名代币地址、
//! 浏览器链接模板与RPC端点顺序。进程启动后只读，无任何 I/O。

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// 链家族：共享同一账户/交易模型的一类账本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// EVM 账户/合约模型（Ethereum, Base, BSC, Polygon）
    Evm { chain_id: u64 },
    /// Solana 账户模型（关联代币账户）
    Solana { cluster: &'static str },
}

impl ChainFamily {
    pub fn is_evm(&self) -> bool {
        matches!(self, ChainFamily::Evm { .. })
    }

    /// 链家族键：钱包目录与托管后端命名空间共用
    pub fn key(&self) -> &'static str {
        match self {
            ChainFamily::Evm { .. } => "evm",
            ChainFamily::Solana { .. } => "solana",
        }
    }
}

/// 代币引用：原生币 / EVM 合约地址 / Solana mint 地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRef {
    Native,
    ContractAddress(String),
    MintAddress(String),
}

/// EVM 签名路径：按网络选择，不按调用选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmSigningPath {
    /// 托管后端直接发送交易
    BackendSend,
    /// 本地组装交易 + 托管密钥签名 + 自行广播 eth_sendRawTransaction
    SelfManagedRaw,
}

/// 网络配置（进程启动时注册，之后只读）
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// 网络标识 ("ethereum", "base", "bsc", "polygon", "solana")
    pub id: &'static str,
    pub family: ChainFamily,
    /// 原生币符号
    pub native_symbol: &'static str,
    /// 原生币精度
    pub native_decimals: u8,
    /// 浏览器交易链接模板，带 {hash} 占位符
    pub explorer_tx_template: &'static str,
    /// 知名代币：符号 -> (引用, 精度)
    pub known_tokens: Vec<KnownToken>,
    /// RPC 端点，按优先级排序（主用网关在前，公共回退在后）
    pub rpc_endpoints: Vec<&'static str>,
    /// EVM 签名路径（Solana 网络忽略）
    pub evm_signing: EvmSigningPath,
}

/// 知名代币：合约/mint 地址静态配置，精度不依赖链上查询
#[derive(Debug, Clone)]
pub struct KnownToken {
    pub symbol: &'static str,
    pub decimals: u8,
    pub token_ref: TokenRef,
}

impl NetworkConfig {
    /// 查找本网络的代币引用
    pub fn token_ref(&self, symbol: &str) -> Option<&KnownToken> {
        self.known_tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// 本网络的规范稳定币（余额结果里始终包含，未持有时为零）
    pub fn canonical_stable(&self) -> Option<&KnownToken> {
        self.token_ref("USDC").or_else(|| self.token_ref("USDT"))
    }
}

/// 未识别网络的展示兜底模板（仅限展示用途，金融操作不得兜底）
const GENERIC_EXPLORER_TEMPLATE: &str = "https://blockscan.com/tx/{hash}";

/// 网络注册表
pub struct NetworkRegistry {
    networks: HashMap<&'static str, NetworkConfig>,
}

impl NetworkRegistry {
    /// 创建预配置的注册表
    pub fn new() -> Self {
        let mut registry = Self {
            networks: HashMap::new(),
        };
        registry.register_default_networks();
        registry
    }

    fn register_default_networks(&mut self) {
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // EVM 家族
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        self.register(NetworkConfig {
            id: "ethereum",
            family: ChainFamily::Evm { chain_id: 1 },
            native_symbol: "ETH",
            native_decimals: 18,
            explorer_tx_template: "https://etherscan.io/tx/{hash}",
            known_tokens: vec![
                KnownToken {
                    symbol: "USDC",
                    decimals: 6,
                    token_ref: TokenRef::ContractAddress(
                        "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
                    ),
                },
                KnownToken {
                    symbol: "USDT",
                    decimals: 6,
                    token_ref: TokenRef::ContractAddress(
                        "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(),
                    ),
                },
            ],
            rpc_endpoints: vec![
                "https://eth-mainnet.g.alchemy.com/v2/demo",
                "https://ethereum-rpc.publicnode.com",
            ],
            evm_signing: EvmSigningPath::BackendSend,
        });

        self.register(NetworkConfig {
            id: "base",
            family: ChainFamily::Evm { chain_id: 8453 },
            native_symbol: "ETH",
            native_decimals: 18,
            explorer_tx_template: "https://basescan.org/tx/{hash}",
            known_tokens: vec![KnownToken {
                symbol: "USDC",
                decimals: 6,
                token_ref: TokenRef::ContractAddress(
                    "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
                ),
            }],
            rpc_endpoints: vec![
                "https://base-mainnet.g.alchemy.com/v2/demo",
                "https://mainnet.base.org",
            ],
            evm_signing: EvmSigningPath::BackendSend,
        });

        // BSC 走自管签名路径：本地组装 + 托管密钥签名 + 自行广播
        self.register(NetworkConfig {
            id: "bsc",
            family: ChainFamily::Evm { chain_id: 56 },
            native_symbol: "BNB",
            native_decimals: 18,
            explorer_tx_template: "https://bscscan.com/tx/{hash}",
            known_tokens: vec![
                KnownToken {
                    symbol: "USDT",
                    decimals: 18,
                    token_ref: TokenRef::ContractAddress(
                        "0x55d398326f99059fF775485246999027B3197955".to_string(),
                    ),
                },
                KnownToken {
                    symbol: "USDC",
                    decimals: 18,
                    token_ref: TokenRef::ContractAddress(
                        "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d".to_string(),
                    ),
                },
            ],
            rpc_endpoints: vec![
                "https://bsc-dataseed.binance.org",
                "https://bsc-rpc.publicnode.com",
            ],
            evm_signing: EvmSigningPath::SelfManagedRaw,
        });

        self.register(NetworkConfig {
            id: "polygon",
            family: ChainFamily::Evm { chain_id: 137 },
            native_symbol: "POL",
            native_decimals: 18,
            explorer_tx_template: "https://polygonscan.com/tx/{hash}",
            known_tokens: vec![
                KnownToken {
                    symbol: "USDC",
                    decimals: 6,
                    token_ref: TokenRef::ContractAddress(
                        "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359".to_string(),
                    ),
                },
                KnownToken {
                    symbol: "USDT",
                    decimals: 6,
                    token_ref: TokenRef::ContractAddress(
                        "0xc2132D05D31c914a87C6611C10748AEb04B58e8F".to_string(),
                    ),
                },
            ],
            rpc_endpoints: vec![
                "https://polygon-rpc.com",
                "https://polygon-bor-rpc.publicnode.com",
            ],
            evm_signing: EvmSigningPath::BackendSend,
        });

        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // Solana 家族
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        self.register(NetworkConfig {
            id: "solana",
            family: ChainFamily::Solana {
                cluster: "mainnet-beta",
            },
            native_symbol: "SOL",
            native_decimals: 9,
            explorer_tx_template: "https://solscan.io/tx/{hash}",
            known_tokens: vec![
                KnownToken {
                    symbol: "USDC",
                    decimals: 6,
                    token_ref: TokenRef::MintAddress(
                        "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
                    ),
                },
                KnownToken {
                    symbol: "USDT",
                    decimals: 6,
                    token_ref: TokenRef::MintAddress(
                        "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB".to_string(),
                    ),
                },
            ],
            rpc_endpoints: vec![
                "https://api.mainnet-beta.solana.com",
                "https://solana-rpc.publicnode.com",
            ],
            evm_signing: EvmSigningPath::BackendSend,
        });
    }

    fn register(&mut self, config: NetworkConfig) {
        self.networks.insert(config.id, config);
    }

    /// 解析网络配置；未识别返回 None，由调用方转为 UnsupportedNetwork
    pub fn resolve(&self, network_id: &str) -> Option<&NetworkConfig> {
        self.networks.get(network_id.to_lowercase().as_str())
    }

    /// 查询某网络的代币引用
    pub fn token_ref(&self, network_id: &str, symbol: &str) -> Option<&KnownToken> {
        self.resolve(network_id)?.token_ref(symbol)
    }

    /// 生成浏览器交易链接（展示用途，未识别网络落到通用模板，不报错）
    pub fn explorer_url(&self, network_id: &str, tx_hash: &str) -> String {
        let template = self
            .resolve(network_id)
            .map(|n| n.explorer_tx_template)
            .unwrap_or(GENERIC_EXPLORER_TEMPLATE);
        template.replace("{hash}", tx_hash)
    }

    pub fn list_all(&self) -> Vec<&NetworkConfig> {
        self.networks.values().collect()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 进程级注册表实例
pub static REGISTRY: Lazy<NetworkRegistry> = Lazy::new(NetworkRegistry::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_networks() {
        let registry = NetworkRegistry::new();

        let eth = registry.resolve("ethereum").unwrap();
        assert_eq!(eth.family, ChainFamily::Evm { chain_id: 1 });
        assert_eq!(eth.native_symbol, "ETH");

        let sol = registry.resolve("solana").unwrap();
        assert!(!sol.family.is_evm());
        assert_eq!(sol.native_decimals, 9);

        // 大小写不敏感
        assert!(registry.resolve("Base").is_some());
        assert!(registry.resolve("tron").is_none());
    }

    #[test]
    fn test_token_ref_lookup() {
        let registry = NetworkRegistry::new();

        let usdc = registry.token_ref("ethereum", "usdc").unwrap();
        assert_eq!(usdc.decimals, 6);
        assert!(matches!(usdc.token_ref, TokenRef::ContractAddress(_)));

        let sol_usdc = registry.token_ref("solana", "USDC").unwrap();
        assert!(matches!(sol_usdc.token_ref, TokenRef::MintAddress(_)));

        assert!(registry.token_ref("ethereum", "DOGE").is_none());
    }

    #[test]
    fn test_explorer_url_substitution() {
        let registry = NetworkRegistry::new();

        let url = registry.explorer_url("base", "0xabc123");
        assert_eq!(url, "https://basescan.org/tx/0xabc123");
        assert_eq!(url.matches("0xabc123").count(), 1);

        // 未识别网络：展示兜底，不报错
        let generic = registry.explorer_url("no-such-chain", "0xdef");
        assert_eq!(generic, "https://blockscan.com/tx/0xdef");
    }

    #[test]
    fn test_every_network_has_fallback_endpoint() {
        let registry = NetworkRegistry::new();
        for net in registry.list_all() {
            assert!(
                net.rpc_endpoints.len() >= 2,
                "network {} needs a fallback endpoint",
                net.id
            );
        }
    }

    #[test]
    fn test_canonical_stable_present_everywhere() {
        let registry = NetworkRegistry::new();
        for net in registry.list_all() {
            assert!(net.canonical_stable().is_some(), "network {}", net.id);
        }
    }
}
