//! ChainVault - 多链托管钱包与转账编排层
//!
//! 托管模式：私钥由外部签名后端持有，本层只做账户解析、余额聚合、
//! 交易构造与提交编排。金额全程为最小单位的十进制整数字符串。

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod repository;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{WalletError, WalletResult};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{
            Asset, Balance, ChainFamily, NetworkRegistry, TokenRef, TransferKind,
            TransferRequest, TransferResult, REGISTRY,
        },
        error::{WalletError, WalletResult},
        service::{AccountService, BalanceService, CustodialBackend, FeeService, TransferService},
    };
}
