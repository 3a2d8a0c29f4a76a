//! 资产与转账值对象
//!
//! 金额不变式：一律使用最小单位的十进制整数字符串，任何环节不得
//! 出现浮点表示；人类可读换算属于展示层职责，不在本层。

use serde::{Deserialize, Serialize};

use crate::domain::chain::TokenRef;

/// 资产元数据（精度与引用为静态配置，不从余额查询反推）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub decimals: u8,
    pub token_ref: TokenRef,
}

impl Asset {
    pub fn native(symbol: &str, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            token_ref: TokenRef::Native,
        }
    }
}

/// 单笔余额：raw_amount 为最小单位整数字符串
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub asset: Asset,
    pub raw_amount: String,
}

impl Balance {
    pub fn zero(asset: Asset) -> Self {
        Self {
            asset,
            raw_amount: "0".to_string(),
        }
    }
}

/// 转账种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Native,
    Token,
}

/// 转账请求（提交前校验：地址格式 + 正整数金额）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_address: String,
    pub to_address: String,
    pub asset: Asset,
    /// 最小单位整数字符串
    pub raw_amount: String,
    /// 目标网络标识（注册表键）
    pub network_id: String,
}

/// 转账结果：托管后端确认提交后返回，不等待区块最终性
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub transaction_hash: String,
    pub explorer_url: String,
}
