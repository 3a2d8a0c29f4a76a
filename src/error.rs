//! 统一错误分类模块
//!
//! 对外层（API/调用方）暴露稳定的错误种类，内部的 provider 原始错误
//! 通过子串匹配归入分类，未命中的保留原始消息以便日志排查。

use thiserror::Error;

/// 钱包/转账编排层的对外错误分类
#[derive(Debug, Error)]
pub enum WalletError {
    /// 不支持的网络标识（金融操作必须显式失败，禁止默认兜底）
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// 上游用户元数据缺失
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// 托管后端账户创建失败（调用方可重试）
    #[error("custodial account creation failed: {0}")]
    AccountCreationFailed(String),

    /// 持久化失败（唯一约束竞争除外，竞争在本层内部消化）
    #[error("storage error: {0}")]
    StorageError(String),

    /// 收款地址不符合目标链格式
    #[error("invalid recipient address: {0}")]
    InvalidRecipientAddress(String),

    /// 金额必须是正整数字符串（最小单位）
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// 代币在目标网络无法解析
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("insufficient gas: {0}")]
    InsufficientGas(String),

    #[error("transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("nonce or sequence conflict: {0}")]
    NonceConflict(String),

    /// 转账提交超时：链上结果未知，本层不自动重试
    #[error("timeout: {0}")]
    Timeout(String),

    /// 余额读取专用：所有 provider 均不可用（被零余额兜底吸收，不对外抛出）
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl WalletError {
    /// 稳定的错误种类标识，供调用方选取文案与日志聚合
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::UnsupportedNetwork(_) => "unsupported_network",
            WalletError::UserNotFound(_) => "user_not_found",
            WalletError::AccountCreationFailed(_) => "account_creation_failed",
            WalletError::StorageError(_) => "storage_error",
            WalletError::InvalidRecipientAddress(_) => "invalid_recipient_address",
            WalletError::InvalidAmount(_) => "invalid_amount",
            WalletError::UnknownAsset(_) => "unknown_asset",
            WalletError::InsufficientFunds(_) => "insufficient_funds",
            WalletError::InsufficientGas(_) => "insufficient_gas",
            WalletError::TransactionRejected(_) => "transaction_rejected",
            WalletError::NonceConflict(_) => "nonce_conflict",
            WalletError::Timeout(_) => "timeout",
            WalletError::ProviderUnavailable(_) => "provider_unavailable",
            WalletError::Unknown(_) => "unknown",
        }
    }

    /// 将 provider/后端原始错误文本归入稳定分类
    ///
    /// 归类只保证"能选对文案"，不保证文案本身；未命中的文本原样
    /// 保留在 `Unknown` 里供日志排查。
    pub fn classify_provider_error(raw: &str) -> WalletError {
        let lower = raw.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return WalletError::Timeout(raw.to_string());
        }
        if lower.contains("insufficient funds")
            || lower.contains("insufficient balance")
            || lower.contains("insufficient lamports")
        {
            return WalletError::InsufficientFunds(raw.to_string());
        }
        if lower.contains("gas required exceeds")
            || lower.contains("intrinsic gas")
            || lower.contains("gas too low")
            || lower.contains("max fee per gas")
        {
            return WalletError::InsufficientGas(raw.to_string());
        }
        if lower.contains("nonce") || lower.contains("sequence") {
            return WalletError::NonceConflict(raw.to_string());
        }
        if lower.contains("rejected") || lower.contains("denied") {
            return WalletError::TransactionRejected(raw.to_string());
        }
        if lower.contains("connection refused")
            || lower.contains("dns error")
            || lower.contains("no healthy")
            || lower.contains("unreachable")
        {
            return WalletError::ProviderUnavailable(raw.to_string());
        }

        WalletError::Unknown(raw.to_string())
    }

    /// 归类 anyhow 错误：Display 只含最外层 context，必须用交替格式
    /// 展开整条因果链再做子串匹配，否则底层超时/资金不足会被外层
    /// 包装文本吞掉
    pub fn classify_error_chain(err: &anyhow::Error) -> WalletError {
        Self::classify_provider_error(&format!("{:#}", err))
    }
}

impl From<sqlx::Error> for WalletError {
    fn from(e: sqlx::Error) -> Self {
        WalletError::StorageError(e.to_string())
    }
}

pub type WalletResult<T> = Result<T, WalletError>;
