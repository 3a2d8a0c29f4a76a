//! JSON-RPC 客户端辅助
//!
//! 原始 reqwest + serde_json 负载，统一的超时与 JSON-RPC 错误提取。
//! 余额读取用个位数秒超时，交易提交允许更长（签名+广播较慢）。

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// 余额/只读查询超时
pub const READ_TIMEOUT: Duration = Duration::from_secs(8);
/// 交易提交超时
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RpcClient {
    http_client: reqwest::Client,
}

impl RpcClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http_client: client,
        }
    }

    /// 发起一次 JSON-RPC 调用并返回 result 字段
    pub async fn call(
        &self,
        rpc_url: &str,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        crate::metrics::inc_rpc_call(method);

        let response = self
            .http_client
            .post(rpc_url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("failed to send RPC request ({})", method))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read RPC response body")?;

        if !status.is_success() {
            crate::metrics::inc_rpc_err(method);
            anyhow::bail!("RPC request failed with status {}: {}", status, body);
        }

        let json: Value =
            serde_json::from_str(&body).context("failed to parse RPC JSON response")?;

        if let Some(error) = json.get("error") {
            crate::metrics::inc_rpc_err(method);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
            anyhow::bail!("RPC error {}: {}", code, message);
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| anyhow!("missing result field in RPC response ({})", method))
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

/// 校验 EVM 交易哈希格式（0x + 64 位十六进制）
pub fn validate_tx_hash(hash: &str) -> Result<String> {
    let hex_part = hash
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("tx hash must start with 0x: {}", hash))?;
    let decoded = hex::decode(hex_part)
        .map_err(|_| anyhow!("invalid tx hash format: {}", hash))?;
    if decoded.len() != 32 {
        anyhow::bail!("tx hash must be 32 bytes: {}", hash);
    }
    Ok(hash.to_string())
}
