use std::{
    collections::HashMap,
    sync::{Mutex, OnceLock},
};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

struct MetricsState {
    rpc_call_total: u64,
    rpc_call_err: u64,
    per_method: HashMap<String, u64>,
    per_method_err: HashMap<String, u64>,
    // 余额聚合
    balance_query_total: u64,
    balance_provider_fallback: u64,
    balance_zero_default: u64,
    // 转账
    transfer_submit_ok: u64,
    transfer_submit_fail: u64,
    // 费用预估
    fee_estimate_fallback: u64,
}

fn state() -> &'static Mutex<MetricsState> {
    METRICS.get_or_init(|| {
        Mutex::new(MetricsState {
            rpc_call_total: 0,
            rpc_call_err: 0,
            per_method: HashMap::new(),
            per_method_err: HashMap::new(),
            balance_query_total: 0,
            balance_provider_fallback: 0,
            balance_zero_default: 0,
            transfer_submit_ok: 0,
            transfer_submit_fail: 0,
            fee_estimate_fallback: 0,
        })
    })
}

fn lock() -> std::sync::MutexGuard<'static, MetricsState> {
    match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

pub fn inc_rpc_call(method: &str) {
    let mut s = lock();
    s.rpc_call_total += 1;
    *s.per_method.entry(method.to_string()).or_insert(0) += 1;
}

pub fn inc_rpc_err(method: &str) {
    let mut s = lock();
    s.rpc_call_err += 1;
    *s.per_method_err.entry(method.to_string()).or_insert(0) += 1;
}

pub fn inc_balance_query() {
    lock().balance_query_total += 1;
}

pub fn inc_balance_fallback() {
    lock().balance_provider_fallback += 1;
}

pub fn inc_balance_zero_default() {
    lock().balance_zero_default += 1;
}

pub fn inc_transfer_ok() {
    lock().transfer_submit_ok += 1;
}

pub fn inc_transfer_fail() {
    lock().transfer_submit_fail += 1;
}

pub fn inc_fee_fallback() {
    lock().fee_estimate_fallback += 1;
}

/// 文本快照（运维排查用）
pub fn render_text() -> String {
    let s = lock();
    let mut out = String::new();
    out.push_str(&format!("rpc_call_total {}\n", s.rpc_call_total));
    out.push_str(&format!("rpc_call_err {}\n", s.rpc_call_err));
    for (method, count) in &s.per_method {
        out.push_str(&format!("rpc_call_total{{method=\"{}\"}} {}\n", method, count));
    }
    for (method, count) in &s.per_method_err {
        out.push_str(&format!("rpc_call_err{{method=\"{}\"}} {}\n", method, count));
    }
    out.push_str(&format!("balance_query_total {}\n", s.balance_query_total));
    out.push_str(&format!(
        "balance_provider_fallback {}\n",
        s.balance_provider_fallback
    ));
    out.push_str(&format!("balance_zero_default {}\n", s.balance_zero_default));
    out.push_str(&format!("transfer_submit_ok {}\n", s.transfer_submit_ok));
    out.push_str(&format!("transfer_submit_fail {}\n", s.transfer_submit_fail));
    out.push_str(&format!("fee_estimate_fallback {}\n", s.fee_estimate_fallback));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_snapshot() {
        inc_rpc_call("eth_getBalance");
        inc_balance_query();
        let text = render_text();
        assert!(text.contains("rpc_call_total"));
        assert!(text.contains("balance_query_total"));
    }
}
