//! 余额聚合与费用估算集成测试
//!
//! 全部网络在提供方不可用时的行为契约：余额给零默认集，费用给
//! 兜底估算，两者都不报错。

use std::sync::Arc;

use chainvault::{
    domain::{NetworkConfig, TokenRef, TransferKind, REGISTRY},
    infrastructure::rpc::RpcClient,
    service::{BalanceService, FeeService},
};

fn unreachable_endpoints(_: &NetworkConfig) -> Vec<String> {
    vec![
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:2".to_string(),
    ]
}

fn balance_service() -> BalanceService {
    BalanceService::new(
        &REGISTRY,
        Arc::new(RpcClient::new()),
        Box::new(unreachable_endpoints),
    )
}

fn fee_service() -> FeeService {
    FeeService::new(
        &REGISTRY,
        Arc::new(RpcClient::new()),
        Box::new(unreachable_endpoints),
    )
}

#[tokio::test]
async fn every_network_degrades_to_full_zero_set() {
    let service = balance_service();
    for network in REGISTRY.list_all() {
        let address = match &network.family {
            f if f.is_evm() => "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            _ => "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T",
        };
        let balances = service.get_balances(address, network.id).await.unwrap();

        assert_eq!(
            balances.len(),
            1 + network.known_tokens.len(),
            "network {} must surface native plus all known tokens",
            network.id
        );
        assert_eq!(balances[0].asset.symbol, network.native_symbol);
        assert_eq!(balances[0].asset.token_ref, TokenRef::Native);
        for balance in &balances {
            assert_eq!(balance.raw_amount, "0");
            assert!(
                balance.raw_amount.chars().all(|c| c.is_ascii_digit()),
                "raw amounts are integer strings, never floats"
            );
        }
    }
}

#[tokio::test]
async fn canonical_stable_is_present_on_every_network() {
    let service = balance_service();
    for network in REGISTRY.list_all() {
        let address = match &network.family {
            f if f.is_evm() => "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            _ => "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T",
        };
        let balances = service.get_balances(address, network.id).await.unwrap();
        let stable = network.canonical_stable().unwrap();
        assert!(
            balances.iter().any(|b| b.asset.symbol == stable.symbol),
            "network {} must always include {}",
            network.id,
            stable.symbol
        );
    }
}

#[tokio::test]
async fn fee_estimates_match_display_pattern_on_every_network() {
    let service = fee_service();
    for network in REGISTRY.list_all() {
        for kind in [TransferKind::Native, TransferKind::Token] {
            let fee = service.estimate(network.id, kind).await;

            let rest = fee.strip_prefix('~').unwrap_or_else(|| {
                panic!("fee {:?} on {} must start with ~", fee, network.id)
            });
            let (number, symbol) = rest
                .split_once(' ')
                .unwrap_or_else(|| panic!("fee {:?} must be '<number> <symbol>'", fee));
            assert!(number.parse::<f64>().is_ok(), "unparsable fee number {:?}", number);
            assert_eq!(symbol, network.native_symbol);
        }
    }
}

#[tokio::test]
async fn token_fee_is_never_below_native_fee() {
    let service = fee_service();
    for network in REGISTRY.list_all() {
        let native = service.estimate(network.id, TransferKind::Native).await;
        let token = service.estimate(network.id, TransferKind::Token).await;
        let parse = |s: &str| -> f64 {
            s.trim_start_matches('~')
                .split(' ')
                .next()
                .unwrap()
                .parse()
                .unwrap()
        };
        assert!(
            parse(&token) >= parse(&native),
            "token transfers cost at least as much as native on {}",
            network.id
        );
    }
}
