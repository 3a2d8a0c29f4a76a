//! 转账编排集成测试
//!
//! 前置校验失败必须零网络调用；EVM 后端直发路径可完全离线验证。

mod common;

use std::sync::Arc;

use chainvault::{
    domain::{Asset, NetworkConfig, TokenRef, TransferRequest, REGISTRY},
    error::WalletError,
    infrastructure::rpc::RpcClient,
    repository::WalletRecord,
    service::TransferService,
};
use common::{MemoryUserDirectory, MemoryWalletRepository, MockCustodialBackend};
use uuid::Uuid;

const SENDER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const RECIPIENT: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

fn unreachable_endpoints(_: &NetworkConfig) -> Vec<String> {
    vec!["http://127.0.0.1:1".to_string()]
}

struct Fixture {
    service: TransferService,
    backend: Arc<MockCustodialBackend>,
}

fn build_fixture() -> Fixture {
    let user_id = Uuid::new_v4();
    let wallets = Arc::new(MemoryWalletRepository::default());
    wallets.seed(WalletRecord {
        id: Uuid::new_v4(),
        user_id,
        chain_family: "evm".to_string(),
        address: SENDER.to_string(),
        external_account_ref: "acct-sender".to_string(),
        created_at: chrono::Utc::now(),
    });
    let users = Arc::new(MemoryUserDirectory::with_user(user_id, "+1 555 0100"));
    let backend = Arc::new(MockCustodialBackend::default());
    let service = TransferService::new(
        &REGISTRY,
        Arc::new(RpcClient::new()),
        backend.clone(),
        wallets,
        users,
        Box::new(unreachable_endpoints),
    );
    Fixture { service, backend }
}

fn native_request(to: &str, raw_amount: &str) -> TransferRequest {
    TransferRequest {
        from_address: SENDER.to_string(),
        to_address: to.to_string(),
        asset: Asset::native("ETH", 18),
        raw_amount: raw_amount.to_string(),
        network_id: "ethereum".to_string(),
    }
}

#[tokio::test]
async fn malformed_recipient_fails_before_any_network_call() {
    let fixture = build_fixture();
    let err = fixture
        .service
        .transfer(native_request("not-an-address", "1000"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidRecipientAddress(_)));
    assert_eq!(fixture.backend.total_network_calls(), 0);
}

#[tokio::test]
async fn bad_checksum_recipient_is_rejected() {
    let fixture = build_fixture();
    // 混合大小写但校验和错误
    let err = fixture
        .service
        .transfer(native_request(
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD",
            "1000",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidRecipientAddress(_)));
    assert_eq!(fixture.backend.total_network_calls(), 0);
}

#[tokio::test]
async fn non_positive_and_non_integer_amounts_are_rejected() {
    let fixture = build_fixture();
    for bad in ["0", "1.5", "-3", "", "1e9"] {
        let err = fixture
            .service
            .transfer(native_request(RECIPIENT, bad))
            .await
            .unwrap_err();
        assert!(
            matches!(err, WalletError::InvalidAmount(_)),
            "amount {:?} must be rejected as invalid",
            bad
        );
    }
    assert_eq!(fixture.backend.total_network_calls(), 0);
}

#[tokio::test]
async fn mismatched_asset_family_is_unknown_asset() {
    let fixture = build_fixture();
    let mut request = native_request(RECIPIENT, "1000");
    // Solana 铸币地址出现在 EVM 网络上
    request.asset = Asset {
        symbol: "USDC".to_string(),
        decimals: 6,
        token_ref: TokenRef::MintAddress(
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
        ),
    };
    let err = fixture.service.transfer(request).await.unwrap_err();
    assert!(matches!(err, WalletError::UnknownAsset(_)));
    assert_eq!(fixture.backend.total_network_calls(), 0);
}

#[tokio::test]
async fn entry_points_reject_mismatched_asset_kind() {
    let fixture = build_fixture();
    let usdc = REGISTRY.token_ref("ethereum", "USDC").unwrap();
    let token_request = TransferRequest {
        from_address: SENDER.to_string(),
        to_address: RECIPIENT.to_string(),
        asset: Asset {
            symbol: usdc.symbol.to_string(),
            decimals: usdc.decimals,
            token_ref: usdc.token_ref.clone(),
        },
        raw_amount: "1000".to_string(),
        network_id: "ethereum".to_string(),
    };
    let err = fixture
        .service
        .transfer_native(token_request)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::UnknownAsset(_)));

    let err = fixture
        .service
        .transfer_token(native_request(RECIPIENT, "1000"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::UnknownAsset(_)));
    assert_eq!(fixture.backend.total_network_calls(), 0);
}

#[tokio::test]
async fn unknown_sender_wallet_is_user_not_found() {
    let fixture = build_fixture();
    let mut request = native_request(RECIPIENT, "1000");
    request.from_address = "0xcccccccccccccccccccccccccccccccccccccccc".to_string();
    let err = fixture.service.transfer(request).await.unwrap_err();
    assert!(matches!(err, WalletError::UserNotFound(_)));
}

#[tokio::test]
async fn native_transfer_via_backend_send_returns_hash_and_explorer_url() {
    let fixture = build_fixture();
    let result = fixture
        .service
        .transfer_native(native_request(RECIPIENT, "1000000000000000"))
        .await
        .unwrap();
    assert!(result.transaction_hash.starts_with("0x"));
    assert_eq!(result.transaction_hash.len(), 66);
    assert!(result.explorer_url.contains(&result.transaction_hash));
    assert_eq!(fixture.backend.send_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn token_transfer_targets_contract_with_calldata() {
    let fixture = build_fixture();
    let usdc = REGISTRY.token_ref("ethereum", "USDC").unwrap();
    let request = TransferRequest {
        from_address: SENDER.to_string(),
        to_address: RECIPIENT.to_string(),
        asset: Asset {
            symbol: usdc.symbol.to_string(),
            decimals: usdc.decimals,
            token_ref: usdc.token_ref.clone(),
        },
        raw_amount: "2500000".to_string(),
        network_id: "ethereum".to_string(),
    };
    let result = fixture.service.transfer_token(request).await.unwrap();
    assert!(result.transaction_hash.starts_with("0x"));
    assert_eq!(fixture.backend.send_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn solana_transfer_with_dead_providers_never_reaches_signer() {
    let user_id = Uuid::new_v4();
    let wallets = Arc::new(MemoryWalletRepository::default());
    let sender = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";
    wallets.seed(WalletRecord {
        id: Uuid::new_v4(),
        user_id,
        chain_family: "solana".to_string(),
        address: sender.to_string(),
        external_account_ref: "acct-sol".to_string(),
        created_at: chrono::Utc::now(),
    });
    let users = Arc::new(MemoryUserDirectory::with_user(user_id, "+1 555 0101"));
    let backend = Arc::new(MockCustodialBackend::default());
    let service = TransferService::new(
        &REGISTRY,
        Arc::new(RpcClient::new()),
        backend.clone(),
        wallets,
        users,
        Box::new(unreachable_endpoints),
    );

    let request = TransferRequest {
        from_address: sender.to_string(),
        to_address: "7C4jsPZpht42Tw6MjXWF56Q5RQUocjBBmciEjDa8HRtp".to_string(),
        asset: Asset::native("SOL", 9),
        raw_amount: "5000000".to_string(),
        network_id: "solana".to_string(),
    };
    let err = service.transfer(request).await.unwrap_err();
    // blockhash 获取失败，签名后端不应被触达
    assert_ne!(err.kind(), "invalid_amount");
    assert_eq!(backend.sign_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}
