pub mod asset;
pub mod chain;
pub mod solana_tx;

pub use asset::{Asset, Balance, TransferKind, TransferRequest, TransferResult};
pub use chain::{ChainFamily, EvmSigningPath, NetworkConfig, NetworkRegistry, TokenRef, REGISTRY};
