//! 服务层：账户解析、余额聚合、转账编排、费用估算

pub mod account_service;
pub mod balance_service;
pub mod custodial_backend;
pub mod evm_abi;
pub mod fee_service;
pub mod transfer_service;

pub use account_service::AccountService;
pub use balance_service::BalanceService;
pub use custodial_backend::{
    AccountNamespace, BackendAccount, CustodialBackend, HttpCustodialBackend,
};
pub use fee_service::FeeService;
pub use transfer_service::TransferService;
