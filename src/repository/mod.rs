pub mod user_directory;
pub mod wallet_repository;

pub use user_directory::{PgUserDirectory, UserDirectory, UserProfile};
pub use wallet_repository::{
    InsertOutcome, NewWalletRecord, PgWalletRepository, WalletRecord, WalletRepository,
};
