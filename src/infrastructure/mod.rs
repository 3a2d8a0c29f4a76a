pub mod client_cache;
pub mod logging;
pub mod migration;
pub mod rpc;
