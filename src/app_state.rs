//! 应用状态
//! 聚合所有共享资源，服务按依赖顺序装配

use std::{sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;

use crate::{
    config::Config,
    domain::chain::{NetworkConfig, REGISTRY},
    infrastructure::{
        client_cache::{ClientHandleCache, SystemClock},
        migration,
        rpc::RpcClient,
    },
    repository::{PgUserDirectory, PgWalletRepository},
    service::{
        AccountService, BalanceService, FeeService, HttpCustodialBackend, TransferService,
    },
};

pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: Arc<Config>,
    pub account_service: Arc<AccountService>,
    pub balance_service: Arc<BalanceService>,
    pub transfer_service: Arc<TransferService>,
    pub fee_service: Arc<FeeService>,
    pub handle_cache: Arc<ClientHandleCache>,
}

fn endpoint_resolver(
    config: Arc<Config>,
) -> Box<dyn Fn(&NetworkConfig) -> Vec<String> + Send + Sync> {
    Box::new(move |network| config.rpc_endpoints_for(network))
}

impl AppState {
    /// 创建应用状态：连库、迁移、装配服务并启动后台清扫
    pub async fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
            .connect(&config.database.url)
            .await?;
        migration::run_migrations(&pool).await?;

        let rpc = Arc::new(RpcClient::new());
        let backend = Arc::new(HttpCustodialBackend::new(&config.custodial));
        let wallets = Arc::new(PgWalletRepository::new(pool.clone()));
        let users = Arc::new(PgUserDirectory::new(pool.clone()));

        let handle_cache = Arc::new(ClientHandleCache::new(Arc::new(SystemClock)));
        tokio::spawn(handle_cache.clone().start_eviction_sweep());

        let account_service = Arc::new(AccountService::new(
            &REGISTRY,
            wallets.clone(),
            users.clone(),
            backend.clone(),
            handle_cache.clone(),
        ));
        let balance_service = Arc::new(BalanceService::new(
            &REGISTRY,
            rpc.clone(),
            endpoint_resolver(config.clone()),
        ));
        let transfer_service = Arc::new(TransferService::new(
            &REGISTRY,
            rpc.clone(),
            backend,
            wallets,
            users,
            endpoint_resolver(config.clone()),
        ));
        let fee_service = Arc::new(FeeService::new(
            &REGISTRY,
            rpc,
            endpoint_resolver(config.clone()),
        ));

        Ok(Self {
            pool,
            config,
            account_service,
            balance_service,
            transfer_service,
            fee_service,
            handle_cache,
        })
    }
}
