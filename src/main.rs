use approval_sentinel::{
    config::Config,
    domain::Watchlist,
    error::{ErrorContext, Result, ResultExt},
    services::{
        ChainConnection, ChainEventSource, ChainFreezer, FreezeExecutor, SigningCredential,
        TokenContract,
    },
    ApiServer, ApprovalMonitor, BroadcastHub, FreezeEngine,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    initialize_environment();

    let config = Config::from_env().with_context(ErrorContext::new("load_config"))?;
    config
        .validate()
        .with_context(ErrorContext::new("validate_config"))?;

    info!("Starting Approval Sentinel");
    config.log_config();

    let watchlist = Arc::new(Watchlist::new());
    let hub = Arc::new(BroadcastHub::new());

    // The HTTP surface stays up even when the chain side is not configured.
    let monitor_handle = match start_monitoring(&config, watchlist.clone(), hub.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            ErrorContext::new("start_event_source").log_error(&e);
            warn!("Indexer will not connect to blockchain until configured");
            None
        }
    };

    let server = ApiServer::new(config.server.port, watchlist, hub);
    let result = server.run().await;

    if let Some(handle) = monitor_handle {
        handle.abort();
    }

    info!("Approval Sentinel shutdown complete");
    Ok(result?)
}

fn initialize_environment() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,approval_sentinel=debug")),
        )
        .init();
}

fn start_monitoring(
    config: &Config,
    watchlist: Arc<Watchlist>,
    hub: Arc<BroadcastHub>,
) -> Result<JoinHandle<()>> {
    let source = ChainEventSource::from_config(&config.chain)?;
    let connection = source.connection();

    let token = Arc::new(TokenContract::new(connection.clone(), source.token()));
    let engine = Arc::new(FreezeEngine::new(
        token,
        create_freeze_executor(config, connection),
        config.freeze.dest_domains.clone(),
        config.chain.token_decimals,
        hub.clone(),
    ));
    let monitor = ApprovalMonitor::new(watchlist, hub, engine, config.chain.token_decimals);

    let (sender, receiver) = mpsc::channel(config.chain.event_channel_capacity);

    tokio::spawn(async move {
        if let Err(e) = source.run(sender).await {
            error!("Chain event source error: {}", e);
        }
    });

    Ok(tokio::spawn(async move {
        if let Err(e) = monitor.run(receiver).await {
            error!("Monitor error: {}", e);
        }
    }))
}

fn create_freeze_executor(
    config: &Config,
    connection: Arc<ChainConnection>,
) -> Option<Arc<dyn FreezeExecutor>> {
    let (contract, key) = match config.freeze.action() {
        Ok(action) => action,
        Err(e) => {
            ErrorContext::new("configure_freeze_action").log_error(&e);
            return None;
        }
    };

    match key.signer() {
        Ok(signer) => info!("Freeze signer: {}", signer.address()),
        Err(e) => {
            ErrorContext::new("configure_freeze_action").log_error(&e);
            return None;
        }
    }

    if config.freeze.dest_domains.is_empty() {
        warn!("DESTINATION_DOMAINS is empty; freezes will not target any remote domain");
    }

    let credential: Arc<dyn SigningCredential> = Arc::new(key);
    Some(Arc::new(ChainFreezer::new(connection, contract, credential)))
}
