use clap::Parser;
use staking_indexer::{
    config::IndexerConfig,
    decode::AddressCodec,
    filter::{default_message_type_filters, FilterRegistry},
    ingestion::{ChainService, Processor, SyncSettings},
    parser::{register_staking_parsers, ParserRegistry},
    query::QueryService,
    record::ChainCheckpoint,
    rpc::HttpRpcClient,
    snapshot,
    store::IndexerStore,
    web, DEFAULT_CONFIG_FILE, LOG_FILE_PREFIX, RPC_TIMEOUT_SECS,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "staking-indexer", author, version, about, long_about = Some("Staking Indexer\n\n\
Index delegation, commission and reward activity of a Cosmos SDK chain"))]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = IndexerConfig::load(&cli.config)?;

    // setup tracing
    std::fs::create_dir_all(&config.log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    let stdout_layer = tracing_subscriber::fmt::layer();
    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(config.stdout_log_level()?))
        .with(file_layer.with_filter(config.file_log_level()?))
        .init();

    info!("Starting staking-indexer for chain {}", config.chain_name);
    let store = Arc::new(IndexerStore::new(&config.db_path())?);
    let rpc = Arc::new(HttpRpcClient::new(
        &config.rpc,
        Duration::from_secs(RPC_TIMEOUT_SECS),
    )?);

    let mut filters = FilterRegistry::default();
    for filter in default_message_type_filters()? {
        filters.add_message_type_filter(filter);
    }
    let mut parsers = ParserRegistry::default();
    register_staking_parsers(&mut parsers, &config.bond_denom);
    let processor = Processor::new(
        AddressCodec::new(&config.account_prefix),
        filters,
        parsers,
    );

    let service = ChainService::new(
        rpc.clone(),
        store.clone(),
        processor,
        ChainCheckpoint::new(&config.chain_name, &config.rpc),
        SyncSettings {
            poll_interval: config.poll_interval(),
            retry: config.retry_policy(),
            start_height: config.start_height,
        },
    )?;
    let sync_handle = tokio::spawn(service.run());
    tokio::spawn(snapshot::run_daily(
        rpc,
        store.clone(),
        config.bond_denom.clone(),
    ));

    let queries = QueryService::new(store, &config.chain_name);
    tokio::select! {
        outcome = sync_handle => match outcome {
            Ok(Ok(())) => info!("Sync stopped"),
            Ok(Err(e)) => error!("Sync failed: {e}"),
            Err(e) => error!("Sync task panicked: {e}"),
        },
        outcome = web::start_web_server(queries, config.port) => outcome?,
        outcome = wait_for_signal() => outcome?,
    }
    Ok(())
}

async fn wait_for_signal() -> std::io::Result<()> {
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = term.recv() => info!("Received SIGTERM"),
        _ = int.recv() => info!("Received SIGINT"),
    }
    Ok(())
}
