use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use market_sentinel::{
    Engine,
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{read_config_file, write_example_config},
    exchange::{ExchangeRegistry, create_market_client},
    notify::{Dispatcher, Notifier},
    util,
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file, an example is written when it does not exist
    #[arg(short, long, default_value = "config.json")]
    file: String,

    /// Address to bind the HTTP API to [env: SENTINEL_ADDR]
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port of the HTTP API [env: SENTINEL_PORT]
    #[arg(short, long)]
    port: Option<u16>,

    /// Log everything down to trace level
    #[arg(long)]
    debug: bool,
}

fn init(debug: bool) {
    let level = if debug {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("market_sentinel", level),
        ("sentinel_hub", level),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.debug);
    trace!("started with args: {args:?}");

    if !Path::new(&args.file).exists() {
        write_example_config(&args.file)?;
        warn!(
            "config file {} not found, an example was written there; edit it and start again",
            args.file
        );
        return Ok(());
    }

    let config = read_config_file(&args.file)?;

    let client = create_market_client();
    let dispatcher = Dispatcher::from_config(client.clone(), &config.webhook);
    if dispatcher.is_empty() {
        warn!("no notification channel configured, alerts are only logged");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(dispatcher);

    let engine = Engine::start(
        &config,
        ExchangeRegistry::with_public_clients(client.clone()),
        notifier,
        client,
    );

    let api_config = ApiConfig {
        bind_addr: SocketAddr::new(
            args.host.unwrap_or_else(|| util::get_addr().into()),
            args.port.unwrap_or_else(util::get_port),
        ),
        auth_token: util::get_secret(),
        enable_cors: true,
    };
    let addr = spawn_api_server(api_config, ApiState::from_engine(&engine)).await?;
    info!("sentinel hub running, api on http://{addr}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    engine.shutdown().await
}
