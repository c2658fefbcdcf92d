//! Main entry point for the Tonk table server.

use native_tonk::{cli, config, server, store, wallet};

use anyhow::Context;
use clap::Parser;
use config::Config;
use server::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use store::{MemoryStore, RedisStore, TableStore};
use wallet::{InMemoryWalletStore, WalletStore};

/// Server entrypoint: parse CLI args, load config and run.
///
/// Usage:
///   tonk-server [--config PATH] [--listen ADDR] [--redis-url URL]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::ServerCli::parse();

    // If debug is on: show everything at DEBUG level; otherwise keep our
    // crates at INFO and quiet the rest.
    let log_filter = if cli.debug {
        "debug".to_string()
    } else {
        "native_tonk=info,tonk_shared=info,tower_http=warn,warn".to_string()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(cli.debug)
        .with_thread_ids(cli.debug)
        .with_file(cli.debug)
        .with_line_number(cli.debug)
        .init();

    let config_path: PathBuf = cli.config.clone();
    let mut cfg = Config::load_or_create(&config_path)
        .with_context(|| format!("loading or creating config '{}'", config_path.display()))?;

    // Apply CLI overrides in-memory (non-persistent by default).
    if let Some(listen) = cli.listen {
        cfg.listen_addr = listen;
    }
    if let Some(url) = cli.redis_url {
        cfg.redis_url = Some(url);
    }
    if cli.persist {
        cfg.save(&config_path)
            .with_context(|| format!("saving updated config '{}'", config_path.display()))?;
    }

    tracing::info!(
        config = %config_path.display(),
        tables = cfg.tables.len(),
        redis = cfg.redis_url.is_some(),
        "starting tonk server"
    );

    let table_store: Arc<dyn TableStore> = match &cfg.redis_url {
        Some(url) => Arc::new(
            RedisStore::new(url, cfg.redis_prefix.clone())
                .map_err(|e| anyhow::anyhow!(e.to_string()))
                .context("connecting redis table store")?,
        ),
        None => Arc::new(MemoryStore::new()),
    };
    // Wallets live in the external document store in production; the
    // in-memory implementation backs single-node deployments and tests.
    let wallets: Arc<dyn WalletStore> = Arc::new(InMemoryWalletStore::new());

    let addr: SocketAddr = cfg
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address '{}'", cfg.listen_addr))?;

    let state = AppState::new(cfg, table_store, wallets);
    server::run_server(addr, state).await?;
    Ok(())
}
