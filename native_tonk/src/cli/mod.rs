use clap::Parser;
use std::path::PathBuf;

/// Server CLI for tonk-server
#[derive(Parser, Debug, Clone)]
#[command(name = "tonk-server", version, about = "Tonk table server")]
pub struct ServerCli {
    /// Path to config file
    #[arg(long, default_value = "tonk-server.toml")]
    pub config: PathBuf,

    /// Listen address (overrides config.listen_addr)
    #[arg(long)]
    pub listen: Option<String>,

    /// Redis URL for the shared table store (overrides config.redis_url)
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Persist CLI overrides back to the config file
    #[arg(long, default_value_t = false)]
    pub persist: bool,

    /// Enable verbose debug logging
    #[arg(long, short, default_value_t = false)]
    pub debug: bool,
}
