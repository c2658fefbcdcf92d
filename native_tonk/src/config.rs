use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use std::fs;

/// Server configuration persisted as TOML.
///
/// Every tunable from the deployment surface lives here: listen address,
/// store backend, per-table stakes, the lock TTL, the round-transition
/// delay and the bot think time.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Address the HTTP/WebSocket server binds to.
    pub listen_addr: String,
    /// Redis URL for the shared table store. When absent the server runs on
    /// the in-process store (single-node deployments, tests).
    pub redis_url: Option<String>,
    /// Key prefix for the redis backend.
    pub redis_prefix: String,
    /// Minimum withdrawal accepted by the payments surface.
    pub min_withdrawal_amount: i64,
    /// Per-table critical-section lock TTL, in seconds.
    pub lock_ttl_secs: u64,
    /// Pause between a round ending and the next round starting, in seconds.
    pub round_transition_delay_secs: u64,
    /// Bot think time between turns, in milliseconds.
    pub bot_think_ms: u64,
    /// Opening balance granted when a joining user has no wallet yet.
    /// Absent disables the grant and unfunded users cannot sit down.
    pub grant_opening_balance: Option<i64>,
    /// Seeded tables.
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TableConfig {
    pub id: String,
    pub name: String,
    pub stake: i64,
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "127.0.0.1:3000".to_owned(),
            redis_url: None,
            redis_prefix: "tonk:".to_owned(),
            min_withdrawal_amount: 5,
            lock_ttl_secs: 10,
            round_transition_delay_secs: 30,
            bot_think_ms: 1000,
            grant_opening_balance: Some(1000),
            tables: vec![
                TableConfig {
                    id: "low-stakes".to_owned(),
                    name: "Low Stakes".to_owned(),
                    stake: 10,
                    min_players: 2,
                    max_players: 4,
                },
                TableConfig {
                    id: "high-stakes".to_owned(),
                    name: "High Stakes".to_owned(),
                    stake: 50,
                    min_players: 2,
                    max_players: 4,
                },
            ],
        }
    }
}

impl Config {
    /// Load configuration from `path`. If the file does not exist, create it
    /// with defaults and return those.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{}'", path.display()))?;
            let cfg: Config = toml::from_str(&s)
                .with_context(|| format!("parsing TOML config '{}'", path.display()))?;
            Ok(cfg)
        } else {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("creating config directory '{}'", parent.display())
                    })?;
                }
            }
            let cfg = Config::default();
            let toml_text = toml::to_string_pretty(&cfg)
                .with_context(|| "serializing default config to TOML")?;
            fs::write(path, toml_text)
                .with_context(|| format!("writing default config to '{}'", path.display()))?;
            Ok(cfg)
        }
    }

    /// Save the current config back to `path` (overwrites).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating config directory '{}'", parent.display()))?;
            }
        }
        let toml_text =
            toml::to_string_pretty(&self).with_context(|| "serializing config to TOML")?;
        fs::write(path, toml_text)
            .with_context(|| format!("writing config to '{}'", path.display()))?;
        Ok(())
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn round_transition_delay(&self) -> Duration {
        Duration::from_secs(self.round_transition_delay_secs)
    }

    pub fn bot_think_time(&self) -> Duration {
        Duration::from_millis(self.bot_think_ms)
    }

    pub fn table(&self, table_id: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.id == table_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.tables.len(), cfg.tables.len());
        assert_eq!(back.lock_ttl_secs, 10);
        assert_eq!(back.round_transition_delay_secs, 30);
        assert_eq!(back.min_withdrawal_amount, 5);
    }
}
