use std::path::PathBuf;
use std::{env, fs};

use anyhow::{Context, Result};
use config::{Config as HierarchicalConfig, Environment};
use serde::{Deserialize, Serialize};
use tracing::debug;
use xdg::BaseDirectories;

/// Name of kiosk managed directories (config, cache)
const KIOSK_DIR_NAME: &str = "kiosk";
const KIOSK_CONFIG_DIR_VAR: &str = "KIOSK_CONFIG_DIR";
pub const KIOSK_CONFIG_FILE: &str = "kiosk.toml";

pub const DEFAULT_LEDGER_URL: &str = "http://localhost:7770";
pub const DEFAULT_WALLET_URL: &str = "http://localhost:7771";

#[derive(Clone, Debug, Deserialize, Default, Serialize)]
pub struct Config {
    /// kiosk configuration options
    #[serde(default, flatten)]
    pub kiosk: KioskConfig,
}

/// Describes the configuration for the kiosk CLI
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct KioskConfig {
    /// Directory where kiosk loads its configuration file (default:
    /// `$XDG_CONFIG_HOME/kiosk`)
    pub config_dir: PathBuf,
    /// Directory for ephemeral data (default: `$XDG_CACHE_HOME/kiosk`)
    pub cache_dir: PathBuf,

    /// Base URL of the ledger gateway daemon
    pub ledger_url: Option<String>,

    /// Base URL of the wallet provider daemon
    pub wallet_url: Option<String>,
}

impl Config {
    /// Load the layered configuration: defaults, then the TOML file in the
    /// config dir, then `KIOSK_`-prefixed environment variables.
    pub fn parse() -> Result<Config> {
        let kiosk_dirs = BaseDirectories::with_prefix(KIOSK_DIR_NAME);

        let cache_dir = kiosk_dirs
            .get_cache_home()
            .unwrap_or_else(|| env::temp_dir().join(KIOSK_DIR_NAME));

        let config_dir = match env::var(KIOSK_CONFIG_DIR_VAR) {
            Ok(v) => {
                debug!("`${KIOSK_CONFIG_DIR_VAR}` set: {v}");
                PathBuf::from(v)
            },
            Err(_) => kiosk_dirs
                .get_config_home()
                .unwrap_or_else(|| env::temp_dir().join(KIOSK_DIR_NAME)),
        };
        fs::create_dir_all(&config_dir)
            .context(format!("Could not create config directory: {config_dir:?}"))?;

        let builder = HierarchicalConfig::builder()
            .set_default("cache_dir", cache_dir.to_string_lossy().as_ref())?
            // Config dir is added to the config for completeness;
            // the config file cannot change the config dir.
            .set_override("config_dir", config_dir.to_string_lossy().as_ref())?
            .add_source(
                config::File::from(config_dir.join(KIOSK_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            // override via environment variables
            .add_source(Environment::with_prefix("KIOSK"));

        let config: Config = builder
            .build()?
            .try_deserialize()
            .context("Could not parse config")?;
        Ok(config)
    }

    pub fn ledger_url(&self) -> String {
        self.kiosk
            .ledger_url
            .clone()
            .unwrap_or_else(|| DEFAULT_LEDGER_URL.to_string())
    }

    pub fn wallet_url(&self) -> String {
        self.kiosk
            .wallet_url
            .clone()
            .unwrap_or_else(|| DEFAULT_WALLET_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn urls_fall_back_to_defaults() {
        let config = Config::default();
        assert_eq!(config.ledger_url(), DEFAULT_LEDGER_URL);
        assert_eq!(config.wallet_url(), DEFAULT_WALLET_URL);
    }

    #[test]
    fn configured_urls_win() {
        let config = Config {
            kiosk: KioskConfig {
                ledger_url: Some("http://ledger.example:1234".to_string()),
                wallet_url: Some("http://wallet.example:5678".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(config.ledger_url(), "http://ledger.example:1234");
        assert_eq!(config.wallet_url(), "http://wallet.example:5678");
    }
}
