use std::path::PathBuf;

use anyhow::bail;
use kiosk_sdk::providers::ledger::{
    Client,
    KIOSK_LEDGER_MOCK_DATA_VAR,
    LedgerClient,
    LedgerClientConfig,
    MockLedger,
};
use kiosk_sdk::providers::wallet::{Wallet, WalletClient, WalletClientConfig};
use tracing::debug;

use crate::config::Config;

/// Initialize the ledger gateway client
///
/// - Initialize a mock client if the `_KIOSK_USE_LEDGER_MOCK` environment
///   variable points to a mock data file
/// - Initialize a real client otherwise
pub fn init_ledger_client(config: &Config) -> Result<Client, anyhow::Error> {
    if let Ok(path_str) = std::env::var(KIOSK_LEDGER_MOCK_DATA_VAR) {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            bail!("path to mock data file doesn't exist: {}", path.display());
        }

        debug!(mock_data_path = %path.display(), "using mock ledger client");
        Ok(MockLedger::new(Some(path))?.into())
    } else {
        let ledger_url = config.ledger_url();
        debug!("using ledger client with url: {}", ledger_url);
        Ok(LedgerClient::new(LedgerClientConfig { ledger_url }).into())
    }
}

/// Initialize the wallet provider client
pub fn init_wallet_client(config: &Config) -> Wallet {
    let wallet_url = config.wallet_url();
    debug!("using wallet client with url: {}", wallet_url);
    WalletClient::new(WalletClientConfig { wallet_url }).into()
}
