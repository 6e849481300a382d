use crate::models::marketplace::Marketplace;
use crate::models::session::WalletSession;
use crate::providers::ledger::Client;
use crate::providers::wallet::Wallet;

pub const KIOSK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The main API struct for one kiosk session.
///
/// A [Kiosk] holds the marketplace controller and the wallet session for a
/// single CLI invocation. One invocation runs on the same instance but may
/// call different methods.
#[derive(Debug)]
pub struct Kiosk {
    pub marketplace: Marketplace,
    pub session: WalletSession,
}

impl Kiosk {
    pub fn new(ledger: Client, wallet: Wallet) -> Self {
        Kiosk {
            marketplace: Marketplace::new(ledger),
            session: WalletSession::new(wallet),
        }
    }
}
