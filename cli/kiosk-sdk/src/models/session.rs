use thiserror::Error;

use crate::data::Account;
use crate::providers::wallet::{Wallet, WalletError, WalletTrait};

/// Wallet-connection lifecycle.
///
/// The session account is fixed once connected: there is no disconnect path
/// and no reaction to the provider switching accounts underneath us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Account),
}

/// Tracks the wallet connection for one interactive session.
#[derive(Debug)]
pub struct WalletSession {
    wallet: Wallet,
    state: ConnectionState,
}

impl WalletSession {
    pub fn new(wallet: Wallet) -> Self {
        WalletSession {
            wallet,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// The connected account, if any.
    pub fn account(&self) -> Option<&Account> {
        match &self.state {
            ConnectionState::Connected(account) => Some(account),
            _ => None,
        }
    }

    /// Establish the session account from the wallet provider.
    ///
    /// Requests account access, then takes the first exposed account. A
    /// provider failure or an empty account list reverts the session to
    /// `Disconnected`. Connecting an already connected session is a no-op
    /// that returns the existing account.
    pub async fn connect(&mut self) -> Result<Account, ConnectError> {
        if let ConnectionState::Connected(account) = &self.state {
            return Ok(account.clone());
        }

        self.state = ConnectionState::Connecting;

        let connected = async {
            self.wallet
                .request_accounts()
                .await
                .map_err(ConnectError::Request)?;
            let accounts = self.wallet.accounts().await.map_err(ConnectError::Request)?;
            accounts.into_iter().next().ok_or(ConnectError::NoAccounts)
        }
        .await;

        match connected {
            Ok(account) => {
                tracing::debug!(%account, "wallet connected");
                self.state = ConnectionState::Connected(account.clone());
                Ok(account)
            },
            Err(err) => {
                tracing::debug!(error = %err, "wallet connection failed");
                self.state = ConnectionState::Disconnected;
                Err(err)
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("wallet connection failed")]
    Request(#[source] WalletError),
    #[error("wallet exposed no accounts")]
    NoAccounts,
}
