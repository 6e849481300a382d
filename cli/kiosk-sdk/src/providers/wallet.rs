use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Account;
use crate::kiosk::KIOSK_VERSION;

type MockField<T> = Arc<Mutex<T>>;

/// Either a client for the actual wallet provider daemon,
/// or a mock client for testing.
#[derive(Debug)]
#[enum_dispatch(WalletTrait)]
pub enum Wallet {
    Http(WalletClient),
    Mock(MockWallet),
}

#[derive(Debug, Clone)]
pub struct WalletClientConfig {
    pub wallet_url: String,
}

/// A client for the wallet provider daemon.
///
/// `request_accounts` asks the provider to expose its accounts to this
/// session (the provider may prompt its own user and refuse); `accounts`
/// lists what has been exposed. Only the first account is ever used.
#[derive(Debug)]
pub struct WalletClient {
    client: reqwest::Client,
    config: WalletClientConfig,
}

#[derive(Debug, Deserialize, Serialize)]
struct AccountsResponse {
    accounts: Vec<Account>,
}

impl WalletClient {
    pub fn new(config: WalletClientConfig) -> Self {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .user_agent(format!("kiosk-cli/{}", KIOSK_VERSION))
            .build()
            .unwrap();
        Self { client, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.wallet_url.trim_end_matches('/'), path)
    }
}

/// Mock responses for a [MockWallet], queued in call order.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalletResponse {
    Granted,
    Accounts { accounts: Vec<Account> },
    Error { status: u16, message: String },
}

/// A wallet client that can be seeded with mock responses
#[derive(Debug, Default)]
pub struct MockWallet {
    pub mock_responses: MockField<VecDeque<WalletResponse>>,
}

impl MockWallet {
    /// Push a successful account-request grant
    pub fn push_granted_response(&mut self) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(WalletResponse::Granted);
    }

    /// Push an account listing
    pub fn push_accounts_response(&mut self, accounts: Vec<Account>) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(WalletResponse::Accounts { accounts });
    }

    /// Push a provider failure
    pub fn push_error_response(&mut self, status: u16, message: impl AsRef<str>) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(WalletResponse::Error {
                status,
                message: message.as_ref().to_string(),
            });
    }

    fn pop_response(&self) -> Option<WalletResponse> {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front()
    }
}

#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait WalletTrait {
    /// Ask the provider to expose its accounts to this session.
    ///
    /// The provider may put its own confirmation in front of this and reject.
    async fn request_accounts(&self) -> Result<(), WalletError>;

    /// The accounts currently exposed to this session, in provider order.
    async fn accounts(&self) -> Result<Vec<Account>, WalletError>;
}

impl WalletTrait for WalletClient {
    async fn request_accounts(&self) -> Result<(), WalletError> {
        tracing::debug!("requesting wallet accounts");
        let response = self
            .client
            .post(self.endpoint("accounts/request"))
            .send()
            .await
            .map_err(WalletError::Request)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WalletError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Account>, WalletError> {
        let response = self
            .client
            .get(self.endpoint("accounts"))
            .send()
            .await
            .map_err(WalletError::Request)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WalletError::Status {
                status: status.as_u16(),
                message,
            });
        }
        let listed: AccountsResponse = response.json().await.map_err(WalletError::Request)?;
        Ok(listed.accounts)
    }
}

impl WalletTrait for MockWallet {
    async fn request_accounts(&self) -> Result<(), WalletError> {
        let mock_resp = self.pop_response();
        match mock_resp {
            Some(WalletResponse::Granted) => Ok(()),
            Some(WalletResponse::Error { status, message }) => {
                Err(WalletError::Status { status, message })
            },
            _ => panic!("expected granted response, found {:?}", &mock_resp),
        }
    }

    async fn accounts(&self) -> Result<Vec<Account>, WalletError> {
        let mock_resp = self.pop_response();
        match mock_resp {
            Some(WalletResponse::Accounts { accounts }) => Ok(accounts),
            Some(WalletResponse::Error { status, message }) => {
                Err(WalletError::Status { status, message })
            },
            _ => panic!("expected accounts response, found {:?}", &mock_resp),
        }
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet request failed")]
    Request(#[source] reqwest::Error),
    #[error("wallet provider returned status {status}: {message}")]
    Status { status: u16, message: String },
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn accounts_are_normalized_on_the_way_in() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/accounts");
            then.status(200).json_body(json!({
                "accounts": ["0xAB00000000000000000000000000000000000001"],
            }));
        });

        let client = WalletClient::new(WalletClientConfig {
            wallet_url: server.base_url(),
        });
        let accounts = client.accounts().await.unwrap();
        assert_eq!(
            accounts,
            vec![Account::new("0xab00000000000000000000000000000000000001")]
        );
        mock.assert();
    }

    #[tokio::test]
    async fn rejected_request_maps_to_status_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/accounts/request");
            then.status(403).body("user rejected the request");
        });

        let client = WalletClient::new(WalletClientConfig {
            wallet_url: server.base_url(),
        });
        let err = client.request_accounts().await.unwrap_err();
        assert!(matches!(err, WalletError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn mock_wallet_pops_in_order() {
        let mut mock = MockWallet::default();
        mock.push_granted_response();
        mock.push_accounts_response(vec![Account::new("0xaa")]);

        mock.request_accounts().await.unwrap();
        let accounts = mock.accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
    }
}
