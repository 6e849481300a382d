use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use enum_dispatch::enum_dispatch;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::TokenId;
use crate::kiosk::KIOSK_VERSION;
use crate::models::market::MarketItem;

pub const KIOSK_LEDGER_MOCK_DATA_VAR: &str = "_KIOSK_USE_LEDGER_MOCK";

// Arc allows seeding responses from outside the client,
// Mutex shares the queue across threads (tokio).
type MockField<T> = Arc<Mutex<T>>;

/// Wire representation of one item slot on the ledger.
///
/// Prices are decimal strings: they are 18-decimal fixed-point integers and
/// would not survive JSON number precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResponse {
    pub token_id: TokenId,
    pub owner: String,
    pub price: String,
    pub for_sale: bool,
}

impl From<&MarketItem> for ItemResponse {
    fn from(item: &MarketItem) -> Self {
        ItemResponse {
            token_id: item.token_id,
            owner: item.owner.to_string(),
            price: item.price.to_string(),
            for_sale: item.for_sale,
        }
    }
}

/// Confirmation artifact returned after the ledger accepts a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: String,
}

/// An error response that can stand in for any failed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Item(ItemResponse),
    Receipt(Receipt),
    Error(GenericResponse),
}

#[derive(Debug, Error)]
pub enum MockDataError {
    /// Failed to read the JSON file pointed at by the _KIOSK_USE_LEDGER_MOCK var
    #[error("failed to read mock response file")]
    ReadMockFile(#[source] std::io::Error),
    /// Failed to parse the contents of the mock data file as JSON
    #[error("failed to parse mock data as JSON")]
    ParseJson(#[source] serde_json::Error),
}

/// Reads a list of mock responses from disk.
fn read_mock_responses(path: impl AsRef<Path>) -> Result<VecDeque<Response>, MockDataError> {
    let mut responses = VecDeque::new();
    let contents = std::fs::read_to_string(path).map_err(MockDataError::ReadMockFile)?;
    let deserialized: Vec<Response> =
        serde_json::from_str(&contents).map_err(MockDataError::ParseJson)?;
    responses.extend(deserialized);
    Ok(responses)
}

/// Either a client for the actual ledger gateway,
/// or a mock client for testing.
#[derive(Debug)]
#[enum_dispatch(LedgerTrait)]
pub enum Client {
    Ledger(LedgerClient),
    Mock(MockLedger),
}

#[derive(Debug, Clone)]
pub struct LedgerClientConfig {
    pub ledger_url: String,
}

/// A client for the ledger gateway daemon.
///
/// The gateway fronts the marketplace contract and exposes one read and four
/// mutations as plain JSON over HTTP.
#[derive(Debug)]
pub struct LedgerClient {
    client: reqwest::Client,
    config: LedgerClientConfig,
}

impl LedgerClient {
    pub fn new(config: LedgerClientConfig) -> Self {
        Self {
            client: Self::create_client(),
            config,
        }
    }

    fn create_client() -> reqwest::Client {
        let conn_timeout = Duration::from_secs(15);
        let req_timeout = Duration::from_secs(60);
        reqwest::ClientBuilder::new()
            .connect_timeout(conn_timeout)
            .timeout(req_timeout)
            .user_agent(format!("kiosk-cli/{}", KIOSK_VERSION))
            .build()
            .unwrap()
    }

    fn endpoint(&self, path: impl AsRef<str>) -> String {
        format!(
            "{}/{}",
            self.config.ledger_url.trim_end_matches('/'),
            path.as_ref()
        )
    }

    async fn expect_json<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, LedgerClientError> {
        let response = request.send().await.map_err(LedgerClientError::Request)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LedgerClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response.json().await.map_err(LedgerClientError::Request)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MintRequest {
    price: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuyRequest {
    token_id: TokenId,
    price: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SetPriceRequest {
    price: String,
}

/// A ledger client that can be seeded with mock responses
#[derive(Debug, Default)]
pub struct MockLedger {
    pub mock_responses: MockField<VecDeque<Response>>,
}

impl MockLedger {
    /// Create a new mock client, potentially reading mock responses from disk
    pub fn new(mock_data_path: Option<impl AsRef<Path>>) -> Result<Self, MockDataError> {
        let mock_responses = if let Some(path) = mock_data_path {
            read_mock_responses(&path)?
        } else {
            VecDeque::new()
        };
        Ok(Self {
            mock_responses: Arc::new(Mutex::new(mock_responses)),
        })
    }

    /// Push an existing item into the list of mock responses
    pub fn push_item_response(&mut self, item: &MarketItem) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(Response::Item(item.into()));
    }

    /// Push a sentinel-owned item response, ending a catalog scan at `token_id`
    pub fn push_vacant_response(&mut self, token_id: TokenId) {
        self.push_item_response(&MarketItem::vacant(token_id));
    }

    /// Push a receipt into the list of mock responses
    pub fn push_receipt_response(&mut self, transaction_hash: impl AsRef<str>) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(Response::Receipt(Receipt {
                transaction_hash: transaction_hash.as_ref().to_string(),
            }));
    }

    /// Push an error into the list of mock responses
    pub fn push_error_response(&mut self, status: u16, message: impl AsRef<str>) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(Response::Error(GenericResponse {
                status,
                message: message.as_ref().to_string(),
            }));
    }

    /// Number of responses still queued; lets tests assert how many reads a
    /// scan actually issued.
    pub fn remaining_responses(&self) -> usize {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .len()
    }

    fn pop_response(&self) -> Option<Response> {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front()
    }

    fn pop_receipt(&self) -> Result<Receipt, LedgerClientError> {
        let mock_resp = self.pop_response();
        match mock_resp {
            Some(Response::Receipt(receipt)) => Ok(receipt),
            Some(Response::Error(err)) => Err(LedgerClientError::Status {
                status: err.status,
                message: err.message,
            }),
            _ => panic!("expected receipt response, found {:?}", &mock_resp),
        }
    }
}

#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait LedgerTrait {
    /// Read the item slot for `token_id`.
    ///
    /// Reads of ids that were never minted succeed and carry the sentinel
    /// owner; callers decide what that means.
    async fn read_item(&self, token_id: TokenId) -> Result<MarketItem, LedgerClientError>;

    /// Mint a new item priced at `price` (smallest unit), owned by the
    /// session account.
    async fn mint(&self, price: u128) -> Result<Receipt, LedgerClientError>;

    /// Buy `token_id` at `price`, which must equal the item's current price.
    async fn buy(&self, token_id: TokenId, price: u128) -> Result<Receipt, LedgerClientError>;

    /// Re-price `token_id`; owner only.
    async fn set_price(
        &self,
        token_id: TokenId,
        new_price: u128,
    ) -> Result<Receipt, LedgerClientError>;

    /// Flip the sale flag of `token_id`; owner only.
    async fn toggle_sale(&self, token_id: TokenId) -> Result<Receipt, LedgerClientError>;
}

impl LedgerTrait for LedgerClient {
    async fn read_item(&self, token_id: TokenId) -> Result<MarketItem, LedgerClientError> {
        tracing::debug!(token_id, "reading ledger item");
        let response: ItemResponse =
            Self::expect_json(self.client.get(self.endpoint(format!("items/{token_id}")))).await?;
        MarketItem::try_from(response)
    }

    async fn mint(&self, price: u128) -> Result<Receipt, LedgerClientError> {
        tracing::debug!(price, "submitting mint");
        let body = MintRequest {
            price: price.to_string(),
        };
        Self::expect_json(self.client.post(self.endpoint("mint")).json(&body)).await
    }

    async fn buy(&self, token_id: TokenId, price: u128) -> Result<Receipt, LedgerClientError> {
        tracing::debug!(token_id, price, "submitting buy");
        let body = BuyRequest {
            token_id,
            price: price.to_string(),
        };
        Self::expect_json(self.client.post(self.endpoint("buy")).json(&body)).await
    }

    async fn set_price(
        &self,
        token_id: TokenId,
        new_price: u128,
    ) -> Result<Receipt, LedgerClientError> {
        tracing::debug!(token_id, new_price, "submitting price change");
        let body = SetPriceRequest {
            price: new_price.to_string(),
        };
        Self::expect_json(
            self.client
                .post(self.endpoint(format!("items/{token_id}/price")))
                .json(&body),
        )
        .await
    }

    async fn toggle_sale(&self, token_id: TokenId) -> Result<Receipt, LedgerClientError> {
        tracing::debug!(token_id, "submitting sale toggle");
        Self::expect_json(
            self.client
                .post(self.endpoint(format!("items/{token_id}/sale"))),
        )
        .await
    }
}

impl LedgerTrait for MockLedger {
    async fn read_item(&self, _token_id: TokenId) -> Result<MarketItem, LedgerClientError> {
        let mock_resp = self.pop_response();
        match mock_resp {
            Some(Response::Item(item)) => MarketItem::try_from(item),
            Some(Response::Error(err)) => Err(LedgerClientError::Status {
                status: err.status,
                message: err.message,
            }),
            _ => panic!("expected item response, found {:?}", &mock_resp),
        }
    }

    async fn mint(&self, _price: u128) -> Result<Receipt, LedgerClientError> {
        self.pop_receipt()
    }

    async fn buy(&self, _token_id: TokenId, _price: u128) -> Result<Receipt, LedgerClientError> {
        self.pop_receipt()
    }

    async fn set_price(
        &self,
        _token_id: TokenId,
        _new_price: u128,
    ) -> Result<Receipt, LedgerClientError> {
        self.pop_receipt()
    }

    async fn toggle_sale(&self, _token_id: TokenId) -> Result<Receipt, LedgerClientError> {
        self.pop_receipt()
    }
}

#[derive(Debug, Error)]
pub enum LedgerClientError {
    #[error("ledger request failed")]
    Request(#[source] reqwest::Error),
    #[error("ledger returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("ledger returned a malformed price: {0:?}")]
    InvalidPrice(String),
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::data::Account;

    fn client_for(url: &str) -> LedgerClient {
        LedgerClient::new(LedgerClientConfig {
            ledger_url: url.to_string(),
        })
    }

    #[tokio::test]
    async fn read_item_parses_and_normalizes_owner() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/items/7");
            then.status(200).json_body(json!({
                "token_id": 7,
                "owner": "0xABC0000000000000000000000000000000000001",
                "price": "1500000000000000000",
                "for_sale": true,
            }));
        });

        let client = client_for(&server.base_url());
        let item = client.read_item(7).await.unwrap();
        assert_eq!(item.token_id, 7);
        assert_eq!(
            item.owner,
            Account::new("0xabc0000000000000000000000000000000000001")
        );
        assert_eq!(item.price, 1_500_000_000_000_000_000);
        assert!(item.for_sale);
        mock.assert();
    }

    #[tokio::test]
    async fn read_item_rejects_malformed_price() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/items/1");
            then.status(200).json_body(json!({
                "token_id": 1,
                "owner": "0xabc0000000000000000000000000000000000001",
                "price": "not-a-number",
                "for_sale": false,
            }));
        });

        let client = client_for(&server.base_url());
        let err = client.read_item(1).await.unwrap_err();
        assert!(matches!(err, LedgerClientError::InvalidPrice(_)));
    }

    #[tokio::test]
    async fn failed_status_maps_to_status_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/mint");
            then.status(502).body("gateway unavailable");
        });

        let client = client_for(&server.base_url());
        let err = client.mint(1).await.unwrap_err();
        match err {
            LedgerClientError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "gateway unavailable");
            },
            other => panic!("expected status error, found {other:?}"),
        }
    }

    #[tokio::test]
    async fn buy_sends_token_and_pinned_price() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/buy").json_body(json!({
                "token_id": 3,
                "price": "2000000000000000000",
            }));
            then.status(200)
                .json_body(json!({ "transaction_hash": "0xfeed" }));
        });

        let client = client_for(&server.base_url());
        let receipt = client.buy(3, 2_000_000_000_000_000_000).await.unwrap();
        assert_eq!(receipt.transaction_hash, "0xfeed");
        mock.assert();
    }

    #[tokio::test]
    async fn user_agent_set_on_requests() {
        let expected_agent = format!("kiosk-cli/{}", KIOSK_VERSION);

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("user-agent", expected_agent);
            then.status(200)
                .json_body(json!({ "transaction_hash": "0x01" }));
        });

        let client = client_for(&server.base_url());
        let _ = client.toggle_sale(1).await;
        mock.assert();
    }

    #[tokio::test]
    async fn mock_ledger_pops_in_order() {
        let mut mock = MockLedger::default();
        mock.push_item_response(&MarketItem {
            token_id: 1,
            owner: Account::new("0xaa00000000000000000000000000000000000000"),
            price: 10,
            for_sale: false,
        });
        mock.push_error_response(500, "boom");

        let item = mock.read_item(1).await.unwrap();
        assert_eq!(item.token_id, 1);
        let err = mock.read_item(2).await.unwrap_err();
        assert!(matches!(err, LedgerClientError::Status { status: 500, .. }));
        assert_eq!(mock.remaining_responses(), 0);
    }

    #[test]
    fn mock_responses_load_from_file() {
        use std::io::Write;

        let contents = json!([
            {
                "token_id": 1,
                "owner": "0xaa00000000000000000000000000000000000000",
                "price": "5",
                "for_sale": true,
            },
            { "transaction_hash": "0xbeef" },
            { "status": 404, "message": "no such item" },
        ]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();

        let mock = MockLedger::new(Some(file.path())).unwrap();
        assert_eq!(mock.remaining_responses(), 3);
        let responses = mock.mock_responses.lock().unwrap();
        assert!(matches!(responses[0], Response::Item(_)));
        assert!(matches!(responses[1], Response::Receipt(_)));
        assert!(matches!(responses[2], Response::Error(_)));
    }
}
