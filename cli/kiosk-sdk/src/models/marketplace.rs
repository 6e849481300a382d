use thiserror::Error;

use crate::data::{Account, TokenId};
use crate::models::market::{Catalog, MarketItem};
use crate::providers::ledger::{Client, LedgerClientError, LedgerTrait};

/// Hard cap on the sequential catalog scan. The ledger terminates every scan
/// with a sentinel-owned slot; the cap keeps a buggy gateway from turning the
/// scan into an unbounded loop.
pub const MAX_SCAN_ITEMS: u64 = 10_000;

/// One user intent, as triggered. Held only while the intent is unresolved;
/// any resolution (confirmation, rejection or submission failure) clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Mint { price: u128 },
    Buy { token_id: TokenId },
    SetPrice { token_id: TokenId, new_price: u128 },
    ToggleSale { token_id: TokenId },
}

impl PendingAction {
    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            PendingAction::Mint { .. } => None,
            PendingAction::Buy { token_id }
            | PendingAction::SetPrice { token_id, .. }
            | PendingAction::ToggleSale { token_id } => Some(*token_id),
        }
    }
}

/// An action that passed the authorization guard, carrying everything the
/// ledger call needs. `Buy` pins the price from the same fresh read that
/// authorized it; the ledger rejects the buy if the price moved since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizedAction {
    Mint { price: u128 },
    Buy { token_id: TokenId, pinned_price: u128 },
    SetPrice { token_id: TokenId, new_price: u128 },
    ToggleSale { token_id: TokenId },
}

/// Lifecycle of the most recent submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransactionState {
    #[default]
    Idle,
    Submitting,
    Confirmed(String),
    Failed,
}

/// Receipt hash held for display until the user dismisses it. At most one is
/// live; a new confirmation replaces the prior record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: String,
}

/// The marketplace controller.
///
/// Owns the catalog snapshot and drives the three mutating stages: a fresh
/// authorization read, a single ledger mutation, and the re-synchronization
/// scheduled after a confirmed mutation. The controller never holds
/// authoritative state; the snapshot is a read-through cache rebuilt wholesale.
#[derive(Debug)]
pub struct Marketplace {
    ledger: Client,
    catalog: Catalog,
    sync_counter: u64,
    transaction: TransactionState,
    record: Option<TransactionRecord>,
    pending: Option<PendingAction>,
    resync_scheduled: bool,
}

impl Marketplace {
    pub fn new(ledger: Client) -> Self {
        Marketplace {
            ledger,
            catalog: Catalog::default(),
            sync_counter: 0,
            transaction: TransactionState::default(),
            record: None,
            pending: None,
            resync_scheduled: false,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn transaction(&self) -> &TransactionState {
        &self.transaction
    }

    pub fn pending_action(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn record(&self) -> Option<&TransactionRecord> {
        self.record.as_ref()
    }

    pub fn dismiss_record(&mut self) -> Option<TransactionRecord> {
        self.record.take()
    }

    /// Whether a confirmed mutation is waiting for a catalog rebuild.
    /// Returns true at most once per confirmation.
    pub fn take_scheduled_resync(&mut self) -> bool {
        std::mem::take(&mut self.resync_scheduled)
    }

    /// Rebuild the catalog snapshot by a full sequential rescan.
    ///
    /// Reads item 1, 2, ... one at a time, each read issued only after the
    /// previous one completed, and stops at the first sentinel-owned slot
    /// (which is excluded). A failed read aborts the scan and discards the
    /// partial accumulation; the previously installed snapshot stays in
    /// place, stale but consistent.
    pub async fn synchronize(&mut self) -> Result<&Catalog, SyncError> {
        let ticket = self.next_sync_ticket();
        tracing::debug!(ticket, "starting catalog scan");
        let items = self.scan().await?;
        tracing::debug!(ticket, count = items.len(), "catalog scan complete");
        self.install_snapshot(items, ticket);
        Ok(&self.catalog)
    }

    fn next_sync_ticket(&mut self) -> u64 {
        self.sync_counter += 1;
        self.sync_counter
    }

    async fn scan(&self) -> Result<Vec<MarketItem>, SyncError> {
        let mut items = Vec::new();
        for token_id in 1..=MAX_SCAN_ITEMS {
            let item = self
                .ledger
                .read_item(token_id)
                .await
                .map_err(SyncError::Read)?;
            if item.owner.is_sentinel() {
                return Ok(items);
            }
            items.push(item);
        }
        Err(SyncError::ScanLimit(MAX_SCAN_ITEMS))
    }

    /// Install a scanned snapshot unless a newer one arrived while this scan
    /// was in flight. Generations only move forward.
    fn install_snapshot(&mut self, items: Vec<MarketItem>, ticket: u64) -> bool {
        if ticket <= self.catalog.generation() {
            tracing::debug!(
                ticket,
                installed = self.catalog.generation(),
                "dropping stale catalog scan"
            );
            return false;
        }
        self.catalog = Catalog::new(items, ticket);
        true
    }

    /// Validate an intent against freshly read ledger state.
    ///
    /// Minting needs no read. Buying requires the item to be for sale;
    /// re-pricing and sale-toggling require the session account to own it.
    /// The check always issues its own read; the cached catalog is never
    /// consulted. A never-minted id reads as the sentinel slot and uniformly
    /// fails the checks, which is the intended outcome.
    pub async fn authorize(
        &self,
        action: &PendingAction,
        account: &Account,
    ) -> Result<AuthorizedAction, AuthorizeError> {
        match *action {
            PendingAction::Mint { price } => Ok(AuthorizedAction::Mint { price }),
            PendingAction::Buy { token_id } => {
                let item = self.fresh_item(token_id).await?;
                if !item.for_sale {
                    return Err(AuthorizeError::NotForSale(token_id));
                }
                Ok(AuthorizedAction::Buy {
                    token_id,
                    pinned_price: item.price,
                })
            },
            PendingAction::SetPrice { token_id, new_price } => {
                let item = self.fresh_item(token_id).await?;
                if item.owner != *account {
                    return Err(AuthorizeError::NotOwner(token_id));
                }
                Ok(AuthorizedAction::SetPrice { token_id, new_price })
            },
            PendingAction::ToggleSale { token_id } => {
                let item = self.fresh_item(token_id).await?;
                if item.owner != *account {
                    return Err(AuthorizeError::NotOwner(token_id));
                }
                Ok(AuthorizedAction::ToggleSale { token_id })
            },
        }
    }

    async fn fresh_item(&self, token_id: TokenId) -> Result<MarketItem, AuthorizeError> {
        self.ledger
            .read_item(token_id)
            .await
            .map_err(AuthorizeError::Read)
    }

    /// Authorize and submit one mutation, tracking it to a receipt.
    ///
    /// Rejects immediately if a submission is already outstanding. The
    /// pending action lives only for the duration of the attempt; it is
    /// cleared on every outcome. A rejection or failure produces no record;
    /// a confirmation stores the record and schedules exactly one
    /// re-synchronization. There is no automatic retry.
    pub async fn submit(
        &mut self,
        action: PendingAction,
        account: &Account,
    ) -> Result<TransactionRecord, SubmitError> {
        if self.transaction == TransactionState::Submitting {
            return Err(SubmitError::AlreadySubmitting);
        }
        self.pending = Some(action.clone());

        let authorized = match self.authorize(&action, account).await {
            Ok(authorized) => authorized,
            Err(err) => {
                self.pending = None;
                return Err(err.into());
            },
        };

        self.transaction = TransactionState::Submitting;
        let result = match authorized {
            AuthorizedAction::Mint { price } => self.ledger.mint(price).await,
            AuthorizedAction::Buy {
                token_id,
                pinned_price,
            } => self.ledger.buy(token_id, pinned_price).await,
            AuthorizedAction::SetPrice { token_id, new_price } => {
                self.ledger.set_price(token_id, new_price).await
            },
            AuthorizedAction::ToggleSale { token_id } => self.ledger.toggle_sale(token_id).await,
        };

        match result {
            Ok(receipt) => {
                tracing::debug!(hash = %receipt.transaction_hash, "mutation confirmed");
                self.transaction = TransactionState::Confirmed(receipt.transaction_hash.clone());
                let record = TransactionRecord {
                    hash: receipt.transaction_hash,
                };
                self.record = Some(record.clone());
                self.pending = None;
                self.resync_scheduled = true;
                Ok(record)
            },
            Err(err) => {
                tracing::debug!(error = %err, "mutation submission failed");
                self.transaction = TransactionState::Failed;
                self.pending = None;
                Err(SubmitError::Submission(err))
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("catalog read failed")]
    Read(#[source] LedgerClientError),
    #[error("catalog scan exceeded {0} items without a vacant slot")]
    ScanLimit(u64),
}

#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error("item {0} is not for sale")]
    NotForSale(TokenId),
    #[error("item {0} belongs to another account")]
    NotOwner(TokenId),
    #[error("item lookup failed")]
    Read(#[source] LedgerClientError),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("another submission is still in flight")]
    AlreadySubmitting,
    #[error(transparent)]
    Rejected(#[from] AuthorizeError),
    #[error("submission failed")]
    Submission(#[source] LedgerClientError),
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::providers::ledger::{MockLedger, Response};

    fn item(token_id: TokenId, owner: &str, price: u128, for_sale: bool) -> MarketItem {
        MarketItem {
            token_id,
            owner: Account::new(owner),
            price,
            for_sale,
        }
    }

    const ALICE: &str = "0xaa00000000000000000000000000000000000001";
    const BOB: &str = "0xbb00000000000000000000000000000000000002";

    /// A marketplace over a mock ledger, plus a handle onto the mock's
    /// response queue for later seeding and assertions.
    fn marketplace_with(
        seed: impl FnOnce(&mut MockLedger),
    ) -> (Marketplace, Arc<Mutex<VecDeque<Response>>>) {
        let mut mock = MockLedger::default();
        seed(&mut mock);
        let handle = mock.mock_responses.clone();
        (Marketplace::new(Client::Mock(mock)), handle)
    }

    #[tokio::test]
    async fn scan_stops_at_the_sentinel_without_reading_past_it() {
        let (mut marketplace, queue) = marketplace_with(|mock| {
            mock.push_item_response(&item(1, ALICE, 10, true));
            mock.push_item_response(&item(2, BOB, 20, false));
            mock.push_vacant_response(3);
            // Would only be consumed by a read of id 4.
            mock.push_item_response(&item(4, ALICE, 40, false));
        });

        let catalog = marketplace.synchronize().await.unwrap();
        let ids: Vec<_> = catalog.items().iter().map(|i| i.token_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(queue.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_ledger_yields_an_empty_catalog() {
        let (mut marketplace, queue) = marketplace_with(|mock| {
            mock.push_vacant_response(1);
        });

        let catalog = marketplace.synchronize().await.unwrap();
        assert!(catalog.is_empty());
        assert_eq!(queue.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn failed_read_keeps_the_previous_snapshot() {
        let (mut marketplace, queue) = marketplace_with(|mock| {
            for id in 1..=3 {
                mock.push_item_response(&item(id, ALICE, 10, true));
            }
            mock.push_vacant_response(4);
        });
        marketplace.synchronize().await.unwrap();
        assert_eq!(marketplace.catalog().len(), 3);

        {
            let mut mock = MockLedger {
                mock_responses: queue.clone(),
            };
            for id in 1..=4 {
                mock.push_item_response(&item(id, ALICE, 10, true));
            }
            mock.push_error_response(500, "ledger unavailable");
        }

        let err = marketplace.synchronize().await.unwrap_err();
        assert!(matches!(err, SyncError::Read(_)));
        // The 4-item partial scan must never become visible.
        assert_eq!(marketplace.catalog().len(), 3);
        assert_eq!(marketplace.catalog().generation(), 1);
    }

    #[tokio::test]
    async fn stale_scan_cannot_replace_a_newer_snapshot() {
        let (mut marketplace, _queue) = marketplace_with(|_| {});

        let old_ticket = marketplace.next_sync_ticket();
        let new_ticket = marketplace.next_sync_ticket();

        assert!(marketplace.install_snapshot(vec![item(1, ALICE, 10, true)], new_ticket));
        assert!(!marketplace.install_snapshot(vec![], old_ticket));
        assert_eq!(marketplace.catalog().len(), 1);
        assert_eq!(marketplace.catalog().generation(), new_ticket);
    }

    #[tokio::test]
    async fn buy_is_rejected_when_not_for_sale() {
        let (marketplace, _queue) = marketplace_with(|mock| {
            mock.push_item_response(&item(5, BOB, 100, false));
        });

        let err = marketplace
            .authorize(&PendingAction::Buy { token_id: 5 }, &Account::new(ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorizeError::NotForSale(5)));
    }

    #[tokio::test]
    async fn buy_pins_the_price_from_the_authorizing_read() {
        let (marketplace, _queue) = marketplace_with(|mock| {
            mock.push_item_response(&item(5, BOB, 4_200, true));
        });

        let authorized = marketplace
            .authorize(&PendingAction::Buy { token_id: 5 }, &Account::new(ALICE))
            .await
            .unwrap();
        assert_eq!(authorized, AuthorizedAction::Buy {
            token_id: 5,
            pinned_price: 4_200,
        });
    }

    #[tokio::test]
    async fn ownership_checks_ignore_account_casing() {
        let (marketplace, _queue) = marketplace_with(|mock| {
            mock.push_item_response(&item(2, ALICE, 10, false));
            mock.push_item_response(&item(2, ALICE, 10, false));
        });

        // Wallet reported the account with uppercase hex digits.
        let account = Account::new(ALICE.to_uppercase());
        let authorized = marketplace
            .authorize(
                &PendingAction::SetPrice {
                    token_id: 2,
                    new_price: 11,
                },
                &account,
            )
            .await
            .unwrap();
        assert!(matches!(authorized, AuthorizedAction::SetPrice { .. }));

        let err = marketplace
            .authorize(
                &PendingAction::ToggleSale { token_id: 2 },
                &Account::new(BOB),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorizeError::NotOwner(2)));
    }

    #[tokio::test]
    async fn never_minted_ids_uniformly_reject() {
        let (marketplace, _queue) = marketplace_with(|mock| {
            mock.push_vacant_response(99);
            mock.push_vacant_response(99);
        });

        let account = Account::new(ALICE);
        let buy = marketplace
            .authorize(&PendingAction::Buy { token_id: 99 }, &account)
            .await
            .unwrap_err();
        assert!(matches!(buy, AuthorizeError::NotForSale(99)));

        let toggle = marketplace
            .authorize(&PendingAction::ToggleSale { token_id: 99 }, &account)
            .await
            .unwrap_err();
        assert!(matches!(toggle, AuthorizeError::NotOwner(99)));
    }

    #[tokio::test]
    async fn confirmed_mint_clears_pending_and_schedules_one_resync() {
        let (mut marketplace, _queue) = marketplace_with(|mock| {
            mock.push_receipt_response("0xabc123");
        });

        let record = marketplace
            .submit(PendingAction::Mint { price: 10 }, &Account::new(ALICE))
            .await
            .unwrap();
        assert_eq!(record.hash, "0xabc123");
        assert_eq!(marketplace.pending_action(), None);
        assert_eq!(
            marketplace.transaction(),
            &TransactionState::Confirmed("0xabc123".to_string())
        );
        assert_eq!(marketplace.record(), Some(&record));

        assert!(marketplace.take_scheduled_resync());
        assert!(!marketplace.take_scheduled_resync());
    }

    #[tokio::test]
    async fn failed_mint_resolves_pending_and_schedules_nothing() {
        let (mut marketplace, _queue) = marketplace_with(|mock| {
            mock.push_error_response(500, "provider rejected");
        });

        let err = marketplace
            .submit(PendingAction::Mint { price: 10 }, &Account::new(ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Submission(_)));
        assert_eq!(marketplace.pending_action(), None);
        assert_eq!(marketplace.transaction(), &TransactionState::Failed);
        assert_eq!(marketplace.record(), None);
        assert!(!marketplace.take_scheduled_resync());
    }

    #[tokio::test]
    async fn rejection_issues_no_mutation_call() {
        let (mut marketplace, queue) = marketplace_with(|mock| {
            mock.push_item_response(&item(5, BOB, 100, false));
        });

        let err = marketplace
            .submit(PendingAction::Buy { token_id: 5 }, &Account::new(ALICE))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Rejected(AuthorizeError::NotForSale(5))
        ));
        // Only the authorizing read was consumed; nothing else hit the ledger.
        assert_eq!(queue.lock().unwrap().len(), 0);
        assert_eq!(marketplace.pending_action(), None);
        assert_eq!(marketplace.record(), None);
    }

    #[tokio::test]
    async fn second_submission_is_rejected_while_one_is_outstanding() {
        let (mut marketplace, _queue) = marketplace_with(|_| {});
        marketplace.transaction = TransactionState::Submitting;

        let err = marketplace
            .submit(PendingAction::Mint { price: 1 }, &Account::new(ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::AlreadySubmitting));
    }

    #[tokio::test]
    async fn a_new_record_replaces_the_prior_one() {
        let (mut marketplace, _queue) = marketplace_with(|mock| {
            mock.push_receipt_response("0x01");
            mock.push_receipt_response("0x02");
        });
        let account = Account::new(ALICE);

        marketplace
            .submit(PendingAction::Mint { price: 1 }, &account)
            .await
            .unwrap();
        marketplace
            .submit(PendingAction::Mint { price: 2 }, &account)
            .await
            .unwrap();

        assert_eq!(marketplace.record().map(|r| r.hash.as_str()), Some("0x02"));
        assert!(marketplace.dismiss_record().is_some());
        assert_eq!(marketplace.record(), None);
    }
}
