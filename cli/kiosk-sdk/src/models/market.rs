use crate::data::{Account, TokenId};
use crate::providers::ledger::{ItemResponse, LedgerClientError};

/// Number of items shown per catalog page.
pub const PAGE_SIZE: usize = 9;

/// One tokenized entry on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketItem {
    pub token_id: TokenId,
    pub owner: Account,
    /// Price in the ledger's smallest unit (18-decimal fixed scale).
    pub price: u128,
    pub for_sale: bool,
}

impl MarketItem {
    /// The slot the ledger reports for an id that was never minted.
    pub fn vacant(token_id: TokenId) -> Self {
        MarketItem {
            token_id,
            owner: Account::sentinel(),
            price: 0,
            for_sale: false,
        }
    }
}

impl TryFrom<ItemResponse> for MarketItem {
    type Error = LedgerClientError;

    fn try_from(response: ItemResponse) -> Result<Self, Self::Error> {
        let price = response
            .price
            .parse::<u128>()
            .map_err(|_| LedgerClientError::InvalidPrice(response.price.clone()))?;
        Ok(MarketItem {
            token_id: response.token_id,
            owner: Account::new(&response.owner),
            price,
            for_sale: response.for_sale,
        })
    }
}

/// An immutable snapshot of all existing items, ascending by token id.
///
/// Snapshots are replaced wholesale by the synchronizer, never mutated in
/// place. The generation is monotonically increasing so that a scan which
/// started earlier can never replace a snapshot installed by a later one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<MarketItem>,
    generation: u64,
}

impl Catalog {
    pub fn new(items: Vec<MarketItem>, generation: u64) -> Self {
        Catalog { items, generation }
    }

    pub fn items(&self) -> &[MarketItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(PAGE_SIZE)
    }

    /// The 1-based page `page` of the catalog; out-of-range pages are empty.
    pub fn page(&self, page: usize) -> &[MarketItem] {
        let page = page.max(1);
        let start = (page - 1).saturating_mul(PAGE_SIZE).min(self.items.len());
        let end = page.saturating_mul(PAGE_SIZE).min(self.items.len());
        &self.items[start..end]
    }

    /// Advance from `current`; clamped, so advancing past the last page is a
    /// no-op.
    pub fn next_page(&self, current: usize) -> usize {
        if current < self.total_pages() {
            current + 1
        } else {
            current
        }
    }

    /// Step back from `current`; clamped at the first page.
    pub fn previous_page(&self, current: usize) -> usize {
        current.saturating_sub(1).max(1)
    }
}
