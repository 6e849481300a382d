use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Item identifiers are dense and contiguous, starting at 1.
pub type TokenId = u64;

/// The all-zero account the ledger returns for ids that have never been
/// minted.
pub const SENTINEL_ACCOUNT: &str = "0x0000000000000000000000000000000000000000";

/// An account identifier as reported by the wallet or the ledger.
///
/// Accounts are normalized to lowercase on construction. Ledgers and wallet
/// providers disagree on the capitalization of hex addresses, so rather than
/// comparing case-insensitively everywhere, normalization happens once at the
/// boundary and every comparison downstream is plain equality.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Deref,
    derive_more::AsRef,
)]
#[serde(from = "String")]
#[deref(forward)]
#[as_ref(forward)]
pub struct Account(String);

impl Account {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Account(raw.as_ref().trim().to_lowercase())
    }

    /// The reserved all-zero account marking "no item at this id".
    pub fn sentinel() -> Self {
        Account(SENTINEL_ACCOUNT.to_string())
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == SENTINEL_ACCOUNT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Account {
    fn from(value: String) -> Self {
        Account::new(value)
    }
}

impl From<&str> for Account {
    fn from(value: &str) -> Self {
        Account::new(value)
    }
}

impl Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
