pub mod ledger;
pub mod wallet;
