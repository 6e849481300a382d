pub mod market;
pub mod marketplace;
pub mod session;
