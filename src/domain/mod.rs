pub mod cart;
pub mod error;
pub mod id;
pub mod ledger;
pub mod money;
pub mod order;
pub mod provider;
pub mod reconciliation;
pub mod signature;
pub mod store;
