mod ledger;
pub mod models;
pub mod repositories;

pub use ledger::MongoLedgerStore;
