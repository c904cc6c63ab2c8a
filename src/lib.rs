pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod statement;
pub mod storage;
