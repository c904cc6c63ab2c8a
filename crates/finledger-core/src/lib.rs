//! Core types and traits for finledger storage backends.
//!
//! This crate provides the `OperationStore` trait, the financial operation
//! model and the pure statement aggregation, enabling pluggable storage
//! implementations in separate crates.

pub mod models;
pub mod statement;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{FinancialOperation, FinancialStatement, OperationChanges, OperationId};
pub use models::date_format::{format_date, parse_date};
pub use statement::calculate_statement;
pub use storage::{OperationStore, StorageError, TransactionId};
