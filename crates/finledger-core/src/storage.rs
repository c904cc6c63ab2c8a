use time::Date;

use crate::models::{FinancialOperation, OperationChanges, OperationId};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    Other(String),
    #[error("operation not found: {0}")]
    OperationNotFound(OperationId),
    #[error("operation already exists: {0}")]
    OperationAlreadyExists(OperationId),
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),
    #[error("no active transaction")]
    NoActiveTransaction,
}

pub type TransactionId = u64;

/// Persisted collection of financial operations.
///
/// Reads return owned snapshots in ascending `id` order. Writes made between
/// `begin_transaction` and `commit_transaction` are discarded by
/// `rollback_transaction`.
pub trait OperationStore: Send + Sync {
    fn get_all(&self) -> Result<Vec<FinancialOperation>, StorageError>;
    fn get_by_id(&self, id: OperationId) -> Result<Option<FinancialOperation>, StorageError>;
    /// Operations with `start <= date <= end`. Empty when `start > end`.
    fn get_all_by_date_range(&self, start: Date, end: Date) -> Result<Vec<FinancialOperation>, StorageError>;
    fn get_all_by_type(&self, operation_type: &str) -> Result<Vec<FinancialOperation>, StorageError>;

    fn get_all_by_date(&self, date: Date) -> Result<Vec<FinancialOperation>, StorageError> {
        self.get_all_by_date_range(date, date)
    }

    fn add(&self, operation: &FinancialOperation) -> Result<(), StorageError>;
    fn update(&self, id: OperationId, changes: &OperationChanges) -> Result<FinancialOperation, StorageError>;
    fn remove(&self, operation: &FinancialOperation) -> Result<(), StorageError>;

    fn add_range(&self, operations: &[FinancialOperation]) -> Result<(), StorageError> {
        for operation in operations {
            self.add(operation)?;
        }
        Ok(())
    }

    fn remove_range(&self, operations: &[FinancialOperation]) -> Result<(), StorageError> {
        for operation in operations {
            self.remove(operation)?;
        }
        Ok(())
    }

    fn begin_transaction(&self) -> Result<TransactionId, StorageError>;
    fn commit_transaction(&self, tx_id: TransactionId) -> Result<(), StorageError>;
    fn rollback_transaction(&self, tx_id: TransactionId) -> Result<(), StorageError>;
}
