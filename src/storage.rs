use std::sync::Arc;

use rust_decimal::Decimal;
use time::{Date, Month};

use finledger_core::FinancialOperation;

use crate::config::{StorageBackendKind, StorageConfig};

// Re-export core storage types so callers can use crate::storage::*
pub use finledger_core::storage::{OperationStore, StorageError, TransactionId};
pub use finledger_memory::InMemoryStorage;
pub use finledger_sqlite::SqliteStorage;

pub fn open(config: &StorageConfig) -> Result<Arc<dyn OperationStore>, StorageError> {
    match config.backend {
        StorageBackendKind::Memory => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(InMemoryStorage::new()))
        }
        StorageBackendKind::Sqlite => Ok(Arc::new(SqliteStorage::new(&config.path)?)),
    }
}

/// Inserts two sample operations if the store is empty. Returns whether
/// anything was written.
pub fn seed_sample_data(storage: &dyn OperationStore) -> Result<bool, StorageError> {
    if !storage.get_all()?.is_empty() {
        return Ok(false);
    }

    let epoch = Date::from_calendar_date(1, Month::January, 1)
        .map_err(|e| StorageError::Other(e.to_string()))?;
    let later = Date::from_calendar_date(2001, Month::January, 12)
        .map_err(|e| StorageError::Other(e.to_string()))?;

    let tx_id = storage.begin_transaction()?;
    let written = storage.add_range(&[
        FinancialOperation::new(0, Decimal::from(-200), "money", epoch),
        FinancialOperation::new(1, Decimal::from(500), "moneyPlus", later),
    ]);
    match written {
        Ok(()) => storage.commit_transaction(tx_id)?,
        Err(e) => {
            storage.rollback_transaction(tx_id)?;
            return Err(e);
        }
    }

    tracing::info!("Store seeded with sample operations");
    Ok(true)
}
