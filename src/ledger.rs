use std::sync::{Arc, Mutex};

use thiserror::Error;
use time::Date;

use finledger_core::{FinancialOperation, OperationChanges, OperationId};

use crate::storage::{OperationStore, StorageError};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("No values were sent")]
    EmptyBatch,
    #[error("operation {0} has an empty type")]
    MissingType(OperationId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Read and batch-write access to the stored operations.
///
/// Every batch runs in a single store transaction: the first failing item
/// stops the batch and nothing from it is kept. Batches are serialized so a
/// rollback cannot discard writes from a concurrent batch.
pub struct Ledger {
    storage: Arc<dyn OperationStore>,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(storage: Arc<dyn OperationStore>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub fn all_operations(&self) -> Result<Vec<FinancialOperation>, StorageError> {
        self.storage.get_all()
    }

    pub fn incomes(&self) -> Result<Vec<FinancialOperation>, StorageError> {
        Ok(self.storage.get_all()?.into_iter().filter(FinancialOperation::is_income).collect())
    }

    /// Strictly negative operations. Zero-valued entries are in neither list.
    pub fn expenses(&self) -> Result<Vec<FinancialOperation>, StorageError> {
        Ok(self.storage.get_all()?.into_iter().filter(FinancialOperation::is_expense).collect())
    }

    pub fn operation(&self, id: OperationId) -> Result<Option<FinancialOperation>, StorageError> {
        self.storage.get_by_id(id)
    }

    pub fn operations_of_type(&self, operation_type: &str) -> Result<Vec<FinancialOperation>, StorageError> {
        self.storage.get_all_by_type(operation_type)
    }

    pub fn operations_on(&self, date: Date) -> Result<Vec<FinancialOperation>, StorageError> {
        self.storage.get_all_by_date(date)
    }

    pub fn add_operations(&self, operations: &[FinancialOperation]) -> Result<(), LedgerError> {
        validate(operations)?;
        self.in_transaction(|storage| Ok(storage.add_range(operations)?))?;
        metrics::counter!("finledger_operations_written_total", operations.len() as u64, "kind" => "add");
        Ok(())
    }

    pub fn add_operation(&self, operation: &FinancialOperation) -> Result<(), LedgerError> {
        self.add_operations(std::slice::from_ref(operation))
    }

    /// Overwrites amount, type and date of each operation found by id.
    pub fn update_operations(&self, operations: &[FinancialOperation]) -> Result<Vec<FinancialOperation>, LedgerError> {
        validate(operations)?;
        let updated = self.in_transaction(|storage| {
            let mut updated = Vec::with_capacity(operations.len());
            for operation in operations {
                updated.push(storage.update(operation.id, &OperationChanges::from(operation))?);
            }
            Ok(updated)
        })?;
        metrics::counter!("finledger_operations_written_total", updated.len() as u64, "kind" => "update");
        Ok(updated)
    }

    pub fn update_operation(&self, operation: &FinancialOperation) -> Result<FinancialOperation, LedgerError> {
        let mut updated = self.update_operations(std::slice::from_ref(operation))?;
        // One input, one output.
        updated.pop().ok_or(LedgerError::EmptyBatch)
    }

    pub fn remove_operations(&self, operations: &[FinancialOperation]) -> Result<(), LedgerError> {
        if operations.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }
        self.in_transaction(|storage| Ok(storage.remove_range(operations)?))?;
        metrics::counter!("finledger_operations_written_total", operations.len() as u64, "kind" => "remove");
        Ok(())
    }

    pub fn remove_operation(&self, operation: &FinancialOperation) -> Result<(), LedgerError> {
        self.remove_operations(std::slice::from_ref(operation))
    }

    fn in_transaction<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&dyn OperationStore) -> Result<T, LedgerError>,
    {
        let _guard = self.write_lock.lock()
            .map_err(|_| StorageError::Other("ledger write lock poisoned".to_string()))?;

        let tx_id = self.storage.begin_transaction()?;
        let result = f(self.storage.as_ref())
            .and_then(|value| {
                self.storage.commit_transaction(tx_id)?;
                Ok(value)
            });

        if let Err(ref e) = result {
            tracing::warn!(tx_id, error = %e, "Batch aborted, rolling back");
            if let Err(rollback_error) = self.storage.rollback_transaction(tx_id) {
                tracing::error!(tx_id, error = %rollback_error, "Rollback failed");
            }
        }

        result
    }
}

fn validate(operations: &[FinancialOperation]) -> Result<(), LedgerError> {
    if operations.is_empty() {
        return Err(LedgerError::EmptyBatch);
    }
    match operations.iter().find(|op| op.operation_type.trim().is_empty()) {
        Some(op) => Err(LedgerError::MissingType(op.id)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::storage::{InMemoryStorage, SqliteStorage};

    fn sample() -> Vec<FinancialOperation> {
        vec![
            FinancialOperation::new(0, dec!(-1100.50), "School", date!(2001 - 12 - 12)),
            FinancialOperation::new(1, dec!(5100.50), "Shop", date!(2001 - 12 - 12)),
            FinancialOperation::new(2, dec!(-7100), "School", date!(2001 - 12 - 12)),
            FinancialOperation::new(3, dec!(1100.50), "Gig", date!(2001 - 12 - 13)),
        ]
    }

    fn ledger_over(storage: Arc<dyn OperationStore>) -> Ledger {
        let ledger = Ledger::new(storage);
        ledger.add_operations(&sample()).unwrap();
        ledger
    }

    fn backends() -> Vec<Arc<dyn OperationStore>> {
        vec![
            Arc::new(InMemoryStorage::new()),
            Arc::new(SqliteStorage::new(":memory:").unwrap()),
        ]
    }

    #[test]
    fn test_incomes_and_expenses() {
        let ledger = ledger_over(Arc::new(InMemoryStorage::new()));
        ledger.add_operation(&FinancialOperation::new(4, Decimal::ZERO, "Transfer", date!(2001 - 12 - 14))).unwrap();

        let incomes: Vec<_> = ledger.incomes().unwrap().iter().map(|o| o.id).collect();
        let expenses: Vec<_> = ledger.expenses().unwrap().iter().map(|o| o.id).collect();
        assert_eq!(incomes, vec![1, 3]);
        assert_eq!(expenses, vec![0, 2]);
        assert_eq!(ledger.all_operations().unwrap().len(), 5);
    }

    #[test]
    fn test_lookups() {
        let ledger = ledger_over(Arc::new(InMemoryStorage::new()));
        assert_eq!(ledger.operation(3).unwrap().unwrap().operation_type.as_ref(), "Gig");
        assert!(ledger.operation(30).unwrap().is_none());
        assert_eq!(ledger.operations_of_type("School").unwrap().len(), 2);
        assert_eq!(ledger.operations_on(date!(2001 - 12 - 13)).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_batches_rejected() {
        let ledger = Ledger::new(Arc::new(InMemoryStorage::new()));
        assert!(matches!(ledger.add_operations(&[]), Err(LedgerError::EmptyBatch)));
        assert!(matches!(ledger.update_operations(&[]), Err(LedgerError::EmptyBatch)));
        assert!(matches!(ledger.remove_operations(&[]), Err(LedgerError::EmptyBatch)));
    }

    #[test]
    fn test_blank_type_rejected() {
        let ledger = Ledger::new(Arc::new(InMemoryStorage::new()));
        let op = FinancialOperation::new(5, dec!(1), "  ", date!(2001 - 12 - 12));
        assert!(matches!(ledger.add_operation(&op), Err(LedgerError::MissingType(5))));
        assert!(ledger.all_operations().unwrap().is_empty());
    }

    #[test]
    fn test_update_batch_with_unknown_id_changes_nothing() {
        for storage in backends() {
            let ledger = ledger_over(storage);
            let before = ledger.all_operations().unwrap();

            let batch = vec![
                FinancialOperation::new(0, dec!(-1), "Changed", date!(2002 - 01 - 01)),
                FinancialOperation::new(99, dec!(-1), "Missing", date!(2002 - 01 - 01)),
                FinancialOperation::new(1, dec!(1), "Changed", date!(2002 - 01 - 01)),
            ];
            let result = ledger.update_operations(&batch);
            assert!(matches!(result, Err(LedgerError::Storage(StorageError::OperationNotFound(99)))));
            assert_eq!(ledger.all_operations().unwrap(), before);
        }
    }

    #[test]
    fn test_update_batch_applies_all() {
        for storage in backends() {
            let ledger = ledger_over(storage);
            let batch = vec![
                FinancialOperation::new(0, dec!(-100.25), "Books", date!(2001 - 12 - 20)),
                FinancialOperation::new(3, dec!(2000), "Gig", date!(2001 - 12 - 13)),
            ];
            let updated = ledger.update_operations(&batch).unwrap();
            assert_eq!(updated, batch);
            assert_eq!(ledger.operation(0).unwrap().unwrap(), batch[0]);
            assert_eq!(ledger.operation(3).unwrap().unwrap(), batch[1]);
        }
    }

    #[test]
    fn test_add_batch_with_duplicate_changes_nothing() {
        for storage in backends() {
            let ledger = ledger_over(storage);
            let batch = vec![
                FinancialOperation::new(10, dec!(5), "Gig", date!(2001 - 12 - 14)),
                FinancialOperation::new(1, dec!(5), "Gig", date!(2001 - 12 - 14)),
            ];
            let result = ledger.add_operations(&batch);
            assert!(matches!(result, Err(LedgerError::Storage(StorageError::OperationAlreadyExists(1)))));
            assert!(ledger.operation(10).unwrap().is_none());
            assert_eq!(ledger.all_operations().unwrap().len(), 4);
        }
    }

    #[test]
    fn test_remove_batch() {
        for storage in backends() {
            let ledger = ledger_over(storage);
            let ops = sample();

            let result = ledger.remove_operations(&[ops[0].clone(), FinancialOperation::new(50, dec!(1), "X", date!(2001 - 12 - 12))]);
            assert!(matches!(result, Err(LedgerError::Storage(StorageError::OperationNotFound(50)))));
            assert_eq!(ledger.all_operations().unwrap().len(), 4);

            ledger.remove_operations(&ops[..2]).unwrap();
            ledger.remove_operation(&ops[3]).unwrap();
            let left: Vec<_> = ledger.all_operations().unwrap().iter().map(|o| o.id).collect();
            assert_eq!(left, vec![2]);
        }
    }

    #[test]
    fn test_single_update() {
        let ledger = ledger_over(Arc::new(InMemoryStorage::new()));
        let op = FinancialOperation::new(2, dec!(-7000), "School", date!(2001 - 12 - 12));
        assert_eq!(ledger.update_operation(&op).unwrap(), op);
    }
}
