use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use time::Date;

use finledger_core::{
    FinancialOperation, OperationChanges, OperationId, OperationStore, StorageError, TransactionId,
};

type Operations = BTreeMap<OperationId, FinancialOperation>;

pub struct InMemoryStorage {
    operations: RwLock<Operations>,
    tx_counter: AtomicU64,
    snapshots: RwLock<HashMap<TransactionId, Operations>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            operations: RwLock::new(BTreeMap::new()),
            tx_counter: AtomicU64::new(1),
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_operations(operations: impl IntoIterator<Item = FinancialOperation>) -> Self {
        let storage = Self::new();
        if let Ok(mut map) = storage.operations.write() {
            map.extend(operations.into_iter().map(|op| (op.id, op)));
        }
        storage
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Operations>, StorageError> {
        self.operations.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Operations>, StorageError> {
        self.operations.write().map_err(|_| poisoned())
    }

    fn select<F>(&self, predicate: F) -> Result<Vec<FinancialOperation>, StorageError>
    where
        F: Fn(&FinancialOperation) -> bool,
    {
        Ok(self.read()?.values().filter(|op| predicate(op)).cloned().collect())
    }
}

fn poisoned() -> StorageError {
    StorageError::Other("in-memory store lock poisoned".to_string())
}

impl OperationStore for InMemoryStorage {
    fn get_all(&self) -> Result<Vec<FinancialOperation>, StorageError> {
        self.select(|_| true)
    }

    fn get_by_id(&self, id: OperationId) -> Result<Option<FinancialOperation>, StorageError> {
        Ok(self.read()?.get(&id).cloned())
    }

    fn get_all_by_date_range(&self, start: Date, end: Date) -> Result<Vec<FinancialOperation>, StorageError> {
        self.select(|op| op.date >= start && op.date <= end)
    }

    fn get_all_by_type(&self, operation_type: &str) -> Result<Vec<FinancialOperation>, StorageError> {
        self.select(|op| op.operation_type.as_ref() == operation_type)
    }

    fn add(&self, operation: &FinancialOperation) -> Result<(), StorageError> {
        let mut operations = self.write()?;
        if operations.contains_key(&operation.id) {
            return Err(StorageError::OperationAlreadyExists(operation.id));
        }
        operations.insert(operation.id, operation.clone());
        Ok(())
    }

    fn update(&self, id: OperationId, changes: &OperationChanges) -> Result<FinancialOperation, StorageError> {
        let mut operations = self.write()?;
        let operation = operations.get_mut(&id)
            .ok_or(StorageError::OperationNotFound(id))?;
        operation.apply(changes);
        Ok(operation.clone())
    }

    fn remove(&self, operation: &FinancialOperation) -> Result<(), StorageError> {
        self.write()?.remove(&operation.id)
            .map(|_| ())
            .ok_or(StorageError::OperationNotFound(operation.id))
    }

    fn begin_transaction(&self) -> Result<TransactionId, StorageError> {
        let tx_id = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.read()?.clone();
        self.snapshots.write().map_err(|_| poisoned())?.insert(tx_id, snapshot);
        tracing::debug!(tx_id, "Transaction started");
        Ok(tx_id)
    }

    fn commit_transaction(&self, tx_id: TransactionId) -> Result<(), StorageError> {
        self.snapshots.write().map_err(|_| poisoned())?.remove(&tx_id)
            .ok_or(StorageError::NoActiveTransaction)?;
        tracing::debug!(tx_id, "Transaction committed");
        Ok(())
    }

    fn rollback_transaction(&self, tx_id: TransactionId) -> Result<(), StorageError> {
        let snapshot = self.snapshots.write().map_err(|_| poisoned())?.remove(&tx_id)
            .ok_or(StorageError::NoActiveTransaction)?;
        *self.write()? = snapshot;
        tracing::debug!(tx_id, "Transaction rolled back");
        Ok(())
    }
}
