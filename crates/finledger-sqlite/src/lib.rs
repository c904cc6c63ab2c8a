use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
};

use rusqlite::{params, Connection, ErrorCode, Params};
use rust_decimal::Decimal;
use time::Date;

use finledger_core::{
    format_date, parse_date, FinancialOperation, OperationChanges, OperationId, OperationStore,
    StorageError, TransactionId,
};

const SELECT_OPERATIONS: &str = "SELECT id, balance_change, type, date FROM financial_operations";

pub struct SqliteStorage {
    conn: Mutex<Connection>,
    tx_counter: AtomicU64,
    active_tx: Mutex<Option<TransactionId>>,
}

impl SqliteStorage {
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(sql_error)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(sql_error)?;

        let storage = Self {
            conn: Mutex::new(conn),
            tx_counter: AtomicU64::new(1),
            active_tx: Mutex::new(None),
        };
        storage.init_schema()?;
        tracing::info!(path, "SQLite store opened");
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS financial_operations (
                id INTEGER PRIMARY KEY,
                balance_change TEXT NOT NULL,
                type TEXT NOT NULL,
                date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_operations_date
                ON financial_operations(date);

            CREATE INDEX IF NOT EXISTS idx_operations_type
                ON financial_operations(type);
            ",
        )
        .map_err(sql_error)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock()
            .map_err(|_| StorageError::Other("SQLite connection lock poisoned".to_string()))
    }

    fn active_tx(&self) -> Result<MutexGuard<'_, Option<TransactionId>>, StorageError> {
        self.active_tx.lock()
            .map_err(|_| StorageError::Other("SQLite transaction lock poisoned".to_string()))
    }

    fn query<P: Params>(&self, filter: &str, params: P) -> Result<Vec<FinancialOperation>, StorageError> {
        let conn = self.conn()?;
        let sql = format!("{} {} ORDER BY id", SELECT_OPERATIONS, filter);
        let mut stmt = conn.prepare(&sql).map_err(sql_error)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, OperationId>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(sql_error)?;

        let mut result = Vec::new();
        for row in rows {
            let (id, balance_change, operation_type, date) = row.map_err(sql_error)?;
            result.push(row_to_operation(id, &balance_change, &operation_type, &date)?);
        }
        Ok(result)
    }
}

fn sql_error(e: rusqlite::Error) -> StorageError {
    StorageError::Other(e.to_string())
}

fn date_text(date: Date) -> Result<String, StorageError> {
    format_date(date).map_err(|e| StorageError::InvalidRecord(format!("unformattable date {}: {}", date, e)))
}

fn row_to_operation(id: OperationId, balance_change: &str, operation_type: &str, date: &str) -> Result<FinancialOperation, StorageError> {
    let balance_change = Decimal::from_str(balance_change)
        .map_err(|e| StorageError::InvalidRecord(format!("operation {}: invalid decimal: {}", id, e)))?;
    let date = parse_date(date)
        .map_err(|e| StorageError::InvalidRecord(format!("operation {}: invalid date: {}", id, e)))?;
    Ok(FinancialOperation::new(id, balance_change, operation_type, date))
}

impl OperationStore for SqliteStorage {
    fn get_all(&self) -> Result<Vec<FinancialOperation>, StorageError> {
        self.query("", params![])
    }

    fn get_by_id(&self, id: OperationId) -> Result<Option<FinancialOperation>, StorageError> {
        Ok(self.query("WHERE id = ?1", params![id])?.into_iter().next())
    }

    fn get_all_by_date_range(&self, start: Date, end: Date) -> Result<Vec<FinancialOperation>, StorageError> {
        if start > end {
            return Ok(Vec::new());
        }
        // Zero-padded ISO dates compare correctly as text.
        self.query("WHERE date >= ?1 AND date <= ?2", params![date_text(start)?, date_text(end)?])
    }

    fn get_all_by_type(&self, operation_type: &str) -> Result<Vec<FinancialOperation>, StorageError> {
        self.query("WHERE type = ?1", params![operation_type])
    }

    fn add(&self, operation: &FinancialOperation) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO financial_operations (id, balance_change, type, date) VALUES (?1, ?2, ?3, ?4)",
            params![
                operation.id,
                operation.balance_change.to_string(),
                operation.operation_type.as_ref(),
                date_text(operation.date)?
            ],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StorageError::OperationAlreadyExists(operation.id),
            _ => sql_error(e),
        })?;
        Ok(())
    }

    fn update(&self, id: OperationId, changes: &OperationChanges) -> Result<FinancialOperation, StorageError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE financial_operations SET balance_change = ?1, type = ?2, date = ?3 WHERE id = ?4",
            params![
                changes.balance_change.to_string(),
                changes.operation_type.as_ref(),
                date_text(changes.date)?,
                id
            ],
        )
        .map_err(sql_error)?;
        if updated == 0 {
            return Err(StorageError::OperationNotFound(id));
        }
        Ok(FinancialOperation {
            id,
            balance_change: changes.balance_change,
            operation_type: changes.operation_type.clone(),
            date: changes.date,
        })
    }

    fn remove(&self, operation: &FinancialOperation) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM financial_operations WHERE id = ?1",
            params![operation.id],
        )
        .map_err(sql_error)?;
        if removed == 0 {
            return Err(StorageError::OperationNotFound(operation.id));
        }
        Ok(())
    }

    fn begin_transaction(&self) -> Result<TransactionId, StorageError> {
        let mut active = self.active_tx()?;
        let conn = self.conn()?;
        conn.execute_batch("SAVEPOINT finledger_tx")
            .map_err(sql_error)?;
        let tx_id = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        *active = Some(tx_id);
        tracing::debug!(tx_id, "SQLite transaction started");
        Ok(tx_id)
    }

    fn commit_transaction(&self, tx_id: TransactionId) -> Result<(), StorageError> {
        let mut active = self.active_tx()?;
        if *active != Some(tx_id) {
            return Err(StorageError::NoActiveTransaction);
        }
        let conn = self.conn()?;
        conn.execute_batch("RELEASE SAVEPOINT finledger_tx")
            .map_err(sql_error)?;
        *active = None;
        tracing::debug!(tx_id, "SQLite transaction committed");
        Ok(())
    }

    fn rollback_transaction(&self, tx_id: TransactionId) -> Result<(), StorageError> {
        let mut active = self.active_tx()?;
        if *active != Some(tx_id) {
            return Err(StorageError::NoActiveTransaction);
        }
        let conn = self.conn()?;
        // ROLLBACK TO keeps the savepoint open, so release it afterwards.
        conn.execute_batch("ROLLBACK TO SAVEPOINT finledger_tx; RELEASE SAVEPOINT finledger_tx;")
            .map_err(sql_error)?;
        *active = None;
        tracing::debug!(tx_id, "SQLite transaction rolled back");
        Ok(())
    }
}
