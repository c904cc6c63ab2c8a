use std::sync::Arc;

use time::Date;

use finledger_core::{calculate_statement, FinancialStatement};

use crate::storage::{OperationStore, StorageError};

/// Builds income/expense statements from the operations held in a store.
pub struct StatementCalculator {
    storage: Arc<dyn OperationStore>,
}

impl StatementCalculator {
    pub fn new(storage: Arc<dyn OperationStore>) -> Self {
        Self {
            storage,
        }
    }

    /// Statement over `date_start..=date_end`. A reversed range yields an
    /// empty statement.
    pub fn calculate_statement(&self, date_start: Date, date_end: Date) -> Result<FinancialStatement, StorageError> {
        if date_start > date_end {
            return Ok(FinancialStatement::default());
        }
        let operations = self.storage.get_all_by_date_range(date_start, date_end)?;
        let statement = calculate_statement(operations);
        tracing::debug!(
            %date_start,
            %date_end,
            operations = statement.financial_operations.len(),
            total_income = %statement.total_income,
            total_expense = %statement.total_expense,
            "Statement calculated"
        );
        Ok(statement)
    }

    pub fn daily_statement(&self, date: Date) -> Result<FinancialStatement, StorageError> {
        self.calculate_statement(date, date)
    }
}
