use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

pub mod date_format;

pub type OperationId = u32;

/// A single dated income or expense entry.
///
/// A positive `balance_change` is income, a negative one is expense. The `id`
/// is assigned by the caller and never changes once stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialOperation {
    pub id: OperationId,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub balance_change: Decimal,
    #[serde(rename = "type")]
    pub operation_type: Arc<str>,
    #[serde(with = "date_format")]
    pub date: Date,
}

impl FinancialOperation {
    pub fn new(id: OperationId, balance_change: Decimal, operation_type: &str, date: Date) -> Self {
        Self {
            id,
            balance_change,
            operation_type: Arc::from(operation_type),
            date,
        }
    }

    pub fn is_income(&self) -> bool {
        self.balance_change > Decimal::ZERO
    }

    pub fn is_expense(&self) -> bool {
        self.balance_change < Decimal::ZERO
    }

    /// Overwrites every mutable field, leaving `id` untouched.
    pub fn apply(&mut self, changes: &OperationChanges) {
        self.balance_change = changes.balance_change;
        self.operation_type = changes.operation_type.clone();
        self.date = changes.date;
    }
}

/// The mutable part of an operation, as written by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationChanges {
    pub balance_change: Decimal,
    pub operation_type: Arc<str>,
    pub date: Date,
}

impl From<&FinancialOperation> for OperationChanges {
    fn from(operation: &FinancialOperation) -> Self {
        Self {
            balance_change: operation.balance_change,
            operation_type: operation.operation_type.clone(),
            date: operation.date,
        }
    }
}

/// Income and expense totals over a date range together with the operations
/// they were computed from. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStatement {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub total_expense: Decimal,
    pub financial_operations: Vec<FinancialOperation>,
}

impl FinancialStatement {
    pub fn is_empty(&self) -> bool {
        self.financial_operations.is_empty()
    }

    pub fn net_change(&self) -> Decimal {
        self.total_income + self.total_expense
    }
}
