use rust_decimal::Decimal;

use crate::models::{FinancialOperation, FinancialStatement};

/// Splits `operations` into income and expense totals.
///
/// A strictly positive `balance_change` counts as income; everything else,
/// zero included, counts as expense. The operations are kept in the order
/// given.
pub fn calculate_statement(operations: Vec<FinancialOperation>) -> FinancialStatement {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;

    for operation in &operations {
        if operation.balance_change > Decimal::ZERO {
            total_income += operation.balance_change;
        } else {
            total_expense += operation.balance_change;
        }
    }

    FinancialStatement {
        total_income,
        total_expense,
        financial_operations: operations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::date;

    fn sample() -> Vec<FinancialOperation> {
        vec![
            FinancialOperation::new(0, dec!(-1100.50), "School", date!(2001 - 12 - 12)),
            FinancialOperation::new(1, dec!(5100.50), "Shop", date!(2001 - 12 - 12)),
            FinancialOperation::new(2, dec!(-7100), "School", date!(2001 - 12 - 12)),
            FinancialOperation::new(3, dec!(1100.50), "Gig", date!(2001 - 12 - 13)),
        ]
    }

    #[test]
    fn test_single_day_totals() {
        let ops: Vec<_> = sample().into_iter().take(3).collect();
        let stmt = calculate_statement(ops.clone());
        assert_eq!(stmt.total_income, dec!(5100.50));
        assert_eq!(stmt.total_expense, dec!(-8200.50));
        assert_eq!(stmt.financial_operations, ops);
    }

    #[test]
    fn test_two_day_totals() {
        let stmt = calculate_statement(sample());
        assert_eq!(stmt.total_income, dec!(6201.00));
        assert_eq!(stmt.total_expense, dec!(-8200.50));
        assert_eq!(stmt.financial_operations.len(), 4);
    }

    #[test]
    fn test_empty_input() {
        let stmt = calculate_statement(Vec::new());
        assert_eq!(stmt.total_income, Decimal::ZERO);
        assert_eq!(stmt.total_expense, Decimal::ZERO);
        assert!(stmt.is_empty());
    }

    #[test]
    fn test_zero_counts_as_expense() {
        let ops = vec![
            FinancialOperation::new(0, Decimal::ZERO, "Transfer", date!(2001 - 12 - 12)),
            FinancialOperation::new(1, dec!(0.01), "Interest", date!(2001 - 12 - 12)),
        ];
        let stmt = calculate_statement(ops);
        assert_eq!(stmt.total_income, dec!(0.01));
        assert_eq!(stmt.total_expense, Decimal::ZERO);
    }

    #[test]
    fn test_totals_sum_to_net_change() {
        let ops = sample();
        let expected: Decimal = ops.iter().map(|o| o.balance_change).sum();
        let stmt = calculate_statement(ops);
        assert_eq!(stmt.net_change(), expected);
        assert!(stmt.total_income >= Decimal::ZERO);
        assert!(stmt.total_expense <= Decimal::ZERO);
    }

    #[test]
    fn test_cent_precision_is_exact() {
        let ops: Vec<_> = (0..10)
            .map(|i| FinancialOperation::new(i, dec!(0.10), "Coin", date!(2001 - 12 - 12)))
            .collect();
        let stmt = calculate_statement(ops);
        assert_eq!(stmt.total_income, dec!(1.00));
    }

    #[test]
    fn test_order_is_preserved() {
        let mut ops = sample();
        ops.reverse();
        let stmt = calculate_statement(ops.clone());
        let ids: Vec<_> = stmt.financial_operations.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 2, 1, 0]);
    }
}
