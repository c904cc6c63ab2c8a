use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use finledger::statement::StatementCalculator;
use finledger::storage::{InMemoryStorage, OperationStore};
use finledger_core::{calculate_statement, FinancialOperation};
use rust_decimal::Decimal;
use time::{Date, Duration, Month};

fn sample_operations(count: u32) -> Vec<FinancialOperation> {
    let start = Date::from_calendar_date(2023, Month::January, 1).unwrap();
    (0..count)
        .map(|i| {
            // Alternate income and expense with cent amounts, spread over a year.
            let amount = Decimal::new(i64::from(i % 10_000) * if i % 2 == 0 { 1 } else { -1 }, 2);
            let date = start + Duration::days(i64::from(i % 365));
            FinancialOperation::new(i, amount, if i % 2 == 0 { "Salary" } else { "Groceries" }, date)
        })
        .collect()
}

fn bench_calculate(c: &mut Criterion) {
    let operations = sample_operations(10_000);
    c.bench_function("calculate_statement_10k", |b| {
        b.iter(|| calculate_statement(black_box(operations.clone())))
    });
}

fn bench_store_statement(c: &mut Criterion) {
    let storage: Arc<dyn OperationStore> = Arc::new(InMemoryStorage::with_operations(sample_operations(10_000)));
    let calculator = StatementCalculator::new(storage);
    let from = Date::from_calendar_date(2023, Month::March, 1).unwrap();
    let to = Date::from_calendar_date(2023, Month::March, 31).unwrap();
    c.bench_function("store_statement_one_month", |b| {
        b.iter(|| calculator.calculate_statement(black_box(from), black_box(to)).unwrap())
    });
}

criterion_group!(benches, bench_calculate, bench_store_statement);
criterion_main!(benches);
