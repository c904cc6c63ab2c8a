use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use time::Date;

use finledger_core::{models::date_format, parse_date, FinancialOperation, FinancialStatement, OperationId};

use crate::{error::ApiError, ledger::Ledger, statement::StatementCalculator, storage::OperationStore};

/// Shared state for all handlers.
pub struct AppState {
    pub ledger: Ledger,
    pub calculator: StatementCalculator,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(storage: Arc<dyn OperationStore>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            ledger: Ledger::new(storage.clone()),
            calculator: StatementCalculator::new(storage),
            metrics,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/operations", get(get_all_operations))
        .route("/operations/incomes", get(get_all_incomes))
        .route("/operations/expenses", get(get_all_expenses))
        .route("/operations/finance", get(get_statement_for_period))
        .route("/operations/finance/daily", get(get_daily_statement))
        .route("/operations/type/:operation_type", get(get_operations_by_type))
        .route("/operations/date/:date", get(get_operations_by_date))
        .route("/operation/:id", get(get_operation))
        .route("/operation", post(add_operation).put(change_operation).delete(delete_operation))
        .route(
            "/operation/list",
            post(add_list_of_operations)
                .put(change_list_of_operations)
                .delete(delete_list_of_operations),
        )
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    #[serde(with = "date_format")]
    pub date_start: Date,
    #[serde(with = "date_format")]
    pub date_end: Date,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    #[serde(with = "date_format")]
    pub date: Date,
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

type Shared = State<Arc<AppState>>;

fn record_request(route: &'static str) {
    metrics::increment_counter!("finledger_requests_total", "route" => route);
}

fn found(operations: Vec<FinancialOperation>) -> Result<Json<Vec<FinancialOperation>>, ApiError> {
    if operations.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(operations))
}

fn found_statement(statement: FinancialStatement) -> Result<Json<FinancialStatement>, ApiError> {
    if statement.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(statement))
}

type JsonBody<T> = Result<Json<Option<T>>, JsonRejection>;

/// An absent body or a JSON `null` is "nothing sent"; a body that does not
/// decode keeps the decoder's message.
fn payload<T>(body: JsonBody<T>) -> Result<T, ApiError> {
    match body {
        Ok(Json(Some(value))) => Ok(value),
        Ok(Json(None)) | Err(JsonRejection::MissingJsonContentType(_)) => Err(ApiError::missing_values()),
        Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
    }
}

fn non_empty_list(body: JsonBody<Vec<FinancialOperation>>) -> Result<Vec<FinancialOperation>, ApiError> {
    let operations = payload(body)?;
    if operations.is_empty() {
        return Err(ApiError::missing_values());
    }
    Ok(operations)
}

async fn get_all_operations(State(state): Shared) -> Result<Json<Vec<FinancialOperation>>, ApiError> {
    tracing::info!("GetAllOperations was called");
    record_request("operations");
    found(state.ledger.all_operations()?)
}

async fn get_all_incomes(State(state): Shared) -> Result<Json<Vec<FinancialOperation>>, ApiError> {
    tracing::info!("GetAllIncomes was called");
    record_request("incomes");
    found(state.ledger.incomes()?)
}

async fn get_all_expenses(State(state): Shared) -> Result<Json<Vec<FinancialOperation>>, ApiError> {
    tracing::info!("GetAllExpenses was called");
    record_request("expenses");
    found(state.ledger.expenses()?)
}

async fn get_statement_for_period(
    State(state): Shared,
    query: Option<Query<PeriodQuery>>,
) -> Result<Json<FinancialStatement>, ApiError> {
    tracing::info!(?query, "GetFinancialStatementForTimePeriod was called");
    record_request("finance");
    let Query(period) = query.ok_or_else(|| {
        ApiError::Validation("dateStart and dateEnd must be dates (YYYY-MM-DD)".to_string())
    })?;
    found_statement(state.calculator.calculate_statement(period.date_start, period.date_end)?)
}

async fn get_daily_statement(
    State(state): Shared,
    query: Option<Query<DayQuery>>,
) -> Result<Json<FinancialStatement>, ApiError> {
    tracing::info!(?query, "GetDailyFinancialStatement was called");
    record_request("finance_daily");
    let Query(day) = query
        .ok_or_else(|| ApiError::Validation("date must be a date (YYYY-MM-DD)".to_string()))?;
    found_statement(state.calculator.daily_statement(day.date)?)
}

async fn get_operations_by_type(
    State(state): Shared,
    Path(operation_type): Path<String>,
) -> Result<Json<Vec<FinancialOperation>>, ApiError> {
    tracing::info!(%operation_type, "GetOperationsByType was called");
    record_request("operations_by_type");
    found(state.ledger.operations_of_type(&operation_type)?)
}

async fn get_operations_by_date(
    State(state): Shared,
    Path(date): Path<String>,
) -> Result<Json<Vec<FinancialOperation>>, ApiError> {
    tracing::info!(%date, "GetOperationsByDate was called");
    record_request("operations_by_date");
    let date = parse_date(&date)
        .map_err(|e| ApiError::Validation(format!("invalid date '{}': {}", date, e)))?;
    found(state.ledger.operations_on(date)?)
}

async fn get_operation(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<FinancialOperation>, ApiError> {
    tracing::info!(%id, "GetOperation was called");
    record_request("operation_by_id");
    let id: OperationId = id.parse()
        .map_err(|_| ApiError::Validation(format!("invalid operation id '{}'", id)))?;
    state.ledger.operation(id)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn add_operation(
    State(state): Shared,
    body: JsonBody<FinancialOperation>,
) -> Result<Json<FinancialOperation>, ApiError> {
    tracing::info!("AddOperation was called");
    record_request("add_operation");
    let operation = payload(body)?;
    state.ledger.add_operation(&operation)?;
    Ok(Json(operation))
}

async fn add_list_of_operations(
    State(state): Shared,
    body: JsonBody<Vec<FinancialOperation>>,
) -> Result<Json<Vec<FinancialOperation>>, ApiError> {
    tracing::info!("AddListOfOperations was called");
    record_request("add_operations");
    let operations = non_empty_list(body)?;
    state.ledger.add_operations(&operations)?;
    Ok(Json(operations))
}

async fn change_operation(
    State(state): Shared,
    body: JsonBody<FinancialOperation>,
) -> Result<Json<FinancialOperation>, ApiError> {
    tracing::info!("ChangeOperation was called");
    record_request("change_operation");
    let operation = payload(body)?;
    Ok(Json(state.ledger.update_operation(&operation)?))
}

async fn change_list_of_operations(
    State(state): Shared,
    body: JsonBody<Vec<FinancialOperation>>,
) -> Result<Json<Vec<FinancialOperation>>, ApiError> {
    tracing::info!("ChangeListOfOperations was called");
    record_request("change_operations");
    let operations = non_empty_list(body)?;
    Ok(Json(state.ledger.update_operations(&operations)?))
}

async fn delete_operation(
    State(state): Shared,
    body: JsonBody<FinancialOperation>,
) -> Result<StatusCode, ApiError> {
    tracing::info!("DeleteOperation was called");
    record_request("delete_operation");
    let operation = payload(body)?;
    state.ledger.remove_operation(&operation)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_list_of_operations(
    State(state): Shared,
    body: JsonBody<Vec<FinancialOperation>>,
) -> Result<StatusCode, ApiError> {
    tracing::info!("DeleteListOfOperations was called");
    record_request("delete_operations");
    let operations = non_empty_list(body)?;
    state.ledger.remove_operations(&operations)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

async fn render_metrics(State(state): Shared) -> String {
    match &state.metrics {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}
