use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use finledger_core::OperationId;

use crate::{ledger::LedgerError, storage::StorageError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("No operations were found")]
    NotFound,
    #[error("operation {0} does not exist")]
    UpdateTargetMissing(OperationId),
    #[error("operation {0} already exists")]
    Conflict(OperationId),
    #[error(transparent)]
    Storage(StorageError),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl ApiError {
    pub fn missing_values() -> Self {
        ApiError::Validation("No values were sent".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::UpdateTargetMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::OperationNotFound(id) => ApiError::UpdateTargetMissing(id),
            StorageError::OperationAlreadyExists(id) => ApiError::Conflict(id),
            other => ApiError::Storage(other),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::EmptyBatch => ApiError::missing_values(),
            LedgerError::MissingType(id) => ApiError::Validation(format!("operation {} has an empty type", id)),
            LedgerError::Storage(inner) => inner.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(_) => tracing::warn!(error = %self, "Incorrect request"),
            ApiError::NotFound => tracing::warn!("No operations were found"),
            ApiError::UpdateTargetMissing(_) | ApiError::Conflict(_) => tracing::warn!(error = %self, "Error occurred"),
            ApiError::Storage(_) => tracing::error!(error = %self, "Storage failure"),
        }

        (self.status_code(), Json(ErrorBody {
            success: false,
            error: self.to_string(),
        })).into_response()
    }
}
