use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::model::leave_request::LeaveStatus;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("too many overlapping leaves in department ({overlaps}/{threshold})")]
    Conflict { overlaps: u64, threshold: u32 },

    #[error("unsupported transition from {from} to {to}")]
    InvalidTransition { from: LeaveStatus, to: LeaveStatus },

    #[error("store failure: {0}")]
    Infrastructure(#[from] StoreError),
}

impl LeaveError {
    pub fn leave_not_found(id: u64) -> Self {
        LeaveError::NotFound(format!("leave request {id}"))
    }

    pub fn employee_not_found(id: u64) -> Self {
        LeaveError::NotFound(format!("employee {id}"))
    }

    /// Only transient store failures are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LeaveError::Infrastructure(e) if e.is_transient())
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation(_) => StatusCode::BAD_REQUEST,
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Conflict { .. } => StatusCode::CONFLICT,
            LeaveError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LeaveError::Infrastructure(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            LeaveError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // don't leak driver details
            LeaveError::Infrastructure(e) if e.is_transient() => {
                "Service temporarily unavailable, retry later".to_string()
            }
            LeaveError::Infrastructure(_) => "Stored leave data is inconsistent".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "message": message,
            "retryable": self.is_retryable(),
        }))
    }
}
