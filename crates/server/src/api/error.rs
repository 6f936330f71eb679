//! HTTP error mapping for the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use turnstile_core::audit::AuditError;
use turnstile_core::ledger::LedgerError;
use turnstile_core::ticket::TicketError;
use turnstile_core::users::UserError;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An API error: a status code plus a JSON error message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<TicketError> for ApiError {
    fn from(e: TicketError) -> Self {
        let status = match &e {
            TicketError::NotFound(_) => StatusCode::NOT_FOUND,
            TicketError::NotOwned { .. } => StatusCode::FORBIDDEN,
            TicketError::WrongStatus { .. } | TicketError::NoEligibleTickets => {
                StatusCode::CONFLICT
            }
            TicketError::Validation(_) => StatusCode::BAD_REQUEST,
            TicketError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let status = match &e {
            LedgerError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::NoEligibleTickets => StatusCode::CONFLICT,
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        let status = match &e {
            UserError::NotFound(_) => StatusCode::NOT_FOUND,
            UserError::DuplicateEmail(_) | UserError::DuplicateToken => StatusCode::CONFLICT,
            UserError::Validation(_) => StatusCode::BAD_REQUEST,
            UserError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<AuditError> for ApiError {
    fn from(e: AuditError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}
