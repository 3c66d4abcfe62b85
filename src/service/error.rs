use thiserror::Error;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition from {current} to {requested}")]
    InvalidTransition { current: String, requested: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    pub fn invalid_transition(current: impl ToString, requested: impl ToString) -> Self {
        ServiceError::InvalidTransition {
            current: current.to_string(),
            requested: requested.to_string(),
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        http_error(self).status
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ServiceError::Conflict(db_err.message().to_string());
            }
        }
        ServiceError::Database(err)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

fn http_error(error: &ServiceError) -> HttpError {
    match error {
        ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),
        ServiceError::InvalidTransition { .. } | ServiceError::Conflict(_) => {
            HttpError::conflict(error.to_string())
        }
        ServiceError::Forbidden(_) => HttpError::forbidden(error.to_string()),
        ServiceError::NotFound(_) => HttpError::not_found(error.to_string()),
        ServiceError::InsufficientFunds { .. } => HttpError::payment_required(error.to_string()),
        ServiceError::Provider(_) => HttpError::bad_gateway(error.to_string()),
        // Driver details stay in the logs
        ServiceError::Database(_) => HttpError::server_error("Internal database error"),
        ServiceError::Other(_) => HttpError::server_error(error.to_string()),
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        if let ServiceError::Database(e) = &error {
            tracing::error!("Database error: {}", e);
        }
        http_error(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServiceError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::invalid_transition("pending", "completed").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ServiceError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ServiceError::NotFound("Payment".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::InsufficientFunds { required: "1100".into(), available: "1000".into() }
                .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(ServiceError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ServiceError::Provider("timeout".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ServiceError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_transition_message_names_both_states() {
        let err = ServiceError::invalid_transition("completed", "cancelled");
        assert_eq!(err.to_string(), "Invalid transition from completed to cancelled");
    }
}
