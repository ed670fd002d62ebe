//! Service-layer error type for market-server
//!
//! `ServiceError` bridges store errors (`sqlx::Error`, `BoxError`) and the
//! API error (`AppError`), so store code can `?` both kinds.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Postgres SQLSTATE for serialization_failure
const SERIALIZATION_FAILURE: &str = "40001";
/// Postgres SQLSTATE for deadlock_detected
const DEADLOCK_DETECTED: &str = "40P01";
/// Postgres SQLSTATE for numeric_value_out_of_range
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Service-layer error.
///
/// - `Db`: Database/infrastructure errors (auto-logged, mapped to InternalError)
/// - `App`: Business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error
    Db(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && matches!(
                db_err.code().as_deref(),
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
            )
        {
            tracing::warn!(error = %db_err, "Transaction aborted by concurrent writer");
            return ServiceError::App(AppError::new(ErrorCode::SystemBusy));
        }
        if let sqlx::Error::Database(db_err) = &e
            && db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE)
        {
            return ServiceError::App(AppError::new(ErrorCode::ValueOutOfRange));
        }
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// True if the error is a unique-constraint violation (SQLSTATE 23505)
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_passes_through() {
        let err: ServiceError = AppError::new(ErrorCode::CartEmpty).into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::CartEmpty);
    }

    #[test]
    fn test_db_error_hidden_as_internal() {
        let err: ServiceError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ServiceError::Db(_)));
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InternalError);
        assert_eq!(app.message, ErrorCode::InternalError.message());
    }
}
