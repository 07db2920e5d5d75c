use thiserror::Error;
use uuid::Uuid;

/// One employee that could not be imported, with the reason the source
/// gave us. Collected rather than aborting the whole run.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub employee_id: Uuid,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Attendance import failed for all {} employee(s)", .failures.len())]
    PartialImportFailure { failures: Vec<ImportFailure> },

    #[error("Internal error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    Internal(Option<String>),
}

impl AppError {
    pub fn not_found(entity: &str, id: Uuid) -> Self {
        AppError::NotFound(format!("{} {}", entity, id))
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        AppError::StateConflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationFailure(message.into())
    }

    pub fn internal_message(message: impl Into<String>) -> Self {
        AppError::Internal(Some(message.into()))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);
        AppError::DatabaseError(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        // Repositories return anyhow::Result; domain errors they raise are
        // AppError values wrapped in anyhow, so unwrap those first.
        if error.is::<AppError>() {
            match error.downcast::<AppError>() {
                Ok(app_err) => return app_err,
                Err(original_error) => {
                    return AppError::Internal(Some(original_error.to_string()));
                }
            }
        }

        if error.is::<sqlx::Error>() {
            match error.downcast::<sqlx::Error>() {
                Ok(sqlx_err) => return AppError::DatabaseError(sqlx_err),
                Err(original_error) => {
                    return AppError::Internal(Some(original_error.to_string()));
                }
            }
        }

        log::error!("Unhandled error: {}", error);
        AppError::Internal(Some(error.to_string()))
    }
}
