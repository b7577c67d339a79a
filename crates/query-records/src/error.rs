use std::path::PathBuf;

use thiserror::Error;

use crate::core::cast::CastError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid cast for column `{column}`: {source}")]
    InvalidCast {
        column: String,
        #[source]
        source: CastError,
    },

    #[error("unsupported type directive `{directive}` for column `{column}`")]
    UnsupportedDirective { column: String, directive: String },

    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParams(Vec<String>),

    #[error("unknown parameters provided: {}", .0.join(", "))]
    UnknownParams(Vec<String>),

    #[error("cannot use all() on `{0}` because it declares bindings; use with() instead")]
    BindingsPresent(String),

    #[error("sql file not found: {0}")]
    SqlFileNotFound(String),

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("failed to open database: {path}: {source}")]
    DbOpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sql error: {0}")]
    SqlError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::SqlError(e.to_string())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::InvalidCast { .. } => "INVALID_CAST",
            AppError::UnsupportedDirective { .. } => "UNSUPPORTED_DIRECTIVE",
            AppError::MissingParams(_) => "MISSING_PARAMS",
            AppError::UnknownParams(_) => "UNKNOWN_PARAMS",
            AppError::BindingsPresent(_) => "BINDINGS_PRESENT",
            AppError::SqlFileNotFound(_) => "SQL_FILE_NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::DbOpenFailed { .. } => "DB_OPEN_FAILED",
            AppError::SqlError(_) => "SQL_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
