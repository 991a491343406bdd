//! Error types for the tenant database engine.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Validation errors are raised before any statement reaches the store; driver
//! failures are folded into `Engine`, `Connection` or `Timeout`.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid identifier: '{name}'")]
    InvalidIdentifier { name: String },

    #[error("Invalid type: {message}")]
    InvalidType { message: String },

    #[error("Invalid columns for table '{table}': {}", .columns.join(", "))]
    InvalidColumn { table: String, columns: Vec<String> },

    #[error("Column '{column}' already exists in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Table '{table}' already has a primary key")]
    DuplicatePrimaryKey { table: String },

    #[error("Table '{schema}.{table}' not found or has no visible columns")]
    SchemaNotFound { schema: String, table: String },

    #[error("DDL failed: {message}")]
    DdlFailure {
        message: String,
        /// e.g., "42P07" for duplicate table
        sql_state: Option<String>,
    },

    #[error("Database error: {message}")]
    Engine {
        message: String,
        sql_state: Option<String>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Tenant database '{tenant}' not found")]
    TenantNotFound { tenant: String },

    #[error("Tenant limit reached: at most {limit} tenant pools may be open")]
    TenantLimitReached { limit: usize },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

/// Stable, transport-independent classification of a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidIdentifier,
    InvalidType,
    InvalidColumn,
    DuplicateColumn,
    DuplicatePrimaryKey,
    SchemaNotFound,
    DdlFailure,
    EngineError,
    Connection,
    Timeout,
    TenantNotFound,
    TenantLimitReached,
    InvalidInput,
}

impl DbError {
    /// Create an invalid identifier error.
    pub fn invalid_identifier(name: impl Into<String>) -> Self {
        Self::InvalidIdentifier { name: name.into() }
    }

    /// Create an invalid type error.
    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::InvalidType {
            message: message.into(),
        }
    }

    /// Create an invalid column error listing every offending column.
    pub fn invalid_column(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self::InvalidColumn {
            table: table.into(),
            columns,
        }
    }

    pub fn duplicate_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DuplicateColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn duplicate_primary_key(table: impl Into<String>) -> Self {
        Self::DuplicatePrimaryKey {
            table: table.into(),
        }
    }

    pub fn schema_not_found(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self::SchemaNotFound {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Create a DDL failure with optional SQL state.
    pub fn ddl_failure(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::DdlFailure {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a catch-all engine error with optional SQL state.
    pub fn engine(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Engine {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn tenant_not_found(tenant: impl Into<String>) -> Self {
        Self::TenantNotFound {
            tenant: tenant.into(),
        }
    }

    pub fn tenant_limit_reached(limit: usize) -> Self {
        Self::TenantLimitReached { limit }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Re-tag a driver failure raised while executing DDL.
    ///
    /// Validation and constraint errors pass through unchanged.
    pub fn into_ddl_failure(self) -> Self {
        match self {
            Self::Engine { message, sql_state } => Self::DdlFailure { message, sql_state },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Self::InvalidType { .. } => ErrorKind::InvalidType,
            Self::InvalidColumn { .. } => ErrorKind::InvalidColumn,
            Self::DuplicateColumn { .. } => ErrorKind::DuplicateColumn,
            Self::DuplicatePrimaryKey { .. } => ErrorKind::DuplicatePrimaryKey,
            Self::SchemaNotFound { .. } => ErrorKind::SchemaNotFound,
            Self::DdlFailure { .. } => ErrorKind::DdlFailure,
            Self::Engine { .. } => ErrorKind::EngineError,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::TenantNotFound { .. } => ErrorKind::TenantNotFound,
            Self::TenantLimitReached { .. } => ErrorKind::TenantLimitReached,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::InvalidIdentifier { .. } => {
                Some("Identifiers must match ^[A-Za-z_][A-Za-z0-9_]*$")
            }
            _ => None,
        }
    }

    /// SQLSTATE reported by the server, when the error came from one.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::DdlFailure { sql_state, .. } | Self::Engine { sql_state, .. } => {
                sql_state.as_deref()
            }
            _ => None,
        }
    }

    /// True when the caller's request was at fault (a 4xx-style failure).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Engine { .. }
                | Self::Connection { .. }
                | Self::Timeout { .. }
                | Self::TenantLimitReached { .. }
        )
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout { .. } | Self::TenantLimitReached { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the base connection URL format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::engine(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::engine("No rows returned", None),
            // The executor reports the configured value; this is the pool default
            sqlx::Error::PoolTimedOut => DbError::timeout(
                "connection pool acquire",
                crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            ),
            sqlx::Error::PoolClosed => DbError::connection(
                "Connection pool is closed",
                "The tenant pool was shut down; retry to open a new one",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::engine(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::engine(format!("Failed to decode column {}: {}", index, source), None)
            }
            sqlx::Error::Decode(source) => DbError::engine(format!("Decode error: {}", source), None),
            sqlx::Error::WorkerCrashed => DbError::engine("Database worker crashed", None),
            _ => DbError::engine(format!("Unknown database error: {}", err), None),
        }
    }
}

/// Result type alias for engine operations.
pub type DbResult<T> = Result<T, DbError>;

/// Sanitized error view handed to whatever transport sits in front of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<&DbError> for ErrorResponse {
    fn from(err: &DbError) -> Self {
        let message = match err {
            // Driver and connection detail can carry hostnames, credentials or
            // statement text; keep it in the logs only.
            DbError::Engine { .. } | DbError::Connection { .. } => {
                tracing::error!(error = %err, sql_state = ?err.sql_state(), "Internal engine failure");
                "Internal database error".to_string()
            }
            _ => err.to_string(),
        };

        ErrorResponse {
            kind: err.kind(),
            message,
            suggestion: match err {
                DbError::Connection { .. } => None,
                _ => err.suggestion().map(String::from),
            },
        }
    }
}
