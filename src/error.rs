use crate::udbc::result::UpdateCount;
use thiserror::Error;

/// Errors surfaced by the pool, the drivers and the execution template.
///
/// Driver errors are never swallowed: they are classified into one of the
/// kinds below and returned to the immediate caller.
#[derive(Error, Debug)]
pub enum DbError {
    /// A physical connection could not be opened, validated or used.
    #[error("Connection error: {0}")]
    Connection(String),
    /// No connection became available within the acquire timeout.
    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),
    /// Bound parameters do not match the statement's placeholders.
    #[error("Binding error: {0}")]
    Binding(String),
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("No generated key: {0}")]
    NoGeneratedKey(String),
    /// A batch entry failed; `counts` holds the results of the entries
    /// that completed before it, in submission order.
    #[error("Batch failed after {} statement(s): {source}", counts.len())]
    Batch {
        counts: Vec<UpdateCount>,
        #[source]
        source: Box<DbError>,
    },
    #[error("Database error: {0}")]
    Database(String),
    #[error("Value error: {0}")]
    Value(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unsupported database type: {0}")]
    UnsupportedDatabaseType(String),
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

impl DbError {
    /// Whether the error means the physical connection can no longer be trusted.
    pub fn is_connection_error(&self) -> bool {
        match self {
            DbError::Connection(_) => true,
            DbError::Batch { source, .. } => source.is_connection_error(),
            _ => false,
        }
    }
}

impl serde::ser::Error for DbError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        DbError::Value(msg.to_string())
    }
}

impl serde::de::Error for DbError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        DbError::Value(msg.to_string())
    }
}

#[cfg(feature = "mysql")]
impl From<mysql_async::Error> for DbError {
    fn from(e: mysql_async::Error) -> Self {
        match e {
            mysql_async::Error::Server(err) => {
                let message = format!("{} ({}): {}", err.code, err.state, err.message);
                match err.state.get(..2) {
                    Some("23") => DbError::ConstraintViolation(message),
                    Some("42") => DbError::Syntax(message),
                    Some("08") | Some("28") => DbError::Connection(message),
                    _ => DbError::Database(message),
                }
            }
            mysql_async::Error::Io(err) => DbError::Connection(err.to_string()),
            mysql_async::Error::Url(err) => DbError::InvalidDatabaseUrl(err.to_string()),
            other => DbError::Database(other.to_string()),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;

        match &e {
            rusqlite::Error::SqliteFailure(err, _) => match err.code {
                ErrorCode::ConstraintViolation => DbError::ConstraintViolation(e.to_string()),
                ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::SystemIoFailure => {
                    DbError::Connection(e.to_string())
                }
                _ => DbError::Database(e.to_string()),
            },
            rusqlite::Error::SqlInputError { .. } => DbError::Syntax(e.to_string()),
            rusqlite::Error::InvalidParameterCount(..) | rusqlite::Error::InvalidParameterName(_) => {
                DbError::Binding(e.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..) => DbError::Value(e.to_string()),
            _ => DbError::Database(e.to_string()),
        }
    }
}
