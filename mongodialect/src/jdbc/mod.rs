//! The JDBC-shaped facade: connection, statement, and result-set emulations
//! over the MongoDB driver's sync API.
//!
//! Each instance is designed for single-threaded use, matching conventional
//! JDBC discipline; there is no internal locking and sharing one instance
//! across threads is not supported. Every public operation on a closed
//! resource fails with a typed "closed" error before any other validation.

pub mod command;
mod connection;
mod result_set;
mod statement;

#[cfg(test)]
mod test;

pub use connection::{
    MongoConnection, ResultSetConcurrency, ResultSetHoldability, ResultSetType,
};
pub use result_set::MongoResultSet;
pub use statement::{MongoPreparedStatement, MongoStatement};

use crate::types::JdbcType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The vendor error code reported when the driver supplies none.
pub const NO_ERROR_CODE: i32 = 0;

/// Batch update-count sentinel: the operation succeeded but its row count is
/// unknown.
pub const SUCCESS_NO_INFO: i64 = -2;

/// Batch update-count sentinel: the operation failed or was never attempted
/// because an earlier operation in the batch failed.
pub const EXECUTE_FAILED: i64 = -3;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} is closed")]
    Closed(&'static str),
    #[error("parameter index {index} out of range: must be between 1 and {count}")]
    ParameterIndexOutOfRange { index: usize, count: usize },
    #[error("parameter {0} was never bound")]
    UnboundParameter(usize),
    #[error("column index {index} out of range: must be between 1 and {count}")]
    ColumnIndexOutOfRange { index: usize, count: usize },
    #[error("no column labeled '{0}' in this result set")]
    NoSuchColumn(String),
    #[error("no current row: call next() first")]
    NoCurrentRow,
    #[error("mongodialect only supports forward-only, read-only, non-holdable result sets: requested {0}")]
    UnsupportedCursor(&'static str),
    #[error("explicit {0} is not allowed while autocommit is enabled")]
    AutoCommitViolation(&'static str),
    #[error("invalid command: {reason}: {text}")]
    Syntax { reason: String, text: String },
    #[error("expected {expected} command, got {got}")]
    WrongCommandKind {
        expected: &'static str,
        got: &'static str,
    },
    #[error("cannot convert {from} column value to {to}")]
    TypeConversion { from: &'static str, to: JdbcType },
    #[error("driver error (code {code}): {message}")]
    Driver {
        code: i32,
        message: String,
        #[source]
        source: Box<mongodb::error::Error>,
    },
    #[error("batch execution failed at operation {failed_operation}: {source}")]
    Batch {
        /// Per-operation update counts: real row counts before the failure,
        /// `EXECUTE_FAILED` from the failure point onward.
        update_counts: Vec<i64>,
        failed_operation: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The stable vendor error code: the driver's own code where available,
    /// `NO_ERROR_CODE` otherwise.
    pub fn vendor_code(&self) -> i32 {
        match self {
            Error::Driver { code, .. } => *code,
            Error::Batch { source, .. } => source.vendor_code(),
            _ => NO_ERROR_CODE,
        }
    }

    /// An SQL-state, only where one can be meaningfully derived.
    pub fn sql_state(&self) -> Option<&'static str> {
        match self {
            Error::Syntax { .. } | Error::WrongCommandKind { .. } => Some("42000"),
            Error::UnsupportedCursor(_) => Some("0A000"),
            _ => None,
        }
    }
}

pub(crate) fn map_driver_error(error: mongodb::error::Error) -> Error {
    Error::Driver {
        code: driver_error_code(&error),
        message: error.to_string(),
        source: Box::new(error),
    }
}

fn driver_error_code(error: &mongodb::error::Error) -> i32 {
    use mongodb::error::{ErrorKind, WriteFailure};
    match &*error.kind {
        ErrorKind::Command(c) => c.code,
        ErrorKind::Write(WriteFailure::WriteError(w)) => w.code,
        ErrorKind::Write(WriteFailure::WriteConcernError(w)) => w.code,
        ErrorKind::Write(_) => NO_ERROR_CODE,
        ErrorKind::InsertMany(e) => e
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|w| w.code)
            .unwrap_or(NO_ERROR_CODE),
        _ => NO_ERROR_CODE,
    }
}
