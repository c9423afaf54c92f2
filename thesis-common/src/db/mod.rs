//! Database schema and queries
//!
//! Query functions take `&mut SqliteConnection` so the workflow engines can
//! run several of them inside one transaction (`&mut *tx`) and read-only
//! callers can pass a pooled connection.

pub mod assignments;
pub mod comments;
pub mod init;
pub mod migrations;
pub mod progress;
pub mod theses;
pub mod users;

pub use assignments::*;
pub use comments::*;
pub use init::*;
pub use migrations::*;
pub use progress::*;
pub use theses::*;
pub use users::*;

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

/// Parse a stored UUID column
pub(crate) fn parse_uuid(value: &str, column: &str) -> Result<Uuid> {
    crate::uuid_utils::parse(value)
        .map_err(|e| Error::Internal(format!("corrupt {} '{}': {}", column, value, e)))
}

pub(crate) fn parse_opt_uuid(value: Option<String>, column: &str) -> Result<Option<Uuid>> {
    value.map(|v| parse_uuid(&v, column)).transpose()
}

/// Parse a stored RFC 3339 timestamp column
pub(crate) fn parse_time(value: &str, column: &str) -> Result<DateTime<Utc>> {
    crate::time::from_db(value)
        .map_err(|e| Error::Internal(format!("corrupt {} '{}': {}", column, value, e)))
}

pub(crate) fn parse_opt_time(value: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_time(&v, column)).transpose()
}

pub(crate) fn opt_time_to_db(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.as_ref().map(crate::time::to_db)
}

/// Parse a stored enum column; unknown values are corruption, not user error
pub(crate) fn parse_enum<T>(value: &str, column: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    value
        .parse()
        .map_err(|_| Error::Internal(format!("unknown {} '{}' in database", column, value)))
}
