//! Database client traits.
//!
//! The client is synchronous: the server handles one request at a time and
//! each tool call opens its own connection.

use crate::config::FirebirdConfig;
use crate::database::probe::Preconditions;
use crate::database::result::QueryResult;
use crate::error::{DatabaseError, DbResult};
use serde_json::Value;

/// Entry point to a database driver.
///
/// Implementations: [`UnavailableClient`] and, with the `firebird` feature,
/// [`FirebirdClient`](crate::database::FirebirdClient).
pub trait DatabaseClient: Send + Sync {
    /// Returns the driver name.
    fn name(&self) -> &'static str;

    /// Library state checked before any connection attempt.
    fn preconditions(&self) -> Preconditions;

    /// Opens a connection to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Connection`] carrying the driver's failure text.
    fn connect(&self, target: &FirebirdConfig) -> DbResult<Box<dyn Connection>>;
}

/// An open connection. Dropped when the tool call finishes.
pub trait Connection {
    /// Executes one statement with positional parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Query`] carrying the driver's failure text.
    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<QueryResult>;
}

/// Client used when the crate is built without a Firebird driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableClient;

impl DatabaseClient for UnavailableClient {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn preconditions(&self) -> Preconditions {
        Preconditions {
            driver_available: false,
            client_library: None,
            search_path: None,
        }
    }

    fn connect(&self, _target: &FirebirdConfig) -> DbResult<Box<dyn Connection>> {
        Err(DatabaseError::DriverUnavailable)
    }
}

/// Whether a statement produces a row set.
pub fn returns_rows(sql: &str) -> bool {
    sql.trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("select"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_client_refuses() {
        let client = UnavailableClient;
        assert!(!client.preconditions().driver_available);
        assert!(matches!(
            client.connect(&FirebirdConfig::default()),
            Err(DatabaseError::DriverUnavailable)
        ));
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("  select 1 from rdb$database"));
        assert!(returns_rows("SELECT(1) FROM RDB$DATABASE"));
        assert!(!returns_rows("UPDATE t SET a = 1"));
        assert!(!returns_rows(""));
    }
}
