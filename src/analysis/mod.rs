//! Pure text classifiers: SQL statements and connection failures.

pub mod diagnostics;
pub mod sql;

pub use diagnostics::{ConnectionContext, DiagnosticResult, ErrorCategory};
pub use sql::{Category, Classification, Complexity, StatementType};
