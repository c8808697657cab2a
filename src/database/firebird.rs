//! Firebird driver backed by `rsfbclient`, loading `libfbclient` at runtime.

use crate::config::FirebirdConfig;
use crate::database::probe::{LibraryProbe, Preconditions};
use crate::database::result::{CellValue, QueryResult, Row};
use crate::database::traits::{Connection, DatabaseClient, returns_rows};
use crate::error::{DatabaseError, DbResult};
use rsfbclient::prelude::*;
use rsfbclient::SqlType;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

/// Firebird client. Preconditions are probed once at startup.
pub struct FirebirdClient {
    preconditions: Preconditions,
}

impl FirebirdClient {
    pub fn new(config: &FirebirdConfig) -> Self {
        let preconditions =
            LibraryProbe::from_env(config.client_library.as_deref()).preconditions(true);
        info!(library = ?preconditions.client_library, "Firebird driver initialized");
        Self { preconditions }
    }
}

impl DatabaseClient for FirebirdClient {
    fn name(&self) -> &'static str {
        "firebird"
    }

    fn preconditions(&self) -> Preconditions {
        self.preconditions.clone()
    }

    fn connect(&self, target: &FirebirdConfig) -> DbResult<Box<dyn Connection>> {
        let library = self
            .preconditions
            .client_library
            .as_ref()
            .ok_or(DatabaseError::ClientLibraryUnavailable)?;

        debug!(dsn = %target.dsn(), "Connecting to Firebird");
        let conn = rsfbclient::builder_native()
            .with_dyn_load(library.to_string_lossy().into_owned())
            .with_remote()
            .host(target.host.as_str())
            .port(target.port)
            .db_name(target.database.as_str())
            .user(target.user.as_str())
            .pass(target.password.as_str())
            .connect()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        Ok(Box::new(FirebirdConnection { conn }))
    }
}

struct FirebirdConnection<C> {
    conn: C,
}

impl<C: Queryable + Execute> Connection for FirebirdConnection<C> {
    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<QueryResult> {
        let params: Vec<SqlType> = params.iter().map(to_sql).collect();
        let start = Instant::now();

        if returns_rows(sql) {
            let fb_rows: Vec<rsfbclient::Row> = self
                .conn
                .query(sql, params)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            let columns = fb_rows
                .first()
                .map(|row| row.cols.iter().map(|c| c.name.clone()).collect())
                .unwrap_or_default();
            let rows = fb_rows
                .into_iter()
                .map(|row| {
                    row.cols
                        .into_iter()
                        .map(|col| (col.name, from_sql(col.value)))
                        .collect::<Row>()
                })
                .collect();

            Ok(QueryResult::rows(
                columns,
                rows,
                start.elapsed().as_millis() as u64,
            ))
        } else {
            let affected = self
                .conn
                .execute(sql, params)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            Ok(QueryResult::affected(
                affected,
                start.elapsed().as_millis() as u64,
            ))
        }
    }
}

fn to_sql(value: &Value) -> SqlType {
    match value {
        Value::Null => SqlType::Null,
        Value::Bool(b) => SqlType::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlType::Integer(i),
            None => SqlType::Floating(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlType::Text(s.clone()),
        other => SqlType::Text(other.to_string()),
    }
}

fn from_sql(value: SqlType) -> CellValue {
    match value {
        SqlType::Null => CellValue::Null,
        SqlType::Boolean(b) => CellValue::Bool(b),
        SqlType::Integer(i) => CellValue::Int(i),
        SqlType::Floating(f) => CellValue::Float(f),
        SqlType::Text(s) => CellValue::String(s),
        SqlType::Binary(b) => CellValue::Bytes(b),
        #[allow(unreachable_patterns)]
        other => CellValue::String(format!("{:?}", other)),
    }
}
