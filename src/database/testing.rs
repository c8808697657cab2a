//! Scripted client for unit tests.

use crate::config::FirebirdConfig;
use crate::database::probe::Preconditions;
use crate::database::result::{QueryResult, Row};
use crate::database::traits::{Connection, DatabaseClient, returns_rows};
use crate::error::{DatabaseError, DbResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
enum Reply {
    Rows(Vec<Row>),
    Fail(String),
}

/// Answers statements by substring match, first registered pattern wins.
/// Unmatched row-returning statements yield no rows; other statements
/// report one affected row.
#[derive(Clone)]
pub struct ScriptedClient {
    preconditions: Preconditions,
    refusal: Option<String>,
    replies: Vec<(String, Reply)>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            preconditions: Preconditions {
                driver_available: true,
                client_library: Some(PathBuf::from("/opt/firebird/lib/libfbclient.so")),
                search_path: None,
            },
            refusal: None,
            replies: Vec::new(),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn respond(mut self, pattern: &str, rows: Vec<Row>) -> Self {
        self.replies.push((pattern.to_string(), Reply::Rows(rows)));
        self
    }

    pub fn fail(mut self, pattern: &str, message: &str) -> Self {
        self.replies
            .push((pattern.to_string(), Reply::Fail(message.to_string())));
        self
    }

    pub fn refuse(mut self, message: &str) -> Self {
        self.refusal = Some(message.to_string());
        self
    }

    pub fn preconditions(mut self, preconditions: Preconditions) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl DatabaseClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn preconditions(&self) -> Preconditions {
        self.preconditions.clone()
    }

    fn connect(&self, _target: &FirebirdConfig) -> DbResult<Box<dyn Connection>> {
        match &self.refusal {
            Some(message) => Err(DatabaseError::Connection(message.clone())),
            None => Ok(Box::new(ScriptedConnection {
                replies: self.replies.clone(),
                executed: Arc::clone(&self.executed),
            })),
        }
    }
}

struct ScriptedConnection {
    replies: Vec<(String, Reply)>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl Connection for ScriptedConnection {
    fn execute(&mut self, sql: &str, _params: &[Value]) -> DbResult<QueryResult> {
        self.executed.lock().push(sql.to_string());

        let reply = self
            .replies
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Fail(message)) => Err(DatabaseError::Query(message)),
            Some(Reply::Rows(rows)) => {
                let columns = rows
                    .first()
                    .map(|row| row.columns().map(str::to_string).collect())
                    .unwrap_or_default();
                Ok(QueryResult::rows(columns, rows, 1))
            }
            None if returns_rows(sql) => Ok(QueryResult::rows(vec![], vec![], 1)),
            None => Ok(QueryResult::affected(1, 1)),
        }
    }
}
