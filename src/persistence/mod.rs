//! Persistence gateway interface.
//!
//! The kernel does not ship a database driver. Controllers pull a
//! `dyn Database` from the service registry and execute parameterized
//! statements through it; failures propagate as [`DatabaseError`] and end
//! the request with a 500.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::{self, ServiceRegistry};

/// One result row: column name → value, in column order.
pub type Row = Map<String, Value>;

/// Outcome of a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Materialized rows (empty for statements that return none).
    pub rows: Vec<Row>,
    /// Rows affected by a write.
    pub affected: u64,
    /// Identifier generated by the last insert, if any.
    pub last_insert_id: Option<i64>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// First row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("statement failed: {0}")]
    Statement(String),

    #[error("parameter count mismatch: expected {expected}, got {actual}")]
    Parameters { expected: usize, actual: usize },
}

/// Parameterized statement execution.
pub trait Database: Send + Sync {
    /// Execute `sql` with positional `params`.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError>;
}

/// Registry slot holding the database collaborator.
///
/// Trait objects cannot be stored in the registry directly, so the database
/// is wrapped in this handle.
#[derive(Clone)]
pub struct DatabaseHandle(pub Arc<dyn Database>);

impl DatabaseHandle {
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError> {
        self.0.execute(sql, params)
    }
}

/// Register `database` under the well-known name.
pub fn register(registry: &ServiceRegistry, database: Arc<dyn Database>) {
    registry.set(registry::DATABASE, Arc::new(DatabaseHandle(database)));
}

/// The registered database, if any.
pub fn lookup(registry: &ServiceRegistry) -> Option<Arc<DatabaseHandle>> {
    registry.get::<DatabaseHandle>(registry::DATABASE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Students;

    impl Database for Students {
        fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError> {
            if !sql.starts_with("SELECT") {
                return Err(DatabaseError::Statement(format!("unsupported: {}", sql)));
            }
            if params.len() != 1 {
                return Err(DatabaseError::Parameters { expected: 1, actual: params.len() });
            }
            let mut row = Row::new();
            row.insert("id".into(), params[0].clone());
            row.insert("name".into(), json!("Ada"));
            Ok(QueryResult::from_rows(vec![row]))
        }
    }

    #[test]
    fn test_registered_database_round_trip() {
        let registry = ServiceRegistry::new();
        register(&registry, Arc::new(Students));

        let db = lookup(&registry).unwrap();
        let result = db.execute("SELECT * FROM students WHERE id = ?", &[json!(7)]).unwrap();
        assert_eq!(result.first().unwrap()["name"], json!("Ada"));

        let err = db.execute("DELETE FROM students", &[]).unwrap_err();
        assert!(matches!(err, DatabaseError::Statement(_)));
    }

    #[test]
    fn test_lookup_without_registration() {
        assert!(lookup(&ServiceRegistry::new()).is_none());
    }
}
