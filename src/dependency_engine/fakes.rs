//! In-memory `system.tables` used by the catalog, assembler and handler tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use super::catalog::DATABASE_TABLES_QUERY;
use crate::clickhouse::{ClickHouseError, QueryExecutor, QueryResponse};

#[derive(Default)]
pub struct FakeCatalog {
    pub tables: Vec<Value>,
    pub existing: Vec<Value>,
    pub failure: Option<(u32, &'static str)>,
    pub calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeCatalog {
    /// `tables` are the rows of the graphed database; they also exist.
    pub fn new(tables: Vec<Value>, extra_existing: Vec<Value>) -> Self {
        let mut existing: Vec<Value> = tables
            .iter()
            .map(|t| json!({"database": t["database"], "name": t["name"], "engine": t["engine"]}))
            .collect();
        existing.extend(extra_existing);

        Self {
            tables,
            existing,
            ..Default::default()
        }
    }

    pub fn failing(code: u32, message: &'static str) -> Self {
        Self {
            failure: Some((code, message)),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryExecutor for FakeCatalog {
    async fn query_json(
        &self,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<QueryResponse<Value>, ClickHouseError> {
        self.calls.lock().unwrap().push((
            sql.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));

        if let Some((code, message)) = self.failure {
            return Err(ClickHouseError::Server {
                code,
                message: message.to_string(),
                kind: "UNKNOWN_DATABASE".to_string(),
            });
        }

        let data = if sql == DATABASE_TABLES_QUERY {
            let database = params
                .iter()
                .find(|(name, _)| *name == "database")
                .map(|(_, value)| *value)
                .unwrap_or_default();
            self.tables
                .iter()
                .filter(|t| t["database"] == database)
                .cloned()
                .collect()
        } else {
            self.existing.clone()
        };

        Ok(QueryResponse {
            rows: data.len() as u64,
            data,
            statistics: None,
        })
    }
}

pub fn table(database: &str, name: &str, engine: &str, ddl: &str) -> Value {
    json!({
        "database": database,
        "name": name,
        "engine": engine,
        "total_rows": 10,
        "total_bytes": 1024,
        "dependencies_database": [],
        "dependencies_table": [],
        "create_table_query": ddl,
    })
}

pub fn table_with_deps(database: &str, name: &str, engine: &str, deps: &[(&str, &str)]) -> Value {
    let mut row = table(database, name, engine, "");
    row["dependencies_database"] = json!(deps.iter().map(|(db, _)| *db).collect::<Vec<_>>());
    row["dependencies_table"] = json!(deps.iter().map(|(_, t)| *t).collect::<Vec<_>>());
    row
}

pub fn existing(database: &str, name: &str, engine: &str) -> Value {
    json!({"database": database, "name": name, "engine": engine})
}
