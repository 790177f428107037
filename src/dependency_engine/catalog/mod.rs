use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

use super::graph::QualifiedName;
use crate::clickhouse::{query, ClickHouseError, QueryExecutor};

pub const DATABASE_TABLES_QUERY: &str = "SELECT database, name, engine, total_rows, total_bytes, \
     dependencies_database, dependencies_table, create_table_query \
     FROM system.tables WHERE database = {database:String}";

pub const EXISTING_TABLES_QUERY: &str = "SELECT database, name, engine FROM system.tables";

// ===== CATALOG ROWS =====

/// One `system.tables` row of the database being graphed.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TableRow {
    pub database: String,
    pub name: String,
    #[serde(default)]
    pub engine: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_rows: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_bytes: Option<u64>,
    #[serde(default)]
    pub dependencies_database: Vec<String>,
    #[serde(default)]
    pub dependencies_table: Vec<String>,
    #[serde(default)]
    pub create_table_query: String,
}

impl TableRow {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.database, &self.name)
    }

    /// Objects the server records as reading from this row, typically the
    /// materialized views attached to a source table. Pairs the two parallel
    /// dependency columns index by index. An empty database entry means the
    /// row's own database; entries without a table name are skipped.
    pub fn structural_dependents(&self) -> Vec<QualifiedName> {
        self.dependencies_database
            .iter()
            .zip(&self.dependencies_table)
            .filter(|(_, table)| !table.trim().is_empty())
            .map(|(database, table)| {
                let database = match database.trim() {
                    "" => self.database.as_str(),
                    db => db,
                };
                QualifiedName::new(database, table.trim())
            })
            .collect()
    }
}

/// UInt64 columns arrive as JSON numbers, or as strings when the server quotes
/// 64-bit integers; nullable columns arrive as `null`.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

// ===== EXISTENCE INDEX =====

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExistingTable {
    pub database: String,
    pub name: String,
    #[serde(default)]
    pub engine: String,
}

/// Every table, view and dictionary on the server, keyed by (database, name).
#[derive(Debug, Clone, Default)]
pub struct ExistenceIndex {
    engines: HashMap<(String, String), String>,
}

impl ExistenceIndex {
    /// Engine of `database.table` if it exists.
    pub fn exists(&self, database: &str, table: &str) -> Option<&str> {
        self.engines
            .get(&(database.to_string(), table.to_string()))
            .map(String::as_str)
    }
}

impl FromIterator<ExistingTable> for ExistenceIndex {
    fn from_iter<I: IntoIterator<Item = ExistingTable>>(iter: I) -> Self {
        let engines = iter
            .into_iter()
            .map(|table| ((table.database, table.name), table.engine))
            .collect();
        Self { engines }
    }
}

// ===== CATALOG READS =====

pub async fn fetch_database_tables(
    executor: &dyn QueryExecutor,
    database: &str,
) -> Result<Vec<TableRow>, ClickHouseError> {
    let response = query::<TableRow>(executor, DATABASE_TABLES_QUERY, &[("database", database)]).await?;
    log::debug!("Read {} tables from database {}", response.data.len(), database);
    Ok(response.data)
}

pub async fn fetch_existence_index(
    executor: &dyn QueryExecutor,
) -> Result<ExistenceIndex, ClickHouseError> {
    let response = query::<ExistingTable>(executor, EXISTING_TABLES_QUERY, &[]).await?;
    log::debug!("Existence index holds {} objects", response.data.len());
    Ok(response.data.into_iter().collect())
}
