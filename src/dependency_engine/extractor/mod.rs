use super::catalog::{fetch_database_tables, fetch_existence_index, ExistenceIndex, TableRow};
use super::graph::{DependencyGraph, EdgeType, GraphNode, QualifiedName};
use super::parser::extract_dependencies;
use crate::clickhouse::{ClickHouseError, QueryExecutor};

const DEFAULT_HOP_DEPTH: usize = 2;

/// Add `name` as a node if it is already in the graph or exists on the server.
/// Returns the node id, or `None` when the reference is dangling.
fn ensure_node(
    graph: &mut DependencyGraph,
    existing: &ExistenceIndex,
    name: &QualifiedName,
) -> Option<String> {
    let id = name.id();
    if graph.contains_node(&id) {
        return Some(id);
    }

    match existing.exists(&name.database, &name.name) {
        Some(engine) => Some(graph.add_node(GraphNode::new(&name.database, &name.name, engine))),
        None => {
            log::debug!("Dropping reference to missing object {}", id);
            None
        }
    }
}

fn link(
    graph: &mut DependencyGraph,
    existing: &ExistenceIndex,
    dependent_id: &str,
    dependency: &QualifiedName,
    edge_type: EdgeType,
) {
    let Some(dependency_id) = ensure_node(graph, existing, dependency) else {
        return;
    };

    if edge_type.flows_into_dependent() {
        graph.add_edge(&dependency_id, dependent_id, edge_type);
    } else {
        graph.add_edge(dependent_id, &dependency_id, edge_type);
    }
}

/// Build one database's dependency graph from already-fetched catalog rows.
///
/// Pass 1 adds every row as a node. Pass 2 walks each row's structural
/// dependents (`row -> dependent` source edges) and the references parsed
/// from its DDL; objects outside the row set become nodes only if `existing`
/// knows them.
pub fn assemble_graph(rows: &[TableRow], existing: &ExistenceIndex) -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    // 1) Nodes
    for row in rows {
        graph.add_node(
            GraphNode::new(&row.database, &row.name, &row.engine)
                .with_counts(row.total_rows, row.total_bytes),
        );
    }

    // 2) Edges
    for row in rows {
        let row_id = row.qualified_name().id();

        for dependent in row.structural_dependents() {
            if let Some(dependent_id) = ensure_node(&mut graph, existing, &dependent) {
                graph.add_edge(&row_id, &dependent_id, EdgeType::Source);
            }
        }

        let parsed = extract_dependencies(&row.create_table_query, &row.engine, &row.database);
        for (dependency, edge_type) in parsed.dependencies {
            link(&mut graph, existing, &row_id, &dependency, edge_type);
        }
    }

    graph
}

/// Read the catalog for `database` and assemble its dependency graph,
/// optionally narrowed to the neighborhood of `table_name`.
pub async fn build_dependency_graph_clickhouse(
    executor: &dyn QueryExecutor,
    database: &str,
    table_name: Option<&str>,
    hop_depth: Option<usize>,
) -> Result<DependencyGraph, ClickHouseError> {
    log::debug!("Building dependency graph for database {}", database);

    let (rows, existing) = tokio::try_join!(
        fetch_database_tables(executor, database),
        fetch_existence_index(executor),
    )?;

    let mut graph = assemble_graph(&rows, &existing);

    if let Some(target) = table_name.map(str::trim).filter(|t| !t.is_empty()) {
        let hops = hop_depth.unwrap_or(DEFAULT_HOP_DEPTH).max(1);
        graph.filter_neighborhood(target, Some(database), hops);
    }

    log::debug!(
        "Dependency graph for {}: {} nodes, {} edges",
        database,
        graph.node_count(),
        graph.edge_count()
    );

    Ok(graph)
}
