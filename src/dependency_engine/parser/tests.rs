use super::*;
use crate::dependency_engine::graph::EdgeType;

fn names(deps: &[Dependency]) -> Vec<String> {
    deps.iter().map(|(n, _)| n.id()).collect()
}

#[test]
fn test_target_with_database() {
    let sql = sanitize("CREATE MATERIALIZED VIEW db.my_mv TO other_db.target (`id` UInt64) AS SELECT id FROM db.src");
    let (name, edge_type) = extract_target_table(&sql, "db").unwrap();
    assert_eq!(name, QualifiedName::new("other_db", "target"));
    assert_eq!(edge_type, EdgeType::Target);
}

#[test]
fn test_target_defaults_database_and_unquotes() {
    let sql = sanitize("CREATE MATERIALIZED VIEW my_mv TO `target_table` AS SELECT * FROM source");
    let (name, _) = extract_target_table(&sql, "analytics").unwrap();
    assert_eq!(name, QualifiedName::new("analytics", "target_table"));
}

#[test]
fn test_target_first_occurrence_only() {
    let sql = sanitize("CREATE MATERIALIZED VIEW mv TO a.first AS SELECT x FROM t WHERE y TO b.second");
    let (name, _) = extract_target_table(&sql, "db").unwrap();
    assert_eq!(name.id(), "a.first");
}

#[test]
fn test_target_absent() {
    let sql = sanitize("CREATE VIEW normal_view AS SELECT 1");
    assert!(extract_target_table(&sql, "db").is_none());
}

#[test]
fn test_target_skips_ttl_disk_clause() {
    let sql = sanitize("CREATE MATERIALIZED VIEW mv ENGINE = MergeTree TTL d + INTERVAL 1 DAY TO DISK 'cold' AS SELECT 1");
    assert!(extract_target_table(&sql, "db").is_none());
}

#[test]
fn test_target_in_comment_ignored() {
    let sql = sanitize("CREATE MATERIALIZED VIEW mv /* TO fake.target */ TO real.target AS SELECT 1");
    let (name, _) = extract_target_table(&sql, "db").unwrap();
    assert_eq!(name.id(), "real.target");
}

#[test]
fn test_join_variants_deduplicated() {
    let sql = sanitize(
        "CREATE VIEW v AS SELECT * FROM t \
         INNER JOIN db2.users AS u ON u.id = t.uid \
         LEFT JOIN orders o ON o.id = t.oid \
         GLOBAL ANY LEFT JOIN db2.users AS u2 ON u2.id = t.other",
    );
    let deps = extract_join_tables(&sql, "db");
    assert_eq!(names(&deps), vec!["db2.users", "db.orders"]);
    assert!(deps.iter().all(|(_, t)| *t == EdgeType::Join));
}

#[test]
fn test_join_backticks_and_spacing() {
    let sql = sanitize("SELECT 1 FROM a ASOF LEFT JOIN `my db` . `my table` USING (ts)");
    let deps = extract_join_tables(&sql, "db");
    assert_eq!(names(&deps), vec!["my db.my table"]);
}

#[test]
fn test_join_in_comments_ignored() {
    let sql = sanitize(
        "SELECT * FROM t -- JOIN fake_table ON 1\n\
         /* LEFT JOIN other_fake ON 1 */ JOIN real_table ON 1",
    );
    let deps = extract_join_tables(&sql, "db");
    assert_eq!(names(&deps), vec!["db.real_table"]);
}

#[test]
fn test_join_subquery_and_array_join_skipped() {
    let sql = sanitize("SELECT * FROM t JOIN (SELECT 1) AS s ON 1 ARRAY JOIN tags AS tag LEFT ARRAY JOIN arr");
    assert!(extract_join_tables(&sql, "db").is_empty());
}

#[test]
fn test_join_none() {
    assert!(extract_join_tables("", "db").is_empty());
    assert!(extract_join_tables("SELECT 1", "db").is_empty());
}

#[test]
fn test_distributed_literal_database() {
    let sql = "CREATE TABLE db.events_dist (id UInt64) ENGINE = Distributed('cluster', 'shard_db', 'events_local', rand())";
    let (name, edge_type) = extract_distributed_table(sql, "db").unwrap();
    assert_eq!(name, QualifiedName::new("shard_db", "events_local"));
    assert_eq!(edge_type, EdgeType::Distributed);
}

#[test]
fn test_distributed_current_database() {
    let sql = "CREATE TABLE db.d (id UInt64) ENGINE = Distributed('{cluster}', currentDatabase(), 'local_t')";
    let (name, _) = extract_distributed_table(sql, "db").unwrap();
    assert_eq!(name, QualifiedName::new("db", "local_t"));
}

#[test]
fn test_distributed_from_engine_string() {
    let (name, _) = extract_distributed_table("Distributed(default, logs, hits_local, cityHash64(id))", "db").unwrap();
    assert_eq!(name, QualifiedName::new("logs", "hits_local"));
}

#[test]
fn test_distributed_malformed() {
    assert!(extract_distributed_table("ENGINE = Distributed('cluster')", "db").is_none());
    assert!(extract_distributed_table("ENGINE = MergeTree ORDER BY id", "db").is_none());
}

#[test]
fn test_dictionary_refs_from_raw_text() {
    let sql = "CREATE VIEW v AS SELECT dictGetString('geo.countries', 'name', toUInt64(cid)) AS c, \
               dictGetOrDefault('rates', 'rate', id, 0) AS r, \
               dictHas('geo.countries', toUInt64(cid)) AS known FROM t";
    let deps = extract_dictionary_refs(sql, "db");
    assert_eq!(names(&deps), vec!["geo.countries", "db.rates"]);
    assert!(deps.iter().all(|(_, t)| *t == EdgeType::Dictionary));
}

#[test]
fn test_dictionary_refs_lost_after_sanitizing() {
    let sql = "SELECT dictGet('geo.countries', 'name', id) FROM t";
    assert!(extract_dictionary_refs(&sanitize(sql), "db").is_empty());
    assert_eq!(extract_dictionary_refs(sql, "db").len(), 1);
}

#[test]
fn test_extract_dependencies_materialized_view() {
    let sql = "CREATE MATERIALIZED VIEW db.mv TO db.target AS \
               SELECT e.id, dictGet('db.users_dict', 'name', e.uid) FROM db.events AS e \
               LEFT JOIN db.users AS u ON u.id = e.uid \
               INNER JOIN db.users AS u2 ON u2.id = e.other";
    let res = extract_dependencies(sql, "MaterializedView", "db");

    let targets: Vec<_> = res
        .dependencies
        .iter()
        .filter(|(_, t)| *t == EdgeType::Target)
        .collect();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].0.id(), "db.target");

    assert_eq!(
        names(&res.dependencies),
        vec!["db.target", "db.users", "db.users_dict"]
    );
}

#[test]
fn test_extract_dependencies_target_only_for_materialized_views() {
    let sql = "CREATE VIEW db.v TO db.nowhere AS SELECT 1";
    let res = extract_dependencies(sql, "View", "db");
    assert!(res.dependencies.is_empty());
}

#[test]
fn test_extract_dependencies_distributed_engine() {
    let sql = "CREATE TABLE db.dist (id UInt64) ENGINE = Distributed('c', 'db', 'local')";
    let res = extract_dependencies(sql, "Distributed", "db");
    assert_eq!(names(&res.dependencies), vec!["db.local"]);

    // Empty DDL falls back to a composite engine string.
    let res = extract_dependencies("", "Distributed('c', 'db', 'local')", "db");
    assert_eq!(names(&res.dependencies), vec!["db.local"]);
}

#[test]
fn test_extract_dependencies_garbage_input() {
    for sql in ["", "   ", "JOIN", "TO", "dictGet(", "/* unterminated", "'unterminated", "Distributed(("] {
        let res = extract_dependencies(sql, "MaterializedView", "db");
        assert!(res.dependencies.is_empty(), "unexpected deps for {:?}", sql);
    }
}

#[test]
fn test_join_after_backtick_column_with_quote() {
    let sql = sanitize("SELECT `it's` FROM a JOIN db.real ON 1 WHERE x = 'q'");
    assert_eq!(names(&extract_join_tables(&sql, "db")), vec!["db.real"]);
}
