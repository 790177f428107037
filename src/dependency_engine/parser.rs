use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::graph::{EdgeType, NodeType, QualifiedName};
use super::sanitizer::{sanitize, strip_comments};

// Bare or backtick-quoted identifier.
const IDENT: &str = r"(`[^`]+`|[A-Za-z0-9_]+)";

static TARGET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bTO\s+(?:{IDENT}\s*\.\s*)?{IDENT}")).unwrap()
});

static JOIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:(?:LEFT|RIGHT|INNER|OUTER|CROSS|FULL|SEMI|ANTI|ANY|ALL|ASOF|GLOBAL)\s+)*(ARRAY\s+)?JOIN\s+(?:{IDENT}\s*\.\s*)?{IDENT}"
    ))
    .unwrap()
});

static DISTRIBUTED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\A\s*|\bENGINE\s*=\s*)Distributed\s*\(\s*([^,()]+?)\s*,\s*(currentDatabase\s*\(\s*\)|[^,()]+?)\s*,\s*([^,()]+?)\s*[,)]",
    )
    .unwrap()
});

static DICTIONARY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdict(?:Get|Has)\w*\s*\(\s*'([^']*)'").unwrap()
});

/// Words that can follow `TO` in DDL without naming a table.
const NON_TABLE_TARGETS: &[&str] = &["DISK", "VOLUME", "SETTINGS", "TABLE"];

pub type Dependency = (QualifiedName, EdgeType);

pub struct ParsingResult {
    pub dependencies: Vec<Dependency>,
}

/// Run every extraction rule that applies to an object with this engine.
///
/// Target, join and distributed rules see the text with comments removed;
/// the dictionary rule reads the raw text because dictionary names are
/// string literal arguments.
pub fn extract_dependencies(ddl: &str, engine: &str, default_database: &str) -> ParsingResult {
    let mut dependencies = Vec::new();
    let node_type = NodeType::from_engine(engine);

    if !ddl.trim().is_empty() {
        let sanitized = sanitize(ddl);

        if node_type == NodeType::MaterializedView {
            dependencies.extend(extract_target_table(&sanitized, default_database));
        }

        dependencies.extend(extract_join_tables(&sanitized, default_database));
    }

    if node_type == NodeType::Distributed {
        let definition = if ddl.trim().is_empty() {
            engine.to_string()
        } else {
            strip_comments(ddl)
        };
        dependencies.extend(extract_distributed_table(&definition, default_database));
    }

    dependencies.extend(extract_dictionary_refs(ddl, default_database));

    ParsingResult { dependencies }
}

fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['`', '\'', '"'] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

fn qualified_from_captures(
    caps: &Captures,
    database_group: usize,
    table_group: usize,
    default_database: &str,
) -> Option<QualifiedName> {
    let table = caps.get(table_group).map(|m| unquote(m.as_str()))?;
    if table.is_empty() {
        return None;
    }

    let database = caps
        .get(database_group)
        .map(|m| unquote(m.as_str()))
        .filter(|db| !db.is_empty())
        .unwrap_or(default_database);

    Some(QualifiedName::new(database, table))
}

/// Target of a materialized view's `TO [db.]table` clause. First match only.
pub fn extract_target_table(sanitized: &str, default_database: &str) -> Option<Dependency> {
    TARGET_PATTERN
        .captures_iter(sanitized)
        .filter(|caps| {
            caps.get(1).is_some()
                || !NON_TABLE_TARGETS
                    .iter()
                    .any(|word| caps[2].eq_ignore_ascii_case(word))
        })
        .find_map(|caps| qualified_from_captures(&caps, 1, 2, default_database))
        .map(|name| (name, EdgeType::Target))
}

/// Every table named after a `JOIN` keyword, once per distinct table.
/// `ARRAY JOIN` unnests a column and is skipped.
pub fn extract_join_tables(sanitized: &str, default_database: &str) -> Vec<Dependency> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for caps in JOIN_PATTERN.captures_iter(sanitized) {
        if caps.get(1).is_some() {
            continue;
        }
        if let Some(name) = qualified_from_captures(&caps, 2, 3, default_database) {
            if seen.insert(name.clone()) {
                results.push((name, EdgeType::Join));
            }
        }
    }

    results
}

/// Local table behind `Distributed(cluster, database, table[, sharding_key])`.
/// `currentDatabase()` resolves to the table's own database.
pub fn extract_distributed_table(definition: &str, default_database: &str) -> Option<Dependency> {
    let caps = DISTRIBUTED_PATTERN.captures(definition)?;

    let database_arg = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    let database = if database_arg
        .trim()
        .to_ascii_lowercase()
        .starts_with("currentdatabase")
    {
        default_database
    } else {
        let unquoted = unquote(database_arg);
        if unquoted.is_empty() {
            default_database
        } else {
            unquoted
        }
    };

    let table = unquote(caps.get(3).map(|m| m.as_str()).unwrap_or_default());
    if table.is_empty() {
        return None;
    }

    Some((QualifiedName::new(database, table), EdgeType::Distributed))
}

/// Dictionaries read through `dictGet*` / `dictHas*` calls, once per distinct
/// dictionary. Expects the raw, unsanitized text.
pub fn extract_dictionary_refs(raw: &str, default_database: &str) -> Vec<Dependency> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for caps in DICTIONARY_PATTERN.captures_iter(raw) {
        let reference = caps[1].trim();
        let (database, name) = match reference.split_once('.') {
            Some((db, dict)) => (unquote(db), unquote(dict)),
            None => (default_database, unquote(reference)),
        };
        if name.is_empty() {
            continue;
        }

        let database = if database.is_empty() { default_database } else { database };
        let name = QualifiedName::new(database, name);
        if seen.insert(name.clone()) {
            results.push((name, EdgeType::Dictionary));
        }
    }

    results
}

#[cfg(test)]
mod tests;
