//! Scrubs comments and quoted text out of DDL before pattern matching, so a
//! table name that only appears in a comment or a string never matches.
//!
//! This is a best-effort scan, not a lexer: unterminated quotes are left alone
//! and an unterminated block comment runs to the end of the text.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static LEXEMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)--[^\n]*|/\*.*?(?:\*/|\z)|'(?:\\.|''|[^'\\])*'|"(?:\\.|""|[^"\\])*"|`(?:\\.|``|[^`\\])*`"#,
    )
    .unwrap()
});

fn is_comment(lexeme: &str) -> bool {
    lexeme.starts_with("--") || lexeme.starts_with("/*")
}

/// Replace comments with a single space, single-quoted literals with `''`
/// and double-quoted text with `""`. Backtick identifiers are kept.
pub fn sanitize(ddl: &str) -> String {
    LEXEMES
        .replace_all(ddl, |caps: &Captures| {
            let lexeme = &caps[0];
            if is_comment(lexeme) {
                " ".to_string()
            } else if lexeme.starts_with('`') {
                lexeme.to_string()
            } else if lexeme.starts_with('\'') {
                "''".to_string()
            } else {
                "\"\"".to_string()
            }
        })
        .into_owned()
}

/// Replace comments with a single space and keep quoted text intact.
///
/// Quotes are still scanned so that `--` or `/*` inside a literal is not
/// mistaken for a comment.
pub fn strip_comments(ddl: &str) -> String {
    LEXEMES
        .replace_all(ddl, |caps: &Captures| {
            let lexeme = &caps[0];
            if is_comment(lexeme) {
                " ".to_string()
            } else {
                lexeme.to_string()
            }
        })
        .into_owned()
}
