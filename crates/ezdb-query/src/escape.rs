//! Quoting for values embedded in DuckDB SQL text
//!
//! DuckDB string literals follow standard SQL: a single quote is escaped by
//! doubling it and backslashes have no special meaning. Newlines, tabs and
//! other control characters are legal verbatim inside a literal. The one
//! exception is NUL, which the engine's parser treats as end of input, so it
//! is spliced in with `chr(0)` instead of appearing in the text.

/// Escape `value` for use between single quotes, without adding the quotes.
///
/// NUL characters are not handled here; use [`quote_literal`] for arbitrary
/// text.
pub fn escape_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render `value` as a complete SQL string literal.
///
/// ```
/// use ezdb_query::escape::quote_literal;
///
/// assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
/// assert_eq!(quote_literal("a\0b"), "('a' || chr(0) || 'b')");
/// ```
pub fn quote_literal(value: &str) -> String {
    if !value.contains('\0') {
        return format!("'{}'", escape_string(value));
    }

    let parts: Vec<String> = value
        .split('\0')
        .map(|part| format!("'{}'", escape_string(part)))
        .collect();
    format!("({})", parts.join(" || chr(0) || "))
}

/// Render `name` as a double-quoted SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
