//! Statement splitting and result set classification
//!
//! DuckDB's Arrow API only accepts a single prepared statement and reports
//! DDL and DML results as a `Count` column, so scripts are split here and the
//! last statement is classified before it runs.

/// Leading keywords of statements that return rows
const ROW_RETURNING: &[&str] = &[
    "SELECT",
    "WITH",
    "FROM",
    "VALUES",
    "TABLE",
    "SHOW",
    "DESCRIBE",
    "DESC",
    "SUMMARIZE",
    "EXPLAIN",
    "PRAGMA",
    "CALL",
    "PIVOT",
    "UNPIVOT",
];

/// Data-changing statements that return rows when they carry a `RETURNING` clause
const RETURNING_CAPABLE: &[&str] = &["INSERT", "UPDATE", "DELETE", "MERGE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    /// String literal, quoted identifier or dollar-quoted body
    Quoted,
    Semicolon(usize),
    Symbol,
}

/// Whether a single statement produces a result set.
///
/// Row-returning statements start with a query keyword (after whitespace,
/// comments and opening parentheses), or are `INSERT`/`UPDATE`/`DELETE`/`MERGE`
/// with a `RETURNING` clause.
pub fn returns_rows(sql: &str) -> bool {
    let mut words = tokenize(sql).into_iter().filter_map(|token| match token {
        Token::Word(word) => Some(word),
        _ => None,
    });

    let Some(first) = words.next() else {
        return false;
    };
    if is_one_of(first, ROW_RETURNING) {
        return true;
    }
    is_one_of(first, RETURNING_CAPABLE) && words.any(|w| w.eq_ignore_ascii_case("RETURNING"))
}

/// Split a script into its non-empty statements, trimmed and without the
/// separating semicolons. Semicolons inside literals and comments are ignored.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_content = false;

    for token in tokenize(sql) {
        match token {
            Token::Semicolon(pos) => {
                if has_content {
                    statements.push(sql[start..pos].trim());
                }
                start = pos + 1;
                has_content = false;
            }
            _ => has_content = true,
        }
    }
    if has_content {
        statements.push(sql[start..].trim());
    }
    statements
}

fn is_one_of(word: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b if b.is_ascii_whitespace() => i += 1,
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = find_from(bytes, i + 2, b"\n").map_or(bytes.len(), |p| p + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find_from(bytes, i + 2, b"*/").map_or(bytes.len(), |p| p + 2);
            }
            quote @ (b'\'' | b'"') => {
                i = skip_quoted(bytes, i, quote);
                tokens.push(Token::Quoted);
            }
            b'$' => match dollar_tag(sql, i) {
                Some(tag) => {
                    i = find_from(bytes, i + tag.len(), tag.as_bytes())
                        .map_or(bytes.len(), |p| p + tag.len());
                    tokens.push(Token::Quoted);
                }
                None => {
                    i += 1;
                    tokens.push(Token::Symbol);
                }
            },
            b';' => {
                tokens.push(Token::Semicolon(i));
                i += 1;
            }
            b if is_word_byte(b) => {
                let start = i;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(&sql[start..i]));
            }
            _ => {
                i += 1;
                tokens.push(Token::Symbol);
            }
        }
    }
    tokens
}

fn find_from(bytes: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(start..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|p| p + start)
}

/// End of a quoted run starting at `start`; a doubled quote is an escape
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Opening tag of a dollar-quoted string (`$$` or `$tag$`) at `start`
fn dollar_tag(sql: &str, start: usize) -> Option<&str> {
    let bytes = sql.as_bytes();
    if start > 0 && is_word_byte(bytes[start - 1]) {
        return None;
    }

    let mut end = start + 1;
    match bytes.get(end) {
        Some(b'$') => return Some(&sql[start..=end]),
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }
    (bytes.get(end) == Some(&b'$')).then(|| &sql[start..=end])
}
