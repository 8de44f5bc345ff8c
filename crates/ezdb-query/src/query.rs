//! Parameterized SQL templates
//!
//! A [`Query`] pairs a template containing `$name` (or `${name}`) placeholders
//! with a set of named [`Binding`]s. Rendering replaces every bound
//! placeholder with the SQL text for its value in a single left-to-right pass:
//!
//! - tables become their alias (`df_<id>`)
//! - nested queries become parenthesized subqueries
//! - text and paths become escaped string literals
//! - numbers and booleans are written unquoted, negative numbers in
//!   parentheses, `null` for null
//!
//! Placeholders without a binding are left as they are, and text produced by
//! a substitution is never scanned again.

use crate::binding::Binding;
use crate::error::{QueryError, Result};
use crate::escape::quote_literal;
use crate::table::Table;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::trace;

/// An immutable SQL template with its bindings
#[derive(Debug, Clone)]
pub struct Query {
    template: String,
    bindings: BTreeMap<String, Binding>,
}

/// Collects bindings for a [`Query`]; validation happens in [`QueryBuilder::build`]
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    template: String,
    bindings: BTreeMap<String, Binding>,
}

impl QueryBuilder {
    /// Bind `value` to `name`, replacing any earlier value for the same name
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Binding>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Validate that every binding name occurs in the template
    pub fn build(self) -> Result<Query> {
        if let Some(name) = self
            .bindings
            .keys()
            .find(|name| !self.template.contains(name.as_str()))
        {
            return Err(QueryError::BindingName { name: name.clone() });
        }

        Ok(Query {
            template: self.template,
            bindings: self.bindings,
        })
    }
}

/// Build a [`Query`] from a template and `name = value` pairs.
///
/// Expands to a [`QueryBuilder`] chain and returns `Result<Query>`.
///
/// ```
/// use ezdb_query::sql;
///
/// let sub = sql!("SELECT id FROM users WHERE active = $active", active = true)?;
/// let query = sql!("SELECT count(*) FROM ($sub) AS s WHERE id > $min", sub = sub, min = 10)?;
/// assert_eq!(
///     query.render()?,
///     "SELECT count(*) FROM (SELECT id FROM users WHERE active = true) AS s WHERE id > 10"
/// );
/// # Ok::<(), ezdb_query::QueryError>(())
/// ```
#[macro_export]
macro_rules! sql {
    ($template:expr $(, $name:ident = $value:expr)* $(,)?) => {
        $crate::Query::builder($template)
            $(.bind(stringify!($name), $value))*
            .build()
    };
}

impl Query {
    /// A query with no bindings
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn builder(template: impl Into<String>) -> QueryBuilder {
        QueryBuilder {
            template: template.into(),
            bindings: BTreeMap::new(),
        }
    }

    /// Create a query from `(name, value)` pairs
    pub fn with_bindings<I, K, V>(template: impl Into<String>, bindings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Binding>,
    {
        bindings
            .into_iter()
            .fold(Self::builder(template), |builder, (name, value)| {
                builder.bind(name, value)
            })
            .build()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn bindings(&self) -> &BTreeMap<String, Binding> {
        &self.bindings
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Names of all well-formed placeholders in the template, bound or not
    pub fn placeholders(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        scan(&self.template, |name, _, _| {
            names.insert(name.to_string());
        });
        names
    }

    /// Placeholders that have no binding and will be left in the rendered text
    pub fn unbound_placeholders(&self) -> BTreeSet<String> {
        self.placeholders()
            .into_iter()
            .filter(|name| !self.bindings.contains_key(name))
            .collect()
    }

    /// Render the template with every binding substituted.
    ///
    /// Fails with [`QueryError::InvalidBindingType`] if any binding, including
    /// one inside a nested query, has no SQL representation.
    pub fn render(&self) -> Result<String> {
        let mut replacements = HashMap::with_capacity(self.bindings.len());
        for (name, value) in &self.bindings {
            replacements.insert(name.as_str(), render_binding(name, value)?);
        }

        let rendered = substitute(&self.template, &replacements);
        trace!(bindings = self.bindings.len(), "rendered query template");
        Ok(rendered)
    }

    /// Every table reachable from this query, keyed by alias.
    ///
    /// Nested queries are walked depth first. A table reachable along several
    /// paths appears once.
    pub fn collect_tables(&self) -> BTreeMap<String, Table> {
        let mut tables = BTreeMap::new();
        self.collect_into(&mut tables);
        tables
    }

    /// Aliases of every table reachable from this query, in alias order
    pub fn tables(&self) -> Vec<String> {
        self.collect_tables().into_keys().collect()
    }

    fn collect_into(&self, tables: &mut BTreeMap<String, Table>) {
        for value in self.bindings.values() {
            match value {
                Binding::Table(table) => {
                    tables.entry(table.alias()).or_insert_with(|| table.clone());
                }
                Binding::Query(nested) => nested.collect_into(tables),
                _ => {}
            }
        }
    }
}

/// SQL text for one binding
struct Replacement {
    text: String,
    /// Needs parentheses unless the template already supplies them
    subquery: bool,
}

fn render_binding(name: &str, value: &Binding) -> Result<Replacement> {
    let text = match value {
        Binding::Query(nested) => {
            return Ok(Replacement {
                text: nested.render()?,
                subquery: true,
            })
        }
        Binding::Table(table) => table.alias(),
        Binding::Text(text) => quote_literal(text),
        Binding::Path(path) => quote_literal(&path.to_string()),
        Binding::Int(value) => render_int(*value),
        Binding::Float(value) => render_float(*value),
        Binding::Bool(value) => value.to_string(),
        Binding::Null => "null".to_string(),
        Binding::Unsupported { type_name } => {
            return Err(QueryError::InvalidBindingType {
                name: name.to_string(),
                type_name: type_name.clone(),
            })
        }
    };

    Ok(Replacement {
        text,
        subquery: false,
    })
}

/// Negative numbers are parenthesized so `10-$x` cannot turn into a `--` comment
fn render_int(value: i128) -> String {
    if value < 0 {
        format!("({})", value)
    } else {
        value.to_string()
    }
}

fn render_float(value: f64) -> String {
    if value.is_nan() {
        "'nan'::DOUBLE".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "'inf'::DOUBLE".to_string()
        } else {
            "'-inf'::DOUBLE".to_string()
        }
    } else if value.is_sign_negative() {
        format!("({:?})", value)
    } else {
        // Debug keeps a decimal point or exponent: 1.0, 1e20, 2.5e-7
        format!("{:?}", value)
    }
}

fn substitute(template: &str, replacements: &HashMap<&str, Replacement>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut copied_to = 0;

    scan(template, |name, start, end| {
        let Some(replacement) = replacements.get(name) else {
            return;
        };

        out.push_str(&template[copied_to..start]);
        if replacement.subquery && !already_parenthesized(template, start, end) {
            out.push('(');
            out.push_str(&replacement.text);
            out.push(')');
        } else {
            out.push_str(&replacement.text);
        }
        copied_to = end;
    });

    out.push_str(&template[copied_to..]);
    out
}

/// `( $sub )` already forms a subquery; `name($sub)` is a call argument and does not
fn already_parenthesized(template: &str, start: usize, end: usize) -> bool {
    let before = template[..start].trim_end_matches(|c: char| c.is_ascii_whitespace());
    let after = template[end..].trim_start_matches(|c: char| c.is_ascii_whitespace());

    let Some(head) = before.strip_suffix('(') else {
        return false;
    };
    let is_call = head
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '"');
    !is_call && after.starts_with(')')
}

/// Walk the placeholders of `template` in order, calling `visit(name, start, end)`
/// with the byte range of the whole placeholder. `$$` is skipped as a unit and
/// never starts a placeholder.
fn scan(template: &str, mut visit: impl FnMut(&str, usize, usize)) {
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'$') {
            i += 2;
            continue;
        }
        match placeholder_at(template, i) {
            Some((name, end)) => {
                visit(name, i, end);
                i = end;
            }
            None => i += 1,
        }
    }
}

/// Parse a placeholder whose `$` is at `start`. Returns the name and the end offset.
fn placeholder_at(template: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = template.as_bytes();
    let braced = bytes.get(start + 1) == Some(&b'{');
    let name_start = if braced { start + 2 } else { start + 1 };

    let first = *bytes.get(name_start)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }

    let mut name_end = name_start + 1;
    while name_end < bytes.len()
        && (bytes[name_end].is_ascii_alphanumeric() || bytes[name_end] == b'_')
    {
        name_end += 1;
    }

    let name = &template[name_start..name_end];
    if braced {
        if bytes.get(name_end) != Some(&b'}') {
            return None;
        }
        Some((name, name_end + 1))
    } else {
        Some((name, name_end))
    }
}
