//! SQL lowering for parsed filters
//!
//! Translates a filter AST into a parameterized WHERE-clause fragment: a SQL
//! string with `?` placeholders, the positional argument vector, and the set
//! of referenced columns. Rendering is driven by [`ToSqlOptions`]: the
//! default field for unqualified terms, the search mode (`Any` is
//! OR-dominant, `All` AND-dominant), and two optional callbacks for column
//! resolution and IN-list shaping.
//!
//! # Example
//!
//! ```rust
//! use squill::sql::{to_sql, ToSqlOptions};
//!
//! let query = to_sql("age: [18 TO 25]", &ToSqlOptions::new()).unwrap();
//! assert_eq!(query.sql, "age BETWEEN ? and ?");
//! ```

use crate::error::SquillError;
use crate::lucene::{self, BoolOp, Node, Occur, RangeKind, TermOp, Value, WildcardKind};
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, error};

/// The token reserved for driver-side argument binding
pub const PLACEHOLDER: &str = "?";

/// How conjunctions between clauses are interpreted.
///
/// `Any` increases recall: implicit joins and negations widen the result
/// (`OR`, `OR NOT`). `All` increases precision: they narrow it
/// (`AND`, `AND NOT`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchMode {
    #[default]
    Any,
    All,
}

/// A resolved column expression returned by a [`ColumnHandler`].
///
/// A non-empty `sql` replaces the node's rendering entirely (with `args` as
/// its bound arguments); otherwise `term` substitutes the node's field and
/// `column` is recorded in the output column set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub column: String,
    pub term: String,
    pub sql: String,
    pub args: Vec<Value>,
}

/// Transforms the list value bound for an `IN` clause
pub type InHandler = Box<dyn Fn(&Value) -> Value>;

/// Resolves a `Term`/`Range` node to its true column expression
pub type ColumnHandler = Box<dyn Fn(&Node) -> Result<Fragment>>;

/// Options for [`to_sql`]
#[derive(Default)]
pub struct ToSqlOptions {
    /// Column used for terms without an explicit field. Empty means such
    /// terms are an error.
    pub default_field: String,
    pub search_mode: SearchMode,
    pub in_handler: Option<InHandler>,
    pub column_handler: Option<ColumnHandler>,
}

impl ToSqlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = field.into();
        self
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    pub fn with_in_handler(mut self, handler: impl Fn(&Value) -> Value + 'static) -> Self {
        self.in_handler = Some(Box::new(handler));
        self
    }

    pub fn with_column_handler(
        mut self,
        handler: impl Fn(&Node) -> Result<Fragment> + 'static,
    ) -> Self {
        self.column_handler = Some(Box::new(handler));
        self
    }
}

/// The generated query: SQL text, positional arguments, referenced columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub sql: String,
    pub args: Vec<Value>,
    pub columns: Vec<String>,
}

/// Input accepted by [`to_sql`]: source text, a parsed node, or a node list
#[derive(Debug, Clone)]
pub enum Filter {
    Source(String),
    Node(Node),
    Nodes(Vec<Node>),
}

impl From<&str> for Filter {
    fn from(source: &str) -> Self {
        Filter::Source(source.to_string())
    }
}

impl From<String> for Filter {
    fn from(source: String) -> Self {
        Filter::Source(source)
    }
}

impl From<Node> for Filter {
    fn from(node: Node) -> Self {
        Filter::Node(node)
    }
}

impl From<Vec<Node>> for Filter {
    fn from(nodes: Vec<Node>) -> Self {
        Filter::Nodes(nodes)
    }
}

static LEADING_OP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(AND|OR|NOT)").expect("pattern compiles"));

// Per-term prefixes inject their own leading conjunction; these rewrites
// strip the leftovers after concatenation. They fire at the top level and
// at each boolean reduction.
static CLEANUPS: LazyLock<[(Regex, &'static str); 3]> = LazyLock::new(|| {
    [
        (
            Regex::new(r"^\s*(AND|OR)\s+([^()]+)(AND|OR)").expect("pattern compiles"),
            "$2$1",
        ),
        (
            Regex::new(r"^\s*(AND|OR)\s*([^()]+)$").expect("pattern compiles"),
            "$2",
        ),
        (
            Regex::new(r##"("[^"]+").""##).expect("pattern compiles"),
            "$1",
        ),
    ]
});

/// Render a filter into a parameterized SQL fragment.
///
/// `filter` may be a source string (parsed first), an already-parsed
/// [`Node`], or a list of nodes rendered by concatenation. Every `?` in the
/// returned SQL corresponds positionally to one element of `args`.
pub fn to_sql(filter: impl Into<Filter>, options: &ToSqlOptions) -> Result<Query> {
    let filter = filter.into();
    let mut query = render(&filter, options)?;
    debug!(sql = %query.sql, "SQL generated");
    query.sql = clean_expr(&query.sql);
    Ok(query)
}

/// The identity column resolution used when no handler is configured
pub fn default_column_handler(node: &Node) -> Result<Fragment> {
    match node {
        Node::Term(term) => Ok(Fragment {
            term: term.term.clone(),
            column: term.term.clone(),
            ..Default::default()
        }),
        Node::Range(range) => Ok(Fragment {
            term: range.term.clone(),
            column: range.term.clone(),
            ..Default::default()
        }),
        Node::Boolean(_) => Err(SquillError::UnknownType {
            kind: "boolean".to_string(),
        }),
    }
}

fn render(filter: &Filter, options: &ToSqlOptions) -> Result<Query> {
    match filter {
        Filter::Source(source) => {
            let node = lucene::parse(source)?;
            debug!(filter = %source, "parsed filter");
            render_node(&node, options)
        }
        Filter::Node(node) => render_node(node, options),
        Filter::Nodes(nodes) => {
            let mut query = Query::default();
            for node in nodes {
                let part = render_node(node, options)?;
                merge_columns(&mut query.columns, &part.columns);
                query.args.extend(part.args);
                query.sql.push_str(&part.sql);
            }
            query.sql = clean_expr(&query.sql);
            Ok(query)
        }
    }
}

fn render_node(node: &Node, options: &ToSqlOptions) -> Result<Query> {
    match node {
        Node::Boolean(boolean) => {
            let mut query = Query::default();
            for (i, child) in boolean.args.iter().enumerate() {
                let part = render_node(child, options)?;
                // children carrying their own leading conjunction (from a
                // `+`/`-` prefix) suppress the separator
                if i > 0 && !LEADING_OP.is_match(&part.sql) {
                    query.sql.push(' ');
                    query.sql.push_str(bool_operator(boolean.op, options.search_mode));
                    query.sql.push(' ');
                }
                merge_columns(&mut query.columns, &part.columns);
                query.sql.push_str(&part.sql);
                query.args.extend(part.args);
            }
            query.sql = format!("({})", clean_expr(&query.sql));
            Ok(query)
        }
        Node::Term(term_query) => {
            let fragment = resolve_fragment(node, &term_query.term, options)?;
            let mut query = Query::default();
            if !fragment.column.is_empty() {
                query.columns.push(fragment.column.clone());
            }
            if !fragment.sql.is_empty() {
                query.sql = fragment.sql;
                query.args = fragment.args;
                return Ok(query);
            }
            let term = if !fragment.term.is_empty() {
                fragment.term
            } else if !options.default_field.is_empty() {
                options.default_field.clone()
            } else {
                return Err(SquillError::UnnamedTerm {
                    value: term_query.value.to_string(),
                });
            };

            if matches!(term_query.value, Value::Null) {
                query.sql = if term_query.prefix == Occur::MustNot {
                    format!("{} IS NOT NULL", term)
                } else {
                    format!("{} IS NULL", term)
                };
                return Ok(query);
            }

            query.sql = format!("{} {} {}", term, term_operator(term_query.op), PLACEHOLDER);
            query.args = vec![term_query.value.clone()];

            if let Value::Wildcard(wildcard) = &term_query.value {
                match wildcard.kind() {
                    WildcardKind::Prefix => {
                        query.sql = format!("{} LIKE '{}%'", term, PLACEHOLDER);
                        query.args = vec![Value::String(wildcard.prefix.clone())];
                    }
                    WildcardKind::Suffix => {
                        query.sql = format!("{} LIKE '%{}'", term, PLACEHOLDER);
                        query.args = vec![Value::String(wildcard.suffix.clone())];
                    }
                    WildcardKind::Between => {
                        query.sql = format!("{} LIKE '{}%{}'", term, PLACEHOLDER, PLACEHOLDER);
                        query.args = vec![
                            Value::String(wildcard.prefix.clone()),
                            Value::String(wildcard.suffix.clone()),
                        ];
                    }
                    WildcardKind::Any => {
                        query.sql = format!("{} LIKE '%{}%'", term, PLACEHOLDER);
                        query.args = vec![Value::String(wildcard.term.clone())];
                    }
                    WildcardKind::Bare => {
                        query.sql = format!("{} IS NOT NULL", term);
                        query.args = Vec::new();
                    }
                }
            }

            if term_query.op == TermOp::In {
                query.sql = format!("{} IN ({})", term, PLACEHOLDER);
                if let Some(handler) = &options.in_handler {
                    if let Some(first) = query.args.first_mut() {
                        *first = handler(&term_query.value);
                    }
                }
                if let Value::List(items) = &term_query.value {
                    if items.is_empty() {
                        query.args.clear();
                        query.sql = "1 = 0".to_string();
                    }
                }
            }

            match term_query.prefix {
                Occur::Must => query.sql = format!(" AND {}", query.sql),
                Occur::MustNot => {
                    query.sql = if options.search_mode == SearchMode::Any {
                        format!(" OR NOT {}", query.sql)
                    } else {
                        format!(" AND NOT {}", query.sql)
                    };
                }
                Occur::Should => {}
            }
            Ok(query)
        }
        Node::Range(range) => {
            let Some(kind) = range.kind() else {
                return Err(SquillError::UnknownRangeType {
                    term: range.term.clone(),
                });
            };
            let fragment = resolve_fragment(node, &range.term, options)?;
            let mut query = Query::default();
            if !fragment.column.is_empty() {
                query.columns.push(fragment.column.clone());
            }
            if !fragment.sql.is_empty() {
                query.sql = fragment.sql;
                query.args = fragment.args;
                return Ok(query);
            }
            let term = if !fragment.term.is_empty() {
                fragment.term
            } else if !options.default_field.is_empty() {
                options.default_field.clone()
            } else {
                return Err(SquillError::UnnamedTerm {
                    value: format!("{} TO {}", bound_display(&range.min), bound_display(&range.max)),
                });
            };
            match kind {
                RangeKind::Gt | RangeKind::Gte => {
                    query.sql = format!("{} {} {}", term, range_operator(kind), PLACEHOLDER);
                    query.args = vec![range.min.clone().unwrap_or_default()];
                }
                RangeKind::Lt | RangeKind::Lte => {
                    query.sql = format!("{} {} {}", term, range_operator(kind), PLACEHOLDER);
                    query.args = vec![range.max.clone().unwrap_or_default()];
                }
                RangeKind::Between => {
                    query.sql = if range.inclusive {
                        format!("{} BETWEEN {} and {}", term, PLACEHOLDER, PLACEHOLDER)
                    } else {
                        format!("{} > {} and {} < {}", term, PLACEHOLDER, term, PLACEHOLDER)
                    };
                    query.args = vec![
                        range.min.clone().unwrap_or_default(),
                        range.max.clone().unwrap_or_default(),
                    ];
                }
            }
            Ok(query)
        }
    }
}

fn resolve_fragment(node: &Node, term: &str, options: &ToSqlOptions) -> Result<Fragment> {
    let resolved = match &options.column_handler {
        Some(handler) => handler(node),
        None => default_column_handler(node),
    };
    resolved.map_err(|err| {
        error!("unknown column `{}`", term);
        SquillError::InvalidColumn {
            term: term.to_string(),
            reason: err.to_string(),
        }
    })
}

fn bool_operator(op: BoolOp, mode: SearchMode) -> &'static str {
    match op {
        BoolOp::And => "AND",
        BoolOp::Or => "OR",
        BoolOp::Not => {
            if mode == SearchMode::Any {
                "OR NOT"
            } else {
                "AND NOT"
            }
        }
        BoolOp::Implicit => {
            if mode == SearchMode::All {
                "AND"
            } else {
                "OR"
            }
        }
    }
}

fn term_operator(op: TermOp) -> &'static str {
    match op {
        TermOp::None | TermOp::Eq => "=",
        TermOp::Gt => ">",
        TermOp::Gte => ">=",
        TermOp::Lt => "<",
        TermOp::Lte => "<=",
        TermOp::Neq => "<>",
        TermOp::Match => "~",
        TermOp::MatchCi => "~*",
        TermOp::NotMatch => "!~",
        TermOp::NotMatchCi => "!~*",
        TermOp::In => "IN",
    }
}

fn range_operator(kind: RangeKind) -> &'static str {
    match kind {
        RangeKind::Gt => ">",
        RangeKind::Gte => ">=",
        RangeKind::Lt => "<",
        RangeKind::Lte => "<=",
        RangeKind::Between => "BETWEEN",
    }
}

fn bound_display(bound: &Option<Value>) -> String {
    match bound {
        Some(value) => value.to_string(),
        None => "*".to_string(),
    }
}

fn clean_expr(expr: &str) -> String {
    let mut out = expr.to_string();
    for (pattern, replacement) in CLEANUPS.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out.trim().to_string()
}

fn merge_columns(into: &mut Vec<String>, from: &[String]) {
    for column in from {
        if !into.iter().any(|existing| existing == column) {
            into.push(column.clone());
        }
    }
}
