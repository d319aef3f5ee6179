//! Abstract syntax tree for parsed Lucene filters
//!
//! A parsed query is a tree of three node kinds: single-field predicates
//! (`TermQuery`), value intervals (`RangeQuery`), and n-ary boolean
//! combinators (`BooleanExpression`). Scalar values live in the `Value`
//! union; wildcard patterns are a structured `Wildcard` rather than a raw
//! pattern string so SQL lowering can pick the matching `LIKE` shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node in the query AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Term(TermQuery),
    Range(RangeQuery),
    Boolean(BooleanExpression),
}

impl Node {
    /// Bind `field` to every term in the subtree that has no field yet.
    ///
    /// This is the rewrite behind `field:(a b)`: the group is parsed
    /// field-less and the field name is pushed down afterwards. Terms that
    /// already carry an explicit field keep it.
    pub fn with_field(self, field: &str) -> Node {
        match self {
            Node::Term(mut term) => {
                if term.term.is_empty() {
                    term.term = field.to_string();
                }
                Node::Term(term)
            }
            Node::Boolean(mut boolean) => {
                boolean.args = boolean
                    .args
                    .into_iter()
                    .map(|node| node.with_field(field))
                    .collect();
                Node::Boolean(boolean)
            }
            Node::Range(range) => Node::Range(range),
        }
    }
}

/// A single `field op value` predicate.
///
/// An empty `term` means no field is bound yet; the SQL renderer falls back
/// to its configured default field in that case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub term: String,
    pub prefix: Occur,
    pub op: TermOp,
    pub value: Value,
}

impl TermQuery {
    pub fn new(term: impl Into<String>, value: Value) -> Self {
        Self {
            term: term.into(),
            prefix: Occur::Should,
            op: TermOp::None,
            value,
        }
    }

    pub fn with_op(mut self, op: TermOp) -> Self {
        self.op = op;
        self
    }

    pub fn with_prefix(mut self, prefix: Occur) -> Self {
        self.prefix = prefix;
        self
    }

    /// Finish the term's reduction, rewriting inequality operators into the
    /// equivalent one-sided range so `age: > 5` and `age: {5 TO *}` produce
    /// the same tree.
    pub fn into_node(self) -> Node {
        let range = |min: Option<Value>, max: Option<Value>, inclusive: bool, term: String| {
            Node::Range(RangeQuery {
                term,
                min,
                max,
                inclusive,
            })
        };
        match self.op {
            TermOp::Gt => range(Some(self.value), None, false, self.term),
            TermOp::Gte => range(Some(self.value), None, true, self.term),
            TermOp::Lt => range(None, Some(self.value), false, self.term),
            TermOp::Lte => range(None, Some(self.value), true, self.term),
            _ => Node::Term(self),
        }
    }
}

/// A value interval; `None` bounds are unbounded (`*` in source)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub term: String,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub inclusive: bool,
}

impl RangeQuery {
    pub fn new(
        term: impl Into<String>,
        min: Option<Value>,
        max: Option<Value>,
        inclusive: bool,
    ) -> Self {
        Self {
            term: term.into(),
            min,
            max,
            inclusive,
        }
    }

    /// Derive the comparison this range stands for, or `None` when both
    /// bounds are unbounded and no operator applies
    pub fn kind(&self) -> Option<RangeKind> {
        match (&self.min, &self.max) {
            (Some(_), Some(_)) => Some(RangeKind::Between),
            (Some(_), None) if self.inclusive => Some(RangeKind::Gte),
            (Some(_), None) => Some(RangeKind::Gt),
            (None, Some(_)) if self.inclusive => Some(RangeKind::Lte),
            (None, Some(_)) => Some(RangeKind::Lt),
            (None, None) => None,
        }
    }
}

/// N-ary boolean combinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanExpression {
    pub op: BoolOp,
    pub args: Vec<Node>,
}

impl BooleanExpression {
    pub fn new(op: BoolOp, args: Vec<Node>) -> Self {
        Self { op, args }
    }
}

/// Boolean operators, normalized (`&&` parses to `And`, `or` to `Or`, …).
/// `Implicit` is the combinator inferred between adjacent clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "NOT")]
    Not,
    #[serde(rename = "IMPLICIT")]
    Implicit,
}

/// Per-term occurrence prefix: `+` must match, `-` must not
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occur {
    #[default]
    #[serde(rename = "")]
    Should,
    #[serde(rename = "+")]
    Must,
    #[serde(rename = "-")]
    MustNot,
}

/// Comparison operator attached to a term
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermOp {
    /// No explicit operator; renders as equality
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "gt")]
    Gt,
    #[serde(rename = "gte")]
    Gte,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "lte")]
    Lte,
    #[serde(rename = "neq")]
    Neq,
    /// Postgres-style regex match `~`
    #[serde(rename = "~")]
    Match,
    /// Case-insensitive regex match `~*`
    #[serde(rename = "~*")]
    MatchCi,
    /// Negated regex match `!~`
    #[serde(rename = "!~")]
    NotMatch,
    /// Negated case-insensitive regex match `!~*`
    #[serde(rename = "!~*")]
    NotMatchCi,
    #[serde(rename = "in")]
    In,
}

/// Scalar or structured value carried by a term
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Wildcard(Wildcard),
    List(Vec<Value>),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Wildcard> for Value {
    fn from(v: Wildcard) -> Self {
        Value::Wildcard(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Wildcard(v) => write!(f, "{}", v),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A wildcard pattern split at its `*`.
///
/// The kind is derived from which parts are set rather than stored, so an
/// inconsistent combination cannot be represented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wildcard {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub term: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,
}

impl Wildcard {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            ..Default::default()
        }
    }

    pub fn between(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            term: String::new(),
        }
    }

    pub fn any(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> WildcardKind {
        if !self.term.is_empty() && self.prefix.is_empty() && self.suffix.is_empty() {
            WildcardKind::Any
        } else if !self.prefix.is_empty() && !self.suffix.is_empty() {
            WildcardKind::Between
        } else if !self.prefix.is_empty() {
            WildcardKind::Prefix
        } else if !self.suffix.is_empty() {
            WildcardKind::Suffix
        } else {
            WildcardKind::Bare
        }
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            WildcardKind::Prefix => write!(f, "{}*", self.prefix),
            WildcardKind::Suffix => write!(f, "*{}", self.suffix),
            WildcardKind::Between => write!(f, "{}*{}", self.prefix, self.suffix),
            WildcardKind::Any => write!(f, "*{}*", self.term),
            WildcardKind::Bare => write!(f, "*"),
        }
    }
}

/// Shape of a wildcard pattern, derived from its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardKind {
    /// `P*` matches values starting with P
    Prefix,
    /// `*S` matches values ending with S
    Suffix,
    /// `P*S` matches values starting with P and ending with S
    Between,
    /// `*T*` matches values containing T
    Any,
    /// A bare `*`
    Bare,
}

/// Comparison a range lowers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_kinds() {
        assert_eq!(Wildcard::prefix("te").kind(), WildcardKind::Prefix);
        assert_eq!(Wildcard::suffix("st").kind(), WildcardKind::Suffix);
        assert_eq!(Wildcard::between("te", "st").kind(), WildcardKind::Between);
        assert_eq!(Wildcard::any("test").kind(), WildcardKind::Any);
        assert_eq!(Wildcard::default().kind(), WildcardKind::Bare);
    }

    #[test]
    fn test_range_kinds() {
        let range = |min, max, inclusive| RangeQuery::new("age", min, max, inclusive);
        assert_eq!(
            range(Some(Value::Int(1)), Some(Value::Int(2)), true).kind(),
            Some(RangeKind::Between)
        );
        assert_eq!(
            range(Some(Value::Int(1)), None, false).kind(),
            Some(RangeKind::Gt)
        );
        assert_eq!(
            range(Some(Value::Int(1)), None, true).kind(),
            Some(RangeKind::Gte)
        );
        assert_eq!(
            range(None, Some(Value::Int(2)), false).kind(),
            Some(RangeKind::Lt)
        );
        assert_eq!(
            range(None, Some(Value::Int(2)), true).kind(),
            Some(RangeKind::Lte)
        );
        assert_eq!(range(None, None, false).kind(), None);
    }

    #[test]
    fn test_inequality_rewrite() {
        let node = TermQuery::new("age", Value::Int(5))
            .with_op(TermOp::Gt)
            .into_node();
        assert_eq!(
            node,
            Node::Range(RangeQuery::new("age", Some(Value::Int(5)), None, false))
        );

        let node = TermQuery::new("age", Value::Int(5))
            .with_op(TermOp::Lte)
            .into_node();
        assert_eq!(
            node,
            Node::Range(RangeQuery::new("age", None, Some(Value::Int(5)), true))
        );

        // equality stays a term
        let node = TermQuery::new("age", Value::Int(5))
            .with_op(TermOp::Eq)
            .into_node();
        assert!(matches!(node, Node::Term(_)));
    }

    #[test]
    fn test_field_propagation() {
        let tree = Node::Boolean(BooleanExpression::new(
            BoolOp::Implicit,
            vec![
                Node::Term(TermQuery::new("", Value::from("apple"))),
                Node::Term(TermQuery::new("author", Value::from("mac"))),
            ],
        ));
        let tree = tree.with_field("body");
        let Node::Boolean(boolean) = tree else {
            panic!("expected boolean");
        };
        assert_eq!(
            boolean.args[0],
            Node::Term(TermQuery::new("body", Value::from("apple")))
        );
        // explicit fields are left alone
        assert_eq!(
            boolean.args[1],
            Node::Term(TermQuery::new("author", Value::from("mac")))
        );
    }

    #[test]
    fn test_value_serialization() {
        let value = Value::List(vec![
            Value::Int(1),
            Value::Float(-2.5),
            Value::String("arrays".to_string()),
            Value::Null,
        ]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"[1,-2.5,"arrays",null]"#
        );
    }
}
