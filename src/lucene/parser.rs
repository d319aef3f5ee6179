//! Recursive descent parser for Lucene-style filter strings
//!
//! # Grammar
//!
//! ```text
//! query     := _ node+
//! node      := operator EOF            -- a dangling operator
//!            | operator node           -- leading operators are dropped
//!            | group operator? node+   -- explicit or implicit boolean
//!            | group
//! group     := '(' node+ ')' | field_exp
//! field_exp := fieldname? array
//!            | fieldname? range
//!            | fieldname '(' node+ ')' -- field propagates into the group
//!            | fieldname? term
//! fieldname := (identifier | quoted) ':'
//! term      := equality? ('+' | '-')? (number | quoted | wildcard | identifier)
//! range     := ('[' | '{') bound TO bound (']' | '}')
//! array     := '[' (value (',' value)*)? ']'
//! operator  := 'AND' | 'OR' | 'NOT' | '&&' | '||' | 'and' | 'or' | 'not'
//! equality  := '>=' | '>' | '<=' | '<' | '!=' | '~' | '~*' | '!~' | '!~*'
//!            | ('gt' | 'gte' | 'lt' | 'lte' | 'eq' | 'neq') whitespace
//! ```
//!
//! Alternatives are ordered; backtracking is local via scanner marks.
//! Inequality terms are rewritten into ranges at reduction time, so
//! `age: > 5`, `age: gt 5` and `age: {5 TO *}` yield identical trees.

use super::ast::{BoolOp, BooleanExpression, Node, Occur, TermOp, TermQuery, RangeQuery, Value, Wildcard};
use crate::error::SquillError;
use crate::scan::Scanner;
use crate::Result;

/// Parse a Lucene-style filter string into its AST
pub fn parse(input: &str) -> Result<Node> {
    Parser::new(input).parse()
}

/// Characters that may appear in an unquoted term or field name
fn is_term_char(ch: char) -> bool {
    !ch.is_whitespace()
        && !matches!(
            ch,
            ':' | ')' | '(' | '{' | '}' | '"' | '^' | '~' | '\\' | '[' | ']' | '*' | '+' | '-'
        )
}

/// Array values additionally end at the element separator
fn is_array_char(ch: char) -> bool {
    is_term_char(ch) && ch != ','
}

/// Type an unquoted chunk of text
fn classify_scalar(text: &str) -> Value {
    match text {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if text.chars().all(|ch| ch.is_ascii_digit()) {
                if let Ok(value) = text.parse::<i64>() {
                    return Value::Int(value);
                }
            } else if let Some((int, frac)) = text.split_once('.') {
                let decimal = !int.is_empty()
                    && !frac.is_empty()
                    && int.chars().all(|ch| ch.is_ascii_digit())
                    && frac.chars().all(|ch| ch.is_ascii_digit());
                if decimal {
                    if let Ok(value) = text.parse::<f64>() {
                        return Value::Float(value);
                    }
                }
            }
            Value::String(text.to_string())
        }
    }
}

const SYMBOL_OPS: &[(&str, TermOp)] = &[
    (">=", TermOp::Gte),
    ("<=", TermOp::Lte),
    ("!~*", TermOp::NotMatchCi),
    ("!~", TermOp::NotMatch),
    ("!=", TermOp::Neq),
    ("~*", TermOp::MatchCi),
    ("~", TermOp::Match),
    (">", TermOp::Gt),
    ("<", TermOp::Lt),
];

struct Parser {
    scanner: Scanner,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            scanner: Scanner::new(input),
        }
    }

    fn parse(&mut self) -> Result<Node> {
        self.scanner.skip_whitespace();
        if self.scanner.is_eof() {
            return Err(SquillError::InvalidQuery);
        }
        let mut nodes = vec![self.parse_node()?];
        loop {
            self.scanner.skip_whitespace();
            if self.scanner.is_eof() {
                break;
            }
            nodes.push(self.parse_node()?);
        }
        // only dangling-operator inputs leave more than one top-level node
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Boolean(BooleanExpression::new(BoolOp::Implicit, nodes))
        })
    }

    fn parse_node(&mut self) -> Result<Node> {
        self.scanner.skip_whitespace();
        if let Some(op) = self.try_operator() {
            self.scanner.skip_whitespace();
            if self.scanner.is_eof() {
                return Ok(Node::Boolean(BooleanExpression::new(op, Vec::new())));
            }
            // a leading conjunction has nothing to join; drop it and parse on
            return self.parse_node();
        }

        let group = self.parse_group()?;
        let mark = self.scanner.mark();
        self.scanner.skip_whitespace();
        let op = self.try_operator();
        let mut rest = Vec::new();
        while let Some(node) = self.try_parse_node() {
            rest.push(node);
        }
        if rest.is_empty() {
            // no joinable tail; leave any operator token for the caller
            self.scanner.rewind(mark);
            return Ok(group);
        }
        let mut args = vec![group];
        args.extend(rest);
        Ok(Node::Boolean(BooleanExpression::new(
            op.unwrap_or(BoolOp::Implicit),
            args,
        )))
    }

    fn try_parse_node(&mut self) -> Option<Node> {
        let mark = self.scanner.mark();
        match self.parse_node() {
            Ok(node) => Some(node),
            Err(_) => {
                self.scanner.rewind(mark);
                None
            }
        }
    }

    fn parse_group(&mut self) -> Result<Node> {
        self.scanner.skip_whitespace();
        if self.scanner.peek() == Some('(') {
            return self.parse_paren();
        }
        self.parse_field_exp()
    }

    fn parse_paren(&mut self) -> Result<Node> {
        self.scanner.advance(); // consume '('
        self.scanner.skip_whitespace();
        let mut nodes = vec![self.parse_node()?];
        while let Some(node) = self.try_parse_node() {
            nodes.push(node);
        }
        self.scanner.skip_whitespace();
        if !self.scanner.eat(')') {
            return Err(self.unexpected("expected `)`"));
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Boolean(BooleanExpression::new(BoolOp::Implicit, nodes))
        })
    }

    fn parse_field_exp(&mut self) -> Result<Node> {
        let field = self.try_fieldname();
        if field.is_some() {
            self.scanner.skip_whitespace();
        }
        match self.scanner.peek() {
            Some('[' | '{') => self.parse_array_or_range(field),
            Some('(') if field.is_some() => {
                let field = field.unwrap_or_default();
                let inner = self.parse_paren()?.with_field(&field);
                // a single-term group reduces like a plain field expression
                Ok(match inner {
                    Node::Term(term) => term.into_node(),
                    node => node,
                })
            }
            _ => self.parse_term(field),
        }
    }

    /// Match `identifier ':'` or `"quoted" ':'` with the colon immediately
    /// following the name
    fn try_fieldname(&mut self) -> Option<String> {
        let mark = self.scanner.mark();
        if self.scanner.peek() == Some('"') {
            if let Ok(name) = self.scanner.read_quoted() {
                if self.scanner.eat(':') {
                    return Some(name);
                }
            }
            self.scanner.rewind(mark);
            return None;
        }
        let name = self.scanner.read_while(is_term_char);
        if !name.is_empty() && self.scanner.eat(':') {
            return Some(name);
        }
        self.scanner.rewind(mark);
        None
    }

    fn parse_array_or_range(&mut self, field: Option<String>) -> Result<Node> {
        let start = self.scanner.position();
        let term = field.unwrap_or_default();
        if self.scanner.peek() == Some('[') {
            if let Some(values) = self.try_parse_array() {
                let term = TermQuery::new(term, Value::List(values)).with_op(TermOp::In);
                return Ok(Node::Term(term));
            }
        }
        self.parse_range(term, start)
    }

    fn try_parse_array(&mut self) -> Option<Vec<Value>> {
        let mark = self.scanner.mark();
        self.scanner.advance(); // consume '['
        self.scanner.skip_whitespace();
        if self.scanner.eat(']') {
            return Some(Vec::new());
        }
        let mut values = Vec::new();
        loop {
            let Some(value) = self.try_array_value() else {
                self.scanner.rewind(mark);
                return None;
            };
            values.push(value);
            self.scanner.skip_whitespace();
            if self.scanner.eat(',') {
                self.scanner.skip_whitespace();
                continue;
            }
            if self.scanner.eat(']') {
                return Some(values);
            }
            self.scanner.rewind(mark);
            return None;
        }
    }

    fn try_array_value(&mut self) -> Option<Value> {
        if let Some(value) = self.try_number(true) {
            return Some(value);
        }
        if self.scanner.peek() == Some('"') {
            return self.scanner.read_quoted().ok().map(Value::String);
        }
        let text = self.scanner.read_while(is_array_char);
        if text.is_empty() {
            None
        } else {
            Some(classify_scalar(&text))
        }
    }

    fn parse_range(&mut self, term: String, start: usize) -> Result<Node> {
        let inclusive = match self.scanner.peek() {
            Some('[') => true,
            Some('{') => false,
            _ => return Err(SquillError::InvalidRange { position: start }),
        };
        self.scanner.advance();
        self.scanner.skip_whitespace();
        let min = self.parse_range_bound(start)?;
        self.scanner.skip_whitespace();
        if !self.scanner.eat_str("TO") || !self.scanner.at_whitespace() {
            return Err(SquillError::InvalidRange { position: start });
        }
        self.scanner.skip_whitespace();
        let max = self.parse_range_bound(start)?;
        self.scanner.skip_whitespace();
        // inclusivity follows the opening bracket; either closer is accepted
        if !(self.scanner.eat(']') || self.scanner.eat('}')) {
            return Err(SquillError::InvalidRange { position: start });
        }
        Ok(Node::Range(RangeQuery::new(term, min, max, inclusive)))
    }

    /// A bound is `*` (unbounded), a number, a quoted string, or a bare
    /// identifier
    fn parse_range_bound(&mut self, start: usize) -> Result<Option<Value>> {
        if self.scanner.eat('*') {
            return Ok(None);
        }
        if let Some(value) = self.try_number(false) {
            return Ok(Some(value));
        }
        if self.scanner.peek() == Some('"') {
            return Ok(Some(Value::String(self.scanner.read_quoted()?)));
        }
        let text = self.scanner.read_while(is_term_char);
        if text.is_empty() {
            return Err(SquillError::InvalidRange { position: start });
        }
        Ok(Some(classify_scalar(&text)))
    }

    fn parse_term(&mut self, field: Option<String>) -> Result<Node> {
        let term = field.unwrap_or_default();
        let mark = self.scanner.mark();
        if let Some(op) = self.try_equality() {
            self.scanner.skip_whitespace();
            if let Ok((prefix, value)) = self.parse_term_value() {
                return Ok(TermQuery {
                    term,
                    prefix,
                    op,
                    value,
                }
                .into_node());
            }
            self.scanner.rewind(mark);
        }
        let (prefix, value) = self.parse_term_value()?;
        Ok(TermQuery {
            term,
            prefix,
            op: TermOp::None,
            value,
        }
        .into_node())
    }

    fn parse_term_value(&mut self) -> Result<(Occur, Value)> {
        // negative numbers win over the must-not prefix
        if let Some(value) = self.try_number(false) {
            return Ok((Occur::Should, value));
        }
        let prefix = match self.scanner.peek() {
            Some('+') => {
                self.scanner.advance();
                Occur::Must
            }
            Some('-') => {
                self.scanner.advance();
                Occur::MustNot
            }
            _ => Occur::Should,
        };
        let value = self.parse_value_atom()?;
        Ok((prefix, value))
    }

    /// A single value: number, quoted string, wildcard pattern, or scalar
    /// text. Wildcard alternatives are ordered `P*S`, `P*`, `*T*`, `*T`, `*`.
    fn parse_value_atom(&mut self) -> Result<Value> {
        if let Some(value) = self.try_number(false) {
            return Ok(value);
        }
        if self.scanner.peek() == Some('"') {
            return Ok(Value::String(self.scanner.read_quoted()?));
        }
        let text = self.scanner.read_while(is_term_char);
        if !text.is_empty() {
            if self.scanner.eat('*') {
                let suffix = self.scanner.read_while(is_term_char);
                if suffix.is_empty() {
                    return Ok(Value::Wildcard(Wildcard::prefix(text)));
                }
                return Ok(Value::Wildcard(Wildcard::between(text, suffix)));
            }
            return Ok(classify_scalar(&text));
        }
        if self.scanner.eat('*') {
            let term = self.scanner.read_while(is_term_char);
            if term.is_empty() {
                return Ok(Value::Wildcard(Wildcard::default()));
            }
            if self.scanner.eat('*') {
                return Ok(Value::Wildcard(Wildcard::any(term)));
            }
            return Ok(Value::Wildcard(Wildcard::suffix(term)));
        }
        Err(self.unexpected("expected a term value"))
    }

    /// Signed integer or decimal. A number glued to more term text or a
    /// wildcard is not a number (`23abc`, `23*`).
    fn try_number(&mut self, in_array: bool) -> Option<Value> {
        let mark = self.scanner.mark();
        let mut text = String::new();
        if self.scanner.eat('-') {
            text.push('-');
        }
        let digits = self.scanner.read_while(|ch| ch.is_ascii_digit());
        if digits.is_empty() {
            self.scanner.rewind(mark);
            return None;
        }
        text.push_str(&digits);
        let mut is_float = false;
        let dot = self.scanner.mark();
        if self.scanner.eat('.') {
            let frac = self.scanner.read_while(|ch| ch.is_ascii_digit());
            if frac.is_empty() {
                self.scanner.rewind(dot);
            } else {
                is_float = true;
                text.push('.');
                text.push_str(&frac);
            }
        }
        if let Some(next) = self.scanner.peek() {
            let glued = next == '*'
                || if in_array {
                    is_array_char(next)
                } else {
                    is_term_char(next)
                };
            if glued {
                self.scanner.rewind(mark);
                return None;
            }
        }
        let value = if is_float {
            text.parse().ok().map(Value::Float)
        } else {
            text.parse().ok().map(Value::Int)
        };
        if value.is_none() {
            self.scanner.rewind(mark);
        }
        value
    }

    fn try_equality(&mut self) -> Option<TermOp> {
        for (symbol, op) in SYMBOL_OPS {
            if self.scanner.eat_str(symbol) {
                return Some(*op);
            }
        }
        let mark = self.scanner.mark();
        let word = self.scanner.read_while(is_term_char);
        let op = match word.as_str() {
            "gt" => Some(TermOp::Gt),
            "gte" => Some(TermOp::Gte),
            "lt" => Some(TermOp::Lt),
            "lte" => Some(TermOp::Lte),
            "eq" => Some(TermOp::Eq),
            "neq" => Some(TermOp::Neq),
            _ => None,
        };
        // word operators only count when whitespace separates them from the
        // value, so identifiers like `gtk` stay terms
        match op {
            Some(op) if self.scanner.at_whitespace() => Some(op),
            _ => {
                self.scanner.rewind(mark);
                None
            }
        }
    }

    fn try_operator(&mut self) -> Option<BoolOp> {
        if self.scanner.eat_str("&&") {
            return Some(BoolOp::And);
        }
        if self.scanner.eat_str("||") {
            return Some(BoolOp::Or);
        }
        let mark = self.scanner.mark();
        let word = self.scanner.read_while(is_term_char);
        let op = match word.as_str() {
            "AND" | "and" => Some(BoolOp::And),
            "OR" | "or" => Some(BoolOp::Or),
            "NOT" | "not" => Some(BoolOp::Not),
            _ => None,
        };
        if op.is_none() {
            self.scanner.rewind(mark);
        }
        op
    }

    fn unexpected(&self, message: &str) -> SquillError {
        SquillError::Parse {
            position: self.scanner.position(),
            message: message.to_string(),
        }
    }
}
