//! Integration tests for the Lucene filter parser
//!
//! Table-driven cases covering scalar typing, ranges, booleans, and
//! wildcards, plus the structural identities the parser guarantees
//! (inequality/range fusion, quote equivalence, field propagation).

use squill::lucene::{
    parse, BoolOp, BooleanExpression, Node, Occur, RangeQuery, TermOp, TermQuery, Value, Wildcard,
};

fn term(field: &str, value: Value) -> Node {
    Node::Term(TermQuery::new(field, value))
}

fn boolean(op: BoolOp, args: Vec<Node>) -> Node {
    Node::Boolean(BooleanExpression::new(op, args))
}

fn assert_parses(queries: &[&str], expected: &Node) {
    for query in queries {
        let got =
            parse(query).unwrap_or_else(|err| panic!("expected `{query}` to parse, got {err}"));
        assert_eq!(&got, expected, "query `{query}`");
    }
}

#[test]
fn test_term_queries() {
    assert_parses(
        &["name: peter", "name: \"peter\""],
        &term("name", "peter".into()),
    );
    assert_parses(
        &[
            "labels.tech.tech/volunteers/type: \"peter\"",
            "labels.tech.tech/volunteers/type: peter",
        ],
        &term("labels.tech.tech/volunteers/type", "peter".into()),
    );
    assert_parses(
        &["name: eq \"peter\""],
        &Node::Term(TermQuery::new("name", "peter".into()).with_op(TermOp::Eq)),
    );
    assert_parses(&["age: null"], &term("age", Value::Null));
    assert_parses(&["available: false"], &term("available", false.into()));
    assert_parses(&["available: true"], &term("available", true.into()));
    assert_parses(&["age: 23"], &term("age", Value::Int(23)));
    assert_parses(&["metric: -23"], &term("metric", Value::Int(-23)));
    assert_parses(&["age: 23.5"], &term("age", Value::Float(23.5)));
    assert_parses(&["metric: -123.456"], &term("metric", Value::Float(-123.456)));
    assert_parses(
        &[r#"quote: "a walk in the \"park\"""#],
        &term("quote", "a walk in the \"park\"".into()),
    );
    assert_parses(
        &[r#"array: [1,-2.5,3.14,-12,"arrays"]"#],
        &Node::Term(
            TermQuery::new(
                "array",
                Value::List(vec![
                    Value::Int(1),
                    Value::Float(-2.5),
                    Value::Float(3.14),
                    Value::Int(-12),
                    "arrays".into(),
                ]),
            )
            .with_op(TermOp::In),
        ),
    );
}

#[test]
fn test_range_queries() {
    let range = |term: &str, min, max, inclusive| {
        Node::Range(RangeQuery::new(term, min, max, inclusive))
    };

    assert_parses(
        &["age: [18 TO 25]"],
        &range("age", Some(Value::Int(18)), Some(Value::Int(25)), true),
    );
    assert_parses(
        &["metric: [-18.54 TO 5.5]"],
        &range(
            "metric",
            Some(Value::Float(-18.54)),
            Some(Value::Float(5.5)),
            true,
        ),
    );
    assert_parses(
        &["age: {18 TO 25}"],
        &range("age", Some(Value::Int(18)), Some(Value::Int(25)), false),
    );
    assert_parses(
        &["metric: {-18.54 TO 5.5}"],
        &range(
            "metric",
            Some(Value::Float(-18.54)),
            Some(Value::Float(5.5)),
            false,
        ),
    );
    assert_parses(
        &[r#"metric: ["2020-01-01" TO "2020-03-31"]"#],
        &range(
            "metric",
            Some("2020-01-01".into()),
            Some("2020-03-31".into()),
            true,
        ),
    );
    assert_parses(
        &[r#"metric: {"2020-01-01" TO "2020-03-31"}"#],
        &range(
            "metric",
            Some("2020-01-01".into()),
            Some("2020-03-31".into()),
            false,
        ),
    );
    assert_parses(
        &["metric: [5 TO *]", "metric: >= 5", "metric: gte 5"],
        &range("metric", Some(Value::Int(5)), None, true),
    );
    assert_parses(
        &["metric: {5 TO *}", "metric: > 5", "metric: gt 5"],
        &range("metric", Some(Value::Int(5)), None, false),
    );
    assert_parses(
        &["metric: [* TO 3.14]", "metric: <= 3.14", "metric: lte 3.14"],
        &range("metric", None, Some(Value::Float(3.14)), true),
    );
    assert_parses(
        &["metric: {* TO 3.14}", "metric: < 3.14", "metric: lt 3.14"],
        &range("metric", None, Some(Value::Float(3.14)), false),
    );
    assert_parses(&["metric: {* TO *}"], &range("metric", None, None, false));
}

#[test]
fn test_boolean_queries() {
    // inputs made solely of operators surface an empty boolean
    assert_parses(&[" OR "], &boolean(BoolOp::Or, vec![]));
    assert_parses(&["OR AND"], &boolean(BoolOp::And, vec![]));

    // leading operators before a real node are discarded
    assert_parses(&["OR AND foo"], &term("", "foo".into()));
    assert_parses(&["NOT \"Apache Lucene\""], &term("", "Apache Lucene".into()));

    assert_parses(
        &["\"jakarta apache\" jakarta"],
        &boolean(
            BoolOp::Implicit,
            vec![term("", "jakarta apache".into()), term("", "jakarta".into())],
        ),
    );
    assert_parses(
        &["\"jakarta apache\" OR jakarta", "\"jakarta apache\" || jakarta"],
        &boolean(
            BoolOp::Or,
            vec![term("", "jakarta apache".into()), term("", "jakarta".into())],
        ),
    );
    assert_parses(
        &["+jakarta lucene"],
        &boolean(
            BoolOp::Implicit,
            vec![
                Node::Term(TermQuery::new("", "jakarta".into()).with_prefix(Occur::Must)),
                term("", "lucene".into()),
            ],
        ),
    );
    assert_parses(
        &[
            "\"jakarta apache\" AND \"Apache Lucene\"",
            "\"jakarta apache\" && \"Apache Lucene\"",
        ],
        &boolean(
            BoolOp::And,
            vec![
                term("", "jakarta apache".into()),
                term("", "Apache Lucene".into()),
            ],
        ),
    );
    assert_parses(
        &["\"jakarta apache\" NOT \"Apache Lucene\""],
        &boolean(
            BoolOp::Not,
            vec![
                term("", "jakarta apache".into()),
                term("", "Apache Lucene".into()),
            ],
        ),
    );
    assert_parses(
        &["title:(+return +\"pink panther\")"],
        &boolean(
            BoolOp::Implicit,
            vec![
                Node::Term(TermQuery::new("title", "return".into()).with_prefix(Occur::Must)),
                Node::Term(
                    TermQuery::new("title", "pink panther".into()).with_prefix(Occur::Must),
                ),
            ],
        ),
    );
    assert_parses(
        &["(jakarta OR apache) AND website"],
        &boolean(
            BoolOp::And,
            vec![
                boolean(
                    BoolOp::Or,
                    vec![term("", "jakarta".into()), term("", "apache".into())],
                ),
                term("", "website".into()),
            ],
        ),
    );
}

#[test]
fn test_wildcard_queries() {
    assert_parses(&["*"], &term("", Wildcard::default().into()));
    assert_parses(
        &["title: jakat*"],
        &term("title", Wildcard::prefix("jakat").into()),
    );
    assert_parses(&["test*"], &term("", Wildcard::prefix("test").into()));
    assert_parses(&["tes*t"], &term("", Wildcard::between("tes", "t").into()));
    assert_parses(&["*term"], &term("", Wildcard::suffix("term").into()));
    assert_parses(&["*term*"], &term("", Wildcard::any("term").into()));

    // `?` has no wildcard meaning and stays part of the identifier
    assert_parses(&["tes?t"], &term("", "tes?t".into()));
}

#[test]
fn test_inequality_round_trips() {
    assert_eq!(parse("f: > 5").unwrap(), parse("f: {5 TO *}").unwrap());
    assert_eq!(parse("f: > 5").unwrap(), parse("f: gt 5").unwrap());
    assert_eq!(parse("f: >= 5").unwrap(), parse("f: [5 TO *]").unwrap());
    assert_eq!(parse("f: >= 5").unwrap(), parse("f: gte 5").unwrap());
    assert_eq!(parse("f: < 5").unwrap(), parse("f: {* TO 5}").unwrap());
    assert_eq!(parse("f: < 5").unwrap(), parse("f: lt 5").unwrap());
    assert_eq!(parse("f: <= 5").unwrap(), parse("f: [* TO 5]").unwrap());
    assert_eq!(parse("f: <= 5").unwrap(), parse("f: lte 5").unwrap());
}

#[test]
fn test_quote_equivalence() {
    for plain in ["peter", "v1.2", "some_word"] {
        let quoted = format!("f: \"{plain}\"");
        let bare = format!("f: {plain}");
        assert_eq!(
            parse(&quoted).unwrap(),
            parse(&bare).unwrap(),
            "value `{plain}`"
        );
    }
}

#[test]
fn test_field_propagation() {
    fn assert_all_terms_bound(node: &Node, field: &str) {
        match node {
            Node::Term(term) => assert_eq!(term.term, field),
            Node::Boolean(boolean) => {
                for arg in &boolean.args {
                    assert_all_terms_bound(arg, field);
                }
            }
            Node::Range(_) => {}
        }
    }

    let node = parse("body:(+apple +mac (linux unix))").unwrap();
    assert_all_terms_bound(&node, "body");

    // explicitly bound inner fields are preserved
    let node = parse("body:(apple os:mac)").unwrap();
    let Node::Boolean(boolean) = node else {
        panic!("expected boolean");
    };
    assert_eq!(
        boolean.args[0],
        Node::Term(TermQuery::new("body", "apple".into()))
    );
    assert_eq!(
        boolean.args[1],
        Node::Term(TermQuery::new("os", "mac".into()))
    );
}

#[test]
fn test_serialized_shape() {
    // the AST serializes with the textual operator forms
    let node = parse("body:(+apple -mac)").unwrap();
    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(json["boolean"]["op"], "IMPLICIT");
    assert_eq!(json["boolean"]["args"][0]["term"]["prefix"], "+");
    assert_eq!(json["boolean"]["args"][1]["term"]["prefix"], "-");
}
