pub mod error;
pub mod fieldmask;
pub mod lucene;
mod scan;
pub mod sql;

pub use error::{Result, SquillError};
pub use fieldmask::parse_masks;
pub use lucene::{
    parse, BoolOp, BooleanExpression, Node, Occur, RangeKind, RangeQuery, TermOp, TermQuery,
    Value, Wildcard, WildcardKind,
};
pub use sql::{to_sql, Filter, Fragment, Query, SearchMode, ToSqlOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
