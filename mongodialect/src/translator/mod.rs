//! Statement translators: one per statement shape, each walking the
//! relational AST and building up the target MQL command. Translation is a
//! pure tree walk with no I/O; failure is always a typed error and no
//! partial command is ever returned.

use crate::{mql, options::QueryOptions};
use bson::Bson;
use mongodialect_datastructures::DuplicateFieldError;
use thiserror::Error;


mod filter;
mod mutation;
mod select;
mod sort;

pub type Result<T> = std::result::Result<T, Error>;

/// The `$sort` stage key limit enforced by the server.
pub const MAX_SORT_KEYS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("mongodialect does not support {0} expressions in predicates; predicates must be comparisons, junctions, negations, null tests, or boolean field paths")]
    UnsupportedPredicateExpression(&'static str),
    #[error("mongodialect does not support {0} expressions as comparison values; one side must be a field path and the other a literal or parameter")]
    UnsupportedComparisonValue(&'static str),
    #[error("mongodialect does not support {0} expressions as sort keys; sort keys must resolve to field paths")]
    UnsupportedSortKey(&'static str),
    #[error("duplicate sort key: {0}")]
    DuplicateSortKey(String),
    #[error("too many sort keys ({0}); at most {max} are supported", max = MAX_SORT_KEYS)]
    TooManySortKeys(usize),
    #[error("mongodialect does not support null precedence: {0}")]
    UnsupportedNullPrecedence(&'static str),
    #[error("mongodialect does not support case-insensitive sort keys")]
    UnsupportedCaseInsensitiveSort,
    #[error("mongodialect does not support fetch clause type: {0}")]
    UnsupportedFetchClause(&'static str),
    #[error("mongodialect does not support {0} expressions in the select list; selected items must be field paths")]
    UnsupportedProjection(&'static str),
    #[error("mongodialect does not support {0} expressions as limit or offset; only literal integers and parameters are supported")]
    UnsupportedLimitExpression(&'static str),
    #[error("mongodialect does not support {0} expressions as mutation values; only literals and parameters are supported")]
    UnsupportedMutationValue(&'static str),
    #[error("limit/offset must be non-negative, got {0}")]
    NegativeLimit(i64),
    #[error("limit/offset {0} exceeds the supported range")]
    LimitOutOfRange(u64),
    #[error("sort ordinal {ordinal} out of range: the select list has {count} items")]
    SortOrdinalOutOfRange { ordinal: usize, count: usize },
    #[error("a junction predicate must have at least one member")]
    EmptyJunction,
    #[error("insert row has {got} values but the statement names {expected} columns")]
    ColumnCountMismatch { expected: usize, got: usize },
    #[error("invalid document field '{0}': fields may not be empty, contain dots, or start with dollars")]
    InvalidDocumentField(String),
    #[error("invalid update path '{0}': update paths may not be empty or start with dollars")]
    InvalidUpdatePath(String),
    #[error(transparent)]
    DuplicateField(#[from] DuplicateFieldError),
}

/// Translates relational statements into MQL commands. One instance per
/// translation; holds the runtime limit/offset snapshot for selects.
#[derive(Debug, Clone, Default)]
pub struct MqlTranslator {
    pub options: QueryOptions,
}

impl MqlTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: QueryOptions) -> Self {
        Self { options }
    }
}

/// A parameter the translator introduced itself (runtime limit/offset): the
/// concrete value plus the 0-based position of its placeholder among all of
/// the command's placeholders in document order. Positions matter because a
/// runtime `$skip` placeholder can precede a user-parameterized `$limit`;
/// binding is positional, never order-of-introduction.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitParameter {
    pub position: usize,
    pub value: Bson,
}

/// The output of translating a select statement: the finished command, the
/// ordered result column labels, and the placeholders the translator itself
/// introduced for runtime limit/offset, each pinned to its exact placeholder
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectTranslation {
    pub command: mql::Command,
    pub select_order: Vec<String>,
    pub implicit_parameters: Vec<ImplicitParameter>,
}
