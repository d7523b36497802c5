/// A select statement after the engine has resolved entity references down
/// to collection and column names.
#[derive(PartialEq, Debug, Clone)]
pub struct SelectStatement {
    pub collection: CollectionReference,
    pub projection: Vec<SelectItem>,
    pub predicate: Option<Expression>,
    pub order_by: Vec<SortItem>,
    pub offset: Option<Expression>,
    pub fetch: Option<FetchClause>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CollectionReference {
    pub name: String,
}

impl CollectionReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One select-list entry: the result column label and the expression that
/// produces it.
#[derive(PartialEq, Debug, Clone)]
pub struct SelectItem {
    pub alias: String,
    pub expr: Expression,
}

impl SelectItem {
    pub fn new(alias: impl Into<String>, expr: Expression) -> Self {
        Self {
            alias: alias.into(),
            expr,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expression {
    Column(ColumnReference),
    Literal(LiteralValue),
    /// A positional JDBC parameter marker.
    Parameter,
    Comparison(Comparison),
    Junction(Junction),
    Negation(Box<Expression>),
    IsNull(IsNull),
    Tuple(Vec<Expression>),
    /// A 1-based reference to a select-list position, only legal in ORDER BY.
    Ordinal(usize),
    Function(FunctionCall),
    CaseSearched(CaseSearched),
}

/// A direct reference to a mapped document field. `path` may be dotted for
/// fields of embedded documents.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ColumnReference {
    pub path: String,
    pub nullable: bool,
}

impl ColumnReference {
    pub fn nullable(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            nullable: true,
        }
    }

    pub fn required(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            nullable: false,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    String(String),
}

#[derive(PartialEq, Debug, Clone)]
pub struct Comparison {
    pub op: ComparisonOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Junction {
    pub op: JunctionOp,
    pub members: Vec<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum JunctionOp {
    And,
    Or,
}

#[derive(PartialEq, Debug, Clone)]
pub struct IsNull {
    pub expr: Box<Expression>,
    pub negated: bool,
}

#[derive(PartialEq, Debug, Clone)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expression>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CaseSearched {
    pub branches: Vec<(Expression, Expression)>,
    pub else_branch: Option<Box<Expression>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SortItem {
    pub expr: Expression,
    pub direction: SortDirection,
    pub null_precedence: Option<NullPrecedence>,
    pub case_insensitive: bool,
}

impl SortItem {
    pub fn new(expr: Expression, direction: SortDirection) -> Self {
        Self {
            expr,
            direction,
            null_precedence: None,
            case_insensitive: false,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum NullPrecedence {
    First,
    Last,
}

/// The SQL `FETCH FIRST/NEXT ... ROWS ...` clause. Plain `LIMIT n` arrives
/// as the `RowsOnly` kind.
#[derive(PartialEq, Debug, Clone)]
pub struct FetchClause {
    pub kind: FetchClauseKind,
    pub count: Expression,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum FetchClauseKind {
    RowsOnly,
    RowsWithTies,
    Percent,
    PercentWithTies,
}

#[derive(PartialEq, Debug, Clone)]
pub struct InsertStatement {
    pub collection: CollectionReference,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Expression>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Assignment {
    pub column: String,
    pub value: Expression,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: Expression) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// A bulk update driven by an arbitrary predicate (HQL `update ... where ...`).
#[derive(PartialEq, Debug, Clone)]
pub struct UpdateStatement {
    pub collection: CollectionReference,
    pub assignments: Vec<Assignment>,
    pub predicate: Option<Expression>,
}

/// A bulk delete driven by an arbitrary predicate.
#[derive(PartialEq, Debug, Clone)]
pub struct DeleteStatement {
    pub collection: CollectionReference,
    pub predicate: Option<Expression>,
}

/// A single-row, key-restricted update generated by the engine for entity
/// persistence. These are the statements the engine JDBC-batches.
#[derive(PartialEq, Debug, Clone)]
pub struct ModelUpdate {
    pub collection: CollectionReference,
    pub assignments: Vec<Assignment>,
    pub key_restrictions: Vec<ColumnRestriction>,
}

/// A single-row, key-restricted delete generated by the engine.
#[derive(PartialEq, Debug, Clone)]
pub struct ModelDelete {
    pub collection: CollectionReference,
    pub key_restrictions: Vec<ColumnRestriction>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ColumnRestriction {
    pub column: ColumnReference,
    pub value: Expression,
}

impl Expression {
    /// A short name for the node kind, used in unsupported-feature errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Column(_) => "column reference",
            Expression::Literal(_) => "literal",
            Expression::Parameter => "parameter",
            Expression::Comparison(_) => "comparison",
            Expression::Junction(_) => "junction",
            Expression::Negation(_) => "negation",
            Expression::IsNull(_) => "null test",
            Expression::Tuple(_) => "tuple",
            Expression::Ordinal(_) => "ordinal reference",
            Expression::Function(_) => "function call",
            Expression::CaseSearched(_) => "case expression",
        }
    }
}

impl FetchClauseKind {
    pub fn sql_name(&self) -> &'static str {
        match self {
            FetchClauseKind::RowsOnly => "ROWS ONLY",
            FetchClauseKind::RowsWithTies => "ROWS WITH TIES",
            FetchClauseKind::Percent => "PERCENT ROWS ONLY",
            FetchClauseKind::PercentWithTies => "PERCENT ROWS WITH TIES",
        }
    }
}

impl NullPrecedence {
    pub fn sql_name(&self) -> &'static str {
        match self {
            NullPrecedence::First => "NULLS FIRST",
            NullPrecedence::Last => "NULLS LAST",
        }
    }
}
