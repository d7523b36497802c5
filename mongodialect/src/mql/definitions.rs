use mongodialect_datastructures::UniqueFieldMap;

#[derive(PartialEq, Debug, Clone)]
pub enum Command {
    Aggregate(AggregateCommand),
    Insert(InsertCommand),
    Update(UpdateCommand),
    Delete(DeleteCommand),
}

#[derive(PartialEq, Debug, Clone)]
pub struct AggregateCommand {
    pub collection: String,
    pub pipeline: Vec<Stage>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct InsertCommand {
    pub collection: String,
    pub documents: Vec<UniqueFieldMap<String, Expression>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct UpdateCommand {
    pub collection: String,
    /// `None` matches every document in the collection.
    pub filter: Option<Filter>,
    pub set: UniqueFieldMap<String, Expression>,
    pub multi: bool,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DeleteCommand {
    pub collection: String,
    pub filter: Option<Filter>,
    pub multi: bool,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Stage {
    Match(Filter),
    Sort(Vec<SortSpec>),
    Skip(Expression),
    Limit(Expression),
    Project(UniqueFieldMap<String, ProjectItem>),
}

#[derive(PartialEq, Debug, Clone)]
pub enum ProjectItem {
    Include,
    Exclude,
    Assign(Expression),
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// The query-language filter form: comparisons keyed by field, combined by
/// n-ary logical operators. There is no native `not` for arbitrary
/// sub-filters, so negation is always a single-element `Nor`, and double
/// negation stays a nested nor-of-nor. Simplification is deliberately out of
/// scope here.
#[derive(PartialEq, Debug, Clone)]
pub enum Filter {
    Comparison(ComparisonFilter),
    Logical(LogicalFilter),
}

impl Filter {
    pub fn negated(self) -> Filter {
        Filter::Logical(LogicalFilter {
            op: LogicalOp::Nor,
            filters: vec![self],
        })
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ComparisonFilter {
    pub field: String,
    pub op: ComparisonOp,
    pub value: Expression,
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
pub struct LogicalFilter {
    pub op: LogicalOp,
    pub filters: Vec<Filter>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum LogicalOp {
    And,
    Or,
    Nor,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expression {
    Literal(LiteralValue),
    /// A deferred parameter marker, resolved when the JDBC facade binds
    /// concrete values. Renders as BSON `undefined`.
    Placeholder,
    /// A `$`-prefixed reference to a document field, used in `$project`
    /// assignments.
    FieldRef(String),
    Document(UniqueFieldMap<String, Expression>),
    Array(Vec<Expression>),
}

#[derive(PartialEq, Debug, Clone)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    String(String),
    ObjectId(bson::oid::ObjectId),
}
