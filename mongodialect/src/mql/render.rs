use crate::mql::{
    Command, ComparisonOp, Expression, Filter, LiteralValue, LogicalOp, ProjectItem, SortDirection,
    Stage,
};
use bson::{doc, Bson, Document};

impl ComparisonOp {
    pub fn mql_name(&self) -> &'static str {
        use ComparisonOp::*;
        match self {
            Eq => "$eq",
            Ne => "$ne",
            Lt => "$lt",
            Lte => "$lte",
            Gt => "$gt",
            Gte => "$gte",
        }
    }
}

impl LogicalOp {
    pub fn mql_name(&self) -> &'static str {
        use LogicalOp::*;
        match self {
            And => "$and",
            Or => "$or",
            Nor => "$nor",
        }
    }
}

impl LiteralValue {
    pub fn render(&self) -> Bson {
        use LiteralValue::*;
        match self {
            Null => Bson::Null,
            Boolean(b) => Bson::Boolean(*b),
            Integer(i) => Bson::Int32(*i),
            Long(l) => Bson::Int64(*l),
            Double(d) => Bson::Double(*d),
            String(s) => Bson::String(s.clone()),
            ObjectId(oid) => Bson::ObjectId(*oid),
        }
    }
}

impl Expression {
    pub fn render(&self) -> Bson {
        use Expression::*;
        match self {
            Literal(lit) => lit.render(),
            Placeholder => Bson::Undefined,
            FieldRef(path) => Bson::String(format!("${path}")),
            Document(fields) => Bson::Document(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.render()))
                    .collect(),
            ),
            Array(items) => Bson::Array(items.iter().map(Expression::render).collect()),
        }
    }
}

impl Filter {
    pub fn render(&self) -> Document {
        match self {
            Filter::Comparison(c) => {
                let mut operation = Document::new();
                operation.insert(c.op.mql_name(), c.value.render());
                let mut filter = Document::new();
                filter.insert(c.field.clone(), operation);
                filter
            }
            Filter::Logical(l) => {
                let members: Vec<Bson> = l
                    .filters
                    .iter()
                    .map(|f| Bson::Document(f.render()))
                    .collect();
                let mut filter = Document::new();
                filter.insert(l.op.mql_name(), members);
                filter
            }
        }
    }
}

impl SortDirection {
    pub fn render(&self) -> Bson {
        match self {
            SortDirection::Asc => Bson::Int32(1),
            SortDirection::Desc => Bson::Int32(-1),
        }
    }
}

impl Stage {
    pub fn render(&self) -> Document {
        match self {
            Stage::Match(filter) => doc! { "$match": filter.render() },
            Stage::Sort(specs) => {
                let keys: Document = specs
                    .iter()
                    .map(|s| (s.field.clone(), s.direction.render()))
                    .collect();
                doc! { "$sort": keys }
            }
            Stage::Skip(n) => doc! { "$skip": n.render() },
            Stage::Limit(n) => doc! { "$limit": n.render() },
            Stage::Project(items) => {
                let mut body = Document::new();
                // _id is included by the server unless suppressed, so an
                // unprojected _id must be excluded up front to keep the
                // result shape exactly the select list.
                if !items.contains_key(&"_id".to_string()) {
                    body.insert("_id", Bson::Int32(0));
                }
                for (field, item) in items.iter() {
                    let value = match item {
                        ProjectItem::Include => Bson::Int32(1),
                        ProjectItem::Exclude => Bson::Int32(0),
                        ProjectItem::Assign(expr) => expr.render(),
                    };
                    body.insert(field.clone(), value);
                }
                doc! { "$project": body }
            }
        }
    }
}

impl Command {
    /// The collection this command runs against.
    pub fn collection(&self) -> &str {
        match self {
            Command::Aggregate(c) => &c.collection,
            Command::Insert(c) => &c.collection,
            Command::Update(c) => &c.collection,
            Command::Delete(c) => &c.collection,
        }
    }

    pub fn render(&self) -> Document {
        match self {
            Command::Aggregate(agg) => {
                let pipeline: Vec<Bson> = agg
                    .pipeline
                    .iter()
                    .map(|s| Bson::Document(s.render()))
                    .collect();
                doc! { "aggregate": agg.collection.clone(), "pipeline": pipeline }
            }
            Command::Insert(ins) => {
                let documents: Vec<Bson> = ins
                    .documents
                    .iter()
                    .map(|d| {
                        Bson::Document(d.iter().map(|(k, v)| (k.clone(), v.render())).collect())
                    })
                    .collect();
                doc! { "insert": ins.collection.clone(), "documents": documents }
            }
            Command::Update(upd) => {
                let q = upd.filter.as_ref().map(Filter::render).unwrap_or_default();
                let set: Document = upd
                    .set
                    .iter()
                    .map(|(k, v)| (k.clone(), v.render()))
                    .collect();
                doc! {
                    "update": upd.collection.clone(),
                    "updates": [ { "q": q, "u": { "$set": set }, "multi": upd.multi } ],
                }
            }
            Command::Delete(del) => {
                let q = del.filter.as_ref().map(Filter::render).unwrap_or_default();
                let limit = if del.multi { 0 } else { 1 };
                doc! {
                    "delete": del.collection.clone(),
                    "deletes": [ { "q": q, "limit": limit } ],
                }
            }
        }
    }

    /// The parameterized command text handed to the JDBC facade. Relaxed
    /// extended JSON; placeholders appear as `{"$undefined": true}`.
    pub fn to_text(&self) -> String {
        Bson::Document(self.render())
            .into_relaxed_extjson()
            .to_string()
    }
}

/// Counts placeholder markers in a rendered command, walking fields and
/// array elements in document order. This order is the binding order.
pub fn placeholder_count(doc: &Document) -> usize {
    fn count_bson(value: &Bson) -> usize {
        match value {
            Bson::Undefined => 1,
            Bson::Document(d) => placeholder_count(d),
            Bson::Array(items) => items.iter().map(count_bson).sum(),
            _ => 0,
        }
    }
    doc.values().map(count_bson).sum()
}
