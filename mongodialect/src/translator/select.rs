use crate::{
    mql,
    sql,
    translator::{Error, ImplicitParameter, MqlTranslator, Result, SelectTranslation},
};
use bson::Bson;
use mongodialect_datastructures::UniqueFieldMap;

/// A limit/offset argument after validation: either a value known at
/// translation time or a parameter bound later.
enum LimitArg {
    Value(i64),
    Parameter,
}

impl MqlTranslator {
    /// Translates a select statement into an aggregate command. Stage order
    /// is fixed: `$match` (iff a predicate exists), `$sort` (iff order-by
    /// exists), `$skip` (iff an offset applies), `$limit` (iff a limit
    /// applies), `$project` (always last, enumerating every selected
    /// field/alias).
    pub fn translate_select(&self, statement: sql::SelectStatement) -> Result<SelectTranslation> {
        let mut pipeline = Vec::new();
        let mut implicit_parameters = Vec::new();

        if let Some(predicate) = statement.predicate {
            pipeline.push(mql::Stage::Match(self.translate_filter(predicate)?));
        }

        if !statement.order_by.is_empty() {
            pipeline.push(mql::Stage::Sort(
                self.translate_order_by(statement.order_by, &statement.projection)?,
            ));
        }

        // Placeholder positions are document order, so the predicate's user
        // placeholders all come before anything $skip/$limit contributes.
        let mut next_placeholder: usize = pipeline
            .iter()
            .map(|stage| mql::placeholder_count(&stage.render()))
            .sum();

        if let Some(skip) = self.effective_offset(
            statement.offset,
            &mut implicit_parameters,
            &mut next_placeholder,
        )? {
            pipeline.push(skip);
        }
        if let Some(limit) = self.effective_limit(
            statement.fetch,
            &mut implicit_parameters,
            &mut next_placeholder,
        )? {
            pipeline.push(limit);
        }

        let (project, select_order) = Self::translate_projection(statement.projection)?;
        pipeline.push(mql::Stage::Project(project));

        Ok(SelectTranslation {
            command: mql::Command::Aggregate(mql::AggregateCommand {
                collection: statement.collection.name,
                pipeline,
            }),
            select_order,
            implicit_parameters,
        })
    }

    /// The runtime-set offset always wins over the statement's offset
    /// clause. Runtime values render as placeholders so the translation
    /// stays value-independent; their concrete values are reported through
    /// `implicit_parameters`, pinned to the placeholder position the stage
    /// occupies. `next_placeholder` tracks the document-order ordinal of the
    /// next placeholder the pipeline would emit.
    fn effective_offset(
        &self,
        statement_offset: Option<sql::Expression>,
        implicit_parameters: &mut Vec<ImplicitParameter>,
        next_placeholder: &mut usize,
    ) -> Result<Option<mql::Stage>> {
        if let Some(offset) = self.options.offset {
            let value = i64::try_from(offset).map_err(|_| Error::LimitOutOfRange(offset))?;
            implicit_parameters.push(ImplicitParameter {
                position: *next_placeholder,
                value: Bson::Int64(value),
            });
            *next_placeholder += 1;
            return Ok(Some(mql::Stage::Skip(mql::Expression::Placeholder)));
        }
        match statement_offset {
            None => Ok(None),
            Some(expr) => match Self::limit_argument(expr)? {
                // A literal zero offset emits no stage at all.
                LimitArg::Value(0) => Ok(None),
                LimitArg::Value(n) => Ok(Some(mql::Stage::Skip(mql::Expression::Literal(
                    mql::LiteralValue::Long(n),
                )))),
                LimitArg::Parameter => {
                    *next_placeholder += 1;
                    Ok(Some(mql::Stage::Skip(mql::Expression::Placeholder)))
                }
            },
        }
    }

    /// The runtime-set limit always wins over the statement's fetch clause.
    /// Only the "first N rows, no ties" fetch shapes are supported.
    fn effective_limit(
        &self,
        fetch: Option<sql::FetchClause>,
        implicit_parameters: &mut Vec<ImplicitParameter>,
        next_placeholder: &mut usize,
    ) -> Result<Option<mql::Stage>> {
        if let Some(limit) = self.options.limit {
            let value = i64::try_from(limit).map_err(|_| Error::LimitOutOfRange(limit))?;
            implicit_parameters.push(ImplicitParameter {
                position: *next_placeholder,
                value: Bson::Int64(value),
            });
            *next_placeholder += 1;
            return Ok(Some(mql::Stage::Limit(mql::Expression::Placeholder)));
        }
        match fetch {
            None => Ok(None),
            Some(clause) => {
                if clause.kind != sql::FetchClauseKind::RowsOnly {
                    return Err(Error::UnsupportedFetchClause(clause.kind.sql_name()));
                }
                match Self::limit_argument(clause.count)? {
                    LimitArg::Value(n) => Ok(Some(mql::Stage::Limit(mql::Expression::Literal(
                        mql::LiteralValue::Long(n),
                    )))),
                    LimitArg::Parameter => {
                        *next_placeholder += 1;
                        Ok(Some(mql::Stage::Limit(mql::Expression::Placeholder)))
                    }
                }
            }
        }
    }

    fn limit_argument(expr: sql::Expression) -> Result<LimitArg> {
        let value = match expr {
            sql::Expression::Literal(sql::LiteralValue::Integer(i)) => i as i64,
            sql::Expression::Literal(sql::LiteralValue::Long(l)) => l,
            sql::Expression::Parameter => return Ok(LimitArg::Parameter),
            other => return Err(Error::UnsupportedLimitExpression(other.kind_name())),
        };
        if value < 0 {
            return Err(Error::NegativeLimit(value));
        }
        Ok(LimitArg::Value(value))
    }

    fn translate_projection(
        projection: Vec<sql::SelectItem>,
    ) -> Result<(UniqueFieldMap<String, mql::ProjectItem>, Vec<String>)> {
        let mut items = UniqueFieldMap::new();
        let mut select_order = Vec::new();
        for select_item in projection {
            match select_item.expr {
                sql::Expression::Column(column) => {
                    let item = if select_item.alias == column.path {
                        mql::ProjectItem::Include
                    } else {
                        mql::ProjectItem::Assign(mql::Expression::FieldRef(column.path))
                    };
                    items.insert(select_item.alias.clone(), item)?;
                }
                other => return Err(Error::UnsupportedProjection(other.kind_name())),
            }
            select_order.push(select_item.alias);
        }
        Ok((items, select_order))
    }
}
