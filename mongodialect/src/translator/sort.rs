use crate::{
    mql,
    sql,
    translator::{Error, MqlTranslator, Result, MAX_SORT_KEYS},
};
use std::collections::BTreeSet;

impl MqlTranslator {
    /// Translates an order-by list into `$sort` specifications. Each sort
    /// key must reduce to a single field path: a column reference, a
    /// select-list alias, an ordinal position, or a tuple of those
    /// (flattened left-to-right). Sort-key order in the output exactly
    /// matches source clause order.
    pub(crate) fn translate_order_by(
        &self,
        items: Vec<sql::SortItem>,
        projection: &[sql::SelectItem],
    ) -> Result<Vec<mql::SortSpec>> {
        let mut specs = Vec::new();
        let mut seen = BTreeSet::new();
        for item in items {
            if let Some(precedence) = item.null_precedence {
                return Err(Error::UnsupportedNullPrecedence(precedence.sql_name()));
            }
            if item.case_insensitive {
                return Err(Error::UnsupportedCaseInsensitiveSort);
            }
            let direction = match item.direction {
                sql::SortDirection::Asc => mql::SortDirection::Asc,
                sql::SortDirection::Desc => mql::SortDirection::Desc,
            };
            self.collect_sort_fields(item.expr, projection, direction, &mut specs, &mut seen)?;
        }
        if specs.len() > MAX_SORT_KEYS {
            return Err(Error::TooManySortKeys(specs.len()));
        }
        Ok(specs)
    }

    fn collect_sort_fields(
        &self,
        expr: sql::Expression,
        projection: &[sql::SelectItem],
        direction: mql::SortDirection,
        specs: &mut Vec<mql::SortSpec>,
        seen: &mut BTreeSet<String>,
    ) -> Result<()> {
        match expr {
            sql::Expression::Column(column) => {
                let field = Self::resolve_sort_alias(column, projection)?;
                Self::push_sort_field(field, direction, specs, seen)
            }
            sql::Expression::Ordinal(ordinal) => {
                let item = if ordinal >= 1 {
                    projection.get(ordinal - 1)
                } else {
                    None
                };
                let item = item.ok_or(Error::SortOrdinalOutOfRange {
                    ordinal,
                    count: projection.len(),
                })?;
                match &item.expr {
                    sql::Expression::Column(column) => {
                        Self::push_sort_field(column.path.clone(), direction, specs, seen)
                    }
                    other => Err(Error::UnsupportedSortKey(other.kind_name())),
                }
            }
            sql::Expression::Tuple(members) => {
                for member in members {
                    self.collect_sort_fields(member, projection, direction, specs, seen)?;
                }
                Ok(())
            }
            other => Err(Error::UnsupportedSortKey(other.kind_name())),
        }
    }

    /// A sort key that names a select-list alias sorts by the aliased
    /// column. Anything else sorts by its own field path.
    fn resolve_sort_alias(
        column: sql::ColumnReference,
        projection: &[sql::SelectItem],
    ) -> Result<String> {
        match projection.iter().find(|item| item.alias == column.path) {
            Some(item) => match &item.expr {
                sql::Expression::Column(aliased) => Ok(aliased.path.clone()),
                other => Err(Error::UnsupportedSortKey(other.kind_name())),
            },
            None => Ok(column.path),
        }
    }

    fn push_sort_field(
        field: String,
        direction: mql::SortDirection,
        specs: &mut Vec<mql::SortSpec>,
        seen: &mut BTreeSet<String>,
    ) -> Result<()> {
        if !seen.insert(field.clone()) {
            return Err(Error::DuplicateSortKey(field));
        }
        specs.push(mql::SortSpec { field, direction });
        Ok(())
    }
}
