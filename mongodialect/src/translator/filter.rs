use crate::{
    mql,
    sql,
    translator::{Error, MqlTranslator, Result},
};

impl MqlTranslator {
    /// Translates a where-clause boolean expression into a query-language
    /// filter. Only field-path comparisons, junctions, negations, null
    /// tests, and boolean field references are supported; everything else
    /// is rejected with a typed error naming the construct.
    pub(crate) fn translate_filter(&self, expr: sql::Expression) -> Result<mql::Filter> {
        match expr {
            sql::Expression::Comparison(c) => self.translate_comparison(c),
            sql::Expression::Junction(j) => self.translate_junction(j),
            sql::Expression::Negation(inner) => {
                Ok(self.translate_filter(*inner)?.negated())
            }
            sql::Expression::IsNull(n) => self.translate_null_test(n),
            // A bare boolean column used as a predicate.
            sql::Expression::Column(c) => Ok(mql::Filter::Comparison(mql::ComparisonFilter {
                field: c.path,
                op: mql::ComparisonOp::Eq,
                value: mql::Expression::Literal(mql::LiteralValue::Boolean(true)),
            })),
            other => Err(Error::UnsupportedPredicateExpression(other.kind_name())),
        }
    }

    fn translate_junction(&self, junction: sql::Junction) -> Result<mql::Filter> {
        if junction.members.is_empty() {
            return Err(Error::EmptyJunction);
        }
        let op = match junction.op {
            sql::JunctionOp::And => mql::LogicalOp::And,
            sql::JunctionOp::Or => mql::LogicalOp::Or,
        };
        let filters = junction
            .members
            .into_iter()
            .map(|m| self.translate_filter(m))
            .collect::<Result<Vec<mql::Filter>>>()?;
        Ok(mql::Filter::Logical(mql::LogicalFilter { op, filters }))
    }

    fn translate_comparison(&self, comparison: sql::Comparison) -> Result<mql::Filter> {
        let op = Self::translate_comparison_op(comparison.op);
        // One side must be the field path. A column on the right flips the
        // operator so the field is always the filter key.
        let (column, value_expr, op) = match (*comparison.lhs, *comparison.rhs) {
            (sql::Expression::Column(col), rhs) => (col, rhs, op),
            (lhs, sql::Expression::Column(col)) => (col, lhs, Self::flip_comparison_op(op)),
            (lhs, _) => return Err(Error::UnsupportedPredicateExpression(lhs.kind_name())),
        };
        let value = self.translate_operand(value_expr)?;

        let comparison = mql::Filter::Comparison(mql::ComparisonFilter {
            field: column.path.clone(),
            op,
            value: value.clone(),
        });

        // Standard SQL three-valued logic: `field <> value` is never true
        // when the field is null, so an inequality over a nullable column
        // carries a not-null guard. Comparisons against a literal null are
        // left alone, as are non-nullable columns.
        let needs_null_guard = op == mql::ComparisonOp::Ne
            && column.nullable
            && value != mql::Expression::Literal(mql::LiteralValue::Null);
        if needs_null_guard {
            Ok(mql::Filter::Logical(mql::LogicalFilter {
                op: mql::LogicalOp::And,
                filters: vec![
                    comparison,
                    mql::Filter::Comparison(mql::ComparisonFilter {
                        field: column.path,
                        op: mql::ComparisonOp::Ne,
                        value: mql::Expression::Literal(mql::LiteralValue::Null),
                    }),
                ],
            }))
        } else {
            Ok(comparison)
        }
    }

    fn translate_null_test(&self, null_test: sql::IsNull) -> Result<mql::Filter> {
        let column = match *null_test.expr {
            sql::Expression::Column(col) => col,
            other => return Err(Error::UnsupportedPredicateExpression(other.kind_name())),
        };
        let op = if null_test.negated {
            mql::ComparisonOp::Ne
        } else {
            mql::ComparisonOp::Eq
        };
        Ok(mql::Filter::Comparison(mql::ComparisonFilter {
            field: column.path,
            op,
            value: mql::Expression::Literal(mql::LiteralValue::Null),
        }))
    }

    /// Translates a value-position expression (a comparison operand, an
    /// insert value, an assignment value).
    pub(crate) fn translate_operand(&self, expr: sql::Expression) -> Result<mql::Expression> {
        match expr {
            sql::Expression::Literal(lit) => {
                Ok(mql::Expression::Literal(Self::translate_literal(lit)))
            }
            sql::Expression::Parameter => Ok(mql::Expression::Placeholder),
            other => Err(Error::UnsupportedComparisonValue(other.kind_name())),
        }
    }

    pub(crate) fn translate_literal(literal: sql::LiteralValue) -> mql::LiteralValue {
        match literal {
            sql::LiteralValue::Null => mql::LiteralValue::Null,
            sql::LiteralValue::Boolean(b) => mql::LiteralValue::Boolean(b),
            sql::LiteralValue::Integer(i) => mql::LiteralValue::Integer(i),
            sql::LiteralValue::Long(l) => mql::LiteralValue::Long(l),
            sql::LiteralValue::Double(d) => mql::LiteralValue::Double(d),
            sql::LiteralValue::String(s) => mql::LiteralValue::String(s),
        }
    }

    fn translate_comparison_op(op: sql::ComparisonOp) -> mql::ComparisonOp {
        match op {
            sql::ComparisonOp::Eq => mql::ComparisonOp::Eq,
            sql::ComparisonOp::Ne => mql::ComparisonOp::Ne,
            sql::ComparisonOp::Lt => mql::ComparisonOp::Lt,
            sql::ComparisonOp::Lte => mql::ComparisonOp::Lte,
            sql::ComparisonOp::Gt => mql::ComparisonOp::Gt,
            sql::ComparisonOp::Gte => mql::ComparisonOp::Gte,
        }
    }

    fn flip_comparison_op(op: mql::ComparisonOp) -> mql::ComparisonOp {
        use mql::ComparisonOp::*;
        match op {
            Eq => Eq,
            Ne => Ne,
            Lt => Gt,
            Lte => Gte,
            Gt => Lt,
            Gte => Lte,
        }
    }
}
