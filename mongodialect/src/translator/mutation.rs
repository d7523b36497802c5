use crate::{
    mql,
    sql,
    translator::{Error, MqlTranslator, Result},
};
use mongodialect_datastructures::UniqueFieldMap;

impl MqlTranslator {
    pub fn translate_insert(&self, statement: sql::InsertStatement) -> Result<mql::Command> {
        for column in &statement.columns {
            Self::validate_document_field(column)?;
        }
        let mut documents = Vec::with_capacity(statement.rows.len());
        for row in statement.rows {
            if row.len() != statement.columns.len() {
                return Err(Error::ColumnCountMismatch {
                    expected: statement.columns.len(),
                    got: row.len(),
                });
            }
            let mut document = UniqueFieldMap::new();
            for (column, value) in statement.columns.iter().zip(row) {
                document.insert(column.clone(), self.translate_mutation_value(value)?)?;
            }
            documents.push(document);
        }
        Ok(mql::Command::Insert(mql::InsertCommand {
            collection: statement.collection.name,
            documents,
        }))
    }

    /// Bulk update: matches by the translated predicate (or everything when
    /// there is none) and applies a `$set` of the assignments.
    pub fn translate_update(&self, statement: sql::UpdateStatement) -> Result<mql::Command> {
        let filter = statement
            .predicate
            .map(|p| self.translate_filter(p))
            .transpose()?;
        let set = self.translate_assignments(statement.assignments)?;
        Ok(mql::Command::Update(mql::UpdateCommand {
            collection: statement.collection.name,
            filter,
            set,
            multi: true,
        }))
    }

    pub fn translate_delete(&self, statement: sql::DeleteStatement) -> Result<mql::Command> {
        let filter = statement
            .predicate
            .map(|p| self.translate_filter(p))
            .transpose()?;
        Ok(mql::Command::Delete(mql::DeleteCommand {
            collection: statement.collection.name,
            filter,
            multi: true,
        }))
    }

    /// Single-row, key-restricted update produced by the engine for entity
    /// persistence. Key values are typically parameters so the same
    /// translation can be JDBC-batched.
    pub fn translate_model_update(&self, statement: sql::ModelUpdate) -> Result<mql::Command> {
        let filter = self.translate_key_restrictions(statement.key_restrictions)?;
        let set = self.translate_assignments(statement.assignments)?;
        Ok(mql::Command::Update(mql::UpdateCommand {
            collection: statement.collection.name,
            filter,
            set,
            multi: false,
        }))
    }

    pub fn translate_model_delete(&self, statement: sql::ModelDelete) -> Result<mql::Command> {
        let filter = self.translate_key_restrictions(statement.key_restrictions)?;
        Ok(mql::Command::Delete(mql::DeleteCommand {
            collection: statement.collection.name,
            filter,
            multi: false,
        }))
    }

    fn translate_key_restrictions(
        &self,
        restrictions: Vec<sql::ColumnRestriction>,
    ) -> Result<Option<mql::Filter>> {
        let mut filters = restrictions
            .into_iter()
            .map(|r| {
                Ok(mql::Filter::Comparison(mql::ComparisonFilter {
                    field: r.column.path,
                    op: mql::ComparisonOp::Eq,
                    value: self.translate_mutation_value(r.value)?,
                }))
            })
            .collect::<Result<Vec<mql::Filter>>>()?;
        Ok(match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(mql::Filter::Logical(mql::LogicalFilter {
                op: mql::LogicalOp::And,
                filters,
            })),
        })
    }

    fn translate_assignments(
        &self,
        assignments: Vec<sql::Assignment>,
    ) -> Result<UniqueFieldMap<String, mql::Expression>> {
        let mut set = UniqueFieldMap::new();
        for assignment in assignments {
            Self::validate_update_path(&assignment.column)?;
            set.insert(
                assignment.column,
                self.translate_mutation_value(assignment.value)?,
            )?;
        }
        Ok(set)
    }

    fn translate_mutation_value(&self, expr: sql::Expression) -> Result<mql::Expression> {
        match expr {
            sql::Expression::Literal(lit) => {
                Ok(mql::Expression::Literal(Self::translate_literal(lit)))
            }
            sql::Expression::Parameter => Ok(mql::Expression::Placeholder),
            other => Err(Error::UnsupportedMutationValue(other.kind_name())),
        }
    }

    fn validate_document_field(name: &str) -> Result<()> {
        if name.is_empty() || name.contains('.') || name.starts_with('$') {
            return Err(Error::InvalidDocumentField(name.to_string()));
        }
        Ok(())
    }

    /// `$set` paths may be dotted (they address fields of embedded
    /// documents) but may not be empty or operator-like.
    fn validate_update_path(path: &str) -> Result<()> {
        if path.is_empty() || path.starts_with('$') {
            return Err(Error::InvalidUpdatePath(path.to_string()));
        }
        Ok(())
    }
}
