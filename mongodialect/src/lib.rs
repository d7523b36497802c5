//! A MongoDB dialect for relational ORM engines: translates the engine's
//! relational statement AST into MQL commands (aggregate pipelines and
//! insert/update/delete specifications) and provides a JDBC-shaped
//! connection/statement/result-set facade over the MongoDB driver.

pub mod jdbc;
// mql module: the target query-language AST we emit.
pub mod mql;
pub mod options;
pub mod plan_cache;
pub mod result;
// sql module: the relational AST the upstream engine supplies.
pub mod sql;
pub mod translator;
pub mod types;

use crate::{
    mql::placeholder_count,
    options::QueryOptions,
    translator::MqlTranslator,
};
use bson::Bson;
use std::collections::BTreeSet;

pub use result::Result;
pub use translator::ImplicitParameter;

/// Contains everything needed to execute (and cache) the MQL translation of
/// a relational statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub command: mql::Command,
    /// The parameterized command text, relaxed extended JSON. Placeholders
    /// appear as `{"$undefined": true}` in binding order.
    pub text: String,
    /// The number of caller-bindable parameters. The remaining placeholders
    /// belong to `implicit_parameters`.
    pub parameter_count: usize,
    /// Values for placeholders the translator introduced itself (runtime
    /// limit/offset), each pinned to the document-order position of its
    /// placeholder. A runtime `$skip` placeholder can sit between user
    /// placeholders, so position, not introduction order, decides binding.
    pub implicit_parameters: Vec<ImplicitParameter>,
    /// The collection names this statement touches, for cache invalidation
    /// and statement routing.
    pub affected_collections: BTreeSet<String>,
    /// Ordered result column labels; empty for mutations.
    pub select_order: Vec<String>,
}

impl Translation {
    fn from_parts(
        command: mql::Command,
        select_order: Vec<String>,
        implicit_parameters: Vec<ImplicitParameter>,
    ) -> Self {
        let rendered = command.render();
        let total_placeholders = placeholder_count(&rendered);
        let text = Bson::Document(rendered).into_relaxed_extjson().to_string();
        let affected_collections = BTreeSet::from([command.collection().to_string()]);
        Self {
            parameter_count: total_placeholders - implicit_parameters.len(),
            command,
            text,
            implicit_parameters,
            affected_collections,
            select_order,
        }
    }
}

/// Translates a select statement under the given runtime limit/offset
/// snapshot into an aggregate command.
pub fn translate_select(
    statement: sql::SelectStatement,
    options: QueryOptions,
) -> Result<Translation> {
    let translator = MqlTranslator::with_options(options);
    let select = translator.translate_select(statement)?;
    Ok(Translation::from_parts(
        select.command,
        select.select_order,
        select.implicit_parameters,
    ))
}

pub fn translate_insert(statement: sql::InsertStatement) -> Result<Translation> {
    let command = MqlTranslator::new().translate_insert(statement)?;
    Ok(Translation::from_parts(command, vec![], vec![]))
}

pub fn translate_update(statement: sql::UpdateStatement) -> Result<Translation> {
    let command = MqlTranslator::new().translate_update(statement)?;
    Ok(Translation::from_parts(command, vec![], vec![]))
}

pub fn translate_delete(statement: sql::DeleteStatement) -> Result<Translation> {
    let command = MqlTranslator::new().translate_delete(statement)?;
    Ok(Translation::from_parts(command, vec![], vec![]))
}

pub fn translate_model_update(statement: sql::ModelUpdate) -> Result<Translation> {
    let command = MqlTranslator::new().translate_model_update(statement)?;
    Ok(Translation::from_parts(command, vec![], vec![]))
}

pub fn translate_model_delete(statement: sql::ModelDelete) -> Result<Translation> {
    let command = MqlTranslator::new().translate_model_delete(statement)?;
    Ok(Translation::from_parts(command, vec![], vec![]))
}
