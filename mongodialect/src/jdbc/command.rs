//! Parsed representation of extended-JSON command text.
//!
//! Command text is a single extended-JSON document whose first key names the
//! operation (`aggregate`, `insert`, `update`, or `delete`). Parsing
//! validates the wire shape up front so prepare-time errors carry the
//! offending text; binding substitutes `{"$undefined": true}` placeholders
//! with values in document order.

use super::{Error, Result};
use crate::mql::placeholder_count;
use bson::{Bson, Document};

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    Aggregate {
        collection: String,
        pipeline: Vec<Document>,
    },
    Insert {
        collection: String,
        documents: Vec<Document>,
    },
    Update {
        collection: String,
        updates: Vec<UpdateSpec>,
    },
    Delete {
        collection: String,
        deletes: Vec<DeleteSpec>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    pub filter: Document,
    pub update: Document,
    pub multi: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSpec {
    pub filter: Document,
    pub multi: bool,
}

impl ParsedCommand {
    pub fn parse(text: &str) -> Result<ParsedCommand> {
        let syntax = |reason: String| Error::Syntax {
            reason,
            text: text.to_string(),
        };
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| syntax(e.to_string()))?;
        let value = Bson::try_from(json).map_err(|e| syntax(e.to_string()))?;
        let Bson::Document(doc) = value else {
            return Err(syntax("command must be a document".to_string()));
        };
        let Some((name, collection)) = doc.iter().next() else {
            return Err(syntax("command document is empty".to_string()));
        };
        let Bson::String(collection) = collection else {
            return Err(syntax(format!("'{name}' must name a collection")));
        };
        let collection = collection.clone();
        match name.as_str() {
            "aggregate" => {
                let pipeline = document_array(&doc, "pipeline", &syntax)?;
                Ok(ParsedCommand::Aggregate {
                    collection,
                    pipeline,
                })
            }
            "insert" => {
                let documents = document_array(&doc, "documents", &syntax)?;
                if documents.is_empty() {
                    return Err(syntax("'documents' must not be empty".to_string()));
                }
                Ok(ParsedCommand::Insert {
                    collection,
                    documents,
                })
            }
            "update" => {
                let mut updates = vec![];
                for spec in document_array(&doc, "updates", &syntax)? {
                    let filter = required_document(&spec, "q", &syntax)?;
                    let update = required_document(&spec, "u", &syntax)?;
                    let multi = match spec.get("multi") {
                        Some(Bson::Boolean(b)) => *b,
                        None => false,
                        Some(other) => {
                            return Err(syntax(format!(
                                "'multi' must be a boolean, got {}",
                                crate::types::bson_type_name(other)
                            )))
                        }
                    };
                    updates.push(UpdateSpec {
                        filter,
                        update,
                        multi,
                    });
                }
                if updates.is_empty() {
                    return Err(syntax("'updates' must not be empty".to_string()));
                }
                Ok(ParsedCommand::Update {
                    collection,
                    updates,
                })
            }
            "delete" => {
                let mut deletes = vec![];
                for spec in document_array(&doc, "deletes", &syntax)? {
                    let filter = required_document(&spec, "q", &syntax)?;
                    let multi = match spec.get("limit") {
                        Some(Bson::Int32(0)) | Some(Bson::Int64(0)) => true,
                        Some(Bson::Int32(1)) | Some(Bson::Int64(1)) => false,
                        None => true,
                        Some(_) => {
                            return Err(syntax("'limit' must be 0 or 1".to_string()));
                        }
                    };
                    deletes.push(DeleteSpec { filter, multi });
                }
                if deletes.is_empty() {
                    return Err(syntax("'deletes' must not be empty".to_string()));
                }
                Ok(ParsedCommand::Delete {
                    collection,
                    deletes,
                })
            }
            other => Err(syntax(format!("unknown command '{other}'"))),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ParsedCommand::Aggregate { .. } => "aggregate",
            ParsedCommand::Insert { .. } => "insert",
            ParsedCommand::Update { .. } => "update",
            ParsedCommand::Delete { .. } => "delete",
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            ParsedCommand::Aggregate { collection, .. }
            | ParsedCommand::Insert { collection, .. }
            | ParsedCommand::Update { collection, .. }
            | ParsedCommand::Delete { collection, .. } => collection,
        }
    }

    /// The number of placeholders in this command, counted in document
    /// order. For updates, each spec's filter precedes its update document.
    pub fn parameter_count(&self) -> usize {
        match self {
            ParsedCommand::Aggregate { pipeline, .. } => {
                pipeline.iter().map(placeholder_count).sum()
            }
            ParsedCommand::Insert { documents, .. } => {
                documents.iter().map(placeholder_count).sum()
            }
            ParsedCommand::Update { updates, .. } => updates
                .iter()
                .map(|u| placeholder_count(&u.filter) + placeholder_count(&u.update))
                .sum(),
            ParsedCommand::Delete { deletes, .. } => {
                deletes.iter().map(|d| placeholder_count(&d.filter)).sum()
            }
        }
    }

    /// Substitutes placeholders with `values`, positionally in document
    /// order. The caller supplies exactly `parameter_count()` values.
    pub fn bind(&self, values: &[Bson]) -> Result<ParsedCommand> {
        let mut binder = Binder {
            values: values.iter(),
            position: 0,
        };
        match self {
            ParsedCommand::Aggregate {
                collection,
                pipeline,
            } => Ok(ParsedCommand::Aggregate {
                collection: collection.clone(),
                pipeline: pipeline
                    .iter()
                    .map(|stage| binder.substitute_document(stage))
                    .collect::<Result<_>>()?,
            }),
            ParsedCommand::Insert {
                collection,
                documents,
            } => Ok(ParsedCommand::Insert {
                collection: collection.clone(),
                documents: documents
                    .iter()
                    .map(|d| binder.substitute_document(d))
                    .collect::<Result<_>>()?,
            }),
            ParsedCommand::Update {
                collection,
                updates,
            } => Ok(ParsedCommand::Update {
                collection: collection.clone(),
                updates: updates
                    .iter()
                    .map(|u| {
                        Ok(UpdateSpec {
                            filter: binder.substitute_document(&u.filter)?,
                            update: binder.substitute_document(&u.update)?,
                            multi: u.multi,
                        })
                    })
                    .collect::<Result<_>>()?,
            }),
            ParsedCommand::Delete {
                collection,
                deletes,
            } => Ok(ParsedCommand::Delete {
                collection: collection.clone(),
                deletes: deletes
                    .iter()
                    .map(|d| {
                        Ok(DeleteSpec {
                            filter: binder.substitute_document(&d.filter)?,
                            multi: d.multi,
                        })
                    })
                    .collect::<Result<_>>()?,
            }),
        }
    }
}

struct Binder<'a> {
    values: std::slice::Iter<'a, Bson>,
    position: usize,
}

impl Binder<'_> {
    fn substitute_document(&mut self, doc: &Document) -> Result<Document> {
        let mut out = Document::new();
        for (key, value) in doc.iter() {
            out.insert(key.clone(), self.substitute(value)?);
        }
        Ok(out)
    }

    fn substitute(&mut self, value: &Bson) -> Result<Bson> {
        match value {
            Bson::Undefined => {
                self.position += 1;
                self.values
                    .next()
                    .cloned()
                    .ok_or(Error::UnboundParameter(self.position))
            }
            Bson::Document(doc) => Ok(Bson::Document(self.substitute_document(doc)?)),
            Bson::Array(items) => Ok(Bson::Array(
                items
                    .iter()
                    .map(|item| self.substitute(item))
                    .collect::<Result<_>>()?,
            )),
            other => Ok(other.clone()),
        }
    }
}

fn document_array(
    doc: &Document,
    key: &str,
    syntax: &dyn Fn(String) -> Error,
) -> Result<Vec<Document>> {
    let Some(Bson::Array(items)) = doc.get(key) else {
        return Err(syntax(format!("'{key}' must be an array of documents")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d.clone()),
            _ => Err(syntax(format!("'{key}' must contain only documents"))),
        })
        .collect()
}

fn required_document(
    doc: &Document,
    key: &str,
    syntax: &dyn Fn(String) -> Error,
) -> Result<Document> {
    match doc.get(key) {
        Some(Bson::Document(d)) => Ok(d.clone()),
        _ => Err(syntax(format!("'{key}' must be a document"))),
    }
}
