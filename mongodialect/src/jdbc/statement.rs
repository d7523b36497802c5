//! Prepared and plain statement facades.
//!
//! A prepared statement parses its command text once, binds positional
//! parameters by substituting placeholders in document order, and executes
//! through the owning connection's session when autocommit is off. Implicit
//! parameters (runtime limit/offset baked in by the translator) are pre-bound
//! at construction into the exact placeholder positions the translator
//! recorded; callers address only the remaining slots, 1-based, in document
//! order.

use super::command::{DeleteSpec, ParsedCommand, UpdateSpec};
use super::connection::ConnectionState;
use super::result_set::{derive_fields, MongoResultSet};
use super::{map_driver_error, Error, Result, EXECUTE_FAILED};
use crate::ImplicitParameter;
use bson::{oid::ObjectId, spec::BinarySubtype, Binary, Bson, Document};
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

pub struct MongoPreparedStatement {
    state: Rc<RefCell<ConnectionState>>,
    command: ParsedCommand,
    select_order: Vec<String>,
    /// Placeholder slots the caller binds, in document order. Slots taken by
    /// implicit parameters are excluded.
    user_slots: Vec<usize>,
    parameters: Vec<Option<Bson>>,
    batch: Vec<ParsedCommand>,
    result_set: Option<MongoResultSet>,
    closed: bool,
}

impl MongoPreparedStatement {
    pub(crate) fn new(
        state: Rc<RefCell<ConnectionState>>,
        text: &str,
        implicit_parameters: Vec<ImplicitParameter>,
        select_order: Vec<String>,
    ) -> Result<Self> {
        let command = ParsedCommand::parse(text)?;
        let total = command.parameter_count();
        let mut parameters: Vec<Option<Bson>> = vec![None; total];
        for parameter in implicit_parameters {
            let slot = parameters.get_mut(parameter.position).ok_or_else(|| {
                Error::Syntax {
                    reason: format!(
                        "implicit parameter position {} out of range for {total} placeholders",
                        parameter.position
                    ),
                    text: text.to_string(),
                }
            })?;
            if slot.is_some() {
                return Err(Error::Syntax {
                    reason: format!(
                        "implicit parameter position {} bound twice",
                        parameter.position
                    ),
                    text: text.to_string(),
                });
            }
            *slot = Some(parameter.value);
        }
        let user_slots = parameters
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(position, _)| position)
            .collect();
        Ok(Self {
            state,
            command,
            select_order,
            user_slots,
            parameters,
            batch: vec![],
            result_set: None,
            closed: false,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed("statement"));
        }
        self.state.borrow().check_open()
    }

    /// The number of caller-bindable parameters.
    pub fn parameter_count(&self) -> usize {
        self.user_slots.len()
    }

    pub fn set_parameter(&mut self, index: usize, value: Bson) -> Result<()> {
        self.check_open()?;
        let slot = match index.checked_sub(1).and_then(|i| self.user_slots.get(i)) {
            Some(slot) => *slot,
            None => {
                return Err(Error::ParameterIndexOutOfRange {
                    index,
                    count: self.user_slots.len(),
                })
            }
        };
        self.parameters[slot] = Some(value);
        Ok(())
    }

    pub fn set_null(&mut self, index: usize) -> Result<()> {
        self.set_parameter(index, Bson::Null)
    }

    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.set_parameter(index, Bson::Boolean(value))
    }

    pub fn set_i32(&mut self, index: usize, value: i32) -> Result<()> {
        self.set_parameter(index, Bson::Int32(value))
    }

    pub fn set_i64(&mut self, index: usize, value: i64) -> Result<()> {
        self.set_parameter(index, Bson::Int64(value))
    }

    pub fn set_f64(&mut self, index: usize, value: f64) -> Result<()> {
        self.set_parameter(index, Bson::Double(value))
    }

    pub fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        self.set_parameter(index, Bson::String(value.to_string()))
    }

    pub fn set_object_id(&mut self, index: usize, value: ObjectId) -> Result<()> {
        self.set_parameter(index, Bson::ObjectId(value))
    }

    pub fn set_bytes(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.set_parameter(
            index,
            Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: value.to_vec(),
            }),
        )
    }

    pub fn set_datetime(&mut self, index: usize, value: bson::DateTime) -> Result<()> {
        self.set_parameter(index, Bson::DateTime(value))
    }

    pub fn set_decimal128(&mut self, index: usize, value: bson::Decimal128) -> Result<()> {
        self.set_parameter(index, Bson::Decimal128(value))
    }

    pub fn clear_parameters(&mut self) -> Result<()> {
        self.check_open()?;
        for slot in &self.user_slots {
            self.parameters[*slot] = None;
        }
        Ok(())
    }

    pub(crate) fn bound_command(&self) -> Result<ParsedCommand> {
        let mut values = Vec::with_capacity(self.parameters.len());
        for (slot, parameter) in self.parameters.iter().enumerate() {
            match parameter {
                Some(value) => values.push(value.clone()),
                None => {
                    // only user slots can be unbound; report the 1-based
                    // caller index
                    let index = self
                        .user_slots
                        .iter()
                        .position(|s| *s == slot)
                        .map_or(slot + 1, |i| i + 1);
                    return Err(Error::UnboundParameter(index));
                }
            }
        }
        self.command.bind(&values)
    }

    /// Executes an aggregate command. Any result set from a previous
    /// execution on this statement is closed first, even when this execution
    /// fails.
    pub fn execute_query(&mut self) -> Result<&mut MongoResultSet> {
        self.check_open()?;
        self.result_set = None;
        let command = self.bound_command()?;
        let ParsedCommand::Aggregate {
            collection,
            pipeline,
        } = command
        else {
            return Err(Error::WrongCommandKind {
                expected: "aggregate",
                got: self.command.kind_name(),
            });
        };
        let fields = if self.select_order.is_empty() {
            derive_fields(&pipeline)
        } else {
            self.select_order.clone()
        };
        debug!("executing aggregate on collection {collection}");
        let result_set = run_aggregate(&self.state, &collection, pipeline, fields)?;
        self.result_set = Some(result_set);
        match self.result_set.as_mut() {
            Some(result_set) => Ok(result_set),
            None => unreachable!("result set was just stored"),
        }
    }

    /// Executes a mutation and returns the affected-row count: documents
    /// inserted, matched for updates, deleted for deletes.
    pub fn execute_update(&mut self) -> Result<i64> {
        self.check_open()?;
        self.result_set = None;
        let command = self.bound_command()?;
        debug!(
            "executing {} on collection {}",
            command.kind_name(),
            command.collection()
        );
        execute_mutation(&self.state, command)
    }

    /// Snapshots the current bindings as one batch entry. Aggregates cannot
    /// be batched.
    pub fn add_batch(&mut self) -> Result<()> {
        self.check_open()?;
        let command = self.bound_command()?;
        if matches!(command, ParsedCommand::Aggregate { .. }) {
            return Err(Error::WrongCommandKind {
                expected: "insert, update, or delete",
                got: "aggregate",
            });
        }
        self.batch.push(command);
        Ok(())
    }

    pub fn clear_batch(&mut self) -> Result<()> {
        self.check_open()?;
        self.batch.clear();
        Ok(())
    }

    /// Executes the accumulated batch in order. Consecutive inserts into the
    /// same collection are coalesced into a single ordered bulk insert, which
    /// the driver splits at its own write-batch granularity. Entry counts
    /// stay exact either way: an ordered insert affects precisely the
    /// documents each entry contributed. On failure the error carries
    /// per-entry counts: real counts before the failing entry,
    /// `EXECUTE_FAILED` from there onward.
    pub fn execute_batch(&mut self) -> Result<Vec<i64>> {
        self.check_open()?;
        self.result_set = None;
        let batch = std::mem::take(&mut self.batch);
        let total = batch.len();
        let mut counts: Vec<i64> = Vec::with_capacity(total);
        let mut index = 0;
        while index < batch.len() {
            match &batch[index] {
                ParsedCommand::Insert { collection, .. } => {
                    let run_end = insert_run_end(&batch, index, collection);
                    let sizes: Vec<usize> = batch[index..run_end]
                        .iter()
                        .map(entry_document_count)
                        .collect();
                    let documents: Vec<Document> = batch[index..run_end]
                        .iter()
                        .flat_map(entry_documents)
                        .collect();
                    debug!(
                        "executing batched insert of {} documents on collection {collection}",
                        documents.len()
                    );
                    match run_insert(&self.state, collection, documents) {
                        Ok(_) => counts.extend(sizes.iter().map(|size| *size as i64)),
                        Err(error) => {
                            let failed_document = insert_failure_index(&error).unwrap_or(0);
                            let (run_counts, failed_offset) =
                                insert_failure_split(&sizes, failed_document);
                            counts.extend(run_counts);
                            return Err(Error::Batch {
                                update_counts: pad_failed(counts, total),
                                failed_operation: index + failed_offset,
                                source: Box::new(error),
                            });
                        }
                    }
                    index = run_end;
                }
                entry => {
                    match execute_mutation(&self.state, entry.clone()) {
                        Ok(count) => counts.push(count),
                        Err(error) => {
                            return Err(Error::Batch {
                                update_counts: pad_failed(counts, total),
                                failed_operation: index,
                                source: Box::new(error),
                            })
                        }
                    }
                    index += 1;
                }
            }
        }
        Ok(counts)
    }

    /// Cancellation is a best-effort no-op; the sync driver offers no
    /// in-flight interruption.
    pub fn cancel(&self) -> Result<()> {
        self.check_open()
    }

    #[cfg(test)]
    pub(crate) fn attach_result_set(&mut self, result_set: MongoResultSet) {
        self.result_set = Some(result_set);
    }

    #[cfg(test)]
    pub(crate) fn has_open_result_set(&self) -> bool {
        self.result_set.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Idempotent; drops the open result set and any pending batch.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.result_set = None;
        self.batch.clear();
        Ok(())
    }
}

/// A plain statement for parameterless command text.
pub struct MongoStatement {
    state: Rc<RefCell<ConnectionState>>,
    result_set: Option<MongoResultSet>,
    closed: bool,
}

impl MongoStatement {
    pub(crate) fn new(state: Rc<RefCell<ConnectionState>>) -> Self {
        Self {
            state,
            result_set: None,
            closed: false,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed("statement"));
        }
        self.state.borrow().check_open()
    }

    pub fn execute_query(&mut self, text: &str) -> Result<&mut MongoResultSet> {
        self.check_open()?;
        self.result_set = None;
        let command = parse_unparameterized(text)?;
        let ParsedCommand::Aggregate {
            collection,
            pipeline,
        } = command
        else {
            return Err(Error::WrongCommandKind {
                expected: "aggregate",
                got: "a mutation",
            });
        };
        let fields = derive_fields(&pipeline);
        debug!("executing aggregate on collection {collection}");
        let result_set = run_aggregate(&self.state, &collection, pipeline, fields)?;
        self.result_set = Some(result_set);
        match self.result_set.as_mut() {
            Some(result_set) => Ok(result_set),
            None => unreachable!("result set was just stored"),
        }
    }

    pub fn execute_update(&mut self, text: &str) -> Result<i64> {
        self.check_open()?;
        self.result_set = None;
        let command = parse_unparameterized(text)?;
        debug!(
            "executing {} on collection {}",
            command.kind_name(),
            command.collection()
        );
        execute_mutation(&self.state, command)
    }

    pub fn cancel(&self) -> Result<()> {
        self.check_open()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.result_set = None;
        Ok(())
    }
}

fn parse_unparameterized(text: &str) -> Result<ParsedCommand> {
    let command = ParsedCommand::parse(text)?;
    match command.parameter_count() {
        0 => Ok(command),
        _ => Err(Error::UnboundParameter(1)),
    }
}

fn run_aggregate(
    state: &Rc<RefCell<ConnectionState>>,
    collection: &str,
    pipeline: Vec<Document>,
    fields: Vec<String>,
) -> Result<MongoResultSet> {
    let mut st = state.borrow_mut();
    st.check_open()?;
    let coll = st.database.collection::<Document>(collection);
    if st.auto_commit {
        let cursor = coll.aggregate(pipeline).run().map_err(map_driver_error)?;
        Ok(MongoResultSet::from_plain(cursor, fields))
    } else {
        st.ensure_transaction()?;
        match st.session.as_mut() {
            Some(session) => {
                let cursor = coll
                    .aggregate(pipeline)
                    .session(&mut *session)
                    .run()
                    .map_err(map_driver_error)?;
                drop(st);
                Ok(MongoResultSet::from_session(
                    cursor,
                    Rc::clone(state),
                    fields,
                ))
            }
            None => unreachable!("an active transaction always has a session"),
        }
    }
}

fn execute_mutation(state: &Rc<RefCell<ConnectionState>>, command: ParsedCommand) -> Result<i64> {
    match command {
        ParsedCommand::Aggregate { .. } => Err(Error::WrongCommandKind {
            expected: "insert, update, or delete",
            got: "aggregate",
        }),
        ParsedCommand::Insert {
            collection,
            documents,
        } => run_insert(state, &collection, documents),
        ParsedCommand::Update {
            collection,
            updates,
        } => run_updates(state, &collection, updates),
        ParsedCommand::Delete {
            collection,
            deletes,
        } => run_deletes(state, &collection, deletes),
    }
}

fn run_insert(
    state: &Rc<RefCell<ConnectionState>>,
    collection: &str,
    documents: Vec<Document>,
) -> Result<i64> {
    let count = documents.len() as i64;
    let mut st = state.borrow_mut();
    st.check_open()?;
    let coll = st.database.collection::<Document>(collection);
    if st.auto_commit {
        coll.insert_many(documents).run().map_err(map_driver_error)?;
    } else {
        st.ensure_transaction()?;
        match st.session.as_mut() {
            Some(session) => {
                coll.insert_many(documents)
                    .session(&mut *session)
                    .run()
                    .map_err(map_driver_error)?;
            }
            None => unreachable!("an active transaction always has a session"),
        }
    }
    Ok(count)
}

fn run_updates(
    state: &Rc<RefCell<ConnectionState>>,
    collection: &str,
    updates: Vec<UpdateSpec>,
) -> Result<i64> {
    let mut st = state.borrow_mut();
    st.check_open()?;
    let coll = st.database.collection::<Document>(collection);
    if !st.auto_commit {
        st.ensure_transaction()?;
    }
    let mut affected = 0i64;
    for spec in updates {
        let result = if st.auto_commit {
            if spec.multi {
                coll.update_many(spec.filter, spec.update).run()
            } else {
                coll.update_one(spec.filter, spec.update).run()
            }
        } else {
            match st.session.as_mut() {
                Some(session) => {
                    if spec.multi {
                        coll.update_many(spec.filter, spec.update)
                            .session(&mut *session)
                            .run()
                    } else {
                        coll.update_one(spec.filter, spec.update)
                            .session(&mut *session)
                            .run()
                    }
                }
                None => unreachable!("an active transaction always has a session"),
            }
        }
        .map_err(map_driver_error)?;
        affected += result.matched_count as i64;
    }
    Ok(affected)
}

fn run_deletes(
    state: &Rc<RefCell<ConnectionState>>,
    collection: &str,
    deletes: Vec<DeleteSpec>,
) -> Result<i64> {
    let mut st = state.borrow_mut();
    st.check_open()?;
    let coll = st.database.collection::<Document>(collection);
    if !st.auto_commit {
        st.ensure_transaction()?;
    }
    let mut affected = 0i64;
    for spec in deletes {
        let result = if st.auto_commit {
            if spec.multi {
                coll.delete_many(spec.filter).run()
            } else {
                coll.delete_one(spec.filter).run()
            }
        } else {
            match st.session.as_mut() {
                Some(session) => {
                    if spec.multi {
                        coll.delete_many(spec.filter).session(&mut *session).run()
                    } else {
                        coll.delete_one(spec.filter).session(&mut *session).run()
                    }
                }
                None => unreachable!("an active transaction always has a session"),
            }
        }
        .map_err(map_driver_error)?;
        affected += result.deleted_count as i64;
    }
    Ok(affected)
}

pub(crate) fn insert_run_end(batch: &[ParsedCommand], start: usize, collection: &str) -> usize {
    let mut end = start + 1;
    while end < batch.len() {
        match &batch[end] {
            ParsedCommand::Insert { collection: c, .. } if c == collection => end += 1,
            _ => break,
        }
    }
    end
}

fn entry_document_count(entry: &ParsedCommand) -> usize {
    match entry {
        ParsedCommand::Insert { documents, .. } => documents.len(),
        _ => unreachable!("insert run contains only inserts"),
    }
}

fn entry_documents(entry: &ParsedCommand) -> Vec<Document> {
    match entry {
        ParsedCommand::Insert { documents, .. } => documents.clone(),
        _ => unreachable!("insert run contains only inserts"),
    }
}

fn insert_failure_index(error: &Error) -> Option<usize> {
    let Error::Driver { source, .. } = error else {
        return None;
    };
    match &*source.kind {
        mongodb::error::ErrorKind::InsertMany(e) => e
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|w| w.index),
        _ => None,
    }
}

/// Splits a coalesced insert run at the document where the ordered write
/// stopped: per-entry counts for the entries that completed before it, and
/// the offset of the entry containing that document. A failure index past
/// the run attributes to the last entry.
pub(crate) fn insert_failure_split(sizes: &[usize], failed_document: usize) -> (Vec<i64>, usize) {
    let mut seen = 0;
    for (offset, size) in sizes.iter().enumerate() {
        if failed_document < seen + size {
            return (sizes[..offset].iter().map(|s| *s as i64).collect(), offset);
        }
        seen += size;
    }
    let last = sizes.len().saturating_sub(1);
    (sizes[..last].iter().map(|s| *s as i64).collect(), last)
}

/// Pads a prefix of real update counts out to the full batch length with
/// `EXECUTE_FAILED`.
pub(crate) fn pad_failed(mut counts: Vec<i64>, total: usize) -> Vec<i64> {
    counts.resize(total, EXECUTE_FAILED);
    counts
}
