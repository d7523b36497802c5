//! Forward-only result set over an aggregation cursor.
//!
//! Column indexes are 1-based over the field labels: the translation's
//! select order when prepared from a [`crate::Translation`], otherwise the
//! keys of the pipeline's final `$project` stage. A projected field missing
//! from the current row reads as SQL NULL.

use super::connection::ConnectionState;
use super::{map_driver_error, Error, Result};
use crate::types::{self, JdbcType};
use bson::{oid::ObjectId, Bson, Document};
use log::trace;
use std::cell::RefCell;
use std::rc::Rc;

enum CursorImpl {
    Plain(mongodb::sync::Cursor<Document>),
    Session(
        mongodb::sync::SessionCursor<Document>,
        Rc<RefCell<ConnectionState>>,
    ),
    #[cfg(test)]
    Fixed(std::vec::IntoIter<Document>),
}

pub struct MongoResultSet {
    cursor: Option<CursorImpl>,
    fields: Vec<String>,
    row: Option<Document>,
    was_null: bool,
    closed: bool,
}

impl MongoResultSet {
    pub(crate) fn from_plain(cursor: mongodb::sync::Cursor<Document>, fields: Vec<String>) -> Self {
        Self::with_cursor(CursorImpl::Plain(cursor), fields)
    }

    pub(crate) fn from_session(
        cursor: mongodb::sync::SessionCursor<Document>,
        state: Rc<RefCell<ConnectionState>>,
        fields: Vec<String>,
    ) -> Self {
        Self::with_cursor(CursorImpl::Session(cursor, state), fields)
    }

    #[cfg(test)]
    pub(crate) fn from_fixed(rows: Vec<Document>, fields: Vec<String>) -> Self {
        Self::with_cursor(CursorImpl::Fixed(rows.into_iter()), fields)
    }

    fn with_cursor(cursor: CursorImpl, fields: Vec<String>) -> Self {
        Self {
            cursor: Some(cursor),
            fields,
            row: None,
            was_null: false,
            closed: false,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed("result set"))
        } else {
            Ok(())
        }
    }

    /// Advances to the next row. Returns false once the cursor is exhausted;
    /// the previous row is no longer readable after that.
    pub fn next(&mut self) -> Result<bool> {
        self.check_open()?;
        let cursor = match self.cursor.as_mut() {
            Some(cursor) => cursor,
            None => unreachable!("open result set always has a cursor"),
        };
        let row = match cursor {
            CursorImpl::Plain(cursor) => cursor.next().transpose().map_err(map_driver_error)?,
            CursorImpl::Session(cursor, state) => {
                let mut st = state.borrow_mut();
                st.check_open()?;
                match st.session.as_mut() {
                    Some(session) => cursor
                        .next(session)
                        .transpose()
                        .map_err(map_driver_error)?,
                    // the session is only released when the connection
                    // closes, which check_open just ruled out
                    None => unreachable!("open connection always retains its session"),
                }
            }
            #[cfg(test)]
            CursorImpl::Fixed(rows) => rows.next(),
        };
        self.was_null = false;
        match row {
            Some(document) => {
                self.row = Some(document);
                Ok(true)
            }
            None => {
                trace!("cursor exhausted");
                self.row = None;
                Ok(false)
            }
        }
    }

    pub fn column_count(&self) -> Result<usize> {
        self.check_open()?;
        Ok(self.fields.len())
    }

    pub fn column_label(&self, index: usize) -> Result<&str> {
        self.check_open()?;
        if index < 1 || index > self.fields.len() {
            return Err(Error::ColumnIndexOutOfRange {
                index,
                count: self.fields.len(),
            });
        }
        Ok(&self.fields[index - 1])
    }

    /// The 1-based index of the column with the given label.
    pub fn find_column(&self, label: &str) -> Result<usize> {
        self.check_open()?;
        self.fields
            .iter()
            .position(|f| f == label)
            .map(|p| p + 1)
            .ok_or_else(|| Error::NoSuchColumn(label.to_string()))
    }

    /// Whether the last value read by a getter was SQL NULL.
    pub fn was_null(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.was_null)
    }

    fn current_value(&mut self, index: usize) -> Result<Bson> {
        self.check_open()?;
        let row = self.row.as_ref().ok_or(Error::NoCurrentRow)?;
        if index < 1 || index > self.fields.len() {
            return Err(Error::ColumnIndexOutOfRange {
                index,
                count: self.fields.len(),
            });
        }
        let value = row.get(&self.fields[index - 1]).cloned().unwrap_or(Bson::Null);
        self.was_null = matches!(value, Bson::Null | Bson::Undefined);
        Ok(value)
    }

    fn get_with<T>(
        &mut self,
        index: usize,
        target: JdbcType,
        convert: impl Fn(&Bson) -> Option<T>,
    ) -> Result<Option<T>> {
        let value = self.current_value(index)?;
        if self.was_null {
            return Ok(None);
        }
        match convert(&value) {
            Some(converted) => Ok(Some(converted)),
            None => Err(Error::TypeConversion {
                from: types::bson_type_name(&value),
                to: target,
            }),
        }
    }

    pub fn get_bool(&mut self, index: usize) -> Result<Option<bool>> {
        self.get_with(index, JdbcType::Boolean, types::to_bool)
    }

    pub fn get_i32(&mut self, index: usize) -> Result<Option<i32>> {
        self.get_with(index, JdbcType::Integer, types::to_i32)
    }

    pub fn get_i64(&mut self, index: usize) -> Result<Option<i64>> {
        self.get_with(index, JdbcType::BigInt, types::to_i64)
    }

    pub fn get_f64(&mut self, index: usize) -> Result<Option<f64>> {
        self.get_with(index, JdbcType::Double, types::to_f64)
    }

    pub fn get_string(&mut self, index: usize) -> Result<Option<String>> {
        self.get_with(index, JdbcType::Varchar, types::to_string_value)
    }

    pub fn get_bytes(&mut self, index: usize) -> Result<Option<Vec<u8>>> {
        self.get_with(index, JdbcType::Binary, types::to_bytes)
    }

    pub fn get_object_id(&mut self, index: usize) -> Result<Option<ObjectId>> {
        self.get_with(index, JdbcType::ObjectId, types::to_object_id)
    }

    pub fn get_datetime(&mut self, index: usize) -> Result<Option<bson::DateTime>> {
        self.get_with(index, JdbcType::Timestamp, types::to_datetime)
    }

    pub fn get_decimal128(&mut self, index: usize) -> Result<Option<bson::Decimal128>> {
        self.get_with(index, JdbcType::Decimal, types::to_decimal128)
    }

    pub fn get_bool_by_label(&mut self, label: &str) -> Result<Option<bool>> {
        let index = self.find_column(label)?;
        self.get_bool(index)
    }

    pub fn get_i64_by_label(&mut self, label: &str) -> Result<Option<i64>> {
        let index = self.find_column(label)?;
        self.get_i64(index)
    }

    pub fn get_string_by_label(&mut self, label: &str) -> Result<Option<String>> {
        let index = self.find_column(label)?;
        self.get_string(index)
    }

    pub fn get_object_id_by_label(&mut self, label: &str) -> Result<Option<ObjectId>> {
        let index = self.find_column(label)?;
        self.get_object_id(index)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Idempotent; dropping the cursor releases any server-side resources.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cursor = None;
        self.row = None;
        Ok(())
    }
}

/// Field labels for a result set prepared from raw command text: the keys of
/// the pipeline's last `$project` stage, minus exclusions.
pub(crate) fn derive_fields(pipeline: &[Document]) -> Vec<String> {
    let Some(project) = pipeline
        .iter()
        .rev()
        .find_map(|stage| stage.get_document("$project").ok())
    else {
        return vec![];
    };
    project
        .iter()
        .filter(|(_, value)| !is_exclusion(value))
        .map(|(key, _)| key.clone())
        .collect()
}

fn is_exclusion(value: &Bson) -> bool {
    matches!(
        value,
        Bson::Int32(0) | Bson::Int64(0) | Bson::Boolean(false)
    ) || matches!(value, Bson::Double(d) if *d == 0.0)
}
