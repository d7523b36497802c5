//! JDBC type descriptors and the BSON value conversions behind the
//! result-set getters and parameter setters. ObjectId is the one
//! database-specific type that gets its own descriptor; everything else maps
//! onto the standard JDBC type codes.

use bson::{oid::ObjectId, Bson};
use std::fmt;


/// The vendor type code for MongoDB object identifiers. Standard JDBC codes
/// top out below this range.
pub const OBJECT_ID_TYPE_CODE: i32 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JdbcType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Decimal,
    Varchar,
    Binary,
    Timestamp,
    ObjectId,
}

impl JdbcType {
    /// The `java.sql.Types`-compatible code for this type; ObjectId uses the
    /// vendor range.
    pub fn code(&self) -> i32 {
        use JdbcType::*;
        match self {
            Boolean => 16,
            Integer => 4,
            BigInt => -5,
            Double => 8,
            Decimal => 3,
            Varchar => 12,
            Binary => -3,
            Timestamp => 93,
            ObjectId => OBJECT_ID_TYPE_CODE,
        }
    }
}

impl fmt::Display for JdbcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use JdbcType::*;
        let name = match self {
            Boolean => "BOOLEAN",
            Integer => "INTEGER",
            BigInt => "BIGINT",
            Double => "DOUBLE",
            Decimal => "DECIMAL",
            Varchar => "VARCHAR",
            Binary => "BINARY",
            Timestamp => "TIMESTAMP",
            ObjectId => "OBJECT_ID",
        };
        write!(f, "{name}")
    }
}

pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "boolean",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) => "javascript",
        Bson::JavaScriptCodeWithScope(_) => "javascriptWithScope",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "date",
        Bson::Symbol(_) => "symbol",
        Bson::Decimal128(_) => "decimal",
        Bson::Undefined => "undefined",
        Bson::MaxKey => "maxKey",
        Bson::MinKey => "minKey",
        Bson::DbPointer(_) => "dbPointer",
    }
}

/// Numeric conversions follow JDBC getter semantics: exact integer types
/// widen freely, doubles truncate toward zero, and anything out of range or
/// of the wrong BSON type is no conversion at all.
pub fn to_i32(value: &Bson) -> Option<i32> {
    match value {
        Bson::Int32(i) => Some(*i),
        Bson::Int64(l) => i32::try_from(*l).ok(),
        Bson::Double(d) => {
            let truncated = d.trunc();
            if truncated >= i32::MIN as f64 && truncated <= i32::MAX as f64 {
                Some(truncated as i32)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn to_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(*i as i64),
        Bson::Int64(l) => Some(*l),
        Bson::Double(d) => {
            let truncated = d.trunc();
            if truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                Some(truncated as i64)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn to_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(l) => Some(*l as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

pub fn to_bool(value: &Bson) -> Option<bool> {
    match value {
        Bson::Boolean(b) => Some(*b),
        _ => None,
    }
}

pub fn to_string_value(value: &Bson) -> Option<String> {
    match value {
        Bson::String(s) => Some(s.clone()),
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::Symbol(s) => Some(s.clone()),
        _ => None,
    }
}

pub fn to_bytes(value: &Bson) -> Option<Vec<u8>> {
    match value {
        Bson::Binary(b) => Some(b.bytes.clone()),
        Bson::ObjectId(oid) => Some(oid.bytes().to_vec()),
        _ => None,
    }
}

pub fn to_object_id(value: &Bson) -> Option<ObjectId> {
    match value {
        Bson::ObjectId(oid) => Some(*oid),
        Bson::String(s) => ObjectId::parse_str(s).ok(),
        _ => None,
    }
}

pub fn to_datetime(value: &Bson) -> Option<bson::DateTime> {
    match value {
        Bson::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

pub fn to_decimal128(value: &Bson) -> Option<bson::Decimal128> {
    match value {
        Bson::Decimal128(d) => Some(*d),
        _ => None,
    }
}
