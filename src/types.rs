//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_derive::{Deserialize, Serialize};
use std::result::Result;
use std::string::String;
use std::vec::Vec;

pub use griddb_rust_client_derive::*;

use num_enum::TryFromPrimitive;

use crate::error::ia_err;
use crate::error::GridError;
use crate::error::GridErrorCode::BadProtocolMessage;
use crate::row::Row;

/// Column types of the GridDB data model.
///
/// The numeric values are the ones used by the request layer.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, TryFromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum GridType {
    String = 0,
    Bool = 1,
    Byte = 2,
    Short = 3,
    Integer = 4,
    Long = 5,
    Float = 6,
    Double = 7,
    Timestamp = 8,
    // Well-known-text geometry value
    Geometry = 9,
    Blob = 10,
    StringArray = 11,
    BoolArray = 12,
    ByteArray = 13,
    ShortArray = 14,
    IntegerArray = 15,
    LongArray = 16,
    FloatArray = 17,
    DoubleArray = 18,
    TimestampArray = 19,
    // Only ever the type of a Field, never of a column
    Null = -1,
}

impl GridType {
    pub fn try_from_i32(val: i32) -> Result<Self, GridError> {
        match GridType::try_from(val) {
            Ok(t) => Ok(t),
            Err(_) => Err(GridError::new(
                BadProtocolMessage,
                &format!("unrecognized column type {}", val),
            )),
        }
    }

    pub fn is_array(&self) -> bool {
        (*self as i32) >= GridType::StringArray as i32
    }

    /// Returns true for the types a row key column may be declared with.
    pub fn is_row_key_type(&self) -> bool {
        matches!(
            self,
            GridType::String | GridType::Integer | GridType::Long | GridType::Timestamp
        )
    }
}

impl std::fmt::Display for GridType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            GridType::String => "STRING",
            GridType::Bool => "BOOL",
            GridType::Byte => "BYTE",
            GridType::Short => "SHORT",
            GridType::Integer => "INTEGER",
            GridType::Long => "LONG",
            GridType::Float => "FLOAT",
            GridType::Double => "DOUBLE",
            GridType::Timestamp => "TIMESTAMP",
            GridType::Geometry => "GEOMETRY",
            GridType::Blob => "BLOB",
            GridType::StringArray => "STRING_ARRAY",
            GridType::BoolArray => "BOOL_ARRAY",
            GridType::ByteArray => "BYTE_ARRAY",
            GridType::ShortArray => "SHORT_ARRAY",
            GridType::IntegerArray => "INTEGER_ARRAY",
            GridType::LongArray => "LONG_ARRAY",
            GridType::FloatArray => "FLOAT_ARRAY",
            GridType::DoubleArray => "DOUBLE_ARRAY",
            GridType::TimestampArray => "TIMESTAMP_ARRAY",
            GridType::Null => "NULL",
        };
        f.write_str(s)
    }
}

/// The kind of a container.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum ContainerType {
    #[default]
    Collection = 0,
    TimeSeries = 1,
}

/// Index kinds, combinable as bit flags.
///
/// `DEFAULT` lets the store pick the index kind for the column type.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexTypeFlags(pub i32);

impl IndexTypeFlags {
    pub const DEFAULT: IndexTypeFlags = IndexTypeFlags(-1);
    pub const NONE: IndexTypeFlags = IndexTypeFlags(0);
    pub const TREE: IndexTypeFlags = IndexTypeFlags(1);
    pub const HASH: IndexTypeFlags = IndexTypeFlags(2);
    pub const SPATIAL: IndexTypeFlags = IndexTypeFlags(4);

    pub fn contains(&self, other: IndexTypeFlags) -> bool {
        if *self == Self::DEFAULT || other == Self::DEFAULT {
            return *self == other;
        }
        other.0 != 0 && (self.0 & other.0) == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for IndexTypeFlags {
    fn default() -> Self {
        IndexTypeFlags::NONE
    }
}

impl std::ops::BitOr for IndexTypeFlags {
    type Output = IndexTypeFlags;
    fn bitor(self, rhs: IndexTypeFlags) -> IndexTypeFlags {
        if self == Self::DEFAULT {
            return rhs;
        }
        if rhs == Self::DEFAULT {
            return self;
        }
        IndexTypeFlags(self.0 | rhs.0)
    }
}

/// The content kind of a [`RowSet`](crate::RowSet), fixed when the row set is created.
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(i32)]
pub enum RowSetType {
    ContainerRows = 0,
    AggregationResult = 1,
    QueryAnalysis = 2,
}

/// Options settable on a [`Query`](crate::Query) before it is fetched.
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(i32)]
pub enum FetchOption {
    Limit = 0,
    PartialExecution = 2,
}

/// Time units used by row expiration settings.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum TimeUnit {
    Year = 0,
    Month = 1,
    #[default]
    Day = 2,
    Hour = 3,
    Minute = 4,
    Second = 5,
    Millisecond = 6,
}

/// Column options controlling nullability.
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum TypeOption {
    Nullable = 2,
    NotNull = 4,
}

/// A specific struct to distinguish between a BLOB column value and a
/// BYTE_ARRAY column value.
///
/// It is left as a pure public struct to allow direct setting and taking of
/// the underlying vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridBlob {
    pub data: Vec<u8>,
}

/// One column value.
///
/// Each variant owns its payload outright: a `Field` read from the store
/// never shares storage with the wire row it was read from, with another
/// `Field`, or with a schema.
///
/// `Field` values are created in several ways:
///
///  - From native Rust values, using implementations of the [`GridColumnToField`] trait.
///  - Inherently from [`Row::column()`] and the typed [`Row`] builder methods.
///  - Returned by operations on a container or row set, in which case the
///    variant always matches the declared type of the column.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field {
    String(String),
    Bool(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Timestamp(DateTime<Utc>),
    Geometry(String),
    Blob(Vec<u8>),
    StringArray(Vec<String>),
    BoolArray(Vec<bool>),
    ByteArray(Vec<i8>),
    ShortArray(Vec<i16>),
    IntegerArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    TimestampArray(Vec<DateTime<Utc>>),
    #[default]
    Null,
}

impl Field {
    pub fn get_type(&self) -> GridType {
        match self {
            Field::String(_) => GridType::String,
            Field::Bool(_) => GridType::Bool,
            Field::Byte(_) => GridType::Byte,
            Field::Short(_) => GridType::Short,
            Field::Integer(_) => GridType::Integer,
            Field::Long(_) => GridType::Long,
            Field::Float(_) => GridType::Float,
            Field::Double(_) => GridType::Double,
            Field::Timestamp(_) => GridType::Timestamp,
            Field::Geometry(_) => GridType::Geometry,
            Field::Blob(_) => GridType::Blob,
            Field::StringArray(_) => GridType::StringArray,
            Field::BoolArray(_) => GridType::BoolArray,
            Field::ByteArray(_) => GridType::ByteArray,
            Field::ShortArray(_) => GridType::ShortArray,
            Field::IntegerArray(_) => GridType::IntegerArray,
            Field::LongArray(_) => GridType::LongArray,
            Field::FloatArray(_) => GridType::FloatArray,
            Field::DoubleArray(_) => GridType::DoubleArray,
            Field::TimestampArray(_) => GridType::TimestampArray,
            Field::Null => GridType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Field::Byte(_)
                | Field::Short(_)
                | Field::Integer(_)
                | Field::Long(_)
                | Field::Float(_)
                | Field::Double(_)
        )
    }

    pub fn as_i64(&self) -> Result<i64, GridError> {
        match self {
            Field::Byte(v) => Ok(*v as i64),
            Field::Short(v) => Ok(*v as i64),
            Field::Integer(v) => Ok(*v as i64),
            Field::Long(v) => Ok(*v),
            _ => ia_err!("can't convert {} field to long", self.get_type()),
        }
    }

    pub fn as_f64(&self) -> Result<f64, GridError> {
        match self {
            Field::Float(v) => Ok(*v as f64),
            Field::Double(v) => Ok(*v),
            _ => Ok(self.as_i64()? as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::String(s) | Field::Geometry(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        if let Field::Timestamp(t) = self {
            return Some(*t);
        }
        None
    }
}

fn write_list<T>(
    f: &mut std::fmt::Formatter,
    items: &[T],
    each: impl Fn(&mut std::fmt::Formatter, &T) -> std::fmt::Result,
) -> std::fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(f, item)?;
    }
    f.write_str("]")
}

fn write_ts(f: &mut std::fmt::Formatter, t: &DateTime<Utc>) -> std::fmt::Result {
    f.write_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Field::String(s) => write!(f, "\"{}\"", s),
            Field::Bool(v) => write!(f, "{}", v),
            Field::Byte(v) => write!(f, "{}", v),
            Field::Short(v) => write!(f, "{}", v),
            Field::Integer(v) => write!(f, "{}", v),
            Field::Long(v) => write!(f, "{}", v),
            Field::Float(v) => write!(f, "{}", v),
            Field::Double(v) => write!(f, "{}", v),
            Field::Timestamp(t) => write_ts(f, t),
            Field::Geometry(g) => write!(f, "GEOMETRY('{}')", g),
            Field::Blob(b) => write!(f, "\"{}\"", BASE64_STANDARD.encode(b)),
            Field::StringArray(a) => write_list(f, a, |f, s| write!(f, "\"{}\"", s)),
            Field::BoolArray(a) => write_list(f, a, |f, v| write!(f, "{}", v)),
            Field::ByteArray(a) => write_list(f, a, |f, v| write!(f, "{}", v)),
            Field::ShortArray(a) => write_list(f, a, |f, v| write!(f, "{}", v)),
            Field::IntegerArray(a) => write_list(f, a, |f, v| write!(f, "{}", v)),
            Field::LongArray(a) => write_list(f, a, |f, v| write!(f, "{}", v)),
            Field::FloatArray(a) => write_list(f, a, |f, v| write!(f, "{}", v)),
            Field::DoubleArray(a) => write_list(f, a, |f, v| write!(f, "{}", v)),
            Field::TimestampArray(a) => write_list(f, a, write_ts),
            Field::Null => f.write_str("null"),
        }
    }
}

pub trait GridColumnToField {
    fn to_field(&self) -> Field;
}

impl GridColumnToField for Field {
    fn to_field(&self) -> Field {
        self.clone()
    }
}
impl GridColumnToField for String {
    fn to_field(&self) -> Field {
        Field::String(self.to_string())
    }
}
impl GridColumnToField for &str {
    fn to_field(&self) -> Field {
        Field::String(self.to_string())
    }
}
impl GridColumnToField for bool {
    fn to_field(&self) -> Field {
        Field::Bool(*self)
    }
}
impl GridColumnToField for i8 {
    fn to_field(&self) -> Field {
        Field::Byte(*self)
    }
}
impl GridColumnToField for i16 {
    fn to_field(&self) -> Field {
        Field::Short(*self)
    }
}
impl GridColumnToField for i32 {
    fn to_field(&self) -> Field {
        Field::Integer(*self)
    }
}
impl GridColumnToField for i64 {
    fn to_field(&self) -> Field {
        Field::Long(*self)
    }
}
impl GridColumnToField for f32 {
    fn to_field(&self) -> Field {
        Field::Float(*self)
    }
}
impl GridColumnToField for f64 {
    fn to_field(&self) -> Field {
        Field::Double(*self)
    }
}
impl GridColumnToField for DateTime<Utc> {
    fn to_field(&self) -> Field {
        Field::Timestamp(*self)
    }
}
impl GridColumnToField for GridBlob {
    fn to_field(&self) -> Field {
        Field::Blob(self.data.clone())
    }
}
impl<T: GridColumnToField> GridColumnToField for Option<T> {
    fn to_field(&self) -> Field {
        match self {
            Some(v) => v.to_field(),
            None => Field::Null,
        }
    }
}
impl<T: GridColumnToField> GridColumnToField for &T {
    fn to_field(&self) -> Field {
        (*self).to_field()
    }
}

// arrays are typed per element, so each Vec gets its own impl
macro_rules! array_to_field {
    ($t:ty, $variant:path) => {
        impl GridColumnToField for Vec<$t> {
            fn to_field(&self) -> Field {
                $variant(self.clone())
            }
        }
    };
}

array_to_field!(String, Field::StringArray);
array_to_field!(bool, Field::BoolArray);
array_to_field!(i8, Field::ByteArray);
array_to_field!(i16, Field::ShortArray);
array_to_field!(i32, Field::IntegerArray);
array_to_field!(i64, Field::LongArray);
array_to_field!(f32, Field::FloatArray);
array_to_field!(f64, Field::DoubleArray);
array_to_field!(DateTime<Utc>, Field::TimestampArray);

pub trait GridColumnFromField {
    fn from_field(f: &Field) -> Result<Self, GridError>
    where
        Self: Sized;
}

// a simple macro to make the following impls easier to read
macro_rules! ffv {
    ($f:expr, $a:path, $b:literal) => {{
        if let $a(v) = $f {
            return Ok(v.clone());
        }
        ia_err!(
            "wrong type for field: expected {}, actual: {}",
            $b,
            $f.get_type()
        )
    }};
}

macro_rules! from_field {
    ($t:ty, $variant:path, $name:literal) => {
        impl GridColumnFromField for $t {
            fn from_field(f: &Field) -> Result<Self, GridError> {
                ffv! {f, $variant, $name}
            }
        }
    };
}

from_field!(String, Field::String, "STRING");
from_field!(bool, Field::Bool, "BOOL");
from_field!(i8, Field::Byte, "BYTE");
from_field!(i16, Field::Short, "SHORT");
from_field!(i32, Field::Integer, "INTEGER");
from_field!(i64, Field::Long, "LONG");
from_field!(f32, Field::Float, "FLOAT");
from_field!(f64, Field::Double, "DOUBLE");
from_field!(DateTime<Utc>, Field::Timestamp, "TIMESTAMP");
from_field!(Vec<String>, Field::StringArray, "STRING_ARRAY");
from_field!(Vec<bool>, Field::BoolArray, "BOOL_ARRAY");
from_field!(Vec<i8>, Field::ByteArray, "BYTE_ARRAY");
from_field!(Vec<i16>, Field::ShortArray, "SHORT_ARRAY");
from_field!(Vec<i32>, Field::IntegerArray, "INTEGER_ARRAY");
from_field!(Vec<i64>, Field::LongArray, "LONG_ARRAY");
from_field!(Vec<f32>, Field::FloatArray, "FLOAT_ARRAY");
from_field!(Vec<f64>, Field::DoubleArray, "DOUBLE_ARRAY");
from_field!(Vec<DateTime<Utc>>, Field::TimestampArray, "TIMESTAMP_ARRAY");

impl GridColumnFromField for GridBlob {
    fn from_field(f: &Field) -> Result<Self, GridError> {
        if let Field::Blob(v) = f {
            return Ok(GridBlob { data: v.clone() });
        }
        ia_err!("wrong type for field: expected BLOB, actual: {}", f.get_type())
    }
}
impl GridColumnFromField for Field {
    fn from_field(f: &Field) -> Result<Self, GridError> {
        Ok(f.clone())
    }
}
impl<T: GridColumnFromField> GridColumnFromField for Option<T> {
    fn from_field(f: &Field) -> Result<Self, GridError> {
        if f.is_null() {
            return Ok(None);
        }
        Ok(Some(T::from_field(f)?))
    }
}

/// Trait for a native struct that maps to a container row.
///
/// It is typically not necessary to implement this trait for structs. Instead,
/// use the [`derive@GridRow`] derive macro to automatically have a struct
/// implement this trait. Struct fields map to columns in declaration order;
/// [`Container::put_struct()`](crate::Container::put_struct) reorders them by
/// name when the container's column order differs.
pub trait GridRow {
    /// Column names, in the order `to_row()` emits fields.
    fn column_names() -> Vec<&'static str>
    where
        Self: Sized;
    /// Create a new [`Row`] based on the contents of `Self`.
    fn to_row(&self) -> Result<Row, GridError>;
    /// Populate `Self` with the contents of a given [`Row`].
    fn from_row(&mut self, row: &Row) -> Result<(), GridError>;
}
