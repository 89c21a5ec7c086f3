//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use chrono::{DateTime, Utc};
use tracing::trace;

use crate::error::GridErrorCode::{BadProtocolMessage, ColumnCountMismatch, IncorrectColumnType};
use crate::error::{grid_err, ia_err};
use crate::error::{GridError, RequestError};
use crate::types::{Field, GridColumnFromField, GridColumnToField, GridType};
use crate::wire::{SchemaView, WireRef, WireRow};

fn ts_from_millis(column: usize, ms: i64) -> Result<DateTime<Utc>, GridError> {
    match DateTime::from_timestamp_millis(ms) {
        Some(t) => Ok(t),
        None => grid_err!(
            BadProtocolMessage,
            "timestamp {} in column {} is out of range",
            ms,
            column
        ),
    }
}

fn read_error(column: usize, e: RequestError) -> GridError {
    let mut err = GridError::from(e);
    err.message = format!("can't read column {}: {}", column, err.message);
    err
}

impl Field {
    /// Read column `column` of `wire` into a new, independently owned `Field`.
    ///
    /// Strings, blobs and arrays are copied, so the result stays valid after
    /// the wire row is overwritten or dropped.
    pub fn from_wire(wire: &WireRow, column: usize) -> Result<Field, GridError> {
        let v = wire.get_field(column).map_err(|e| read_error(column, e))?;
        let f = match v {
            WireRef::Null => Field::Null,
            WireRef::String(s) => Field::String(s.to_owned()),
            WireRef::Bool(b) => Field::Bool(b),
            WireRef::Byte(b) => Field::Byte(b),
            WireRef::Short(s) => Field::Short(s),
            WireRef::Integer(i) => Field::Integer(i),
            WireRef::Long(l) => Field::Long(l),
            WireRef::Float(x) => Field::Float(x),
            WireRef::Double(x) => Field::Double(x),
            WireRef::Timestamp(ms) => Field::Timestamp(ts_from_millis(column, ms)?),
            WireRef::Geometry(g) => Field::Geometry(g.to_owned()),
            WireRef::Blob(b) => Field::Blob(b.to_vec()),
            WireRef::StringArray(a) => Field::StringArray(a.iter().map(|s| s.to_owned()).collect()),
            WireRef::BoolArray(a) => Field::BoolArray(a.to_vec()),
            WireRef::ByteArray(a) => Field::ByteArray(a.to_vec()),
            WireRef::ShortArray(a) => Field::ShortArray(a.to_vec()),
            WireRef::IntegerArray(a) => Field::IntegerArray(a.to_vec()),
            WireRef::LongArray(a) => Field::LongArray(a.to_vec()),
            WireRef::FloatArray(a) => Field::FloatArray(a.to_vec()),
            WireRef::DoubleArray(a) => Field::DoubleArray(a.to_vec()),
            WireRef::TimestampArray(a) => {
                let mut v = Vec::new();
                v.try_reserve_exact(a.len())?;
                for ms in a {
                    v.push(ts_from_millis(column, *ms)?);
                }
                Field::TimestampArray(v)
            }
        };
        Ok(f)
    }

    /// Write this field into column `column` of `wire`, declared as `declared`.
    ///
    /// Widening conversions are applied when the field type differs from the
    /// declared type:
    ///
    /// | field     | accepted by columns of type                  |
    /// |-----------|----------------------------------------------|
    /// | BYTE      | BOOL, SHORT, INTEGER, LONG, FLOAT, DOUBLE    |
    /// | SHORT     | INTEGER, LONG, FLOAT, DOUBLE                 |
    /// | INTEGER   | BOOL, LONG, FLOAT, DOUBLE                    |
    /// | LONG      | BOOL, DOUBLE                                 |
    /// | FLOAT     | DOUBLE                                       |
    /// | STRING    | BLOB (the UTF-8 bytes of the string)         |
    ///
    /// Numeric sources written to BOOL columns are true when nonzero. Any
    /// other mismatch fails with [`IncorrectColumnType`](crate::GridErrorCode::IncorrectColumnType).
    /// A NULL field writes a null marker if the column is nullable.
    pub fn to_wire(
        &self,
        wire: &mut WireRow,
        column: usize,
        declared: GridType,
        nullable: bool,
    ) -> Result<(), GridError> {
        use GridType as T;
        let res = match (declared, self) {
            (_, Field::Null) => {
                if !nullable {
                    return grid_err!(
                        IncorrectColumnType,
                        "column {} ({}) is not nullable",
                        column,
                        declared
                    );
                }
                wire.set_null(column)
            }
            (T::String, Field::String(s)) => wire.set_string(column, s),
            (T::Blob, Field::Blob(b)) => wire.set_blob(column, b),
            (T::Blob, Field::String(s)) => wire.set_blob(column, s.as_bytes()),
            (T::Geometry, Field::Geometry(g)) => wire.set_geometry(column, g),
            (T::Bool, Field::Bool(b)) => wire.set_bool(column, *b),
            (T::Bool, Field::Byte(v)) => wire.set_bool(column, *v != 0),
            (T::Bool, Field::Integer(v)) => wire.set_bool(column, *v != 0),
            (T::Bool, Field::Long(v)) => wire.set_bool(column, *v != 0),
            (T::Byte, Field::Byte(v)) => wire.set_byte(column, *v),
            (T::Short, Field::Short(v)) => wire.set_short(column, *v),
            (T::Short, Field::Byte(v)) => wire.set_short(column, *v as i16),
            (T::Integer, Field::Integer(v)) => wire.set_integer(column, *v),
            (T::Integer, Field::Short(v)) => wire.set_integer(column, *v as i32),
            (T::Integer, Field::Byte(v)) => wire.set_integer(column, *v as i32),
            (T::Long, Field::Long(v)) => wire.set_long(column, *v),
            (T::Long, Field::Integer(v)) => wire.set_long(column, *v as i64),
            (T::Long, Field::Short(v)) => wire.set_long(column, *v as i64),
            (T::Long, Field::Byte(v)) => wire.set_long(column, *v as i64),
            (T::Float, Field::Float(v)) => wire.set_float(column, *v),
            (T::Float, Field::Integer(v)) => wire.set_float(column, *v as f32),
            (T::Float, Field::Short(v)) => wire.set_float(column, *v as f32),
            (T::Float, Field::Byte(v)) => wire.set_float(column, *v as f32),
            (T::Double, Field::Double(v)) => wire.set_double(column, *v),
            (T::Double, Field::Float(v)) => wire.set_double(column, *v as f64),
            (T::Double, Field::Long(v)) => wire.set_double(column, *v as f64),
            (T::Double, Field::Integer(v)) => wire.set_double(column, *v as f64),
            (T::Double, Field::Short(v)) => wire.set_double(column, *v as f64),
            (T::Double, Field::Byte(v)) => wire.set_double(column, *v as f64),
            (T::Timestamp, Field::Timestamp(t)) => wire.set_timestamp(column, t.timestamp_millis()),
            (T::StringArray, Field::StringArray(a)) => wire.set_string_array(column, a),
            (T::BoolArray, Field::BoolArray(a)) => wire.set_bool_array(column, a),
            (T::ByteArray, Field::ByteArray(a)) => wire.set_byte_array(column, a),
            (T::ShortArray, Field::ShortArray(a)) => wire.set_short_array(column, a),
            (T::IntegerArray, Field::IntegerArray(a)) => wire.set_integer_array(column, a),
            (T::LongArray, Field::LongArray(a)) => wire.set_long_array(column, a),
            (T::FloatArray, Field::FloatArray(a)) => wire.set_float_array(column, a),
            (T::DoubleArray, Field::DoubleArray(a)) => wire.set_double_array(column, a),
            (T::TimestampArray, Field::TimestampArray(a)) => {
                let millis: Vec<i64> = a.iter().map(|t| t.timestamp_millis()).collect();
                wire.set_timestamp_array(column, &millis)
            }
            _ => {
                return grid_err!(
                    IncorrectColumnType,
                    "incorrect column type to set for column {}: declared {}, actual {}",
                    column,
                    declared,
                    self.get_type()
                );
            }
        };
        res.map_err(|e| {
            GridError::new(
                IncorrectColumnType,
                &format!("can't set column {}: {}", column, e),
            )
        })
    }
}

/// One row of a container: an ordered list of [`Field`]s aligned with the
/// container's columns.
///
/// Rows are plain values. A `Row` is bound to a schema only for the duration
/// of a call that writes it to, or reads it from, the store.
///
/// ```
/// use griddb_rust_client::Row;
/// let row = Row::new().long(1).string("a").integer(5);
/// assert_eq!(row.get_string(1), Some("a"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub(crate) fields: Vec<Field>,
}

impl Row {
    pub fn new() -> Self {
        Row { fields: Vec::new() }
    }

    /// A row of `count` NULL fields.
    pub fn with_count(count: usize) -> Self {
        Row {
            fields: vec![Field::Null; count],
        }
    }

    pub fn from_fields(fields: Vec<Field>) -> Self {
        Row { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn get(&self, column: usize) -> Option<&Field> {
        self.fields.get(column)
    }

    /// Take the field out of `column`, leaving NULL in its place.
    pub fn take(&mut self, column: usize) -> Option<Field> {
        self.fields.get_mut(column).map(std::mem::take)
    }

    pub fn set(&mut self, column: usize, val: impl GridColumnToField) -> Result<(), GridError> {
        let len = self.fields.len();
        match self.fields.get_mut(column) {
            Some(f) => {
                *f = val.to_field();
                Ok(())
            }
            None => ia_err!("column {} out of range for row of {} fields", column, len),
        }
    }

    /// Append a field.
    pub fn put(&mut self, val: impl GridColumnToField) {
        self.fields.push(val.to_field());
    }

    /// Append a field, builder style.
    pub fn column(mut self, val: impl GridColumnToField) -> Row {
        self.put(val);
        self
    }

    pub fn string(self, val: &str) -> Row {
        self.column(Field::String(val.to_string()))
    }
    pub fn bool(self, val: bool) -> Row {
        self.column(Field::Bool(val))
    }
    pub fn byte(self, val: i8) -> Row {
        self.column(Field::Byte(val))
    }
    pub fn short(self, val: i16) -> Row {
        self.column(Field::Short(val))
    }
    pub fn integer(self, val: i32) -> Row {
        self.column(Field::Integer(val))
    }
    pub fn long(self, val: i64) -> Row {
        self.column(Field::Long(val))
    }
    pub fn float(self, val: f32) -> Row {
        self.column(Field::Float(val))
    }
    pub fn double(self, val: f64) -> Row {
        self.column(Field::Double(val))
    }
    pub fn timestamp(self, val: DateTime<Utc>) -> Row {
        self.column(Field::Timestamp(val))
    }
    pub fn geometry(self, wkt: &str) -> Row {
        self.column(Field::Geometry(wkt.to_string()))
    }
    pub fn blob(self, val: Vec<u8>) -> Row {
        self.column(Field::Blob(val))
    }
    pub fn null(self) -> Row {
        self.column(Field::Null)
    }

    pub fn get_string(&self, column: usize) -> Option<&str> {
        if let Some(Field::String(s)) = self.fields.get(column) {
            return Some(s);
        }
        None
    }
    pub fn get_bool(&self, column: usize) -> Option<bool> {
        if let Some(Field::Bool(b)) = self.fields.get(column) {
            return Some(*b);
        }
        None
    }
    pub fn get_integer(&self, column: usize) -> Option<i32> {
        if let Some(Field::Integer(i)) = self.fields.get(column) {
            return Some(*i);
        }
        None
    }
    pub fn get_long(&self, column: usize) -> Option<i64> {
        if let Some(Field::Long(i)) = self.fields.get(column) {
            return Some(*i);
        }
        None
    }
    pub fn get_double(&self, column: usize) -> Option<f64> {
        if let Some(Field::Double(d)) = self.fields.get(column) {
            return Some(*d);
        }
        None
    }
    pub fn get_timestamp(&self, column: usize) -> Option<DateTime<Utc>> {
        self.fields.get(column).and_then(|f| f.as_timestamp())
    }
    pub fn get_blob(&self, column: usize) -> Option<&[u8]> {
        if let Some(Field::Blob(b)) = self.fields.get(column) {
            return Some(b);
        }
        None
    }

    /// Convert the field in `column` to a native Rust value.
    pub fn get_value<T: GridColumnFromField>(&self, column: usize) -> Result<T, GridError> {
        match self.fields.get(column) {
            Some(f) => T::from_field(f),
            None => T::from_field(&Field::Null),
        }
    }

    /// Replace the contents of this row with the contents of `wire`.
    ///
    /// If the wire row has a different column count, this row is resized
    /// first. On error the row keeps the fields read so far and NULL after
    /// them.
    pub fn from_wire(&mut self, wire: &WireRow) -> Result<(), GridError> {
        let count = wire.column_count();
        if count != self.fields.len() {
            self.fields.clear();
            self.fields.try_reserve_exact(count)?;
            self.fields.resize(count, Field::Null);
        }
        for i in 0..count {
            self.fields[i] = Field::from_wire(wire, i)?;
        }
        trace!("read row of {} columns", count);
        Ok(())
    }

    /// Like [`Row::from_wire()`], but first checks that the wire row has the
    /// layout of `schema`. Used for rows the request layer returns without
    /// a bound container.
    pub(crate) fn from_wire_as(
        &mut self,
        wire: &WireRow,
        schema: &dyn SchemaView,
    ) -> Result<(), GridError> {
        if wire.column_count() != schema.column_count() {
            return grid_err!(
                BadProtocolMessage,
                "returned row has {} columns, schema has {}",
                wire.column_count(),
                schema.column_count()
            );
        }
        for i in 0..schema.column_count() {
            if wire.column_type(i) != schema.column_type(i) {
                return grid_err!(
                    BadProtocolMessage,
                    "returned row column {} is {:?}, schema declares {:?}",
                    i,
                    wire.column_type(i),
                    schema.column_type(i)
                );
            }
        }
        self.from_wire(wire)
    }

    /// Write this row into `wire`.
    ///
    /// With an explicit `schema`, its column count must equal this row's
    /// field count and each field is written with the schema's declared type
    /// for its column. Without one, the wire row's own layout is used.
    pub fn to_wire(
        &self,
        wire: &mut WireRow,
        schema: Option<&dyn SchemaView>,
    ) -> Result<(), GridError> {
        let live = wire.columns();
        let schema: &dyn SchemaView = match schema {
            Some(s) => s,
            None => &live,
        };
        if schema.column_count() != self.fields.len() {
            return grid_err!(
                ColumnCountMismatch,
                "row has {} fields, schema has {} columns",
                self.fields.len(),
                schema.column_count()
            );
        }
        for (i, f) in self.fields.iter().enumerate() {
            let declared = match schema.column_type(i) {
                Some(t) => t,
                None => return ia_err!("no type for column {}", i),
            };
            f.to_wire(wire, i, declared, schema.column_nullable(i))?;
        }
        trace!("wrote row of {} columns", self.fields.len());
        Ok(())
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", field)?;
        }
        f.write_str("]")
    }
}

impl From<Vec<Field>> for Row {
    fn from(fields: Vec<Field>) -> Self {
        Row { fields }
    }
}

impl IntoIterator for Row {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;
    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
