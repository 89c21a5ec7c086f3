//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! The wire-level row representation exchanged with the request layer.
//!
//! A [`WireRow`] is the request layer's buffer for one row. Values are read
//! from it through borrowed [`WireRef`] views and written to it through typed
//! setters that only accept the exact declared type of the column. Widening
//! between field types and column types is done by [`Row`](crate::Row), not here.
use std::sync::Arc;

use crate::client::Lease;
use crate::error::RequestError;
use crate::types::GridType;

// request layer codes used for wire row failures
pub(crate) const WIRE_COLUMN_OUT_OF_RANGE: i32 = 60001;
pub(crate) const WIRE_TYPE_MISMATCH: i32 = 60002;
pub(crate) const WIRE_NOT_NULLABLE: i32 = 60003;

/// Capability to describe column types, passed explicitly wherever rows are
/// bound to a schema.
pub trait SchemaView {
    fn column_count(&self) -> usize;
    fn column_type(&self, column: usize) -> Option<GridType>;
    fn column_nullable(&self, column: usize) -> bool;
}

/// Type and nullability of one wire row column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireColumn {
    pub column_type: GridType,
    pub nullable: bool,
}

impl SchemaView for Arc<[WireColumn]> {
    fn column_count(&self) -> usize {
        self.len()
    }
    fn column_type(&self, column: usize) -> Option<GridType> {
        self.get(column).map(|c| c.column_type)
    }
    fn column_nullable(&self, column: usize) -> bool {
        self.get(column).map(|c| c.nullable).unwrap_or(false)
    }
}

// Stored value of one column. Timestamps are milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum Cell {
    #[default]
    Null,
    String(String),
    Bool(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Timestamp(i64),
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
    TimestampArray(Vec<i64>),
}

impl Cell {
    pub(crate) fn grid_type(&self) -> GridType {
        match self {
            Cell::Null => GridType::Null,
            Cell::String(_) => GridType::String,
            Cell::Bool(_) => GridType::Bool,
            Cell::Byte(_) => GridType::Byte,
            Cell::Short(_) => GridType::Short,
            Cell::Integer(_) => GridType::Integer,
            Cell::Long(_) => GridType::Long,
            Cell::Float(_) => GridType::Float,
            Cell::Double(_) => GridType::Double,
            Cell::Timestamp(_) => GridType::Timestamp,
            Cell::Geometry(_) => GridType::Geometry,
            Cell::Blob(_) => GridType::Blob,
            Cell::StringArray(_) => GridType::StringArray,
            Cell::BoolArray(_) => GridType::BoolArray,
            Cell::ByteArray(_) => GridType::ByteArray,
            Cell::ShortArray(_) => GridType::ShortArray,
            Cell::IntegerArray(_) => GridType::IntegerArray,
            Cell::LongArray(_) => GridType::LongArray,
            Cell::FloatArray(_) => GridType::FloatArray,
            Cell::DoubleArray(_) => GridType::DoubleArray,
            Cell::TimestampArray(_) => GridType::TimestampArray,
        }
    }

    fn as_ref(&self) -> WireRef<'_> {
        match self {
            Cell::Null => WireRef::Null,
            Cell::String(v) => WireRef::String(v),
            Cell::Bool(v) => WireRef::Bool(*v),
            Cell::Byte(v) => WireRef::Byte(*v),
            Cell::Short(v) => WireRef::Short(*v),
            Cell::Integer(v) => WireRef::Integer(*v),
            Cell::Long(v) => WireRef::Long(*v),
            Cell::Float(v) => WireRef::Float(*v),
            Cell::Double(v) => WireRef::Double(*v),
            Cell::Timestamp(v) => WireRef::Timestamp(*v),
            Cell::Geometry(v) => WireRef::Geometry(v),
            Cell::Blob(v) => WireRef::Blob(v),
            Cell::StringArray(v) => WireRef::StringArray(v),
            Cell::BoolArray(v) => WireRef::BoolArray(v),
            Cell::ByteArray(v) => WireRef::ByteArray(v),
            Cell::ShortArray(v) => WireRef::ShortArray(v),
            Cell::IntegerArray(v) => WireRef::IntegerArray(v),
            Cell::LongArray(v) => WireRef::LongArray(v),
            Cell::FloatArray(v) => WireRef::FloatArray(v),
            Cell::DoubleArray(v) => WireRef::DoubleArray(v),
            Cell::TimestampArray(v) => WireRef::TimestampArray(v),
        }
    }
}

/// Borrowed view of one column value inside a [`WireRow`].
///
/// The view is only valid until the wire row is next written to; the borrow
/// checker enforces this. Anything kept longer must be copied out, which is
/// what [`Field::from_wire()`](crate::Field::from_wire) does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireRef<'a> {
    Null,
    String(&'a str),
    Bool(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Timestamp(i64),
    Geometry(&'a str),
    Blob(&'a [u8]),
    StringArray(&'a [String]),
    BoolArray(&'a [bool]),
    ByteArray(&'a [i8]),
    ShortArray(&'a [i16]),
    IntegerArray(&'a [i32]),
    LongArray(&'a [i64]),
    FloatArray(&'a [f32]),
    DoubleArray(&'a [f64]),
    TimestampArray(&'a [i64]),
}

/// The request layer's buffer for a single row.
///
/// Rows handed out by a [`GridClient`](crate::GridClient) carry a [`Lease`]
/// that is released when the row is dropped, so a row acquired inside a
/// batch loop is returned to the request layer even when the loop exits
/// early with an error.
#[derive(Debug)]
pub struct WireRow {
    columns: Arc<[WireColumn]>,
    cells: Vec<Cell>,
    _lease: Lease,
}

macro_rules! setter {
    ($name:ident, $t:ty, $gt:path, $variant:path) => {
        pub fn $name(&mut self, column: usize, value: $t) -> Result<(), RequestError> {
            self.put_cell(column, $gt, $variant(value))
        }
    };
    ($name:ident, $t:ty, $gt:path, $variant:path, owned) => {
        pub fn $name(&mut self, column: usize, value: &$t) -> Result<(), RequestError> {
            self.put_cell(column, $gt, $variant(value.to_owned()))
        }
    };
}

impl WireRow {
    /// Create an empty row for the given schema. Every column starts as null.
    pub fn new(schema: &dyn SchemaView, lease: Lease) -> WireRow {
        let columns: Vec<WireColumn> = (0..schema.column_count())
            .map(|i| WireColumn {
                column_type: schema.column_type(i).unwrap_or(GridType::Null),
                nullable: schema.column_nullable(i),
            })
            .collect();
        let cells = vec![Cell::Null; columns.len()];
        WireRow {
            columns: columns.into(),
            cells,
            _lease: lease,
        }
    }

    pub(crate) fn from_cells(columns: Arc<[WireColumn]>, cells: Vec<Cell>, lease: Lease) -> WireRow {
        WireRow {
            columns,
            cells,
            _lease: lease,
        }
    }

    /// The live column layout of this row.
    pub fn columns(&self) -> Arc<[WireColumn]> {
        self.columns.clone()
    }

    pub(crate) fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn set_cells(&mut self, cells: Vec<Cell>) {
        self.cells = cells;
    }

    pub fn get_field(&self, column: usize) -> Result<WireRef<'_>, RequestError> {
        match self.cells.get(column) {
            Some(c) => Ok(c.as_ref()),
            None => Err(RequestError::new(
                WIRE_COLUMN_OUT_OF_RANGE,
                &format!(
                    "column {} out of range (column count {})",
                    column,
                    self.cells.len()
                ),
            )),
        }
    }

    fn put_cell(&mut self, column: usize, ty: GridType, cell: Cell) -> Result<(), RequestError> {
        let col = match self.columns.get(column) {
            Some(c) => *c,
            None => {
                return Err(RequestError::new(
                    WIRE_COLUMN_OUT_OF_RANGE,
                    &format!(
                        "column {} out of range (column count {})",
                        column,
                        self.columns.len()
                    ),
                ))
            }
        };
        if col.column_type != ty {
            return Err(RequestError::new(
                WIRE_TYPE_MISMATCH,
                &format!(
                    "column {} is {}, value is {}",
                    column, col.column_type, ty
                ),
            ));
        }
        self.cells[column] = cell;
        Ok(())
    }

    pub fn set_null(&mut self, column: usize) -> Result<(), RequestError> {
        match self.columns.get(column) {
            Some(c) if c.nullable => {
                self.cells[column] = Cell::Null;
                Ok(())
            }
            Some(_) => Err(RequestError::new(
                WIRE_NOT_NULLABLE,
                &format!("column {} is not nullable", column),
            )),
            None => Err(RequestError::new(
                WIRE_COLUMN_OUT_OF_RANGE,
                &format!("column {} out of range", column),
            )),
        }
    }

    setter!(set_string, str, GridType::String, Cell::String, owned);
    setter!(set_bool, bool, GridType::Bool, Cell::Bool);
    setter!(set_byte, i8, GridType::Byte, Cell::Byte);
    setter!(set_short, i16, GridType::Short, Cell::Short);
    setter!(set_integer, i32, GridType::Integer, Cell::Integer);
    setter!(set_long, i64, GridType::Long, Cell::Long);
    setter!(set_float, f32, GridType::Float, Cell::Float);
    setter!(set_double, f64, GridType::Double, Cell::Double);
    setter!(set_timestamp, i64, GridType::Timestamp, Cell::Timestamp);
    setter!(set_geometry, str, GridType::Geometry, Cell::Geometry, owned);
    setter!(set_blob, [u8], GridType::Blob, Cell::Blob, owned);
    setter!(set_string_array, [String], GridType::StringArray, Cell::StringArray, owned);
    setter!(set_bool_array, [bool], GridType::BoolArray, Cell::BoolArray, owned);
    setter!(set_byte_array, [i8], GridType::ByteArray, Cell::ByteArray, owned);
    setter!(set_short_array, [i16], GridType::ShortArray, Cell::ShortArray, owned);
    setter!(set_integer_array, [i32], GridType::IntegerArray, Cell::IntegerArray, owned);
    setter!(set_long_array, [i64], GridType::LongArray, Cell::LongArray, owned);
    setter!(set_float_array, [f32], GridType::FloatArray, Cell::FloatArray, owned);
    setter!(set_double_array, [f64], GridType::DoubleArray, Cell::DoubleArray, owned);
    setter!(
        set_timestamp_array,
        [i64],
        GridType::TimestampArray,
        Cell::TimestampArray,
        owned
    );
}

impl SchemaView for WireRow {
    fn column_count(&self) -> usize {
        self.columns.len()
    }
    fn column_type(&self, column: usize) -> Option<GridType> {
        self.columns.column_type(column)
    }
    fn column_nullable(&self, column: usize) -> bool {
        self.columns.column_nullable(column)
    }
}

/// Per-column type vector of a schema, acquired from the request layer.
///
/// Containers and row sets build one lazily and keep it; batch reads build
/// one per container for the duration of the call.
#[derive(Debug)]
pub struct ColumnTypes {
    columns: Arc<[WireColumn]>,
    _lease: Lease,
}

impl ColumnTypes {
    pub(crate) fn build(
        client: &dyn crate::client::GridClient,
        schema: &dyn SchemaView,
    ) -> Result<ColumnTypes, crate::error::GridError> {
        let lease = client.allocate(crate::client::Allocation::TypeVector)?;
        let mut columns = Vec::new();
        columns.try_reserve_exact(schema.column_count())?;
        for i in 0..schema.column_count() {
            columns.push(WireColumn {
                column_type: schema.column_type(i).unwrap_or(GridType::Null),
                nullable: schema.column_nullable(i),
            });
        }
        Ok(ColumnTypes {
            columns: columns.into(),
            _lease: lease,
        })
    }

    pub fn types(&self) -> Vec<GridType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }
}

impl SchemaView for ColumnTypes {
    fn column_count(&self) -> usize {
        self.columns.len()
    }
    fn column_type(&self, column: usize) -> Option<GridType> {
        self.columns.column_type(column)
    }
    fn column_nullable(&self, column: usize) -> bool {
        self.columns.column_nullable(column)
    }
}
