//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::client::Lease;
use crate::container_info::{ColumnInfo, ContainerInfo};
use crate::error::GridErrorCode;
use crate::row::Row;
use crate::types::{Field, GridType};
use crate::wire::{WireRef, WireRow};
use chrono::{DateTime, Utc};
use std::error::Error;
use std::result::Result;

fn single(t: GridType) -> ContainerInfo {
    ContainerInfo::new("t").column(ColumnInfo::new("c", t))
}

fn ts(ms: i64) -> Result<DateTime<Utc>, Box<dyn Error>> {
    Ok(DateTime::from_timestamp_millis(ms).ok_or("bad timestamp")?)
}

const SCALARS: [GridType; 11] = [
    GridType::String,
    GridType::Bool,
    GridType::Byte,
    GridType::Short,
    GridType::Integer,
    GridType::Long,
    GridType::Float,
    GridType::Double,
    GridType::Timestamp,
    GridType::Geometry,
    GridType::Blob,
];

fn sample(t: GridType) -> Result<Field, Box<dyn Error>> {
    Ok(match t {
        GridType::String => Field::String("1".to_string()),
        GridType::Bool => Field::Bool(true),
        GridType::Byte => Field::Byte(1),
        GridType::Short => Field::Short(1),
        GridType::Integer => Field::Integer(1),
        GridType::Long => Field::Long(1),
        GridType::Float => Field::Float(1.0),
        GridType::Double => Field::Double(1.0),
        GridType::Timestamp => Field::Timestamp(ts(0)?),
        GridType::Geometry => Field::Geometry("POINT(1 1)".to_string()),
        GridType::Blob => Field::Blob(vec![1]),
        _ => return Err(format!("no sample for {}", t).into()),
    })
}

// sources accepted for each declared column type
fn allowed(source: GridType, declared: GridType) -> bool {
    use GridType as T;
    source == declared
        || matches!(
            (declared, source),
            (T::Bool, T::Byte | T::Integer | T::Long)
                | (T::Short, T::Byte)
                | (T::Integer, T::Short | T::Byte)
                | (T::Long, T::Integer | T::Short | T::Byte)
                | (T::Float, T::Integer | T::Short | T::Byte)
                | (T::Double, T::Float | T::Long | T::Integer | T::Short | T::Byte)
                | (T::Blob, T::String)
        )
}

#[test]
fn test_widening() -> Result<(), Box<dyn Error>> {
    for declared in SCALARS {
        let info = single(declared);
        for source in SCALARS {
            let f = sample(source)?;
            let mut w = WireRow::new(&info, Lease::untracked());
            let res = Row::from_fields(vec![f.clone()]).to_wire(&mut w, Some(&info));
            if allowed(source, declared) {
                res.map_err(|e| format!("{:?} into {}: {}", f, declared, e))?;
                let mut back = Row::new();
                back.from_wire(&w)?;
                assert_eq!(back.fields()[0].get_type(), declared, "{:?} into {}", f, declared);
            } else {
                let e = res.err().ok_or(format!("{:?} accepted into {}", f, declared))?;
                assert_eq!(e.code(), GridErrorCode::IncorrectColumnType);
            }
        }
    }

    // converted values
    let mut w = WireRow::new(&single(GridType::Bool), Lease::untracked());
    Row::from_fields(vec![Field::Long(0)]).to_wire(&mut w, None)?;
    assert_eq!(w.get_field(0)?, WireRef::Bool(false));
    let mut w = WireRow::new(&single(GridType::Double), Lease::untracked());
    Row::from_fields(vec![Field::Long(1 << 40)]).to_wire(&mut w, None)?;
    assert_eq!(w.get_field(0)?, WireRef::Double((1i64 << 40) as f64));
    let mut w = WireRow::new(&single(GridType::Blob), Lease::untracked());
    Row::from_fields(vec![Field::String("hi".to_string())]).to_wire(&mut w, None)?;
    assert_eq!(w.get_field(0)?, WireRef::Blob(b"hi"));

    // arrays are never converted
    let info = single(GridType::LongArray);
    let mut w = WireRow::new(&info, Lease::untracked());
    let e = Row::from_fields(vec![Field::IntegerArray(vec![1])])
        .to_wire(&mut w, Some(&info))
        .err()
        .ok_or("INTEGER array accepted into LONG array")?;
    assert_eq!(e.code(), GridErrorCode::IncorrectColumnType);
    Ok(())
}

#[test]
fn test_round_trip_all_types() -> Result<(), Box<dyn Error>> {
    let info = ContainerInfo::new("all")
        .column(ColumnInfo::new("s", GridType::String))
        .column(ColumnInfo::new("b", GridType::Bool))
        .column(ColumnInfo::new("y", GridType::Byte))
        .column(ColumnInfo::new("h", GridType::Short))
        .column(ColumnInfo::new("i", GridType::Integer))
        .column(ColumnInfo::new("l", GridType::Long))
        .column(ColumnInfo::new("f", GridType::Float))
        .column(ColumnInfo::new("d", GridType::Double))
        .column(ColumnInfo::new("t", GridType::Timestamp))
        .column(ColumnInfo::new("g", GridType::Geometry))
        .column(ColumnInfo::new("x", GridType::Blob))
        .column(ColumnInfo::new("sa", GridType::StringArray))
        .column(ColumnInfo::new("ta", GridType::TimestampArray))
        .column(ColumnInfo::new("n", GridType::Integer));
    let row = Row::from_fields(vec![
        Field::String("héllo".to_string()),
        Field::Bool(true),
        Field::Byte(-8),
        Field::Short(1200),
        Field::Integer(-70000),
        Field::Long(1 << 50),
        Field::Float(1.25),
        Field::Double(-2.5e-3),
        Field::Timestamp(ts(1_700_000_000_123)?),
        Field::Geometry("POINT(2 3)".to_string()),
        Field::Blob(vec![0, 255, 7]),
        Field::StringArray(vec!["a".to_string(), String::new()]),
        Field::TimestampArray(vec![ts(0)?, ts(86_400_000)?]),
        Field::Null,
    ]);
    let mut w = WireRow::new(&info, Lease::untracked());
    row.to_wire(&mut w, Some(&info))?;
    let mut back = Row::with_count(2);
    back.from_wire(&w)?;
    assert_eq!(back, row);
    Ok(())
}

#[test]
fn test_read_does_not_alias() -> Result<(), Box<dyn Error>> {
    let info = single(GridType::String);
    let mut w = WireRow::new(&info, Lease::untracked());
    Row::new().string("first").to_wire(&mut w, Some(&info))?;
    let mut a = Row::new();
    a.from_wire(&w)?;
    Row::new().string("second").to_wire(&mut w, Some(&info))?;
    drop(w);
    assert_eq!(a.get_string(0), Some("first"));
    Ok(())
}

#[test]
fn test_schema_mismatches() -> Result<(), Box<dyn Error>> {
    let info = ContainerInfo::new("k")
        .column(ColumnInfo::new("id", GridType::Long))
        .column(ColumnInfo::new("v", GridType::String))
        .row_key(true);
    let mut w = WireRow::new(&info, Lease::untracked());

    let e = Row::new()
        .long(1)
        .to_wire(&mut w, Some(&info))
        .err()
        .ok_or("short row accepted")?;
    assert_eq!(e.code(), GridErrorCode::ColumnCountMismatch);

    // the row key column is not nullable
    let e = Row::new()
        .null()
        .string("x")
        .to_wire(&mut w, Some(&info))
        .err()
        .ok_or("null key accepted")?;
    assert_eq!(e.code(), GridErrorCode::IncorrectColumnType);

    Row::new().long(1).null().to_wire(&mut w, Some(&info))?;
    let other = single(GridType::Long);
    let mut r = Row::new();
    let e = r
        .from_wire_as(&w, &other)
        .err()
        .ok_or("layout mismatch accepted")?;
    assert_eq!(e.code(), GridErrorCode::BadProtocolMessage);
    r.from_wire_as(&w, &info)?;
    assert_eq!(r.fields(), &[Field::Long(1), Field::Null]);
    Ok(())
}
