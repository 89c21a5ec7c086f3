//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use griddb_rust_client::{
    Allocation, ColumnInfo, ContainerInfo, Field, GridErrorCode, GridType, MemoryClient,
    RequestError, ResponseOrder, Row, RowKeyPredicate, Store,
};

use rand::Rng;
use std::error::Error;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .with_ansi(false)
        .compact()
        .try_init();
}

// C1 has a LONG key, C2 a STRING key
fn setup() -> Result<(Arc<MemoryClient>, Store), Box<dyn Error>> {
    init_tracing();
    let client = Arc::new(MemoryClient::new());
    let mut store = Store::new(client.clone());
    store.put_container(
        &ContainerInfo::new("C1")
            .column(ColumnInfo::new("id", GridType::Long))
            .column(ColumnInfo::new("value", GridType::Double))
            .row_key(true),
        false,
    )?;
    store.put_container(
        &ContainerInfo::new("C2")
            .column(ColumnInfo::new("code", GridType::String))
            .column(ColumnInfo::new("count", GridType::Integer))
            .column(ColumnInfo::new("tags", GridType::StringArray))
            .row_key(true),
        false,
    )?;
    Ok((client, store))
}

fn c1_rows() -> Vec<Row> {
    // INTEGER widened to LONG key and DOUBLE value
    vec![
        Row::new().long(1).double(1.5),
        Row::new().integer(2).integer(3),
        Row::new().long(3).null(),
    ]
}

fn c2_rows() -> Vec<Row> {
    vec![
        Row::new()
            .string("a")
            .integer(10)
            .column(vec!["x".to_string(), "y".to_string()]),
        Row::new().string("b").byte(2).column(Vec::<String>::new()),
    ]
}

#[test]
fn multi_put_multi_get() -> Result<(), Box<dyn Error>> {
    let (client, mut store) = setup()?;
    let c1 = c1_rows();
    let c2 = c2_rows();
    store.multi_put(&[("C1", c1.as_slice()), ("C2", c2.as_slice())])?;
    assert_eq!(client.request_count("put_multiple_container_rows"), 1);

    let mut p1 = store.create_row_key_predicate(GridType::Long)?;
    p1.set_range(Some(&Field::Integer(2)), None)?;
    let mut p2 = store.create_row_key_predicate(GridType::String)?;
    p2.set_distinct_keys(&[Field::String("a".to_string()), Field::String("zzz".to_string())])?;

    for order in [
        ResponseOrder::Request,
        ResponseOrder::Reverse,
        ResponseOrder::Rotate(1),
    ] {
        client.set_response_order(order);
        let result = store.multi_get(&[("C2", &p2), ("C1", &p1)])?;
        assert_eq!(result.entries.len(), 2);

        let c2_got = result.rows_for(0);
        assert_eq!(c2_got.len(), 1);
        assert_eq!(c2_got[0].get_string(0), Some("a"));
        assert_eq!(
            c2_got[0].get(2),
            Some(&Field::StringArray(vec!["x".to_string(), "y".to_string()]))
        );

        let c1_got = result.rows_for(1);
        assert_eq!(c1_got.len(), 2);
        assert_eq!(c1_got[0].fields(), &[Field::Long(2), Field::Double(3.0)]);
        assert_eq!(c1_got[1].fields(), &[Field::Long(3), Field::Null]);
        assert_eq!(result.get("C1").map(|r| r.len()), Some(2));
    }

    // only C1 matches: C2 gets no entry
    let mut none = store.create_row_key_predicate(GridType::String)?;
    none.set_distinct_keys(&[Field::String("nothing".to_string())])?;
    let result = store.multi_get(&[("C1", &p1), ("C2", &none)])?;
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.order, vec![Some(0), None]);
    assert!(result.rows_for(1).is_empty());
    assert!(result.get("C2").is_none());

    // per-call type vectors are released with the result
    assert_eq!(client.live_allocations(Allocation::TypeVector), 0);
    store.close()?;
    assert_eq!(client.live_allocations(Allocation::WireRow), 0);
    assert_eq!(client.live_allocations(Allocation::TypeVector), 0);
    Ok(())
}

#[test]
fn multi_put_is_checked_before_sending() -> Result<(), Box<dyn Error>> {
    let (client, mut store) = setup()?;
    let baseline = client.live_allocations(Allocation::WireRow);

    // the second C2 row has a DOUBLE in the INTEGER column
    let mut c2 = c2_rows();
    c2.push(Row::new().string("c").double(1.0).column(Vec::<String>::new()));
    let c1 = c1_rows();
    let e = store
        .multi_put(&[("C1", c1.as_slice()), ("C2", c2.as_slice())])
        .err()
        .ok_or("bad row accepted")?;
    assert_eq!(e.code(), GridErrorCode::IncorrectColumnType);
    assert_eq!(client.request_count("put_multiple_container_rows"), 0);
    assert_eq!(client.live_allocations(Allocation::WireRow), baseline);
    assert!(store.get_container("C1")?.ok_or("C1")?.get_row(&Field::Long(1))?.is_none());

    let short = vec![Row::new().long(9)];
    let e = store
        .multi_put(&[("C1", short.as_slice())])
        .err()
        .ok_or("short row accepted")?;
    assert_eq!(e.code(), GridErrorCode::ColumnCountMismatch);

    let e = store
        .multi_put(&[("C1", c1.as_slice()), ("C1", c1.as_slice())])
        .err()
        .ok_or("duplicate container accepted")?;
    assert_eq!(e.code(), GridErrorCode::IllegalArgument);

    let e = store
        .multi_put(&[("C3", c1.as_slice())])
        .err()
        .ok_or("unknown container accepted")?;
    assert_eq!(e.code(), GridErrorCode::ContainerNotFound);

    // wire row allocation failing halfway releases the rows already acquired
    client.fail_allocation_after(Allocation::WireRow, 2);
    let e = store
        .multi_put(&[("C1", c1.as_slice()), ("C2", c2_rows().as_slice())])
        .err()
        .ok_or("allocation failure ignored")?;
    assert_eq!(e.code(), GridErrorCode::ResourceExhausted);
    assert_eq!(client.live_allocations(Allocation::WireRow), baseline);

    // nothing to write: no request
    let empty: Vec<Row> = Vec::new();
    store.multi_put(&[("C1", empty.as_slice()), ("C2", empty.as_slice())])?;
    store.multi_put(&[])?;
    assert_eq!(client.request_count("put_multiple_container_rows"), 0);
    assert!(store.multi_get(&[])?.entries.is_empty());
    assert_eq!(client.request_count("get_multiple_container_rows"), 0);
    Ok(())
}

#[test]
fn batch_request_failure() -> Result<(), Box<dyn Error>> {
    let (client, mut store) = setup()?;
    let c1 = c1_rows();
    client.fail_next(
        "put_multiple_container_rows",
        RequestError::timeout(9001, "batch timed out"),
    );
    let e = store
        .multi_put(&[("C1", c1.as_slice())])
        .err()
        .ok_or("injected failure lost")?;
    assert!(e.is_timeout());
    assert_eq!(e.error_stack_size(), 1);
    assert_eq!(e.error_code(0), Some(9001));
    assert_eq!(e.message_at(0), Some("batch timed out"));

    store.multi_put(&[("C1", c1.as_slice())])?;
    let p = RowKeyPredicate::new(GridType::Long)?;
    client.fail_next(
        "get_multiple_container_rows",
        RequestError::new(9002, "lost connection"),
    );
    let e = store.multi_get(&[("C1", &p)]).err().ok_or("injected failure lost")?;
    assert_eq!(e.code(), GridErrorCode::Protocol);
    assert_eq!(store.multi_get(&[("C1", &p)])?.rows_for(0).len(), 3);
    Ok(())
}

#[test]
fn multi_get_is_checked_before_sending() -> Result<(), Box<dyn Error>> {
    let (client, mut store) = setup()?;
    store.put_container(
        &ContainerInfo::new("log").column(ColumnInfo::new("line", GridType::String)),
        false,
    )?;
    let long_pred = RowKeyPredicate::new(GridType::Long)?;
    let string_pred = RowKeyPredicate::new(GridType::String)?;
    let int_pred = RowKeyPredicate::new(GridType::Integer)?;

    let e = store
        .multi_get(&[("C1", &long_pred), ("C2", &long_pred)])
        .err()
        .ok_or("LONG predicate accepted for STRING key")?;
    assert_eq!(e.code(), GridErrorCode::WrongRowKeyType);
    // no widening for predicates
    let e = store
        .multi_get(&[("C1", &int_pred)])
        .err()
        .ok_or("INTEGER predicate accepted for LONG key")?;
    assert_eq!(e.code(), GridErrorCode::WrongRowKeyType);
    let e = store
        .multi_get(&[("log", &string_pred)])
        .err()
        .ok_or("keyless container accepted")?;
    assert_eq!(e.code(), GridErrorCode::IllegalArgument);
    let e = store
        .multi_get(&[("C2", &string_pred), ("C2", &string_pred)])
        .err()
        .ok_or("duplicate container accepted")?;
    assert_eq!(e.code(), GridErrorCode::IllegalArgument);
    let e = store
        .multi_get(&[("nope", &string_pred)])
        .err()
        .ok_or("unknown container accepted")?;
    assert_eq!(e.code(), GridErrorCode::ContainerNotFound);

    // the third type vector fails; the two already built are released
    store.put_container(
        &ContainerInfo::new("C4")
            .column(ColumnInfo::new("id", GridType::Long))
            .row_key(true),
        false,
    )?;
    client.fail_allocation_after(Allocation::TypeVector, 2);
    let e = store
        .multi_get(&[("C1", &long_pred), ("C2", &string_pred), ("C4", &long_pred)])
        .err()
        .ok_or("allocation failure ignored")?;
    assert_eq!(e.code(), GridErrorCode::ResourceExhausted);
    assert!(!e.is_timeout());

    assert_eq!(client.request_count("get_multiple_container_rows"), 0);
    assert_eq!(client.live_allocations(Allocation::TypeVector), 0);

    // the failure is one-shot
    assert!(store
        .multi_get(&[("C1", &long_pred), ("C2", &string_pred), ("C4", &long_pred)])?
        .entries
        .is_empty());
    assert_eq!(client.request_count("get_multiple_container_rows"), 1);
    assert_eq!(client.live_allocations(Allocation::TypeVector), 0);
    Ok(())
}

#[test]
fn random_batches() -> Result<(), Box<dyn Error>> {
    let (client, mut store) = setup()?;
    let mut rng = rand::thread_rng();
    let mut expected: Vec<(i64, f64)> = Vec::new();
    for round in 0..5 {
        let rows: Vec<Row> = (0..rng.gen_range(1..40))
            .map(|i| {
                let id = round * 100 + i;
                let v = rng.gen_range(-1000.0..1000.0);
                expected.push((id, v));
                Row::new().long(id).double(v)
            })
            .collect();
        let c2: Vec<Row> = (0..rng.gen_range(0..5))
            .map(|i| {
                Row::new()
                    .string(&format!("k{}-{}", round, i))
                    .integer(i as i32)
                    .column(Vec::<String>::new())
            })
            .collect();
        store.multi_put(&[("C1", rows.as_slice()), ("C2", c2.as_slice())])?;
    }
    client.set_response_order(ResponseOrder::Rotate(rng.gen_range(0..4)));

    let all_keys = RowKeyPredicate::new(GridType::Long)?;
    let all_codes = RowKeyPredicate::new(GridType::String)?;
    let result = store.multi_get(&[("C1", &all_keys), ("C2", &all_codes)])?;
    let got: Vec<(i64, f64)> = result
        .rows_for(0)
        .iter()
        .map(|r| (r.get_long(0).unwrap_or(-1), r.get_double(1).unwrap_or(f64::NAN)))
        .collect();
    expected.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(got, expected);

    // a single container batch through the container itself
    let c1 = store.get_container("C1")?.ok_or("C1 missing")?;
    c1.multi_put(&[Row::new().long(-1).double(0.0), Row::new().long(-2).double(0.0)])?;
    assert_eq!(client.request_count("put_multiple_rows"), 1);
    assert!(c1.get_row(&Field::Long(-2))?.is_some());
    Ok(())
}

#[test]
fn fetch_all_queries() -> Result<(), Box<dyn Error>> {
    let (_client, mut store) = setup()?;
    let c1 = c1_rows();
    let c2 = c2_rows();
    store.multi_put(&[("C1", c1.as_slice()), ("C2", c2.as_slice())])?;

    let mut q1 = store
        .get_container("C1")?
        .ok_or("C1 missing")?
        .query("SELECT * WHERE id > 1")?;
    let mut q2 = store
        .get_container("C2")?
        .ok_or("C2 missing")?
        .query("SELECT COUNT(*)")?;
    assert!(q1.get_row_set()?.is_none());
    store.fetch_all(&[&q1, &q2])?;

    assert_eq!(q1.get_row_set()?.ok_or("no row set for q1")?.size()?, 2);
    let mut rs = q2.get_row_set()?.ok_or("no row set for q2")?;
    match rs.next()? {
        Some(griddb_rust_client::QueryResult::Aggregation(a)) => {
            assert_eq!(a.get(GridType::Long)?, Field::Long(2))
        }
        other => return Err(format!("expected aggregation, got {:?}", other).into()),
    }
    drop(rs);
    // consumed
    assert!(q2.get_row_set()?.is_none());
    Ok(())
}
