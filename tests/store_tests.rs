//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use griddb_rust_client::{
    Allocation, ColumnInfo, ContainerInfo, FetchOption, Field, GridErrorCode, GridRow, GridType,
    IndexTypeFlags, MemoryClient, MemoryCluster, QueryResult, Row, RowSetType, Store,
    StoreConfig, StoreFactory,
};

use std::error::Error;
use std::sync::Arc;

fn init_tracing() {
    // Set up a tracing subscriber to see output based on RUST_LOG environment setting
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .with_ansi(false)
        .compact()
        .try_init();
}

fn people_info() -> ContainerInfo {
    ContainerInfo::new("people")
        .column(ColumnInfo::new("id", GridType::Long))
        .column(ColumnInfo::new("name", GridType::String))
        .column(ColumnInfo::new("age", GridType::Integer))
        .row_key(true)
}

fn open_store() -> (Arc<MemoryClient>, Store) {
    init_tracing();
    let client = Arc::new(MemoryClient::new());
    let store = Store::new(client.clone());
    (client, store)
}

#[test]
fn smoke_test() -> Result<(), Box<dyn Error>> {
    let (client, mut store) = open_store();
    let people = store.put_container(&people_info(), false)?;

    // INTEGER is widened for the LONG key column
    assert!(!people.put(&Row::new().integer(1).string("jane").integer(31))?);
    people.put(&Row::new().long(2).string("bob").integer(40))?;
    people.put(&Row::new().long(3).string("carol").null())?;
    assert!(people.put(&Row::new().long(2).string("robert").integer(41))?);

    let row = people.get_row(&Field::Long(1))?.ok_or("row 1 missing")?;
    assert_eq!(row.get(0), Some(&Field::Long(1)));
    assert_eq!(row.get_string(1), Some("jane"));
    assert_eq!(row.get_integer(2), Some(31));
    let row = people.get_row(&Field::Integer(3))?.ok_or("row 3 missing")?;
    assert_eq!(row.get(2), Some(&Field::Null));
    assert_eq!(
        people.get_row(&Field::Long(2))?.ok_or("row 2 missing")?.get_string(1),
        Some("robert")
    );

    // key type gate: rejected before any request is made
    let before = client.total_requests();
    let mut scratch = Row::new();
    let e = people
        .get(&Field::String("1".to_string()), &mut scratch)
        .err()
        .ok_or("STRING key accepted for LONG column")?;
    assert_eq!(e.code(), GridErrorCode::WrongRowKeyType);
    let e = people.remove(&Field::Double(1.0)).err().ok_or("DOUBLE key accepted")?;
    assert_eq!(e.code(), GridErrorCode::WrongRowKeyType);
    let e = people.remove(&Field::Null).err().ok_or("NULL key accepted")?;
    assert_eq!(e.code(), GridErrorCode::IllegalArgument);
    let e = people
        .put(&Row::new().long(4).string("dave"))
        .err()
        .ok_or("short row accepted")?;
    assert_eq!(e.code(), GridErrorCode::ColumnCountMismatch);
    let e = people
        .put(&Row::new().long(4).integer(5).integer(6))
        .err()
        .ok_or("INTEGER accepted for STRING column")?;
    assert_eq!(e.code(), GridErrorCode::IncorrectColumnType);
    assert_eq!(client.total_requests(), before);

    assert!(people.remove(&Field::Integer(2))?);
    assert!(!people.remove(&Field::Long(2))?);
    assert!(people.get_row(&Field::Long(2))?.is_none());

    store.close()?;
    store.close()?;
    assert!(store.is_closed());
    let e = store.get_container("people").err().ok_or("closed store used")?;
    assert_eq!(e.code(), GridErrorCode::IllegalState);
    Ok(())
}

#[test]
fn query_test() -> Result<(), Box<dyn Error>> {
    let (_client, mut store) = open_store();
    let people = store.put_container(&people_info(), false)?;
    let rows: Vec<Row> = (0..10)
        .map(|i| {
            Row::new()
                .long(i)
                .string(&format!("p{}", i))
                .integer(i as i32 * 10)
        })
        .collect();
    people.multi_put(&rows)?;

    let mut q = people.query("SELECT * WHERE age >= 30 ORDER BY age DESC")?;
    {
        let mut rs = q.fetch(false)?;
        assert_eq!(rs.row_set_type(), RowSetType::ContainerRows);
        assert_eq!(rs.size()?, 7);
        assert_eq!(rs.column_names(), vec!["id", "name", "age"]);
        let mut row = Row::new();
        assert!(rs.next_row(&mut row)?);
        assert_eq!(row.get_integer(2), Some(90));
        let mut seen = 1;
        while let Some(QueryResult::Row(_)) = rs.next()? {
            seen += 1;
        }
        assert_eq!(seen, 7);
        assert!(!rs.has_next()?);
    }

    q.set_fetch_options(2, false)?;
    assert_eq!(q.get_limit(), Some(2));
    assert_eq!(q.fetch(false)?.size()?, 2);
    q.set_fetch_option(FetchOption::Limit, &Field::Integer(-1))?;
    assert_eq!(q.get_limit(), None);
    let e = q
        .set_fetch_option(FetchOption::Limit, &Field::String("3".to_string()))
        .err()
        .ok_or("STRING limit accepted")?;
    assert_eq!(e.code(), GridErrorCode::IllegalArgument);
    q.set_fetch_option(FetchOption::PartialExecution, &Field::Bool(true))?;

    let mut q = people.query("SELECT COUNT(*)")?;
    let mut rs = q.fetch(false)?;
    assert_eq!(rs.row_set_type(), RowSetType::AggregationResult);
    let mut row = Row::new();
    let e = rs.next_row(&mut row).err().ok_or("row read from aggregation")?;
    assert_eq!(e.code(), GridErrorCode::IllegalState);
    match rs.next()? {
        Some(QueryResult::Aggregation(a)) => {
            assert_eq!(a.get(GridType::Long)?, Field::Long(10));
            assert_eq!(a.get(GridType::Double)?, Field::Double(10.0));
            let e = a.get(GridType::Timestamp).err().ok_or("LONG read as TIMESTAMP")?;
            assert_eq!(e.code(), GridErrorCode::IncorrectColumnType);
            let e = a.get(GridType::String).err().ok_or("STRING aggregation")?;
            assert_eq!(e.code(), GridErrorCode::Unsupported);
        }
        other => return Err(format!("expected aggregation, got {:?}", other).into()),
    }
    assert!(rs.next()?.is_none());
    drop(rs);

    let mut q = people.query("SELECT AVG(age) WHERE id < 4")?;
    match q.fetch(false)?.next()? {
        Some(QueryResult::Aggregation(a)) => assert_eq!(a.get(GridType::Double)?, Field::Double(15.0)),
        other => return Err(format!("expected aggregation, got {:?}", other).into()),
    }

    people.create_index("age", IndexTypeFlags::TREE, None)?;
    let mut q = people.query("EXPLAIN ANALYZE SELECT * WHERE age > 45")?;
    let mut rs = q.fetch(false)?;
    assert_eq!(rs.row_set_type(), RowSetType::QueryAnalysis);
    let mut entries = Vec::new();
    while let Some(QueryResult::Analysis(e)) = rs.next()? {
        entries.push(e);
    }
    assert!(entries.iter().any(|e| e.entry_type == "INDEX_SCAN"));
    assert!(entries
        .iter()
        .any(|e| e.entry_type == "RESULT_ROWS" && e.value == "5"));
    drop(rs);

    let e = people.query("SELECT * WHERE nosuch = 1").err().ok_or("bad column accepted")?;
    assert_eq!(e.code(), GridErrorCode::Protocol);
    Ok(())
}

#[test]
fn transaction_test() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cluster = MemoryCluster::new();
    let mut writer = Store::new(Arc::new(MemoryClient::connect(&cluster)));
    let mut reader = Store::new(Arc::new(MemoryClient::connect(&cluster)));
    let w = writer.put_container(&people_info(), false)?;
    for i in 0..5 {
        w.put(&Row::new().long(i).string("x").integer(i as i32))?;
    }

    w.set_auto_commit(false)?;
    w.put(&Row::new().long(10).string("ten").integer(10))?;
    assert!(reader
        .get_container("people")?
        .ok_or("people missing")?
        .get_row(&Field::Long(10))?
        .is_none());
    w.commit()?;
    let r = reader.get_container("people")?.ok_or("people missing")?;
    assert!(r.get_row(&Field::Long(10))?.is_some());

    w.put(&Row::new().long(11).string("eleven").integer(11))?;
    w.abort()?;
    assert!(w.get_row(&Field::Long(11))?.is_none());

    // update and remove through a cursor
    let mut q = w.query("SELECT * WHERE age < 3")?;
    {
        let mut rs = q.fetch(true)?;
        let e = rs.remove().err().ok_or("remove before first row")?;
        assert_eq!(e.code(), GridErrorCode::IllegalState);
        let mut row = Row::new();
        while rs.next_row(&mut row)? {
            if row.get_long(0) == Some(0) {
                rs.remove()?;
            } else {
                row.set(2, 99)?;
                rs.update(&row)?;
            }
        }
    }
    w.commit()?;
    let r = reader.get_container("people")?.ok_or("people missing")?;
    assert!(r.get_row(&Field::Long(0))?.is_none());
    assert_eq!(r.get_row(&Field::Long(1))?.ok_or("row 1")?.get_integer(2), Some(99));
    assert_eq!(r.get_row(&Field::Long(3))?.ok_or("row 3")?.get_integer(2), Some(3));

    // fetch for update needs auto-commit off
    w.set_auto_commit(true)?;
    assert!(q.fetch(true).is_err());
    Ok(())
}

#[test]
fn commit_keeps_batch_writes() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cluster = MemoryCluster::new();
    let mut writer = Store::new(Arc::new(MemoryClient::connect(&cluster)));
    let mut reader = Store::new(Arc::new(MemoryClient::connect(&cluster)));
    let w = writer.put_container(&people_info(), false)?;
    w.set_auto_commit(false)?;
    w.put(&Row::new().long(1).string("one").integer(1))?;

    // a batch write goes straight to the store
    let batch = vec![Row::new().long(2).string("two").integer(2)];
    writer.multi_put(&[("people", batch.as_slice())])?;
    reader
        .get_container("people")?
        .ok_or("people missing")?
        .put(&Row::new().long(3).string("three").integer(3))?;

    writer.get_container("people")?.ok_or("people missing")?.commit()?;
    let r = reader.get_container("people")?.ok_or("people missing")?;
    for id in 1..=3 {
        assert!(r.get_row(&Field::Long(id))?.is_some(), "row {} lost", id);
    }
    Ok(())
}

#[derive(Default, Debug, PartialEq, GridRow)]
struct Person {
    id: i64,
    #[griddb(column = name)]
    full_name: String,
    age: Option<i32>,
}

#[test]
fn struct_test() -> Result<(), Box<dyn Error>> {
    let (_client, mut store) = open_store();
    let info = ContainerInfo::new("persons")
        .column(ColumnInfo::new("id", GridType::Long))
        .column(ColumnInfo::new("age", GridType::Integer))
        .column(ColumnInfo::new("name", GridType::String))
        .row_key(true);
    let c = store.put_container(&info, false)?;
    assert_eq!(Person::column_names(), vec!["id", "name", "age"]);

    let ada = Person {
        id: 7,
        full_name: "ada".to_string(),
        age: Some(36),
    };
    c.put_struct(&ada)?;
    let nobody = Person {
        id: 8,
        full_name: "anon".to_string(),
        age: None,
    };
    c.put_struct(&nobody)?;

    let row = c.get_row(&Field::Long(7))?.ok_or("row 7 missing")?;
    assert_eq!(row.get_string(2), Some("ada"));
    assert_eq!(c.get_struct::<Person>(&Field::Long(7))?, Some(ada));
    assert_eq!(c.get_struct::<Person>(&Field::Long(8))?, Some(nobody));
    assert_eq!(c.get_struct::<Person>(&Field::Long(9))?, None);
    Ok(())
}

#[test]
fn container_admin_test() -> Result<(), Box<dyn Error>> {
    let (client, mut store) = open_store();
    store.put_container(&people_info(), false)?;
    store
        .get_container("people")?
        .ok_or("people missing")?
        .put(&Row::new().long(1).string("a").integer(1))?;
    assert_eq!(store.open_container_count(), 1);

    let wider = people_info().column(ColumnInfo::new("email", GridType::String));
    let e = store.put_container(&wider, false).err().ok_or("schema change accepted")?;
    assert_eq!(e.code(), GridErrorCode::Protocol);
    let c = store.put_container(&wider, true)?;
    assert_eq!(c.get_info().get_column_info_list().len(), 4);
    let row = c.get_row(&Field::Long(1))?.ok_or("row lost on alter")?;
    assert_eq!(row.get(3), Some(&Field::Null));
    c.create_index("name", IndexTypeFlags::HASH, Some("by_name"))?;
    assert!(c.create_index("name", IndexTypeFlags::SPATIAL, None).is_err());
    c.drop_index("name", IndexTypeFlags::DEFAULT, None)?;
    c.flush()?;

    let info = store.get_container_info("people")?.ok_or("info missing")?;
    assert_eq!(info.column_names(), vec!["id", "name", "age", "email"]);
    assert!(store.get_container_info("nobody")?.is_none());

    // closing a lent container does not leave a closed one registered
    store.get_container("people")?.ok_or("people missing")?.close()?;
    let c = store.get_container("people")?.ok_or("people missing")?;
    assert!(!c.is_closed());
    assert!(c.get_row(&Field::Long(1))?.is_some());
    let batch = vec![Row::new().long(2).string("b").integer(2).null()];
    store.multi_put(&[("people", batch.as_slice())])?;
    assert_eq!(store.open_container_count(), 1);

    let invalid = ContainerInfo::new("");
    assert!(store.put_container(&invalid, false).is_err());

    store.drop_container("people")?;
    assert_eq!(store.open_container_count(), 0);
    assert!(store.get_container("people")?.is_none());
    assert_eq!(client.cluster().container_count(), 0);

    store.put_container(&people_info(), false)?;
    store.close()?;
    assert_eq!(client.live_allocations(Allocation::WireRow), 0);
    Ok(())
}

#[test]
fn partition_test() -> Result<(), Box<dyn Error>> {
    let (_client, mut store) = open_store();
    let names = ["alpha", "beta", "gamma", "delta", "epsilon"];
    for n in names {
        let info = ContainerInfo::new(n).column(ColumnInfo::new("v", GridType::Double));
        store.put_container(&info, false)?;
    }
    let pc = store.partition_info()?;
    let count = pc.get_partition_count()?;
    assert_eq!(count, 128);
    let mut total = 0;
    for p in 0..count {
        total += pc.get_container_count(p)?;
    }
    assert_eq!(total, 5);
    for n in names {
        let p = pc.get_partition_index_of_container(n)?;
        assert!(pc.get_container_names(p, 0, -1)?.contains(&n.to_string()));
    }
    assert_eq!(
        pc.get_container_count(-1).err().map(|e| e.code()),
        Some(GridErrorCode::IllegalArgument)
    );
    assert!(pc.get_container_count(count).is_err());
    assert!(pc.get_container_names(0, -1, 10).is_err());
    assert!(pc.get_partition_index_of_container("").is_err());
    Ok(())
}

#[test]
fn factory_test() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let factory = StoreFactory::get_instance();
    assert!(factory.get_version().starts_with("GridDB Rust Client"));
    let mut a = factory.get_store_with("", None, "factoryTest", "", "admin", "admin", "", "")?;
    a.put_container(&people_info(), false)?
        .put(&Row::new().long(5).string("e").integer(5))?;

    let config = StoreConfig::new().cluster_name("factoryTest")?;
    let mut b = factory.get_store(&config)?;
    let c = b.get_container("people")?.ok_or("shared container missing")?;
    assert!(c.get_row(&Field::Long(5))?.is_some());

    let e = factory
        .get_store_with("", None, "", "", "", "", "", "")
        .err()
        .ok_or("store without cluster name")?;
    assert_eq!(e.code(), GridErrorCode::Protocol);
    Ok(())
}
