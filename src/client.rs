//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::container_info::ContainerInfo;
use crate::error::RequestError;
use crate::query_analysis_entry::QueryAnalysisEntry;
use crate::row_key_predicate::RowKeyPredicate;
use crate::types::RowSetType;
use crate::wire::WireRow;

/// Opaque handle of an open container inside the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerHandle(pub u64);

/// Opaque handle of a query inside the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryHandle(pub u64);

/// Opaque handle of a fetched row set inside the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowSetHandle(pub u64);

/// Kinds of transient resources acquired from the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Allocation {
    WireRow,
    TypeVector,
}

/// Token for a transient resource acquired through [`GridClient::allocate()`].
///
/// Dropping the lease releases the resource.
#[derive(Debug, Default)]
pub struct Lease {
    counter: Option<Arc<AtomicUsize>>,
}

impl Lease {
    /// A lease nobody is counting.
    pub fn untracked() -> Lease {
        Lease { counter: None }
    }

    /// A lease that increments `counter` now and decrements it on drop.
    pub fn tracked(counter: &Arc<AtomicUsize>) -> Lease {
        counter.fetch_add(1, Ordering::SeqCst);
        Lease {
            counter: Some(counter.clone()),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(c) = self.counter.take() {
            c.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Row key value in the form the request layer compares keys.
///
/// Timestamps are milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    String(String),
    Integer(i32),
    Long(i64),
    Timestamp(i64),
}

/// Scalar produced by an aggregation query. Timestamps are milliseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregationValue {
    Long(i64),
    Double(f64),
    Timestamp(i64),
}

/// One container's rows in a batched multi-container put.
#[derive(Debug)]
pub struct ContainerRowsEntry<'a> {
    pub container_name: &'a str,
    pub rows: Vec<&'a WireRow>,
}

/// One container's predicate in a batched multi-container get.
#[derive(Debug, Clone, Copy)]
pub struct RowKeyPredicateEntry<'a> {
    pub container_name: &'a str,
    pub predicate: &'a RowKeyPredicate,
}

/// One container's rows returned by a batched multi-container get.
///
/// Entries are not necessarily returned in request order, and containers
/// with no matching rows may be omitted.
#[derive(Debug)]
pub struct ContainerRows {
    pub container_name: String,
    pub rows: Vec<WireRow>,
}

/// The client request layer this library is built on.
///
/// Every method is a blocking request/response call. On failure the request
/// layer reports a [`RequestError`]; this library never retries.
///
/// Implementations must be safe to share between the [`Store`](crate::Store)
/// and every container, query and row set opened from it.
/// [`MemoryClient`](crate::MemoryClient) is the implementation shipped with
/// this crate.
pub trait GridClient: Send + Sync + std::fmt::Debug {
    /// Acquire a transient resource. The default implementation hands out
    /// untracked leases and never fails.
    fn allocate(&self, _what: Allocation) -> Result<Lease, RequestError> {
        Ok(Lease::untracked())
    }

    // containers
    fn get_container_info(&self, name: &str) -> Result<Option<ContainerInfo>, RequestError>;
    fn put_container(
        &self,
        info: &ContainerInfo,
        modifiable: bool,
    ) -> Result<(ContainerHandle, ContainerInfo), RequestError>;
    fn get_container(
        &self,
        name: &str,
    ) -> Result<Option<(ContainerHandle, ContainerInfo)>, RequestError>;
    fn drop_container(&self, name: &str) -> Result<(), RequestError>;
    fn close_container(&self, container: ContainerHandle) -> Result<(), RequestError>;

    // single rows
    fn create_row(&self, container: ContainerHandle) -> Result<WireRow, RequestError>;
    fn get_row(
        &self,
        container: ContainerHandle,
        key: &RowKey,
        row: &mut WireRow,
        for_update: bool,
    ) -> Result<bool, RequestError>;
    fn put_row(&self, container: ContainerHandle, row: &WireRow) -> Result<bool, RequestError>;
    fn delete_row(&self, container: ContainerHandle, key: &RowKey) -> Result<bool, RequestError>;
    fn put_multiple_rows(
        &self,
        container: ContainerHandle,
        rows: &[&WireRow],
    ) -> Result<(), RequestError>;

    // indexes and transactions
    fn create_index(
        &self,
        container: ContainerHandle,
        column: &str,
        flags: crate::types::IndexTypeFlags,
        name: Option<&str>,
    ) -> Result<(), RequestError>;
    fn drop_index(
        &self,
        container: ContainerHandle,
        column: &str,
        flags: crate::types::IndexTypeFlags,
        name: Option<&str>,
    ) -> Result<(), RequestError>;
    fn flush(&self, container: ContainerHandle) -> Result<(), RequestError>;
    fn set_auto_commit(&self, container: ContainerHandle, enabled: bool)
        -> Result<(), RequestError>;
    fn commit(&self, container: ContainerHandle) -> Result<(), RequestError>;
    fn abort(&self, container: ContainerHandle) -> Result<(), RequestError>;

    // queries and row sets
    fn query(&self, container: ContainerHandle, tql: &str) -> Result<QueryHandle, RequestError>;
    fn set_fetch_options(
        &self,
        query: QueryHandle,
        limit: Option<i64>,
        partial: bool,
    ) -> Result<(), RequestError>;
    fn fetch(&self, query: QueryHandle, for_update: bool) -> Result<RowSetHandle, RequestError>;
    fn fetch_all(&self, queries: &[QueryHandle]) -> Result<(), RequestError>;
    fn get_row_set(&self, query: QueryHandle) -> Result<Option<RowSetHandle>, RequestError>;
    fn close_query(&self, query: QueryHandle) -> Result<(), RequestError>;
    fn row_set_type(&self, row_set: RowSetHandle) -> Result<RowSetType, RequestError>;
    fn row_set_size(&self, row_set: RowSetHandle) -> Result<i32, RequestError>;
    fn has_next_row(&self, row_set: RowSetHandle) -> Result<bool, RequestError>;
    fn next_row(&self, row_set: RowSetHandle, row: &mut WireRow) -> Result<(), RequestError>;
    fn next_aggregation(&self, row_set: RowSetHandle) -> Result<AggregationValue, RequestError>;
    fn next_query_analysis(
        &self,
        row_set: RowSetHandle,
    ) -> Result<Option<QueryAnalysisEntry>, RequestError>;
    fn update_current_row(&self, row_set: RowSetHandle, row: &WireRow)
        -> Result<(), RequestError>;
    fn delete_current_row(&self, row_set: RowSetHandle) -> Result<(), RequestError>;
    fn close_row_set(&self, row_set: RowSetHandle) -> Result<(), RequestError>;

    // batches across containers
    fn put_multiple_container_rows(
        &self,
        entries: &[ContainerRowsEntry<'_>],
    ) -> Result<(), RequestError>;
    fn get_multiple_container_rows(
        &self,
        predicates: &[RowKeyPredicateEntry<'_>],
    ) -> Result<Vec<ContainerRows>, RequestError>;

    // partitions
    fn partition_count(&self) -> Result<i32, RequestError>;
    fn partition_container_count(&self, partition: i32) -> Result<i64, RequestError>;
    fn partition_container_names(
        &self,
        partition: i32,
        start: i64,
        limit: Option<i64>,
    ) -> Result<Vec<String>, RequestError>;
    fn partition_index_of_container(&self, name: &str) -> Result<i32, RequestError>;

    fn close(&self) -> Result<(), RequestError>;
}
