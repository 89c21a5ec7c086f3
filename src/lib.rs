//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! GridDB Rust Client
//!
//! A typed client for GridDB-style containers. The library sits on top of a
//! request layer (the [`GridClient`] trait) and adds the parts an application
//! actually works with:
//! - [`Row`]s of [`Field`]s, marshalled to and from the request layer's
//!   [`WireRow`] buffers with widening conversions checked per column
//! - [`Container`]s for single-row reads and writes, indexes, transactions and
//!   TQL queries
//! - [`Store::multi_put()`] and [`Store::multi_get()`] for writing and reading
//!   rows of several containers in one request
//! - [`RowSet`] iteration over rows, aggregation results and query plans
//! - [`PartitionController`] for inspecting how containers are partitioned
//!
//! The library is synchronous. Every call is a blocking request/response
//! exchange with the request layer, and nothing is retried.
//!
//! ## Simple Example
//! The crate ships an in-memory request layer, [`MemoryClient`], which the
//! shared [`StoreFactory`] connects to by default:
//! ```
//! use griddb_rust_client::{ColumnInfo, ContainerInfo, Field, GridType, Row};
//! use griddb_rust_client::{StoreConfig, StoreFactory};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::new().cluster_name("example")?;
//! let mut store = StoreFactory::get_instance().get_store(&config)?;
//!
//! let info = ContainerInfo::new("people")
//!     .column(ColumnInfo::new("id", GridType::Long))
//!     .column(ColumnInfo::new("name", GridType::String))
//!     .column(ColumnInfo::new("age", GridType::Integer))
//!     .row_key(true);
//! let people = store.put_container(&info, false)?;
//!
//! // an INTEGER field is widened for the LONG key column
//! people.put(&Row::new().integer(1).string("jane").integer(31))?;
//! let row = people.get_row(&Field::Long(1))?.ok_or("missing")?;
//! assert_eq!(row.get_string(1), Some("jane"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Batch I/O
//! [`Store::multi_put()`] checks every row against its container's schema
//! before anything is sent, and sends a single request. [`Store::multi_get()`]
//! takes one [`RowKeyPredicate`] per container; the request layer may return
//! containers in any order and leave out containers with no matching rows, so
//! the result carries a mapping back to the request. See [`MultiGetResult`].
//!
//! ## Structs as rows
//! With the `GridRow` derive macro, plain structs can be written and read
//! directly. Fields map to columns by name:
//! ```
//! use griddb_rust_client::{ColumnInfo, ContainerInfo, Field, GridRow, GridType, MemoryClient, Store};
//! use std::sync::Arc;
//!
//! #[derive(Default, Debug, GridRow)]
//! struct Person {
//!     id: i64,
//!     #[griddb(column = name)]
//!     full_name: String,
//! }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = Store::new(Arc::new(MemoryClient::new()));
//! let info = ContainerInfo::new("people")
//!     .column(ColumnInfo::new("name", GridType::String))
//!     .column(ColumnInfo::new("id", GridType::Long));
//! let people = store.put_container(&info, false)?;
//! people.put_struct(&Person { id: 7, full_name: "ada".to_string() })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//! Connection settings are collected in a [`StoreConfig`], from an INI-style
//! file, `GRIDDB_*` environment variables, and code. See [`StoreConfig`] for
//! the file format.
//!
//! ## Logging
//! The library logs through [`tracing`](https://crates.io/crates/tracing):
//! connection and container lifecycle at `debug`, per-row marshalling at
//! `trace`, and errors swallowed while closing at `warn`.
//!
//! ## Errors
//! Every fallible call returns a [`GridError`]. Errors raised by the request
//! layer keep its error frames, available through
//! [`GridError::error_stack_size()`] and friends.

// allow the derive macro to refer to this crate by name from inside it
extern crate self as griddb_rust_client;

pub(crate) mod aggregation_result;
pub use crate::aggregation_result::AggregationResult;

pub(crate) mod client;
pub use crate::client::{
    AggregationValue, Allocation, ContainerHandle, ContainerRows, ContainerRowsEntry, GridClient,
    Lease, QueryHandle, RowKey, RowKeyPredicateEntry, RowSetHandle,
};

pub(crate) mod container;
pub use crate::container::Container;

pub(crate) mod container_info;
pub use crate::container_info::{ColumnInfo, ContainerInfo, ExpirationInfo, TimeSeriesProperties};

pub(crate) mod error;
pub use crate::error::{ErrorFrame, GridError, GridErrorCode, RequestError};

pub(crate) mod memory;
pub use crate::memory::{MemoryClient, MemoryCluster, ResponseOrder};

pub(crate) mod partition_controller;
pub use crate::partition_controller::PartitionController;

pub(crate) mod query;
pub use crate::query::Query;

pub(crate) mod query_analysis_entry;
pub use crate::query_analysis_entry::QueryAnalysisEntry;

pub(crate) mod row;
pub use crate::row::Row;

pub(crate) mod row_key_predicate;
pub use crate::row_key_predicate::RowKeyPredicate;

pub(crate) mod row_set;
pub use crate::row_set::{QueryResult, RowSet};

#[cfg(test)]
pub(crate) mod row_tests;

pub(crate) mod store;
pub use crate::store::{MultiGetEntry, MultiGetResult, Store};

pub(crate) mod store_config;
pub use crate::store_config::{Consistency, StoreConfig};

pub(crate) mod store_factory;
pub use crate::store_factory::{Connector, MemoryConnector, StoreFactory};

pub mod types;
pub use crate::types::{
    ContainerType, FetchOption, Field, GridBlob, GridColumnFromField, GridColumnToField,
    GridRow, GridType, IndexTypeFlags, RowSetType, TimeUnit, TypeOption,
};

pub(crate) mod wire;
pub use crate::wire::{ColumnTypes, SchemaView, WireColumn, WireRef, WireRow};
