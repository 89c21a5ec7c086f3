//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{ContainerRows, ContainerRowsEntry, GridClient, RowKeyPredicateEntry};
use crate::container::Container;
use crate::container_info::ContainerInfo;
use crate::error::GridErrorCode::{
    BadProtocolMessage, ContainerNotFound, IllegalState, WrongRowKeyType,
};
use crate::error::GridError;
use crate::error::{grid_err, ia_err};
use crate::partition_controller::PartitionController;
use crate::query::Query;
use crate::row::Row;
use crate::row_key_predicate::RowKeyPredicate;
use crate::types::GridType;
use crate::wire::{ColumnTypes, WireRow};

/// Rows returned for one container by [`Store::multi_get()`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiGetEntry {
    pub container_name: String,
    pub rows: Vec<Row>,
}

/// Result of [`Store::multi_get()`].
///
/// `entries` is in the order the request layer returned them, which need not
/// match the request. `order[i]` is the index in `entries` of the container
/// named by request entry `i`, or `None` if no rows were returned for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiGetResult {
    pub entries: Vec<MultiGetEntry>,
    pub order: Vec<Option<usize>>,
}

impl MultiGetResult {
    /// Rows for request entry `index`. Empty if nothing matched.
    pub fn rows_for(&self, index: usize) -> &[Row] {
        match self.order.get(index).copied().flatten() {
            Some(i) => self.entries.get(i).map(|e| e.rows.as_slice()).unwrap_or(&[]),
            None => &[],
        }
    }

    /// Rows returned for the named container.
    pub fn get(&self, container_name: &str) -> Option<&[Row]> {
        self.entries
            .iter()
            .find(|e| e.container_name == container_name)
            .map(|e| e.rows.as_slice())
    }
}

/// A connection to a store, and the registry of the containers opened
/// through it.
///
/// Containers are owned by the store and lent out as `&mut Container`.
/// Opening a container that is already registered returns the registered
/// instance. Closing the store closes every registered container.
///
/// Stores are normally obtained from [`StoreFactory`](crate::StoreFactory).
/// [`Store::new()`] wraps any request layer directly:
/// ```
/// use griddb_rust_client::{MemoryClient, Store};
/// use std::sync::Arc;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = Store::new(Arc::new(MemoryClient::new()));
/// assert!(store.get_container("missing")?.is_none());
/// store.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Store {
    client: Arc<dyn GridClient>,
    containers: HashMap<String, Container>,
    closed: bool,
}

impl Store {
    pub fn new(client: Arc<dyn GridClient>) -> Store {
        debug!("opened store");
        Store {
            client,
            containers: HashMap::new(),
            closed: false,
        }
    }

    fn check_open(&self) -> Result<(), GridError> {
        if self.closed {
            return grid_err!(IllegalState, "store is closed");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of containers currently in the registry.
    pub fn open_container_count(&self) -> usize {
        self.containers.len()
    }

    /// Create a container, or open it if it exists with the same schema.
    ///
    /// With `modifiable`, an existing container is altered to the given
    /// schema. The container is (re)registered under `info`'s name and a
    /// previously registered instance is closed.
    pub fn put_container(
        &mut self,
        info: &ContainerInfo,
        modifiable: bool,
    ) -> Result<&mut Container, GridError> {
        self.check_open()?;
        info.validate()?;
        let (h, actual) = self.client.put_container(info, modifiable)?;
        let container = Container::open(self.client.clone(), h, actual)?;
        match self.containers.entry(info.name.clone()) {
            Entry::Occupied(mut o) => {
                let mut old = o.insert(container);
                if let Err(e) = old.close() {
                    warn!("error closing replaced container {}: {}", info.name, e);
                }
                Ok(o.into_mut())
            }
            Entry::Vacant(v) => Ok(v.insert(container)),
        }
    }

    /// Open an existing container. Returns `None` if there is none with
    /// this name. A registered container that was closed is replaced by a
    /// newly opened one.
    pub fn get_container(&mut self, name: &str) -> Result<Option<&mut Container>, GridError> {
        self.check_open()?;
        match self.containers.get(name).map(|c| c.is_closed()) {
            Some(false) => return Ok(self.containers.get_mut(name)),
            // closed through a lent reference: reopen
            Some(true) => {
                self.containers.remove(name);
                debug!("evicted closed container {}", name);
            }
            None => (),
        }
        let (h, info) = match self.client.get_container(name)? {
            Some(found) => found,
            None => return Ok(None),
        };
        let container = Container::open(self.client.clone(), h, info)?;
        Ok(Some(
            self.containers.entry(name.to_string()).or_insert(container),
        ))
    }

    fn resolve(&mut self, name: &str) -> Result<&mut Container, GridError> {
        match self.get_container(name)? {
            Some(c) => Ok(c),
            None => grid_err!(ContainerNotFound, "container {} not found", name),
        }
    }

    /// Delete a container and everything in it. Its registered instance, if
    /// any, is closed first.
    pub fn drop_container(&mut self, name: &str) -> Result<(), GridError> {
        self.check_open()?;
        if let Some(mut c) = self.containers.remove(name) {
            c.close()?;
        }
        self.client.drop_container(name)?;
        debug!("dropped container {}", name);
        Ok(())
    }

    pub fn get_container_info(&self, name: &str) -> Result<Option<ContainerInfo>, GridError> {
        self.check_open()?;
        Ok(self.client.get_container_info(name)?)
    }

    pub fn create_row_key_predicate(&self, key_type: GridType) -> Result<RowKeyPredicate, GridError> {
        self.check_open()?;
        RowKeyPredicate::new(key_type)
    }

    pub fn partition_info(&self) -> Result<PartitionController, GridError> {
        self.check_open()?;
        Ok(PartitionController::new(self.client.clone()))
    }

    /// Execute several queries in one request. Each query's results are then
    /// available from [`Query::get_row_set()`].
    pub fn fetch_all(&mut self, queries: &[&Query]) -> Result<(), GridError> {
        self.check_open()?;
        let mut handles = Vec::new();
        handles.try_reserve_exact(queries.len())?;
        for q in queries {
            handles.push(q.handle()?);
        }
        self.client.fetch_all(&handles)?;
        debug!("fetched {} queries", handles.len());
        Ok(())
    }

    fn check_unique(names: &[&str]) -> Result<(), GridError> {
        for (i, n) in names.iter().enumerate() {
            if names[..i].contains(n) {
                return ia_err!("container {} appears more than once in the request", n);
            }
        }
        Ok(())
    }

    /// Write rows into several containers in one request.
    ///
    /// Every row is checked against its container's schema before anything
    /// is sent. Each row is marshalled into its own wire row; all of them are
    /// released when this returns, whether or not it succeeded.
    pub fn multi_put(&mut self, entries: &[(&str, &[Row])]) -> Result<(), GridError> {
        self.check_open()?;
        let names: Vec<&str> = entries.iter().map(|(n, _)| *n).collect();
        Store::check_unique(&names)?;

        let mut batches: Vec<Vec<WireRow>> = Vec::new();
        batches.try_reserve_exact(entries.len())?;
        let mut total = 0;
        for (name, rows) in entries {
            let c = self.resolve(name)?;
            let h = c.handle()?;
            let info = c.info_arc();
            let mut batch = Vec::new();
            batch.try_reserve_exact(rows.len())?;
            for row in rows.iter() {
                let mut w = self.client.create_row(h)?;
                row.to_wire(&mut w, Some(&*info))?;
                batch.push(w);
            }
            total += batch.len();
            batches.push(batch);
        }

        let mut request = Vec::new();
        request.try_reserve_exact(entries.len())?;
        for ((name, _), batch) in entries.iter().zip(batches.iter()) {
            if batch.is_empty() {
                continue;
            }
            request.push(ContainerRowsEntry {
                container_name: *name,
                rows: batch.iter().collect(),
            });
        }
        if request.is_empty() {
            return Ok(());
        }
        self.client.put_multiple_container_rows(&request)?;
        debug!("multi_put {} rows into {} containers", total, request.len());
        Ok(())
    }

    /// Read rows from several containers in one request.
    ///
    /// Every container is resolved, and its predicate checked against the
    /// container's row key type, before the request is sent. See
    /// [`MultiGetResult`] for how results map back to the request.
    pub fn multi_get(
        &mut self,
        entries: &[(&str, &RowKeyPredicate)],
    ) -> Result<MultiGetResult, GridError> {
        self.check_open()?;
        if entries.is_empty() {
            return Ok(MultiGetResult::default());
        }
        let names: Vec<&str> = entries.iter().map(|(n, _)| *n).collect();
        Store::check_unique(&names)?;

        let mut types: Vec<ColumnTypes> = Vec::new();
        types.try_reserve_exact(entries.len())?;
        for (name, predicate) in entries {
            let info = self.resolve(name)?.info_arc();
            match info.row_key_type() {
                Some(t) if t == predicate.get_key_type() => (),
                Some(t) => {
                    return grid_err!(
                        WrongRowKeyType,
                        "wrong type of rowKey: container {} has a {} key, predicate is {}",
                        name,
                        t,
                        predicate.get_key_type()
                    )
                }
                None => return ia_err!("container {} has no row key", name),
            }
            types.push(ColumnTypes::build(&*self.client, &*info)?);
        }

        let request: Vec<RowKeyPredicateEntry> = entries
            .iter()
            .map(|(name, predicate)| RowKeyPredicateEntry {
                container_name: *name,
                predicate: *predicate,
            })
            .collect();
        let response = self.client.get_multiple_container_rows(&request)?;

        let mut result = MultiGetResult::default();
        result.entries.try_reserve_exact(response.len())?;
        for ContainerRows {
            container_name,
            rows: wires,
        } in response
        {
            let idx = match names.iter().position(|n| *n == container_name) {
                Some(i) => i,
                None => {
                    return grid_err!(
                        BadProtocolMessage,
                        "response names container {} which was not requested",
                        container_name
                    )
                }
            };
            if result
                .entries
                .iter()
                .any(|e| e.container_name == container_name)
            {
                return grid_err!(
                    BadProtocolMessage,
                    "response names container {} more than once",
                    container_name
                );
            }
            let mut rows = Vec::new();
            rows.try_reserve_exact(wires.len())?;
            for w in wires {
                let mut row = Row::new();
                row.from_wire_as(&w, &types[idx])?;
                rows.push(row);
            }
            result.entries.push(MultiGetEntry {
                container_name,
                rows,
            });
        }
        result.order = names
            .iter()
            .map(|n| result.entries.iter().position(|e| e.container_name == *n))
            .collect();
        debug!(
            "multi_get from {} containers returned {} entries",
            entries.len(),
            result.entries.len()
        );
        Ok(result)
    }

    /// Close every registered container and the connection. Closing twice
    /// is a no-op. The first error encountered is returned after everything
    /// has been closed.
    pub fn close(&mut self) -> Result<(), GridError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut first: Option<GridError> = None;
        for (name, mut c) in self.containers.drain() {
            if let Err(e) = c.close() {
                warn!("error closing container {}: {}", name, e);
                first.get_or_insert(e);
            }
        }
        if let Err(e) = self.client.close() {
            first.get_or_insert(e.into());
        }
        debug!("closed store");
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error closing store: {}", e);
        }
    }
}
