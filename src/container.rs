//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::client::{ContainerHandle, GridClient};
use crate::container_info::ContainerInfo;
use crate::error::GridErrorCode::IllegalState;
use crate::error::{grid_err, ia_err, ia_error};
use crate::error::GridError;
use crate::query::Query;
use crate::row::Row;
use crate::row_key_predicate::row_key_from_field;
use crate::types::{ContainerType, Field, GridRow, GridType, IndexTypeFlags};
use crate::wire::{ColumnTypes, SchemaView, WireRow};

/// An open container: a collection or time series in the store.
///
/// A `Container` is obtained from, and owned by, a [`Store`](crate::Store).
/// It keeps a private copy of the container's schema taken when it was
/// opened, and one scratch wire row reused by every single-row operation.
/// Single-row operations therefore take `&mut self`: only one of them can
/// use the scratch row at a time.
///
/// Example:
/// ```
/// use griddb_rust_client::{ColumnInfo, ContainerInfo, Field, GridType, Row, Store};
/// # use griddb_rust_client::MemoryClient;
/// # use std::sync::Arc;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let mut store = Store::new(Arc::new(MemoryClient::new()));
/// let info = ContainerInfo::new("people")
///     .column(ColumnInfo::new("id", GridType::Long))
///     .column(ColumnInfo::new("name", GridType::String))
///     .row_key(true);
/// let people = store.put_container(&info, false)?;
/// people.put(&Row::new().long(1).string("jane"))?;
/// let row = people.get_row(&Field::Long(1))?.ok_or("no row")?;
/// assert_eq!(row.get_string(1), Some("jane"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Container {
    client: Arc<dyn GridClient>,
    handle: Option<ContainerHandle>,
    info: Arc<ContainerInfo>,
    row: WireRow,
    types: Option<Arc<ColumnTypes>>,
}

impl Container {
    pub(crate) fn open(
        client: Arc<dyn GridClient>,
        handle: ContainerHandle,
        info: ContainerInfo,
    ) -> Result<Container, GridError> {
        let row = match client.create_row(handle) {
            Ok(r) => r,
            Err(e) => {
                if let Err(ce) = client.close_container(handle) {
                    warn!("error closing container {}: {}", info.name, ce);
                }
                return Err(e.into());
            }
        };
        debug!(
            "opened container {} ({} columns)",
            info.name,
            info.column_count()
        );
        Ok(Container {
            client,
            handle: Some(handle),
            info: Arc::new(info),
            row,
            types: None,
        })
    }

    pub(crate) fn handle(&self) -> Result<ContainerHandle, GridError> {
        match self.handle {
            Some(h) => Ok(h),
            None => grid_err!(IllegalState, "container {} is closed", self.info.name),
        }
    }

    pub(crate) fn info_arc(&self) -> Arc<ContainerInfo> {
        self.info.clone()
    }

    /// The schema this container was opened with.
    pub fn get_info(&self) -> &ContainerInfo {
        &self.info
    }

    pub fn get_name(&self) -> &str {
        &self.info.name
    }

    pub fn get_type(&self) -> ContainerType {
        self.info.container_type
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Position of the named column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.info.column_index(name)
    }

    /// The container's per-column type vector, built on first use.
    pub fn column_types(&mut self) -> Result<Arc<ColumnTypes>, GridError> {
        if let Some(t) = &self.types {
            return Ok(t.clone());
        }
        let t = Arc::new(ColumnTypes::build(&*self.client, &*self.info)?);
        self.types = Some(t.clone());
        Ok(t)
    }

    fn key_type(&self) -> Result<GridType, GridError> {
        match self.info.row_key_type() {
            Some(t) => Ok(t),
            None => ia_err!("container {} has no row key", self.info.name),
        }
    }

    /// Read the row with row key `key` into `row`.
    ///
    /// Returns false, leaving `row` untouched, if there is no such row. The
    /// key type is checked against the container's row key column before
    /// any request is made; see [`Container::remove()`] for the rules.
    pub fn get(&mut self, key: &Field, row: &mut Row) -> Result<bool, GridError> {
        let h = self.handle()?;
        let key = row_key_from_field(self.key_type()?, key)?;
        let found = self.client.get_row(h, &key, &mut self.row, false)?;
        if found {
            row.from_wire(&self.row)?;
        }
        trace!("get {:?} from {}: found={}", key, self.info.name, found);
        Ok(found)
    }

    /// Convenience form of [`Container::get()`] returning a new row.
    pub fn get_row(&mut self, key: &Field) -> Result<Option<Row>, GridError> {
        let mut row = Row::new();
        if self.get(key, &mut row)? {
            return Ok(Some(row));
        }
        Ok(None)
    }

    /// Write `row`, replacing any row with the same row key.
    ///
    /// `row` must have exactly one field per column. Returns true if a row
    /// with the same key existed.
    pub fn put(&mut self, row: &Row) -> Result<bool, GridError> {
        let h = self.handle()?;
        let types = self.column_types()?;
        row.to_wire(&mut self.row, Some(&*types))?;
        let existed = self.client.put_row(h, &self.row)?;
        trace!("put into {}: existed={}", self.info.name, existed);
        Ok(existed)
    }

    /// Delete the row with row key `key`. Returns true if it existed.
    ///
    /// Key fields are accepted by key column type as follows: STRING for
    /// STRING, INTEGER for INTEGER, INTEGER or LONG for LONG, TIMESTAMP for
    /// TIMESTAMP. Any other combination fails with
    /// [`WrongRowKeyType`](crate::GridErrorCode::WrongRowKeyType) before a
    /// request is made. A NULL key is rejected; use
    /// [`RowSet::remove()`](crate::RowSet::remove) to delete the row at a
    /// cursor position.
    pub fn remove(&mut self, key: &Field) -> Result<bool, GridError> {
        let h = self.handle()?;
        if key.is_null() {
            return ia_err!(
                "NULL row key not accepted for remove on {}; use RowSet::remove() to delete at a cursor",
                self.info.name
            );
        }
        let key = row_key_from_field(self.key_type()?, key)?;
        let existed = self.client.delete_row(h, &key)?;
        trace!("remove {:?} from {}: existed={}", key, self.info.name, existed);
        Ok(existed)
    }

    /// Write many rows in one request.
    ///
    /// Each row is marshalled into its own wire row, not the scratch row.
    /// All of them are released when this returns, whether or not the
    /// request succeeded.
    pub fn multi_put(&mut self, rows: &[Row]) -> Result<(), GridError> {
        let h = self.handle()?;
        if rows.is_empty() {
            return Ok(());
        }
        let mut wires: Vec<WireRow> = Vec::new();
        wires.try_reserve_exact(rows.len())?;
        for row in rows {
            let mut w = self.client.create_row(h)?;
            row.to_wire(&mut w, Some(&*self.info))?;
            wires.push(w);
        }
        let refs: Vec<&WireRow> = wires.iter().collect();
        self.client.put_multiple_rows(h, &refs)?;
        debug!("put {} rows into {}", rows.len(), self.info.name);
        Ok(())
    }

    /// Write a native struct as a row. Struct fields are matched to columns
    /// by name.
    pub fn put_struct<T: GridRow>(&mut self, value: &T) -> Result<bool, GridError> {
        let names = T::column_names();
        let mut src = value.to_row()?;
        if self.names_in_order(&names) {
            return self.put(&src);
        }
        let mut row = Row::with_count(self.info.column_count());
        for (i, name) in names.iter().enumerate() {
            let idx = match self.info.column_index(name) {
                Some(idx) => idx,
                None => {
                    return Err(ia_error!(
                        "field {} has no column in container {}",
                        name,
                        self.info.name
                    ))
                }
            };
            if let Some(f) = src.take(i) {
                row.fields[idx] = f;
            }
        }
        self.put(&row)
    }

    /// Read the row with row key `key` into a new native struct.
    pub fn get_struct<T: GridRow + Default>(&mut self, key: &Field) -> Result<Option<T>, GridError> {
        let mut row = match self.get_row(key)? {
            Some(r) => r,
            None => return Ok(None),
        };
        let names = T::column_names();
        if !self.names_in_order(&names) {
            let mut ordered = Row::new();
            for name in &names {
                match self.info.column_index(name) {
                    Some(idx) => ordered.put(row.take(idx).unwrap_or_default()),
                    None => {
                        return ia_err!(
                            "field {} has no column in container {}",
                            name,
                            self.info.name
                        )
                    }
                }
            }
            row = ordered;
        }
        let mut value = T::default();
        value.from_row(&row)?;
        Ok(Some(value))
    }

    fn names_in_order(&self, names: &[&str]) -> bool {
        names.len() == self.info.columns.len()
            && names
                .iter()
                .zip(self.info.columns.iter())
                .all(|(n, c)| c.name.eq_ignore_ascii_case(n))
    }

    pub fn create_index(
        &mut self,
        column: &str,
        flags: IndexTypeFlags,
        name: Option<&str>,
    ) -> Result<(), GridError> {
        let h = self.handle()?;
        self.client.create_index(h, column, flags, name)?;
        debug!("created index on {}.{}", self.info.name, column);
        Ok(())
    }

    pub fn drop_index(
        &mut self,
        column: &str,
        flags: IndexTypeFlags,
        name: Option<&str>,
    ) -> Result<(), GridError> {
        let h = self.handle()?;
        self.client.drop_index(h, column, flags, name)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), GridError> {
        let h = self.handle()?;
        Ok(self.client.flush(h)?)
    }

    /// Enable or disable auto-commit. With auto-commit disabled, writes
    /// become visible to other containers only after [`Container::commit()`].
    pub fn set_auto_commit(&mut self, enabled: bool) -> Result<(), GridError> {
        let h = self.handle()?;
        Ok(self.client.set_auto_commit(h, enabled)?)
    }

    pub fn commit(&mut self) -> Result<(), GridError> {
        let h = self.handle()?;
        Ok(self.client.commit(h)?)
    }

    pub fn abort(&mut self) -> Result<(), GridError> {
        let h = self.handle()?;
        Ok(self.client.abort(h)?)
    }

    /// Create a query from a TQL statement.
    pub fn query(&mut self, tql: &str) -> Result<Query, GridError> {
        let h = self.handle()?;
        let qh = self.client.query(h, tql)?;
        let row = match self.client.create_row(h) {
            Ok(r) => r,
            Err(e) => {
                if let Err(ce) = self.client.close_query(qh) {
                    warn!("error closing query: {}", ce);
                }
                return Err(e.into());
            }
        };
        Ok(Query::new(self.client.clone(), qh, self.info.clone(), row))
    }

    /// Close the container. Further operations on it fail with
    /// [`IllegalState`](crate::GridErrorCode::IllegalState). Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), GridError> {
        if let Some(h) = self.handle.take() {
            self.types = None;
            self.client.close_container(h)?;
            debug!("closed container {}", self.info.name);
        }
        Ok(())
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error closing container {}: {}", self.info.name, e);
        }
    }
}
