//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::sync::Arc;
use tracing::{trace, warn};

use crate::aggregation_result::AggregationResult;
use crate::client::{GridClient, RowSetHandle};
use crate::container_info::ContainerInfo;
use crate::error::GridErrorCode::IllegalState;
use crate::error::grid_err;
use crate::error::GridError;
use crate::query_analysis_entry::QueryAnalysisEntry;
use crate::row::Row;
use crate::types::RowSetType;
use crate::wire::{ColumnTypes, WireRow};

/// One result produced by [`RowSet::next()`].
#[derive(Debug, Clone)]
pub enum QueryResult {
    Row(Row),
    Aggregation(AggregationResult),
    Analysis(QueryAnalysisEntry),
}

/// Cursor over the results of a fetched [`Query`](crate::Query).
///
/// What a row set contains is fixed when it is created, see
/// [`RowSet::row_set_type()`]:
///
///  - [`RowSetType::ContainerRows`]: rows of the queried container. The
///    cursor may update or remove the row it is positioned on.
///  - [`RowSetType::AggregationResult`]: a single aggregate value.
///  - [`RowSetType::QueryAnalysis`]: the plan entries of an `EXPLAIN` query.
///
/// The row set borrows the schema and scratch row of its query.
#[derive(Debug)]
pub struct RowSet<'q> {
    client: Arc<dyn GridClient>,
    handle: Option<RowSetHandle>,
    kind: RowSetType,
    info: &'q ContainerInfo,
    row: &'q mut WireRow,
    types: Option<ColumnTypes>,
    positioned: bool,
    exhausted: bool,
    pending: Option<QueryAnalysisEntry>,
}

impl<'q> RowSet<'q> {
    pub(crate) fn open(
        client: Arc<dyn GridClient>,
        handle: RowSetHandle,
        info: &'q ContainerInfo,
        row: &'q mut WireRow,
    ) -> Result<RowSet<'q>, GridError> {
        let kind = match client.row_set_type(handle) {
            Ok(k) => k,
            Err(e) => {
                if let Err(ce) = client.close_row_set(handle) {
                    warn!("error closing row set on {}: {}", info.name, ce);
                }
                return Err(e.into());
            }
        };
        trace!("opened {:?} row set on {}", kind, info.name);
        Ok(RowSet {
            client,
            handle: Some(handle),
            kind,
            info,
            row,
            types: None,
            positioned: false,
            exhausted: false,
            pending: None,
        })
    }

    fn handle(&self) -> Result<RowSetHandle, GridError> {
        match self.handle {
            Some(h) => Ok(h),
            None => grid_err!(IllegalState, "row set on {} is closed", self.info.name),
        }
    }

    pub fn row_set_type(&self) -> RowSetType {
        self.kind
    }

    /// Number of results in the row set.
    pub fn size(&self) -> Result<i32, GridError> {
        let h = self.handle()?;
        Ok(self.client.row_set_size(h)?)
    }

    /// Names of the columns of the rows this row set returns.
    pub fn column_names(&self) -> Vec<String> {
        self.info.column_names()
    }

    /// Returns true if [`RowSet::next()`] would produce another result.
    pub fn has_next(&mut self) -> Result<bool, GridError> {
        let h = self.handle()?;
        match self.kind {
            RowSetType::ContainerRows | RowSetType::AggregationResult => {
                Ok(self.client.has_next_row(h)?)
            }
            RowSetType::QueryAnalysis => {
                if self.pending.is_none() && !self.exhausted {
                    self.pending = self.client.next_query_analysis(h)?;
                    self.exhausted = self.pending.is_none();
                }
                Ok(self.pending.is_some())
            }
        }
    }

    /// Advance to and return the next result, or `None` past the end.
    pub fn next(&mut self) -> Result<Option<QueryResult>, GridError> {
        if !self.has_next()? {
            self.positioned = false;
            return Ok(None);
        }
        let h = self.handle()?;
        match self.kind {
            RowSetType::ContainerRows => {
                self.client.next_row(h, self.row)?;
                self.positioned = true;
                let mut row = Row::new();
                row.from_wire(self.row)?;
                Ok(Some(QueryResult::Row(row)))
            }
            RowSetType::AggregationResult => {
                let value = self.client.next_aggregation(h)?;
                Ok(Some(QueryResult::Aggregation(AggregationResult { value })))
            }
            RowSetType::QueryAnalysis => Ok(self.pending.take().map(QueryResult::Analysis)),
        }
    }

    /// Read the next row into `row`. Returns false past the end.
    ///
    /// Only valid on a [`RowSetType::ContainerRows`] row set.
    pub fn next_row(&mut self, row: &mut Row) -> Result<bool, GridError> {
        self.require_rows("next_row")?;
        let h = self.handle()?;
        if !self.client.has_next_row(h)? {
            self.positioned = false;
            return Ok(false);
        }
        self.client.next_row(h, self.row)?;
        self.positioned = true;
        row.from_wire(self.row)?;
        Ok(true)
    }

    /// Replace the row at the cursor position with `row`.
    pub fn update(&mut self, row: &Row) -> Result<(), GridError> {
        self.require_position("update")?;
        let h = self.handle()?;
        if self.types.is_none() {
            self.types = Some(ColumnTypes::build(&*self.client, self.info)?);
        }
        if let Some(types) = &self.types {
            row.to_wire(self.row, Some(types))?;
        }
        self.client.update_current_row(h, self.row)?;
        trace!("updated current row of {}", self.info.name);
        Ok(())
    }

    /// Delete the row at the cursor position.
    pub fn remove(&mut self) -> Result<(), GridError> {
        self.require_position("remove")?;
        let h = self.handle()?;
        self.client.delete_current_row(h)?;
        trace!("removed current row of {}", self.info.name);
        Ok(())
    }

    fn require_rows(&self, op: &str) -> Result<(), GridError> {
        if self.kind != RowSetType::ContainerRows {
            return grid_err!(
                IllegalState,
                "{} is not supported on a {:?} row set",
                op,
                self.kind
            );
        }
        Ok(())
    }

    fn require_position(&self, op: &str) -> Result<(), GridError> {
        self.require_rows(op)?;
        if !self.positioned {
            return grid_err!(IllegalState, "{} needs a current row", op);
        }
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), GridError> {
        if let Some(h) = self.handle.take() {
            self.types = None;
            self.client.close_row_set(h)?;
        }
        Ok(())
    }
}

impl Drop for RowSet<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error closing row set on {}: {}", self.info.name, e);
        }
    }
}
