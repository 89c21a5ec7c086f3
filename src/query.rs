//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{GridClient, QueryHandle};
use crate::container_info::ContainerInfo;
use crate::error::GridErrorCode::IllegalState;
use crate::error::GridError;
use crate::error::{grid_err, ia_err};
use crate::row_set::RowSet;
use crate::types::{FetchOption, Field};
use crate::wire::WireRow;

/// A TQL query created by [`Container::query()`](crate::Container::query).
///
/// A query keeps its own copy of the container's schema and its own scratch
/// row, so it stays usable independently of the container it came from.
/// The [`RowSet`] returned by [`Query::fetch()`] borrows both, so at most one
/// row set per query is open at a time.
#[derive(Debug)]
pub struct Query {
    client: Arc<dyn GridClient>,
    handle: Option<QueryHandle>,
    info: Arc<ContainerInfo>,
    row: WireRow,
    limit: Option<i64>,
    partial: bool,
}

impl Query {
    pub(crate) fn new(
        client: Arc<dyn GridClient>,
        handle: QueryHandle,
        info: Arc<ContainerInfo>,
        row: WireRow,
    ) -> Query {
        Query {
            client,
            handle: Some(handle),
            info,
            row,
            limit: None,
            partial: false,
        }
    }

    pub(crate) fn handle(&self) -> Result<QueryHandle, GridError> {
        match self.handle {
            Some(h) => Ok(h),
            None => grid_err!(IllegalState, "query on {} is closed", self.info.name),
        }
    }

    /// Set the maximum number of rows to fetch, and whether partial
    /// execution is allowed. A negative `limit` means no limit.
    pub fn set_fetch_options(&mut self, limit: i64, partial: bool) -> Result<(), GridError> {
        let h = self.handle()?;
        let limit = if limit < 0 { None } else { Some(limit) };
        self.client.set_fetch_options(h, limit, partial)?;
        self.limit = limit;
        self.partial = partial;
        Ok(())
    }

    /// Set a single fetch option. [`FetchOption::Limit`] takes an INTEGER or
    /// LONG value, [`FetchOption::PartialExecution`] a BOOL.
    pub fn set_fetch_option(&mut self, option: FetchOption, value: &Field) -> Result<(), GridError> {
        match (option, value) {
            (FetchOption::Limit, Field::Integer(_) | Field::Long(_)) => {
                let limit = value.as_i64()?;
                self.set_fetch_options(limit, self.partial)
            }
            (FetchOption::PartialExecution, Field::Bool(b)) => {
                let limit = self.limit.unwrap_or(-1);
                self.set_fetch_options(limit, *b)
            }
            _ => ia_err!(
                "invalid value type {} for fetch option {:?}",
                value.get_type(),
                option
            ),
        }
    }

    /// The row limit in effect, if any.
    pub fn get_limit(&self) -> Option<i64> {
        self.limit
    }

    /// Execute the query and return its results.
    ///
    /// With `for_update`, the rows returned are locked for update; this
    /// requires auto-commit to be disabled on the container.
    pub fn fetch(&mut self, for_update: bool) -> Result<RowSet<'_>, GridError> {
        let h = self.handle()?;
        let rs = self.client.fetch(h, for_update)?;
        RowSet::open(self.client.clone(), rs, &self.info, &mut self.row)
    }

    /// The row set produced for this query by
    /// [`Store::fetch_all()`](crate::Store::fetch_all), if any.
    pub fn get_row_set(&mut self) -> Result<Option<RowSet<'_>>, GridError> {
        let h = self.handle()?;
        match self.client.get_row_set(h)? {
            Some(rs) => Ok(Some(RowSet::open(
                self.client.clone(),
                rs,
                &self.info,
                &mut self.row,
            )?)),
            None => Ok(None),
        }
    }

    pub fn close(&mut self) -> Result<(), GridError> {
        if let Some(h) = self.handle.take() {
            self.client.close_query(h)?;
            debug!("closed query on {}", self.info.name);
        }
        Ok(())
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error closing query on {}: {}", self.info.name, e);
        }
    }
}
