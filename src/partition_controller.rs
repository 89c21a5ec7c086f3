//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::sync::Arc;

use crate::client::GridClient;
use crate::error::ia_err;
use crate::error::GridError;

/// Read-only view of how containers are spread over the store's partitions.
///
/// Obtained from [`Store::partition_info()`](crate::Store::partition_info).
#[derive(Debug, Clone)]
pub struct PartitionController {
    client: Arc<dyn GridClient>,
}

impl PartitionController {
    pub(crate) fn new(client: Arc<dyn GridClient>) -> PartitionController {
        PartitionController { client }
    }

    pub fn get_partition_count(&self) -> Result<i32, GridError> {
        Ok(self.client.partition_count()?)
    }

    pub fn get_container_count(&self, partition: i32) -> Result<i64, GridError> {
        self.check_partition(partition)?;
        Ok(self.client.partition_container_count(partition)?)
    }

    /// Names of the containers in `partition`, skipping the first `start`.
    /// A negative `limit` returns all remaining names.
    pub fn get_container_names(
        &self,
        partition: i32,
        start: i64,
        limit: i64,
    ) -> Result<Vec<String>, GridError> {
        self.check_partition(partition)?;
        if start < 0 {
            return ia_err!("start offset must not be negative, got {}", start);
        }
        let limit = if limit < 0 { None } else { Some(limit) };
        Ok(self
            .client
            .partition_container_names(partition, start, limit)?)
    }

    pub fn get_partition_index_of_container(&self, name: &str) -> Result<i32, GridError> {
        if name.is_empty() {
            return ia_err!("container name must be non-empty");
        }
        Ok(self.client.partition_index_of_container(name)?)
    }

    fn check_partition(&self, partition: i32) -> Result<(), GridError> {
        let count = self.client.partition_count()?;
        if partition < 0 || partition >= count {
            return ia_err!(
                "partition index {} out of range, store has {} partitions",
                partition,
                count
            );
        }
        Ok(())
    }
}
