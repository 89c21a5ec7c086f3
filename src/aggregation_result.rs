//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use chrono::DateTime;

use crate::client::AggregationValue;
use crate::error::grid_err;
use crate::error::GridError;
use crate::error::GridErrorCode::{IncorrectColumnType, Unsupported};
use crate::types::{Field, GridType};

/// The scalar produced by an aggregation query such as `SELECT MAX(value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub(crate) value: AggregationValue,
}

impl AggregationResult {
    /// Get the value as a field of type `as_type`.
    ///
    /// Only DOUBLE, LONG and TIMESTAMP are supported. A LONG result can also
    /// be read as DOUBLE; other mismatches fail with
    /// [`IncorrectColumnType`](crate::GridErrorCode::IncorrectColumnType).
    pub fn get(&self, as_type: GridType) -> Result<Field, GridError> {
        match (as_type, self.value) {
            (GridType::Double, AggregationValue::Double(d)) => Ok(Field::Double(d)),
            (GridType::Double, AggregationValue::Long(l)) => Ok(Field::Double(l as f64)),
            (GridType::Long, AggregationValue::Long(l)) => Ok(Field::Long(l)),
            (GridType::Timestamp, AggregationValue::Timestamp(ms)) => {
                match DateTime::from_timestamp_millis(ms) {
                    Some(t) => Ok(Field::Timestamp(t)),
                    None => grid_err!(IncorrectColumnType, "timestamp {} is out of range", ms),
                }
            }
            (GridType::Double | GridType::Long | GridType::Timestamp, v) => grid_err!(
                IncorrectColumnType,
                "value cannot be retrieved from aggregation result as {}: {:?}",
                as_type,
                v
            ),
            _ => grid_err!(
                Unsupported,
                "not supported type for aggregation result: {}",
                as_type
            ),
        }
    }

    pub fn value(&self) -> AggregationValue {
        self.value
    }
}
