//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use serde_derive::{Deserialize, Serialize};

use crate::error::ia_err;
use crate::error::GridError;
use crate::types::{ContainerType, GridType, IndexTypeFlags, TimeUnit, TypeOption};
use crate::wire::SchemaView;

/// Name, type and options of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: GridType,
    #[serde(default)]
    pub index_type_flags: IndexTypeFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<TypeOption>,
}

impl ColumnInfo {
    pub fn new(name: &str, column_type: GridType) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            column_type,
            index_type_flags: IndexTypeFlags::NONE,
            options: None,
        }
    }

    /// Explicitly mark the column as nullable or not null.
    ///
    /// If not set, the row key column is not null and all other columns are nullable.
    pub fn nullable(mut self, nullable: bool) -> ColumnInfo {
        self.options = Some(if nullable {
            TypeOption::Nullable
        } else {
            TypeOption::NotNull
        });
        self
    }

    /// Index to create on the column when the container is created.
    pub fn index(mut self, flags: IndexTypeFlags) -> ColumnInfo {
        self.index_type_flags = flags;
        self
    }
}

/// Row expiration settings of a time series container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationInfo {
    /// Elapsed time after which a row expires, in `unit`s.
    pub time: i32,
    pub unit: TimeUnit,
    /// Number of divisions of the expiration period; -1 means the store default.
    #[serde(default = "default_division_count")]
    pub division_count: i32,
}

fn default_division_count() -> i32 {
    -1
}

impl ExpirationInfo {
    pub fn new(time: i32, unit: TimeUnit, division_count: i32) -> ExpirationInfo {
        ExpirationInfo {
            time,
            unit,
            division_count,
        }
    }
}

/// Time-series properties of a container: its row expiration policy.
pub type TimeSeriesProperties = ExpirationInfo;

/// Schema of a container.
///
/// A `ContainerInfo` is a plain value owned by whoever created it. Opening a
/// container takes a copy, so later changes to a `ContainerInfo` never affect
/// containers that are already open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub(crate) name: String,
    #[serde(rename = "type", default)]
    pub(crate) container_type: ContainerType,
    pub(crate) columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub(crate) row_key_assigned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) expiration: Option<ExpirationInfo>,
}

impl ContainerInfo {
    pub fn new(name: &str) -> ContainerInfo {
        ContainerInfo {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Parse a schema from its JSON form, for example:
    /// ```text
    /// {"name": "point01", "type": "TIME_SERIES", "rowKeyAssigned": true,
    ///  "columns": [{"name": "ts", "type": "TIMESTAMP"}, {"name": "value", "type": "DOUBLE"}]}
    /// ```
    pub fn from_json(json: &str) -> Result<ContainerInfo, GridError> {
        let info: ContainerInfo = serde_json::from_str(json)?;
        info.validate()?;
        Ok(info)
    }

    pub fn to_json(&self) -> Result<String, GridError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn container_type(mut self, container_type: ContainerType) -> ContainerInfo {
        self.container_type = container_type;
        self
    }

    pub fn column(mut self, column: ColumnInfo) -> ContainerInfo {
        self.columns.push(column);
        self
    }

    /// Designate column 0 as the row key.
    pub fn row_key(mut self, assigned: bool) -> ContainerInfo {
        self.row_key_assigned = assigned;
        self
    }

    pub fn expiration(mut self, expiration: ExpirationInfo) -> ContainerInfo {
        self.expiration = Some(expiration);
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
    pub fn get_type(&self) -> ContainerType {
        self.container_type
    }
    pub fn set_type(&mut self, container_type: ContainerType) {
        self.container_type = container_type;
    }
    pub fn get_row_key_assigned(&self) -> bool {
        self.row_key_assigned
    }
    pub fn set_row_key_assigned(&mut self, assigned: bool) {
        self.row_key_assigned = assigned;
    }
    pub fn get_column_info(&self, column: usize) -> Option<&ColumnInfo> {
        self.columns.get(column)
    }
    pub fn get_column_info_list(&self) -> &[ColumnInfo] {
        &self.columns
    }
    pub fn set_column_info_list(&mut self, columns: Vec<ColumnInfo>) {
        self.columns = columns;
    }
    pub fn get_expiration_info(&self) -> Option<&ExpirationInfo> {
        self.expiration.as_ref()
    }
    pub fn set_expiration_info(&mut self, expiration: Option<ExpirationInfo>) {
        self.expiration = expiration;
    }

    /// Position of the named column. Column names match case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Declared type of the row key column, if the container has a row key.
    pub fn row_key_type(&self) -> Option<GridType> {
        if !self.row_key_assigned {
            return None;
        }
        self.columns.first().map(|c| c.column_type)
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if self.name.is_empty() {
            return ia_err!("container name must be non-empty");
        }
        if self.columns.is_empty() {
            return ia_err!("container {} must have at least one column", self.name);
        }
        for (i, c) in self.columns.iter().enumerate() {
            if c.name.is_empty() {
                return ia_err!("column {} of container {} has no name", i, self.name);
            }
            if c.column_type == GridType::Null {
                return ia_err!("column {} of container {} can't be NULL typed", c.name, self.name);
            }
            if self.columns[..i]
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(&c.name))
            {
                return ia_err!("duplicate column name {} in container {}", c.name, self.name);
            }
        }
        if self.row_key_assigned {
            let key = &self.columns[0];
            if !key.column_type.is_row_key_type() {
                return ia_err!(
                    "row key column {} can't be of type {}",
                    key.name,
                    key.column_type
                );
            }
            if key.options == Some(TypeOption::Nullable) {
                return ia_err!("row key column {} can't be nullable", key.name);
            }
        }
        if self.container_type == ContainerType::TimeSeries
            && self.row_key_type() != Some(GridType::Timestamp)
        {
            return ia_err!(
                "time series container {} needs a TIMESTAMP row key in column 0",
                self.name
            );
        }
        if let Some(exp) = &self.expiration {
            if self.container_type != ContainerType::TimeSeries {
                return ia_err!(
                    "row expiration is only supported on time series containers"
                );
            }
            if exp.time <= 0 {
                return ia_err!("row expiration time must be positive, got {}", exp.time);
            }
        }
        Ok(())
    }
}

impl SchemaView for ContainerInfo {
    fn column_count(&self) -> usize {
        self.columns.len()
    }
    fn column_type(&self, column: usize) -> Option<GridType> {
        self.columns.get(column).map(|c| c.column_type)
    }
    fn column_nullable(&self, column: usize) -> bool {
        match self.columns.get(column) {
            Some(c) => match c.options {
                Some(TypeOption::Nullable) => true,
                Some(TypeOption::NotNull) => false,
                None => !(self.row_key_assigned && column == 0),
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_json_schema() -> Result<(), Box<dyn Error>> {
        let info = ContainerInfo::from_json(
            r#"{"name": "point01", "type": "TIME_SERIES", "rowKeyAssigned": true,
                "columns": [{"name": "ts", "type": "TIMESTAMP"},
                            {"name": "value", "type": "DOUBLE", "options": "NOT_NULL"},
                            {"name": "tags", "type": "STRING_ARRAY"}],
                "expiration": {"time": 10, "unit": "DAY"}}"#,
        )?;
        assert_eq!(info.get_type(), ContainerType::TimeSeries);
        assert_eq!(info.column_count(), 3);
        assert_eq!(info.row_key_type(), Some(GridType::Timestamp));
        assert_eq!(info.column_index("VALUE"), Some(1));
        assert!(!info.column_nullable(0));
        assert!(!info.column_nullable(1));
        assert!(info.column_nullable(2));
        let exp = info.get_expiration_info().ok_or("no expiration")?;
        assert_eq!(exp.division_count, -1);
        assert_eq!(exp.unit, TimeUnit::Day);

        let back = ContainerInfo::from_json(&info.to_json()?)?;
        assert_eq!(back, info);
        Ok(())
    }

    #[test]
    fn test_validate() {
        let ok = ContainerInfo::new("c")
            .column(ColumnInfo::new("id", GridType::Long))
            .row_key(true);
        assert!(ok.validate().is_ok());

        let blob_key = ContainerInfo::new("c")
            .column(ColumnInfo::new("id", GridType::Blob))
            .row_key(true);
        assert!(blob_key.validate().is_err());

        let dup = ContainerInfo::new("c")
            .column(ColumnInfo::new("a", GridType::Long))
            .column(ColumnInfo::new("A", GridType::String));
        assert!(dup.validate().is_err());

        let ts_without_key = ContainerInfo::new("ts")
            .container_type(ContainerType::TimeSeries)
            .column(ColumnInfo::new("t", GridType::Timestamp));
        assert!(ts_without_key.validate().is_err());

        let expiring_collection = ContainerInfo::new("c")
            .column(ColumnInfo::new("id", GridType::Long))
            .expiration(ExpirationInfo::new(1, TimeUnit::Hour, -1));
        assert!(expiring_collection.validate().is_err());

        let props: TimeSeriesProperties = ExpirationInfo::new(30, TimeUnit::Day, 8);
        let series = ContainerInfo::new("ts")
            .container_type(ContainerType::TimeSeries)
            .column(ColumnInfo::new("t", GridType::Timestamp))
            .row_key(true)
            .expiration(props);
        assert!(series.validate().is_ok());

        assert!(ContainerInfo::new("").validate().is_err());
        assert!(ContainerInfo::new("empty").validate().is_err());
    }
}
