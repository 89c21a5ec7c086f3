//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use chrono::DateTime;

use crate::client::RowKey;
use crate::error::GridErrorCode::WrongRowKeyType;
use crate::error::{grid_err, ia_err};
use crate::error::GridError;
use crate::types::{Field, GridType};

/// Check `key` against the declared type of a row key column and convert it
/// to the form the request layer compares.
///
/// STRING, LONG and TIMESTAMP keys must match exactly, except that an
/// INTEGER field is widened for a LONG key column. Anything else fails with
/// [`WrongRowKeyType`](crate::GridErrorCode::WrongRowKeyType).
pub(crate) fn row_key_from_field(declared: GridType, key: &Field) -> Result<RowKey, GridError> {
    match (declared, key) {
        (GridType::String, Field::String(s)) => Ok(RowKey::String(s.clone())),
        (GridType::Integer, Field::Integer(i)) => Ok(RowKey::Integer(*i)),
        (GridType::Long, Field::Integer(i)) => Ok(RowKey::Long(*i as i64)),
        (GridType::Long, Field::Long(l)) => Ok(RowKey::Long(*l)),
        (GridType::Timestamp, Field::Timestamp(t)) => Ok(RowKey::Timestamp(t.timestamp_millis())),
        _ => grid_err!(
            WrongRowKeyType,
            "wrong type of rowKey: key column is {}, key field is {}",
            declared,
            key.get_type()
        ),
    }
}

pub(crate) fn row_key_to_field(key: &RowKey) -> Field {
    match key {
        RowKey::String(s) => Field::String(s.clone()),
        RowKey::Integer(i) => Field::Integer(*i),
        RowKey::Long(l) => Field::Long(*l),
        RowKey::Timestamp(ms) => match DateTime::from_timestamp_millis(*ms) {
            Some(t) => Field::Timestamp(t),
            None => Field::Null,
        },
    }
}

/// Row key conditions for one container in a [`Store::multi_get()`](crate::Store::multi_get).
///
/// A predicate selects either a closed range of keys, with either end
/// optional, or a set of distinct keys. A predicate with neither selects
/// every row. Create one with [`Store::create_row_key_predicate()`](crate::Store::create_row_key_predicate).
#[derive(Debug, Clone, PartialEq)]
pub struct RowKeyPredicate {
    key_type: GridType,
    start: Option<RowKey>,
    finish: Option<RowKey>,
    distinct: Vec<RowKey>,
}

impl RowKeyPredicate {
    pub fn new(key_type: GridType) -> Result<RowKeyPredicate, GridError> {
        if !key_type.is_row_key_type() {
            return ia_err!("row key predicate can't have key type {}", key_type);
        }
        Ok(RowKeyPredicate {
            key_type,
            start: None,
            finish: None,
            distinct: Vec::new(),
        })
    }

    pub fn get_key_type(&self) -> GridType {
        self.key_type
    }

    /// Select keys between `start` and `finish`, inclusive. `None` leaves
    /// that end unbounded.
    pub fn set_range(
        &mut self,
        start: Option<&Field>,
        finish: Option<&Field>,
    ) -> Result<(), GridError> {
        if !self.distinct.is_empty() {
            return ia_err!("a row key predicate can't have both a range and distinct keys");
        }
        let start = match start {
            Some(f) => Some(row_key_from_field(self.key_type, f)?),
            None => None,
        };
        let finish = match finish {
            Some(f) => Some(row_key_from_field(self.key_type, f)?),
            None => None,
        };
        self.start = start;
        self.finish = finish;
        Ok(())
    }

    /// The range bounds, as fields of the predicate's key type.
    pub fn get_range(&self) -> (Option<Field>, Option<Field>) {
        (
            self.start.as_ref().map(row_key_to_field),
            self.finish.as_ref().map(row_key_to_field),
        )
    }

    pub fn set_distinct_keys(&mut self, keys: &[Field]) -> Result<(), GridError> {
        if self.start.is_some() || self.finish.is_some() {
            return ia_err!("a row key predicate can't have both a range and distinct keys");
        }
        let mut converted = Vec::new();
        converted.try_reserve_exact(keys.len())?;
        for k in keys {
            converted.push(row_key_from_field(self.key_type, k)?);
        }
        self.distinct = converted;
        Ok(())
    }

    pub fn get_distinct_keys(&self) -> Vec<Field> {
        self.distinct.iter().map(row_key_to_field).collect()
    }

    pub(crate) fn matches(&self, key: &RowKey) -> bool {
        if !self.distinct.is_empty() {
            return self.distinct.contains(key);
        }
        if let Some(s) = &self.start {
            if key < s {
                return false;
            }
        }
        if let Some(f) = &self.finish {
            if key > f {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_key_gate() -> Result<(), Box<dyn Error>> {
        assert_eq!(
            row_key_from_field(GridType::Long, &Field::Integer(7))?,
            RowKey::Long(7)
        );
        assert_eq!(
            row_key_from_field(GridType::String, &Field::String("k".into()))?,
            RowKey::String("k".into())
        );
        // no fallthrough from small integer types
        for f in [Field::Byte(1), Field::Short(1)] {
            let e = row_key_from_field(GridType::Integer, &f).err().ok_or("accepted")?;
            assert_eq!(e.code, WrongRowKeyType);
        }
        assert!(row_key_from_field(GridType::Integer, &Field::Long(1)).is_err());
        assert!(row_key_from_field(GridType::String, &Field::Long(1)).is_err());
        assert!(row_key_from_field(GridType::Timestamp, &Field::Long(1)).is_err());
        Ok(())
    }

    #[test]
    fn test_range_and_distinct() -> Result<(), Box<dyn Error>> {
        let mut p = RowKeyPredicate::new(GridType::Long)?;
        p.set_range(Some(&Field::Integer(2)), None)?;
        assert!(p.matches(&RowKey::Long(2)));
        assert!(p.matches(&RowKey::Long(100)));
        assert!(!p.matches(&RowKey::Long(1)));
        assert_eq!(p.get_range(), (Some(Field::Long(2)), None));
        assert!(p.set_distinct_keys(&[Field::Long(1)]).is_err());

        let mut d = RowKeyPredicate::new(GridType::String)?;
        d.set_distinct_keys(&[Field::String("a".into()), Field::String("c".into())])?;
        assert!(d.matches(&RowKey::String("c".into())));
        assert!(!d.matches(&RowKey::String("b".into())));
        assert!(d.set_distinct_keys(&[Field::Long(1)]).is_err());

        assert!(RowKeyPredicate::new(GridType::Double).is_err());
        Ok(())
    }
}
