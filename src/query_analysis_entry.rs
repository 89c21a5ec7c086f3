//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//

/// One line of the plan returned by an `EXPLAIN` or `EXPLAIN ANALYZE` query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryAnalysisEntry {
    pub id: i32,
    pub depth: i32,
    pub entry_type: String,
    pub value_type: String,
    pub value: String,
    pub statement: String,
}

impl std::fmt::Display for QueryAnalysisEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.id, self.depth, self.entry_type, self.value_type, self.value, self.statement
        )
    }
}
