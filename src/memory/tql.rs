//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! A small TQL subset evaluated by the in-memory request layer.
//!
//! ```text
//! [EXPLAIN [ANALYZE]] SELECT <projection> [FROM <name>]
//!     [WHERE <column> <op> <literal> [AND ...]]
//!     [ORDER BY <column> [ASC|DESC]]
//!     [LIMIT <n> [OFFSET <n>]]
//! ```
//! A projection is `*`, `COUNT(*)`, or one of `COUNT`, `MIN`, `MAX`, `SUM`,
//! `AVG` applied to a column. Operators are `=`, `==`, `!=`, `<>`, `<`, `<=`,
//! `>` and `>=`. Literals are numbers, single-quoted strings, `TRUE`, `FALSE`,
//! `NULL` and `TIMESTAMP('<rfc3339>')`.
use std::cmp::Ordering;

use chrono::DateTime;

use crate::client::AggregationValue;
use crate::container_info::ContainerInfo;
use crate::query_analysis_entry::QueryAnalysisEntry;
use crate::types::GridType;
use crate::wire::Cell;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Timestamp(i64),
    Null,
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(d) => write!(f, "{}", d),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Timestamp(ms) => match DateTime::from_timestamp_millis(*ms) {
                Some(t) => write!(
                    f,
                    "TIMESTAMP('{}')",
                    t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
                ),
                None => write!(f, "TIMESTAMP({})", ms),
            },
            Literal::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    fn accepts(&self, o: Ordering) -> bool {
        match self {
            CmpOp::Eq => o == Ordering::Equal,
            CmpOp::Ne => o != Ordering::Equal,
            CmpOp::Lt => o == Ordering::Less,
            CmpOp::Le => o != Ordering::Greater,
            CmpOp::Gt => o == Ordering::Greater,
            CmpOp::Ge => o != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AggFunc {
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    All,
    // None means `*`
    Aggregate(AggFunc, Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Condition {
    pub column: String,
    pub op: CmpOp,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub text: String,
    // Some(analyze) for EXPLAIN statements
    pub explain: Option<bool>,
    pub projection: Projection,
    pub conditions: Vec<Condition>,
    pub order_by: Option<(String, bool)>,
    pub limit: Option<i64>,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Star,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),
            '*' => tokens.push(Token::Star),
            ';' if chars[i + 1..].iter().all(|c| c.is_whitespace()) => (),
            '\'' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            s.push('\'');
                            i += 2;
                        }
                        Some('\'') => break,
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '"' => {
                let start = i + 1;
                let end = match chars[start..].iter().position(|c| *c == '"') {
                    Some(p) => start + p,
                    None => return Err("unterminated quoted name".to_string()),
                };
                tokens.push(Token::Ident(chars[start..end].iter().collect()));
                i = end;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    i += 1;
                }
                tokens.push(Token::Op("="));
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("!="));
                i += 1;
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Op("<="));
                    i += 1;
                }
                Some('>') => {
                    tokens.push(Token::Op("!="));
                    i += 1;
                }
                _ => tokens.push(Token::Op("<")),
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(">="));
                    i += 1;
                } else {
                    tokens.push(Token::Op(">"));
                }
            }
            _ if c.is_ascii_digit()
                || ((c == '-' || c == '.')
                    && chars.get(i + 1).map_or(false, |n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || chars[i] == 'e'
                        || chars[i] == 'E'
                        || ((chars[i] == '-' || chars[i] == '+')
                            && (chars[i - 1] == 'e' || chars[i - 1] == 'E')))
                {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
                continue;
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
                continue;
            }
            _ => return Err(format!("unexpected character '{}' at offset {}", c, i)),
        }
        i += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(kw))
    }

    fn keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), String> {
        if self.keyword(kw) {
            return Ok(());
        }
        Err(format!("expected {} near {}", kw, self.describe()))
    }

    fn expect(&mut self, t: Token) -> Result<(), String> {
        if self.peek() == Some(&t) {
            self.pos += 1;
            return Ok(());
        }
        Err(format!("expected {:?} near {}", t, self.describe()))
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(s)) => Ok(s),
            _ => {
                self.pos -= 1;
                Err(format!("expected a name near {}", self.describe()))
            }
        }
    }

    fn integer(&mut self) -> Result<i64, String> {
        match self.next() {
            Some(Token::Number(n)) => n.parse::<i64>().map_err(|_| format!("invalid integer {}", n)),
            _ => Err("expected an integer".to_string()),
        }
    }

    fn describe(&self) -> String {
        match self.peek() {
            Some(t) => format!("{:?}", t),
            None => "end of statement".to_string(),
        }
    }

    fn literal(&mut self) -> Result<Literal, String> {
        match self.next() {
            Some(Token::Number(n)) => {
                if let Ok(i) = n.parse::<i64>() {
                    return Ok(Literal::Integer(i));
                }
                n.parse::<f64>()
                    .map(Literal::Float)
                    .map_err(|_| format!("invalid number {}", n))
            }
            Some(Token::Str(s)) => Ok(Literal::String(s)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("TRUE") => Ok(Literal::Bool(true)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("FALSE") => Ok(Literal::Bool(false)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("NULL") => Ok(Literal::Null),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("TIMESTAMP") => {
                self.expect(Token::LParen)?;
                let text = match self.next() {
                    Some(Token::Str(t)) => t,
                    _ => return Err("TIMESTAMP() takes a string".to_string()),
                };
                self.expect(Token::RParen)?;
                let t = DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| format!("invalid timestamp '{}': {}", text, e))?;
                Ok(Literal::Timestamp(t.timestamp_millis()))
            }
            _ => {
                self.pos -= 1;
                Err(format!("expected a literal near {}", self.describe()))
            }
        }
    }

    fn projection(&mut self) -> Result<Projection, String> {
        if self.peek() == Some(&Token::Star) {
            self.pos += 1;
            return Ok(Projection::All);
        }
        let name = self.ident()?;
        let func = match name.to_uppercase().as_str() {
            "COUNT" => AggFunc::Count,
            "MIN" => AggFunc::Min,
            "MAX" => AggFunc::Max,
            "SUM" => AggFunc::Sum,
            "AVG" => AggFunc::Avg,
            _ => return Err(format!("unsupported selection {}", name)),
        };
        self.expect(Token::LParen)?;
        let column = if self.peek() == Some(&Token::Star) {
            self.pos += 1;
            if func != AggFunc::Count {
                return Err(format!("{:?}(*) is not supported", func));
            }
            None
        } else {
            Some(self.ident()?)
        };
        self.expect(Token::RParen)?;
        Ok(Projection::Aggregate(func, column))
    }

    fn condition(&mut self) -> Result<Condition, String> {
        let column = self.ident()?;
        let op = match self.next() {
            Some(Token::Op("=")) => CmpOp::Eq,
            Some(Token::Op("!=")) => CmpOp::Ne,
            Some(Token::Op("<")) => CmpOp::Lt,
            Some(Token::Op("<=")) => CmpOp::Le,
            Some(Token::Op(">")) => CmpOp::Gt,
            Some(Token::Op(">=")) => CmpOp::Ge,
            _ => return Err(format!("expected a comparison after {}", column)),
        };
        let value = self.literal()?;
        Ok(Condition { column, op, value })
    }
}

pub(crate) fn parse(text: &str) -> Result<Statement, String> {
    let mut p = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };
    let explain = if p.keyword("EXPLAIN") {
        Some(p.keyword("ANALYZE"))
    } else {
        None
    };
    p.expect_keyword("SELECT")?;
    let projection = p.projection()?;
    if p.keyword("FROM") {
        p.ident()?;
    }
    let mut conditions = Vec::new();
    if p.keyword("WHERE") {
        conditions.push(p.condition()?);
        while p.keyword("AND") {
            conditions.push(p.condition()?);
        }
    }
    let mut order_by = None;
    if p.keyword("ORDER") {
        p.expect_keyword("BY")?;
        let column = p.ident()?;
        let desc = if p.keyword("DESC") {
            true
        } else {
            p.keyword("ASC");
            false
        };
        order_by = Some((column, desc));
    }
    let mut limit = None;
    let mut offset = 0;
    if p.keyword("LIMIT") {
        let n = p.integer()?;
        if n < 0 {
            return Err("LIMIT must not be negative".to_string());
        }
        limit = Some(n);
        if p.keyword("OFFSET") {
            offset = p.integer()?;
            if offset < 0 {
                return Err("OFFSET must not be negative".to_string());
            }
        }
    }
    if p.peek().is_some() {
        return Err(format!("unexpected {} at end of statement", p.describe()));
    }
    Ok(Statement {
        text: text.trim().to_string(),
        explain,
        projection,
        conditions,
        order_by,
        limit,
        offset,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoundProjection {
    All,
    CountAll,
    Aggregate(AggFunc, usize, GridType),
}

/// A statement with column names resolved against a schema.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Plan {
    pub statement: Statement,
    pub projection: BoundProjection,
    pub conditions: Vec<(usize, CmpOp, Literal)>,
    pub order_by: Option<(usize, bool)>,
}

fn literal_fits(t: GridType, lit: &Literal) -> bool {
    match (t, lit) {
        (_, Literal::Null) => true,
        (
            GridType::Byte
            | GridType::Short
            | GridType::Integer
            | GridType::Long
            | GridType::Float
            | GridType::Double,
            Literal::Integer(_) | Literal::Float(_),
        ) => true,
        (GridType::String | GridType::Geometry, Literal::String(_)) => true,
        (GridType::Bool, Literal::Bool(_)) => true,
        (GridType::Timestamp, Literal::Timestamp(_)) => true,
        _ => false,
    }
}

fn is_numeric(t: GridType) -> bool {
    matches!(
        t,
        GridType::Byte
            | GridType::Short
            | GridType::Integer
            | GridType::Long
            | GridType::Float
            | GridType::Double
    )
}

fn resolve(info: &ContainerInfo, name: &str) -> Result<(usize, GridType), String> {
    match info.column_index(name) {
        Some(i) => Ok((i, info.columns[i].column_type)),
        None => Err(format!("no column {} in container {}", name, info.name)),
    }
}

pub(crate) fn bind(statement: &Statement, info: &ContainerInfo) -> Result<Plan, String> {
    let projection = match &statement.projection {
        Projection::All => BoundProjection::All,
        Projection::Aggregate(AggFunc::Count, None) => BoundProjection::CountAll,
        Projection::Aggregate(f, None) => return Err(format!("{:?} needs a column", f)),
        Projection::Aggregate(f, Some(c)) => {
            let (i, t) = resolve(info, c)?;
            let ok = match f {
                AggFunc::Count => true,
                AggFunc::Min | AggFunc::Max => is_numeric(t) || t == GridType::Timestamp,
                AggFunc::Sum | AggFunc::Avg => is_numeric(t),
            };
            if !ok {
                return Err(format!("{:?} is not supported on {} column {}", f, t, c));
            }
            BoundProjection::Aggregate(*f, i, t)
        }
    };
    let mut conditions = Vec::new();
    for c in &statement.conditions {
        let (i, t) = resolve(info, &c.column)?;
        if !literal_fits(t, &c.value) {
            return Err(format!(
                "can't compare {} column {} with {}",
                t, c.column, c.value
            ));
        }
        conditions.push((i, c.op, c.value.clone()));
    }
    let order_by = match &statement.order_by {
        Some((c, desc)) => Some((resolve(info, c)?.0, *desc)),
        None => None,
    };
    if order_by.is_some() && projection != BoundProjection::All {
        return Err("ORDER BY is not supported with an aggregation".to_string());
    }
    Ok(Plan {
        statement: statement.clone(),
        projection,
        conditions,
        order_by,
    })
}

fn cell_i64(c: &Cell) -> Option<i64> {
    match c {
        Cell::Byte(v) => Some(*v as i64),
        Cell::Short(v) => Some(*v as i64),
        Cell::Integer(v) => Some(*v as i64),
        Cell::Long(v) => Some(*v),
        Cell::Timestamp(v) => Some(*v),
        _ => None,
    }
}

fn cell_f64(c: &Cell) -> Option<f64> {
    match c {
        Cell::Float(v) => Some(*v as f64),
        Cell::Double(v) => Some(*v),
        _ => cell_i64(c).map(|i| i as f64),
    }
}

fn compare_literal(cell: &Cell, lit: &Literal) -> Option<Ordering> {
    match (cell, lit) {
        (Cell::Null, _) | (_, Literal::Null) => None,
        (Cell::String(s) | Cell::Geometry(s), Literal::String(l)) => Some(s.as_str().cmp(l)),
        (Cell::Bool(b), Literal::Bool(l)) => Some(b.cmp(l)),
        (Cell::Timestamp(t), Literal::Timestamp(l)) => Some(t.cmp(l)),
        (Cell::Float(_) | Cell::Double(_), Literal::Integer(_) | Literal::Float(_))
        | (_, Literal::Float(_)) => {
            let l = match lit {
                Literal::Integer(i) => *i as f64,
                Literal::Float(f) => *f,
                _ => return None,
            };
            cell_f64(cell)?.partial_cmp(&l)
        }
        (_, Literal::Integer(l)) => Some(cell_i64(cell)?.cmp(l)),
        _ => None,
    }
}

/// Ordering of two cells of the same column. NULL sorts first.
pub(crate) fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Null, Cell::Null) => Ordering::Equal,
        (Cell::Null, _) => Ordering::Less,
        (_, Cell::Null) => Ordering::Greater,
        (Cell::String(x), Cell::String(y)) | (Cell::Geometry(x), Cell::Geometry(y)) => x.cmp(y),
        (Cell::Bool(x), Cell::Bool(y)) => x.cmp(y),
        (Cell::Float(_) | Cell::Double(_), _) | (_, Cell::Float(_) | Cell::Double(_)) => {
            match (cell_f64(a), cell_f64(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        }
        _ => match (cell_i64(a), cell_i64(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

impl Plan {
    pub(crate) fn matches(&self, cells: &[Cell]) -> bool {
        self.conditions.iter().all(|(i, op, lit)| {
            match cells.get(*i).and_then(|c| compare_literal(c, lit)) {
                Some(o) => op.accepts(o),
                None => false,
            }
        })
    }

    /// Sort and cut a filtered result. `fetch_limit` is the limit set as a
    /// fetch option; the smaller of it and the statement's LIMIT applies.
    pub(crate) fn arrange<T>(
        &self,
        mut rows: Vec<T>,
        cells: impl Fn(&T) -> &[Cell],
        fetch_limit: Option<i64>,
    ) -> Vec<T> {
        if let Some((col, desc)) = self.order_by {
            rows.sort_by(|a, b| {
                let o = compare_cells(&cells(a)[col], &cells(b)[col]);
                if desc {
                    o.reverse()
                } else {
                    o
                }
            });
        }
        let offset = self.statement.offset.max(0) as usize;
        let limit = match (self.statement.limit, fetch_limit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let mut it: Vec<T> = rows.into_iter().skip(offset).collect();
        if let Some(l) = limit {
            it.truncate(l.max(0) as usize);
        }
        it
    }

    /// Aggregate over matching rows. `None` if the aggregate has no value,
    /// as for MIN of no rows.
    pub(crate) fn aggregate(&self, rows: &[&[Cell]]) -> Option<AggregationValue> {
        let (func, col, t) = match &self.projection {
            BoundProjection::All => return None,
            BoundProjection::CountAll => return Some(AggregationValue::Long(rows.len() as i64)),
            BoundProjection::Aggregate(f, c, t) => (*f, *c, *t),
        };
        let values: Vec<&Cell> = rows
            .iter()
            .filter_map(|r| r.get(col))
            .filter(|c| **c != Cell::Null)
            .collect();
        if func == AggFunc::Count {
            return Some(AggregationValue::Long(values.len() as i64));
        }
        if values.is_empty() {
            return None;
        }
        let floating = matches!(t, GridType::Float | GridType::Double);
        match func {
            AggFunc::Min | AggFunc::Max => {
                let mut best = values[0];
                for v in &values[1..] {
                    let o = compare_cells(v, best);
                    if (func == AggFunc::Min && o == Ordering::Less)
                        || (func == AggFunc::Max && o == Ordering::Greater)
                    {
                        best = *v;
                    }
                }
                if t == GridType::Timestamp {
                    cell_i64(best).map(AggregationValue::Timestamp)
                } else if floating {
                    cell_f64(best).map(AggregationValue::Double)
                } else {
                    cell_i64(best).map(AggregationValue::Long)
                }
            }
            AggFunc::Sum if !floating => Some(AggregationValue::Long(
                values.iter().filter_map(|c| cell_i64(c)).fold(0i64, |a, b| a.wrapping_add(b)),
            )),
            AggFunc::Sum => Some(AggregationValue::Double(
                values.iter().filter_map(|c| cell_f64(c)).sum(),
            )),
            AggFunc::Avg => {
                let sum: f64 = values.iter().filter_map(|c| cell_f64(c)).sum();
                Some(AggregationValue::Double(sum / values.len() as f64))
            }
            AggFunc::Count => None,
        }
    }

    /// Plan entries for an EXPLAIN statement. `indexes[i]` names the index
    /// on column `i`, if any. `analyzed` carries the scanned and matched row
    /// counts of EXPLAIN ANALYZE.
    pub(crate) fn explain(
        &self,
        info: &ContainerInfo,
        indexes: &[Option<&'static str>],
        analyzed: Option<(usize, usize)>,
    ) -> Vec<QueryAnalysisEntry> {
        let mut entries = Vec::new();
        let mut add = |depth: i32, entry_type: &str, value_type: &str, value: String| {
            entries.push(QueryAnalysisEntry {
                id: entries.len() as i32 + 1,
                depth,
                entry_type: entry_type.to_string(),
                value_type: value_type.to_string(),
                value,
                statement: String::new(),
            });
        };
        add(0, "CONTAINER", "STRING", info.name.clone());
        let scan = self
            .conditions
            .iter()
            .find_map(|(c, _, _)| indexes.get(*c).copied().flatten());
        match scan {
            Some(kind) => add(1, "INDEX_SCAN", "STRING", kind.to_string()),
            None => add(1, "FULL_SCAN", "STRING", String::new()),
        }
        for (c, op, lit) in &self.conditions {
            add(
                2,
                "CONDITION",
                "STRING",
                format!("{} {} {}", info.columns[*c].name, op.symbol(), lit),
            );
        }
        if let Some((c, desc)) = self.order_by {
            let dir = if desc { "DESC" } else { "ASC" };
            add(1, "ORDER_BY", "STRING", format!("{} {}", info.columns[c].name, dir));
        }
        if let Some(l) = self.statement.limit {
            add(1, "LIMIT", "LONG", l.to_string());
        }
        if let Some((scanned, matched)) = analyzed {
            add(1, "SCANNED_ROWS", "LONG", scanned.to_string());
            add(1, "RESULT_ROWS", "LONG", matched.to_string());
        }
        let text = self.statement.text.clone();
        for e in entries.iter_mut() {
            e.statement = text.clone();
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container_info::ColumnInfo;
    use std::error::Error;

    fn schema() -> ContainerInfo {
        ContainerInfo::new("c")
            .column(ColumnInfo::new("id", GridType::Long))
            .column(ColumnInfo::new("name", GridType::String))
            .column(ColumnInfo::new("score", GridType::Double))
            .column(ColumnInfo::new("ts", GridType::Timestamp))
            .row_key(true)
    }

    fn row(id: i64, name: &str, score: f64, ts: i64) -> Vec<Cell> {
        vec![
            Cell::Long(id),
            Cell::String(name.to_string()),
            Cell::Double(score),
            Cell::Timestamp(ts),
        ]
    }

    #[test]
    fn test_parse() -> Result<(), Box<dyn Error>> {
        let s = parse(
            "select * from c where id >= 2 and name <> 'o''brien' order by score desc limit 10 offset 1",
        )?;
        assert_eq!(s.explain, None);
        assert_eq!(s.projection, Projection::All);
        assert_eq!(s.conditions.len(), 2);
        assert_eq!(s.conditions[1].op, CmpOp::Ne);
        assert_eq!(s.conditions[1].value, Literal::String("o'brien".into()));
        assert_eq!(s.order_by, Some(("score".to_string(), true)));
        assert_eq!(s.limit, Some(10));
        assert_eq!(s.offset, 1);

        let e = parse("EXPLAIN ANALYZE SELECT MAX(score) WHERE ts > TIMESTAMP('2024-01-01T00:00:00Z');")?;
        assert_eq!(e.explain, Some(true));
        assert_eq!(
            e.projection,
            Projection::Aggregate(AggFunc::Max, Some("score".into()))
        );
        assert_eq!(e.conditions[0].value, Literal::Timestamp(1704067200000));

        assert!(parse("SELECT").is_err());
        assert!(parse("SELECT * WHERE").is_err());
        assert!(parse("SELECT * WHERE id = 'x").is_err());
        assert!(parse("SELECT SUM(*)").is_err());
        assert!(parse("DELETE FROM c").is_err());
        assert!(parse("SELECT * LIMIT 1 garbage").is_err());
        Ok(())
    }

    #[test]
    fn test_filter_and_arrange() -> Result<(), Box<dyn Error>> {
        let info = schema();
        let rows = vec![
            row(1, "a", 0.5, 10),
            row(2, "b", 2.5, 20),
            row(3, "c", 1.5, 30),
            row(4, "d", -1.0, 40),
        ];
        let plan = bind(&parse("SELECT * WHERE id > 1 AND score >= 0 ORDER BY score DESC")?, &info)?;
        let hits: Vec<&Vec<Cell>> = rows.iter().filter(|r| plan.matches(r)).collect();
        let hits = plan.arrange(hits, |r| r.as_slice(), None);
        let ids: Vec<Cell> = hits.iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, vec![Cell::Long(2), Cell::Long(3)]);

        let plan = bind(&parse("SELECT * LIMIT 3")?, &info)?;
        let all: Vec<&Vec<Cell>> = rows.iter().collect();
        assert_eq!(plan.arrange(all.clone(), |r| r.as_slice(), Some(2)).len(), 2);
        assert_eq!(plan.arrange(all, |r| r.as_slice(), None).len(), 3);

        // type checks happen at bind time
        assert!(bind(&parse("SELECT * WHERE name = 1")?, &info).is_err());
        assert!(bind(&parse("SELECT * WHERE missing = 1")?, &info).is_err());
        assert!(bind(&parse("SELECT SUM(name)")?, &info).is_err());
        Ok(())
    }

    #[test]
    fn test_aggregate() -> Result<(), Box<dyn Error>> {
        let info = schema();
        let rows = vec![row(1, "a", 0.5, 10), row(2, "b", 2.5, 20), row(5, "c", 1.0, 30)];
        let refs: Vec<&[Cell]> = rows.iter().map(|r| r.as_slice()).collect();
        let agg = |q: &str| -> Result<Option<AggregationValue>, Box<dyn Error>> {
            Ok(bind(&parse(q)?, &info)?.aggregate(&refs))
        };
        assert_eq!(agg("SELECT COUNT(*)")?, Some(AggregationValue::Long(3)));
        assert_eq!(agg("SELECT SUM(id)")?, Some(AggregationValue::Long(8)));
        assert_eq!(agg("SELECT MAX(score)")?, Some(AggregationValue::Double(2.5)));
        assert_eq!(agg("SELECT MIN(ts)")?, Some(AggregationValue::Timestamp(10)));
        assert_eq!(agg("SELECT AVG(score)")?, Some(AggregationValue::Double(4.0 / 3.0)));
        let none: Vec<&[Cell]> = Vec::new();
        let plan = bind(&parse("SELECT MIN(id)")?, &info)?;
        assert_eq!(plan.aggregate(&none), None);
        Ok(())
    }

    #[test]
    fn test_explain() -> Result<(), Box<dyn Error>> {
        let info = schema();
        let plan = bind(&parse("EXPLAIN SELECT * WHERE id = 3 LIMIT 5")?, &info)?;
        let entries = plan.explain(&info, &[Some("TREE"), None, None, None], None);
        let types: Vec<&str> = entries.iter().map(|e| e.entry_type.as_str()).collect();
        assert_eq!(types, vec!["CONTAINER", "INDEX_SCAN", "CONDITION", "LIMIT"]);
        assert_eq!(entries[2].value, "id = 3");
        assert_eq!(entries[3].id, 4);
        Ok(())
    }
}
