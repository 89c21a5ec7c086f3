//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! In-memory implementation of the request layer.
//!
//! [`MemoryClient`] keeps containers in a [`MemoryCluster`] shared by every
//! client connected to it, so several stores opened on the same cluster see
//! the same data. Rows of containers with a row key are kept in key order;
//! rows of keyless collections in insertion order.
//!
//! Besides serving the crate's own tests, the client exposes a few
//! diagnostics: per-operation request counts, the number of live wire rows
//! and type vectors, one-shot fault injection, and control over the order in
//! which batched reads return their entries.
pub(crate) mod tql;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::client::{
    AggregationValue, Allocation, ContainerHandle, ContainerRows, ContainerRowsEntry, GridClient,
    Lease, QueryHandle, RowKey, RowKeyPredicateEntry, RowSetHandle,
};
use crate::container_info::ContainerInfo;
use crate::error::RequestError;
use crate::query_analysis_entry::QueryAnalysisEntry;
use crate::types::{GridType, IndexTypeFlags, RowSetType};
use crate::wire::{Cell, SchemaView, WireColumn, WireRow};
use tql::{BoundProjection, Plan};

/// Number of partitions of a cluster created with [`MemoryCluster::new()`].
pub const DEFAULT_PARTITION_COUNT: i32 = 128;

// request layer error codes
pub const ERR_CLOSED: i32 = 145001;
pub const ERR_HANDLE: i32 = 145002;
pub const ERR_NOT_FOUND: i32 = 145003;
pub const ERR_SCHEMA: i32 = 145004;
pub const ERR_STATE: i32 = 145005;
pub const ERR_SYNTAX: i32 = 145006;
pub const ERR_ALLOCATION: i32 = 145007;
pub const ERR_ARGUMENT: i32 = 145008;

fn req_err(code: i32, msg: String) -> RequestError {
    RequestError::new(code, &msg)
}

/// Order in which [`MemoryClient`] returns the entries of a batched read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseOrder {
    /// Same order as the request.
    #[default]
    Request,
    Reverse,
    /// Request order rotated left by the given count.
    Rotate(usize),
}

#[derive(Debug, Clone)]
struct StoredRow {
    id: u64,
    key: Option<RowKey>,
    cells: Vec<Cell>,
}

#[derive(Debug, Clone)]
struct StoredContainer {
    info: ContainerInfo,
    columns: Arc<[WireColumn]>,
    rows: Vec<StoredRow>,
}

#[derive(Debug, Default)]
struct ClusterState {
    containers: BTreeMap<String, StoredContainer>,
}

/// Data shared by every [`MemoryClient`] connected to it.
#[derive(Debug)]
pub struct MemoryCluster {
    state: Mutex<ClusterState>,
    partition_count: i32,
    next_row_id: AtomicU64,
}

impl MemoryCluster {
    pub fn new() -> Arc<MemoryCluster> {
        MemoryCluster::with_partitions(DEFAULT_PARTITION_COUNT)
    }

    pub fn with_partitions(count: i32) -> Arc<MemoryCluster> {
        Arc::new(MemoryCluster {
            state: Mutex::new(ClusterState::default()),
            partition_count: count.max(1),
            next_row_id: AtomicU64::new(1),
        })
    }

    pub fn partition_count(&self) -> i32 {
        self.partition_count
    }

    /// Number of containers stored in the cluster.
    pub fn container_count(&self) -> usize {
        match self.state.lock() {
            Ok(s) => s.containers.len(),
            Err(_) => 0,
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, ClusterState>, RequestError> {
        self.state
            .lock()
            .map_err(|_| req_err(ERR_STATE, "cluster state lock poisoned".to_string()))
    }

    // FNV-1a over the lower-cased name
    fn partition_of(&self, name: &str) -> i32 {
        let mut h: u32 = 0x811c9dc5;
        for b in name.to_lowercase().bytes() {
            h ^= b as u32;
            h = h.wrapping_mul(0x01000193);
        }
        (h % self.partition_count as u32) as i32
    }

    fn next_id(&self) -> u64 {
        self.next_row_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct OpenContainer {
    name: String,
    columns: Arc<[WireColumn]>,
    auto_commit: bool,
    // this session's view of the rows while auto-commit is off
    working: Option<Vec<StoredRow>>,
    // writes to replay onto the stored rows at commit
    pending: Vec<Pending>,
}

// A row write. Keyed rows are addressed by key, keyless rows by id.
#[derive(Debug, Clone)]
enum Pending {
    Put {
        key: Option<RowKey>,
        cells: Vec<Cell>,
        id: u64,
    },
    Update {
        key: Option<RowKey>,
        cells: Vec<Cell>,
        id: u64,
    },
    Remove {
        key: Option<RowKey>,
        id: u64,
    },
}

#[derive(Debug)]
struct OpenQuery {
    container: u64,
    plan: Plan,
    limit: Option<i64>,
    partial: bool,
    // row set produced by fetch_all
    pending: Option<u64>,
}

#[derive(Debug)]
enum Content {
    Rows(Vec<(u64, Vec<Cell>)>),
    Aggregation(Vec<AggregationValue>),
    Analysis(Vec<QueryAnalysisEntry>),
}

impl Content {
    fn len(&self) -> usize {
        match self {
            Content::Rows(r) => r.len(),
            Content::Aggregation(a) => a.len(),
            Content::Analysis(a) => a.len(),
        }
    }
}

#[derive(Debug)]
struct OpenRowSet {
    container: u64,
    kind: RowSetType,
    content: Content,
    pos: usize,
    current: Option<u64>,
}

#[derive(Debug, Default)]
struct Session {
    closed: bool,
    next_handle: u64,
    containers: HashMap<u64, OpenContainer>,
    queries: HashMap<u64, OpenQuery>,
    row_sets: HashMap<u64, OpenRowSet>,
}

impl Session {
    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn open_container(&mut self, name: &str, columns: Arc<[WireColumn]>) -> ContainerHandle {
        let h = self.next_handle();
        self.containers.insert(
            h,
            OpenContainer {
                name: name.to_string(),
                columns,
                auto_commit: true,
                working: None,
                pending: Vec::new(),
            },
        );
        ContainerHandle(h)
    }
}

#[derive(Debug, Default)]
struct Diagnostics {
    requests: Mutex<HashMap<String, usize>>,
    wire_rows: Arc<AtomicUsize>,
    type_vectors: Arc<AtomicUsize>,
    alloc_budget: Mutex<HashMap<Allocation, usize>>,
    failures: Mutex<HashMap<String, RequestError>>,
    response_order: Mutex<ResponseOrder>,
}

/// A request layer session on a [`MemoryCluster`].
///
/// Example:
/// ```
/// use griddb_rust_client::{GridClient, MemoryClient, MemoryCluster, Store};
/// use std::sync::Arc;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cluster = MemoryCluster::new();
/// let a = Arc::new(MemoryClient::connect(&cluster));
/// let _store = Store::new(a.clone());
/// assert_eq!(a.partition_count()?, 128);
/// assert_eq!(a.total_requests(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryClient {
    cluster: Arc<MemoryCluster>,
    session: Mutex<Session>,
    diag: Diagnostics,
}

impl Default for MemoryClient {
    fn default() -> Self {
        MemoryClient::new()
    }
}

fn wire_columns(info: &ContainerInfo) -> Arc<[WireColumn]> {
    (0..info.column_count())
        .map(|i| WireColumn {
            column_type: info.column_type(i).unwrap_or(GridType::Null),
            nullable: info.column_nullable(i),
        })
        .collect::<Vec<WireColumn>>()
        .into()
}

fn same_schema(a: &ContainerInfo, b: &ContainerInfo) -> bool {
    a.container_type == b.container_type
        && a.row_key_assigned == b.row_key_assigned
        && a.columns.len() == b.columns.len()
        && a.columns
            .iter()
            .zip(b.columns.iter())
            .all(|(x, y)| x.name.eq_ignore_ascii_case(&y.name) && x.column_type == y.column_type)
        && wire_columns(a) == wire_columns(b)
}

fn same_key(a: &ContainerInfo, b: &ContainerInfo) -> bool {
    if a.row_key_assigned != b.row_key_assigned {
        return false;
    }
    if !a.row_key_assigned {
        return true;
    }
    match (a.columns.first(), b.columns.first()) {
        (Some(x), Some(y)) => {
            x.column_type == y.column_type && x.name.eq_ignore_ascii_case(&y.name)
        }
        _ => false,
    }
}

fn default_cell(t: GridType) -> Cell {
    match t {
        GridType::String => Cell::String(String::new()),
        GridType::Bool => Cell::Bool(false),
        GridType::Byte => Cell::Byte(0),
        GridType::Short => Cell::Short(0),
        GridType::Integer => Cell::Integer(0),
        GridType::Long => Cell::Long(0),
        GridType::Float => Cell::Float(0.0),
        GridType::Double => Cell::Double(0.0),
        GridType::Timestamp => Cell::Timestamp(0),
        GridType::Geometry => Cell::Geometry("POINT(0 0)".to_string()),
        GridType::Blob => Cell::Blob(Vec::new()),
        GridType::StringArray => Cell::StringArray(Vec::new()),
        GridType::BoolArray => Cell::BoolArray(Vec::new()),
        GridType::ByteArray => Cell::ByteArray(Vec::new()),
        GridType::ShortArray => Cell::ShortArray(Vec::new()),
        GridType::IntegerArray => Cell::IntegerArray(Vec::new()),
        GridType::LongArray => Cell::LongArray(Vec::new()),
        GridType::FloatArray => Cell::FloatArray(Vec::new()),
        GridType::DoubleArray => Cell::DoubleArray(Vec::new()),
        GridType::TimestampArray => Cell::TimestampArray(Vec::new()),
        GridType::Null => Cell::Null,
    }
}

fn check_index(t: GridType, flags: IndexTypeFlags) -> Result<(), RequestError> {
    let spatial_ok = t == GridType::Geometry;
    let tree_ok = !t.is_array() && !matches!(t, GridType::Geometry | GridType::Blob);
    if (flags.contains(IndexTypeFlags::SPATIAL) && !spatial_ok)
        || ((flags.contains(IndexTypeFlags::TREE) || flags.contains(IndexTypeFlags::HASH))
            && !tree_ok)
    {
        return Err(req_err(
            ERR_SCHEMA,
            format!("index type {:?} is not supported on {} columns", flags, t),
        ));
    }
    Ok(())
}

fn index_name(flags: IndexTypeFlags) -> Option<&'static str> {
    if flags.contains(IndexTypeFlags::TREE) {
        Some("TREE")
    } else if flags.contains(IndexTypeFlags::HASH) {
        Some("HASH")
    } else if flags.contains(IndexTypeFlags::SPATIAL) {
        Some("SPATIAL")
    } else {
        None
    }
}

fn key_of(cells: &[Cell], keyed: bool) -> Result<Option<RowKey>, RequestError> {
    if !keyed {
        return Ok(None);
    }
    match cells.first() {
        Some(Cell::String(s)) => Ok(Some(RowKey::String(s.clone()))),
        Some(Cell::Integer(i)) => Ok(Some(RowKey::Integer(*i))),
        Some(Cell::Long(l)) => Ok(Some(RowKey::Long(*l))),
        Some(Cell::Timestamp(t)) => Ok(Some(RowKey::Timestamp(*t))),
        Some(Cell::Null) | None => Err(req_err(ERR_SCHEMA, "row key must not be null".to_string())),
        Some(c) => Err(req_err(
            ERR_SCHEMA,
            format!("{} can't be a row key", c.grid_type()),
        )),
    }
}

fn key_fits(key: &RowKey, t: Option<GridType>) -> bool {
    matches!(
        (key, t),
        (RowKey::String(_), Some(GridType::String))
            | (RowKey::Integer(_), Some(GridType::Integer))
            | (RowKey::Long(_), Some(GridType::Long))
            | (RowKey::Timestamp(_), Some(GridType::Timestamp))
    )
}

fn check_layout(row: &WireRow, columns: &Arc<[WireColumn]>) -> Result<(), RequestError> {
    if row.columns()[..] != columns[..] {
        return Err(req_err(
            ERR_SCHEMA,
            "row layout does not match the container".to_string(),
        ));
    }
    for (i, c) in row.cells().iter().enumerate() {
        if *c == Cell::Null && !columns[i].nullable {
            return Err(req_err(ERR_SCHEMA, format!("column {} is not nullable", i)));
        }
    }
    Ok(())
}

fn find_key(rows: &[StoredRow], key: &RowKey) -> Result<usize, usize> {
    rows.binary_search_by(|r| match &r.key {
        Some(k) => k.cmp(key),
        None => std::cmp::Ordering::Less,
    })
}

// Insert or replace. Returns true if a row with the same key was replaced.
fn put_into(rows: &mut Vec<StoredRow>, key: Option<RowKey>, cells: Vec<Cell>, id: u64) -> bool {
    match key {
        Some(k) => match find_key(rows, &k) {
            Ok(i) => {
                rows[i].cells = cells;
                true
            }
            Err(i) => {
                rows.insert(
                    i,
                    StoredRow {
                        id,
                        key: Some(k),
                        cells,
                    },
                );
                false
            }
        },
        None => {
            rows.push(StoredRow {
                id,
                key: None,
                cells,
            });
            false
        }
    }
}

fn rows_view<'a>(open: &'a OpenContainer, stored: &'a StoredContainer) -> &'a [StoredRow] {
    match &open.working {
        Some(w) => w.as_slice(),
        None => stored.rows.as_slice(),
    }
}

fn locate(rows: &[StoredRow], key: &Option<RowKey>, id: u64) -> Option<usize> {
    match key {
        Some(k) => find_key(rows, k).ok(),
        None => rows.iter().position(|r| r.id == id),
    }
}

// Returns true if the write found (or, for a put, replaced) its row.
fn apply(rows: &mut Vec<StoredRow>, op: &Pending) -> bool {
    match op {
        Pending::Put { key, cells, id } => put_into(rows, key.clone(), cells.clone(), *id),
        Pending::Update { key, cells, id } => match locate(rows, key, *id) {
            Some(i) => {
                rows[i].cells = cells.clone();
                true
            }
            None => false,
        },
        Pending::Remove { key, id } => match locate(rows, key, *id) {
            Some(i) => {
                rows.remove(i);
                true
            }
            None => false,
        },
    }
}

// Apply a write directly, or to the session's view and the pending log when
// auto-commit is off.
fn record(open: &mut OpenContainer, stored: &mut StoredContainer, op: Pending) -> bool {
    if open.auto_commit {
        return apply(&mut stored.rows, &op);
    }
    let rows = open.working.get_or_insert_with(|| stored.rows.clone());
    let done = apply(rows, &op);
    open.pending.push(op);
    done
}

// Replay the pending log onto the stored rows, which may have changed since
// the session's view was taken.
fn commit_pending(open: &mut OpenContainer, stored: &mut StoredContainer) -> usize {
    let count = open.pending.len();
    for op in open.pending.drain(..) {
        apply(&mut stored.rows, &op);
    }
    open.working = None;
    count
}

impl MemoryClient {
    /// A client on a new, private cluster.
    pub fn new() -> MemoryClient {
        MemoryClient::connect(&MemoryCluster::new())
    }

    /// A new session on `cluster`.
    pub fn connect(cluster: &Arc<MemoryCluster>) -> MemoryClient {
        MemoryClient {
            cluster: cluster.clone(),
            session: Mutex::new(Session::default()),
            diag: Diagnostics::default(),
        }
    }

    pub fn cluster(&self) -> &Arc<MemoryCluster> {
        &self.cluster
    }

    /// Number of requests made for `op`, named after the [`GridClient`] method.
    pub fn request_count(&self, op: &str) -> usize {
        match self.diag.requests.lock() {
            Ok(r) => r.get(op).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Number of requests made for all operations. Creating rows and
    /// allocating resources are not requests.
    pub fn total_requests(&self) -> usize {
        match self.diag.requests.lock() {
            Ok(r) => r.values().sum(),
            Err(_) => 0,
        }
    }

    /// Number of resources of kind `what` handed out and not yet released.
    pub fn live_allocations(&self, what: Allocation) -> usize {
        self.counter(what).load(Ordering::SeqCst)
    }

    /// Let the next `n` allocations of kind `what` succeed, then fail one.
    pub fn fail_allocation_after(&self, what: Allocation, n: usize) {
        if let Ok(mut b) = self.diag.alloc_budget.lock() {
            b.insert(what, n);
        }
    }

    /// Fail the next request for `op` with `err`.
    pub fn fail_next(&self, op: &str, err: RequestError) {
        if let Ok(mut f) = self.diag.failures.lock() {
            f.insert(op.to_string(), err);
        }
    }

    pub fn set_response_order(&self, order: ResponseOrder) {
        if let Ok(mut o) = self.diag.response_order.lock() {
            *o = order;
        }
    }

    fn counter(&self, what: Allocation) -> &Arc<AtomicUsize> {
        match what {
            Allocation::WireRow => &self.diag.wire_rows,
            Allocation::TypeVector => &self.diag.type_vectors,
        }
    }

    fn begin(&self, op: &str) -> Result<(), RequestError> {
        if let Ok(mut r) = self.diag.requests.lock() {
            *r.entry(op.to_string()).or_insert(0) += 1;
        }
        if let Ok(mut f) = self.diag.failures.lock() {
            if let Some(e) = f.remove(op) {
                trace!("injected failure for {}: {}", op, e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn session(&self) -> Result<MutexGuard<'_, Session>, RequestError> {
        let s = self
            .session
            .lock()
            .map_err(|_| req_err(ERR_STATE, "session lock poisoned".to_string()))?;
        if s.closed {
            return Err(req_err(ERR_CLOSED, "session is closed".to_string()));
        }
        Ok(s)
    }

    fn with_container<R>(
        &self,
        h: ContainerHandle,
        f: impl FnOnce(&mut OpenContainer, &mut StoredContainer) -> Result<R, RequestError>,
    ) -> Result<R, RequestError> {
        let mut session = self.session()?;
        let open = match session.containers.get_mut(&h.0) {
            Some(o) => o,
            None => return Err(req_err(ERR_HANDLE, format!("unknown container handle {}", h.0))),
        };
        let mut state = self.cluster.state()?;
        let stored = match state.containers.get_mut(&open.name) {
            Some(s) => s,
            None => {
                return Err(req_err(
                    ERR_NOT_FOUND,
                    format!("container {} no longer exists", open.name),
                ))
            }
        };
        if stored.columns != open.columns {
            return Err(req_err(
                ERR_SCHEMA,
                format!("schema of container {} has changed", open.name),
            ));
        }
        f(open, stored)
    }

    fn execute(&self, session: &mut Session, q: u64, for_update: bool) -> Result<u64, RequestError> {
        let query = match session.queries.get(&q) {
            Some(query) => query,
            None => return Err(req_err(ERR_HANDLE, format!("unknown query handle {}", q))),
        };
        let open = match session.containers.get(&query.container) {
            Some(o) => o,
            None => {
                return Err(req_err(
                    ERR_HANDLE,
                    "container of the query is closed".to_string(),
                ))
            }
        };
        let plan = &query.plan;
        if for_update && open.auto_commit {
            return Err(req_err(
                ERR_STATE,
                "fetch for update needs auto-commit disabled".to_string(),
            ));
        }
        if for_update && (plan.projection != BoundProjection::All || plan.statement.explain.is_some()) {
            return Err(req_err(
                ERR_ARGUMENT,
                "only row queries can be fetched for update".to_string(),
            ));
        }
        let state = self.cluster.state()?;
        let stored = match state.containers.get(&open.name) {
            Some(s) => s,
            None => {
                return Err(req_err(
                    ERR_NOT_FOUND,
                    format!("container {} no longer exists", open.name),
                ))
            }
        };
        if query.partial {
            trace!("query {} asked for partial execution, returning all results", q);
        }
        let rows = rows_view(open, stored);
        let hits: Vec<&StoredRow> = rows.iter().filter(|r| plan.matches(&r.cells)).collect();
        let (kind, content) = match plan.statement.explain {
            Some(analyze) => {
                let indexes: Vec<Option<&'static str>> = stored
                    .info
                    .columns
                    .iter()
                    .map(|c| index_name(c.index_type_flags))
                    .collect();
                let analyzed = if analyze {
                    Some((rows.len(), hits.len()))
                } else {
                    None
                };
                (
                    RowSetType::QueryAnalysis,
                    Content::Analysis(plan.explain(&stored.info, &indexes, analyzed)),
                )
            }
            None if plan.projection == BoundProjection::All => {
                let hits = plan.arrange(hits, |r| r.cells.as_slice(), query.limit);
                (
                    RowSetType::ContainerRows,
                    Content::Rows(hits.iter().map(|r| (r.id, r.cells.clone())).collect()),
                )
            }
            None => {
                let cells: Vec<&[Cell]> = hits.iter().map(|r| r.cells.as_slice()).collect();
                (
                    RowSetType::AggregationResult,
                    Content::Aggregation(plan.aggregate(&cells).into_iter().collect()),
                )
            }
        };
        let container = query.container;
        drop(state);
        let h = session.next_handle();
        trace!("query {} produced {} results", q, content.len());
        session.row_sets.insert(
            h,
            OpenRowSet {
                container,
                kind,
                content,
                pos: 0,
                current: None,
            },
        );
        Ok(h)
    }

    // Apply `f` to the rows of the container behind row set `rs`, with the
    // id of the row at the cursor. `consume` clears the cursor on success.
    fn with_current_row<R>(
        &self,
        rs: RowSetHandle,
        consume: bool,
        f: impl FnOnce(
            &mut OpenContainer,
            &mut StoredContainer,
            &Arc<[WireColumn]>,
            u64,
        ) -> Result<R, RequestError>,
    ) -> Result<R, RequestError> {
        let mut session = self.session()?;
        let session = &mut *session;
        let set = match session.row_sets.get_mut(&rs.0) {
            Some(s) => s,
            None => return Err(req_err(ERR_HANDLE, format!("unknown row set handle {}", rs.0))),
        };
        if set.kind != RowSetType::ContainerRows {
            return Err(req_err(ERR_STATE, "row set does not contain rows".to_string()));
        }
        let id = match set.current {
            Some(id) => id,
            None => return Err(req_err(ERR_STATE, "row set has no current row".to_string())),
        };
        let open = match session.containers.get_mut(&set.container) {
            Some(o) => o,
            None => {
                return Err(req_err(
                    ERR_HANDLE,
                    "container of the row set is closed".to_string(),
                ))
            }
        };
        let mut state = self.cluster.state()?;
        let stored = match state.containers.get_mut(&open.name) {
            Some(s) => s,
            None => {
                return Err(req_err(
                    ERR_NOT_FOUND,
                    format!("container {} no longer exists", open.name),
                ))
            }
        };
        let columns = open.columns.clone();
        let result = f(open, stored, &columns, id);
        if consume && result.is_ok() {
            set.current = None;
        }
        result
    }
}

impl GridClient for MemoryClient {
    fn allocate(&self, what: Allocation) -> Result<Lease, RequestError> {
        if let Ok(mut budget) = self.diag.alloc_budget.lock() {
            if let Some(n) = budget.get_mut(&what) {
                if *n == 0 {
                    budget.remove(&what);
                    return Err(RequestError::allocation(
                        ERR_ALLOCATION,
                        &format!("{:?} allocation failed", what),
                    ));
                }
                *n -= 1;
            }
        }
        Ok(Lease::tracked(self.counter(what)))
    }

    fn get_container_info(&self, name: &str) -> Result<Option<ContainerInfo>, RequestError> {
        self.begin("get_container_info")?;
        let _session = self.session()?;
        let state = self.cluster.state()?;
        Ok(state.containers.get(name).map(|c| c.info.clone()))
    }

    fn put_container(
        &self,
        info: &ContainerInfo,
        modifiable: bool,
    ) -> Result<(ContainerHandle, ContainerInfo), RequestError> {
        self.begin("put_container")?;
        let mut session = self.session()?;
        let mut state = self.cluster.state()?;
        for c in &info.columns {
            if !c.index_type_flags.is_empty() && c.index_type_flags != IndexTypeFlags::DEFAULT {
                check_index(c.column_type, c.index_type_flags)?;
            }
        }
        let columns = wire_columns(info);
        match state.containers.get_mut(&info.name) {
            Some(stored) if same_schema(&stored.info, info) => (),
            Some(stored) => {
                if !modifiable {
                    return Err(req_err(
                        ERR_SCHEMA,
                        format!("container {} already exists with a different schema", info.name),
                    ));
                }
                if stored.info.container_type != info.container_type || !same_key(&stored.info, info) {
                    return Err(req_err(
                        ERR_SCHEMA,
                        format!("can't change the type or row key of container {}", info.name),
                    ));
                }
                let mapping: Vec<Option<usize>> = info
                    .columns
                    .iter()
                    .map(|c| {
                        stored.info.columns.iter().position(|o| {
                            o.name.eq_ignore_ascii_case(&c.name) && o.column_type == c.column_type
                        })
                    })
                    .collect();
                for row in stored.rows.iter_mut() {
                    let mut cells = Vec::with_capacity(columns.len());
                    for (j, m) in mapping.iter().enumerate() {
                        let cell = match m.and_then(|i| row.cells.get(i)) {
                            Some(c) if *c != Cell::Null || columns[j].nullable => c.clone(),
                            _ if columns[j].nullable => Cell::Null,
                            _ => default_cell(columns[j].column_type),
                        };
                        cells.push(cell);
                    }
                    row.cells = cells;
                }
                let mut new_info = info.clone();
                for (j, m) in mapping.iter().enumerate() {
                    if let Some(i) = m {
                        new_info.columns[j].index_type_flags =
                            new_info.columns[j].index_type_flags | stored.info.columns[*i].index_type_flags;
                    }
                }
                stored.info = new_info;
                stored.columns = columns.clone();
                debug!("altered container {}", info.name);
            }
            None => {
                state.containers.insert(
                    info.name.clone(),
                    StoredContainer {
                        info: info.clone(),
                        columns: columns.clone(),
                        rows: Vec::new(),
                    },
                );
                debug!("created container {}", info.name);
            }
        }
        let stored_info = match state.containers.get(&info.name) {
            Some(s) => s.info.clone(),
            None => return Err(req_err(ERR_NOT_FOUND, format!("container {} vanished", info.name))),
        };
        let h = session.open_container(&info.name, wire_columns(&stored_info));
        Ok((h, stored_info))
    }

    fn get_container(
        &self,
        name: &str,
    ) -> Result<Option<(ContainerHandle, ContainerInfo)>, RequestError> {
        self.begin("get_container")?;
        let mut session = self.session()?;
        let state = self.cluster.state()?;
        match state.containers.get(name) {
            Some(stored) => {
                let h = session.open_container(name, stored.columns.clone());
                Ok(Some((h, stored.info.clone())))
            }
            None => Ok(None),
        }
    }

    fn drop_container(&self, name: &str) -> Result<(), RequestError> {
        self.begin("drop_container")?;
        let _session = self.session()?;
        let mut state = self.cluster.state()?;
        if state.containers.remove(name).is_some() {
            debug!("dropped container {}", name);
        }
        Ok(())
    }

    fn close_container(&self, container: ContainerHandle) -> Result<(), RequestError> {
        self.begin("close_container")?;
        let mut session = self.session()?;
        match session.containers.remove(&container.0) {
            Some(_) => Ok(()),
            None => Err(req_err(
                ERR_HANDLE,
                format!("unknown container handle {}", container.0),
            )),
        }
    }

    fn create_row(&self, container: ContainerHandle) -> Result<WireRow, RequestError> {
        let columns = {
            let session = self.session()?;
            match session.containers.get(&container.0) {
                Some(o) => o.columns.clone(),
                None => {
                    return Err(req_err(
                        ERR_HANDLE,
                        format!("unknown container handle {}", container.0),
                    ))
                }
            }
        };
        let lease = self.allocate(Allocation::WireRow)?;
        Ok(WireRow::new(&columns, lease))
    }

    fn get_row(
        &self,
        container: ContainerHandle,
        key: &RowKey,
        row: &mut WireRow,
        for_update: bool,
    ) -> Result<bool, RequestError> {
        self.begin("get_row")?;
        self.with_container(container, |open, stored| {
            if for_update && open.auto_commit {
                return Err(req_err(
                    ERR_STATE,
                    "get for update needs auto-commit disabled".to_string(),
                ));
            }
            if !key_fits(key, stored.info.row_key_type()) {
                return Err(req_err(
                    ERR_SCHEMA,
                    format!("key {:?} does not fit container {}", key, open.name),
                ));
            }
            if row.columns()[..] != open.columns[..] {
                return Err(req_err(
                    ERR_SCHEMA,
                    "row layout does not match the container".to_string(),
                ));
            }
            let rows = rows_view(open, stored);
            match find_key(rows, key) {
                Ok(i) => {
                    row.set_cells(rows[i].cells.clone());
                    Ok(true)
                }
                Err(_) => Ok(false),
            }
        })
    }

    fn put_row(&self, container: ContainerHandle, row: &WireRow) -> Result<bool, RequestError> {
        self.begin("put_row")?;
        self.with_container(container, |open, stored| {
            check_layout(row, &open.columns)?;
            let key = key_of(row.cells(), stored.info.row_key_assigned)?;
            let id = self.cluster.next_id();
            let cells = row.cells().to_vec();
            Ok(record(open, stored, Pending::Put { key, cells, id }))
        })
    }

    fn delete_row(&self, container: ContainerHandle, key: &RowKey) -> Result<bool, RequestError> {
        self.begin("delete_row")?;
        self.with_container(container, |open, stored| {
            if !key_fits(key, stored.info.row_key_type()) {
                return Err(req_err(
                    ERR_SCHEMA,
                    format!("key {:?} does not fit container {}", key, open.name),
                ));
            }
            if find_key(rows_view(open, stored), key).is_err() {
                return Ok(false);
            }
            let op = Pending::Remove {
                key: Some(key.clone()),
                id: 0,
            };
            Ok(record(open, stored, op))
        })
    }

    fn put_multiple_rows(
        &self,
        container: ContainerHandle,
        rows: &[&WireRow],
    ) -> Result<(), RequestError> {
        self.begin("put_multiple_rows")?;
        self.with_container(container, |open, stored| {
            let mut prepared = Vec::with_capacity(rows.len());
            for row in rows {
                check_layout(row, &open.columns)?;
                prepared.push((key_of(row.cells(), stored.info.row_key_assigned)?, row.cells().to_vec()));
            }
            for (key, cells) in prepared {
                let id = self.cluster.next_id();
                record(open, stored, Pending::Put { key, cells, id });
            }
            Ok(())
        })
    }

    fn create_index(
        &self,
        container: ContainerHandle,
        column: &str,
        flags: IndexTypeFlags,
        name: Option<&str>,
    ) -> Result<(), RequestError> {
        self.begin("create_index")?;
        if name == Some("") {
            return Err(req_err(ERR_ARGUMENT, "index name must be non-empty".to_string()));
        }
        self.with_container(container, |_, stored| {
            let i = match stored.info.column_index(column) {
                Some(i) => i,
                None => return Err(req_err(ERR_NOT_FOUND, format!("no column {}", column))),
            };
            let t = stored.info.columns[i].column_type;
            let flags = if flags == IndexTypeFlags::DEFAULT || flags.is_empty() {
                if t == GridType::Geometry {
                    IndexTypeFlags::SPATIAL
                } else {
                    IndexTypeFlags::TREE
                }
            } else {
                flags
            };
            check_index(t, flags)?;
            let c = &mut stored.info.columns[i];
            c.index_type_flags = IndexTypeFlags(c.index_type_flags.0.max(0) | flags.0);
            Ok(())
        })
    }

    fn drop_index(
        &self,
        container: ContainerHandle,
        column: &str,
        flags: IndexTypeFlags,
        _name: Option<&str>,
    ) -> Result<(), RequestError> {
        self.begin("drop_index")?;
        self.with_container(container, |_, stored| {
            let i = match stored.info.column_index(column) {
                Some(i) => i,
                None => return Err(req_err(ERR_NOT_FOUND, format!("no column {}", column))),
            };
            let c = &mut stored.info.columns[i];
            c.index_type_flags = if flags == IndexTypeFlags::DEFAULT {
                IndexTypeFlags::NONE
            } else {
                IndexTypeFlags(c.index_type_flags.0.max(0) & !flags.0)
            };
            Ok(())
        })
    }

    fn flush(&self, container: ContainerHandle) -> Result<(), RequestError> {
        self.begin("flush")?;
        self.with_container(container, |_, _| Ok(()))
    }

    fn set_auto_commit(&self, container: ContainerHandle, enabled: bool) -> Result<(), RequestError> {
        self.begin("set_auto_commit")?;
        self.with_container(container, |open, stored| {
            if enabled && !open.auto_commit {
                let n = commit_pending(open, stored);
                trace!("committed {} writes to {}", n, open.name);
            }
            open.auto_commit = enabled;
            Ok(())
        })
    }

    fn commit(&self, container: ContainerHandle) -> Result<(), RequestError> {
        self.begin("commit")?;
        self.with_container(container, |open, stored| {
            if open.auto_commit {
                return Err(req_err(ERR_STATE, "commit needs auto-commit disabled".to_string()));
            }
            let n = commit_pending(open, stored);
            trace!("committed {} writes to {}", n, open.name);
            Ok(())
        })
    }

    fn abort(&self, container: ContainerHandle) -> Result<(), RequestError> {
        self.begin("abort")?;
        self.with_container(container, |open, _| {
            if open.auto_commit {
                return Err(req_err(ERR_STATE, "abort needs auto-commit disabled".to_string()));
            }
            open.working = None;
            open.pending.clear();
            Ok(())
        })
    }

    fn query(&self, container: ContainerHandle, tql: &str) -> Result<QueryHandle, RequestError> {
        self.begin("query")?;
        let statement = tql::parse(tql).map_err(|e| req_err(ERR_SYNTAX, e))?;
        let plan = self.with_container(container, |_, stored| {
            tql::bind(&statement, &stored.info).map_err(|e| req_err(ERR_SYNTAX, e))
        })?;
        let mut session = self.session()?;
        let h = session.next_handle();
        session.queries.insert(
            h,
            OpenQuery {
                container: container.0,
                plan,
                limit: None,
                partial: false,
                pending: None,
            },
        );
        Ok(QueryHandle(h))
    }

    fn set_fetch_options(
        &self,
        query: QueryHandle,
        limit: Option<i64>,
        partial: bool,
    ) -> Result<(), RequestError> {
        self.begin("set_fetch_options")?;
        let mut session = self.session()?;
        match session.queries.get_mut(&query.0) {
            Some(q) => {
                q.limit = limit;
                q.partial = partial;
                Ok(())
            }
            None => Err(req_err(ERR_HANDLE, format!("unknown query handle {}", query.0))),
        }
    }

    fn fetch(&self, query: QueryHandle, for_update: bool) -> Result<RowSetHandle, RequestError> {
        self.begin("fetch")?;
        let mut session = self.session()?;
        Ok(RowSetHandle(self.execute(&mut session, query.0, for_update)?))
    }

    fn fetch_all(&self, queries: &[QueryHandle]) -> Result<(), RequestError> {
        self.begin("fetch_all")?;
        let mut session = self.session()?;
        let mut produced = Vec::with_capacity(queries.len());
        for q in queries {
            match self.execute(&mut session, q.0, false) {
                Ok(rs) => produced.push((q.0, rs)),
                Err(e) => {
                    for (_, rs) in produced {
                        session.row_sets.remove(&rs);
                    }
                    return Err(e);
                }
            }
        }
        for (q, rs) in produced {
            let old = match session.queries.get_mut(&q) {
                Some(query) => query.pending.replace(rs),
                None => None,
            };
            if let Some(old) = old {
                session.row_sets.remove(&old);
            }
        }
        Ok(())
    }

    fn get_row_set(&self, query: QueryHandle) -> Result<Option<RowSetHandle>, RequestError> {
        self.begin("get_row_set")?;
        let mut session = self.session()?;
        match session.queries.get_mut(&query.0) {
            Some(q) => Ok(q.pending.take().map(RowSetHandle)),
            None => Err(req_err(ERR_HANDLE, format!("unknown query handle {}", query.0))),
        }
    }

    fn close_query(&self, query: QueryHandle) -> Result<(), RequestError> {
        self.begin("close_query")?;
        let mut session = self.session()?;
        match session.queries.remove(&query.0) {
            Some(q) => {
                if let Some(rs) = q.pending {
                    session.row_sets.remove(&rs);
                }
                Ok(())
            }
            None => Err(req_err(ERR_HANDLE, format!("unknown query handle {}", query.0))),
        }
    }

    fn row_set_type(&self, row_set: RowSetHandle) -> Result<RowSetType, RequestError> {
        self.begin("row_set_type")?;
        let session = self.session()?;
        match session.row_sets.get(&row_set.0) {
            Some(rs) => Ok(rs.kind),
            None => Err(req_err(ERR_HANDLE, format!("unknown row set handle {}", row_set.0))),
        }
    }

    fn row_set_size(&self, row_set: RowSetHandle) -> Result<i32, RequestError> {
        self.begin("row_set_size")?;
        let session = self.session()?;
        match session.row_sets.get(&row_set.0) {
            Some(rs) => Ok(rs.content.len() as i32),
            None => Err(req_err(ERR_HANDLE, format!("unknown row set handle {}", row_set.0))),
        }
    }

    fn has_next_row(&self, row_set: RowSetHandle) -> Result<bool, RequestError> {
        self.begin("has_next_row")?;
        let session = self.session()?;
        match session.row_sets.get(&row_set.0) {
            Some(rs) => Ok(rs.pos < rs.content.len()),
            None => Err(req_err(ERR_HANDLE, format!("unknown row set handle {}", row_set.0))),
        }
    }

    fn next_row(&self, row_set: RowSetHandle, row: &mut WireRow) -> Result<(), RequestError> {
        self.begin("next_row")?;
        let mut session = self.session()?;
        let session = &mut *session;
        let rs = match session.row_sets.get_mut(&row_set.0) {
            Some(rs) => rs,
            None => {
                return Err(req_err(
                    ERR_HANDLE,
                    format!("unknown row set handle {}", row_set.0),
                ))
            }
        };
        let rows = match &rs.content {
            Content::Rows(r) => r,
            _ => return Err(req_err(ERR_STATE, "row set does not contain rows".to_string())),
        };
        let (id, cells) = match rows.get(rs.pos) {
            Some(r) => r,
            None => return Err(req_err(ERR_STATE, "no more rows".to_string())),
        };
        if let Some(open) = session.containers.get(&rs.container) {
            if row.columns()[..] != open.columns[..] {
                return Err(req_err(
                    ERR_SCHEMA,
                    "row layout does not match the container".to_string(),
                ));
            }
        }
        row.set_cells(cells.clone());
        rs.current = Some(*id);
        rs.pos += 1;
        Ok(())
    }

    fn next_aggregation(&self, row_set: RowSetHandle) -> Result<AggregationValue, RequestError> {
        self.begin("next_aggregation")?;
        let mut session = self.session()?;
        let rs = match session.row_sets.get_mut(&row_set.0) {
            Some(rs) => rs,
            None => {
                return Err(req_err(
                    ERR_HANDLE,
                    format!("unknown row set handle {}", row_set.0),
                ))
            }
        };
        let value = match &rs.content {
            Content::Aggregation(v) => v.get(rs.pos).copied(),
            _ => {
                return Err(req_err(
                    ERR_STATE,
                    "row set does not contain an aggregation".to_string(),
                ))
            }
        };
        match value {
            Some(v) => {
                rs.pos += 1;
                Ok(v)
            }
            None => Err(req_err(ERR_STATE, "no more results".to_string())),
        }
    }

    fn next_query_analysis(
        &self,
        row_set: RowSetHandle,
    ) -> Result<Option<QueryAnalysisEntry>, RequestError> {
        self.begin("next_query_analysis")?;
        let mut session = self.session()?;
        let rs = match session.row_sets.get_mut(&row_set.0) {
            Some(rs) => rs,
            None => {
                return Err(req_err(
                    ERR_HANDLE,
                    format!("unknown row set handle {}", row_set.0),
                ))
            }
        };
        let entry = match &rs.content {
            Content::Analysis(entries) => entries.get(rs.pos).cloned(),
            _ => {
                return Err(req_err(
                    ERR_STATE,
                    "row set does not contain a query analysis".to_string(),
                ))
            }
        };
        if entry.is_some() {
            rs.pos += 1;
        }
        Ok(entry)
    }

    fn update_current_row(&self, row_set: RowSetHandle, row: &WireRow) -> Result<(), RequestError> {
        self.begin("update_current_row")?;
        self.with_current_row(row_set, false, |open, stored, columns, id| {
            check_layout(row, columns)?;
            let current = match rows_view(open, stored).iter().find(|r| r.id == id) {
                Some(r) => r.key.clone(),
                None => return Err(req_err(ERR_NOT_FOUND, "current row no longer exists".to_string())),
            };
            let key = key_of(row.cells(), current.is_some())?;
            if key != current {
                return Err(req_err(ERR_SCHEMA, "the row key can't be changed".to_string()));
            }
            let cells = row.cells().to_vec();
            record(open, stored, Pending::Update { key, cells, id });
            Ok(())
        })
    }

    fn delete_current_row(&self, row_set: RowSetHandle) -> Result<(), RequestError> {
        self.begin("delete_current_row")?;
        self.with_current_row(row_set, true, |open, stored, _, id| {
            let key = match rows_view(open, stored).iter().find(|r| r.id == id) {
                Some(r) => r.key.clone(),
                None => return Err(req_err(ERR_NOT_FOUND, "current row no longer exists".to_string())),
            };
            record(open, stored, Pending::Remove { key, id });
            Ok(())
        })
    }

    fn close_row_set(&self, row_set: RowSetHandle) -> Result<(), RequestError> {
        self.begin("close_row_set")?;
        let mut session = self.session()?;
        match session.row_sets.remove(&row_set.0) {
            Some(_) => Ok(()),
            None => Err(req_err(
                ERR_HANDLE,
                format!("unknown row set handle {}", row_set.0),
            )),
        }
    }

    fn put_multiple_container_rows(
        &self,
        entries: &[ContainerRowsEntry<'_>],
    ) -> Result<(), RequestError> {
        self.begin("put_multiple_container_rows")?;
        let _session = self.session()?;
        let mut state = self.cluster.state()?;
        let mut prepared = Vec::with_capacity(entries.len());
        for e in entries {
            let stored = match state.containers.get(e.container_name) {
                Some(s) => s,
                None => {
                    return Err(req_err(
                        ERR_NOT_FOUND,
                        format!("container {} not found", e.container_name),
                    ))
                }
            };
            let mut rows = Vec::with_capacity(e.rows.len());
            for row in &e.rows {
                check_layout(row, &stored.columns)?;
                rows.push((key_of(row.cells(), stored.info.row_key_assigned)?, row.cells().to_vec()));
            }
            prepared.push((e.container_name, rows));
        }
        for (name, rows) in prepared {
            if let Some(stored) = state.containers.get_mut(name) {
                for (key, cells) in rows {
                    put_into(&mut stored.rows, key, cells, self.cluster.next_id());
                }
            }
        }
        Ok(())
    }

    fn get_multiple_container_rows(
        &self,
        predicates: &[RowKeyPredicateEntry<'_>],
    ) -> Result<Vec<ContainerRows>, RequestError> {
        self.begin("get_multiple_container_rows")?;
        let _session = self.session()?;
        let state = self.cluster.state()?;
        let mut response = Vec::with_capacity(predicates.len());
        for p in predicates {
            let stored = match state.containers.get(p.container_name) {
                Some(s) => s,
                None => {
                    return Err(req_err(
                        ERR_NOT_FOUND,
                        format!("container {} not found", p.container_name),
                    ))
                }
            };
            if stored.info.row_key_type() != Some(p.predicate.get_key_type()) {
                return Err(req_err(
                    ERR_SCHEMA,
                    format!(
                        "predicate key type {} does not fit container {}",
                        p.predicate.get_key_type(),
                        p.container_name
                    ),
                ));
            }
            let mut rows = Vec::new();
            for r in &stored.rows {
                if r.key.as_ref().map_or(false, |k| p.predicate.matches(k)) {
                    let lease = self.allocate(Allocation::WireRow)?;
                    rows.push(WireRow::from_cells(
                        stored.columns.clone(),
                        r.cells.clone(),
                        lease,
                    ));
                }
            }
            if !rows.is_empty() {
                response.push(ContainerRows {
                    container_name: p.container_name.to_string(),
                    rows,
                });
            }
        }
        let order = match self.diag.response_order.lock() {
            Ok(o) => *o,
            Err(_) => ResponseOrder::Request,
        };
        match order {
            ResponseOrder::Request => (),
            ResponseOrder::Reverse => response.reverse(),
            ResponseOrder::Rotate(n) => {
                if !response.is_empty() {
                    let n = n % response.len();
                    response.rotate_left(n);
                }
            }
        }
        Ok(response)
    }

    fn partition_count(&self) -> Result<i32, RequestError> {
        self.begin("partition_count")?;
        let _session = self.session()?;
        Ok(self.cluster.partition_count)
    }

    fn partition_container_count(&self, partition: i32) -> Result<i64, RequestError> {
        Ok(self.partition_container_names(partition, 0, None)?.len() as i64)
    }

    fn partition_container_names(
        &self,
        partition: i32,
        start: i64,
        limit: Option<i64>,
    ) -> Result<Vec<String>, RequestError> {
        self.begin("partition_container_names")?;
        let _session = self.session()?;
        if partition < 0 || partition >= self.cluster.partition_count {
            return Err(req_err(
                ERR_ARGUMENT,
                format!("partition {} out of range", partition),
            ));
        }
        let state = self.cluster.state()?;
        let names = state
            .containers
            .keys()
            .filter(|n| self.cluster.partition_of(n) == partition)
            .skip(start.max(0) as usize)
            .take(limit.map_or(usize::MAX, |l| l.max(0) as usize))
            .cloned()
            .collect();
        Ok(names)
    }

    fn partition_index_of_container(&self, name: &str) -> Result<i32, RequestError> {
        self.begin("partition_index_of_container")?;
        let _session = self.session()?;
        Ok(self.cluster.partition_of(name))
    }

    fn close(&self) -> Result<(), RequestError> {
        self.begin("close")?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| req_err(ERR_STATE, "session lock poisoned".to_string()))?;
        if !session.closed {
            session.closed = true;
            session.row_sets.clear();
            session.queries.clear();
            session.containers.clear();
            debug!("closed memory session");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container_info::ColumnInfo;
    use crate::row_key_predicate::RowKeyPredicate;
    use crate::types::Field;
    use std::error::Error;

    fn people() -> ContainerInfo {
        ContainerInfo::new("people")
            .column(ColumnInfo::new("id", GridType::Long))
            .column(ColumnInfo::new("name", GridType::String))
            .row_key(true)
    }

    fn put(
        client: &MemoryClient,
        h: ContainerHandle,
        id: i64,
        name: &str,
    ) -> Result<bool, Box<dyn Error>> {
        let mut row = client.create_row(h)?;
        row.set_long(0, id)?;
        row.set_string(1, name)?;
        Ok(client.put_row(h, &row)?)
    }

    #[test]
    fn test_key_order_and_replace() -> Result<(), Box<dyn Error>> {
        let client = MemoryClient::new();
        let (h, _) = client.put_container(&people(), false)?;
        assert!(!put(&client, h, 3, "c")?);
        assert!(!put(&client, h, 1, "a")?);
        assert!(put(&client, h, 3, "cc")?);

        let q = client.query(h, "SELECT *")?;
        let rs = client.fetch(q, false)?;
        assert_eq!(client.row_set_size(rs)?, 2);
        let mut row = client.create_row(h)?;
        client.next_row(rs, &mut row)?;
        assert_eq!(row.get_field(0)?, crate::wire::WireRef::Long(1));
        client.next_row(rs, &mut row)?;
        assert_eq!(row.get_field(1)?, crate::wire::WireRef::String("cc"));
        assert!(!client.has_next_row(rs)?);
        Ok(())
    }

    #[test]
    fn test_transactions() -> Result<(), Box<dyn Error>> {
        let cluster = MemoryCluster::new();
        let a = MemoryClient::connect(&cluster);
        let b = MemoryClient::connect(&cluster);
        let (ha, _) = a.put_container(&people(), false)?;
        let (hb, _) = b.put_container(&people(), false)?;

        a.set_auto_commit(ha, false)?;
        put(&a, ha, 1, "a")?;
        let mut row = b.create_row(hb)?;
        assert!(!b.get_row(hb, &RowKey::Long(1), &mut row, false)?);
        assert!(a.get_row(ha, &RowKey::Long(1), &mut row, true)?);
        a.commit(ha)?;
        assert!(b.get_row(hb, &RowKey::Long(1), &mut row, false)?);

        put(&a, ha, 2, "b")?;
        a.abort(ha)?;
        assert!(!b.get_row(hb, &RowKey::Long(2), &mut row, false)?);

        // for update needs manual commit
        assert!(b.get_row(hb, &RowKey::Long(1), &mut row, true).is_err());
        assert!(b.commit(hb).is_err());
        Ok(())
    }

    #[test]
    fn test_commit_keeps_other_writes() -> Result<(), Box<dyn Error>> {
        let cluster = MemoryCluster::new();
        let a = MemoryClient::connect(&cluster);
        let b = MemoryClient::connect(&cluster);
        let (ha, _) = a.put_container(&people(), false)?;
        let (hb, _) = b.put_container(&people(), false)?;
        put(&b, hb, 4, "d")?;

        a.set_auto_commit(ha, false)?;
        put(&a, ha, 1, "a")?;
        assert!(a.delete_row(ha, &RowKey::Long(4))?);
        // written after the first uncommitted write
        put(&b, hb, 2, "b")?;
        let mut batch = a.create_row(ha)?;
        batch.set_long(0, 3)?;
        batch.set_string(1, "c")?;
        a.put_multiple_container_rows(&[ContainerRowsEntry {
            container_name: "people",
            rows: vec![&batch],
        }])?;
        a.commit(ha)?;

        let mut row = b.create_row(hb)?;
        for id in [1, 2, 3] {
            assert!(b.get_row(hb, &RowKey::Long(id), &mut row, false)?, "row {}", id);
        }
        assert!(!b.get_row(hb, &RowKey::Long(4), &mut row, false)?);

        // turning auto-commit back on commits too
        put(&a, ha, 5, "e")?;
        a.set_auto_commit(ha, true)?;
        assert!(b.get_row(hb, &RowKey::Long(5), &mut row, false)?);
        Ok(())
    }

    #[test]
    fn test_schema_conflicts() -> Result<(), Box<dyn Error>> {
        let client = MemoryClient::new();
        let (h, _) = client.put_container(&people(), false)?;
        put(&client, h, 1, "a")?;

        let wider = people().column(ColumnInfo::new("age", GridType::Integer).nullable(false));
        let e = client.put_container(&wider, false).err().ok_or("accepted")?;
        assert_eq!(e.code, ERR_SCHEMA);

        let (h2, info) = client.put_container(&wider, true)?;
        assert_eq!(info.column_count(), 3);
        let mut row = client.create_row(h2)?;
        assert!(client.get_row(h2, &RowKey::Long(1), &mut row, false)?);
        assert_eq!(row.get_field(2)?, crate::wire::WireRef::Integer(0));

        // the old handle sees the schema change
        let mut old = WireRow::new(&wire_columns(&people()), Lease::untracked());
        assert!(client.get_row(h, &RowKey::Long(1), &mut old, false).is_err());

        let rekeyed = ContainerInfo::new("people")
            .column(ColumnInfo::new("id", GridType::String))
            .row_key(true);
        assert!(client.put_container(&rekeyed, true).is_err());
        Ok(())
    }

    #[test]
    fn test_partitions() -> Result<(), Box<dyn Error>> {
        let cluster = MemoryCluster::with_partitions(4);
        let client = MemoryClient::connect(&cluster);
        for i in 0..20 {
            let info = ContainerInfo::new(&format!("c{}", i))
                .column(ColumnInfo::new("id", GridType::Integer))
                .row_key(true);
            client.put_container(&info, false)?;
        }
        let mut total = 0;
        for p in 0..4 {
            let names = client.partition_container_names(p, 0, None)?;
            for n in &names {
                assert_eq!(client.partition_index_of_container(n)?, p);
            }
            assert_eq!(client.partition_container_count(p)?, names.len() as i64);
            if names.len() > 1 {
                let tail = client.partition_container_names(p, 1, Some(1))?;
                assert_eq!(tail, vec![names[1].clone()]);
            }
            total += names.len();
        }
        assert_eq!(total, 20);
        assert_eq!(
            client.partition_index_of_container("C1")?,
            client.partition_index_of_container("c1")?
        );
        assert!(client.partition_container_names(4, 0, None).is_err());
        Ok(())
    }

    #[test]
    fn test_allocation_tracking() -> Result<(), Box<dyn Error>> {
        let client = MemoryClient::new();
        let (h, _) = client.put_container(&people(), false)?;
        let r1 = client.create_row(h)?;
        let r2 = client.create_row(h)?;
        assert_eq!(client.live_allocations(Allocation::WireRow), 2);
        drop(r1);
        assert_eq!(client.live_allocations(Allocation::WireRow), 1);

        client.fail_allocation_after(Allocation::WireRow, 1);
        let r3 = client.create_row(h)?;
        let e = client.create_row(h).err().ok_or("allocated")?;
        assert_eq!(e.code, ERR_ALLOCATION);
        // one-shot
        let r4 = client.create_row(h)?;
        drop((r2, r3, r4));
        assert_eq!(client.live_allocations(Allocation::WireRow), 0);
        Ok(())
    }

    #[test]
    fn test_batch_get_order() -> Result<(), Box<dyn Error>> {
        let client = MemoryClient::new();
        let mut handles = Vec::new();
        for name in ["a", "b", "c"] {
            let info = ContainerInfo::new(name)
                .column(ColumnInfo::new("id", GridType::Long))
                .row_key(true);
            let (h, _) = client.put_container(&info, false)?;
            let mut row = client.create_row(h)?;
            row.set_long(0, 1)?;
            client.put_row(h, &row)?;
            handles.push(h);
        }
        let mut pred = RowKeyPredicate::new(GridType::Long)?;
        pred.set_range(Some(&Field::Long(0)), None)?;
        let request: Vec<RowKeyPredicateEntry> = ["a", "b", "c"]
            .iter()
            .map(|n| RowKeyPredicateEntry {
                container_name: *n,
                predicate: &pred,
            })
            .collect();

        client.set_response_order(ResponseOrder::Rotate(1));
        let names: Vec<String> = client
            .get_multiple_container_rows(&request)?
            .into_iter()
            .map(|c| c.container_name)
            .collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(client.live_allocations(Allocation::WireRow), 0);

        client.fail_next(
            "get_multiple_container_rows",
            RequestError::timeout(9, "slow"),
        );
        let e = client.get_multiple_container_rows(&request).err().ok_or("no error")?;
        assert!(e.timeout);
        assert_eq!(client.request_count("get_multiple_container_rows"), 2);
        Ok(())
    }

    #[test]
    fn test_closed_session() -> Result<(), Box<dyn Error>> {
        let client = MemoryClient::new();
        client.close()?;
        client.close()?;
        let e = client.put_container(&people(), false).err().ok_or("open")?;
        assert_eq!(e.code, ERR_CLOSED);
        Ok(())
    }
}
