//! Scripted engine for exercising the state machines without a server.
//!
//! Each operation pops its next step outcome from a per-operation
//! queue; an empty queue completes immediately. `wait` echoes the
//! requested conditions back as observed, so scripted pending statuses
//! drive exactly one resume each.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use asyncmaria_core::Result;

use crate::config::ConnectParams;
use crate::engine::{ConnectStep, EngineRows, EngineSession, Field, QueryStep, RawRow};
use crate::status::WaitStatus;

pub struct ScriptedSession {
    connect_queue: VecDeque<WaitStatus>,
    query_queue: VecDeque<WaitStatus>,
    close_queue: VecDeque<WaitStatus>,
    connect_fails: bool,
    query_fails: bool,
    error_text: String,
    errno: u32,
    pub rows: Option<ScriptedRows>,
    pub calls: Vec<&'static str>,
    pub queries: Vec<Vec<u8>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            connect_queue: VecDeque::new(),
            query_queue: VecDeque::new(),
            close_queue: VecDeque::new(),
            connect_fails: false,
            query_fails: false,
            error_text: String::new(),
            errno: 0,
            rows: None,
            calls: Vec::new(),
            queries: Vec::new(),
        }
    }

    /// Statuses returned by successive connect steps; the queue runs
    /// out to completion.
    pub fn connect_statuses(mut self, statuses: Vec<WaitStatus>) -> Self {
        self.connect_queue = statuses.into();
        self
    }

    pub fn query_statuses(mut self, statuses: Vec<WaitStatus>) -> Self {
        self.query_queue = statuses.into();
        self
    }

    pub fn close_statuses(mut self, statuses: Vec<WaitStatus>) -> Self {
        self.close_queue = statuses.into();
        self
    }

    pub fn fail_connect(mut self) -> Self {
        self.connect_fails = true;
        self
    }

    pub fn fail_query(mut self) -> Self {
        self.query_fails = true;
        self
    }

    pub fn engine_error(mut self, errno: u32, text: &str) -> Self {
        self.errno = errno;
        self.error_text = text.to_string();
        self
    }

    /// The result set handed out by the next store/use call.
    pub fn result(mut self, rows: ScriptedRows) -> Self {
        self.rows = Some(rows);
        self
    }

    fn next(queue: &mut VecDeque<WaitStatus>) -> WaitStatus {
        queue.pop_front().unwrap_or(WaitStatus::NONE)
    }
}

impl EngineSession for ScriptedSession {
    type Rows = ScriptedRows;

    fn connect_start(&mut self, _params: &ConnectParams) -> Result<ConnectStep> {
        self.calls.push("connect_start");
        Ok(ConnectStep {
            status: Self::next(&mut self.connect_queue),
            connected: !self.connect_fails,
        })
    }

    fn connect_cont(&mut self, _ready: WaitStatus) -> Result<ConnectStep> {
        self.calls.push("connect_cont");
        Ok(ConnectStep {
            status: Self::next(&mut self.connect_queue),
            connected: !self.connect_fails,
        })
    }

    fn query_start(&mut self, sql: &[u8]) -> Result<QueryStep> {
        self.calls.push("query_start");
        self.queries.push(sql.to_vec());
        Ok(QueryStep {
            status: Self::next(&mut self.query_queue),
            failed: self.query_fails,
        })
    }

    fn query_cont(&mut self, _ready: WaitStatus) -> Result<QueryStep> {
        self.calls.push("query_cont");
        Ok(QueryStep {
            status: Self::next(&mut self.query_queue),
            failed: self.query_fails,
        })
    }

    fn close_start(&mut self) -> Result<WaitStatus> {
        self.calls.push("close_start");
        Ok(Self::next(&mut self.close_queue))
    }

    fn close_cont(&mut self, _ready: WaitStatus) -> Result<WaitStatus> {
        self.calls.push("close_cont");
        Ok(Self::next(&mut self.close_queue))
    }

    fn store_result(&mut self) -> Result<Option<Self::Rows>> {
        self.calls.push("store_result");
        Ok(self.rows.take())
    }

    fn use_result(&mut self) -> Result<Option<Self::Rows>> {
        self.calls.push("use_result");
        Ok(self.rows.take())
    }

    fn wait(&mut self, requested: WaitStatus) -> Result<WaitStatus> {
        self.calls.push("wait");
        Ok(requested)
    }

    fn last_error(&self) -> String {
        self.error_text.clone()
    }

    fn last_errno(&self) -> u32 {
        self.errno
    }
}

pub struct ScriptedRows {
    fields: Vec<Field>,
    rows: VecDeque<RawRow>,
    fetch_queue: VecDeque<WaitStatus>,
    free_queue: VecDeque<WaitStatus>,
    current: Option<RawRow>,
    pub fetch_calls: Arc<AtomicUsize>,
    pub freed_via_ops: Arc<AtomicBool>,
    pub freed_via_sync: Arc<AtomicBool>,
}

impl ScriptedRows {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            rows: VecDeque::new(),
            fetch_queue: VecDeque::new(),
            free_queue: VecDeque::new(),
            current: None,
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            freed_via_ops: Arc::new(AtomicBool::new(false)),
            freed_via_sync: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn row(mut self, row: RawRow) -> Self {
        self.rows.push_back(row);
        self
    }

    /// Statuses returned by successive fetch steps; once the queue
    /// runs out every fetch completes immediately.
    pub fn fetch_statuses(mut self, statuses: Vec<WaitStatus>) -> Self {
        self.fetch_queue = statuses.into();
        self
    }

    pub fn free_statuses(mut self, statuses: Vec<WaitStatus>) -> Self {
        self.free_queue = statuses.into();
        self
    }

    fn fetch_step(&mut self) -> WaitStatus {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let status = self.fetch_queue.pop_front().unwrap_or(WaitStatus::NONE);
        if status.is_done() {
            self.current = self.rows.pop_front();
        }
        status
    }
}

impl EngineRows for ScriptedRows {
    fn field_count(&mut self) -> usize {
        self.fields.len()
    }

    fn fields(&mut self) -> Result<Vec<Field>> {
        Ok(self.fields.clone())
    }

    fn fetch_start(&mut self) -> Result<WaitStatus> {
        Ok(self.fetch_step())
    }

    fn fetch_cont(&mut self, _ready: WaitStatus) -> Result<WaitStatus> {
        Ok(self.fetch_step())
    }

    fn take_row(&mut self) -> Option<RawRow> {
        self.current.take()
    }

    fn free_start(&mut self) -> Result<WaitStatus> {
        let status = self.free_queue.pop_front().unwrap_or(WaitStatus::NONE);
        if status.is_done() {
            self.freed_via_ops.store(true, Ordering::SeqCst);
        }
        Ok(status)
    }

    fn free_cont(&mut self, _ready: WaitStatus) -> Result<WaitStatus> {
        let status = self.free_queue.pop_front().unwrap_or(WaitStatus::NONE);
        if status.is_done() {
            self.freed_via_ops.store(true, Ordering::SeqCst);
        }
        Ok(status)
    }

    fn free_sync(&mut self) {
        self.freed_via_sync.store(true, Ordering::SeqCst);
    }
}
