//! The contract the external engine must satisfy.
//!
//! The engine owns the wire protocol, authentication and TLS. The driver
//! only requires the start/continue entry points, eager access to error
//! text and code, and exact-length raw cell bytes. `MariadbSession` in
//! this crate implements these traits over libmariadb; tests use a
//! scripted implementation.

use asyncmaria_core::Result;

use crate::config::ConnectParams;
use crate::status::WaitStatus;

/// One result-set column: display name and wire type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub type_code: u8,
}

/// Outcome of a connect start/continue step.
#[derive(Debug, Clone, Copy)]
pub struct ConnectStep {
    /// Conditions to wait on; zero means the step completed.
    pub status: WaitStatus,
    /// Valid only once `status` is zero: did a session come up?
    pub connected: bool,
}

/// Outcome of a query start/continue step.
#[derive(Debug, Clone, Copy)]
pub struct QueryStep {
    /// Conditions to wait on; zero means the step completed.
    pub status: WaitStatus,
    /// Valid only once `status` is zero: did the engine report failure?
    pub failed: bool,
}

/// One raw row: per-cell exact-length bytes, `None` for NULL cells.
pub type RawRow = Vec<Option<Vec<u8>>>;

/// A session handle into the engine.
///
/// Exactly one operation may be in flight per session; the `Connection`
/// state machine enforces that ordering.
pub trait EngineSession {
    type Rows: EngineRows;

    /// Begin establishing a session.
    fn connect_start(&mut self, params: &ConnectParams) -> Result<ConnectStep>;

    /// Resume an in-flight connect with the observed conditions.
    fn connect_cont(&mut self, ready: WaitStatus) -> Result<ConnectStep>;

    /// Begin dispatching query text. Raw bytes pass through unchanged.
    fn query_start(&mut self, sql: &[u8]) -> Result<QueryStep>;

    /// Resume an in-flight query with the observed conditions.
    fn query_cont(&mut self, ready: WaitStatus) -> Result<QueryStep>;

    /// Begin tearing the session down.
    fn close_start(&mut self) -> Result<WaitStatus>;

    /// Resume an in-flight close with the observed conditions.
    fn close_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus>;

    /// Buffer the whole pending result set client-side.
    ///
    /// `None` means the engine produced no result set; the caller reads
    /// the error channel to find out why.
    fn store_result(&mut self) -> Result<Option<Self::Rows>>;

    /// Stream the pending result set row by row from the server.
    fn use_result(&mut self) -> Result<Option<Self::Rows>>;

    /// Block until one of the requested conditions holds on the
    /// session's socket.
    fn wait(&mut self, requested: WaitStatus) -> Result<WaitStatus>;

    /// The engine's current error text, read eagerly at failure time.
    fn last_error(&self) -> String;

    /// The engine's current numeric error code.
    fn last_errno(&self) -> u32;
}

/// A result-set handle.
pub trait EngineRows {
    /// Number of columns in the result set.
    fn field_count(&mut self) -> usize;

    /// Column descriptors, in result order.
    fn fields(&mut self) -> Result<Vec<Field>>;

    /// Begin fetching the next row.
    fn fetch_start(&mut self) -> Result<WaitStatus>;

    /// Resume an in-flight fetch with the observed conditions.
    fn fetch_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus>;

    /// The row captured by the last completed fetch.
    ///
    /// `None` is end of data, or an engine failure the caller
    /// distinguishes through the session's error channel.
    fn take_row(&mut self) -> Option<RawRow>;

    /// Begin releasing the result set.
    fn free_start(&mut self) -> Result<WaitStatus>;

    /// Resume an in-flight free with the observed conditions.
    fn free_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus>;

    /// Release the result set synchronously. Drop safety net; may block.
    fn free_sync(&mut self);
}
