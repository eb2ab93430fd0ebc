//! Connection lifecycle state machine.

use std::sync::Arc;

use asyncmaria_core::{ConnectionError, Error, QueryError, Result};

use crate::config::ConnectParams;
use crate::convert::ConvertRegistry;
use crate::cursor::Cursor;
use crate::driver::{run_to_completion, NonblockOp};
use crate::engine::{ConnectStep, EngineSession, QueryStep};
use crate::status::WaitStatus;

/// Lifecycle states of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// No session established yet.
    Unconnected,
    /// A connect operation is in flight.
    Connecting,
    /// Session up, no operation in flight.
    Connected,
    /// A query operation is in flight.
    Querying,
    /// A close operation is in flight.
    Closing,
    /// Session torn down; only close (a no-op) is permitted.
    Closed,
}

/// A single engine session with exactly one operation in flight at a time.
///
/// Every operation comes in two shapes: the start/continue pair for
/// hosts that multiplex their own event loop, and a blocking
/// convenience that drives the pair to completion internally. Calling
/// an operation from the wrong state is reported as a code-0 connection
/// error without touching the engine.
pub struct Connection<S: EngineSession> {
    pub(crate) session: S,
    state: ConnState,
    pub(crate) registry: Arc<ConvertRegistry>,
}

impl<S: EngineSession> Connection<S> {
    /// Wrap an engine session. No I/O happens until connect.
    pub fn new(session: S) -> Self {
        Self {
            session,
            state: ConnState::Unconnected,
            registry: Arc::new(ConvertRegistry::new()),
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// The conversion registry shared with cursors opened on this
    /// connection.
    pub fn registry(&self) -> &Arc<ConvertRegistry> {
        &self.registry
    }

    /// Begin establishing the session.
    pub fn connect_start(&mut self, params: &ConnectParams) -> Result<WaitStatus> {
        if self.state != ConnState::Unconnected {
            return Err(self.misuse("connect", "a session already exists"));
        }
        let step = self.session.connect_start(params)?;
        self.finish_connect_step(step)
    }

    /// Resume an in-flight connect with the observed conditions.
    pub fn connect_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        if self.state != ConnState::Connecting {
            return Err(self.misuse("connect_cont", "no connect is in flight"));
        }
        let step = self.session.connect_cont(ready)?;
        self.finish_connect_step(step)
    }

    fn finish_connect_step(&mut self, step: ConnectStep) -> Result<WaitStatus> {
        if step.status.is_pending() {
            self.state = ConnState::Connecting;
            tracing::trace!(status = %step.status, "connect suspended");
            return Ok(step.status);
        }
        if step.connected {
            self.state = ConnState::Connected;
            tracing::debug!("session established");
            Ok(WaitStatus::NONE)
        } else {
            self.state = ConnState::Closed;
            Err(self.engine_connection_error())
        }
    }

    /// Begin dispatching query text. The bytes pass through to the
    /// engine unchanged.
    pub fn query_start(&mut self, sql: impl AsRef<[u8]>) -> Result<WaitStatus> {
        if self.state != ConnState::Connected {
            return Err(self.misuse("query", "the session is not connected and idle"));
        }
        let step = self.session.query_start(sql.as_ref())?;
        self.finish_query_step(step)
    }

    /// Resume an in-flight query with the observed conditions.
    pub fn query_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        if self.state != ConnState::Querying {
            return Err(self.misuse("query_cont", "no query is in flight"));
        }
        let step = self.session.query_cont(ready)?;
        self.finish_query_step(step)
    }

    fn finish_query_step(&mut self, step: QueryStep) -> Result<WaitStatus> {
        if step.status.is_pending() {
            self.state = ConnState::Querying;
            tracing::trace!(status = %step.status, "query suspended");
            return Ok(step.status);
        }
        // The session survives a failed statement.
        self.state = ConnState::Connected;
        if step.failed {
            Err(Error::Query(QueryError {
                message: self.session.last_error(),
                code: self.session.last_errno(),
            }))
        } else {
            Ok(WaitStatus::NONE)
        }
    }

    /// Begin tearing the session down.
    ///
    /// On an already-closed or never-connected session this is a
    /// completed no-op.
    pub fn close_start(&mut self) -> Result<WaitStatus> {
        match self.state {
            ConnState::Closed | ConnState::Unconnected => return Ok(WaitStatus::NONE),
            ConnState::Connecting | ConnState::Querying => {
                return Err(self.misuse("close", "another operation is in flight"));
            }
            ConnState::Connected | ConnState::Closing => {}
        }
        let status = self.session.close_start()?;
        self.finish_close_step(status)
    }

    /// Resume an in-flight close with the observed conditions.
    pub fn close_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        if self.state != ConnState::Closing {
            return Err(self.misuse("close_cont", "no close is in flight"));
        }
        let status = self.session.close_cont(ready)?;
        self.finish_close_step(status)
    }

    fn finish_close_step(&mut self, status: WaitStatus) -> Result<WaitStatus> {
        if status.is_pending() {
            self.state = ConnState::Closing;
            tracing::trace!(status = %status, "close suspended");
        } else {
            self.state = ConnState::Closed;
            tracing::debug!("session closed");
        }
        Ok(status)
    }

    /// Block until one of the requested conditions holds on the
    /// session's socket.
    pub fn wait(&mut self, requested: WaitStatus) -> Result<WaitStatus> {
        self.session.wait(requested)
    }

    /// Connect, blocking between steps.
    pub fn connect(&mut self, params: &ConnectParams) -> Result<()> {
        let mut op = ConnectOp { conn: self, params };
        run_to_completion(&mut op)
    }

    /// Dispatch a statement, blocking between steps. Results, if any,
    /// are picked up afterwards with [`store_result`](Self::store_result)
    /// or [`use_result`](Self::use_result).
    pub fn query(&mut self, sql: impl AsRef<[u8]>) -> Result<()> {
        let mut op = QueryOp {
            conn: self,
            sql: sql.as_ref(),
        };
        run_to_completion(&mut op)
    }

    /// Close, blocking between steps.
    pub fn close(&mut self) -> Result<()> {
        let mut op = CloseOp { conn: self };
        run_to_completion(&mut op)
    }

    /// Buffer the last statement's result set client-side and open a
    /// cursor over it.
    pub fn store_result(&mut self) -> Result<Cursor<'_, S>> {
        if self.state != ConnState::Connected {
            return Err(self.misuse("store_result", "the session is not connected and idle"));
        }
        let rows = self.session.store_result()?;
        match rows {
            Some(rows) => Cursor::new(self, rows),
            None => Err(self.no_result_error()),
        }
    }

    /// Stream the last statement's result set from the server and open
    /// a cursor over it. Rows arrive one fetch at a time.
    pub fn use_result(&mut self) -> Result<Cursor<'_, S>> {
        if self.state != ConnState::Connected {
            return Err(self.misuse("use_result", "the session is not connected and idle"));
        }
        let rows = self.session.use_result()?;
        match rows {
            Some(rows) => Cursor::new(self, rows),
            None => Err(self.no_result_error()),
        }
    }

    fn no_result_error(&self) -> Error {
        let code = self.session.last_errno();
        let message = if code == 0 {
            "statement produced no result set".to_string()
        } else {
            self.session.last_error()
        };
        Error::Query(QueryError { message, code })
    }

    fn engine_connection_error(&self) -> Error {
        Error::Connection(ConnectionError {
            message: self.session.last_error(),
            code: self.session.last_errno(),
        })
    }

    fn misuse(&self, operation: &str, reason: &str) -> Error {
        Error::Connection(ConnectionError {
            message: format!("{operation}: {reason} (state: {:?})", self.state),
            code: 0,
        })
    }
}

struct ConnectOp<'a, S: EngineSession> {
    conn: &'a mut Connection<S>,
    params: &'a ConnectParams,
}

impl<S: EngineSession> NonblockOp for ConnectOp<'_, S> {
    fn start(&mut self) -> Result<WaitStatus> {
        self.conn.connect_start(self.params)
    }

    fn resume(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        self.conn.connect_cont(ready)
    }

    fn wait(&mut self, requested: WaitStatus) -> Result<WaitStatus> {
        self.conn.wait(requested)
    }
}

struct QueryOp<'a, S: EngineSession> {
    conn: &'a mut Connection<S>,
    sql: &'a [u8],
}

impl<S: EngineSession> NonblockOp for QueryOp<'_, S> {
    fn start(&mut self) -> Result<WaitStatus> {
        self.conn.query_start(self.sql)
    }

    fn resume(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        self.conn.query_cont(ready)
    }

    fn wait(&mut self, requested: WaitStatus) -> Result<WaitStatus> {
        self.conn.wait(requested)
    }
}

struct CloseOp<'a, S: EngineSession> {
    conn: &'a mut Connection<S>,
}

impl<S: EngineSession> NonblockOp for CloseOp<'_, S> {
    fn start(&mut self) -> Result<WaitStatus> {
        self.conn.close_start()
    }

    fn resume(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        self.conn.close_cont(ready)
    }

    fn wait(&mut self, requested: WaitStatus) -> Result<WaitStatus> {
        self.conn.wait(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ScriptedSession;

    fn params() -> ConnectParams {
        ConnectParams::new().host("localhost").user("root")
    }

    #[test]
    fn connect_completes_after_scripted_steps() {
        let session = ScriptedSession::new()
            .connect_statuses(vec![WaitStatus::WRITE, WaitStatus::READ, WaitStatus::NONE]);
        let mut conn = Connection::new(session);

        conn.connect(&params()).unwrap();
        assert_eq!(conn.state(), ConnState::Connected);
        assert_eq!(
            conn.session.calls,
            vec![
                "connect_start",
                "wait",
                "connect_cont",
                "wait",
                "connect_cont",
            ]
        );
    }

    #[test]
    fn connect_may_complete_on_the_first_step() {
        let mut conn = Connection::new(ScriptedSession::new());
        assert_eq!(conn.connect_start(&params()).unwrap(), WaitStatus::NONE);
        assert_eq!(conn.state(), ConnState::Connected);
    }

    #[test]
    fn connect_failure_reports_the_engine_error() {
        let session = ScriptedSession::new()
            .fail_connect()
            .engine_error(2002, "Can't connect to server");
        let mut conn = Connection::new(session);

        let err = conn.connect(&params()).unwrap_err();
        match err {
            Error::Connection(e) => {
                assert_eq!(e.code, 2002);
                assert!(e.message.contains("Can't connect"));
            }
            other => panic!("expected Connection error, got {other}"),
        }
        assert_eq!(conn.state(), ConnState::Closed);
    }

    #[test]
    fn connect_twice_is_a_state_error() {
        let mut conn = Connection::new(ScriptedSession::new());
        conn.connect(&params()).unwrap();

        let err = conn.connect_start(&params()).unwrap_err();
        match err {
            Error::Connection(e) => assert_eq!(e.code, 0),
            other => panic!("expected Connection error, got {other}"),
        }
        // The established session is untouched.
        assert_eq!(conn.state(), ConnState::Connected);
    }

    #[test]
    fn query_before_connect_is_a_state_error() {
        let mut conn = Connection::new(ScriptedSession::new());
        let err = conn.query("SELECT 1").unwrap_err();
        assert_eq!(err.code(), Some(0));
        assert!(conn.session.calls.is_empty());
    }

    #[test]
    fn query_passes_raw_bytes_through() {
        let mut conn = Connection::new(
            ScriptedSession::new().query_statuses(vec![WaitStatus::READ, WaitStatus::NONE]),
        );
        conn.connect(&params()).unwrap();

        conn.query("SELECT 'naïve'").unwrap();
        assert_eq!(conn.session.queries, vec![b"SELECT 'na\xc3\xafve'".to_vec()]);
        assert_eq!(conn.state(), ConnState::Connected);
    }

    #[test]
    fn failed_statement_leaves_the_session_usable() {
        let session = ScriptedSession::new()
            .fail_query()
            .engine_error(1146, "Table 'test.missing' doesn't exist");
        let mut conn = Connection::new(session);
        conn.connect(&params()).unwrap();

        let err = conn.query("SELECT * FROM missing").unwrap_err();
        match err {
            Error::Query(e) => assert_eq!(e.code, 1146),
            other => panic!("expected Query error, got {other}"),
        }
        assert_eq!(conn.state(), ConnState::Connected);
    }

    #[test]
    fn cont_without_in_flight_operation_is_a_state_error() {
        let mut conn = Connection::new(ScriptedSession::new());
        assert!(conn.connect_cont(WaitStatus::READ).is_err());
        conn.connect(&params()).unwrap();
        assert!(conn.query_cont(WaitStatus::READ).is_err());
        assert!(conn.close_cont(WaitStatus::READ).is_err());
    }

    #[test]
    fn close_is_idempotent() {
        let mut conn =
            Connection::new(ScriptedSession::new().close_statuses(vec![
                WaitStatus::READ | WaitStatus::TIMEOUT,
                WaitStatus::NONE,
            ]));
        conn.connect(&params()).unwrap();

        conn.close().unwrap();
        assert_eq!(conn.state(), ConnState::Closed);
        let calls_after_first_close = conn.session.calls.len();

        // Second close completes without touching the engine.
        conn.close().unwrap();
        assert_eq!(conn.session.calls.len(), calls_after_first_close);
    }

    #[test]
    fn close_before_connect_is_a_completed_no_op() {
        let mut conn = Connection::new(ScriptedSession::new());
        assert_eq!(conn.close_start().unwrap(), WaitStatus::NONE);
        assert!(conn.session.calls.is_empty());
    }

    #[test]
    fn store_result_without_result_set_is_a_query_error() {
        let mut conn = Connection::new(ScriptedSession::new());
        conn.connect(&params()).unwrap();
        conn.query("INSERT INTO t VALUES (1)").unwrap();

        let err = conn.store_result().unwrap_err();
        match err {
            Error::Query(e) => {
                assert_eq!(e.code, 0);
                assert!(e.message.contains("no result set"));
            }
            other => panic!("expected Query error, got {other}"),
        }
    }

    #[test]
    fn operations_are_rejected_while_another_is_in_flight() {
        let mut conn = Connection::new(
            ScriptedSession::new().connect_statuses(vec![WaitStatus::WRITE, WaitStatus::NONE]),
        );
        let status = conn.connect_start(&params()).unwrap();
        assert!(status.is_pending());
        assert_eq!(conn.state(), ConnState::Connecting);

        assert!(conn.query_start("SELECT 1").is_err());
        assert!(conn.close_start().is_err());

        // The in-flight connect still completes.
        conn.connect_cont(WaitStatus::WRITE).unwrap();
        assert_eq!(conn.state(), ConnState::Connected);
    }
}
