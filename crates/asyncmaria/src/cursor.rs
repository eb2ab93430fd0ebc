//! Row retrieval over an open result set.

use std::sync::Arc;

use asyncmaria_core::{ColumnInfo, CursorError, Error, Result, Row};

use crate::connection::Connection;
use crate::convert::ConvertRegistry;
use crate::engine::{EngineRows, EngineSession, Field};
use crate::status::WaitStatus;

/// A cursor over one result set.
///
/// The cursor borrows its connection mutably, so dispatching a new
/// statement while a result set is open does not compile. Column
/// metadata is read once at open time and shared across every row the
/// cursor produces. Dropping a cursor that was not freed releases the
/// result set synchronously.
pub struct Cursor<'a, S: EngineSession> {
    conn: &'a mut Connection<S>,
    rows: S::Rows,
    fields: Vec<Field>,
    columns: Arc<ColumnInfo>,
    registry: Arc<ConvertRegistry>,
    finished: bool,
    freed: bool,
}

impl<S: EngineSession> std::fmt::Debug for Cursor<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("fields", &self.fields)
            .field("finished", &self.finished)
            .field("freed", &self.freed)
            .finish_non_exhaustive()
    }
}

impl<'a, S: EngineSession> Cursor<'a, S> {
    pub(crate) fn new(conn: &'a mut Connection<S>, mut rows: S::Rows) -> Result<Self> {
        let fields = rows.fields()?;
        let columns = Arc::new(ColumnInfo::new(
            fields.iter().map(|f| f.name.clone()).collect(),
        ));
        let registry = Arc::clone(&conn.registry);
        Ok(Self {
            conn,
            rows,
            fields,
            columns,
            registry,
            finished: false,
            freed: false,
        })
    }

    /// Column descriptors, in result order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of columns in the result set.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Shared column metadata.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    /// Whether end of data has been observed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Begin fetching the next row. Completed immediately once end of
    /// data has been observed.
    pub fn fetch_start(&mut self) -> Result<WaitStatus> {
        if self.finished {
            return Ok(WaitStatus::NONE);
        }
        self.rows.fetch_start()
    }

    /// Resume an in-flight fetch with the observed conditions.
    pub fn fetch_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        if self.finished {
            return Ok(WaitStatus::NONE);
        }
        self.rows.fetch_cont(ready)
    }

    /// The decoded row captured by the last completed fetch.
    ///
    /// `Ok(None)` marks end of data; from then on every fetch reports
    /// the same without touching the engine. An engine failure
    /// mid-result-set surfaces as a cursor error instead.
    pub fn current_row(&mut self) -> Result<Option<Row>> {
        if self.finished {
            return Ok(None);
        }
        let Some(raw) = self.rows.take_row() else {
            let code = self.conn.session.last_errno();
            if code != 0 {
                return Err(Error::Cursor(CursorError {
                    message: self.conn.session.last_error(),
                    code,
                }));
            }
            self.finished = true;
            return Ok(None);
        };
        let mut values = Vec::with_capacity(raw.len());
        for (field, cell) in self.fields.iter().zip(raw.iter()) {
            values.push(self.registry.decode(field, cell.as_deref())?);
        }
        Ok(Some(Row::with_columns(Arc::clone(&self.columns), values)))
    }

    /// Fetch and decode the next row, blocking between steps.
    pub fn fetch_row(&mut self) -> Result<Option<Row>> {
        if self.finished {
            return Ok(None);
        }
        let mut status = self.rows.fetch_start()?;
        while status.is_pending() {
            let ready = self.conn.wait(status)?;
            status = self.rows.fetch_cont(ready)?;
        }
        self.current_row()
    }

    /// Drain the remaining rows, blocking between steps.
    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut out = Vec::new();
        while let Some(row) = self.fetch_row()? {
            out.push(row);
        }
        Ok(out)
    }

    /// Begin releasing the result set. Completed immediately if it was
    /// already released.
    pub fn free_start(&mut self) -> Result<WaitStatus> {
        if self.freed {
            return Ok(WaitStatus::NONE);
        }
        let status = self.rows.free_start()?;
        if status.is_done() {
            self.freed = true;
        }
        Ok(status)
    }

    /// Resume an in-flight free with the observed conditions.
    pub fn free_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        if self.freed {
            return Ok(WaitStatus::NONE);
        }
        let status = self.rows.free_cont(ready)?;
        if status.is_done() {
            self.freed = true;
        }
        Ok(status)
    }

    /// Release the result set, blocking between steps.
    pub fn free(mut self) -> Result<()> {
        let mut status = self.free_start()?;
        while status.is_pending() {
            let ready = self.conn.wait(status)?;
            status = self.free_cont(ready)?;
        }
        Ok(())
    }
}

impl<S: EngineSession> Drop for Cursor<'_, S> {
    fn drop(&mut self) {
        if !self.freed {
            self.rows.free_sync();
        }
    }
}
