//! Engine session backed by libmariadb's non-blocking API.
//!
//! All libmariadb calls assume the handle was put into non-blocking
//! mode at init time; the start/continue entry points then never touch
//! the socket themselves. Buffers passed to a `_start` call (connect
//! strings, query text) must stay alive until the operation completes,
//! so the session stores them until the matching final `_cont`.

#![allow(unsafe_code)]

use std::ffi::{c_char, c_int, c_uint, c_ulong, CStr, CString};
use std::ptr;
use std::time::Duration;

use asyncmaria_core::{ConnectionError, ConvertError, Error, Result};

use crate::config::{ConnectParams, SessionOptions};
use crate::engine::{ConnectStep, EngineRows, EngineSession, Field, QueryStep, RawRow};
use crate::ffi;
use crate::status::WaitStatus;
use crate::wait::poll_ready;

fn engine_status(raw: c_int) -> WaitStatus {
    WaitStatus::from_bits(u32::try_from(raw).unwrap_or(0))
}

fn ready_bits(status: WaitStatus) -> c_int {
    c_int::try_from(status.bits()).unwrap_or(0)
}

fn opt_ptr(value: Option<&CString>) -> *const c_char {
    value.map_or(ptr::null(), |c| c.as_ptr())
}

fn opt_cstring(value: Option<&str>, what: &str) -> Result<Option<CString>> {
    value
        .map(|v| {
            CString::new(v).map_err(|_| {
                Error::Connection(ConnectionError {
                    message: format!("{what} contains a NUL byte"),
                    code: 0,
                })
            })
        })
        .transpose()
}

/// Connect strings pinned for the duration of an in-flight connect.
struct ConnectArgs {
    host: Option<CString>,
    user: Option<CString>,
    password: Option<CString>,
    database: Option<CString>,
    unix_socket: Option<CString>,
    port: u16,
}

impl ConnectArgs {
    fn from_params(params: &ConnectParams) -> Result<Self> {
        Ok(Self {
            host: opt_cstring(params.host.as_deref(), "host")?,
            user: opt_cstring(params.user.as_deref(), "user")?,
            password: opt_cstring(params.password.as_deref(), "password")?,
            database: opt_cstring(params.database.as_deref(), "database")?,
            unix_socket: opt_cstring(params.unix_socket.as_deref(), "unix_socket")?,
            port: params.port,
        })
    }
}

/// An [`EngineSession`] over a libmariadb handle.
pub struct MariadbSession {
    handle: *mut ffi::MYSQL,
    connected: bool,
    closing: bool,
    // Pinned while a connect is in flight.
    #[allow(dead_code)]
    connect_args: Option<ConnectArgs>,
    // Pinned while a query is in flight.
    #[allow(dead_code)]
    query_buf: Option<Vec<u8>>,
    #[allow(dead_code)]
    charset: Option<CString>,
}

impl MariadbSession {
    /// Allocate a handle and switch it to non-blocking mode.
    pub fn new(options: &SessionOptions) -> Result<Self> {
        // SAFETY: a null argument asks the library to allocate the handle.
        let handle = unsafe { ffi::mysql_init(ptr::null_mut()) };
        if handle.is_null() {
            return Err(Error::Connection(ConnectionError {
                message: "mysql_init failed: out of memory".to_string(),
                code: 0,
            }));
        }
        let charset = opt_cstring(Some(options.charset.as_str()), "charset")?;
        // SAFETY: handle is valid; MYSQL_OPT_NONBLOCK takes no argument and
        // the charset string is copied by the library before the call
        // returns, but we pin it on self regardless.
        unsafe {
            ffi::mysql_options(handle, ffi::MYSQL_OPT_NONBLOCK, ptr::null());
            if let Some(cs) = &charset {
                ffi::mysql_options(handle, ffi::MYSQL_SET_CHARSET_NAME, cs.as_ptr().cast());
            }
        }
        Ok(Self {
            handle,
            connected: false,
            closing: false,
            connect_args: None,
            query_buf: None,
            charset,
        })
    }

    fn finish_connect(&mut self, raw: c_int, ret: *mut ffi::MYSQL) -> ConnectStep {
        let status = engine_status(raw);
        if status.is_done() {
            self.connect_args = None;
            self.connected = !ret.is_null();
        }
        ConnectStep {
            status,
            connected: self.connected,
        }
    }

    fn finish_query(&mut self, raw: c_int, err: c_int) -> QueryStep {
        let status = engine_status(raw);
        if status.is_done() {
            self.query_buf = None;
        }
        QueryStep {
            status,
            failed: status.is_done() && err != 0,
        }
    }

    fn finish_close(&mut self, raw: c_int) -> WaitStatus {
        let status = engine_status(raw);
        if status.is_done() {
            // The handle is freed by the completed close.
            self.handle = ptr::null_mut();
            self.connected = false;
            self.closing = false;
        } else {
            self.closing = true;
        }
        status
    }
}

impl EngineSession for MariadbSession {
    type Rows = MariadbRows;

    fn connect_start(&mut self, params: &ConnectParams) -> Result<ConnectStep> {
        let args = ConnectArgs::from_params(params)?;
        let mut ret: *mut ffi::MYSQL = ptr::null_mut();
        // SAFETY: handle is valid; the string pointers stay alive on self
        // until the operation completes.
        let raw = unsafe {
            ffi::mysql_real_connect_start(
                &raw mut ret,
                self.handle,
                opt_ptr(args.host.as_ref()),
                opt_ptr(args.user.as_ref()),
                opt_ptr(args.password.as_ref()),
                opt_ptr(args.database.as_ref()),
                c_uint::from(args.port),
                opt_ptr(args.unix_socket.as_ref()),
                0,
            )
        };
        self.connect_args = Some(args);
        Ok(self.finish_connect(raw, ret))
    }

    fn connect_cont(&mut self, ready: WaitStatus) -> Result<ConnectStep> {
        let mut ret: *mut ffi::MYSQL = ptr::null_mut();
        // SAFETY: handle is valid and a connect is in flight on it.
        let raw = unsafe { ffi::mysql_real_connect_cont(&raw mut ret, self.handle, ready_bits(ready)) };
        Ok(self.finish_connect(raw, ret))
    }

    fn query_start(&mut self, sql: &[u8]) -> Result<QueryStep> {
        let buf = self.query_buf.insert(sql.to_vec());
        let mut err: c_int = 0;
        // SAFETY: handle is valid; the statement buffer stays alive on self
        // until the operation completes. Length is passed explicitly, so
        // embedded NUL bytes are fine.
        let raw = unsafe {
            ffi::mysql_real_query_start(
                &raw mut err,
                self.handle,
                buf.as_ptr().cast::<c_char>(),
                buf.len() as c_ulong,
            )
        };
        Ok(self.finish_query(raw, err))
    }

    fn query_cont(&mut self, ready: WaitStatus) -> Result<QueryStep> {
        let mut err: c_int = 0;
        // SAFETY: handle is valid and a query is in flight on it.
        let raw = unsafe { ffi::mysql_real_query_cont(&raw mut err, self.handle, ready_bits(ready)) };
        Ok(self.finish_query(raw, err))
    }

    fn close_start(&mut self) -> Result<WaitStatus> {
        // SAFETY: handle is valid.
        let raw = unsafe { ffi::mysql_close_start(self.handle) };
        Ok(self.finish_close(raw))
    }

    fn close_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        // SAFETY: handle is valid and a close is in flight on it.
        let raw = unsafe { ffi::mysql_close_cont(self.handle, ready_bits(ready)) };
        Ok(self.finish_close(raw))
    }

    fn store_result(&mut self) -> Result<Option<MariadbRows>> {
        // SAFETY: handle is valid; a query just completed on it.
        let res = unsafe { ffi::mysql_store_result(self.handle) };
        if res.is_null() {
            return Ok(None);
        }
        Ok(Some(MariadbRows::new(res)))
    }

    fn use_result(&mut self) -> Result<Option<MariadbRows>> {
        // SAFETY: handle is valid; a query just completed on it.
        let res = unsafe { ffi::mysql_use_result(self.handle) };
        if res.is_null() {
            return Ok(None);
        }
        Ok(Some(MariadbRows::new(res)))
    }

    fn wait(&mut self, requested: WaitStatus) -> Result<WaitStatus> {
        // SAFETY: handle is valid; both accessors only read from it.
        let (fd, timeout) = unsafe {
            let fd = ffi::mysql_get_socket(self.handle);
            let timeout = if requested.contains(WaitStatus::TIMEOUT) {
                Some(Duration::from_secs(u64::from(ffi::mysql_get_timeout_value(
                    self.handle,
                ))))
            } else {
                None
            };
            (fd, timeout)
        };
        Ok(poll_ready(fd, requested, timeout)?)
    }

    fn last_error(&self) -> String {
        if self.handle.is_null() {
            return String::new();
        }
        // SAFETY: mysql_error returns a NUL-terminated string owned by the
        // handle; it is copied out before any further call on the handle.
        unsafe { CStr::from_ptr(ffi::mysql_error(self.handle)) }
            .to_string_lossy()
            .into_owned()
    }

    fn last_errno(&self) -> u32 {
        if self.handle.is_null() {
            return 0;
        }
        // SAFETY: handle is valid.
        unsafe { ffi::mysql_errno(self.handle) }
    }
}

impl Drop for MariadbSession {
    fn drop(&mut self) {
        // A close abandoned mid-flight leaves the handle in a state the
        // library cannot close again; leaking it is the safe option.
        if !self.handle.is_null() && !self.closing {
            // SAFETY: handle is valid and no operation is in flight.
            unsafe { ffi::mysql_close(self.handle) };
        }
        self.handle = ptr::null_mut();
    }
}

/// An [`EngineRows`] over a libmariadb result set.
pub struct MariadbRows {
    res: *mut ffi::MYSQL_RES,
    current: Option<RawRow>,
    freed: bool,
}

impl MariadbRows {
    fn new(res: *mut ffi::MYSQL_RES) -> Self {
        Self {
            res,
            current: None,
            freed: false,
        }
    }

    /// Copy the fetched row out immediately: the library reuses the row
    /// buffer on the next fetch.
    fn capture(&mut self, row: ffi::MYSQL_ROW) {
        if row.is_null() {
            self.current = None;
            return;
        }
        // SAFETY: res is a valid result set and row was just fetched from
        // it, so the cell and length arrays both have field_count entries.
        unsafe {
            let count = ffi::mysql_num_fields(self.res) as usize;
            let lengths = ffi::mysql_fetch_lengths(self.res);
            let mut cells: RawRow = Vec::with_capacity(count);
            for i in 0..count {
                let cell = *row.add(i);
                if cell.is_null() {
                    cells.push(None);
                } else {
                    let len = usize::try_from(*lengths.add(i)).unwrap_or(0);
                    cells.push(Some(
                        std::slice::from_raw_parts(cell.cast::<u8>(), len).to_vec(),
                    ));
                }
            }
            self.current = Some(cells);
        }
    }
}

impl EngineRows for MariadbRows {
    fn field_count(&mut self) -> usize {
        // SAFETY: res is a valid result set.
        unsafe { ffi::mysql_num_fields(self.res) as usize }
    }

    fn fields(&mut self) -> Result<Vec<Field>> {
        let count = self.field_count();
        // SAFETY: res is a valid result set; mysql_fetch_fields returns an
        // array of count descriptors owned by it.
        let descriptors = unsafe { ffi::mysql_fetch_fields(self.res) };
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            // SAFETY: i is within the descriptor array.
            let desc = unsafe { &*descriptors.add(i) };
            // SAFETY: the descriptor's name is a NUL-terminated string.
            let name = unsafe { CStr::from_ptr(desc.name) }
                .to_string_lossy()
                .into_owned();
            let type_code = u8::try_from(desc.field_type).map_err(|_| {
                Error::Convert(ConvertError {
                    message: format!("field type {} out of range", desc.field_type),
                    column: Some(name.clone()),
                    type_code: None,
                })
            })?;
            out.push(Field { name, type_code });
        }
        Ok(out)
    }

    fn fetch_start(&mut self) -> Result<WaitStatus> {
        let mut row: ffi::MYSQL_ROW = ptr::null_mut();
        // SAFETY: res is a valid result set with no fetch in flight.
        let raw = unsafe { ffi::mysql_fetch_row_start(&raw mut row, self.res) };
        let status = engine_status(raw);
        if status.is_done() {
            self.capture(row);
        }
        Ok(status)
    }

    fn fetch_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        let mut row: ffi::MYSQL_ROW = ptr::null_mut();
        // SAFETY: res is a valid result set with a fetch in flight.
        let raw = unsafe { ffi::mysql_fetch_row_cont(&raw mut row, self.res, ready_bits(ready)) };
        let status = engine_status(raw);
        if status.is_done() {
            self.capture(row);
        }
        Ok(status)
    }

    fn take_row(&mut self) -> Option<RawRow> {
        self.current.take()
    }

    fn free_start(&mut self) -> Result<WaitStatus> {
        // SAFETY: res is a valid result set.
        let raw = unsafe { ffi::mysql_free_result_start(self.res) };
        let status = engine_status(raw);
        if status.is_done() {
            self.freed = true;
        }
        Ok(status)
    }

    fn free_cont(&mut self, ready: WaitStatus) -> Result<WaitStatus> {
        // SAFETY: res is a valid result set with a free in flight.
        let raw = unsafe { ffi::mysql_free_result_cont(self.res, ready_bits(ready)) };
        let status = engine_status(raw);
        if status.is_done() {
            self.freed = true;
        }
        Ok(status)
    }

    fn free_sync(&mut self) {
        if !self.freed {
            // SAFETY: res is a valid, unreleased result set. May block while
            // draining unfetched rows.
            unsafe { ffi::mysql_free_result(self.res) };
            self.freed = true;
        }
    }
}

impl Drop for MariadbRows {
    fn drop(&mut self) {
        self.free_sync();
    }
}
