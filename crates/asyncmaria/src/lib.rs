//! Non-blocking MariaDB client driver.
//!
//! Every network operation follows the engine's start/continue
//! discipline: a `_start` call begins the operation and returns a
//! [`WaitStatus`] bitmask of socket conditions to wait for, the caller
//! waits however it likes, and the matching `_cont` call resumes with
//! the conditions actually observed. A zero status means the step
//! completed; the result is then read through a separate accessor.
//!
//! - [`Connection`] and [`Cursor`] are the state machines enforcing
//!   the one-operation-at-a-time ordering.
//! - [`ConvertRegistry`] converts between wire-level cells and
//!   [`Value`]s in both directions.
//! - The `libmariadb` cargo feature links the real client library and
//!   provides `MariadbSession`; without it any [`EngineSession`]
//!   implementation can drive the state machines.

pub mod config;
pub mod connection;
pub mod convert;
pub mod cursor;
pub mod driver;
pub mod engine;
pub mod status;
pub mod wait;

#[cfg(feature = "libmariadb")]
pub mod ffi;
#[cfg(feature = "libmariadb")]
pub mod mariadb;

#[cfg(test)]
pub(crate) mod testkit;

pub use asyncmaria_core::{
    ColumnInfo, ConnectionError, ConvertError, CursorError, Error, QueryError, Result, Row, Value,
};

pub use config::{ConnectParams, SessionOptions};
pub use connection::{ConnState, Connection};
pub use convert::{ConvertRegistry, FieldType};
pub use cursor::Cursor;
pub use driver::{run_to_completion, NonblockOp};
pub use engine::{ConnectStep, EngineRows, EngineSession, Field, QueryStep, RawRow};
pub use status::WaitStatus;
pub use wait::poll_ready;

#[cfg(feature = "libmariadb")]
pub use mariadb::{MariadbRows, MariadbSession};
