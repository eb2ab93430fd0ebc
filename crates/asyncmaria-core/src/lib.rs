//! Core types for the asyncmaria driver.
//!
//! This crate holds the pieces with no engine knowledge:
//!
//! - `Value` dynamically-typed column values
//! - `Error` taxonomy with the engine's error text and numeric code
//! - `Row` and `ColumnInfo` for decoded result rows

pub mod error;
pub mod row;
pub mod value;

pub use error::{ConnectionError, ConvertError, CursorError, Error, QueryError, Result};
pub use row::{ColumnInfo, Row};
pub use value::Value;
