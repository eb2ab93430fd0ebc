//! Error types for driver operations.

use std::fmt;

/// The primary error type for all driver operations.
#[derive(Debug)]
pub enum Error {
    /// Connection lifecycle errors (connect, close, state misuse)
    Connection(ConnectionError),
    /// Query dispatch errors
    Query(QueryError),
    /// Result-set errors (fetch, free)
    Cursor(CursorError),
    /// Value conversion errors
    Convert(ConvertError),
    /// I/O errors from the readiness wait
    Io(std::io::Error),
}

/// A connection failure with the engine's error text and numeric code.
///
/// The code is 0 for state-machine misuse detected by the driver itself.
#[derive(Debug)]
pub struct ConnectionError {
    pub message: String,
    pub code: u32,
}

/// A query failure with the engine's error text and numeric code.
#[derive(Debug)]
pub struct QueryError {
    pub message: String,
    pub code: u32,
}

/// A result-set failure with the engine's error text and numeric code.
#[derive(Debug)]
pub struct CursorError {
    pub message: String,
    pub code: u32,
}

/// A value conversion failure.
///
/// Carries the column name and wire type code when they are known, so a
/// bad cell can be traced back to its result-set position.
#[derive(Debug)]
pub struct ConvertError {
    pub message: String,
    pub column: Option<String>,
    pub type_code: Option<u8>,
}

impl Error {
    /// The engine's numeric error code, if this error carries one.
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::Connection(e) => Some(e.code),
            Error::Query(e) => Some(e.code),
            Error::Cursor(e) => Some(e.code),
            Error::Convert(_) | Error::Io(_) => None,
        }
    }

    /// Is this an engine-reported failure (as opposed to driver misuse)?
    pub fn is_engine_error(&self) -> bool {
        self.code().is_some_and(|c| c != 0)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e),
            Error::Query(e) => write!(f, "Query error: {}", e),
            Error::Cursor(e) => write!(f, "Cursor error: {}", e),
            Error::Convert(e) => write!(f, "Conversion error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.column, self.type_code) {
            (Some(col), Some(code)) => {
                write!(f, "column '{}' (type 0x{:02X}): {}", col, code, self.message)
            }
            (Some(col), None) => write!(f, "column '{}': {}", col, self.message),
            (None, Some(code)) => write!(f, "type 0x{:02X}: {}", code, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<CursorError> for Error {
    fn from(err: CursorError) -> Self {
        Error::Cursor(err)
    }
}

impl From<ConvertError> for Error {
    fn from(err: ConvertError) -> Self {
        Error::Convert(err)
    }
}

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;
