//! Readiness-status bitmask shared by every non-blocking operation.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// The readiness conditions a suspended operation is waiting on.
///
/// Every `_start`/`_cont` call returns one of these. Zero means the
/// operation completed; any set bit means it is suspended and must be
/// resumed with the conditions actually observed on the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct WaitStatus(u32);

impl WaitStatus {
    /// No conditions: the operation is complete.
    pub const NONE: WaitStatus = WaitStatus(0);
    /// The socket is (or must become) readable.
    pub const READ: WaitStatus = WaitStatus(1);
    /// The socket is (or must become) writable.
    pub const WRITE: WaitStatus = WaitStatus(2);
    /// An exceptional condition on the socket.
    pub const EXCEPT: WaitStatus = WaitStatus(4);
    /// The engine's timeout hint elapsed before any readiness.
    pub const TIMEOUT: WaitStatus = WaitStatus(8);

    /// Build a status from the engine's raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        WaitStatus(bits)
    }

    /// The raw bits, as the engine expects them.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// The operation has completed.
    pub const fn is_done(self) -> bool {
        self.0 == 0
    }

    /// The operation is suspended waiting on at least one condition.
    pub const fn is_pending(self) -> bool {
        self.0 != 0
    }

    /// All bits of `other` are set in `self`.
    pub const fn contains(self, other: WaitStatus) -> bool {
        self.0 & other.0 == other.0
    }

    /// At least one bit of `other` is set in `self`.
    pub const fn intersects(self, other: WaitStatus) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for WaitStatus {
    type Output = WaitStatus;

    fn bitor(self, rhs: WaitStatus) -> WaitStatus {
        WaitStatus(self.0 | rhs.0)
    }
}

impl BitOrAssign for WaitStatus {
    fn bitor_assign(&mut self, rhs: WaitStatus) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for WaitStatus {
    type Output = WaitStatus;

    fn bitand(self, rhs: WaitStatus) -> WaitStatus {
        WaitStatus(self.0 & rhs.0)
    }
}

impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_done() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for (bit, name) in [
            (WaitStatus::READ, "READ"),
            (WaitStatus::WRITE, "WRITE"),
            (WaitStatus::EXCEPT, "EXCEPT"),
            (WaitStatus::TIMEOUT, "TIMEOUT"),
        ] {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values_match_the_engine() {
        assert_eq!(WaitStatus::READ.bits(), 1);
        assert_eq!(WaitStatus::WRITE.bits(), 2);
        assert_eq!(WaitStatus::EXCEPT.bits(), 4);
        assert_eq!(WaitStatus::TIMEOUT.bits(), 8);
    }

    #[test]
    fn done_and_pending() {
        assert!(WaitStatus::NONE.is_done());
        assert!(!WaitStatus::NONE.is_pending());
        assert!(WaitStatus::READ.is_pending());
        assert!(WaitStatus::from_bits(0).is_done());
    }

    #[test]
    fn bit_ops() {
        let rw = WaitStatus::READ | WaitStatus::WRITE;
        assert_eq!(rw.bits(), 3);
        assert!(rw.contains(WaitStatus::READ));
        assert!(rw.contains(WaitStatus::WRITE));
        assert!(!rw.contains(WaitStatus::EXCEPT));
        assert!(rw.intersects(WaitStatus::READ | WaitStatus::TIMEOUT));
        assert_eq!((rw & WaitStatus::READ), WaitStatus::READ);

        let mut s = WaitStatus::NONE;
        s |= WaitStatus::TIMEOUT;
        assert_eq!(s, WaitStatus::TIMEOUT);
    }

    #[test]
    fn display_renders_bit_names() {
        assert_eq!(WaitStatus::NONE.to_string(), "NONE");
        assert_eq!(WaitStatus::READ.to_string(), "READ");
        assert_eq!(
            (WaitStatus::READ | WaitStatus::WRITE | WaitStatus::TIMEOUT).to_string(),
            "READ|WRITE|TIMEOUT"
        );
    }
}
