//! The start/continue calling discipline.

use asyncmaria_core::Result;

use crate::status::WaitStatus;

/// One non-blocking operation viewed through the start/continue pattern.
///
/// The contract, which `run_to_completion` implements verbatim:
///
/// 1. call `start` once; a zero status means the operation completed,
/// 2. otherwise `wait` on the requested conditions,
/// 3. `resume` with the conditions actually observed,
/// 4. repeat from 2 until a call returns zero.
///
/// The result of the operation is read through a separate accessor on
/// the owning type, never from the status itself. Resuming with a stale
/// or fabricated status is not detected; the discipline is the contract.
pub trait NonblockOp {
    /// Begin the operation.
    fn start(&mut self) -> Result<WaitStatus>;

    /// Resume after the socket reported `ready`.
    fn resume(&mut self, ready: WaitStatus) -> Result<WaitStatus>;

    /// Block until one of the requested conditions holds.
    fn wait(&mut self, requested: WaitStatus) -> Result<WaitStatus>;
}

/// Drive an operation to completion, blocking between steps.
pub fn run_to_completion<O: NonblockOp>(op: &mut O) -> Result<()> {
    let mut status = op.start()?;
    tracing::trace!(status = %status, "op started");
    while status.is_pending() {
        let ready = op.wait(status)?;
        tracing::trace!(requested = %status, ready = %ready, "socket ready");
        status = op.resume(ready)?;
    }
    tracing::trace!("op complete");
    Ok(())
}
