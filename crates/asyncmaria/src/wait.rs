//! Blocking readiness wait on the client socket.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::status::WaitStatus;

/// Block until the socket reaches one of the requested conditions.
///
/// `timeout` is consulted only when `requested` carries the TIMEOUT bit;
/// it is the engine's per-operation hint, not a caller deadline. Returns
/// the conditions actually observed, or TIMEOUT when the hint elapsed
/// first. Hosts that multiplex many connections will do their own wait
/// and never call this.
pub fn poll_ready(
    fd: RawFd,
    requested: WaitStatus,
    timeout: Option<Duration>,
) -> io::Result<WaitStatus> {
    let mut events: libc::c_short = 0;
    if requested.contains(WaitStatus::READ) {
        events |= libc::POLLIN;
    }
    if requested.contains(WaitStatus::WRITE) {
        events |= libc::POLLOUT;
    }
    if requested.contains(WaitStatus::EXCEPT) {
        events |= libc::POLLPRI;
    }

    let timeout_ms: libc::c_int = if requested.contains(WaitStatus::TIMEOUT) {
        timeout.map_or(-1, |t| {
            libc::c_int::try_from(t.as_millis()).unwrap_or(libc::c_int::MAX)
        })
    } else {
        -1
    };

    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };

    loop {
        // SAFETY: pfd is a valid, exclusively-owned pollfd for the duration
        // of the call.
        #[allow(unsafe_code)]
        let rc = unsafe { libc::poll(&raw mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(WaitStatus::TIMEOUT);
        }
        break;
    }

    let mut observed = WaitStatus::NONE;
    if pfd.revents & libc::POLLIN != 0 {
        observed |= WaitStatus::READ;
    }
    if pfd.revents & libc::POLLOUT != 0 {
        observed |= WaitStatus::WRITE;
    }
    if pfd.revents & libc::POLLPRI != 0 {
        observed |= WaitStatus::EXCEPT;
    }
    // POLLERR/POLLHUP surface as readability so the engine reads the
    // failure and reports it through its own error channel.
    if observed.is_done() && pfd.revents & (libc::POLLERR | libc::POLLHUP) != 0 {
        observed |= WaitStatus::READ;
    }
    Ok(observed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn writable_socket_reports_write() {
        let (a, _b) = UnixStream::pair().unwrap();
        let observed = poll_ready(a.as_raw_fd(), WaitStatus::WRITE, None).unwrap();
        assert!(observed.contains(WaitStatus::WRITE));
    }

    #[test]
    fn readable_socket_reports_read() {
        let (a, mut b) = UnixStream::pair().unwrap();
        b.write_all(b"x").unwrap();
        let observed =
            poll_ready(a.as_raw_fd(), WaitStatus::READ | WaitStatus::WRITE, None).unwrap();
        assert!(observed.contains(WaitStatus::READ));
    }

    #[test]
    fn idle_socket_times_out() {
        let (a, _b) = UnixStream::pair().unwrap();
        let observed = poll_ready(
            a.as_raw_fd(),
            WaitStatus::READ | WaitStatus::TIMEOUT,
            Some(Duration::from_millis(10)),
        )
        .unwrap();
        assert_eq!(observed, WaitStatus::TIMEOUT);
    }

    #[test]
    fn closed_peer_is_observed_as_readable() {
        let (a, b) = UnixStream::pair().unwrap();
        drop(b);
        let observed = poll_ready(a.as_raw_fd(), WaitStatus::READ, None).unwrap();
        assert!(observed.contains(WaitStatus::READ));
    }
}
