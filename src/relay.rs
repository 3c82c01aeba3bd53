/*
 * relay.rs
 *
 * Signal relay via the self-pipe trick.
 *
 * Problem: we want to forward INT/QUIT/USR1/... to the child and treat USR2
 * as "reset the clock". Signal handlers can only do async-signal-safe
 * things, so no logging, no allocation, no touching the run state.
 *
 * Fix: the handler writes the signal number as one byte into a pipe. The
 * supervisor loop sleeps in poll() on the read end between ticks, so a
 * signal wakes it immediately. Everything else (forwarding, resetting,
 * logging) happens in the loop, in normal context.
 *
 * One relay per process: the handler finds the write end through a static.
 */

use core::sync::atomic::{AtomicI32, Ordering};
use core::time::Duration;

use crate::error::{KilljoyError, Result, errno};
use crate::signal::{Signal, relayable_signals};

type RawFd = i32;

/* Write end for the handler, -1 when no relay is installed */
static SIGNAL_WRITE_FD: AtomicI32 = AtomicI32::new(-1);

/// What the supervisor does with a relayed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayAction {
    /// reset elapsed time, child never sees it
    Refresh,
    /// pass it on and keep supervising
    Forward,
    /// pass it on, then the supervisor exits
    ForwardAndExit,
}

/// USR2 refreshes, HUP is passed through, everything else ends supervision.
#[must_use]
pub const fn relay_action(signal: Signal) -> RelayAction {
    match signal {
        Signal::SIGUSR2 => RelayAction::Refresh,
        /* TODO: decide whether HUP should reload or detach instead of a plain pass-through */
        Signal::SIGHUP => RelayAction::Forward,
        _ => RelayAction::ForwardAndExit,
    }
}

/// Installed handlers plus the pipe they write to. Dropping it puts the
/// default dispositions back and closes the pipe.
#[derive(Debug)]
pub struct SignalRelay {
    read_fd: RawFd,
    write_fd: RawFd,
}

impl SignalRelay {
    /// Create the pipe and install a handler for every relayable signal.
    ///
    /// Any sigaction failure is an error: half a relay is worse than none.
    pub fn install() -> Result<Self> {
        let (read_fd, write_fd) = nonblocking_pipe()?;

        /* Claim the slot BEFORE registering handlers so the handler never
         * sees -1 once it can fire. */
        if SIGNAL_WRITE_FD
            .compare_exchange(-1, write_fd, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            close_pair(read_fd, write_fd);
            return Err(KilljoyError::RelayInstalled);
        }

        let relay = Self { read_fd, write_fd };
        for signal in relayable_signals() {
            /* on failure, Drop resets whatever we already installed */
            set_disposition(signal, signal_handler as *const () as libc::sighandler_t)
                .map_err(KilljoyError::RelaySetup)?;
        }

        Ok(relay)
    }

    /// Wait up to `timeout` for a relayed signal.
    ///
    /// Returns early with the first pending signal, `None` if the timeout
    /// passed quietly.
    pub fn wait(&self, timeout: Duration) -> Option<Signal> {
        /* drain first - a byte may already be sitting there */
        if let Some(sig) = self.read_signal() {
            return Some(sig);
        }

        let mut pfd = libc::pollfd {
            fd: self.read_fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout_to_ms(timeout);

        // SAFETY: pfd is a valid pollfd for the duration of the call, nfds=1.
        let ret = unsafe { libc::poll(&raw mut pfd, 1, timeout_ms) };
        if ret <= 0 {
            /* timeout, or EINTR from a signal whose byte we'll read next time */
            return None;
        }

        self.read_signal()
    }

    /* one byte = one signal. EAGAIN when empty (non-blocking fd). */
    fn read_signal(&self) -> Option<Signal> {
        let mut buf = [0u8; 1];
        // SAFETY: buf is a valid 1-byte buffer, read_fd is the read end of our pipe.
        let n = unsafe { libc::read(self.read_fd, buf.as_mut_ptr().cast(), 1) };
        if n > 0 {
            Signal::try_from_raw(i32::from(buf[0]))
        } else {
            None
        }
    }
}

impl Drop for SignalRelay {
    fn drop(&mut self) {
        /* Reset handlers FIRST so nothing writes into a closed (or reused) fd */
        for signal in relayable_signals() {
            let _ = reset_to_default(signal);
        }
        let _ = SIGNAL_WRITE_FD.compare_exchange(
            self.write_fd,
            -1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        close_pair(self.read_fd, self.write_fd);
    }
}

/* Minimal signal handler - write the signal number to the pipe */
extern "C" fn signal_handler(sig: i32) {
    let fd = SIGNAL_WRITE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        /* relayable signals all fit in a byte */
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let byte: u8 = sig as u8;
        // SAFETY: fd was set by SignalRelay::install and is non-blocking.
        // write() of one byte is async-signal-safe per POSIX. A full pipe
        // drops the byte, nothing we can do about that from here.
        unsafe {
            let _ = libc::write(fd, (&raw const byte).cast(), 1);
        }
    }
}

/// Put one signal back to the OS default disposition.
pub fn reset_to_default(signal: Signal) -> Result<()> {
    set_disposition(signal, libc::SIG_DFL).map_err(KilljoyError::SignalError)
}

/* install `handler` for one signal. SA_RESTART so waitpid/read aren't cut short. */
fn set_disposition(signal: Signal, handler: libc::sighandler_t) -> core::result::Result<(), i32> {
    // SAFETY: sigaction struct is zeroed then properly initialized. handler is
    // either SIG_DFL or an extern "C" fn(i32). All ops share the invariant of
    // building and installing one valid sigaction.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    let ret = unsafe {
        let mut sa: libc::sigaction = core::mem::zeroed();
        sa.sa_sigaction = handler;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(signal.as_raw(), &sa, core::ptr::null_mut())
    };
    if ret == 0 { Ok(()) } else { Err(errno()) }
}

/* pipe with both ends O_NONBLOCK and FD_CLOEXEC */
fn nonblocking_pipe() -> Result<(RawFd, RawFd)> {
    let mut fds = [0i32; 2];
    // SAFETY: fds is a valid 2-element array, pipe() writes exactly 2 fds
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(KilljoyError::RelaySetup(errno()));
    }

    for fd in fds {
        // SAFETY: fd is a valid fd just returned by pipe(). fcntl with
        // F_GETFL/F_SETFL/F_SETFD are safe operations on valid fds.
        // Multiple ops share the same invariant (fd validity).
        #[allow(clippy::multiple_unsafe_ops_per_block)]
        let ok = unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            flags >= 0
                && libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) >= 0
                && libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) >= 0
        };
        if !ok {
            let err = errno();
            close_pair(fds[0], fds[1]);
            return Err(KilljoyError::RelaySetup(err));
        }
    }

    Ok((fds[0], fds[1]))
}

fn close_pair(read_fd: RawFd, write_fd: RawFd) {
    // SAFETY: both fds came from pipe() and are closed exactly once here.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    unsafe {
        libc::close(read_fd);
        libc::close(write_fd);
    }
}

/* round up so a 0.4ms remainder doesn't turn into a busy loop */
fn timeout_to_ms(timeout: Duration) -> i32 {
    let ms = timeout.as_nanos().div_ceil(1_000_000);
    i32::try_from(ms).unwrap_or(i32::MAX)
}
