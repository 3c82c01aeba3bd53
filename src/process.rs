/*
 * process.rs
 *
 * Spawn with posix_spawnp, reap with waitpid. The launcher owns the RawChild;
 * the supervisor and relay only ever need the pid to send signals.
 *
 * posix_spawnp reports ENOENT/EACCES back to us directly, so 126 vs 127
 * doesn't need a pipe from the child like fork+exec would.
 *
 * The Rust runtime ignores SIGPIPE before main, and an ignored disposition
 * survives exec. The child gets SIGPIPE and every relayable signal put back
 * to SIG_DFL, and an empty signal mask, through the spawn attributes.
 *
 * try_wait asks for stopped children too (WUNTRACED). The supervisor decides
 * what a stop means.
 */

use std::ffi::{CString, c_char};
use std::ptr;

use crate::error::{KilljoyError, Result, errno};
use crate::signal::{Signal, relayable_signals};

unsafe extern "C" {
    /* environ is a global variable pointing to the environment */
    static environ: *const *const c_char;
}

/// How a child ended (or paused). Exactly one of these per status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    /// stopped by a signal, still alive
    Stopped(i32),
    /// killed by a signal
    Signaled(i32),
    /// exited on its own with this code
    Exited(i32),
}

/// Raw wait status from waitpid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawExitStatus {
    status: i32,
}

impl RawExitStatus {
    #[inline]
    #[must_use]
    pub const fn from_raw(status: i32) -> Self {
        Self { status }
    }

    /// Classify the status word: stopped, then signaled, then exited.
    #[must_use]
    pub fn classify(&self) -> TerminalStatus {
        if libc::WIFSTOPPED(self.status) {
            TerminalStatus::Stopped(libc::WSTOPSIG(self.status))
        } else if libc::WIFSIGNALED(self.status) {
            TerminalStatus::Signaled(libc::WTERMSIG(self.status))
        } else {
            TerminalStatus::Exited(libc::WEXITSTATUS(self.status))
        }
    }

    /// Returns the exit code if the process exited normally
    #[inline]
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self.classify() {
            TerminalStatus::Exited(code) => Some(code),
            _ => None,
        }
    }
}

/// Error from process operations
#[derive(Debug)]
pub enum SpawnError {
    /// Command not found in PATH
    NotFound(String),
    /// Found but not executable
    PermissionDenied(String),
    /// Other spawn error with errno
    Spawn(i32),
    /// Invalid argument (null byte in string)
    InvalidArg,
}

impl From<SpawnError> for KilljoyError {
    fn from(e: SpawnError) -> Self {
        match e {
            SpawnError::NotFound(s) => Self::CommandNotFound(s),
            SpawnError::PermissionDenied(s) => Self::PermissionDenied(s),
            SpawnError::Spawn(errno) => Self::SpawnError(errno),
            SpawnError::InvalidArg => Self::Internal("argument contains a NUL byte".to_string()),
        }
    }
}

/// Raw child process handle
#[derive(Debug)]
pub struct RawChild {
    pid: libc::pid_t,
    reaped: bool,
}

impl RawChild {
    /// Get the process ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> libc::pid_t {
        self.pid
    }

    /// Non-blocking poll. `Ok(None)` while the child is still running.
    ///
    /// A stopped child is reported but stays un-reaped.
    pub fn try_wait(&mut self) -> Result<Option<RawExitStatus>> {
        if self.reaped {
            return Err(KilljoyError::Internal("child already reaped".to_string()));
        }

        let mut status: i32 = 0;
        // SAFETY: pid is valid from spawn, status is valid pointer
        let ret = unsafe { libc::waitpid(self.pid, &mut status, libc::WNOHANG | libc::WUNTRACED) };

        if ret < 0 {
            return Err(KilljoyError::SpawnError(errno()));
        }
        if ret == 0 {
            /* still running */
            return Ok(None);
        }

        let status = RawExitStatus::from_raw(status);
        if !matches!(status.classify(), TerminalStatus::Stopped(_)) {
            self.reaped = true;
        }
        Ok(Some(status))
    }

    /// Block until the child exits.
    pub fn wait(&mut self) -> Result<RawExitStatus> {
        if self.reaped {
            return Err(KilljoyError::Internal("child already reaped".to_string()));
        }

        let mut status: i32 = 0;
        loop {
            // SAFETY: pid is valid from spawn, status is valid pointer
            let ret = unsafe { libc::waitpid(self.pid, &mut status, 0) };
            if ret >= 0 {
                break;
            }
            let err = errno();
            if err != libc::EINTR {
                return Err(KilljoyError::SpawnError(err));
            }
        }

        self.reaped = true;
        Ok(RawExitStatus::from_raw(status))
    }

    /// SIGKILL the child and reap it. Used when we can't supervise it.
    pub fn kill(&mut self) -> Result<()> {
        if self.reaped {
            return Ok(());
        }
        send_signal(self.pid, Signal::SIGKILL)?;
        self.wait().map(|_| ())
    }
}

/*
 * RAII wrapper for posix_spawnattr_t.
 *
 * Boxed so the attr never moves after init: on macOS it's an opaque pointer,
 * on glibc a plain struct, and neither promises to be movable.
 */
struct SpawnAttr {
    inner: Box<libc::posix_spawnattr_t>,
}

impl SpawnAttr {
    fn new() -> core::result::Result<Self, i32> {
        // SAFETY: all-zero is a valid placeholder for both the pointer and
        // struct representations, init overwrites it.
        let mut inner: Box<libc::posix_spawnattr_t> = Box::new(unsafe { core::mem::zeroed() });
        // SAFETY: inner points to writable storage for one posix_spawnattr_t
        let ret = unsafe { libc::posix_spawnattr_init(&mut *inner) };
        if ret != 0 {
            return Err(ret);
        }
        Ok(Self { inner })
    }

    /* SIGPIPE and the relayable set back to SIG_DFL, nothing blocked */
    fn reset_signals(&mut self) -> core::result::Result<(), i32> {
        // SAFETY: both sets are zeroed then initialized by sigemptyset before
        // use; sigaddset only gets signal numbers from our catalog. All ops
        // share the invariant of building two valid sigset_t values.
        #[allow(clippy::multiple_unsafe_ops_per_block)]
        let (defaults, empty) = unsafe {
            let mut defaults: libc::sigset_t = core::mem::zeroed();
            let mut empty: libc::sigset_t = core::mem::zeroed();
            libc::sigemptyset(&mut defaults);
            libc::sigemptyset(&mut empty);
            libc::sigaddset(&mut defaults, libc::SIGPIPE);
            for signal in relayable_signals() {
                libc::sigaddset(&mut defaults, signal.as_raw());
            }
            (defaults, empty)
        };

        #[allow(clippy::cast_possible_truncation)]
        let flags = (libc::POSIX_SPAWN_SETSIGDEF | libc::POSIX_SPAWN_SETSIGMASK) as libc::c_short;

        // SAFETY: inner was initialized in new(), the sets are valid for the call
        let ret = unsafe { libc::posix_spawnattr_setsigdefault(&mut *self.inner, &defaults) };
        if ret != 0 {
            return Err(ret);
        }
        // SAFETY: as above
        let ret = unsafe { libc::posix_spawnattr_setsigmask(&mut *self.inner, &empty) };
        if ret != 0 {
            return Err(ret);
        }
        // SAFETY: as above
        let ret = unsafe { libc::posix_spawnattr_setflags(&mut *self.inner, flags) };
        if ret != 0 {
            return Err(ret);
        }
        Ok(())
    }

    fn as_ptr(&self) -> *const libc::posix_spawnattr_t {
        &*self.inner
    }
}

impl Drop for SpawnAttr {
    fn drop(&mut self) {
        // SAFETY: inner was initialized in new() and is destroyed exactly once
        unsafe {
            libc::posix_spawnattr_destroy(&mut *self.inner);
        }
    }
}

/// Spawn a command using posix_spawnp (searches PATH).
///
/// The child inherits our environment and standard streams. Its signal
/// dispositions for SIGPIPE and the relayable set start at SIG_DFL.
pub fn spawn_command(command: &str, args: &[String]) -> core::result::Result<RawChild, SpawnError> {
    /* build argv: [command, args..., NULL] */
    let cmd_cstr = CString::new(command).map_err(|_| SpawnError::InvalidArg)?;

    let mut argv_cstrs: Vec<CString> = Vec::with_capacity(args.len() + 1);
    argv_cstrs.push(cmd_cstr.clone());
    for arg in args {
        argv_cstrs.push(CString::new(arg.as_str()).map_err(|_| SpawnError::InvalidArg)?);
    }

    let mut argv_ptrs: Vec<*mut c_char> = argv_cstrs
        .iter()
        .map(|c| c.as_ptr().cast_mut())
        .collect();
    argv_ptrs.push(ptr::null_mut());

    let mut attr = SpawnAttr::new().map_err(SpawnError::Spawn)?;
    attr.reset_signals().map_err(SpawnError::Spawn)?;

    let mut pid: libc::pid_t = 0;
    // SAFETY: argv_ptrs is NULL-terminated and its strings outlive the call,
    // attr is initialized, environ is the process environment. Null
    // file_actions means inherit every fd.
    let ret = unsafe {
        libc::posix_spawnp(
            &mut pid,
            cmd_cstr.as_ptr(),
            ptr::null(),
            attr.as_ptr(),
            argv_ptrs.as_ptr(),
            environ.cast(),
        )
    };

    if ret != 0 {
        return Err(match ret {
            libc::ENOENT => SpawnError::NotFound(command.into()),
            libc::EACCES | libc::EPERM | libc::ENOEXEC => {
                SpawnError::PermissionDenied(command.into())
            }
            _ => SpawnError::Spawn(ret),
        });
    }

    Ok(RawChild { pid, reaped: false })
}

/*
 * Deliver a signal to one process. ESRCH means it's already gone, fine.
 * A zombie still accepts kill(), so this is safe right up until we reap.
 */
pub fn send_signal(pid: libc::pid_t, signal: Signal) -> Result<()> {
    // SAFETY: kill() is safe with any pid/signal combo, returns -1 on error
    let ret = unsafe { libc::kill(pid, signal.as_raw()) };
    if ret == 0 {
        return Ok(());
    }
    let err = errno();
    if err == libc::ESRCH {
        return Ok(());
    }
    Err(KilljoyError::SignalError(err))
}

/*
 * These tests are skipped under Miri because posix_spawn* and waitpid are
 * unsupported foreign functions.
 */
#[cfg(test)]
#[cfg(not(miri))]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_true() {
        let mut child = spawn_command("true", &[]).unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.classify(), TerminalStatus::Exited(0));
    }

    #[test]
    fn test_spawn_exit_code() {
        let args = vec!["-c".to_string(), "exit 3".to_string()];
        let mut child = spawn_command("sh", &args).unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_spawn_not_found() {
        let result = spawn_command("nonexistent_command_12345", &[]);
        assert!(matches!(result, Err(SpawnError::NotFound(_))));
    }

    #[test]
    fn test_spawn_not_executable() {
        let result = spawn_command("/dev/null", &[]);
        assert!(matches!(result, Err(SpawnError::PermissionDenied(_))));
    }

    #[test]
    fn test_spawn_nul_byte() {
        let result = spawn_command("echo", &["a\0b".to_string()]);
        assert!(matches!(result, Err(SpawnError::InvalidArg)));
    }

    #[test]
    fn test_try_wait_running_then_killed() {
        let mut child = spawn_command("sleep", &["10".to_string()]).unwrap();
        assert!(child.try_wait().unwrap().is_none());

        send_signal(child.id(), Signal::SIGKILL).unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.classify(), TerminalStatus::Signaled(libc::SIGKILL));
    }

    #[test]
    fn test_try_wait_after_reap_errors() {
        let mut child = spawn_command("true", &[]).unwrap();
        child.wait().unwrap();
        assert!(child.try_wait().is_err());
    }

    #[test]
    fn test_try_wait_reports_stopped() {
        let mut child = spawn_command("sleep", &["10".to_string()]).unwrap();
        send_signal(child.id(), Signal::SIGSTOP).unwrap();

        let mut stopped = None;
        for _ in 0..200 {
            if let Some(status) = child.try_wait().unwrap() {
                stopped = Some(status);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(
            stopped.map(|s| s.classify()),
            Some(TerminalStatus::Stopped(libc::SIGSTOP))
        );

        /* still ours to reap */
        child.kill().unwrap();
    }

    /*
     * The test harness, like our main, runs with SIGPIPE ignored. sh can't
     * un-ignore an inherited SIG_IGN, so the bit in SigIgn is exactly what
     * we handed it. Exit 0 means SIGPIPE is at its default.
     */
    #[test]
    #[cfg(target_os = "linux")]
    fn test_child_starts_with_default_sigpipe() {
        let script = format!(
            "m=$(sed -n 's/^SigIgn:[[:space:]]*//p' /proc/self/status); exit $(( (0x$m >> {}) & 1 ))",
            libc::SIGPIPE - 1
        );
        let mut child = spawn_command("sh", &["-c".to_string(), script]).unwrap();
        assert_eq!(child.wait().unwrap().code(), Some(0));
    }

    #[test]
    fn test_child_starts_with_default_relayable_signals() {
        /* an ignored TERM would survive exec just like PIPE */
        // SAFETY: sigaction with SIG_IGN on TERM for the duration of spawn
        #[allow(clippy::multiple_unsafe_ops_per_block)]
        let old = unsafe {
            let mut sa: libc::sigaction = core::mem::zeroed();
            let mut old: libc::sigaction = core::mem::zeroed();
            sa.sa_sigaction = libc::SIG_IGN;
            libc::sigemptyset(&raw mut sa.sa_mask);
            libc::sigaction(libc::SIGTERM, &sa, &mut old);
            old
        };
        let spawned = spawn_command("sleep", &["10".to_string()]);
        // SAFETY: restores the disposition saved above
        unsafe {
            libc::sigaction(libc::SIGTERM, &old, ptr::null_mut());
        }

        let mut child = spawned.unwrap();
        send_signal(child.id(), Signal::SIGTERM).unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.classify(), TerminalStatus::Signaled(libc::SIGTERM));
    }

    #[test]
    fn test_send_signal_to_nonexistent_process() {
        /* ESRCH should be handled gracefully */
        let result = send_signal(i32::MAX - 1, Signal::SIGTERM);
        assert!(result.is_ok(), "ESRCH should be handled gracefully");
    }

    #[test]
    fn test_classify_exhaustive() {
        /* synthesised status words: exited 3, killed by 9, stopped by 19/17 */
        let exited = RawExitStatus::from_raw(3 << 8);
        assert_eq!(exited.classify(), TerminalStatus::Exited(3));

        let signaled = RawExitStatus::from_raw(libc::SIGKILL);
        assert_eq!(signaled.classify(), TerminalStatus::Signaled(libc::SIGKILL));

        let stopped = RawExitStatus::from_raw((libc::SIGSTOP << 8) | 0x7f);
        assert_eq!(stopped.classify(), TerminalStatus::Stopped(libc::SIGSTOP));
        assert_eq!(stopped.code(), None);
    }
}
