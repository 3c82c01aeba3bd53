/*
 * error.rs
 *
 * 126 = found but not executable, 127 = not found. Same as the shell.
 * Everything else that goes wrong is a plain 1, including --help.
 */

use thiserror::Error;

/// exit codes. 126/127 mirror what a shell reports for exec failures.
pub mod exit_codes {
    /// Command exited with status 0
    pub const SUCCESS: u8 = 0;
    /// Generic failure: bad config, abnormal child termination, timeout
    pub const FAILURE: u8 = 1;
    /// Command found but couldn't be executed (permissions)
    pub const CANNOT_INVOKE: u8 = 126;
    /// Command not found
    pub const NOT_FOUND: u8 = 127;
}

/* everything that can go wrong */
#[derive(Debug, Error)]
pub enum KilljoyError {
    #[error("invalid time: value too large")]
    DurationOverflow,
    #[error("invalid time: a time limit must be at least 1 second")]
    ZeroBudget,
    #[error("invalid signal: {0}")]
    InvalidSignal(String),
    #[error("command not found: {0}")]
    CommandNotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("failed to spawn process: errno {0}")]
    SpawnError(i32),
    #[error("signal error: errno {0}")]
    SignalError(i32),
    #[error("failed to install signal relay: errno {0}")]
    RelaySetup(i32),
    #[error("signal relay is already installed")]
    RelayInstalled,
    #[error("internal error: {0}")]
    Internal(String),
}

impl KilljoyError {
    /* 126 vs 127 matters to scripts. */
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CommandNotFound(_) => exit_codes::NOT_FOUND,
            Self::PermissionDenied(_) => exit_codes::CANNOT_INVOKE,
            Self::DurationOverflow
            | Self::ZeroBudget
            | Self::InvalidSignal(_)
            | Self::SpawnError(_)
            | Self::SignalError(_)
            | Self::RelaySetup(_)
            | Self::RelayInstalled
            | Self::Internal(_) => exit_codes::FAILURE,
        }
    }
}

pub type Result<T> = core::result::Result<T, KilljoyError>;

/* errno of the last failed libc call */
#[inline]
pub(crate) fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}
