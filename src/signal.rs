/*
 * signal.rs
 *
 * One static table drives everything: name lookup for -s, and which signals
 * the relay grabs. "kill", "KILL", "SIGKILL", "SigKill" and "9" all land on
 * the same entry. Aliases share an id (iot = abrt).
 *
 * Relayable means "the supervisor installs a handler and passes it on".
 * Job control (stop/cont/tstp/ttin/ttou), chld and the fault signals stay
 * at the OS default. kill and stop can't be caught anyway.
 */

use crate::error::{KilljoyError, Result};

/* POSIX signals as i32 values from libc. Copy/PartialEq for easy comparison. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Signal {
    SIGHUP = libc::SIGHUP,
    SIGINT = libc::SIGINT,
    SIGQUIT = libc::SIGQUIT,
    SIGILL = libc::SIGILL,
    SIGTRAP = libc::SIGTRAP,
    SIGABRT = libc::SIGABRT,
    SIGBUS = libc::SIGBUS,
    SIGFPE = libc::SIGFPE,
    SIGKILL = libc::SIGKILL,
    SIGUSR1 = libc::SIGUSR1,
    SIGSEGV = libc::SIGSEGV,
    SIGUSR2 = libc::SIGUSR2,
    SIGPIPE = libc::SIGPIPE,
    SIGALRM = libc::SIGALRM,
    SIGTERM = libc::SIGTERM,
    SIGCHLD = libc::SIGCHLD,
    SIGCONT = libc::SIGCONT,
    SIGSTOP = libc::SIGSTOP,
    SIGTSTP = libc::SIGTSTP,
    SIGTTIN = libc::SIGTTIN,
    SIGTTOU = libc::SIGTTOU,
    SIGURG = libc::SIGURG,
    SIGXCPU = libc::SIGXCPU,
    SIGXFSZ = libc::SIGXFSZ,
    SIGVTALRM = libc::SIGVTALRM,
    SIGPROF = libc::SIGPROF,
    SIGWINCH = libc::SIGWINCH,
    SIGIO = libc::SIGIO,
    SIGSYS = libc::SIGSYS,
}

impl Signal {
    /* convert from raw signal number */
    pub fn try_from_raw(num: i32) -> Option<Self> {
        CATALOG
            .iter()
            .find(|entry| entry.signal.as_raw() == num)
            .map(|entry| entry.signal)
    }

    /* get raw signal number */
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

/// One row of the signal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEntry {
    /// lowercase, no "sig" prefix, unique across the table
    pub name: &'static str,
    pub signal: Signal,
    /// handler installed and the signal passed on to the child
    pub relayable: bool,
}

const fn entry(name: &'static str, signal: Signal, relayable: bool) -> SignalEntry {
    SignalEntry {
        name,
        signal,
        relayable,
    }
}

/// Every signal we know by name. Ordered by number, aliases right after the signal they name.
pub static CATALOG: &[SignalEntry] = &[
    entry("hup", Signal::SIGHUP, true),
    entry("int", Signal::SIGINT, true),
    entry("quit", Signal::SIGQUIT, true),
    entry("ill", Signal::SIGILL, false),
    entry("trap", Signal::SIGTRAP, false),
    entry("abrt", Signal::SIGABRT, false),
    entry("iot", Signal::SIGABRT, false),
    entry("bus", Signal::SIGBUS, false),
    entry("fpe", Signal::SIGFPE, false),
    entry("kill", Signal::SIGKILL, false),
    entry("usr1", Signal::SIGUSR1, true),
    entry("segv", Signal::SIGSEGV, false),
    entry("usr2", Signal::SIGUSR2, true),
    entry("pipe", Signal::SIGPIPE, false),
    entry("alrm", Signal::SIGALRM, true),
    entry("term", Signal::SIGTERM, true),
    entry("chld", Signal::SIGCHLD, false),
    entry("cld", Signal::SIGCHLD, false),
    entry("cont", Signal::SIGCONT, false),
    entry("stop", Signal::SIGSTOP, false),
    entry("tstp", Signal::SIGTSTP, false),
    entry("ttin", Signal::SIGTTIN, false),
    entry("ttou", Signal::SIGTTOU, false),
    entry("urg", Signal::SIGURG, false),
    entry("xcpu", Signal::SIGXCPU, false),
    entry("xfsz", Signal::SIGXFSZ, false),
    entry("vtalrm", Signal::SIGVTALRM, false),
    entry("prof", Signal::SIGPROF, false),
    entry("winch", Signal::SIGWINCH, false),
    entry("io", Signal::SIGIO, false),
    entry("poll", Signal::SIGIO, false),
    entry("sys", Signal::SIGSYS, false),
];

/// Resolve "TERM", "SIGKILL", "hup", "9" to a raw signal number.
///
/// Names first (case-insensitive, optional SIG prefix), then numbers.
/// Returns 0 when nothing matches. 0 is never a valid signal, treat it as
/// a configuration error.
///
/// # Examples
///
/// ```
/// use killjoy::signal::resolve_signal;
///
/// assert_eq!(resolve_signal("KILL"), libc::SIGKILL);
/// assert_eq!(resolve_signal("sigkill"), libc::SIGKILL);
/// assert_eq!(resolve_signal("9"), libc::SIGKILL);
/// assert_eq!(resolve_signal("not-a-signal"), 0);
/// ```
#[must_use]
pub fn resolve_signal(input: &str) -> i32 {
    let input = input.trim();
    let name = strip_sig_prefix(input);

    if let Some(found) = CATALOG.iter().find(|e| e.name.eq_ignore_ascii_case(name)) {
        return found.signal.as_raw();
    }

    input
        .parse::<i32>()
        .ok()
        .and_then(Signal::try_from_raw)
        .map_or(0, Signal::as_raw)
}

/* "SIG", "sig", "Sig", "sIg"... all optional */
fn strip_sig_prefix(input: &str) -> &str {
    match input.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("sig") => &input[3..],
        _ => input,
    }
}

/// Resolve a signal spec, rejecting anything not in the table.
///
/// ```
/// use killjoy::signal::{parse_signal, Signal};
///
/// assert_eq!(parse_signal("TERM").unwrap(), Signal::SIGTERM);
/// assert_eq!(parse_signal("15").unwrap(), Signal::SIGTERM);
/// assert!(parse_signal("SIGFOO").is_err());
/// ```
pub fn parse_signal(input: &str) -> Result<Signal> {
    Signal::try_from_raw(resolve_signal(input))
        .ok_or_else(|| KilljoyError::InvalidSignal(format!("unknown signal: {}", input.trim())))
}

/// Signals the relay installs handlers for.
pub fn relayable_signals() -> impl Iterator<Item = Signal> {
    CATALOG
        .iter()
        .filter(|entry| entry.relayable)
        .map(|entry| entry.signal)
}

/* human-readable name for debug output */
#[must_use]
pub const fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::SIGHUP => "SIGHUP",
        Signal::SIGINT => "SIGINT",
        Signal::SIGQUIT => "SIGQUIT",
        Signal::SIGILL => "SIGILL",
        Signal::SIGTRAP => "SIGTRAP",
        Signal::SIGABRT => "SIGABRT",
        Signal::SIGBUS => "SIGBUS",
        Signal::SIGFPE => "SIGFPE",
        Signal::SIGKILL => "SIGKILL",
        Signal::SIGUSR1 => "SIGUSR1",
        Signal::SIGSEGV => "SIGSEGV",
        Signal::SIGUSR2 => "SIGUSR2",
        Signal::SIGPIPE => "SIGPIPE",
        Signal::SIGALRM => "SIGALRM",
        Signal::SIGTERM => "SIGTERM",
        Signal::SIGCHLD => "SIGCHLD",
        Signal::SIGCONT => "SIGCONT",
        Signal::SIGSTOP => "SIGSTOP",
        Signal::SIGTSTP => "SIGTSTP",
        Signal::SIGTTIN => "SIGTTIN",
        Signal::SIGTTOU => "SIGTTOU",
        Signal::SIGURG => "SIGURG",
        Signal::SIGXCPU => "SIGXCPU",
        Signal::SIGXFSZ => "SIGXFSZ",
        Signal::SIGVTALRM => "SIGVTALRM",
        Signal::SIGPROF => "SIGPROF",
        Signal::SIGWINCH => "SIGWINCH",
        Signal::SIGIO => "SIGIO",
        Signal::SIGSYS => "SIGSYS",
    }
}
