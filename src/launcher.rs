/*
 * launcher.rs
 *
 * Spawn, wrap in the relay, supervise, say what happened. One line of info
 * per run, however it ended.
 *
 * The relay goes in after spawn. If it can't be installed we don't leave a
 * child running with nobody watching it: SIGKILL, reap, then report.
 */

use tracing::{debug, error, info};

use crate::config::Config;
use crate::duration::is_no_timeout;
use crate::error::Result;
use crate::process::{RawChild, TerminalStatus, spawn_command};
use crate::relay::{SignalRelay, reset_to_default};
use crate::signal::Signal;
use crate::supervisor::{Outcome, supervise};

/// Run `command` under `config` and return how it ended.
pub fn launch(config: &Config, command: &str, args: &[String]) -> Result<Outcome> {
    /* an inherited SIG_IGN on SIGCHLD would auto-reap the child behind our back */
    reset_to_default(Signal::SIGCHLD)?;

    let mut child = spawn_command(command, args)?;
    debug!("spawned '{}' as pid {}", command, child.id());

    let relay = match SignalRelay::install() {
        Ok(relay) => relay,
        Err(e) => {
            kill_unsupervised(&mut child);
            return Err(e);
        }
    };

    supervise(&mut child, &relay, config)
}

/* nobody is watching this child: kill it, and say so if we couldn't */
fn kill_unsupervised(child: &mut RawChild) {
    if let Err(e) = child.kill() {
        error!("pid {} may still be running unsupervised: {}", child.id(), e);
    }
}

/// The line printed before the child starts.
#[must_use]
pub fn announcement(config: &Config, command: &str) -> String {
    if is_no_timeout(config.budget) {
        format!("Sucking all the life from '{command}' with no time limit")
    } else {
        format!(
            "Sucking all the life from '{command}' in {} seconds",
            config.budget
        )
    }
}

/// The one line describing how the run ended.
#[must_use]
pub fn outcome_message(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Completed(Some(status)) => status_message(*status),
        Outcome::Completed(None) => "Process has completed or is no longer running".to_string(),
        Outcome::Stopped(sig) => status_message(TerminalStatus::Stopped(*sig)),
        Outcome::TimedOut { budget, signal, .. } => format!(
            "Process has exceeded the time limit of {budget} seconds (sent signal {})",
            signal.as_raw()
        ),
        Outcome::Relayed(signal) => {
            format!("Relayed signal {} to process, exiting", signal.as_raw())
        }
    }
}

fn status_message(status: TerminalStatus) -> String {
    match status {
        TerminalStatus::Stopped(sig) => format!("Process was stopped with signal: {sig}"),
        TerminalStatus::Signaled(sig) => format!("Process was terminated with signal: {sig}"),
        TerminalStatus::Exited(code) => format!("Process has exited with status: {code}"),
    }
}

/// Log the outcome line.
pub fn report(outcome: &Outcome) {
    info!("{}", outcome_message(outcome));
}
