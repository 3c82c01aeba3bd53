/*
 * config.rs
 *
 * Built once from the parsed CLI, then only ever borrowed. No globals:
 * the launcher, supervisor and relay all get the same &Config.
 */

use crate::args::Args;
use crate::duration::parse_budget;
use crate::error::{KilljoyError, Result};
use crate::signal::{Signal, parse_signal};

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// whole seconds the child may run, 0 = no limit
    pub budget: u64,
    /// sent to the child when the budget runs out
    pub signal: Signal,
    /// suppress info lines (errors still print)
    pub quiet: bool,
    /// per-tick tracing on stderr
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            budget: 0,
            signal: Signal::SIGKILL,
            quiet: false,
            debug: false,
        }
    }
}

impl Config {
    /// Build from CLI args. Fails on a bogus signal, an oversized time,
    /// or an explicit time that works out to zero seconds.
    pub fn from_args(args: &Args) -> Result<Self> {
        let budget = match args.time.as_deref() {
            Some(time) => {
                let budget = parse_budget(time)?;
                if budget == 0 {
                    return Err(KilljoyError::ZeroBudget);
                }
                budget
            }
            None => 0,
        };

        let signal = match args.signal.as_deref() {
            Some(spec) => parse_signal(spec)?,
            None => Signal::SIGKILL,
        };

        Ok(Self {
            budget,
            signal,
            quiet: args.quiet,
            debug: args.debug,
        })
    }
}
