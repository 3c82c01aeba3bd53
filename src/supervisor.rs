/*
 * supervisor.rs
 *
 * The watch loop. Once a second: is the child still there? has it used up
 * its budget? Between ticks we sleep in the relay's poll(), so a relayed
 * signal is handled right away instead of at the next tick.
 *
 * Budget check is strict: elapsed > budget, whole seconds. A 5 second budget
 * means the child gets at least 5 full seconds, and dies on the tick after.
 *
 * USR2 moves the start of the clock to "now" and restarts the tick schedule
 * from there, so the kill lands within one tick of budget + reset time.
 *
 * A stopped child only ends supervision when there is no budget. With one,
 * we keep ticking and the budget still kills it; the timeout signal is
 * followed by CONT so a catchable signal actually gets delivered.
 */

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::Config;
use crate::duration::is_no_timeout;
use crate::error::{Result, exit_codes};
use crate::process::{RawChild, TerminalStatus, send_signal};
use crate::relay::{RelayAction, SignalRelay, relay_action};
use crate::signal::{Signal, signal_name};

/// Poll granularity.
pub const TICK: Duration = Duration::from_secs(1);

/// Elapsed-time bookkeeping. `started` is the spawn time or the last refresh,
/// `next_tick` is when the loop next polls the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    started: Instant,
    next_tick: Instant,
}

impl RunState {
    #[must_use]
    pub fn start(now: Instant) -> Self {
        Self {
            started: now,
            next_tick: now + TICK,
        }
    }

    #[must_use]
    pub const fn next_tick(&self) -> Instant {
        self.next_tick
    }

    /// Schedule the tick after the one due at `now`. After a suspension the
    /// missed ticks are dropped, not replayed.
    pub fn advance(&mut self, now: Instant) {
        self.next_tick += TICK;
        if self.next_tick < now {
            self.next_tick = now + TICK;
        }
    }

    /// whole seconds since start or last refresh
    #[must_use]
    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started).as_secs()
    }

    /// restart the clock and the tick schedule at `now`
    pub fn refresh(&mut self, now: Instant) {
        self.started = now;
        self.next_tick = now + TICK;
    }

    /// strictly past the budget, never true without one
    #[must_use]
    pub fn over_budget(&self, budget: u64, now: Instant) -> bool {
        !is_no_timeout(budget) && self.elapsed_secs(now) > budget
    }
}

/// How supervision ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// child ended on its own. `None` when waitpid couldn't tell us how.
    Completed(Option<TerminalStatus>),
    /// child was stopped by this signal
    Stopped(i32),
    /// budget ran out and we sent `signal`
    TimedOut {
        budget: u64,
        signal: Signal,
        status: Option<TerminalStatus>,
    },
    /// we passed this signal on and are bailing out
    Relayed(Signal),
}

impl Outcome {
    /// child's own code if it exited, 1 for everything else
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed(Some(TerminalStatus::Exited(code))) => (code & 0xFF) as u8,
            _ => exit_codes::FAILURE,
        }
    }
}

/// Watch `child` until it exits, stops, runs out of time, or a relayed
/// signal tells us to leave.
pub fn supervise(child: &mut RawChild, relay: &SignalRelay, config: &Config) -> Result<Outcome> {
    let pid = child.id();
    let mut state = RunState::start(Instant::now());
    let mut stopped = false;

    debug!("pid: {}", pid);

    loop {
        let now = Instant::now();
        if now < state.next_tick() {
            if let Some(signal) = relay.wait(state.next_tick() - now) {
                match relay_action(signal) {
                    RelayAction::Refresh => {
                        state.refresh(Instant::now());
                        debug!("{} received, clock reset", signal_name(signal));
                    }
                    RelayAction::Forward => {
                        debug!("forwarding {} to {}", signal_name(signal), pid);
                        send_signal(pid, signal)?;
                    }
                    RelayAction::ForwardAndExit => {
                        debug!("forwarding {} to {} and exiting", signal_name(signal), pid);
                        send_signal(pid, signal)?;
                        return Ok(Outcome::Relayed(signal));
                    }
                }
            }
            /* not time yet, or a signal woke us early */
            continue;
        }

        state.advance(now);

        match child.try_wait() {
            Ok(None) => {}
            Ok(Some(status)) => match status.classify() {
                TerminalStatus::Stopped(sig) if is_no_timeout(config.budget) => {
                    return Ok(Outcome::Stopped(sig));
                }
                TerminalStatus::Stopped(sig) => {
                    /* nobody else will kill it, keep the budget running */
                    debug!("child stopped by signal {}, budget still applies", sig);
                    stopped = true;
                }
                other => return Ok(Outcome::Completed(Some(other))),
            },
            Err(e) => {
                /* can't poll it, so it's gone as far as we're concerned */
                debug!("poll failed ({}), treating child as finished", e);
                return Ok(Outcome::Completed(None));
            }
        }

        let now = Instant::now();
        debug!(
            "Checking: {} running <= {} budget",
            state.elapsed_secs(now),
            config.budget
        );

        if state.over_budget(config.budget, now) {
            debug!("sending {} to {}", signal_name(config.signal), pid);
            send_signal(pid, config.signal)?;
            if stopped && config.signal != Signal::SIGKILL {
                send_signal(pid, Signal::SIGCONT)?;
            }
            return Ok(Outcome::TimedOut {
                budget: config.budget,
                signal: config.signal,
                status: reap_after_timeout(child, config.signal),
            });
        }
    }
}

/*
 * KILL can't be ignored, so block until it lands. Anything else might be
 * caught or ignored; take the status if it's already there, don't hang.
 */
fn reap_after_timeout(child: &mut RawChild, signal: Signal) -> Option<TerminalStatus> {
    let status = if signal == Signal::SIGKILL {
        child.wait().ok()
    } else {
        child.try_wait().ok().flatten()
    };
    status.map(|s| s.classify())
}
