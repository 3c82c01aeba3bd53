/*
 * library_api.rs
 *
 * integration-style tests exercising killjoy as a library.
 *
 * the relay is one-per-process and owns process-wide signal dispositions,
 * so every test that launches or installs one takes RELAY_LOCK first.
 */

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use killjoy::config::Config;
use killjoy::error::{KilljoyError, exit_codes};
use killjoy::process::{TerminalStatus, spawn_command};
use killjoy::relay::SignalRelay;
use killjoy::signal::Signal;
use killjoy::supervisor::{Outcome, supervise};
use killjoy::{launch, parse_budget, parse_signal};

static RELAY_LOCK: Mutex<()> = Mutex::new(());

fn relay_lock() -> MutexGuard<'static, ()> {
    /* a failed test poisons the lock, the relay itself is still fine */
    RELAY_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn config(budget: u64) -> Config {
    Config {
        budget,
        ..Config::default()
    }
}

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

/* signal ourselves from another thread after `delay` */
fn raise_later(sig: i32, delay: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        // SAFETY: kill() on our own pid with a relayed signal is safe
        unsafe {
            libc::kill(libc::getpid(), sig);
        }
    })
}

/* =========================================================================
 * PARSING
 * ========================================================================= */

#[test]
fn library_parse_config_values() {
    assert_eq!(parse_budget("2:0").unwrap(), 120);
    assert_eq!(parse_signal("SIGUSR1").unwrap(), Signal::SIGUSR1);
    assert!(matches!(
        parse_signal("bogus"),
        Err(KilljoyError::InvalidSignal(_))
    ));
}

/* =========================================================================
 * LAUNCH
 * ========================================================================= */

#[test]
fn library_launch_natural_exit() {
    let _guard = relay_lock();

    let outcome = launch(&config(5), "sh", &sh("exit 4")).expect("launch should succeed");

    assert_eq!(outcome, Outcome::Completed(Some(TerminalStatus::Exited(4))));
    assert_eq!(outcome.exit_code(), 4);
}

#[test]
fn library_launch_without_budget() {
    let _guard = relay_lock();

    let outcome = launch(&config(0), "true", &[]).expect("launch should succeed");

    assert_eq!(outcome.exit_code(), exit_codes::SUCCESS);
}

#[test]
fn library_launch_times_out() {
    let _guard = relay_lock();
    let start = Instant::now();

    let outcome = launch(&config(1), "sleep", &["10".to_string()]).expect("launch");

    assert_eq!(
        outcome,
        Outcome::TimedOut {
            budget: 1,
            signal: Signal::SIGKILL,
            status: Some(TerminalStatus::Signaled(libc::SIGKILL)),
        }
    );
    assert_eq!(outcome.exit_code(), exit_codes::FAILURE);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn library_launch_times_out_with_term() {
    let _guard = relay_lock();
    let cfg = Config {
        budget: 1,
        signal: Signal::SIGTERM,
        ..Config::default()
    };

    let outcome = launch(&cfg, "sleep", &["10".to_string()]).expect("launch");

    assert!(matches!(
        outcome,
        Outcome::TimedOut {
            budget: 1,
            signal: Signal::SIGTERM,
            ..
        }
    ));
}

#[test]
fn library_launch_spawn_errors() {
    let _guard = relay_lock();

    let err = launch(&config(5), "nonexistent_command_xyz_12345", &[]).unwrap_err();
    assert!(matches!(err, KilljoyError::CommandNotFound(_)));
    assert_eq!(err.exit_code(), exit_codes::NOT_FOUND);

    let err = launch(&config(5), "/dev/null", &[]).unwrap_err();
    assert!(matches!(err, KilljoyError::PermissionDenied(_)));
    assert_eq!(err.exit_code(), exit_codes::CANNOT_INVOKE);
}

#[test]
fn library_launch_with_relay_taken() {
    let _guard = relay_lock();
    let held = SignalRelay::install().expect("first relay");

    /* child is killed and reaped before the error comes back */
    let start = Instant::now();
    let err = launch(&config(5), "sleep", &["30".to_string()]).unwrap_err();
    assert!(matches!(err, KilljoyError::RelayInstalled));
    assert!(start.elapsed() < Duration::from_secs(2));

    drop(held);
}

/* =========================================================================
 * RELAYED SIGNALS
 * ========================================================================= */

#[test]
fn library_usr2_refreshes_budget() {
    let _guard = relay_lock();

    /* would die on the 3s tick; the reset at 1.5s lets it finish at 4s */
    let raiser = raise_later(libc::SIGUSR2, Duration::from_millis(1500));
    let outcome = launch(&config(2), "sh", &sh("sleep 4; exit 7")).expect("launch");
    raiser.join().unwrap();

    assert_eq!(outcome, Outcome::Completed(Some(TerminalStatus::Exited(7))));
}

#[test]
fn library_usr1_is_relayed_and_ends_supervision() {
    let _guard = relay_lock();
    let start = Instant::now();

    let raiser = raise_later(libc::SIGUSR1, Duration::from_millis(300));
    let outcome = launch(&config(30), "sleep", &["30".to_string()]).expect("launch");
    raiser.join().unwrap();

    assert_eq!(outcome, Outcome::Relayed(Signal::SIGUSR1));
    assert_eq!(outcome.exit_code(), exit_codes::FAILURE);
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[test]
fn library_hup_is_forwarded() {
    let _guard = relay_lock();

    let raiser = raise_later(libc::SIGHUP, Duration::from_millis(500));
    let script = "trap 'kill $!; exit 5' HUP; sleep 30 & wait";
    let outcome = launch(&config(20), "sh", &sh(script)).expect("launch");
    raiser.join().unwrap();

    /* still supervising when the child exited from its trap */
    assert_eq!(outcome, Outcome::Completed(Some(TerminalStatus::Exited(5))));
}

/* =========================================================================
 * SUPERVISE DIRECTLY
 * ========================================================================= */

#[test]
fn library_supervise_stopped_child_without_budget() {
    let _guard = relay_lock();

    let mut child = spawn_command("sh", &sh("kill -STOP $$")).expect("spawn");
    let relay = SignalRelay::install().expect("relay");
    let outcome = supervise(&mut child, &relay, &config(0)).expect("supervise");
    drop(relay);

    assert_eq!(outcome, Outcome::Stopped(libc::SIGSTOP));
    assert_eq!(outcome.exit_code(), exit_codes::FAILURE);

    /* no budget means nothing to enforce, the caller owns it now */
    child.kill().expect("kill stopped child");
}

#[test]
fn library_supervise_stopped_child_still_times_out() {
    let _guard = relay_lock();
    let cfg = Config {
        budget: 1,
        signal: Signal::SIGTERM,
        ..Config::default()
    };

    let mut child = spawn_command("sh", &sh("kill -STOP $$")).expect("spawn");
    let relay = SignalRelay::install().expect("relay");
    let outcome = supervise(&mut child, &relay, &cfg).expect("supervise");
    drop(relay);

    let Outcome::TimedOut { budget, signal, status } = outcome else {
        panic!("expected TimedOut, got {outcome:?}");
    };
    assert_eq!((budget, signal), (1, Signal::SIGTERM));

    /* CONT after TERM: the signal is delivered, not left pending */
    let status = match status {
        Some(status) => status,
        None => child.wait().expect("reap").classify(),
    };
    assert_eq!(status, TerminalStatus::Signaled(libc::SIGTERM));
}
