/*
 * lib.rs
 *
 * The binary is a thin shell over this. Integration tests and doc tests
 * need the types, and the supervisor is usable on its own if you want to
 * watch a child from your own program.
 */

//! # killjoy
//!
//! Run a command under a wall-clock time budget and relay signals to it.
//!
//! ## Quick Start
//!
//! ```rust
//! use killjoy::{parse_budget, parse_signal, signal::Signal};
//!
//! // [D:[H:[M:]]]S, read right to left
//! assert_eq!(parse_budget("1:30").unwrap(), 90);
//! assert_eq!(parse_budget("1:0:0:0").unwrap(), 86_400);
//!
//! // names with or without SIG, any case, or plain numbers
//! assert_eq!(parse_signal("term").unwrap(), Signal::SIGTERM);
//! assert_eq!(parse_signal("9").unwrap(), Signal::SIGKILL);
//! ```

pub mod args;
pub mod config;
pub mod duration;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod process;
pub mod relay;
pub mod signal;
pub mod supervisor;

pub use args::Args;
pub use config::Config;
pub use duration::{is_no_timeout, parse_budget};
pub use error::{KilljoyError, Result, exit_codes};
pub use launcher::{announcement, launch, outcome_message, report};
pub use signal::{parse_signal, resolve_signal, signal_name};
pub use supervisor::{Outcome, supervise};
