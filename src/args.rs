/*
 * args.rs
 *
 * Clap derive macros handle parsing. Life's too short to do this by hand.
 *
 * Option parsing stops at COMMAND: trailing_var_arg grabs everything after
 * it, so `killjoy -t 5 grep -r foo` doesn't try to parse grep's flags.
 *
 * -h is ours, not clap's: help exits 1. Old scripts check for that.
 */

use clap::{ArgAction, CommandFactory, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "killjoy",
    version,
    disable_help_flag = true,
    about = "Run a command, and kill it if it runs too long",
    long_about = "Start COMMAND, and kill it if still running after TIME.\n\n\
                  TIME is [D:[H:[M:]]]S, read right to left:\n\
                    killjoy -t 90 cmd        # 90 seconds\n\
                    killjoy -t 1:30 cmd      # 1 minute 30 seconds\n\
                    killjoy -t 2:0:0 cmd     # 2 hours\n\
                    killjoy -t 1:0:0:0 cmd   # 1 day\n\n\
                  Without --time the command runs until it exits.\n\n\
                  Signals received by killjoy are passed on to COMMAND. SIGUSR2 is\n\
                  not passed on: it restarts the clock instead.",
    after_help = "Exit status:\n\
                  the exit status of COMMAND if it exited on its own\n\
                  1   if COMMAND timed out, was signaled or stopped, or killjoy failed\n\
                  126 if COMMAND is found but cannot be invoked\n\
                  127 if COMMAND cannot be found"
)]
pub struct Args {
    /// Days, hours, minutes and seconds to let COMMAND run.
    ///
    /// Falls back to the KILLJOY_TIME environment variable.
    #[arg(short = 't', long = "time", value_name = "D:H:M:S", env = "KILLJOY_TIME")]
    pub time: Option<String>,

    /// Signal to send when time runs out (default: KILL).
    ///
    /// SIGNAL may be a name like 'TERM', 'SIGHUP' or 'kill', or a number.
    /// Falls back to the KILLJOY_SIGNAL environment variable.
    #[arg(short = 's', long = "signal", value_name = "SIGNAL", env = "KILLJOY_SIGNAL")]
    pub signal: Option<String>,

    /// Don't output any informative messages. Errors still print.
    #[arg(short = 'q', long = "quiet", conflicts_with = "debug")]
    pub quiet: bool,

    /// Trace what the supervisor is doing to stderr.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Display this help message.
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    pub help: bool,

    /// Command to run, followed by its arguments.
    ///
    /// Everything from the first word on belongs to the command, flags
    /// included, so `killjoy ls -q` hands -q to ls.
    #[arg(value_name = "COMMAND", trailing_var_arg = true)]
    pub command: Vec<String>,
}

impl Args {
    /// print the long help to stdout
    pub fn print_help() {
        let _ = Self::command().print_long_help();
    }

    /// the program to run, if one was given
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// everything after the program
    #[must_use]
    pub fn program_args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}
