/*
 * main.rs
 *
 * Parse args, build config, launch, report. Nothing clever lives here.
 *
 * Help and usage errors print the help text to stdout and exit 1. --version
 * is the one early exit that counts as success.
 */

use clap::Parser;
use clap::error::ErrorKind;
use tracing::{Level, error, info};

use killjoy::args::Args;
use killjoy::config::Config;
use killjoy::error::exit_codes;
use killjoy::launcher::{announcement, launch, report};
use killjoy::logging;

fn main() {
    std::process::exit(i32::from(run_main()));
}

fn run_main() -> u8 {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.kind() == ErrorKind::DisplayVersion => {
            let _ = e.print();
            return exit_codes::SUCCESS;
        }
        Err(e) => {
            logging::init(Level::ERROR);
            error!("{}", usage_error_line(&e.to_string()));
            Args::print_help();
            return exit_codes::FAILURE;
        }
    };

    if args.help {
        Args::print_help();
        return exit_codes::FAILURE;
    }

    logging::init(logging::max_level(args.quiet, args.debug));

    let Some(command) = args.program() else {
        error!("no command given");
        Args::print_help();
        return exit_codes::FAILURE;
    };

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return e.exit_code();
        }
    };

    info!("{}", announcement(&config, command));

    match launch(&config, command, args.program_args()) {
        Ok(outcome) => {
            report(&outcome);
            outcome.exit_code()
        }
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    }
}

/* clap's rendered error is multi-line with its own "error: " prefix */
fn usage_error_line(rendered: &str) -> &str {
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first)
}
