/*
 * logging.rs
 *
 * Every line we print goes to stderr with a class tag:
 *
 *   KILLJOY [info]: Process has exited with status: 0
 *   KILLJOY [error]: command not found: nope
 *   KILLJOY [debug]: tick elapsed=3 budget=5
 *
 * The child's own stdout/stderr are inherited, we never touch them.
 * Code logs through tracing; this module is only the formatter and setup.
 */

use core::fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Prefix on every line we write.
pub const TAG: &str = "KILLJOY";

/// `KILLJOY [level]: message key=value`, no timestamps, no colors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedFormat;

impl<S, N> FormatEvent<S, N> for TaggedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{TAG} [{}]: ", level_tag(*event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[must_use]
pub fn level_tag(level: Level) -> &'static str {
    match level {
        Level::ERROR => "error",
        Level::WARN => "warn",
        Level::INFO => "info",
        _ => "debug",
    }
}

/// quiet keeps errors only, debug opens everything up
#[must_use]
pub const fn max_level(quiet: bool, debug: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the global subscriber. Second call is a no-op.
pub fn init(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .event_format(TaggedFormat)
        .try_init();
}

/* in-memory sink so tests can read back what was logged */
