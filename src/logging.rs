use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// A tracing event formatter that colors the whole line by level.
///
/// Only the event fields are printed; no timestamp, target or level prefix.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
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
        // Fields are buffered so the color applies to the entire line.
        let mut buffer = String::new();
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        writeln!(writer, "{}", colorize(*event.metadata().level(), buffer))
    }
}

fn colorize(level: Level, line: String) -> ColoredString {
    match level {
        Level::INFO => line.white(),
        Level::WARN => line.yellow(),
        Level::ERROR => line.red(),
        Level::DEBUG => line.blue(),
        Level::TRACE => line.purple(),
    }
}

/// Default filter directive when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "io_report=debug"
    } else {
        "io_report=info"
    }
}

/// Install the global subscriber. Logs go to stderr so the report can be piped.
pub fn init(verbose: bool, color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if color {
        builder.event_format(ColorizedFormatter).init();
    } else {
        builder.with_target(false).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "io_report=info");
        assert_eq!(default_directive(true), "io_report=debug");
    }

    #[test]
    fn test_colorize_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(colorize(Level::WARN, "disk slow".to_string()).to_string(), "disk slow");
        colored::control::unset_override();
    }
}
