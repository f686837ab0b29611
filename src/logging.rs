use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format, writer::MakeWriterExt, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    FmtSubscriber,
};

/// Initialize the logging system.
///
/// Logs go to stderr, and also to `log_file` (without colors) if given.
///
/// Must be called before any other thread is spawned, as the local time offset
/// cannot be read soundly afterward.
pub fn init_logging(level: Level, log_file: Option<&Path>) -> Result<()> {
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let file = log_file
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Could not open log file {}", path.display()))
        })
        .transpose()?;

    tracing::subscriber::set_global_default(build_subscriber(level, local_offset, file))
        .into_diagnostic()
        .wrap_err("Setting default subscriber failed")
}

/// Colors are only written when stderr is the sole destination
fn build_subscriber(
    level: Level,
    offset: UtcOffset,
    log_file: Option<File>,
) -> Box<dyn Subscriber + Send + Sync> {
    let builder = FmtSubscriber::builder()
        .with_ansi(log_file.is_none())
        .with_max_level(level)
        .event_format(MyPrettyLogger::new(offset));

    match log_file {
        None => Box::new(builder.with_writer(io::stderr).finish()),
        Some(file) => Box::new(
            builder
                .with_writer(io::stderr.and(Mutex::new(file)))
                .finish(),
        ),
    }
}

/// Custom logger as the default ones are not as customizable as I want
struct MyPrettyLogger {
    offset: UtcOffset,
    time_format: &'static [FormatItem<'static>],
}

impl MyPrettyLogger {
    fn new(offset: UtcOffset) -> Self {
        Self {
            offset,
            time_format: format_description!("[hour]:[minute]:[second]"),
        }
    }
}

impl<S, N> FormatEvent<S, N> for MyPrettyLogger
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        let now = OffsetDateTime::now_utc().to_offset(self.offset).time();
        let now = now.format(self.time_format).map_err(|_| std::fmt::Error)?;
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("?");

        if writer.has_ansi_escapes() {
            let level = match *metadata.level() {
                Level::ERROR => metadata.level().red().to_string(),
                Level::WARN => metadata.level().yellow().to_string(),
                Level::DEBUG => metadata.level().blue().to_string(),
                _ => metadata.level().green().to_string(),
            };

            write!(
                &mut writer,
                "{} {:>5} {} ",
                now,
                level,
                thread_name.yellow(),
            )?;
        } else {
            write!(
                &mut writer,
                "{} {:>5} {} ",
                now,
                metadata.level(),
                thread_name,
            )?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_log_file_has_no_escape_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediatemp.log");
        let file = File::create(&path).unwrap();

        let subscriber = build_subscriber(Level::INFO, UtcOffset::UTC, Some(file));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("scratch directory kept");
            tracing::debug!("below the max level");
        });

        let logs = fs::read_to_string(&path).unwrap();
        assert!(logs.contains(" WARN "));
        assert!(logs.contains("scratch directory kept"));
        assert!(!logs.contains("below the max level"));
        assert!(!logs.contains('\x1b'));
    }
}
