// Define a new module for logging initialization
use crate::core::clock::Clock;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::Targets,
    fmt::{self, FmtContext, FormatEvent, FormatFields, format},
    prelude::__tracing_subscriber_SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Formats events as `<YYYY-MM-DD HH:MM:SS>: <message>` using the clock's zone.
pub struct LogLineFormat {
    clock: Arc<dyn Clock>,
}

impl LogLineFormat {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl<S, N> FormatEvent<S, N> for LogLineFormat
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
        let ts = self.clock.now().format("%Y-%m-%d %H:%M:%S");
        write!(writer, "{ts}: ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Layer appending this crate's INFO and above events to `file`.
pub fn file_layer<S>(file: File, clock: Arc<dyn Clock>) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .event_format(LogLineFormat::new(clock))
        .with_filter(Targets::new().with_target("crypto_etl", LevelFilter::INFO))
}

pub fn init_logging(verbose: bool, log_file: Option<&Path>, clock: Arc<dyn Clock>) -> Result<()> {
    let level = if verbose { "debug" } else { "off" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = log_file.map(open_log_file).transpose()?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .with(file.map(|f| file_layer(f, clock)))
        .init();
    Ok(())
}
