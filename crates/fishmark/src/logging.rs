//! Process-wide log setup for the CLI and batch scripts.
//!
//! Library code only emits `log` records. [`init_logging`] installs
//! `env_logger`; the `tracing` feature adds [`init_tracing`], which forwards
//! those records into a `tracing` subscriber so pipeline spans and frame logs
//! end up in one stream.

use log::LevelFilter;

/// Environment variable refining the level given on the command line,
/// e.g. `FISHMARK_LOG=fishmark_taillog=trace`.
pub const LOG_ENV: &str = "FISHMARK_LOG";

/// Install `env_logger` on stderr at `level`.
///
/// Fails if a logger is already installed.
pub fn init_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env(LOG_ENV)
        .format_timestamp_millis()
        .format_target(false)
        .try_init()
}

/// Route `log` records into `tracing` and install a fmt subscriber on stderr.
///
/// Span close events carry their duration, which times stack loading and the
/// frame loop. With `json`, every event is one flattened JSON object.
#[cfg(feature = "tracing")]
pub fn init_tracing(
    level: LevelFilter,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    tracing_log::LogTracer::init()?;
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.with_target(false).try_init()
    }
}
