use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{self, LogSettings};

const DAYS_TO_KEEP: usize = 7;

/// Initialize tracing.
///
/// Logs always go to stderr because stdout carries the bridge protocol.
/// `RUST_LOG` wins over the configured level. When file logging is on,
/// the returned guard must be held until exit so buffered lines are flushed.
pub fn init(settings: &LogSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Must be queried before any threads exist or `time` refuses
    let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        time::macros::format_description!("[hour]:[minute]:[second].[subsecond digits:3]"),
    );

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let registry = tracing_subscriber::registry().with(env_filter).with(stderr_layer);

    if !settings.file {
        registry.try_init()?;
        return Ok(None);
    }

    let log_dir = config::log_dir()?;
    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .max_log_files(DAYS_TO_KEEP)
        .filename_prefix("nowplaying")
        .filename_suffix("log")
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    registry
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_timer(timer)
                .with_ansi(false),
        )
        .try_init()?;

    tracing::debug!("[Log] Writing log files to {}", log_dir.display());
    Ok(Some(guard))
}
