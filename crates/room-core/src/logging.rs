//! Logging setup
//!
//! The library only emits `tracing` events. Applications that do not bring
//! their own subscriber can install one from the `[logging]` section of
//! their [`RoomSettings`](crate::RoomSettings):
//!
//! ```rust,no_run
//! # use confab_room_core::{RoomResult, RoomSettings};
//! # fn main() -> RoomResult<()> {
//! let settings = RoomSettings::from_file("confab.toml")?;
//! settings.logging.install()?;
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{RoomError, RoomResult};
use crate::settings::LoggingSettings;

/// Install a global subscriber described by `settings`
///
/// `RUST_LOG`, when set, takes precedence over `settings.level`. Only one
/// global subscriber can exist per process; later calls fail with
/// [`RoomError::Configuration`].
pub fn setup_logging(settings: &LoggingSettings) -> RoomResult<()> {
    let level = parse_log_level(&settings.level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    let span_events = if settings.log_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (json_layer, text_layer) = if settings.json {
        let layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(settings.file_info)
            .with_line_number(settings.file_info);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(settings.file_info)
            .with_line_number(settings.file_info);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| RoomError::configuration(format!("failed to install logger: {}", e)))?;

    tracing::debug!(level = %level, json = settings.json, "Installed logger");
    Ok(())
}

/// Parse a level name such as `info` or `WARN`
pub fn parse_log_level(level: &str) -> RoomResult<Level> {
    Level::from_str(level.trim())
        .map_err(|_| RoomError::configuration(format!("unknown log level '{}'", level)))
}
