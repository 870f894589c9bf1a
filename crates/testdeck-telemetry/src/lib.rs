//! Logging setup for testdeck binaries.

pub mod event_layer;

pub use event_layer::{ActivityEvent, SessionEventLayer};

use testdeck_core::config::LogSettings;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "TESTDECK_LOG";

/// Builds the filter: `TESTDECK_LOG` if set, else `debug` when `verbose`,
/// else the configured level.
pub fn env_filter(settings: &LogSettings, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    let level = if verbose { "debug" } else { settings.level.as_str() };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber: formatted output on stderr plus, when
/// given, the activity layer.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing(settings: &LogSettings, verbose: bool, events: Option<SessionEventLayer>) {
    let json = settings.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let plain = (!settings.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(verbose)
            .with_writer(std::io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter(settings, verbose))
        .with(json)
        .with(plain)
        .with(events)
        .try_init();
}
