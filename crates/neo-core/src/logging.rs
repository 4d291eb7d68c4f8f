//! Process-wide logger setup.

use env_logger::WriteStyle;

use crate::config::LoggingConfig;

/// Installs `env_logger` with the configured level. A `RUST_LOG` variable, when
/// set, refines the filter further.
///
/// Returns `false` if a logger was already installed; calling this twice is
/// harmless.
pub fn init(config: &LoggingConfig) -> bool {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(config.level_filter().unwrap_or(log::LevelFilter::Info))
        .write_style(if config.colored {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        })
        .format_timestamp_millis();

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    match builder.try_init() {
        Ok(()) => {
            log::debug!("Logging initialised at level {}", config.level);
            true
        }
        Err(_) => false,
    }
}
