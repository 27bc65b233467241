/// Diagnostic logging setup.
///
/// Library code emits `tracing` events; the binary installs one fmt
/// subscriber writing to stderr so log lines never mix with command output
/// on stdout. The filter comes from `logging.level` (already overridden by
/// `VITALIS_LOG` during config loading).
use tracing_subscriber::EnvFilter;

use crate::config::schema::LoggingConfig;

/// Fallback when the configured filter does not parse.
const DEFAULT_FILTER: &str = "warn";

/// Build the filter for `config.level`, or `None` if it is not a valid
/// filter expression.
pub fn filter_for(config: &LoggingConfig) -> Option<EnvFilter> {
    config.level.trim().parse::<EnvFilter>().ok()
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init(config: &LoggingConfig) {
    let filter = filter_for(config).unwrap_or_else(|| {
        eprintln!(
            "warning: logging.level '{}' is not a valid filter, using '{DEFAULT_FILTER}'",
            config.level
        );
        EnvFilter::new(DEFAULT_FILTER)
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
