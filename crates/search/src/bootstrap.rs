//! Startup plumbing shared by both binaries.

use std::path::Path;

use tricolor_core::{ConfigError, TricolorConfig};

/// Load the config file if one was given, falling back to defaults plus
/// environment overrides.
///
/// A file that cannot be loaded is not fatal; its error is returned next to
/// the fallback config so it can be logged once tracing is up.
pub fn load_config(path: Option<&Path>) -> Result<(TricolorConfig, Option<ConfigError>), ConfigError> {
    match path {
        Some(path) => match TricolorConfig::from_file(path) {
            Ok(cfg) => Ok((cfg, None)),
            Err(e) => Ok((TricolorConfig::from_env()?, Some(e))),
        },
        None => Ok((TricolorConfig::from_env()?, None)),
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured filter.
///
/// Logs go to stderr; stdout is reserved for the supervisor's report.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
