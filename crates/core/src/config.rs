//! Configuration shared by the supervisor and generator binaries.
//!
//! Parsed from an optional `tricolor.toml`, then overridden by
//! `TRICOLOR_<SECTION>_<KEY>` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

const MAX_NAMESPACE_LEN: usize = 200;

// ── Top-level config ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TricolorConfig {
    #[serde(default)]
    pub ipc: IpcConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

// ── Section configs ─────────────────────────────────────────────────

/// Names and permissions of the shared segment and semaphores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcConfig {
    /// Prefix of every named object (`/<namespace>_shm`, ...).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Permission bits used when the supervisor creates the objects.
    #[serde(default = "default_mode")]
    pub mode: u32,
}

fn default_namespace() -> String {
    "tricolor".into()
}

fn default_mode() -> u32 {
    0o600
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            mode: default_mode(),
        }
    }
}

impl IpcConfig {
    pub fn names(&self) -> IpcNames {
        IpcNames::for_namespace(&self.namespace)
    }
}

/// The four well-known object names both roles agree on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcNames {
    pub segment: String,
    pub free: String,
    pub used: String,
    pub write: String,
}

impl IpcNames {
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            segment: format!("/{namespace}_shm"),
            free: format!("/{namespace}_free_sem"),
            used: format!("/{namespace}_used_sem"),
            write: format!("/{namespace}_write_sem"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Highlight reports with ANSI colors.
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_color() -> bool {
    true
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Fixed RNG seed; a random one is drawn (and logged) when absent.
    pub seed: Option<u64>,

    /// Stop after this many search iterations.
    pub max_iterations: Option<u64>,
}

// ── Loading ─────────────────────────────────────────────────────────

impl TricolorConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Convention: `TRICOLOR_SECTION_KEY` overrides `section.key`.
    /// Unparseable numeric or boolean values are ignored.
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Some(v) = env_opt("TRICOLOR_IPC_NAMESPACE") {
            self.ipc.namespace = v;
        }
        if let Some(mode) = env_opt("TRICOLOR_IPC_MODE").and_then(|v| parse_mode(&v)) {
            self.ipc.mode = mode;
        }
        if let Some(v) = env_opt("TRICOLOR_LOG_FILTER") {
            self.log.filter = v;
        }
        if let Some(color) = env_opt("TRICOLOR_SUPERVISOR_COLOR").and_then(|v| v.parse().ok()) {
            self.supervisor.color = color;
        }
        if let Some(seed) = env_opt("TRICOLOR_GENERATOR_SEED").and_then(|v| v.parse().ok()) {
            self.generator.seed = Some(seed);
        }
        if let Some(max) = env_opt("TRICOLOR_GENERATOR_MAX_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.generator.max_iterations = Some(max);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ns = &self.ipc.namespace;
        if ns.is_empty() {
            return Err(ConfigError::Invalid("ipc.namespace must not be empty".into()));
        }
        if ns.len() > MAX_NAMESPACE_LEN {
            return Err(ConfigError::Invalid(format!(
                "ipc.namespace is {} bytes, limit is {MAX_NAMESPACE_LEN}",
                ns.len()
            )));
        }
        if let Some(bad) = ns
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
        {
            return Err(ConfigError::Invalid(format!(
                "ipc.namespace contains invalid character '{bad}'"
            )));
        }
        if self.ipc.mode > 0o777 {
            return Err(ConfigError::Invalid(format!(
                "ipc.mode {:o} is not a permission mask",
                self.ipc.mode
            )));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            namespace = %self.ipc.namespace,
            mode = format_args!("{:o}", self.ipc.mode),
            "ipc config"
        );
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

/// Accepts `600`, `0600` and `0o600`, all read as octal.
fn parse_mode(v: &str) -> Option<u32> {
    let digits = v.strip_prefix("0o").unwrap_or(v);
    u32::from_str_radix(digits, 8).ok()
}
