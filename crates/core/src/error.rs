use thiserror::Error;

/// Errors raised while building a graph from command-line edge tokens.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("malformed edge '{token}': {reason}")]
    MalformedToken { token: String, reason: &'static str },

    #[error("at least one edge must be provided")]
    NoEdges,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
