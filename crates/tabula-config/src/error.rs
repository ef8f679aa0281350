use thiserror::Error;

/// Errors raised while assembling connection settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The database URL could not be parsed.
    #[error("invalid database url: {0}")]
    InvalidUrl(String),

    /// A port value is not a number in `0..=65535`.
    #[error("invalid port '{0}'")]
    InvalidPort(String),

    /// Reading or writing the env file failed.
    #[error("env file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
