/// Structured error types for recruitctl-core.
///
/// Library consumers get composable `thiserror` enums; the CLI wraps them
/// in `anyhow` with context.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for recruitctl-core operations
#[derive(Error, Debug)]
pub enum RecruitError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Config file could not be parsed
    #[error("Invalid config at {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Configuration value missing or malformed
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Spreadsheet could not be read at all (row-level problems are reported separately)
    #[error(transparent)]
    Import(#[from] crate::import::ImportError),

    /// Filter descriptors rejected
    #[error(transparent)]
    Filter(#[from] crate::filters::FilterError),
}

/// Result type alias for recruitctl-core operations
pub type Result<T> = std::result::Result<T, RecruitError>;

impl RecruitError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = RecruitError::config("DATABASE_URL not set");
        assert_eq!(err.to_string(), "Configuration error: DATABASE_URL not set");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: RecruitError = io_err.into();
        assert!(matches!(err, RecruitError::Io { .. }));
    }
}
