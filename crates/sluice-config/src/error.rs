use crate::validation::ValidationError;
use std::fmt;
use thiserror::Error;

/// All possible errors produced while loading a configuration source.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The source could not be read
    #[error("failed to read config source {path}: {source}")]
    Io {
        /// Path of the source that failed
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Errors that occur during YAML parsing
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A single validation error
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Multiple validation errors
    #[error("{}", MultipleErrorsFormat(.0))]
    MultipleValidation(Vec<ValidationError>),

    /// Unsupported config version
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

// Helper struct to format multiple errors
struct MultipleErrorsFormat<'a>(&'a [ValidationError]);

impl fmt::Display for MultipleErrorsFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "multiple validation errors ({} issues):", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, err)?;
        }
        Ok(())
    }
}

impl ConfigError {
    /// Create a ConfigError from a vector of validation errors.
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        match errors.len() {
            0 => ConfigError::Internal(
                "from_validation_errors called with an empty vector".to_string(),
            ),
            1 => ConfigError::Validation(errors.into_iter().next().unwrap()),
            _ => ConfigError::MultipleValidation(errors),
        }
    }
}
