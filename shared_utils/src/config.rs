use thiserror::Error;

/// Errors related to application configuration read from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable is set but holds an empty or whitespace-only value.
    #[error("Environment variable {0} is set but empty")]
    EmptyEnvVar(String),
}
