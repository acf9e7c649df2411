use crate::config::ConfigError;

/// Reads an environment variable, returning a structured error if it's missing.
///
/// The value is trimmed; a variable that is present but blank is reported as
/// [`ConfigError::EmptyEnvVar`] so callers don't end up opening `""` as a path.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, ConfigError> {
    let raw = std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::EmptyEnvVar(name.to_string()));
    }
    Ok(value.to_string())
}

/// Reads an optional environment variable.
///
/// Returns `Ok(None)` when the variable is unset, and the same errors as
/// [`get_env_var`] for a blank value.
pub fn get_env_var_opt(name: &str) -> Result<Option<String>, ConfigError> {
    match get_env_var(name) {
        Ok(v) => Ok(Some(v)),
        Err(ConfigError::MissingEnvVar(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
