//! Configuration loader with TOML parsing and environment variable overrides
//!
//! Loading order: read the file, substitute `${VAR}` placeholders, parse
//! the TOML, apply `VEIL_*` environment overrides, validate. The key
//! override path exists so that hashing keys can live in a secret store
//! and never touch the configuration file.

use super::schema::VeilConfig;
use crate::config::secret_string;
use crate::domain::errors::VeilError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into VeilConfig
/// 4. Applies environment variable overrides (`VEIL_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use veil::config::loader::load_config;
///
/// let config = load_config("veil.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<VeilConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(VeilError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        VeilError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: VeilConfig = toml::from_str(&contents)
        .map_err(|e| VeilError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config
        .validate()
        .map_err(|e| VeilError::Configuration(format!("Configuration validation failed: {}", e)))?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are skipped so that documented example placeholders do
/// not demand a live variable.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("substitution regex is valid");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(VeilError::Configuration(format!(
            "Missing environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies targeted `VEIL_*` environment overrides.
///
/// Keys are deliberately overridable from the environment so they can be
/// injected by a secret store without appearing in the file at all.
fn apply_env_overrides(config: &mut VeilConfig) {
    if let Ok(level) = std::env::var("VEIL_LOG_LEVEL") {
        config.application.log_level = level;
    }
    if let Ok(mode) = std::env::var("VEIL_MODE") {
        config.pipeline.mode = mode;
    }
    if let Ok(key) = std::env::var("VEIL_PRIMARY_KEY") {
        config.keys.primary_key = secret_string(key);
    }
    if let Ok(key) = std::env::var("VEIL_MASTER_KEY") {
        config.keys.master_key = secret_string(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_known_var() {
        std::env::set_var("VEIL_TEST_SUB_VAR", "resolved");
        let input = "value = \"${VEIL_TEST_SUB_VAR}\"";
        let output = substitute_env_vars(input).unwrap();
        assert!(output.contains("resolved"));
        std::env::remove_var("VEIL_TEST_SUB_VAR");
    }

    #[test]
    fn test_substitute_missing_var_fails() {
        let input = "value = \"${VEIL_TEST_DEFINITELY_UNSET}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("VEIL_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# example: key = \"${VEIL_TEST_COMMENTED_VAR}\"";
        let output = substitute_env_vars(input).unwrap();
        assert!(output.contains("${VEIL_TEST_COMMENTED_VAR}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/veil.toml").unwrap_err();
        assert!(matches!(err, VeilError::Configuration(_)));
    }
}
