//! Run configuration.
//!
//! Config is an explicit value loaded once in `main` and passed down; no
//! module reads the environment or a global on its own. The API key is the
//! one exception to the YAML file: it is taken from the environment variable
//! the config names, then carried inside [`ClientConfig`] like any other
//! field.

use std::path::Path;

use serde::Deserialize;

use crate::error::RunError;

/// Everything a run can tune, with working defaults for all of it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Model the completion service should use. The file also accepts the
    /// shorter key `model`, matching the CLI flag.
    #[serde(alias = "model")]
    pub model_identifier: String,
    /// How many extra attempts transient failures get. Zero disables retry.
    pub max_retries: usize,
    /// First retry delay in seconds; each further retry doubles it.
    pub backoff_base_seconds: f64,
    /// Per-attempt HTTP timeout in seconds.
    pub request_timeout_seconds: f64,
    /// Base URL of an OpenAI-compatible completion endpoint.
    pub api_base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Basename for artifacts: `<report_name>_YYYYMMDD.md` / `.pdf`.
    pub report_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model_identifier: "gpt-4o-mini".to_string(),
            max_retries: 3,
            backoff_base_seconds: 1.0,
            request_timeout_seconds: 120.0,
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "SPACE_REPORT_API_KEY".to_string(),
            report_name: "space_report".to_string(),
        }
    }
}

impl RunConfig {
    /// Load a YAML config file, or fall back to defaults when no path was
    /// given. Unknown keys are rejected so typos fail loudly instead of
    /// silently running with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, RunError> {
        let config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| RunError::Config(format!("cannot read {}: {e}", p.display())))?;
                serde_yaml::from_str(&text)
                    .map_err(|e| RunError::Config(format!("bad config {}: {e}", p.display())))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RunError> {
        if !self.backoff_base_seconds.is_finite() || self.backoff_base_seconds < 0.0 {
            return Err(RunError::Config(
                "backoff_base_seconds must be a non-negative number".to_string(),
            ));
        }
        if !self.request_timeout_seconds.is_finite() || self.request_timeout_seconds <= 0.0 {
            return Err(RunError::Config(
                "request_timeout_seconds must be a positive number".to_string(),
            ));
        }
        if self.model_identifier.trim().is_empty() {
            return Err(RunError::Config("model_identifier must not be empty".to_string()));
        }
        if self.report_name.is_empty() || self.report_name.contains(['/', '\\']) {
            return Err(RunError::Config(
                "report_name must be a plain file basename".to_string(),
            ));
        }
        Ok(())
    }

    /// Bundle the fields the completion client needs, key included.
    pub fn client_config(&self, api_key: String) -> ClientConfig {
        ClientConfig {
            model_identifier: self.model_identifier.clone(),
            max_retries: self.max_retries,
            backoff_base_seconds: self.backoff_base_seconds,
            request_timeout_seconds: self.request_timeout_seconds,
            api_base_url: self.api_base_url.clone(),
            api_key,
        }
    }
}

/// The completion client's slice of the run configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub model_identifier: String,
    pub max_retries: usize,
    pub backoff_base_seconds: f64,
    pub request_timeout_seconds: f64,
    pub api_base_url: String,
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_defaults_are_usable() {
        let config = RunConfig::default();
        assert_eq!(config.model_identifier, "gpt-4o-mini");
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loads_partial_yaml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model_identifier: gpt-4.1").unwrap();
        writeln!(file, "max_retries: 5").unwrap();

        let config = RunConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.model_identifier, "gpt-4.1");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.report_name, "space_report");
    }

    #[test]
    fn test_readme_config_example_loads() {
        // Mirrors the configuration block in README.md.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model: gpt-4o-mini").unwrap();
        writeln!(file, "max_retries: 3").unwrap();
        writeln!(file, "backoff_base_seconds: 1.0").unwrap();
        writeln!(file, "request_timeout_seconds: 120.0").unwrap();
        writeln!(file, "api_base_url: https://api.openai.com/v1").unwrap();
        writeln!(file, "api_key_env: SPACE_REPORT_API_KEY").unwrap();
        writeln!(file, "report_name: space_report").unwrap();

        let config = RunConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.model_identifier, "gpt-4o-mini");
        assert_eq!(config.api_key_env, "SPACE_REPORT_API_KEY");
        assert_eq!(config.report_name, "space_report");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_retires: 5").unwrap();

        let err = RunConfig::load(Some(file.path())).unwrap_err();
        assert_eq!(err.classification(), "config_error");
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = RunConfig::load(Some(Path::new("/no/such/config.yaml"))).unwrap_err();
        assert_eq!(err.classification(), "config_error");
    }

    #[test]
    fn test_negative_backoff_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backoff_base_seconds: -1.0").unwrap();

        let err = RunConfig::load(Some(file.path())).unwrap_err();
        assert_eq!(err.classification(), "config_error");
    }

    #[test]
    fn test_report_name_must_be_a_basename() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "report_name: ../escape").unwrap();

        let err = RunConfig::load(Some(file.path())).unwrap_err();
        assert_eq!(err.classification(), "config_error");
    }

    #[test]
    fn test_client_config_carries_the_key() {
        let config = RunConfig::default();
        let client = config.client_config("sk-test".to_string());
        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.model_identifier, config.model_identifier);
    }
}
