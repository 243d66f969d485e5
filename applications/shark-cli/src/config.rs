/// CLI configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use shark_client::{ClientConfig, ClientPreset, DEFAULT_API_URL};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "shark.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Client preset name: `html`, `js` or `mobile`
    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,

    /// Where the session id and user id are persisted
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

impl CliConfig {
    /// Load configuration from file and environment.
    ///
    /// An explicit `path` must exist; otherwise `shark.toml` in the working
    /// directory is read when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (SHARK_API_URL, SHARK_PRESET, ...)
        settings = settings.add_source(config::Environment::with_prefix("SHARK").try_parsing(true));

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(CliError::Config(
                "API URL is required (set SHARK_API_URL)".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(CliError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.token_lifetime_secs == 0 {
            return Err(CliError::Config(
                "token_lifetime_secs must be greater than zero".to_string(),
            ));
        }

        self.client_preset().map(|_| ())
    }

    pub fn client_preset(&self) -> Result<ClientPreset> {
        match self.preset.as_str() {
            "html" => Ok(ClientPreset::html()),
            "js" => Ok(ClientPreset::js()),
            "mobile" => Ok(ClientPreset::mobile()),
            other => Err(CliError::Config(format!(
                "Unknown client preset '{}' (expected html, js or mobile)",
                other
            ))),
        }
    }

    /// Library configuration for these settings.
    pub fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig::new(self.api_url.clone())
            .with_preset(self.client_preset()?)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_token_lifetime(Duration::from_secs(self.token_lifetime_secs)))
    }
}

// Default values
fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_preset() -> String {
    "html".to_string()
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_token_lifetime_secs() -> u64 {
    600
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("./data/shark.json")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            preset: default_preset(),
            request_timeout_secs: default_request_timeout_secs(),
            token_lifetime_secs: default_token_lifetime_secs(),
            settings_path: default_settings_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());

        let client = config.client_config().unwrap();
        assert_eq!(client.api_url, DEFAULT_API_URL);
        assert_eq!(client.preset, ClientPreset::html());
        assert_eq!(client.request_timeout, Duration::from_secs(20));
        assert_eq!(client.token_lifetime, Duration::from_secs(600));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shark.toml");
        fs::write(
            &path,
            r#"
api_url = "http://localhost:9000"
preset = "mobile"
token_lifetime_secs = 120
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.preset, "mobile");
        assert_eq!(config.token_lifetime_secs, 120);
        assert_eq!(config.request_timeout_secs, 20);

        let client = config.client_config().unwrap();
        assert_eq!(client.preset, ClientPreset::mobile());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");

        assert!(matches!(
            CliConfig::load(Some(&path)),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CliConfig {
            preset: "desktop".to_string(),
            ..CliConfig::default()
        };
        match config.validate() {
            Err(CliError::Config(msg)) => assert!(msg.contains("desktop")),
            other => panic!("Expected Config error, got: {:?}", other),
        }

        let config = CliConfig {
            request_timeout_secs: 0,
            ..CliConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CliConfig {
            api_url: "  ".to_string(),
            ..CliConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
