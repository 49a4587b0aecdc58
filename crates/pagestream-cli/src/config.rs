//! Configuration loading from TOML files

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use pagestream_core::{EndpointConfig, RetrievalMode, StreamOptions};

/// Global configuration for pagestream
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub dataapi: DataApiConfig,
    pub http: HttpConfig,
    pub stream: StreamConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataApiConfig {
    pub endpoint_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub auth_token: Option<String>,
    pub auth_selfsigned: bool,
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "https://localhost:25443/data-api/".to_string(),
            auth_token: std::env::var("PAGESTREAM_AUTH_TOKEN").ok(),
            auth_selfsigned: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connection_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: 0,
            read_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub wrap_stream: bool,
    pub stream_per_volume: bool,
    pub stream_id: u64,
    pub delimiter: char,
    pub max_volumes_per_request: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            wrap_stream: true,
            stream_per_volume: true,
            stream_id: 0,
            delimiter: '|',
            max_volumes_per_request: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./out"),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    expand_with(s, |name| std::env::var(name).ok())
}

fn expand_with(s: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        lookup(var_name)
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./pagestream.toml (current directory)
    /// 2. ~/.config/pagestream/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        // Try current directory first
        let local_config = PathBuf::from("pagestream.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Try user config directory
        if let Some(config_dir) = directories::ProjectDirs::from("", "", "pagestream") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config found
        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// The default endpoint assembled from the dataapi and http sections.
    pub fn endpoint(&self) -> EndpointConfig {
        let mut endpoint = EndpointConfig::new(&self.dataapi.endpoint_url);
        endpoint.connect_timeout_ms = self.http.connection_timeout_ms;
        endpoint.read_timeout_ms = self.http.read_timeout_ms;
        // An empty or blank token means unauthenticated, not an empty header
        endpoint.auth_token = self
            .dataapi
            .auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        endpoint.accept_invalid_certs = self.dataapi.auth_selfsigned;
        endpoint
    }

    /// Stream options from the stream section.
    pub fn options(&self, mode: RetrievalMode) -> StreamOptions {
        StreamOptions {
            wrap_stream: self.stream.wrap_stream,
            stream_per_volume: self.stream.stream_per_volume,
            stream_id: self.stream.stream_id,
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(
            config.dataapi.endpoint_url,
            "https://localhost:25443/data-api/"
        );
        assert!(config.dataapi.auth_selfsigned);
        assert!(config.stream.wrap_stream);
        assert_eq!(config.stream.delimiter, '|');
        assert_eq!(config.output.dir, PathBuf::from("./out"));
    }

    // Expansion is tested through an injected lookup; mutating the process
    // environment would race with sibling tests that read it.
    fn lookup(name: &str) -> Option<String> {
        (name == "SOME_VAR").then(|| "test_value".to_string())
    }

    #[test]
    fn expand_env_var_simple() {
        assert_eq!(
            expand_with("${SOME_VAR}", lookup),
            Some("test_value".to_string())
        );
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_with("literal", lookup), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_with("${OTHER_VAR}", lookup), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[dataapi]
endpoint_url = "https://data.example.org/data-api"
auth_selfsigned = false

[http]
connection_timeout_ms = 5000
read_timeout_ms = 30000

[stream]
stream_per_volume = false
max_volumes_per_request = 25

[output]
dir = "/tmp/pages"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.dataapi.endpoint_url,
            "https://data.example.org/data-api"
        );
        assert!(!config.dataapi.auth_selfsigned);
        assert_eq!(config.http.connection_timeout_ms, 5000);
        assert!(!config.stream.stream_per_volume);
        assert_eq!(config.stream.max_volumes_per_request, 25);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/pages"));
    }

    #[test]
    fn empty_auth_token_disables_authentication() {
        let config: Config = toml::from_str(
            r#"
[dataapi]
auth_token = ""
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint().auth_token, None);
    }

    #[test]
    fn blank_auth_token_disables_authentication() {
        let config: Config = toml::from_str(
            r#"
[dataapi]
auth_token = "   "
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint().auth_token, None);
    }

    #[test]
    fn configured_auth_token_survives() {
        let config: Config = toml::from_str(
            r#"
[dataapi]
auth_token = "tok-123"
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint().auth_token.as_deref(), Some("tok-123"));
    }

    #[test]
    fn endpoint_normalizes_url() {
        let config: Config = toml::from_str(
            r#"
[dataapi]
endpoint_url = "https://data.example.org/data-api"
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint().address, "https://data.example.org/data-api/");
    }
}
