//! Layered configuration loading.
//!
//! Layers are applied in order: built-in defaults, an optional YAML or TOML
//! file, then environment overrides. The merged result is validated before it
//! is returned.

use crate::config::HarnessConfig;
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
}

impl ConfigFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Parse `contents` in this format.
    pub fn parse(self, path: &Path, contents: &str) -> ConfigResult<HarnessConfig> {
        match self {
            Self::Yaml => serde_yaml::from_str(contents).map_err(|e| ConfigError::parse(path, e)),
            Self::Toml => toml::from_str(contents).map_err(|e| ConfigError::parse(path, e)),
        }
    }
}

#[derive(Debug, Clone)]
enum EnvSource {
    Process,
    Fixed(HashMap<String, String>),
    Disabled,
}

impl EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        let value = match self {
            Self::Process => std::env::var(key).ok(),
            Self::Fixed(vars) => vars.get(key).cloned(),
            Self::Disabled => None,
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Builds a [`HarnessConfig`] from defaults, a file and the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: EnvSource,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Host override.
    pub const ENV_HOST: &'static str = "BENCH_HOST";
    /// Port override.
    pub const ENV_PORT: &'static str = "BENCH_PORT";
    /// Port override used by container platforms; `BENCH_PORT` wins.
    pub const ENV_PLATFORM_PORT: &'static str = "PORT";
    /// Log level override.
    pub const ENV_LOG_LEVEL: &'static str = "BENCH_LOG_LEVEL";
    /// JSON log output override.
    pub const ENV_LOG_JSON: &'static str = "BENCH_LOG_JSON";
    /// Upstream request timeout override, humantime syntax.
    pub const ENV_REQUEST_TIMEOUT: &'static str = "BENCH_REQUEST_TIMEOUT";
    /// Static asset directory override.
    pub const ENV_STATIC_DIR: &'static str = "BENCH_STATIC_DIR";

    /// Create a loader reading overrides from the process environment.
    pub fn new() -> Self {
        Self {
            file: None,
            env: EnvSource::Process,
        }
    }

    /// Read the given YAML or TOML file on top of the defaults.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = EnvSource::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Skip environment overrides entirely.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.env = EnvSource::Disabled;
        self
    }

    /// Load, merge and validate the configuration.
    pub async fn load(self) -> ConfigResult<HarnessConfig> {
        let mut config = match &self.file {
            Some(path) => {
                let format = ConfigFormat::from_path(path)?;
                let contents = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Io {
                        path: path.clone(),
                        source,
                    })?;
                info!(path = %path.display(), ?format, "Loaded configuration file");
                format.parse(path, &contents)?
            }
            None => HarnessConfig::default(),
        };

        self.apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&self, config: &mut HarnessConfig) -> ConfigResult<()> {
        if let Some(host) = self.env.get(Self::ENV_HOST) {
            debug!(host = %host, "Host overridden from environment");
            config.server.host = host;
        }

        let port = self
            .env
            .get(Self::ENV_PORT)
            .map(|v| (Self::ENV_PORT, v))
            .or_else(|| self.env.get(Self::ENV_PLATFORM_PORT).map(|v| (Self::ENV_PLATFORM_PORT, v)));
        if let Some((key, value)) = port {
            config.server.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env(key, value.clone()))?;
        }

        if let Some(dir) = self.env.get(Self::ENV_STATIC_DIR) {
            config.server.static_dir = Some(PathBuf::from(dir));
        }

        if let Some(level) = self.env.get(Self::ENV_LOG_LEVEL) {
            config.logging.level = level;
        }

        if let Some(value) = self.env.get(Self::ENV_LOG_JSON) {
            config.logging.json = parse_bool(&value)
                .ok_or_else(|| ConfigError::invalid_env(Self::ENV_LOG_JSON, value.clone()))?;
        }

        if let Some(value) = self.env.get(Self::ENV_REQUEST_TIMEOUT) {
            config.client.request_timeout = humantime::parse_duration(value.trim())
                .map_err(|_| ConfigError::invalid_env(Self::ENV_REQUEST_TIMEOUT, value.clone()))?;
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
