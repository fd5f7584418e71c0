//! Configuration sections.

use bench_core::{JobLimits, DEFAULT_MAX_PROMPTS, DEFAULT_MAX_TOKENS};
use bench_engine::{GenerationMode, RunnerSettings, MAX_GENERATED_PROMPTS};
use bench_telemetry::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Complete harness configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HarnessConfig {
    /// HTTP front-end settings.
    #[validate(nested)]
    pub server: ServerConfig,
    /// Upstream transport settings.
    #[validate(nested)]
    pub client: ClientSettings,
    /// Job defaults and limits.
    #[validate(nested)]
    pub job: JobConfig,
    /// Prompt generator settings.
    #[validate(nested)]
    pub generator: GeneratorConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    #[validate(length(min = 1))]
    pub host: String,
    /// Bind port.
    #[validate(range(min = 1))]
    pub port: u16,
    /// Directory served for requests that match no API route.
    pub static_dir: Option<PathBuf>,
    /// Capacity of the per-batch event channel.
    #[validate(range(min = 1, max = 65536))]
    pub event_buffer: usize,
    /// Grace period for in-flight responses at shutdown.
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            event_buffer: default_event_buffer(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind, if `host` parses as an IP address.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().ok()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_event_buffer() -> usize {
    256
}

/// Upstream transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClientSettings {
    /// Whole-request timeout, streamed body included.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// User agent sent upstream.
    #[validate(length(min = 1))]
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        let runner = RunnerSettings::default();
        Self {
            request_timeout: runner.request_timeout,
            connect_timeout: runner.connect_timeout,
            user_agent: runner.user_agent,
        }
    }
}

impl ClientSettings {
    /// Settings handed to every request runner.
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Job defaults and limits.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JobConfig {
    /// Token cap when a job does not carry one.
    #[validate(range(min = 1))]
    pub default_max_tokens: u32,
    /// Streaming mode when a job does not say.
    pub default_stream: bool,
    /// Largest number of prompts accepted per job.
    #[validate(range(min = 1))]
    pub max_prompts: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: DEFAULT_MAX_TOKENS,
            default_stream: true,
            max_prompts: DEFAULT_MAX_PROMPTS,
        }
    }
}

impl JobConfig {
    /// Limits applied when converting job requests.
    pub fn limits(&self) -> JobLimits {
        JobLimits {
            default_max_tokens: self.default_max_tokens,
            default_stream: self.default_stream,
            max_prompts: self.max_prompts,
        }
    }
}

/// Prompt generator settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Model used when a generation request names none.
    pub model: Option<String>,
    /// Mode used when a generation request names none.
    pub default_mode: GenerationMode,
    /// Upper bound on the requested prompt count.
    #[validate(range(min = 1, max = 500))]
    pub max_prompts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: None,
            default_mode: GenerationMode::Strict,
            max_prompts: MAX_GENERATED_PROMPTS,
        }
    }
}
