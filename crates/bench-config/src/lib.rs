//! # Bench Config
//!
//! Configuration management for LLM Stream Bench.
//!
//! Configuration is layered: built-in defaults, then an optional YAML or TOML
//! file, then `BENCH_*` environment overrides. Durations are written in
//! humantime form (`"30s"`, `"2m"`).
//!
//! ```rust,ignore
//! use bench_config::ConfigLoader;
//!
//! let config = ConfigLoader::new().with_file("bench.yaml").load().await?;
//! println!("listening on {}:{}", config.server.host, config.server.port);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{ClientSettings, GeneratorConfig, HarnessConfig, JobConfig, ServerConfig};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader};
