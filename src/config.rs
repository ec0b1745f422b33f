//! Configuration management for the RAX storage server
//!
//! Separates startup configuration (requires restart) from runtime configuration
//! (can be updated while the server is running).

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const ENV_PREFIX: &str = "RAX_STORAGE";

/// Complete server configuration with startup/runtime separation
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub startup: StartupConfig,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

/// Configuration that requires a server restart to take effect
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    // ═══ NETWORK (Environment Override Supported) ═══
    /// IP address to bind the command listener
    pub bind_address: String,

    /// Port for the command listener
    pub port: u16,

    // ═══ STORAGE ═══
    /// Backend root on local disk; also reported by `ROOT`
    pub storage_root: String,

    /// Global quota in bytes
    pub storage_size: u64,

    /// Extensions rejected everywhere, comma or space separated
    #[serde(default)]
    pub restriction: String,

    // ═══ TRANSFERS (TOML Only) ═══
    /// Local directory downloads are written to
    pub download_dir: String,

    /// Local directory uploads are read from
    pub upload_dir: String,

    /// Buffer size for file copies
    pub buffer_size: usize,

    /// Maximum retry attempts for transient I/O errors
    pub max_retries: usize,

    /// Maximum command line length in bytes
    pub max_command_length: usize,
}

/// Configuration that can be updated while the server is running
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Maximum concurrent sessions
    /// Environment: RAX_STORAGE_MAX_SESSIONS
    pub max_sessions: usize,

    /// Upper bound on a single transfer command
    pub transfer_timeout_secs: u64,
}

/// Thread-safe runtime configuration wrapper
pub type SharedRuntimeConfig = Arc<RwLock<RuntimeConfig>>;

/// `RAX_STORAGE_<FIELD>` overrides. Field names keep their underscores, so
/// only the prefix is split off; values are parsed into numbers where they
/// look like one.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .try_parsing(true)
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        // Installed layout first, then the working directory
        let config_paths = ["rax-storage/config", "config"];

        let mut last_error = None;

        for config_path in &config_paths {
            match Self::build(File::with_name(config_path), environment()) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            }
        }

        Err(config::ConfigError::Message(format!(
            "Failed to load config.toml from any location. Tried: {config_paths:?}. Last error: {last_error:?}"
        )))
    }

    /// Parse a TOML document without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        let config: ServerConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn build<F>(file: F, env: Environment) -> Result<Self, config::ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let config: ServerConfig = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Split into startup (immutable) and runtime (mutable) parts
    pub fn split(self) -> (StartupConfig, SharedRuntimeConfig) {
        let runtime = Arc::new(RwLock::new(self.runtime));
        (self.startup, runtime)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.startup.port == 0 {
            return Err(config::ConfigError::Message("Port cannot be 0".into()));
        }

        if self.startup.storage_root.is_empty() {
            return Err(config::ConfigError::Message(
                "storage_root cannot be empty".into(),
            ));
        }

        if self.startup.storage_size == 0 {
            return Err(config::ConfigError::Message(
                "storage_size must be greater than 0".into(),
            ));
        }

        if self.startup.buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        if self.runtime.max_sessions == 0 {
            return Err(config::ConfigError::Message(
                "max_sessions must be greater than 0".into(),
            ));
        }

        if self.runtime.transfer_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "transfer_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Get bind address and port as socket address
    pub fn command_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    pub fn download_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.download_dir)
    }

    pub fn upload_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir)
    }
}

impl RuntimeConfig {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}
