//! Daemon configuration.
//!
//! Read from `shchub.toml` (or the file named by `SHCHUB_CONFIG`), then
//! overridden from the environment. A missing file means defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use shchub_adapter_bosch_shc::BoschShcConfig;

const DEFAULT_CONFIG_PATH: &str = "shchub.toml";
const DEFAULT_LOG_FILTER: &str =
    "shchubd=info,shchub_app=info,shchub_adapter_bosch_shc=info,tower_http=debug";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub bosch_shc: BoschShcConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8123,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    /// Load the file, apply environment overrides and validate the result.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed, or when
    /// the merged configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("SHCHUB_CONFIG")
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `SHCHUB_*` overrides. `SHCHUB_BIND` wins over host and port,
    /// `RUST_LOG` wins over `SHCHUB_LOG`.
    ///
    /// Fails on a port that does not parse.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("SHCHUB_HOST") {
            self.server.host = host;
        }
        if let Some(raw) = lookup("SHCHUB_PORT") {
            self.server.port = parse_port("SHCHUB_PORT", &raw)?;
        }
        if let Some(bind) = lookup("SHCHUB_BIND") {
            let Some((host, port)) = bind.rsplit_once(':') else {
                return Err(ConfigError::Validation(format!(
                    "SHCHUB_BIND {bind:?} must be <host>:<port>"
                )));
            };
            self.server.port = parse_port("SHCHUB_BIND", port)?;
            self.server.host = host.to_string();
        }
        if let Some(filter) = lookup("RUST_LOG").or_else(|| lookup("SHCHUB_LOG")) {
            self.logging.filter = filter;
        }
        if let Some(host) = lookup("SHCHUB_SHC_HOST") {
            self.bosch_shc.host = host;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".into()));
        }
        if self.bosch_shc.scan_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "bosch_shc.scan_interval_secs must be non-zero".into(),
            ));
        }
        if let Some(token) = &self.bosch_shc.token
            && self.bosch_shc.hostname().is_none()
        {
            return Err(ConfigError::Validation(format!(
                "bosch_shc.token {token:?} does not name a controller host"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_port(variable: &str, raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{variable}: {raw:?} is not a valid port")))
}
