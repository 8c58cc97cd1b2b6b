//! Bosch SHC integration configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::session::simulated::SimulatedConfig;

/// Directory, below the configuration directory, holding the TLS assets.
pub const TLS_ASSET_DIR: &str = "bosch_shc";

/// Client certificate or key issued when pairing with the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsAsset {
    Certificate,
    Key,
}

impl TlsAsset {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Certificate => "shc_cert",
            Self::Key => "shc_key",
        }
    }
}

/// Configuration for the Bosch SHC integration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoschShcConfig {
    /// Controller host name or IP address.
    pub host: String,
    /// Directory holding `bosch_shc/shc_cert_<hostname>.pem` and the key.
    pub config_dir: PathBuf,
    /// Explicit client certificate path, overriding the derived one.
    pub ssl_certificate: Option<PathBuf>,
    /// Explicit client key path, overriding the derived one.
    pub ssl_key: Option<PathBuf>,
    /// Pairing token, `<client id>:<hostname>`.
    pub token: Option<String>,
    /// Interval between refreshes of polled entities, in seconds.
    pub scan_interval_secs: u16,
    /// Devices of the in-process simulated controller.
    pub simulated: SimulatedConfig,
}

impl Default for BoschShcConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            config_dir: PathBuf::from("."),
            ssl_certificate: None,
            ssl_key: None,
            token: None,
            scan_interval_secs: 30,
            simulated: SimulatedConfig::default(),
        }
    }
}

impl BoschShcConfig {
    /// Controller host name taken from the pairing token.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.token.as_deref().and_then(hostname_from_token)
    }

    /// Path of the client certificate, explicit or derived from the token.
    #[must_use]
    pub fn certificate_path(&self) -> Option<PathBuf> {
        self.ssl_certificate.clone().or_else(|| {
            self.hostname()
                .map(|hostname| tls_asset_path(&self.config_dir, TlsAsset::Certificate, hostname))
        })
    }

    /// Path of the client key, explicit or derived from the token.
    #[must_use]
    pub fn key_path(&self) -> Option<PathBuf> {
        self.ssl_key.clone().or_else(|| {
            self.hostname()
                .map(|hostname| tls_asset_path(&self.config_dir, TlsAsset::Key, hostname))
        })
    }
}

/// Host name part of a pairing token such as `HomeAssistant:shc012345`.
#[must_use]
pub fn hostname_from_token(token: &str) -> Option<&str> {
    token
        .split_once(':')
        .map(|(_, hostname)| hostname)
        .filter(|hostname| !hostname.is_empty())
}

/// Location of a TLS asset, `<dir>/bosch_shc/<prefix>_<hostname>.pem`.
#[must_use]
pub fn tls_asset_path(config_dir: &Path, asset: TlsAsset, hostname: &str) -> PathBuf {
    config_dir
        .join(TLS_ASSET_DIR)
        .join(format!("{}_{hostname}.pem", asset.prefix()))
}
