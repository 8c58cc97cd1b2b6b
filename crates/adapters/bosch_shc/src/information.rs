//! Controller public information and hub identity resolution.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::ShcError;

/// Firmware update status of the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateState {
    #[default]
    NoUpdateAvailable,
    Downloading,
    UpdateInProgress,
    UpdateAvailable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareUpdateState {
    pub sw_installed_version: String,
    pub sw_update_state: UpdateState,
}

/// Unauthenticated `/public/information` document of a controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInformation {
    pub software_update_state: SoftwareUpdateState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shc_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

impl PublicInformation {
    #[must_use]
    pub fn version(&self) -> &str {
        &self.software_update_state.sw_installed_version
    }

    #[must_use]
    pub fn update_state(&self) -> UpdateState {
        self.software_update_state.sw_update_state
    }
}

/// An mDNS `_http._tcp.local.` service record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceRecord {
    /// Instance name, e.g. `Bosch SHC [64-da-a0-01-02-03]._http._tcp.local.`
    pub name: String,
    /// Host name, e.g. `shc012345.local.`
    pub server: String,
    /// IPv4 addresses the record advertises.
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Stable identity of the controller as a host device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubIdentity {
    pub unique_id: String,
    pub name: String,
}

/// Work out the controller's unique id and display name.
///
/// mDNS records win when one of them advertises the controller; the public
/// MAC address comes next, and the bare IP address is the last resort.
///
/// # Errors
///
/// Returns [`ShcError::Connection`] when the controller reports neither a
/// MAC nor an IP address.
pub fn resolve_identity(
    info: &PublicInformation,
    records: &[ServiceRecord],
) -> Result<HubIdentity, ShcError> {
    if let Some(identity) = identity_from_records(info, records) {
        tracing::debug!(
            name = %identity.name,
            unique_id = %identity.unique_id,
            "obtained unique id via zeroconf"
        );
        return Ok(identity);
    }

    if let Some(mac) = &info.mac_address {
        let identity = HubIdentity {
            unique_id: mac.clone(),
            name: info.shc_ip_address.clone().unwrap_or_else(|| mac.clone()),
        };
        tracing::debug!(
            name = %identity.name,
            unique_id = %identity.unique_id,
            "obtained unique id via public information"
        );
        return Ok(identity);
    }

    if let Some(host) = &info.shc_ip_address {
        tracing::warn!(
            %host,
            "cannot obtain unique id, using IP address instead; make sure the IP stays the same"
        );
        return Ok(HubIdentity {
            unique_id: host.clone(),
            name: host.clone(),
        });
    }

    Err(ShcError::Connection)
}

fn identity_from_records(info: &PublicInformation, records: &[ServiceRecord]) -> Option<HubIdentity> {
    let host_ip: Option<IpAddr> = info
        .shc_ip_address
        .as_deref()
        .and_then(|ip| ip.parse().ok());

    let mut mac = None;
    let mut name = None;
    for record in records.iter().filter(|r| r.name.contains("Bosch SHC")) {
        let address_matches = host_ip.is_none_or(|ip| {
            record
                .addresses
                .iter()
                .any(|addr| addr.parse::<IpAddr>().is_ok_and(|a| a == ip))
        });
        if !address_matches {
            continue;
        }
        if let Some(found) = bracketed(&record.name) {
            mac = Some(found);
        }
        if let Some(pos) = record.server.find(".local.") {
            name = Some(&record.server[..pos]);
        }
    }

    Some(HubIdentity {
        unique_id: format_mac(mac?),
        name: name?.to_string(),
    })
}

fn bracketed(value: &str) -> Option<&str> {
    let start = value.find('[')? + 1;
    let end = value[start..].find(']')? + start;
    Some(&value[start..end])
}

/// Normalise a MAC address to lowercase, dash-separated form.
///
/// `aa:bb:cc:dd:ee:ff`, `aabb.ccdd.eeff` and `aabbccddeeff` are recognised;
/// anything else is returned unchanged.
#[must_use]
pub fn format_mac(mac: &str) -> String {
    if mac.len() == 17 && mac.matches('-').count() == 5 {
        return mac.to_lowercase();
    }

    let compact = if mac.len() == 17 && mac.matches(':').count() == 5 {
        mac.replace(':', "")
    } else if mac.len() == 14 && mac.matches('.').count() == 2 {
        mac.replace('.', "")
    } else {
        mac.to_string()
    };

    if compact.len() != 12 || !compact.is_ascii() {
        return mac.to_string();
    }

    let lower = compact.to_lowercase();
    (0..12)
        .step_by(2)
        .map(|i| &lower[i..i + 2])
        .collect::<Vec<_>>()
        .join("-")
}

/// Whether a zeroconf instance name announces a Bosch controller.
#[must_use]
pub fn is_bosch_shc(name: &str) -> bool {
    name.starts_with("Bosch SHC")
}

/// Node name of a zeroconf host name, `shc012345.local.` gives `shc012345`.
#[must_use]
pub fn node_name(hostname: &str) -> &str {
    let local = hostname.strip_suffix('.').unwrap_or(hostname);
    local.strip_suffix(".local").unwrap_or(local)
}
