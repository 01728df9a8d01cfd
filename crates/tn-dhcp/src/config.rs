use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::packet::{DhcpError, mac_str};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhcpServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_server_mac")]
    pub server_mac: String,
    #[serde(default = "default_server_ip")]
    pub server_ip: String,
    /// Address offered to clients that do not request one.
    #[serde(default = "default_fallback_ip")]
    pub fallback_ip: String,
    #[serde(default = "default_lease_time")]
    pub lease_time_secs: u32,
    #[serde(default = "default_netmask")]
    pub netmask: String,
    #[serde(default)]
    pub router: String,
    /// Clients remembered at once; the least recently seen is evicted beyond this.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

/// Parsed, typed form of [`DhcpServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub port: u16,
    pub mac: [u8; 6],
    pub server_ip: Ipv4Addr,
    pub fallback_ip: Ipv4Addr,
    pub lease_time_secs: u32,
    pub netmask: Option<Ipv4Addr>,
    pub router: Option<Ipv4Addr>,
    pub max_clients: usize,
}

const DEFAULT_PORT: u16 = 67;
const DEFAULT_SERVER_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
const DEFAULT_SERVER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
const DEFAULT_FALLBACK_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 2);
const DEFAULT_LEASE_TIME: u32 = 86400;
const DEFAULT_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);
const DEFAULT_MAX_CLIENTS: usize = 32;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_server_mac() -> String {
    mac_str(&DEFAULT_SERVER_MAC)
}

fn default_server_ip() -> String {
    DEFAULT_SERVER_IP.to_string()
}

fn default_fallback_ip() -> String {
    DEFAULT_FALLBACK_IP.to_string()
}

fn default_lease_time() -> u32 {
    DEFAULT_LEASE_TIME
}

fn default_netmask() -> String {
    DEFAULT_NETMASK.to_string()
}

fn default_max_clients() -> usize {
    DEFAULT_MAX_CLIENTS
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            mac: DEFAULT_SERVER_MAC,
            server_ip: DEFAULT_SERVER_IP,
            fallback_ip: DEFAULT_FALLBACK_IP,
            lease_time_secs: DEFAULT_LEASE_TIME,
            netmask: Some(DEFAULT_NETMASK),
            router: None,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

impl Default for DhcpServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            server_mac: default_server_mac(),
            server_ip: default_server_ip(),
            fallback_ip: default_fallback_ip(),
            lease_time_secs: default_lease_time(),
            netmask: default_netmask(),
            router: String::new(),
            max_clients: default_max_clients(),
        }
    }
}

impl DhcpServerConfig {
    /// Load from a JSON file, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No DHCP config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read DHCP config from {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse DHCP config {}", path.display()))?;
        Ok(config)
    }

    /// Parse the string fields into typed addresses.
    pub fn validate(&self) -> std::result::Result<ServerSettings, DhcpError> {
        if self.port == 0 {
            return Err(DhcpError::InvalidConfig("port must be nonzero".to_string()));
        }
        if self.max_clients == 0 {
            return Err(DhcpError::InvalidConfig("max_clients must be nonzero".to_string()));
        }
        Ok(ServerSettings {
            port: self.port,
            mac: parse_mac(&self.server_mac)?,
            server_ip: parse_ip("server_ip", &self.server_ip)?,
            fallback_ip: parse_ip("fallback_ip", &self.fallback_ip)?,
            lease_time_secs: self.lease_time_secs,
            netmask: parse_optional_ip("netmask", &self.netmask)?,
            router: parse_optional_ip("router", &self.router)?,
            max_clients: self.max_clients,
        })
    }
}

fn parse_ip(field: &str, value: &str) -> std::result::Result<Ipv4Addr, DhcpError> {
    value
        .parse()
        .map_err(|_| DhcpError::InvalidConfig(format!("{}: invalid address {:?}", field, value)))
}

fn parse_optional_ip(field: &str, value: &str) -> std::result::Result<Option<Ipv4Addr>, DhcpError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_ip(field, value).map(Some)
}

/// Parse aa:bb:cc:dd:ee:ff (case-insensitive).
pub fn parse_mac(value: &str) -> std::result::Result<[u8; 6], DhcpError> {
    let invalid = || DhcpError::InvalidConfig(format!("server_mac: invalid MAC {:?}", value));
    let mut mac = [0u8; 6];
    let mut parts = value.split(':');
    for byte in mac.iter_mut() {
        let part = parts.next().ok_or_else(invalid)?;
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(mac)
}
