//! Configuration for the easel-locate discovery tool.
//!
//! The credential, the fallback range and hostname, vendor signatures and
//! every timeout are operator configuration, never code constants.

use std::net::Ipv4Addr;
use std::time::Duration;

use ipnet::Ipv4Net;
use serde::Deserialize;

use crate::error::{LocateError, Result};

/// Top-level locate configuration.
///
/// Loaded from `easel.toml` `[locate]` section or `EASEL_LOCATE__`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct LocateConfig {
    /// Path to the nmap binary.
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    /// Path to the ping binary.
    #[serde(default = "default_ping_path")]
    pub ping_path: String,

    /// Upper bound for one active scan of a /24.
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,

    /// Reachability probe timeout per address.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Host suffixes the unit has historically taken, probed as a batch
    /// when the active scan comes back empty.
    #[serde(default = "default_heuristic_hosts")]
    pub heuristic_hosts: Vec<u8>,

    /// Directory for discovery run journals.
    #[serde(default = "default_journal_dir")]
    pub journal_dir: String,

    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,

    #[serde(default)]
    pub vendor: VendorConfig,

    #[serde(default)]
    pub deploy: DeployConfig,
}

/// Credential and transport settings for the verification channel.
#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    /// Remote user on the display unit.
    #[serde(default = "default_ssh_user")]
    pub user: String,

    /// Password for the remote user. Must be set by the operator.
    #[serde(default)]
    pub password: String,

    /// Path to the ssh binary.
    #[serde(default = "default_ssh_path")]
    pub ssh_path: String,

    /// Path to the sshpass binary.
    #[serde(default = "default_sshpass_path")]
    pub sshpass_path: String,

    /// SSH connect timeout.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Marker text the verification command must echo back.
    #[serde(default = "default_marker")]
    pub marker: String,
}

/// Where to look when the local interfaces give nothing away.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    /// The range that has hosted the unit before; always appended to the
    /// enumerated ranges.
    #[serde(default = "default_fallback_cidr")]
    pub cidr: Ipv4Net,

    /// The last address the unit was verified at.
    #[serde(default = "default_last_known")]
    pub last_known: Ipv4Addr,

    /// mDNS hostname tried after every range is exhausted.
    #[serde(default = "default_fallback_hostname")]
    pub hostname: String,
}

/// Signatures that identify the unit in scan output.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    /// MAC OUI prefixes assigned to the unit's board vendor.
    #[serde(default = "default_oui_prefixes")]
    pub oui_prefixes: Vec<String>,

    /// Substring matched against vendor strings and reverse-DNS names.
    #[serde(default = "default_product_hint")]
    pub product_hint: String,
}

/// The deploy document the verified address is written into.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Path to the deploy document.
    #[serde(default = "default_deploy_path")]
    pub config_path: String,

    /// Key of the quoted address assignment inside the document.
    #[serde(default = "default_address_key")]
    pub address_key: String,
}

impl LocateConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Reject configurations that cannot possibly verify anything.
    pub fn validate(&self) -> Result<()> {
        if self.ssh.password.is_empty() {
            return Err(LocateError::Config(
                "SSH password required: set locate.ssh.password in easel.toml \
                 or EASEL_LOCATE__SSH__PASSWORD"
                    .to_string(),
            ));
        }
        if self.ssh.marker.is_empty() {
            return Err(LocateError::Config(
                "Verification marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl SshConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_ping_path() -> String {
    "ping".to_string()
}

fn default_scan_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    1
}

fn default_heuristic_hosts() -> Vec<u8> {
    vec![64, 100, 101, 10]
}

fn default_journal_dir() -> String {
    "./journal".to_string()
}

fn default_ssh_user() -> String {
    "pi".to_string()
}

fn default_ssh_path() -> String {
    "ssh".to_string()
}

fn default_sshpass_path() -> String {
    "sshpass".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_marker() -> String {
    "easel-ok".to_string()
}

fn default_fallback_cidr() -> Ipv4Net {
    "30.30.10.0/24".parse().expect("valid fallback CIDR")
}

fn default_last_known() -> Ipv4Addr {
    Ipv4Addr::new(30, 30, 10, 64)
}

fn default_fallback_hostname() -> String {
    "raspberrypi.local".to_string()
}

fn default_oui_prefixes() -> Vec<String> {
    vec![
        "b8:27:eb".to_string(),
        "dc:a6:32".to_string(),
        "e4:5f:01".to_string(),
    ]
}

fn default_product_hint() -> String {
    "raspberry".to_string()
}

fn default_deploy_path() -> String {
    "deploy.toml".to_string()
}

fn default_address_key() -> String {
    "address".to_string()
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            ping_path: default_ping_path(),
            scan_timeout_secs: default_scan_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            heuristic_hosts: default_heuristic_hosts(),
            journal_dir: default_journal_dir(),
            ssh: SshConfig::default(),
            fallback: FallbackConfig::default(),
            vendor: VendorConfig::default(),
            deploy: DeployConfig::default(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: default_ssh_user(),
            password: String::new(),
            ssh_path: default_ssh_path(),
            sshpass_path: default_sshpass_path(),
            connect_timeout_secs: default_connect_timeout(),
            marker: default_marker(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            cidr: default_fallback_cidr(),
            last_known: default_last_known(),
            hostname: default_fallback_hostname(),
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            oui_prefixes: default_oui_prefixes(),
            product_hint: default_product_hint(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            config_path: default_deploy_path(),
            address_key: default_address_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = LocateConfig::default();
        assert_eq!(config.nmap_path, "nmap");
        assert_eq!(config.probe_timeout_secs, 1);
        assert_eq!(config.ssh.connect_timeout_secs, 5);
        assert_eq!(config.heuristic_hosts, vec![64, 100, 101, 10]);
        assert_eq!(config.fallback.cidr.to_string(), "30.30.10.0/24");
        assert_eq!(
            config.fallback.last_known,
            Ipv4Addr::new(30, 30, 10, 64)
        );
        assert_eq!(config.fallback.hostname, "raspberrypi.local");
    }

    #[test]
    fn validate_rejects_missing_password() {
        let config = LocateConfig::default();
        assert!(config.validate().is_err());

        let mut config = LocateConfig::default();
        config.ssh.password = "2308".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config: LocateConfig = toml::from_str(
            r#"
            probe_timeout_secs = 2

            [ssh]
            password = "2308"

            [fallback]
            cidr = "10.1.2.0/24"
            last_known = "10.1.2.64"
            "#,
        )
        .unwrap();

        assert_eq!(config.probe_timeout_secs, 2);
        assert_eq!(config.ssh.password, "2308");
        assert_eq!(config.ssh.user, "pi");
        assert_eq!(config.fallback.cidr.to_string(), "10.1.2.0/24");
        assert_eq!(config.fallback.hostname, "raspberrypi.local");
    }
}
