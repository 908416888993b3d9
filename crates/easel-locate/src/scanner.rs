//! Active range scanning via nmap.
//!
//! Runs an nmap ping scan (`-sn`) over one /24 and picks out the display
//! unit by its vendor signatures: MAC OUI prefix, vendor string, or
//! reverse-DNS name. A scan that fails or times out is not fatal; the
//! caller falls back to heuristic probing.

use std::net::Ipv4Addr;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use tokio::process::Command;

use crate::config::LocateConfig;
use crate::error::{LocateError, Result};
use crate::nmap_xml::{self, NmapHost};

/// Something that can search one range for the display unit.
#[async_trait]
pub trait RangeScanner: Send + Sync {
    /// Returns the unit's address when the scan finds it, `None` when the
    /// scan found nothing or could not run.
    async fn find_device(&self, range: Ipv4Net) -> Option<Ipv4Addr>;
}

/// `RangeScanner` backed by the nmap binary.
pub struct NmapScanner {
    nmap_path: String,
    scan_timeout: std::time::Duration,
    oui_prefixes: Vec<String>,
    product_hint: String,
}

impl NmapScanner {
    pub fn new(config: &LocateConfig) -> Self {
        Self {
            nmap_path: config.nmap_path.clone(),
            scan_timeout: config.scan_timeout(),
            oui_prefixes: config
                .vendor
                .oui_prefixes
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            product_hint: config.vendor.product_hint.to_lowercase(),
        }
    }

    /// Does this host look like the display unit?
    fn matches_device(&self, host: &NmapHost) -> bool {
        if let Some(mac) = host.mac() {
            let mac = mac.to_lowercase();
            if self.oui_prefixes.iter().any(|p| mac.starts_with(p.as_str())) {
                return true;
            }
        }
        if let Some(vendor) = host.vendor() {
            if vendor.to_lowercase().contains(&self.product_hint) {
                return true;
            }
        }
        if let Some(name) = host.hostname() {
            if name.to_lowercase().contains(&self.product_hint) {
                return true;
            }
        }
        false
    }

    /// Run one ping scan and return the first up host matching the unit's
    /// signatures.
    async fn scan(&self, range: Ipv4Net) -> Result<Option<Ipv4Addr>> {
        tracing::info!(range = %range, "Starting nmap ping scan");

        let child = Command::new(&self.nmap_path)
            .arg("-sn")
            .arg("-oX")
            .arg("-")
            .arg(range.to_string())
            .output();

        let output = tokio::time::timeout(self.scan_timeout, child)
            .await
            .map_err(|_| LocateError::ScanTimeout {
                secs: self.scan_timeout.as_secs(),
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LocateError::ScannerNotFound {
                        path: self.nmap_path.clone(),
                    }
                } else {
                    LocateError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(LocateError::ScanFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let run = nmap_xml::parse_scan_xml(&output.stdout)?;
        let found = run
            .hosts
            .iter()
            .filter(|h| h.is_up())
            .find(|h| self.matches_device(h))
            .and_then(|h| h.ipv4());

        Ok(found)
    }
}

#[async_trait]
impl RangeScanner for NmapScanner {
    async fn find_device(&self, range: Ipv4Net) -> Option<Ipv4Addr> {
        match self.scan(range).await {
            Ok(Some(addr)) => {
                tracing::info!(range = %range, addr = %addr, "Scan found the display unit");
                Some(addr)
            }
            Ok(None) => {
                tracing::debug!(range = %range, "Scan found no matching host");
                None
            }
            Err(e) => {
                tracing::warn!(range = %range, error = %e, "Scan unavailable, falling back to heuristics");
                None
            }
        }
    }
}
