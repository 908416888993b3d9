//! Candidate verification.
//!
//! Reachability proves something answers pings, not that it is the display
//! unit. Verification opens an authenticated SSH session and requires the
//! remote side to echo a marker back. Only a marker round-trip promotes a
//! candidate to the verified address.

use std::time::Duration;

use async_trait::async_trait;
use easel_core::types::HostAddr;
use tokio::process::Command;

use crate::config::SshConfig;

/// Something that can confirm an address really is the display unit.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, addr: &HostAddr) -> bool;
}

/// `Verifier` backed by sshpass + ssh and a marker echo.
pub struct SshVerifier {
    ssh_path: String,
    sshpass_path: String,
    user: String,
    password: String,
    marker: String,
    connect_timeout: Duration,
}

impl SshVerifier {
    pub fn new(config: &SshConfig) -> Self {
        Self {
            ssh_path: config.ssh_path.clone(),
            sshpass_path: config.sshpass_path.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            marker: config.marker.clone(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

#[async_trait]
impl Verifier for SshVerifier {
    async fn verify(&self, addr: &HostAddr) -> bool {
        tracing::info!(addr = %addr, "Verifying candidate over SSH");

        let child = Command::new(&self.sshpass_path)
            .arg("-p")
            .arg(&self.password)
            .arg(&self.ssh_path)
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs()))
            .arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg(format!("{}@{}", self.user, addr))
            .arg(format!("echo '{}'", self.marker))
            .output();

        let deadline = self.connect_timeout + Duration::from_secs(5);
        let output = match tokio::time::timeout(deadline, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!(addr = %addr, error = %e, "SSH could not run");
                return false;
            }
            Err(_) => {
                tracing::debug!(addr = %addr, "SSH verification timed out");
                return false;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                addr = %addr,
                code = output.status.code().unwrap_or(-1),
                "SSH verification rejected"
            );
            return false;
        }

        let echoed = String::from_utf8_lossy(&output.stdout);
        let verified = echoed.contains(&self.marker);
        if verified {
            tracing::info!(addr = %addr, "Candidate verified");
        } else {
            tracing::debug!(addr = %addr, "SSH session succeeded but marker missing");
        }
        verified
    }
}
