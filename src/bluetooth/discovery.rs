use std::future::Future;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::configuration::InquiryConf;
use crate::error::DiscoveryError;

/// Runs a device inquiry on the host and returns its raw text output.
pub trait InquiryRunner: Send + Sync {
    fn run_inquiry(&self) -> impl Future<Output = Result<String, DiscoveryError>> + Send;
}

/// Inquiry through `hccontrol -n <node> inquiry`.
#[derive(Debug, Clone)]
pub struct HcControl {
    /// Program to run, normally `hccontrol`.
    command: String,
    /// Netgraph HCI node the inquiry is issued on.
    hci_device: String,
    timeout: Duration,
}

impl HcControl {
    pub fn new(
        command: impl Into<String>,
        hci_device: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            hci_device: hci_device.into(),
            timeout,
        }
    }

    pub fn from_conf(conf: &InquiryConf, hci_device: &str) -> Self {
        Self::new(conf.command.clone(), hci_device, conf.timeout)
    }

    pub fn hci_device(&self) -> &str {
        &self.hci_device
    }

    /// Arguments passed to the inquiry program.
    pub fn args(&self) -> [&str; 3] {
        ["-n", self.hci_device.as_str(), "inquiry"]
    }
}

impl InquiryRunner for HcControl {
    async fn run_inquiry(&self) -> Result<String, DiscoveryError> {
        info!(hci_device = %self.hci_device, "Scanning for devices");

        let child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.command, e))?;

        // The child is killed when the timed-out future drops it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(DiscoveryError::Io {
                    command: self.command.clone(),
                    source: e,
                });
            }
            Err(_) => {
                error!(timeout = ?self.timeout, "{} inquiry timed out", self.command);
                return Err(DiscoveryError::Timeout {
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(status = %output.status, "{} inquiry failed: {}", self.command, stderr);
            return Err(DiscoveryError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Inquiry output:\n{}", stdout);
        Ok(stdout)
    }
}

fn spawn_error(command: &str, e: io::Error) -> DiscoveryError {
    if e.kind() == io::ErrorKind::NotFound {
        error!("{} command not found", command);
        DiscoveryError::NotFound {
            command: command.to_string(),
        }
    } else {
        error!("Could not start {}: {}", command, e);
        DiscoveryError::Io {
            command: command.to_string(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_configured_node() {
        let hc = HcControl::new("hccontrol", "ubt1hci", Duration::from_secs(1));
        assert_eq!(hc.args(), ["-n", "ubt1hci", "inquiry"]);
        assert_eq!(hc.hci_device(), "ubt1hci");
    }

    #[test]
    fn default_conf_uses_hccontrol() {
        let hc = HcControl::from_conf(&InquiryConf::default(), "ubt0hci");
        assert_eq!(hc.command, "hccontrol");
        assert_eq!(hc.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let hc = HcControl::new(
            "/nonexistent/bt-daemon-test/hccontrol",
            "ubt0hci",
            Duration::from_secs(1),
        );
        let err = hc.run_inquiry().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NotFound { .. }), "{err:?}");
        assert!(err.to_string().ends_with("not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        // `false` ignores its arguments and exits 1.
        let hc = HcControl::new("false", "ubt0hci", Duration::from_secs(5));
        let err = hc.run_inquiry().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Failed { .. }), "{err:?}");
    }
}
