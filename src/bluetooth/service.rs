use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{error, info};

use crate::configuration::ReloadConf;

/// Makes the host security daemon pick up a changed pairing store.
pub trait ServiceReloader: Send + Sync {
    /// Returns whether the reload succeeded. Never retried.
    fn reload(&self) -> impl Future<Output = bool> + Send;
}

/// Reload by running a service-management command, `service hcsecd restart` by default.
#[derive(Debug, Clone)]
pub struct ServiceCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ServiceCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Builds the reloader from `conf.command`; returns `None` if the command is empty.
    pub fn from_conf(conf: &ReloadConf) -> Option<Self> {
        let (program, args) = conf.command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), conf.timeout))
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ServiceReloader for ServiceCommand {
    async fn reload(&self) -> bool {
        let command_line = self.command_line();
        info!("Reloading security service: {}", command_line);

        let child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                error!("Could not run '{}': {}", command_line, e);
                return false;
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                info!("Security service reloaded");
                true
            }
            Ok(Ok(output)) => {
                error!(
                    status = %output.status,
                    "'{}' failed: {}",
                    command_line,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Ok(Err(e)) => {
                error!("Error waiting for '{}': {}", command_line, e);
                false
            }
            Err(_) => {
                error!(timeout = ?self.timeout, "'{}' timed out", command_line);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_conf_restarts_hcsecd() {
        let cmd = ServiceCommand::from_conf(&ReloadConf::default()).unwrap();
        assert_eq!(cmd.command_line(), "service hcsecd restart");
    }

    #[test]
    fn empty_command_is_rejected() {
        let conf = ReloadConf {
            command: vec![],
            ..ReloadConf::default()
        };
        assert!(ServiceCommand::from_conf(&conf).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_decides_outcome() {
        let ok = ServiceCommand::new("true", vec![], Duration::from_secs(5));
        let failing = ServiceCommand::new("false", vec![], Duration::from_secs(5));
        assert!(ok.reload().await);
        assert!(!failing.reload().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_reload_times_out() {
        let slow = ServiceCommand::new("sleep", vec!["5".into()], Duration::from_millis(100));
        assert!(!slow.reload().await);
    }

    #[tokio::test]
    async fn missing_program_fails() {
        let missing = ServiceCommand::new(
            "/nonexistent/bt-daemon-test/service",
            vec![],
            Duration::from_secs(1),
        );
        assert!(!missing.reload().await);
    }
}
