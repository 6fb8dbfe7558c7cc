use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{PollError, PollOutcome, SourceAdapter};
use crate::accounting::ledger::SourceName;
use crate::accounting::parser::InterfaceStatsLayout;
use crate::server::config::ServerConfig;

/// sshpass exit code for a rejected password.
const SSHPASS_INVALID_PASSWORD: i32 = 5;
/// ssh exit code for connection-level failures.
const SSH_CONNECTION_ERROR: i32 = 255;

/// Runs one command on a remote host and returns its standard output.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    async fn exec(&self, command: &str) -> Result<String, PollError>;
}

/// [`RemoteShell`] backed by the system `ssh` client, with the password fed
/// through `sshpass` via the `SSHPASS` environment variable.
#[derive(Debug, Clone)]
pub struct SshCommandShell {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl SshCommandShell {
    fn command(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new("sshpass");
        cmd.arg("-e")
            .arg("ssh")
            .arg("-p")
            .arg(self.port.to_string())
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.timeout.as_secs().max(1)))
            .arg("-o")
            .arg("NumberOfPasswordPrompts=1")
            .arg(format!("{}@{}", self.username, self.host))
            .arg(remote_command)
            .env("SSHPASS", &self.password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl RemoteShell for SshCommandShell {
    async fn exec(&self, command: &str) -> Result<String, PollError> {
        debug!(host = %self.host, port = self.port, command = %command, "Executing remote command.");
        let child = self
            .command(command)
            .spawn()
            .map_err(|e| PollError::Transport(format!("failed to start ssh client: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| PollError::Timeout(self.timeout))?
            .map_err(|e| PollError::Transport(format!("ssh client failed: {e}")))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        Err(classify_failure(
            output.status.code(),
            &String::from_utf8_lossy(&output.stderr),
        ))
    }
}

/// Maps a failed ssh invocation to a [`PollError`], singling out credential
/// problems so they can be reported with a hint.
fn classify_failure(exit_code: Option<i32>, stderr: &str) -> PollError {
    let detail = stderr.trim().to_string();
    let lowered = detail.to_lowercase();

    // Exit 1..254 come from the remote command itself, so its stderr says
    // nothing about our credentials.
    let ssh_auth_message = exit_code == Some(SSH_CONNECTION_ERROR)
        && (lowered.contains("permission denied") || lowered.contains("authentication"));
    if exit_code == Some(SSHPASS_INVALID_PASSWORD) || ssh_auth_message {
        return PollError::Authentication(if detail.is_empty() {
            "credentials rejected".to_string()
        } else {
            detail
        });
    }

    match exit_code {
        Some(SSH_CONNECTION_ERROR) => PollError::Transport(detail),
        Some(code) => PollError::Transport(format!("remote command exited with status {code}: {detail}")),
        None => PollError::Transport("ssh client terminated by signal".to_string()),
    }
}

/// Polls the router's interface statistics over a remote shell.
pub struct RouterAdapter<S = SshCommandShell> {
    shell: Option<S>,
    command: String,
    layout: InterfaceStatsLayout,
}

impl<S: RemoteShell> RouterAdapter<S> {
    /// `shell` is `None` when no credential is configured; polls then do nothing.
    pub fn new(shell: Option<S>, command: impl Into<String>, layout: InterfaceStatsLayout) -> Self {
        Self {
            shell,
            command: command.into(),
            layout,
        }
    }
}

impl RouterAdapter<SshCommandShell> {
    pub fn from_config(config: &ServerConfig) -> Self {
        let shell = config.router_password.as_ref().map(|password| SshCommandShell {
            host: config.router_host.clone(),
            port: config.router_port,
            username: config.router_username.clone(),
            password: password.clone(),
            timeout: Duration::from_secs(config.router_timeout_seconds),
        });
        Self::new(shell, config.router_command.clone(), config.interface_layout())
    }
}

#[async_trait]
impl<S: RemoteShell> SourceAdapter for RouterAdapter<S> {
    fn source(&self) -> SourceName {
        SourceName::Router
    }

    fn disabled_reason(&self) -> Option<String> {
        self.shell
            .is_none()
            .then(|| "no router password configured".to_string())
    }

    async fn poll(&self) -> Result<PollOutcome, PollError> {
        let Some(shell) = &self.shell else {
            debug!("Router polling disabled, skipping.");
            return Ok(PollOutcome::Disabled);
        };

        let output = shell.exec(&self.command).await?;
        self.layout
            .parse(&output)
            .map(PollOutcome::Reading)
            .ok_or_else(|| {
                PollError::Parse(format!(
                    "no readable counters for interfaces [{}]",
                    self.layout.interfaces.join(", ")
                ))
            })
    }
}
