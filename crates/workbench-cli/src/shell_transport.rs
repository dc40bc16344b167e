//! Local `sh` transport.
//!
//! Each connected session gets its own task that runs submitted lines one at
//! a time through `sh -c` and sends stdout and stderr back tagged with the
//! session id. The task ends when the client drops its channel.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use workbench_core::transport::{CHANNEL_CAPACITY, ChannelPeer, TransportError};
use workbench_core::{Channel, Transport};

/// Transport that executes lines with the local shell.
///
/// `connect` spawns onto the current tokio runtime, so it must be called
/// from within one.
#[derive(Debug, Clone)]
pub struct ShellTransport {
    shell: String,
    working_dir: PathBuf,
}

impl ShellTransport {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: working_dir.into(),
        }
    }

    /// Use a different shell binary. It is invoked as `<shell> -c <line>`.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl Transport for ShellTransport {
    fn connect(&self, session_id: &str) -> Result<Channel, TransportError> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return Err(TransportError::ConnectFailed {
                session_id: session_id.to_string(),
                reason: "no tokio runtime".to_string(),
            });
        };
        let (channel, peer) = Channel::pair(session_id, CHANNEL_CAPACITY);
        handle.spawn(serve(peer, self.shell.clone(), self.working_dir.clone()));
        debug!(session_id, shell = %self.shell, "Shell session task started");
        Ok(channel)
    }
}

async fn serve(mut peer: ChannelPeer, shell: String, working_dir: PathBuf) {
    while let Some(line) = peer.recv().await {
        let output = run_line(&shell, &working_dir, &line).await;
        if peer.deliver(output).await.is_err() {
            break;
        }
    }
    debug!(session_id = peer.session_id(), "Shell session task finished");
}

async fn run_line(shell: &str, working_dir: &Path, line: &str) -> String {
    let result = Command::new(shell)
        .arg("-c")
        .arg(line)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .output()
        .await;

    match result {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            if !output.status.success() {
                let code = output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                text.push_str(&format!("[exit {code}]\n"));
            }
            text
        }
        Err(e) => {
            warn!(error = %e, shell, "Failed to spawn shell");
            format!("[failed to run {shell}: {e}]\n")
        }
    }
}
