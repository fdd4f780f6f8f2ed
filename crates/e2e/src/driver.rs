//! Playwright process driver

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::protocol::{Observation, Transcript};

/// How long node gets to close its browsers after SIGTERM
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Runs generated scripts with Node and collects their observations
#[derive(Debug, Clone)]
pub struct PlaywrightDriver {
    /// Directory scripts resolve `@playwright/test` from
    node_path: Option<PathBuf>,
}

impl PlaywrightDriver {
    /// Create a driver after checking Playwright is installed
    pub fn new(node_path: Option<PathBuf>) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        Ok(Self::unchecked(node_path))
    }

    /// Create a driver without probing for Playwright
    pub fn unchecked(node_path: Option<PathBuf>) -> Self {
        Self { node_path }
    }

    /// Module search path for scripts: explicit, `$NODE_PATH`, or ./node_modules
    pub fn resolve_node_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit
            .or_else(|| std::env::var_os("NODE_PATH").map(PathBuf::from))
            .or_else(|| {
                let local = std::env::current_dir().ok()?.join("node_modules");
                local.is_dir().then_some(local)
            })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Execute a script and stream its observations into a transcript
    pub async fn run(&self, script: &str, timeout: Duration) -> E2eResult<Transcript> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .current_dir(temp_dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(node_path) = &self.node_path {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Playwright(format!("Failed to spawn node: {}", e))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("node stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| E2eError::Playwright("node stderr was not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let collect = async {
            let mut transcript = Transcript::new();
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(Observation::Step { name, .. }) = transcript.push_line(&line) {
                    debug!("step {}", name);
                }
            }
            let status = child.wait().await?;
            Ok::<_, E2eError>((transcript, status))
        };

        let outcome = tokio::time::timeout(timeout, collect).await;
        let (mut transcript, status) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!("Script exceeded {:?}, stopping node", timeout);
                stop(&mut child, STOP_GRACE).await;
                return Err(E2eError::Timeout(format!("scenario after {:?}", timeout)));
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if !stderr.trim().is_empty() {
            debug!("script stderr: {}", stderr.trim());
        }
        transcript.set_stderr(stderr);

        if !status.success() && transcript.failure().is_none() {
            return Err(E2eError::Playwright(format!(
                "Script exited with {}:\nstderr: {}",
                status,
                transcript.stderr()
            )));
        }

        Ok(transcript)
    }
}

/// Stop a script, letting Playwright close the browsers it launched first
async fn stop(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            // Playwright closes launched browsers on SIGTERM
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(grace, child.wait()).await.is_ok()
            {
                return;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        warn!("Failed to kill node: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_node_path_wins() {
        let path = PathBuf::from("/opt/playwright/node_modules");
        assert_eq!(
            PlaywrightDriver::resolve_node_path(Some(path.clone())),
            Some(path)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_terminates_before_grace_expires() {
        let mut child = TokioCommand::new("sleep").arg("30").spawn().unwrap();
        let start = std::time::Instant::now();
        stop(&mut child, Duration::from_secs(10)).await;
        assert!(child.try_wait().unwrap().is_some());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_when_sigterm_is_ignored() {
        let mut child = TokioCommand::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .spawn()
            .unwrap();
        // Let the shell install its trap
        tokio::time::sleep(Duration::from_millis(200)).await;
        stop(&mut child, Duration::from_millis(300)).await;
        assert!(child.try_wait().unwrap().is_some());
    }
}
