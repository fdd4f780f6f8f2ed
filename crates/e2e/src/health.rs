//! Application reachability check
//!
//! The suite does not own the application under test; it only waits for the
//! configured base URL to answer before any browser is launched.

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct HealthCheck {
    base_url: String,
    client: reqwest::Client,
}

impl HealthCheck {
    pub fn new(base_url: &str) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// Poll the base URL until it answers with anything below 500
    pub async fn wait_until_reachable(&self, timeout: Duration) -> E2eResult<usize> {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.client.get(&self.base_url).send().await {
                Ok(resp) if !resp.status().is_server_error() => {
                    info!("Application reachable at {} ({})", self.base_url, resp.status());
                    return Ok(attempts);
                }
                Ok(resp) => {
                    warn!("Application returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for application at {}...", self.base_url);
                    }
                    // Connection refused is expected while the app is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            if start.elapsed() >= timeout {
                return Err(E2eError::AppUnreachable(attempts));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_port_gives_up() {
        // Port 9 (discard) is not served on loopback in CI sandboxes
        let health = HealthCheck::new("http://127.0.0.1:9/").unwrap();
        let err = health
            .wait_until_reachable(Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::AppUnreachable(n) if n >= 1));
    }
}
