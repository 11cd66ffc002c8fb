//! Server fixture - waiting on (and optionally spawning) the Airflow API server

use serde::{Deserialize, Serialize};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

pub const HEALTH_PATH: &str = "/api/v2/monitor/health";

/// Handle to the server under test
pub struct ServerHandle {
    /// Present only when this handle spawned the server
    child: Option<Child>,
    pub base_url: String,
}

impl ServerHandle {
    /// Attach to an already running server once it reports healthy
    pub async fn connect(base_url: &str, timeout: Duration) -> E2eResult<Self> {
        let handle = ServerHandle {
            child: None,
            base_url: base_url.trim_end_matches('/').to_string(),
        };
        handle.wait_for_healthy(timeout).await?;
        info!("Server is healthy at {}", handle.base_url);
        Ok(handle)
    }

    /// Spawn the configured server command and wait for it to become healthy
    pub async fn spawn(config: &ServerConfig, base_url: &str) -> E2eResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| E2eError::ServerStartup("server.command is empty".into()))?;

        info!("Spawning server: {}", config.command.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e))
        })?;

        let handle = ServerHandle {
            child: Some(child),
            base_url: base_url.trim_end_matches('/').to_string(),
        };
        handle.wait_for_healthy(config.startup_timeout()).await?;

        info!("Server is healthy at {}", handle.base_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = format!("{}{}", self.base_url, HEALTH_PATH);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server at {}...", self.base_url);
                    }
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(500)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server if this handle owns it
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        info!("Stopping server (pid: {})", child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = child.kill();
        let _ = child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// How to start a server when the suite is asked to spawn one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub command: Vec<String>,
    pub env: Vec<(String, String)>,
    pub startup_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: vec!["airflow".to_string(), "standalone".to_string()],
            env: vec![(
                "AIRFLOW__CORE__LOAD_EXAMPLES".to_string(),
                "True".to_string(),
            )],
            startup_timeout_ms: 180_000,
        }
    }
}

impl ServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_rejects_empty_command() {
        let config = ServerConfig {
            command: vec![],
            ..Default::default()
        };
        let err = ServerHandle::spawn(&config, "http://127.0.0.1:1").await.err().unwrap();
        assert!(matches!(err, E2eError::ServerStartup(_)));
    }

    #[tokio::test]
    async fn test_connect_gives_up_on_dead_server() {
        // Port 9 (discard) is not an HTTP server on any sane CI host
        let err = ServerHandle::connect("http://127.0.0.1:9/", Duration::from_millis(200))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, E2eError::ServerHealthCheck(n) if n >= 1));
    }
}
