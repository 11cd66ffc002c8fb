use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::protocol::{BridgeReply, BridgeRequest};
use super::script::BRIDGE_SCRIPT;
use super::{check_playwright_installed, PlaywrightConfig};
use crate::driver::{CapturedResponse, Driver, ResponseMatcher, ResponseWaiter};
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>>;

/// Extra time a reply may take beyond the browser-side timeout.
const REPLY_SLACK: Duration = Duration::from_secs(5);

/// Bound on queries that carry no timeout of their own (count, text, ...).
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle to the node process hosting Playwright
pub struct PlaywrightBridge {
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    child: Mutex<Option<Child>>,
    config: PlaywrightConfig,

    // Keeps bridge.js on disk while node runs
    _script_dir: tempfile::TempDir,
}

impl PlaywrightBridge {
    /// Spawn the bridge and launch the configured browser
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Arc<Self>> {
        let cli_version = check_playwright_installed(config.node_modules_dir.as_deref())?;
        debug!("Playwright CLI {}", cli_version);
        std::fs::create_dir_all(&config.screenshot_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let mut cmd = TokioCommand::new(&config.node_binary);
        cmd.arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.node_modules_dir {
            cmd.env("NODE_PATH", dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Playwright(format!(
                "failed to spawn {}: {}",
                config.node_binary.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        tokio::spawn(read_replies(stdout, pending.clone(), closed.clone()));

        let bridge = Arc::new(Self {
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            closed,
            next_id: AtomicU64::new(1),
            child: Mutex::new(Some(child)),
            config,
            _script_dir: script_dir,
        });

        let launched = bridge
            .call(
                "launch",
                json!({
                    "browser": bridge.config.browser.as_str(),
                    "headless": bridge.config.headless,
                }),
                "browser launch",
                bridge.config.launch_timeout(),
            )
            .await?;
        info!(
            "Launched {} {} via Playwright bridge",
            bridge.config.browser.as_str(),
            launched["version"].as_str().unwrap_or("(unknown version)")
        );

        Ok(bridge)
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Open a fresh browser context with a single page
    pub async fn new_page(self: &Arc<Self>, base_url: &str) -> E2eResult<BridgePage> {
        let reply = self
            .call(
                "new_page",
                json!({
                    "base_url": base_url,
                    "viewport": {
                        "width": self.config.viewport_width,
                        "height": self.config.viewport_height,
                    },
                }),
                "new page",
                QUERY_TIMEOUT,
            )
            .await?;

        let page_id = reply["page"]
            .as_str()
            .ok_or_else(|| E2eError::Playwright("new_page reply without page id".into()))?
            .to_string();
        debug!("Opened page {}", page_id);

        Ok(BridgePage {
            bridge: Arc::clone(self),
            page_id,
        })
    }

    async fn call(
        &self,
        method: &str,
        params: Value,
        subject: &str,
        timeout: Duration,
    ) -> E2eResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(E2eError::BridgeClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let mut line = serde_json::to_string(&BridgeRequest { id, method, params })?;
        line.push('\n');

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().remove(&id);
            warn!("Failed to write to bridge: {}", e);
            return Err(E2eError::BridgeClosed);
        }

        match tokio::time::timeout(timeout + REPLY_SLACK, rx).await {
            Ok(Ok(reply)) => reply.into_result(subject, timeout),
            Ok(Err(_)) => Err(E2eError::BridgeClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(E2eError::Playwright(format!(
                    "no reply to '{}' for {} within {:?}",
                    method,
                    subject,
                    timeout + REPLY_SLACK
                )))
            }
        }
    }

    /// Close the browser and wait for the node process to exit
    pub async fn shutdown(&self) -> E2eResult<()> {
        if !self.closed.load(Ordering::SeqCst) {
            if let Err(e) = self
                .call("shutdown", Value::Null, "shutdown", QUERY_TIMEOUT)
                .await
            {
                warn!("Bridge shutdown request failed: {}", e);
            }
        }

        let child = self.child.lock().take();
        if let Some(mut child) = child {
            match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
                Ok(Ok(status)) => debug!("Bridge exited with {}", status),
                _ => {
                    warn!("Bridge did not exit, killing it");
                    let _ = child.kill().await;
                }
            }
        }
        Ok(())
    }
}

impl Drop for PlaywrightBridge {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.lock().take() {
            let _ = child.start_kill();
        }
    }
}

async fn read_replies(stdout: ChildStdout, pending: Pending, closed: Arc<AtomicBool>) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<BridgeReply>(&line) {
                Ok(reply) => {
                    let waiting = pending.lock().remove(&reply.id);
                    match waiting {
                        Some(tx) => {
                            let _ = tx.send(reply);
                        }
                        None => debug!("Dropping reply for abandoned request {}", reply.id),
                    }
                }
                Err(_) => debug!("[bridge stdout] {}", line),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Bridge stdout read error: {}", e);
                break;
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    // Dropping the senders fails every in-flight call with BridgeClosed
    pending.lock().clear();
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[bridge] {}", line);
    }
}

/// One browser context + page inside the bridge
pub struct BridgePage {
    bridge: Arc<PlaywrightBridge>,
    page_id: String,
}

impl BridgePage {
    pub fn id(&self) -> &str {
        &self.page_id
    }

    async fn invoke(
        &self,
        method: &str,
        mut params: Value,
        subject: &str,
        timeout: Duration,
    ) -> E2eResult<Value> {
        if let Value::Object(map) = &mut params {
            map.insert("page".into(), Value::String(self.page_id.clone()));
        }
        self.bridge.call(method, params, subject, timeout).await
    }

    async fn query<T: DeserializeOwned>(&self, method: &str, locator: &Locator) -> E2eResult<T> {
        let value = self
            .invoke(
                method,
                json!({ "locator": locator }),
                &locator.to_string(),
                QUERY_TIMEOUT,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn act(
        &self,
        method: &str,
        locator: &Locator,
        extra: Value,
        timeout: Duration,
    ) -> E2eResult<()> {
        let mut params = json!({
            "locator": locator,
            "timeout": timeout.as_millis() as u64,
        });
        if let (Value::Object(map), Value::Object(extra)) = (&mut params, extra) {
            map.extend(extra);
        }
        self.invoke(method, params, &locator.to_string(), timeout)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Driver for BridgePage {
    async fn goto(&self, url: &str, timeout: Duration) -> E2eResult<()> {
        debug!("goto {}", url);
        self.invoke(
            "goto",
            json!({ "url": url, "timeout": timeout.as_millis() as u64 }),
            &format!("navigation to {}", url),
            timeout,
        )
        .await
        .map(|_| ())
    }

    async fn current_url(&self) -> E2eResult<String> {
        let value = self
            .invoke("url", json!({}), "current url", QUERY_TIMEOUT)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.query("count", locator).await
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        self.query("visible", locator).await
    }

    async fn text(&self, locator: &Locator) -> E2eResult<String> {
        self.query("text", locator).await
    }

    async fn all_texts(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        self.query("texts", locator).await
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .invoke(
                "attribute",
                json!({ "locator": locator, "name": name }),
                &locator.to_string(),
                QUERY_TIMEOUT,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        self.query("input_value", locator).await
    }

    async fn click(&self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        self.act("click", locator, json!({}), timeout).await
    }

    async fn fill(&self, locator: &Locator, value: &str, timeout: Duration) -> E2eResult<()> {
        self.act("fill", locator, json!({ "value": value }), timeout)
            .await
    }

    async fn press(&self, locator: &Locator, key: &str, timeout: Duration) -> E2eResult<()> {
        self.act("press", locator, json!({ "key": key }), timeout)
            .await
    }

    async fn select_option(
        &self,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.act("select", locator, json!({ "value": value }), timeout)
            .await
    }

    async fn expect_response(
        &self,
        matcher: ResponseMatcher,
        timeout: Duration,
    ) -> E2eResult<ResponseWaiter> {
        let reply = self
            .invoke(
                "expect_response",
                json!({
                    "method": matcher.method,
                    "url_contains": matcher.url_contains,
                    "path_end": matcher.path_end,
                    "timeout": timeout.as_millis() as u64,
                }),
                &format!("response {}", matcher),
                QUERY_TIMEOUT,
            )
            .await?;

        let id = reply["waiter"]
            .as_str()
            .ok_or_else(|| E2eError::Playwright("expect_response reply without waiter id".into()))?
            .to_string();
        Ok(ResponseWaiter {
            id,
            matcher,
            timeout,
        })
    }

    async fn await_response(&self, waiter: ResponseWaiter) -> E2eResult<CapturedResponse> {
        let value = self
            .invoke(
                "await_response",
                json!({ "waiter": waiter.id }),
                &format!("response {}", waiter.matcher),
                waiter.timeout,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.invoke(
            "screenshot",
            json!({ "path": path.to_string_lossy() }),
            "screenshot",
            QUERY_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn close(&self) -> E2eResult<()> {
        debug!("Closing page {}", self.page_id);
        self.invoke("close_page", json!({}), "close page", QUERY_TIMEOUT)
            .await
            .map(|_| ())
    }
}
