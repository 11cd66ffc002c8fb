//! Playwright browser automation
//!
//! The browser is hosted by a long-lived Node.js process running an embedded
//! bridge script. Requests and replies are newline-delimited JSON over the
//! child's stdin/stdout.
//!
//! ```text
//! ┌────────────────────┐  {id, method, params}  ┌──────────────────┐
//! │ PlaywrightBridge   │ ─────────────────────► │ bridge.js (node) │
//! │  └─ BridgePage     │ ◄───────────────────── │  └─ Playwright   │
//! └────────────────────┘  {id, ok, result|error}└──────────────────┘
//! ```

mod bridge;
mod protocol;
mod script;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::error::{E2eError, E2eResult};

pub use bridge::{BridgePage, PlaywrightBridge};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// `node` executable used to host the bridge
    pub node_binary: PathBuf,

    /// Directory whose `node_modules` contains `playwright`; exported as NODE_PATH
    pub node_modules_dir: Option<PathBuf>,

    pub launch_timeout_ms: u64,

    /// Where failure screenshots are written
    pub screenshot_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_binary: PathBuf::from("node"),
            node_modules_dir: None,
            launch_timeout_ms: 60_000,
            screenshot_dir: PathBuf::from("test-results/screenshots"),
        }
    }
}

impl PlaywrightConfig {
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }
}

/// Check if Playwright is installed
/// Version reported by `playwright --version`, or `PlaywrightNotFound`
pub(crate) fn check_playwright_installed(node_modules_dir: Option<&Path>) -> E2eResult<String> {
    let mut cmd = Command::new("npx");
    cmd.args(["--no-install", "playwright", "--version"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if let Some(dir) = node_modules_dir.and_then(Path::parent) {
        cmd.current_dir(dir);
    }

    match cmd.output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(parse_version(&stdout).unwrap_or_else(|| stdout.trim().to_string()))
        }
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

fn parse_version(output: &str) -> Option<String> {
    let re = regex::Regex::new(r"(\d+\.\d+\.\d+(?:-[\w.]+)?)").ok()?;
    re.captures(output).map(|c| c[1].to_string())
}
