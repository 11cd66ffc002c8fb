//! Suite configuration
//!
//! Resolution order: built-in defaults, then the YAML file (if present), then
//! `AIRFLOW_E2E_*` environment variables, then CLI flags applied by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;
use crate::server::ServerConfig;
use crate::wait::PollOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eConfig {
    /// UI and API origin, e.g. http://localhost:28080
    pub base_url: String,
    pub username: String,
    pub password: String,

    /// DAG the run/task-instance journeys seed and trigger
    pub test_dag_id: String,

    /// Runs seeded for pagination journeys; must exceed `page_size`
    pub seeded_runs: usize,

    /// `limit` used when a journey needs more than one page
    pub page_size: usize,

    pub timeouts: Timeouts,
    pub playwright: PlaywrightConfig,
    pub server: ServerConfig,
    pub output_dir: PathBuf,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:28080".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            test_dag_id: "example_bash_operator".to_string(),
            seeded_runs: 5,
            page_size: 2,
            timeouts: Timeouts::default(),
            playwright: PlaywrightConfig::default(),
            server: ServerConfig::default(),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// All bounded waits, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// click / fill / select actionability
    pub action_ms: u64,
    /// visibility and content expectations
    pub expect_ms: u64,
    pub navigation_ms: u64,
    /// correlated network responses
    pub response_ms: u64,
    /// pause between the two reads of a settle check
    pub settle_delay_ms: u64,
    pub poll_intervals_ms: Vec<u64>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 10_000,
            expect_ms: 10_000,
            navigation_ms: 30_000,
            response_ms: 15_000,
            settle_delay_ms: 500,
            poll_intervals_ms: vec![100, 250, 500, 1000],
        }
    }
}

impl Timeouts {
    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn expect(&self) -> Duration {
        Duration::from_millis(self.expect_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn response(&self) -> Duration {
        Duration::from_millis(self.response_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll(&self) -> PollOptions {
        PollOptions::new(self.expect()).with_intervals(
            self.poll_intervals_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        )
    }
}

impl E2eConfig {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> E2eResult<Self> {
        let mut config = if path.exists() {
            debug!("Loading config from {}", path.display());
            Self::from_yaml(&std::fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override from `AIRFLOW_E2E_*` variables, looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AIRFLOW_E2E_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("AIRFLOW_E2E_USERNAME") {
            self.username = v;
        }
        if let Some(v) = lookup("AIRFLOW_E2E_PASSWORD") {
            self.password = v;
        }
        if let Some(v) = lookup("AIRFLOW_E2E_DAG_ID") {
            self.test_dag_id = v;
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| E2eError::Config(format!("base_url '{}': {}", self.base_url, e)))?;
        if self.page_size == 0 {
            return Err(E2eError::Config("page_size must be at least 1".into()));
        }
        if self.seeded_runs <= self.page_size {
            return Err(E2eError::Config(format!(
                "seeded_runs ({}) must exceed page_size ({}) for pagination journeys",
                self.seeded_runs, self.page_size
            )));
        }
        Ok(())
    }
}
