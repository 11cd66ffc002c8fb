//! Suite runner: runs journeys one at a time, each in its own browser page

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::config::E2eConfig;
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::fixture::Seeder;
use crate::page::Page;
use crate::pages::LoginPage;
use crate::playwright::PlaywrightBridge;

pub const RESULTS_FILE: &str = "suite-results.json";

/// Everything a journey gets to work with
pub struct JourneyContext {
    pub page: Page,
    pub api: ApiClient,
    pub seeder: Arc<Seeder>,
    pub config: Arc<E2eConfig>,
}

pub type JourneyFn = fn(JourneyContext) -> BoxFuture<'static, E2eResult<()>>;

/// One scripted user journey
#[derive(Clone)]
pub struct Journey {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    pub run: JourneyFn,
}

impl std::fmt::Debug for Journey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journey")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Which journeys to run; empty selects all
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub name: Option<String>,
    pub tag: Option<String>,
}

impl Selection {
    pub fn matches(&self, journey: &Journey) -> bool {
        self.name.as_deref().map_or(true, |n| journey.name == n)
            && self.tag.as_deref().map_or(true, |t| journey.tags.contains(&t))
    }
}

/// Result of running a single journey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyResult {
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
    /// Seeded entities that could not be removed afterwards
    pub cleanup_failures: usize,
}

/// Result of running the selected journeys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<JourneyResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Write `suite-results.json` into `dir`
    pub fn write(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(RESULTS_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Results written to {:?}", path);
        Ok(path)
    }
}

/// Source of fresh, isolated browser pages
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn open_page(&self) -> E2eResult<Arc<dyn Driver>>;
}

/// A new browser context and page per journey
pub struct BridgePages {
    bridge: Arc<PlaywrightBridge>,
    base_url: String,
}

impl BridgePages {
    pub fn new(bridge: Arc<PlaywrightBridge>, base_url: impl Into<String>) -> Self {
        Self {
            bridge,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PageSource for BridgePages {
    async fn open_page(&self) -> E2eResult<Arc<dyn Driver>> {
        Ok(Arc::new(self.bridge.new_page(&self.base_url).await?))
    }
}

/// Registry of journeys
#[derive(Debug, Clone, Default)]
pub struct Suite {
    journeys: Vec<Journey>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every journey this crate ships
    pub fn standard() -> Self {
        Self {
            journeys: crate::journeys::all(),
        }
    }

    pub fn register(&mut self, journey: Journey) {
        self.journeys.push(journey);
    }

    pub fn journeys(&self) -> &[Journey] {
        &self.journeys
    }

    pub fn select(&self, selection: &Selection) -> E2eResult<Vec<&Journey>> {
        let selected: Vec<&Journey> = self.journeys.iter().filter(|j| selection.matches(j)).collect();
        if let (Some(name), true) = (&selection.name, selected.is_empty()) {
            return Err(E2eError::Config(format!("Journey not found: {}", name)));
        }
        Ok(selected)
    }
}

pub struct SuiteRunner {
    config: Arc<E2eConfig>,
    api: ApiClient,
    pages: Arc<dyn PageSource>,
}

impl SuiteRunner {
    pub fn new(config: Arc<E2eConfig>, api: ApiClient, pages: Arc<dyn PageSource>) -> Self {
        Self { config, api, pages }
    }

    pub async fn run(&self, suite: &Suite, selection: &Selection) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let selected = suite.select(selection)?;
        let skipped = suite.journeys().len() - selected.len();
        let mut results = Vec::with_capacity(selected.len());

        info!("Running {} journey(s), {} skipped", selected.len(), skipped);

        for journey in selected {
            let result = self.run_journey(journey).await?;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Journey results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        Ok(SuiteResult {
            total: suite.journeys().len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        })
    }

    /// Run one journey in a fresh page. Journey failures land in the result;
    /// only a page that cannot be opened is an error.
    pub async fn run_journey(&self, journey: &Journey) -> E2eResult<JourneyResult> {
        let start = Instant::now();
        debug!("Running journey: {}", journey.name);

        let driver = self.pages.open_page().await?;
        let page = Page::new(driver, &self.config.base_url, self.config.timeouts.clone())?;
        let seeder = Arc::new(Seeder::new(self.api.clone()));
        let context = JourneyContext {
            page: page.clone(),
            api: self.api.clone(),
            seeder: seeder.clone(),
            config: self.config.clone(),
        };

        let outcome = async {
            LoginPage::new(page.clone())
                .login(&self.config.username, &self.config.password)
                .await?;
            (journey.run)(context).await
        }
        .await;

        let mut screenshot = None;
        if let Err(e) = &outcome {
            debug!("{} failed: {:?}", journey.name, e);
            let path = self
                .config
                .playwright
                .screenshot_dir
                .join(format!("{}-failure.png", journey.name));
            match page.screenshot(&path).await {
                Ok(()) => screenshot = Some(path),
                Err(e) => warn!("Could not capture failure screenshot: {}", e),
            }
        }

        let cleanup_failures = seeder.cleanup().await;
        if cleanup_failures > 0 {
            warn!("{}: {} seeded entit(ies) left behind", journey.name, cleanup_failures);
        }
        if let Err(e) = page.close().await {
            warn!("Closing page for {} failed: {}", journey.name, e);
        }

        Ok(JourneyResult {
            name: journey.name.to_string(),
            tags: journey.tags.iter().map(|t| t.to_string()).collect(),
            success: outcome.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
            screenshot,
            cleanup_failures,
        })
    }
}
