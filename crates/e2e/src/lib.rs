//! Airflow UI E2E Test Framework
//!
//! This crate provides page-objects and user journeys for the Airflow web UI:
//! - Waits on (or spawns) the API server under test
//! - Controls Playwright through a Node bridge speaking JSON lines
//! - Wraps every screen in a page-object that re-queries the DOM per call
//! - Seeds and cleans fixtures through the REST API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Suite Runner (Rust)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteRunner                                                │
//! │    ├── open_page() -> Arc<dyn Driver>                       │
//! │    ├── LoginPage::login(user, password)                     │
//! │    ├── Journey::run(JourneyContext)                         │
//! │    └── Seeder::cleanup() -> failures                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Page-objects                                               │
//! │    ├── DagsPage, DagRunsTab                                 │
//! │    ├── TaskInstancesPage                                    │
//! │    ├── ConnectionsPage                                      │
//! │    ├── ProvidersPage, JobsPage                              │
//! │    └── DataTable (rows, columns, pagination)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Page (bounded waits) -> Driver (Locator in, values out)    │
//! │    └── PlaywrightBridge / BridgePage                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod journeys;
pub mod locator;
pub mod page;
pub mod pages;
pub mod playwright;
pub mod query;
pub mod server;
pub mod suite;
pub mod version;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use config::E2eConfig;
pub use driver::Driver;
pub use error::{E2eError, E2eResult};
pub use locator::Locator;
pub use page::Page;
pub use suite::{Selection, Suite, SuiteResult, SuiteRunner};
