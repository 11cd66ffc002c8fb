//! Page-objects for the Airflow UI
//!
//! Each page-object owns a `Page` handle and the locators for one screen.
//! Operations check their precondition, interact, then wait on a concrete
//! state-change signal (URL, first-row key, correlated response, visibility)
//! before asserting the result.

pub mod connections;
pub mod dag_runs;
pub mod dags;
pub mod jobs;
pub mod login;
pub mod providers;
pub mod table;
pub mod task_instances;

pub use connections::{ConnectionForm, ConnectionsPage};
pub use dag_runs::DagRunsTab;
pub use dags::DagsPage;
pub use jobs::{JobRow, JobsPage};
pub use login::LoginPage;
pub use providers::{ProviderRow, ProvidersPage};
pub use table::{DataTable, ViewMode};
pub use task_instances::{TaskInstanceRow, TaskInstancesPage};

use crate::locator::Locator;

/// Search box shared by the list views
pub(crate) fn search_bar() -> Locator {
    Locator::by_test_id("search-bar")
}

pub(crate) fn clear_search_button() -> Locator {
    Locator::by_test_id("clear-search")
}

/// The open modal dialog
pub(crate) fn dialog() -> Locator {
    Locator::by_role("dialog")
}
