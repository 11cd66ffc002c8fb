use serde::Serialize;
use std::cmp::Ordering;

use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use crate::pages::table::DataTable;
use crate::query::ListQuery;
use crate::version::compare_versions;

pub const PATH: &str = "/providers";
pub const PACKAGE_PREFIX: &str = "apache-airflow-providers-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderRow {
    pub package_name: String,
    pub version: String,
    pub description: Option<String>,
}

/// Installed providers (`/providers`)
pub struct ProvidersPage {
    page: Page,
    pub table: DataTable,
}

impl ProvidersPage {
    pub fn new(page: Page) -> Self {
        Self {
            table: DataTable::new(page.clone()),
            page,
        }
    }

    pub async fn navigate(&self) -> E2eResult<usize> {
        self.navigate_with(&ListQuery::new()).await
    }

    pub async fn navigate_with(&self, query: &ListQuery) -> E2eResult<usize> {
        self.page.goto_list(PATH, query).await?;
        self.table.wait_for_ready().await
    }

    pub async fn rows(&self) -> E2eResult<Vec<ProviderRow>> {
        let name_col = self.table.column_or("Package Name", 0).await?;
        let version_col = self.table.column_or("Version", 1).await?;
        let description_col = self.table.column_index("Description").await?;

        let names = self.table.column_texts(name_col).await?;
        let versions = self.table.column_texts(version_col).await?;
        let descriptions = match description_col {
            Some(col) => self.table.column_texts(col).await?.into_iter().map(Some).collect(),
            None => vec![None; names.len()],
        };

        Ok(names
            .into_iter()
            .zip(versions)
            .zip(descriptions)
            .map(|((package_name, version), description)| ProviderRow {
                package_name,
                version,
                description,
            })
            .collect())
    }

    /// At least one provider is listed, each with a provider package name and
    /// a version. Returns the rows.
    pub async fn verify_populated(&self) -> E2eResult<Vec<ProviderRow>> {
        let rows = self.table.rows().await?;
        self.page.expect_count_at_least(&rows, 1).await?;

        let providers = self.rows().await?;
        for provider in &providers {
            if !provider.package_name.starts_with(PACKAGE_PREFIX) {
                return Err(E2eError::assertion(
                    format!("a package name starting with '{}'", PACKAGE_PREFIX),
                    provider.package_name.clone(),
                ));
            }
            if provider.version.is_empty() {
                return Err(E2eError::assertion(
                    format!("a version for {}", provider.package_name),
                    "empty version cell",
                ));
            }
        }
        Ok(providers)
    }

    /// Provider with the highest version on the current page
    pub async fn highest_version(&self) -> E2eResult<Option<ProviderRow>> {
        Ok(self
            .rows()
            .await?
            .into_iter()
            .max_by(|a, b| match compare_versions(&a.version, &b.version) {
                Ordering::Equal => b.package_name.cmp(&a.package_name),
                other => other,
            }))
    }

    pub async fn next_page(&self) -> E2eResult<String> {
        let col = self.table.column_or("Package Name", 0).await?;
        self.table.next_page(Some(col)).await
    }

    pub async fn previous_page(&self) -> E2eResult<String> {
        let col = self.table.column_or("Package Name", 0).await?;
        self.table.previous_page(Some(col)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cell, fake_page, table, FakeDriver, Node};
    use std::sync::Arc;

    fn providers_app(rows: &'static [(&'static str, &'static str)]) -> Arc<FakeDriver> {
        FakeDriver::new(move |_| {
            let rows = rows
                .iter()
                .map(|(name, version)| vec![cell(name), cell(version), cell("Provider package")])
                .collect();
            Node::new("html").child(table(&["Package Name", "Version", "Description"], rows))
        })
    }

    #[tokio::test]
    async fn test_rows_and_highest_version() {
        let providers = ProvidersPage::new(fake_page(providers_app(&[
            ("apache-airflow-providers-http", "5.2.0"),
            ("apache-airflow-providers-standard", "1.10.0"),
            ("apache-airflow-providers-common-sql", "1.9.3"),
            ("apache-airflow-providers-fab", "5.2.0rc1"),
        ])));
        assert_eq!(providers.navigate().await.unwrap(), 4);

        let rows = providers.verify_populated().await.unwrap();
        assert_eq!(rows[1].version, "1.10.0");
        assert_eq!(rows[1].description.as_deref(), Some("Provider package"));

        let top = providers.highest_version().await.unwrap().unwrap();
        assert_eq!(top.package_name, "apache-airflow-providers-http");
    }

    #[tokio::test]
    async fn test_foreign_package_fails_verification() {
        let providers = ProvidersPage::new(fake_page(providers_app(&[("requests", "2.31.0")])));
        providers.navigate().await.unwrap();

        let err = providers.verify_populated().await.unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed { ref actual, .. } if actual == "requests"));
    }

    #[tokio::test]
    async fn test_empty_list_times_out() {
        let driver = FakeDriver::new(|_| Node::new("html").child(Node::new("div").test_id("no-rows-message")));
        let providers = ProvidersPage::new(fake_page(driver));
        assert_eq!(providers.navigate().await.unwrap(), 0);
        assert!(matches!(
            providers.verify_populated().await.unwrap_err(),
            E2eError::Timeout { .. }
        ));
    }
}
