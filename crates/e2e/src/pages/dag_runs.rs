//! Runs tab of a DAG (`/dags/{dag_id}/runs`)

use tracing::{debug, info};

use crate::driver::ResponseMatcher;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::table::{assert_all_contain, DataTable};
use crate::pages::{clear_search_button, dialog, search_bar};
use crate::query::{param, ListQuery};
use crate::wait::poll_until;

pub struct DagRunsTab {
    page: Page,
    dag_id: String,
    pub table: DataTable,
    pub search: Locator,
    pub clear_search: Locator,
    pub confirm_delete: Locator,
    /// Parameters of the last list navigation
    query: ListQuery,
}

impl DagRunsTab {
    pub fn new(page: Page, dag_id: impl Into<String>) -> Self {
        Self {
            table: DataTable::new(page.clone()),
            page,
            dag_id: dag_id.into(),
            search: search_bar(),
            clear_search: clear_search_button(),
            confirm_delete: dialog().get_by_role("button", Some("Delete")),
            query: ListQuery::new(),
        }
    }

    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    fn path(&self) -> String {
        format!("/dags/{}/runs", self.dag_id)
    }

    pub async fn navigate(&mut self) -> E2eResult<usize> {
        self.navigate_with(ListQuery::new()).await
    }

    /// Open the tab with `query` and wait for the list to settle.
    /// Returns the row count.
    pub async fn navigate_with(&mut self, query: ListQuery) -> E2eResult<usize> {
        let url = self.page.goto_list(&self.path(), &query).await?;
        self.query = ListQuery::from_url(&url);
        self.table.wait_for_ready().await
    }

    async fn run_id_column(&self) -> E2eResult<usize> {
        self.table.column_or("Run ID", 0).await
    }

    pub async fn filter_by_state(&mut self, state: &str) -> E2eResult<usize> {
        let query = ListQuery {
            offset: None,
            ..self.query.clone()
        }
        .state(state);
        let count = self.navigate_with(query).await?;
        debug!("{} run(s) in state {}", count, state);
        Ok(count)
    }

    /// Every visible run has a state containing `state`.
    /// Returns the number of rows checked.
    pub async fn verify_state_filter(&self, state: &str) -> E2eResult<usize> {
        let states = self.table.required_states(self.table.state_column().await?).await?;
        assert_all_contain(&states, state, "run state")?;
        Ok(states.len())
    }

    /// Type `pattern` into the search box and wait for the list to follow
    pub async fn search_run_id(&mut self, pattern: &str) -> E2eResult<usize> {
        self.page.fill(&self.search, pattern).await?;
        self.page.press(&self.search, "Enter").await?;

        let url = self
            .page
            .wait_for_url(&format!("run_id_pattern={}", pattern), |url| {
                param(url, "run_id_pattern").as_deref() == Some(pattern)
            })
            .await?;
        self.query = ListQuery::from_url(&url);
        self.table.wait_for_ready().await
    }

    pub async fn verify_search(&self, pattern: &str) -> E2eResult<usize> {
        let ids = self.run_ids().await?;
        assert_all_contain(&ids, pattern, "run id")?;
        Ok(ids.len())
    }

    /// Clear the search box. Returns the unfiltered row count.
    pub async fn clear_search(&mut self) -> E2eResult<usize> {
        if self.page.is_visible(&self.clear_search).await? {
            self.page.click(&self.clear_search).await?;
        } else {
            self.page.fill(&self.search, "").await?;
            self.page.press(&self.search, "Enter").await?;
        }

        let url = self
            .page
            .wait_for_url("run_id_pattern to be cleared", |url| {
                param(url, "run_id_pattern").is_none()
            })
            .await?;
        self.query = ListQuery::from_url(&url);
        self.table.wait_for_ready().await
    }

    pub async fn next_page(&self) -> E2eResult<String> {
        self.table.next_page(Some(self.run_id_column().await?)).await
    }

    pub async fn previous_page(&self) -> E2eResult<String> {
        self.table.previous_page(Some(self.run_id_column().await?)).await
    }

    pub async fn first_run_id(&self) -> E2eResult<String> {
        self.table.first_row_key(Some(self.run_id_column().await?)).await
    }

    pub async fn run_ids(&self) -> E2eResult<Vec<String>> {
        self.table.column_texts(self.run_id_column().await?).await
    }

    async fn run_row(&self, run_id: &str) -> E2eResult<Option<Locator>> {
        self.table.row_where(self.run_id_column().await?, run_id).await
    }

    pub async fn has_run(&self, run_id: &str) -> E2eResult<bool> {
        Ok(self.run_row(run_id).await?.is_some())
    }

    /// Delete `run_id` through its row action and wait for the row to go
    pub async fn delete_run(&self, run_id: &str) -> E2eResult<()> {
        let row = self
            .run_row(run_id)
            .await?
            .ok_or_else(|| E2eError::missing("dag run", run_id))?;

        self.page
            .click(&row.get_by_role("button", Some("Delete Dag Run")))
            .await?;
        self.page.expect_visible(&dialog()).await?;

        // Run ids are percent-encoded in the request path
        let matcher = ResponseMatcher::delete(format!("/api/v2/dags/{}/dagRuns/", self.dag_id));
        self.page
            .capture_response(matcher, || self.page.click(&self.confirm_delete))
            .await?;

        let this = self;
        poll_until(
            &self.page.poll(),
            &format!("run '{}' to leave the list", run_id),
            move || async move { Ok(!this.has_run(run_id).await?) },
        )
        .await?;
        info!("Deleted run {} of {}", run_id, self.dag_id);
        Ok(())
    }
}
