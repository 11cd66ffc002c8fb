//! Jobs list (`/jobs`)

use serde::Serialize;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::table::{assert_all_contain, DataTable};
use crate::query::ListQuery;

pub const PATH: &str = "/jobs";

/// A job as rendered. Only the id column is required; the rest depend on
/// which columns the list shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobRow {
    pub id: String,
    pub dag_id: Option<String>,
    pub state: Option<String>,
    pub job_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub hostname: Option<String>,
}

pub struct JobsPage {
    page: Page,
    pub table: DataTable,
    query: ListQuery,
}

impl JobsPage {
    pub fn new(page: Page) -> Self {
        Self {
            table: DataTable::new(page.clone()),
            page,
            query: ListQuery::new(),
        }
    }

    pub async fn navigate(&mut self) -> E2eResult<usize> {
        self.navigate_with(ListQuery::new()).await
    }

    pub async fn navigate_with(&mut self, query: ListQuery) -> E2eResult<usize> {
        let url = self.page.goto_list(PATH, &query).await?;
        self.query = ListQuery::from_url(&url);
        self.table.wait_for_ready().await
    }

    pub async fn filter_by_state(&mut self, state: &str) -> E2eResult<usize> {
        let query = ListQuery {
            offset: None,
            ..self.query.clone()
        }
        .job_state(state);
        self.navigate_with(query).await
    }

    async fn optional_cell(&self, row: &Locator, column: Option<usize>) -> E2eResult<Option<String>> {
        let Some(column) = column else {
            return Ok(None);
        };
        let cell = DataTable::cells(row).nth(column);
        if !self.page.exists(&cell).await? {
            return Ok(None);
        }
        let text = self.page.text(&cell).await?.trim().to_string();
        Ok((!text.is_empty()).then_some(text))
    }

    pub async fn rows(&self) -> E2eResult<Vec<JobRow>> {
        let id_col = self.table.column_or("Id", 0).await?;
        let dag_col = self.table.column_index("Dag ID").await?;
        let state_col = self.table.state_column().await?;
        let type_col = self.table.column_index("Job Type").await?;
        let start_col = self.table.column_index("Start Date").await?;
        let end_col = self.table.column_index("End Date").await?;
        let host_col = self.table.column_index("Hostname").await?;

        let rows = self.table.rows().await?;
        let count = self.page.count(&rows).await?;
        let mut jobs = Vec::with_capacity(count);
        for i in 0..count {
            let row = rows.nth(i);
            jobs.push(JobRow {
                id: self.optional_cell(&row, Some(id_col)).await?.unwrap_or_default(),
                dag_id: self.optional_cell(&row, dag_col).await?,
                state: self.optional_cell(&row, state_col).await?,
                job_type: self.optional_cell(&row, type_col).await?,
                start_date: self.optional_cell(&row, start_col).await?,
                end_date: self.optional_cell(&row, end_col).await?,
                hostname: self.optional_cell(&row, host_col).await?,
            });
        }
        Ok(jobs)
    }

    /// At least one job with an id is listed. Returns the rows.
    pub async fn verify_populated(&self) -> E2eResult<Vec<JobRow>> {
        let rows = self.table.rows().await?;
        self.page.expect_count_at_least(&rows, 1).await?;

        let jobs = self.rows().await?;
        if let Some(position) = jobs.iter().position(|j| j.id.is_empty()) {
            return Err(E2eError::assertion(
                "every job to show an id",
                format!("row {} has none", position),
            ));
        }
        Ok(jobs)
    }

    /// Every visible job's state contains `state`.
    /// Returns the number of rows checked.
    pub async fn verify_state_filter(&self, state: &str) -> E2eResult<usize> {
        let state_col = self.table.state_column().await?;
        let states = self.table.required_states(state_col).await?;
        assert_all_contain(&states, state, "job state")?;
        Ok(states.len())
    }

    pub async fn next_page(&self) -> E2eResult<String> {
        let col = self.table.column_or("Id", 0).await?;
        self.table.next_page(Some(col)).await
    }

    pub async fn previous_page(&self) -> E2eResult<String> {
        let col = self.table.column_or("Id", 0).await?;
        self.table.previous_page(Some(col)).await
    }
}
