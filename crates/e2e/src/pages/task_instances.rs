//! Task instance list (`/task_instances`)
//!
//! Columns vary with the view and the deployment, so rows are read through
//! header lookups and verified best-effort: a state badge when one is
//! rendered, otherwise a minimum number of cells.

use serde::Serialize;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::table::{assert_all_contain, DataTable, ViewMode};
use crate::query::ListQuery;

pub const PATH: &str = "/task_instances";

/// Cells a rendered row must have when no state badge is available
pub const MIN_CELLS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskInstanceRow {
    pub dag_id: Option<String>,
    pub run_id: Option<String>,
    pub task_id: Option<String>,
    pub state: Option<String>,
}

struct Columns {
    dag_id: Option<usize>,
    run_id: Option<usize>,
    task_id: Option<usize>,
    state: Option<usize>,
}

pub struct TaskInstancesPage {
    page: Page,
    pub table: DataTable,
    query: ListQuery,
}

impl TaskInstancesPage {
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
        .task_state(state);
        self.navigate_with(query).await
    }

    async fn columns(&self) -> E2eResult<Columns> {
        Ok(Columns {
            dag_id: self.table.column_index("Dag ID").await?,
            run_id: self.table.column_index("Run ID").await?,
            task_id: self.table.column_index("Task ID").await?,
            state: self.table.state_column().await?,
        })
    }

    /// Every row has a readable state containing `state`.
    /// Returns the number of rows checked.
    pub async fn verify_state_filter(&self, state: &str) -> E2eResult<usize> {
        let columns = self.columns().await?;
        let states = self.table.required_states(columns.state).await?;
        assert_all_contain(&states, state, "task instance state")?;
        Ok(states.len())
    }

    async fn cell_text(&self, row: &Locator, index: Option<usize>) -> E2eResult<Option<String>> {
        let Some(index) = index else {
            return Ok(None);
        };
        let cell = DataTable::cells(row).nth(index);
        if !self.page.exists(&cell).await? {
            return Ok(None);
        }
        Ok(Some(self.page.text(&cell).await?.trim().to_string()))
    }

    async fn read_row(&self, row: &Locator, columns: &Columns) -> E2eResult<TaskInstanceRow> {
        let badge = row.get_by_test_id("state-badge");
        let state = if self.page.exists(&badge).await? {
            Some(self.page.text(&badge).await?.trim().to_string())
        } else {
            self.cell_text(row, columns.state).await?
        };

        Ok(TaskInstanceRow {
            dag_id: self.cell_text(row, columns.dag_id).await?,
            run_id: self.cell_text(row, columns.run_id).await?,
            task_id: self.cell_text(row, columns.task_id).await?,
            state,
        })
    }

    pub async fn rows(&self) -> E2eResult<Vec<TaskInstanceRow>> {
        let columns = self.columns().await?;
        let rows = self.table.rows().await?;
        let count = self.page.count(&rows).await?;

        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            out.push(self.read_row(&rows.nth(i), &columns).await?);
        }
        Ok(out)
    }

    /// First row belonging to `run_id`, or `None`
    pub async fn row_for_run(&self, run_id: &str) -> E2eResult<Option<TaskInstanceRow>> {
        let Some(row) = self.table.row_with_text(run_id).await? else {
            return Ok(None);
        };
        let columns = self.columns().await?;
        Ok(Some(self.read_row(&row, &columns).await?))
    }

    /// Check that row `index` is a fully rendered task instance
    pub async fn verify_row(&self, index: usize) -> E2eResult<()> {
        let rows = self.table.rows().await?;
        let row = rows.nth(index);
        if !self.page.exists(&row).await? {
            return Err(E2eError::missing("task instance row", index.to_string()));
        }

        let badge = row.get_by_test_id("state-badge");
        if self.page.exists(&badge).await? {
            let state = self.page.text(&badge).await?;
            if state.trim().is_empty() {
                return Err(E2eError::assertion(
                    format!("row {} to show a state", index),
                    "empty state badge",
                ));
            }
            return Ok(());
        }

        if self.table.view_mode().await? == Some(ViewMode::Cards) {
            let text = self.page.text(&row).await?;
            if text.trim().is_empty() {
                return Err(E2eError::assertion(format!("card {} to have content", index), "empty card"));
            }
            return Ok(());
        }

        let cells = self.page.count(&DataTable::cells(&row)).await?;
        debug!("Row {} has no state badge, checking {} cell(s)", index, cells);
        if cells < MIN_CELLS {
            return Err(E2eError::assertion(
                format!("row {} to have at least {} cells", index, MIN_CELLS),
                format!("{} cells", cells),
            ));
        }
        Ok(())
    }

    /// At least one row is listed and every row passes `verify_row`
    pub async fn verify_rows(&self) -> E2eResult<usize> {
        let rows = self.table.rows().await?;
        let count = self.page.expect_count_at_least(&rows, 1).await?;
        for i in 0..count {
            self.verify_row(i).await?;
        }
        Ok(count)
    }

    pub async fn next_page(&self) -> E2eResult<String> {
        self.table.next_page(None).await
    }

    pub async fn previous_page(&self) -> E2eResult<String> {
        self.table.previous_page(None).await
    }
}
