//! The list view every Airflow page renders through `DataTable`
//!
//! Rows appear either as a `<table>` or, in card mode, as a card list. Columns
//! are located by header text so a missing optional column shifts nothing.

use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::wait::{poll_for, poll_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Table,
    Cards,
}

#[derive(Clone)]
pub struct DataTable {
    page: Page,
    pub table: Locator,
    pub table_rows: Locator,
    pub headers: Locator,
    pub card_list: Locator,
    pub cards: Locator,
    pub no_rows: Locator,
    pub next_button: Locator,
    pub prev_button: Locator,
}

impl DataTable {
    pub fn new(page: Page) -> Self {
        let table = Locator::by_test_id("table-list");
        let card_list = Locator::by_test_id("card-list");
        Self {
            page,
            table_rows: table.locator("tbody tr"),
            headers: table.locator("thead th"),
            table,
            cards: card_list.get_by_test_id("card"),
            card_list,
            no_rows: Locator::by_test_id("no-rows-message"),
            next_button: Locator::by_role_with_name("button", "next page"),
            prev_button: Locator::by_role_with_name("button", "previous page"),
        }
    }

    /// Which rendering is on screen, if any
    pub async fn view_mode(&self) -> E2eResult<Option<ViewMode>> {
        if self.page.is_visible(&self.table).await? {
            Ok(Some(ViewMode::Table))
        } else if self.page.is_visible(&self.card_list).await? {
            Ok(Some(ViewMode::Cards))
        } else {
            Ok(None)
        }
    }

    fn rows_for(&self, mode: ViewMode) -> &Locator {
        match mode {
            ViewMode::Table => &self.table_rows,
            ViewMode::Cards => &self.cards,
        }
    }

    /// Row locator for the current view mode (table when nothing is rendered yet)
    pub async fn rows(&self) -> E2eResult<Locator> {
        let mode = self.view_mode().await?.unwrap_or(ViewMode::Table);
        Ok(self.rows_for(mode).clone())
    }

    pub fn row(&self, index: usize) -> Locator {
        self.table_rows.nth(index)
    }

    pub fn cells(row: &Locator) -> Locator {
        row.locator("td")
    }

    /// Wait until the list has rendered (rows or the empty message) and the
    /// row count has settled. Returns the settled count.
    pub async fn wait_for_ready(&self) -> E2eResult<usize> {
        let this = self;
        poll_until(&self.page.poll(), "list view to render", move || async move {
            Ok(this.view_mode().await?.is_some() || this.page.is_visible(&this.no_rows).await?)
        })
        .await?;

        let rows = self.rows().await?;
        let count = self.page.settled_count(&rows).await?;
        debug!("List settled at {} row(s)", count);
        Ok(count)
    }

    async fn require_rows(&self) -> E2eResult<ViewMode> {
        match self.view_mode().await? {
            Some(mode) if self.page.exists(self.rows_for(mode)).await? => Ok(mode),
            _ => Err(E2eError::missing("results table", self.table.to_string())),
        }
    }

    /// Index of the column whose header matches `name` (case-insensitive)
    pub async fn column_index(&self, name: &str) -> E2eResult<Option<usize>> {
        let headers = self.page.all_texts(&self.headers).await?;
        let wanted = name.trim().to_lowercase();
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        Ok(normalized
            .iter()
            .position(|h| *h == wanted)
            .or_else(|| normalized.iter().position(|h| h.contains(&wanted))))
    }

    /// Column index by header, or `fallback` when the header is absent
    pub async fn column_or(&self, name: &str, fallback: usize) -> E2eResult<usize> {
        Ok(self.column_index(name).await?.unwrap_or(fallback))
    }

    /// Text identifying `row`: the `column` cell in table mode, else the whole row
    async fn key_text(&self, row: &Locator, column: Option<usize>, mode: ViewMode) -> E2eResult<String> {
        let text = match (mode, column) {
            (ViewMode::Table, Some(column)) => self.page.text(&Self::cells(row).nth(column)).await?,
            _ => self.page.text(row).await?,
        };
        Ok(text.trim().to_string())
    }

    pub async fn first_row_key(&self, column: Option<usize>) -> E2eResult<String> {
        let mode = self.view_mode().await?.unwrap_or(ViewMode::Table);
        let first = self.rows_for(mode).first();
        self.key_text(&first, column, mode).await
    }

    /// `column` text of every visible row, in order
    pub async fn column_texts(&self, column: usize) -> E2eResult<Vec<String>> {
        let mode = self.view_mode().await?.unwrap_or(ViewMode::Table);
        let rows = self.rows_for(mode);
        let count = self.page.count(rows).await?;

        let mut texts = Vec::with_capacity(count);
        for i in 0..count {
            texts.push(self.key_text(&rows.nth(i), Some(column), mode).await?);
        }
        Ok(texts)
    }

    /// First row containing `text`, or `None`
    pub async fn row_with_text(&self, text: &str) -> E2eResult<Option<Locator>> {
        let rows = self.rows().await?;
        let row = rows.filter_has_text(text).first();
        if self.page.exists(&row).await? {
            Ok(Some(row))
        } else {
            Ok(None)
        }
    }

    /// Row whose `column` text equals `value` exactly, or `None`
    pub async fn row_where(&self, column: usize, value: &str) -> E2eResult<Option<Locator>> {
        let texts = self.column_texts(column).await?;
        let rows = self.rows().await?;
        Ok(texts
            .iter()
            .position(|t| t == value.trim())
            .map(|i| rows.nth(i)))
    }

    /// State of every row: its badge when one is rendered, else the
    /// `fallback` column, else nothing for that row.
    pub async fn row_states(&self, fallback: Option<usize>) -> E2eResult<Vec<Option<String>>> {
        let rows = self.rows().await?;
        let count = self.page.count(&rows).await?;

        let mut states = Vec::with_capacity(count);
        for i in 0..count {
            let row = rows.nth(i);
            let badge = row.get_by_test_id("state-badge");
            let state = if self.page.exists(&badge).await? {
                Some(self.page.text(&badge).await?)
            } else if let Some(column) = fallback {
                let cell = Self::cells(&row).nth(column);
                if self.page.exists(&cell).await? {
                    Some(self.page.text(&cell).await?)
                } else {
                    None
                }
            } else {
                None
            };
            states.push(state.map(|s| s.trim().to_string()));
        }
        Ok(states)
    }

    /// Column holding row states: a "State" header, else "Status"
    pub async fn state_column(&self) -> E2eResult<Option<usize>> {
        match self.column_index("State").await? {
            Some(index) => Ok(Some(index)),
            None => self.column_index("Status").await,
        }
    }

    /// State of every row, failing on the first row whose state cannot be
    /// read. A state filter cannot be verified against rows it cannot see.
    pub async fn required_states(&self, fallback: Option<usize>) -> E2eResult<Vec<String>> {
        self.row_states(fallback)
            .await?
            .into_iter()
            .enumerate()
            .map(|(i, state)| {
                state.filter(|s| !s.is_empty()).ok_or_else(|| {
                    E2eError::assertion("a readable state on every row", format!("none on row {}", i))
                })
            })
            .collect()
    }

    pub async fn next_page(&self, key_column: Option<usize>) -> E2eResult<String> {
        self.turn_page(&self.next_button, key_column, "next page").await
    }

    pub async fn previous_page(&self, key_column: Option<usize>) -> E2eResult<String> {
        self.turn_page(&self.prev_button, key_column, "previous page").await
    }

    /// Click a pagination control and wait for the first row's key to change.
    /// Returns the new first key.
    async fn turn_page(&self, button: &Locator, key_column: Option<usize>, what: &str) -> E2eResult<String> {
        self.require_rows().await?;
        let before = self.first_row_key(key_column).await?;

        self.page.click(button).await?;

        let this = self;
        let before = before.as_str();
        let after = poll_for(
            &self.page.poll(),
            &format!("first row to change after {} (was '{}')", what, before),
            move || async move {
                let key = this.first_row_key(key_column).await?;
                Ok((key != before).then_some(key))
            },
        )
        .await?;

        debug!("{}: first row '{}' -> '{}'", what, before, after);
        Ok(after)
    }
}

/// Fail unless every value contains `needle`, ignoring case
pub fn assert_all_contain(values: &[String], needle: &str, what: &str) -> E2eResult<()> {
    let wanted = needle.to_lowercase();
    match values.iter().find(|v| !v.to_lowercase().contains(&wanted)) {
        Some(bad) => Err(E2eError::assertion(
            format!("every {} to contain '{}'", what, needle),
            format!("'{}' among {:?}", bad, values),
        )),
        None => Ok(()),
    }
}
