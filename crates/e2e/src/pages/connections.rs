//! Connections list and its add / edit / delete flows (`/connections`)

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::driver::ResponseMatcher;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::table::{assert_all_contain, DataTable};
use crate::pages::{clear_search_button, dialog, search_bar};
use crate::query::{param, ListQuery};
use crate::wait::poll_until;

pub const PATH: &str = "/connections";
const API_PATH: &str = "/api/v2/connections";
const SEARCH_PARAM: &str = "connection_id_pattern";

/// Values typed into the connection form. Empty optional fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionForm {
    pub connection_id: String,
    pub conn_type: String,
    pub host: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub description: Option<String>,
}

impl ConnectionForm {
    pub fn new(connection_id: impl Into<String>, conn_type: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            conn_type: conn_type.into(),
            ..Default::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct SavedConnection {
    connection_id: String,
}

pub struct ConnectionsPage {
    page: Page,
    pub table: DataTable,
    pub add_button: Locator,
    pub id_input: Locator,
    pub type_select: Locator,
    pub host_input: Locator,
    pub login_input: Locator,
    pub password_input: Locator,
    pub port_input: Locator,
    pub description_input: Locator,
    pub save_button: Locator,
    pub confirm_delete: Locator,
    pub search: Locator,
    pub clear_search: Locator,
}

impl ConnectionsPage {
    pub fn new(page: Page) -> Self {
        Self {
            table: DataTable::new(page.clone()),
            page,
            add_button: Locator::by_test_id("add-connection-button"),
            id_input: Locator::css(r#"input[name="connection_id"]"#),
            type_select: Locator::by_test_id("connection-type-select"),
            host_input: Locator::css(r#"input[name="host"]"#),
            login_input: Locator::css(r#"input[name="login"]"#),
            password_input: Locator::css(r#"input[name="password"]"#),
            port_input: Locator::css(r#"input[name="port"]"#),
            description_input: Locator::css(r#"textarea[name="description"]"#),
            save_button: Locator::by_role_with_name("button", "Save"),
            confirm_delete: dialog().get_by_role("button", Some("Yes, Delete")),
            search: search_bar(),
            clear_search: clear_search_button(),
        }
    }

    pub async fn navigate(&self) -> E2eResult<usize> {
        self.navigate_with(&ListQuery::new()).await
    }

    pub async fn navigate_with(&self, query: &ListQuery) -> E2eResult<usize> {
        self.page.goto_list(PATH, query).await?;
        self.table.wait_for_ready().await
    }

    async fn id_column(&self) -> E2eResult<usize> {
        self.table.column_or("Connection ID", 0).await
    }

    pub async fn connection_ids(&self) -> E2eResult<Vec<String>> {
        self.table.column_texts(self.id_column().await?).await
    }

    /// `/api/v2/connections/{id}` with the id percent-encoded as one segment
    fn api_path(&self, connection_id: &str) -> E2eResult<String> {
        let mut url = self.page.url_for(API_PATH)?;
        let base = url.to_string();
        url.path_segments_mut()
            .map_err(|_| E2eError::Config(format!("{} cannot be a base URL", base)))?
            .push(connection_id);
        Ok(url.path().to_string())
    }

    /// Row for `connection_id` in the list currently shown
    async fn row(&self, connection_id: &str) -> E2eResult<Option<Locator>> {
        self.table.row_where(self.id_column().await?, connection_id).await
    }

    async fn fill_optional(&self, locator: &Locator, value: Option<&str>) -> E2eResult<()> {
        match value {
            Some(value) => self.page.fill(locator, value).await,
            None => Ok(()),
        }
    }

    /// Fill everything but the id, which is fixed once created
    async fn fill_details(&self, form: &ConnectionForm) -> E2eResult<()> {
        self.page.select_option(&self.type_select, &form.conn_type).await?;
        self.fill_optional(&self.host_input, form.host.as_deref()).await?;
        self.fill_optional(&self.login_input, form.login.as_deref()).await?;
        self.fill_optional(&self.password_input, form.password.as_deref()).await?;
        let port = form.port.map(|p| p.to_string());
        self.fill_optional(&self.port_input, port.as_deref()).await?;
        self.fill_optional(&self.description_input, form.description.as_deref())
            .await
    }

    async fn save(&self, matcher: ResponseMatcher) -> E2eResult<SavedConnection> {
        let response = self
            .page
            .capture_response(matcher, || self.page.click(&self.save_button))
            .await?;
        let saved = response.json()?;
        self.page.expect_hidden(&self.id_input).await?;
        Ok(saved)
    }

    /// Create a connection through the add form. Returns the id the server stored.
    pub async fn create(&self, form: &ConnectionForm) -> E2eResult<String> {
        self.navigate().await?;
        self.page.click(&self.add_button).await?;
        self.page.expect_visible(&self.id_input).await?;

        self.page.fill(&self.id_input, &form.connection_id).await?;
        self.fill_details(form).await?;
        let saved = self.save(ResponseMatcher::post(API_PATH)).await?;

        info!("Created connection {}", saved.connection_id);
        Ok(saved.connection_id)
    }

    pub async fn edit(&self, connection_id: &str, form: &ConnectionForm) -> E2eResult<()> {
        let row = self.find(connection_id).await?;
        self.page
            .click(&row.get_by_role("button", Some("Edit Connection")))
            .await?;
        self.page.expect_visible(&self.id_input).await?;

        self.fill_details(form).await?;
        self.save(ResponseMatcher::patch(self.api_path(connection_id)?).at_path_end())
            .await?;
        info!("Edited connection {}", connection_id);
        Ok(())
    }

    pub async fn delete(&self, connection_id: &str) -> E2eResult<()> {
        let row = self.find(connection_id).await?;
        self.page
            .click(&row.get_by_role("button", Some("Delete Connection")))
            .await?;
        self.page.expect_visible(&self.confirm_delete).await?;

        let matcher = ResponseMatcher::delete(self.api_path(connection_id)?).at_path_end();
        self.page
            .capture_response(matcher, || self.page.click(&self.confirm_delete))
            .await?;

        let this = self;
        poll_until(
            &self.page.poll(),
            &format!("connection '{}' to leave the list", connection_id),
            move || async move { Ok(this.row(connection_id).await?.is_none()) },
        )
        .await?;
        info!("Deleted connection {}", connection_id);
        Ok(())
    }

    /// Narrow the list to `connection_id` and return its row, or a
    /// precondition error naming it
    async fn find(&self, connection_id: &str) -> E2eResult<Locator> {
        self.navigate_with(&ListQuery::new().connection_id_pattern(connection_id))
            .await?;
        self.row(connection_id)
            .await?
            .ok_or_else(|| E2eError::missing("connection", connection_id))
    }

    /// Whether `connection_id` is listed.
    ///
    /// The list must render: a navigation or render timeout propagates. Only
    /// a missing row reads as `false`.
    pub async fn exists(&self, connection_id: &str) -> E2eResult<bool> {
        self.navigate_with(&ListQuery::new().connection_id_pattern(connection_id))
            .await?;
        match self.row(connection_id).await {
            Ok(row) => Ok(row.is_some()),
            Err(E2eError::ElementNotFound(what)) => {
                debug!("Treating {} as absent: {} vanished", connection_id, what);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn search(&self, pattern: &str) -> E2eResult<usize> {
        self.page.fill(&self.search, pattern).await?;
        self.page.press(&self.search, "Enter").await?;
        self.page
            .wait_for_url(&format!("{}={}", SEARCH_PARAM, pattern), |url| {
                param(url, SEARCH_PARAM).as_deref() == Some(pattern)
            })
            .await?;
        self.table.wait_for_ready().await
    }

    pub async fn verify_search(&self, pattern: &str) -> E2eResult<usize> {
        let ids = self.connection_ids().await?;
        assert_all_contain(&ids, pattern, "connection id")?;
        Ok(ids.len())
    }

    pub async fn clear_search(&self) -> E2eResult<usize> {
        if self.page.is_visible(&self.clear_search).await? {
            self.page.click(&self.clear_search).await?;
        } else {
            self.page.fill(&self.search, "").await?;
            self.page.press(&self.search, "Enter").await?;
        }
        self.page
            .wait_for_url("connection search to be cleared", |url| {
                param(url, SEARCH_PARAM).is_none()
            })
            .await?;
        self.table.wait_for_ready().await
    }
}
