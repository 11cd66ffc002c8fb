use serde::Deserialize;
use tracing::info;

use crate::driver::ResponseMatcher;
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::dialog;

#[derive(Debug, Deserialize)]
struct TriggeredRun {
    dag_run_id: String,
}

/// DAG details page and its trigger dialog
pub struct DagsPage {
    page: Page,
    pub trigger_button: Locator,
    pub confirm_trigger: Locator,
}

impl DagsPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            trigger_button: Locator::by_test_id("trigger-dag-button"),
            confirm_trigger: dialog().get_by_role("button", Some("Trigger")),
        }
    }

    pub async fn open(&self, dag_id: &str) -> E2eResult<()> {
        self.page.goto(&format!("/dags/{}", dag_id)).await?;
        self.page.expect_visible(&self.trigger_button).await
    }

    /// Trigger a run from the UI and return the run id the server assigned
    pub async fn trigger(&self, dag_id: &str) -> E2eResult<String> {
        self.open(dag_id).await?;
        self.page.click(&self.trigger_button).await?;
        self.page.expect_visible(&dialog()).await?;

        let matcher = ResponseMatcher::post(format!("/api/v2/dags/{}/dagRuns", dag_id));
        let response = self
            .page
            .capture_response(matcher, || self.page.click(&self.confirm_trigger))
            .await?;
        let run: TriggeredRun = response.json()?;

        self.page.expect_hidden(&dialog()).await?;
        info!("Triggered {} run {}", dag_id, run.dag_run_id);
        Ok(run.dag_run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use crate::testing::{button, fake_page, FakeDriver, FakeState, Node};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Details page whose dialog opens on trigger and posts with `status`
    fn dag_app(status: u16) -> Arc<FakeDriver> {
        let open = Arc::new(Mutex::new(false));
        let render_open = open.clone();
        let driver = FakeDriver::new(move |url| {
            let mut root = Node::new("html");
            if url.path() == "/dags/demo" {
                root = root.child(Node::new("button").test_id("trigger-dag-button").key("trigger"));
                if *render_open.lock() {
                    root = root.child(Node::new("section").role("dialog").child(button("Trigger", "confirm")));
                }
            }
            root
        });

        let opener = open.clone();
        driver.on_click("trigger", move |state: &mut FakeState| {
            *opener.lock() = true;
            state.refresh();
        });
        driver.on_click("confirm", move |state: &mut FakeState| {
            *open.lock() = false;
            state.respond(
                "POST",
                "/api/v2/dags/demo/dagRuns",
                status,
                r#"{"dag_run_id": "manual__2024-05-01T00:00:00+00:00", "state": "queued"}"#,
            );
            state.refresh();
        });
        driver
    }

    #[tokio::test]
    async fn test_trigger_returns_server_run_id() {
        let driver = dag_app(200);
        let dags = DagsPage::new(fake_page(driver.clone()));

        let run_id = dags.trigger("demo").await.unwrap();
        assert_eq!(run_id, "manual__2024-05-01T00:00:00+00:00");
        assert_eq!(driver.clicks(), vec!["trigger", "confirm"]);
    }

    #[tokio::test]
    async fn test_trigger_surfaces_api_rejection() {
        let dags = DagsPage::new(fake_page(dag_app(409)));

        let err = dags.trigger("demo").await.unwrap_err();
        assert!(matches!(err, E2eError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_open_unknown_dag_times_out() {
        let dags = DagsPage::new(fake_page(dag_app(200)));
        let err = dags.open("missing").await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout { .. }));
    }
}
