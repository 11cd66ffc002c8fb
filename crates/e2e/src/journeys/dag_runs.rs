use futures::future::{BoxFuture, FutureExt};
use regex::Regex;
use tracing::info;

use super::ensure;
use crate::error::{E2eError, E2eResult};
use crate::pages::{DagRunsTab, DagsPage};
use crate::query::{param, ListQuery, OFFSET};
use crate::suite::{Journey, JourneyContext};

pub(super) fn journeys() -> Vec<Journey> {
    vec![
        Journey {
            name: "dag_runs_pagination",
            tags: &["dag_runs", "pagination"],
            run: pagination,
        },
        Journey {
            name: "dag_runs_state_filter",
            tags: &["dag_runs", "filter"],
            run: state_filter,
        },
        Journey {
            name: "dag_runs_search",
            tags: &["dag_runs", "search"],
            run: search,
        },
        Journey {
            name: "trigger_dag_run",
            tags: &["dags", "dag_runs", "mutation"],
            run: trigger,
        },
    ]
}

/// Next page changes the first run, previous page brings it back
fn pagination(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let dag_id = &ctx.config.test_dag_id;
        ctx.seeder
            .seed_dag_runs(dag_id, ctx.config.seeded_runs, Some("success"))
            .await?;

        let mut tab = DagRunsTab::new(ctx.page.clone(), dag_id.as_str());
        tab.navigate_with(ListQuery::new().limit(ctx.config.page_size))
            .await?;

        let url = ctx.page.url().await?;
        ensure(
            param(&url, OFFSET).as_deref() == Some("0"),
            "offset=0 after opening the first page",
            url.to_string(),
        )?;

        let first = tab.first_run_id().await?;
        let second = tab.next_page().await?;
        ensure(first != second, format!("a new first run after '{}'", first), second.clone())?;

        let back = tab.previous_page().await?;
        ensure(back == first, format!("'{}' after going back", first), back)
    }
    .boxed()
}

/// Filtering by state shows only runs in that state
fn state_filter(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let dag_id = &ctx.config.test_dag_id;
        ctx.seeder.seed_dag_runs(dag_id, 2, Some("success")).await?;
        ctx.seeder.seed_dag_runs(dag_id, 2, Some("failed")).await?;

        let mut tab = DagRunsTab::new(ctx.page.clone(), dag_id.as_str());
        tab.navigate().await?;

        for state in ["success", "failed"] {
            let count = tab.filter_by_state(state).await?;
            ensure(count > 0, format!("{} runs listed", state), "none")?;
            let checked = tab.verify_state_filter(state).await?;
            ensure(checked > 0, format!("{} run states verified", state), "none")?;
            info!("{} {} run(s) verified", checked, state);
        }
        Ok(())
    }
    .boxed()
}

/// Searching narrows to matching run ids and clearing restores the list
fn search(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let dag_id = &ctx.config.test_dag_id;
        ctx.seeder.seed_dag_runs(dag_id, 3, None).await?;
        let pattern = ctx.seeder.prefix().to_string();

        let mut tab = DagRunsTab::new(ctx.page.clone(), dag_id.as_str());
        tab.navigate().await?;

        let found = tab.search_run_id(&pattern).await?;
        ensure(found >= 1, format!("runs matching '{}'", pattern), "none")?;
        tab.verify_search(&pattern).await?;

        let restored = tab.clear_search().await?;
        ensure(
            restored >= found,
            format!("at least {} runs after clearing the search", found),
            restored.to_string(),
        )
    }
    .boxed()
}

/// Triggering from the UI yields a run the API knows about, which can then be
/// deleted from the runs tab
fn trigger(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let dag_id = &ctx.config.test_dag_id;
        ctx.api.unpause_dag(dag_id).await?;

        let run_id = DagsPage::new(ctx.page.clone()).trigger(dag_id).await?;
        ctx.seeder.track_dag_run(dag_id.as_str(), run_id.as_str());

        let manual = Regex::new(r"^manual__\d{4}-\d{2}-\d{2}T").map_err(|e| E2eError::Config(e.to_string()))?;
        ensure(manual.is_match(&run_id), "a manual__<timestamp> run id", run_id.clone())?;

        let run = ctx.api.get_dag_run(dag_id, &run_id).await?;
        ensure(run.dag_id == *dag_id, dag_id.clone(), run.dag_id.clone())?;

        let mut tab = DagRunsTab::new(ctx.page.clone(), dag_id.as_str());
        tab.navigate_with(ListQuery::new().run_id_pattern(run_id.as_str()))
            .await?;
        ensure(tab.has_run(&run_id).await?, format!("run '{}' listed", run_id), "absent")?;

        tab.delete_run(&run_id).await?;
        ensure(!tab.has_run(&run_id).await?, format!("run '{}' gone", run_id), "still listed")
    }
    .boxed()
}
