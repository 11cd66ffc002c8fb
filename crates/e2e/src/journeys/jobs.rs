use futures::future::{BoxFuture, FutureExt};
use tracing::info;

use super::ensure;
use crate::error::E2eResult;
use crate::pages::JobsPage;
use crate::suite::{Journey, JourneyContext};

const FALLBACK_STATE: &str = "running";

pub(super) fn journeys() -> Vec<Journey> {
    vec![Journey {
        name: "jobs_list",
        tags: &["jobs", "filter", "read_only"],
        run: list,
    }]
}

/// The list renders and filtering by a state the API reports narrows it
fn list(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let mut jobs = JobsPage::new(ctx.page.clone());
        jobs.navigate().await?;
        let rows = jobs.verify_populated().await?;
        info!("{} job(s) listed", rows.len());

        let state = ctx
            .api
            .list_jobs(1)
            .await?
            .into_iter()
            .find_map(|job| job.state)
            .unwrap_or_else(|| FALLBACK_STATE.to_string());

        let count = jobs.filter_by_state(&state).await?;
        ensure(count > 0, format!("{} jobs listed", state), "none")?;
        let checked = jobs.verify_state_filter(&state).await?;
        ensure(checked > 0, format!("{} job states verified", state), "none")
    }
    .boxed()
}
