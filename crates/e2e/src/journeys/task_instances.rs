use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

use super::ensure;
use crate::error::E2eResult;
use crate::pages::TaskInstancesPage;
use crate::suite::{Journey, JourneyContext};

pub(super) fn journeys() -> Vec<Journey> {
    vec![Journey {
        name: "task_instances_state_filter",
        tags: &["task_instances", "filter"],
        run: state_filter,
    }]
}

fn state_filter(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let runs = ctx
            .seeder
            .seed_dag_runs(&ctx.config.test_dag_id, 1, Some("success"))
            .await?;

        let mut list = TaskInstancesPage::new(ctx.page.clone());
        list.navigate().await?;

        let count = list.filter_by_state("success").await?;
        ensure(count > 0, "successful task instances listed", "none")?;

        let verified = list.verify_rows().await?;
        let checked = list.verify_state_filter("success").await?;
        ensure(checked > 0, "successful task instance states verified", "none")?;
        info!("{} row(s) rendered, {} state(s) verified", verified, checked);

        // Seeded runs may land on a later page; only a visible row is checked
        for run in &runs {
            match list.row_for_run(&run.dag_run_id).await? {
                Some(row) => {
                    if let Some(state) = row.state {
                        ensure(
                            state.to_lowercase().contains("success"),
                            format!("run '{}' to show success", run.dag_run_id),
                            state,
                        )?;
                    }
                }
                None => debug!("{} not on the first page", run.dag_run_id),
            }
        }
        Ok(())
    }
    .boxed()
}
