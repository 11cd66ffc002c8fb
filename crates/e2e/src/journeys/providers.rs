use futures::future::{BoxFuture, FutureExt};
use tracing::info;

use super::ensure;
use crate::error::E2eResult;
use crate::pages::ProvidersPage;
use crate::suite::{Journey, JourneyContext};

pub(super) fn journeys() -> Vec<Journey> {
    vec![Journey {
        name: "providers_list",
        tags: &["providers", "read_only"],
        run: list,
    }]
}

fn list(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let providers = ProvidersPage::new(ctx.page.clone());
        providers.navigate().await?;

        let rows = providers.verify_populated().await?;
        let newest = providers.highest_version().await?;
        ensure(newest.is_some(), "a provider with a version", "none")?;
        if let Some(newest) = newest {
            info!(
                "{} provider(s), newest {} {}",
                rows.len(),
                newest.package_name,
                newest.version
            );
        }
        Ok(())
    }
    .boxed()
}
