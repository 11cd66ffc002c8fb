use futures::future::{BoxFuture, FutureExt};

use super::ensure;
use crate::error::E2eResult;
use crate::pages::{ConnectionForm, ConnectionsPage};
use crate::suite::{Journey, JourneyContext};

pub(super) fn journeys() -> Vec<Journey> {
    vec![
        Journey {
            name: "connections_crud",
            tags: &["connections", "mutation"],
            run: crud,
        },
        Journey {
            name: "connections_search",
            tags: &["connections", "search"],
            run: search,
        },
    ]
}

/// Create, edit and delete one connection through the UI
fn crud(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let id = ctx.seeder.unique_id("crud");
        // Tracked up front so a failure after creation still cleans it up
        ctx.seeder.track_connection(id.as_str());

        let connections = ConnectionsPage::new(ctx.page.clone());
        ensure(!connections.exists(&id).await?, format!("no connection '{}' yet", id), "present")?;

        let form = ConnectionForm::new(id.as_str(), "http")
            .host("e2e.invalid")
            .login("e2e")
            .port(8080)
            .description("created by airflow-ui-e2e");
        connections.create(&form).await?;
        ensure(connections.exists(&id).await?, format!("connection '{}' listed", id), "absent")?;

        let stored = ctx.api.get_connection(&id).await?;
        ensure(stored.is_some(), format!("connection '{}' in the API", id), "404")?;

        connections
            .edit(&id, &ConnectionForm::new(id.as_str(), "http").host("edited.e2e.invalid"))
            .await?;
        let host = ctx.api.get_connection(&id).await?.and_then(|c| c.host);
        ensure(
            host.as_deref() == Some("edited.e2e.invalid"),
            "host edited.e2e.invalid",
            format!("{:?}", host),
        )?;

        connections.delete(&id).await?;
        ensure(!connections.exists(&id).await?, format!("connection '{}' gone", id), "still listed")
    }
    .boxed()
}

/// Searching by prefix lists only seeded connections; clearing restores the rest
fn search(ctx: JourneyContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        ctx.seeder.seed_connection("search_a", "http").await?;
        ctx.seeder.seed_connection("search_b", "postgres").await?;
        let pattern = ctx.seeder.prefix().to_string();

        let connections = ConnectionsPage::new(ctx.page.clone());
        connections.navigate().await?;

        let found = connections.search(&pattern).await?;
        ensure(found >= 2, format!("both connections matching '{}'", pattern), found.to_string())?;
        connections.verify_search(&pattern).await?;

        let restored = connections.clear_search().await?;
        ensure(
            restored >= found,
            format!("at least {} connections after clearing", found),
            restored.to_string(),
        )
    }
    .boxed()
}
