use tracing::{debug, info};

use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;

pub const LOGIN_PATH: &str = "/auth/login";

pub struct LoginPage {
    page: Page,
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
}

impl LoginPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            username: Locator::css(r#"input[name="username"]"#),
            password: Locator::css(r#"input[name="password"]"#),
            submit: Locator::css(r#"button[type="submit"]"#),
        }
    }

    /// Sign in through the form and wait until the app leaves the login route.
    ///
    /// A session that is already authenticated is redirected away from the
    /// form, in which case nothing is filled.
    pub async fn login(&self, username: &str, password: &str) -> E2eResult<()> {
        self.page.goto(LOGIN_PATH).await?;
        if !on_login_route(&self.page.url().await?) {
            debug!("Already authenticated");
            return Ok(());
        }

        self.page.expect_visible(&self.username).await?;
        self.page.fill(&self.username, username).await?;
        self.page.fill(&self.password, password).await?;
        self.page.click(&self.submit).await?;

        self.page
            .wait_for_url("navigation away from the login page", |url| !on_login_route(url))
            .await?;
        info!("Logged in as {}", username);
        Ok(())
    }
}

fn on_login_route(url: &url::Url) -> bool {
    url.path().contains("/login")
}
