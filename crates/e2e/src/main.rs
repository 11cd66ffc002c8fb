//! Suite runner entry point
//!
//! Exit status: 0 when every selected journey passed, 1 when any failed,
//! 2 when the suite could not run at all.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use airflow_ui_e2e::api::ApiClient;
use airflow_ui_e2e::playwright::{Browser, PlaywrightBridge};
use airflow_ui_e2e::server::ServerHandle;
use airflow_ui_e2e::suite::BridgePages;
use airflow_ui_e2e::{E2eConfig, E2eResult, Selection, Suite, SuiteRunner};

#[derive(Parser, Debug)]
#[command(name = "airflow-ui-e2e")]
#[command(about = "E2E journeys for the Airflow web UI")]
struct Args {
    /// Suite configuration (YAML); defaults apply when missing
    #[arg(short, long, default_value = "e2e.yaml")]
    config: PathBuf,

    /// Override the UI/API origin
    #[arg(long, env = "AIRFLOW_E2E_BASE_URL")]
    base_url: Option<String>,

    /// Run only journeys carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the journey with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Output directory for results and screenshots
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Start the server from `server.command` instead of attaching to one
    #[arg(long)]
    spawn_server: bool,

    /// List the registered journeys and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    }
}

fn resolve_config(args: &Args) -> E2eResult<E2eConfig> {
    let mut config = E2eConfig::load(&args.config)?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(browser) = args.browser {
        config.playwright.browser = browser;
    }
    if args.headed {
        config.playwright.headless = false;
    }
    if let Some(output) = &args.output {
        config.playwright.screenshot_dir = output.join("screenshots");
        config.output_dir = output.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let suite = Suite::standard();
    if args.list {
        for journey in suite.journeys() {
            println!("{:<32} {}", journey.name, journey.tags.join(","));
        }
        return Ok(true);
    }

    let config = resolve_config(&args)?;
    let selection = Selection {
        name: args.name.clone(),
        tag: args.tag.clone(),
    };
    // Fail on an unknown name before anything is started
    suite.select(&selection)?;

    let _server = if args.spawn_server {
        ServerHandle::spawn(&config.server, &config.base_url).await?
    } else {
        ServerHandle::connect(&config.base_url, config.server.startup_timeout()).await?
    };

    let api = ApiClient::login(
        &config.base_url,
        &config.username,
        &config.password,
        config.timeouts.response(),
    )
    .await?;

    let bridge = PlaywrightBridge::launch(config.playwright.clone()).await?;
    let pages = Arc::new(BridgePages::new(bridge.clone(), config.base_url.clone()));
    let output_dir = config.output_dir.clone();
    let runner = SuiteRunner::new(Arc::new(config), api, pages);

    let outcome = runner.run(&suite, &selection).await;
    if let Err(e) = bridge.shutdown().await {
        error!("Bridge shutdown failed: {}", e);
    }
    let results = outcome?;

    let path = results.write(&output_dir)?;
    info!(
        "{}/{} journeys passed, results in {}",
        results.passed,
        results.passed + results.failed,
        path.display()
    );
    Ok(results.success())
}
