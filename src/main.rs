use std::fs::File;
use std::sync::{Arc, Mutex};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster::api::HttpUsersApi;
use roster::config::Config;
use roster::dashboard::{Dashboard, DashboardFlags};
use roster::query::QueryClient;
use roster::runtime::Runtime;
use roster::users::UsersService;

fn init_tracing(config: &Config) -> Result<()> {
    let file = File::create(&config.log_file)
        .wrap_err_with(|| format!("cannot open log file {}", config.log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Config::parse();
    init_tracing(&config)?;

    tracing::info!(api_url = %config.api_url, page_size = config.page_size.get(), "starting");

    let api = HttpUsersApi::new(config.api_url.clone(), config.request_timeout())?;
    let client = Arc::new(QueryClient::with_config(config.query_config()));
    let users = UsersService::new(Arc::new(api), client)
        .with_date_format(config.date_format.clone())
        .with_submit_delay(config.submit_delay());

    let flags = DashboardFlags {
        users,
        page_size: config.page_size,
        profile_name: config.profile_name.clone(),
        api_url: config.api_url.clone(),
    };

    let mut terminal = ratatui::init();
    let result = Runtime::<Dashboard>::new(flags)
        .run(&mut terminal, config.frame_rate)
        .await;
    ratatui::restore();

    if let Err(e) = &result {
        tracing::error!(error = %e, "dashboard exited with an error");
    }
    result
}
