use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::query::QueryConfig;
use crate::users::DateFormat;

/// Command-line configuration. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "roster", version, about = "Terminal admin dashboard for user records")]
pub struct Config {
    /// Base URL of the users API.
    #[arg(long, env = "ROSTER_API_URL", default_value = "http://localhost:3000/api")]
    pub api_url: String,

    /// Users per page; must match the server's page size.
    #[arg(long, env = "ROSTER_PAGE_SIZE", default_value = "10")]
    pub page_size: NonZeroU32,

    /// Redraws per second.
    #[arg(long, env = "ROSTER_FRAME_RATE", default_value_t = 30)]
    pub frame_rate: u32,

    /// Seconds before cached pages go stale on their own. Unset: only writes
    /// make them stale.
    #[arg(long, env = "ROSTER_STALE_SECS")]
    pub stale_secs: Option<u64>,

    /// Seconds a cached page is kept before it may be dropped.
    #[arg(long, env = "ROSTER_CACHE_SECS", default_value_t = 300)]
    pub cache_secs: u64,

    /// Artificial delay before each create-user submission, in milliseconds.
    #[arg(long, env = "ROSTER_SUBMIT_DELAY_MS", default_value_t = 0)]
    pub submit_delay_ms: u64,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "ROSTER_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// `strftime` pattern for creation dates.
    #[arg(long, env = "ROSTER_DATE_FORMAT", default_value = "%d/%m/%Y", value_parser = DateFormat::parse)]
    pub date_format: DateFormat,

    /// Name shown in the header.
    #[arg(long, env = "ROSTER_PROFILE_NAME", default_value = "Admin")]
    pub profile_name: String,

    /// Where logs go; the terminal belongs to the UI.
    #[arg(long, env = "ROSTER_LOG_FILE", default_value = "roster.log")]
    pub log_file: PathBuf,
}

impl Config {
    #[must_use]
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig::new(
            self.stale_secs.map(Duration::from_secs),
            Duration::from_secs(self.cache_secs),
        )
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }
}
