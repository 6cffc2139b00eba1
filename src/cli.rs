use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Serve the blog over HTTP.
    Serve,
    /// Write the listing and every post as static HTML files.
    Build,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProgressMode {
    /// Enable progress UI when stderr is a TTY.
    Auto,
    /// Always enable progress UI (even when piped).
    Always,
    /// Never show progress UI.
    Never,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Run mode: `serve` (HTTP server) or `build` (static export).
    #[arg(long, value_enum, default_value = "serve", env = "BLOG_MODE")]
    pub mode: Mode,

    /// Content API root, e.g. `https://your-repo.cdn.prismic.io/api/v2`.
    #[arg(long, env = "PRISMIC_API_ENDPOINT")]
    pub api_endpoint: Url,

    /// Access token for private repositories.
    #[arg(long, env = "PRISMIC_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Posts per listing page.
    #[arg(long, default_value_t = 2, env = "BLOG_PAGE_SIZE")]
    pub page_size: u32,

    /// Address to listen on in `serve` mode.
    #[arg(long, default_value = "127.0.0.1:3000", env = "BLOG_LISTEN")]
    pub listen: SocketAddr,

    /// Output directory for `build` mode.
    #[arg(long, default_value = "out")]
    pub out: PathBuf,

    /// Seconds before a generated post page is regenerated.
    #[arg(long, default_value_t = 1800, env = "BLOG_REVALIDATE_SECS")]
    pub revalidate_secs: u64,

    /// Timeout in seconds for each request to the content API.
    #[arg(long, default_value_t = 10, env = "BLOG_FETCH_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Listing sessions kept in memory before the oldest is closed.
    #[arg(long, default_value_t = 1024)]
    pub max_sessions: usize,

    /// Post pages (and not-found answers) kept in memory before the oldest is dropped.
    #[arg(long, default_value_t = 512)]
    pub max_cached_posts: usize,

    /// Max concurrent requests to the content API.
    #[arg(long, default_value_t = 4)]
    pub max_concurrency: usize,

    /// Site name shown in page titles and the header.
    #[arg(long, default_value = "spacetraveling")]
    pub site_name: String,

    /// HTTP User-Agent used for content API requests.
    #[arg(long, default_value = "spacetraveling/0.1")]
    pub user_agent: String,

    /// Progress display for `build`: `auto`, `always`, or `never`.
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,
}
