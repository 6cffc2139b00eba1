mod builtin;
mod cli;
pub mod config;
pub mod date;
pub mod detail_cache;
pub mod document;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod html;
pub mod normalize;
pub mod pagination;
pub mod prismic;
pub mod progress;
pub mod reading_time;
pub mod richtext;
pub mod server;
pub mod sessions;

use anyhow::Context as _;

pub use cli::{Args as CliArgs, Mode, ProgressMode};
pub use error::{Error, Result};

use config::SiteConfig;
use fetcher::Fetcher;
use prismic::PrismicClient;

pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    use std::io::IsTerminal as _;

    let config = SiteConfig::from_args(&args).context("invalid configuration")?;

    let progress_enabled = matches!(args.mode, Mode::Build)
        && match args.progress {
            ProgressMode::Always => true,
            ProgressMode::Never => false,
            ProgressMode::Auto => std::io::stderr().is_terminal(),
        };
    let progress = progress::Progress::new(progress_enabled);

    let fetcher = Fetcher::new(
        &args.user_agent,
        config.fetch_timeout,
        args.max_concurrency,
        progress_enabled.then(|| progress.clone()),
    )?;
    let client = PrismicClient::new(fetcher, args.api_endpoint.clone(), args.access_token.clone());

    tracing::info!(
        endpoint = %client.endpoint(),
        page_size = config.page_size,
        mode = ?args.mode,
        "content api configured"
    );

    match args.mode {
        Mode::Serve => {
            let state = server::AppState::new(client, config);
            server::serve(state, args.listen).await
        }
        Mode::Build => {
            let res = export::export_site(&client, &config, &args.out, progress.clone()).await;
            progress.finish();
            let summary = res?;
            tracing::info!(
                listing_pages = summary.listing_pages,
                posts = summary.posts,
                "wrote {}",
                args.out.display()
            );
            Ok(())
        }
    }
}
