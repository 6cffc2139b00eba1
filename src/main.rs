use clap::Parser as _;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = spacetraveling::CliArgs::parse();
    if let Err(e) = spacetraveling::run(args).await {
        tracing::error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
