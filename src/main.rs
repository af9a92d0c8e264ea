use anyhow::Result;
use clap::Parser;
use memescan_core::{
    filter_by_ticker, parse_ticker_query, Aggregator, AppConfig, CoreError, ErrorReporter,
};
use reddit_client::RedditClient;
use tracing_subscriber::EnvFilter;

mod cli;
mod report;

use crate::cli::Args;
use crate::report::ScanReport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("memescan=info,memescan_core=info,reddit_client=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        if let Some(core_error) = e.downcast_ref::<CoreError>() {
            ErrorReporter::new().report_error(core_error);
        }
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path).map_err(CoreError::from)?,
        None => AppConfig::default(),
    };
    config.reddit.apply_env();
    args.apply_overrides(&mut config);
    config.validate().map_err(CoreError::from)?;
    let ticker = args.ticker.as_deref().map(parse_ticker_query).transpose()?;

    tracing::info!(
        "Scanning {} subreddit(s): {}",
        config.scan.subreddits.len(),
        config.scan.subreddits.join(", ")
    );

    let client = RedditClient::from_settings(&config.reddit)?;
    let aggregator = Aggregator::new(client, config.scan.clone())?;

    let scraped_at = chrono::Utc::now();
    let outcome = aggregator.fetch_all_with_report().await;
    for failure in &outcome.failures {
        eprintln!("[WARN] r/{} skipped: {}", failure.subreddit, failure.error);
    }

    let posts = match &ticker {
        Some(ticker) => {
            let matching = filter_by_ticker(&outcome.posts, ticker);
            tracing::info!(
                "{} of {} posts mention ${}",
                matching.len(),
                outcome.posts.len(),
                ticker
            );
            matching
        }
        None => outcome.posts,
    };

    let scan_report = ScanReport::new(posts, scraped_at);

    scan_report.write_to(args.output.as_deref(), args.pretty)?;
    if let Some(path) = &args.output {
        tracing::info!("Wrote report to {}", path.display());
    }

    let metrics = aggregator.fetcher().get_api_metrics().await;
    eprintln!("{}", scan_report.summary(args.top_tickers));
    eprintln!(
        "[METRICS] {} request(s), {} failed, average response {:?}",
        metrics.total_requests, metrics.failed_requests, metrics.average_response_time
    );

    Ok(())
}
