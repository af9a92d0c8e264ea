//! Cross-subreddit aggregation.
//!
//! Subreddits are fetched strictly one after another, never concurrently:
//! Reddit's abuse detection flags request bursts.

use crate::config::AggregatorConfig;
use crate::error::CoreError;
use crate::error_utils::ErrorExt;
use crate::fetch::{FetchRequest, FetchService};
use crate::filter::inclusion_verdict;
use crate::normalizer::normalize;
use crate::types::{CanonicalPost, TickerCount, TickerFrequencyTable};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct SourceFailure {
    pub subreddit: String,
    pub error: CoreError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub subreddit: String,
    pub fetched: usize,
    pub accepted: usize,
}

impl SourceSummary {
    pub fn rejected(&self) -> usize {
        self.fetched - self.accepted
    }
}

#[derive(Debug, Default)]
pub struct AggregationReport {
    /// Accepted posts, highest upvote count first.
    pub posts: Vec<CanonicalPost>,
    pub sources: Vec<SourceSummary>,
    pub failures: Vec<SourceFailure>,
}

impl AggregationReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct Aggregator<F> {
    fetcher: F,
    config: AggregatorConfig,
}

impl<F: FetchService> Aggregator<F> {
    /// Fails with a configuration error before anything is fetched.
    pub fn new(fetcher: F, config: AggregatorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        if !config.sort.supports_timeframe() {
            debug!(
                "Timeframe '{}' has no effect on the '{}' listing",
                config.timeframe, config.sort
            );
        }
        Ok(Self { fetcher, config })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn fetch_all(&self) -> Vec<CanonicalPost> {
        self.fetch_all_with_report().await.posts
    }

    pub async fn fetch_all_with_report(&self) -> AggregationReport {
        let request = FetchRequest::from(&self.config);
        let mut report = AggregationReport::default();

        for subreddit in &self.config.subreddits {
            let raw_posts = match self.fetcher.fetch(subreddit, &request).await {
                Ok(raw_posts) => raw_posts,
                Err(error) => {
                    warn!(
                        "Skipping r/{} after fetch failure via {} [{}]: {}",
                        subreddit,
                        self.fetcher.name(),
                        error.error_code(),
                        error
                    );
                    report.failures.push(SourceFailure {
                        subreddit: subreddit.clone(),
                        error,
                    });
                    continue;
                }
            };

            let fetched = raw_posts.len();
            let mut accepted = 0;
            for raw in &raw_posts {
                match inclusion_verdict(raw, &self.config) {
                    Ok(()) => {
                        report.posts.push(normalize(raw, subreddit));
                        accepted += 1;
                    }
                    Err(rejection) => {
                        debug!("Dropped post {} from r/{}: {}", raw.id, subreddit, rejection);
                    }
                }
            }

            info!(
                "r/{}: kept {} of {} fetched posts",
                subreddit, accepted, fetched
            );
            report.sources.push(SourceSummary {
                subreddit: subreddit.clone(),
                fetched,
                accepted,
            });
        }

        // `sort_by` is stable, so equal scores keep fetch order.
        report
            .posts
            .sort_by(|a, b| b.engagement.upvotes.cmp(&a.engagement.upvotes));

        info!(
            "Aggregated {} posts from {} subreddits ({} failed)",
            report.posts.len(),
            report.sources.len(),
            report.failures.len()
        );
        report
    }
}

/// Counts ticker mentions across `posts`. Each post contributes at most one
/// mention per ticker.
pub fn compute_ticker_frequency(posts: &[CanonicalPost]) -> TickerFrequencyTable {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<TickerCount> = Vec::new();

    for ticker in posts.iter().flat_map(|post| post.tickers.iter()) {
        match positions.get(ticker.as_str()) {
            Some(&index) => entries[index].count += 1,
            None => {
                positions.insert(ticker.as_str(), entries.len());
                entries.push(TickerCount {
                    ticker: ticker.clone(),
                    count: 1,
                });
            }
        }
    }

    entries.sort_by(|a, b| b.count.cmp(&a.count));
    TickerFrequencyTable { entries }
}

fn ticker_symbol(query: &str) -> String {
    query.trim().trim_start_matches('$').to_ascii_uppercase()
}

/// Checks a user-supplied ticker query and returns the symbol it names.
pub fn parse_ticker_query(query: &str) -> Result<String, CoreError> {
    let symbol = ticker_symbol(query);
    if symbol.is_empty() || symbol.len() > 5 || !symbol.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(CoreError::InvalidInput {
            message: format!("'{}' is not a ticker symbol (1-5 letters)", query.trim()),
        });
    }
    Ok(symbol)
}

/// Posts tagged with `ticker`; the query is matched case-insensitively and
/// may carry a leading `$`.
pub fn filter_by_ticker(posts: &[CanonicalPost], ticker: &str) -> Vec<CanonicalPost> {
    let wanted = ticker_symbol(ticker);
    posts
        .iter()
        .filter(|post| post.has_ticker(&wanted))
        .cloned()
        .collect()
}
