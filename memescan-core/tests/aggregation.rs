use async_trait::async_trait;
use memescan_core::{
    compute_ticker_frequency, filter_by_ticker, parse_ticker_query, Aggregator, AggregatorConfig,
    CanonicalPost, ConfigError, CoreError, Engagement, FetchRequest, FetchService, ListingSort,
    MediaCategory, RawPost, RedditApiError, Timeframe,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct FakeFetcher {
    responses: HashMap<String, Vec<RawPost>>,
    failing: Vec<String>,
    calls: Mutex<Vec<(String, FetchRequest)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    fn with_posts(mut self, subreddit: &str, posts: Vec<RawPost>) -> Self {
        self.responses.insert(subreddit.to_string(), posts);
        self
    }

    fn failing_on(mut self, subreddit: &str) -> Self {
        self.failing.push(subreddit.to_string());
        self
    }

    fn called_subreddits(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }
}

#[async_trait]
impl FetchService for FakeFetcher {
    async fn fetch(
        &self,
        subreddit: &str,
        request: &FetchRequest,
    ) -> Result<Vec<RawPost>, CoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((subreddit.to_string(), *request));
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|s| s == subreddit) {
            return Err(CoreError::RedditApi(RedditApiError::Forbidden {
                resource: format!("/r/{}/hot", subreddit),
            }));
        }
        Ok(self.responses.get(subreddit).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

fn image(id: &str, score: i64, title: &str) -> RawPost {
    RawPost {
        id: id.to_string(),
        title: title.to_string(),
        url: Some(format!("https://i.redd.it/{}.png", id)),
        score,
        num_comments: 10,
        permalink: format!("/r/test/comments/{}/", id),
        author: Some("poster".to_string()),
        ..Default::default()
    }
}

fn config(subreddits: &[&str]) -> AggregatorConfig {
    AggregatorConfig {
        subreddits: subreddits.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn canonical(id: &str, tickers: &[&str]) -> CanonicalPost {
    CanonicalPost {
        id: id.to_string(),
        title: String::new(),
        url: String::new(),
        media_url: None,
        author: String::new(),
        subreddit: "test".to_string(),
        created_at: Default::default(),
        engagement: Engagement {
            upvotes: 1,
            upvote_ratio: 1.0,
            comments: 0,
            awards: 0,
        },
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        media_type: MediaCategory::Image,
        nsfw: false,
    }
}

#[tokio::test]
async fn test_partial_failure_keeps_other_sources() {
    let fetcher = FakeFetcher::default().failing_on("a").with_posts(
        "b",
        vec![image("b1", 30, ""), image("b2", 20, ""), image("b3", 10, "")],
    );
    let aggregator = Aggregator::new(fetcher, config(&["a", "b"])).unwrap();

    let report = aggregator.fetch_all_with_report().await;

    assert_eq!(report.posts.len(), 3);
    assert!(report.is_partial());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subreddit, "a");
    assert!(matches!(
        report.failures[0].error,
        CoreError::RedditApi(RedditApiError::Forbidden { .. })
    ));
    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].accepted, 3);
}

#[tokio::test]
async fn test_sort_is_descending_and_stable() {
    let fetcher = FakeFetcher::default()
        .with_posts("a", vec![image("a1", 50, ""), image("a2", 100, "")])
        .with_posts("b", vec![image("b1", 50, ""), image("b2", 75, "")]);
    let aggregator = Aggregator::new(fetcher, config(&["a", "b"])).unwrap();

    let posts = aggregator.fetch_all().await;
    let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();

    assert_eq!(ids, vec!["a2", "b2", "a1", "b1"]);
}

#[tokio::test]
async fn test_filter_and_normalize_applied() {
    let text_post = RawPost {
        id: "text".to_string(),
        url: Some("https://www.reddit.com/r/a/comments/text/".to_string()),
        score: 1_000,
        ..Default::default()
    };
    let nsfw = RawPost {
        over_18: true,
        ..image("nsfw", 1_000, "")
    };
    let weak = image("weak", 2, "$GME");
    let good = image("good", 500, "$GME and $PLTR");

    let fetcher =
        FakeFetcher::default().with_posts("a", vec![text_post, nsfw, weak, good]);
    let cfg = AggregatorConfig {
        min_upvotes: 10,
        ..config(&["a"])
    };
    let aggregator = Aggregator::new(fetcher, cfg).unwrap();

    let report = aggregator.fetch_all_with_report().await;

    assert_eq!(report.posts.len(), 1);
    let post = &report.posts[0];
    assert_eq!(post.id, "good");
    assert_eq!(post.subreddit, "a");
    assert_eq!(post.tickers, vec!["GME", "PLTR"]);
    assert_eq!(report.sources[0].fetched, 4);
    assert_eq!(report.sources[0].rejected(), 3);
}

#[tokio::test]
async fn test_sources_fetched_sequentially_in_config_order() {
    let fetcher = FakeFetcher::default()
        .with_posts("c", vec![image("c1", 1, "")])
        .with_posts("a", vec![image("a1", 1, "")]);
    let cfg = AggregatorConfig {
        limit: 42,
        sort: ListingSort::Top,
        timeframe: Timeframe::Week,
        ..config(&["c", "b", "a"])
    };
    let aggregator = Aggregator::new(fetcher, cfg).unwrap();

    aggregator.fetch_all().await;

    let fetcher = aggregator.fetcher();
    assert_eq!(fetcher.called_subreddits(), vec!["c", "b", "a"]);
    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);

    let calls = fetcher.calls.lock().unwrap();
    assert!(calls.iter().all(|(_, request)| *request
        == FetchRequest {
            limit: 42,
            sort: ListingSort::Top,
            timeframe: Timeframe::Week,
        }));
}

#[test]
fn test_empty_sources_rejected_before_fetching() {
    let result = Aggregator::new(FakeFetcher::default(), config(&[]));

    match result {
        Err(CoreError::Config(ConfigError::ValidationFailed { .. })) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a configuration error"),
    }
}

#[test]
fn test_fetch_all_with_tokio_test_runtime() {
    let fetcher = FakeFetcher::default().with_posts("a", vec![image("a1", 5, "$SPY")]);
    let aggregator = Aggregator::new(fetcher, config(&["a"])).unwrap();

    let posts = tokio_test::block_on(aggregator.fetch_all());

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].tickers, vec!["SPY"]);
}

#[test]
fn test_ticker_frequency_counts_and_order() {
    let posts = vec![canonical("1", &["SPY", "TSLA"]), canonical("2", &["SPY"])];

    let table = compute_ticker_frequency(&posts);
    let pairs: Vec<_> = table
        .entries
        .iter()
        .map(|e| (e.ticker.as_str(), e.count))
        .collect();

    assert_eq!(pairs, vec![("SPY", 2), ("TSLA", 1)]);
}

#[test]
fn test_ticker_frequency_ties_keep_first_occurrence() {
    let posts = vec![
        canonical("1", &["AMC", "BB"]),
        canonical("2", &["NOK", "GME"]),
        canonical("3", &["GME"]),
    ];

    let table = compute_ticker_frequency(&posts);
    let order: Vec<_> = table.entries.iter().map(|e| e.ticker.as_str()).collect();

    assert_eq!(order, vec!["GME", "AMC", "BB", "NOK"]);
    assert_eq!(table.count_of("GME"), Some(2));
    assert_eq!(table.top(2).len(), 2);
    assert!(compute_ticker_frequency(&[]).is_empty());
}

#[test]
fn test_filter_by_ticker_case_insensitive() {
    let posts = vec![
        canonical("1", &["SPY", "TSLA"]),
        canonical("2", &["QQQ"]),
        canonical("3", &["SPY"]),
    ];

    let ids = |matched: Vec<CanonicalPost>| -> Vec<String> {
        matched.into_iter().map(|p| p.id).collect()
    };

    assert_eq!(ids(filter_by_ticker(&posts, "spy")), vec!["1", "3"]);
    assert_eq!(ids(filter_by_ticker(&posts, "$Tsla")), vec!["1"]);
    assert!(filter_by_ticker(&posts, "SP").is_empty());
}

#[tokio::test]
async fn test_limit_beyond_one_page_reaches_fetcher() {
    let posts: Vec<RawPost> = (0..250)
        .map(|i| image(&format!("p{}", i), 250 - i, ""))
        .collect();
    let fetcher = FakeFetcher::default().with_posts("wallstreetbets", posts);
    let scan = AggregatorConfig {
        limit: 250,
        ..config(&["wallstreetbets"])
    };
    let aggregator = Aggregator::new(fetcher, scan).unwrap();

    let collected = aggregator.fetch_all().await;
    assert_eq!(collected.len(), 250);

    let calls = aggregator.fetcher().calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.limit, 250);
}

#[test]
fn test_ticker_query_validation() {
    assert_eq!(parse_ticker_query(" $gme ").unwrap(), "GME");
    assert_eq!(parse_ticker_query("TSLA").unwrap(), "TSLA");

    for bad in ["", "$", "   ", "TOOLONG", "BRK.B", "A1"] {
        match parse_ticker_query(bad) {
            Err(CoreError::InvalidInput { message }) => assert!(message.contains("ticker")),
            other => panic!("Expected InvalidInput for {:?}, got {:?}", bad, other),
        }
    }
}
