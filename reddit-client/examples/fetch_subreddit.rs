use memescan_core::{classifier, FetchRequest, FetchService, ListingSort, Timeframe};
use reddit_client::cooldown::CooldownConfig;
use reddit_client::RedditClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let subreddit = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wallstreetbets".to_string());

    let client = RedditClient::anonymous(
        "memescan-example/0.1".to_string(),
        CooldownConfig::default(),
    )?;
    let request = FetchRequest {
        limit: 10,
        sort: ListingSort::Hot,
        timeframe: Timeframe::Day,
    };

    let posts = client.fetch(&subreddit, &request).await?;
    println!("Fetched {} posts from r/{}\n", posts.len(), subreddit);

    for post in &posts {
        let classification = classifier::classify(post);
        println!(
            "[{:>14}] {:>6} ⬆  {}",
            classification.category.as_str(),
            post.score,
            post.title
        );
        if let Some(media_url) = classification.media_url {
            println!("                 {}", media_url);
        }
    }

    let metrics = client.get_api_metrics().await;
    println!(
        "\n{} request(s), average response time {:?}",
        metrics.total_requests, metrics.average_response_time
    );

    Ok(())
}
