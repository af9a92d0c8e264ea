use crate::cooldown::Cooldown;
use crate::metrics::{MetricsCollector, RequestMetrics};
use memescan_core::{CoreError, FetchRequest, GalleryItem, RawPost, RedditApiError};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const REDDIT_OAUTH_BASE: &str = "https://oauth.reddit.com";
pub const REDDIT_PUBLIC_BASE: &str = "https://www.reddit.com";

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Reddit never returns more than this many posts per listing page.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// Reads an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The subset of a `t3` (link) object the aggregator reads. Every field is
/// defaulted, whether absent or `null`, so a sparse record still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditPostData {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub selftext: String,
    pub author: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub subreddit: String,
    pub url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub permalink: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_utc: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub score: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub num_comments: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub over_18: bool,
    pub upvote_ratio: Option<f64>,
    pub total_awards_received: Option<u64>,
    pub is_gallery: Option<bool>,
    pub post_hint: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_video: bool,
    pub media: Option<RedditMedia>,
    pub secure_media: Option<RedditMedia>,
    pub preview: Option<RedditPreview>,
    /// Kept as raw JSON so key order survives (gallery order matters).
    pub media_metadata: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditMedia {
    pub reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditVideo {
    pub fallback_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditPreview {
    #[serde(deserialize_with = "null_as_default")]
    pub images: Vec<RedditPreviewImage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditPreviewImage {
    pub source: Option<RedditImageSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditImageSource {
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl RedditPostData {
    fn video_fallback_url(&self) -> Option<String> {
        [&self.media, &self.secure_media]
            .into_iter()
            .flatten()
            .find_map(|media| media.reddit_video.as_ref()?.fallback_url.clone())
    }

    fn preview_image_url(&self) -> Option<String> {
        self.preview
            .as_ref()?
            .images
            .first()?
            .source
            .as_ref()?
            .url
            .clone()
    }

    fn gallery_items(&self) -> Vec<GalleryItem> {
        let Some(metadata) = &self.media_metadata else {
            return Vec::new();
        };

        metadata
            .iter()
            .map(|(media_id, item)| {
                let source = item.get("s");
                let source_url = source
                    .and_then(|s| s.get("u").or_else(|| s.get("gif")))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                GalleryItem {
                    media_id: media_id.clone(),
                    source_url,
                }
            })
            .collect()
    }
}

impl From<RedditPostData> for RawPost {
    fn from(post_data: RedditPostData) -> Self {
        let video_fallback_url = post_data.video_fallback_url();
        let preview_image_url = post_data.preview_image_url();
        let gallery_items = post_data.gallery_items();

        Self {
            id: post_data.id,
            title: post_data.title,
            body: Some(post_data.selftext).filter(|text| !text.is_empty()),
            url: post_data.url.filter(|url| !url.is_empty()),
            over_18: post_data.over_18,
            score: post_data.score,
            upvote_ratio: post_data.upvote_ratio,
            num_comments: post_data.num_comments,
            total_awards: post_data.total_awards_received,
            created_utc: post_data.created_utc,
            permalink: post_data.permalink,
            author: post_data.author,
            is_gallery: post_data.is_gallery.unwrap_or(false),
            post_hint: post_data.post_hint,
            is_video: post_data.is_video,
            video_fallback_url,
            preview_image_url,
            gallery_items,
        }
    }
}

/// Turns a listing into raw posts, dropping children that are not links or
/// that fail to deserialize instead of failing the whole page.
pub fn listing_into_raw_posts(listing: RedditListing<Value>, subreddit: &str) -> Vec<RawPost> {
    let mut posts = Vec::with_capacity(listing.data.children.len());

    for child in listing.data.children {
        if child.kind != "t3" {
            debug!("Ignoring {} entry in r/{} listing", child.kind, subreddit);
            continue;
        }
        match serde_json::from_value::<RedditPostData>(child.data) {
            Ok(post_data) => posts.push(post_data.into()),
            Err(e) => warn!("Skipping malformed post in r/{}: {}", subreddit, e),
        }
    }

    posts
}

/// Maps a non-success HTTP status to the API error it stands for.
pub fn status_error(status: StatusCode, endpoint: &str, retry_after: Option<u64>) -> RedditApiError {
    match status.as_u16() {
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        429 => RedditApiError::RateLimitExceeded {
            retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::UnexpectedStatus {
            status_code: code,
            endpoint: endpoint.to_string(),
        },
    }
}

pub fn listing_endpoint(subreddit: &str, request: &FetchRequest, anonymous: bool) -> String {
    let suffix = if anonymous { ".json" } else { "" };
    format!("/r/{}/{}{}", subreddit, request.sort.as_str(), suffix)
}

/// Query for one listing page. `remaining` is how many posts are still
/// wanted; `after` is the cursor returned by the previous page.
pub fn listing_params(
    request: &FetchRequest,
    remaining: u32,
    after: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::with_capacity(3);
    params.push(("limit", remaining.min(MAX_PAGE_SIZE).to_string()));
    if let Some(after) = after {
        params.push(("after", after.to_string()));
    }
    if request.sort.supports_timeframe() {
        params.push(("t", request.timeframe.as_str().to_string()));
    }
    params
}

/// One page of a subreddit listing.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub posts: Vec<RawPost>,
    /// Children on the page before malformed and non-link entries were dropped.
    pub children: usize,
    pub after: Option<String>,
}

impl ListingPage {
    pub fn from_listing(listing: RedditListing<Value>, subreddit: &str) -> Self {
        let children = listing.data.children.len();
        let after = listing.data.after.clone().filter(|cursor| !cursor.is_empty());
        Self {
            posts: listing_into_raw_posts(listing, subreddit),
            children,
            after,
        }
    }
}

/// The cursor for the next page, or `None` once `limit` posts are collected
/// or the listing is exhausted.
pub fn next_page_cursor(limit: u32, collected: usize, page: &ListingPage) -> Option<String> {
    if collected >= limit as usize || page.children == 0 {
        return None;
    }
    page.after.clone()
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    metrics: Arc<MetricsCollector>,
    base_url: String,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String, base_url: impl Into<String>) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            metrics: Arc::new(MetricsCollector::new()),
            base_url: base_url.into(),
            user_agent,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: Option<&str>,
        query_params: &[(&str, String)],
        cooldown: Duration,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .query(query_params);
        if let Some(token) = access_token {
            request_builder = request_builder.bearer_auth(token);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let outcome = match request_builder.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Request successful: {} {}", response.status(), endpoint);
                Ok(response)
            }
            Ok(response) => {
                let status = response.status();
                error!("Request failed with status: {} for {}", status, endpoint);
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok());
                if status == StatusCode::TOO_MANY_REQUESTS {
                    warn!(
                        "Rate limited, retry after {} seconds",
                        retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                    );
                }
                Err(CoreError::RedditApi(status_error(status, endpoint, retry_after)))
            }
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    Err(CoreError::RedditApi(RedditApiError::RequestTimeout))
                } else {
                    Err(CoreError::Network(e))
                }
            }
        };

        let (status_code, rate_limited) = match &outcome {
            Ok(response) => (Some(response.status().as_u16()), false),
            Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded { .. })) => {
                (Some(429), true)
            }
            Err(_) => (None, false),
        };
        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                cooldown,
                success: outcome.is_ok(),
                rate_limited,
            })
            .await;

        outcome
    }

    pub async fn get_listing_page(
        &self,
        access_token: Option<&str>,
        subreddit: &str,
        request: &FetchRequest,
        params: &[(&str, String)],
        cooldown: Duration,
    ) -> Result<ListingPage, CoreError> {
        let endpoint = listing_endpoint(subreddit, request, access_token.is_none());

        let response = self
            .make_request(Method::GET, &endpoint, access_token, params, cooldown)
            .await
            .map_err(|e| match e {
                CoreError::RedditApi(RedditApiError::UnexpectedStatus {
                    status_code: 404, ..
                }) => CoreError::RedditApi(RedditApiError::SubredditNotFound {
                    subreddit: subreddit.to_string(),
                }),
                other => other,
            })?;

        let listing: RedditListing<Value> = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts for r/{}", subreddit),
            })
        })?;

        Ok(ListingPage::from_listing(listing, subreddit))
    }

    /// Follows the listing's `after` cursor until `request.limit` posts are
    /// collected or the listing runs out. Every page waits on `cooldown`.
    pub async fn get_subreddit_posts(
        &self,
        access_token: Option<&str>,
        subreddit: &str,
        request: &FetchRequest,
        cooldown: &Cooldown,
    ) -> Result<Vec<RawPost>, CoreError> {
        let limit = request.limit as usize;
        let mut posts: Vec<RawPost> = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let remaining = request.limit.saturating_sub(posts.len() as u32);
            let params = listing_params(request, remaining, after.as_deref());
            let permit = cooldown.acquire_permit().await;
            let page = self
                .get_listing_page(access_token, subreddit, request, &params, permit.waited)
                .await?;

            let cursor = next_page_cursor(request.limit, posts.len() + page.posts.len(), &page);
            posts.extend(page.posts);

            match cursor {
                Some(next) => {
                    debug!("r/{}: {} posts so far, next page after {}", subreddit, posts.len(), next);
                    after = Some(next);
                }
                None => break,
            }
        }

        posts.truncate(limit);
        info!("Retrieved {} posts from r/{}", posts.len(), subreddit);
        Ok(posts)
    }

    pub async fn get_metrics(&self) -> crate::metrics::ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset_metrics().await;
    }
}
