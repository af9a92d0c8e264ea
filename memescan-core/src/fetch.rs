use crate::config::{AggregatorConfig, ListingSort, Timeframe};
use crate::error::CoreError;
use crate::types::RawPost;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub limit: u32,
    pub sort: ListingSort,
    pub timeframe: Timeframe,
}

impl From<&AggregatorConfig> for FetchRequest {
    fn from(config: &AggregatorConfig) -> Self {
        Self {
            limit: config.limit,
            sort: config.sort,
            timeframe: config.timeframe,
        }
    }
}

/// Source of raw posts for one subreddit at a time.
///
/// Implementations own authentication, transport and any pause between
/// requests. Callers issue one fetch at a time and wait for it to finish.
#[async_trait]
pub trait FetchService: Send + Sync {
    async fn fetch(&self, subreddit: &str, request: &FetchRequest)
        -> Result<Vec<RawPost>, CoreError>;

    fn name(&self) -> &str;
}
