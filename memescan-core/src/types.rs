use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A post as handed over by a fetch service, before classification.
///
/// Missing upstream fields are already defaulted by the time a value of this
/// type exists; nothing downstream needs to guess.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPost {
    pub id: String,
    pub title: String,
    pub body: Option<String>,
    pub url: Option<String>,
    pub over_18: bool,
    pub score: i64,
    pub upvote_ratio: Option<f64>,
    pub num_comments: u64,
    pub total_awards: Option<u64>,
    pub created_utc: f64,
    pub permalink: String,
    pub author: Option<String>,
    pub is_gallery: bool,
    pub post_hint: Option<String>,
    pub is_video: bool,
    pub video_fallback_url: Option<String>,
    pub preview_image_url: Option<String>,
    /// Gallery items in the order the upstream metadata listed them.
    pub gallery_items: Vec<GalleryItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryItem {
    pub media_id: String,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaCategory {
    Image,
    AnimatedImage,
    Video,
    Gallery,
    Link,
}

impl MediaCategory {
    pub fn is_visual(self) -> bool {
        !matches!(self, MediaCategory::Link)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::AnimatedImage => "animated-image",
            MediaCategory::Video => "video",
            MediaCategory::Gallery => "gallery",
            MediaCategory::Link => "link",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub upvotes: u64,
    pub upvote_ratio: f64,
    pub comments: u64,
    pub awards: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPost {
    pub id: String,
    pub title: String,
    pub url: String,
    pub media_url: Option<String>,
    pub author: String,
    pub subreddit: String,
    pub created_at: DateTime<Utc>,
    pub engagement: Engagement,
    /// Uppercase, deduplicated, in order of first appearance.
    pub tickers: Vec<String>,
    pub media_type: MediaCategory,
    pub nsfw: bool,
}

impl CanonicalPost {
    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.tickers.iter().any(|t| t == ticker)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerCount {
    pub ticker: String,
    pub count: usize,
}

/// Ticker occurrence counts, highest first; ties keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerFrequencyTable {
    pub entries: Vec<TickerCount>,
}

impl TickerFrequencyTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_of(&self, ticker: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.ticker == ticker)
            .map(|entry| entry.count)
    }

    pub fn top(&self, n: usize) -> &[TickerCount] {
        &self.entries[..n.min(self.entries.len())]
    }
}
