use crate::classifier::classify;
use crate::tickers::extract_tickers;
use crate::types::{CanonicalPost, Engagement, RawPost};
use chrono::{DateTime, TimeZone, Utc};

pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

/// Converts an accepted raw post into its canonical form.
pub fn normalize(raw: &RawPost, subreddit: &str) -> CanonicalPost {
    let classification = classify(raw);

    let text = match raw.body.as_deref() {
        Some(body) if !body.is_empty() => format!("{} {}", raw.title, body),
        _ => raw.title.clone(),
    };

    CanonicalPost {
        id: raw.id.clone(),
        title: raw.title.clone(),
        url: permalink_url(&raw.permalink),
        media_url: classification.media_url,
        author: raw.author.clone().unwrap_or_default(),
        subreddit: subreddit.to_string(),
        created_at: timestamp(raw.created_utc),
        engagement: Engagement {
            upvotes: raw.score.max(0) as u64,
            upvote_ratio: raw.upvote_ratio.unwrap_or(0.0).clamp(0.0, 1.0),
            comments: raw.num_comments,
            awards: raw.total_awards.unwrap_or(0),
        },
        tickers: extract_tickers(&text),
        media_type: classification.category,
        nsfw: raw.over_18,
    }
}

fn permalink_url(permalink: &str) -> String {
    if permalink.starts_with('/') {
        format!("{}{}", REDDIT_WEB_BASE, permalink)
    } else {
        format!("{}/{}", REDDIT_WEB_BASE, permalink)
    }
}

fn timestamp(epoch_seconds: f64) -> DateTime<Utc> {
    if !epoch_seconds.is_finite() {
        return DateTime::<Utc>::default();
    }
    Utc.timestamp_opt(epoch_seconds.trunc() as i64, 0)
        .single()
        .unwrap_or_default()
}
