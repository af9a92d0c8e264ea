use crate::classifier::has_visual_content;
use crate::config::AggregatorConfig;
use crate::types::RawPost;
use std::fmt;

/// Why a raw post was left out of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoVisualContent,
    Nsfw,
    TooFewUpvotes { score: i64, required: u64 },
    TooFewComments { comments: u64, required: u64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoVisualContent => write!(f, "no visual content"),
            Rejection::Nsfw => write!(f, "nsfw content excluded"),
            Rejection::TooFewUpvotes { score, required } => {
                write!(f, "score {} below minimum {}", score, required)
            }
            Rejection::TooFewComments { comments, required } => {
                write!(f, "{} comments below minimum {}", comments, required)
            }
        }
    }
}

/// Returns the first reason `post` fails the configured thresholds, if any.
pub fn inclusion_verdict(post: &RawPost, config: &AggregatorConfig) -> Result<(), Rejection> {
    if !has_visual_content(post) {
        return Err(Rejection::NoVisualContent);
    }
    if post.over_18 && !config.include_nsfw {
        return Err(Rejection::Nsfw);
    }
    if post.score < 0 || (post.score as u64) < config.min_upvotes {
        return Err(Rejection::TooFewUpvotes {
            score: post.score,
            required: config.min_upvotes,
        });
    }
    if post.num_comments < config.min_comments {
        return Err(Rejection::TooFewComments {
            comments: post.num_comments,
            required: config.min_comments,
        });
    }
    Ok(())
}

pub fn should_include(post: &RawPost, config: &AggregatorConfig) -> bool {
    inclusion_verdict(post, config).is_ok()
}
