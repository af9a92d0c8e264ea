//! Media classification for raw posts.
//!
//! Category and media URL are resolved independently, each by an ordered
//! list of rules where the first match wins. Rule order matters: a gallery
//! that links a `.jpg` is still a gallery, and a post hinted as `image` stays
//! an image even when its URL ends in `.mp4`.

use crate::types::{MediaCategory, RawPost};
use url::Url;

const ANIMATED_EXTENSIONS: &[&str] = &[".gif", ".gifv"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];
const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov"];

const IMAGE_HOSTS: &[&str] = &["i.redd.it", "i.imgur.com", "preview.redd.it"];
const VIDEO_HOSTS: &[&str] = &["v.redd.it", "gfycat.com", "redgifs.com", "streamable.com"];

const HINT_IMAGE: &str = "image";
const VIDEO_HINTS: &[&str] = &["hosted:video", "rich:video"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: MediaCategory,
    pub media_url: Option<String>,
}

impl Classification {
    pub fn has_visual_content(&self) -> bool {
        self.category.is_visual()
    }
}

pub fn classify(post: &RawPost) -> Classification {
    Classification {
        category: media_category(post),
        media_url: media_url(post),
    }
}

pub fn has_visual_content(post: &RawPost) -> bool {
    media_category(post).is_visual()
}

pub fn media_category(post: &RawPost) -> MediaCategory {
    if post.is_gallery {
        return MediaCategory::Gallery;
    }

    match post.post_hint.as_deref() {
        Some(HINT_IMAGE) => return MediaCategory::Image,
        Some(hint) if VIDEO_HINTS.contains(&hint) => return MediaCategory::Video,
        _ => {}
    }

    let Some(raw_url) = post.url.as_deref() else {
        return MediaCategory::Link;
    };
    let parsed = Url::parse(raw_url).ok();

    let path = parsed
        .as_ref()
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|| raw_url.to_ascii_lowercase());

    if ends_with_any(&path, ANIMATED_EXTENSIONS) {
        return MediaCategory::AnimatedImage;
    }
    if ends_with_any(&path, IMAGE_EXTENSIONS) {
        return MediaCategory::Image;
    }
    if ends_with_any(&path, VIDEO_EXTENSIONS) {
        return MediaCategory::Video;
    }

    // Scheme-less or otherwise unparsable URLs are matched as a whole.
    let host = parsed
        .as_ref()
        .and_then(|u| u.host_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| raw_url.to_ascii_lowercase());
    if contains_any(&host, IMAGE_HOSTS) {
        return MediaCategory::Image;
    }
    if contains_any(&host, VIDEO_HOSTS) {
        return MediaCategory::Video;
    }

    MediaCategory::Link
}

pub fn media_url(post: &RawPost) -> Option<String> {
    if let Some(url) = post.url.as_deref().filter(|u| !u.is_empty()) {
        if post.post_hint.as_deref() == Some(HINT_IMAGE) || post.is_video {
            return Some(url.to_string());
        }
    }

    if let Some(fallback) = &post.video_fallback_url {
        return Some(fallback.clone());
    }

    if let Some(preview) = &post.preview_image_url {
        return Some(unescape_amp(preview));
    }

    if post.is_gallery {
        return post
            .gallery_items
            .first()
            .and_then(|item| item.source_url.as_deref())
            .map(unescape_amp);
    }

    None
}

/// Reddit HTML-escapes `&` in preview and gallery URLs.
fn unescape_amp(url: &str) -> String {
    url.replace("&amp;", "&")
}

fn ends_with_any(path: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| path.ends_with(suffix))
}

fn contains_any(host: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| host.contains(marker))
}
