//! Ticker symbol extraction from free text.
//!
//! A ticker is a `$` immediately followed by one to five uppercase ASCII
//! letters and a word boundary. Anything that fits that shape counts; there
//! is no dictionary check, so `$YOLO` is as much a ticker as `$TSLA`.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static TICKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Z]{1,5})\b").expect("ticker pattern is valid"));

/// Returns the distinct tickers in `text`, without the `$`, in the order
/// they first appear.
pub fn extract_tickers(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tickers = Vec::new();

    for captures in TICKER_REGEX.captures_iter(text) {
        let Some(symbol) = captures.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if seen.insert(symbol) {
            tickers.push(symbol.to_string());
        }
    }

    tickers
}
