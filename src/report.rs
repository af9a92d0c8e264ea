use chrono::{DateTime, Utc};
use memescan_core::{compute_ticker_frequency, CanonicalPost, CoreError, TickerFrequencyTable};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// The JSON document written at the end of a scan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub scraped_at: DateTime<Utc>,
    pub total_memes: usize,
    pub memes: Vec<CanonicalPost>,
    pub trending_tickers: TickerFrequencyTable,
}

impl ScanReport {
    pub fn new(posts: Vec<CanonicalPost>, scraped_at: DateTime<Utc>) -> Self {
        let trending_tickers = compute_ticker_frequency(&posts);
        Self {
            scraped_at,
            total_memes: posts.len(),
            memes: posts,
            trending_tickers,
        }
    }

    pub fn write_json<W: Write>(&self, writer: W, pretty: bool) -> serde_json::Result<()> {
        if pretty {
            serde_json::to_writer_pretty(writer, self)
        } else {
            serde_json::to_writer(writer, self)
        }
    }

    /// Writes the report to `path`, or to stdout when no path is given.
    pub fn write_to(&self, path: Option<&Path>, pretty: bool) -> Result<(), CoreError> {
        match path {
            Some(path) => {
                let mut writer = BufWriter::new(File::create(path)?);
                self.write_json(&mut writer, pretty)?;
                writer.flush()?;
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                self.write_json(&mut stdout, pretty)?;
                writeln!(stdout)?;
            }
        }
        Ok(())
    }

    pub fn summary(&self, top_tickers: usize) -> String {
        let mut lines = vec![format!("Collected {} posts", self.total_memes)];

        if self.trending_tickers.is_empty() {
            lines.push("No tickers mentioned".to_string());
        } else {
            lines.push("Trending tickers:".to_string());
            for (rank, entry) in self.trending_tickers.top(top_tickers).iter().enumerate() {
                lines.push(format!("{:>3}. ${:<6}{:>4}", rank + 1, entry.ticker, entry.count));
            }
        }

        if let Some(best) = self.memes.first() {
            lines.push(format!(
                "Top post: {} ({} upvotes, r/{})",
                best.title, best.engagement.upvotes, best.subreddit
            ));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memescan_core::{Engagement, MediaCategory};

    fn post(id: &str, upvotes: u64, tickers: &[&str]) -> CanonicalPost {
        CanonicalPost {
            id: id.to_string(),
            title: format!("post {}", id),
            url: format!("https://www.reddit.com/r/wsb/comments/{}/", id),
            media_url: Some(format!("https://i.redd.it/{}.png", id)),
            author: "someone".to_string(),
            subreddit: "wallstreetbets".to_string(),
            created_at: DateTime::<Utc>::default(),
            engagement: Engagement {
                upvotes,
                upvote_ratio: 0.9,
                comments: 4,
                awards: 0,
            },
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            media_type: MediaCategory::AnimatedImage,
            nsfw: false,
        }
    }

    #[test]
    fn test_report_json_shape() {
        let report = ScanReport::new(
            vec![post("a", 10, &["SPY", "TSLA"]), post("b", 5, &["SPY"])],
            DateTime::<Utc>::default(),
        );

        let mut buffer = Vec::new();
        report.write_json(&mut buffer, false).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(json["totalMemes"], 2);
        assert!(json["scrapedAt"].is_string());
        assert_eq!(json["memes"][0]["mediaType"], "animated-image");
        assert_eq!(json["memes"][0]["mediaUrl"], "https://i.redd.it/a.png");
        assert_eq!(json["memes"][0]["engagement"]["upvoteRatio"], 0.9);
        assert_eq!(json["trendingTickers"][0]["ticker"], "SPY");
        assert_eq!(json["trendingTickers"][0]["count"], 2);
        assert_eq!(json["trendingTickers"][1]["ticker"], "TSLA");
    }

    #[test]
    fn test_summary_lists_top_tickers() {
        let report = ScanReport::new(
            vec![post("a", 10, &["GME", "AMC"]), post("b", 5, &["GME"])],
            DateTime::<Utc>::default(),
        );

        let summary = report.summary(1);
        assert!(summary.contains("Collected 2 posts"));
        assert!(summary.contains("$GME"));
        assert!(!summary.contains("$AMC"));
        assert!(summary.contains("Top post: post a"));
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join(format!("memescan-report-{}.json", std::process::id()));
        let report = ScanReport::new(vec![post("a", 10, &["SPY"])], DateTime::<Utc>::default());

        report.write_to(Some(&path), true).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(written["totalMemes"], 1);
    }

    #[test]
    fn test_write_to_missing_directory_is_io_error() {
        let path = std::env::temp_dir()
            .join("memescan-missing-dir")
            .join("nested")
            .join("report.json");
        let report = ScanReport::new(Vec::new(), DateTime::<Utc>::default());

        assert!(matches!(
            report.write_to(Some(&path), false),
            Err(CoreError::Io(_))
        ));
    }

    #[test]
    fn test_summary_without_tickers() {
        let report = ScanReport::new(Vec::new(), DateTime::<Utc>::default());
        assert!(report.summary(5).contains("No tickers mentioned"));
    }
}
