use clap::Parser;
use memescan_core::{AppConfig, ListingSort, Timeframe};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Collect image and video posts from finance subreddits and rank the tickers they mention"
)]
pub struct Args {
    /// TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Subreddit to scan; repeat for several. Replaces the configured list.
    #[arg(long = "subreddit", short = 's')]
    pub subreddits: Vec<String>,

    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long)]
    pub min_upvotes: Option<u64>,

    #[arg(long)]
    pub min_comments: Option<u64>,

    /// hour, day, week, month, year or all (only applies to --sort top)
    #[arg(long)]
    pub timeframe: Option<Timeframe>,

    /// hot, new, top or rising
    #[arg(long)]
    pub sort: Option<ListingSort>,

    #[arg(long, default_value_t = false)]
    pub include_nsfw: bool,

    /// Only keep posts mentioning this ticker
    #[arg(long)]
    pub ticker: Option<String>,

    #[arg(long, default_value_t = 10)]
    pub top_tickers: usize,

    /// Write the JSON report here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Milliseconds to wait between Reddit requests
    #[arg(long)]
    pub cooldown_ms: Option<u64>,
}

impl Args {
    /// Layers command line values over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if !self.subreddits.is_empty() {
            config.scan.subreddits = self.subreddits.clone();
        }
        if let Some(limit) = self.limit {
            config.scan.limit = limit;
        }
        if let Some(min_upvotes) = self.min_upvotes {
            config.scan.min_upvotes = min_upvotes;
        }
        if let Some(min_comments) = self.min_comments {
            config.scan.min_comments = min_comments;
        }
        if let Some(timeframe) = self.timeframe {
            config.scan.timeframe = timeframe;
        }
        if let Some(sort) = self.sort {
            config.scan.sort = sort;
        }
        if self.include_nsfw {
            config.scan.include_nsfw = true;
        }
        if let Some(cooldown_ms) = self.cooldown_ms {
            config.reddit.cooldown_ms = cooldown_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_configured_values() {
        let args = Args::parse_from([
            "memescan",
            "-s",
            "stocks",
            "--subreddit",
            "options",
            "--limit",
            "50",
            "--sort",
            "top",
            "--timeframe",
            "week",
            "--include-nsfw",
        ]);
        let mut config = AppConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.scan.subreddits, vec!["stocks", "options"]);
        assert_eq!(config.scan.limit, 50);
        assert_eq!(config.scan.sort, ListingSort::Top);
        assert_eq!(config.scan.timeframe, Timeframe::Week);
        assert!(config.scan.include_nsfw);
        assert_eq!(config.scan.min_upvotes, 0);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["memescan"]);
        let mut config = AppConfig::default();
        config.scan.min_comments = 7;
        args.apply_overrides(&mut config);

        assert_eq!(config, {
            let mut expected = AppConfig::default();
            expected.scan.min_comments = 7;
            expected
        });
        assert_eq!(args.top_tickers, 10);
    }

    #[test]
    fn test_invalid_sort_rejected() {
        assert!(Args::try_parse_from(["memescan", "--sort", "best"]).is_err());
    }
}
