use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Hour,
    #[default]
    Day,
    Week,
    Month,
    Year,
    All,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
            Timeframe::All => "all",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hour" => Ok(Timeframe::Hour),
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "year" => Ok(Timeframe::Year),
            "all" => Ok(Timeframe::All),
            other => Err(ConfigError::InvalidValue {
                field: "timeframe".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSort {
    #[default]
    Hot,
    New,
    Top,
    Rising,
}

impl ListingSort {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingSort::Hot => "hot",
            ListingSort::New => "new",
            ListingSort::Top => "top",
            ListingSort::Rising => "rising",
        }
    }

    /// Only the `top` listing accepts a time window upstream.
    pub fn supports_timeframe(self) -> bool {
        matches!(self, ListingSort::Top)
    }
}

impl fmt::Display for ListingSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingSort {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hot" => Ok(ListingSort::Hot),
            "new" => Ok(ListingSort::New),
            "top" => Ok(ListingSort::Top),
            "rising" => Ok(ListingSort::Rising),
            other => Err(ConfigError::InvalidValue {
                field: "sort".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// What to fetch and which posts to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub subreddits: Vec<String>,
    pub min_upvotes: u64,
    pub min_comments: u64,
    pub timeframe: Timeframe,
    pub sort: ListingSort,
    pub limit: u32,
    pub include_nsfw: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            subreddits: vec!["wallstreetbets".to_string()],
            min_upvotes: 0,
            min_comments: 0,
            timeframe: Timeframe::Day,
            sort: ListingSort::Hot,
            limit: 25,
            include_nsfw: false,
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subreddits.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one subreddit must be configured".to_string(),
            });
        }
        if let Some(blank) = self.subreddits.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "subreddits".to_string(),
                value: format!("{:?}", blank),
            });
        }
        if self.limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limit".to_string(),
                value: self.limit.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: String,
    /// Minimum pause between two upstream requests.
    pub cooldown_ms: u64,
    /// Random extra pause on top of `cooldown_ms`, up to this bound.
    pub cooldown_jitter_ms: u64,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            user_agent: concat!("memescan/", env!("CARGO_PKG_VERSION")).to_string(),
            cooldown_ms: 2000,
            cooldown_jitter_ms: 0,
        }
    }
}

impl RedditSettings {
    /// True when enough is configured for the password grant.
    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some()
            && self.client_secret.is_some()
            && self.username.is_some()
            && self.password.is_some()
    }

    /// Fills unset credentials from `REDDIT_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                *slot = lookup(key).filter(|v| !v.is_empty());
            }
        };
        fill(&mut self.client_id, "REDDIT_CLIENT_ID");
        fill(&mut self.client_secret, "REDDIT_CLIENT_SECRET");
        fill(&mut self.username, "REDDIT_USERNAME");
        fill(&mut self.password, "REDDIT_PASSWORD");
        if let Some(agent) = lookup("REDDIT_USER_AGENT").filter(|v| !v.is_empty()) {
            self.user_agent = agent;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "reddit.user_agent".to_string(),
            });
        }
        let provided = [
            &self.client_id,
            &self.client_secret,
            &self.username,
            &self.password,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count();
        if provided != 0 && provided != 4 {
            return Err(ConfigError::ValidationFailed {
                reason: "reddit credentials need client_id, client_secret, username and password together"
                    .to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reddit: RedditSettings,
    pub scan: AggregatorConfig,
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reddit.validate()?;
        self.scan.validate()
    }
}
