use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownConfig {
    /// Minimum gap between the start of two requests.
    pub min_interval: Duration,
    /// Upper bound of a random extra delay added to each gap.
    pub max_jitter: Duration,
}

impl CooldownConfig {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            max_jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

/// Spaces out upstream requests by a fixed interval.
///
/// The first request goes out immediately; each later one waits until
/// `min_interval` (plus jitter) has passed since the previous one started.
#[derive(Debug)]
pub struct Cooldown {
    config: CooldownConfig,
    last_request: Mutex<Option<Instant>>,
}

#[derive(Debug, Clone, Copy)]
pub struct CooldownPermit {
    pub waited: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct CooldownStatus {
    pub min_interval: Duration,
    pub max_jitter: Duration,
    pub ready_in: Duration,
}

impl Cooldown {
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CooldownConfig {
        &self.config
    }

    pub async fn acquire_permit(&self) -> CooldownPermit {
        let mut last_request = self.last_request.lock().await;

        let wait = match *last_request {
            Some(previous) => {
                let gap = self.config.min_interval + self.jitter();
                gap.saturating_sub(previous.elapsed())
            }
            None => Duration::ZERO,
        };

        if !wait.is_zero() {
            tracing::debug!("Cooling down for {:?} before next request", wait);
            sleep(wait).await;
        }

        *last_request = Some(Instant::now());
        CooldownPermit { waited: wait }
    }

    pub async fn status(&self) -> CooldownStatus {
        let last_request = self.last_request.lock().await;
        let ready_in = last_request
            .map(|previous| self.config.min_interval.saturating_sub(previous.elapsed()))
            .unwrap_or(Duration::ZERO);

        CooldownStatus {
            min_interval: self.config.min_interval,
            max_jitter: self.config.max_jitter,
            ready_in,
        }
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.config.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(fastrand::u64(0..=max_ms))
        }
    }
}
