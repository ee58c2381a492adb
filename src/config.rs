use std::path::PathBuf;

use crate::fetch::FetchConfig;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub user_agent: Option<String>,
    pub jitter_ms: Option<(u64, u64)>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("PAPER_HARVEST_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs_or_default().join(".paper-harvest"));

        let user_agent = std::env::var("PAPER_HARVEST_USER_AGENT").ok();

        // "50-200" (milliseconds); ignored when malformed
        let jitter_ms = std::env::var("PAPER_HARVEST_JITTER_MS")
            .ok()
            .and_then(|s| parse_jitter(&s));

        Self {
            data_dir,
            user_agent,
            jitter_ms,
        }
    }

    /// Fetch settings for one driver run, with env overrides applied on top
    /// of the polite defaults.
    pub fn fetch_config(&self) -> FetchConfig {
        let mut config = FetchConfig::default();
        if let Some(ua) = &self.user_agent {
            config.user_agent = ua.clone();
        }
        if let Some(jitter) = self.jitter_ms {
            config.jitter_ms = jitter;
        }
        config
    }
}

fn parse_jitter(s: &str) -> Option<(u64, u64)> {
    let (lo, hi) = s.split_once('-')?;
    let lo = lo.trim().parse().ok()?;
    let hi = hi.trim().parse().ok()?;
    (lo <= hi).then_some((lo, hi))
}

fn dirs_or_default() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
