use crate::progress::{DEFAULT_STREAK_THRESHOLD, StreakScan};
use std::{env, path::PathBuf};
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

pub fn resolve_data_path() -> Result<PathBuf, std::io::Error> {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return Ok(PathBuf::from(path));
    }

    Ok(PathBuf::from("data/habits.json"))
}

pub fn resolve_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Client-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub api_url: String,
    /// Minimum daily percent for a day to extend a streak.
    pub streak_threshold: u32,
    pub streak_scan: StreakScan,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            streak_threshold: DEFAULT_STREAK_THRESHOLD,
            streak_scan: StreakScan::default(),
        }
    }
}

impl BoardConfig {
    /// Reads `HABIT_API_URL`, `HABIT_STREAK_THRESHOLD` and `HABIT_STREAK_SCAN`,
    /// keeping the default for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("HABIT_API_URL").filter(|url| !url.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("HABIT_STREAK_THRESHOLD") {
            match raw.trim().parse::<u32>() {
                Ok(value) if value <= 100 => config.streak_threshold = value,
                _ => warn!("ignoring HABIT_STREAK_THRESHOLD={raw}: expected 0-100"),
            }
        }
        if let Some(raw) = lookup("HABIT_STREAK_SCAN") {
            match raw.parse() {
                Ok(scan) => config.streak_scan = scan,
                Err(err) => warn!("ignoring HABIT_STREAK_SCAN: {err}"),
            }
        }
        config
    }
}
