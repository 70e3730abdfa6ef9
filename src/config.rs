use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration as StdDuration,
};

use anyhow::{Context, Result};
use chrono::Duration;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::calendar::{AcademicYear, PeriodCalendar, DEFAULT_PERIOD_OFFSET_DAYS};
use crate::filters::FilterConfig;
use crate::notify::RetryPolicy;

pub const CONFIG_PATH_ENV: &str = "COURSE_FILTER_CONFIG";

pub const DEFAULT_COURSE_DATA_URL: &str =
    "https://courses.aalto.fi/s/sfsites/aura*aura.ApexAction.execute*";
pub const DEFAULT_PAGE_SHELL_URL: &str =
    "https://courses.aalto.fi/s/sfsites/aura*ui-comm-runtime-components-aura-components-siteforce-qb*";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Response bodies of requests matching this pattern are filtered.
    pub course_data_url: String,
    /// Completion of this request means the page can take a notification.
    pub page_shell_url: String,
    pub notify_interval_ms: u64,
    pub notify_max_attempts: u32,
    pub period_offset_days: i64,
    /// Pin the academic year instead of deriving it from today's date.
    pub academic_year: Option<i32>,
    /// When set, survivors also carry their period label under this key.
    pub period_field: Option<String>,
    pub chunk_size: usize,
    /// Shortest prefix accepted in a valid set.
    pub min_prefix_len: usize,
    pub min_period_len: usize,
    /// Also match prefixes against the code minus its first character.
    pub strip_leading_char: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let filters = FilterConfig::default();
        Self {
            course_data_url: DEFAULT_COURSE_DATA_URL.into(),
            page_shell_url: DEFAULT_PAGE_SHELL_URL.into(),
            notify_interval_ms: 100,
            notify_max_attempts: 50,
            period_offset_days: DEFAULT_PERIOD_OFFSET_DAYS,
            academic_year: None,
            period_field: None,
            chunk_size: 8192,
            min_prefix_len: filters.min_prefix_len,
            min_period_len: filters.min_period_len,
            strip_leading_char: filters.strip_leading_char,
        }
    }
}

impl EngineConfig {
    /// Read `path` if it exists. A file that does not parse falls back to
    /// defaults; a file that exists but cannot be read is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("Ignoring invalid config {}: {err}", path.display());
            Self::default()
        }))
    }

    /// Explicit path first, then `COURSE_FILTER_CONFIG`, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        match path {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            min_prefix_len: self.min_prefix_len,
            min_period_len: self.min_period_len,
            strip_leading_char: self.strip_leading_char,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.notify_max_attempts,
            StdDuration::from_millis(self.notify_interval_ms),
        )
    }

    pub fn period_offset(&self) -> Duration {
        Duration::days(self.period_offset_days)
    }

    pub fn calendar(&self) -> PeriodCalendar {
        match self.academic_year {
            Some(year) => PeriodCalendar::new(AcademicYear::new(year), self.period_offset()),
            None => PeriodCalendar::for_today(self.period_offset()),
        }
    }
}
