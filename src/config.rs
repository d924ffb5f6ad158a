use chrono::{FixedOffset, Offset};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0";
pub const DEFAULT_WEB_URL: &str = "https://bitbucket.org";

/// Asia/Tokyo, what the plugin has always displayed in.
const DEFAULT_UTC_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration value {0}")]
    Missing(&'static str),

    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid UTC offset {0:?}, expected something like +09:00")]
    InvalidOffset(String),
}

/// Top-level configuration loaded from .bucketbar.toml and the host's
/// `VAR_*` preference variables.
///
/// Every field is optional so that a half-configured plugin can still render
/// its setup prompt instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bitbucket: BitbucketConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketConfig {
    pub username: Option<String>,
    /// App password, sent as the basic-auth secret.
    pub app_password: Option<String>,
    pub workspace: Option<String>,
    pub api_url: Option<String>,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayConfig {
    /// Own nickname; items authored by it get highlighted.
    pub nickname: Option<String>,
    /// Offset used when printing timestamps, e.g. "+09:00".
    pub utc_offset: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewConfig {
    /// Reviewer account UUIDs applied by the "add reviewers" action.
    #[serde(default)]
    pub reviewers: Vec<String>,
}

/// Resolved account settings needed to talk to the API at all.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub workspace: String,
    pub api_url: String,
    pub web_url: String,
}

impl Config {
    /// Load configuration from .bucketbar.toml in the current directory, then
    /// apply environment overrides.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".bucketbar.toml");
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay values from the host's preference variables. Empty values
    /// count as unset, the host writes them for untouched preferences.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("VAR_USERNAME") {
            self.bitbucket.username = Some(v);
        }
        if let Some(v) = var("VAR_PASSWORD") {
            self.bitbucket.app_password = Some(v);
        }
        if let Some(v) = var("VAR_WORKSPACE") {
            self.bitbucket.workspace = Some(v);
        }
        if let Some(v) = var("VAR_MY_NICKNAME") {
            self.display.nickname = Some(v);
        }
        if let Some(v) = var("VAR_UTC_OFFSET") {
            self.display.utc_offset = Some(v);
        }
        if let Some(v) = var("VAR_REVIEWERS") {
            self.review.reviewers = v
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let bb = &self.bitbucket;
        Ok(Credentials {
            username: bb.username.clone().ok_or(ConfigError::Missing("VAR_USERNAME"))?,
            password: bb
                .app_password
                .clone()
                .ok_or(ConfigError::Missing("VAR_PASSWORD"))?,
            workspace: bb.workspace.clone().ok_or(ConfigError::Missing("VAR_WORKSPACE"))?,
            api_url: bb
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            web_url: bb
                .web_url
                .clone()
                .unwrap_or_else(|| DEFAULT_WEB_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        match self.display.utc_offset.as_deref() {
            None => Ok(FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS)
                .unwrap_or_else(|| chrono::Utc.fix())),
            Some(raw) => parse_offset(raw),
        }
    }
}

fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidOffset(raw.to_string());
    let trimmed = raw.trim();
    let (sign, rest) = match trimmed.split_at_checked(1).ok_or_else(invalid)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours = offset_field(hours, 23).ok_or_else(invalid)?;
    let minutes = offset_field(minutes, 59).ok_or_else(invalid)?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// One or two plain digits, no greater than `max`.
fn offset_field(raw: &str, max: i32) -> Option<i32> {
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok().filter(|value| *value <= max)
}
