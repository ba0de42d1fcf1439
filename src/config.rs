//! Channel configuration file.
//!
//! A missing file is created with defaults. An unreadable or invalid file is
//! reported and replaced in memory by the defaults, so the channel stays on
//! air with a known-good configuration.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::manifest::PlaylistOrder;
use crate::schedule::{AnchorRule, ScheduleError};

pub const DEFAULT_HORIZON_MINUTES: u32 = 180;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelConfig {
    pub name: String,
    pub label: String,
    pub description: String,
    pub anchor: AnchorRule,
    /// Local path or `http(s)://` URL; the data directory default is used
    /// when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    pub order: PlaylistOrder,
    pub horizon_minutes: u32,
    pub utc_offset: ChannelTimezone,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "liveloop1".to_string(),
            label: "Series Marathon".to_string(),
            description: "Full series on a loop, anchored at 3:00 PM.".to_string(),
            anchor: AnchorRule::default(),
            manifest: None,
            order: PlaylistOrder::SeasonEpisode,
            horizon_minutes: DEFAULT_HORIZON_MINUTES,
            utc_offset: ChannelTimezone::Local,
        }
    }
}

impl ChannelConfig {
    pub fn horizon_ms(&self) -> i64 {
        i64::from(self.horizon_minutes) * 60_000
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("channel name must not be empty");
        }
        if self.horizon_minutes == 0 {
            bail!("horizonMinutes must be greater than zero");
        }
        Ok(())
    }
}

/// Timezone used for anchor calendar dates and clock display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChannelTimezone {
    /// The host's local timezone, DST rules included.
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl ChannelTimezone {
    pub fn resolve_anchor(&self, rule: &AnchorRule, reference_ms: i64) -> Result<i64, ScheduleError> {
        match self {
            Self::Local => rule.resolve(reference_ms, &Local),
            Self::Fixed(offset) => rule.resolve(reference_ms, offset),
        }
    }

    /// Formats an epoch instant with `fmt` in this timezone.
    pub fn format_ms(&self, epoch_ms: i64, fmt: &str) -> String {
        match self {
            Self::Local => format_in(&Local, epoch_ms, fmt),
            Self::Fixed(offset) => format_in(offset, epoch_ms, fmt),
        }
    }
}

fn format_in<Tz>(tz: &Tz, epoch_ms: i64, fmt: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    tz.timestamp_millis_opt(epoch_ms)
        .single()
        .map(|at| at.format(fmt).to_string())
        .unwrap_or_else(|| format!("{epoch_ms}ms"))
}

impl fmt::Display for ChannelTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl FromStr for ChannelTimezone {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            return Ok(Self::Fixed(FixedOffset::east_opt(0).ok_or("invalid UTC offset")?));
        }
        trimmed
            .parse::<FixedOffset>()
            .map(Self::Fixed)
            .map_err(|err| format!("invalid UTC offset {trimmed:?} ({err}); expected \"local\" or \"+HH:MM\""))
    }
}

impl TryFrom<String> for ChannelTimezone {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<ChannelTimezone> for String {
    fn from(tz: ChannelTimezone) -> Self {
        tz.to_string()
    }
}

pub fn read_config(path: &Path) -> Result<ChannelConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read channel config at {}", path.display()))?;
    let config: ChannelConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse channel config at {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid channel config at {}", path.display()))?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &ChannelConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create config directory {}", parent.display())
        })?;
    }
    let mut body = serde_json::to_string_pretty(config).context("failed to encode channel config")?;
    body.push('\n');
    fs::write(path, body)
        .with_context(|| format!("failed to write channel config at {}", path.display()))
}

/// Reads the channel config, creating it with defaults when it does not
/// exist and falling back to defaults when it cannot be used.
pub fn load_or_init(path: &Path) -> Result<ChannelConfig> {
    if !path.exists() {
        let config = ChannelConfig::default();
        write_config(path, &config)?;
        tracing::info!(path = %path.display(), "wrote default channel config");
        return Ok(config);
    }

    match read_config(path) {
        Ok(config) => Ok(config),
        Err(err) => {
            tracing::warn!("{err:#}; using default channel config");
            Ok(ChannelConfig::default())
        }
    }
}
