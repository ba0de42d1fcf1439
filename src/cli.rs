use std::path::PathBuf;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use liveloop::config::ChannelTimezone;
use liveloop::schedule::CanonicalTime;

#[derive(Debug, Parser)]
#[command(
    name = "liveloop",
    version,
    about = "Always-on looping channel: what is live now and what airs next"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Channel config file (created with defaults when missing).
    #[arg(long, global = true, env = "LIVELOOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Manifest path or http(s) URL, overriding the config.
    #[arg(long, global = true, env = "LIVELOOP_MANIFEST")]
    pub manifest: Option<String>,

    /// Daily anchor time, overriding the config.
    #[arg(long, global = true, value_name = "HH:MM")]
    pub anchor_time: Option<CanonicalTime>,

    /// "local" or a fixed offset such as "+02:00".
    #[arg(long, global = true, value_name = "OFFSET")]
    pub utc_offset: Option<ChannelTimezone>,

    /// Pin the clock to an RFC 3339 instant or epoch milliseconds.
    #[arg(long, global = true, value_name = "INSTANT", value_parser = parse_instant)]
    pub at: Option<i64>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the episode on air and how far into it playback is.
    Now {
        #[arg(long)]
        json: bool,
    },
    /// List the slots from now until the horizon.
    Schedule {
        #[arg(long)]
        horizon_minutes: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Show the anchor the channel is aligned to.
    Anchor {
        #[arg(long)]
        json: bool,
    },
    /// Live dashboard (default).
    Tui,
}

pub fn parse_instant(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    if let Ok(ms) = trimmed.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|at| at.timestamp_millis())
        .map_err(|err| format!("expected epoch milliseconds or RFC 3339 ({err})"))
}
