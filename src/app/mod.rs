mod format;
mod tui;


use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use liveloop::RetryPolicy;
use liveloop::config::{ChannelConfig, load_or_init};
use liveloop::manifest::load_manifest;
use liveloop::paths::{config_file_path, default_manifest_path};
use liveloop::schedule::{
    AnchorRule, Clock, FixedClock, LivePointer, Playlist, Schedule, SystemClock, build_schedule,
    resolve_live_pointer,
};
use serde_json::json;

use crate::cli::{Cli, Command};

use self::format::{clock_duration, readable_duration, truncate};

const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";
const SLOT_FORMAT: &str = "%a %H:%M:%S";

/// A configured channel with its playlist loaded.
pub(crate) struct Channel {
    pub(crate) config: ChannelConfig,
    pub(crate) manifest_source: String,
    pub(crate) playlist: Arc<Playlist>,
}

impl Channel {
    pub(crate) fn anchor_ms(&self, now_ms: i64) -> Result<i64> {
        let anchor = self
            .config
            .utc_offset
            .resolve_anchor(&self.config.anchor, now_ms)?;
        Ok(anchor)
    }

    pub(crate) fn format_clock(&self, epoch_ms: i64) -> String {
        self.config.utc_offset.format_ms(epoch_ms, CLOCK_FORMAT)
    }

    pub(crate) fn format_slot_time(&self, epoch_ms: i64) -> String {
        self.config.utc_offset.format_ms(epoch_ms, SLOT_FORMAT)
    }
}

/// Everything the front ends show for one instant, computed from one
/// playlist version.
pub(crate) struct Snapshot<'a> {
    pub(crate) now_ms: i64,
    pub(crate) anchor_ms: i64,
    pub(crate) pointer: LivePointer,
    pub(crate) schedule: Schedule<'a>,
}

pub(crate) fn snapshot<'a>(
    channel: &Channel,
    playlist: &'a Playlist,
    now_ms: i64,
    horizon_ms: i64,
) -> Result<Snapshot<'a>> {
    let anchor_ms = channel.anchor_ms(now_ms)?;
    let pointer = resolve_live_pointer(playlist, now_ms, anchor_ms);
    let schedule = build_schedule(playlist, now_ms, horizon_ms, anchor_ms)?;
    Ok(Snapshot {
        now_ms,
        anchor_ms,
        pointer,
        schedule,
    })
}

pub fn run(cli: Cli) -> Result<()> {
    let channel = open_channel(&cli)?;
    let clock: Box<dyn Clock> = match cli.at {
        Some(at) => Box::new(FixedClock(at)),
        None => Box::new(SystemClock),
    };

    match cli.command {
        Some(Command::Now { json }) => run_now(&channel, clock.as_ref(), json)?,
        Some(Command::Schedule {
            horizon_minutes,
            json,
        }) => {
            let horizon_ms = match horizon_minutes {
                Some(minutes) => i64::from(minutes) * 60_000,
                None => channel.config.horizon_ms(),
            };
            run_schedule(&channel, clock.as_ref(), horizon_ms, json)?
        }
        Some(Command::Anchor { json }) => run_anchor(&channel, clock.as_ref(), json)?,
        Some(Command::Tui) | None => tui::run_tui(channel, clock.as_ref())?,
    }

    Ok(())
}

fn open_channel(cli: &Cli) -> Result<Channel> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };
    let mut config = load_or_init(&config_path)?;
    apply_overrides(&mut config, cli);

    let manifest_source = match &config.manifest {
        Some(source) => source.clone(),
        None => path_source(default_manifest_path()?),
    };
    let playlist = load_manifest(&manifest_source, config.order, &RetryPolicy::default())?;
    tracing::info!(
        channel = %config.name,
        episodes = playlist.len(),
        anchor = %config.anchor,
        "channel ready"
    );

    Ok(Channel {
        config,
        manifest_source,
        playlist: Arc::new(playlist),
    })
}

pub(crate) fn apply_overrides(config: &mut ChannelConfig, cli: &Cli) {
    if let Some(time) = cli.anchor_time {
        config.anchor = AnchorRule::Daily { time };
    }
    if let Some(tz) = cli.utc_offset {
        config.utc_offset = tz;
    }
    if let Some(source) = &cli.manifest {
        config.manifest = Some(source.clone());
    }
}

fn path_source(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

fn run_now(channel: &Channel, clock: &dyn Clock, json: bool) -> Result<()> {
    let now_ms = clock.now_ms();
    let anchor_ms = channel.anchor_ms(now_ms)?;
    let playlist = channel.playlist.as_ref();
    let pointer = resolve_live_pointer(playlist, now_ms, anchor_ms);
    let episode = pointer
        .episode(playlist)
        .context("live pointer outside playlist")?;

    if json {
        let body = json!({
            "channel": channel.config.name,
            "nowMs": now_ms,
            "anchorMs": anchor_ms,
            "pointer": pointer,
            "episode": episode,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", now_playing_text(channel, playlist, &pointer, now_ms, anchor_ms));
    Ok(())
}

pub(crate) fn now_playing_text(
    channel: &Channel,
    playlist: &Playlist,
    pointer: &LivePointer,
    now_ms: i64,
    anchor_ms: i64,
) -> String {
    let Some(episode) = pointer.episode(playlist) else {
        return "Nothing on air.".to_string();
    };
    format!(
        "Live on {} ({})\n  Episode: {} {} (#{} of {})\n  Offset:  {} of {} ({} left)\n  Now:     {}\n  Anchor:  {} ({})",
        channel.config.name,
        channel.config.label,
        episode.code(),
        episode.title,
        pointer.index + 1,
        playlist.len(),
        clock_duration(pointer.offset_seconds),
        clock_duration(episode.duration_seconds),
        clock_duration(pointer.remaining_seconds(playlist)),
        channel.format_clock(now_ms),
        channel.format_clock(anchor_ms),
        channel.config.anchor,
    )
}

fn run_schedule(channel: &Channel, clock: &dyn Clock, horizon_ms: i64, json: bool) -> Result<()> {
    let now_ms = clock.now_ms();
    let playlist = channel.playlist.as_ref();
    let view = snapshot(channel, playlist, now_ms, horizon_ms)?;

    if json {
        let body = json!({
            "channel": channel.config.name,
            "nowMs": view.now_ms,
            "horizonMs": horizon_ms,
            "anchorMs": view.anchor_ms,
            "schedule": view.schedule,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!(
        "Schedule for {} from {} ({} ahead)",
        channel.config.name,
        channel.format_clock(view.now_ms),
        readable_duration(horizon_ms as f64 / 1000.0)
    );
    println!(
        "{:<14} {:<14} {:<8} {:<40} {:>6}",
        "START", "END", "EP", "TITLE", "LEN"
    );
    for slot in view.schedule.iter() {
        println!(
            "{:<14} {:<14} {:<8} {:<40} {:>6}",
            channel.format_slot_time(slot.start_epoch_ms),
            channel.format_slot_time(slot.end_epoch_ms),
            slot.episode.code(),
            truncate(&slot.episode.title, 40),
            readable_duration(slot.duration_ms() as f64 / 1000.0)
        );
    }
    Ok(())
}

fn run_anchor(channel: &Channel, clock: &dyn Clock, json: bool) -> Result<()> {
    let now_ms = clock.now_ms();
    let anchor_ms = channel.anchor_ms(now_ms)?;
    let loop_seconds = channel.playlist.total_duration_seconds();
    let loops = loops_since_anchor(now_ms, anchor_ms, loop_seconds);

    if json {
        let body = json!({
            "channel": channel.config.name,
            "rule": channel.config.anchor,
            "nowMs": now_ms,
            "anchorMs": anchor_ms,
            "loopSeconds": loop_seconds,
            "loopsElapsed": loops,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("Anchor:  {} ({})", channel.format_clock(anchor_ms), channel.config.anchor);
    println!("Now:     {}", channel.format_clock(now_ms));
    println!(
        "Loop:    {} per pass, {:.2} pass(es) since anchor",
        clock_duration(loop_seconds),
        loops
    );
    Ok(())
}

/// Loop passes between the anchor and `now_ms`; negative before the anchor.
pub(crate) fn loops_since_anchor(now_ms: i64, anchor_ms: i64, loop_seconds: f64) -> f64 {
    let elapsed_ms = i128::from(now_ms) - i128::from(anchor_ms);
    elapsed_ms as f64 / 1000.0 / loop_seconds
}
