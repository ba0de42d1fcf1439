mod render;
mod session;

use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use liveloop::RetryPolicy;
use liveloop::manifest::{PlaylistOrder, load_manifest};
use liveloop::schedule::{Clock, Playlist};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use super::{Channel, snapshot};

use self::render::draw_dashboard;
use self::session::TuiSession;

pub(super) const HORIZON_STEP_MS: i64 = 30 * 60_000;
pub(super) const MAX_HORIZON_MS: i64 = 48 * 60 * 60_000;

type ReloadResult = std::result::Result<Playlist, String>;

pub(crate) fn run_tui(mut channel: Channel, clock: &dyn Clock) -> Result<()> {
    let session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut horizon_ms = channel.config.horizon_ms();
    let mut table_state = TableState::default();
    table_state.select(Some(0));
    let (reload_tx, reload_rx) = mpsc::channel::<ReloadResult>();
    let mut reloading = false;
    let mut status = status_info("Ready.");

    loop {
        if let Some(result) = drain_reload_results(&reload_rx) {
            reloading = false;
            match result {
                Ok(playlist) => {
                    status = status_info(&format!(
                        "Reloaded manifest: {} episode(s).",
                        playlist.len()
                    ));
                    // Swap the whole playlist; frames already computed keep
                    // the version they started with.
                    channel.playlist = Arc::new(playlist);
                }
                Err(err) => status = status_error(&format!("Reload failed: {err}")),
            }
        }

        let playlist = Arc::clone(&channel.playlist);
        let view = snapshot(&channel, &playlist, clock.now_ms(), horizon_ms);
        if let Ok(view) = &view {
            clamp_selection(&mut table_state, view.schedule.len());
        }
        terminal.draw(|frame| {
            draw_dashboard(
                frame,
                &channel,
                &playlist,
                view.as_ref().map_err(|err| format!("{err:#}")),
                &mut table_state,
                horizon_ms,
                &status,
                reloading,
            )
        })?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('r') => {
                if reloading {
                    status = status_info("Reload already in progress.");
                    continue;
                }
                reloading = true;
                status = status_info(&format!("Reloading {}...", channel.manifest_source));
                spawn_reload(
                    channel.manifest_source.clone(),
                    channel.config.order,
                    reload_tx.clone(),
                );
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                horizon_ms = widen_horizon(horizon_ms);
                status = status_info(&format!("Horizon: {} min.", horizon_ms / 60_000));
            }
            KeyCode::Char('-') => {
                horizon_ms = narrow_horizon(horizon_ms);
                status = status_info(&format!("Horizon: {} min.", horizon_ms / 60_000));
            }
            KeyCode::Up => {
                if let Some(selected) = table_state.selected() {
                    table_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = table_state.selected() {
                    // Clamped against the schedule length on the next frame.
                    table_state.select(Some(selected + 1));
                }
            }
            KeyCode::Home => table_state.select(Some(0)),
            _ => {}
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}

fn spawn_reload(source: String, order: PlaylistOrder, tx: mpsc::Sender<ReloadResult>) {
    std::thread::spawn(move || {
        let result = load_manifest(&source, order, &RetryPolicy::default())
            .map_err(|err| format!("{err:#}"));
        if let Err(err) = &result {
            tracing::warn!(source = %source, "manifest reload failed: {err}");
        }
        let _ = tx.send(result);
    });
}

/// Latest finished reload, if any; older results are superseded.
fn drain_reload_results(rx: &mpsc::Receiver<ReloadResult>) -> Option<ReloadResult> {
    rx.try_iter().last()
}

pub(super) fn widen_horizon(horizon_ms: i64) -> i64 {
    (horizon_ms + HORIZON_STEP_MS).min(MAX_HORIZON_MS)
}

pub(super) fn narrow_horizon(horizon_ms: i64) -> i64 {
    (horizon_ms - HORIZON_STEP_MS).max(HORIZON_STEP_MS)
}

pub(super) fn clamp_selection(table_state: &mut TableState, len: usize) {
    if len == 0 {
        table_state.select(None);
        return;
    }
    let selected = table_state.selected().unwrap_or(0);
    table_state.select(Some(selected.min(len - 1)));
}

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}
