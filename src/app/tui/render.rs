use liveloop::schedule::Playlist;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Gauge, Paragraph, Row, Table, TableState};

use super::super::format::{clock_duration, progress_ratio, readable_duration, truncate};
use super::super::{Channel, Snapshot};

#[allow(clippy::too_many_arguments)]
pub(super) fn draw_dashboard(
    frame: &mut Frame,
    channel: &Channel,
    playlist: &Playlist,
    view: Result<&Snapshot<'_>, String>,
    table_state: &mut TableState,
    horizon_ms: i64,
    status: &str,
    reloading: bool,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let clock_text = match &view {
        Ok(view) => channel.format_clock(view.now_ms),
        Err(_) => "-".to_string(),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "LIVELOOP",
            Style::default()
                .fg(Color::Rgb(110, 170, 255))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{} · {}", channel.config.name, channel.config.label),
            Style::default().fg(Color::Rgb(230, 230, 230)),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!(
                "{} episodes, {} loop",
                playlist.len(),
                clock_duration(playlist.total_duration_seconds())
            ),
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(clock_text, Style::default().fg(Color::Yellow)),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block("Channel"));
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(chunks[1]);
    let live_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(body_chunks[0]);

    match view {
        Ok(view) => {
            let live_text = live_panel_text(channel, playlist, view);
            let live = Paragraph::new(live_text)
                .style(Style::default().fg(Color::Rgb(230, 230, 230)))
                .block(panel_block("On Air"));
            frame.render_widget(live, live_chunks[0]);

            if let Some(episode) = view.pointer.episode(playlist) {
                let ratio = progress_ratio(view.pointer.offset_seconds, episode.duration_seconds);
                let progress = Gauge::default()
                    .block(panel_block("Progress"))
                    .gauge_style(
                        Style::default()
                            .fg(Color::Rgb(130, 190, 255))
                            .bg(Color::Black)
                            .add_modifier(Modifier::BOLD),
                    )
                    .label(format!(
                        "{} / {}",
                        clock_duration(view.pointer.offset_seconds),
                        clock_duration(episode.duration_seconds)
                    ))
                    .ratio(ratio);
                frame.render_widget(progress, live_chunks[1]);
            }

            let rows: Vec<Row> = view
                .schedule
                .iter()
                .enumerate()
                .map(|(idx, slot)| {
                    let row = Row::new(vec![
                        Cell::from(channel.format_slot_time(slot.start_epoch_ms)),
                        Cell::from(channel.format_slot_time(slot.end_epoch_ms)),
                        Cell::from(slot.episode.code()),
                        Cell::from(truncate(&slot.episode.title, 48)),
                        Cell::from(readable_duration(slot.duration_ms() as f64 / 1000.0)),
                    ]);
                    if idx == 0 {
                        row.style(Style::default().fg(Color::Rgb(255, 200, 120)))
                    } else {
                        row
                    }
                })
                .collect();
            let table = Table::new(
                rows,
                [
                    Constraint::Length(14),
                    Constraint::Length(14),
                    Constraint::Length(8),
                    Constraint::Min(16),
                    Constraint::Length(6),
                ],
            )
            .header(
                Row::new(vec!["Start", "End", "Ep", "Title", "Len"]).style(
                    Style::default()
                        .fg(Color::Rgb(110, 170, 255))
                        .add_modifier(Modifier::BOLD),
                ),
            )
            .block(panel_block("Schedule"))
            .row_highlight_style(
                Style::default()
                    .bg(Color::Rgb(110, 170, 255))
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▸ ");
            frame.render_stateful_widget(table, body_chunks[1], table_state);
        }
        Err(err) => {
            let unavailable = Paragraph::new(format!("Schedule unavailable.\n\n{err}"))
                .style(
                    Style::default()
                        .fg(Color::Rgb(255, 145, 120))
                        .add_modifier(Modifier::BOLD),
                )
                .block(panel_block("On Air"));
            frame.render_widget(unavailable, chunks[1]);
        }
    }

    let command_bar = Paragraph::new(controls_line(horizon_ms, reloading))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(command_bar, chunks[2]);

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[3]);
}

fn live_panel_text(channel: &Channel, playlist: &Playlist, view: &Snapshot<'_>) -> String {
    let Some(episode) = view.pointer.episode(playlist) else {
        return "Nothing on air.".to_string();
    };
    let next = view
        .schedule
        .upcoming()
        .first()
        .map(|slot| {
            format!(
                "{} {}",
                slot.episode.code(),
                truncate(&slot.episode.title, 30)
            )
        })
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Title\n{}\n\nEpisode\n{} (#{} of {})\n\nRemaining\n{}\n\nUp Next\n{}\n\nAnchor\n{}",
        truncate(&episode.title, 40),
        episode.code(),
        view.pointer.index + 1,
        playlist.len(),
        clock_duration(view.pointer.remaining_seconds(playlist)),
        next,
        channel.format_clock(view.anchor_ms),
    )
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn controls_line(horizon_ms: i64, reloading: bool) -> Line<'static> {
    let pill = Style::default()
        .bg(Color::Rgb(110, 170, 255))
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);
    let mut spans = vec![Span::styled(
        format!(" HORIZON {} ", readable_duration(horizon_ms as f64 / 1000.0)),
        pill,
    )];
    if reloading {
        spans.push(Span::styled(" ", Style::default()));
        spans.push(Span::styled(
            " RELOADING ",
            Style::default()
                .bg(Color::Rgb(72, 82, 96))
                .fg(Color::Rgb(230, 235, 242)),
        ));
    }
    spans.push(Span::styled(
        "   ↑/↓ scroll  +/- horizon  r reload manifest  q quit",
        Style::default().fg(Color::Rgb(185, 195, 210)),
    ));
    Line::from(spans)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}
