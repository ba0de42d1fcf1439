use serde::Serialize;

use super::error::{Result, ScheduleError};
use super::playlist::{Episode, Playlist};
use super::pointer::locate;

/// One contiguous interval during which `episode` is on air.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot<'a> {
    pub index: usize,
    pub episode: &'a Episode,
    pub start_epoch_ms: i64,
    pub end_epoch_ms: i64,
}

impl ScheduleSlot<'_> {
    pub fn duration_ms(&self) -> i64 {
        self.end_epoch_ms - self.start_epoch_ms
    }
}

/// A non-empty run of contiguous slots starting at the query instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Schedule<'a> {
    slots: Vec<ScheduleSlot<'a>>,
}

impl<'a> Schedule<'a> {
    pub fn slots(&self) -> &[ScheduleSlot<'a>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false for a built schedule.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn current(&self) -> Option<&ScheduleSlot<'a>> {
        self.slots.first()
    }

    pub fn upcoming(&self) -> &[ScheduleSlot<'a>] {
        self.slots.get(1..).unwrap_or(&[])
    }

    pub fn start_epoch_ms(&self) -> Option<i64> {
        self.slots.first().map(|slot| slot.start_epoch_ms)
    }

    pub fn end_epoch_ms(&self) -> Option<i64> {
        self.slots.last().map(|slot| slot.end_epoch_ms)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScheduleSlot<'a>> {
        self.slots.iter()
    }
}

impl<'a> IntoIterator for Schedule<'a> {
    type Item = ScheduleSlot<'a>;
    type IntoIter = std::vec::IntoIter<ScheduleSlot<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

impl<'s, 'a> IntoIterator for &'s Schedule<'a> {
    type Item = &'s ScheduleSlot<'a>;
    type IntoIter = std::slice::Iter<'s, ScheduleSlot<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// Materializes the slots on air from `now_ms` until at least
/// `now_ms + horizon_ms`.
///
/// The first slot starts at `now_ms` and covers only what remains of the
/// live episode; each later slot covers a full episode and starts where the
/// previous one ended. Boundaries are rounded to whole milliseconds from the
/// exact cumulative offset, so rounding never accumulates across slots. A
/// slot that rounds to zero length is dropped, which covers zero-length
/// episodes and a live remainder under half a millisecond.
pub fn build_schedule(
    playlist: &Playlist,
    now_ms: i64,
    horizon_ms: i64,
    anchor_ms: i64,
) -> Result<Schedule<'_>> {
    if horizon_ms <= 0 {
        return Err(ScheduleError::InvalidHorizon(horizon_ms));
    }

    let episodes = playlist.episodes();
    let max_steps = max_step_count(playlist, horizon_ms);
    let (mut index, offset_ms) = locate(playlist, now_ms, anchor_ms);

    let mut slots = Vec::new();
    let mut covered_ms = episodes[index].duration_ms() - offset_ms;
    let mut start_epoch_ms = now_ms;
    for _ in 0..max_steps {
        let end_epoch_ms = now_ms
            .checked_add(covered_ms.round() as i64)
            .ok_or(ScheduleError::InvalidTimestamp(now_ms))?;

        if end_epoch_ms > start_epoch_ms {
            slots.push(ScheduleSlot {
                index,
                episode: &episodes[index],
                start_epoch_ms,
                end_epoch_ms,
            });
            if end_epoch_ms - now_ms >= horizon_ms {
                break;
            }
            start_epoch_ms = end_epoch_ms;
        }

        index = next_airable(episodes, index);
        covered_ms += episodes[index].duration_ms();
    }

    Ok(Schedule { slots })
}

/// Upper bound on episodes walked for `horizon_ms`: the live remainder plus
/// enough of the shortest airable episode to cover the horizon. Every step
/// adds at least that much to the covered span, so the horizon is always
/// reached within the bound.
fn max_step_count(playlist: &Playlist, horizon_ms: i64) -> usize {
    let full = (horizon_ms as f64 / playlist.min_positive_duration_ms()).ceil();
    (full as usize).saturating_add(2)
}

fn next_airable(episodes: &[Episode], index: usize) -> usize {
    let len = episodes.len();
    (1..=len)
        .map(|step| (index + step) % len)
        .find(|&candidate| episodes[candidate].duration_ms() > 0.0)
        .unwrap_or(index)
}
