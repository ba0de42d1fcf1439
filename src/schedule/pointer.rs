use serde::Serialize;

use super::playlist::{Episode, Playlist};

/// What is on air at one instant: the playlist index and how far into that
/// episode playback is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePointer {
    pub index: usize,
    pub offset_seconds: f64,
}

impl LivePointer {
    pub fn episode<'a>(&self, playlist: &'a Playlist) -> Option<&'a Episode> {
        playlist.get(self.index)
    }

    pub fn remaining_seconds(&self, playlist: &Playlist) -> f64 {
        self.episode(playlist)
            .map(|episode| (episode.duration_seconds - self.offset_seconds).max(0.0))
            .unwrap_or(0.0)
    }
}

/// Position inside the loop, in `[0, total_duration_ms)`.
///
/// Uses a Euclidean remainder so a query before the anchor still lands
/// inside the loop instead of producing a negative position.
pub(crate) fn loop_position_ms(playlist: &Playlist, query_ms: i64, anchor_ms: i64) -> f64 {
    let total_ms = playlist.total_duration_ms();
    let elapsed_ms = i128::from(query_ms) - i128::from(anchor_ms);
    let position = (elapsed_ms as f64).rem_euclid(total_ms);
    // rem_euclid can round up to the divisor for tiny negative inputs, and
    // yields -0.0 for negative exact multiples.
    if position >= total_ms || position == 0.0 {
        0.0
    } else {
        position
    }
}

/// Maps `query_ms` to the episode on air and the offset into it.
///
/// Episodes occupy half-open intervals `[start, end)`: an instant exactly on
/// a boundary belongs to the next episode at offset zero, and zero-length
/// episodes are never live.
pub fn resolve_live_pointer(playlist: &Playlist, query_ms: i64, anchor_ms: i64) -> LivePointer {
    let (index, offset_ms) = locate(playlist, query_ms, anchor_ms);
    LivePointer {
        index,
        offset_seconds: offset_ms / 1000.0,
    }
}

/// Index of the live episode and the offset into it in milliseconds.
pub(crate) fn locate(playlist: &Playlist, query_ms: i64, anchor_ms: i64) -> (usize, f64) {
    let position_ms = loop_position_ms(playlist, query_ms, anchor_ms);

    let mut accumulated_ms = 0.0_f64;
    let mut last_airable = 0;
    for (index, episode) in playlist.episodes().iter().enumerate() {
        let duration_ms = episode.duration_ms();
        if duration_ms > 0.0 {
            last_airable = index;
        }
        if position_ms < accumulated_ms + duration_ms {
            return (index, position_ms - accumulated_ms);
        }
        accumulated_ms += duration_ms;
    }

    // Only reachable if float accumulation drifts below the cached total.
    (last_airable, 0.0)
}
