use serde::{Deserialize, Serialize};

use super::error::{Result, ScheduleError};

/// One airable episode. Only `duration_seconds` takes part in scheduling;
/// everything else is display and playback metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub production_id: i64,
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub filename: String,
    pub url: String,
    pub duration_seconds: f64,
}

impl Episode {
    pub fn duration_ms(&self) -> f64 {
        self.duration_seconds * 1000.0
    }

    /// `S01E02`-style label used by the front ends.
    pub fn code(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// An ordered, non-empty loop of episodes with a strictly positive total
/// duration. Construction is the only place these preconditions are checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    episodes: Vec<Episode>,
    total_duration_ms: f64,
    min_positive_duration_ms: f64,
}

impl Playlist {
    pub fn new(episodes: Vec<Episode>) -> Result<Self> {
        if episodes.is_empty() {
            return Err(ScheduleError::invalid_playlist("playlist is empty"));
        }

        let mut total_duration_ms = 0.0_f64;
        let mut min_positive_duration_ms = f64::INFINITY;
        for (idx, episode) in episodes.iter().enumerate() {
            let seconds = episode.duration_seconds;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ScheduleError::invalid_playlist(format!(
                    "episode {idx} ({}) has invalid duration {seconds}",
                    episode.title
                )));
            }
            let duration_ms = episode.duration_ms();
            total_duration_ms += duration_ms;
            if duration_ms > 0.0 {
                min_positive_duration_ms = min_positive_duration_ms.min(duration_ms);
            }
        }

        if total_duration_ms <= 0.0 || !total_duration_ms.is_finite() {
            return Err(ScheduleError::invalid_playlist(format!(
                "total duration must be > 0 (got {total_duration_ms} ms across {} episode(s))",
                episodes.len()
            )));
        }

        Ok(Self {
            episodes,
            total_duration_ms,
            min_positive_duration_ms,
        })
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn get(&self, index: usize) -> Option<&Episode> {
        self.episodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Always false for a constructed playlist; kept for slice-like ergonomics.
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.total_duration_ms
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration_ms / 1000.0
    }

    pub(crate) fn min_positive_duration_ms(&self) -> f64 {
        self.min_positive_duration_ms
    }
}

#[cfg(test)]
pub(crate) fn episode(production_id: i64, duration_seconds: f64) -> Episode {
    Episode {
        production_id,
        season: 1,
        episode: production_id as u32,
        title: format!("Ep{production_id}"),
        filename: format!("{production_id}.mp4"),
        url: format!("/{production_id}.mp4"),
        duration_seconds,
    }
}
