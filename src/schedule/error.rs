/// Failures surfaced by the scheduling core.
///
/// Every variant is local to a single call: a failed call returns no pointer
/// and no slots.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    /// The playlist is empty, has a negative or non-finite duration, or sums
    /// to zero seconds.
    #[error("invalid playlist: {0}")]
    InvalidPlaylist(String),

    /// The requested horizon is not strictly positive.
    #[error("invalid horizon: {0} ms (must be > 0)")]
    InvalidHorizon(i64),

    /// The instant cannot be represented as a calendar date, or a slot
    /// boundary after it falls outside the epoch millisecond range.
    #[error("timestamp out of range: {0} ms")]
    InvalidTimestamp(i64),

    /// A time-of-day string or value outside 00:00..=23:59.
    #[error("invalid time of day: {0}")]
    InvalidTimeOfDay(String),
}

impl ScheduleError {
    pub(crate) fn invalid_playlist<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPlaylist(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
