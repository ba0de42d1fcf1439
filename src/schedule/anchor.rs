use std::fmt;
use std::str::FromStr;

use chrono::{Days, LocalResult, NaiveDate, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};

use super::error::{Result, ScheduleError};

/// Local time of day at which loop cycle zero starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalTime {
    hour: u32,
    minute: u32,
}

impl CanonicalTime {
    pub const fn at_hour(hour: u32) -> Self {
        Self { hour, minute: 0 }
    }

    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeOfDay(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    pub fn minute(self) -> u32 {
        self.minute
    }
}

impl Default for CanonicalTime {
    fn default() -> Self {
        Self::at_hour(15)
    }
}

impl fmt::Display for CanonicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for CanonicalTime {
    type Err = ScheduleError;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || ScheduleError::InvalidTimeOfDay(raw.to_string());
        let trimmed = raw.trim();
        let (hour_str, minute_str) = match trimmed.split_once(':') {
            Some((hour, minute)) => (hour, minute),
            None => (trimmed, "0"),
        };
        let hour = hour_str.trim().parse::<u32>().map_err(|_| invalid())?;
        let minute = minute_str.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for CanonicalTime {
    type Error = ScheduleError;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<CanonicalTime> for String {
    fn from(time: CanonicalTime) -> Self {
        time.to_string()
    }
}

/// Returns the most recent instant at `time` (in `tz`) that is `<=
/// reference_ms`.
///
/// The calendar date of the reference instant is taken in `tz`; if that
/// date's canonical instant lies after the reference, the previous calendar
/// day is used. Local times repeated by a DST fall-back resolve to the
/// earlier instant; local times skipped by a DST gap resolve one hour later.
pub fn compute_anchor<Tz: TimeZone>(reference_ms: i64, tz: &Tz, time: CanonicalTime) -> Result<i64> {
    let out_of_range = || ScheduleError::InvalidTimestamp(reference_ms);
    let reference = tz
        .timestamp_millis_opt(reference_ms)
        .single()
        .ok_or_else(out_of_range)?;
    let today = reference.date_naive();

    let candidate = local_instant_ms(tz, today, time).ok_or_else(out_of_range)?;
    if candidate <= reference_ms {
        return Ok(candidate);
    }

    let yesterday = today
        .checked_sub_days(Days::new(1))
        .ok_or_else(out_of_range)?;
    local_instant_ms(tz, yesterday, time).ok_or_else(out_of_range)
}

fn local_instant_ms<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: CanonicalTime) -> Option<i64> {
    let naive = date.and_hms_opt(time.hour, time.minute, 0)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp_millis()),
        LocalResult::None => {
            let shifted = naive.checked_add_signed(TimeDelta::hours(1))?;
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|at| at.timestamp_millis())
        }
    }
}

/// How a channel derives its anchor from the query instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnchorRule {
    /// Most recent occurrence of a local time of day.
    #[serde(rename = "fixedTime")]
    Daily { time: CanonicalTime },
    /// A constant epoch instant.
    #[serde(rename = "timestamp", rename_all = "camelCase")]
    Fixed { timestamp_ms: i64 },
    /// Anchor equals the query instant, so every query starts at the head of
    /// the playlist.
    #[serde(rename = "none")]
    Unanchored,
}

impl Default for AnchorRule {
    fn default() -> Self {
        Self::Daily {
            time: CanonicalTime::default(),
        }
    }
}

impl AnchorRule {
    pub fn resolve<Tz: TimeZone>(&self, reference_ms: i64, tz: &Tz) -> Result<i64> {
        match *self {
            Self::Daily { time } => compute_anchor(reference_ms, tz, time),
            Self::Fixed { timestamp_ms } => Ok(timestamp_ms),
            Self::Unanchored => Ok(reference_ms),
        }
    }
}

impl fmt::Display for AnchorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { time } => write!(f, "daily at {time}"),
            Self::Fixed { timestamp_ms } => write!(f, "fixed at {timestamp_ms} ms"),
            Self::Unanchored => f.write_str("unanchored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDateTime, Utc};

    use super::*;

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).expect("valid offset")
    }

    fn local_ms(tz: &FixedOffset, y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        tz.with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("unambiguous local time")
            .timestamp_millis()
    }

    #[test]
    fn anchor_is_today_when_past_canonical_hour() {
        let tz = offset(2);
        let reference = local_ms(&tz, 2024, 3, 10, 16, 0);
        let anchor = compute_anchor(reference, &tz, CanonicalTime::default()).expect("anchor");
        assert_eq!(anchor, local_ms(&tz, 2024, 3, 10, 15, 0));
        assert_eq!(reference - anchor, 3_600_000);
    }

    #[test]
    fn anchor_is_yesterday_before_canonical_hour() {
        let tz = offset(-5);
        let reference = local_ms(&tz, 2024, 3, 10, 14, 59);
        let anchor = compute_anchor(reference, &tz, CanonicalTime::default()).expect("anchor");
        assert_eq!(anchor, local_ms(&tz, 2024, 3, 9, 15, 0));
    }

    #[test]
    fn anchor_at_exact_canonical_instant_is_that_instant() {
        let tz = offset(0);
        let reference = local_ms(&tz, 2024, 7, 1, 15, 0);
        let anchor = compute_anchor(reference, &tz, CanonicalTime::default()).expect("anchor");
        assert_eq!(anchor, reference);
        assert_eq!(
            compute_anchor(reference - 1, &tz, CanonicalTime::default()).expect("anchor"),
            reference - 86_400_000
        );
    }

    #[test]
    fn anchor_crosses_month_and_year_boundaries() {
        let tz = offset(9);
        let reference = local_ms(&tz, 2025, 1, 1, 0, 30);
        let anchor = compute_anchor(reference, &tz, CanonicalTime::default()).expect("anchor");
        assert_eq!(anchor, local_ms(&tz, 2024, 12, 31, 15, 0));

        let leap = local_ms(&tz, 2024, 3, 1, 8, 0);
        let anchor = compute_anchor(leap, &tz, CanonicalTime::default()).expect("anchor");
        assert_eq!(anchor, local_ms(&tz, 2024, 2, 29, 15, 0));
    }

    #[test]
    fn anchor_uses_the_injected_timezone_calendar_date() {
        // 2024-03-10T23:30Z is already 2024-03-11 08:30 in UTC+9.
        let reference = Utc
            .with_ymd_and_hms(2024, 3, 10, 23, 30, 0)
            .single()
            .expect("utc")
            .timestamp_millis();
        let in_utc = compute_anchor(reference, &Utc, CanonicalTime::default()).expect("anchor");
        let tz = offset(9);
        let in_tokyo = compute_anchor(reference, &tz, CanonicalTime::default()).expect("anchor");
        assert_eq!(in_utc, local_ms(&offset(0), 2024, 3, 10, 15, 0));
        assert_eq!(in_tokyo, local_ms(&tz, 2024, 3, 10, 15, 0));
        assert_ne!(in_utc, in_tokyo);
    }

    #[test]
    fn anchor_is_deterministic_within_a_day_after_cutoff() {
        let tz = offset(1);
        let time = CanonicalTime::default();
        let first = compute_anchor(local_ms(&tz, 2024, 5, 5, 15, 1), &tz, time).expect("anchor");
        let second = compute_anchor(local_ms(&tz, 2024, 5, 5, 23, 59), &tz, time).expect("anchor");
        assert_eq!(first, second);
    }

    #[test]
    fn anchor_honours_minutes() {
        let tz = offset(0);
        let time: CanonicalTime = "07:45".parse().expect("time");
        let reference = local_ms(&tz, 2024, 5, 5, 7, 44);
        let anchor = compute_anchor(reference, &tz, time).expect("anchor");
        assert_eq!(anchor, local_ms(&tz, 2024, 5, 4, 7, 45));
    }

    #[test]
    fn anchor_rejects_unrepresentable_instants() {
        let err = compute_anchor(i64::MAX, &Utc, CanonicalTime::default())
            .expect_err("out of range");
        assert_eq!(err, ScheduleError::InvalidTimestamp(i64::MAX));
    }

    #[test]
    fn canonical_time_parses_hour_and_minutes() {
        assert_eq!("15:00".parse::<CanonicalTime>(), Ok(CanonicalTime::at_hour(15)));
        assert_eq!("9".parse::<CanonicalTime>(), Ok(CanonicalTime::at_hour(9)));
        assert_eq!(
            " 06:05 ".parse::<CanonicalTime>().map(|t| (t.hour(), t.minute())),
            Ok((6, 5))
        );
        for bad in ["24:00", "12:60", "noon", "", "-1:00"] {
            assert!(
                matches!(
                    bad.parse::<CanonicalTime>(),
                    Err(ScheduleError::InvalidTimeOfDay(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn anchor_rule_resolves_each_variant() {
        let tz = offset(0);
        let reference = local_ms(&tz, 2024, 5, 5, 18, 0);
        assert_eq!(
            AnchorRule::default().resolve(reference, &tz),
            Ok(local_ms(&tz, 2024, 5, 5, 15, 0))
        );
        assert_eq!(
            AnchorRule::Fixed { timestamp_ms: 42 }.resolve(reference, &tz),
            Ok(42)
        );
        assert_eq!(AnchorRule::Unanchored.resolve(reference, &tz), Ok(reference));
    }

    #[test]
    fn anchor_rule_uses_channel_file_shape() {
        let rule: AnchorRule =
            serde_json::from_str(r#"{"type":"fixedTime","time":"15:30"}"#).expect("parse");
        assert_eq!(
            rule,
            AnchorRule::Daily {
                time: CanonicalTime::new(15, 30).expect("time")
            }
        );
        let rule: AnchorRule =
            serde_json::from_str(r#"{"type":"timestamp","timestampMs":1700000000000}"#)
                .expect("parse");
        assert_eq!(
            rule,
            AnchorRule::Fixed {
                timestamp_ms: 1_700_000_000_000
            }
        );
        assert_eq!(
            serde_json::to_string(&AnchorRule::default()).expect("serialize"),
            r#"{"type":"fixedTime","time":"15:00"}"#
        );
        assert!(serde_json::from_str::<AnchorRule>(r#"{"type":"fixedTime","time":"31:00"}"#).is_err());
    }

    /// US Eastern rules for 2024 only: EDT (-04:00) from 2024-03-10 07:00 UTC
    /// until 2024-11-03 06:00 UTC, EST (-05:00) otherwise.
    #[derive(Debug, Clone, Copy)]
    struct Eastern2024;

    fn est() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).expect("EST")
    }

    fn edt() -> FixedOffset {
        FixedOffset::west_opt(4 * 3600).expect("EDT")
    }

    fn naive(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid 2024 date")
    }

    fn utc_ms(month: u32, day: u32, hour: u32, minute: u32) -> i64 {
        naive(month, day, hour, minute).and_utc().timestamp_millis()
    }

    impl TimeZone for Eastern2024 {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            Eastern2024
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            let midnight = local.and_hms_opt(0, 0, 0).expect("midnight");
            self.offset_from_local_datetime(&midnight)
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if *local < naive(3, 10, 2, 0) || *local >= naive(11, 3, 2, 0) {
                LocalResult::Single(est())
            } else if *local < naive(3, 10, 3, 0) {
                LocalResult::None
            } else if *local < naive(11, 3, 1, 0) {
                LocalResult::Single(edt())
            } else {
                LocalResult::Ambiguous(edt(), est())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            let midnight = utc.and_hms_opt(0, 0, 0).expect("midnight");
            self.offset_from_utc_datetime(&midnight)
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc >= naive(3, 10, 7, 0) && *utc < naive(11, 3, 6, 0) {
                edt()
            } else {
                est()
            }
        }
    }

    #[test]
    fn anchor_inside_spring_forward_gap_moves_one_hour_later() {
        // 02:30 does not exist on 2024-03-10; 03:30 EDT is 07:30 UTC.
        let time = CanonicalTime::new(2, 30).expect("time");
        let reference = utc_ms(3, 10, 16, 0);
        assert_eq!(
            compute_anchor(reference, &Eastern2024, time),
            Ok(utc_ms(3, 10, 7, 30))
        );
    }

    #[test]
    fn repeated_fall_back_time_takes_the_earlier_instant() {
        // 01:30 happens twice on 2024-11-03: 05:30 UTC (EDT) and 06:30 UTC (EST).
        let time = CanonicalTime::new(1, 30).expect("time");
        assert_eq!(
            compute_anchor(utc_ms(11, 3, 17, 0), &Eastern2024, time),
            Ok(utc_ms(11, 3, 5, 30))
        );
        // Second pass through 01:10 (EST) is already after the earlier 01:30.
        assert_eq!(
            compute_anchor(utc_ms(11, 3, 6, 10), &Eastern2024, time),
            Ok(utc_ms(11, 3, 5, 30))
        );
        // First pass through 01:10 (EDT) precedes it, so the anchor is the day before.
        assert_eq!(
            compute_anchor(utc_ms(11, 3, 5, 10), &Eastern2024, time),
            Ok(utc_ms(11, 2, 5, 30))
        );
    }

    #[test]
    fn anchor_follows_daylight_offset_between_transitions() {
        let time = CanonicalTime::default();
        assert_eq!(
            compute_anchor(utc_ms(7, 1, 20, 0), &Eastern2024, time),
            Ok(utc_ms(7, 1, 19, 0))
        );
        assert_eq!(
            compute_anchor(utc_ms(12, 1, 20, 30), &Eastern2024, time),
            Ok(utc_ms(12, 1, 20, 0))
        );
    }
}
