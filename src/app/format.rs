pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

/// Compact length label: seconds below 90 s, whole minutes otherwise.
pub(crate) fn readable_duration(seconds: f64) -> String {
    if seconds < 90.0 {
        return format!("{}s", seconds.round() as i64);
    }
    format!("{}m", (seconds / 60.0).round() as i64)
}

/// `1h 02m 03s` / `4m 05s` / `7s`, truncating fractional seconds.
pub(crate) fn clock_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

pub(crate) fn progress_ratio(offset_seconds: f64, duration_seconds: f64) -> f64 {
    if duration_seconds <= 0.0 {
        return 0.0;
    }
    (offset_seconds / duration_seconds).clamp(0.0, 1.0)
}
