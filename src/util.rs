/// Render an epoch timestamp as a coarse "how long ago" label.
///
/// Buckets are deliberately approximate: a month is a flat 30 days and a
/// year a flat 365. Anything under a minute, including timestamps slightly
/// in the future, renders as "now!".
#[must_use]
pub fn time_since(since_epoch_secs: f64, now_epoch_secs: f64) -> String {
    const MINUTE: f64 = 60.0;
    const HOUR: f64 = MINUTE * 60.0;
    const DAY: f64 = HOUR * 24.0;
    const MONTH: f64 = DAY * 30.0;
    const YEAR: f64 = DAY * 365.0;

    let elapsed = now_epoch_secs - since_epoch_secs;

    if elapsed < MINUTE {
        "now!".to_owned()
    } else if elapsed < HOUR {
        format!("{} minutes ago", (elapsed / MINUTE).round() as i64)
    } else if elapsed < DAY {
        format!("{} hours ago", (elapsed / HOUR).round() as i64)
    } else if elapsed < MONTH {
        format!("{} days ago", (elapsed / DAY).round() as i64)
    } else if elapsed < YEAR {
        format!("{} months ago", (elapsed / MONTH).round() as i64)
    } else {
        format!("{} years ago", (elapsed / YEAR).round() as i64)
    }
}

/// [`time_since`] against the wall clock.
#[must_use]
pub fn time_since_now(since_epoch_secs: f64) -> String {
    time_since(since_epoch_secs, chrono::Utc::now().timestamp() as f64)
}

/// Compute download progress as a percentage.
#[must_use]
pub fn progress_percent(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => (downloaded as f32 / total as f32) * 100.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    #[test]
    fn zero_elapsed_is_now() {
        assert_eq!(time_since(NOW, NOW), "now!");
    }

    #[test]
    fn future_timestamps_clamp_to_now() {
        assert_eq!(time_since(NOW + 30.0, NOW), "now!");
        assert_eq!(time_since(NOW + 86_400.0, NOW), "now!");
    }

    #[test]
    fn buckets_round_to_nearest_unit() {
        assert_eq!(time_since(NOW - 90.0, NOW), "2 minutes ago");
        assert_eq!(time_since(NOW - 7_200.0, NOW), "2 hours ago");
        assert_eq!(time_since(NOW - 172_800.0, NOW), "2 days ago");
        assert_eq!(time_since(NOW - 5_184_000.0, NOW), "2 months ago");
        assert_eq!(time_since(NOW - 63_072_000.0, NOW), "2 years ago");
    }

    #[test]
    fn thresholds_are_strict() {
        // A hair under an hour still formats as minutes, even though the
        // rounded count reads "60".
        assert_eq!(time_since(NOW - 3_599.9, NOW), "60 minutes ago");
        assert_eq!(time_since(NOW - 3_600.0, NOW), "1 hours ago");
        assert_eq!(time_since(NOW - 59.9, NOW), "now!");
    }

    #[test]
    fn calculates_progress_percent() {
        assert_eq!(progress_percent(0, Some(10)), 0.0);
        assert_eq!(progress_percent(5, Some(10)), 50.0);
        assert_eq!(progress_percent(10, Some(10)), 100.0);
        assert_eq!(progress_percent(5, None), 0.0);
    }
}
