//! Human-readable durations for the ride feed and profile cards.

/// `MM:SS`, switching to `HH:MM:SS` once the ride reaches an hour.
pub fn format_clock(total_secs: u64) -> String {
    let hrs = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hrs > 0 {
        format!("{hrs:02}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

/// Total saddle time, e.g. `"42 min"` or `"3 h 5 min"`.
pub fn format_total_duration(total_secs: u64) -> String {
    let hrs = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;

    if hrs == 0 {
        format!("{mins} min")
    } else {
        format!("{hrs} h {mins} min")
    }
}
