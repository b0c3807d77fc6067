//! Zero-padded clock strings for elapsed durations.

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    }
}

/// `MM:SS` for the live phase display. Hours are dropped, a phase block never spans one.
pub fn format_compact(seconds: f64) -> String {
    format_compact_secs(whole_seconds(seconds))
}

pub fn format_compact_secs(total: u64) -> String {
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// `HH:MM:SS` for session totals.
pub fn format_full(seconds: f64) -> String {
    format_full_secs(whole_seconds(seconds))
}

pub fn format_full_secs(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
