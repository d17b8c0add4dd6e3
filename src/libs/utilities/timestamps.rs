use chrono::{DateTime, Local, TimeDelta};

/// Returns the current local time in RFC 3339 format, used in the report header.
pub fn current_timestamp() -> String {
    Local::now().to_rfc3339()
}

/// A filesystem-safe stamp (`20241016-093012`) used in log and backup file names.
pub fn file_stamp() -> String {
    stamp_of(&Local::now())
}

fn stamp_of(moment: &DateTime<Local>) -> String {
    moment.format("%Y%m%d-%H%M%S").to_string()
}

/// Formats how long a round took for the summary line.
///
/// # Arguments
/// * `elapsed` - Time between the start and end of the round.
///
/// # Returns
/// * "1m 05s" for anything a minute or longer, otherwise "12s" (sub-second rounds show "0s").
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let seconds = elapsed.num_seconds().max(0);
    if seconds >= 60 {
        format!("{}m {:02}s", seconds / 60, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}
