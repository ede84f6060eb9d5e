use chrono::{DateTime, Local, Utc};
use humansize::{format_size as humansize_format, BINARY};

/// Format a byte count in binary units (KiB, MiB, GiB)
pub fn format_size(size: u64) -> String {
    humansize_format(size, BINARY)
}

/// Format a 0-100 percentage with one decimal
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Format a UTC timestamp in local time (YYYY-MM-DD HH:MM:SS)
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    let local: DateTime<Local> = timestamp.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}
