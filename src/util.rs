use chrono::{DateTime, SecondsFormat, Utc};

/// Human-readable byte size, e.g. `1.50 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Backup name for a creation time: `backup_2026-10-19T08-30-00-123Z`.
/// Separators that are awkward in file names are replaced with `-`.
pub fn backup_name(at: DateTime<Utc>) -> String {
    let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("backup_{}", stamp.replace([':', '.'], "-"))
}

/// Rough age of a timestamp for list output, e.g. `3h 12m`.
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0) as u64;
    // minute resolution is enough for a listing
    let rounded = std::time::Duration::from_secs(secs - secs % 60);
    if rounded.is_zero() {
        return "just now".to_string();
    }
    humantime::format_duration(rounded).to_string()
}
