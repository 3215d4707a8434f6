use chrono::{DateTime, Utc};

use crate::backup::BackupView;
use crate::util::format_age;

pub fn render(views: &[BackupView], now: DateTime<Utc>) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<36} {:<20} {:>10} {:<8} {}\n",
        "Name", "Created", "Size", "Format", "Age"
    ));
    output.push_str(&format!("{}\n", "-".repeat(90)));

    for view in views {
        let record = &view.record;
        let format = if view.is_legacy_format { "legacy" } else { "current" };
        output.push_str(&format!(
            "{:<36} {:<20} {:>10} {:<8} {}\n",
            record.name,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            view.formatted_size,
            format,
            format_age(record.created_at, now)
        ));
    }

    output
}
