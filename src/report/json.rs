//! JSON output for backup listings, for scripting and piping.

use crate::backup::BackupView;

pub fn render(views: &[BackupView]) -> String {
    serde_json::to_string_pretty(views).unwrap_or_else(|_| String::from("[]"))
}
