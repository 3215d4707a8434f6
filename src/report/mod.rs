pub mod json;
pub mod table;

use crate::backup::{BackupView, PruneReport};

pub fn print_list(views: &[BackupView], json_output: bool) {
    if json_output {
        println!("{}", json::render(views));
    } else if views.is_empty() {
        println!("No backups found. Run 'clinic-backup create' to make one.");
    } else {
        print!("{}", table::render(views, chrono::Utc::now()));
    }
}

pub fn print_prune(report: &PruneReport) {
    for name in &report.deleted {
        println!("deleted: {name}");
    }

    if !report.errors.is_empty() {
        eprintln!("\nerrors encountered:");
        for error in &report.errors {
            eprintln!("  {error}");
        }
    }

    println!("\nkept {} backup(s), deleted {}", report.kept, report.deleted.len());
}
