use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::schedule::Frequency;

#[derive(Parser)]
#[command(name = "clinic-backup")]
#[command(about = "Backup and restore for the clinic database")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Back up the live database
    Create(CreateArgs),

    /// Replace the live database with a backup
    Restore(RestoreArgs),

    /// List known backups
    List(ListArgs),

    /// Delete a backup by name
    Delete(DeleteArgs),

    /// Delete all but the newest backups
    Prune(PruneArgs),

    /// Run automatic backups until interrupted
    Schedule(ScheduleArgs),

    /// Register backup files that are missing from the registry
    Adopt,
}

#[derive(Parser)]
pub struct CreateArgs {
    /// Write the backup here instead of the backups directory
    pub path: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RestoreArgs {
    /// Backup name or path
    pub target: String,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct DeleteArgs {
    pub name: String,
}

#[derive(Parser)]
pub struct PruneArgs {
    /// Number of backups to keep (defaults to config)
    #[arg(long)]
    pub keep: Option<usize>,
}

#[derive(Parser)]
pub struct ScheduleArgs {
    /// hourly, daily, weekly or a duration such as 6h (defaults to config)
    #[arg(long)]
    pub frequency: Option<Frequency>,

    /// Number of backups to keep after each run (defaults to config)
    #[arg(long)]
    pub keep: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_schedule_frequency() {
        let cli = Cli::try_parse_from(["clinic-backup", "schedule", "--frequency", "weekly", "--keep", "4"]).unwrap();
        match cli.command {
            Command::Schedule(args) => {
                assert_eq!(args.frequency, Some(Frequency::Weekly));
                assert_eq!(args.keep, Some(4));
            }
            _ => panic!("expected schedule"),
        }
    }

    #[test]
    fn rejects_unknown_frequency() {
        assert!(Cli::try_parse_from(["clinic-backup", "schedule", "--frequency", "monthly"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["clinic-backup", "list", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::List(ListArgs { json: true })));
    }
}
