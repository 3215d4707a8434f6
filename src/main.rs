use std::sync::{Arc, Mutex};

use clap::Parser;
use clinic_backup::backup::BackupManager;
use clinic_backup::cli::{Cli, Command};
use clinic_backup::config::Config;
use clinic_backup::error::BackupError;
use clinic_backup::report;
use clinic_backup::schedule;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(e: &BackupError) -> ! {
    eprintln!("error: {e}");
    match e {
        BackupError::RestoreRolledBack { .. } => {
            eprintln!("the live database is unchanged; it is safe to retry");
        }
        BackupError::RollbackFailed { snapshot: Some(snapshot), .. } => {
            eprintln!(
                "the live database may be damaged; copy {} back over it before reopening the application",
                snapshot.display()
            );
        }
        _ => {}
    }
    std::process::exit(1);
}

fn run(cli: Cli) -> Result<(), BackupError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut manager = BackupManager::from_config(&config);

    match cli.command {
        Command::Create(args) => {
            let path = manager.create_backup(args.path.as_deref())?;
            println!("{}", path.display());
        }
        Command::Restore(args) => {
            manager.restore_backup(&args.target)?;
            println!("restored {}; restart the application to reopen the database", args.target);
        }
        Command::List(args) => {
            let views = manager.list_backups()?;
            report::print_list(&views, args.json);
        }
        Command::Delete(args) => {
            manager.delete_backup(&args.name)?;
            println!("deleted {}", args.name);
        }
        Command::Prune(args) => {
            let result = manager.prune(args.keep.unwrap_or(config.keep))?;
            report::print_prune(&result);
        }
        Command::Schedule(args) => {
            let frequency = args.frequency.unwrap_or(config.schedule);
            let keep = args.keep.unwrap_or(config.keep);
            let manager = Arc::new(Mutex::new(manager));
            let handle = schedule::schedule(manager, frequency, keep)?;
            eprintln!("backing up {frequency}, keeping {keep}; press Ctrl-C to stop");
            handle.join();
        }
        Command::Adopt => {
            let count = manager.adopt_orphans()?;
            println!("registered {count} backup(s)");
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        fail(&e);
    }
}
