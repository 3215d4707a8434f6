//! Automatic backups on a fixed interval.
//!
//! The schedule lives only as long as its [`ScheduleHandle`]; nothing is
//! persisted, so hosts re-arm it from configuration on every start.

use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backup::BackupManager;
use crate::error::BackupError;
use crate::events::{Event, EventSink};

/// Backups kept after each scheduled run.
pub const DEFAULT_KEEP_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
    Every(Duration),
}

impl Frequency {
    pub fn interval(&self) -> Duration {
        match self {
            Frequency::Hourly => Duration::from_millis(3_600_000),
            Frequency::Daily => Duration::from_millis(86_400_000),
            Frequency::Weekly => Duration::from_millis(604_800_000),
            Frequency::Every(interval) => *interval,
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            other => match humantime::parse_duration(other) {
                Ok(d) if !d.is_zero() => Ok(Frequency::Every(d)),
                _ => Err(format!(
                    "unknown schedule '{s}': expected hourly, daily, weekly or a duration like 6h"
                )),
            },
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Hourly => f.write_str("hourly"),
            Frequency::Daily => f.write_str("daily"),
            Frequency::Weekly => f.write_str("weekly"),
            Frequency::Every(d) => write!(f, "every {}", humantime::format_duration(*d)),
        }
    }
}

/// Running schedule. Stops when [`stop`](ScheduleHandle::stop) is called or
/// the handle is dropped; a backup already in progress finishes first.
pub struct ScheduleHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    interval: Duration,
}

impl ScheduleHandle {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Block the calling thread for the lifetime of the schedule.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Every `frequency`, create a backup and prune to `keep`. The first run
/// happens one interval after the call.
///
/// Each run holds the manager lock for its whole duration, so it never
/// overlaps with other callers that go through the same mutex.
pub fn schedule(
    manager: Arc<Mutex<BackupManager>>,
    frequency: Frequency,
    keep: usize,
) -> Result<ScheduleHandle, BackupError> {
    let interval = frequency.interval();
    let events = manager
        .lock()
        .map_err(|_| BackupError::ManagerPoisoned)?
        .events();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let thread = thread::Builder::new()
        .name("backup-scheduler".to_string())
        .spawn(move || {
            events.emit(&Event::ScheduleStarted { interval });
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => run_once(&manager, keep, events.as_ref()),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            events.emit(&Event::ScheduleStopped);
        })
        .map_err(BackupError::SchedulerSpawn)?;

    Ok(ScheduleHandle {
        stop: Some(stop_tx),
        thread: Some(thread),
        interval,
    })
}

fn run_once(manager: &Mutex<BackupManager>, keep: usize, events: &dyn EventSink) {
    let Ok(manager) = manager.lock() else {
        events.emit(&Event::ScheduledRunFailed {
            error: BackupError::ManagerPoisoned.to_string(),
        });
        return;
    };

    if let Err(e) = manager.create_backup(None) {
        events.emit(&Event::ScheduledRunFailed { error: e.to_string() });
        return;
    }
    // per-backup failures are already reported by prune itself
    if let Err(e) = manager.prune(keep) {
        events.emit(&Event::ScheduledRunFailed { error: e.to_string() });
    }
}
