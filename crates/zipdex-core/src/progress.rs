//! Progress reporting.
//!
//! The core never prints. Scanner, orchestrator and merge engine describe
//! what they are doing as [`ProgressEvent`]s and hand them to a
//! [`ProgressSink`]. Rendering is the caller's business.

use crate::error::FailureKind;
use crate::types::VolumeId;
use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A volume job started and found this many candidate containers
    VolumeStarted { volume: VolumeId, containers: usize },

    /// A container with more entries than the large-container threshold was opened
    LargeContainer { path: PathBuf, entries: usize },

    /// Periodic liveness signal while walking a large container or extracting
    Heartbeat {
        path: PathBuf,
        processed: u64,
        total: u64,
    },

    /// A container was enumerated
    ContainerScanned {
        path: PathBuf,
        entries: usize,
        matched: usize,
    },

    /// A container could not be opened or parsed; it was skipped
    ContainerUnreadable { path: PathBuf, reason: String },

    /// A volume job completed
    VolumeFinished {
        volume: VolumeId,
        containers: usize,
        entries: usize,
    },

    /// A volume job failed
    VolumeFailed {
        volume: VolumeId,
        kind: FailureKind,
        message: String,
    },

    /// One worker store was folded into the canonical store
    StoreMerged {
        store: PathBuf,
        containers: usize,
        entries: usize,
    },
}

/// Receiver of progress events.
///
/// Implementations are shared between worker threads and must be cheap to
/// call; the scanner only reports at heartbeat granularity.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Shared handle to a progress sink
pub type SharedProgress = Arc<dyn ProgressSink>;

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// A simple progress reporter that logs to tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgress;

impl ProgressSink for LoggingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::VolumeStarted { volume, containers } => {
                tracing::info!(volume = %volume, containers, "Scanning volume");
            }
            ProgressEvent::LargeContainer { path, entries } => {
                tracing::info!(path = %path.display(), entries, "Scanning large container");
            }
            ProgressEvent::Heartbeat {
                path,
                processed,
                total,
            } => {
                tracing::debug!(path = %path.display(), processed, total, "Still working");
            }
            ProgressEvent::ContainerScanned {
                path,
                entries,
                matched,
            } => {
                tracing::debug!(path = %path.display(), entries, matched, "Container scanned");
            }
            ProgressEvent::ContainerUnreadable { path, reason } => {
                tracing::warn!(path = %path.display(), %reason, "Skipping unreadable container");
            }
            ProgressEvent::VolumeFinished {
                volume,
                containers,
                entries,
            } => {
                tracing::info!(volume = %volume, containers, entries, "Volume complete");
            }
            ProgressEvent::VolumeFailed {
                volume,
                kind,
                message,
            } => {
                tracing::error!(volume = %volume, %kind, %message, "Volume failed");
            }
            ProgressEvent::StoreMerged {
                store,
                containers,
                entries,
            } => {
                tracing::info!(store = %store.display(), containers, entries, "Worker store merged");
            }
        }
    }
}

/// Forwards events over a crossbeam channel
pub struct ChannelProgress {
    sender: crossbeam_channel::Sender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create a new channel-based sink
    pub fn new() -> (Self, crossbeam_channel::Receiver<ProgressEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (ChannelProgress { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.sender.send(event);
    }
}

/// Writes one status line per event to a writer shared by all workers.
///
/// The mutex only serializes whole lines; it is never held across any
/// scanning work.
pub struct LineProgress<W: Write + Send> {
    out: Mutex<W>,
    verbose: bool,
}

impl<W: Write + Send> LineProgress<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        LineProgress {
            out: Mutex::new(out),
            verbose,
        }
    }

    /// Recover the writer (used by tests)
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn render(&self, event: &ProgressEvent) -> Option<String> {
        let line = match event {
            ProgressEvent::VolumeStarted { volume, containers } => {
                format!("[{}] scanning {} container(s)", volume, containers)
            }
            ProgressEvent::LargeContainer { path, entries } => {
                format!("scanning large zip ({} files): {}", entries, path.display())
            }
            ProgressEvent::Heartbeat {
                path,
                processed,
                total,
            } => {
                if !self.verbose {
                    return None;
                }
                format!("  ... {}/{} {}", processed, total, path.display())
            }
            ProgressEvent::ContainerScanned {
                path,
                entries,
                matched,
            } => {
                if !self.verbose || *matched == 0 {
                    return None;
                }
                format!(
                    "  {}: {} of {} entries matched",
                    path.display(),
                    matched,
                    entries
                )
            }
            ProgressEvent::ContainerUnreadable { path, reason } => {
                format!("  skipped {}: {}", path.display(), reason)
            }
            ProgressEvent::VolumeFinished {
                volume,
                containers,
                entries,
            } => format!(
                "[{}] done: {} container(s), {} entries",
                volume, containers, entries
            ),
            ProgressEvent::VolumeFailed {
                volume,
                kind,
                message,
            } => format!("[{}] failed ({}): {}", volume, kind, message),
            ProgressEvent::StoreMerged {
                containers,
                entries,
                ..
            } => format!("merged {} container(s), {} entries", containers, entries),
        };
        Some(line)
    }
}

impl<W: Write + Send> ProgressSink for LineProgress<W> {
    fn report(&self, event: ProgressEvent) {
        if let Some(line) = self.render(&event) {
            let mut out = self.out.lock();
            let _ = writeln!(out, "{}", line);
        }
    }
}

/// Rate limiter for heartbeat events.
///
/// The first call arms the timer; later calls fire at most once per interval.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    last: Option<Instant>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Heartbeat {
            interval,
            last: None,
        }
    }

    /// Returns true when a heartbeat is due.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            None => {
                self.last = Some(now);
                false
            }
            Some(last) if now.duration_since(last) >= self.interval => {
                self.last = Some(now);
                true
            }
            Some(_) => false,
        }
    }
}
