//! Partitioner and orchestrator.
//!
//! Work is partitioned by volume. The indexing strategy is
//! **arena-per-worker, merge-commit**: every volume job writes into an
//! [`Arena`] (a private worker store) that no other thread ever opens, and
//! only after every job has finished does the orchestrating thread fold the
//! arenas into the canonical store through the [`MergeEngine`].
//!
//! ## Modes
//!
//! - **Sequential**: volumes run one after another on the calling thread,
//!   all writing into a single shared arena.
//! - **Parallel**: a fixed pool of worker threads pulls volume jobs from a
//!   queue; each job gets its own arena file.
//!
//! ## Failure isolation
//!
//! Every volume job runs behind a panic boundary. A failing volume becomes a
//! [`FailureRecord`] in the [`RunReport`] and never affects its siblings.
//! With a per-volume timeout configured, a parallel job that overruns is
//! recorded as `VolumeTimedOut`. Its arena is discarded and its thread is left
//! to finish on its own.
//!
//! Sequential mode runs on the calling thread and cannot abandon it. The
//! deadline is checked before and after each container, and a volume that
//! overran has the containers it recorded removed from the shared arena. A
//! single container read that blocks (a hung network mount) holds up the
//! whole run; use parallel mode when that matters.
//!
//! ## Cancellation
//!
//! A [`CancellationToken`] stops new jobs from starting and makes running
//! jobs stop between containers. Everything recorded so far is still merged,
//! then the run returns [`ZipdexError::UserCancelled`] carrying the
//! [`RunReport`], merge failures included.

use crate::config::{Config, RunMode};
use crate::error::{FailureRecord, Result, ZipdexError};
use crate::merge::{MergeEngine, MergeSummary};
use crate::progress::{NoProgress, ProgressEvent, ProgressSink, SharedProgress};
use crate::scanner::{ArchiveScanner, ContainerMeta};
use crate::store::{remove_store_files, Arena, Store};
use crate::types::{ContainerId, ContainerRecord, VolumeId};
use crate::volume::{discover_containers, VolumeInfo, VolumeSource};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Cooperative cancellation flag shared between the caller and the workers.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a volume job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    /// Every container was scanned
    Completed,
    /// Stopped between containers by cancellation; recorded rows are kept
    Cancelled,
    /// Never started because the run was cancelled
    Skipped,
    /// See the failure record
    Failed,
}

/// Per-volume outcome.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeReport {
    pub volume: VolumeId,
    pub root: PathBuf,
    pub status: VolumeStatus,
    pub containers_found: usize,
    pub containers_recorded: usize,
    pub entries_recorded: usize,
    pub elapsed_ms: u64,
    pub failure: Option<FailureRecord>,
}

impl VolumeReport {
    fn new(volume: &VolumeInfo, status: VolumeStatus) -> Self {
        VolumeReport {
            volume: volume.id.clone(),
            root: volume.root.clone(),
            status,
            containers_found: 0,
            containers_recorded: 0,
            entries_recorded: 0,
            elapsed_ms: 0,
            failure: None,
        }
    }

    fn failed(volume: &VolumeInfo, error: &ZipdexError) -> Self {
        let mut report = VolumeReport::new(volume, VolumeStatus::Failed);
        report.failure = Some(FailureRecord::new(volume.id.clone(), error));
        report
    }
}

/// Everything a run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub volumes: Vec<VolumeReport>,
    pub merge: MergeSummary,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Volume failures followed by merge failures
    pub fn failures(&self) -> Vec<&FailureRecord> {
        self.volumes
            .iter()
            .filter_map(|v| v.failure.as_ref())
            .chain(self.merge.failures.iter())
            .collect()
    }

    /// Number of volumes that ended with `status`
    pub fn count(&self, status: VolumeStatus) -> usize {
        self.volumes.iter().filter(|v| v.status == status).count()
    }
}

/// Shared, read-only state for volume jobs.
struct JobContext {
    config: Arc<Config>,
    scanner: ArchiveScanner,
    sink: SharedProgress,
    cancel: CancellationToken,
}

/// Runs indexing passes.
pub struct Orchestrator {
    config: Arc<Config>,
    sink: SharedProgress,
    cancel: CancellationToken,
    volume_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>) -> Self {
        let volume_timeout = config.volume_timeout();
        Orchestrator {
            config,
            sink: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
            volume_timeout,
        }
    }

    /// Report progress to `sink`
    pub fn with_progress(mut self, sink: SharedProgress) -> Self {
        self.sink = sink;
        self
    }

    /// Use an existing cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Override the configured per-volume timeout
    pub fn with_volume_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.volume_timeout = timeout;
        self
    }

    /// Token that cancels this orchestrator's runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Index the volumes supplied by `source`.
    pub fn run_source(&self, source: &dyn VolumeSource, canonical: &mut Store) -> Result<RunReport> {
        let volumes = source.volumes()?;
        self.run(&volumes, canonical)
    }

    /// Scan `volumes`, then merge the results into `canonical`.
    ///
    /// Per-volume and per-store faults are reported in the returned
    /// [`RunReport`]. The only errors are failing to create the shared arena
    /// in sequential mode and [`ZipdexError::UserCancelled`].
    pub fn run(&self, volumes: &[VolumeInfo], canonical: &mut Store) -> Result<RunReport> {
        let started = Instant::now();
        let volumes = dedup_volumes(volumes);
        let mode = self.config.workers.mode;
        let run_tag = Uuid::new_v4().simple().to_string()[..8].to_string();

        info!(?mode, volumes = volumes.len(), run = %run_tag, "Starting indexing run");

        let ctx = Arc::new(JobContext {
            config: Arc::clone(&self.config),
            scanner: ArchiveScanner::new(&self.config.scan),
            sink: Arc::clone(&self.sink),
            cancel: self.cancel.clone(),
        });

        let (reports, arenas) = match mode {
            RunMode::Sequential => self.run_sequential(&ctx, &volumes, canonical.path(), &run_tag)?,
            RunMode::Parallel => self.run_parallel(&ctx, &volumes, canonical.path(), &run_tag),
        };

        let merge = MergeEngine::new(Arc::clone(&self.config)).merge(
            &arenas,
            canonical,
            self.sink.as_ref(),
        );

        let report = RunReport {
            mode,
            volumes: reports,
            merge,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            completed = report.count(VolumeStatus::Completed),
            failed = report.count(VolumeStatus::Failed),
            containers = report.merge.containers_merged,
            entries = report.merge.entries_merged,
            elapsed_ms = report.elapsed_ms,
            "Indexing run finished"
        );

        if self.cancel.is_cancelled() {
            return Err(ZipdexError::UserCancelled {
                completed: report.count(VolumeStatus::Completed),
                skipped: report.count(VolumeStatus::Skipped),
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    fn run_sequential(
        &self,
        ctx: &Arc<JobContext>,
        volumes: &[VolumeInfo],
        canonical_path: &Path,
        run_tag: &str,
    ) -> Result<(Vec<VolumeReport>, Vec<PathBuf>)> {
        let mut reports = Vec::with_capacity(volumes.len());
        if ctx.cancel.is_cancelled() {
            reports.extend(volumes.iter().map(|v| VolumeReport::new(v, VolumeStatus::Skipped)));
            return Ok((reports, Vec::new()));
        }

        let mut arena = Arena::create(&arena_path(canonical_path, run_tag, "seq"))?;

        for volume in volumes {
            if ctx.cancel.is_cancelled() {
                reports.push(VolumeReport::new(volume, VolumeStatus::Skipped));
                continue;
            }

            let deadline = self.volume_timeout.map(|t| Instant::now() + t);
            let job_started = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                scan_volume(ctx, volume, &mut arena, deadline)
            }));

            let mut report = match outcome {
                Ok(scan) => {
                    if scan.timed_out {
                        // Drop what this volume wrote to the shared arena
                        if let Err(e) = arena.remove_containers(&scan.recorded) {
                            warn!(volume = %volume.id, error = %e, "Failed to discard timed out volume");
                        }
                        timed_out_report(volume, self.volume_timeout)
                    } else {
                        scan.into_report(volume)
                    }
                }
                Err(payload) => panicked_report(volume, payload),
            };
            report.elapsed_ms = job_started.elapsed().as_millis() as u64;
            emit_outcome(ctx, &report);
            reports.push(report);
        }

        let path = arena.finish()?;
        Ok((reports, vec![path]))
    }

    fn run_parallel(
        &self,
        ctx: &Arc<JobContext>,
        volumes: &[VolumeInfo],
        canonical_path: &Path,
        run_tag: &str,
    ) -> (Vec<VolumeReport>, Vec<PathBuf>) {
        let worker_count = self.config.worker_count(volumes.len());
        debug!(workers = worker_count, "Starting worker pool");

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, VolumeInfo)>();
        let (result_tx, result_rx) =
            crossbeam_channel::unbounded::<(usize, VolumeReport, Option<PathBuf>)>();
        for (index, volume) in volumes.iter().enumerate() {
            // The receiver is alive until the pool is joined
            let _ = job_tx.send((index, volume.clone()));
        }
        drop(job_tx);

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let ctx = Arc::clone(ctx);
            let canonical_path = canonical_path.to_path_buf();
            let run_tag = run_tag.to_string();
            let timeout = self.volume_timeout;

            let spawned = thread::Builder::new()
                .name(format!("zipdex-worker-{}", worker_id))
                .spawn(move || {
                    while let Ok((index, volume)) = job_rx.recv() {
                        let (report, arena) = if ctx.cancel.is_cancelled() {
                            (VolumeReport::new(&volume, VolumeStatus::Skipped), None)
                        } else {
                            let path = arena_path(
                                &canonical_path,
                                &run_tag,
                                &format!("{}-{}", index, sanitize(volume.id.as_str())),
                            );
                            run_isolated(&ctx, &volume, path, timeout)
                        };
                        let _ = result_tx.send((index, report, arena));
                    }
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => error!(worker = worker_id, error = %e, "Failed to spawn worker thread"),
            }
        }
        drop(result_tx);

        for handle in handles {
            if handle.join().is_err() {
                error!("Worker thread panicked outside a volume job");
            }
        }

        let mut slots: Vec<Option<(VolumeReport, Option<PathBuf>)>> = vec![None; volumes.len()];
        for (index, report, arena) in result_rx.iter() {
            slots[index] = Some((report, arena));
        }

        let mut reports = Vec::with_capacity(volumes.len());
        let mut arenas = Vec::new();
        for (volume, slot) in volumes.iter().zip(slots) {
            match slot {
                Some((report, arena)) => {
                    reports.push(report);
                    arenas.extend(arena);
                }
                // Only possible if no worker thread could be spawned
                None => reports.push(VolumeReport::new(volume, VolumeStatus::Skipped)),
            }
        }
        (reports, arenas)
    }
}

/// Result handoff between a volume job thread and the pool thread waiting on it.
enum SlotState {
    Running,
    Done(VolumeReport, Option<PathBuf>),
    /// The waiter gave up; the job cleans up after itself
    Abandoned,
}

struct JobSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl JobSlot {
    fn new() -> Self {
        JobSlot {
            state: Mutex::new(SlotState::Running),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, report: VolumeReport, arena: Option<PathBuf>) {
        let mut state = self.state.lock();
        if matches!(*state, SlotState::Abandoned) {
            drop(state);
            debug!(volume = %report.volume, "Late volume job finished, discarding its arena");
            if let Some(path) = arena {
                if let Err(e) = remove_store_files(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to delete abandoned arena");
                }
            }
            return;
        }
        *state = SlotState::Done(report, arena);
        self.ready.notify_all();
    }

    /// Wait for the job, or give up after `timeout`.
    fn wait(&self, timeout: Option<Duration>) -> Option<(VolumeReport, Option<PathBuf>)> {
        let mut state = self.state.lock();
        let running = |s: &mut SlotState| matches!(s, SlotState::Running);
        match timeout {
            Some(timeout) => {
                self.ready.wait_while_for(&mut state, running, timeout);
            }
            None => self.ready.wait_while(&mut state, running),
        }
        match std::mem::replace(&mut *state, SlotState::Abandoned) {
            SlotState::Done(report, arena) => Some((report, arena)),
            _ => None,
        }
    }
}

/// Run one volume job on its own thread behind a panic boundary and a timeout.
fn run_isolated(
    ctx: &Arc<JobContext>,
    volume: &VolumeInfo,
    path: PathBuf,
    timeout: Option<Duration>,
) -> (VolumeReport, Option<PathBuf>) {
    let started = Instant::now();
    let slot = Arc::new(JobSlot::new());

    let spawned = {
        let slot = Arc::clone(&slot);
        let ctx = Arc::clone(ctx);
        let volume = volume.clone();
        thread::Builder::new()
            .name(format!("zipdex-volume-{}", sanitize(volume.id.as_str())))
            .spawn(move || {
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| run_volume_job(&ctx, &volume, &path, started, timeout)));
                let (report, arena) = match outcome {
                    Ok(done) => done,
                    Err(payload) => {
                        // Rows written before the panic are complete per container
                        let arena = path.exists().then(|| path.clone());
                        (panicked_report(&volume, payload), arena)
                    }
                };
                slot.complete(report, arena);
            })
    };

    if let Err(e) = spawned {
        let report = VolumeReport::failed(volume, &ZipdexError::Io(e));
        emit_outcome(ctx, &report);
        return (report, None);
    }

    let (mut report, arena) = match slot.wait(timeout) {
        Some(done) => done,
        None => {
            warn!(volume = %volume.id, "Volume job timed out, detaching");
            (timed_out_report(volume, timeout), None)
        }
    };
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    emit_outcome(ctx, &report);
    (report, arena)
}

/// Body of a parallel volume job: fresh arena, scan, close.
fn run_volume_job(
    ctx: &JobContext,
    volume: &VolumeInfo,
    path: &Path,
    started: Instant,
    timeout: Option<Duration>,
) -> (VolumeReport, Option<PathBuf>) {
    let deadline = timeout.map(|t| started + t);
    let mut arena = match Arena::create(path) {
        Ok(arena) => arena,
        Err(e) => return (VolumeReport::failed(volume, &e), None),
    };

    let scan = scan_volume(ctx, volume, &mut arena, deadline);

    if scan.timed_out {
        if let Err(e) = arena.discard() {
            warn!(path = %path.display(), error = %e, "Failed to discard arena");
        }
        return (timed_out_report(volume, timeout), None);
    }

    let report = scan.into_report(volume);
    match arena.finish() {
        Ok(path) => (report, Some(path)),
        Err(e) => (VolumeReport::failed(volume, &e), Some(path.to_path_buf())),
    }
}

/// What happened while scanning one volume into an arena.
struct VolumeScan {
    containers_found: usize,
    /// Containers this job wrote, in order
    recorded: Vec<ContainerId>,
    entries_recorded: usize,
    cancelled: bool,
    timed_out: bool,
    error: Option<ZipdexError>,
}

impl VolumeScan {
    fn into_report(self, volume: &VolumeInfo) -> VolumeReport {
        let status = if self.error.is_some() {
            VolumeStatus::Failed
        } else if self.cancelled {
            VolumeStatus::Cancelled
        } else {
            VolumeStatus::Completed
        };
        VolumeReport {
            volume: volume.id.clone(),
            root: volume.root.clone(),
            status,
            containers_found: self.containers_found,
            containers_recorded: self.recorded.len(),
            entries_recorded: self.entries_recorded,
            elapsed_ms: 0,
            failure: self
                .error
                .as_ref()
                .map(|e| FailureRecord::new(volume.id.clone(), e)),
        }
    }
}

#[instrument(skip_all, fields(volume = %volume.id))]
fn scan_volume(
    ctx: &JobContext,
    volume: &VolumeInfo,
    arena: &mut Arena,
    deadline: Option<Instant>,
) -> VolumeScan {
    let mut scan = VolumeScan {
        containers_found: 0,
        recorded: Vec::new(),
        entries_recorded: 0,
        cancelled: false,
        timed_out: false,
        error: None,
    };
    let expired = || deadline.map(|d| Instant::now() >= d).unwrap_or(false);

    if let Err(e) = arena.add_volume(&volume.id) {
        scan.error = Some(e);
        return scan;
    }

    let containers = match discover_containers(volume, &ctx.config.scan) {
        Ok(containers) => containers,
        Err(e) => {
            scan.error = Some(e);
            return scan;
        }
    };
    scan.containers_found = containers.len();
    ctx.sink.report(ProgressEvent::VolumeStarted {
        volume: volume.id.clone(),
        containers: containers.len(),
    });

    for path in &containers {
        if ctx.cancel.is_cancelled() {
            info!(volume = %volume.id, "Cancelled between containers");
            scan.cancelled = true;
            break;
        }
        if expired() {
            scan.timed_out = true;
            break;
        }

        let entries = ctx.scanner.scan(path, ctx.sink.as_ref());
        if expired() {
            // Overran while reading this container
            scan.timed_out = true;
            break;
        }
        if entries.is_empty() {
            continue;
        }

        let meta = ContainerMeta::probe(path);
        let mut record = ContainerRecord::new(
            volume.id.clone(),
            path.to_string_lossy().into_owned(),
            meta.size,
        );
        if let Some(modified) = meta.modified_at {
            record = record.with_modified(modified);
        }
        if let Some(hash) = ctx.scanner.hash_container(path, meta.size) {
            record = record.with_hash(hash);
        }

        match arena.record(&record, &entries) {
            Ok(stored) => {
                scan.recorded.push(record.id);
                scan.entries_recorded += stored;
            }
            Err(e) => {
                error!(volume = %volume.id, path = %path.display(), error = %e, "Failed to record container");
                scan.error = Some(e);
                break;
            }
        }
    }

    scan
}

fn timed_out_report(volume: &VolumeInfo, timeout: Option<Duration>) -> VolumeReport {
    VolumeReport::failed(
        volume,
        &ZipdexError::VolumeTimedOut {
            volume: volume.id.clone(),
            seconds: timeout.map(|t| t.as_secs()).unwrap_or_default(),
        },
    )
}

fn panicked_report(volume: &VolumeInfo, payload: Box<dyn Any + Send>) -> VolumeReport {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(volume = %volume.id, %reason, "Volume job panicked");
    VolumeReport::failed(
        volume,
        &ZipdexError::WorkerPanicked {
            volume: volume.id.clone(),
            reason,
        },
    )
}

fn emit_outcome(ctx: &JobContext, report: &VolumeReport) {
    match &report.failure {
        Some(failure) => ctx.sink.report(ProgressEvent::VolumeFailed {
            volume: report.volume.clone(),
            kind: failure.kind,
            message: failure.message.clone(),
        }),
        None => ctx.sink.report(ProgressEvent::VolumeFinished {
            volume: report.volume.clone(),
            containers: report.containers_recorded,
            entries: report.entries_recorded,
        }),
    }
}

/// Drop repeated roots, keeping the first occurrence.
fn dedup_volumes(volumes: &[VolumeInfo]) -> Vec<VolumeInfo> {
    let mut seen = HashSet::new();
    volumes
        .iter()
        .filter(|v| {
            let fresh = seen.insert(v.root.clone());
            if !fresh {
                warn!(root = %v.root.display(), "Ignoring repeated volume root");
            }
            fresh
        })
        .cloned()
        .collect()
}

/// Worker store path next to the canonical store.
fn arena_path(canonical: &Path, run_tag: &str, suffix: &str) -> PathBuf {
    let name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "zipdex.db".to_string());
    canonical.with_file_name(format!("{}.arena-{}-{}.tmp", name, run_tag, suffix))
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
