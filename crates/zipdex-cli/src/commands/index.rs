//! Index command - scan volumes and merge into the index.

use crate::app::App;
use crate::mounts::MountPoints;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use zipdex_core::{
    Config, DiscoveryMode, LineProgress, NoProgress, Orchestrator, RunMode, RunReport,
    SharedProgress, StaticVolumes, Store, VolumeSource, VolumeStatus, ZipdexError,
};

/// Command-line overrides for one indexing run.
pub struct IndexOptions {
    pub roots: Vec<PathBuf>,
    pub sequential: bool,
    pub workers: Option<usize>,
    pub all_files: bool,
    pub hash: bool,
    pub takeout: bool,
    pub timeout: Option<u64>,
    pub verbose: bool,
    pub quiet: bool,
}

impl IndexOptions {
    fn apply(&self, config: &mut Config) {
        if self.sequential {
            config.workers.mode = RunMode::Sequential;
        }
        if let Some(workers) = self.workers {
            config.workers.max_workers = workers;
        }
        if self.all_files {
            config.scan.accept_all = true;
        }
        if self.hash {
            config.scan.hashing = true;
        }
        if self.takeout {
            config.scan.discovery = DiscoveryMode::Takeout;
        }
        if let Some(timeout) = self.timeout {
            config.workers.volume_timeout_secs = timeout;
        }
    }
}

/// Run the index command.
pub fn run(mut config: Config, options: IndexOptions) -> anyhow::Result<()> {
    options.apply(&mut config);
    config.validate()?;

    let app = App::new(config)?;

    let source: Box<dyn VolumeSource> = if options.roots.is_empty() {
        Box::new(MountPoints::new(Arc::clone(&app.config)))
    } else {
        Box::new(StaticVolumes::from_roots(options.roots.iter().cloned()))
    };
    let volumes = source.volumes()?;
    if volumes.is_empty() {
        println!("No volumes to scan.");
        return Ok(());
    }

    if !options.quiet {
        println!(
            "Scanning {} volume(s) ({} mode)...",
            volumes.len(),
            match app.config.workers.mode {
                RunMode::Sequential => "sequential",
                RunMode::Parallel => "parallel",
            }
        );
        for volume in &volumes {
            println!("  {} ({})", volume.id, volume.root.display());
        }
        println!();
    }

    let sink: SharedProgress = if options.quiet {
        Arc::new(NoProgress)
    } else {
        Arc::new(LineProgress::new(io::stderr(), options.verbose))
    };

    let mut store = app.open_or_create_store()?;
    match Orchestrator::new(Arc::clone(&app.config))
        .with_progress(sink)
        .run(&volumes, &mut store)
    {
        Ok(report) => print_report("Indexing complete!", &report, &store),
        Err(ZipdexError::UserCancelled {
            completed,
            skipped,
            report,
        }) => {
            eprintln!(
                "Run cancelled: {} volume(s) completed, {} not started",
                completed, skipped
            );
            print_report("Indexing cancelled.", &report, &store)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(heading: &str, report: &RunReport, store: &Store) -> anyhow::Result<()> {
    let completed = report.count(VolumeStatus::Completed);
    let stats = store.stats()?;

    println!();
    println!("{}", heading);
    println!("  Volumes:     {} of {} completed", completed, report.volumes.len());
    println!("  Archives:    {} added", report.merge.containers_merged);
    println!("  Entries:     {} added", report.merge.entries_merged);
    println!(
        "  Index:       {} archives, {} entries",
        stats.containers, stats.entries
    );
    println!("  Time:        {:.2}s", report.elapsed_ms as f64 / 1000.0);

    let failures = report.failures();
    if !failures.is_empty() {
        println!();
        println!("Problems:");
        for failure in failures {
            println!("  [{}] {}: {}", failure.volume, failure.kind, failure.message);
        }
    }

    Ok(())
}
