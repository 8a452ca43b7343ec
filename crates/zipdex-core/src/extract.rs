//! Entry extraction.
//!
//! Streams one entry out of a container into a directory. Existing files are
//! never overwritten: `clip.mp4` becomes `clip_1.mp4`, `clip_2.mp4`, ...

use crate::config::ScanConfig;
use crate::error::{Result, ZipdexError};
use crate::progress::{Heartbeat, ProgressEvent, ProgressSink};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

const COPY_BUFFER: usize = 64 * 1024;

/// Result of one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub container: PathBuf,
    pub path_in_container: String,
    pub target: PathBuf,
    pub bytes: u64,
}

/// Copies entries out of containers.
#[derive(Debug, Clone)]
pub struct Extractor {
    heartbeat_interval: Duration,
}

impl Extractor {
    pub fn new(scan: &ScanConfig) -> Self {
        Extractor {
            heartbeat_interval: Duration::from_millis(scan.heartbeat_interval_ms),
        }
    }

    /// Extract `path_in_container` from `container` into `out_dir`.
    ///
    /// The directory is created if needed. A partially written file is removed
    /// when the copy fails.
    pub fn extract(
        &self,
        container: &Path,
        path_in_container: &str,
        out_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<Extraction> {
        let unreadable = |reason: String| ZipdexError::ContainerUnreadable {
            path: container.to_path_buf(),
            reason,
        };
        let not_found = || ZipdexError::EntryNotFound {
            container: container.to_path_buf(),
            entry: path_in_container.to_string(),
        };

        let file = File::open(container).map_err(|e| unreadable(e.to_string()))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| unreadable(e.to_string()))?;
        let mut entry = match archive.by_name(path_in_container) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Err(not_found()),
            Err(e) => return Err(unreadable(e.to_string())),
        };
        if entry.is_dir() {
            return Err(not_found());
        }

        let name = entry_file_name(path_in_container).ok_or_else(not_found)?;
        fs::create_dir_all(out_dir)?;
        let (target, out) = create_unique(out_dir, name)?;

        let total = entry.size();
        let copied = copy_with_heartbeat(
            &mut entry,
            &mut BufWriter::new(out),
            total,
            self.heartbeat_interval,
            |processed| {
                sink.report(ProgressEvent::Heartbeat {
                    path: container.to_path_buf(),
                    processed,
                    total,
                })
            },
        );

        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&target) {
                    warn!(target = %target.display(), error = %cleanup, "Failed to remove partial file");
                }
                return Err(unreadable(e.to_string()));
            }
        };

        info!(
            container = %container.display(),
            entry = path_in_container,
            target = %target.display(),
            bytes,
            "Entry extracted"
        );
        Ok(Extraction {
            container: container.to_path_buf(),
            path_in_container: path_in_container.to_string(),
            target,
            bytes,
        })
    }
}

fn entry_file_name(path_in_container: &str) -> Option<&str> {
    path_in_container
        .rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

/// Candidate file names: `name`, then `stem_1.ext`, `stem_2.ext`, ...
fn candidate_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, attempt, ext),
        _ => format!("{}_{}", name, attempt),
    }
}

/// Create the first free target file. `create_new` makes the check and the
/// creation one step.
fn create_unique(dir: &Path, name: &str) -> Result<(PathBuf, File)> {
    let mut attempt = 0;
    loop {
        let target = dir.join(candidate_name(name, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => return Ok((target, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

fn copy_with_heartbeat<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    total: u64,
    interval: Duration,
    mut on_beat: impl FnMut(u64),
) -> io::Result<u64> {
    let mut heartbeat = Heartbeat::new(interval);
    let mut buffer = vec![0u8; COPY_BUFFER];
    let mut copied = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..read])?;
        copied += read as u64;
        if copied < total && heartbeat.tick() {
            on_beat(copied);
        }
    }
    writer.flush()?;
    Ok(copied)
}
