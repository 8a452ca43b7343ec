//! End-to-end indexing runs over real zip files on disk.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;
use zipdex_core::{
    Config, FailureKind, MergeEngine, NoProgress, Orchestrator, QueryEngine, RunMode, SearchQuery,
    StaticVolumes, Store, StoreRole, StoreStats, VolumeInfo, VolumeStatus, ZipdexError,
};

fn write_zip(path: &Path, files: &[(&str, usize)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, size) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(&vec![b'x'; *size]).unwrap();
    }
    zip.finish().unwrap();
}

struct Fixture {
    temp: TempDir,
    volumes: Vec<VolumeInfo>,
}

impl Fixture {
    /// Two volumes with one archive each, three videos per archive.
    fn two_volumes() -> Self {
        let temp = TempDir::new().unwrap();
        let vol_a = temp.path().join("vol_a");
        let vol_b = temp.path().join("vol_b");

        write_zip(
            &vol_a.join("takeout-1.zip"),
            &[
                ("Takeout/video_0001.mp4", 100),
                ("Takeout/video_0002.mp4", 400),
                ("Takeout/holiday.mkv", 50),
                ("Takeout/notes.txt", 10),
            ],
        );
        write_zip(
            &vol_b.join("nested/takeout-2.zip"),
            &[
                ("VIDEO_0003.MP4", 250),
                ("clip.avi", 30),
                ("video_0004.mov", 20),
            ],
        );

        Fixture {
            volumes: vec![VolumeInfo::new(vol_a), VolumeInfo::new(vol_b)],
            temp,
        }
    }

    fn index_dir(&self) -> PathBuf {
        self.temp.path().join("index")
    }

    fn config(&self, mode: RunMode) -> Arc<Config> {
        let mut config = Config::default();
        config.general.index_path = Some(self.index_dir());
        config.workers.mode = mode;
        Arc::new(config)
    }

    fn canonical(&self, config: &Config) -> Store {
        Store::create(&config.canonical_store_path().unwrap(), StoreRole::Canonical).unwrap()
    }

    fn leftover_arenas(&self) -> Vec<PathBuf> {
        fs::read_dir(self.index_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().contains(".arena-"))
            .collect()
    }
}

#[test]
fn sequential_and_parallel_agree() {
    let mut results = Vec::new();
    for mode in [RunMode::Sequential, RunMode::Parallel] {
        let fixture = Fixture::two_volumes();
        let config = fixture.config(mode);
        let mut canonical = fixture.canonical(&config);

        let report = Orchestrator::new(Arc::clone(&config))
            .run(&fixture.volumes, &mut canonical)
            .unwrap();

        assert_eq!(report.mode, mode);
        assert!(report.failures().is_empty(), "{:?}", report.failures());
        assert!(report
            .volumes
            .iter()
            .all(|v| v.status == VolumeStatus::Completed));
        assert_eq!(report.merge.containers_merged, 2);
        assert_eq!(report.merge.entries_merged, 6);
        assert!(fixture.leftover_arenas().is_empty());

        results.push(canonical.stats().unwrap());
    }

    assert_eq!(
        results[0],
        StoreStats {
            volumes: 2,
            containers: 2,
            entries: 6,
            total_bytes: 850,
        }
    );
    assert_eq!(results[0], results[1]);
}

#[test]
fn search_after_indexing() {
    let fixture = Fixture::two_volumes();
    let config = fixture.config(RunMode::Parallel);
    let mut canonical = fixture.canonical(&config);
    Orchestrator::new(Arc::clone(&config))
        .run_source(&StaticVolumes(fixture.volumes.clone()), &mut canonical)
        .unwrap();

    let engine = QueryEngine::from_store(canonical);
    let hits = engine.search(&SearchQuery::substring("video_000")).unwrap();
    let names: Vec<_> = hits.iter().map(|h| h.entry_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["video_0002.mp4", "VIDEO_0003.MP4", "video_0001.mp4", "video_0004.mov"]
    );
    assert!(hits.windows(2).all(|w| w[0].entry_size >= w[1].entry_size));
    assert_eq!(hits[0].path_in_container, "Takeout/video_0002.mp4");
    assert!(hits[1].container_path.ends_with("takeout-2.zip"));

    assert!(engine.search(&SearchQuery::substring("")).unwrap().is_empty());
    assert!(engine.search(&SearchQuery::substring("notes")).unwrap().is_empty());
}

#[test]
fn remerging_a_worker_store_conflicts() {
    let fixture = Fixture::two_volumes();
    let mut config = (*fixture.config(RunMode::Parallel)).clone();
    config.workers.retain_worker_stores = true;
    let config = Arc::new(config);
    let mut canonical = fixture.canonical(&config);

    let report = Orchestrator::new(Arc::clone(&config))
        .run(&fixture.volumes, &mut canonical)
        .unwrap();
    let before = canonical.stats().unwrap();

    let arenas = fixture.leftover_arenas();
    assert_eq!(arenas.iter().filter(|p| p.extension().map_or(false, |e| e == "tmp")).count(), 2);
    assert_eq!(report.merge.stores_merged, 2);

    let summary = MergeEngine::new(Arc::clone(&config)).merge(
        &arenas
            .into_iter()
            .filter(|p| p.extension().map_or(false, |e| e == "tmp"))
            .collect::<Vec<_>>(),
        &mut canonical,
        &NoProgress,
    );

    assert_eq!(summary.conflicts(), 2);
    assert_eq!(summary.containers_merged, 0);
    assert_eq!(canonical.stats().unwrap(), before);
}

#[test]
fn corrupt_archive_does_not_stop_the_volume() {
    let fixture = Fixture::two_volumes();
    let vol_a = &fixture.volumes[0].root;
    fs::write(vol_a.join("broken.zip"), b"PK\x03\x04 definitely truncated").unwrap();
    write_zip(&vol_a.join("zz-later.zip"), &[("late_video.mp4", 5)]);

    let config = fixture.config(RunMode::Sequential);
    let mut canonical = fixture.canonical(&config);
    let report = Orchestrator::new(Arc::clone(&config))
        .run(&fixture.volumes, &mut canonical)
        .unwrap();

    let first = &report.volumes[0];
    assert_eq!(first.status, VolumeStatus::Completed);
    assert_eq!(first.containers_found, 3);
    assert_eq!(first.containers_recorded, 2);
    assert!(first.failure.is_none());
    assert_eq!(canonical.stats().unwrap().containers, 3);
}

#[test]
fn inaccessible_volume_is_reported() {
    let fixture = Fixture::two_volumes();
    let mut volumes = fixture.volumes.clone();
    volumes.insert(1, VolumeInfo::new(fixture.temp.path().join("unplugged")));

    for mode in [RunMode::Sequential, RunMode::Parallel] {
        let config = fixture.config(mode);
        let store_path = fixture.index_dir().join(format!("{:?}.db", mode));
        let mut canonical = Store::create(&store_path, StoreRole::Canonical).unwrap();

        let report = Orchestrator::new(Arc::clone(&config))
            .run(&volumes, &mut canonical)
            .unwrap();

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::VolumeInaccessible);
        assert_eq!(report.volumes[1].status, VolumeStatus::Failed);
        assert_eq!(report.merge.containers_merged, 2);
        assert_eq!(canonical.stats().unwrap().entries, 6);
    }
}

#[test]
fn cancel_before_start_leaves_nothing_behind() {
    for mode in [RunMode::Sequential, RunMode::Parallel] {
        let fixture = Fixture::two_volumes();
        let config = fixture.config(mode);
        let mut canonical = fixture.canonical(&config);

        let orchestrator = Orchestrator::new(Arc::clone(&config));
        orchestrator.cancellation_token().cancel();
        let err = orchestrator.run(&fixture.volumes, &mut canonical).unwrap_err();

        match err {
            ZipdexError::UserCancelled {
                completed,
                skipped,
                report,
            } => {
                assert_eq!(completed, 0);
                assert_eq!(skipped, 2);
                assert_eq!(report.volumes.len(), 2);
                assert!(report.failures().is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(canonical.stats().unwrap(), StoreStats::default());
        assert!(fixture.leftover_arenas().is_empty());
    }
}

#[test]
fn volume_timeout_is_reported() {
    let fixture = Fixture::two_volumes();
    let config = fixture.config(RunMode::Sequential);
    let mut canonical = fixture.canonical(&config);

    let report = Orchestrator::new(Arc::clone(&config))
        .with_volume_timeout(Some(Duration::ZERO))
        .run(&fixture.volumes, &mut canonical)
        .unwrap();

    let failures = report.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|f| f.kind == FailureKind::VolumeTimedOut));
    assert_eq!(canonical.stats().unwrap().containers, 0);
    assert!(fixture.leftover_arenas().is_empty());
}
