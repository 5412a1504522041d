//! Integration scenarios for the walk engine
//!
//! Every test builds a real tree under a tempdir and drives the public
//! surface only: construct, configure, run, stop, inspect.

use parking_lot::Mutex;
use pathwalk::{Filter, Walk, WalkError, WalkStats};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tempfile::TempDir;

/// Create a temp directory holding `file_count` empty files named
/// `temp-0 .. temp-N`.
fn fill_flat_temp_path(file_count: usize) -> (TempDir, Vec<String>) {
    let dir = tempfile::tempdir().unwrap();

    let mut filenames = Vec::with_capacity(file_count);
    for i in 0..file_count {
        let filename = format!("temp-{i}");
        fs::write(dir.path().join(&filename), b"").unwrap();
        filenames.push(filename);
    }

    filenames.sort();
    (dir, filenames)
}

/// Create a temp directory holding `file_count` empty files at random
/// depths in 1..=4. Returns the root-relative file paths, `/`-joined.
fn fill_hierarchical_temp_path(file_count: usize) -> (TempDir, Vec<String>) {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = rand::rng();

    let mut rel_files = Vec::with_capacity(file_count);
    for i in 0..file_count {
        let depth = rng.random_range(1..=4usize);

        let mut rel_dir = PathBuf::new();
        for level in 0..depth {
            let pick: u32 = rng.random_range(0..4);
            rel_dir.push(format!("branch-{level}-{pick}"));
        }

        fs::create_dir_all(dir.path().join(&rel_dir)).unwrap();

        let rel_file = rel_dir.join(format!("temp-{i}"));
        fs::write(dir.path().join(&rel_file), b"").unwrap();
        rel_files.push(slash_joined(&rel_file));
    }

    rel_files.sort();
    (dir, rel_files)
}

fn slash_joined(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every ancestor directory of each relative file path.
fn ancestor_dirs(rel_files: &[String]) -> HashSet<String> {
    let mut dirs = HashSet::new();
    for rel_file in rel_files {
        let mut parts: Vec<&str> = rel_file.split('/').collect();
        parts.pop();
        while !parts.is_empty() {
            dirs.insert(parts.join("/"));
            parts.pop();
        }
    }

    dirs
}

#[test]
fn flat_tree_visits_every_entry() {
    let file_count = 200;
    let (dir, filenames) = fill_flat_temp_path(file_count);
    let root_name = dir
        .path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();

    let visited = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&visited);

    let walk = Walk::new(dir.path(), move |_, info| {
        sink.lock().push(info.name().to_owned());
        Ok(())
    });

    walk.run().unwrap();
    assert!(walk.has_finished());

    let mut visited = visited.lock().clone();
    visited.sort();

    let mut expected = filenames;
    expected.push(root_name);
    expected.sort();

    assert_eq!(visited, expected);
    assert_eq!(visited.len(), file_count + 1);
}

#[test]
fn flat_tree_stats_are_exact() {
    let (dir, _) = fill_flat_temp_path(200);

    let walk = Walk::new(dir.path(), |_, _| Ok(()));
    walk.run().unwrap();

    let stats = walk.stats();
    assert_eq!(stats.directories_visited, 1);
    assert_eq!(stats.files_visited, 200);
    assert_eq!(stats.directory_batches_processed, 2);
    assert_eq!(stats.directories_ignored, 0);

    // No filter rules configured, so the filter counters stay elided.
    assert_eq!(stats.path_filter_includes, 0);
    assert_eq!(stats.file_filter_includes, 0);

    // 1 seed + 2 batches + 200 files, each dispatched exactly once.
    assert_eq!(
        stats.jobs_dispatched_to_new_worker + stats.jobs_dispatched_to_idle_worker,
        203
    );
}

#[test]
fn hierarchical_tree_visits_each_path_once() {
    let (dir, rel_files) = fill_hierarchical_temp_path(500);
    let expected_dirs = ancestor_dirs(&rel_files);
    let root = dir.path().to_path_buf();

    let visit_counts = Arc::new(Mutex::new(HashMap::<String, u32>::new()));
    let sink = Arc::clone(&visit_counts);

    let walk = Walk::new(dir.path(), move |parent_path, info| {
        let full_path = parent_path.join(info.name());
        let relative = full_path.strip_prefix(&root).unwrap();
        *sink.lock().entry(slash_joined(relative)).or_default() += 1;
        Ok(())
    });

    walk.run().unwrap();
    assert!(walk.has_finished());

    let visit_counts = visit_counts.lock().clone();

    // The root visit produces an empty relative path.
    assert_eq!(visit_counts.get(""), Some(&1));

    for rel_dir in &expected_dirs {
        assert_eq!(visit_counts.get(rel_dir), Some(&1), "directory {rel_dir}");
    }

    for rel_file in &rel_files {
        assert_eq!(visit_counts.get(rel_file), Some(&1), "file {rel_file}");
    }

    assert_eq!(
        visit_counts.len(),
        1 + expected_dirs.len() + rel_files.len()
    );
}

#[test]
fn parent_is_visited_before_any_descendant() {
    let (dir, _) = fill_hierarchical_temp_path(200);
    let root = dir.path().to_path_buf();

    let order = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&order);

    let walk = Walk::new(dir.path(), move |parent_path, info| {
        let full_path = parent_path.join(info.name());
        let relative = full_path.strip_prefix(&root).unwrap();
        sink.lock().push(slash_joined(relative));
        Ok(())
    });

    walk.run().unwrap();

    let order = order.lock().clone();
    let positions: HashMap<&String, usize> = order
        .iter()
        .enumerate()
        .map(|(index, path)| (path, index))
        .collect();

    for (path, index) in &positions {
        let Some((ancestor, _)) = path.rsplit_once('/') else {
            continue;
        };
        let ancestor_index = positions
            .get(&ancestor.to_owned())
            .unwrap_or_else(|| panic!("ancestor {ancestor} of {path} was never visited"));
        assert!(
            ancestor_index < index,
            "{ancestor} visited after its descendant {path}"
        );
    }
}

#[test]
fn skip_directory_sentinel_prunes_children() {
    let dir = tempfile::tempdir().unwrap();
    for (sub, file) in [("dir1", "file1"), ("dir2", "file2"), ("dir3", "file3")] {
        fs::create_dir(dir.path().join(sub)).unwrap();
        fs::write(dir.path().join(sub).join(file), b"").unwrap();
    }

    let visited_files = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&visited_files);

    let walk = Walk::new(dir.path(), move |_, info| {
        if info.is_dir() {
            if info.name() == "dir2" {
                return Err(WalkError::SkipDirectory);
            }
            return Ok(());
        }

        sink.lock().push(info.name().to_owned());
        Ok(())
    });

    walk.run().unwrap();

    let mut visited_files = visited_files.lock().clone();
    visited_files.sort();

    assert_eq!(visited_files, vec!["file1".to_owned(), "file3".to_owned()]);
    assert_eq!(walk.stats().directories_ignored, 1);
}

#[test]
fn missing_root_fails_before_any_worker_starts() {
    let walk = Walk::new("/invalid/path", |_, _| Ok(()));

    let err = walk.run().unwrap_err();
    assert!(matches!(err, WalkError::Root { .. }));
    assert!(err.to_string().contains("/invalid/path"));

    assert!(!walk.has_finished());
    assert_eq!(walk.stats(), WalkStats::default());
}

#[test]
fn recursive_include_filter_readmits_nested_subtrees() {
    let dir = tempfile::tempdir().unwrap();
    for (rel_dir, file) in [
        ("aa/bb", "f1"),
        ("aa/cc", "f2"),
        ("aa/xx", "f4"),
        ("aa/xx/bb", "f3"),
        ("aa/xx/yy/bb", "f5"),
    ] {
        fs::create_dir_all(dir.path().join(rel_dir)).unwrap();
        fs::write(dir.path().join(rel_dir).join(file), b"").unwrap();
    }

    let root = dir.path().to_path_buf();
    let visited_dirs = Arc::new(Mutex::new(HashSet::<String>::new()));
    let visited_files = Arc::new(Mutex::new(HashSet::<String>::new()));
    let dir_sink = Arc::clone(&visited_dirs);
    let file_sink = Arc::clone(&visited_files);

    let mut walk = Walk::new(dir.path(), move |parent_path, info| {
        let full_path = parent_path.join(info.name());
        let relative = slash_joined(full_path.strip_prefix(&root).unwrap());
        if info.is_dir() {
            dir_sink.lock().insert(relative);
        } else {
            file_sink.lock().insert(relative);
        }
        Ok(())
    });

    walk.set_filter(Filter {
        include_paths: vec!["aa/**/bb".into()],
        ..Filter::default()
    })
    .unwrap();

    walk.run().unwrap();
    assert!(walk.has_finished());

    let visited_dirs = visited_dirs.lock().clone();
    let expected_dirs: HashSet<String> = ["", "aa/bb", "aa/xx/bb", "aa/xx/yy/bb"]
        .into_iter()
        .map(str::to_owned)
        .collect();
    assert_eq!(visited_dirs, expected_dirs);

    // Direct files of excluded directories are suppressed, but files in a
    // nested re-included subtree are still reached.
    let visited_files = visited_files.lock().clone();
    let expected_files: HashSet<String> = ["aa/bb/f1", "aa/xx/bb/f3", "aa/xx/yy/bb/f5"]
        .into_iter()
        .map(str::to_owned)
        .collect();
    assert_eq!(visited_files, expected_files);

    let stats = walk.stats();
    assert_eq!(stats.path_filter_includes, 3);
    assert_eq!(stats.path_filter_excludes, 4);
}

#[test]
fn filename_include_beats_exclude() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keep.log"), b"").unwrap();
    fs::write(dir.path().join("other.txt"), b"").unwrap();

    let visited_files = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&visited_files);

    let mut walk = Walk::new(dir.path(), move |_, info| {
        if !info.is_dir() {
            sink.lock().push(info.name().to_owned());
        }
        Ok(())
    });

    walk.set_filter(Filter {
        include_filenames: vec!["*.log".into()],
        exclude_filenames: vec!["keep.log".into()],
        ..Filter::default()
    })
    .unwrap();

    walk.run().unwrap();

    assert_eq!(*visited_files.lock(), vec!["keep.log".to_owned()]);

    let stats = walk.stats();
    assert_eq!(stats.file_filter_includes, 1);
    assert_eq!(stats.file_filter_excludes, 1);
}

#[test]
fn stop_from_the_visitor_returns_cleanly() {
    let (dir, _) = fill_flat_temp_path(300);

    let stop_slot: Arc<OnceLock<pathwalk::StopHandle>> = Arc::new(OnceLock::new());
    let visitor_slot = Arc::clone(&stop_slot);

    let walk = Walk::new(dir.path(), move |_, info| {
        if !info.is_dir() {
            if let Some(handle) = visitor_slot.get() {
                handle.stop();
            }
        }
        Ok(())
    });

    stop_slot.set(walk.stop_handle()).ok();

    // A stop is not an error, and it leaves the walk unfinished. run()
    // returning at all proves the pool drained.
    walk.run().unwrap();
    assert!(!walk.has_finished());
}

#[test]
fn engine_is_serially_reusable() {
    let file_count = 200;
    let (dir, _) = fill_flat_temp_path(file_count);

    let visit_count = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&visit_count);

    let walk = Walk::new(dir.path(), move |_, _| {
        *sink.lock() += 1;
        Ok(())
    });

    for _ in 0..3 {
        walk.run().unwrap();
        assert!(walk.has_finished());
    }

    assert_eq!(*visit_count.lock(), 3 * (file_count + 1));
}

#[test]
fn visitor_error_fails_the_run() {
    let (dir, _) = fill_flat_temp_path(50);

    let walk = Walk::new(dir.path(), |_, info| {
        if info.name() == "temp-25" {
            return Err(WalkError::visitor("synthetic visitor failure"));
        }
        Ok(())
    });

    let err = walk.run().unwrap_err();
    assert!(err.to_string().contains("synthetic visitor failure"));
    assert!(!walk.has_finished());
}

#[test]
fn visitor_panic_is_recovered_and_surfaced() {
    let (dir, _) = fill_flat_temp_path(50);

    let walk = Walk::new(dir.path(), |_, info| {
        if info.name() == "temp-25" {
            panic!("synthetic visitor panic");
        }
        Ok(())
    });

    let err = walk.run().unwrap_err();
    assert!(matches!(err, WalkError::WorkerPanic { .. }));
    assert!(err.to_string().contains("synthetic visitor panic"));
    assert!(!walk.has_finished());
}

#[test]
fn undersized_pool_is_reported_as_a_stall() {
    let (dir, _) = fill_flat_temp_path(5);

    let mut walk = Walk::new(dir.path(), |_, _| Ok(()));
    walk.set_concurrency(1).unwrap();
    walk.set_stall_timeout(Duration::from_millis(300));

    // One worker and one channel slot cannot absorb the fan-out of even a
    // small directory; the watchdog must fail the run instead of hanging.
    let err = walk.run().unwrap_err();
    assert!(matches!(err, WalkError::Stalled { .. }));
    assert!(!walk.has_finished());
}
