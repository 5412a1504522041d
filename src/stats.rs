//! Counters collected over one walk
//!
//! All counters are updated under the engine's stats lock and read back as
//! a snapshot via [`Walk::stats`]. Filter counters are only maintained
//! when at least one filter rule is configured; the checks are measurable
//! overhead on the hot path otherwise.
//!
//! [`Walk::stats`]: crate::Walk::stats

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Snapshot of the statistics collected by the walking process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Jobs whose dispatch started a new worker.
    pub jobs_dispatched_to_new_worker: u64,

    /// Jobs dispatched while an idle worker was available to take them.
    pub jobs_dispatched_to_idle_worker: u64,

    /// Files that were visited.
    pub files_visited: u64,

    /// Directories that were visited.
    pub directories_visited: u64,

    /// Batches that directory entries were parceled into.
    pub directory_batches_processed: u64,

    /// Total time workers spent idle between jobs. Includes the final idle
    /// stretch before an idle-timeout shutdown, but not the wait between
    /// the last job and channel closure (which is not true idleness).
    pub idle_worker_time: Duration,

    /// Directories whose children were skipped because the visitor
    /// returned the skip-directory sentinel.
    pub directories_ignored: u64,

    /// Path-filter admissions, when at least one rule is configured.
    pub path_filter_includes: u64,

    /// Path-filter rejections, when at least one rule is configured.
    pub path_filter_excludes: u64,

    /// Filename-filter admissions, when at least one rule is configured.
    pub file_filter_includes: u64,

    /// Filename-filter rejections, when at least one rule is configured.
    pub file_filter_excludes: u64,
}

impl fmt::Display for WalkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processing Statistics")?;
        writeln!(f, "=====================")?;
        writeln!(
            f,
            "jobs dispatched to new worker: ({})",
            self.jobs_dispatched_to_new_worker
        )?;
        writeln!(
            f,
            "jobs dispatched to idle worker: ({})",
            self.jobs_dispatched_to_idle_worker
        )?;
        writeln!(f, "files visited: ({})", self.files_visited)?;
        writeln!(f, "directories visited: ({})", self.directories_visited)?;
        writeln!(
            f,
            "directory batches processed: ({})",
            self.directory_batches_processed
        )?;
        writeln!(
            f,
            "idle worker time: ({:.3}) seconds",
            self.idle_worker_time.as_secs_f64()
        )?;
        writeln!(f, "directories ignored: ({})", self.directories_ignored)?;
        writeln!(f, "path-filter includes: ({})", self.path_filter_includes)?;
        writeln!(f, "path-filter excludes: ({})", self.path_filter_excludes)?;
        writeln!(f, "file-filter includes: ({})", self.file_filter_includes)?;
        writeln!(f, "file-filter excludes: ({})", self.file_filter_excludes)?;

        Ok(())
    }
}
