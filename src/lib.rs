//! pathwalk - Parallel Filesystem Walker
//!
//! Walks a directory tree with a self-sizing pool of worker threads and
//! invokes a caller-supplied visitor on every directory and file found,
//! constrained by include/exclude patterns. Directory enumeration and
//! metadata lookup are dominated by I/O wait, so overlapping many of them
//! is where the speedup comes from.
//!
//! # Features
//!
//! - **Self-sizing worker pool**: workers are started when a job arrives
//!   and nobody is idle, and retire themselves after sitting idle.
//!
//! - **Bounded queue with backpressure**: a single bounded jobs channel
//!   feeds the pool; producers block (with stop-aware polling) when it
//!   fills.
//!
//! - **Exact termination**: workers produce the jobs they also consume,
//!   so completion is detected with an in-flight counter rather than a
//!   wait group; the decrement that reaches zero shuts the engine down.
//!
//! - **Stall watchdog**: a misconfigured pool that wedges is detected by
//!   lack of counter progress and fails the run with a diagnostic error.
//!
//! - **Include/exclude filtering**: glob rules over root-relative paths
//!   (`**` crosses components) and shell-style rules over bare filenames.
//!
//! # Example
//!
//! ```no_run
//! use pathwalk::{Walk, WalkError};
//!
//! fn main() -> Result<(), WalkError> {
//!     let walk = Walk::new("/var/data", |parent_path, info| {
//!         println!("{} ({} bytes)", parent_path.join(info.name()).display(), info.size());
//!         Ok(())
//!     });
//!
//!     walk.run()?;
//!     eprintln!("{}", walk.stats());
//!     Ok(())
//! }
//! ```
//!
//! Returning [`WalkError::SkipDirectory`] from the visitor for a
//! directory prunes that directory's children. [`Walk::stop_handle`]
//! provides cooperative cancellation from inside the visitor.

pub mod error;
pub mod filter;
pub mod job;
pub mod stats;
pub mod walk;

pub use error::{ConfigError, Result, WalkError};
pub use filter::Filter;
pub use job::EntryInfo;
pub use stats::WalkStats;
pub use walk::{StopHandle, Visitor, Walk};
