//! Error types for pathwalk
//!
//! This module defines the error hierarchy for the walk engine:
//! - Configuration errors (rejected before a walk starts)
//! - Walk errors (surfaced from `run()`)
//! - The skip-directory sentinel a visitor returns to prune a subtree
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors carry the path and source chain needed to act on them
//! - The first worker error observed wins; later ones are discarded

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the walk engine
#[derive(Error, Debug)]
pub enum WalkError {
    /// Sentinel returned by a visitor to suppress enumeration of the
    /// current directory's children. Only meaningful as the visitor's
    /// return value for a directory; anywhere else it is an ordinary
    /// failure.
    #[error("skip directory")]
    SkipDirectory,

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The root of the walk could not be stat'd
    #[error("cannot access walk root '{path}': {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory that was already admitted could not be opened or read
    #[error("cannot read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A visitor callback failed
    #[error("visitor error: {source}")]
    Visitor {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A worker recovered a panic from a job handler
    #[error("worker panicked: {message}")]
    WorkerPanic { message: String },

    /// A worker thread could not be started
    #[error("failed to start worker thread: {source}")]
    WorkerSpawn {
        #[source]
        source: std::io::Error,
    },

    /// The watchdog observed no progress for longer than the stall timeout
    #[error(
        "walk appears to be dead-locked; no progress for {timeout:?} \
         (if this is not the case, provide a higher stall timeout)"
    )]
    Stalled { timeout: Duration },

    /// Jobs channel disconnected while a job was being queued
    #[error("jobs channel closed unexpectedly")]
    ChannelClosed,
}

impl WalkError {
    /// Wrap an arbitrary error as a visitor failure. Visitors use this to
    /// surface their own error types through `run()`.
    pub fn visitor(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        WalkError::Visitor {
            source: source.into(),
        }
    }

    /// Whether this is the skip-directory sentinel.
    pub fn is_skip_directory(&self) -> bool {
        matches!(self, WalkError::SkipDirectory)
    }
}

/// Configuration errors, surfaced when a setter rejects its input
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A filter pattern failed to compile
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Invalid worker count
    #[error("invalid concurrency {value}: must be at least 1")]
    InvalidConcurrency { value: usize },

    /// Invalid directory-entry batch size
    #[error("invalid batch size {value}: must be at least 1")]
    InvalidBatchSize { value: usize },
}

/// Result type alias for WalkError
pub type Result<T> = std::result::Result<T, WalkError>;
