//! Include/exclude rules constraining a walk
//!
//! Two independent axes:
//! - Path rules match glob patterns against the path of a directory
//!   relative to the walk root, always using `/` as the separator. `*`
//!   stays within one path component; `**` crosses any number of them.
//! - Filename rules match shell-style patterns against the bare name of a
//!   file; `*` is unrestricted within the name.
//!
//! Precedence within an axis: a non-empty include list admits only its
//! matches (the exclude list is not consulted, so an include beats an
//! exclude); otherwise a non-empty exclude list rejects its matches;
//! otherwise everything is admitted. An empty filter admits everything.

use crate::error::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// User-supplied filtering rules, compiled once via [`Walk::set_filter`].
///
/// [`Walk::set_filter`]: crate::Walk::set_filter
#[derive(Clone, Debug, Default)]
pub struct Filter {
    /// Path patterns that admit matching directories.
    pub include_paths: Vec<String>,

    /// Path patterns that reject matching directories.
    pub exclude_paths: Vec<String>,

    /// Filename patterns that admit matching files.
    pub include_filenames: Vec<String>,

    /// Filename patterns that reject matching files.
    pub exclude_filenames: Vec<String>,

    /// Compare candidates and patterns case-insensitively.
    pub case_insensitive: bool,
}

impl Filter {
    /// Whether no rules are configured at all.
    pub fn is_empty(&self) -> bool {
        self.include_paths.is_empty()
            && self.exclude_paths.is_empty()
            && self.include_filenames.is_empty()
            && self.exclude_filenames.is_empty()
    }
}

/// Compiled form of [`Filter`], ready for matching on the hot path.
#[derive(Clone, Debug)]
pub(crate) struct FilterSet {
    include_paths: GlobSet,
    exclude_paths: GlobSet,
    include_filenames: GlobSet,
    exclude_filenames: GlobSet,
    include_path_count: usize,
    exclude_path_count: usize,
    include_filename_count: usize,
    exclude_filename_count: usize,
}

impl FilterSet {
    /// Compile the user rules. A malformed pattern is a configuration
    /// error; nothing fails later at match time.
    pub(crate) fn compile(rules: &Filter) -> Result<Self, ConfigError> {
        Ok(Self {
            include_paths: compile_set(&rules.include_paths, rules.case_insensitive, true)?,
            exclude_paths: compile_set(&rules.exclude_paths, rules.case_insensitive, true)?,
            include_filenames: compile_set(&rules.include_filenames, rules.case_insensitive, false)?,
            exclude_filenames: compile_set(&rules.exclude_filenames, rules.case_insensitive, false)?,
            include_path_count: rules.include_paths.len(),
            exclude_path_count: rules.exclude_paths.len(),
            include_filename_count: rules.include_filenames.len(),
            exclude_filename_count: rules.exclude_filenames.len(),
        })
    }

    pub(crate) fn empty() -> Self {
        Self::compile(&Filter::default()).expect("empty filter always compiles")
    }

    /// Whether no rules are configured at all.
    pub(crate) fn is_empty(&self) -> bool {
        self.include_path_count == 0
            && self.exclude_path_count == 0
            && self.include_filename_count == 0
            && self.exclude_filename_count == 0
    }

    /// Apply the path rules to a directory's root-relative path.
    pub(crate) fn is_path_included(&self, relative_path: &str) -> bool {
        if self.include_path_count > 0 {
            return self.include_paths.is_match(relative_path);
        }

        if self.exclude_path_count > 0 && self.exclude_paths.is_match(relative_path) {
            return false;
        }

        true
    }

    /// Apply the filename rules to a file's bare name.
    pub(crate) fn is_file_included(&self, filename: &str) -> bool {
        if self.include_filename_count > 0 {
            return self.include_filenames.is_match(filename);
        }

        if self.exclude_filename_count > 0 && self.exclude_filenames.is_match(filename) {
            return false;
        }

        true
    }
}

/// Compile one pattern list. Patterns are sorted first so the compiled set
/// is deterministic regardless of argument order.
fn compile_set(
    patterns: &[String],
    case_insensitive: bool,
    literal_separator: bool,
) -> Result<GlobSet, ConfigError> {
    let mut sorted: Vec<&String> = patterns.iter().collect();
    sorted.sort();

    let mut builder = GlobSetBuilder::new();
    for pattern in sorted {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(literal_separator)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;

        builder.add(glob);
    }

    builder.build().map_err(|source| ConfigError::InvalidPattern {
        pattern: source.glob().unwrap_or_default().to_owned(),
        source,
    })
}
