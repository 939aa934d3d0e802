//! Directory enumeration and the scan loop.
//!
//! Enumeration order is deterministic: roots are visited in the order
//! given, and entries within each directory in lexical file-name order.
//! Symbolic links are not followed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::cli::create_progress_bar;
use crate::netcdf;
use crate::probe::{self, ProbeResult};

/// How much per-file chatter the scan loop prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// No per-file lines; a progress bar tracks the loop instead.
    #[default]
    Silent,
    /// One progress line pair per file.
    Verbose,
    /// The verbose lines plus a line before each file is opened.
    ExtraVerbose,
}

impl Verbosity {
    /// Resolves the two CLI flags. Requesting both is a configuration
    /// error, surfaced before any file is opened.
    pub fn from_flags(verbose: bool, extra_verbose: bool) -> Result<Self, ScanConfigError> {
        match (verbose, extra_verbose) {
            (true, true) => Err(ScanConfigError::ConflictingVerbosity),
            (true, false) => Ok(Self::Verbose),
            (false, true) => Ok(Self::ExtraVerbose),
            (false, false) => Ok(Self::Silent),
        }
    }
}

/// Immutable description of one scan run.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub roots: Vec<PathBuf>,
    pub top_level_only: bool,
    pub extension: String,
    pub verbosity: Verbosity,
}

impl ScanTarget {
    pub fn new(roots: Vec<PathBuf>, top_level_only: bool, verbosity: Verbosity) -> Self {
        Self {
            roots,
            top_level_only,
            extension: netcdf::EXTENSION.to_string(),
            verbosity,
        }
    }
}

/// Fatal pre-scan errors. Nothing is probed and nothing is written once
/// one of these is raised.
#[derive(Debug, Error)]
pub enum ScanConfigError {
    #[error("no root directories given")]
    NoRoots,

    #[error("verbose and extra-verbose are mutually exclusive")]
    ConflictingVerbosity,

    #[error("root `{}` does not exist", .root.display())]
    MissingRoot { root: PathBuf },

    #[error("root `{}` is not a directory", .root.display())]
    NotADirectory { root: PathBuf },

    #[error("cannot read root `{}`: {source}", .root.display())]
    UnreadableRoot {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Probes every matching file under the target's roots, in enumeration
/// order, and returns one result per file considered.
///
/// Per-file failures are data in the results, never errors; only an
/// unusable root aborts the scan, and it does so before any probing.
pub fn scan(target: &ScanTarget) -> Result<Vec<ProbeResult>, ScanConfigError> {
    validate(target)?;

    let mut files = Vec::new();
    for root in &target.roots {
        if target.top_level_only {
            collect_top_level(root, &target.extension, &mut files)?;
        } else {
            collect_recursive(root, &target.extension, &mut files);
        }
    }

    let total = files.len();
    let bar = match target.verbosity {
        Verbosity::Silent => Some(create_progress_bar(
            total as u64,
            "Probing netCDF files...".to_string(),
        )),
        _ => None,
    };

    let mut stdout = io::stdout();
    let mut results = Vec::with_capacity(total);
    for (i, path) in files.iter().enumerate() {
        emit_progress(&mut stdout, target.verbosity, i + 1, total, path);

        results.push(probe::probe(path));

        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = bar {
        bar.finish_with_message("Probing complete");
    }

    Ok(results)
}

/// Writes the per-file progress lines for the given verbosity. Failures
/// to write chatter never fail the scan.
fn emit_progress(
    out: &mut impl io::Write,
    verbosity: Verbosity,
    position: usize,
    total: usize,
    path: &Path,
) {
    if verbosity == Verbosity::Silent {
        return;
    }

    let _ = writeln!(out, "File number: {} out of {}", position, total);
    let _ = writeln!(out, "File name: {}", path.display());
    if verbosity == Verbosity::ExtraVerbose {
        let _ = writeln!(out, "Opening file: {}", path.display());
    }
}

fn validate(target: &ScanTarget) -> Result<(), ScanConfigError> {
    if target.roots.is_empty() {
        return Err(ScanConfigError::NoRoots);
    }

    for root in &target.roots {
        let metadata = fs::metadata(root).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ScanConfigError::MissingRoot { root: root.clone() }
            } else {
                ScanConfigError::UnreadableRoot {
                    root: root.clone(),
                    source: e,
                }
            }
        })?;
        if !metadata.is_dir() {
            return Err(ScanConfigError::NotADirectory { root: root.clone() });
        }
        fs::read_dir(root).map_err(|e| ScanConfigError::UnreadableRoot {
            root: root.clone(),
            source: e,
        })?;
    }

    Ok(())
}

/// Files directly inside `root`, lexically ordered.
fn collect_top_level(
    root: &Path,
    extension: &str,
    files: &mut Vec<PathBuf>,
) -> Result<(), ScanConfigError> {
    let entries = fs::read_dir(root).map_err(|e| ScanConfigError::UnreadableRoot {
        root: root.to_path_buf(),
        source: e,
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                eprintln!("Warning: skipping unreadable entry in `{}`: {}", root.display(), e);
                continue;
            }
        };
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && matches_extension(&entry.path(), extension) {
            found.push(entry.path());
        }
    }

    found.sort();
    files.extend(found);

    Ok(())
}

/// Transitive descent below `root`. Unreadable subdirectories are warned
/// and skipped; the root itself was validated up front.
fn collect_recursive(root: &Path, extension: &str, files: &mut Vec<PathBuf>) {
    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if matches_extension(entry.path(), extension) {
                    files.push(entry.path().to_path_buf());
                }
            }
            Ok(_) => {}
            Err(e) => eprintln!("Warning: skipping unreadable entry: {}", e),
        }
    }
}

/// Matches on the file-name suffix, so a dotfile named exactly `.nc`
/// counts too.
fn matches_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(extension))
        .is_some_and(|stem| stem.ends_with('.'))
}

// -- Tests -------------------------------------------------------------------
