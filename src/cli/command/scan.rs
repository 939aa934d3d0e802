//! The `scan` command: probe every netCDF file under the given roots and
//! write the fault report.

use std::path::PathBuf;

use anyhow::Result;

use crate::report::{OverwritePolicy, ScanReport};
use crate::scan::{ScanTarget, Verbosity};

/// Runs the full scan-and-report pipeline. Returns the destination the
/// report was saved to, or `None` when an existing report was kept.
pub fn scan(
    roots: Vec<PathBuf>,
    top_level: bool,
    verbose: bool,
    extra_verbose: bool,
    output: Option<PathBuf>,
    confirm: bool,
) -> Result<Option<String>> {
    let verbosity = Verbosity::from_flags(verbose, extra_verbose)?;
    let target = ScanTarget::new(roots, top_level, verbosity);

    let results = crate::scan::scan(&target)?;
    let report = ScanReport::from_results(results);

    println!(
        "Scanned {} files, found {} faulty in {} directories",
        report.total_files(),
        report.faulty_files(),
        report.faulty_directories()
    );

    let destination = output.unwrap_or_else(super::default_report_path);
    let policy = if confirm {
        OverwritePolicy::Confirm
    } else {
        OverwritePolicy::Replace
    };

    if report.write(&destination, policy)? {
        Ok(Some(destination.to_string_lossy().to_string()))
    } else {
        Ok(None)
    }
}

// -- Tests -------------------------------------------------------------------
