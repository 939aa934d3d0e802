//! The `check` command: probe a single file and print its header summary.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::netcdf;
use crate::probe::ProbeFailure;

/// Inspects one file, returning a one-line summary of its header.
pub fn check(file: PathBuf) -> Result<String> {
    match netcdf::inspect(&file) {
        Ok(info) => Ok(format!("{}: {}", file.display(), info)),
        Err(err) => {
            let failure = ProbeFailure::from(err);
            Err(anyhow!("{}: {}", file.display(), failure.message))
        }
    }
}

// -- Tests -------------------------------------------------------------------
