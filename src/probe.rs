//! Per-file validity probe.
//!
//! A probe opens one file with the structural reader and converts the
//! outcome into data. Failures never cross this boundary as errors: a
//! malformed file must not stop the remaining files from being scanned.

use std::io;
use std::path::{Path, PathBuf};

use crate::netcdf::{self, NcError};

/// Loose failure category, carried alongside the message. The rendered
/// report prints the message only and does not distinguish kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The file could not be reached (not found, permission denied).
    Access,
    /// The file is not a netCDF file of any supported flavour.
    UnsupportedFormat,
    /// The header is structurally broken or truncated.
    MalformedStructure,
    /// The header references metadata it never defines.
    MissingRequiredMetadata,
    /// An I/O error inside the reader that is none of the above.
    InternalReaderError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub kind: FaultKind,
    pub message: String,
}

impl From<NcError> for ProbeFailure {
    fn from(err: NcError) -> Self {
        let kind = match &err {
            NcError::Io(e) => match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FaultKind::Access,
                _ => FaultKind::InternalReaderError,
            },
            NcError::NotNetcdf
            | NcError::UnsupportedVersion(_)
            | NcError::UnsupportedSuperblock(_) => FaultKind::UnsupportedFormat,
            NcError::UndefinedDimension { .. } => FaultKind::MissingRequiredMetadata,
            _ => FaultKind::MalformedStructure,
        };

        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Outcome of probing one file; `failure: None` means the file is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub path: PathBuf,
    pub failure: Option<ProbeFailure>,
}

impl ProbeResult {
    pub fn is_faulty(&self) -> bool {
        self.failure.is_some()
    }
}

/// Probes one file. The handle is released before this returns, on every
/// path including failure.
pub fn probe(path: &Path) -> ProbeResult {
    let failure = match netcdf::inspect(path) {
        Ok(_) => None,
        Err(err) => Some(ProbeFailure::from(err)),
    };

    ProbeResult {
        path: path.to_path_buf(),
        failure,
    }
}

// -- Tests -------------------------------------------------------------------
