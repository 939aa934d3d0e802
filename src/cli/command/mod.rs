pub mod check;
pub mod scan;

use std::env;
use std::path::PathBuf;

pub use check::check;
pub use scan::scan;

use crate::report::DEFAULT_REPORT_NAME;

/// Default report destination, resolved against the current directory at
/// call time rather than carried as ambient state.
pub fn default_report_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join(DEFAULT_REPORT_NAME))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORT_NAME))
}

// -- Tests -------------------------------------------------------------------
