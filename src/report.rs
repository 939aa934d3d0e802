//! Fault grouping and the text report.
//!
//! Faulty files are grouped by their immediate parent directory, keyed
//! by the verbatim parent path (no normalisation, so textually different
//! spellings of one directory form distinct groups). Groups appear in
//! first-seen order of the failing files; entries within a group keep
//! scan order.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::probe::{ProbeFailure, ProbeResult};

/// Default report file name, resolved against the invoking process's
/// current directory by the CLI.
pub const DEFAULT_REPORT_NAME: &str = "faulty_netcdf_file_report.txt";

const TITLE: &str = "  Faulty netCDF file report  ";

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Truncate an existing destination without asking.
    #[default]
    Replace,
    /// Ask on stdin before overwriting; decline leaves the file alone.
    Confirm,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot create report directory `{}`: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write report `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One faulty file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub path: PathBuf,
    pub failure: ProbeFailure,
}

/// The faults sharing one immediate parent directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultGroup {
    pub directory: PathBuf,
    pub faults: Vec<Fault>,
}

/// Aggregated scan outcome, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    total_files: usize,
    groups: Vec<FaultGroup>,
}

impl ScanReport {
    /// Folds the probe results into directory fault groups. Valid files
    /// count towards the total only.
    pub fn from_results(results: Vec<ProbeResult>) -> Self {
        let total_files = results.len();
        let mut groups: Vec<FaultGroup> = Vec::new();

        for result in results {
            let Some(failure) = result.failure else {
                continue;
            };
            let directory = result
                .path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .to_path_buf();
            let fault = Fault {
                path: result.path,
                failure,
            };
            match groups.iter_mut().find(|g| g.directory == directory) {
                Some(group) => group.faults.push(fault),
                None => groups.push(FaultGroup {
                    directory,
                    faults: vec![fault],
                }),
            }
        }

        Self {
            total_files,
            groups,
        }
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    pub fn faulty_files(&self) -> usize {
        self.groups.iter().map(|g| g.faults.len()).sum()
    }

    pub fn faulty_directories(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[FaultGroup] {
        &self.groups
    }

    /// Renders the full report text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let border = "*".repeat(TITLE.chars().count());

        writeln!(out, "{}", border).unwrap();
        writeln!(out, "{}", TITLE).unwrap();
        writeln!(out, "{}", border).unwrap();
        writeln!(
            out,
            "Total number of directories with faulty files: {}",
            self.faulty_directories()
        )
        .unwrap();
        writeln!(out, "Total number of files scanned: {}", self.total_files).unwrap();
        writeln!(out, "Total number of faulty files: {}", self.faulty_files()).unwrap();
        writeln!(out).unwrap();
        writeln!(out, "Faulty files").unwrap();
        writeln!(out, "------------").unwrap();

        for group in &self.groups {
            let heading = format!(
                "Directory: {} | Faulty files in this directory: {}",
                group.directory.display(),
                group.faults.len()
            );
            writeln!(out).unwrap();
            writeln!(out, "{}", heading).unwrap();
            writeln!(out, "{}", "=".repeat(heading.chars().count())).unwrap();

            for fault in &group.faults {
                writeln!(out).unwrap();
                writeln!(
                    out,
                    "File: {} -> {}",
                    fault.path.display(),
                    fault.failure.message
                )
                .unwrap();
                writeln!(out).unwrap();
            }
        }

        out
    }

    /// Writes the rendered report to `destination`, creating missing
    /// parent directories. Returns `false` when an existing file was
    /// left in place under [`OverwritePolicy::Confirm`].
    pub fn write(
        &self,
        destination: &Path,
        policy: OverwritePolicy,
    ) -> Result<bool, ReportError> {
        if policy == OverwritePolicy::Confirm
            && destination.exists()
            && !confirm_overwrite(destination)
        {
            return Ok(false);
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ReportError::CreateDir {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        fs::write(destination, self.render()).map_err(|e| ReportError::Write {
            path: destination.to_path_buf(),
            source: e,
        })?;

        Ok(true)
    }
}

/// Asks on stdin whether `destination` may be replaced.
fn confirm_overwrite(destination: &Path) -> bool {
    print!("Report `{}` exists. Overwrite? [y/N] ", destination.display());
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }

    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::probe::FaultKind;

    use super::*;

    fn valid(path: &str) -> ProbeResult {
        ProbeResult {
            path: PathBuf::from(path),
            failure: None,
        }
    }

    fn faulty(path: &str, message: &str) -> ProbeResult {
        ProbeResult {
            path: PathBuf::from(path),
            failure: Some(ProbeFailure {
                kind: FaultKind::MalformedStructure,
                message: message.to_string(),
            }),
        }
    }

    fn report_fixture() -> ScanReport {
        ScanReport::from_results(vec![
            valid("/data/run1/a.nc"),
            faulty("/data/run2/b.nc", "file is empty"),
            faulty("/data/run1/c.nc", "header ends unexpectedly at byte 20"),
            faulty("/data/run2/d.nc", "not a netCDF file (unrecognised signature)"),
        ])
    }

    #[test]
    fn should_group_faults_by_parent_in_first_seen_order() {
        let report = report_fixture();

        let directories: Vec<_> = report
            .groups()
            .iter()
            .map(|g| g.directory.display().to_string())
            .collect();
        assert_eq!(directories, vec!["/data/run2", "/data/run1"]);
        assert_eq!(report.groups()[0].faults.len(), 2);
        assert_eq!(report.groups()[1].faults.len(), 1);
    }

    #[test]
    fn should_count_totals_consistently() {
        let report = report_fixture();

        assert_eq!(report.total_files(), 4);
        assert_eq!(report.faulty_files(), 3);
        assert_eq!(report.faulty_directories(), 2);

        let group_sum: usize = report.groups().iter().map(|g| g.faults.len()).sum();
        assert_eq!(group_sum, report.faulty_files());
    }

    #[test]
    fn should_handle_a_clean_scan() {
        let report = ScanReport::from_results(vec![valid("/data/a.nc"), valid("/data/b.nc")]);

        assert_eq!(report.total_files(), 2);
        assert_eq!(report.faulty_files(), 0);
        assert_eq!(report.faulty_directories(), 0);

        let text = report.render();
        assert!(text.contains("Total number of faulty files: 0"));
        assert!(!text.contains("Directory:"));
    }

    #[test]
    fn should_render_the_fixed_layout() {
        let report = report_fixture();

        let text = report.render();
        let lines: Vec<_> = text.lines().collect();

        let border = "*".repeat(TITLE.chars().count());
        assert_eq!(lines[0], border);
        assert_eq!(lines[1], TITLE);
        assert_eq!(lines[2], border);
        assert_eq!(lines[3], "Total number of directories with faulty files: 2");
        assert_eq!(lines[4], "Total number of files scanned: 4");
        assert_eq!(lines[5], "Total number of faulty files: 3");
        assert_eq!(lines[6], "");
        assert_eq!(lines[7], "Faulty files");
        assert_eq!(lines[8], "------------");

        let heading = "Directory: /data/run2 | Faulty files in this directory: 2";
        assert_eq!(lines[10], heading);
        assert_eq!(lines[11], "=".repeat(heading.len()));
        assert_eq!(lines[13], "File: /data/run2/b.nc -> file is empty");
        assert!(text.contains(
            "File: /data/run1/c.nc -> header ends unexpectedly at byte 20"
        ));
    }

    #[test]
    fn should_write_report_creating_missing_parents() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out/reports/report.txt");
        let report = report_fixture();

        let written = report.write(&destination, OverwritePolicy::Replace).unwrap();

        assert!(written);
        assert_eq!(fs::read_to_string(&destination).unwrap(), report.render());
    }

    #[test]
    fn should_replace_an_existing_report_silently() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("report.txt");
        fs::write(&destination, "stale").unwrap();
        let report = report_fixture();

        let written = report.write(&destination, OverwritePolicy::Replace).unwrap();

        assert!(written);
        let text = fs::read_to_string(&destination).unwrap();
        assert!(!text.contains("stale"));
        assert!(text.contains("Faulty files"));
    }

    #[test]
    fn should_leave_existing_report_when_confirmation_is_declined() {
        // stdin reads empty in a non-interactive run, which declines
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("report.txt");
        fs::write(&destination, "previous run").unwrap();
        let report = report_fixture();

        let written = report.write(&destination, OverwritePolicy::Confirm).unwrap();

        assert!(!written);
        assert_eq!(fs::read_to_string(&destination).unwrap(), "previous run");
    }

    #[test]
    fn should_write_without_prompting_when_confirm_destination_is_new() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("report.txt");
        let report = report_fixture();

        let written = report.write(&destination, OverwritePolicy::Confirm).unwrap();

        assert!(written);
        assert_eq!(fs::read_to_string(&destination).unwrap(), report.render());
    }

    #[test]
    fn should_fail_when_destination_is_a_directory() {
        let dir = TempDir::new().unwrap();
        let report = report_fixture();

        let err = report
            .write(dir.path(), OverwritePolicy::Replace)
            .unwrap_err();

        assert!(matches!(err, ReportError::Write { .. }));
    }
}
