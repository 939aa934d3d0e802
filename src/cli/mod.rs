//! Command line interface.

pub mod command;

use std::path::PathBuf;

use clap::{command, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan directories for faulty netCDF files and write a report
    Scan {
        /// Root directories to scan
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Only consider files directly inside each root
        #[arg(long)]
        top_level: bool,

        /// Print a progress line for every file
        #[arg(short, long)]
        verbose: bool,

        /// Also print a line before each file is opened
        #[arg(long)]
        extra_verbose: bool,

        /// Report destination (default: ./faulty_netcdf_file_report.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ask before overwriting an existing report
        #[arg(long)]
        confirm: bool,
    },
    /// Check a single netCDF file and print its header summary
    Check {
        /// File to check
        file: PathBuf,
    },
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap()
            .progress_chars("##-"),
    )
}
