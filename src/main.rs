mod cli;
mod netcdf;
mod probe;
mod report;
mod scan;

use std::process;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};

fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            roots,
            top_level,
            verbose,
            extra_verbose,
            output,
            confirm,
        } => match command::scan(roots, top_level, verbose, extra_verbose, output, confirm) {
            Ok(Some(filename)) => println!("Report saved to `{}`", filename),
            Ok(None) => println!("Existing report left unchanged"),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Commands::Check { file } => match command::check(file) {
            Ok(summary) => println!("{}", summary),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
    }

    Ok(())
}
