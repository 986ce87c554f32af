use std::path::PathBuf;

use clap::Parser;
use pathway_cli::{analyze_pathway, init_logging, Result};

/// Calculate the Max-min Driving Force (MDF) or the Enzyme Cost Model (ECM) of a pathway
#[derive(Parser)]
#[command(name = "pathway_cmd", version)]
struct Cli {
    /// Path to input file containing reactions
    infile: PathBuf,
    /// Prefix for the output TSV and PDF files
    outfile: String,
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;
    analyze_pathway(&cli.infile, &cli.outfile)
}
