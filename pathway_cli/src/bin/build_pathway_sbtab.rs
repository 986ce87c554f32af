use std::path::PathBuf;

use clap::Parser;
use pathway_cli::{build_pathway, init_logging, Result};

/// Build a pathway configuration SBtab (for ECM or MDF) from a network SBtab
#[derive(Parser)]
#[command(name = "build_pathway_sbtab", version)]
struct Cli {
    /// Make an ECM model (default: MDF)
    #[arg(long)]
    ecm: bool,
    /// Path to input network SBtab
    input_sbtab: PathBuf,
    /// Path to output pathway SBtab
    output_sbtab: PathBuf,
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
    build_pathway(&cli.input_sbtab, &cli.output_sbtab, cli.ecm)
}
