//! Command line front end of the pathway toolkit
//!
//! Holds the two pipelines behind the `build_pathway_sbtab` and `pathway_cmd` binaries, so
//! they can be driven from tests without spawning processes.
use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use pathway_core::configuration::{Algorithm, ConfigError};
use pathway_core::ecm::{EcmError, EnzymeCostModel};
use pathway_core::estimation::ComponentContribution;
use pathway_core::io::sbtab::{SbtabDocument, SbtabError};
use pathway_core::pathway::model::{Pathway, PathwayError};
use pathway_core::plot::{text_page, LegendPlacement};
use pathway_core::report::{PdfReport, ReportError};
use pathway_core::thermo::{MdfError, ThermodynamicModel};

/// Alias for results of the command line pipelines
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced by the command line tools
#[derive(Debug, Error)]
pub enum CliError {
    /// The input could not be opened
    #[error("cannot read {path}: {source}")]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Sbtab(#[from] SbtabError),
    #[error("{0}")]
    Pathway(#[from] PathwayError),
    /// Bad configuration, including an unknown algorithm
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Mdf(#[from] MdfError),
    #[error("{0}")]
    Ecm(#[from] EcmError),
    #[error("{0}")]
    Report(#[from] ReportError),
    /// The log subscriber could not be installed
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Install a stderr log subscriber, `RUST_LOG` overrides the default `warn` level
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

/// Build a pathway SBtab from a network SBtab, estimating standard Gibbs energies
///
/// # Parameters
/// - `input`: Network SBtab
/// - `output`: Where the pathway SBtab is written
/// - `ecm`: Prepare the pathway for ECM instead of MDF
pub fn build_pathway<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q, ecm: bool) -> Result<()> {
    let algorithm = if ecm { Algorithm::Ecm } else { Algorithm::Mdf };
    let estimator = ComponentContribution::default();
    let pathway = Pathway::from_network_sbtab(input.as_ref(), &estimator, algorithm)?;
    info!(
        reactions = pathway.reactions.len(),
        compounds = pathway.compounds.len(),
        %algorithm,
        "built pathway"
    );
    pathway.to_sbtab().write(output)?;
    Ok(())
}

/// Output file with `extension` appended to `prefix`
///
/// The prefix is used verbatim, so `out.v2` becomes `out.v2.tsv`.
pub fn output_path(prefix: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix, extension))
}

/// Analyse a pathway SBtab with the algorithm named in its Configuration table, writing
/// `<prefix>.tsv` and `<prefix>.pdf`
///
/// An unknown algorithm is reported before any output file is created.
pub fn analyze_pathway<P: AsRef<Path>>(infile: P, prefix: &str) -> Result<()> {
    let infile = infile.as_ref();
    let reader = File::open(infile).map_err(|source| CliError::Input {
        path: infile.to_path_buf(),
        source,
    })?;
    let doc = SbtabDocument::from_reader("pathway", reader, "pathway.tsv")?;
    if doc.get_table("Configuration").is_none() {
        debug!("document has no Configuration table, using defaults");
    }
    let pathway = Pathway::from_sbtab(&doc)?;
    let algorithm = pathway.config.algorithm()?;
    info!(%algorithm, "analysing pathway");

    let tsv = output_path(prefix, "tsv");
    let pdf = output_path(prefix, "pdf");
    match algorithm {
        Algorithm::Mdf => {
            let model = ThermodynamicModel::from_sbtab(&doc)?;
            let solution = model.mdf_analysis()?;
            info!(mdf = solution.score, "MDF analysis done");
            solution.to_sbtab().write(&tsv)?;

            let mut report = PdfReport::create(&pdf);
            let mut concentrations = solution.plot_concentrations();
            if let Some(axes) = concentrations.axes_mut() {
                axes.y.grid = true;
            }
            report.add_figure(&concentrations)?;
            let mut driving_forces = solution.plot_driving_forces();
            if let Some(axes) = driving_forces.axes_mut() {
                axes.x.grid = true;
            }
            report.add_figure(&driving_forces)?;
            report.add_figure(&text_page(&pathway.net_reaction_formula()))?;
            report.close()?;
        }
        Algorithm::Ecm => {
            let model = EnzymeCostModel::from_sbtab(&doc)?;
            let solution = model.optimize_ecm()?;
            info!(cost = solution.total_cost, "ECM optimisation done");
            solution.to_sbtab().write(&tsv)?;

            let mut report = PdfReport::create(&pdf);
            let mut demand = solution.plot_enzyme_demand_breakdown(true);
            if let Some(axes) = demand.axes_mut() {
                axes.title = Some("ECM solution".to_string());
                axes.legend = Some(LegendPlacement::OutsideRight);
                axes.y.grid = true;
            }
            report.add_figure(&demand)?;
            report.add_figure(&solution.plot_volumes_pie())?;
            report.close()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_kept_verbatim() {
        assert_eq!(output_path("out/run.v2", "tsv"), PathBuf::from("out/run.v2.tsv"));
        assert_eq!(output_path("result", "pdf"), PathBuf::from("result.pdf"));
    }

    #[test]
    fn missing_input() {
        let err = analyze_pathway("/nonexistent/pathway.tsv", "/nonexistent/out").unwrap_err();
        assert!(matches!(err, CliError::Input { .. }));
        assert!(err.to_string().contains("/nonexistent/pathway.tsv"));
    }
}
