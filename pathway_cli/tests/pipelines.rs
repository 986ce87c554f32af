use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use pathway_cli::{analyze_pathway, build_pathway, CliError};
use pathway_core::configuration::{Algorithm, ConfigError};
use pathway_core::io::sbtab::SbtabDocument;
use pathway_core::pathway::model::Pathway;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("pathway_core")
        .join("test_data")
        .join(name)
}

fn pdf_pages(path: &Path) -> usize {
    lopdf::Document::load(path).unwrap().get_pages().len()
}

/// IDs listed in the `ID` column of a table
fn table_ids(doc: &SbtabDocument, table: &str) -> BTreeSet<String> {
    doc.require_table(table)
        .unwrap()
        .column_values("ID")
        .unwrap()
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

fn prefix(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

/// Copy of a fixture with its algorithm line replaced
fn with_algorithm(dir: &Path, fixture_name: &str, line: Option<&str>) -> PathBuf {
    let content = fs::read_to_string(fixture(fixture_name)).unwrap();
    let replaced: Vec<&str> = content
        .lines()
        .filter_map(|l| {
            if l.starts_with("algorithm\t") {
                line
            } else {
                Some(l)
            }
        })
        .collect();
    let path = dir.join(fixture_name);
    fs::write(&path, replaced.join("\n") + "\n").unwrap();
    path
}

#[test]
fn mdf_report() {
    let dir = tempdir().unwrap();
    let out = prefix(dir.path(), "mdf_out");
    analyze_pathway(fixture("mdf_pathway.tsv"), &out).unwrap();

    let tsv = PathBuf::from(format!("{}.tsv", out));
    let doc = SbtabDocument::read(&tsv).unwrap();
    assert_eq!(doc.require_table("ReactionResult").unwrap().len(), 4);
    assert!(doc.get_table("MDF").is_some());
    assert_eq!(pdf_pages(&PathBuf::from(format!("{}.pdf", out))), 3);
}

#[test]
fn ecm_report() {
    let dir = tempdir().unwrap();
    let out = prefix(dir.path(), "ecm_out");
    analyze_pathway(fixture("ecm_pathway.tsv"), &out).unwrap();

    let doc = SbtabDocument::read(format!("{}.tsv", out)).unwrap();
    assert_eq!(doc.require_table("EnzymeResult").unwrap().len(), 4);
    assert_eq!(pdf_pages(&PathBuf::from(format!("{}.pdf", out))), 2);
}

#[test]
fn unknown_algorithm_writes_nothing() {
    let dir = tempdir().unwrap();
    let input = with_algorithm(dir.path(), "mdf_pathway.tsv", Some("algorithm\tFOO"));
    let out = prefix(dir.path(), "foo_out");
    let err = analyze_pathway(&input, &out).unwrap_err();
    assert!(matches!(
        &err,
        CliError::Config(ConfigError::UnknownAlgorithm { value }) if value == "FOO"
    ));
    let message = err.to_string();
    assert!(message.contains("FOO"));
    assert!(message.contains("'MDF'"));
    assert!(!Path::new(&format!("{}.tsv", out)).exists());
    assert!(!Path::new(&format!("{}.pdf", out)).exists());
}

#[test]
fn missing_algorithm_defaults_to_mdf() {
    let dir = tempdir().unwrap();
    let input = with_algorithm(dir.path(), "mdf_pathway.tsv", None);
    let out = prefix(dir.path(), "default_out");
    analyze_pathway(&input, &out).unwrap();
    assert_eq!(pdf_pages(&PathBuf::from(format!("{}.pdf", out))), 3);
}

#[test]
fn network_to_pathway() {
    let dir = tempdir().unwrap();
    let mdf = dir.path().join("mdf.tsv");
    let ecm = dir.path().join("ecm.tsv");
    build_pathway(fixture("network.tsv"), &mdf, false).unwrap();
    build_pathway(fixture("network.tsv"), &ecm, true).unwrap();

    let network = SbtabDocument::read(fixture("network.tsv")).unwrap();
    for built in [&mdf, &ecm] {
        let doc = SbtabDocument::read(built).unwrap();
        for table in ["Compound", "Reaction"] {
            assert_eq!(table_ids(&doc, table), table_ids(&network, table));
        }
    }

    let mdf_pathway = Pathway::from_sbtab(&SbtabDocument::read(&mdf).unwrap()).unwrap();
    assert_eq!(mdf_pathway.config.algorithm().unwrap(), Algorithm::Mdf);
    assert!(mdf_pathway
        .reactions
        .values()
        .all(|r| r.standard_dg_prime.is_some() && r.kcat.is_none()));

    let ecm_pathway = Pathway::from_sbtab(&SbtabDocument::read(&ecm).unwrap()).unwrap();
    assert_eq!(ecm_pathway.config.algorithm().unwrap(), Algorithm::Ecm);
    for reaction in ecm_pathway.reactions.values() {
        assert!(reaction.standard_dg_prime.is_some());
        assert!(reaction.kcat.is_some());
        assert!(reaction.enzyme_mass.is_some());
        assert!(!reaction.km.is_empty());
    }
    // the MDF pathway feeds straight into the analyzer
    let out = prefix(dir.path(), "built");
    analyze_pathway(&mdf, &out).unwrap();
    assert_eq!(pdf_pages(&PathBuf::from(format!("{}.pdf", out))), 3);
}

#[test]
fn missing_network() {
    let dir = tempdir().unwrap();
    let err = build_pathway(dir.path().join("absent.tsv"), dir.path().join("out.tsv"), false)
        .unwrap_err();
    assert!(matches!(err, CliError::Pathway(_)));
    assert!(!dir.path().join("out.tsv").exists());
}
