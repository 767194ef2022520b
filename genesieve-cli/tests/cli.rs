use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

const OBO: &str = "\
format-version: 1.2

[Term]
id: T:A
name: root term

[Term]
id: T:B
is_a: T:A ! root term

[Term]
id: T:C
relationship: part_of T:A

[Term]
id: T:OLD
is_a: T:A
is_obsolete: true

[Typedef]
id: part_of
";

const GAF: &str = "\
!gaf-version: 2.2
DB\tID1\tgene1\t\tT:B\tREF\tIEA
DB\tID2\tgene2\t\tT:C\tREF\tIEA
DB\tID3\tgene3\t\tT:A\tREF\tIEA
DB\tID3\tgene3\tNOT\tT:B\tREF\tIEA
DB\tID4\tgene4\t\tT:OLD\tREF\tIEA
";

struct Inputs {
    dir: TempDir,
}

impl Inputs {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("terms.obo"), OBO).unwrap();
        fs::write(dir.path().join("assocs.gaf"), GAF).unwrap();
        fs::write(dir.path().join("genes.txt"), "gene1\n\ngene2\n").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("genesieve").unwrap();
        cmd.arg("--ontology")
            .arg(self.path("terms.obo"))
            .arg("--assoc")
            .arg(self.path("assocs.gaf"))
            .arg("--quiet");
        cmd
    }
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

fn json_file(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn inference_report_structure() {
    let inputs = Inputs::new();
    let report = json_stdout(
        inputs
            .command()
            .arg("--genes")
            .arg(inputs.path("genes.txt"))
            .args(["--samples", "200", "--p-value", "1"]),
    );

    assert_eq!(report["mcmc"]["samples"], 600);
    assert_eq!(report["model"]["prior"]["succ"]["t"], 1.0);
    assert_eq!(report["model"]["prior"]["fail"]["t"], 3.0);
    assert_eq!(report["model"]["prior"]["fail"]["fp"], 4.0);

    let set = &report["summary"][0];
    let p_values = set["hypergeometricPValue"]["term"].as_object().unwrap();
    assert!(p_values.contains_key("T:A"));
    assert!(p_values.contains_key("T:B"));
    assert!(!p_values.contains_key("T:OLD"));

    let terms = set["posteriorMarginal"]["term"].as_object().unwrap();
    assert!(!terms.is_empty());
    for p in terms.values() {
        let p = p.as_f64().unwrap();
        assert!((0.01..=1.0).contains(&p));
    }
    assert!(set["posteriorMarginal"]["gene"]["falsePos"].is_object());
    assert!(set["posteriorMarginal"]["gene"]["falseNeg"].is_object());
}

#[test]
fn same_seed_same_report() {
    let inputs = Inputs::new();
    let genes = inputs.write("genes.json", r#"["gene1", "gene2"]"#);
    let run = |seed: &str| {
        json_stdout(
            inputs
                .command()
                .arg("--genes")
                .arg(&genes)
                .args(["--seed", seed, "--randomize-rate", "1"]),
        )
    };
    assert_eq!(run("7"), run("7"));
}

#[test]
fn unknown_genes_fail_unless_ignored() {
    let inputs = Inputs::new();
    let genes = inputs.write("missing.txt", "gene1\nnobody\n");

    inputs
        .command()
        .arg("--genes")
        .arg(&genes)
        .assert()
        .failure();

    let report = json_stdout(
        inputs
            .command()
            .arg("--genes")
            .arg(&genes)
            .arg("--ignore-missing"),
    );
    assert_eq!(report["summary"].as_array().unwrap().len(), 1);
}

#[test]
fn gene_sets_required_for_inference() {
    Inputs::new().command().assert().failure();
}

#[test]
fn simulation_writes_output_file() {
    let inputs = Inputs::new();
    let output = inputs.path("sim.json");
    inputs
        .command()
        .args(["--simulate", "4", "--exclude-redundant", "--terms", "1000", "--absent-terms", "0"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let sim = json_file(&output);
    let samples = sim["simulation"]["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 4);
    for sample in samples {
        assert!(sample["gene"]["true"].is_array());
        assert!(sample["gene"]["observed"].is_array());
    }
    assert!(sim["simulation"]["params"]["t"].as_f64().unwrap() > 0.9);
}

#[test]
fn bonferroni_is_recorded() {
    let inputs = Inputs::new();
    let report = json_stdout(
        inputs
            .command()
            .arg("--genes")
            .arg(inputs.path("genes.txt"))
            .args(["--bonferroni", "--p-value", "1"]),
    );
    let hyper = &report["summary"][0]["hypergeometricPValue"];
    assert_eq!(hyper["correction"], "bonferroni");
    assert_eq!(hyper["maxThreshold"], 1.0);
    assert_eq!(hyper["term"]["T:B"], 1.0);
}

#[test]
fn oversized_iteration_counts_fail() {
    let inputs = Inputs::new();
    inputs
        .command()
        .arg("--genes")
        .arg(inputs.path("genes.txt"))
        .args(["--samples", "18446744073709551615"])
        .assert()
        .failure();
}
