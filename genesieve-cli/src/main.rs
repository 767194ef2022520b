//! `genesieve`: Bayesian term enrichment for gene sets.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use genesieve_core::Summarizable;
use genesieve_io::{parse_gaf_with, parse_gene_list_str, parse_obo_hierarchy, GafOptions};
use genesieve_mcmc::{
    MoveRates, ParameterMap, PriorPseudocounts, Sampler, SamplerConfig, Simulator, SummaryOptions,
};
use genesieve_ontology::AssociationIndex;
use genesieve_stats::CorrectionMethod;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "genesieve", version)]
#[command(about = "Infer which ontology terms best explain a gene set")]
struct Cli {
    /// Ontology in OBO format
    #[arg(long, value_name = "PATH")]
    ontology: PathBuf,

    /// Gene-term associations in GAF format
    #[arg(long, value_name = "PATH")]
    assoc: PathBuf,

    /// Name genes by GAF database object id rather than symbol
    #[arg(long)]
    gaf_db_id: bool,

    /// Gene set: one name per line, or a JSON array of names (repeatable)
    #[arg(long, value_name = "PATH")]
    genes: Vec<PathBuf>,

    /// MCMC iterations per free term variable
    #[arg(long, default_value_t = 100)]
    samples: usize,

    /// Burn-in iterations per free term variable
    #[arg(long, default_value_t = 0)]
    burn_in: usize,

    /// Drop query genes missing from the associations instead of failing
    #[arg(long)]
    ignore_missing: bool,

    /// Pseudo-count of active terms [default: 1]
    #[arg(long, value_name = "N")]
    terms: Option<f64>,

    /// Pseudo-count of absent terms [default: number of relevant terms]
    #[arg(long, value_name = "N")]
    absent_terms: Option<f64>,

    /// Pseudo-count of false positives [default: 1]
    #[arg(long, value_name = "N")]
    false_positives: Option<f64>,

    /// Pseudo-count of true negatives [default: number of genes]
    #[arg(long, value_name = "N")]
    true_negatives: Option<f64>,

    /// Pseudo-count of false negatives [default: 1]
    #[arg(long, value_name = "N")]
    false_negatives: Option<f64>,

    /// Pseudo-count of true positives [default: number of genes]
    #[arg(long, value_name = "N")]
    true_positives: Option<f64>,

    #[arg(long, default_value_t = 1.0)]
    flip_rate: f64,

    #[arg(long, default_value_t = 1.0)]
    step_rate: f64,

    #[arg(long, default_value_t = 0.0)]
    randomize_rate: f64,

    /// Random number generator seed
    #[arg(long, default_value_t = 123456789)]
    seed: u64,

    /// Report terms and genes with at least this posterior probability
    #[arg(long, default_value_t = 0.01)]
    post_prob: f64,

    /// Report terms with at most this hypergeometric p-value
    #[arg(long, default_value_t = 0.05)]
    p_value: f64,

    /// Bonferroni-correct the hypergeometric p-values
    #[arg(long)]
    bonferroni: bool,

    /// Benjamini-Hochberg-correct the hypergeometric p-values
    #[arg(long, conflicts_with = "bonferroni")]
    benjamini_hochberg: bool,

    /// Simulate N gene sets from the prior instead of running inference
    #[arg(long, value_name = "N")]
    simulate: Option<usize>,

    /// In simulation, never activate a term below an active term
    #[arg(long, requires = "simulate")]
    exclude_redundant: bool,

    /// Write the JSON report here instead of stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn prior(&self, index: &AssociationIndex) -> PriorPseudocounts {
        let default = PriorPseudocounts::for_index(index);
        PriorPseudocounts {
            active_terms: self.terms.unwrap_or(default.active_terms),
            absent_terms: self.absent_terms.unwrap_or(default.absent_terms),
            false_positives: self.false_positives.unwrap_or(default.false_positives),
            true_negatives: self.true_negatives.unwrap_or(default.true_negatives),
            false_negatives: self.false_negatives.unwrap_or(default.false_negatives),
            true_positives: self.true_positives.unwrap_or(default.true_positives),
        }
    }

    fn correction(&self) -> CorrectionMethod {
        if self.bonferroni {
            CorrectionMethod::Bonferroni
        } else if self.benjamini_hochberg {
            CorrectionMethod::BenjaminiHochberg
        } else {
            CorrectionMethod::None
        }
    }

    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::WARN;
        }
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if cli.simulate.is_none() && cli.genes.is_empty() {
        bail!("at least one --genes file is required unless --simulate is given");
    }

    let hierarchy = parse_obo_hierarchy(&cli.ontology)
        .with_context(|| format!("failed to read ontology {}", cli.ontology.display()))?;
    info!(terms = hierarchy.len(), "read ontology");

    let annotations = parse_gaf_with(
        &cli.assoc,
        GafOptions {
            use_database_id: cli.gaf_db_id,
        },
    )
    .with_context(|| format!("failed to read associations {}", cli.assoc.display()))?;
    let index = AssociationIndex::build(hierarchy, annotations)
        .context("failed to index gene-term associations")?;
    info!("{}", index.summary());

    let params = ParameterMap::new(&index);
    let prior = cli.prior(&index).to_counts(&params);
    let mut rng = ChaCha20Rng::seed_from_u64(cli.seed);

    if let Some(n) = cli.simulate {
        let simulator = Simulator::new(&index, &params, prior)?.exclude_redundant(cli.exclude_redundant);
        let simulation = simulator.sample_gene_sets(n, &mut rng)?;
        return write_json(&simulation, cli.output.as_deref());
    }

    let gene_sets = cli
        .genes
        .iter()
        .map(|path| read_gene_set(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    info!(
        gene_sets = gene_sets.len(),
        sizes = ?gene_sets.iter().map(Vec::len).collect::<Vec<_>>(),
        "read gene sets"
    );

    let config = SamplerConfig {
        move_rates: MoveRates {
            flip: cli.flip_rate,
            step: cli.step_rate,
            randomize: cli.randomize_rate,
        },
        ignore_missing: cli.ignore_missing,
    };
    let mut sampler = Sampler::new(&index, &params, &gene_sets, prior, &config)?;

    let variables = sampler.n_variables();
    let (Some(samples), Some(burn_in)) = (
        cli.samples.checked_mul(variables),
        cli.burn_in.checked_mul(variables),
    ) else {
        bail!(
            "--samples {} and --burn-in {} overflow over {} term variables",
            cli.samples,
            cli.burn_in,
            variables
        );
    };
    sampler.run(samples, burn_in, &mut rng)?;

    let summary = sampler.summary_with(&SummaryOptions {
        post_prob: cli.post_prob,
        p_value: cli.p_value,
        correction: cli.correction(),
    })?;
    write_json(&summary, cli.output.as_deref())
}

/// Read a gene set as a JSON array of names or as a plain list.
fn read_gene_set(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read gene set {}", path.display()))?;
    if text.trim_start().starts_with('[') {
        serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON gene set {}", path.display()))
    } else {
        Ok(parse_gene_list_str(&text))
    }
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        None => {
            let mut writer = io::stdout().lock();
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
